use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use drape::{BlendMode, CompositeJob, EngineOpts, FsImageSource, ImageRef, RasterImage};

#[derive(Parser, Debug)]
#[command(name = "drape", version)]
struct Cli {
    /// Raise log verbosity on stderr (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a pattern onto a base image and write a PNG.
    Composite(CompositeArgs),
    /// Run a composite described by a JSON job file.
    Job(JobArgs),
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Base (product) image.
    #[arg(long)]
    base: PathBuf,

    /// Pattern image to tile over the base. Omit for a base-only render.
    #[arg(long)]
    pattern: Option<PathBuf>,

    /// Blend mode: screen, overlay or normal. Unknown names blend as normal.
    #[arg(long, default_value = "screen")]
    mode: String,

    /// Pattern scale in percent (10..=200).
    #[arg(long, default_value_t = 50)]
    scale: u32,

    /// Viewport width in pixels used to bound the output size.
    #[arg(long, default_value_t = drape::DEFAULT_VIEWPORT_WIDTH)]
    viewport: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Blend on a dedicated thread pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct JobArgs {
    /// Input job JSON. Image references resolve relative to its directory.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Blend on a dedicated thread pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args),
        Command::Job(args) => cmd_job(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let job = CompositeJob {
        base: path_ref(&args.base)?,
        pattern: args.pattern.as_deref().map(path_ref).transpose()?,
        blend_mode: BlendMode::parse(&args.mode),
        user_scale: args.scale,
        viewport_width: args.viewport,
        sizer: Default::default(),
        tile: Default::default(),
    };
    let opts = EngineOpts {
        parallel_blend: args.parallel,
        threads: args.threads,
        ..EngineOpts::default()
    };
    let source = FsImageSource::new(".").with_absolute_paths(true);
    let out = pollster::block_on(job.run(source, opts)).context("composite")?;
    write_png(&out, &args.out)
}

fn cmd_job(args: JobArgs) -> anyhow::Result<()> {
    let job = CompositeJob::from_path(&args.in_path)?;
    let root = args
        .in_path
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let opts = EngineOpts {
        parallel_blend: args.parallel,
        ..EngineOpts::default()
    };
    let out = pollster::block_on(job.run(FsImageSource::new(root), opts))
        .with_context(|| format!("run job '{}'", args.in_path.display()))?;
    write_png(&out, &args.out)
}

// Command-line paths may point anywhere, so they are passed to the source as absolute paths.
fn path_ref(path: &Path) -> anyhow::Result<ImageRef> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("resolve image path '{}'", path.display()))?;
    Ok(ImageRef::new(abs.to_string_lossy().into_owned()))
}

fn write_png(raster: &RasterImage, out: &Path) -> anyhow::Result<()> {
    raster.save_png(out)?;
    eprintln!(
        "wrote {} ({}x{}, fingerprint {:016x})",
        out.display(),
        raster.width(),
        raster.height(),
        raster.fingerprint()
    );
    Ok(())
}
