use std::sync::Arc;

use crate::{
    assets::source::ImageSource,
    effects::blend::{BlendMode, blend_rgb_in_place, par_blend_rgb_in_place},
    foundation::core::{Canvas, ImageRef, PixelRect, UserScale},
    foundation::error::{DrapeError, DrapeResult, LoadError},
    render::raster::RasterImage,
    render::sizer::{SizerOpts, size_canvas},
    render::surface::{CpuSurface, RasterSurface},
    render::tile::{TileOpts, render_tile},
    session::state::CompositeState,
};

/// Viewport width assumed until the host reports one.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1000;

/// Where the engine's output currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnginePhase {
    /// No base image selected.
    Empty,
    /// Base drawn, nothing blended.
    BaseOnly,
    /// Base with the tile layer blended in.
    Composited,
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineOpts {
    pub sizer: SizerOpts,
    pub tile: TileOpts,
    /// Run the per-pixel blend on a dedicated rayon pool.
    pub parallel_blend: bool,
    /// Override rayon worker threads (parallel mode only).
    pub threads: Option<usize>,
    /// Pixels per parallel work item.
    pub blend_chunk_px: usize,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            sizer: SizerOpts::default(),
            tile: TileOpts::default(),
            parallel_blend: false,
            threads: None,
            blend_chunk_px: 16 * 1024,
        }
    }
}

#[derive(Clone, Debug)]
struct CachedDecode {
    reference: ImageRef,
    image: Arc<RasterImage>,
}

/// Drives base sizing, tiling and blending for one session.
///
/// Every setter triggers a full recompute from the cached decodes; there is no incremental update.
/// All mutation goes through `&mut self`, so at most one composite is in flight per engine and
/// nothing else can observe the working buffer mid-call.
pub struct CompositeEngine<S, T = CpuSurface> {
    source: S,
    surface: T,
    opts: EngineOpts,
    pool: Option<rayon::ThreadPool>,
    state: CompositeState,
    viewport_width: u32,
    base: Option<CachedDecode>,
    pattern: Option<CachedDecode>,
    output: Option<RasterImage>,
    phase: EnginePhase,
}

impl<S: ImageSource> CompositeEngine<S, CpuSurface> {
    /// Engine drawing into an in-memory [`CpuSurface`].
    pub fn new(source: S, opts: EngineOpts) -> DrapeResult<Self> {
        let surface = CpuSurface::new(Canvas {
            width: 1,
            height: 1,
        })?;
        Self::with_surface(source, surface, opts)
    }
}

impl<S: ImageSource, T: RasterSurface> CompositeEngine<S, T> {
    pub fn with_surface(source: S, surface: T, opts: EngineOpts) -> DrapeResult<Self> {
        opts.sizer.validate()?;
        opts.tile.validate()?;
        let pool = if opts.parallel_blend {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };
        Ok(Self {
            source,
            surface,
            opts,
            pool,
            state: CompositeState::default(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            base: None,
            pattern: None,
            output: None,
            phase: EnginePhase::Empty,
        })
    }

    pub fn state(&self) -> &CompositeState {
        &self.state
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Latest finished composite, for display.
    pub fn current(&self) -> Option<&RasterImage> {
        self.output.as_ref()
    }

    pub fn into_output(self) -> Option<RasterImage> {
        self.output
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn surface(&self) -> &T {
        &self.surface
    }

    /// Select a new base image. Clears the pattern and restores the default scale.
    ///
    /// On failure the previous selection is restored, so the state keeps describing
    /// [`Self::current`].
    pub async fn set_base_image(
        &mut self,
        reference: impl Into<ImageRef>,
    ) -> DrapeResult<EnginePhase> {
        let previous = self.state.clone();
        self.state.select_base(reference.into());
        let res = self.composite().await;
        if res.is_err() {
            self.state = previous;
        }
        res
    }

    pub async fn set_pattern(&mut self, reference: impl Into<ImageRef>) -> DrapeResult<EnginePhase> {
        self.state.select_pattern(Some(reference.into()));
        self.composite().await
    }

    pub async fn clear_pattern(&mut self) -> DrapeResult<EnginePhase> {
        self.state.select_pattern(None);
        self.composite().await
    }

    /// Recorded in every phase, recomputed only while composited.
    pub async fn set_blend_mode(&mut self, mode: BlendMode) -> DrapeResult<EnginePhase> {
        self.state.set_mode(mode);
        if self.phase != EnginePhase::Composited {
            return Ok(self.phase);
        }
        self.composite().await
    }

    /// Apply a finalized scale change. Out-of-range values fail with [`DrapeError::InvalidScale`]
    /// and leave the state untouched.
    pub async fn set_user_scale(&mut self, percent: u32) -> DrapeResult<EnginePhase> {
        let scale = UserScale::new(percent)?;
        self.state.set_user_scale(scale);
        if self.phase != EnginePhase::Composited {
            return Ok(self.phase);
        }
        self.composite().await
    }

    pub async fn set_viewport_width(&mut self, width: u32) -> DrapeResult<EnginePhase> {
        if width == 0 {
            return Err(DrapeError::validation("viewport width must be > 0"));
        }
        self.viewport_width = width;
        if self.state.base().is_none() {
            return Ok(self.phase);
        }
        self.composite().await
    }

    /// Recompute the output from the current state.
    ///
    /// A failed base load leaves the previous output in place. A failed pattern load drops the
    /// pattern selection and leaves the freshly drawn base as the output in
    /// [`EnginePhase::BaseOnly`]. Either way the [`LoadError`] is returned.
    #[tracing::instrument(
        skip(self),
        fields(base = ?self.state.base(), pattern = ?self.state.pattern(), mode = %self.state.mode())
    )]
    pub async fn composite(&mut self) -> DrapeResult<EnginePhase> {
        let Some(base_ref) = self.state.base().cloned() else {
            self.output = None;
            self.phase = EnginePhase::Empty;
            return Ok(self.phase);
        };

        let base = resolve(&self.source, &mut self.base, &base_ref).await?;
        let canvas = size_canvas(
            base.width(),
            base.height(),
            self.viewport_width,
            &self.opts.sizer,
        )?;

        self.surface.resize(canvas)?;
        self.surface.clear(PixelRect::from_canvas(canvas));
        self.surface
            .draw_image_scaled(&base, canvas.width, canvas.height)?;

        let Some(pattern_ref) = self.state.pattern().cloned() else {
            return Ok(self.finish_base_only());
        };
        let pattern = match resolve(&self.source, &mut self.pattern, &pattern_ref).await {
            Ok(p) => p,
            Err(e) => {
                self.state.select_pattern(None);
                self.finish_base_only();
                return Err(e.into());
            }
        };

        let tile = render_tile(&pattern, self.state.user_scale(), canvas, &self.opts.tile)?;
        let mut working = self.surface.read_pixels();
        self.blend(&mut working, &tile)?;
        self.surface.write_pixels(&working)?;

        self.output = Some(working);
        self.phase = EnginePhase::Composited;
        Ok(self.phase)
    }

    fn finish_base_only(&mut self) -> EnginePhase {
        self.output = Some(self.surface.read_pixels());
        self.phase = EnginePhase::BaseOnly;
        self.phase
    }

    fn blend(&self, working: &mut RasterImage, tile: &RasterImage) -> DrapeResult<()> {
        let mode = self.state.mode();
        match &self.pool {
            Some(pool) => {
                let chunk_px = self.opts.blend_chunk_px;
                let (dst, src) = (working.data_mut(), tile.data());
                pool.install(|| par_blend_rgb_in_place(dst, src, mode, chunk_px))
            }
            None => blend_rgb_in_place(working.data_mut(), tile.data(), mode),
        }
    }
}

async fn resolve<S: ImageSource>(
    source: &S,
    slot: &mut Option<CachedDecode>,
    reference: &ImageRef,
) -> Result<Arc<RasterImage>, LoadError> {
    if let Some(cached) = slot
        && cached.reference == *reference
    {
        return Ok(Arc::clone(&cached.image));
    }
    let image = Arc::new(source.load(reference).await?);
    *slot = Some(CachedDecode {
        reference: reference.clone(),
        image: Arc::clone(&image),
    });
    Ok(image)
}

fn build_thread_pool(threads: Option<usize>) -> DrapeResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(DrapeError::validation(
            "engine 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DrapeError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/session/engine.rs"]
mod tests;
