use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Context;

use crate::{
    assets::decode::decode_image,
    foundation::core::ImageRef,
    foundation::error::{DrapeError, DrapeResult, LoadError},
    render::raster::RasterImage,
};

/// Resolves image references into decoded rasters.
///
/// Loading is the only suspension point of a composite. Implementations never retry; the caller
/// decides whether to issue the request again.
///
/// The bundled sources complete without suspending: [`FsImageSource`] reads and decodes on the
/// calling thread. Hosts that must keep a shared thread responsive should implement this trait
/// over their own IO and decode workers.
pub trait ImageSource {
    /// Fetch and decode `reference` into a straight-alpha RGBA8 raster.
    fn load(&self, reference: &ImageRef) -> impl Future<Output = Result<RasterImage, LoadError>>;
}

/// Loads images from the filesystem, relative to a root directory.
///
/// `load` blocks on `std::fs::read` and the decode before its future resolves.
#[derive(Clone, Debug)]
pub struct FsImageSource {
    root: PathBuf,
    allow_absolute: bool,
}

impl FsImageSource {
    /// Resolve references as normalized relative paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allow_absolute: false,
        }
    }

    /// Also accept absolute paths, used verbatim.
    pub fn with_absolute_paths(mut self, allow: bool) -> Self {
        self.allow_absolute = allow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &ImageRef) -> DrapeResult<PathBuf> {
        let raw = Path::new(reference.as_str());
        if self.allow_absolute && raw.is_absolute() {
            return Ok(raw.to_path_buf());
        }
        let norm = normalize_rel_path(reference.as_str())?;
        Ok(self.root.join(Path::new(&norm)))
    }
}

impl ImageSource for FsImageSource {
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    async fn load(&self, reference: &ImageRef) -> Result<RasterImage, LoadError> {
        let decoded = self.resolve(reference).and_then(|path| {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read image bytes from '{}'", path.display()))?;
            decode_image(&bytes)
        });
        decoded.map_err(|e| {
            tracing::warn!(%reference, error = %e, "image load failed");
            LoadError::new(reference.as_str(), e)
        })
    }
}

#[derive(Clone, Debug)]
enum MemoryEntry {
    Encoded(Arc<Vec<u8>>),
    Decoded(Arc<RasterImage>),
}

/// In-memory image source keyed by reference.
///
/// Encoded entries are decoded on every load; decoded entries are cloned out.
#[derive(Debug, Default)]
pub struct MemoryImageSource {
    entries: HashMap<ImageRef, MemoryEntry>,
    loads: AtomicUsize,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register encoded bytes (PNG, JPEG, ...) under `reference`.
    pub fn insert_encoded(&mut self, reference: impl Into<ImageRef>, bytes: Vec<u8>) {
        self.entries
            .insert(reference.into(), MemoryEntry::Encoded(Arc::new(bytes)));
    }

    /// Register an already decoded raster under `reference`.
    pub fn insert_raster(&mut self, reference: impl Into<ImageRef>, raster: RasterImage) {
        self.entries
            .insert(reference.into(), MemoryEntry::Decoded(Arc::new(raster)));
    }

    pub fn remove(&mut self, reference: &ImageRef) -> bool {
        self.entries.remove(reference).is_some()
    }

    /// Number of `load` calls served so far, including failed ones.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl ImageSource for MemoryImageSource {
    async fn load(&self, reference: &ImageRef) -> Result<RasterImage, LoadError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        match self.entries.get(reference) {
            Some(MemoryEntry::Decoded(raster)) => Ok(RasterImage::clone(raster)),
            Some(MemoryEntry::Encoded(bytes)) => {
                decode_image(bytes).map_err(|e| LoadError::new(reference.as_str(), e))
            }
            None => Err(LoadError::new(
                reference.as_str(),
                anyhow::anyhow!("unknown image reference"),
            )),
        }
    }
}

/// Normalize and validate root-relative image paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> DrapeResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(DrapeError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(DrapeError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(DrapeError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(DrapeError::validation(
            "image path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
