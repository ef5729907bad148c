use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{
    assets::source::ImageSource,
    effects::blend::BlendMode,
    foundation::core::{ImageRef, UserScale},
    foundation::error::{DrapeError, DrapeResult},
    render::raster::RasterImage,
    render::sizer::SizerOpts,
    render::tile::TileOpts,
    session::engine::{CompositeEngine, DEFAULT_VIEWPORT_WIDTH, EngineOpts},
};

/// JSON description of a single composite: which images, which mode, what scale.
///
/// ```json
/// {
///   "base": "products/wallet1.png",
///   "pattern": "patterns/pattern3.png",
///   "blend_mode": "overlay",
///   "user_scale": 80,
///   "viewport_width": 1280
/// }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeJob {
    pub base: ImageRef,
    #[serde(default)]
    pub pattern: Option<ImageRef>,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: BlendMode,
    #[serde(default = "default_user_scale")]
    pub user_scale: u32,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default)]
    pub sizer: SizerOpts,
    #[serde(default)]
    pub tile: TileOpts,
}

fn default_blend_mode() -> BlendMode {
    BlendMode::Screen
}

fn default_user_scale() -> u32 {
    UserScale::default().percent()
}

fn default_viewport_width() -> u32 {
    DEFAULT_VIEWPORT_WIDTH
}

impl CompositeJob {
    /// Parse a job from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> DrapeResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| DrapeError::serde(format!("parse composite job JSON: {e}")))
    }

    /// Parse a job from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DrapeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            DrapeError::validation(format!("open composite job JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> DrapeResult<()> {
        UserScale::new(self.user_scale)?;
        if self.viewport_width == 0 {
            return Err(DrapeError::validation("job viewport_width must be > 0"));
        }
        self.sizer.validate()?;
        self.tile.validate()
    }

    /// Run the job against `source` and return the final raster.
    ///
    /// Setters are issued in an order that blends at most once.
    pub async fn run<S: ImageSource>(&self, source: S, opts: EngineOpts) -> DrapeResult<RasterImage> {
        self.validate()?;
        let opts = EngineOpts {
            sizer: self.sizer,
            tile: self.tile,
            ..opts
        };
        let mut engine = CompositeEngine::new(source, opts)?;
        engine.set_viewport_width(self.viewport_width).await?;
        engine.set_base_image(self.base.clone()).await?;
        engine.set_blend_mode(self.blend_mode).await?;
        engine.set_user_scale(self.user_scale).await?;
        if let Some(pattern) = &self.pattern {
            engine.set_pattern(pattern.clone()).await?;
        }
        engine
            .into_output()
            .ok_or_else(|| DrapeError::evaluation("composite job produced no output"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/job.rs"]
mod tests;
