use crate::effects::blend::BlendMode;
use crate::foundation::core::{ImageRef, UserScale};

/// Selection state of one customization session.
///
/// Mutated only through the setters; selecting a new base image clears the pattern and restores
/// the default scale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeState {
    base: Option<ImageRef>,
    pattern: Option<ImageRef>,
    mode: BlendMode,
    user_scale: UserScale,
}

impl Default for CompositeState {
    fn default() -> Self {
        Self {
            base: None,
            pattern: None,
            mode: BlendMode::Screen,
            user_scale: UserScale::default(),
        }
    }
}

impl CompositeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(&self) -> Option<&ImageRef> {
        self.base.as_ref()
    }

    pub fn pattern(&self) -> Option<&ImageRef> {
        self.pattern.as_ref()
    }

    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    pub fn user_scale(&self) -> UserScale {
        self.user_scale
    }

    pub(crate) fn select_base(&mut self, reference: ImageRef) {
        self.base = Some(reference);
        self.pattern = None;
        self.user_scale = UserScale::default();
    }

    pub(crate) fn select_pattern(&mut self, reference: Option<ImageRef>) {
        self.pattern = reference;
    }

    pub(crate) fn set_mode(&mut self, mode: BlendMode) {
        self.mode = mode;
    }

    pub(crate) fn set_user_scale(&mut self, scale: UserScale) {
        self.user_scale = scale;
    }
}
