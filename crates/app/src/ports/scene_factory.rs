//! Scene factory port — turns configuration into a live scene.

use condop_domain::error::DispatchError;
use condop_domain::scene::SceneConfig;

use crate::scene_handler::SceneHandler;

/// Builds a [`SceneHandler`] (and every handler it owns) from a
/// [`SceneConfig`].
///
/// The scheduler calls this only after the previous scene has been fully
/// disposed, so a factory may reuse exclusive resources.
pub trait SceneFactory: Send + Sync {
    /// Construct the scene.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the configuration is invalid or a
    /// handler cannot be built. Handlers built before the failure are
    /// disposed before returning.
    fn build(&self, config: &SceneConfig) -> Result<SceneHandler, DispatchError>;
}

impl<T: SceneFactory + ?Sized> SceneFactory for std::sync::Arc<T> {
    fn build(&self, config: &SceneConfig) -> Result<SceneHandler, DispatchError> {
        (**self).build(config)
    }
}
