//! Stock scene factory: every configured handler becomes a
//! [`ConditionHandler`] reading the shared state source.

use condop_domain::error::DispatchError;
use condop_domain::scene::SceneConfig;

use crate::handlers::ConditionHandler;
use crate::ports::{OpFactory, SceneFactory, StateHandler, StateSource};
use crate::scene_handler::{DEFAULT_FAILURE_WARN_THRESHOLD, SceneHandler};

/// Builds scenes out of [`ConditionHandler`]s.
///
/// All handlers of all scenes read the same `source`; operations are
/// realised through `ops`.
pub struct ConditionSceneFactory<S, O> {
    source: S,
    ops: O,
    failure_warn_threshold: u32,
}

impl<S, O> ConditionSceneFactory<S, O>
where
    S: StateSource + Clone + 'static,
    O: OpFactory,
{
    #[must_use]
    pub fn new(source: S, ops: O) -> Self {
        Self {
            source,
            ops,
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
        }
    }

    /// Threshold handed to every scene built by this factory.
    #[must_use]
    pub fn with_failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.failure_warn_threshold = threshold;
        self
    }
}

impl<S, O> SceneFactory for ConditionSceneFactory<S, O>
where
    S: StateSource + Clone + 'static,
    O: OpFactory,
{
    fn build(&self, config: &SceneConfig) -> Result<SceneHandler, DispatchError> {
        config.validate()?;
        let interval = config.interval()?;

        let mut handlers: Vec<Box<dyn StateHandler>> = Vec::with_capacity(config.handlers.len());
        for handler_config in &config.handlers {
            match ConditionHandler::from_config(handler_config, self.source.clone(), &self.ops) {
                Ok(handler) => handlers.push(Box::new(handler)),
                Err(err) => {
                    tracing::warn!(
                        scene = %config.name,
                        handler = %handler_config.name,
                        %err,
                        "failed to build handler, releasing the ones already built"
                    );
                    for built in &mut handlers {
                        if let Err(dispose_err) = built.dispose() {
                            tracing::warn!(%dispose_err, "handler disposal failed");
                        }
                    }
                    return Err(err);
                }
            }
        }

        let scene = SceneHandler::new(config.name.clone(), interval, handlers)?
            .with_mode(config.evaluation)
            .with_failure_warn_threshold(self.failure_warn_threshold);
        tracing::debug!(
            scene = %config.name,
            handlers = config.handlers.len(),
            ?interval,
            mode = ?config.evaluation,
            "scene built"
        );
        Ok(scene)
    }
}
