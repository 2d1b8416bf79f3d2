//! Detached persistence of generated bundles.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use phrasal_core::LearningBundle;

use crate::store::ExpressionStore;

/// Handle to a background persist.
///
/// Dropping it leaves the task running. The outcome is only logged.
#[derive(Debug)]
pub struct PersistTask {
    expression: String,
    handle: JoinHandle<bool>,
}

impl PersistTask {
    /// Spawn a persist of `bundle` on the current runtime.
    pub fn spawn(store: Arc<dyn ExpressionStore>, bundle: LearningBundle) -> Self {
        let expression = bundle.expression.clone();
        let handle = tokio::spawn(async move {
            match store.persist(&bundle).await {
                Ok(()) => {
                    debug!(expression = %bundle.expression, "Bundle persisted");
                    true
                }
                Err(e) => {
                    warn!(expression = %bundle.expression, error = %e, "Bundle persist failed");
                    false
                }
            }
        });
        Self { expression, handle }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Wait for the task. Returns whether the bundle was stored.
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(expression = %self.expression, error = %e, "Persist task aborted");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_persist_task_stores_bundle() {
        let store = Arc::new(MemoryStore::new());
        let bundle = LearningBundle {
            expression: "hang on".into(),
            ..Default::default()
        };

        let task = PersistTask::spawn(store.clone(), bundle);
        assert_eq!(task.expression(), "hang on");
        assert!(task.wait().await);
        assert!(store.get("hang on").is_some());
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported_not_raised() {
        let store = Arc::new(MemoryStore::new().with_failing_persist(true));
        let task = PersistTask::spawn(store.clone(), LearningBundle::default());

        assert!(!task.wait().await);
        assert_eq!(store.persist_calls(), 1);
    }
}
