use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::{CommandRouter, HandleOutcome};
use crate::core::models::MentionEvent;

/// Runs router invocations as tokio tasks, at most `max_concurrent` at a time.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<CommandRouter>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(router: Arc<CommandRouter>, max_concurrent: usize) -> Self {
        Self {
            router,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Starts handling `event` in its own task. The task waits for a permit first.
    pub fn spawn(&self, event: MentionEvent) -> JoinHandle<Option<HandleOutcome>> {
        let router = Arc::clone(&self.router);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!(event_id = %event.event_id, "Dispatcher closed, dropping event");
                return None;
            };
            Some(router.handle(&event).await)
        })
    }

    /// Handles `event` and waits for it. A panicking invocation is logged and
    /// yields `None`.
    pub async fn dispatch(&self, event: MentionEvent) -> Option<HandleOutcome> {
        let event_id = event.event_id.clone();
        match self.spawn(event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(event_id = %event_id, error = %e, "Pipeline task aborted");
                None
            }
        }
    }
}
