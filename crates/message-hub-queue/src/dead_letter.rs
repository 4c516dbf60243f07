//! Sink for events that exhausted their redelivery budget.

use futures::future::BoxFuture;
use message_hub_domain::MessageQueuedEvent;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub event: MessageQueuedEvent,
    pub delivery_attempts: u32,
}

/// Invoked whenever an event lands in the sink, so a caller can mark the
/// corresponding repository row `Failed` instead of leaving it stuck at
/// `Processing` forever.
pub type DeadLetterHook =
    Arc<dyn Fn(MessageQueuedEvent, u32) -> BoxFuture<'static, ()> + Send + Sync>;

/// In-memory dead-letter sink. Bounded only by process memory; intended for
/// local development and as the landing spot for events the in-process
/// transport could not deliver.
#[derive(Default)]
pub struct DeadLetterSink {
    entries: Mutex<Vec<DeadLetterEntry>>,
    hook: Mutex<Option<DeadLetterHook>>,
}

impl DeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback run on every `record`. Replaces any
    /// previously registered hook.
    pub fn set_hook(&self, hook: DeadLetterHook) {
        *self.hook.lock().unwrap() = Some(hook);
    }

    pub async fn record(&self, event: MessageQueuedEvent, delivery_attempts: u32) {
        let hook = self.hook.lock().unwrap().clone();
        self.entries.lock().unwrap().push(DeadLetterEntry {
            event: event.clone(),
            delivery_attempts,
        });
        if let Some(hook) = hook {
            hook(event, delivery_attempts).await;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn drain(&self) -> Vec<DeadLetterEntry> {
        std::mem::take(&mut self.entries.lock().unwrap())
    }
}
