//! Single-node queue transport backed by a bounded `tokio::sync::mpsc`
//! channel, with an explicit redelivery path: a handler reporting
//! [`HandlerOutcome::Retry`] is re-enqueued up to `max_delivery_attempts`
//! times before landing in the [`DeadLetterSink`].

use crate::{DeadLetterSink, HandlerOutcome, QueueError, QueueHandler, QueueTransport};
use async_trait::async_trait;
use message_hub_domain::MessageQueuedEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct Delivery {
    event: MessageQueuedEvent,
    attempts: u32,
}

/// In-process queue transport. Single-node by construction: the channel
/// lives in this process's memory and is lost on restart.
pub struct InProcessQueueTransport {
    sender: mpsc::Sender<Delivery>,
    receiver: Mutex<Option<mpsc::Receiver<Delivery>>>,
    dead_letter: Arc<DeadLetterSink>,
    max_delivery_attempts: u32,
}

impl InProcessQueueTransport {
    pub fn new(capacity: usize, max_delivery_attempts: u32) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            dead_letter: Arc::new(DeadLetterSink::new()),
            max_delivery_attempts,
        }
    }

    pub fn dead_letter(&self) -> Arc<DeadLetterSink> {
        Arc::clone(&self.dead_letter)
    }
}

#[async_trait]
impl QueueTransport for InProcessQueueTransport {
    async fn publish(&self, event: MessageQueuedEvent) -> Result<(), QueueError> {
        self.sender
            .send(Delivery { event, attempts: 0 })
            .await
            .map_err(|_| QueueError::Closed)
    }

    fn subscribe(&self, handler: QueueHandler) {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .expect("subscribe called more than once on InProcessQueueTransport");
        let resender = self.sender.clone();
        let dead_letter = Arc::clone(&self.dead_letter);
        let max_attempts = self.max_delivery_attempts;

        tokio::spawn(async move {
            while let Some(delivery) = receiver.recv().await {
                let outcome = handler(delivery.event.clone()).await;
                match outcome {
                    HandlerOutcome::Processed => {}
                    HandlerOutcome::Drop => {
                        dead_letter.record(delivery.event, delivery.attempts + 1).await;
                    }
                    HandlerOutcome::Retry => {
                        let attempts = delivery.attempts + 1;
                        if attempts >= max_attempts {
                            dead_letter.record(delivery.event, attempts).await;
                        } else {
                            let _ = resender
                                .send(Delivery {
                                    event: delivery.event,
                                    attempts,
                                })
                                .await;
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use message_hub_domain::ChannelType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn sample_event() -> MessageQueuedEvent {
        let message = message_hub_domain::Message::new_queued(
            "tenant-a",
            "hi",
            "+1555",
            ChannelType::Http,
        );
        MessageQueuedEvent::from(&message)
    }

    #[tokio::test]
    async fn processed_events_are_not_redelivered() {
        let transport = InProcessQueueTransport::new(8, 3);
        let calls = Arc::new(AtomicUsize::new(0));
        let handler_calls = Arc::clone(&calls);

        transport.subscribe(Arc::new(move |_event| {
            let calls = Arc::clone(&handler_calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                HandlerOutcome::Processed
            })
        }));

        transport.publish(sample_event()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_outcome_redelivers_until_attempt_budget_exhausted() {
        let transport = InProcessQueueTransport::new(8, 3);
        let dead_letter = transport.dead_letter();
        let calls = Arc::new(AtomicUsize::new(0));
        let handler_calls = Arc::clone(&calls);

        transport.subscribe(Arc::new(move |_event| {
            let calls = Arc::clone(&handler_calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                HandlerOutcome::Retry
            })
        }));

        transport.publish(sample_event()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(dead_letter.len(), 1);
    }

    #[tokio::test]
    async fn drop_outcome_lands_directly_in_dead_letter() {
        let transport = InProcessQueueTransport::new(8, 5);
        let dead_letter = transport.dead_letter();

        transport.subscribe(Arc::new(|_event| {
            Box::pin(async move { HandlerOutcome::Drop })
        }));

        transport.publish(sample_event()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dead_letter.len(), 1);
    }

    /// The dead-letter hook is how a caller (the binary wiring the queue to
    /// a repository) learns an event needs its row marked `Failed`. Both the
    /// `Drop` path and the retry-exhaustion path must invoke it.
    #[tokio::test]
    async fn dead_letter_hook_fires_on_drop_and_on_retry_exhaustion() {
        let transport = InProcessQueueTransport::new(8, 2);
        let dead_letter = transport.dead_letter();
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_calls_clone = Arc::clone(&hook_calls);
        dead_letter.set_hook(Arc::new(move |_event, _attempts| {
            let hook_calls = Arc::clone(&hook_calls_clone);
            Box::pin(async move {
                hook_calls.fetch_add(1, Ordering::SeqCst);
            })
        }));

        transport.subscribe(Arc::new(|_event| {
            Box::pin(async move { HandlerOutcome::Drop })
        }));

        transport.publish(sample_event()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dead_letter.len(), 1);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    }
}
