//! Notification Emitter.
//!
//! Publishes are fire-and-forget from the workflow's point of view: callers
//! log a failed publish and carry on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Default topic consumed by the ticket e-mail service.
pub const DEFAULT_NOTIFY_TOPIC: &str = "concert-send-email-pdf";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Publish to {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Notifier configuration error: {0}")]
    Config(String),
}

/// Message bus publisher.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), NotifyError>;
}

/// A message captured by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Records published messages. Used in tests and when no broker is configured.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    messages: Arc<RwLock<Vec<PublishedMessage>>>,
    fail_on_publish: Arc<AtomicBool>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .read()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), NotifyError> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(NotifyError::PublishFailed {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }
        let mut messages = self.messages.write().map_err(|_| NotifyError::PublishFailed {
            topic: topic.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        messages.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaNotifier;

#[cfg(feature = "kafka")]
mod kafka {
    use std::time::Duration;

    use async_trait::async_trait;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;

    use super::{Notifier, NotifyError};

    /// Kafka-backed notifier.
    #[derive(Clone)]
    pub struct KafkaNotifier {
        producer: FutureProducer,
        timeout: Duration,
    }

    impl KafkaNotifier {
        /// Creates a producer for `brokers` (comma-separated `host:port` list).
        pub fn new(brokers: &str) -> Result<Self, NotifyError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .set("acks", "1")
                .create()
                .map_err(|e| NotifyError::Config(format!("Failed to create producer: {e}")))?;

            tracing::info!(%brokers, "kafka notifier created");
            Ok(Self {
                producer,
                timeout: Duration::from_secs(5),
            })
        }
    }

    #[async_trait]
    impl Notifier for KafkaNotifier {
        async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), NotifyError> {
            let record: FutureRecord<'_, (), [u8]> = FutureRecord::to(topic).payload(payload);
            match self.producer.send(record, Timeout::After(self.timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(%topic, partition, offset, "notification published");
                    Ok(())
                }
                Err((e, _)) => Err(NotifyError::PublishFailed {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
    }
}
