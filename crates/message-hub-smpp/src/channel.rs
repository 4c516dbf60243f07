//! Public entry point for the SMPP channel: acquire a pooled, bound
//! connection, submit, classify the response's command status, and record
//! a DLR correlation on success.

use crate::dlr::{DlrCorrelator, DlrHook};
use crate::pdu::{CommandStatus, PduBody, ShortMessage};
use crate::pool::SmppPool;
use dashmap::DashMap;
use message_hub_domain::SmppChannelConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug)]
pub struct SmppSendOutcome {
    pub external_message_id: Option<String>,
}

/// Whether a send failure should be retried by the delivery worker.
#[derive(Debug, Clone)]
pub enum SmppSendError {
    Transient(String),
    Permanent(String),
}

impl std::fmt::Display for SmppSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmppSendError::Transient(msg) | SmppSendError::Permanent(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SmppSendError {}

/// Owns one connection pool and one DLR correlator per tenant; constructed
/// once at startup and shared across the delivery worker's tasks.
#[derive(Default)]
pub struct SmppChannel {
    pools: DashMap<String, Arc<SmppPool>>,
    correlators: DashMap<String, Arc<DlrCorrelator>>,
    throttle_counters: DashMap<String, AtomicU32>,
    dlr_hook: Mutex<Option<DlrHook>>,
}

impl SmppChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback run whenever a `deliver_sm` receipt resolves
    /// a correlation. Must be set before the first `send` for a tenant,
    /// since it's captured when that tenant's pool (and its connections)
    /// are first created.
    pub fn set_dlr_hook(&self, hook: DlrHook) {
        *self.dlr_hook.lock().unwrap() = Some(hook);
    }

    pub fn correlator_for(&self, tenant_key: &str) -> Arc<DlrCorrelator> {
        Arc::clone(
            self.correlators
                .entry(tenant_key.to_string())
                .or_insert_with(|| Arc::new(DlrCorrelator::new())),
        )
    }

    async fn pool_for(&self, tenant_key: &str, config: &SmppChannelConfig) -> Result<Arc<SmppPool>, SmppSendError> {
        if let Some(pool) = self.pools.get(tenant_key) {
            return Ok(Arc::clone(&pool));
        }
        let correlator = self.correlator_for(tenant_key);
        let dlr_hook = self.dlr_hook.lock().unwrap().clone();
        let pool = SmppPool::new(config.clone(), correlator, dlr_hook)
            .await
            .map_err(|e| SmppSendError::Transient(format!("SMPP: pool init failed: {e}")))?;
        let pool = Arc::new(pool);
        let pool = Arc::clone(
            self.pools
                .entry(tenant_key.to_string())
                .or_insert(pool),
        );
        Ok(pool)
    }

    pub async fn send(
        &self,
        tenant_key: &str,
        config: &SmppChannelConfig,
        message_id: Uuid,
        recipient: &str,
        content: &str,
    ) -> Result<SmppSendOutcome, SmppSendError> {
        let pool = self.pool_for(tenant_key, config).await?;

        pool.rate_limiter()
            .acquire()
            .await
            .map_err(|e| SmppSendError::Transient(format!("SMPP: send rate exceeded: {e}")))?;

        let mut checkout = pool
            .acquire()
            .await
            .map_err(|e| SmppSendError::Transient(format!("SMPP: {e}")))?;

        let dlr_mask = if config.delivery_receipt.enabled {
            config.delivery_receipt.dlr_mask
        } else {
            0
        };
        let body = ShortMessage::outbound(
            config.source_address.clone(),
            recipient.to_string(),
            content.as_bytes(),
        )
        .with_registered_delivery(dlr_mask);

        let result = checkout.send_and_await(PduBody::SubmitSm(body)).await;

        match result {
            Ok(pdu) => {
                if pdu.command_status.is_ok() {
                    self.reset_throttle(tenant_key);
                    let external_message_id = match pdu.body {
                        PduBody::SubmitSmResp(resp) => Some(resp.message_id),
                        _ => None,
                    };
                    if let Some(external_id) = external_message_id.clone() {
                        self.correlator_for(tenant_key).store_correlation(
                            external_id,
                            message_id.to_string(),
                            chrono::Utc::now(),
                        );
                    }
                    Ok(SmppSendOutcome { external_message_id })
                } else if pdu.command_status.is_throttled() {
                    let n = self.bump_throttle(tenant_key);
                    let backoff_secs = 2u64.saturating_pow(n).min(60);
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    Err(SmppSendError::Transient(format!("SMPP throttled: {}", pdu.command_status)))
                } else if pdu.command_status.is_transient() {
                    Err(SmppSendError::Transient(format!("SMPP: {}", pdu.command_status)))
                } else {
                    Err(SmppSendError::Permanent(format!("SMPP: {}", pdu.command_status)))
                }
            }
            Err(err) => Err(SmppSendError::Transient(format!("SMPP: {err}"))),
        }
        // `checkout` drops here regardless of outcome, returning the
        // connection to the pool (or disposing it if no longer bound).
    }

    fn bump_throttle(&self, tenant_key: &str) -> u32 {
        self.throttle_counters
            .entry(tenant_key.to_string())
            .or_insert_with(|| AtomicU32::new(0))
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    fn reset_throttle(&self, tenant_key: &str) {
        if let Some(counter) = self.throttle_counters.get(tenant_key) {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Sweeps every tenant's DLR correlator. Intended to run hourly.
    pub fn sweep_dlr_correlations(&self, retention: Duration) {
        let now = chrono::Utc::now();
        for entry in self.correlators.iter() {
            entry.value().sweep(now, retention);
        }
    }
}

/// Maps a raw command status to the non-OK classification rules in one
/// place, independent of any pool or connection — handy to test without
/// real I/O.
pub fn classify(status: CommandStatus) -> Option<SmppSendError> {
    if status.is_ok() {
        None
    } else if status.is_transient() {
        Some(SmppSendError::Transient(format!("SMPP: {status}")))
    } else {
        Some(SmppSendError::Permanent(format!("SMPP: {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_classifies_as_none() {
        assert!(classify(CommandStatus::OK).is_none());
    }

    #[test]
    fn transient_statuses_classify_as_transient() {
        for status in [CommandStatus::MSGQFUL, CommandStatus::SUBMITFAIL, CommandStatus::SYSERR] {
            match classify(status) {
                Some(SmppSendError::Transient(_)) => {}
                other => panic!("expected transient, got {other:?}"),
            }
        }
    }

    #[test]
    fn other_non_ok_status_classifies_as_permanent() {
        let status = CommandStatus(0x0000_0003);
        match classify(status) {
            Some(SmppSendError::Permanent(msg)) => assert!(msg.contains("SMPP:")),
            other => panic!("expected permanent, got {other:?}"),
        }
    }

    #[test]
    fn bump_and_reset_throttle_counter_round_trips() {
        let channel = SmppChannel::new();
        assert_eq!(channel.bump_throttle("tenant-a"), 1);
        assert_eq!(channel.bump_throttle("tenant-a"), 2);
        channel.reset_throttle("tenant-a");
        assert_eq!(channel.bump_throttle("tenant-a"), 1);
    }
}
