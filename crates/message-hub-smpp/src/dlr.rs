//! Correlates outbound `submit_sm` responses with inbound `deliver_sm`
//! delivery receipts, keyed on the provider's `externalMessageId`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::BoxFuture;
use message_hub_domain::MessageStatus;
use std::sync::Arc;
use std::time::Duration;

/// Invoked with `(internal_message_id, status)` whenever a `deliver_sm`
/// receipt resolves a correlation, so a caller can mark the corresponding
/// repository row without this crate depending on the repository crate.
pub type DlrHook = Arc<dyn Fn(String, MessageStatus) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
struct Correlation {
    internal_message_id: String,
    stored_at: DateTime<Utc>,
}

/// A parsed delivery receipt body, e.g.
/// `id:1234 sub:001 dlvrd:001 submit date:2601281200 done date:2601281201 stat:DELIVRD err:000 text:...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: String,
    pub stat: String,
    pub err: Option<String>,
    pub submit_date: Option<String>,
    pub done_date: Option<String>,
    pub sub: Option<String>,
    pub dlvrd: Option<String>,
}

impl DeliveryReceipt {
    /// Parses the `key:value` fields out of a `deliver_sm` short message
    /// body. Unknown fields are ignored; `id` and `stat` are the only ones
    /// required for a usable receipt.
    pub fn parse(text: &str) -> Option<Self> {
        let mut id = None;
        let mut stat = None;
        let mut err = None;
        let mut submit_date = None;
        let mut done_date = None;
        let mut sub = None;
        let mut dlvrd = None;

        for field in ["id", "sub", "dlvrd", "submit date", "done date", "stat", "err"] {
            if let Some(value) = extract_field(text, field) {
                match field {
                    "id" => id = Some(value),
                    "sub" => sub = Some(value),
                    "dlvrd" => dlvrd = Some(value),
                    "submit date" => submit_date = Some(value),
                    "done date" => done_date = Some(value),
                    "stat" => stat = Some(value),
                    "err" => err = Some(value),
                    _ => unreachable!(),
                }
            }
        }

        Some(Self {
            id: id?,
            stat: stat?,
            err,
            submit_date,
            done_date,
            sub,
            dlvrd,
        })
    }

    /// Maps `stat:` to the hub's status vocabulary. Returns `None` when the
    /// receipt shouldn't transition the message at all (e.g. an
    /// intermediate `ACCEPTD` or an unrecognized status).
    pub fn terminal_status(&self) -> Option<MessageStatus> {
        match self.stat.as_str() {
            "DELIVRD" => Some(MessageStatus::Delivered),
            "EXPIRED" | "DELETED" | "UNDELIV" | "REJECTD" => Some(MessageStatus::Failed),
            _ => None,
        }
    }
}

/// Fields are whitespace-delimited `key:value` pairs; values end at the
/// next space (dates and codes never contain one), found by a direct
/// substring search rather than a tokenizer since the format is fixed.
fn extract_field(text: &str, key: &str) -> Option<String> {
    let prefix = format!("{key}:");
    let start = text.find(&prefix)? + prefix.len();
    let rest = &text[start..];
    let end = rest.find(' ').unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Per-tenant correlation table between the hub's internal message id and
/// the SMSC's `externalMessageId`, with a background sweep to bound memory.
#[derive(Default)]
pub struct DlrCorrelator {
    by_external_id: DashMap<String, Correlation>,
}

impl DlrCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_correlation(&self, external_message_id: String, internal_message_id: String, now: DateTime<Utc>) {
        self.by_external_id.insert(
            external_message_id,
            Correlation {
                internal_message_id,
                stored_at: now,
            },
        );
    }

    /// Looks up the internal message id for a receipt and, if it maps to a
    /// terminal status, returns `(internal_message_id, status)`. The
    /// correlation is consumed on a terminal match; non-terminal receipts
    /// (e.g. `ACCEPTD`) leave it in place for a later final receipt.
    pub fn process_receipt(&self, receipt: &DeliveryReceipt) -> Option<(String, MessageStatus)> {
        let status = receipt.terminal_status()?;
        let (_, correlation) = self.by_external_id.remove(&receipt.id)?;
        Some((correlation.internal_message_id, status))
    }

    /// Drops correlations older than `retention`. Meant to run on an
    /// hourly tick; unmatched receipts older than the retention window are
    /// assumed lost and no longer worth holding onto.
    pub fn sweep(&self, now: DateTime<Utc>, retention: Duration) {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
        self.by_external_id
            .retain(|_, correlation| now - correlation.stored_at < retention);
    }

    pub fn len(&self) -> usize {
        self.by_external_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_external_id.is_empty()
    }
}
