//! Wallet encryption status and the cached status store it is read from.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

/// Topic the node's wallet state is cached under.
pub const WALLET_INFO_TOPIC: &str = "getwalletinfo";
/// Field of [`WALLET_INFO_TOPIC`] carrying the encryption status.
pub const ENCRYPTION_STATUS_FIELD: &str = "encryptionstatus";

/// Lock state as reported by the node's `getwalletinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EncryptionStatus {
    Locked,
    UnlockedStakingOnly,
    UnlockedFull,
    Unencrypted,
    /// Any value the node reports that this crate does not know about.
    Other(String),
}

impl EncryptionStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            EncryptionStatus::Locked => "Locked",
            EncryptionStatus::UnlockedStakingOnly => "Unlocked, staking only",
            EncryptionStatus::UnlockedFull => "Unlocked",
            EncryptionStatus::Unencrypted => "Unencrypted",
            EncryptionStatus::Other(s) => s,
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "Locked" => EncryptionStatus::Locked,
            "Unlocked, staking only" => EncryptionStatus::UnlockedStakingOnly,
            "Unlocked" => EncryptionStatus::UnlockedFull,
            "Unencrypted" => EncryptionStatus::Unencrypted,
            other => EncryptionStatus::Other(other.to_string()),
        }
    }

    /// Interpret a JSON field value. Non-string values are kept opaque.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::from_wire(s),
            other => EncryptionStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for EncryptionStatus {
    fn from(s: String) -> Self {
        Self::from_wire(&s)
    }
}

impl From<EncryptionStatus> for String {
    fn from(status: EncryptionStatus) -> Self {
        status.as_wire().to_string()
    }
}

impl fmt::Display for EncryptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Push-based source of node state, keyed by RPC topic.
pub trait StatusSource: Send + Sync {
    /// Stream of `field` values for `topic`. The current value (if any) is
    /// delivered first, followed by every subsequently published value.
    fn observe(&self, topic: &str, field: &str) -> BoxStream<'static, Value>;

    /// Last known snapshot of `topic`.
    fn get(&self, topic: &str) -> Option<Value>;

    /// Cached value of `field` within the last snapshot of `topic`.
    fn get_field(&self, topic: &str, field: &str) -> Option<Value> {
        self.get(topic).and_then(|snapshot| snapshot.get(field).cloned())
    }
}

/// In-memory [`StatusSource`] backed by one `watch` channel per topic.
///
/// Every `publish` wakes observers, even when the value is unchanged. Publishes
/// made faster than an observer polls collapse into the latest one.
#[derive(Default)]
pub struct StatusCache {
    topics: Mutex<HashMap<String, watch::Sender<Option<Value>>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new snapshot for `topic` and notify its observers.
    pub fn publish(&self, topic: &str, value: Value) {
        self.with_sender(topic, |tx| {
            tx.send_replace(Some(value));
        });
    }

    fn with_sender<T>(&self, topic: &str, f: impl FnOnce(&watch::Sender<Option<Value>>) -> T) -> T {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        let tx = topics
            .entry(topic.to_string())
            .or_insert_with(|| watch::channel(None).0);
        f(tx)
    }
}

impl StatusSource for StatusCache {
    fn observe(&self, topic: &str, field: &str) -> BoxStream<'static, Value> {
        // The current snapshot is captured here, not on first poll, so a
        // publish racing with the first poll is still seen as a change.
        let (rx, current) = self.with_sender(topic, |tx| {
            let mut rx = tx.subscribe();
            let current = rx.borrow_and_update().clone();
            (rx, current)
        });
        let field = field.to_string();

        let changes = stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, rx))
        });

        stream::once(futures::future::ready(current))
            .chain(changes)
            .filter_map(move |snapshot| {
                let value = snapshot.and_then(|s| s.get(&field).cloned());
                futures::future::ready(value)
            })
            .boxed()
    }

    fn get(&self, topic: &str) -> Option<Value> {
        self.with_sender(topic, |tx| tx.borrow().clone())
    }
}
