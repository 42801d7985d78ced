//! One-shot watcher for the wallet's encryption status.

use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::{DestroyedFlag, SessionEvent};
use crate::status::EncryptionStatus;

/// Reports the first status delivered *after* subscription, exactly once.
///
/// The value present at subscription time is discarded. The teardown flag is
/// checked on every delivery; once it is set the watcher stops without
/// reporting. The subscription is dropped as soon as the watcher stops.
pub struct StateChangeWatcher {
    handle: JoinHandle<()>,
}

impl StateChangeWatcher {
    pub fn spawn(
        stream: BoxStream<'static, Value>,
        destroyed: DestroyedFlag,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let handle = tokio::spawn(watch_once(stream, destroyed, events));
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn into_handle(self) -> JoinHandle<()> {
        self.handle
    }
}

async fn watch_once(
    mut stream: BoxStream<'static, Value>,
    destroyed: DestroyedFlag,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut skipped_initial = false;
    while let Some(value) = stream.next().await {
        if destroyed.is_set() {
            tracing::debug!("session gone, dropping status watcher");
            break;
        }
        if !skipped_initial {
            skipped_initial = true;
            continue;
        }

        let status = EncryptionStatus::from_value(&value);
        tracing::info!(%status, "wallet encryption status reported");
        // Unsubscribe before notifying.
        drop(stream);
        let _ = events.send(SessionEvent::UnlockConfirmed { status });
        return;
    }
}
