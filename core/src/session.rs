//! Per-dialog unlock session state and the events it reports to its owner.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zeroize::Zeroizing;

use crate::secret::SecretBuffer;
use crate::status::EncryptionStatus;

/// Events delivered to the session owner.
#[derive(Clone, PartialEq)]
pub enum SessionEvent {
    /// Raw passphrase handed back to the owner, e.g. for initial wallet setup.
    PasswordSubmitted {
        secret: Zeroizing<String>,
        stake_only: bool,
    },
    /// The node reported a new encryption status after a successful unlock.
    UnlockConfirmed { status: EncryptionStatus },
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::PasswordSubmitted { stake_only, .. } => f
                .debug_struct("PasswordSubmitted")
                .field("stake_only", stake_only)
                .finish_non_exhaustive(),
            SessionEvent::UnlockConfirmed { status } => f
                .debug_struct("UnlockConfirmed")
                .field("status", status)
                .finish(),
        }
    }
}

/// Teardown marker shared with the tasks a session spawns.
#[derive(Debug, Clone, Default)]
pub struct DestroyedFlag(Arc<AtomicBool>);

impl DestroyedFlag {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One unlock session: the secret, its armed deferred actions, and the
/// channel events are reported on.
///
/// Destroying the session (explicitly or by dropping it) silences any pending
/// status watcher. Armed deferred actions are *not* cancelled and still fire.
pub struct Session {
    secret: SecretBuffer,
    destroyed: DestroyedFlag,
    events: mpsc::UnboundedSender<SessionEvent>,
    armed: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            secret: SecretBuffer::default(),
            destroyed: DestroyedFlag::default(),
            events,
            armed: Mutex::new(Vec::new()),
        };
        (session, rx)
    }

    pub fn secret(&self) -> &SecretBuffer {
        &self.secret
    }

    pub fn destroy(&self) {
        if !self.destroyed.is_set() {
            tracing::debug!("unlock session destroyed");
        }
        self.destroyed.set();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.is_set()
    }

    pub fn destroyed_flag(&self) -> DestroyedFlag {
        self.destroyed.clone()
    }

    pub fn event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.events.clone()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // The owner may have stopped listening; nothing to do then.
        let _ = self.events.send(event);
    }

    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        armed.retain(|h| !h.is_finished());
        armed.push(handle);
    }

    /// Number of deferred actions armed so far that have not yet run.
    pub fn pending_actions(&self) -> usize {
        self.armed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait until every deferred action armed so far has run.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.armed.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "deferred unlock action aborted");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destroy();
    }
}
