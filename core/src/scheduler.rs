//! Deferred post-unlock action: either fall back to a staking-only unlock or
//! simply wipe the session secret.
//!
//! The secret is wiped late on purpose. With no fallback it lingers for the
//! reset delay so the in-flight unlock call can still consume it; with a
//! staking fallback it must survive until the re-arm is issued.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use zeroize::Zeroizing;

use crate::rpc::{call_detached, RpcCaller};
use crate::secret::SecretBuffer;
use crate::status::EncryptionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Re-issue an indefinite staking-only unlock, then wipe the secret.
    RestakeThenClear,
    /// Only wipe the secret.
    Clear,
}

/// A deferred action together with the state it was armed with.
pub struct PendingFallback {
    pub armed_at: Instant,
    pub delay: Duration,
    pub action: DeferredAction,
    /// Mode the re-arm unlocks with; only meaningful for `RestakeThenClear`.
    pub stake_only: bool,
    secret_snapshot: Zeroizing<String>,
}

impl PendingFallback {
    pub fn fires_at(&self) -> Instant {
        // Saturate absurd windows to roughly thirty years out.
        self.armed_at
            .checked_add(self.delay)
            .unwrap_or_else(|| self.armed_at + Duration::from_secs(86_400 * 365 * 30))
    }
}

impl std::fmt::Debug for PendingFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFallback")
            .field("delay", &self.delay)
            .field("action", &self.action)
            .field("stake_only", &self.stake_only)
            .finish_non_exhaustive()
    }
}

pub struct TimeoutScheduler {
    rpc: Arc<dyn RpcCaller>,
    reset_delay: Duration,
    fallback_grace: Duration,
}

impl TimeoutScheduler {
    pub fn new(rpc: Arc<dyn RpcCaller>, reset_delay: Duration, fallback_grace: Duration) -> Self {
        Self {
            rpc,
            reset_delay,
            fallback_grace,
        }
    }

    /// Choose the deferred action from the status cached *before* the unlock.
    ///
    /// A wallet that was staking going in gets its staking unlock restored
    /// once the window (plus grace) elapses; anything else only has its
    /// secret wiped after the reset delay.
    pub fn plan(
        &self,
        cached: Option<&EncryptionStatus>,
        timeout_secs: u64,
        secret: &SecretBuffer,
    ) -> PendingFallback {
        let armed_at = Instant::now();
        match cached {
            Some(EncryptionStatus::UnlockedStakingOnly) => PendingFallback {
                armed_at,
                delay: Duration::from_secs(timeout_secs).saturating_add(self.fallback_grace),
                action: DeferredAction::RestakeThenClear,
                stake_only: true,
                secret_snapshot: secret.snapshot(),
            },
            _ => PendingFallback {
                armed_at,
                delay: self.reset_delay,
                action: DeferredAction::Clear,
                stake_only: false,
                secret_snapshot: Zeroizing::new(String::new()),
            },
        }
    }

    /// Spawn the deferred action. Earlier arms are left running.
    pub fn arm(&self, pending: PendingFallback, buffer: SecretBuffer) -> JoinHandle<()> {
        tracing::debug!(
            action = ?pending.action,
            delay_ms = pending.delay.as_millis() as u64,
            "arming deferred unlock action"
        );
        let rpc = self.rpc.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(pending.fires_at()).await;
            if pending.action == DeferredAction::RestakeThenClear {
                tracing::info!("unlock window elapsed, restoring staking-only unlock");
                call_detached(
                    rpc,
                    "encryptwallet",
                    vec![
                        json!(pending.secret_snapshot.as_str()),
                        json!(0),
                        json!(pending.stake_only),
                    ],
                );
            }
            buffer.clear();
            tracing::debug!("session secret cleared");
        })
    }
}
