use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::config::UnlockConfig;
use crate::error::AuthError;
use crate::rpc::RpcCaller;
use crate::scheduler::TimeoutScheduler;
use crate::security::SecurityBackend;
use crate::session::{Session, SessionEvent};
use crate::status::{EncryptionStatus, StatusSource};
use crate::watcher::StateChangeWatcher;

/// What the owner of a session asks for.
#[derive(Clone)]
pub struct UnlockRequest {
    pub secret: Zeroizing<String>,
    pub stake_only: bool,
    /// Unlock window in seconds; `0` keeps the wallet unlocked until locked manually.
    pub timeout_secs: u64,
    /// Hand the raw passphrase back as [`SessionEvent::PasswordSubmitted`].
    pub emit_password: bool,
    /// Lock and re-unlock the wallet on the backend.
    pub emit_unlock: bool,
}

impl UnlockRequest {
    /// A backend unlock request that does not echo the passphrase.
    pub fn new(secret: &str, stake_only: bool, timeout_secs: u64) -> Self {
        Self {
            secret: Zeroizing::new(secret.to_owned()),
            stake_only,
            timeout_secs,
            emit_password: false,
            emit_unlock: true,
        }
    }

    pub fn with_emit_password(mut self, emit: bool) -> Self {
        self.emit_password = emit;
        self
    }

    pub fn with_emit_unlock(mut self, emit: bool) -> Self {
        self.emit_unlock = emit;
        self
    }
}

impl fmt::Debug for UnlockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockRequest")
            .field("stake_only", &self.stake_only)
            .field("timeout_secs", &self.timeout_secs)
            .field("emit_password", &self.emit_password)
            .field("emit_unlock", &self.emit_unlock)
            .finish_non_exhaustive()
    }
}

/// Timeout actually sent to the backend. Staking unlocks are always
/// requested as indefinite; the session window only drives the fallback.
pub fn effective_timeout(stake_only: bool, timeout_secs: u64) -> u64 {
    if stake_only {
        0
    } else {
        timeout_secs
    }
}

/// Drives a wallet through lock → unlock and arms the follow-up actions.
pub struct UnlockRequestCoordinator {
    backend: Arc<dyn SecurityBackend>,
    status: Arc<dyn StatusSource>,
    scheduler: TimeoutScheduler,
    config: UnlockConfig,
}

impl UnlockRequestCoordinator {
    pub fn new(
        backend: Arc<dyn SecurityBackend>,
        rpc: Arc<dyn RpcCaller>,
        status: Arc<dyn StatusSource>,
        config: UnlockConfig,
    ) -> Self {
        let scheduler = TimeoutScheduler::new(rpc, config.reset_delay(), config.fallback_grace());
        Self {
            backend,
            status,
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &UnlockConfig {
        &self.config
    }

    /// Status cached before any call of this flow is made.
    pub fn cached_status(&self) -> Option<EncryptionStatus> {
        self.status
            .get_field(&self.config.status_topic, &self.config.status_field)
            .map(|v| EncryptionStatus::from_value(&v))
    }

    /// Process one request within `session`.
    ///
    /// Resolves once the backend unlock has resolved. The deferred action and
    /// the status watcher keep running afterwards. Failures are not retried.
    pub async fn unlock(&self, session: &Session, request: UnlockRequest) -> Result<(), AuthError> {
        let timeout_secs = self.config.request_timeout(Some(request.timeout_secs));

        if request.emit_password {
            session.emit(SessionEvent::PasswordSubmitted {
                secret: request.secret.clone(),
                stake_only: request.stake_only,
            });
        }

        if request.emit_unlock {
            self.unlock_backend(session, &request.secret, request.stake_only, timeout_secs)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "unlock failed - wrong password?"))?;
        }
        Ok(())
    }

    async fn unlock_backend(
        &self,
        session: &Session,
        secret: &str,
        stake_only: bool,
        timeout_secs: u64,
    ) -> Result<(), AuthError> {
        self.backend.lock().await?;

        // Only held once a deferred action is armed to clear it.
        session.secret().set(secret);

        // Policy follows the state the wallet was in going into this request.
        let cached = self.cached_status();
        let pending = self
            .scheduler
            .plan(cached.as_ref(), timeout_secs, session.secret());
        session.track(self.scheduler.arm(pending, session.secret().clone()));

        let effective = effective_timeout(stake_only, timeout_secs);
        self.backend.unlock(secret, effective, stake_only).await?;
        tracing::info!(stake_only, timeout_secs = effective, "wallet unlocked");

        let stream = self
            .status
            .observe(&self.config.status_topic, &self.config.status_field);
        StateChangeWatcher::spawn(stream, session.destroyed_flag(), session.event_sender());
        Ok(())
    }
}
