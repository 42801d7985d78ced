//! Unlock session coordination for staking-capable wallets.
//!
//! A [`UnlockRequestCoordinator`] locks the wallet, unlocks it with the
//! requested window, arms a single deferred follow-up (restore staking or
//! wipe the secret) and reports the next encryption status change once.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod poller;
pub mod rpc;
pub mod scheduler;
pub mod secret;
pub mod security;
pub mod session;
pub mod status;
pub mod watcher;

pub use config::{AppConfig, RpcConfig, TimeoutPreset, UnlockConfig, TIMEOUT_PRESETS};
pub use coordinator::{effective_timeout, UnlockRequest, UnlockRequestCoordinator};
pub use error::{AuthError, ConfigError, RpcError, UnlockError};
pub use poller::StatusPoller;
pub use rpc::{JsonRpcClient, RpcCaller};
pub use scheduler::{DeferredAction, PendingFallback, TimeoutScheduler};
pub use secret::SecretBuffer;
pub use security::{RpcSecurityBackend, SecurityBackend};
pub use session::{Session, SessionEvent};
pub use status::{EncryptionStatus, StatusCache, StatusSource};
pub use watcher::StateChangeWatcher;

/// Human-readable label for an unlock window, e.g. "5 minutes" or "Always".
pub fn timeout_label(secs: u64) -> String {
    match TIMEOUT_PRESETS.iter().find(|p| p.secs == secs) {
        Some(preset) => preset.label.to_string(),
        None if secs % 60 == 0 => format!("{} minutes", secs / 60),
        None => format!("{secs} seconds"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_for_presets_and_custom_windows() {
        assert_eq!(timeout_label(0), "Always");
        assert_eq!(timeout_label(60), "1 minute");
        assert_eq!(timeout_label(300), "5 minutes");
        assert_eq!(timeout_label(2400), "40 minutes");
        assert_eq!(timeout_label(45), "45 seconds");
    }
}
