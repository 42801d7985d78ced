/// Lock/unlock abstraction that decouples the coordinator from a concrete node.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::AuthError;
use crate::rpc::RpcCaller;

/// JSON-RPC error code for a rejected wallet passphrase.
pub const RPC_WALLET_PASSPHRASE_INCORRECT: i64 = -14;

#[async_trait]
pub trait SecurityBackend: Send + Sync {
    /// Lock the wallet, dropping any active unlock window.
    async fn lock(&self) -> Result<(), AuthError>;

    /// Unlock the wallet for `timeout_secs` (0 = indefinitely), optionally for staking only.
    async fn unlock(&self, secret: &str, timeout_secs: u64, stake_only: bool)
        -> Result<(), AuthError>;
}

/// [`SecurityBackend`] speaking `walletlock` / `walletpassphrase`.
pub struct RpcSecurityBackend {
    rpc: Arc<dyn RpcCaller>,
}

impl RpcSecurityBackend {
    pub fn new(rpc: Arc<dyn RpcCaller>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl SecurityBackend for RpcSecurityBackend {
    async fn lock(&self) -> Result<(), AuthError> {
        self.rpc
            .call("walletlock", vec![])
            .await
            .map_err(|e| AuthError::LockFailed(e.to_string()))?;
        Ok(())
    }

    async fn unlock(
        &self,
        secret: &str,
        timeout_secs: u64,
        stake_only: bool,
    ) -> Result<(), AuthError> {
        self.rpc
            .call(
                "walletpassphrase",
                vec![json!(secret), json!(timeout_secs), json!(stake_only)],
            )
            .await
            .map_err(|e| match e.code() {
                Some(RPC_WALLET_PASSPHRASE_INCORRECT) => {
                    AuthError::UnlockFailed("the wallet passphrase entered was incorrect".into())
                }
                _ => AuthError::UnlockFailed(e.to_string()),
            })?;
        Ok(())
    }
}
