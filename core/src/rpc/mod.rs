//! JSON-RPC plumbing towards the wallet node.
mod client;

pub use client::JsonRpcClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;

/// Minimal JSON-RPC transport. Implemented by [`JsonRpcClient`] and by test fakes.
#[async_trait]
pub trait RpcCaller: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;
}

/// Issue a call on a background task and drop its outcome.
///
/// Failures never reach the caller; they are only logged at debug level.
pub fn call_detached(rpc: Arc<dyn RpcCaller>, method: &'static str, params: Vec<Value>) {
    tokio::spawn(async move {
        if let Err(e) = rpc.call(method, params).await {
            tracing::debug!(method, error = %e, "detached rpc call failed");
        }
    });
}
