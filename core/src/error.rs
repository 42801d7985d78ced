//! Domain error types for unlock sessions.

use thiserror::Error;

/// Failure of the lock/unlock round trip against the wallet backend.
#[derive(Debug, Error)]
pub enum AuthError {
    /// `lock()` was rejected before the unlock could be attempted.
    #[error("wallet lock failed: {0}")]
    LockFailed(String),

    /// `unlock()` was rejected: wrong passphrase or a backend fault.
    #[error("unlock failed: {0}")]
    UnlockFailed(String),
}

/// Errors raised by an [`RpcCaller`](crate::rpc::RpcCaller).
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection, TLS or HTTP-level failure.
    #[error("rpc transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Node { code: i64, message: String },

    /// The node answered with something that is not a JSON-RPC response.
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    /// Credentials were rejected (HTTP 401/403) or could not be loaded.
    #[error("rpc authentication failed: {0}")]
    Auth(String),
}

impl RpcError {
    /// JSON-RPC error code, when the node supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Node { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot determine config directory")]
    NoConfigDir,
}

/// Top-level error, allowing callers to match on the failing concern
/// instead of inspecting opaque `anyhow::Error` messages.
#[derive(Debug, Error)]
pub enum UnlockError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unexpected error from internal subsystems.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias for `std::result::Result<T, UnlockError>`.
pub type Result<T> = std::result::Result<T, UnlockError>;
