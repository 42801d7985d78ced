use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use zeroize::Zeroizing;

use super::RpcCaller;
use crate::config::RpcConfig;
use crate::error::RpcError;

/// HTTP JSON-RPC 1.0 client with basic auth, as spoken by bitcoin-derived nodes.
pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoint: String,
    user: String,
    password: Zeroizing<String>,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Reject plain-HTTP endpoints on non-loopback hosts unless `allow_insecure` is set.
fn validate_rpc_url(url: &str, allow_insecure: bool) -> Result<(), RpcError> {
    if url.starts_with("https://") {
        return Ok(());
    }
    if let Some(rest) = url.strip_prefix("http://") {
        let authority = rest.split('/').next().unwrap_or_default();
        let host = match authority.split_once(']') {
            Some((v6, _)) => v6.trim_start_matches('['),
            None => authority.split(':').next().unwrap_or_default(),
        };
        if allow_insecure || matches!(host, "127.0.0.1" | "localhost" | "::1") {
            return Ok(());
        }
        return Err(RpcError::Transport(format!(
            "refusing plain HTTP to non-local node: {url} (use --insecure to allow)"
        )));
    }
    Err(RpcError::Transport(format!(
        "invalid rpc url scheme: {url}, expected http:// or https://"
    )))
}

/// Read `user:password` from a node cookie file.
fn read_cookie(path: &std::path::Path) -> Result<(String, Zeroizing<String>), RpcError> {
    let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        RpcError::Auth(format!("failed to read cookie file {}: {e}", path.display()))
    })?);
    let (user, password) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| RpcError::Auth(format!("malformed cookie file {}", path.display())))?;
    Ok((user.to_string(), Zeroizing::new(password.to_string())))
}

impl JsonRpcClient {
    pub fn new(config: &RpcConfig, allow_insecure: bool) -> Result<Self, RpcError> {
        validate_rpc_url(&config.url, allow_insecure)?;

        let (user, password) = match &config.cookie_file {
            Some(path) => read_cookie(path)?,
            None => (
                config.user.clone().unwrap_or_default(),
                Zeroizing::new(config.password.clone().unwrap_or_default()),
            ),
        };

        let base = config.url.trim_end_matches('/');
        let endpoint = match &config.wallet {
            Some(wallet) => format!("{base}/wallet/{wallet}"),
            None => base.to_string(),
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            user,
            password,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RpcCaller for JsonRpcClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": method,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(self.password.as_str()))
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RpcError::Auth(format!("node returned {status}")));
        }

        // Nodes answer RPC-level errors with HTTP 500 and a JSON body, so the
        // body is parsed regardless of status.
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        parse_response(&text)
    }
}

fn parse_response(text: &str) -> Result<Value, RpcError> {
    let parsed: RpcResponse =
        serde_json::from_str(text).map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
    if let Some(err) = parsed.error {
        return Err(RpcError::Node {
            code: err.code,
            message: err.message,
        });
    }
    Ok(parsed.result.unwrap_or(Value::Null))
}
