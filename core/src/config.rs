//! Configuration for the RPC connection and unlock policy.
//!
//! Loaded from `config_dir()/wallet-unlock/config.json` when present. Every
//! field has a default, so a partial file is enough.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::status::{ENCRYPTION_STATUS_FIELD, WALLET_INFO_TOPIC};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:51735";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// A selectable unlock window. `secs == 0` means "until locked manually".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPreset {
    pub secs: u64,
    pub label: &'static str,
}

pub const TIMEOUT_PRESETS: &[TimeoutPreset] = &[
    TimeoutPreset { secs: 60, label: "1 minute" },
    TimeoutPreset { secs: 120, label: "2 minutes" },
    TimeoutPreset { secs: 180, label: "3 minutes" },
    TimeoutPreset { secs: 300, label: "5 minutes" },
    TimeoutPreset { secs: 600, label: "10 minutes" },
    TimeoutPreset { secs: 1200, label: "20 minutes" },
    TimeoutPreset { secs: 1800, label: "30 minutes" },
    TimeoutPreset { secs: 0, label: "Always" },
];

const ALWAYS_ONLY: &[TimeoutPreset] = &[TimeoutPreset { secs: 0, label: "Always" }];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// Window used when a request does not specify one.
    pub default_timeout_secs: u64,
    /// Force every unlock to be indefinite.
    pub always_unlocked: bool,
    /// Delay before the secret is wiped when no staking fallback is armed.
    pub reset_delay_ms: u64,
    /// Added to the unlock window before the staking fallback fires.
    pub fallback_grace_secs: u64,
    pub status_topic: String,
    pub status_field: String,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            always_unlocked: false,
            reset_delay_ms: 500,
            fallback_grace_secs: 1,
            status_topic: WALLET_INFO_TOPIC.to_string(),
            status_field: ENCRYPTION_STATUS_FIELD.to_string(),
        }
    }
}

impl UnlockConfig {
    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn fallback_grace(&self) -> Duration {
        Duration::from_secs(self.fallback_grace_secs)
    }

    /// Presets a front end should offer; only "Always" when `always_unlocked` is set.
    pub fn timeout_presets(&self) -> &'static [TimeoutPreset] {
        if self.always_unlocked {
            ALWAYS_ONLY
        } else {
            TIMEOUT_PRESETS
        }
    }

    /// Window to request: `0` under `always_unlocked`, else `requested` or the default.
    pub fn request_timeout(&self, requested: Option<u64>) -> u64 {
        if self.always_unlocked {
            0
        } else {
            requested.unwrap_or(self.default_timeout_secs)
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Node cookie file; takes precedence over `user`/`password`.
    pub cookie_file: Option<PathBuf>,
    /// Wallet name for multi-wallet nodes (`/wallet/<name>` endpoint).
    pub wallet: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            user: None,
            password: None,
            cookie_file: None,
            wallet: None,
            poll_interval_secs: 5,
        }
    }
}

impl RpcConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("cookie_file", &self.cookie_file)
            .field("wallet", &self.wallet)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub unlock: UnlockConfig,
}

/// Default config location.
/// Linux: `~/.config/wallet-unlock/config.json`, macOS: `~/Library/Application Support/wallet-unlock/config.json`
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join("wallet-unlock").join("config.json"))
}

impl AppConfig {
    /// Load from the default location, falling back to defaults if the file is absent.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }
}
