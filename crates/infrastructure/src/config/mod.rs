//! Gateway configuration: structs, parsing, and validation.

mod common;

pub use common::{ConfigError, warn_if_world_readable};

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::path::Path;

use application::config_reload::{DeviceSpec, UserAcl};
use clap::ValueEnum;
use ebpf_common::session::{INACTIVITY_DISABLED, SESSION_EXPIRY_DISABLED};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PIN_DIR, DEFAULT_REGISTRATION_DB_PATH, DEFAULT_SOCKET_PATH,
};

const NS_PER_MINUTE: u64 = 60 * 1_000_000_000;

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub gateway: GatewaySection,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub ebpf: EbpfConfig,

    /// Per-user rule lists. `allow` routes are always reachable, `mfa`
    /// routes require a live session.
    #[serde(default)]
    pub acls: BTreeMap<String, AclConfig>,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_socket_path")]
    pub control_socket_path: String,

    #[serde(default = "default_registration_db_path")]
    pub registration_db_path: String,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Absolute session lifetime in minutes; 0 disables the check.
    #[serde(default = "default_max_lifetime_minutes")]
    pub max_lifetime_minutes: u64,

    /// Inactivity sliding window in minutes; 0 disables the check.
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_timeout_minutes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EbpfConfig {
    /// Opaque offload object to load (optional).
    #[serde(default)]
    pub object_path: Option<String>,

    /// Interface the offload XDP program attaches to.
    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default = "default_pin_dir")]
    pub pin_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclConfig {
    #[serde(default)]
    pub allow: Vec<String>,

    #[serde(default)]
    pub mfa: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub address: Ipv4Addr,
    pub username: String,
}

// ── Defaults ───────────────────────────────────────────────────────

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

fn default_registration_db_path() -> String {
    DEFAULT_REGISTRATION_DB_PATH.to_string()
}

fn default_pin_dir() -> String {
    DEFAULT_PIN_DIR.to_string()
}

fn default_max_lifetime_minutes() -> u64 {
    120
}

fn default_inactivity_minutes() -> u64 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_lifetime_minutes: default_max_lifetime_minutes(),
            inactivity_timeout_minutes: default_inactivity_minutes(),
        }
    }
}

// ── Log settings ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

// ── Loading and conversion ─────────────────────────────────────────

impl GatewayConfig {
    /// Load from a YAML file, warning when the file is world-readable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        warn_if_world_readable(path, "config file");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation. Rule grammar (which may require DNS) is
    /// validated by the reload service before any table mutation.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.address) {
                return Err(common::validation(
                    "devices",
                    format!("duplicate device address {}", device.address),
                ));
            }
            if device.username.is_empty() {
                return Err(common::validation("devices", "empty username"));
            }
            if !self.acls.contains_key(&device.username) {
                return Err(common::validation(
                    "devices",
                    format!(
                        "device {} references user {} with no ACL entry",
                        device.address, device.username
                    ),
                ));
            }
        }

        if self.ebpf.interface.is_some() && self.ebpf.object_path.is_none() {
            return Err(common::validation(
                "ebpf",
                "interface set but no object_path to attach",
            ));
        }

        Ok(())
    }

    /// Absolute session lifetime in nanoseconds (`u64::MAX` = disabled).
    pub fn max_session_ns(&self) -> u64 {
        match self.session.max_lifetime_minutes {
            0 => SESSION_EXPIRY_DISABLED,
            minutes => minutes.saturating_mul(NS_PER_MINUTE),
        }
    }

    /// Inactivity window in nanoseconds (`u64::MAX` = disabled).
    pub fn inactivity_ns(&self) -> u64 {
        match self.session.inactivity_timeout_minutes {
            0 => INACTIVITY_DISABLED,
            minutes => minutes.saturating_mul(NS_PER_MINUTE),
        }
    }

    /// The ACL map as reload-service input, in stable (name) order.
    pub fn user_acls(&self) -> Vec<UserAcl> {
        self.acls
            .iter()
            .map(|(username, acl)| UserAcl {
                username: username.clone(),
                public: acl.allow.clone(),
                mfa: acl.mfa.clone(),
            })
            .collect()
    }

    pub fn device_specs(&self) -> Vec<DeviceSpec> {
        self.devices
            .iter()
            .map(|device| DeviceSpec {
                address: device.address,
                username: device.username.clone(),
            })
            .collect()
    }
}
