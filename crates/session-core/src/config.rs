//! Engine and account configuration
//!
//! Both structures deserialize from YAML; every field has a default so a
//! configuration file only needs to list what differs.
//!
//! ```yaml
//! local_ip: 192.168.1.10
//! media_port_start: 20000
//! media_port_end: 20998
//! logging:
//!   install: true
//!   level: debug
//! accounts:
//!   - account_id: alice
//!     username: alice
//!     srtp_enabled: true
//!     default_media:
//!       - media_type: Audio
//!       - media_type: Video
//! ```

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use dring_media_core::MediaAttribute;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, SessionError};
use crate::logging::LoggingConfig;

/// Per-account call settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub account_id: String,
    /// Username advertised in the SDP origin line
    pub username: String,
    /// Offer and accept `RTP/SAVP` lines
    pub srtp_enabled: bool,
    /// Answer incoming calls and media change requests automatically by
    /// mirroring the peer's media
    pub auto_answer: bool,
    pub ice_rfc5245_compliant: bool,
    /// Address used in SDP documents, defaults to the engine local address
    pub local_address: Option<IpAddr>,
    /// Media used when a call is placed or accepted with an empty media list
    pub default_media: Vec<MediaAttribute>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            username: String::new(),
            srtp_enabled: false,
            auto_answer: false,
            ice_rfc5245_compliant: true,
            local_address: None,
            default_media: vec![MediaAttribute::audio()],
        }
    }
}

impl AccountConfig {
    pub fn new(account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        Self {
            username: account_id.clone(),
            account_id,
            ..Default::default()
        }
    }

    pub fn with_srtp(mut self, enabled: bool) -> Self {
        self.srtp_enabled = enabled;
        self
    }

    pub fn with_auto_answer(mut self, enabled: bool) -> Self {
        self.auto_answer = enabled;
        self
    }

    pub fn with_ice_rfc5245_compliance(mut self, compliant: bool) -> Self {
        self.ice_rfc5245_compliant = compliant;
        self
    }

    pub fn with_default_media(mut self, media: Vec<MediaAttribute>) -> Self {
        self.default_media = media;
        self
    }
}

/// Engine wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub accounts: Vec<AccountConfig>,
    /// Capacity of the signal broadcast channel
    pub signal_capacity: usize,
    /// First RTP port handed out by the default transport
    pub media_port_start: u16,
    /// Last port (inclusive) usable by the default transport
    pub media_port_end: u16,
    pub local_ip: IpAddr,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            signal_capacity: 1024,
            media_port_start: 10000,
            media_port_end: 20000,
            local_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_account(mut self, account: AccountConfig) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SessionError::config(format!("Invalid YAML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine configuration from {}", path.display());
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signal_capacity == 0 {
            return Err(SessionError::config("signal_capacity must be greater than 0"));
        }
        if self.media_port_start == 0 || self.media_port_start >= self.media_port_end {
            return Err(SessionError::config(format!(
                "Invalid media port range {}-{}",
                self.media_port_start, self.media_port_end
            )));
        }

        self.logging.validate()?;

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.account_id.is_empty() {
                return Err(SessionError::config("account_id must not be empty"));
            }
            if !seen.insert(account.account_id.as_str()) {
                return Err(SessionError::config(format!(
                    "Duplicate account id: {}",
                    account.account_id
                )));
            }
        }
        Ok(())
    }
}
