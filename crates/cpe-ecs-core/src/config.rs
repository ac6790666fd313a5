//! Configuration types for CPE → ECS enrichment
//!
//! Decoding the configuration file is left to the host; this module only
//! defines the shape and validates it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default IPv4 source prefix length of a rewritten ECS option
pub const DEFAULT_MASK4: u8 = 24;

/// Default IPv6 source prefix length of a rewritten ECS option
pub const DEFAULT_MASK6: u8 = 48;

/// Stage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpeEcsConfig {
    /// Delay before forwarding each query, in milliseconds (0 = no delay)
    #[serde(default)]
    pub delay_ms: u64,

    /// Entry descriptors: inline records, `ext:path[:tag]` or `url:address`
    #[serde(default)]
    pub entries: Vec<String>,

    /// Plain file descriptors (`path` or `path:tag`)
    #[serde(default)]
    pub files: Vec<String>,

    /// Tag filter applied to `url:` sources
    #[serde(default)]
    pub url_tag: Option<String>,

    /// HS256 secret for bearer tokens on `url:` sources
    #[serde(default)]
    pub token_secret: Option<String>,

    /// IPv4 source prefix length of the rewritten ECS option
    #[serde(default = "default_mask4")]
    pub mask4: u8,

    /// IPv6 source prefix length of the rewritten ECS option
    #[serde(default = "default_mask6")]
    pub mask6: u8,

    /// Replace an ECS option the query already carries
    #[serde(default)]
    pub force_overwrite: bool,
}

fn default_mask4() -> u8 {
    DEFAULT_MASK4
}

fn default_mask6() -> u8 {
    DEFAULT_MASK6
}

impl CpeEcsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            delay_ms: 0,
            entries: Vec::new(),
            files: Vec::new(),
            url_tag: None,
            token_secret: None,
            mask4: DEFAULT_MASK4,
            mask6: DEFAULT_MASK6,
            force_overwrite: false,
        }
    }

    /// The configured forwarding delay
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.mask4 > 32 {
            return Err(crate::Error::config(format!(
                "mask4 must be <= 32, got {}",
                self.mask4
            )));
        }
        if self.mask6 > 128 {
            return Err(crate::Error::config(format!(
                "mask6 must be <= 128, got {}",
                self.mask6
            )));
        }
        if self.token_secret.as_deref() == Some("") {
            return Err(crate::Error::config("token secret cannot be empty"));
        }
        if self.url_tag.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(crate::Error::config("url tag cannot be empty"));
        }
        if self.entries.iter().chain(&self.files).any(|e| e.trim().is_empty()) {
            return Err(crate::Error::config("entry descriptors cannot be empty"));
        }

        Ok(())
    }
}

impl Default for CpeEcsConfig {
    fn default() -> Self {
        Self::new()
    }
}
