//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Presale settings.
    #[serde(default)]
    pub presale: PresaleConfig,
    /// Affiliate settings.
    #[serde(default)]
    pub affiliate: AffiliateConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Presale configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresaleConfig {
    /// How long a cached progress snapshot stays fresh, in seconds.
    #[serde(default = "default_progress_ttl")]
    pub progress_ttl_secs: u64,
}

/// Affiliate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateConfig {
    /// Base URL used to build shareable referral links.
    #[serde(default = "default_referral_base_url")]
    pub referral_base_url: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

// Default value functions

fn default_progress_ttl() -> u64 {
    30
}

fn default_referral_base_url() -> String {
    "https://qtm.example.com/presale".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
        }
    }
}

impl Default for PresaleConfig {
    fn default() -> Self {
        Self {
            progress_ttl_secs: default_progress_ttl(),
        }
    }
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            referral_base_url: default_referral_base_url(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Build the shareable referral link for a code.
    pub fn referral_link(&self, referral_code: &str) -> String {
        format!("{}?ref={}", self.affiliate.referral_base_url, referral_code)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        // Check env var override first
        if let Ok(dir) = std::env::var("QTM_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("QTM_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Qtm")
        }
        #[cfg(target_os = "linux")]
        {
            dirs_fallback(".qtm")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Qtm")
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            dirs_fallback(".qtm")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/qtm"))
}
