//! Configuration for the synthesis core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Directory for cached audio artifacts
    pub cache_dir: PathBuf,

    /// Maximum request text length in bytes
    pub max_text_length: usize,

    /// Hard wall-clock timeout for a single synthesis call, in seconds
    pub synthesis_timeout_secs: u64,

    /// FFmpeg executable used by the transcoder
    pub ffmpeg_path: PathBuf,

    /// Remote Windows bridge settings
    pub bridge: BridgeConfig,

    /// Cloud HTTP API settings
    pub cloud: CloudConfig,
}

/// Remote bridge client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Register the bridge backend at all (off by default)
    pub enabled: bool,

    /// Base URL of the bridge service
    pub url: String,

    /// Client-side request timeout in seconds, independent of whatever the
    /// bridge does internally
    pub timeout_secs: u64,
}

/// Cloud HTTP TTS API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base URL of the cloud synthesis endpoint
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("audio_files"),
            max_text_length: 1000,
            synthesis_timeout_secs: 60,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            bridge: BridgeConfig::default(),
            cloud: CloudConfig::default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://text.pollinations.ai".to_string(),
            timeout_secs: 30,
        }
    }
}

impl TtsConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }

        if self.max_text_length > 100_000 {
            return Err("max_text_length too large (max 100000 bytes)".to_string());
        }

        if self.synthesis_timeout_secs == 0 {
            return Err("synthesis_timeout_secs must be greater than 0".to_string());
        }

        if self.synthesis_timeout_secs > 600 {
            return Err("synthesis_timeout_secs too large (max 600 seconds)".to_string());
        }

        if self.cache_dir.to_string_lossy().contains("..") {
            return Err("cache_dir cannot contain '..'".to_string());
        }

        if self.cache_dir.to_string_lossy().is_empty() {
            return Err("cache_dir cannot be empty".to_string());
        }

        self.bridge.validate()?;
        self.cloud.validate()?;

        Ok(())
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        validate_endpoint(&self.url, "bridge URL")?;

        if self.timeout_secs == 0 {
            return Err("bridge timeout must be greater than 0".to_string());
        }

        if self.timeout_secs > 300 {
            return Err("bridge timeout too large (max 300 seconds)".to_string());
        }

        Ok(())
    }
}

impl CloudConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_endpoint(&self.endpoint, "cloud endpoint")?;

        if self.timeout_secs == 0 {
            return Err("cloud timeout must be greater than 0".to_string());
        }

        if self.timeout_secs > 300 {
            return Err("cloud timeout too large (max 300 seconds)".to_string());
        }

        Ok(())
    }
}

fn validate_endpoint(endpoint: &str, what: &str) -> Result<(), String> {
    if endpoint.is_empty() {
        return Err(format!("{} cannot be empty", what));
    }

    if endpoint.len() > 2048 {
        return Err(format!("{} too long (max 2048 chars)", what));
    }

    if endpoint.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(format!("{} contains invalid characters", what));
    }

    let parsed = url::Url::parse(endpoint).map_err(|e| format!("invalid {}: {}", what, e))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "unsupported {} scheme: {}. Only http:// and https:// are allowed.",
            what, scheme
        )),
    }
}
