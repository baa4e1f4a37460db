//! Core value types: requests, artifact keys, audio artifacts, voice descriptors

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single synthesis request
///
/// Immutable value; it never outlives the call that produced it. The numeric
/// parameters carry provider-defined semantics (SAPI-5 scale for the bridge,
/// native engine units for local binaries) and are clamped by the backend
/// against the voice's declared range before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub provider: String,
    pub voice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i32>,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            voice: voice.into(),
            rate: None,
            pitch: None,
            volume: None,
        }
    }

    /// Content fingerprint of the `(text, provider, voice)` triple.
    ///
    /// Identical triples always yield the identical key; the optional
    /// parameters are deliberately excluded, matching the on-disk naming
    /// contract the cache preserves across restarts.
    pub fn fingerprint(&self) -> ArtifactKey {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.provider.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.voice.as_bytes());
        ArtifactKey(format!("{:x}", hasher.finalize()))
    }
}

/// Deterministic cache key, rendered as lowercase SHA-256 hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// On-disk file name for this key; the only naming contract the cache
    /// must keep stable for cross-restart reuse.
    pub fn file_name(&self) -> String {
        format!("{}.mp3", self.0)
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audio payload format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Pcm16,
}

/// A completed audio artifact
///
/// Created by a backend or the transcoder, immutable once stored. Sample
/// metadata is only meaningful for raw PCM payloads.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub data: Bytes,
    pub format: AudioFormat,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bit_depth: Option<u16>,
}

impl AudioArtifact {
    pub fn mp3(data: Bytes) -> Self {
        Self {
            data,
            format: AudioFormat::Mp3,
            sample_rate: None,
            channels: None,
            bit_depth: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Speech-API generation of a bridge voice
///
/// Two incompatible revisions of the remote platform speech subsystem, with
/// different parameter ranges and transport capabilities. `Unknown` voices
/// are probed at synthesis time and default to `Four` on ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SapiVersion {
    Four,
    Five,
    Unknown,
}

impl SapiVersion {
    pub fn from_number(n: Option<u8>) -> Self {
        match n {
            Some(4) => SapiVersion::Four,
            Some(5) => SapiVersion::Five,
            _ => SapiVersion::Unknown,
        }
    }
}

/// Capability flags for a voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceFeatures {
    /// Supports streaming raw PCM without a container
    pub raw_stream: bool,
    /// Volume parameter honored (SAPI 4 ignores it)
    pub volume_control: bool,
    /// Inclusive rate range in the provider's native units
    pub rate_range: (i32, i32),
    /// Inclusive pitch range in the provider's native units
    pub pitch_range: (i32, i32),
    pub languages: Vec<String>,
}

impl Default for VoiceFeatures {
    fn default() -> Self {
        Self {
            raw_stream: false,
            volume_control: false,
            rate_range: (0, 0),
            pitch_range: (0, 0),
            languages: vec![],
        }
    }
}

/// Per-voice metadata used for validation and clamping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub provider: String,
    pub name: String,
    pub description: String,
    pub features: VoiceFeatures,
    /// Only meaningful for bridge voices; local and cloud voices are Unknown.
    pub sapi_version: SapiVersion,
}

impl VoiceDescriptor {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            description: String::new(),
            features: VoiceFeatures::default(),
            sapi_version: SapiVersion::Unknown,
        }
    }
}

/// Clamp a value into an inclusive range
pub fn clamp_range(value: i32, range: (i32, i32)) -> i32 {
    value.clamp(range.0, range.1)
}
