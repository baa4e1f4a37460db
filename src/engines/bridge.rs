//! Remote Windows speech bridge backend
//!
//! Client for a separate bridge service fronting Windows SAPI, which exists
//! in two incompatible generations negotiated per voice. SAPI 5 voices take
//! rate/pitch in [-10, 10] and volume in [0, 100] and can return raw PCM;
//! SAPI 4 voices take rate/pitch mapped onto [0, 100], have no volume
//! control (a requested volume is silently ignored, by contract), and only
//! ever return complete WAV payloads.
//!
//! Audio rides base64-encoded inside a JSON envelope; whatever arrives is
//! run through the transcoder into MP3. Every call is treated as unreliable
//! and bounded by this client's own timeout, independent of the bridge.

use crate::config::BridgeConfig;
use crate::engines::SynthesisBackend;
use crate::error::TtsError;
use crate::transcode::{AudioTranscoder, TranscodeInput};
use crate::types::{
    AudioArtifact, SapiVersion, SynthesisRequest, VoiceDescriptor, VoiceFeatures,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Consecutive failures after which a probed version hint is discarded and
/// the next call re-detects.
const HINT_FAILURE_LIMIT: u32 = 2;

/// Default SAPI 5 raw-PCM contract agreed with the bridge
const DEFAULT_SAMPLE_RATE: u32 = 22050;
const DEFAULT_BIT_DEPTH: u16 = 16;
const DEFAULT_CHANNELS: u16 = 1;

/// Request parameters after clamping for one SAPI generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedParams {
    pub rate: i32,
    pub pitch: i32,
    /// Absent for SAPI 4: the generation has no volume control.
    pub volume: Option<i32>,
}

/// Clamp request parameters into the ranges of the given generation.
///
/// SAPI 5 takes the request values as-is, clamped into [-10, 10] (rate,
/// pitch) and [0, 100] (volume). SAPI 4 clamps rate/pitch into the SAPI-5
/// scale first, then maps them onto its [0, 100] range around the neutral
/// 50 and drops volume entirely. Clamping before the remap keeps the
/// arithmetic in range for any i32 input.
pub fn clamp_for_generation(
    version: SapiVersion,
    rate: Option<i32>,
    pitch: Option<i32>,
    volume: Option<i32>,
) -> ClampedParams {
    match version {
        SapiVersion::Five => ClampedParams {
            rate: rate.unwrap_or(0).clamp(-10, 10),
            pitch: pitch.unwrap_or(0).clamp(-10, 10),
            volume: volume.map(|v| v.clamp(0, 100)),
        },
        // Unknown has already been resolved by the caller; treating it as
        // SAPI 4 here keeps the conservative bias either way.
        SapiVersion::Four | SapiVersion::Unknown => ClampedParams {
            rate: rate.map(|r| 50 + r.clamp(-10, 10) * 5).unwrap_or(50),
            pitch: pitch.map(|p| 50 + p.clamp(-10, 10) * 5).unwrap_or(50),
            volume: None,
        },
    }
}

/// Capability flags the bridge declares per voice generation
pub fn features_for_version(version: SapiVersion) -> VoiceFeatures {
    match version {
        SapiVersion::Five => VoiceFeatures {
            raw_stream: true,
            volume_control: true,
            rate_range: (-10, 10),
            pitch_range: (-10, 10),
            languages: vec![],
        },
        SapiVersion::Four | SapiVersion::Unknown => VoiceFeatures {
            raw_stream: false,
            volume_control: false,
            rate_range: (0, 100),
            pitch_range: (0, 100),
            languages: vec![],
        },
    }
}

#[derive(Debug, Serialize)]
struct BridgeSynthesisBody<'a> {
    text: &'a str,
    voice: &'a str,
    rate: i32,
    pitch: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BridgeEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    audio_data: Option<String>,
    #[serde(default)]
    format: Option<String>,
    sample_rate: Option<u32>,
    bit_depth: Option<u16>,
    channels: Option<u16>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BridgeVoiceEntry {
    name: String,
    sapi_version: Option<u8>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    features: Option<BridgeVoiceFeatures>,
}

#[derive(Debug, Default, Deserialize)]
struct BridgeVoiceFeatures {
    #[serde(default)]
    multi_language: bool,
}

#[derive(Debug, Deserialize)]
struct BridgeHealth {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Clone, Copy)]
struct VersionHint {
    version: SapiVersion,
    failures: u32,
}

/// Bridge client backend
pub struct BridgeBackend {
    client: Client,
    base_url: String,
    transcoder: Arc<AudioTranscoder>,
    /// Versions declared by the bridge's own voice listing (authoritative)
    declared_versions: DashMap<String, SapiVersion>,
    /// Best-effort probe results; a cached hint, not ground truth
    version_hints: DashMap<String, VersionHint>,
}

impl BridgeBackend {
    pub fn new(config: &BridgeConfig, transcoder: Arc<AudioTranscoder>) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            transcoder,
            declared_versions: DashMap::new(),
            version_hints: DashMap::new(),
        })
    }

    /// Resolve the SAPI generation for a voice: declared listing first, then
    /// the cached probe hint, then a live probe. Ambiguity always lands on
    /// SAPI 4: guessing 4 for a 5 voice only loses volume/rate features,
    /// guessing 5 for a 4 voice can fail outright.
    async fn resolve_version(&self, voice: &str) -> SapiVersion {
        if let Some(declared) = self.declared_versions.get(voice) {
            match *declared {
                SapiVersion::Unknown => {}
                known => return known,
            }
        }

        if let Some(hint) = self.version_hints.get(voice) {
            return hint.version;
        }

        let probed = self.probe_voice(voice).await;
        self.version_hints.insert(
            voice.to_string(),
            VersionHint {
                version: probed,
                failures: 0,
            },
        );
        probed
    }

    /// Lightweight capability probe: a minimal SAPI-5-style synthesis.
    /// Success classifies the voice as generation 5; anything else defaults
    /// to generation 4.
    async fn probe_voice(&self, voice: &str) -> SapiVersion {
        let body = BridgeSynthesisBody {
            text: "Test",
            voice,
            rate: 0,
            pitch: 0,
            volume: None,
        };

        let ok = match self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response
                .json::<BridgeEnvelope>()
                .await
                .map(|e| e.success)
                .unwrap_or(false),
            _ => false,
        };

        let version = if ok {
            SapiVersion::Five
        } else {
            SapiVersion::Four
        };
        debug!(voice, ?version, "probed bridge voice generation");
        version
    }

    fn note_failure(&self, voice: &str) {
        if let Some(mut hint) = self.version_hints.get_mut(voice) {
            hint.failures += 1;
            if hint.failures >= HINT_FAILURE_LIMIT {
                drop(hint);
                self.version_hints.remove(voice);
                info!(voice, "dropped bridge version hint after repeated failures");
            }
        }
    }

    fn note_success(&self, voice: &str) {
        if let Some(mut hint) = self.version_hints.get_mut(voice) {
            hint.failures = 0;
        }
    }

    async fn call_bridge(
        &self,
        request: &SynthesisRequest,
        version: SapiVersion,
    ) -> Result<AudioArtifact, TtsError> {
        let params = clamp_for_generation(version, request.rate, request.pitch, request.volume);

        let body = BridgeSynthesisBody {
            text: &request.text,
            voice: &request.voice,
            rate: params.rate,
            pitch: params.pitch,
            volume: params.volume,
        };

        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::Synthesis(format!("bridge request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TtsError::Synthesis(format!(
                "bridge returned status {}",
                response.status()
            )));
        }

        let envelope: BridgeEnvelope = response
            .json()
            .await
            .map_err(|e| TtsError::BridgeProtocol(format!("malformed bridge response: {}", e)))?;

        if !envelope.success {
            return Err(TtsError::Synthesis(format!(
                "bridge synthesis failed: {}",
                envelope.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let audio_b64 = envelope.audio_data.ok_or_else(|| {
            TtsError::BridgeProtocol("bridge response missing audio_data".to_string())
        })?;

        let audio = general_purpose::STANDARD
            .decode(audio_b64.as_bytes())
            .map_err(|e| TtsError::BridgeProtocol(format!("invalid base64 audio: {}", e)))?;

        if audio.is_empty() {
            return Err(TtsError::BridgeProtocol(
                "bridge returned empty audio payload".to_string(),
            ));
        }

        let input = match envelope.format.as_deref() {
            Some("raw_pcm") => {
                // SAPI 4 has no raw-stream capability; a raw payload for a
                // gen-4 voice means the bridge and this client disagree.
                if version == SapiVersion::Four {
                    return Err(TtsError::BridgeProtocol(
                        "bridge returned raw PCM for a SAPI 4 voice".to_string(),
                    ));
                }
                TranscodeInput::RawPcm {
                    sample_rate: envelope.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
                    bit_depth: envelope.bit_depth.unwrap_or(DEFAULT_BIT_DEPTH),
                    channels: envelope.channels.unwrap_or(DEFAULT_CHANNELS),
                }
            }
            Some("wav") => TranscodeInput::Wav,
            other => {
                return Err(TtsError::BridgeProtocol(format!(
                    "unknown audio format from bridge: {:?}",
                    other
                )));
            }
        };

        let mp3 = self
            .transcoder
            .encode(bytes::Bytes::from(audio), input)
            .await?;

        Ok(AudioArtifact::mp3(mp3))
    }
}

#[async_trait]
impl SynthesisBackend for BridgeBackend {
    fn name(&self) -> &str {
        "windows"
    }

    async fn is_available(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => response
                .json::<BridgeHealth>()
                .await
                .map(|h| h.status == "ok")
                .unwrap_or(false),
            _ => false,
        }
    }

    async fn list_voices(&self) -> Vec<VoiceDescriptor> {
        let response = match self
            .client
            .get(format!("{}/voices", self.base_url))
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "bridge voice listing failed");
                return vec![];
            }
            Err(e) => {
                warn!("bridge voice listing failed: {}", e);
                return vec![];
            }
        };

        let entries: Vec<BridgeVoiceEntry> = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("malformed bridge voice listing: {}", e);
                return vec![];
            }
        };

        entries
            .into_iter()
            .map(|entry| {
                let version = SapiVersion::from_number(entry.sapi_version);
                self.declared_versions.insert(entry.name.clone(), version);

                let mut features = features_for_version(version);
                if entry
                    .features
                    .as_ref()
                    .map(|f| f.multi_language)
                    .unwrap_or(false)
                {
                    features.languages = vec!["multi".to_string()];
                }

                VoiceDescriptor {
                    provider: self.name().to_string(),
                    name: entry.name,
                    description: entry.description,
                    features,
                    sapi_version: version,
                }
            })
            .collect()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, TtsError> {
        let version = self.resolve_version(&request.voice).await;

        debug!(
            voice = %request.voice,
            ?version,
            "dispatching to bridge"
        );

        match self.call_bridge(request, version).await {
            Ok(artifact) => {
                self.note_success(&request.voice);
                Ok(artifact)
            }
            Err(e) => {
                self.note_failure(&request.voice);
                Err(e)
            }
        }
    }
}
