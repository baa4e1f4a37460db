//! Cloud HTTP TTS backend
//!
//! Thin client for a Pollinations-style synthesis API: the text rides in the
//! URL path, the voice as a query parameter, and the response body is the
//! finished MP3, so no transcode step is needed.

use crate::config::CloudConfig;
use crate::engines::SynthesisBackend;
use crate::error::TtsError;
use crate::types::{AudioArtifact, SynthesisRequest, VoiceDescriptor, VoiceFeatures};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const CLOUD_VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Cloud API backend
pub struct CloudBackend {
    client: Client,
    endpoint: String,
}

impl CloudBackend {
    pub fn new(config: &CloudConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SynthesisBackend for CloudBackend {
    fn name(&self) -> &str {
        "pollinations"
    }

    async fn is_available(&self) -> bool {
        // API-based; reachability is only really known at request time.
        true
    }

    async fn list_voices(&self) -> Vec<VoiceDescriptor> {
        CLOUD_VOICES
            .iter()
            .map(|name| VoiceDescriptor {
                provider: self.name().to_string(),
                name: name.to_string(),
                description: "Cloud API voice".to_string(),
                features: VoiceFeatures {
                    languages: vec!["en".to_string()],
                    ..VoiceFeatures::default()
                },
                sapi_version: crate::types::SapiVersion::Unknown,
            })
            .collect()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, TtsError> {
        if !CLOUD_VOICES.contains(&request.voice.as_str()) {
            return Err(TtsError::UnknownVoice {
                provider: self.name().to_string(),
                voice: request.voice.clone(),
            });
        }

        let url = format!("{}/{}", self.endpoint, urlencoding::encode(&request.text));

        debug!(voice = %request.voice, "requesting cloud synthesis");

        let response = self
            .client
            .get(&url)
            .query(&[("model", "openai-audio"), ("voice", request.voice.as_str())])
            .send()
            .await
            .map_err(|e| TtsError::Synthesis(format!("cloud API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(500).collect();
            return Err(TtsError::Synthesis(format!(
                "cloud API error ({}): {}",
                status, truncated
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.contains("audio/mpeg") {
            warn!(content_type = %content_type, "cloud API returned non-audio payload");
            return Err(TtsError::Synthesis(format!(
                "cloud API returned unexpected content type: {}",
                content_type
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TtsError::Synthesis(format!("failed to read audio response: {}", e)))?;

        if data.is_empty() {
            return Err(TtsError::Synthesis("cloud API returned no audio".to_string()));
        }

        if data.len() > MAX_RESPONSE_SIZE {
            return Err(TtsError::Synthesis(format!(
                "cloud response too large ({} bytes, max {} bytes)",
                data.len(),
                MAX_RESPONSE_SIZE
            )));
        }

        Ok(AudioArtifact::mp3(data))
    }
}
