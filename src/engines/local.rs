//! Local command-line synthesis engines
//!
//! One backend instance per external binary (espeak-ng, festival, flite,
//! dectalk, sam). All of them follow the same protocol: clamp parameters to
//! the engine's declared range, spawn the process, and feed its stdout
//! straight into the transcoder as WAV or raw PCM. Engines with
//! file-oriented flags (flite, sam, festival's script) target the
//! /dev/stdout device path so the stream never touches disk.

use crate::engines::SynthesisBackend;
use crate::error::TtsError;
use crate::transcode::{AudioTranscoder, TranscodeInput};
use crate::types::{
    clamp_range, AudioArtifact, SynthesisRequest, VoiceDescriptor, VoiceFeatures,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// The local engine families polyvox knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEngine {
    Espeak,
    Festival,
    Flite,
    Dectalk,
    Sam,
}

/// SAM voice presets: (name, speed, pitch, throat, mouth, description)
const SAM_PRESETS: [(&str, u32, u32, u32, u32, &str); 6] = [
    ("sam", 72, 64, 128, 128, "Default SAM voice"),
    ("elf", 72, 64, 110, 160, "Elf"),
    ("robot", 92, 60, 190, 190, "Little Robot"),
    ("stuffy", 82, 72, 110, 105, "Stuffy Guy"),
    ("old", 82, 32, 145, 145, "Little Old Lady"),
    ("alien", 100, 64, 150, 200, "Extra-Terrestrial"),
];

/// DECtalk speaker numbers 0-9
const DECTALK_SPEAKERS: [&str; 10] = [
    "Perfect Paul",
    "Beautiful Betty",
    "Huge Harry",
    "Frail Frank",
    "Doctor Dennis",
    "Kit the Kid",
    "Uppity Ursula",
    "Rough Rita",
    "Whispering Wendy",
    "Variable",
];

impl LocalEngine {
    pub fn all() -> [LocalEngine; 5] {
        [
            LocalEngine::Espeak,
            LocalEngine::Festival,
            LocalEngine::Flite,
            LocalEngine::Dectalk,
            LocalEngine::Sam,
        ]
    }

    /// Provider identifier this engine registers under
    pub fn provider(&self) -> &'static str {
        match self {
            LocalEngine::Espeak => "espeak",
            LocalEngine::Festival => "festival",
            LocalEngine::Flite => "flite",
            LocalEngine::Dectalk => "dectalk",
            LocalEngine::Sam => "sam",
        }
    }

    fn program(&self) -> &'static str {
        match self {
            LocalEngine::Espeak => "espeak-ng",
            LocalEngine::Festival => "festival",
            LocalEngine::Flite => "flite",
            LocalEngine::Dectalk => "dectalk",
            LocalEngine::Sam => "sam",
        }
    }

    fn stream_format(&self) -> TranscodeInput {
        match self {
            // DECtalk emits headerless PCM at its fixed native rate.
            LocalEngine::Dectalk => TranscodeInput::RawPcm {
                sample_rate: 11025,
                bit_depth: 16,
                channels: 1,
            },
            _ => TranscodeInput::Wav,
        }
    }

    /// Builtin voice table with declared parameter ranges
    pub fn voices(&self) -> Vec<VoiceDescriptor> {
        match self {
            LocalEngine::Espeak => ["en", "en-us", "en-gb", "es", "fr", "de", "it"]
                .iter()
                .map(|lang| VoiceDescriptor {
                    provider: self.provider().to_string(),
                    name: lang.to_string(),
                    description: format!("eSpeak NG voice '{}'", lang),
                    features: VoiceFeatures {
                        raw_stream: false,
                        volume_control: true,
                        rate_range: (80, 450),
                        pitch_range: (0, 99),
                        languages: vec![lang.to_string()],
                    },
                    sapi_version: crate::types::SapiVersion::Unknown,
                })
                .collect(),
            LocalEngine::Festival => ["kal_diphone", "rab_diphone", "don_diphone", "rms_diphone"]
                .iter()
                .map(|name| VoiceDescriptor {
                    provider: self.provider().to_string(),
                    name: name.to_string(),
                    description: "Festival diphone voice".to_string(),
                    features: VoiceFeatures {
                        languages: vec!["en".to_string()],
                        ..VoiceFeatures::default()
                    },
                    sapi_version: crate::types::SapiVersion::Unknown,
                })
                .collect(),
            LocalEngine::Flite => ["kal16", "kal", "awb", "rms", "slt"]
                .iter()
                .map(|name| VoiceDescriptor {
                    provider: self.provider().to_string(),
                    name: name.to_string(),
                    description: "Flite voice".to_string(),
                    features: VoiceFeatures {
                        languages: vec!["en".to_string()],
                        ..VoiceFeatures::default()
                    },
                    sapi_version: crate::types::SapiVersion::Unknown,
                })
                .collect(),
            LocalEngine::Dectalk => (0..10)
                .map(|n| VoiceDescriptor {
                    provider: self.provider().to_string(),
                    name: n.to_string(),
                    description: DECTALK_SPEAKERS[n as usize].to_string(),
                    features: VoiceFeatures {
                        raw_stream: true,
                        languages: vec!["en".to_string()],
                        ..VoiceFeatures::default()
                    },
                    sapi_version: crate::types::SapiVersion::Unknown,
                })
                .collect(),
            LocalEngine::Sam => SAM_PRESETS
                .iter()
                .map(|(name, _, _, _, _, desc)| VoiceDescriptor {
                    provider: self.provider().to_string(),
                    name: name.to_string(),
                    description: desc.to_string(),
                    features: VoiceFeatures {
                        languages: vec!["en".to_string()],
                        ..VoiceFeatures::default()
                    },
                    sapi_version: crate::types::SapiVersion::Unknown,
                })
                .collect(),
        }
    }
}

/// Backend wrapping one local synthesis executable
pub struct LocalBackend {
    engine: LocalEngine,
    transcoder: Arc<AudioTranscoder>,
}

/// One prepared invocation: argument vector plus, for script-driven engines,
/// the stdin payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub stdin_script: Option<String>,
}

impl LocalBackend {
    pub fn new(engine: LocalEngine, transcoder: Arc<AudioTranscoder>) -> Self {
        Self { engine, transcoder }
    }

    pub fn engine(&self) -> LocalEngine {
        self.engine
    }

    /// Build the argument vector for one synthesis call, clamping every
    /// numeric parameter into the voice's declared range first. Out-of-range
    /// values are never passed to the subprocess.
    pub fn build_invocation(
        &self,
        request: &SynthesisRequest,
        features: &VoiceFeatures,
    ) -> Invocation {
        let text = sanitize_text(&request.text);
        let voice = &request.voice;

        match self.engine {
            LocalEngine::Espeak => {
                let rate = clamp_range(request.rate.unwrap_or(150), features.rate_range);
                let mut args = vec![
                    "-v".to_string(),
                    voice.clone(),
                    "-s".to_string(),
                    rate.to_string(),
                ];
                if let Some(pitch) = request.pitch {
                    args.push("-p".to_string());
                    args.push(clamp_range(pitch, features.pitch_range).to_string());
                }
                if let Some(volume) = request.volume {
                    // espeak amplitude, 100 is nominal
                    args.push("-a".to_string());
                    args.push(clamp_range(volume, (0, 200)).to_string());
                }
                args.push("--stdout".to_string());
                args.push(text);
                Invocation {
                    args,
                    stdin_script: None,
                }
            }
            LocalEngine::Festival => {
                let script = format!(
                    "(voice_{})\n(utt.save.wave\n  (utt.synth (Utterance Text \"{}\"))\n  \"/dev/stdout\" 'wav)\n",
                    voice,
                    escape_scheme_string(&text)
                );
                Invocation {
                    args: vec![],
                    stdin_script: Some(script),
                }
            }
            LocalEngine::Flite => Invocation {
                args: vec![
                    "-voice".to_string(),
                    voice.clone(),
                    "-t".to_string(),
                    text,
                    "-o".to_string(),
                    "/dev/stdout".to_string(),
                ],
                stdin_script: None,
            },
            LocalEngine::Dectalk => Invocation {
                args: vec![
                    "-s".to_string(),
                    voice.clone(),
                    "-fo".to_string(),
                    "stdout:raw".to_string(),
                    "-a".to_string(),
                    text,
                ],
                stdin_script: None,
            },
            LocalEngine::Sam => {
                let (_, speed, pitch, throat, mouth, _) = SAM_PRESETS
                    .iter()
                    .find(|(name, ..)| *name == voice)
                    .copied()
                    .unwrap_or(SAM_PRESETS[0]);
                Invocation {
                    args: vec![
                        "-speed".to_string(),
                        speed.to_string(),
                        "-pitch".to_string(),
                        pitch.to_string(),
                        "-throat".to_string(),
                        throat.to_string(),
                        "-mouth".to_string(),
                        mouth.to_string(),
                        "-wav".to_string(),
                        "/dev/stdout".to_string(),
                        text,
                    ],
                    stdin_script: None,
                }
            }
        }
    }

    fn find_voice(&self, name: &str) -> Option<VoiceDescriptor> {
        self.engine.voices().into_iter().find(|v| v.name == name)
    }

    fn spawn_error(&self, e: std::io::Error) -> TtsError {
        // A missing binary is indistinguishable from is_available() == false.
        if e.kind() == std::io::ErrorKind::NotFound {
            TtsError::BackendUnavailable(self.engine.provider().to_string())
        } else {
            TtsError::Synthesis(format!(
                "failed to spawn {}: {}",
                self.engine.program(),
                e
            ))
        }
    }

    /// Streaming path: engine stdout piped directly into the transcoder.
    async fn synthesize_streaming(&self, invocation: Invocation) -> Result<Bytes, TtsError> {
        let mut cmd = Command::new(self.engine.program());
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin_script.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        if let Some(script) = invocation.stdin_script {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                TtsError::Synthesis("failed to open engine stdin".to_string())
            })?;
            tokio::spawn(async move {
                let _ = stdin.write_all(script.as_bytes()).await;
                drop(stdin);
            });
        }

        let stdout = child.stdout.take().ok_or_else(|| {
            TtsError::Synthesis("failed to open engine stdout".to_string())
        })?;

        let (encoded, engine_result) = tokio::join!(
            self.transcoder
                .encode_stream(stdout, self.engine.stream_format()),
            child.wait_with_output()
        );

        let engine_output = engine_result
            .map_err(|e| TtsError::Synthesis(format!("engine did not complete: {}", e)))?;

        if !engine_output.status.success() {
            let stderr = String::from_utf8_lossy(&engine_output.stderr);
            return Err(TtsError::Synthesis(format!(
                "{} exited with {}: {}",
                self.engine.program(),
                engine_output.status,
                stderr.trim()
            )));
        }

        encoded
    }

}

#[async_trait]
impl SynthesisBackend for LocalBackend {
    fn name(&self) -> &str {
        self.engine.provider()
    }

    async fn is_available(&self) -> bool {
        let engine_ok = match self.engine {
            LocalEngine::Espeak => probe(self.engine.program(), &["--version"]).await,
            LocalEngine::Festival => probe(self.engine.program(), &["--version"]).await,
            LocalEngine::Flite => probe(self.engine.program(), &["-lv"]).await,
            LocalEngine::Dectalk => {
                probe(self.engine.program(), &["-a", "hi", "-fo", "stdout:raw"]).await
            }
            // SAM has no version flag; a PATH lookup is the whole probe.
            LocalEngine::Sam => probe("which", &[self.engine.program()]).await,
        };

        engine_ok && self.transcoder.is_available().await
    }

    async fn list_voices(&self) -> Vec<VoiceDescriptor> {
        self.engine.voices()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, TtsError> {
        let descriptor = self.find_voice(&request.voice).ok_or_else(|| {
            TtsError::UnknownVoice {
                provider: self.engine.provider().to_string(),
                voice: request.voice.clone(),
            }
        })?;

        if sanitize_text(&request.text).is_empty() {
            return Err(TtsError::InvalidParameter(
                "text is empty after sanitization".to_string(),
            ));
        }

        debug!(
            provider = self.engine.provider(),
            voice = %request.voice,
            "synthesizing via local engine"
        );

        let invocation = self.build_invocation(request, &descriptor.features);
        let data = self.synthesize_streaming(invocation).await?;

        info!(
            provider = self.engine.provider(),
            bytes = data.len(),
            "local synthesis complete"
        );

        Ok(AudioArtifact::mp3(data))
    }
}

async fn probe(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or_else(|e| {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("probe for {} failed unexpectedly: {}", program, e);
            }
            false
        })
}

/// Strip control characters that would confuse the engines; newlines and
/// tabs survive as ordinary whitespace.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Escape a string for embedding in a Festival Scheme literal
fn escape_scheme_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
