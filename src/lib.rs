//! polyvox: text-to-speech orchestration
//!
//! A provider-agnostic synthesis layer with:
//! - Local subprocess engines (espeak, festival, flite, dectalk, sam)
//! - A cloud HTTP synthesis backend
//! - A bridge client for Windows SAPI voices, with SAPI 4/5 negotiation
//! - Content-addressed MP3 caching with request deduplication

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod engines;
pub mod error;
pub mod registry;
pub mod transcode;
pub mod types;

pub use cache::ArtifactCache;
pub use config::{BridgeConfig, CloudConfig, TtsConfig};
pub use coordinator::{SynthesisCoordinator, Synthesized};
pub use engines::SynthesisBackend;
pub use error::TtsError;
pub use registry::VoiceRegistry;
pub use transcode::{AudioTranscoder, TranscodeInput};
pub use types::{
    ArtifactKey, AudioArtifact, AudioFormat, SapiVersion, SynthesisRequest, VoiceDescriptor,
    VoiceFeatures,
};
