//! Synthesis backend implementations

pub mod bridge;
pub mod cloud;
pub mod local;

use crate::error::TtsError;
use crate::types::{AudioArtifact, SynthesisRequest, VoiceDescriptor};
use async_trait::async_trait;

/// Uniform contract every synthesis backend satisfies
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Provider identifier this backend is registered under
    fn name(&self) -> &str;

    /// Capability probe: binary on PATH or service reachable. No side
    /// effects, safe to call repeatedly.
    async fn is_available(&self) -> bool;

    /// Finite voice list. Listing is advisory: failures yield an empty list
    /// rather than an error.
    async fn list_voices(&self) -> Vec<VoiceDescriptor>;

    /// Synthesize one request into a normalized artifact.
    ///
    /// Implementations validate the voice against their own capability set
    /// and clamp numeric parameters before dispatch. On failure no partial
    /// artifact is ever visible to the caller.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, TtsError>;
}
