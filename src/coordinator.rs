//! Synthesis coordinator
//!
//! One instance per process owns the backend handles, the voice registry and
//! the artifact cache, and is handed by reference to whatever serves it.
//! Requests are validated before any resource is acquired; backend failures
//! are captured per call and never crash the coordinator; nothing here
//! retries on its own.

use crate::cache::ArtifactCache;
use crate::config::TtsConfig;
use crate::engines::bridge::BridgeBackend;
use crate::engines::cloud::CloudBackend;
use crate::engines::local::{LocalBackend, LocalEngine};
use crate::engines::SynthesisBackend;
use crate::error::TtsError;
use crate::registry::VoiceRegistry;
use crate::transcode::AudioTranscoder;
use crate::types::{AudioArtifact, SynthesisRequest, VoiceDescriptor};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A registered backend plus its last observed liveness
pub struct BackendHandle {
    backend: Arc<dyn SynthesisBackend>,
    available: AtomicBool,
}

impl BackendHandle {
    fn new(backend: Arc<dyn SynthesisBackend>, available: bool) -> Self {
        Self {
            backend,
            available: AtomicBool::new(available),
        }
    }

    pub fn is_marked_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}

/// Outcome of a successful synthesis call
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub artifact: AudioArtifact,
    pub cache_hit: bool,
    /// Where the artifact lives (or would live, if the cache write failed)
    pub path: PathBuf,
}

pub struct SynthesisCoordinator {
    config: TtsConfig,
    backends: HashMap<String, BackendHandle>,
    registry: VoiceRegistry,
    cache: ArtifactCache,
}

impl SynthesisCoordinator {
    /// Build the coordinator with the default backend set: the local engine
    /// families, the cloud API, and the bridge when enabled.
    pub async fn new(config: TtsConfig) -> Result<Self, TtsError> {
        config.validate().map_err(TtsError::Config)?;

        let transcoder = Arc::new(AudioTranscoder::new(config.ffmpeg_path.clone()));

        let mut backends: Vec<Arc<dyn SynthesisBackend>> = LocalEngine::all()
            .into_iter()
            .map(|engine| {
                Arc::new(LocalBackend::new(engine, transcoder.clone())) as Arc<dyn SynthesisBackend>
            })
            .collect();

        backends.push(Arc::new(CloudBackend::new(&config.cloud)?));

        if config.bridge.enabled {
            backends.push(Arc::new(BridgeBackend::new(
                &config.bridge,
                transcoder.clone(),
            )?));
        }

        Self::with_backends(config, backends).await
    }

    /// Build the coordinator over an explicit backend set
    pub async fn with_backends(
        config: TtsConfig,
        backends: Vec<Arc<dyn SynthesisBackend>>,
    ) -> Result<Self, TtsError> {
        config.validate().map_err(TtsError::Config)?;

        let cache = ArtifactCache::new(&config.cache_dir)?;
        let registry = VoiceRegistry::new();
        let mut handles = HashMap::new();

        for backend in backends {
            let name = backend.name().to_string();
            let available = backend.is_available().await;

            if available {
                let voices = backend.list_voices().await;
                info!(provider = %name, voices = voices.len(), "registered backend");
                registry.set_provider(&name, voices);
            } else {
                debug!(provider = %name, "backend not available at startup");
            }

            handles.insert(name, BackendHandle::new(backend, available));
        }

        Ok(Self {
            config,
            backends: handles,
            registry,
            cache,
        })
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    fn validate_request(&self, request: &SynthesisRequest) -> Result<(), TtsError> {
        if request.text.is_empty() {
            return Err(TtsError::InvalidParameter("text cannot be empty".to_string()));
        }

        if request.text.len() > self.config.max_text_length {
            return Err(TtsError::InvalidParameter(format!(
                "text too long ({} bytes, max {} bytes)",
                request.text.len(),
                self.config.max_text_length
            )));
        }

        if request.text.contains('\0') {
            return Err(TtsError::InvalidParameter(
                "text contains null bytes".to_string(),
            ));
        }

        Ok(())
    }

    /// Synthesize one request, consulting the cache first.
    ///
    /// Concurrent calls with an identical fingerprint serialize on a per-key
    /// lock: exactly one backend invocation happens, the rest observe the
    /// cached result. A cache write failure after successful synthesis is
    /// logged and the artifact is still returned.
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<Synthesized, TtsError> {
        self.validate_request(&request)?;

        let handle = self
            .backends
            .get(&request.provider)
            .ok_or_else(|| TtsError::UnknownProvider(request.provider.clone()))?;

        let key = request.fingerprint();

        if let Some(artifact) = self.cache.get(&key).await {
            return Ok(Synthesized {
                artifact,
                cache_hit: true,
                path: self.cache.path_for(&key),
            });
        }

        // An unknown voice fails here, before the per-key lock and without
        // any probe. A backend marked down has no registry snapshot to
        // validate against; its voice check happens after the re-probe
        // below fills one in.
        if handle.is_marked_available()
            && self.registry.find(&request.provider, &request.voice).is_none()
        {
            return Err(TtsError::UnknownVoice {
                provider: request.provider.clone(),
                voice: request.voice.clone(),
            });
        }

        // Per-key coordination step: whoever holds the lock synthesizes,
        // everyone else re-checks the cache afterwards.
        let _guard = self.cache.lock(&key).await;

        if let Some(artifact) = self.cache.get(&key).await {
            return Ok(Synthesized {
                artifact,
                cache_hit: true,
                path: self.cache.path_for(&key),
            });
        }

        if !handle.is_marked_available() {
            // One re-probe before giving up; the binary or service may have
            // come back since the last check.
            if handle.backend.is_available().await {
                handle.available.store(true, Ordering::Release);
                let voices = handle.backend.list_voices().await;
                self.registry.set_provider(&request.provider, voices);
            } else {
                return Err(TtsError::BackendUnavailable(request.provider.clone()));
            }

            if self.registry.find(&request.provider, &request.voice).is_none() {
                return Err(TtsError::UnknownVoice {
                    provider: request.provider.clone(),
                    voice: request.voice.clone(),
                });
            }
        }

        let limit = Duration::from_secs(self.config.synthesis_timeout_secs);
        let artifact = match timeout(limit, handle.backend.synthesize(&request)).await {
            Ok(Ok(artifact)) => artifact,
            Ok(Err(e)) => {
                if e.is_unavailability() {
                    handle.available.store(false, Ordering::Release);
                    self.registry.clear_provider(&request.provider);
                }
                return Err(e);
            }
            // Dropping the backend future reaps any in-flight subprocess
            // (kill_on_drop) and aborts network calls; the cache stays
            // untouched.
            Err(_) => return Err(TtsError::Timeout(self.config.synthesis_timeout_secs)),
        };

        let path = match self.cache.put(&key, &artifact).await {
            Ok(path) => path,
            Err(e) => {
                // Non-fatal: the caller still gets the artifact.
                warn!(key = %key, "cache write failed: {}", e);
                self.cache.path_for(&key)
            }
        };

        Ok(Synthesized {
            artifact,
            cache_hit: false,
            path,
        })
    }

    /// Voices per provider, aggregated only from backends currently marked
    /// available.
    pub fn list_providers(&self) -> HashMap<String, Vec<VoiceDescriptor>> {
        self.backends
            .iter()
            .filter(|(_, handle)| handle.is_marked_available())
            .map(|(name, _)| (name.clone(), self.registry.voices_for(name)))
            .collect()
    }

    /// Re-probe every registered backend. Cheap and safe to call often; the
    /// only state touched is each handle's availability flag.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let mut result = HashMap::new();
        for (name, handle) in &self.backends {
            let available = handle.backend.is_available().await;
            handle.available.store(available, Ordering::Release);
            result.insert(name.clone(), available);
        }
        result
    }

    /// Rebuild the voice registry wholesale from every available backend
    pub async fn refresh_voices(&self) {
        let mut map = HashMap::new();
        for (name, handle) in &self.backends {
            let available = handle.backend.is_available().await;
            handle.available.store(available, Ordering::Release);
            if available {
                map.insert(name.clone(), handle.backend.list_voices().await);
            }
        }
        self.registry.replace_all(map);
        info!(providers = self.registry.providers().len(), "voice registry refreshed");
    }
}
