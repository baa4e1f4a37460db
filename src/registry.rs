//! Voice capability registry
//!
//! Read-mostly mapping from `(provider, voice)` to descriptor, populated
//! from each available backend's voice listing at startup and rebuilt
//! wholesale on refresh. A synthesis call reads a snapshot; entries are
//! never mutated mid-call.

use crate::types::VoiceDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct VoiceRegistry {
    inner: RwLock<HashMap<String, Vec<VoiceDescriptor>>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all entries for one provider
    pub fn set_provider(&self, provider: &str, voices: Vec<VoiceDescriptor>) {
        self.inner.write().insert(provider.to_string(), voices);
    }

    /// Drop a provider's entries entirely (backend went unavailable)
    pub fn clear_provider(&self, provider: &str) {
        self.inner.write().remove(provider);
    }

    /// Replace the whole registry in one step
    pub fn replace_all(&self, map: HashMap<String, Vec<VoiceDescriptor>>) {
        *self.inner.write() = map;
    }

    pub fn find(&self, provider: &str, voice: &str) -> Option<VoiceDescriptor> {
        self.inner
            .read()
            .get(provider)
            .and_then(|voices| voices.iter().find(|v| v.name == voice))
            .cloned()
    }

    pub fn voices_for(&self, provider: &str) -> Vec<VoiceDescriptor> {
        self.inner
            .read()
            .get(provider)
            .cloned()
            .unwrap_or_default()
    }

    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> HashMap<String, Vec<VoiceDescriptor>> {
        self.inner.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
