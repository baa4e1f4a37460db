//! Concurrency tests: identical in-flight requests collapse to one synthesis

use async_trait::async_trait;
use bytes::Bytes;
use polyvox::config::TtsConfig;
use polyvox::coordinator::SynthesisCoordinator;
use polyvox::engines::SynthesisBackend;
use polyvox::error::TtsError;
use polyvox::types::{AudioArtifact, SynthesisRequest, VoiceDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Backend that counts invocations and takes a little while per call
struct SlowCountingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl SynthesisBackend for SlowCountingBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn list_voices(&self) -> Vec<VoiceDescriptor> {
        vec![
            VoiceDescriptor::new("mock", "alpha"),
            VoiceDescriptor::new("mock", "beta"),
        ]
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(AudioArtifact::mp3(Bytes::from(format!(
            "mp3:{}:{}",
            request.voice, request.text
        ))))
    }
}

async fn build(dir: &TempDir) -> (SynthesisCoordinator, Arc<SlowCountingBackend>) {
    let backend = Arc::new(SlowCountingBackend {
        calls: AtomicUsize::new(0),
    });
    let mut config = TtsConfig::default();
    config.cache_dir = dir.path().to_path_buf();
    let coordinator = SynthesisCoordinator::with_backends(
        config,
        vec![backend.clone() as Arc<dyn SynthesisBackend>],
    )
    .await
    .unwrap();
    (coordinator, backend)
}

#[tokio::test]
async fn test_identical_concurrent_requests_synthesize_once() {
    let dir = TempDir::new().unwrap();
    let (coordinator, backend) = build(&dir).await;
    let coordinator = Arc::new(coordinator);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .synthesize(SynthesisRequest::new("hello", "mock", "alpha"))
                .await
        }));
    }

    let mut hits = 0;
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.artifact.data.as_ref(), b"mp3:alpha:hello");
        if result.cache_hit {
            hits += 1;
        }
    }

    // Exactly one caller did the work; the rest observed its artifact.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits, 7);
    // With nothing in flight the lock table is empty again.
    assert_eq!(coordinator.cache().pending_locks(), 0);
}

#[tokio::test]
async fn test_distinct_requests_run_independently() {
    let dir = TempDir::new().unwrap();
    let (coordinator, backend) = build(&dir).await;
    let coordinator = Arc::new(coordinator);

    let texts = ["one", "two", "three", "four"];
    let mut handles = Vec::new();
    for text in texts {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .synthesize(SynthesisRequest::new(text, "mock", "alpha"))
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), texts.len());
}

#[tokio::test]
async fn test_same_text_different_voice_is_a_different_artifact() {
    let dir = TempDir::new().unwrap();
    let (coordinator, backend) = build(&dir).await;

    let a = coordinator
        .synthesize(SynthesisRequest::new("hello", "mock", "alpha"))
        .await
        .unwrap();
    let b = coordinator
        .synthesize(SynthesisRequest::new("hello", "mock", "beta"))
        .await
        .unwrap();

    assert_ne!(a.path, b.path);
    assert_ne!(a.artifact.data, b.artifact.data);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_sequential_repeat_after_concurrent_burst_stays_cached() {
    let dir = TempDir::new().unwrap();
    let (coordinator, backend) = build(&dir).await;
    let coordinator = Arc::new(coordinator);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .synthesize(SynthesisRequest::new("burst", "mock", "alpha"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let later = coordinator
        .synthesize(SynthesisRequest::new("burst", "mock", "alpha"))
        .await
        .unwrap();
    assert!(later.cache_hit);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}
