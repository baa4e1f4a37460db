//! Tests for local engine voice tables and command construction

use polyvox::engines::local::{LocalBackend, LocalEngine};
use polyvox::transcode::AudioTranscoder;
use polyvox::types::SynthesisRequest;
use std::sync::Arc;

fn backend(engine: LocalEngine) -> LocalBackend {
    LocalBackend::new(engine, Arc::new(AudioTranscoder::new("ffmpeg")))
}

fn voice_features(engine: LocalEngine, name: &str) -> polyvox::types::VoiceFeatures {
    engine
        .voices()
        .into_iter()
        .find(|v| v.name == name)
        .map(|v| v.features)
        .unwrap()
}

#[test]
fn test_every_engine_declares_voices() {
    for engine in LocalEngine::all() {
        let voices = engine.voices();
        assert!(!voices.is_empty(), "{} has no voices", engine.provider());
        for voice in &voices {
            assert_eq!(voice.provider, engine.provider());
            assert!(!voice.name.is_empty());
        }
    }
}

#[test]
fn test_provider_names_are_distinct() {
    let mut names: Vec<_> = LocalEngine::all().iter().map(|e| e.provider()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 5);
}

#[test]
fn test_espeak_invocation_clamps_rate_into_declared_range() {
    let backend = backend(LocalEngine::Espeak);
    let features = voice_features(LocalEngine::Espeak, "en");

    let mut request = SynthesisRequest::new("hello", "espeak", "en");
    request.rate = Some(9000);
    let invocation = backend.build_invocation(&request, &features);

    let rate_pos = invocation.args.iter().position(|a| a == "-s").unwrap();
    assert_eq!(invocation.args[rate_pos + 1], "450");
    assert!(invocation.args.contains(&"--stdout".to_string()));
}

#[test]
fn test_espeak_invocation_omits_unset_parameters() {
    let backend = backend(LocalEngine::Espeak);
    let features = voice_features(LocalEngine::Espeak, "en");

    let request = SynthesisRequest::new("hello", "espeak", "en");
    let invocation = backend.build_invocation(&request, &features);

    assert!(!invocation.args.contains(&"-p".to_string()));
    assert!(!invocation.args.contains(&"-a".to_string()));
}

#[test]
fn test_festival_invocation_is_a_scheme_script_on_stdin() {
    let backend = backend(LocalEngine::Festival);
    let features = voice_features(LocalEngine::Festival, "kal_diphone");

    let request = SynthesisRequest::new(r#"say "hi""#, "festival", "kal_diphone");
    let invocation = backend.build_invocation(&request, &features);

    assert!(invocation.args.is_empty());
    let script = invocation.stdin_script.unwrap();
    assert!(script.contains("(voice_kal_diphone)"));
    // Quotes in the text must be escaped inside the Scheme string literal.
    assert!(script.contains(r#"say \"hi\""#));
}

#[test]
fn test_flite_invocation_streams_to_stdout() {
    let backend = backend(LocalEngine::Flite);
    let features = voice_features(LocalEngine::Flite, "slt");

    let request = SynthesisRequest::new("hello", "flite", "slt");
    let invocation = backend.build_invocation(&request, &features);

    let out_pos = invocation.args.iter().position(|a| a == "-o").unwrap();
    assert_eq!(invocation.args[out_pos + 1], "/dev/stdout");
    assert!(invocation.args.contains(&"-voice".to_string()));
}

#[test]
fn test_dectalk_invocation_streams_raw_pcm() {
    let backend = backend(LocalEngine::Dectalk);
    let features = voice_features(LocalEngine::Dectalk, "0");

    let request = SynthesisRequest::new("hello", "dectalk", "0");
    let invocation = backend.build_invocation(&request, &features);

    assert!(invocation.args.contains(&"stdout:raw".to_string()));
    assert!(invocation.args.contains(&"-s".to_string()));
}

#[test]
fn test_dectalk_voices_declare_raw_streaming() {
    for voice in LocalEngine::Dectalk.voices() {
        assert!(voice.features.raw_stream);
    }
}

#[test]
fn test_sam_preset_controls_synthesis_parameters() {
    let backend = backend(LocalEngine::Sam);
    let features = voice_features(LocalEngine::Sam, "robot");

    let request = SynthesisRequest::new("hello", "sam", "robot");
    let invocation = backend.build_invocation(&request, &features);

    let speed_pos = invocation.args.iter().position(|a| a == "-speed").unwrap();
    assert_eq!(invocation.args[speed_pos + 1], "92");
    let throat_pos = invocation.args.iter().position(|a| a == "-throat").unwrap();
    assert_eq!(invocation.args[throat_pos + 1], "190");
}

#[test]
fn test_control_characters_never_reach_the_subprocess() {
    let backend = backend(LocalEngine::Espeak);
    let features = voice_features(LocalEngine::Espeak, "en");

    let request = SynthesisRequest::new("he\x00llo\x1bworld", "espeak", "en");
    let invocation = backend.build_invocation(&request, &features);

    let text = invocation.args.last().unwrap();
    assert!(!text.contains('\0'));
    assert!(!text.contains('\x1b'));
    assert_eq!(text, "helloworld");
}
