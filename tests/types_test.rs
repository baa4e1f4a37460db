//! Tests for request fingerprinting and core value types

use polyvox::types::{clamp_range, SapiVersion, SynthesisRequest, VoiceDescriptor};

#[test]
fn test_fingerprint_is_deterministic() {
    let a = SynthesisRequest::new("hello world", "espeak", "en");
    let b = SynthesisRequest::new("hello world", "espeak", "en");
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn test_fingerprint_ignores_optional_parameters() {
    let plain = SynthesisRequest::new("hello", "espeak", "en");
    let mut tuned = SynthesisRequest::new("hello", "espeak", "en");
    tuned.rate = Some(200);
    tuned.pitch = Some(30);
    tuned.volume = Some(80);
    assert_eq!(plain.fingerprint(), tuned.fingerprint());
}

#[test]
fn test_fingerprint_varies_with_each_input() {
    let base = SynthesisRequest::new("hello", "espeak", "en");
    let other_text = SynthesisRequest::new("hello!", "espeak", "en");
    let other_provider = SynthesisRequest::new("hello", "flite", "en");
    let other_voice = SynthesisRequest::new("hello", "espeak", "en-us");

    assert_ne!(base.fingerprint(), other_text.fingerprint());
    assert_ne!(base.fingerprint(), other_provider.fingerprint());
    assert_ne!(base.fingerprint(), other_voice.fingerprint());
}

#[test]
fn test_fingerprint_fields_are_not_ambiguous_across_boundaries() {
    // "ab" + "c" must not collide with "a" + "bc"
    let a = SynthesisRequest::new("ab", "c", "v");
    let b = SynthesisRequest::new("a", "bc", "v");
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn test_key_is_lowercase_hex_and_names_an_mp3() {
    let key = SynthesisRequest::new("hi", "espeak", "en").fingerprint();
    assert_eq!(key.as_str().len(), 64);
    assert!(key
        .as_str()
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(key.file_name(), format!("{}.mp3", key.as_str()));
}

#[test]
fn test_request_deserializes_without_optional_fields() {
    let request: SynthesisRequest =
        serde_json::from_str(r#"{"text":"hi","provider":"espeak","voice":"en"}"#).unwrap();
    assert_eq!(request.rate, None);
    assert_eq!(request.pitch, None);
    assert_eq!(request.volume, None);
}

#[test]
fn test_sapi_version_from_number() {
    assert_eq!(SapiVersion::from_number(Some(4)), SapiVersion::Four);
    assert_eq!(SapiVersion::from_number(Some(5)), SapiVersion::Five);
    assert_eq!(SapiVersion::from_number(Some(6)), SapiVersion::Unknown);
    assert_eq!(SapiVersion::from_number(None), SapiVersion::Unknown);
}

#[test]
fn test_clamp_range() {
    assert_eq!(clamp_range(500, (80, 450)), 450);
    assert_eq!(clamp_range(10, (80, 450)), 80);
    assert_eq!(clamp_range(150, (80, 450)), 150);
}

#[test]
fn test_voice_descriptor_defaults() {
    let voice = VoiceDescriptor::new("espeak", "en");
    assert_eq!(voice.sapi_version, SapiVersion::Unknown);
    assert!(!voice.features.raw_stream);
    assert!(voice.features.languages.is_empty());
}
