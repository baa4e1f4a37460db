//! Tests for SAPI generation negotiation and parameter mapping

use polyvox::engines::bridge::{clamp_for_generation, features_for_version};
use polyvox::types::SapiVersion;

#[test]
fn test_sapi5_passes_in_range_values_through() {
    let params = clamp_for_generation(SapiVersion::Five, Some(3), Some(-7), Some(80));
    assert_eq!(params.rate, 3);
    assert_eq!(params.pitch, -7);
    assert_eq!(params.volume, Some(80));
}

#[test]
fn test_sapi5_clamps_out_of_range_values() {
    let params = clamp_for_generation(SapiVersion::Five, Some(15), Some(-99), Some(250));
    assert_eq!(params.rate, 10);
    assert_eq!(params.pitch, -10);
    assert_eq!(params.volume, Some(100));
}

#[test]
fn test_sapi5_defaults_to_neutral() {
    let params = clamp_for_generation(SapiVersion::Five, None, None, None);
    assert_eq!(params.rate, 0);
    assert_eq!(params.pitch, 0);
    assert_eq!(params.volume, None);
}

#[test]
fn test_sapi4_remaps_rate_and_pitch_around_neutral_50() {
    let params = clamp_for_generation(SapiVersion::Four, Some(2), Some(-4), None);
    assert_eq!(params.rate, 60); // 50 + 2*5
    assert_eq!(params.pitch, 30); // 50 + -4*5
}

#[test]
fn test_sapi4_clamps_remapped_values_into_0_100() {
    let params = clamp_for_generation(SapiVersion::Four, Some(15), Some(-15), None);
    assert_eq!(params.rate, 100);
    assert_eq!(params.pitch, 0);
}

#[test]
fn test_sapi4_remap_saturates_on_extreme_input() {
    // Values far outside the scale must saturate, never wrap or panic.
    let params = clamp_for_generation(SapiVersion::Four, Some(i32::MAX), Some(i32::MIN), None);
    assert_eq!(params.rate, 100);
    assert_eq!(params.pitch, 0);

    let params = clamp_for_generation(SapiVersion::Five, Some(i32::MAX), Some(i32::MIN), Some(i32::MAX));
    assert_eq!(params.rate, 10);
    assert_eq!(params.pitch, -10);
    assert_eq!(params.volume, Some(100));
}

#[test]
fn test_sapi4_silently_drops_volume() {
    let params = clamp_for_generation(SapiVersion::Four, Some(0), Some(0), Some(90));
    assert_eq!(params.volume, None);
}

#[test]
fn test_sapi4_defaults_to_neutral_50() {
    let params = clamp_for_generation(SapiVersion::Four, None, None, None);
    assert_eq!(params.rate, 50);
    assert_eq!(params.pitch, 50);
}

#[test]
fn test_unknown_generation_is_treated_as_sapi4() {
    let unknown = clamp_for_generation(SapiVersion::Unknown, Some(3), Some(3), Some(50));
    let four = clamp_for_generation(SapiVersion::Four, Some(3), Some(3), Some(50));
    assert_eq!(unknown, four);
}

#[test]
fn test_features_reflect_generation_capabilities() {
    let five = features_for_version(SapiVersion::Five);
    assert!(five.raw_stream);
    assert!(five.volume_control);
    assert_eq!(five.rate_range, (-10, 10));

    let four = features_for_version(SapiVersion::Four);
    assert!(!four.raw_stream);
    assert!(!four.volume_control);
    assert_eq!(four.rate_range, (0, 100));

    // Unverified voices get the conservative capability set.
    assert_eq!(features_for_version(SapiVersion::Unknown), four);
}
