//! Tests for error display and classification

use polyvox::error::TtsError;

#[test]
fn test_error_messages_name_the_offender() {
    let err = TtsError::UnknownProvider("warbler".to_string());
    assert_eq!(err.to_string(), "unknown provider: warbler");

    let err = TtsError::UnknownVoice {
        provider: "espeak".to_string(),
        voice: "xx".to_string(),
    };
    assert!(err.to_string().contains("xx"));
    assert!(err.to_string().contains("espeak"));

    let err = TtsError::Timeout(60);
    assert!(err.to_string().contains("60 seconds"));
}

#[test]
fn test_unavailability_classification() {
    assert!(TtsError::BackendUnavailable("sam".to_string()).is_unavailability());
    assert!(!TtsError::Synthesis("boom".to_string()).is_unavailability());
    assert!(!TtsError::Timeout(1).is_unavailability());
    assert!(!TtsError::BridgeProtocol("bad json".to_string()).is_unavailability());
}

#[test]
fn test_io_errors_convert_automatically() {
    fn read_missing() -> Result<Vec<u8>, TtsError> {
        Ok(std::fs::read("/definitely/not/a/real/path")?)
    }
    assert!(matches!(read_missing(), Err(TtsError::Io(_))));
}
