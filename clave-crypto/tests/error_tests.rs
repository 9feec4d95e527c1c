use clave_crypto::CryptoError;

#[test]
fn error_display_entropy() {
    let err = CryptoError::Entropy("getrandom failed".into());
    let msg = format!("{err}");
    assert!(msg.contains("entropy"));
    assert!(msg.contains("getrandom failed"));
}

#[test]
fn error_display_invalid_secret() {
    let err = CryptoError::InvalidSecret { min: 16, actual: 4 };
    let msg = format!("{err}");
    assert!(msg.contains("16"));
    assert!(msg.contains("4"));
}

#[test]
fn error_display_malformed_hash() {
    let err = CryptoError::MalformedHash("missing salt".into());
    let msg = format!("{err}");
    assert!(msg.contains("malformed secret hash"));
    assert!(msg.contains("missing salt"));
}

#[test]
fn error_display_hashing() {
    let err = CryptoError::Hashing("out of memory".into());
    assert!(format!("{err}").contains("hashing failed"));
}

#[test]
fn error_display_invalid_params() {
    let err = CryptoError::InvalidParams("memory cost too small".into());
    assert!(format!("{err}").contains("invalid hash parameters"));
}
