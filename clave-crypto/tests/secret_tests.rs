use clave_crypto::{CryptoError, SecretHash, SecretParams, SecretVerifier};

fn fast_verifier() -> SecretVerifier {
    SecretVerifier::new(SecretParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: 32,
    })
    .unwrap()
}

#[test]
fn default_params_are_documented_values() {
    let params = SecretParams::default();
    assert_eq!(params.memory_cost, 19 * 1024);
    assert_eq!(params.time_cost, 2);
    assert_eq!(params.parallelism, 1);
    assert_eq!(params.output_len, 32);
}

#[test]
fn invalid_params_rejected() {
    let err = SecretVerifier::new(SecretParams {
        memory_cost: 1,
        time_cost: 0,
        parallelism: 1,
        output_len: 32,
    })
    .unwrap_err();
    assert!(matches!(err, CryptoError::InvalidParams(_)));
}

#[test]
fn hash_then_verify() {
    let verifier = fast_verifier();
    let record = verifier.hash("LIC-ABCD-EFGH").unwrap();
    assert!(verifier.verify("LIC-ABCD-EFGH", &record).unwrap());
}

#[test]
fn verify_accepts_cosmetic_variants() {
    let verifier = fast_verifier();
    let record = verifier.hash("LIC-ABCD-EFGH").unwrap();
    assert!(verifier.verify("lic abcd efgh", &record).unwrap());
}

#[test]
fn wrong_key_is_false_not_error() {
    let verifier = fast_verifier();
    let record = verifier.hash("LIC-ABCD-EFGH").unwrap();
    assert!(!verifier.verify("LIC-ABCD-EFGX", &record).unwrap());
}

#[test]
fn salts_make_hashes_distinct() {
    let verifier = fast_verifier();
    let a = verifier.hash("LIC-ABCD").unwrap();
    let b = verifier.hash("LIC-ABCD").unwrap();
    assert_ne!(a, b);
}

#[test]
fn verification_uses_record_parameters() {
    let strong = SecretVerifier::new(SecretParams {
        memory_cost: 2048,
        time_cost: 2,
        parallelism: 1,
        output_len: 32,
    })
    .unwrap();
    let record = strong.hash("LIC-ABCD").unwrap();
    assert!(fast_verifier().verify("LIC-ABCD", &record).unwrap());
}

#[test]
fn malformed_record_is_error() {
    let verifier = fast_verifier();
    let err = verifier
        .verify("LIC-ABCD", &SecretHash::from_encoded("not-a-phc-string"))
        .unwrap_err();
    assert!(matches!(err, CryptoError::MalformedHash(_)));
}

#[test]
fn empty_record_is_error() {
    let verifier = fast_verifier();
    assert!(verifier.verify("LIC-ABCD", &SecretHash::from_encoded("")).is_err());
}

#[test]
fn secret_hash_debug_redacted() {
    let record = fast_verifier().hash("LIC-ABCD").unwrap();
    let debug = format!("{record:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains("argon2id"));
}
