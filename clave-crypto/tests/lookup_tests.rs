use clave_crypto::{CryptoError, LookupDigest, LookupIndexer, DIGEST_SIZE, MIN_SECRET_LEN};

const SECRET: &[u8] = b"lookup-secret-for-tests-0123456789";

#[test]
fn short_secret_rejected() {
    let err = LookupIndexer::new(b"short").unwrap_err();
    match err {
        CryptoError::InvalidSecret { min, actual } => {
            assert_eq!(min, MIN_SECRET_LEN);
            assert_eq!(actual, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_secret_rejected() {
    assert!(LookupIndexer::new(&[]).is_err());
}

#[test]
fn digest_ignores_key_formatting() {
    let indexer = LookupIndexer::new(SECRET).unwrap();
    let a = indexer.digest("LIC-ABCD-EFGH");
    let b = indexer.digest(" lic abcd efgh ");
    assert_eq!(a, b);
}

#[test]
fn different_keys_different_digests() {
    let indexer = LookupIndexer::new(SECRET).unwrap();
    assert_ne!(indexer.digest("LIC-AAAA"), indexer.digest("LIC-AAAB"));
}

#[test]
fn rotated_secret_changes_digest() {
    let old = LookupIndexer::new(SECRET).unwrap();
    let new = LookupIndexer::new(b"a-completely-different-secret!!").unwrap();
    assert_ne!(old.digest("LIC-ABCD"), new.digest("LIC-ABCD"));
}

#[test]
fn digest_matches_reference_hmac() {
    // HMAC-SHA256(key = 16 x 0x0b, "LICABCD")
    const EXPECTED: [u8; DIGEST_SIZE] = [
        0x15, 0x28, 0x47, 0xbc, 0x18, 0x90, 0x79, 0xd0, 0xd6, 0xa1, 0xd1, 0xa2, 0x16, 0x2f, 0x7d,
        0x6e, 0x3e, 0x4c, 0x7b, 0x6a, 0xc2, 0x75, 0x91, 0x75, 0x09, 0x9d, 0xf8, 0xa6, 0x6f, 0x8f,
        0x2d, 0xc6,
    ];
    let indexer = LookupIndexer::new(&[0x0b; 16]).unwrap();
    assert_eq!(indexer.digest("lic-abcd").as_bytes(), &EXPECTED);
}

#[test]
fn digest_slice_roundtrip() {
    let indexer = LookupIndexer::new(SECRET).unwrap();
    let digest = indexer.digest("LIC-ABCD");
    let restored = LookupDigest::from_slice(digest.as_bytes()).unwrap();
    assert_eq!(restored, digest);
    assert!(LookupDigest::from_slice(&[0u8; 31]).is_none());
}

#[test]
fn debug_output_is_redacted() {
    let indexer = LookupIndexer::new(SECRET).unwrap();
    let digest = indexer.digest("LIC-ABCD");
    assert!(format!("{digest:?}").contains("REDACTED"));
    assert!(format!("{indexer:?}").contains("REDACTED"));
    assert!(!format!("{indexer:?}").contains("lookup-secret"));
}
