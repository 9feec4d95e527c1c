//! Entitlement token issuance and verification.
//!
//! Tokens are compact JWS (JWT) signed with Ed25519 (`alg: EdDSA`). The
//! validator accepts that one algorithm only: a token whose header names
//! anything else fails before its claims are looked at.
//!
//! Temporal claims are checked against the engine clock rather than the
//! JWT library's own, so `nbf`/`exp` and issuance always agree on what
//! "now" is.

use crate::error::{LicenseError, LicenseResult};
use crate::model::{License, LicenseId};
use chrono::{DateTime, Duration, TimeZone, Utc};
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the Ed25519 signing seed accepted by [`TokenIssuer`].
pub const SIGNING_KEY_LEN: usize = SECRET_KEY_LENGTH;

/// Length of the Ed25519 public key accepted by [`TokenValidator`].
pub const PUBLIC_KEY_LEN: usize = PUBLIC_KEY_LENGTH;

/// `nbf` is backdated by this many seconds to absorb issuer/consumer skew.
pub const NOT_BEFORE_SKEW_SECS: i64 = 30;

/// The only signature algorithm issued or accepted.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::EdDSA;

/// Claims carried by an entitlement token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementClaims {
    /// `lic_<license id>`.
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    /// License expiry at issuance time, seconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_expiry: Option<i64>,
}

impl EntitlementClaims {
    /// License id encoded in the subject, if well formed.
    #[must_use]
    pub fn license_id(&self) -> Option<LicenseId> {
        LicenseId::from_subject(&self.sub)
    }

    /// Device the token is bound to. Empty bindings count as unbound.
    #[must_use]
    pub fn bound_device(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|d| !d.is_empty())
    }

    /// `iat` as a timestamp.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        from_unix(self.iat)
    }

    /// `exp` as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        from_unix(self.exp)
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Signs entitlement tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    audience: String,
}

impl TokenIssuer {
    /// Creates an issuer from a 32-byte Ed25519 seed.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidSigningKey`] if `signing_key` is not
    /// exactly [`SIGNING_KEY_LEN`] bytes.
    pub fn new(signing_key: &[u8], audience: impl Into<String>) -> LicenseResult<Self> {
        let seed: [u8; SIGNING_KEY_LEN] =
            signing_key
                .try_into()
                .map_err(|_| LicenseError::InvalidSigningKey {
                    expected: SIGNING_KEY_LEN,
                    actual: signing_key.len(),
                })?;
        let der = SigningKey::from_bytes(&seed)
            .to_pkcs8_der()
            .map_err(|e| LicenseError::ServerMisconfigured(format!("signing key encoding: {e}")))?;

        Ok(Self {
            encoding: EncodingKey::from_ed_der(der.as_bytes()),
            audience: audience.into(),
        })
    }

    /// Audience written into every token.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Issues a token for `license`.
    ///
    /// The token expires at `now + ttl`, or at the license expiry if that
    /// comes first. An empty `device_id` yields an unbound token.
    ///
    /// # Errors
    ///
    /// - [`LicenseError::InvalidTtl`] if `ttl` does not reach the next whole second
    /// - [`LicenseError::LicenseExpired`] if the license expires no later than
    ///   the whole second of `now`
    /// - [`LicenseError::ServerMisconfigured`] if signing fails
    pub fn issue(
        &self,
        license: &License,
        features: &[String],
        device_id: Option<&str>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> LicenseResult<(String, EntitlementClaims)> {
        if ttl <= Duration::zero() {
            return Err(LicenseError::InvalidTtl(ttl.num_seconds()));
        }
        let requested = now
            .checked_add_signed(ttl)
            .ok_or(LicenseError::InvalidTtl(ttl.num_seconds()))?;
        // Claims carry whole seconds; exp must land strictly after iat.
        let iat = now.timestamp();
        if requested.timestamp() <= iat {
            return Err(LicenseError::InvalidTtl(ttl.num_seconds()));
        }
        let expires_at = match license.expires_at {
            Some(license_expiry) => requested.min(license_expiry),
            None => requested,
        };
        let exp = expires_at.timestamp();
        if exp <= iat {
            return Err(LicenseError::LicenseExpired);
        }

        let claims = EntitlementClaims {
            sub: license.id.subject(),
            aud: self.audience.clone(),
            iat,
            nbf: iat - NOT_BEFORE_SKEW_SECS,
            exp,
            product_id: license.product_id,
            device_id: device_id.filter(|d| !d.is_empty()).map(str::to_string),
            features: features.to_vec(),
            license_expiry: license.expires_at.map(|e| e.timestamp()),
        };

        let token = jsonwebtoken::encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| LicenseError::ServerMisconfigured(format!("token signing: {e}")))?;
        Ok((token, claims))
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[REDACTED]")
            .field("audience", &self.audience)
            .finish()
    }
}

/// Verifies entitlement tokens.
#[derive(Clone)]
pub struct TokenValidator {
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    /// Creates a validator for a raw 32-byte Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ServerMisconfigured`] if the key has the wrong
    /// length or is not a valid curve point.
    pub fn new(public_key: &[u8], audience: impl Into<String>) -> LicenseResult<Self> {
        let bytes: [u8; PUBLIC_KEY_LEN] = public_key.try_into().map_err(|_| {
            LicenseError::ServerMisconfigured(format!(
                "public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                public_key.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| {
            LicenseError::ServerMisconfigured("public key is not a valid Ed25519 point".to_string())
        })?;

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.set_audience(&[audience.into()]);
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "aud"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            decoding: DecodingKey::from_ed_der(&bytes),
            validation,
        })
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidToken`] on any signature, algorithm,
    /// audience, structural or temporal failure.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> LicenseResult<EntitlementClaims> {
        let data = jsonwebtoken::decode::<EntitlementClaims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|e| LicenseError::InvalidToken(describe(&e)))?;
        if data.header.alg != TOKEN_ALGORITHM {
            return Err(LicenseError::InvalidToken("unexpected algorithm".to_string()));
        }

        let claims = data.claims;
        let now = now.timestamp();
        if now < claims.nbf {
            return Err(LicenseError::InvalidToken("token not yet valid".to_string()));
        }
        if now >= claims.exp {
            return Err(LicenseError::InvalidToken("token expired".to_string()));
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("audience", &self.validation.aud)
            .finish()
    }
}

fn describe(err: &jsonwebtoken::errors::Error) -> String {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => "bad signature".to_string(),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            "unexpected algorithm".to_string()
        }
        ErrorKind::InvalidAudience => "wrong audience".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing claim {claim}"),
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            "malformed token".to_string()
        }
        _ => "token rejected".to_string(),
    }
}
