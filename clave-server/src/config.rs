//! Command-line and environment configuration.

use clap::Parser;
use clave_license::{EngineSettings, KeyMaterial, LicenseResult};
use clave_store::{SqliteLicenseStore, StoreResult};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Database path that selects a throwaway in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Longest accepted activation token lifetime (ten years), in hours.
pub const MAX_ACTIVATION_TTL_HOURS: i64 = 10 * 366 * 24;

#[derive(Parser, Clone)]
#[command(name = "clave-server")]
#[command(about = "License activation and entitlement token server")]
pub struct Args {
    /// Address to bind the HTTP API to
    #[arg(long, env = "CLAVE_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// SQLite database path, or ":memory:"
    #[arg(long, env = "CLAVE_DATABASE", default_value = "clave.db")]
    pub database: String,

    /// Base64 HMAC secret for license lookup digests (at least 16 bytes)
    #[arg(long, env = "CLAVE_HMAC_SECRET", hide_env_values = true)]
    pub hmac_secret: String,

    /// Base64 32-byte Ed25519 seed for signing tokens
    #[arg(long, env = "CLAVE_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: String,

    /// Base64 Ed25519 public key; must match the signing key when given
    #[arg(long, env = "CLAVE_PUBLIC_KEY")]
    pub public_key: Option<String>,

    /// Audience claim for issued tokens
    #[arg(long, env = "CLAVE_AUDIENCE", default_value = "clave")]
    pub audience: String,

    /// Lifetime of tokens issued at activation, in hours
    #[arg(
        long,
        env = "CLAVE_ACTIVATION_TTL_HOURS",
        default_value_t = 168,
        value_parser = clap::value_parser!(i64).range(1..=MAX_ACTIVATION_TTL_HOURS)
    )]
    pub activation_ttl_hours: i64,

    /// Per-request deadline, in milliseconds
    #[arg(
        long,
        env = "CLAVE_REQUEST_TIMEOUT_MS",
        default_value_t = 3000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Decodes the configured keys.
    pub fn key_material(&self) -> LicenseResult<KeyMaterial> {
        KeyMaterial::from_base64(
            &self.hmac_secret,
            &self.signing_key,
            self.public_key.as_deref().filter(|k| !k.trim().is_empty()),
        )
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            audience: self.audience.clone(),
            activation_ttl: chrono::Duration::hours(self.activation_ttl_hours),
            ..EngineSettings::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Opens the configured SQLite store.
    pub fn open_store(&self) -> StoreResult<SqliteLicenseStore> {
        if self.database == IN_MEMORY_DATABASE {
            SqliteLicenseStore::open_in_memory()
        } else {
            SqliteLicenseStore::open(&self.database)
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("listen", &self.listen)
            .field("database", &self.database)
            .field("hmac_secret", &"[REDACTED]")
            .field("signing_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("audience", &self.audience)
            .field("activation_ttl_hours", &self.activation_ttl_hours)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("verbose", &self.verbose)
            .finish()
    }
}
