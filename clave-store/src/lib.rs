//! SQLite storage for Clave licenses and activations.
//!
//! Implements [`clave_license::LicenseRepository`] over a single SQLite
//! file (or an in-memory database). Only lookup digests and Argon2id hashes
//! of license keys are stored; plaintext keys never reach this layer.
//!
//! # Schema
//!
//! - `licenses`: one row per license, `lookup_digest` unique
//! - `activations`: one row per committed activation, keyed to a license

mod error;
mod license_store;

pub use error::{StoreError, StoreResult};
pub use license_store::SqliteLicenseStore;
