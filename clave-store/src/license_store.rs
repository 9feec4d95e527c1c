//! SQLite-backed [`LicenseRepository`].
//!
//! One connection behind a mutex; every trait call hops onto the blocking
//! pool so the async runtime never waits on SQLite.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use clave_crypto::{LookupDigest, SecretHash};
use clave_license::{
    Activation, ActivationId, License, LicenseId, LicenseRepository, NewLicense, RepositoryError,
    RepositoryResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const LICENSE_COLUMNS: &str =
    "id, product_id, max_activations, lookup_digest, secret_hash, expires_at, features";

/// Persistent license and activation store backed by SQLite.
#[derive(Clone)]
pub struct SqliteLicenseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLicenseStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS licenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                max_activations INTEGER NOT NULL,
                lookup_digest BLOB NOT NULL UNIQUE,
                secret_hash TEXT NOT NULL,
                expires_at INTEGER,
                features TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS activations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                license_id INTEGER NOT NULL REFERENCES licenses(id),
                device_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activations_license
                ON activations(license_id);
            ",
        )?;
        Ok(())
    }

    // ── Administration ───────────────────────────────────────────

    /// Replaces a license's expiry. Not reachable through the engine.
    pub fn set_license_expiry(
        &self,
        id: LicenseId,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let changed = conn.execute(
            "UPDATE licenses SET expires_at = ?1 WHERE id = ?2",
            params![expires_at.map(|at| at.timestamp()), id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownLicense(id));
        }
        debug!(license_id = %id, "license expiry updated");
        Ok(())
    }

    /// All activations recorded for a license, oldest first.
    pub fn activations(&self, license_id: LicenseId) -> StoreResult<Vec<Activation>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, license_id, device_id, created_at FROM activations
             WHERE license_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![license_id.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut activations = Vec::new();
        for row in rows {
            let (id, license_id, device_id, created_at) = row?;
            activations.push(Activation {
                id: ActivationId::new(id),
                license_id: LicenseId::new(license_id),
                device_id,
                created_at: from_text(&created_at)?,
            });
        }
        Ok(activations)
    }

    async fn run<T, F>(&self, query: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            query(&conn)
        })
        .await
        .map_err(|e| RepositoryError::from(StoreError::Task(e.to_string())))?
        .map_err(Into::into)
    }
}

#[async_trait]
impl LicenseRepository for SqliteLicenseStore {
    async fn create_license(&self, license: NewLicense) -> RepositoryResult<LicenseId> {
        self.run(move |conn| {
            let features = serde_json::to_string(&license.features)?;
            conn.execute(
                "INSERT INTO licenses
                    (product_id, max_activations, lookup_digest, secret_hash, expires_at, features)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    license.product_id,
                    i64::from(license.max_activations),
                    license.lookup_digest.as_bytes().as_slice(),
                    license.secret_hash.as_str(),
                    license.expires_at.map(|at| at.timestamp()),
                    features,
                ],
            )?;
            Ok(LicenseId::new(conn.last_insert_rowid()))
        })
        .await
    }

    async fn license_by_digest(&self, digest: &LookupDigest) -> RepositoryResult<Option<License>> {
        let digest = *digest;
        self.run(move |conn| {
            let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE lookup_digest = ?1");
            conn.query_row(&sql, params![digest.as_bytes().as_slice()], LicenseRow::read)
                .optional()?
                .map(LicenseRow::into_license)
                .transpose()
        })
        .await
    }

    async fn license_by_id(&self, id: LicenseId) -> RepositoryResult<Option<License>> {
        self.run(move |conn| {
            let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE id = ?1");
            conn.query_row(&sql, params![id.get()], LicenseRow::read)
                .optional()?
                .map(LicenseRow::into_license)
                .transpose()
        })
        .await
    }

    async fn count_activations(&self, license_id: LicenseId) -> RepositoryResult<u32> {
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM activations WHERE license_id = ?1",
                params![license_id.get()],
                |row| row.get(0),
            )?;
            u32::try_from(count)
                .map_err(|_| StoreError::InvalidData(format!("activation count {count}")))
        })
        .await
    }

    async fn insert_activation(
        &self,
        license_id: LicenseId,
        device_id: &str,
    ) -> RepositoryResult<ActivationId> {
        let device_id = device_id.to_string();
        self.run(move |conn| {
            let known = conn
                .query_row(
                    "SELECT 1 FROM licenses WHERE id = ?1",
                    params![license_id.get()],
                    |_| Ok(()),
                )
                .optional()?;
            if known.is_none() {
                return Err(StoreError::UnknownLicense(license_id));
            }

            conn.execute(
                "INSERT INTO activations (license_id, device_id, created_at) VALUES (?1, ?2, ?3)",
                params![license_id.get(), device_id, to_text(Utc::now())],
            )?;
            Ok(ActivationId::new(conn.last_insert_rowid()))
        })
        .await
    }
}

/// Raw column values, decoded outside the rusqlite row callback so
/// malformed data surfaces as [`StoreError`] rather than a SQL error.
struct LicenseRow {
    id: i64,
    product_id: i64,
    max_activations: i64,
    lookup_digest: Vec<u8>,
    secret_hash: String,
    /// Unix seconds.
    expires_at: Option<i64>,
    features: String,
}

impl LicenseRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            product_id: row.get(1)?,
            max_activations: row.get(2)?,
            lookup_digest: row.get(3)?,
            secret_hash: row.get(4)?,
            expires_at: row.get(5)?,
            features: row.get(6)?,
        })
    }

    fn into_license(self) -> StoreResult<License> {
        let lookup_digest = LookupDigest::from_slice(&self.lookup_digest).ok_or_else(|| {
            StoreError::InvalidData(format!("license {}: lookup digest length", self.id))
        })?;
        let max_activations = u32::try_from(self.max_activations).map_err(|_| {
            StoreError::InvalidData(format!("license {}: max_activations out of range", self.id))
        })?;
        let expires_at = self
            .expires_at
            .map(|secs| {
                DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                    StoreError::InvalidData(format!("license {}: expires_at out of range", self.id))
                })
            })
            .transpose()?;

        Ok(License {
            id: LicenseId::new(self.id),
            product_id: self.product_id,
            max_activations,
            lookup_digest,
            secret_hash: SecretHash::from_encoded(self.secret_hash),
            expires_at,
            features: serde_json::from_str(&self.features)?,
        })
    }
}

fn to_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn from_text(text: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("timestamp {text:?}: {e}")))
}
