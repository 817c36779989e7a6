//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use medchain_core::{Digest, Registrant, RegistrationRecord, RegistrationRequest, RequestId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::now_millis;
use crate::traits::{InsertResult, Store};

/// SQLite-based store.
///
/// The connection sits behind a mutex; `None` once the store is closed.
/// Registration runs inside an IMMEDIATE transaction, so the existence check
/// and the insert are atomic even when several processes share the file.
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migration::migrate(&mut conn)?;
        info!(path = %path.display(), "registry database opened");
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            let conn = guard.as_mut().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

const SELECT_RECORD: &str =
    "SELECT digest, registrant, position, registered_at, request_id FROM registrations";

fn blob<const N: usize>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    name: &str,
) -> rusqlite::Result<[u8; N]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, name.into(), rusqlite::types::Type::Blob)
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistrationRecord> {
    let position: i64 = row.get(2)?;
    Ok(RegistrationRecord {
        digest: Digest::from_bytes(blob(row, 0, "digest")?),
        registrant: Registrant::from_bytes(blob(row, 1, "registrant")?),
        position: position as u64,
        registered_at: row.get(3)?,
        request_id: RequestId::from_bytes(blob(row, 4, "request_id")?),
    })
}

fn query_record(conn: &Connection, digest: &Digest) -> Result<Option<RegistrationRecord>> {
    conn.query_row(
        &format!("{} WHERE digest = ?1", SELECT_RECORD),
        params![digest.as_bytes().as_slice()],
        row_to_record,
    )
    .optional()
    .map_err(StoreError::from)
}

#[async_trait]
impl Store for SqliteStore {
    async fn register(&self, request: &RegistrationRequest) -> Result<InsertResult> {
        request
            .verify()
            .map_err(|e| StoreError::Unauthorized(e.to_string()))?;

        let request = request.clone();

        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(existing) = query_record(&tx, &request.digest)? {
                debug!(digest = %request.digest, position = existing.position, "digest already registered");
                return Ok(InsertResult::AlreadyExists { existing });
            }

            let position: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM registrations",
                [],
                |row| row.get(0),
            )?;
            let registered_at = now_millis();

            tx.execute(
                "INSERT INTO registrations
                     (digest, registrant, signature, position, registered_at, request_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    request.digest.as_bytes().as_slice(),
                    request.registrant.as_bytes().as_slice(),
                    request.signature.as_bytes().as_slice(),
                    position,
                    registered_at,
                    request.request_id.as_bytes().as_slice(),
                ],
            )?;
            tx.commit()?;

            debug!(digest = %request.digest, position, "digest registered");
            Ok(InsertResult::Inserted(RegistrationRecord {
                digest: request.digest,
                registrant: request.registrant,
                position: position as u64,
                registered_at,
                request_id: request.request_id,
            }))
        })
        .await
    }

    async fn contains(&self, digest: &Digest) -> Result<bool> {
        let digest = *digest;

        self.with_conn(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM registrations WHERE digest = ?1",
                    params![digest.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn get_record(&self, digest: &Digest) -> Result<Option<RegistrationRecord>> {
        let digest = *digest;
        self.with_conn(move |conn| query_record(conn, &digest)).await
    }

    async fn records_by(&self, registrant: &Registrant) -> Result<Vec<RegistrationRecord>> {
        let registrant = *registrant;

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE registrant = ?1 ORDER BY position",
                SELECT_RECORD
            ))?;
            let records = stmt
                .query_map(params![registrant.as_bytes().as_slice()], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| StoreError::Database(e))?;
                info!("registry database closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medchain_core::{hasher, Keypair};

    fn request(seed: u8, body: &[u8]) -> RegistrationRequest {
        RegistrationRequest::sign(&Keypair::from_seed(&[seed; 32]), hasher::digest(body))
    }

    #[tokio::test]
    async fn test_register_and_get_record() {
        let store = SqliteStore::open_memory().unwrap();
        let req = request(1, b"prescription A");

        let result = store.register(&req).await.unwrap();
        let InsertResult::Inserted(record) = result else {
            panic!("expected Inserted");
        };
        assert_eq!(record.position, 1);
        assert_eq!(record.registrant, req.registrant);
        assert_eq!(record.request_id, req.request_id);

        let fetched = store.get_record(&req.digest).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let req = request(1, b"prescription A");

        let first = store.register(&req).await.unwrap();
        let second = store.register(&req).await.unwrap();

        assert!(first.is_inserted());
        assert_eq!(
            second,
            InsertResult::AlreadyExists {
                existing: first.record().clone()
            }
        );
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_contains_unknown_digest() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(!store
            .contains(&Digest::from_bytes([0xbb; 32]))
            .await
            .unwrap());
        assert!(store
            .get_record(&Digest::from_bytes([0xbb; 32]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_records_by_registrant() {
        let store = SqliteStore::open_memory().unwrap();
        store.register(&request(1, b"a")).await.unwrap();
        store.register(&request(2, b"b")).await.unwrap();
        store.register(&request(1, b"c")).await.unwrap();

        let mine = store
            .records_by(&Keypair::from_seed(&[1; 32]).registrant())
            .await
            .unwrap();
        let positions: Vec<u64> = mine.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let req = request(1, b"persisted");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.register(&req).await.unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.contains(&req.digest).await.unwrap());
        assert!(!store.register(&req).await.unwrap().is_inserted());
    }

    #[tokio::test]
    async fn test_closed_store_refuses_calls() {
        let store = SqliteStore::open_memory().unwrap();
        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(
            store.contains(&Digest::ZERO).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.count().await, Err(StoreError::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_single_winner() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let digest = hasher::digest(b"contended");

        let mut handles = Vec::new();
        for seed in 0..12u8 {
            let store = Arc::clone(&store);
            let req = RegistrationRequest::sign(&Keypair::from_seed(&[seed; 32]), digest);
            handles.push(tokio::spawn(async move { store.register(&req).await }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_inserted() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
