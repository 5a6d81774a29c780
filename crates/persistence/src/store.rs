//! Slot storage backends.
//!
//! A slot is a named string value. Local stores hold the primary and backup
//! slots; a [`RemoteStore`] mirrors one document per signed-in user.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::PersistError;

/// Local key-value slot storage.
pub trait SlotStore: Send + Sync {
    /// `Ok(None)` when the slot has never been written.
    fn read(&self, slot: &str) -> impl Future<Output = Result<Option<String>, PersistError>> + Send;
    fn write(&self, slot: &str, body: &str) -> impl Future<Output = Result<(), PersistError>> + Send;
    fn delete(&self, slot: &str) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Cloud document store keyed by user id.
pub trait RemoteStore: Send + Sync {
    fn remote_read(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<String>, PersistError>> + Send;
    fn remote_write(
        &self,
        user_id: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;
    fn remote_delete(&self, user_id: &str) -> impl Future<Output = Result<(), PersistError>> + Send;
}

fn lock_err<T>(_: std::sync::PoisonError<T>) -> PersistError {
    PersistError::StorageUnavailable("store lock poisoned".into())
}

/// In-process slots with switchable failures and optional latency.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    unreadable: Mutex<HashSet<String>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation sleeps `latency` before touching the slots.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make reads of one slot fail while the others keep working.
    pub fn set_unreadable(&self, slot: &str, unreadable: bool) {
        if let Ok(mut set) = self.unreadable.lock() {
            if unreadable {
                set.insert(slot.to_string());
            } else {
                set.remove(slot);
            }
        }
    }

    /// Overwrite a slot directly, bypassing failure switches.
    pub fn put_raw(&self, slot: &str, body: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(slot.to_string(), body.to_string());
        }
    }

    pub fn get_raw(&self, slot: &str) -> Option<String> {
        self.slots.lock().ok()?.get(slot).cloned()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn get(&self, slot: &str) -> Result<Option<String>, PersistError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistError::storage("memory store read failure"));
        }
        if self.unreadable.lock().map_err(lock_err)?.contains(slot) {
            return Err(PersistError::storage(format!("slot {slot} unreadable")));
        }
        Ok(self.slots.lock().map_err(lock_err)?.get(slot).cloned())
    }

    fn set(&self, slot: &str, body: Option<&str>) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::storage("memory store write failure"));
        }
        let mut slots = self.slots.lock().map_err(lock_err)?;
        match body {
            Some(body) => slots.insert(slot.to_string(), body.to_string()),
            None => slots.remove(slot),
        };
        Ok(())
    }
}

impl SlotStore for MemoryStore {
    async fn read(&self, slot: &str) -> Result<Option<String>, PersistError> {
        self.pause().await;
        self.get(slot)
    }

    async fn write(&self, slot: &str, body: &str) -> Result<(), PersistError> {
        self.pause().await;
        self.set(slot, Some(body))
    }

    async fn delete(&self, slot: &str) -> Result<(), PersistError> {
        self.pause().await;
        self.set(slot, None)
    }
}

/// One `<slot>.json` file per slot under a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl SlotStore for FileStore {
    async fn read(&self, slot: &str) -> Result<Option<String>, PersistError> {
        match tokio::fs::read_to_string(self.path_of(slot)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::storage(e)),
        }
    }

    async fn write(&self, slot: &str, body: &str) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(PersistError::storage)?;
        let path = self.path_of(slot);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(PersistError::storage)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(PersistError::storage)?;
        debug!(path = %path.display(), bytes = body.len(), "slot written");
        Ok(())
    }

    async fn delete(&self, slot: &str) -> Result<(), PersistError> {
        match tokio::fs::remove_file(self.path_of(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::storage(e)),
        }
    }
}

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/slots.db"
}

/// Open (creating if needed) the slot database and ensure its table exists.
pub async fn init_db(url: &str) -> Result<SqlitePool, PersistError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(PersistError::storage)?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(PersistError::storage)?;
    sqlx::query("CREATE TABLE IF NOT EXISTS save_slots (slot TEXT PRIMARY KEY, body TEXT NOT NULL)")
        .execute(&pool)
        .await
        .map_err(PersistError::storage)?;
    Ok(pool)
}

/// Slots as rows of a `save_slots` table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(url: &str) -> Result<Self, PersistError> {
        Ok(Self::new(init_db(url).await?))
    }

    pub async fn slot_names(&self) -> Result<Vec<String>, PersistError> {
        let rows = sqlx::query("SELECT slot FROM save_slots ORDER BY slot")
            .fetch_all(&self.pool)
            .await
            .map_err(PersistError::storage)?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("slot").map_err(PersistError::storage))
            .collect()
    }
}

impl SlotStore for SqliteStore {
    async fn read(&self, slot: &str) -> Result<Option<String>, PersistError> {
        let row = sqlx::query("SELECT body FROM save_slots WHERE slot = ?")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await
            .map_err(PersistError::storage)?;
        row.map(|r| r.try_get::<String, _>("body"))
            .transpose()
            .map_err(PersistError::storage)
    }

    async fn write(&self, slot: &str, body: &str) -> Result<(), PersistError> {
        sqlx::query(
            "INSERT INTO save_slots (slot, body) VALUES (?, ?) \
             ON CONFLICT(slot) DO UPDATE SET body = excluded.body",
        )
        .bind(slot)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(PersistError::storage)?;
        Ok(())
    }

    async fn delete(&self, slot: &str) -> Result<(), PersistError> {
        sqlx::query("DELETE FROM save_slots WHERE slot = ?")
            .bind(slot)
            .execute(&self.pool)
            .await
            .map_err(PersistError::storage)?;
        Ok(())
    }
}

/// In-process remote with a failure switch.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    docs: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_raw(&self, user_id: &str, body: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(user_id.to_string(), body.to_string());
        }
    }

    pub fn get_raw(&self, user_id: &str) -> Option<String> {
        self.docs.lock().ok()?.get(user_id).cloned()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::storage("remote unreachable"));
        }
        self.docs.lock().map_err(lock_err)
    }
}

impl RemoteStore for MemoryRemote {
    async fn remote_read(&self, user_id: &str) -> Result<Option<String>, PersistError> {
        Ok(self.guard()?.get(user_id).cloned())
    }

    async fn remote_write(&self, user_id: &str, body: &str) -> Result<(), PersistError> {
        self.guard()?.insert(user_id.to_string(), body.to_string());
        Ok(())
    }

    async fn remote_delete(&self, user_id: &str) -> Result<(), PersistError> {
        self.guard()?.remove(user_id);
        Ok(())
    }
}

/// Remote for sessions without a cloud account: never holds a document.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRemote;

impl RemoteStore for NoRemote {
    async fn remote_read(&self, _user_id: &str) -> Result<Option<String>, PersistError> {
        Ok(None)
    }

    async fn remote_write(&self, _user_id: &str, _body: &str) -> Result<(), PersistError> {
        Ok(())
    }

    async fn remote_delete(&self, _user_id: &str) -> Result<(), PersistError> {
        Ok(())
    }
}
