#![deny(warnings)]

//! Persistence layer: versioned save documents, slot stores and the
//! save/load controller.
//!
//! - [`document`]: the JSON document and its mapping to [`mine_core::GameState`]
//! - [`migrate`]: schema upgrades between major versions
//! - [`validate`]: acceptance checks and the recovery-only repair pass
//! - [`store`]: local slot backends (memory, file, SQLite) and the cloud mirror
//! - [`controller`]: dual-slot save, fallback load, export and import

pub mod controller;
pub mod document;
pub mod migrate;
pub mod store;
pub mod validate;

pub use controller::{
    LoadOutcome, LoadPhase, LoadSource, PendingImport, PersistenceController, SaveOutcome,
    SavePhase, SlotKeys,
};
pub use document::{decode, deserialize, encode, encode_pretty, serialize, Decoded, SaveDocument};
pub use migrate::{migrate, CURRENT_VERSION};
pub use store::{
    default_sqlite_url, init_db, FileStore, MemoryRemote, MemoryStore, NoRemote, RemoteStore,
    SlotStore, SqliteStore,
};
pub use validate::{repair, validate};

/// Failures of the persistence layer. Gameplay errors live in
/// [`mine_core::GameError`].
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The document is malformed or violates a required invariant.
    #[error("save rejected: {0}")]
    ValidationFailed(String),
    #[error("unsupported save version {0}")]
    UnsupportedVersion(String),
    /// The backing store could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("encoding failed: {0}")]
    Codec(#[from] serde_json::Error),
}

impl PersistError {
    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        PersistError::StorageUnavailable(err.to_string())
    }
}
