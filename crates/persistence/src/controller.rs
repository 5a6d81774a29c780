//! Save/load orchestration over a local slot store and an optional remote
//! mirror.

use mine_core::{Catalog, Clock, GameState};
use mine_planets::PlacementRules;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::document::{decode, decode_value, encode, encode_pretty, serialize, Decoded};
use crate::store::{NoRemote, RemoteStore, SlotStore};
use crate::validate::repair;
use crate::PersistError;

/// Names of the two local slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotKeys {
    pub primary: String,
    pub backup: String,
}

impl Default for SlotKeys {
    fn default() -> Self {
        Self {
            primary: "rock_miner_save".into(),
            backup: "rock_miner_save_backup".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SavePhase {
    #[default]
    Idle,
    Serializing,
    Written,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Reading,
    Validating,
    Applying,
    Rejected,
}

/// Where a loaded state came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
    Remote,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Primary => "primary",
            LoadSource::Backup => "backup",
            LoadSource::Remote => "remote",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SaveOutcome {
    Saved { timestamp: i64, mirrored: bool },
    /// Another save was in flight; nothing was written.
    Skipped,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        state: GameState,
        source: LoadSource,
        timestamp: i64,
    },
    /// Neither slot held a usable document; start a fresh game.
    NoUsableSave,
    /// Another load was in flight.
    Skipped,
}

/// A validated import waiting for the player's confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingImport {
    decoded: Decoded,
}

impl PendingImport {
    pub fn preview(&self) -> &GameState {
        &self.decoded.state
    }

    pub fn timestamp(&self) -> i64 {
        self.decoded.timestamp
    }

    /// Accept the import. The caller installs the returned state.
    pub fn confirm(self) -> GameState {
        self.decoded.state
    }
}

/// Resets a phase cell to idle when the operation ends, however it ends.
struct PhaseGuard<'a, P: Copy + Default + PartialEq> {
    cell: &'a Mutex<P>,
}

impl<'a, P: Copy + Default + PartialEq> PhaseGuard<'a, P> {
    /// `None` when the cell is not idle.
    fn enter(cell: &'a Mutex<P>, first: P) -> Option<Self> {
        let mut phase = cell.lock().ok()?;
        if *phase != P::default() {
            return None;
        }
        *phase = first;
        Some(Self { cell })
    }

    fn set(&self, next: P) {
        if let Ok(mut phase) = self.cell.lock() {
            *phase = next;
        }
    }
}

impl<P: Copy + Default + PartialEq> Drop for PhaseGuard<'_, P> {
    fn drop(&mut self) {
        self.set(P::default());
    }
}

/// Dual-slot persistence with an optional cloud mirror.
///
/// Every save writes the primary then the backup slot. Loads prefer the
/// primary and fall back to the backup when the primary is missing or
/// rejected. Remote failures are logged and never fail a local operation.
pub struct PersistenceController<L, R = NoRemote> {
    local: L,
    remote: R,
    clock: Arc<dyn Clock>,
    catalog: Arc<Catalog>,
    rules: PlacementRules,
    keys: SlotKeys,
    user_id: Mutex<Option<String>>,
    save_phase: Mutex<SavePhase>,
    load_phase: Mutex<LoadPhase>,
}

impl<L: SlotStore> PersistenceController<L, NoRemote> {
    pub fn local_only(
        local: L,
        clock: Arc<dyn Clock>,
        catalog: Arc<Catalog>,
        rules: PlacementRules,
    ) -> Self {
        Self::new(local, NoRemote, clock, catalog, rules)
    }
}

impl<L: SlotStore, R: RemoteStore> PersistenceController<L, R> {
    pub fn new(
        local: L,
        remote: R,
        clock: Arc<dyn Clock>,
        catalog: Arc<Catalog>,
        rules: PlacementRules,
    ) -> Self {
        Self {
            local,
            remote,
            clock,
            catalog,
            rules,
            keys: SlotKeys::default(),
            user_id: Mutex::new(None),
            save_phase: Mutex::new(SavePhase::Idle),
            load_phase: Mutex::new(LoadPhase::Idle),
        }
    }

    pub fn with_keys(mut self, keys: SlotKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn keys(&self) -> &SlotKeys {
        &self.keys
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn save_phase(&self) -> SavePhase {
        self.save_phase.lock().map(|p| *p).unwrap_or_default()
    }

    pub fn load_phase(&self) -> LoadPhase {
        self.load_phase.lock().map(|p| *p).unwrap_or_default()
    }

    /// Enable the remote mirror for `user_id`.
    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        info!(user = %user_id, "remote mirror enabled");
        if let Ok(mut slot) = self.user_id.lock() {
            *slot = Some(user_id);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut slot) = self.user_id.lock() {
            *slot = None;
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.lock().ok().and_then(|u| u.clone())
    }

    /// Write `state` to both local slots, then mirror it remotely when signed
    /// in. Returns `Skipped` if a save is already running.
    pub async fn save(&self, state: &GameState) -> Result<SaveOutcome, PersistError> {
        let Some(phase) = PhaseGuard::enter(&self.save_phase, SavePhase::Serializing) else {
            debug!("save skipped, another save in flight");
            return Ok(SaveOutcome::Skipped);
        };
        let timestamp = self.clock.now_millis();
        let body = encode(&serialize(state, timestamp))?;

        self.local.write(&self.keys.primary, &body).await?;
        self.local.write(&self.keys.backup, &body).await?;
        phase.set(SavePhase::Written);

        let mut mirrored = false;
        if let Some(user) = self.user_id() {
            match self.remote.remote_write(&user, &body).await {
                Ok(()) => mirrored = true,
                Err(err) => warn!(%err, user = %user, "remote mirror failed"),
            }
        }
        info!(timestamp, bytes = body.len(), mirrored, "game saved");
        Ok(SaveOutcome::Saved {
            timestamp,
            mirrored,
        })
    }

    /// Load from the primary slot, falling back to the backup.
    ///
    /// A slot that could not be read is never treated as empty: when no slot
    /// loads and any read failed, the storage error is returned.
    pub async fn load(&self) -> Result<LoadOutcome, PersistError> {
        let Some(phase) = PhaseGuard::enter(&self.load_phase, LoadPhase::Reading) else {
            debug!("load skipped, another load in flight");
            return Ok(LoadOutcome::Skipped);
        };
        let mut failures = Vec::new();
        for (source, key) in self.slots() {
            phase.set(LoadPhase::Reading);
            let text = match self.local.read(key).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!(slot = %key, "slot empty");
                    continue;
                }
                Err(err) => {
                    warn!(%err, slot = %key, "slot unreadable");
                    failures.push(err);
                    continue;
                }
            };
            phase.set(LoadPhase::Validating);
            match decode(&text, &self.catalog, &self.rules) {
                Ok(decoded) => {
                    phase.set(LoadPhase::Applying);
                    info!(source = source.as_str(), timestamp = decoded.timestamp, "game loaded");
                    return Ok(LoadOutcome::Loaded {
                        state: decoded.state,
                        source,
                        timestamp: decoded.timestamp,
                    });
                }
                Err(err) => {
                    phase.set(LoadPhase::Rejected);
                    warn!(%err, slot = %key, "save rejected, trying next slot");
                }
            }
        }
        if !failures.is_empty() {
            return Err(failures.remove(0));
        }
        Ok(LoadOutcome::NoUsableSave)
    }

    /// Load locally and, when signed in, compare with the remote copy. The
    /// newer timestamp wins; the local copy wins ties.
    pub async fn load_reconciled(&self) -> Result<LoadOutcome, PersistError> {
        let local = self.load().await;
        if matches!(local, Ok(LoadOutcome::Skipped)) {
            return local;
        }
        let Some(user) = self.user_id() else {
            return local;
        };
        let remote = match self.remote.remote_read(&user).await {
            Ok(Some(text)) => match decode(&text, &self.catalog, &self.rules) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    warn!(%err, user = %user, "remote save rejected");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(%err, user = %user, "remote read failed");
                None
            }
        };
        let Some(remote) = remote else {
            return local;
        };
        let remote_wins = match &local {
            Ok(LoadOutcome::Loaded { timestamp, .. }) => remote.timestamp > *timestamp,
            _ => true,
        };
        if !remote_wins {
            return local;
        }
        info!(timestamp = remote.timestamp, "remote save is newer, using it");
        Ok(LoadOutcome::Loaded {
            state: remote.state,
            source: LoadSource::Remote,
            timestamp: remote.timestamp,
        })
    }

    /// The current state as a pretty-printed document.
    pub fn export(&self, state: &GameState) -> Result<String, PersistError> {
        encode_pretty(&serialize(state, self.clock.now_millis()))
    }

    /// Validate an imported document. Nothing changes until the returned
    /// import is confirmed.
    pub fn prepare_import(&self, text: &str) -> Result<PendingImport, PersistError> {
        let decoded = decode(text, &self.catalog, &self.rules)?;
        debug!(timestamp = decoded.timestamp, "import validated, awaiting confirmation");
        Ok(PendingImport { decoded })
    }

    /// Repair path: coerce whatever the slots hold into a loadable state.
    pub async fn recover(&self) -> Result<LoadOutcome, PersistError> {
        let Some(phase) = PhaseGuard::enter(&self.load_phase, LoadPhase::Reading) else {
            return Ok(LoadOutcome::Skipped);
        };
        let mut last_err = None;
        for (source, key) in self.slots() {
            let text = match self.local.read(key).await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            };
            phase.set(LoadPhase::Validating);
            let raw = serde_json::from_str(&text).unwrap_or(Value::Null);
            match decode_value(repair(raw), &self.catalog, &self.rules) {
                Ok(decoded) => {
                    phase.set(LoadPhase::Applying);
                    warn!(source = source.as_str(), "save recovered by repair");
                    return Ok(LoadOutcome::Loaded {
                        state: decoded.state,
                        source,
                        timestamp: decoded.timestamp,
                    });
                }
                Err(err) => {
                    phase.set(LoadPhase::Rejected);
                    warn!(%err, slot = %key, "repair could not rescue slot");
                }
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(LoadOutcome::NoUsableSave),
        }
    }

    /// Delete both local slots and the remote copy.
    pub async fn reset(&self) -> Result<(), PersistError> {
        self.local.delete(&self.keys.primary).await?;
        self.local.delete(&self.keys.backup).await?;
        if let Some(user) = self.user_id() {
            if let Err(err) = self.remote.remote_delete(&user).await {
                warn!(%err, user = %user, "remote delete failed");
            }
        }
        info!("saves deleted");
        Ok(())
    }

    fn slots(&self) -> [(LoadSource, &str); 2] {
        [
            (LoadSource::Primary, self.keys.primary.as_str()),
            (LoadSource::Backup, self.keys.backup.as_str()),
        ]
    }
}
