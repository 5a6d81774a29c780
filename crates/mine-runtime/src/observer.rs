//! Callbacks for the presentation layers (UI, audio, notifications).

use mine_core::{GameError, GameState, HelperId, PlanetId, ToolId, UpgradeId};
use persistence::LoadSource;
use std::fmt;

/// What a purchase attempt was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseTarget {
    Helper(HelperId),
    Tool(ToolId),
    Upgrade(UpgradeId),
}

impl fmt::Display for PurchaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseTarget::Helper(h) => write!(f, "helper {h}"),
            PurchaseTarget::Tool(t) => write!(f, "tool {t}"),
            PurchaseTarget::Upgrade(u) => write!(f, "upgrade {u}"),
        }
    }
}

/// Every method defaults to a no-op; implement the ones you need.
///
/// `reason` is `None` on success. A switch that was ignored because a
/// transition was in flight reports `success = false` with no reason.
pub trait GameObserver: Send {
    fn on_state_changed(&mut self, _state: &GameState) {}
    fn on_purchase_result(
        &mut self,
        _target: PurchaseTarget,
        _success: bool,
        _reason: Option<&GameError>,
    ) {
    }
    fn on_planet_switch_result(
        &mut self,
        _planet: PlanetId,
        _success: bool,
        _reason: Option<&GameError>,
    ) {
    }
    fn on_save_completed(&mut self, _success: bool) {}
    /// `source` is `None` when nothing was loaded.
    fn on_load_completed(&mut self, _success: bool, _source: Option<LoadSource>) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl GameObserver for NullObserver {}
