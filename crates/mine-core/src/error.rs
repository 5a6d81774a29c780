use thiserror::Error;

use crate::catalog::{HelperId, PlanetId, ToolId, UpgradeId};

/// Recoverable gameplay outcomes. None of these abort a session; callers
/// turn them into feedback for the player.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("insufficient funds: need {cost}, have {available}")]
    InsufficientFunds { cost: f64, available: f64 },
    /// Expected during placement; the caller retries elsewhere.
    #[error("invalid placement at ({x}, {y}): {reason}")]
    InvalidPlacement { x: f64, y: f64, reason: String },
    #[error("planet {0} is locked")]
    PlanetLocked(PlanetId),
    #[error("unknown helper type {id:?} on {planet}")]
    UnknownHelperType { planet: PlanetId, id: String },
    #[error("{helper} cannot be bought while {active} is active")]
    WrongPlanet { helper: HelperId, active: PlanetId },
    #[error("tool {0} is not owned")]
    ToolNotOwned(ToolId),
    #[error("upgrade {0} is already at max level")]
    UpgradeMaxed(UpgradeId),
}

impl GameError {
    /// Short machine-readable reason, handed to UI collaborators.
    pub fn reason(&self) -> &'static str {
        match self {
            GameError::InsufficientFunds { .. } => "insufficient_funds",
            GameError::InvalidPlacement { .. } => "invalid_placement",
            GameError::PlanetLocked(_) => "planet_locked",
            GameError::UnknownHelperType { .. } => "unknown_helper_type",
            GameError::WrongPlanet { .. } => "wrong_planet",
            GameError::ToolNotOwned(_) => "tool_not_owned",
            GameError::UpgradeMaxed(_) => "upgrade_maxed",
        }
    }
}
