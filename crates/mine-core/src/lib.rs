#![deny(warnings)]

//! Core domain models for Rock Miner.
//!
//! This crate defines the static catalog (planets, helpers, tools, upgrades),
//! the mutable [`GameState`] aggregate and the gameplay error taxonomy shared
//! by every other crate in the workspace.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod state;

pub use catalog::{
    Catalog, CatalogError, EarthHelper, HelperCategory, HelperDefinition, HelperId,
    JupiterHelper, MarsHelper, MoonHelper, PlanetId, TitanHelper, ToolDefinition, ToolId,
    UpgradeDefinition, UpgradeId, STARTER_TOOL,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::GameError;
pub use state::{
    Flags, GameState, OwnedHelper, PlacedHelper, PlanetProgressState, Settings, Statistics,
};
