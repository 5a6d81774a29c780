#![deny(warnings)]

//! Planet state and progression for Rock Miner.
//!
//! - [`placement`]: field geometry and position validity
//! - [`gate`]: unlock predicates between planets
//! - [`controller`]: pending placements, activation timers, planet switching
//!   and load-time reconciliation

pub mod controller;
pub mod gate;
pub mod placement;

pub use controller::{reconcile, PlanetController, ReconcileReport, SwitchOutcome};
pub use gate::{check_travel, complete_moon_launch, is_unlocked, unlocked_planets, Gate, Requirement};
pub use placement::{PlacementRules, Rect, Rejection};
