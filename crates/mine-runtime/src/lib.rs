#![deny(warnings)]

//! Session runtime for Rock Miner: the single owner of the game state, its
//! fixed-interval scheduler and the observer callbacks.

pub mod achievements;
pub mod config;
pub mod observer;
pub mod scheduler;
pub mod session;

pub use config::{ConfigError, EngineConfig};
pub use observer::{GameObserver, NullObserver, PurchaseTarget};
pub use scheduler::{FixedInterval, Schedule, Scheduler};
pub use session::{LoadReport, Session, TickReport};
