//! Unlock gates between planets.
//!
//! Gates are evaluated fresh on every query against ownership on all
//! planets. The only stored unlock is the Moon launch flag.

use mine_core::{
    EarthHelper, GameError, GameState, HelperId, JupiterHelper, MarsHelper, MoonHelper, PlanetId,
};
use tracing::info;

/// Condition a gate checks against the game state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Requirement {
    /// At least one unit owned, on any planet.
    OwnsHelper(HelperId),
    MoonLaunchCompleted,
    AnyOf(&'static [Requirement]),
}

impl Requirement {
    pub fn is_met(&self, state: &GameState) -> bool {
        match self {
            Requirement::OwnsHelper(kind) => state.owns_anywhere(*kind),
            Requirement::MoonLaunchCompleted => state.flags.has_unlocked_moon_launch,
            Requirement::AnyOf(reqs) => reqs.iter().any(|r| r.is_met(state)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gate {
    pub from: PlanetId,
    pub to: PlanetId,
    pub requirement: Requirement,
}

/// Every gate of the game, in progression order.
pub const GATES: &[Gate] = &[
    Gate {
        from: PlanetId::Earth,
        to: PlanetId::Moon,
        requirement: Requirement::AnyOf(&[
            Requirement::MoonLaunchCompleted,
            Requirement::OwnsHelper(HelperId::Earth(EarthHelper::Rocket)),
        ]),
    },
    Gate {
        from: PlanetId::Moon,
        to: PlanetId::Mars,
        requirement: Requirement::OwnsHelper(HelperId::Moon(MoonHelper::Lander)),
    },
    Gate {
        from: PlanetId::Mars,
        to: PlanetId::Jupiter,
        requirement: Requirement::OwnsHelper(HelperId::Mars(MarsHelper::Starship)),
    },
    Gate {
        from: PlanetId::Jupiter,
        to: PlanetId::Titan,
        requirement: Requirement::OwnsHelper(HelperId::Jupiter(JupiterHelper::DeepProbe)),
    },
];

pub fn gate(from: PlanetId, to: PlanetId) -> Option<&'static Gate> {
    GATES.iter().find(|g| g.from == from && g.to == to)
}

/// Earth is always open; every other planet opens when any gate leading
/// to it is satisfied.
pub fn is_unlocked(state: &GameState, planet: PlanetId) -> bool {
    planet == PlanetId::Earth
        || GATES
            .iter()
            .filter(|g| g.to == planet)
            .any(|g| g.requirement.is_met(state))
}

/// Fails with `PlanetLocked` without touching the state.
pub fn check_travel(state: &GameState, to: PlanetId) -> Result<(), GameError> {
    if is_unlocked(state, to) {
        Ok(())
    } else {
        Err(GameError::PlanetLocked(to))
    }
}

pub fn unlocked_planets(state: &GameState) -> Vec<PlanetId> {
    PlanetId::ALL
        .into_iter()
        .filter(|p| is_unlocked(state, *p))
        .collect()
}

/// Record that the Moon launch sequence finished. Only allowed while the
/// Moon is reachable; afterwards it stays unlocked until a full reset.
pub fn complete_moon_launch(state: &mut GameState) -> Result<(), GameError> {
    check_travel(state, PlanetId::Moon)?;
    if !state.flags.has_unlocked_moon_launch {
        state.flags.has_unlocked_moon_launch = true;
        info!("moon launch completed");
    }
    Ok(())
}
