//! Milestones recorded in `statistics.achievements`. Once earned an
//! achievement is never removed.

use mine_core::{GameState, PlanetId};
use tracing::info;

pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    earned: fn(&GameState) -> bool,
}

fn reached(state: &GameState, planet: PlanetId) -> bool {
    state.active_planet == planet
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_click",
        name: "First Strike",
        earned: |s| s.total_clicks >= 1,
    },
    Achievement {
        id: "hundred_clicks",
        name: "Sore Wrist",
        earned: |s| s.total_clicks >= 100,
    },
    Achievement {
        id: "first_helper",
        name: "Hired Hands",
        earned: |s| s.helpers_owned_total() >= 1,
    },
    Achievement {
        id: "ten_helpers",
        name: "Small Crew",
        earned: |s| s.helpers_owned_total() >= 10,
    },
    Achievement {
        id: "thousand_earned",
        name: "Pocket Change",
        earned: |s| s.total_earned >= 1_000.0,
    },
    Achievement {
        id: "million_earned",
        name: "Rock Baron",
        earned: |s| s.total_earned >= 1_000_000.0,
    },
    Achievement {
        id: "first_tool",
        name: "Upgrade Path",
        earned: |s| s.statistics.tools_bought >= 1,
    },
    Achievement {
        id: "reached_moon",
        name: "One Small Step",
        earned: |s| reached(s, PlanetId::Moon),
    },
    Achievement {
        id: "reached_mars",
        name: "Red Dust",
        earned: |s| reached(s, PlanetId::Mars),
    },
    Achievement {
        id: "reached_jupiter",
        name: "Gas Giant",
        earned: |s| reached(s, PlanetId::Jupiter),
    },
    Achievement {
        id: "reached_titan",
        name: "Methane Seas",
        earned: |s| reached(s, PlanetId::Titan),
    },
];

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Record every newly met achievement; returns the new ids.
pub fn evaluate(state: &mut GameState) -> Vec<&'static str> {
    let mut new = Vec::new();
    for a in ACHIEVEMENTS {
        if !state.statistics.achievements.contains(a.id) && (a.earned)(state) {
            state.statistics.achievements.insert(a.id.to_string());
            info!(id = a.id, name = a.name, "achievement unlocked");
            new.push(a.id);
        }
    }
    new
}
