//! Mutable game state owned by a running session.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{HelperId, PlanetId, ToolId, UpgradeId, STARTER_TOOL};

/// One purchased helper unit.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedHelper {
    /// Helper type of this unit.
    pub kind: HelperId,
    /// Currency per second, fixed at purchase time.
    pub production_rate: f64,
}

/// A purchased helper committed to a screen position.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedHelper {
    /// Helper type of this unit.
    pub kind: HelperId,
    /// Horizontal position in playfield pixels.
    pub x: f64,
    /// Vertical position in playfield pixels.
    pub y: f64,
    /// Unique across every planet of one game.
    pub id: u64,
    /// `false` while queued, `true` once producing.
    pub is_producing: bool,
}

/// Ownership and placement lists of a single planet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanetProgressState {
    /// Every unit bought on this planet, in purchase order.
    pub owned_helpers: Vec<OwnedHelper>,
    /// Units committed to a position; never more per kind than owned.
    pub placed_helpers: Vec<PlacedHelper>,
}

impl PlanetProgressState {
    pub fn owned_count(&self, kind: HelperId) -> u32 {
        self.owned_helpers.iter().filter(|h| h.kind == kind).count() as u32
    }

    pub fn placed_count(&self, kind: HelperId) -> u32 {
        self.placed_helpers.iter().filter(|h| h.kind == kind).count() as u32
    }

    pub fn production_rate(&self) -> f64 {
        self.owned_helpers.iter().map(|h| h.production_rate).sum()
    }

    /// Helper kinds with more owned units than placed ones, with the surplus.
    pub fn unplaced_surplus(&self) -> Vec<(HelperId, u32)> {
        let mut owned: BTreeMap<HelperId, u32> = BTreeMap::new();
        for h in &self.owned_helpers {
            *owned.entry(h.kind).or_default() += 1;
        }
        owned
            .into_iter()
            .filter_map(|(kind, n)| {
                let placed = self.placed_count(kind);
                (n > placed).then(|| (kind, n - placed))
            })
            .collect()
    }
}

/// Player-facing toggles.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Sound effects on.
    pub sound: bool,
    /// Background music on.
    pub music: bool,
    /// In-game notifications on.
    pub notifications: bool,
    /// Periodic autosave enabled.
    pub auto_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: true,
            music: true,
            notifications: true,
            auto_save: true,
        }
    }
}

/// Counters that only ever grow during play.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistics {
    /// Helper units bought over the whole game, refunds not subtracted.
    pub helpers_bought: u64,
    /// Tools bought, the starter tool excluded.
    pub tools_bought: u64,
    /// Ids of earned achievements.
    pub achievements: BTreeSet<String>,
    /// Epoch millis of the first session of this game.
    pub session_start_epoch: i64,
}

/// One-time progression markers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flags {
    /// Set once the Moon launch sequence has played; cleared only by a full reset.
    pub has_unlocked_moon_launch: bool,
}

/// Root aggregate of a game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    /// Spendable balance (>= 0).
    pub currency: f64,
    /// Lifetime income from clicks and production; spending never lowers it.
    pub total_earned: f64,
    /// Lifetime click count.
    pub total_clicks: u64,
    /// Sum of owned production on the active planet only.
    pub total_production_rate: f64,
    /// Peak of `total_production_rate` seen so far.
    pub highest_production_rate: f64,
    /// Planet currently shown and producing.
    pub active_planet: PlanetId,
    /// Progress of every planet, active or not.
    pub planets: BTreeMap<PlanetId, PlanetProgressState>,
    /// Tool that sets the base click power; always owned.
    pub equipped_tool: ToolId,
    /// Tools bought so far, the starter tool included.
    pub owned_tools: BTreeSet<ToolId>,
    /// Current level per upgrade; absent means level 0.
    pub upgrade_levels: BTreeMap<UpgradeId, u32>,
    /// Player toggles.
    pub settings: Settings,
    /// Seconds of play summed over all sessions.
    pub cumulative_play_time_seconds: f64,
    /// Lifetime counters.
    pub statistics: Statistics,
    /// One-time progression markers.
    pub flags: Flags,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// A fresh game: no currency, starter tool, every planet empty, Earth active.
    pub fn new() -> Self {
        Self {
            currency: 0.0,
            total_earned: 0.0,
            total_clicks: 0,
            total_production_rate: 0.0,
            highest_production_rate: 0.0,
            active_planet: PlanetId::Earth,
            planets: PlanetId::ALL
                .into_iter()
                .map(|p| (p, PlanetProgressState::default()))
                .collect(),
            equipped_tool: STARTER_TOOL,
            owned_tools: BTreeSet::from([STARTER_TOOL]),
            upgrade_levels: BTreeMap::new(),
            settings: Settings::default(),
            cumulative_play_time_seconds: 0.0,
            statistics: Statistics::default(),
            flags: Flags::default(),
        }
    }

    pub fn planet(&self, planet: PlanetId) -> Option<&PlanetProgressState> {
        self.planets.get(&planet)
    }

    pub fn planet_mut(&mut self, planet: PlanetId) -> &mut PlanetProgressState {
        self.planets.entry(planet).or_default()
    }

    pub fn active(&self) -> Option<&PlanetProgressState> {
        self.planet(self.active_planet)
    }

    pub fn active_mut(&mut self) -> &mut PlanetProgressState {
        let p = self.active_planet;
        self.planet_mut(p)
    }

    /// Units of `kind` owned on its own planet.
    pub fn owned_count(&self, kind: HelperId) -> u32 {
        self.planet(kind.planet())
            .map_or(0, |p| p.owned_count(kind))
    }

    /// Whether any planet holds at least one unit of `kind`.
    pub fn owns_anywhere(&self, kind: HelperId) -> bool {
        self.planets
            .values()
            .any(|p| p.owned_helpers.iter().any(|h| h.kind == kind))
    }

    pub fn upgrade_level(&self, id: UpgradeId) -> u32 {
        self.upgrade_levels.get(&id).copied().unwrap_or(0)
    }

    /// Largest placed-helper id across all planets.
    pub fn max_placed_id(&self) -> Option<u64> {
        self.planets
            .values()
            .flat_map(|p| p.placed_helpers.iter().map(|h| h.id))
            .max()
    }

    /// Total helper units owned across every planet.
    pub fn helpers_owned_total(&self) -> usize {
        self.planets.values().map(|p| p.owned_helpers.len()).sum()
    }
}
