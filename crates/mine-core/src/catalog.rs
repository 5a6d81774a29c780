//! Static definition tables: planets, helpers, tools and upgrades.
//!
//! Helper identity is a closed enum per planet so that a planet's roster is
//! checked at compile time. The [`Catalog`] maps each identifier to its
//! economic definition; it holds no mutable state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::error::GameError;

/// A progression stage with its own helper roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetId {
    Earth,
    Moon,
    Mars,
    Jupiter,
    Titan,
}

impl PlanetId {
    /// All planets in progression order.
    pub const ALL: [PlanetId; 5] = [
        PlanetId::Earth,
        PlanetId::Moon,
        PlanetId::Mars,
        PlanetId::Jupiter,
        PlanetId::Titan,
    ];

    /// Stable identifier used in persisted documents.
    pub fn as_str(self) -> &'static str {
        match self {
            PlanetId::Earth => "earth",
            PlanetId::Moon => "moon",
            PlanetId::Mars => "mars",
            PlanetId::Jupiter => "jupiter",
            PlanetId::Titan => "titan",
        }
    }

    pub fn parse(s: &str) -> Option<PlanetId> {
        PlanetId::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares a per-planet helper enum with its stable string ids.
macro_rules! helper_roster {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $id:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $id),+
                }
            }

            pub fn parse(s: &str) -> Option<$name> {
                $name::ALL.iter().copied().find(|h| h.as_str() == s)
            }
        }
    };
}

helper_roster!(
    /// Helpers purchasable on Earth.
    EarthHelper {
        Miner => "miner",
        Driller => "driller",
        Excavator => "excavator",
        Refinery => "refinery",
        Rocket => "rocket",
    }
);

helper_roster!(
    /// Helpers purchasable on the Moon.
    MoonHelper {
        LunarDrill => "lunar_drill",
        RegolithCrawler => "regolith_crawler",
        Lander => "lander",
    }
);

helper_roster!(
    /// Helpers purchasable on Mars.
    MarsHelper {
        MarsRover => "mars_rover",
        DustHarvester => "dust_harvester",
        Starship => "starship",
    }
);

helper_roster!(
    /// Helpers purchasable on Jupiter.
    JupiterHelper {
        GasSkimmer => "gas_skimmer",
        StormCollector => "storm_collector",
        DeepProbe => "deep_probe",
    }
);

helper_roster!(
    /// Helpers purchasable on Titan.
    TitanHelper {
        MethaneRig => "methane_rig",
        CryoDrill => "cryo_drill",
    }
);

/// A helper type, tagged by the planet whose roster it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HelperId {
    Earth(EarthHelper),
    Moon(MoonHelper),
    Mars(MarsHelper),
    Jupiter(JupiterHelper),
    Titan(TitanHelper),
}

impl HelperId {
    pub fn planet(self) -> PlanetId {
        match self {
            HelperId::Earth(_) => PlanetId::Earth,
            HelperId::Moon(_) => PlanetId::Moon,
            HelperId::Mars(_) => PlanetId::Mars,
            HelperId::Jupiter(_) => PlanetId::Jupiter,
            HelperId::Titan(_) => PlanetId::Titan,
        }
    }

    /// Per-planet identifier; unique only together with [`HelperId::planet`].
    pub fn as_str(self) -> &'static str {
        match self {
            HelperId::Earth(h) => h.as_str(),
            HelperId::Moon(h) => h.as_str(),
            HelperId::Mars(h) => h.as_str(),
            HelperId::Jupiter(h) => h.as_str(),
            HelperId::Titan(h) => h.as_str(),
        }
    }

    /// Parse a helper id within the roster of `planet`.
    pub fn parse(planet: PlanetId, s: &str) -> Option<HelperId> {
        match planet {
            PlanetId::Earth => EarthHelper::parse(s).map(HelperId::Earth),
            PlanetId::Moon => MoonHelper::parse(s).map(HelperId::Moon),
            PlanetId::Mars => MarsHelper::parse(s).map(HelperId::Mars),
            PlanetId::Jupiter => JupiterHelper::parse(s).map(HelperId::Jupiter),
            PlanetId::Titan => TitanHelper::parse(s).map(HelperId::Titan),
        }
    }

    /// Every helper on every planet, planet order first.
    pub fn all() -> impl Iterator<Item = HelperId> {
        EarthHelper::ALL
            .iter()
            .map(|h| HelperId::Earth(*h))
            .chain(MoonHelper::ALL.iter().map(|h| HelperId::Moon(*h)))
            .chain(MarsHelper::ALL.iter().map(|h| HelperId::Mars(*h)))
            .chain(JupiterHelper::ALL.iter().map(|h| HelperId::Jupiter(*h)))
            .chain(TitanHelper::ALL.iter().map(|h| HelperId::Titan(*h)))
    }
}

impl fmt::Display for HelperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.planet(), self.as_str())
    }
}

/// Broad role of a helper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperCategory {
    Mining,
    Drilling,
    Processing,
    Transport,
}

/// Immutable economic definition of a helper type.
#[derive(Clone, Debug, PartialEq)]
pub struct HelperDefinition {
    /// Planet-scoped helper id.
    pub id: HelperId,
    /// Display name.
    pub name: &'static str,
    /// Price of the first unit.
    pub base_cost: u64,
    /// Currency per second contributed by one owned unit.
    pub base_production_rate: f64,
    /// Broad role, used for grouping in the shop.
    pub category: HelperCategory,
}

impl HelperDefinition {
    pub fn planet(&self) -> PlanetId {
        self.id.planet()
    }
}

/// Pickaxes: the equipped one sets the base click power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Wooden,
    Stone,
    Iron,
    Gold,
    Diamond,
}

impl ToolId {
    pub const ALL: [ToolId; 5] = [
        ToolId::Wooden,
        ToolId::Stone,
        ToolId::Iron,
        ToolId::Gold,
        ToolId::Diamond,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::Wooden => "wooden",
            ToolId::Stone => "stone",
            ToolId::Iron => "iron",
            ToolId::Gold => "gold",
            ToolId::Diamond => "diamond",
        }
    }

    pub fn parse(s: &str) -> Option<ToolId> {
        ToolId::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolDefinition {
    /// Tool id.
    pub id: ToolId,
    /// Display name.
    pub name: &'static str,
    /// One-time purchase price; 0 for the starter tool.
    pub cost: u64,
    /// Currency granted per click while equipped.
    pub click_power: u64,
}

/// Levelled upgrades that add to click power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    ReinforcedGrip,
    TemperedEdge,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 2] = [UpgradeId::ReinforcedGrip, UpgradeId::TemperedEdge];

    pub fn as_str(self) -> &'static str {
        match self {
            UpgradeId::ReinforcedGrip => "reinforced_grip",
            UpgradeId::TemperedEdge => "tempered_edge",
        }
    }

    pub fn parse(s: &str) -> Option<UpgradeId> {
        UpgradeId::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

impl fmt::Display for UpgradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeDefinition {
    /// Upgrade id.
    pub id: UpgradeId,
    /// Display name.
    pub name: &'static str,
    /// Price of level 1.
    pub base_cost: u64,
    /// Cost multiplier per owned level, in percent (200 = x2.0).
    pub growth_percent: u32,
    /// Click power added per level.
    pub click_bonus: u64,
    /// Highest purchasable level (> 0).
    pub max_level: u32,
}

/// Catalog self-check failures.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate helper definition: {0}")]
    DuplicateHelper(HelperId),
    /// Below 7 the 15% growth can floor to the same price twice in a row.
    #[error("base cost of {0} must be at least 7")]
    BaseCostTooLow(HelperId),
    #[error("production rate of {0} must be positive and finite")]
    NonPositiveProduction(HelperId),
    #[error("starter tool {0} must be free")]
    StarterToolNotFree(ToolId),
    #[error("upgrade {0} must have a growth above 100% and a max level")]
    InvalidUpgrade(UpgradeId),
}

/// Lookup tables for every purchasable thing in the game.
#[derive(Clone, Debug)]
pub struct Catalog {
    helpers: BTreeMap<HelperId, HelperDefinition>,
    /// Ids defined more than once in the list given to [`Catalog::new`].
    duplicate_helpers: Vec<HelperId>,
    tools: BTreeMap<ToolId, ToolDefinition>,
    upgrades: BTreeMap<UpgradeId, UpgradeDefinition>,
}

/// Tool every fresh game starts with.
pub const STARTER_TOOL: ToolId = ToolId::Wooden;

impl Catalog {
    /// Build a catalog from explicit definitions. Later duplicates win;
    /// [`Catalog::validate`] reports them.
    pub fn new(
        helpers: Vec<HelperDefinition>,
        tools: Vec<ToolDefinition>,
        upgrades: Vec<UpgradeDefinition>,
    ) -> Self {
        let mut by_id = BTreeMap::new();
        let mut duplicate_helpers = Vec::new();
        for def in helpers {
            let id = def.id;
            if by_id.insert(id, def).is_some() {
                duplicate_helpers.push(id);
            }
        }
        Self {
            helpers: by_id,
            duplicate_helpers,
            tools: tools.into_iter().map(|t| (t.id, t)).collect(),
            upgrades: upgrades.into_iter().map(|u| (u.id, u)).collect(),
        }
    }

    /// The shipped game data.
    pub fn standard() -> Self {
        Self::new(standard_helpers(), standard_tools(), standard_upgrades())
    }

    pub fn helper(&self, id: HelperId) -> Option<&HelperDefinition> {
        self.helpers.get(&id)
    }

    /// Resolve a persisted helper id against this catalog.
    ///
    /// Fails with [`GameError::UnknownHelperType`] when the id is not part of
    /// the planet's roster or has been removed from the catalog.
    pub fn resolve_helper(&self, planet: PlanetId, id: &str) -> Result<HelperId, GameError> {
        HelperId::parse(planet, id)
            .filter(|h| self.helpers.contains_key(h))
            .ok_or_else(|| GameError::UnknownHelperType {
                planet,
                id: id.to_string(),
            })
    }

    /// Helper definitions of one planet, cheapest first.
    pub fn helpers_on(&self, planet: PlanetId) -> Vec<&HelperDefinition> {
        let mut defs: Vec<_> = self
            .helpers
            .values()
            .filter(|d| d.planet() == planet)
            .collect();
        defs.sort_by_key(|d| d.base_cost);
        defs
    }

    pub fn tool(&self, id: ToolId) -> Option<&ToolDefinition> {
        self.tools.get(&id)
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn upgrade(&self, id: UpgradeId) -> Option<&UpgradeDefinition> {
        self.upgrades.get(&id)
    }

    pub fn upgrades(&self) -> impl Iterator<Item = &UpgradeDefinition> {
        self.upgrades.values()
    }

    /// Check the invariants the economy relies on.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if let Some(id) = self.duplicate_helpers.first() {
            return Err(CatalogError::DuplicateHelper(*id));
        }
        for def in self.helpers.values() {
            if def.base_cost < 7 {
                return Err(CatalogError::BaseCostTooLow(def.id));
            }
            if !def.base_production_rate.is_finite() || def.base_production_rate <= 0.0 {
                return Err(CatalogError::NonPositiveProduction(def.id));
            }
        }
        if let Some(t) = self.tools.get(&STARTER_TOOL) {
            if t.cost != 0 {
                return Err(CatalogError::StarterToolNotFree(t.id));
            }
        }
        for u in self.upgrades.values() {
            if u.growth_percent <= 100 || u.max_level == 0 {
                return Err(CatalogError::InvalidUpgrade(u.id));
            }
        }
        Ok(())
    }
}

fn helper(
    id: HelperId,
    name: &'static str,
    base_cost: u64,
    base_production_rate: f64,
    category: HelperCategory,
) -> HelperDefinition {
    HelperDefinition {
        id,
        name,
        base_cost,
        base_production_rate,
        category,
    }
}

fn standard_helpers() -> Vec<HelperDefinition> {
    use HelperCategory::*;
    vec![
        helper(HelperId::Earth(EarthHelper::Miner), "Miner", 20, 1.0, Mining),
        helper(HelperId::Earth(EarthHelper::Driller), "Driller", 150, 5.0, Drilling),
        helper(HelperId::Earth(EarthHelper::Excavator), "Excavator", 1_100, 24.0, Mining),
        helper(HelperId::Earth(EarthHelper::Refinery), "Refinery", 9_000, 90.0, Processing),
        helper(HelperId::Earth(EarthHelper::Rocket), "Rocket", 60_000, 320.0, Transport),
        helper(HelperId::Moon(MoonHelper::LunarDrill), "Lunar Drill", 80_000, 450.0, Drilling),
        helper(
            HelperId::Moon(MoonHelper::RegolithCrawler),
            "Regolith Crawler",
            450_000,
            2_000.0,
            Mining,
        ),
        helper(HelperId::Moon(MoonHelper::Lander), "Lander", 2_500_000, 9_000.0, Transport),
        helper(HelperId::Mars(MarsHelper::MarsRover), "Mars Rover", 4_000_000, 13_000.0, Mining),
        helper(
            HelperId::Mars(MarsHelper::DustHarvester),
            "Dust Harvester",
            20_000_000,
            52_000.0,
            Processing,
        ),
        helper(HelperId::Mars(MarsHelper::Starship), "Starship", 110_000_000, 240_000.0, Transport),
        helper(
            HelperId::Jupiter(JupiterHelper::GasSkimmer),
            "Gas Skimmer",
            160_000_000,
            330_000.0,
            Processing,
        ),
        helper(
            HelperId::Jupiter(JupiterHelper::StormCollector),
            "Storm Collector",
            900_000_000,
            1_500_000.0,
            Processing,
        ),
        helper(
            HelperId::Jupiter(JupiterHelper::DeepProbe),
            "Deep Probe",
            5_000_000_000,
            7_000_000.0,
            Transport,
        ),
        helper(
            HelperId::Titan(TitanHelper::MethaneRig),
            "Methane Rig",
            7_500_000_000,
            9_500_000.0,
            Drilling,
        ),
        helper(
            HelperId::Titan(TitanHelper::CryoDrill),
            "Cryo Drill",
            40_000_000_000,
            44_000_000.0,
            Drilling,
        ),
    ]
}

fn standard_tools() -> Vec<ToolDefinition> {
    let tool = |id, name, cost, click_power| ToolDefinition {
        id,
        name,
        cost,
        click_power,
    };
    vec![
        tool(ToolId::Wooden, "Wooden Pickaxe", 0, 1),
        tool(ToolId::Stone, "Stone Pickaxe", 100, 2),
        tool(ToolId::Iron, "Iron Pickaxe", 1_000, 5),
        tool(ToolId::Gold, "Gold Pickaxe", 12_000, 15),
        tool(ToolId::Diamond, "Diamond Pickaxe", 150_000, 50),
    ]
}

fn standard_upgrades() -> Vec<UpgradeDefinition> {
    vec![
        UpgradeDefinition {
            id: UpgradeId::ReinforcedGrip,
            name: "Reinforced Grip",
            base_cost: 250,
            growth_percent: 200,
            click_bonus: 1,
            max_level: 10,
        },
        UpgradeDefinition {
            id: UpgradeId::TemperedEdge,
            name: "Tempered Edge",
            base_cost: 5_000,
            growth_percent: 250,
            click_bonus: 4,
            max_level: 5,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn standard_catalog_is_valid() {
        let catalog = Catalog::standard();
        catalog.validate().unwrap();
        for id in HelperId::all() {
            assert!(catalog.helper(id).is_some(), "missing definition for {id}");
        }
    }

    #[test]
    fn helper_ids_parse_within_their_planet_only() {
        for id in HelperId::all() {
            assert_eq!(HelperId::parse(id.planet(), id.as_str()), Some(id));
        }
        assert_eq!(HelperId::parse(PlanetId::Moon, "miner"), None);
        assert_eq!(
            HelperId::parse(PlanetId::Moon, "lander"),
            Some(HelperId::Moon(MoonHelper::Lander))
        );
    }

    #[test]
    fn resolve_rejects_helpers_missing_from_catalog() {
        let reduced = Catalog::new(
            vec![helper(
                HelperId::Earth(EarthHelper::Miner),
                "Miner",
                20,
                1.0,
                HelperCategory::Mining,
            )],
            standard_tools(),
            standard_upgrades(),
        );
        assert!(reduced.resolve_helper(PlanetId::Earth, "miner").is_ok());
        assert_eq!(
            reduced.resolve_helper(PlanetId::Earth, "driller"),
            Err(GameError::UnknownHelperType {
                planet: PlanetId::Earth,
                id: "driller".to_string()
            })
        );
        assert!(reduced.resolve_helper(PlanetId::Earth, "laser_cannon").is_err());
    }

    #[test]
    fn cheap_helpers_fail_validation() {
        let catalog = Catalog::new(
            vec![helper(
                HelperId::Earth(EarthHelper::Miner),
                "Miner",
                5,
                1.0,
                HelperCategory::Mining,
            )],
            vec![],
            vec![],
        );
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::BaseCostTooLow(HelperId::Earth(EarthHelper::Miner)))
        );
    }

    #[test]
    fn duplicates_are_reported() {
        let mut defs = standard_helpers();
        let mut copy = defs[0].clone();
        copy.base_cost = 99;
        defs.push(copy);
        let catalog = Catalog::new(defs, standard_tools(), standard_upgrades());
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::DuplicateHelper(HelperId::Earth(EarthHelper::Miner)))
        );
        // The later definition is the one kept.
        assert_eq!(
            catalog.helper(HelperId::Earth(EarthHelper::Miner)).map(|d| d.base_cost),
            Some(99)
        );
    }

    #[test]
    fn helpers_on_planet_sorted_by_cost() {
        let catalog = Catalog::standard();
        let moon = catalog.helpers_on(PlanetId::Moon);
        assert_eq!(moon.len(), 3);
        assert!(moon.windows(2).all(|w| w[0].base_cost <= w[1].base_cost));
        assert!(moon.iter().all(|d| d.planet() == PlanetId::Moon));
    }

    #[test]
    fn planet_and_tool_ids_round_trip_through_strings() {
        for p in PlanetId::ALL {
            assert_eq!(PlanetId::parse(p.as_str()), Some(p));
        }
        for t in ToolId::ALL {
            assert_eq!(ToolId::parse(t.as_str()), Some(t));
        }
        for u in UpgradeId::ALL {
            assert_eq!(UpgradeId::parse(u.as_str()), Some(u));
        }
        assert_eq!(serde_json::to_string(&PlanetId::Jupiter).unwrap(), "\"jupiter\"");
    }

    fn any_helper() -> impl Strategy<Value = HelperId> {
        proptest::sample::select(HelperId::all().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn validity_follows_cost_and_rate_bounds(
            entries in proptest::collection::btree_map(any_helper(), (0u64..100, -2.0f64..50.0), 1..12)
        ) {
            let defs: Vec<_> = entries
                .iter()
                .map(|(id, (cost, rate))| helper(*id, "h", *cost, *rate, HelperCategory::Mining))
                .collect();
            let ok = entries.values().all(|(cost, rate)| *cost >= 7 && *rate > 0.0);
            let catalog = Catalog::new(defs, standard_tools(), standard_upgrades());
            prop_assert_eq!(catalog.validate().is_ok(), ok);
            for id in entries.keys() {
                prop_assert_eq!(catalog.resolve_helper(id.planet(), id.as_str()), Ok(*id));
            }
        }

        #[test]
        fn any_repeated_definition_is_caught(pick in 0usize..16) {
            let mut defs = standard_helpers();
            let dup = defs[pick % defs.len()].clone();
            let id = dup.id;
            defs.push(dup);
            let catalog = Catalog::new(defs, standard_tools(), standard_upgrades());
            prop_assert_eq!(catalog.validate(), Err(CatalogError::DuplicateHelper(id)));
        }
    }
}
