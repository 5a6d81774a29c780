//! The persisted document and its mapping to and from [`GameState`].

use mine_core::{
    Catalog, Flags, GameState, OwnedHelper, PlacedHelper, PlanetId, Settings, Statistics, ToolId,
    UpgradeId, STARTER_TOOL,
};
use mine_planets::{is_unlocked, reconcile, PlacementRules};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::migrate::{migrate, CURRENT_VERSION};
use crate::validate::check;
use crate::PersistError;

/// Versioned snapshot of a game, the body of every save slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveDocument {
    pub version: String,
    /// Epoch millis at save time.
    #[serde(deserialize_with = "lenient::whole_i64")]
    pub timestamp: i64,
    pub currency: f64,
    #[serde(deserialize_with = "lenient::nullable")]
    pub total_earned: f64,
    #[serde(deserialize_with = "lenient::whole_u64")]
    pub total_clicks: u64,
    #[serde(deserialize_with = "lenient::nullable")]
    pub total_production_rate: f64,
    #[serde(deserialize_with = "lenient::nullable")]
    pub highest_production_rate: f64,
    #[serde(deserialize_with = "lenient::planet_name")]
    pub active_planet: String,
    #[serde(deserialize_with = "lenient::planet_lists")]
    pub owned_helpers_by_planet: BTreeMap<String, Vec<OwnedHelperDoc>>,
    #[serde(deserialize_with = "lenient::planet_lists")]
    pub placed_helpers_by_planet: BTreeMap<String, Vec<PlacedHelperDoc>>,
    /// Pre-2.0 flat placement list of the active planet.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_list"
    )]
    pub placed_helpers: Option<Vec<PlacedHelperDoc>>,
    #[serde(deserialize_with = "lenient::tool_name")]
    pub equipped_tool: String,
    #[serde(deserialize_with = "lenient::nullable")]
    pub owned_tools: Vec<String>,
    #[serde(deserialize_with = "lenient::levels")]
    pub upgrade_levels: BTreeMap<String, u32>,
    #[serde(deserialize_with = "lenient::nullable")]
    pub statistics: StatisticsDoc,
    #[serde(deserialize_with = "lenient::nullable")]
    pub settings: SettingsDoc,
    #[serde(deserialize_with = "lenient::nullable")]
    pub flags: FlagsDoc,
}

impl Default for SaveDocument {
    fn default() -> Self {
        Self {
            version: String::new(),
            timestamp: 0,
            currency: 0.0,
            total_earned: 0.0,
            total_clicks: 0,
            total_production_rate: 0.0,
            highest_production_rate: 0.0,
            active_planet: PlanetId::Earth.as_str().to_string(),
            owned_helpers_by_planet: BTreeMap::new(),
            placed_helpers_by_planet: BTreeMap::new(),
            placed_helpers: None,
            equipped_tool: STARTER_TOOL.as_str().to_string(),
            owned_tools: Vec::new(),
            upgrade_levels: BTreeMap::new(),
            statistics: StatisticsDoc::default(),
            settings: SettingsDoc::default(),
            flags: FlagsDoc::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedHelperDoc {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub production_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedHelperDoc {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(deserialize_with = "lenient::whole_u64")]
    pub id: u64,
    #[serde(default)]
    pub is_producing: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticsDoc {
    #[serde(deserialize_with = "lenient::nullable")]
    pub total_play_time_seconds: f64,
    #[serde(deserialize_with = "lenient::nullable")]
    pub highest_production_rate: f64,
    #[serde(deserialize_with = "lenient::whole_u64")]
    pub helpers_bought_count: u64,
    #[serde(deserialize_with = "lenient::whole_u64")]
    pub tools_bought_count: u64,
    #[serde(deserialize_with = "lenient::nullable")]
    pub achievements: Vec<String>,
    #[serde(deserialize_with = "lenient::whole_i64")]
    pub session_start_epoch: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsDoc {
    #[serde(deserialize_with = "lenient::flag_or_on")]
    pub sound: bool,
    #[serde(deserialize_with = "lenient::flag_or_on")]
    pub music: bool,
    #[serde(deserialize_with = "lenient::flag_or_on")]
    pub notifications: bool,
    #[serde(deserialize_with = "lenient::flag_or_on")]
    pub auto_save: bool,
}

impl Default for SettingsDoc {
    fn default() -> Self {
        let s = Settings::default();
        Self {
            sound: s.sound,
            music: s.music,
            notifications: s.notifications,
            auto_save: s.auto_save,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlagsDoc {
    #[serde(deserialize_with = "lenient::nullable")]
    pub has_unlocked_moon_launch: bool,
}

/// Snapshot `state` as a current-version document. Pure: the timestamp is
/// passed in by the caller.
pub fn serialize(state: &GameState, timestamp: i64) -> SaveDocument {
    let mut owned = BTreeMap::new();
    let mut placed = BTreeMap::new();
    for (planet, progress) in &state.planets {
        owned.insert(
            planet.as_str().to_string(),
            progress
                .owned_helpers
                .iter()
                .map(|h| OwnedHelperDoc {
                    kind: h.kind.as_str().to_string(),
                    production_rate: h.production_rate,
                })
                .collect(),
        );
        placed.insert(
            planet.as_str().to_string(),
            progress
                .placed_helpers
                .iter()
                .map(|h| PlacedHelperDoc {
                    kind: h.kind.as_str().to_string(),
                    x: h.x,
                    y: h.y,
                    id: h.id,
                    is_producing: h.is_producing,
                })
                .collect(),
        );
    }
    SaveDocument {
        version: CURRENT_VERSION.to_string(),
        timestamp,
        currency: state.currency,
        total_earned: state.total_earned,
        total_clicks: state.total_clicks,
        total_production_rate: state.total_production_rate,
        highest_production_rate: state.highest_production_rate,
        active_planet: state.active_planet.as_str().to_string(),
        owned_helpers_by_planet: owned,
        placed_helpers_by_planet: placed,
        placed_helpers: None,
        equipped_tool: state.equipped_tool.as_str().to_string(),
        owned_tools: state
            .owned_tools
            .iter()
            .map(|t| t.as_str().to_string())
            .collect(),
        upgrade_levels: state
            .upgrade_levels
            .iter()
            .map(|(id, level)| (id.as_str().to_string(), *level))
            .collect(),
        statistics: StatisticsDoc {
            total_play_time_seconds: state.cumulative_play_time_seconds,
            highest_production_rate: state.highest_production_rate,
            helpers_bought_count: state.statistics.helpers_bought,
            tools_bought_count: state.statistics.tools_bought,
            achievements: state.statistics.achievements.iter().cloned().collect(),
            session_start_epoch: state.statistics.session_start_epoch,
        },
        settings: SettingsDoc {
            sound: state.settings.sound,
            music: state.settings.music,
            notifications: state.settings.notifications,
            auto_save: state.settings.auto_save,
        },
        flags: FlagsDoc {
            has_unlocked_moon_launch: state.flags.has_unlocked_moon_launch,
        },
    }
}

fn finite_non_negative(n: f64) -> f64 {
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

/// Rebuild a [`GameState`] from a document, defaulting whatever is missing.
///
/// Unknown planets, helper types, tools and upgrades are dropped with a
/// warning. A locked or unknown active planet falls back to Earth. Placements
/// are reconciled with ownership before the state is returned.
pub fn deserialize(doc: &SaveDocument, catalog: &Catalog, rules: &PlacementRules) -> GameState {
    let mut state = GameState::new();
    state.currency = finite_non_negative(doc.currency);
    state.total_earned = finite_non_negative(doc.total_earned);
    state.total_clicks = doc.total_clicks;
    state.highest_production_rate = finite_non_negative(doc.highest_production_rate)
        .max(finite_non_negative(doc.statistics.highest_production_rate));
    state.cumulative_play_time_seconds =
        finite_non_negative(doc.statistics.total_play_time_seconds);

    for (key, entries) in &doc.owned_helpers_by_planet {
        let Some(planet) = PlanetId::parse(key) else {
            warn!(planet = %key, count = entries.len(), "dropping helpers of unknown planet");
            continue;
        };
        for entry in entries {
            match catalog.resolve_helper(planet, &entry.kind) {
                Ok(kind) => state.planet_mut(planet).owned_helpers.push(OwnedHelper {
                    kind,
                    production_rate: finite_non_negative(entry.production_rate),
                }),
                Err(err) => warn!(%err, "dropping owned helper"),
            }
        }
    }

    let mut placed_by_planet = doc.placed_helpers_by_planet.clone();
    if placed_by_planet.values().all(Vec::is_empty) {
        if let Some(legacy) = &doc.placed_helpers {
            placed_by_planet.insert(doc.active_planet.clone(), legacy.clone());
        }
    }
    let mut seen_ids = BTreeSet::new();
    for (key, entries) in &placed_by_planet {
        let Some(planet) = PlanetId::parse(key) else {
            warn!(planet = %key, count = entries.len(), "dropping placements of unknown planet");
            continue;
        };
        for entry in entries {
            let kind = match catalog.resolve_helper(planet, &entry.kind) {
                Ok(kind) => kind,
                Err(err) => {
                    warn!(%err, "dropping placed helper");
                    continue;
                }
            };
            if !seen_ids.insert(entry.id) || !entry.x.is_finite() || !entry.y.is_finite() {
                warn!(id = entry.id, "dropping duplicate or malformed placement");
                continue;
            }
            state.planet_mut(planet).placed_helpers.push(PlacedHelper {
                kind,
                x: entry.x,
                y: entry.y,
                id: entry.id,
                is_producing: entry.is_producing,
            });
        }
    }

    for id in &doc.owned_tools {
        match ToolId::parse(id).filter(|t| catalog.tool(*t).is_some()) {
            Some(tool) => {
                state.owned_tools.insert(tool);
            }
            None => warn!(tool = %id, "dropping unknown tool"),
        }
    }
    state.equipped_tool = ToolId::parse(&doc.equipped_tool)
        .filter(|t| state.owned_tools.contains(t))
        .unwrap_or(STARTER_TOOL);

    for (id, level) in &doc.upgrade_levels {
        let def = UpgradeId::parse(id).and_then(|u| catalog.upgrade(u));
        match def {
            Some(def) if *level > 0 => {
                state
                    .upgrade_levels
                    .insert(def.id, (*level).min(def.max_level));
            }
            Some(_) => {}
            None => warn!(upgrade = %id, "dropping unknown upgrade"),
        }
    }

    state.settings = Settings {
        sound: doc.settings.sound,
        music: doc.settings.music,
        notifications: doc.settings.notifications,
        auto_save: doc.settings.auto_save,
    };
    state.flags = Flags {
        has_unlocked_moon_launch: doc.flags.has_unlocked_moon_launch,
    };
    state.statistics = Statistics {
        helpers_bought: doc.statistics.helpers_bought_count,
        tools_bought: doc.statistics.tools_bought_count,
        achievements: doc.statistics.achievements.iter().cloned().collect(),
        session_start_epoch: doc.statistics.session_start_epoch,
    };

    state.active_planet = match PlanetId::parse(&doc.active_planet) {
        Some(p) if is_unlocked(&state, p) => p,
        other => {
            warn!(planet = %doc.active_planet, known = other.is_some(), "active planet unavailable, using earth");
            PlanetId::Earth
        }
    };

    reconcile(&mut state, rules);
    mine_econ::recompute_production(&mut state);
    state
}

/// A document that made it through migration and validation.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub state: GameState,
    pub timestamp: i64,
}

/// Typed view of a validated document.
pub fn from_value(doc: Value) -> Result<SaveDocument, PersistError> {
    serde_json::from_value(doc).map_err(|e| PersistError::ValidationFailed(e.to_string()))
}

/// Migrate, validate and convert an untyped document.
pub fn decode_value(
    doc: Value,
    catalog: &Catalog,
    rules: &PlacementRules,
) -> Result<Decoded, PersistError> {
    let doc = migrate(doc)?;
    check(&doc)?;
    let doc = from_value(doc)?;
    Ok(Decoded {
        timestamp: doc.timestamp,
        state: deserialize(&doc, catalog, rules),
    })
}

/// Full load pipeline for slot text: parse, migrate, validate, convert.
pub fn decode(text: &str, catalog: &Catalog, rules: &PlacementRules) -> Result<Decoded, PersistError> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|e| PersistError::ValidationFailed(format!("malformed json: {e}")))?;
    decode_value(raw, catalog, rules)
}

pub fn encode(doc: &SaveDocument) -> Result<String, PersistError> {
    Ok(serde_json::to_string(doc)?)
}

/// Human-readable form used for exports.
pub fn encode_pretty(doc: &SaveDocument) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Field-level deserializers that tolerate the shapes older or hand-edited
/// saves contain.
mod lenient {
    use serde::de::{DeserializeOwned, Deserializer};
    use mine_core::{PlanetId, STARTER_TOOL};
    use serde::Deserialize;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use tracing::warn;

    fn entries<T: DeserializeOwned>(value: Value) -> Vec<T> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(%err, "skipping malformed entry");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn planet_lists<'de, D, T>(d: D) -> Result<BTreeMap<String, Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(d)?.unwrap_or_default();
        Ok(raw.into_iter().map(|(k, v)| (k, entries(v))).collect())
    }

    pub fn optional_list<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(Option::<Value>::deserialize(d)?.map(entries))
    }

    pub fn levels<'de, D>(d: D) -> Result<BTreeMap<String, u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(d)?.unwrap_or_default();
        Ok(raw
            .into_iter()
            .filter_map(|(k, v)| {
                let n = v.as_f64().filter(|n| n.is_finite() && *n >= 0.0)?;
                Some((k, n.min(f64::from(u32::MAX)) as u32))
            })
            .collect())
    }

    pub fn whole_u64<'de, D>(d: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = Option::<f64>::deserialize(d)?.unwrap_or(0.0);
        Ok(if n.is_finite() && n > 0.0 { n as u64 } else { 0 })
    }

    pub fn whole_i64<'de, D>(d: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = Option::<f64>::deserialize(d)?.unwrap_or(0.0);
        Ok(if n.is_finite() { n as i64 } else { 0 })
    }

    /// `null` reads as the type's default.
    pub fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }

    /// Settings are on unless stored as `false`.
    pub fn flag_or_on<'de, D>(d: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<bool>::deserialize(d)?.unwrap_or(true))
    }

    pub fn planet_name<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(d)?
            .unwrap_or_else(|| PlanetId::Earth.as_str().to_string()))
    }

    pub fn tool_name<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_else(|| STARTER_TOOL.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mine_core::{EarthHelper, HelperId, MoonHelper};
    use mine_planets::PlanetController;
    use proptest::prelude::*;
    use serde_json::json;

    const MINER: HelperId = HelperId::Earth(EarthHelper::Miner);

    fn played_state(buys: &[usize], clicks: u32) -> GameState {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let mut pc = PlanetController::new(rules.clone(), 1.5, 0.0);
        let mut s = GameState::new();
        s.currency = 1e8;
        for _ in 0..clicks {
            mine_econ::click(&mut s, &catalog);
        }
        let roster = catalog.helpers_on(PlanetId::Earth);
        for b in buys {
            let kind = roster[*b % roster.len()].id;
            if pc.purchase(&mut s, &catalog, kind).is_ok() {
                pc.place_pending_at_fallback(&mut s);
            }
        }
        pc.tick(&mut s, 1.0);
        mine_econ::accrue(&mut s, 3.0);
        s.statistics.achievements.insert("first_click".into());
        s.cumulative_play_time_seconds = 12.5;
        s
    }

    #[test]
    fn serialized_shape_matches_schema() {
        let s = played_state(&[0, 0, 1], 2);
        let v = serde_json::to_value(serialize(&s, 99)).unwrap();
        assert_eq!(v["version"], CURRENT_VERSION);
        assert_eq!(v["timestamp"], 99);
        assert_eq!(v["activePlanet"], "earth");
        assert_eq!(v["ownedHelpersByPlanet"]["earth"][0]["type"], "miner");
        assert!(v["placedHelpersByPlanet"]["earth"][0]["isProducing"].is_boolean());
        assert_eq!(v["settings"]["autoSave"], true);
        assert_eq!(v["flags"]["hasUnlockedMoonLaunch"], false);
        assert_eq!(v["statistics"]["helpersBoughtCount"], 3);
        assert!(v.get("placedHelpers").is_none());
    }

    #[test]
    fn round_trip_through_text() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let s = played_state(&[0, 1, 2, 0], 5);
        let text = encode(&serialize(&s, 1_000)).unwrap();
        let decoded = decode(&text, &catalog, &rules).unwrap();
        assert_eq!(decoded.timestamp, 1_000);
        assert_eq!(decoded.state, s);
    }

    #[test]
    fn null_optional_fields_read_as_defaults() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        for field in [
            "activePlanet",
            "equippedTool",
            "ownedTools",
            "settings",
            "statistics",
            "flags",
            "totalEarned",
            "totalClicks",
            "upgradeLevels",
            "ownedHelpersByPlanet",
            "placedHelpersByPlanet",
            "placedHelpers",
        ] {
            let mut doc = json!({"version": "3.0.0", "timestamp": 1, "currency": 5});
            doc[field] = Value::Null;
            let decoded = decode(&doc.to_string(), &catalog, &rules)
                .unwrap_or_else(|err| panic!("{field}: null rejected: {err}"));
            assert_eq!(decoded.state.currency, 5.0, "{field}");
            assert_eq!(decoded.state.active_planet, PlanetId::Earth, "{field}");
            assert_eq!(decoded.state.equipped_tool, STARTER_TOOL, "{field}");
            assert!(decoded.state.settings.auto_save, "{field}");
        }

        let doc = json!({
            "version": "3.0.0",
            "timestamp": 1,
            "currency": 5,
            "settings": {"sound": null, "autoSave": false},
            "statistics": {"achievements": null, "totalPlayTimeSeconds": null, "helpersBoughtCount": null},
            "flags": {"hasUnlockedMoonLaunch": null}
        });
        let state = decode(&doc.to_string(), &catalog, &rules).unwrap().state;
        assert!(state.settings.sound);
        assert!(!state.settings.auto_save);
        assert!(state.statistics.achievements.is_empty());
        assert!(!state.flags.has_unlocked_moon_launch);
    }

    #[test]
    fn unknown_helper_types_are_dropped() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let doc = json!({
            "version": "3.0.0",
            "timestamp": 1,
            "currency": 5,
            "ownedHelpersByPlanet": {
                "earth": [{"type": "miner", "productionRate": 1}, {"type": "laser_cannon", "productionRate": 99}],
                "pluto": [{"type": "miner", "productionRate": 1}]
            },
            "placedHelpersByPlanet": {
                "earth": [{"type": "laser_cannon", "x": 100, "y": 100, "id": 3, "isProducing": true}]
            }
        });
        let decoded = decode_value(doc, &catalog, &rules).unwrap();
        let earth = decoded.state.planet(PlanetId::Earth).unwrap();
        assert_eq!(earth.owned_helpers.len(), 1);
        assert_eq!(earth.placed_count(MINER), 1);
        assert_eq!(earth.placed_helpers.len(), 1);
        assert_eq!(decoded.state.total_production_rate, 1.0);
    }

    #[test]
    fn legacy_flat_placements_go_to_active_planet() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let doc = json!({
            "version": "3.0.0",
            "timestamp": 1,
            "currency": 0,
            "activePlanet": "moon",
            "flags": {"hasUnlockedMoonLaunch": true},
            "ownedHelpersByPlanet": {"moon": [{"type": "lander", "productionRate": 9000}]},
            "placedHelpers": [{"type": "lander", "x": 120, "y": 90, "id": 8, "isProducing": true}]
        });
        let decoded = decode_value(doc, &catalog, &rules).unwrap();
        let moon = decoded.state.planet(PlanetId::Moon).unwrap();
        assert_eq!(decoded.state.active_planet, PlanetId::Moon);
        assert_eq!(moon.placed_helpers.len(), 1);
        assert_eq!(moon.placed_helpers[0].id, 8);
        assert_eq!(moon.placed_count(HelperId::Moon(MoonHelper::Lander)), 1);
    }

    #[test]
    fn missing_optional_fields_default() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let decoded = decode(r#"{"version":"3.0.0","timestamp":7,"currency":42}"#, &catalog, &rules)
            .unwrap();
        let mut expected = GameState::new();
        expected.currency = 42.0;
        assert_eq!(decoded.state, expected);
    }

    #[test]
    fn locked_active_planet_falls_back_to_earth() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let doc = json!({"version": "3.0.0", "timestamp": 1, "currency": 0, "activePlanet": "titan"});
        let decoded = decode_value(doc, &catalog, &rules).unwrap();
        assert_eq!(decoded.state.active_planet, PlanetId::Earth);
    }

    #[test]
    fn negative_currency_never_reaches_state() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let err = decode(r#"{"version":"3.0.0","timestamp":1,"currency":-5}"#, &catalog, &rules)
            .unwrap_err();
        assert!(matches!(err, PersistError::ValidationFailed(_)));
        assert!(decode("not json", &catalog, &rules).is_err());
    }

    #[test]
    fn tools_and_upgrades_are_checked_against_catalog() {
        let catalog = Catalog::standard();
        let rules = PlacementRules::default();
        let doc = json!({
            "version": "3.0.0", "timestamp": 1, "currency": 0,
            "equippedTool": "mithril",
            "ownedTools": ["iron", "mithril"],
            "upgradeLevels": {"reinforced_grip": 99, "turbo": 1}
        });
        let s = decode_value(doc, &catalog, &rules).unwrap().state;
        assert_eq!(s.equipped_tool, STARTER_TOOL);
        assert!(s.owned_tools.contains(&ToolId::Iron));
        assert_eq!(s.owned_tools.len(), 2);
        assert_eq!(s.upgrade_level(UpgradeId::ReinforcedGrip), 10);
    }

    proptest! {
        #[test]
        fn round_trip_any_played_state(buys in proptest::collection::vec(0usize..5, 0..25),
                                       clicks in 0u32..50,
                                       ts in 0i64..4_000_000_000_000) {
            let catalog = Catalog::standard();
            let rules = PlacementRules::default();
            let s = played_state(&buys, clicks);
            let back = deserialize(&serialize(&s, ts), &catalog, &rules);
            prop_assert_eq!(back, s);
        }
    }
}
