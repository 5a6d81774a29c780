//! Schema evolution: pure `Value -> Value` steps, one per major version.
//!
//! - `1.x`: flat `placedHelpers` / `ownedHelpers` lists for the active planet
//! - `2.x`: per-planet maps; tool stored under `pickaxe`; Moon launch flag at
//!   the top level
//! - `3.x`: current layout

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::PersistError;

pub const CURRENT_VERSION: &str = "3.0.0";
pub const CURRENT_MAJOR: u64 = 3;

type Step = fn(Map<String, Value>) -> Map<String, Value>;

/// `(from_major, step)`; each step produces `from_major + 1`.
const STEPS: [(u64, Step); 2] = [(1, v1_to_v2), (2, v2_to_v3)];

/// Major component of a `major.minor.patch` string.
pub fn schema_major(version: &str) -> Option<u64> {
    version.split('.').next()?.trim().parse().ok()
}

/// Bring a document up to [`CURRENT_VERSION`].
///
/// Documents without a string `version` are passed through untouched so
/// that validation rejects them. Unparsable or future versions fail.
pub fn migrate(doc: Value) -> Result<Value, PersistError> {
    let mut obj = match doc {
        Value::Object(obj) => obj,
        other => return Ok(other),
    };
    let Some(version) = obj.get("version").and_then(Value::as_str).map(str::to_owned) else {
        return Ok(Value::Object(obj));
    };
    let mut major =
        schema_major(&version).ok_or_else(|| PersistError::UnsupportedVersion(version.clone()))?;
    if major == 0 || major > CURRENT_MAJOR {
        return Err(PersistError::UnsupportedVersion(version));
    }
    while major < CURRENT_MAJOR {
        let (_, step) = STEPS
            .iter()
            .find(|(from, _)| *from == major)
            .ok_or_else(|| PersistError::UnsupportedVersion(version.clone()))?;
        obj = step(obj);
        major += 1;
        obj.insert("version".into(), json!(format!("{major}.0.0")));
        debug!(from = %version, to = major, "save document migrated");
    }
    Ok(Value::Object(obj))
}

fn is_missing_or_empty(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::Object(m)) => m.is_empty(),
        Some(_) => false,
    }
}

/// Move flat helper lists under the active planet.
fn v1_to_v2(mut obj: Map<String, Value>) -> Map<String, Value> {
    let active = match obj.get("activePlanet").and_then(Value::as_str) {
        Some(p) => p.to_owned(),
        None => {
            obj.insert("activePlanet".into(), json!("earth"));
            "earth".to_owned()
        }
    };
    for (flat, by_planet) in [
        ("ownedHelpers", "ownedHelpersByPlanet"),
        ("placedHelpers", "placedHelpersByPlanet"),
    ] {
        if !is_missing_or_empty(&obj, by_planet) {
            continue;
        }
        if let Some(list @ Value::Array(_)) = obj.remove(flat) {
            let mut map = Map::new();
            map.insert(active.clone(), list);
            obj.insert(by_planet.into(), Value::Object(map));
        }
    }
    obj
}

/// Rename `pickaxe`, move the Moon launch flag under `flags`, default autosave.
fn v2_to_v3(mut obj: Map<String, Value>) -> Map<String, Value> {
    if let Some(tool) = obj.remove("pickaxe") {
        obj.entry("equippedTool").or_insert(tool);
    }
    let launched = obj
        .remove("hasUnlockedMoonLaunch")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !obj.get("flags").is_some_and(Value::is_object) {
        obj.insert("flags".into(), json!({}));
    }
    if let Some(Value::Object(flags)) = obj.get_mut("flags") {
        flags
            .entry("hasUnlockedMoonLaunch")
            .or_insert(json!(launched));
    }
    if let Some(Value::Object(settings)) = obj.get_mut("settings") {
        settings.entry("autoSave").or_insert(json!(true));
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_parses_loose_versions() {
        assert_eq!(schema_major("3.0.0"), Some(3));
        assert_eq!(schema_major("2"), Some(2));
        assert_eq!(schema_major("x.1"), None);
    }

    #[test]
    fn v1_flat_lists_move_to_active_planet() {
        let doc = json!({
            "version": "1.2.0",
            "timestamp": 5,
            "currency": 10,
            "activePlanet": "moon",
            "placedHelpers": [{"type": "lander", "x": 10, "y": 20, "id": 1, "isProducing": true}],
            "ownedHelpers": [{"type": "lander", "productionRate": 9000}]
        });
        let out = migrate(doc).unwrap();
        assert_eq!(out["version"], "3.0.0");
        assert_eq!(out["placedHelpersByPlanet"]["moon"][0]["type"], "lander");
        assert_eq!(out["ownedHelpersByPlanet"]["moon"][0]["productionRate"], 9000);
        assert!(out.get("placedHelpers").is_none());
        assert_eq!(out["flags"]["hasUnlockedMoonLaunch"], false);
    }

    #[test]
    fn v1_without_active_planet_defaults_to_earth() {
        let doc = json!({"version": "1.0.0", "placedHelpers": []});
        let out = migrate(doc).unwrap();
        assert_eq!(out["activePlanet"], "earth");
        assert!(out["placedHelpersByPlanet"]["earth"].is_array());
    }

    #[test]
    fn v2_renames_pickaxe_and_moves_flag() {
        let doc = json!({
            "version": "2.0.0",
            "pickaxe": "iron",
            "hasUnlockedMoonLaunch": true,
            "settings": {"sound": false}
        });
        let out = migrate(doc).unwrap();
        assert_eq!(out["equippedTool"], "iron");
        assert_eq!(out["flags"]["hasUnlockedMoonLaunch"], true);
        assert_eq!(out["settings"]["autoSave"], true);
        assert_eq!(out["settings"]["sound"], false);
    }

    #[test]
    fn v2_null_flags_still_receive_launch_flag() {
        let doc = json!({"version": "2.1.0", "hasUnlockedMoonLaunch": true, "flags": null});
        let out = migrate(doc).unwrap();
        assert_eq!(out["flags"]["hasUnlockedMoonLaunch"], true);
    }

    #[test]
    fn current_documents_pass_through() {
        let doc = json!({"version": CURRENT_VERSION, "currency": 1});
        assert_eq!(migrate(doc.clone()).unwrap(), doc);
    }

    #[test]
    fn future_and_garbage_versions_are_rejected() {
        assert!(matches!(
            migrate(json!({"version": "9.0.0"})),
            Err(PersistError::UnsupportedVersion(_))
        ));
        assert!(migrate(json!({"version": "banana"})).is_err());
        // No version: left for validation to reject.
        assert!(migrate(json!({"currency": 1})).is_ok());
    }
}
