//! Structural acceptance of persisted documents and best-effort repair.

use serde_json::{json, Map, Value};

use crate::migrate::CURRENT_VERSION;
use crate::PersistError;

fn non_negative(v: &Value) -> bool {
    v.as_f64().is_some_and(|n| n.is_finite() && n >= 0.0)
}

/// Check the fields a document cannot be loaded without.
///
/// `version`, `timestamp` and `currency` are required. `currency`,
/// `totalEarned` and `totalClicks` must be non-negative numbers; the latter
/// two may be absent or `null`.
pub fn check(doc: &Value) -> Result<(), PersistError> {
    let fail = |msg: &str| -> Result<(), PersistError> {
        Err(PersistError::ValidationFailed(msg.to_string()))
    };
    let Some(obj) = doc.as_object() else {
        return fail("document is not an object");
    };
    match obj.get("version").and_then(Value::as_str) {
        Some(v) if !v.trim().is_empty() => {}
        _ => return fail("missing version"),
    }
    if !obj.get("timestamp").is_some_and(Value::is_number) {
        return fail("missing timestamp");
    }
    match obj.get("currency") {
        Some(v) if non_negative(v) => {}
        Some(_) => return fail("currency must be a non-negative number"),
        None => return fail("missing currency"),
    }
    for key in ["totalEarned", "totalClicks"] {
        if let Some(v) = obj.get(key).filter(|v| !v.is_null()) {
            if !non_negative(v) {
                return Err(PersistError::ValidationFailed(format!(
                    "{key} must be a non-negative number"
                )));
            }
        }
    }
    Ok(())
}

/// Fail-closed boolean form of [`check`].
pub fn validate(doc: &Value) -> bool {
    check(doc).is_ok()
}

fn clamp_number(obj: &mut Map<String, Value>, key: &str) {
    let n = obj
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
        .max(0.0);
    obj.insert(key.into(), json!(n));
}

fn clamp_whole(obj: &mut Map<String, Value>, key: &str) {
    let n = obj
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n > 0.0)
        .map_or(0, |n| n.floor() as u64);
    obj.insert(key.into(), json!(n));
}

fn ensure_object(obj: &mut Map<String, Value>, key: &str) {
    if !obj.get(key).is_some_and(Value::is_object) {
        obj.insert(key.into(), json!({}));
    }
}

fn ensure_array(obj: &mut Map<String, Value>, key: &str) {
    if !obj.get(key).is_some_and(Value::is_array) {
        obj.insert(key.into(), json!([]));
    }
}

/// Clamp helper entry numbers inside a `{ planet: [entry] }` map.
fn repair_planet_lists(obj: &mut Map<String, Value>, key: &str, numeric: &[&str]) {
    ensure_object(obj, key);
    if let Some(Value::Object(planets)) = obj.get_mut(key) {
        for list in planets.values_mut() {
            if !list.is_array() {
                *list = json!([]);
            }
            if let Value::Array(entries) = list {
                entries.retain(Value::is_object);
                for entry in entries.iter_mut() {
                    if let Value::Object(entry) = entry {
                        for k in numeric {
                            if entry.contains_key(*k) {
                                clamp_number(entry, k);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Coerce a possibly corrupted document into one that passes [`validate`].
///
/// Negative or non-numeric numbers become zero, counters become whole
/// numbers and missing or mistyped collections become empty ones. Only used
/// on the recovery path, never for regular loads.
pub fn repair(doc: Value) -> Value {
    let mut obj = match doc {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    if !obj
        .get("version")
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty())
    {
        obj.insert("version".into(), json!(CURRENT_VERSION));
    }
    let timestamp = obj
        .get("timestamp")
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .map_or(0, |n| n as i64);
    obj.insert("timestamp".into(), json!(timestamp));
    for key in [
        "currency",
        "totalEarned",
        "totalProductionRate",
        "highestProductionRate",
    ] {
        clamp_number(&mut obj, key);
    }
    clamp_whole(&mut obj, "totalClicks");
    if !obj.get("activePlanet").is_some_and(Value::is_string) {
        obj.insert("activePlanet".into(), json!("earth"));
    }
    // Legacy flat lists feed the per-planet maps during migration; keep
    // them only when they are usable.
    for legacy in ["placedHelpers", "ownedHelpers"] {
        if obj.get(legacy).is_some_and(|v| !v.is_array()) {
            obj.remove(legacy);
        }
    }
    repair_planet_lists(&mut obj, "ownedHelpersByPlanet", &["productionRate"]);
    repair_planet_lists(&mut obj, "placedHelpersByPlanet", &["x", "y"]);
    ensure_array(&mut obj, "ownedTools");
    ensure_object(&mut obj, "upgradeLevels");
    if let Some(Value::Object(levels)) = obj.get_mut("upgradeLevels") {
        levels.retain(|_, v| v.is_number());
        let keys: Vec<String> = levels.keys().cloned().collect();
        for k in keys {
            clamp_whole(levels, &k);
        }
    }
    ensure_object(&mut obj, "statistics");
    if let Some(Value::Object(stats)) = obj.get_mut("statistics") {
        ensure_array(stats, "achievements");
        for key in ["totalPlayTimeSeconds", "highestProductionRate"] {
            clamp_number(stats, key);
        }
        for key in ["helpersBoughtCount", "toolsBoughtCount"] {
            clamp_whole(stats, key);
        }
    }
    ensure_object(&mut obj, "settings");
    ensure_object(&mut obj, "flags");
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Value {
        json!({"version": "3.0.0", "timestamp": 1, "currency": 0})
    }

    #[test]
    fn minimal_document_is_valid() {
        assert!(validate(&minimal()));
    }

    #[test]
    fn negative_currency_is_rejected() {
        let mut doc = minimal();
        doc["currency"] = json!(-5);
        assert!(!validate(&doc));
    }

    #[test]
    fn required_fields_and_types_are_enforced() {
        assert!(!validate(&json!([])));
        assert!(!validate(&json!({"timestamp": 1, "currency": 0})));
        assert!(!validate(&json!({"version": "3.0.0", "currency": 0})));
        assert!(!validate(&json!({"version": "3.0.0", "timestamp": 1})));
        let mut doc = minimal();
        doc["currency"] = json!("100");
        assert!(!validate(&doc));
        let mut doc = minimal();
        doc["totalClicks"] = json!(-1);
        assert!(!validate(&doc));
        let mut doc = minimal();
        doc["totalEarned"] = Value::Null;
        assert!(!validate(&doc));
    }

    #[test]
    fn repair_makes_garbage_valid() {
        let broken = json!({
            "currency": -50,
            "totalEarned": "lots",
            "totalClicks": 12.7,
            "ownedHelpersByPlanet": {"earth": [{"type": "miner", "productionRate": -3}, 7], "moon": "x"},
            "placedHelpersByPlanet": [],
            "upgradeLevels": {"reinforced_grip": 2.9, "bogus": "high"},
            "statistics": {"achievements": "none", "helpersBoughtCount": -2}
        });
        let fixed = repair(broken);
        assert!(validate(&fixed));
        assert_eq!(fixed["currency"], 0.0);
        assert_eq!(fixed["totalEarned"], 0.0);
        assert_eq!(fixed["totalClicks"], 12);
        assert_eq!(fixed["ownedHelpersByPlanet"]["earth"].as_array().unwrap().len(), 1);
        assert_eq!(fixed["ownedHelpersByPlanet"]["earth"][0]["productionRate"], 0.0);
        assert_eq!(fixed["ownedHelpersByPlanet"]["moon"], json!([]));
        assert_eq!(fixed["placedHelpersByPlanet"], json!({}));
        assert_eq!(fixed["upgradeLevels"], json!({"reinforced_grip": 2}));
        assert_eq!(fixed["statistics"]["achievements"], json!([]));
        assert_eq!(fixed["statistics"]["helpersBoughtCount"], 0);
    }

    #[test]
    fn repair_of_non_object_starts_from_scratch() {
        let fixed = repair(json!("corrupted"));
        assert!(validate(&fixed));
        assert_eq!(fixed["version"], CURRENT_VERSION);
    }

    #[test]
    fn repair_keeps_good_values() {
        let mut doc = minimal();
        doc["currency"] = json!(12.5);
        doc["activePlanet"] = json!("mars");
        let fixed = repair(doc);
        assert_eq!(fixed["currency"], 12.5);
        assert_eq!(fixed["activePlanet"], "mars");
        assert_eq!(fixed["version"], "3.0.0");
    }
}
