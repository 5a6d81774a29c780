#![deny(warnings)]

//! Economic model: purchase costs, production and currency accrual.
//!
//! This module provides:
//! - Exponential cost curves (15% per owned helper unit)
//! - Atomic purchases of helpers, tools and upgrades
//! - Production recomputation and fixed-tick accrual
//! - Click power from the equipped tool and upgrades
//!
//! All mutations either fully apply or leave the state untouched.

use mine_core::{
    Catalog, GameError, GameState, HelperDefinition, HelperId, OwnedHelper, ToolId,
    UpgradeDefinition, UpgradeId,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

/// Helper price multiplier per owned unit, in percent.
pub const HELPER_COST_GROWTH_PERCENT: u32 = 115;

/// `floor(base × (growth_percent / 100)^owned)`.
///
/// Computed in exact decimal arithmetic; falls back to `f64` once the value
/// leaves the decimal range.
///
/// Example:
/// assert_eq!(growth_cost(20, 115, 0), 20.0);
/// assert_eq!(growth_cost(20, 115, 1), 23.0);
pub fn growth_cost(base: u64, growth_percent: u32, owned: u32) -> f64 {
    exact_growth_cost(base, growth_percent, owned)
        .unwrap_or_else(|| float_growth_cost(base, growth_percent, owned))
}

fn exact_growth_cost(base: u64, growth_percent: u32, owned: u32) -> Option<f64> {
    let rate = Decimal::new(i64::from(growth_percent), 2);
    let mut cost = Decimal::from(base);
    for _ in 0..owned {
        cost = cost.checked_mul(rate)?;
    }
    cost.floor().to_f64()
}

fn float_growth_cost(base: u64, growth_percent: u32, owned: u32) -> f64 {
    let rate = f64::from(growth_percent) / 100.0;
    (base as f64 * rate.powf(f64::from(owned))).floor()
}

/// Price of the next unit of a helper when `owned_count` units are owned.
pub fn purchase_cost(def: &HelperDefinition, owned_count: u32) -> f64 {
    growth_cost(def.base_cost, HELPER_COST_GROWTH_PERCENT, owned_count)
}

/// Price of the next unit of `kind` given the current ownership.
pub fn next_helper_cost(
    state: &GameState,
    catalog: &Catalog,
    kind: HelperId,
) -> Result<f64, GameError> {
    let def = helper_def(catalog, kind)?;
    Ok(purchase_cost(def, state.owned_count(kind)))
}

pub fn can_afford(currency: f64, cost: f64) -> bool {
    currency >= cost
}

fn helper_def(catalog: &Catalog, kind: HelperId) -> Result<&HelperDefinition, GameError> {
    catalog
        .helper(kind)
        .ok_or_else(|| GameError::UnknownHelperType {
            planet: kind.planet(),
            id: kind.as_str().to_string(),
        })
}

/// Receipt of a completed helper purchase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Purchase {
    pub kind: HelperId,
    pub cost: f64,
}

/// Buy one unit of `kind` on the active planet.
///
/// Fails with `WrongPlanet` when `kind` belongs to another planet and with
/// `InsufficientFunds` when the player cannot pay; in both cases nothing
/// changes. On success the cost is deducted, one owned unit is added and the
/// production rate is recomputed.
pub fn apply_purchase(
    state: &mut GameState,
    catalog: &Catalog,
    kind: HelperId,
) -> Result<Purchase, GameError> {
    if kind.planet() != state.active_planet {
        return Err(GameError::WrongPlanet {
            helper: kind,
            active: state.active_planet,
        });
    }
    let def = helper_def(catalog, kind)?;
    let cost = purchase_cost(def, state.owned_count(kind));
    if !can_afford(state.currency, cost) {
        return Err(GameError::InsufficientFunds {
            cost,
            available: state.currency,
        });
    }
    state.currency -= cost;
    state.active_mut().owned_helpers.push(OwnedHelper {
        kind,
        production_rate: def.base_production_rate,
    });
    state.statistics.helpers_bought += 1;
    recompute_production(state);
    debug!(helper = %kind, cost, "helper purchased");
    Ok(Purchase { kind, cost })
}

/// Undo the most recent unit of `kind`: remove it and credit the price of the
/// unit at `count - 1`. Returns the refunded amount, or `None` if none is owned.
pub fn refund_last(state: &mut GameState, catalog: &Catalog, kind: HelperId) -> Option<f64> {
    let def = catalog.helper(kind)?;
    let count = state.owned_count(kind);
    if count == 0 {
        return None;
    }
    let refund = purchase_cost(def, count - 1);
    let planet = state.planet_mut(kind.planet());
    let idx = planet.owned_helpers.iter().rposition(|h| h.kind == kind)?;
    planet.owned_helpers.remove(idx);
    state.currency += refund;
    recompute_production(state);
    debug!(helper = %kind, refund, "helper refunded");
    Some(refund)
}

/// Recompute `total_production_rate` from the active planet's owned helpers.
pub fn recompute_production(state: &mut GameState) {
    state.total_production_rate = state.active().map_or(0.0, |p| p.production_rate());
}

/// Add `rate × elapsed_secs` to currency and lifetime earnings.
///
/// Non-finite or non-positive durations add nothing.
pub fn accrue(state: &mut GameState, elapsed_secs: f64) {
    state.highest_production_rate = state
        .highest_production_rate
        .max(state.total_production_rate);
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return;
    }
    let gain = state.total_production_rate * elapsed_secs;
    state.currency += gain;
    state.total_earned += gain;
}

/// Currency granted by one click with the current tool and upgrades.
pub fn click_power(state: &GameState, catalog: &Catalog) -> u64 {
    let tool = catalog
        .tool(state.equipped_tool)
        .map_or(1, |t| t.click_power);
    let upgrades: u64 = catalog
        .upgrades()
        .map(|u| u.click_bonus * u64::from(state.upgrade_level(u.id)))
        .sum();
    tool + upgrades
}

/// Apply one click; returns the amount gained.
pub fn click(state: &mut GameState, catalog: &Catalog) -> u64 {
    let gain = click_power(state, catalog);
    state.currency += gain as f64;
    state.total_earned += gain as f64;
    state.total_clicks += 1;
    gain
}

/// Outcome of [`buy_tool`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolPurchase {
    Bought { cost: f64 },
    /// Already owned; equipped without charge.
    Equipped,
}

/// Buy and equip a pickaxe.
pub fn buy_tool(
    state: &mut GameState,
    catalog: &Catalog,
    tool: ToolId,
) -> Result<ToolPurchase, GameError> {
    if state.owned_tools.contains(&tool) {
        state.equipped_tool = tool;
        return Ok(ToolPurchase::Equipped);
    }
    let def = catalog.tool(tool).ok_or(GameError::ToolNotOwned(tool))?;
    let cost = def.cost as f64;
    if !can_afford(state.currency, cost) {
        return Err(GameError::InsufficientFunds {
            cost,
            available: state.currency,
        });
    }
    state.currency -= cost;
    state.owned_tools.insert(tool);
    state.equipped_tool = tool;
    state.statistics.tools_bought += 1;
    debug!(%tool, cost, "tool purchased");
    Ok(ToolPurchase::Bought { cost })
}

pub fn equip_tool(state: &mut GameState, tool: ToolId) -> Result<(), GameError> {
    if !state.owned_tools.contains(&tool) {
        return Err(GameError::ToolNotOwned(tool));
    }
    state.equipped_tool = tool;
    Ok(())
}

/// Price of the next level of an upgrade currently at `level`.
pub fn upgrade_cost(def: &UpgradeDefinition, level: u32) -> f64 {
    growth_cost(def.base_cost, def.growth_percent, level)
}

/// Buy the next level of an upgrade; returns the price paid.
pub fn buy_upgrade(
    state: &mut GameState,
    catalog: &Catalog,
    id: UpgradeId,
) -> Result<f64, GameError> {
    let def = catalog.upgrade(id).ok_or(GameError::UpgradeMaxed(id))?;
    let level = state.upgrade_level(id);
    if level >= def.max_level {
        return Err(GameError::UpgradeMaxed(id));
    }
    let cost = upgrade_cost(def, level);
    if !can_afford(state.currency, cost) {
        return Err(GameError::InsufficientFunds {
            cost,
            available: state.currency,
        });
    }
    state.currency -= cost;
    state.upgrade_levels.insert(id, level + 1);
    debug!(upgrade = %id, level = level + 1, cost, "upgrade purchased");
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mine_core::{EarthHelper, MoonHelper, PlanetId};
    use proptest::prelude::*;

    const MINER: HelperId = HelperId::Earth(EarthHelper::Miner);

    #[test]
    fn miner_cost_curve_matches_reference_values() {
        let catalog = Catalog::standard();
        let def = catalog.helper(MINER).unwrap();
        assert_eq!(purchase_cost(def, 0), 20.0);
        assert_eq!(purchase_cost(def, 1), 23.0);
        assert_eq!(purchase_cost(def, 2), 26.0); // 26.45
        assert_eq!(purchase_cost(def, 10), 80.0); // 80.911...
    }

    #[test]
    fn buy_deducts_and_counts() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 50.0;
        let p = apply_purchase(&mut s, &catalog, MINER).unwrap();
        assert_eq!(p.cost, 20.0);
        assert_eq!(s.currency, 30.0);
        assert_eq!(s.owned_count(MINER), 1);
        assert_eq!(s.total_production_rate, 1.0);
        assert_eq!(next_helper_cost(&s, &catalog, MINER).unwrap(), 23.0);
    }

    #[test]
    fn insufficient_funds_leaves_state_untouched() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 19.0;
        let before = s.clone();
        let err = apply_purchase(&mut s, &catalog, MINER).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientFunds {
                cost: 20.0,
                available: 19.0
            }
        );
        assert_eq!(s, before);
    }

    #[test]
    fn cannot_buy_helpers_of_inactive_planet() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 1e12;
        let lander = HelperId::Moon(MoonHelper::Lander);
        assert!(matches!(
            apply_purchase(&mut s, &catalog, lander),
            Err(GameError::WrongPlanet { .. })
        ));
        assert_eq!(s.owned_count(lander), 0);
    }

    #[test]
    fn accrue_with_no_helpers_adds_nothing() {
        let mut s = GameState::new();
        accrue(&mut s, 10.0);
        assert_eq!(s.currency, 0.0);
        assert_eq!(s.total_earned, 0.0);
    }

    #[test]
    fn accrue_adds_rate_times_elapsed_and_tracks_peak() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 20.0;
        apply_purchase(&mut s, &catalog, MINER).unwrap();
        accrue(&mut s, 10.0);
        assert_eq!(s.currency, 10.0);
        assert_eq!(s.total_earned, 10.0);
        assert_eq!(s.highest_production_rate, 1.0);
        accrue(&mut s, f64::NAN);
        assert_eq!(s.currency, 10.0);
    }

    #[test]
    fn production_is_planet_local() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 20.0;
        apply_purchase(&mut s, &catalog, MINER).unwrap();
        s.active_planet = PlanetId::Moon;
        recompute_production(&mut s);
        assert_eq!(s.total_production_rate, 0.0);
    }

    #[test]
    fn refund_uses_price_at_count_minus_one() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 43.0;
        apply_purchase(&mut s, &catalog, MINER).unwrap();
        apply_purchase(&mut s, &catalog, MINER).unwrap();
        assert_eq!(s.currency, 0.0);
        assert_eq!(refund_last(&mut s, &catalog, MINER), Some(23.0));
        assert_eq!(refund_last(&mut s, &catalog, MINER), Some(20.0));
        assert_eq!(refund_last(&mut s, &catalog, MINER), None);
        assert_eq!(s.currency, 43.0);
        assert_eq!(s.total_production_rate, 0.0);
    }

    #[test]
    fn clicks_use_tool_and_upgrades() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        assert_eq!(click(&mut s, &catalog), 1);
        s.currency = 1_000.0;
        assert_eq!(
            buy_tool(&mut s, &catalog, ToolId::Stone).unwrap(),
            ToolPurchase::Bought { cost: 100.0 }
        );
        assert_eq!(buy_upgrade(&mut s, &catalog, UpgradeId::ReinforcedGrip).unwrap(), 250.0);
        assert_eq!(click_power(&s, &catalog), 3);
        assert_eq!(click(&mut s, &catalog), 3);
        assert_eq!(s.total_clicks, 2);
        assert_eq!(s.total_earned, 4.0);
        assert_eq!(s.statistics.tools_bought, 1);
    }

    #[test]
    fn rebuying_an_owned_tool_only_equips_it() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 100.0;
        buy_tool(&mut s, &catalog, ToolId::Stone).unwrap();
        equip_tool(&mut s, ToolId::Wooden).unwrap();
        assert_eq!(buy_tool(&mut s, &catalog, ToolId::Stone).unwrap(), ToolPurchase::Equipped);
        assert_eq!(s.currency, 0.0);
        assert_eq!(s.equipped_tool, ToolId::Stone);
        assert_eq!(equip_tool(&mut s, ToolId::Diamond), Err(GameError::ToolNotOwned(ToolId::Diamond)));
    }

    #[test]
    fn upgrades_stop_at_max_level() {
        let catalog = Catalog::standard();
        let mut s = GameState::new();
        s.currency = 1e12;
        for _ in 0..5 {
            buy_upgrade(&mut s, &catalog, UpgradeId::TemperedEdge).unwrap();
        }
        assert_eq!(
            buy_upgrade(&mut s, &catalog, UpgradeId::TemperedEdge),
            Err(GameError::UpgradeMaxed(UpgradeId::TemperedEdge))
        );
        assert_eq!(s.upgrade_level(UpgradeId::TemperedEdge), 5);
    }

    #[test]
    fn decimal_overflow_falls_back_to_float() {
        let huge = growth_cost(40_000_000_000, 115, 600);
        assert!(huge.is_finite());
        assert!(huge > growth_cost(40_000_000_000, 115, 599));
    }

    proptest! {
        #[test]
        fn helper_cost_strictly_increasing(owned in 0u32..1_000) {
            let catalog = Catalog::standard();
            for id in HelperId::all() {
                let def = catalog.helper(id).unwrap();
                prop_assert!(purchase_cost(def, owned) < purchase_cost(def, owned + 1));
            }
        }

        #[test]
        fn currency_never_negative(start in 0.0f64..5_000.0,
                                   ops in proptest::collection::vec(0u8..4, 0..60)) {
            let catalog = Catalog::standard();
            let mut s = GameState::new();
            s.currency = start;
            let roster = catalog.helpers_on(PlanetId::Earth);
            for op in ops {
                let kind = roster[usize::from(op) % roster.len()].id;
                let _ = apply_purchase(&mut s, &catalog, kind);
                if op == 3 {
                    let _ = buy_upgrade(&mut s, &catalog, UpgradeId::ReinforcedGrip);
                    let _ = buy_tool(&mut s, &catalog, ToolId::Iron);
                }
                prop_assert!(s.currency >= 0.0);
            }
        }
    }
}
