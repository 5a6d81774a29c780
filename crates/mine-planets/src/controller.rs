//! Per-session planet bookkeeping: pending placements, activation timers
//! and the planet switch guard.

use mine_core::{Catalog, GameError, GameState, HelperId, PlacedHelper, PlanetId};
use mine_econ::{self as econ, Purchase};
use tracing::{debug, info};

use crate::gate;
use crate::placement::PlacementRules;

/// Result of a switch request that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched,
    AlreadyActive,
    /// A transition is still in flight; the request was dropped.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Activation {
    helper_id: u64,
    remaining_secs: f64,
}

/// Transient planet state that is not persisted: helpers bought but not yet
/// placed, queued helpers waiting to produce and the in-flight transition.
#[derive(Clone, Debug)]
pub struct PlanetController {
    rules: PlacementRules,
    activation_delay_secs: f64,
    transition_secs: f64,
    transition_remaining: Option<f64>,
    pending: Vec<HelperId>,
    activations: Vec<Activation>,
    next_id: u64,
}

impl PlanetController {
    pub fn new(rules: PlacementRules, activation_delay_secs: f64, transition_secs: f64) -> Self {
        Self {
            rules,
            activation_delay_secs: activation_delay_secs.max(0.0),
            transition_secs: transition_secs.max(0.0),
            transition_remaining: None,
            pending: Vec::new(),
            activations: Vec::new(),
            next_id: 1,
        }
    }

    pub fn rules(&self) -> &PlacementRules {
        &self.rules
    }

    /// Rebind to a freshly loaded or reset state: forget transient work and
    /// requeue every helper that was saved before it started producing.
    pub fn attach(&mut self, state: &GameState) {
        self.transition_remaining = None;
        self.pending.clear();
        self.next_id = state.max_placed_id().map_or(1, |m| m + 1);
        self.activations = state
            .planets
            .values()
            .flat_map(|p| p.placed_helpers.iter())
            .filter(|h| !h.is_producing)
            .map(|h| Activation {
                helper_id: h.id,
                remaining_secs: self.activation_delay_secs,
            })
            .collect();
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition_remaining.is_some()
    }

    /// Helpers bought and not yet placed, oldest first.
    pub fn pending(&self) -> &[HelperId] {
        &self.pending
    }

    /// Buy one helper on the active planet and queue it for placement.
    pub fn purchase(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        kind: HelperId,
    ) -> Result<Purchase, GameError> {
        let purchase = econ::apply_purchase(state, catalog, kind)?;
        self.pending.push(kind);
        Ok(purchase)
    }

    /// Commit an unplaced unit of `kind` to `(x, y)` on the active planet.
    ///
    /// Returns the new helper id. A refused position leaves ownership and
    /// placement untouched; the caller retries elsewhere.
    pub fn place_helper(
        &mut self,
        state: &mut GameState,
        kind: HelperId,
        x: f64,
        y: f64,
    ) -> Result<u64, GameError> {
        if kind.planet() != state.active_planet {
            return Err(GameError::WrongPlanet {
                helper: kind,
                active: state.active_planet,
            });
        }
        let planet = state.active_mut();
        if planet.owned_count(kind) <= planet.placed_count(kind) {
            return Err(GameError::InvalidPlacement {
                x,
                y,
                reason: format!("no unplaced {kind}"),
            });
        }
        if let Err(rejection) = self.rules.check(&planet.placed_helpers, x, y) {
            debug!(helper = %kind, x, y, %rejection, "placement refused");
            return Err(GameError::InvalidPlacement {
                x,
                y,
                reason: rejection.to_string(),
            });
        }
        let id = self.commit(&mut planet.placed_helpers, kind, x, y);
        if let Some(idx) = self.pending.iter().rposition(|k| *k == kind) {
            self.pending.remove(idx);
        }
        Ok(id)
    }

    /// Place every pending helper at the automatic grid. Returns the new ids.
    pub fn place_pending_at_fallback(&mut self, state: &mut GameState) -> Vec<u64> {
        let mut ids = Vec::with_capacity(self.pending.len());
        for kind in std::mem::take(&mut self.pending) {
            let placed = &mut state.planet_mut(kind.planet()).placed_helpers;
            let (x, y) = self.rules.fallback_position(placed);
            ids.push(self.commit(placed, kind, x, y));
        }
        ids
    }

    fn commit(&mut self, placed: &mut Vec<PlacedHelper>, kind: HelperId, x: f64, y: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        placed.push(PlacedHelper {
            kind,
            x,
            y,
            id,
            is_producing: false,
        });
        self.activations.push(Activation {
            helper_id: id,
            remaining_secs: self.activation_delay_secs,
        });
        debug!(helper = %kind, id, x, y, "helper placed");
        id
    }

    /// Refund and remove every pending helper, newest first. Returns the total
    /// refunded; a second call in a row refunds nothing.
    pub fn cancel_pending_placement(&mut self, state: &mut GameState, catalog: &Catalog) -> f64 {
        let mut refunded = 0.0;
        while let Some(kind) = self.pending.pop() {
            if let Some(amount) = econ::refund_last(state, catalog, kind) {
                refunded += amount;
            }
        }
        refunded
    }

    /// Make `to` the active planet.
    ///
    /// Dropped while a transition is in flight. Fails with `PlanetLocked`
    /// without mutating anything when the gate denies. Pending helpers of the
    /// outgoing planet are placed automatically before leaving.
    pub fn switch_to(
        &mut self,
        state: &mut GameState,
        to: PlanetId,
    ) -> Result<SwitchOutcome, GameError> {
        if self.is_transitioning() {
            debug!(planet = %to, "switch ignored, transition in flight");
            return Ok(SwitchOutcome::Ignored);
        }
        if state.active_planet == to {
            return Ok(SwitchOutcome::AlreadyActive);
        }
        gate::check_travel(state, to)?;

        self.place_pending_at_fallback(state);
        let from = state.active_planet;
        state.active_planet = to;
        // Materialize the slot if this planet was never visited.
        state.planet_mut(to);
        econ::recompute_production(state);
        if self.transition_secs > 0.0 {
            self.transition_remaining = Some(self.transition_secs);
        }
        info!(%from, %to, rate = state.total_production_rate, "planet switched");
        Ok(SwitchOutcome::Switched)
    }

    /// End the transition early, e.g. when the host animation completes.
    pub fn finish_transition(&mut self) {
        self.transition_remaining = None;
    }

    /// Advance timers by `elapsed_secs`. Returns ids of helpers that started
    /// producing during this step.
    pub fn tick(&mut self, state: &mut GameState, elapsed_secs: f64) -> Vec<u64> {
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return Vec::new();
        }
        if let Some(left) = self.transition_remaining {
            let left = left - elapsed_secs;
            self.transition_remaining = (left > 0.0).then_some(left);
        }
        let mut ready = Vec::new();
        self.activations.retain_mut(|a| {
            a.remaining_secs -= elapsed_secs;
            if a.remaining_secs <= 0.0 {
                ready.push(a.helper_id);
                false
            } else {
                true
            }
        });
        for helper in state
            .planets
            .values_mut()
            .flat_map(|p| p.placed_helpers.iter_mut())
            .filter(|h| ready.contains(&h.id))
        {
            helper.is_producing = true;
        }
        ready
    }
}

/// Outcome of [`reconcile`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Owned helpers that had no placement and were auto-placed.
    pub placed: usize,
    /// Placements without a matching owned unit that were removed.
    pub trimmed: usize,
}

/// Bring every planet to `placed == owned` per helper type.
///
/// Placements in excess of ownership are dropped, highest id first. Owned
/// units without a placement are placed on the automatic grid, already
/// producing.
pub fn reconcile(state: &mut GameState, rules: &PlacementRules) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut next_id = state.max_placed_id().map_or(1, |m| m + 1);
    for (planet_id, planet) in state.planets.iter_mut() {
        let before = report;
        let mut kinds: Vec<HelperId> = planet.placed_helpers.iter().map(|h| h.kind).collect();
        kinds.sort();
        kinds.dedup();
        for kind in kinds {
            let owned = planet.owned_count(kind);
            while planet.placed_count(kind) > owned {
                let idx = planet
                    .placed_helpers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| h.kind == kind)
                    .max_by_key(|(_, h)| h.id)
                    .map(|(i, _)| i);
                let Some(idx) = idx else { break };
                planet.placed_helpers.remove(idx);
                report.trimmed += 1;
            }
        }
        for (kind, surplus) in planet.unplaced_surplus() {
            for _ in 0..surplus {
                let (x, y) = rules.fallback_position(&planet.placed_helpers);
                planet.placed_helpers.push(PlacedHelper {
                    kind,
                    x,
                    y,
                    id: next_id,
                    is_producing: true,
                });
                next_id += 1;
                report.placed += 1;
            }
        }
        if report != before {
            debug!(
                planet = %planet_id,
                placed = report.placed - before.placed,
                trimmed = report.trimmed - before.trimmed,
                "placements reconciled"
            );
        }
    }
    report
}
