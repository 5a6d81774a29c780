//! The running game: one owner of [`GameState`] and the only place that
//! mutates it.

use mine_core::{
    Catalog, Clock, GameError, GameState, HelperId, PlanetId, Settings, ToolId, UpgradeId,
};
use mine_econ::{self as econ, Purchase, ToolPurchase};
use mine_planets::{self as planets, PlanetController, SwitchOutcome};
use persistence::{
    LoadOutcome, LoadSource, PendingImport, PersistError, PersistenceController, RemoteStore,
    SaveOutcome, SlotStore,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::achievements;
use crate::config::EngineConfig;
use crate::observer::{GameObserver, NullObserver, PurchaseTarget};
use crate::scheduler::Scheduler;

/// Random draws tried before a helper goes to the automatic grid.
const PLACEMENT_ATTEMPTS: usize = 24;

/// Result of one [`Session::advance`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub accrual_ticks: u32,
    pub dropped_ticks: u32,
    /// Helpers that started producing.
    pub activated: Vec<u64>,
    /// Autosave interval elapsed and autosave is enabled.
    pub autosave_due: bool,
    pub new_achievements: Vec<&'static str>,
}

/// How a [`Session::load`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadReport {
    Loaded { source: LoadSource, timestamp: i64 },
    /// No usable save anywhere; the session now holds a fresh game.
    FreshStart,
    Skipped,
}

pub struct Session {
    state: GameState,
    catalog: Arc<Catalog>,
    planets: PlanetController,
    scheduler: Scheduler,
    observer: Box<dyn GameObserver>,
    clock: Arc<dyn Clock>,
    rng: ChaCha8Rng,
    config: EngineConfig,
}

impl Session {
    /// A fresh game.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let mut session = Self {
            state: GameState::new(),
            planets: PlanetController::new(
                config.placement.clone(),
                config.activation_delay_secs,
                config.transition_secs,
            ),
            scheduler: Scheduler::new(
                config.tick_interval_secs,
                config.autosave_interval_secs,
                config.max_catch_up_ticks,
            ),
            observer: Box::new(NullObserver),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            catalog,
            clock,
            config,
        };
        session.state.statistics.session_start_epoch = session.clock.now_millis();
        session
    }

    pub fn with_observer(mut self, observer: Box<dyn GameObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Helpers bought on the active planet but not yet placed.
    pub fn pending(&self) -> &[HelperId] {
        self.planets.pending()
    }

    pub fn is_transitioning(&self) -> bool {
        self.planets.is_transitioning()
    }

    pub fn unlocked_planets(&self) -> Vec<PlanetId> {
        planets::unlocked_planets(&self.state)
    }

    pub fn next_helper_cost(&self, kind: HelperId) -> Result<f64, GameError> {
        econ::next_helper_cost(&self.state, &self.catalog, kind)
    }

    /// Replace the whole state, e.g. after a load or a confirmed import.
    pub fn install(&mut self, mut state: GameState) {
        planets::reconcile(&mut state, self.planets.rules());
        econ::recompute_production(&mut state);
        self.planets.attach(&state);
        self.scheduler.reset();
        self.state = state;
        self.changed();
    }

    fn changed(&mut self) -> Vec<&'static str> {
        let new = achievements::evaluate(&mut self.state);
        self.observer.on_state_changed(&self.state);
        new
    }

    fn purchase_result<T>(
        &mut self,
        target: PurchaseTarget,
        result: Result<T, GameError>,
    ) -> Result<T, GameError> {
        match &result {
            Ok(_) => {
                self.observer.on_purchase_result(target, true, None);
                self.changed();
            }
            Err(err) => {
                debug!(%target, reason = err.reason(), "purchase refused");
                self.observer.on_purchase_result(target, false, Some(err));
            }
        }
        result
    }

    pub fn click(&mut self) -> u64 {
        let gain = econ::click(&mut self.state, &self.catalog);
        self.changed();
        gain
    }

    /// Buy a helper of the active planet. It waits in [`Session::pending`]
    /// until placed.
    pub fn buy_helper(&mut self, kind: HelperId) -> Result<Purchase, GameError> {
        let result = self.planets.purchase(&mut self.state, &self.catalog, kind);
        self.purchase_result(PurchaseTarget::Helper(kind), result)
    }

    /// Place a pending helper at `(x, y)`. `InvalidPlacement` is an expected
    /// outcome; retry elsewhere.
    pub fn place_helper(&mut self, kind: HelperId, x: f64, y: f64) -> Result<u64, GameError> {
        let id = self.planets.place_helper(&mut self.state, kind, x, y)?;
        self.changed();
        Ok(id)
    }

    /// A random position for the next helper. May still be refused.
    pub fn suggest_position(&mut self) -> (f64, f64) {
        self.planets.rules().suggest_position(&mut self.rng)
    }

    /// Place a pending helper at a random free spot, or on the automatic
    /// grid when every draw collides.
    pub fn auto_place(&mut self, kind: HelperId) -> Result<u64, GameError> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let (x, y) = self.suggest_position();
            match self.place_helper(kind, x, y) {
                Err(GameError::InvalidPlacement { reason, .. })
                    if self.planets.pending().contains(&kind) =>
                {
                    debug!(helper = %kind, x, y, %reason, "retrying placement");
                }
                other => return other,
            }
        }
        let placed = self.state.active().map_or(&[][..], |p| &p.placed_helpers[..]);
        let (x, y) = self.planets.rules().fallback_position(placed);
        self.place_helper(kind, x, y)
    }

    /// Place every pending helper; returns the new ids.
    pub fn auto_place_pending(&mut self) -> Vec<u64> {
        let kinds = self.planets.pending().to_vec();
        let mut ids = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match self.auto_place(kind) {
                Ok(id) => ids.push(id),
                Err(err) => warn!(helper = %kind, %err, "could not place pending helper"),
            }
        }
        ids
    }

    /// Refund every pending helper. Calling it again refunds nothing.
    pub fn cancel_pending(&mut self) -> f64 {
        let refunded = self
            .planets
            .cancel_pending_placement(&mut self.state, &self.catalog);
        if refunded > 0.0 {
            debug!(refunded, "pending placements cancelled");
            self.changed();
        }
        refunded
    }

    pub fn switch_planet(&mut self, to: PlanetId) -> Result<SwitchOutcome, GameError> {
        let result = self.planets.switch_to(&mut self.state, to);
        match &result {
            Ok(SwitchOutcome::Switched) => {
                self.observer.on_planet_switch_result(to, true, None);
                self.changed();
            }
            Ok(SwitchOutcome::AlreadyActive) => {
                self.observer.on_planet_switch_result(to, true, None);
            }
            Ok(SwitchOutcome::Ignored) => {
                self.observer.on_planet_switch_result(to, false, None);
            }
            Err(err) => {
                debug!(planet = %to, reason = err.reason(), "switch refused");
                self.observer.on_planet_switch_result(to, false, Some(err));
            }
        }
        result
    }

    pub fn finish_transition(&mut self) {
        self.planets.finish_transition();
    }

    pub fn complete_moon_launch(&mut self) -> Result<(), GameError> {
        planets::complete_moon_launch(&mut self.state)?;
        info!("moon launch completed");
        self.changed();
        Ok(())
    }

    pub fn buy_tool(&mut self, tool: ToolId) -> Result<ToolPurchase, GameError> {
        let result = econ::buy_tool(&mut self.state, &self.catalog, tool);
        self.purchase_result(PurchaseTarget::Tool(tool), result)
    }

    pub fn equip_tool(&mut self, tool: ToolId) -> Result<(), GameError> {
        econ::equip_tool(&mut self.state, tool)?;
        self.changed();
        Ok(())
    }

    pub fn buy_upgrade(&mut self, id: UpgradeId) -> Result<f64, GameError> {
        let result = econ::buy_upgrade(&mut self.state, &self.catalog, id);
        self.purchase_result(PurchaseTarget::Upgrade(id), result)
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.state.settings = settings;
        self.changed();
    }

    /// Advance game time by `elapsed_secs`.
    ///
    /// Accrual runs once per full tick period, capped at
    /// `max_catch_up_ticks`; the excess is dropped.
    pub fn advance(&mut self, elapsed_secs: f64) -> TickReport {
        let schedule = self.scheduler.step(elapsed_secs);
        if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
            self.state.cumulative_play_time_seconds += elapsed_secs;
        }
        let activated = self.planets.tick(&mut self.state, elapsed_secs);
        let period = self.scheduler.tick_period();
        for _ in 0..schedule.accrual_ticks {
            econ::accrue(&mut self.state, period);
        }
        let new_achievements = if schedule.accrual_ticks > 0 || !activated.is_empty() {
            self.changed()
        } else {
            Vec::new()
        };
        TickReport {
            accrual_ticks: schedule.accrual_ticks,
            dropped_ticks: schedule.dropped_ticks,
            activated,
            autosave_due: schedule.autosave_due && self.state.settings.auto_save,
            new_achievements,
        }
    }

    /// Persist the current state. Overlapping saves are skipped by the
    /// controller.
    pub async fn save<L: SlotStore, R: RemoteStore>(
        &mut self,
        store: &PersistenceController<L, R>,
    ) -> Result<SaveOutcome, PersistError> {
        let result = store.save(&self.state).await;
        match &result {
            Ok(SaveOutcome::Saved { .. }) => self.observer.on_save_completed(true),
            Ok(SaveOutcome::Skipped) => {}
            Err(err) => {
                warn!(%err, "save failed, play continues");
                self.observer.on_save_completed(false);
            }
        }
        result
    }

    /// Load the newest usable save, or start fresh when there is none.
    ///
    /// On a storage error the current state is kept.
    pub async fn load<L: SlotStore, R: RemoteStore>(
        &mut self,
        store: &PersistenceController<L, R>,
    ) -> Result<LoadReport, PersistError> {
        match store.load_reconciled().await {
            Ok(LoadOutcome::Loaded {
                state,
                source,
                timestamp,
            }) => {
                self.install(state);
                self.observer.on_load_completed(true, Some(source));
                Ok(LoadReport::Loaded { source, timestamp })
            }
            Ok(LoadOutcome::NoUsableSave) => {
                info!("no usable save, starting fresh");
                self.start_fresh();
                self.observer.on_load_completed(false, None);
                Ok(LoadReport::FreshStart)
            }
            Ok(LoadOutcome::Skipped) => Ok(LoadReport::Skipped),
            Err(err) => {
                warn!(%err, "load failed, keeping current game");
                self.observer.on_load_completed(false, None);
                Err(err)
            }
        }
    }

    /// Validate an import; nothing changes until [`Session::apply_import`].
    pub fn prepare_import<L: SlotStore, R: RemoteStore>(
        &self,
        store: &PersistenceController<L, R>,
        text: &str,
    ) -> Result<PendingImport, PersistError> {
        store.prepare_import(text)
    }

    pub fn apply_import(&mut self, pending: PendingImport) {
        info!(timestamp = pending.timestamp(), "import applied");
        self.install(pending.confirm());
    }

    /// Wipe every save and start over. Also clears one-time flags.
    pub async fn reset<L: SlotStore, R: RemoteStore>(
        &mut self,
        store: &PersistenceController<L, R>,
    ) -> Result<(), PersistError> {
        store.reset().await?;
        self.start_fresh();
        Ok(())
    }

    fn start_fresh(&mut self) {
        let mut state = GameState::new();
        state.statistics.session_start_epoch = self.clock.now_millis();
        self.install(state);
    }
}
