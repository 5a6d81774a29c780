//! Fixed-interval timers driven by explicitly passed elapsed time.

use tracing::debug;

/// Accumulates elapsed seconds and reports how many whole periods passed.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedInterval {
    period: f64,
    accumulated: f64,
    max_per_step: u32,
}

/// Periods completed by one [`FixedInterval::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fired {
    pub due: u32,
    /// Periods beyond the per-step cap; discarded.
    pub dropped: u32,
}

impl FixedInterval {
    pub fn new(period: f64, max_per_step: u32) -> Self {
        Self {
            period: if period.is_finite() && period > 0.0 {
                period
            } else {
                1.0
            },
            accumulated: 0.0,
            max_per_step: max_per_step.max(1),
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Fraction of the current period already elapsed.
    pub fn progress(&self) -> f64 {
        self.accumulated / self.period
    }

    pub fn advance(&mut self, elapsed_secs: f64) -> Fired {
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return Fired::default();
        }
        self.accumulated += elapsed_secs;
        let whole = (self.accumulated / self.period).floor();
        if whole < 1.0 {
            return Fired::default();
        }
        self.accumulated -= whole * self.period;
        let whole = whole.min(f64::from(u32::MAX)) as u32;
        let due = whole.min(self.max_per_step);
        Fired {
            due,
            dropped: whole - due,
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

/// Accrual ticks and autosave on independent intervals.
///
/// Stepping needs `&mut self`, so two ticks can never run at once.
#[derive(Clone, Debug)]
pub struct Scheduler {
    accrual: FixedInterval,
    autosave: FixedInterval,
}

/// What the host should run for one `advance` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub accrual_ticks: u32,
    pub dropped_ticks: u32,
    pub autosave_due: bool,
}

impl Scheduler {
    pub fn new(tick_interval_secs: f64, autosave_interval_secs: f64, max_catch_up_ticks: u32) -> Self {
        Self {
            accrual: FixedInterval::new(tick_interval_secs, max_catch_up_ticks),
            // Several missed autosaves collapse into one.
            autosave: FixedInterval::new(autosave_interval_secs, 1),
        }
    }

    pub fn tick_period(&self) -> f64 {
        self.accrual.period()
    }

    /// Feed `elapsed_secs` to both intervals.
    pub fn step(&mut self, elapsed_secs: f64) -> Schedule {
        let accrual = self.accrual.advance(elapsed_secs);
        let autosave = self.autosave.advance(elapsed_secs);
        if accrual.dropped > 0 {
            debug!(dropped = accrual.dropped, "catch-up ticks capped");
        }
        Schedule {
            accrual_ticks: accrual.due,
            dropped_ticks: accrual.dropped,
            autosave_due: autosave.due > 0,
        }
    }

    pub fn reset(&mut self) {
        self.accrual.reset();
        self.autosave.reset();
    }
}
