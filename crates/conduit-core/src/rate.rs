//! Cadence gate and the one-shot boost override.

use crate::config::PipeConfig;
use crate::id::Ticks;
use serde::{Deserialize, Serialize};

/// Source of a one-shot boost. The engine only reads and consumes it;
/// granting is somebody else's business.
pub trait BoostSource {
    fn is_boost_available(&self) -> bool;

    /// Called once after a boosted tick commits a transfer.
    fn on_boost_used(&mut self);
}

/// A plain boost flag, set by [`grant`](BoostCharge::grant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostCharge {
    available: bool,
}

impl BoostCharge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self) {
        self.available = true;
    }
}

impl BoostSource for BoostCharge {
    fn is_boost_available(&self) -> bool {
        self.available
    }

    fn on_boost_used(&mut self) {
        self.available = false;
    }
}

/// Decision for one tick of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickGate {
    pub open: bool,
    /// Whether this tick runs at boosted capacity.
    pub boosted: bool,
    /// Upper bound on units pulled from the chosen source this tick.
    pub move_capacity: u32,
}

/// Enforces the periodic cadence and boosted capacity from a [`PipeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateController {
    period: Ticks,
    transfer_amount: u32,
    boosted_capacity: u32,
}

impl RateController {
    pub fn new(config: &PipeConfig) -> Self {
        Self {
            period: config.period.max(1),
            transfer_amount: config.transfer_amount,
            boosted_capacity: config.boosted_capacity,
        }
    }

    /// True on ticks that are a multiple of the period, and on every tick
    /// while a boost is available.
    pub fn should_run_this_tick(&self, tick: Ticks, boost_available: bool) -> bool {
        boost_available || tick % self.period == 0
    }

    pub fn move_capacity(&self, boosted: bool) -> u32 {
        if boosted {
            self.boosted_capacity
        } else {
            self.transfer_amount
        }
    }

    pub fn gate(&self, tick: Ticks, boost: &dyn BoostSource) -> TickGate {
        let boosted = boost.is_boost_available();
        TickGate {
            open: self.should_run_this_tick(tick, boosted),
            boosted,
            move_capacity: self.move_capacity(boosted),
        }
    }

    pub fn period(&self) -> Ticks {
        self.period
    }
}
