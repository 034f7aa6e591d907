//! Per-network transfer constants.
//!
//! These are consumed, never owned, by the engine: a data file or the host
//! supplies them and [`PipeConfig::validate`] rejects values the tick logic
//! cannot honour.

use crate::id::Ticks;
use serde::{Deserialize, Serialize};

/// Errors rejecting a [`PipeConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("period must be at least one tick")]
    ZeroPeriod,
    #[error("transfer amount must be positive")]
    ZeroTransferAmount,
    #[error("max stack size must be positive")]
    ZeroStackSize,
    #[error("boosted capacity {boosted} is below the transfer amount {transfer}")]
    BoostBelowTransfer { boosted: u32, transfer: u32 },
}

/// Transfer constants for one network / resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Units pulled per eligible tick without boost.
    pub transfer_amount: u32,
    /// Ticks between eligible ticks.
    pub period: Ticks,
    /// Units pulled per tick while boosted.
    pub boosted_capacity: u32,
    /// Largest single discrete move; extraction accumulates stacks of at
    /// most this size.
    pub max_stack_size: u32,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            transfer_amount: 8,
            period: 10,
            boosted_capacity: 64,
            max_stack_size: 64,
        }
    }
}

impl PipeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.transfer_amount == 0 {
            return Err(ConfigError::ZeroTransferAmount);
        }
        if self.max_stack_size == 0 {
            return Err(ConfigError::ZeroStackSize);
        }
        if self.boosted_capacity < self.transfer_amount {
            return Err(ConfigError::BoostBelowTransfer {
                boosted: self.boosted_capacity,
                transfer: self.transfer_amount,
            });
        }
        Ok(())
    }
}
