//! Serde data file structs for pipe network configuration.
//!
//! A `pipes` data file holds one `default` config and any number of named
//! network overrides. Overrides only name the fields they change.

use conduit_core::config::PipeConfig;
use conduit_core::id::Ticks;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Top level of a `pipes.{ron,toml,json}` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipesData {
    #[serde(default)]
    pub default: PipeConfig,
    #[serde(default)]
    pub networks: BTreeMap<String, PipeOverrideData>,
}

/// A partial [`PipeConfig`]; unset fields fall back to the file's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PipeOverrideData {
    pub transfer_amount: Option<u32>,
    pub period: Option<Ticks>,
    pub boosted_capacity: Option<u32>,
    pub max_stack_size: Option<u32>,
}

impl PipeOverrideData {
    pub fn apply(&self, base: &PipeConfig) -> PipeConfig {
        PipeConfig {
            transfer_amount: self.transfer_amount.unwrap_or(base.transfer_amount),
            period: self.period.unwrap_or(base.period),
            boosted_capacity: self.boosted_capacity.unwrap_or(base.boosted_capacity),
            max_stack_size: self.max_stack_size.unwrap_or(base.max_stack_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_keeps_unset_fields() {
        let base = PipeConfig::default();
        let fast = PipeOverrideData {
            period: Some(2),
            ..PipeOverrideData::default()
        };
        let applied = fast.apply(&base);
        assert_eq!(applied.period, 2);
        assert_eq!(applied.transfer_amount, base.transfer_amount);
        assert_eq!(applied.max_stack_size, base.max_stack_size);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let data: PipesData = serde_json::from_str("{}").unwrap();
        assert_eq!(data.default, PipeConfig::default());
        assert!(data.networks.is_empty());
    }

    #[test]
    fn partial_default_in_toml() {
        let data: PipesData = toml::from_str(
            r#"
            [default]
            transfer_amount = 16

            [networks.ore]
            boosted_capacity = 128
            "#,
        )
        .unwrap();
        assert_eq!(data.default.transfer_amount, 16);
        assert_eq!(data.default.period, 10);
        assert_eq!(data.networks["ore"].boosted_capacity, Some(128));
        assert_eq!(data.networks["ore"].period, None);
    }
}
