use std::{fs, path::Path, time::Duration};

use common::model::{game::UnitType, inventory::Inventory};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for one match. Every field has a default, so an empty JSON
/// object is a valid config file.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MatchConfig {
    /// Name announced in the handshake.
    pub name: String,
    pub rules: Rules,
    /// Own starting allocation. Ignored by the follower when inventories are negotiated.
    pub starting_inventory: Inventory,
    pub inventory_exchange: InventoryExchange,
    pub tie_policy: TiePolicy,
    pub strategy: StrategyConfig,
    /// Seeds the strategy RNG. Unset means OS entropy.
    pub seed: Option<u64>,
    /// Listener decorates both names: ours with `-as-server`, theirs with `-as-client`.
    pub tag_roles: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            name: default_name(),
            rules: Rules::default(),
            starting_inventory: Inventory::new([100, 100, 100]),
            inventory_exchange: InventoryExchange::Negotiated,
            tie_policy: TiePolicy::Failure,
            strategy: StrategyConfig::Random,
            seed: None,
            tag_roles: false,
        }
    }
}

fn default_name() -> String {
    format!("DarthV{}dor", rand::rng().random::<u32>())
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Rules {
    /// Exactly `rounds` rounds, inventories untouched.
    FixedCount {
        #[serde(default = "default_rounds")]
        rounds: u32,
    },
    /// Losers lose a unit; ends when a side is down to one unit type or
    /// after `draw_ceiling` consecutive draws.
    Depletion {
        #[serde(default = "default_draw_ceiling")]
        draw_ceiling: u32,
    },
}

fn default_rounds() -> u32 {
    100
}

fn default_draw_ceiling() -> u32 {
    20
}

impl Default for Rules {
    fn default() -> Self {
        Rules::FixedCount {
            rounds: default_rounds(),
        }
    }
}

impl Rules {
    pub fn is_depleting(&self) -> bool {
        matches!(self, Rules::Depletion { .. })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InventoryExchange {
    /// Both sides start from their configured triple.
    Static,
    /// The authoritative side announces its triple and the follower adopts it.
    Negotiated,
}

/// How an equal number of remaining units is scored in depletion mode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    Failure,
    Neutral,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Random,
    RoundRobin,
    Fixed { unit: UnitType },
    PeekAndCounter(PeekConfig),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PeekConfig {
    pub initial_timeout_ms: u64,
    pub timeout_increment_ms: u64,
    pub timeout_ceiling_ms: u64,
    /// Chance per round of peeking instead of a plain random pick.
    pub peek_probability: f64,
    /// Label sent instead of the unit name once the ceiling is reached.
    pub probe_marker: Option<String>,
}

impl Default for PeekConfig {
    fn default() -> Self {
        PeekConfig {
            initial_timeout_ms: 100,
            timeout_increment_ms: 100,
            timeout_ceiling_ms: 1100,
            peek_probability: 0.5,
            probe_marker: Some("Are you cheating?".to_owned()),
        }
    }
}

impl PeekConfig {
    pub fn initial_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_timeout_ms)
    }

    pub fn timeout_increment(&self) -> Duration {
        Duration::from_millis(self.timeout_increment_ms)
    }

    pub fn timeout_ceiling(&self) -> Duration {
        Duration::from_millis(self.timeout_ceiling_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl MatchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: MatchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };
        match self.rules {
            Rules::FixedCount { rounds: 0 } => return invalid("rounds must be positive"),
            Rules::Depletion { draw_ceiling: 0 } => {
                return invalid("draw_ceiling must be positive")
            }
            Rules::Depletion { .. } if self.starting_inventory.total() == 0 => {
                return invalid("starting_inventory must hold at least one unit")
            }
            _ => {}
        }
        if self.name.trim().is_empty() {
            return invalid("name must not be empty");
        }
        if let StrategyConfig::PeekAndCounter(peek) = &self.strategy {
            if !(0.0..=1.0).contains(&peek.peek_probability) {
                return invalid("peek_probability must be within [0, 1]");
            }
            if peek.timeout_ceiling_ms < peek.initial_timeout_ms {
                return invalid("timeout_ceiling_ms must not be below initial_timeout_ms");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: MatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.rules, Rules::FixedCount { rounds: 100 });
        assert_eq!(config.starting_inventory, Inventory::new([100, 100, 100]));
        assert_eq!(config.tie_policy, TiePolicy::Failure);
        assert_eq!(config.strategy, StrategyConfig::Random);
        assert!(config.name.starts_with("DarthV") && config.name.ends_with("dor"));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let config: MatchConfig = serde_json::from_str(
            r#"{
                "name": "Obi",
                "rules": {"mode": "depletion"},
                "starting_inventory": [10, 10, 10],
                "inventory_exchange": "static",
                "tie_policy": "neutral",
                "strategy": {"kind": "peek_and_counter", "peek_probability": 1.0, "probe_marker": null},
                "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(config.rules, Rules::Depletion { draw_ceiling: 20 });
        assert_eq!(config.inventory_exchange, InventoryExchange::Static);
        let StrategyConfig::PeekAndCounter(peek) = &config.strategy else {
            panic!("expected peek strategy, got {:?}", config.strategy);
        };
        assert_eq!(peek.initial_timeout(), Duration::from_millis(100));
        assert_eq!(peek.timeout_ceiling(), Duration::from_millis(1100));
        assert_eq!(peek.probe_marker, None);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_fixed_strategy_names_unit() {
        let strategy: StrategyConfig =
            serde_json::from_str(r#"{"kind": "fixed", "unit": "destroyer"}"#).unwrap();
        assert_eq!(
            strategy,
            StrategyConfig::Fixed {
                unit: UnitType::Destroyer
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_rounds = MatchConfig {
            rules: Rules::FixedCount { rounds: 0 },
            ..MatchConfig::default()
        };
        assert!(matches!(
            zero_rounds.validate(),
            Err(ConfigError::Invalid { .. })
        ));

        let empty_army = MatchConfig {
            rules: Rules::Depletion { draw_ceiling: 5 },
            starting_inventory: Inventory::default(),
            ..MatchConfig::default()
        };
        assert!(empty_army.validate().is_err());

        let bad_peek = MatchConfig {
            strategy: StrategyConfig::PeekAndCounter(PeekConfig {
                peek_probability: 1.5,
                ..PeekConfig::default()
            }),
            ..MatchConfig::default()
        };
        assert!(bad_peek.validate().is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = MatchConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
