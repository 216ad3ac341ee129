//! Typed configuration surface (§6). Unknown keys are rejected rather than
//! silently ignored — mirrors the "ad-hoc mapping becomes a tagged record"
//! guidance in the design notes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const RECOGNIZED_KEYS: &[&str] = &[
    "max_parallel_agents",
    "max_iterations",
    "refinement_threshold",
    "enable_auto_refinement",
    "use_specialized_agents",
    "retrieval_k",
    "llm_temperature",
    "token_budget",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    #[serde(default = "defaults::max_parallel_agents")]
    pub max_parallel_agents: usize,
    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "defaults::refinement_threshold")]
    pub refinement_threshold: f32,
    #[serde(default = "defaults::enable_auto_refinement")]
    pub enable_auto_refinement: bool,
    #[serde(default = "defaults::use_specialized_agents")]
    pub use_specialized_agents: bool,
    #[serde(default = "defaults::retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default = "defaults::llm_temperature")]
    pub llm_temperature: f32,
    /// Ambient addition (§9 open question): bounds total LLM token spend per
    /// document across all refinement iterations, in addition to the
    /// iteration-count cap.
    #[serde(default = "defaults::token_budget")]
    pub token_budget: u64,
}

mod defaults {
    pub fn max_parallel_agents() -> usize {
        4
    }
    pub fn max_iterations() -> u32 {
        2
    }
    pub fn refinement_threshold() -> f32 {
        75.0
    }
    pub fn enable_auto_refinement() -> bool {
        true
    }
    pub fn use_specialized_agents() -> bool {
        true
    }
    pub fn retrieval_k() -> usize {
        5
    }
    pub fn llm_temperature() -> f32 {
        0.2
    }
    pub fn token_budget() -> u64 {
        200_000
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_parallel_agents: defaults::max_parallel_agents(),
            max_iterations: defaults::max_iterations(),
            refinement_threshold: defaults::refinement_threshold(),
            enable_auto_refinement: defaults::enable_auto_refinement(),
            use_specialized_agents: defaults::use_specialized_agents(),
            retrieval_k: defaults::retrieval_k(),
            llm_temperature: defaults::llm_temperature(),
            token_budget: defaults::token_budget(),
        }
    }
}

impl GenerationConfig {
    /// Parses a raw `key -> value` map (as an external caller would send it),
    /// rejecting unrecognized keys instead of ignoring them.
    pub fn from_raw_map(
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        for key in raw.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                return Err(ConfigError::UnrecognizedKey(key.clone()));
            }
        }
        let value = serde_json::Value::Object(raw.clone());
        serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel_agents == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_parallel_agents".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.refinement_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "refinement_threshold".to_string(),
                reason: "must be within [0, 100]".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::InvalidValue {
                key: "llm_temperature".to_string(),
                reason: "must be within [0, 2]".to_string(),
            });
        }
        if self.retrieval_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval_k".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_spec() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.max_parallel_agents, 4);
        assert_eq!(cfg.max_iterations, 2);
        assert_eq!(cfg.refinement_threshold, 75.0);
        assert!(cfg.enable_auto_refinement);
        assert!(cfg.use_specialized_agents);
        assert_eq!(cfg.retrieval_k, 5);
        assert_eq!(cfg.llm_temperature, 0.2);
    }

    #[test]
    fn unrecognized_key_is_rejected() {
        let mut raw = serde_json::Map::new();
        raw.insert("bogus_option".to_string(), json!(true));
        let err = GenerationConfig::from_raw_map(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::UnrecognizedKey(k) if k == "bogus_option"));
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let mut raw = serde_json::Map::new();
        raw.insert("max_parallel_agents".to_string(), json!(8));
        let cfg = GenerationConfig::from_raw_map(&raw).unwrap();
        assert_eq!(cfg.max_parallel_agents, 8);
        assert_eq!(cfg.retrieval_k, 5);
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let cfg = GenerationConfig {
            max_parallel_agents: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
