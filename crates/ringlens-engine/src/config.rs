//! Analysis configuration.

use serde::{Deserialize, Serialize};

use ringlens_core::{EngineError, EngineResult};

/// Tunable bounds for one analysis run.
///
/// The defaults reproduce the reference behavior; every field only tightens
/// or widens a documented resource bound, never changes detector semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on enumerated cycles across the whole run.
    pub max_cycles: usize,
    /// Account cap for the network-influence computation; larger batches are
    /// restricted to the most active accounts.
    pub centrality_sample_size: usize,
    /// Toggles the money-laundering chain detector (costly, off by default).
    pub enable_deep_chain_analysis: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_cycles: 1000,
            centrality_sample_size: 500,
            enable_deep_chain_analysis: false,
        }
    }
}

impl AnalysisConfig {
    /// Validates the configuration before a run.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_cycles == 0 {
            return Err(EngineError::internal("max_cycles must be at least 1"));
        }
        if self.centrality_sample_size == 0 {
            return Err(EngineError::internal(
                "centrality_sample_size must be at least 1",
            ));
        }
        Ok(())
    }

    /// Number of detectors executed under this configuration.
    pub fn patterns_analyzed(&self) -> usize {
        if self.enable_deep_chain_analysis {
            23
        } else {
            22
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_cycles, 1000);
        assert_eq!(config.centrality_sample_size, 500);
        assert!(!config.enable_deep_chain_analysis);
        assert!(config.validate().is_ok());
        assert_eq!(config.patterns_analyzed(), 22);
    }

    #[test]
    fn test_zero_bounds_rejected() {
        let config = AnalysisConfig {
            max_cycles: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deep_chains_add_a_pattern() {
        let config = AnalysisConfig {
            enable_deep_chain_analysis: true,
            ..Default::default()
        };
        assert_eq!(config.patterns_analyzed(), 23);
    }

    #[test]
    fn test_yaml_roundtrip_uses_defaults_for_missing_fields() {
        let config: AnalysisConfig = serde_json::from_str("{\"max_cycles\": 50}").unwrap();
        assert_eq!(config.max_cycles, 50);
        assert_eq!(config.centrality_sample_size, 500);
    }
}
