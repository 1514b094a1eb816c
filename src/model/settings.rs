//! Tunable model parameters.
//!
//! Every knob lives on one immutable [`ModelConfig`] value that is built once
//! at startup: defaults first, then a JSON override file merged field by
//! field. The value is threaded by reference through every evaluation and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("{field} must be {expected}, got {value}")]
    InvalidSetting {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
    #[error("lead_weight_min ({min}) must not exceed lead_weight_max ({max})")]
    LeadWeightBounds { min: f64, max: f64 },
    #[error("stale_warning_sec ({warning}) must not exceed stale_critical_sec ({critical})")]
    StaleThresholds { warning: f64, critical: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    // ── Factor scaling ───────────────────────────────────────────────────────
    /// Points subtracted from the home lead before scoring it
    pub home_court_adjustment: f64,
    pub lead_scale: f64,
    pub spread_scale: f64,
    pub efficiency_scale: f64,
    pub possession_edge_scale: f64,
    /// Steepness of the final logistic curve
    pub sigmoid_k: f64,

    // ── Weights ──────────────────────────────────────────────────────────────
    /// Lead weight at tip-off
    pub lead_weight_min: f64,
    /// Lead weight at the end of regulation
    pub lead_weight_max: f64,
    pub spread_base_weight: f64,
    pub efficiency_weight_full: f64,
    pub efficiency_weight_gated: f64,
    pub possession_edge_weight_full: f64,
    pub possession_edge_weight_gated: f64,

    // ── Gating ───────────────────────────────────────────────────────────────
    pub efficiency_gate_minutes: f64,
    pub efficiency_gate_poss: f64,
    pub possession_edge_gate_minutes: f64,
    pub possession_edge_gate_poss: f64,
    /// Possession edge needs successive polls, so it is off for one-shot runs
    pub possession_edge_enabled: bool,

    // ── Trailing edge ────────────────────────────────────────────────────────
    pub trailing_edge_min_margin: f64,
    pub trailing_edge_factor_threshold: f64,

    // ── Underdog watch ───────────────────────────────────────────────────────
    pub upset_min_minutes: f64,
    pub upset_win_prob_threshold: f64,
    pub upset_flip_buffer_threshold: f64,
    pub upset_flip_swing_threshold: f64,

    // ── Garbage time / overtime ──────────────────────────────────────────────
    /// Raw (unadjusted) lead that counts as a blowout
    pub blowout_lead_threshold: f64,
    pub blowout_minutes_threshold: f64,
    /// Multiplier (< 1) compressing the combined score in overtime
    pub ot_dampen_factor: f64,

    // ── Data freshness ───────────────────────────────────────────────────────
    pub stale_warning_sec: f64,
    pub stale_critical_sec: f64,

    // ── League averages ──────────────────────────────────────────────────────
    pub league_avg_efg: f64,
    pub league_avg_tov_rate: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            home_court_adjustment: 2.5,
            lead_scale: 0.15,
            spread_scale: 0.08,
            efficiency_scale: 5.0,
            possession_edge_scale: 4.0,
            sigmoid_k: 2.5,

            lead_weight_min: 0.20,
            lead_weight_max: 0.35,
            spread_base_weight: 0.40,
            efficiency_weight_full: 0.25,
            efficiency_weight_gated: 0.10,
            possession_edge_weight_full: 0.12,
            possession_edge_weight_gated: 0.05,

            efficiency_gate_minutes: 18.0,
            efficiency_gate_poss: 30.0,
            possession_edge_gate_minutes: 24.0,
            possession_edge_gate_poss: 40.0,
            possession_edge_enabled: false,

            trailing_edge_min_margin: 3.0,
            trailing_edge_factor_threshold: 0.15,

            upset_min_minutes: 12.0,
            upset_win_prob_threshold: 0.40,
            upset_flip_buffer_threshold: 0.08,
            upset_flip_swing_threshold: 4.0,

            blowout_lead_threshold: 20.0,
            blowout_minutes_threshold: 5.0,
            ot_dampen_factor: 0.8,

            stale_warning_sec: 120.0,
            stale_critical_sec: 300.0,

            league_avg_efg: 0.52,
            league_avg_tov_rate: 0.13,
        }
    }
}

impl ModelConfig {
    /// Load defaults merged with the JSON override file at `path`.
    ///
    /// A missing file is normal. An unreadable or malformed file is logged and
    /// ignored so a bad edit never stops a live session.
    pub fn load(path: &Path) -> ModelConfig {
        if !path.exists() {
            debug!("No model override file at {}, using defaults", path.display());
            return ModelConfig::default();
        }
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| Self::from_json(&text).map_err(|e| e.to_string()));
        match loaded {
            Ok(config) => {
                info!("Loaded model overrides from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Could not load model overrides from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                ModelConfig::default()
            }
        }
    }

    /// Parse an override document. Keys that are absent keep their defaults;
    /// unknown keys are ignored.
    pub fn from_json(text: &str) -> serde_json::Result<ModelConfig> {
        serde_json::from_str(text)
    }

    pub fn with_possession_edge(mut self, enabled: bool) -> Self {
        self.possession_edge_enabled = enabled;
        self
    }

    /// First 8 hex chars of the SHA-256 of the canonical (key-sorted) JSON.
    pub fn hash(&self) -> String {
        // serde_json::Value objects are BTreeMap-backed, so keys serialize sorted.
        let canonical = serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..8].to_string()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = [
            ("lead_scale", self.lead_scale),
            ("spread_scale", self.spread_scale),
            ("efficiency_scale", self.efficiency_scale),
            ("possession_edge_scale", self.possession_edge_scale),
            ("sigmoid_k", self.sigmoid_k),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ModelError::InvalidSetting {
                    field,
                    expected: "a positive finite number",
                    value,
                });
            }
        }

        let non_negative = [
            ("home_court_adjustment", self.home_court_adjustment),
            ("lead_weight_min", self.lead_weight_min),
            ("lead_weight_max", self.lead_weight_max),
            ("spread_base_weight", self.spread_base_weight),
            ("efficiency_weight_full", self.efficiency_weight_full),
            ("efficiency_weight_gated", self.efficiency_weight_gated),
            ("possession_edge_weight_full", self.possession_edge_weight_full),
            ("possession_edge_weight_gated", self.possession_edge_weight_gated),
            ("efficiency_gate_minutes", self.efficiency_gate_minutes),
            ("efficiency_gate_poss", self.efficiency_gate_poss),
            ("possession_edge_gate_minutes", self.possession_edge_gate_minutes),
            ("possession_edge_gate_poss", self.possession_edge_gate_poss),
            ("trailing_edge_min_margin", self.trailing_edge_min_margin),
            ("trailing_edge_factor_threshold", self.trailing_edge_factor_threshold),
            ("upset_min_minutes", self.upset_min_minutes),
            ("upset_flip_buffer_threshold", self.upset_flip_buffer_threshold),
            ("upset_flip_swing_threshold", self.upset_flip_swing_threshold),
            ("blowout_lead_threshold", self.blowout_lead_threshold),
            ("blowout_minutes_threshold", self.blowout_minutes_threshold),
            ("stale_warning_sec", self.stale_warning_sec),
            ("stale_critical_sec", self.stale_critical_sec),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ModelError::InvalidSetting {
                    field,
                    expected: "a non-negative finite number",
                    value,
                });
            }
        }

        let unit_interval = [
            ("upset_win_prob_threshold", self.upset_win_prob_threshold),
            ("league_avg_efg", self.league_avg_efg),
            ("league_avg_tov_rate", self.league_avg_tov_rate),
        ];
        for (field, value) in unit_interval {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidSetting {
                    field,
                    expected: "between 0.0 and 1.0",
                    value,
                });
            }
        }

        if !(self.ot_dampen_factor > 0.0 && self.ot_dampen_factor <= 1.0) {
            return Err(ModelError::InvalidSetting {
                field: "ot_dampen_factor",
                expected: "in (0.0, 1.0]",
                value: self.ot_dampen_factor,
            });
        }
        if self.lead_weight_min > self.lead_weight_max {
            return Err(ModelError::LeadWeightBounds {
                min: self.lead_weight_min,
                max: self.lead_weight_max,
            });
        }
        if self.stale_warning_sec > self.stale_critical_sec {
            return Err(ModelError::StaleThresholds {
                warning: self.stale_warning_sec,
                critical: self.stale_critical_sec,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("courtside_settings_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(ModelConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let cfg = ModelConfig::from_json(r#"{"sigmoid_k": 3.0, "blowout_lead_threshold": 25}"#)
            .unwrap();
        assert_eq!(cfg.sigmoid_k, 3.0);
        assert_eq!(cfg.blowout_lead_threshold, 25.0);
        assert_eq!(cfg.lead_scale, 0.15);
        assert_eq!(cfg.spread_base_weight, 0.40);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let cfg = ModelConfig::from_json(r#"{"poll_interval_sec": 15}"#).unwrap();
        assert_eq!(cfg, ModelConfig::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cfg = ModelConfig::load(&temp_path("does_not_exist.json"));
        assert_eq!(cfg, ModelConfig::default());
    }

    #[test]
    fn test_load_malformed_file_uses_defaults() {
        let path = temp_path("malformed.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cfg = ModelConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg, ModelConfig::default());
    }

    #[test]
    fn test_load_override_file() {
        let path = temp_path("override.json");
        std::fs::write(&path, r#"{"ot_dampen_factor": 0.7}"#).unwrap();
        let cfg = ModelConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.ot_dampen_factor, 0.7);
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let a = ModelConfig::default();
        assert_eq!(a.hash().len(), 8);
        assert_eq!(a.hash(), ModelConfig::default().hash());
        let b = ModelConfig {
            sigmoid_k: 2.6,
            ..ModelConfig::default()
        };
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), a.clone().with_possession_edge(true).hash());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = ModelConfig {
            sigmoid_k: 0.0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ModelError::InvalidSetting { field: "sigmoid_k", .. })
        ));

        let cfg = ModelConfig {
            ot_dampen_factor: 1.5,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ModelConfig {
            lead_weight_min: 0.5,
            lead_weight_max: 0.3,
            ..ModelConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ModelError::LeadWeightBounds { .. })));

        let cfg = ModelConfig {
            stale_warning_sec: 400.0,
            ..ModelConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ModelError::StaleThresholds { .. })));
    }
}
