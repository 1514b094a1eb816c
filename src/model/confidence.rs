//! Categorical confidence for one evaluation.
//!
//! Rules are evaluated top-down and the first match wins. A missing spread
//! caps the result at Medium even when everything else looks clean.

use super::settings::ModelConfig;
use super::types::{Confidence, FactorResult};

/// Widest allowed gap between the most and least home-favoring factor.
const MAX_FACTOR_SPREAD: f64 = 0.20;
const LOW_BEFORE_MINUTES: f64 = 12.0;
const MEDIUM_BEFORE_MINUTES: f64 = 24.0;

pub fn estimate(
    factors: &[FactorResult],
    data_age_sec: f64,
    minutes_played: f64,
    spread_available: bool,
    config: &ModelConfig,
) -> Confidence {
    let advantages: Vec<f64> = factors.iter().filter_map(|f| f.advantage).collect();
    if advantages.is_empty() {
        return Confidence::Low;
    }

    if data_age_sec >= config.stale_critical_sec {
        return Confidence::Low;
    }
    let max = advantages.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = advantages.iter().cloned().fold(f64::INFINITY, f64::min);
    if max - min > MAX_FACTOR_SPREAD {
        return Confidence::Low;
    }
    if minutes_played < LOW_BEFORE_MINUTES {
        return Confidence::Low;
    }

    let ceiling = if spread_available {
        Confidence::High
    } else {
        Confidence::Medium
    };

    let same_sign = advantages.iter().all(|a| *a >= 0.0) || advantages.iter().all(|a| *a <= 0.0);
    if !same_sign
        || data_age_sec >= config.stale_warning_sec
        || minutes_played < MEDIUM_BEFORE_MINUTES
    {
        return Confidence::Medium;
    }

    ceiling
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::FactorName;

    fn factors(advantages: &[f64]) -> Vec<FactorResult> {
        let names = [
            FactorName::Lead,
            FactorName::Spread,
            FactorName::Efficiency,
            FactorName::PossessionEdge,
        ];
        advantages
            .iter()
            .zip(names)
            .map(|(a, n)| FactorResult::active(n, *a))
            .collect()
    }

    #[test]
    fn test_high_confidence() {
        let cfg = ModelConfig::default();
        let c = estimate(&factors(&[0.20, 0.25, 0.15]), 30.0, 30.0, true, &cfg);
        assert_eq!(c, Confidence::High);
    }

    #[test]
    fn test_medium_mixed_signs() {
        let cfg = ModelConfig::default();
        let c = estimate(&factors(&[0.05, -0.05, 0.02]), 30.0, 30.0, true, &cfg);
        assert_eq!(c, Confidence::Medium);
    }

    #[test]
    fn test_missing_spread_caps_at_medium() {
        let cfg = ModelConfig::default();
        let c = estimate(&factors(&[0.20, 0.25]), 30.0, 30.0, false, &cfg);
        assert_eq!(c, Confidence::Medium);
    }

    #[test]
    fn test_stale_data_is_low() {
        let cfg = ModelConfig::default();
        let c = estimate(&factors(&[0.20, 0.25, 0.15]), 400.0, 40.0, true, &cfg);
        assert_eq!(c, Confidence::Low);
        let c = estimate(&factors(&[0.20, 0.25, 0.15]), 300.0, 40.0, true, &cfg);
        assert_eq!(c, Confidence::Low);
    }

    #[test]
    fn test_ageing_data_is_medium() {
        let cfg = ModelConfig::default();
        let c = estimate(&factors(&[0.20, 0.25, 0.15]), 150.0, 40.0, true, &cfg);
        assert_eq!(c, Confidence::Medium);
    }

    #[test]
    fn test_factor_disagreement_is_low() {
        let cfg = ModelConfig::default();
        let c = estimate(&factors(&[0.40, 0.10, 0.15]), 10.0, 40.0, true, &cfg);
        assert_eq!(c, Confidence::Low);
    }

    #[test]
    fn test_early_game() {
        let cfg = ModelConfig::default();
        let f = factors(&[0.20, 0.25, 0.15]);
        assert_eq!(estimate(&f, 10.0, 8.0, true, &cfg), Confidence::Low);
        assert_eq!(estimate(&f, 10.0, 18.0, true, &cfg), Confidence::Medium);
        assert_eq!(estimate(&f, 10.0, 24.0, true, &cfg), Confidence::High);
    }

    #[test]
    fn test_no_active_factors_is_low() {
        let cfg = ModelConfig::default();
        let f = vec![FactorResult::inactive(FactorName::Spread)];
        assert_eq!(estimate(&f, 0.0, 40.0, false, &cfg), Confidence::Low);
    }
}
