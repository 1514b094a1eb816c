use tracing::debug;

use super::settings::ModelConfig;
use super::types::{FactorName, FactorResult, GameStatus};

const REGULATION_MINUTES: f64 = 48.0;

/// Lead weight grows linearly from `lead_weight_min` at tip-off to
/// `lead_weight_max` at the end of regulation.
pub fn lead_base_weight(minutes_played: f64, config: &ModelConfig) -> f64 {
    let game_progress = (minutes_played / REGULATION_MINUTES).min(1.0);
    config.lead_weight_min + (config.lead_weight_max - config.lead_weight_min) * game_progress
}

/// Assign every factor its pre-normalization weight.
///
/// Before tip-off only the spread can speak: lead, efficiency and possession
/// edge are dropped regardless of what the calculators produced.
pub fn apply_base_weights(
    factors: &mut [FactorResult],
    status: GameStatus,
    minutes_played: f64,
    config: &ModelConfig,
) {
    for factor in factors.iter_mut() {
        let live_only = !matches!(factor.name, FactorName::Spread);
        let dropped = match status {
            GameStatus::PreGame => live_only,
            GameStatus::InProgress
            | GameStatus::Halftime
            | GameStatus::BetweenQuarters
            | GameStatus::Final => false,
        };
        if dropped {
            factor.deactivate();
            continue;
        }
        if !factor.is_active() {
            factor.base_weight = 0.0;
            continue;
        }
        let gated = factor.gated.unwrap_or(false);
        factor.base_weight = match factor.name {
            FactorName::Lead => lead_base_weight(minutes_played, config),
            FactorName::Spread => config.spread_base_weight,
            FactorName::Efficiency if gated => config.efficiency_weight_gated,
            FactorName::Efficiency => config.efficiency_weight_full,
            FactorName::PossessionEdge if gated => config.possession_edge_weight_gated,
            FactorName::PossessionEdge => config.possession_edge_weight_full,
        };
    }
}

/// Rescale active weights so they sum to 1.
///
/// Returns the pre-normalization total, or `None` when nothing carries any
/// weight (no prediction is possible yet).
pub fn normalize(factors: &mut [FactorResult]) -> Option<f64> {
    let total: f64 = factors
        .iter()
        .filter(|f| f.is_active())
        .map(|f| f.base_weight)
        .sum();

    if total <= 0.0 {
        for factor in factors.iter_mut() {
            factor.weight = 0.0;
        }
        return None;
    }

    for factor in factors.iter_mut() {
        factor.weight = if factor.is_active() {
            factor.base_weight / total
        } else {
            0.0
        };
    }
    debug!(
        "normalized weights (total {:.4}): {}",
        total,
        factors
            .iter()
            .map(|f| format!("{}={:.3}", f.name.as_str(), f.weight))
            .collect::<Vec<_>>()
            .join(" ")
    );
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn live_factors() -> Vec<FactorResult> {
        vec![
            FactorResult::active(FactorName::Lead, 0.2).with_raw_value(5.0),
            FactorResult::active(FactorName::Spread, 0.27).with_raw_value(-3.5),
            FactorResult::active(FactorName::Efficiency, 0.1).with_gated(false),
            FactorResult::inactive(FactorName::PossessionEdge),
        ]
    }

    #[test]
    fn test_lead_weight_progression() {
        let cfg = ModelConfig::default();
        assert_relative_eq!(lead_base_weight(0.0, &cfg), 0.20);
        assert_relative_eq!(lead_base_weight(24.0, &cfg), 0.275, epsilon = 1e-12);
        assert_relative_eq!(lead_base_weight(48.0, &cfg), 0.35, epsilon = 1e-12);
        // Overtime does not push it past the maximum.
        assert_relative_eq!(lead_base_weight(58.0, &cfg), 0.35, epsilon = 1e-12);
        // No floor: a Q1 clock above 12:00 gives negative minutes played.
        assert_relative_eq!(lead_base_weight(-1.2, &cfg), 0.19625, epsilon = 1e-12);
    }

    #[test]
    fn test_base_weights_live() {
        let cfg = ModelConfig::default();
        let mut factors = live_factors();
        apply_base_weights(&mut factors, GameStatus::InProgress, 24.0, &cfg);
        assert_relative_eq!(factors[0].base_weight, 0.275, epsilon = 1e-12);
        assert_relative_eq!(factors[1].base_weight, 0.40);
        assert_relative_eq!(factors[2].base_weight, 0.25);
        assert_eq!(factors[3].base_weight, 0.0);
    }

    #[test]
    fn test_gated_weights() {
        let cfg = ModelConfig::default();
        let mut factors = vec![
            FactorResult::active(FactorName::Efficiency, 0.1).with_gated(true),
            FactorResult::active(FactorName::PossessionEdge, 0.1).with_gated(true),
        ];
        apply_base_weights(&mut factors, GameStatus::InProgress, 10.0, &cfg);
        assert_relative_eq!(factors[0].base_weight, 0.10);
        assert_relative_eq!(factors[1].base_weight, 0.05);

        let mut factors = vec![FactorResult::active(FactorName::PossessionEdge, 0.1).with_gated(false)];
        apply_base_weights(&mut factors, GameStatus::InProgress, 30.0, &cfg);
        assert_relative_eq!(factors[0].base_weight, 0.12);
    }

    #[test]
    fn test_pre_game_keeps_only_spread() {
        let cfg = ModelConfig::default();
        let mut factors = live_factors();
        apply_base_weights(&mut factors, GameStatus::PreGame, 0.0, &cfg);
        assert!(!factors[0].is_active());
        assert!(factors[1].is_active());
        assert!(!factors[2].is_active());
        assert_eq!(normalize(&mut factors), Some(0.40));
        assert_relative_eq!(factors[1].weight, 1.0);
    }

    #[test]
    fn test_pre_game_without_spread_has_no_weight() {
        let cfg = ModelConfig::default();
        let mut factors = live_factors();
        factors[1] = FactorResult::inactive(FactorName::Spread);
        apply_base_weights(&mut factors, GameStatus::PreGame, 0.0, &cfg);
        assert_eq!(normalize(&mut factors), None);
        assert!(factors.iter().all(|f| f.weight == 0.0));
    }

    #[test]
    fn test_normalized_weights_sum_to_one() {
        let cfg = ModelConfig::default();
        for minutes in [0.0, 6.0, 18.5, 31.4, 47.9, 53.0] {
            let mut factors = live_factors();
            apply_base_weights(&mut factors, GameStatus::InProgress, minutes, &cfg);
            assert!(normalize(&mut factors).is_some());
            let sum: f64 = factors.iter().map(|f| f.weight).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inactive_factor_gets_no_share() {
        let cfg = ModelConfig::default();
        let mut factors = live_factors();
        factors[1] = FactorResult::inactive(FactorName::Spread);
        apply_base_weights(&mut factors, GameStatus::InProgress, 24.0, &cfg);
        normalize(&mut factors);
        assert_eq!(factors[1].weight, 0.0);
        assert_relative_eq!(factors[0].weight + factors[2].weight, 1.0, epsilon = 1e-12);
    }
}
