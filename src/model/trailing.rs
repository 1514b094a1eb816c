use super::settings::ModelConfig;
use super::types::{FactorResult, Team};

/// Minimum number of active factors that must favor the trailing team.
const MIN_FAVORING_FACTORS: usize = 2;

/// Find the trailing team and whether the underlying numbers favor it.
///
/// A tie has no trailing team. The alert needs a margin of at least
/// `trailing_edge_min_margin` and two or more active factors leaning the
/// trailing team's way by `trailing_edge_factor_threshold`.
pub fn detect(
    home_score: u32,
    away_score: u32,
    factors: &[FactorResult],
    config: &ModelConfig,
) -> (Option<Team>, bool) {
    if home_score == away_score {
        return (None, false);
    }
    let (trailing, sign) = if home_score < away_score {
        (Team::Home, 1.0)
    } else {
        (Team::Away, -1.0)
    };
    let margin = (home_score as f64 - away_score as f64).abs();

    let favoring = factors
        .iter()
        .filter_map(|f| f.advantage)
        .filter(|a| a * sign >= config.trailing_edge_factor_threshold)
        .count();

    let alert = margin >= config.trailing_edge_min_margin && favoring >= MIN_FAVORING_FACTORS;
    (Some(trailing), alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::FactorName;

    fn factors(lead: f64, spread: f64, efficiency: f64) -> Vec<FactorResult> {
        vec![
            FactorResult::active(FactorName::Lead, lead),
            FactorResult::active(FactorName::Spread, spread),
            FactorResult::active(FactorName::Efficiency, efficiency),
        ]
    }

    #[test]
    fn test_tie_has_no_trailing_team() {
        let cfg = ModelConfig::default();
        let (team, alert) = detect(80, 80, &factors(0.9, 0.9, 0.9), &cfg);
        assert_eq!(team, None);
        assert!(!alert);
    }

    #[test]
    fn test_alert_for_trailing_home_team() {
        let cfg = ModelConfig::default();
        let (team, alert) = detect(70, 76, &factors(-0.3, 0.25, 0.2), &cfg);
        assert_eq!(team, Some(Team::Home));
        assert!(alert);
    }

    #[test]
    fn test_alert_for_trailing_away_team() {
        let cfg = ModelConfig::default();
        let (team, alert) = detect(90, 85, &factors(0.3, -0.2, -0.16), &cfg);
        assert_eq!(team, Some(Team::Away));
        assert!(alert);
    }

    #[test]
    fn test_single_factor_is_not_enough() {
        let cfg = ModelConfig::default();
        let (team, alert) = detect(70, 76, &factors(-0.3, 0.25, 0.05), &cfg);
        assert_eq!(team, Some(Team::Home));
        assert!(!alert);
    }

    #[test]
    fn test_small_margin_suppresses_alert() {
        let cfg = ModelConfig::default();
        let (_, alert) = detect(74, 76, &factors(-0.1, 0.25, 0.2), &cfg);
        assert!(!alert);
    }

    #[test]
    fn test_inactive_factors_ignored() {
        let cfg = ModelConfig::default();
        let f = vec![
            FactorResult::active(FactorName::Lead, -0.3),
            FactorResult::inactive(FactorName::Spread),
            FactorResult::active(FactorName::Efficiency, 0.2),
        ];
        let (_, alert) = detect(70, 76, &f, &cfg);
        assert!(!alert);
    }
}
