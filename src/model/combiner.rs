use super::settings::ModelConfig;
use super::types::FactorResult;

/// Win probability forced for the leading team in garbage time.
pub const BLOWOUT_WIN_PROB: f64 = 0.99;

/// Weighted sum of active advantages, compressed toward zero in overtime.
pub fn combined_score(factors: &[FactorResult], is_overtime: bool, config: &ModelConfig) -> f64 {
    let combined: f64 = factors
        .iter()
        .filter_map(|f| f.advantage.map(|a| f.weight * a))
        .sum();
    if is_overtime {
        combined * config.ot_dampen_factor
    } else {
        combined
    }
}

/// Logistic mapping of the combined score to `(home, away)` win probability.
pub fn win_probability(combined: f64, config: &ModelConfig) -> (f64, f64) {
    let home = sigmoid(config.sigmoid_k * combined);
    (home, 1.0 - home)
}

/// Garbage-time override on the raw scoreboard lead.
///
/// Returns `(home, away)` win probability when the lead is at least
/// `blowout_lead_threshold` with no more than `blowout_minutes_threshold`
/// left. The caller discards the blended probability in that case.
pub fn check_blowout(raw_lead: i64, minutes_remaining: f64, config: &ModelConfig) -> Option<(f64, f64)> {
    let is_blowout = (raw_lead.abs() as f64) >= config.blowout_lead_threshold
        && minutes_remaining <= config.blowout_minutes_threshold;
    if !is_blowout {
        return None;
    }
    let home = if raw_lead > 0 {
        BLOWOUT_WIN_PROB
    } else {
        1.0 - BLOWOUT_WIN_PROB
    };
    Some((home, 1.0 - home))
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::FactorName;
    use approx::assert_relative_eq;

    fn weighted(name: FactorName, advantage: f64, weight: f64) -> FactorResult {
        let mut f = FactorResult::active(name, advantage);
        f.base_weight = weight;
        f.weight = weight;
        f
    }

    #[test]
    fn test_combined_score() {
        let cfg = ModelConfig::default();
        let factors = vec![
            weighted(FactorName::Lead, 0.5, 0.4),
            weighted(FactorName::Spread, 0.3, 0.6),
            FactorResult::inactive(FactorName::Efficiency),
        ];
        assert_relative_eq!(combined_score(&factors, false, &cfg), 0.2 + 0.18, epsilon = 1e-12);
    }

    #[test]
    fn test_overtime_dampening() {
        let cfg = ModelConfig::default();
        let factors = vec![weighted(FactorName::Lead, 0.5, 1.0)];
        let regular = combined_score(&factors, false, &cfg);
        let overtime = combined_score(&factors, true, &cfg);
        assert_relative_eq!(overtime, regular * 0.8, epsilon = 1e-12);
        assert!(overtime < regular);
    }

    #[test]
    fn test_win_probability() {
        let cfg = ModelConfig::default();
        let (home, away) = win_probability(0.3, &cfg);
        assert!(home > 0.5 && away < 0.5);
        assert_relative_eq!(home + away, 1.0, epsilon = 1e-12);

        let (home, away) = win_probability(-0.3, &cfg);
        assert!(home < 0.5 && away > 0.5);

        let (home, away) = win_probability(0.0, &cfg);
        assert_relative_eq!(home, 0.5);
        assert_relative_eq!(away, 0.5);
    }

    #[test]
    fn test_win_probability_bounds() {
        let cfg = ModelConfig::default();
        for combined in [-1.0, -0.5, 0.0, 0.5, 1.0, 500.0, -500.0] {
            let (home, away) = win_probability(combined, &cfg);
            assert!((0.0..=1.0).contains(&home));
            assert!((0.0..=1.0).contains(&away));
            assert_relative_eq!(home + away, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_home_blowout() {
        let cfg = ModelConfig::default();
        let (home, away) = check_blowout(25, 3.0, &cfg).unwrap();
        assert_relative_eq!(home, 0.99);
        assert_relative_eq!(away, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_away_blowout() {
        let cfg = ModelConfig::default();
        let (home, away) = check_blowout(-22, 4.0, &cfg).unwrap();
        assert_relative_eq!(home, 0.01, epsilon = 1e-12);
        assert_relative_eq!(away, 0.99, epsilon = 1e-12);
    }

    #[test]
    fn test_no_blowout() {
        let cfg = ModelConfig::default();
        assert_eq!(check_blowout(10, 3.0, &cfg), None);
        assert_eq!(check_blowout(25, 8.0, &cfg), None);
        assert!(check_blowout(20, 5.0, &cfg).is_some());
    }
}
