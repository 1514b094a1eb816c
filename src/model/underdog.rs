//! Flip-lead and pre-game underdog tracking.
//!
//! The flip lead inverts the lead factor: holding every other factor fixed,
//! what home lead would put the blend exactly at 50%? The underdog watch
//! flags games where the team the market priced as the underdog is live.

use super::settings::ModelConfig;
use super::types::{FactorName, FactorResult, Team, UnderdogReason, UnderdogReport};

/// Beyond this the lead factor would need an advantage tanh cannot reach.
const MAX_TARGET_ADVANTAGE: f64 = 0.999;

/// Home lead (home − away) at which the combined score would be zero.
pub fn flip_lead_home(
    factors: &[FactorResult],
    minutes_remaining: f64,
    config: &ModelConfig,
) -> Option<f64> {
    let lead = factors.iter().find(|f| f.name == FactorName::Lead)?;
    if !lead.is_active() || lead.weight == 0.0 {
        return None;
    }

    let others: f64 = factors
        .iter()
        .filter(|f| f.name != FactorName::Lead)
        .filter_map(|f| f.advantage.map(|a| f.weight * a))
        .sum();
    let target = -others / lead.weight;
    if target.abs() >= MAX_TARGET_ADVANTAGE {
        return None;
    }

    let lead_score = target.atanh() / config.lead_scale;
    let adjusted_lead = lead_score * (minutes_remaining + 1.0).sqrt();
    Some(adjusted_lead + config.home_court_adjustment)
}

/// Underdog by the home-perspective spread; a pick'em has none.
pub fn underdog_team(spread: Option<f64>) -> Option<Team> {
    match spread {
        Some(s) if s > 0.0 => Some(Team::Home),
        Some(s) if s < 0.0 => Some(Team::Away),
        _ => None,
    }
}

/// Live state the watch rules look at.
#[derive(Debug, Clone, Copy)]
pub struct WatchInputs {
    pub win_prob_home: f64,
    pub win_prob_away: f64,
    pub combined_score: f64,
    pub minutes_played: f64,
    pub data_age_sec: f64,
    pub trailing_team: Option<Team>,
    pub trailing_edge_alert: bool,
    pub is_blowout: bool,
    pub flip_swing: Option<f64>,
}

impl WatchInputs {
    /// Blowouts, early minutes and ageing data never raise a watch.
    fn suppressed(&self, config: &ModelConfig) -> bool {
        self.is_blowout
            || self.minutes_played < config.upset_min_minutes
            || self.data_age_sec >= config.stale_warning_sec
    }
}

/// Build the underdog report for one evaluation.
pub fn assess(spread: Option<f64>, inputs: &WatchInputs, config: &ModelConfig) -> UnderdogReport {
    let Some(team) = underdog_team(spread) else {
        return UnderdogReport::default();
    };
    let win_prob = match team {
        Team::Home => inputs.win_prob_home,
        Team::Away => inputs.win_prob_away,
    };
    let reason = watch_reason(team, win_prob, inputs, config);
    UnderdogReport {
        team: Some(team),
        win_prob: Some(win_prob),
        watch: reason.is_some(),
        reason,
        close_to_flip: close_to_flip(win_prob, inputs, config),
    }
}

fn watch_reason(
    team: Team,
    win_prob: f64,
    inputs: &WatchInputs,
    config: &ModelConfig,
) -> Option<UnderdogReason> {
    if inputs.suppressed(config) {
        return None;
    }
    if win_prob >= config.upset_win_prob_threshold {
        Some(UnderdogReason::ProbabilityThreshold)
    } else if inputs.combined_score.abs() <= config.upset_flip_buffer_threshold {
        Some(UnderdogReason::NearEven)
    } else if inputs.trailing_edge_alert && inputs.trailing_team == Some(team) {
        Some(UnderdogReason::TrailingEdge)
    } else {
        None
    }
}

/// The underdog is behind but within a small swing of a coin flip.
fn close_to_flip(win_prob: f64, inputs: &WatchInputs, config: &ModelConfig) -> bool {
    if win_prob >= 0.5 || inputs.suppressed(config) {
        return false;
    }
    match inputs.flip_swing {
        Some(swing) => {
            inputs.combined_score.abs() <= config.upset_flip_buffer_threshold
                && swing.abs() <= config.upset_flip_swing_threshold
        }
        None => false,
    }
}

impl UnderdogReason {
    pub fn describe(&self, config: &ModelConfig) -> String {
        match self {
            UnderdogReason::ProbabilityThreshold => {
                format!("prob >= {}%", (config.upset_win_prob_threshold * 100.0) as i64)
            }
            UnderdogReason::NearEven => "near 50%".to_string(),
            UnderdogReason::TrailingEdge => "trailing edge".to_string(),
        }
    }
}
