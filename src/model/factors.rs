//! Factor calculators.
//!
//! Each factor squashes a linear or ratio score through `tanh`, so every
//! advantage lies in [-1, 1] with positive values favoring the home team.
//! Weights are assigned later by [`super::weights`]; calculators only decide
//! the advantage, raw value and gating state.

use tracing::debug;

use super::settings::ModelConfig;
use super::types::{FactorName, FactorResult, SeasonStats, TeamBoxScore};

/// Free throws that end a possession, on average.
const FTA_POSSESSION_FACTOR: f64 = 0.44;

// ── Box-score helpers ────────────────────────────────────────────────────────

/// Estimated possessions, never below 1 so it is always safe to divide by.
pub fn possessions(box_score: &TeamBoxScore) -> f64 {
    let poss = box_score.fga as f64 + FTA_POSSESSION_FACTOR * box_score.fta as f64
        + box_score.tov as f64
        - box_score.orb as f64;
    poss.max(1.0)
}

/// Effective field goal percentage; 0 when no shots were attempted.
pub fn effective_fg(box_score: &TeamBoxScore) -> f64 {
    if box_score.fga == 0 {
        return 0.0;
    }
    (box_score.fgm as f64 + 0.5 * box_score.fg3m as f64) / box_score.fga as f64
}

/// Turnovers per possession. `poss` is expected to come from [`possessions`].
pub fn tov_rate(tov: u32, poss: f64) -> f64 {
    tov as f64 / poss
}

// ── Factors ──────────────────────────────────────────────────────────────────

/// Time-adjusted lead. Dividing by √(minutes remaining + 1) makes an early
/// lead worth little and a late one worth a lot.
pub fn lead_factor(
    home_score: u32,
    away_score: u32,
    minutes_remaining: f64,
    config: &ModelConfig,
) -> FactorResult {
    let raw_lead = home_score as f64 - away_score as f64;
    let adjusted_lead = raw_lead - config.home_court_adjustment;
    let lead_score = adjusted_lead / (minutes_remaining + 1.0).sqrt();
    let advantage = (lead_score * config.lead_scale).tanh();
    debug!(
        "lead: raw={} adjusted={:.2} score={:.4} advantage={:.4}",
        raw_lead, adjusted_lead, lead_score, advantage
    );
    FactorResult::active(FactorName::Lead, advantage).with_raw_value(raw_lead)
}

/// Pre-game spread. A negative (home-favored) line maps to a positive
/// advantage. Missing spread leaves the factor inactive.
pub fn spread_factor(spread: Option<f64>, config: &ModelConfig) -> FactorResult {
    match spread {
        Some(spread) => {
            let advantage = (spread * -config.spread_scale).tanh();
            FactorResult::active(FactorName::Spread, advantage).with_raw_value(spread)
        }
        None => FactorResult::inactive(FactorName::Spread),
    }
}

/// Live shooting efficiency relative to each team's season baseline.
///
/// Gated until both `efficiency_gate_minutes` have been played and each team
/// has at least `efficiency_gate_poss` possessions.
pub fn efficiency_factor(
    home: &TeamBoxScore,
    away: &TeamBoxScore,
    home_season: &SeasonStats,
    away_season: &SeasonStats,
    minutes_played: f64,
    config: &ModelConfig,
) -> FactorResult {
    let home_delta = effective_fg(home) - home_season.efg;
    let away_delta = effective_fg(away) - away_season.efg;
    let advantage = ((home_delta - away_delta) * config.efficiency_scale).tanh();

    let min_poss = possessions(home).min(possessions(away));
    let gated = minutes_played < config.efficiency_gate_minutes
        || min_poss < config.efficiency_gate_poss;
    debug!(
        "efficiency: home_delta={:.4} away_delta={:.4} advantage={:.4} gated={}",
        home_delta, away_delta, advantage, gated
    );
    FactorResult::active(FactorName::Efficiency, advantage).with_gated(gated)
}

/// Extra possessions won through turnovers forced and offensive rebounds,
/// as a share of all possessions so far. Uses cumulative game totals.
pub fn possession_edge_factor(
    home: &TeamBoxScore,
    away: &TeamBoxScore,
    minutes_played: f64,
    config: &ModelConfig,
) -> FactorResult {
    let home_poss = possessions(home);
    let away_poss = possessions(away);
    let total_poss = (home_poss + away_poss).max(1.0);

    let extra_poss = (away.tov as f64 - home.tov as f64) + (home.orb as f64 - away.orb as f64);
    let rate = extra_poss / total_poss;
    let advantage = (rate * config.possession_edge_scale).tanh();

    let gated = minutes_played < config.possession_edge_gate_minutes
        || home_poss.min(away_poss) < config.possession_edge_gate_poss;
    debug!(
        "possession_edge: extra={} rate={:.4} advantage={:.4} gated={} tov_rate={:.3}/{:.3}",
        extra_poss,
        rate,
        advantage,
        gated,
        tov_rate(home.tov, home_poss),
        tov_rate(away.tov, away_poss)
    );
    FactorResult::active(FactorName::PossessionEdge, advantage)
        .with_raw_value(extra_poss)
        .with_gated(gated)
}
