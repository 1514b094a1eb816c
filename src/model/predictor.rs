//! Single-evaluation entry point.
//!
//! Stages run strictly in order: clock → factors → weights → combiner →
//! confidence / trailing edge / underdog. The evaluation is pure: the only
//! state that survives a call is the returned last-known clock, which the
//! caller stores per game and passes back in next time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::{resolve_clock, time_values, GameTime};
use super::settings::ModelConfig;
use super::types::{
    ClockReading, FactorName, FactorResult, GameSnapshot, GameStatus, PredictionResult,
    SeasonStats, SpreadInfo, TeamBoxScore,
};
use super::{combiner, confidence, factors, trailing, underdog, weights};

/// Everything one evaluation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub snapshot: GameSnapshot,
    pub spread: Option<SpreadInfo>,
    pub home_box: TeamBoxScore,
    pub away_box: TeamBoxScore,
    pub home_season: SeasonStats,
    pub away_season: SeasonStats,
    /// Last successfully parsed clock for this game, owned by the caller
    pub last_known_clock: Option<ClockReading>,
    /// Seconds since the underlying data was last fetched successfully
    pub data_age_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Prediction(Box<PredictionResult>),
    /// No factor carries weight yet (pre-game without a spread)
    AwaitingTipoff,
}

impl Outcome {
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            Outcome::Prediction(p) => Some(p.as_ref()),
            Outcome::AwaitingTipoff => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub outcome: Outcome,
    /// Clock to carry into the next evaluation of the same game
    pub clock: Option<ClockReading>,
}

pub fn evaluate(input: &EvaluationInput, config: &ModelConfig) -> Evaluation {
    let snapshot = &input.snapshot;

    let (time, clock_stale, carry) = match snapshot.status {
        GameStatus::PreGame => (GameTime::PRE_GAME, false, input.last_known_clock),
        GameStatus::InProgress
        | GameStatus::Halftime
        | GameStatus::BetweenQuarters
        | GameStatus::Final => {
            let resolved = resolve_clock(
                snapshot.status,
                snapshot.clock.as_deref(),
                input.last_known_clock,
            );
            (
                time_values(snapshot.period, resolved.reading),
                resolved.stale,
                resolved.carry,
            )
        }
    };
    let is_overtime = snapshot.is_overtime();
    let spread = input.spread.map(|s| s.spread);

    let mut factors = vec![
        factors::lead_factor(
            snapshot.home_score,
            snapshot.away_score,
            time.minutes_remaining,
            config,
        ),
        factors::spread_factor(spread, config),
        factors::efficiency_factor(
            &input.home_box,
            &input.away_box,
            &input.home_season,
            &input.away_season,
            time.minutes_played,
            config,
        ),
        if config.possession_edge_enabled {
            factors::possession_edge_factor(
                &input.home_box,
                &input.away_box,
                time.minutes_played,
                config,
            )
        } else {
            FactorResult::inactive(FactorName::PossessionEdge)
        },
    ];

    weights::apply_base_weights(&mut factors, snapshot.status, time.minutes_played, config);
    if weights::normalize(&mut factors).is_none() {
        debug!("game {}: no weighted factors, awaiting tip-off", snapshot.game_id);
        return Evaluation {
            outcome: Outcome::AwaitingTipoff,
            clock: carry,
        };
    }

    let combined = combiner::combined_score(&factors, is_overtime, config);
    let (mut win_prob_home, mut win_prob_away) = combiner::win_probability(combined, config);

    let raw_lead = snapshot.raw_lead();
    let mut flip_lead_home = underdog::flip_lead_home(&factors, time.minutes_remaining, config);
    let mut flip_swing = flip_lead_home.map(|flip| flip - raw_lead as f64);

    let blowout = combiner::check_blowout(raw_lead, time.minutes_remaining, config);
    if let Some((home, away)) = blowout {
        win_prob_home = home;
        win_prob_away = away;
        flip_lead_home = None;
        flip_swing = None;
    }

    // A clock fallback means the snapshot may be behind the real game.
    let data_age_sec = if clock_stale {
        input.data_age_sec.max(config.stale_warning_sec)
    } else {
        input.data_age_sec
    };

    let confidence = confidence::estimate(
        &factors,
        data_age_sec,
        time.minutes_played,
        spread.is_some(),
        config,
    );
    let (trailing_team, trailing_edge_alert) =
        trailing::detect(snapshot.home_score, snapshot.away_score, &factors, config);

    let underdog = underdog::assess(
        spread,
        &underdog::WatchInputs {
            win_prob_home,
            win_prob_away,
            combined_score: combined,
            minutes_played: time.minutes_played,
            data_age_sec,
            trailing_team,
            trailing_edge_alert,
            is_blowout: blowout.is_some(),
            flip_swing,
        },
        config,
    );

    debug!(
        "game {}: combined={:.4} home={:.4} confidence={} blowout={} trailing={}",
        snapshot.game_id,
        combined,
        win_prob_home,
        confidence.as_str(),
        blowout.is_some(),
        trailing_team.map(|t| t.as_str()).unwrap_or("-")
    );

    Evaluation {
        outcome: Outcome::Prediction(Box::new(PredictionResult {
            win_prob_home,
            win_prob_away,
            combined_score: combined,
            confidence,
            factors,
            trailing_team,
            trailing_edge_alert,
            is_blowout: blowout.is_some(),
            is_overtime,
            minutes_played: time.minutes_played,
            minutes_remaining: time.minutes_remaining,
            clock_stale,
            flip_lead_home,
            flip_swing,
            underdog,
        })),
        clock: carry,
    }
}
