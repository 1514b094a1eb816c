use std::collections::HashMap;
use tracing::debug;

use crate::model::types::{ClockReading, GameStatus};
use crate::model::{evaluate, Evaluation, EvaluationInput, ModelConfig};

/// Per-game last-known clock, owned by the polling loop.
///
/// Each game's value is independent; nothing is shared across games.
#[derive(Debug, Default)]
pub struct ClockTracker {
    clocks: HashMap<String, ClockReading>,
}

impl ClockTracker {
    pub fn new() -> Self {
        ClockTracker {
            clocks: HashMap::new(),
        }
    }

    pub fn last_known(&self, game_id: &str) -> Option<ClockReading> {
        self.clocks.get(game_id).copied()
    }

    /// Evaluate one snapshot with this game's carried clock and store the
    /// clock the evaluation hands back. Finished games are forgotten.
    pub fn evaluate(&mut self, mut input: EvaluationInput, config: &ModelConfig) -> Evaluation {
        let game_id = input.snapshot.game_id.clone();
        input.last_known_clock = self.last_known(&game_id);
        let evaluation = evaluate(&input, config);

        if input.snapshot.status == GameStatus::Final {
            self.forget(&game_id);
        } else if let Some(clock) = evaluation.clock {
            self.clocks.insert(game_id, clock);
        }
        evaluation
    }

    pub fn forget(&mut self, game_id: &str) {
        if self.clocks.remove(game_id).is_some() {
            debug!("Dropped clock state for finished game {}", game_id);
        }
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{GameSnapshot, SeasonStats, TeamBoxScore};
    use approx::assert_relative_eq;

    fn input(game_id: &str, clock: Option<&str>, status: GameStatus) -> EvaluationInput {
        let cfg = ModelConfig::default();
        EvaluationInput {
            snapshot: GameSnapshot {
                game_id: game_id.into(),
                home_team: "Home".into(),
                away_team: "Away".into(),
                home_score: 40,
                away_score: 38,
                period: 2,
                clock: clock.map(String::from),
                status,
            },
            spread: None,
            home_box: TeamBoxScore::default(),
            away_box: TeamBoxScore::default(),
            home_season: SeasonStats::league_average(&cfg),
            away_season: SeasonStats::league_average(&cfg),
            last_known_clock: None,
            data_age_sec: 0.0,
        }
    }

    #[test]
    fn test_clock_carried_between_polls() {
        let cfg = ModelConfig::default();
        let mut tracker = ClockTracker::new();
        tracker.evaluate(input("g1", Some("6:45"), GameStatus::InProgress), &cfg);
        assert_eq!(tracker.last_known("g1"), Some(ClockReading::new(6, 45)));

        let eval = tracker.evaluate(input("g1", Some("bad"), GameStatus::InProgress), &cfg);
        let p = eval.outcome.prediction().unwrap();
        assert!(p.clock_stale);
        assert_relative_eq!(p.minutes_remaining, 24.0 + 6.75, epsilon = 1e-9);
        // A failed parse never overwrites the stored clock.
        assert_eq!(tracker.last_known("g1"), Some(ClockReading::new(6, 45)));
    }

    #[test]
    fn test_games_are_isolated() {
        let cfg = ModelConfig::default();
        let mut tracker = ClockTracker::new();
        tracker.evaluate(input("g1", Some("6:45"), GameStatus::InProgress), &cfg);
        let eval = tracker.evaluate(input("g2", None, GameStatus::InProgress), &cfg);
        assert_eq!(eval.clock, None);
        assert_eq!(tracker.last_known("g2"), None);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_final_clears_state() {
        let cfg = ModelConfig::default();
        let mut tracker = ClockTracker::new();
        tracker.evaluate(input("g1", Some("6:45"), GameStatus::InProgress), &cfg);
        tracker.evaluate(input("g1", Some("0:00"), GameStatus::Final), &cfg);
        assert_eq!(tracker.last_known("g1"), None);
        assert_eq!(tracker.len(), 0);
    }
}
