use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::ModelConfig;

/// A parsed game clock: time left in the current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
    pub minutes: u32,
    pub seconds: u32,
}

impl ClockReading {
    /// Synthesized reading used when no clock has ever parsed for a game.
    pub const END_OF_PERIOD: ClockReading = ClockReading {
        minutes: 0,
        seconds: 0,
    };

    pub fn new(minutes: u32, seconds: u32) -> Self {
        ClockReading { minutes, seconds }
    }

    /// Clock value in fractional minutes.
    pub fn as_minutes(&self) -> f64 {
        self.minutes as f64 + self.seconds as f64 / 60.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    PreGame,
    InProgress,
    Halftime,
    BetweenQuarters,
    Final,
}

impl GameStatus {
    /// Derive the status from a provider's raw status string, period and clock.
    pub fn derive(raw_status: &str, period: u32, clock: Option<&str>) -> Self {
        if raw_status.trim().eq_ignore_ascii_case("final") {
            return GameStatus::Final;
        }
        let clock = match clock {
            Some(c) if period > 0 => c.trim(),
            _ => return GameStatus::PreGame,
        };
        match (clock, period) {
            ("0:00", 1) | ("0:00", 3) => GameStatus::BetweenQuarters,
            ("0:00", 2) => GameStatus::Halftime,
            _ => GameStatus::InProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::PreGame => "pre_game",
            GameStatus::InProgress => "in_progress",
            GameStatus::Halftime => "halftime",
            GameStatus::BetweenQuarters => "between_quarters",
            GameStatus::Final => "final",
        }
    }
}

/// One polled observation of a live game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// External game ID from the data provider
    #[serde(default)]
    pub game_id: String,
    #[serde(default = "default_home_team")]
    pub home_team: String,
    #[serde(default = "default_away_team")]
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    /// 1-4 regulation quarters, 5+ overtime periods, 0 before tip-off
    pub period: u32,
    /// Raw clock string as reported, e.g. "4:32" or "0:05.9"
    pub clock: Option<String>,
    pub status: GameStatus,
}

fn default_home_team() -> String {
    "Home".into()
}

fn default_away_team() -> String {
    "Away".into()
}

impl GameSnapshot {
    /// Home score minus away score, before any home-court adjustment.
    pub fn raw_lead(&self) -> i64 {
        self.home_score as i64 - self.away_score as i64
    }

    pub fn is_overtime(&self) -> bool {
        self.period > 4
    }

    /// "Q3", "OT", "OT2" ... or "Pre-game".
    pub fn period_label(&self) -> String {
        match self.period {
            0 => "Pre-game".to_string(),
            p @ 1..=4 => format!("Q{}", p),
            5 => "OT".to_string(),
            p => format!("OT{}", p - 4),
        }
    }
}

/// Pre-game betting line, home-team perspective (negative = home favored).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadInfo {
    pub spread: f64,
    pub fetched_at: DateTime<Utc>,
}

/// Cumulative live box-score totals for one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamBoxScore {
    pub fgm: u32,
    pub fg3m: u32,
    pub fga: u32,
    pub fta: u32,
    pub tov: u32,
    pub orb: u32,
}

/// Season-level shooting and ball-security baselines for one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonStats {
    pub efg: f64,
    pub tov_rate: f64,
}

impl SeasonStats {
    /// Fallback used when season averages could not be fetched.
    pub fn league_average(config: &ModelConfig) -> Self {
        SeasonStats {
            efg: config.league_avg_efg,
            tov_rate: config.league_avg_tov_rate,
        }
    }

    /// Derive baselines from per-game season averages. Each rate falls back to
    /// the league average when its denominator is not positive.
    pub fn from_season_averages(averages: &SeasonAverages, config: &ModelConfig) -> Self {
        let efg = if averages.fga > 0.0 {
            (averages.fgm + 0.5 * averages.fg3m) / averages.fga
        } else {
            config.league_avg_efg
        };
        let poss = averages.fga + 0.44 * averages.fta + averages.tov - averages.orb;
        let tov_rate = if poss > 0.0 {
            averages.tov / poss
        } else {
            config.league_avg_tov_rate
        };
        SeasonStats { efg, tov_rate }
    }
}

/// Per-game season averages as published by a stats provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonAverages {
    pub fgm: f64,
    pub fga: f64,
    pub fg3m: f64,
    pub fta: f64,
    pub tov: f64,
    pub orb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorName {
    Lead,
    Spread,
    Efficiency,
    PossessionEdge,
}

impl FactorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorName::Lead => "lead",
            FactorName::Spread => "spread",
            FactorName::Efficiency => "efficiency",
            FactorName::PossessionEdge => "possession_edge",
        }
    }
}

/// One factor's contribution to an evaluation.
///
/// `advantage` is `None` exactly when the factor is inactive; an inactive
/// factor always carries zero weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorResult {
    pub name: FactorName,
    /// Signed value in [-1, 1], positive favoring the home team
    pub advantage: Option<f64>,
    /// Weight before normalization
    pub base_weight: f64,
    /// Weight after normalization across active factors
    pub weight: f64,
    /// Raw lead, raw spread or extra possessions, depending on the factor
    pub raw_value: Option<f64>,
    /// Whether a sample-size gate reduced this factor's weight
    pub gated: Option<bool>,
}

impl FactorResult {
    pub fn active(name: FactorName, advantage: f64) -> Self {
        FactorResult {
            name,
            advantage: Some(advantage),
            base_weight: 0.0,
            weight: 0.0,
            raw_value: None,
            gated: None,
        }
    }

    pub fn inactive(name: FactorName) -> Self {
        FactorResult {
            name,
            advantage: None,
            base_weight: 0.0,
            weight: 0.0,
            raw_value: None,
            gated: None,
        }
    }

    pub fn with_raw_value(mut self, raw: f64) -> Self {
        self.raw_value = Some(raw);
        self
    }

    pub fn with_gated(mut self, gated: bool) -> Self {
        self.gated = Some(gated);
        self
    }

    pub fn is_active(&self) -> bool {
        self.advantage.is_some()
    }

    /// Drop the factor out of the blend entirely.
    pub fn deactivate(&mut self) {
        self.advantage = None;
        self.base_weight = 0.0;
        self.weight = 0.0;
        self.gated = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Away,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Home => "home",
            Team::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderdogReason {
    /// Underdog win probability reached the watch threshold
    ProbabilityThreshold,
    /// Combined score sits close to a coin flip
    NearEven,
    /// Trailing-edge alert fired for the underdog
    TrailingEdge,
}

/// Pre-game underdog tracking for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnderdogReport {
    pub team: Option<Team>,
    pub win_prob: Option<f64>,
    pub watch: bool,
    pub reason: Option<UnderdogReason>,
    pub close_to_flip: bool,
}

/// Output of one successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub win_prob_home: f64,
    pub win_prob_away: f64,
    /// Weighted factor blend after overtime dampening, before the sigmoid
    pub combined_score: f64,
    pub confidence: Confidence,
    /// Always lead, spread, efficiency, possession_edge in that order
    pub factors: Vec<FactorResult>,
    pub trailing_team: Option<Team>,
    pub trailing_edge_alert: bool,
    pub is_blowout: bool,
    pub is_overtime: bool,
    pub minutes_played: f64,
    pub minutes_remaining: f64,
    /// Clock could not be parsed and a fallback value was used
    pub clock_stale: bool,
    /// Home lead (home - away) at which the blend would sit at 50%
    pub flip_lead_home: Option<f64>,
    /// Points the current lead must move to reach the flip lead
    pub flip_swing: Option<f64>,
    pub underdog: UnderdogReport,
}

#[cfg(test)]
impl PredictionResult {
    pub fn factor(&self, name: FactorName) -> Option<&FactorResult> {
        self.factors.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(period: u32) -> GameSnapshot {
        GameSnapshot {
            game_id: "g1".into(),
            home_team: "Boston Celtics".into(),
            away_team: "New York Knicks".into(),
            home_score: 50,
            away_score: 48,
            period,
            clock: Some("5:00".into()),
            status: GameStatus::InProgress,
        }
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(GameStatus::derive("Final", 4, Some("0:00")), GameStatus::Final);
        assert_eq!(GameStatus::derive("final", 5, None), GameStatus::Final);
        assert_eq!(GameStatus::derive("7:00 pm ET", 0, None), GameStatus::PreGame);
        assert_eq!(GameStatus::derive("1st Qtr", 1, None), GameStatus::PreGame);
        assert_eq!(GameStatus::derive("1st Qtr", 1, Some("0:00")), GameStatus::BetweenQuarters);
        assert_eq!(GameStatus::derive("3rd Qtr", 3, Some("0:00")), GameStatus::BetweenQuarters);
        assert_eq!(GameStatus::derive("Half", 2, Some("0:00")), GameStatus::Halftime);
        assert_eq!(GameStatus::derive("4th Qtr", 4, Some("0:00")), GameStatus::InProgress);
        assert_eq!(GameStatus::derive("2nd Qtr", 2, Some("6:12")), GameStatus::InProgress);
    }

    #[test]
    fn test_period_labels() {
        assert_eq!(snapshot(0).period_label(), "Pre-game");
        assert_eq!(snapshot(3).period_label(), "Q3");
        assert_eq!(snapshot(5).period_label(), "OT");
        assert_eq!(snapshot(7).period_label(), "OT3");
        assert!(snapshot(5).is_overtime());
        assert!(!snapshot(4).is_overtime());
    }

    #[test]
    fn test_season_stats_from_averages() {
        let cfg = ModelConfig::default();
        let avg = SeasonAverages {
            fgm: 42.0,
            fga: 88.0,
            fg3m: 13.0,
            fta: 22.0,
            tov: 13.5,
            orb: 10.0,
        };
        let stats = SeasonStats::from_season_averages(&avg, &cfg);
        assert_relative_eq!(stats.efg, (42.0 + 6.5) / 88.0, epsilon = 1e-12);
        let poss = 88.0 + 0.44 * 22.0 + 13.5 - 10.0;
        assert_relative_eq!(stats.tov_rate, 13.5 / poss, epsilon = 1e-12);
    }

    #[test]
    fn test_season_stats_fall_back_to_league_average() {
        let cfg = ModelConfig::default();
        let stats = SeasonStats::from_season_averages(&SeasonAverages::default(), &cfg);
        assert_eq!(stats, SeasonStats::league_average(&cfg));
        assert_relative_eq!(stats.efg, 0.52);
        assert_relative_eq!(stats.tov_rate, 0.13);
    }

    #[test]
    fn test_inactive_factor_has_no_advantage() {
        let mut f = FactorResult::active(FactorName::Efficiency, 0.3).with_gated(true);
        f.base_weight = 0.1;
        assert!(f.is_active());
        f.deactivate();
        assert!(!f.is_active());
        assert_eq!(f.base_weight, 0.0);
        assert_eq!(f.gated, None);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(
            serde_json::to_string(&Confidence::High).unwrap(),
            "\"High\""
        );
    }
}
