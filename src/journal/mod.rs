//! Prediction journal: one JSON object per evaluation, appended to a
//! `predictions_YYYY-MM-DD.jsonl` file per UTC day.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::feed::ApiError;
use crate::model::types::{
    Confidence, FactorName, FactorResult, GameStatus, Team, UnderdogReason,
};
use crate::model::{Evaluation, EvaluationInput};

pub const MODEL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreLine {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProb {
    pub home: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlipRecord {
    pub lead_home: Option<f64>,
    pub swing: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnderdogRecord {
    pub team: Option<Team>,
    pub win_prob: Option<f64>,
    pub watch: bool,
    pub reason: Option<UnderdogReason>,
    pub close_to_flip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub advantage: Option<f64>,
    pub weight: f64,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_lead: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_spread: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_extra_poss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gated: Option<bool>,
}

impl FactorRecord {
    fn from_factor(factor: &FactorResult) -> Self {
        let raw = |name: FactorName| {
            if factor.name == name {
                factor.raw_value
            } else {
                None
            }
        };
        FactorRecord {
            advantage: factor.advantage.map(|a| round_to(a, 4)),
            weight: round_to(factor.weight, 4),
            active: factor.is_active(),
            raw_lead: raw(FactorName::Lead),
            raw_spread: raw(FactorName::Spread),
            raw_extra_poss: raw(FactorName::PossessionEdge),
            gated: factor.gated,
        }
    }
}

/// One journal line. Prediction fields are null while awaiting tip-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub model_version: String,
    pub config_hash: String,
    pub timestamp: DateTime<Utc>,
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub game_status: GameStatus,
    pub score: ScoreLine,
    pub quarter: u32,
    pub clock: Option<String>,
    pub spread: Option<f64>,
    pub minutes_remaining: Option<f64>,
    pub minutes_played: Option<f64>,
    pub is_overtime: bool,
    pub is_blowout: bool,
    pub clock_stale: bool,
    pub combined_score: Option<f64>,
    pub flip: FlipRecord,
    pub underdog: UnderdogRecord,
    pub factors: BTreeMap<String, FactorRecord>,
    pub win_prob: Option<WinProb>,
    pub confidence: Option<Confidence>,
    pub data_freshness_sec: f64,
    pub trailing_team: Option<Team>,
    pub trailing_edge_alert: bool,
    #[serde(default)]
    pub api_errors: Vec<ApiError>,
}

impl JournalRecord {
    pub fn new(
        input: &EvaluationInput,
        evaluation: &Evaluation,
        api_errors: &[ApiError],
        config_hash: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let snapshot = &input.snapshot;
        let prediction = evaluation.outcome.prediction();

        let mut record = JournalRecord {
            model_version: MODEL_VERSION.to_string(),
            config_hash: config_hash.to_string(),
            timestamp,
            game_id: snapshot.game_id.clone(),
            home_team: snapshot.home_team.clone(),
            away_team: snapshot.away_team.clone(),
            game_status: snapshot.status,
            score: ScoreLine {
                home: snapshot.home_score,
                away: snapshot.away_score,
            },
            quarter: snapshot.period,
            clock: snapshot.clock.clone(),
            spread: input.spread.map(|s| s.spread),
            minutes_remaining: None,
            minutes_played: None,
            is_overtime: snapshot.is_overtime(),
            is_blowout: false,
            clock_stale: false,
            combined_score: None,
            flip: FlipRecord::default(),
            underdog: UnderdogRecord::default(),
            factors: BTreeMap::new(),
            win_prob: None,
            confidence: None,
            data_freshness_sec: round_to(input.data_age_sec, 1),
            trailing_team: None,
            trailing_edge_alert: false,
            api_errors: api_errors.to_vec(),
        };

        if let Some(p) = prediction {
            record.minutes_remaining = Some(round_to(p.minutes_remaining, 2));
            record.minutes_played = Some(round_to(p.minutes_played, 2));
            record.is_blowout = p.is_blowout;
            record.clock_stale = p.clock_stale;
            record.combined_score = Some(round_to(p.combined_score, 4));
            record.flip = FlipRecord {
                lead_home: p.flip_lead_home.map(|v| round_to(v, 2)),
                swing: p.flip_swing.map(|v| round_to(v, 2)),
            };
            record.underdog = UnderdogRecord {
                team: p.underdog.team,
                win_prob: p.underdog.win_prob.map(|v| round_to(v, 4)),
                watch: p.underdog.watch,
                reason: p.underdog.reason,
                close_to_flip: p.underdog.close_to_flip,
            };
            record.factors = p
                .factors
                .iter()
                .map(|f| (f.name.as_str().to_string(), FactorRecord::from_factor(f)))
                .collect();
            record.win_prob = Some(WinProb {
                home: round_to(p.win_prob_home, 4),
                away: round_to(p.win_prob_away, 4),
            });
            record.confidence = Some(p.confidence);
            record.trailing_team = p.trailing_team;
            record.trailing_edge_alert = p.trailing_edge_alert;
        }
        record
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Append-only writer for daily prediction files.
#[derive(Debug, Clone)]
pub struct PredictionJournal {
    dir: PathBuf,
    config_hash: String,
}

impl PredictionJournal {
    pub fn new(dir: impl Into<PathBuf>, config_hash: impl Into<String>) -> Self {
        PredictionJournal {
            dir: dir.into(),
            config_hash: config_hash.into(),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("predictions_{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Append one evaluation; returns the file written to.
    pub fn record(
        &self,
        input: &EvaluationInput,
        evaluation: &Evaluation,
        api_errors: &[ApiError],
        at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let record = JournalRecord::new(input, evaluation, api_errors, &self.config_hash, at);
        let line = serde_json::to_string(&record).context("serializing journal record")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating journal dir {}", self.dir.display()))?;
        let path = self.path_for(at.date_naive());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        writeln!(file, "{}", line).with_context(|| format!("writing {}", path.display()))?;

        debug!("Journaled {} to {}", record.game_id, path.display());
        Ok(path)
    }

    /// Records from one day's file, newest first, optionally for one game.
    pub fn recent(
        &self,
        date: NaiveDate,
        game_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<JournalRecord>> {
        let mut records = read_predictions(&self.path_for(date))?;
        if let Some(id) = game_id {
            records.retain(|r| r.game_id == id);
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}

/// Read every well-formed record from a journal file. A missing file yields
/// no records; malformed lines are skipped.
pub fn read_predictions(path: &Path) -> Result<Vec<JournalRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let body =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut skipped = 0usize;
    let records: Vec<JournalRecord> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        warn!("{}: skipped {} malformed lines", path.display(), skipped);
    }
    Ok(records)
}
