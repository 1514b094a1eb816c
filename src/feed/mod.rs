pub mod source;

pub use source::{JsonlFileSource, SnapshotSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::model::types::{
    GameSnapshot, GameStatus, SeasonAverages, SeasonStats, SpreadInfo, TeamBoxScore,
};
use crate::model::{EvaluationInput, ModelConfig};

/// A failed upstream call, carried through to the prediction journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub source: String,
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Game line as a provider reports it. `status` may be omitted, in which case
/// it is derived from `raw_status`, period and clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedGame {
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    pub home_score: u32,
    pub away_score: u32,
    pub period: u32,
    #[serde(default)]
    pub clock: Option<String>,
    #[serde(default)]
    pub status: Option<GameStatus>,
    #[serde(default)]
    pub raw_status: Option<String>,
}

impl FeedGame {
    pub fn status(&self) -> GameStatus {
        self.status.unwrap_or_else(|| {
            GameStatus::derive(
                self.raw_status.as_deref().unwrap_or_default(),
                self.period,
                self.clock.as_deref(),
            )
        })
    }

    pub fn to_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id.clone(),
            home_team: self.home_team.clone().unwrap_or_else(|| "Home".into()),
            away_team: self.away_team.clone().unwrap_or_else(|| "Away".into()),
            home_score: self.home_score,
            away_score: self.away_score,
            period: self.period,
            clock: self.clock.clone(),
            status: self.status(),
        }
    }
}

/// One line of a game-data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// When the provider data was fetched
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
    pub game: FeedGame,
    /// Home-perspective pre-game spread
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub spread_fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_box: TeamBoxScore,
    #[serde(default)]
    pub away_box: TeamBoxScore,
    #[serde(default)]
    pub home_season: Option<SeasonAverages>,
    #[serde(default)]
    pub away_season: Option<SeasonAverages>,
    /// Explicit data age; overrides the age derived from `fetched_at`
    #[serde(default)]
    pub data_age_sec: Option<f64>,
    #[serde(default)]
    pub api_errors: Vec<ApiError>,
}

impl FeedRecord {
    pub fn data_age_sec(&self, now: DateTime<Utc>) -> f64 {
        if let Some(age) = self.data_age_sec {
            return age.max(0.0);
        }
        match self.fetched_at {
            Some(at) => ((now - at).num_milliseconds() as f64 / 1000.0).max(0.0),
            None => 0.0,
        }
    }

    /// Build the model input. Missing season averages fall back to the league
    /// average; the last-known clock is left for the caller to fill in.
    pub fn to_input(&self, config: &ModelConfig, now: DateTime<Utc>) -> EvaluationInput {
        let season = |averages: &Option<SeasonAverages>| match averages {
            Some(a) => SeasonStats::from_season_averages(a, config),
            None => SeasonStats::league_average(config),
        };
        EvaluationInput {
            snapshot: self.game.to_snapshot(),
            spread: self.spread.map(|spread| SpreadInfo {
                spread,
                fetched_at: self.spread_fetched_at.or(self.fetched_at).unwrap_or(now),
            }),
            home_box: self.home_box,
            away_box: self.away_box,
            home_season: season(&self.home_season),
            away_season: season(&self.away_season),
            last_known_clock: None,
            data_age_sec: self.data_age_sec(now),
        }
    }

    /// Build the model input for a historical feed, judged as of the record's
    /// own fetch time. Only an explicit `data_age_sec` makes it stale.
    pub fn replay_input(&self, config: &ModelConfig) -> EvaluationInput {
        self.to_input(config, self.fetched_at.unwrap_or_else(Utc::now))
    }

    /// Identity of the game state, ignoring fetch timestamps and errors.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(&(&self.game, &self.home_box, &self.away_box, self.spread))
            .unwrap_or_default()
    }
}

/// Keep only the last record per game, in order of first appearance.
fn latest_per_game(records: Vec<FeedRecord>) -> Vec<FeedRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, FeedRecord> = HashMap::new();
    for record in records {
        let id = record.game.game_id.clone();
        if latest.insert(id.clone(), record).is_none() {
            order.push(id);
        }
    }
    order
        .into_iter()
        .filter_map(|id| latest.remove(&id))
        .collect()
}

/// Spawns a background task that polls `source` at the configured interval
/// and sends each game's newest record through the returned channel whenever
/// its state changed since the previous poll.
///
/// A game is sent once more when it reaches `Final` and ignored afterwards.
/// The task stops when the receiver is dropped.
pub fn start_feed_monitor(
    source: Arc<dyn SnapshotSource>,
    poll_interval: Duration,
) -> mpsc::Receiver<FeedRecord> {
    let (tx, rx) = mpsc::channel(1024);

    tokio::spawn(async move {
        info!(
            "Feed monitor started (source={}, interval={:?})",
            source.name(),
            poll_interval
        );

        // game_id -> fingerprint of the last record sent
        let mut fingerprints: HashMap<String, String> = HashMap::new();
        let mut finished: HashSet<String> = HashSet::new();
        let mut last_seen: HashMap<String, tokio::time::Instant> = HashMap::new();
        let fetch_timeout = poll_interval.min(Duration::from_secs(2));
        let stale_after = Duration::from_secs(6 * 60 * 60);
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if tx.is_closed() {
                info!("Feed monitor stopping: receiver dropped");
                break;
            }

            let records = match tokio::time::timeout(fetch_timeout, source.fetch_records()).await
            {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    warn!("Source '{}' failed: {:#}", source.name(), e);
                    continue;
                }
                Err(_) => {
                    warn!(
                        "Source '{}' timed out after {:?}",
                        source.name(),
                        fetch_timeout
                    );
                    continue;
                }
            };

            let now = tokio::time::Instant::now();
            for record in latest_per_game(records) {
                let id = record.game.game_id.clone();
                last_seen.insert(id.clone(), now);
                if finished.contains(&id) {
                    continue;
                }

                let fingerprint = record.fingerprint();
                if fingerprints.get(&id) == Some(&fingerprint) {
                    continue;
                }
                if record.game.status() == GameStatus::Final {
                    fingerprints.remove(&id);
                    finished.insert(id.clone());
                    info!("Game {} final, no further updates", id);
                } else {
                    fingerprints.insert(id.clone(), fingerprint);
                }

                debug!(
                    "Feed update: {} {}-{} P{} {} ({})",
                    id,
                    record.game.home_score,
                    record.game.away_score,
                    record.game.period,
                    record.game.clock.as_deref().unwrap_or("-"),
                    record.game.status().as_str()
                );
                if let Err(e) = tx.try_send(record) {
                    error!("Feed channel full, record DROPPED: {}", e);
                }
            }

            // Prune games the source stopped reporting
            let stale_ids: Vec<String> = last_seen
                .iter()
                .filter(|(_, seen)| seen.elapsed() > stale_after)
                .map(|(id, _)| id.clone())
                .collect();
            for id in stale_ids {
                last_seen.remove(&id);
                fingerprints.remove(&id);
                finished.remove(&id);
            }
        }
    });

    rx
}
