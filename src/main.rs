use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod config;
mod feed;
mod journal;
mod model;
mod report;
mod tracker;

use config::{Command, Config};
use feed::{start_feed_monitor, FeedRecord, JsonlFileSource, SnapshotSource};
use journal::PredictionJournal;
use model::{Evaluation, EvaluationInput, ModelConfig};
use tracker::ClockTracker;

/// Evaluation state for one run: model tunables, per-game clocks and the
/// optional journal.
struct Session {
    model: ModelConfig,
    tracker: ClockTracker,
    journal: Option<PredictionJournal>,
    data_age_override: Option<f64>,
}

impl Session {
    /// Evaluate a live record, aged against the wall clock.
    fn process(&mut self, record: &FeedRecord) -> Evaluation {
        let input = record.to_input(&self.model, Utc::now());
        self.process_input(record, input)
    }

    fn process_input(&mut self, record: &FeedRecord, mut input: EvaluationInput) -> Evaluation {
        let now = Utc::now();
        if let Some(age) = self.data_age_override {
            input.data_age_sec = age;
        }

        let evaluation = self.tracker.evaluate(input.clone(), &self.model);
        info!(
            "{}",
            report::summary_line(&input.snapshot, &evaluation, &self.model)
        );
        for e in &record.api_errors {
            warn!("{} upstream error ({:?}): {}", e.source, e.code, e.message);
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(&input, &evaluation, &record.api_errors, now) {
                error!(
                    "Failed to journal prediction for {}: {:#}",
                    input.snapshot.game_id, e
                );
            }
        }
        evaluation
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let model_config =
        ModelConfig::load(&config.model_config).with_possession_edge(config.is_polling());
    model_config.validate()?;
    let config_hash = model_config.hash();
    info!(
        "courtside v{} (config {}, possession edge {})",
        journal::MODEL_VERSION,
        config_hash,
        if model_config.possession_edge_enabled {
            "on"
        } else {
            "off"
        }
    );

    let journal = PredictionJournal::new(&config.log_dir, config_hash);
    let mut session = Session {
        model: model_config,
        tracker: ClockTracker::new(),
        journal: (!config.no_log).then(|| journal.clone()),
        data_age_override: config.data_age_secs,
    };

    match &config.command {
        Command::Evaluate { input } => run_evaluate(&mut session, input).await,
        Command::Replay { feed } => run_replay(&mut session, feed).await,
        Command::Watch { feed } => {
            let interval = Duration::from_secs(config.poll_interval_secs);
            run_watch(&mut session, feed, interval).await
        }
        Command::Recent { game, limit } => {
            let records = journal.recent(Utc::now().date_naive(), game.as_deref(), *limit)?;
            if records.is_empty() {
                info!("No predictions logged today in {}", config.log_dir.display());
            }
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(())
        }
    }
}

async fn run_evaluate(session: &mut Session, path: &Path) -> Result<()> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let record: FeedRecord = serde_json::from_str(&body)
        .with_context(|| format!("parsing feed record {}", path.display()))?;

    let evaluation = session.process(&record);
    println!("{}", serde_json::to_string_pretty(&evaluation.outcome)?);
    Ok(())
}

async fn run_replay(session: &mut Session, path: &Path) -> Result<()> {
    let records = JsonlFileSource::new(path).fetch_records().await?;
    if records.is_empty() {
        anyhow::bail!("no usable records in {}", path.display());
    }

    let mut games = HashSet::new();
    for record in &records {
        games.insert(record.game.game_id.clone());
        let input = record.replay_input(&session.model);
        let evaluation = session.process_input(record, input);
        println!("{}", serde_json::to_string(&evaluation.outcome)?);
    }
    info!(
        "Replayed {} records across {} game(s)",
        records.len(),
        games.len()
    );
    Ok(())
}

async fn run_watch(session: &mut Session, path: &Path, poll_interval: Duration) -> Result<()> {
    let source: Arc<dyn SnapshotSource> = Arc::new(JsonlFileSource::new(path));
    let mut rx = start_feed_monitor(source, poll_interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(record) => {
                    session.process(&record);
                }
                None => {
                    warn!("Feed monitor stopped");
                    break;
                }
            },
            res = &mut shutdown => {
                if let Err(e) = res {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down ({} game(s) tracked)", session.tracker.len());
                break;
            }
        }
    }
    Ok(())
}
