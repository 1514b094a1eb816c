use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live NBA win-probability model
#[derive(Parser, Debug, Clone)]
#[command(name = "courtside", version, about)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Directory for daily prediction journal files
    #[arg(long, env = "PREDICTION_LOG_DIR", default_value = "logs", global = true)]
    pub log_dir: PathBuf,

    /// JSON file overriding model tunables (missing file = defaults)
    #[arg(long, env = "MODEL_CONFIG", default_value = "config.json", global = true)]
    pub model_config: PathBuf,

    /// Do not write predictions to the journal
    #[arg(long, env = "NO_PREDICTION_LOG", default_value = "false", global = true)]
    pub no_log: bool,

    /// Feed poll interval for `watch` (seconds)
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "30", global = true)]
    pub poll_interval_secs: u64,

    /// Override the data age of every evaluated snapshot (seconds)
    #[arg(long, env = "DATA_AGE_SECS", global = true)]
    pub data_age_secs: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Evaluate a single snapshot from a JSON feed record
    Evaluate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Evaluate every record of a JSON-lines feed in order. Each record's data
    /// age is measured at its own `fetched_at`, so only an explicit
    /// `data_age_sec` (or --data-age-secs) marks it stale.
    Replay {
        #[arg(long)]
        feed: PathBuf,
    },
    /// Poll a JSON-lines feed and evaluate new game states as they arrive
    Watch {
        #[arg(long)]
        feed: PathBuf,
    },
    /// Print today's journal records, newest first
    Recent {
        #[arg(long)]
        game: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

impl Config {
    /// Polling modes see consecutive snapshots of a game, which the
    /// possession-edge factor needs.
    pub fn is_polling(&self) -> bool {
        matches!(self.command, Command::Replay { .. } | Command::Watch { .. })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be at least 1");
        }
        if let Some(age) = self.data_age_secs {
            if !(age >= 0.0 && age.is_finite()) {
                anyhow::bail!("data_age_secs must be a non-negative number");
            }
        }
        if let Command::Recent { limit, .. } = &self.command {
            if *limit == 0 {
                anyhow::bail!("limit must be at least 1");
            }
        }
        Ok(())
    }
}
