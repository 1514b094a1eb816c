use crate::model::types::{GameSnapshot, PredictionResult, Team};
use crate::model::{Evaluation, ModelConfig};

/// One human-readable line per evaluation, e.g.
/// `PHX @ DEN 66-71 Q3 8:12 | home 71.4% away 28.6% | High`.
pub fn summary_line(snapshot: &GameSnapshot, evaluation: &Evaluation, config: &ModelConfig) -> String {
    let header = format!(
        "{} @ {} {}-{} {} {}",
        snapshot.away_team,
        snapshot.home_team,
        snapshot.away_score,
        snapshot.home_score,
        snapshot.period_label(),
        snapshot.clock.as_deref().unwrap_or("--:--"),
    );
    match evaluation.outcome.prediction() {
        Some(p) => format!("{} | {}{}", header, probabilities(p), flags(snapshot, p, config)),
        None => format!("{} | awaiting tip-off (no spread)", header),
    }
}

fn probabilities(p: &PredictionResult) -> String {
    format!(
        "home {:.1}% away {:.1}% | {}",
        p.win_prob_home * 100.0,
        p.win_prob_away * 100.0,
        p.confidence.as_str()
    )
}

fn flags(snapshot: &GameSnapshot, p: &PredictionResult, config: &ModelConfig) -> String {
    let team_name = |team: Team| match team {
        Team::Home => snapshot.home_team.as_str(),
        Team::Away => snapshot.away_team.as_str(),
    };

    let mut out = String::new();
    if p.is_blowout {
        out.push_str(" | BLOWOUT");
    }
    if p.clock_stale {
        out.push_str(" | stale clock");
    }
    if let (true, Some(team)) = (p.trailing_edge_alert, p.trailing_team) {
        out.push_str(&format!(" | trailing edge: {}", team_name(team)));
    }
    if let (true, Some(team)) = (p.underdog.watch, p.underdog.team) {
        let reason = p
            .underdog
            .reason
            .map(|r| r.describe(config))
            .unwrap_or_default();
        out.push_str(&format!(" | underdog watch: {} ({})", team_name(team), reason));
    }
    if p.underdog.close_to_flip {
        if let Some(swing) = p.flip_swing {
            out.push_str(&format!(" | close to flip ({:+.1})", swing));
        }
    }
    out
}
