//! Game clock parsing and elapsed/remaining time.
//!
//! Regulation is four 12-minute quarters. Each overtime period is modelled
//! on its own as a fresh 5-minute window, so in multi-OT games
//! `minutes_remaining` only covers the current period.

use tracing::warn;

use super::types::{ClockReading, GameStatus};

const QUARTER_MINUTES: f64 = 12.0;
const REGULATION_MINUTES: f64 = 48.0;
const OVERTIME_MINUTES: f64 = 5.0;

/// Minutes remaining and played for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameTime {
    pub minutes_remaining: f64,
    pub minutes_played: f64,
}

impl GameTime {
    /// Time values before tip-off; the clock is ignored.
    pub const PRE_GAME: GameTime = GameTime {
        minutes_remaining: REGULATION_MINUTES,
        minutes_played: 0.0,
    };
}

/// Parse "M:SS", "MM:SS" or "MM:SS.s". Fractional seconds are truncated.
pub fn parse_clock(raw: Option<&str>) -> Option<ClockReading> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let (min_part, sec_part) = raw.split_once(':')?;
    let whole_secs = match sec_part.split_once('.') {
        Some((whole, tenths)) => {
            if !tenths.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            whole
        }
        None => sec_part,
    };
    if !is_digits(min_part) || !is_digits(whole_secs) {
        return None;
    }
    let minutes = min_part.parse().ok()?;
    let seconds = whole_secs.parse().ok()?;
    Some(ClockReading::new(minutes, seconds))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

pub fn time_values(period: u32, clock: ClockReading) -> GameTime {
    let clock_minutes = clock.as_minutes();
    if period <= 4 {
        let quarters_left = (4 - period.max(1)) as f64;
        let minutes_remaining = (quarters_left * QUARTER_MINUTES + clock_minutes).max(0.0);
        GameTime {
            minutes_remaining,
            minutes_played: REGULATION_MINUTES - minutes_remaining,
        }
    } else {
        let ot_period = (period - 4) as f64;
        let ot_clock_elapsed = OVERTIME_MINUTES - clock_minutes;
        GameTime {
            minutes_remaining: (OVERTIME_MINUTES - ot_clock_elapsed).max(0.0),
            minutes_played: REGULATION_MINUTES
                + (ot_period - 1.0) * OVERTIME_MINUTES
                + ot_clock_elapsed,
        }
    }
}

/// Clock used for one evaluation plus the value to carry into the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedClock {
    pub reading: ClockReading,
    /// A fallback value was used during live play
    pub stale: bool,
    /// Last successfully parsed clock for this game
    pub carry: Option<ClockReading>,
}

/// Parse the snapshot clock, falling back to the last known reading (or
/// end-of-period) when it is missing or malformed.
///
/// Only an in-progress game is marked stale by a fallback; at breaks and
/// after the final buzzer a missing clock is expected.
pub fn resolve_clock(
    status: GameStatus,
    raw: Option<&str>,
    last_known: Option<ClockReading>,
) -> ResolvedClock {
    if let Some(reading) = parse_clock(raw) {
        return ResolvedClock {
            reading,
            stale: false,
            carry: Some(reading),
        };
    }

    let stale = status == GameStatus::InProgress;
    let reading = last_known.unwrap_or(ClockReading::END_OF_PERIOD);
    if stale {
        warn!(
            "Unparseable game clock {:?}; using {}:{:02} ({})",
            raw,
            reading.minutes,
            reading.seconds,
            if last_known.is_some() { "last known" } else { "end of period" }
        );
    }
    ResolvedClock {
        reading,
        stale,
        carry: last_known,
    }
}
