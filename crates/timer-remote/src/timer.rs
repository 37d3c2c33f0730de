use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use thiserror::Error;
use time::Duration;

/// Which clock a timer reports and compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingMethod {
    RealTime,
    GameTime,
}

impl fmt::Display for TimingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingMethod::RealTime => f.write_str("Real Time"),
            TimingMethod::GameTime => f.write_str("Game Time"),
        }
    }
}

/// Signed span of time carried by game-time commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeSpan(Duration);

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan(Duration::ZERO);

    pub fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for TimeSpan {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTimeSpanError {
    #[error("time span is empty")]
    Empty,
    #[error("time span has more than three components")]
    TooManyComponents,
    #[error("invalid time component '{0}'")]
    InvalidNumber(String),
    #[error("invalid fractional seconds '{0}'")]
    InvalidFraction(String),
    #[error("time span is out of range")]
    OutOfRange,
}

impl FromStr for TimeSpan {
    type Err = ParseTimeSpanError;

    /// Accepts `[-][[h:]m:]s[.fraction]`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        if body.is_empty() {
            return Err(ParseTimeSpanError::Empty);
        }

        let mut components = body.rsplit(':');
        let seconds = components.next().unwrap_or_default();
        let minutes = components.next();
        let hours = components.next();
        if components.next().is_some() {
            return Err(ParseTimeSpanError::TooManyComponents);
        }

        let (whole, fraction) = match seconds.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (seconds, None),
        };

        let mut total_secs = parse_component(whole)?;
        if let Some(minutes) = minutes {
            total_secs = parse_component(minutes)?
                .checked_mul(60)
                .and_then(|m| m.checked_add(total_secs))
                .ok_or(ParseTimeSpanError::OutOfRange)?;
        }
        if let Some(hours) = hours {
            total_secs = parse_component(hours)?
                .checked_mul(3600)
                .and_then(|h| h.checked_add(total_secs))
                .ok_or(ParseTimeSpanError::OutOfRange)?;
        }

        let nanos = match fraction {
            Some(fraction) => parse_fraction(fraction)?,
            None => 0,
        };

        let secs = i64::try_from(total_secs).map_err(|_| ParseTimeSpanError::OutOfRange)?;
        let duration = if negative {
            Duration::new(-secs, -nanos)
        } else {
            Duration::new(secs, nanos)
        };
        Ok(TimeSpan(duration))
    }
}

fn parse_component(text: &str) -> Result<u64, ParseTimeSpanError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseTimeSpanError::InvalidNumber(text.to_string()));
    }
    text.parse()
        .map_err(|_| ParseTimeSpanError::OutOfRange)
}

fn parse_fraction(text: &str) -> Result<i32, ParseTimeSpanError> {
    if text.is_empty() || text.len() > 9 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseTimeSpanError::InvalidFraction(text.to_string()));
    }
    let digits: i32 = text
        .parse()
        .map_err(|_| ParseTimeSpanError::InvalidFraction(text.to_string()))?;
    Ok(digits * 10_i32.pow(9 - text.len() as u32))
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0.is_negative() { "-" } else { "" };
        let abs = self.0.abs();
        let total = abs.whole_seconds();
        let hours = total / 3600;
        let minutes = (total / 60) % 60;
        let seconds = total % 60;
        let millis = abs.subsec_milliseconds();
        if hours > 0 {
            write!(f, "{sign}{hours}:{minutes:02}:{seconds:02}.{millis:03}")
        } else {
            write!(f, "{sign}{minutes}:{seconds:02}.{millis:03}")
        }
    }
}

/// The timing engine surface this crate drives.
///
/// Read methods are reachable through [`SharedTimer::read_with`], everything
/// taking `&mut self` only through [`SharedTimer::write_with`].
pub trait Timer {
    fn current_comparison(&self) -> &str;
    fn current_timing_method(&self) -> TimingMethod;

    fn start(&mut self);
    fn split(&mut self);
    fn split_or_start(&mut self);
    fn reset(&mut self, update_splits: bool);
    fn toggle_pause_or_start(&mut self);
    fn undo_split(&mut self);
    fn skip_split(&mut self);
    fn initialize_game_time(&mut self);
    fn set_game_time(&mut self, time: TimeSpan);
    fn set_loading_times(&mut self, time: TimeSpan);
    fn pause_game_time(&mut self);
    fn resume_game_time(&mut self);
    fn switch_to_previous_comparison(&mut self);
    fn switch_to_next_comparison(&mut self);
    fn set_current_timing_method(&mut self, method: TimingMethod);
}

/// A timer owned by the host and lent out one scoped accessor at a time.
///
/// The accessor only lives for the duration of the closure, so callers
/// cannot hold on to it after the call returns.
pub trait SharedTimer: Send + Sync {
    type Timer: Timer + 'static;

    fn read_with<R>(&self, f: impl FnOnce(&Self::Timer) -> R) -> R;
    fn write_with<R>(&self, f: impl FnOnce(&mut Self::Timer) -> R) -> R;
}

impl<T> SharedTimer for RwLock<T>
where
    T: Timer + Send + Sync + 'static,
{
    type Timer = T;

    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.read();
        f(&*guard)
    }

    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.write();
        f(&mut *guard)
    }
}

/// What a host shows next to the timer: the active comparison and clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub comparison: String,
    pub timing_method: TimingMethod,
}

impl TimerSnapshot {
    pub fn capture<S: SharedTimer>(timer: &S) -> Self {
        timer.read_with(|t| TimerSnapshot {
            comparison: t.current_comparison().to_string(),
            timing_method: t.current_timing_method(),
        })
    }
}
