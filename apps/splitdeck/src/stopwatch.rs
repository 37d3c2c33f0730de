//! In-memory split timer driven by the shell and the remote link.

use std::sync::Arc;
use std::time::Instant;

use time::Duration;
use timer_remote::{TimeSpan, Timer, TimingMethod};
use tracing::debug;

pub const COMPARISONS: [&str; 2] = ["Personal Best", "Best Segments"];

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    NotRunning,
    Running,
    Paused,
    Ended,
}

/// Times recorded for one split, per clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitTime {
    pub real_time: TimeSpan,
    pub game_time: Option<TimeSpan>,
}

impl SplitTime {
    pub fn get(&self, method: TimingMethod) -> Option<TimeSpan> {
        match method {
            TimingMethod::RealTime => Some(self.real_time),
            TimingMethod::GameTime => self.game_time,
        }
    }

    fn since(self, earlier: SplitTime) -> SplitTime {
        SplitTime {
            real_time: sub(self.real_time, earlier.real_time),
            game_time: self
                .game_time
                .zip(earlier.game_time)
                .map(|(now, then)| sub(now, then)),
        }
    }

    fn min(self, other: SplitTime) -> SplitTime {
        let game_time = match (self.game_time, other.game_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        SplitTime {
            real_time: self.real_time.min(other.real_time),
            game_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    /// Cumulative time at which this segment was split in the current attempt.
    pub split_time: Option<SplitTime>,
    pub personal_best: Option<SplitTime>,
    /// Fastest duration of this segment alone.
    pub best_segment: Option<SplitTime>,
}

impl Segment {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            split_time: None,
            personal_best: None,
            best_segment: None,
        }
    }
}

pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    segments: Vec<Segment>,
    phase: TimerPhase,
    current_split: usize,
    running_since: Option<Instant>,
    accumulated: Duration,
    game_time_initialized: bool,
    loading_times: Duration,
    frozen_game_time: Option<Duration>,
    comparison: usize,
    timing_method: TimingMethod,
}

impl Stopwatch {
    /// A run of `count` segments named "Segment 1", "Segment 2", ...
    pub fn numbered(count: usize) -> Self {
        Self::new((1..=count.max(1)).map(|i| format!("Segment {i}")))
    }

    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::with_clock(names, Arc::new(SystemClock))
    }

    pub fn with_clock<I, N>(names: I, clock: Arc<dyn Clock>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut segments: Vec<Segment> = names.into_iter().map(Segment::new).collect();
        if segments.is_empty() {
            segments.push(Segment::new("Segment 1"));
        }
        Self {
            clock,
            segments,
            phase: TimerPhase::NotRunning,
            current_split: 0,
            running_since: None,
            accumulated: Duration::ZERO,
            game_time_initialized: false,
            loading_times: Duration::ZERO,
            frozen_game_time: None,
            comparison: 0,
            timing_method: TimingMethod::RealTime,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Index of the segment being timed, if an attempt is in progress.
    pub fn current_split_index(&self) -> Option<usize> {
        match self.phase {
            TimerPhase::Running | TimerPhase::Paused => Some(self.current_split),
            TimerPhase::NotRunning | TimerPhase::Ended => None,
        }
    }

    pub fn is_game_time_paused(&self) -> bool {
        self.frozen_game_time.is_some()
    }

    pub fn real_time(&self) -> TimeSpan {
        TimeSpan::from_duration(self.real_duration())
    }

    pub fn game_time(&self) -> Option<TimeSpan> {
        self.game_duration().map(TimeSpan::from_duration)
    }

    /// Current time on the active clock.
    pub fn current_time(&self) -> Option<TimeSpan> {
        match self.timing_method {
            TimingMethod::RealTime => Some(self.real_time()),
            TimingMethod::GameTime => self.game_time(),
        }
    }

    /// Time the active comparison expects at the end of segment `index`.
    pub fn comparison_time(&self, index: usize) -> Option<TimeSpan> {
        let method = self.timing_method;
        match self.comparison {
            0 => self.segments.get(index)?.personal_best?.get(method),
            _ => {
                let mut total = Duration::ZERO;
                for segment in self.segments.get(..=index)? {
                    total = total.saturating_add(segment.best_segment?.get(method)?.duration());
                }
                Some(TimeSpan::from_duration(total))
            }
        }
    }

    fn real_duration(&self) -> Duration {
        match self.running_since {
            Some(since) => {
                let elapsed = self.clock.now().saturating_duration_since(since);
                self.accumulated
                    .saturating_add(Duration::try_from(elapsed).unwrap_or(Duration::MAX))
            }
            None => self.accumulated,
        }
    }

    fn game_duration(&self) -> Option<Duration> {
        if !self.game_time_initialized {
            return None;
        }
        Some(
            self.frozen_game_time
                .unwrap_or_else(|| self.real_duration().saturating_sub(self.loading_times)),
        )
    }

    fn now_split_time(&self) -> SplitTime {
        SplitTime {
            real_time: self.real_time(),
            game_time: self.game_time(),
        }
    }

    fn update_best_segments(&mut self) {
        let mut previous = Some(SplitTime {
            real_time: TimeSpan::ZERO,
            game_time: Some(TimeSpan::ZERO),
        });
        for segment in &mut self.segments {
            match (segment.split_time, previous) {
                (Some(split), Some(prev)) => {
                    let duration = split.since(prev);
                    segment.best_segment = Some(match segment.best_segment {
                        Some(best) => best.min(duration),
                        None => duration,
                    });
                    previous = Some(split);
                }
                (split, _) => previous = split,
            }
        }
    }

    fn update_personal_best(&mut self) {
        let method = self.timing_method;
        let Some(last) = self.segments.last() else {
            return;
        };
        let Some(final_time) = last
            .split_time
            .and_then(|t| t.get(method).or(Some(t.real_time)))
        else {
            return;
        };
        let improved = match last.personal_best.and_then(|t| t.get(method).or(Some(t.real_time))) {
            Some(pb) => final_time < pb,
            None => true,
        };
        if improved {
            debug!(target = "splitdeck.timer", final_time = %final_time, "new personal best");
            for segment in &mut self.segments {
                segment.personal_best = segment.split_time;
            }
        }
    }
}

impl Timer for Stopwatch {
    fn current_comparison(&self) -> &str {
        COMPARISONS[self.comparison]
    }

    fn current_timing_method(&self) -> TimingMethod {
        self.timing_method
    }

    fn start(&mut self) {
        if self.phase != TimerPhase::NotRunning {
            return;
        }
        self.phase = TimerPhase::Running;
        self.current_split = 0;
        self.accumulated = Duration::ZERO;
        self.running_since = Some(self.clock.now());
        self.loading_times = Duration::ZERO;
        self.frozen_game_time = None;
    }

    fn split(&mut self) {
        if self.phase != TimerPhase::Running {
            return;
        }
        let time = self.now_split_time();
        self.segments[self.current_split].split_time = Some(time);
        self.current_split += 1;
        if self.current_split == self.segments.len() {
            self.accumulated = self.real_duration();
            self.running_since = None;
            self.phase = TimerPhase::Ended;
        }
    }

    fn split_or_start(&mut self) {
        match self.phase {
            TimerPhase::NotRunning => self.start(),
            _ => self.split(),
        }
    }

    fn reset(&mut self, update_splits: bool) {
        if self.phase == TimerPhase::NotRunning {
            return;
        }
        if update_splits {
            self.update_best_segments();
            if self.phase == TimerPhase::Ended {
                self.update_personal_best();
            }
        }
        for segment in &mut self.segments {
            segment.split_time = None;
        }
        self.phase = TimerPhase::NotRunning;
        self.current_split = 0;
        self.running_since = None;
        self.accumulated = Duration::ZERO;
        self.game_time_initialized = false;
        self.loading_times = Duration::ZERO;
        self.frozen_game_time = None;
    }

    fn toggle_pause_or_start(&mut self) {
        match self.phase {
            TimerPhase::NotRunning => self.start(),
            TimerPhase::Running => {
                self.accumulated = self.real_duration();
                self.running_since = None;
                self.phase = TimerPhase::Paused;
            }
            TimerPhase::Paused => {
                self.running_since = Some(self.clock.now());
                self.phase = TimerPhase::Running;
            }
            TimerPhase::Ended => {}
        }
    }

    fn undo_split(&mut self) {
        if self.phase == TimerPhase::NotRunning || self.current_split == 0 {
            return;
        }
        if self.phase == TimerPhase::Ended {
            self.running_since = Some(self.clock.now());
            self.phase = TimerPhase::Running;
        }
        self.current_split -= 1;
        self.segments[self.current_split].split_time = None;
    }

    fn skip_split(&mut self) {
        let in_progress = matches!(self.phase, TimerPhase::Running | TimerPhase::Paused);
        if !in_progress || self.current_split + 1 >= self.segments.len() {
            return;
        }
        self.segments[self.current_split].split_time = None;
        self.current_split += 1;
    }

    fn initialize_game_time(&mut self) {
        self.game_time_initialized = true;
    }

    fn set_game_time(&mut self, time: TimeSpan) {
        self.game_time_initialized = true;
        match self.frozen_game_time {
            Some(_) => self.frozen_game_time = Some(time.duration()),
            None => self.loading_times = self.real_duration().saturating_sub(time.duration()),
        }
    }

    fn set_loading_times(&mut self, time: TimeSpan) {
        self.loading_times = time.duration();
        if self.frozen_game_time.is_some() {
            self.frozen_game_time = Some(self.real_duration().saturating_sub(self.loading_times));
        }
    }

    fn pause_game_time(&mut self) {
        if self.frozen_game_time.is_none() {
            self.frozen_game_time = self.game_duration();
        }
    }

    fn resume_game_time(&mut self) {
        if let Some(frozen) = self.frozen_game_time.take() {
            self.loading_times = self.real_duration().saturating_sub(frozen);
        }
    }

    fn switch_to_previous_comparison(&mut self) {
        self.comparison = (self.comparison + COMPARISONS.len() - 1) % COMPARISONS.len();
    }

    fn switch_to_next_comparison(&mut self) {
        self.comparison = (self.comparison + 1) % COMPARISONS.len();
    }

    fn set_current_timing_method(&mut self, method: TimingMethod) {
        self.timing_method = method;
    }
}

fn sub(a: TimeSpan, b: TimeSpan) -> TimeSpan {
    TimeSpan::from_duration(a.duration().saturating_sub(b.duration()))
}
