use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use url::Url;

use crate::connection::{Connector, Link, LinkCommand, LinkEvent, LinkEvents};
use crate::dispatch::Outbound;
use crate::timer::{SharedTimer, TimeSpan, Timer, TimingMethod};

struct ScriptedLink {
    events: LinkEvents,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
}

/// Connector whose links are driven by the test.
#[derive(Clone, Default)]
pub(crate) struct ScriptedConnector {
    links: Arc<Mutex<Vec<ScriptedLink>>>,
}

impl ScriptedConnector {
    pub(crate) fn open_count(&self) -> usize {
        self.links.lock().len()
    }

    pub(crate) fn events(&self, index: usize) -> LinkEvents {
        self.links.lock()[index].events.clone()
    }

    /// Emits on the most recently opened link.
    pub(crate) fn emit(&self, event: LinkEvent) {
        let links = self.links.lock();
        let link = links.last().expect("a link was opened");
        link.events.emit(event);
    }

    /// Drains commands queued on the most recently opened link.
    pub(crate) fn take_commands(&self) -> Vec<LinkCommand> {
        let mut links = self.links.lock();
        let Some(link) = links.last_mut() else {
            return Vec::new();
        };
        let mut drained = Vec::new();
        while let Ok(command) = link.commands.try_recv() {
            drained.push(command);
        }
        drained
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, _url: Url, events: LinkEvents) -> Link {
        let (tx, rx) = mpsc::unbounded_channel();
        self.links.lock().push(ScriptedLink {
            events,
            commands: rx,
        });
        Link::new(tx, None)
    }
}

/// Timer that records each call it receives.
#[derive(Debug)]
pub(crate) struct RecordingTimer {
    pub(crate) calls: Vec<String>,
    comparisons: Vec<String>,
    comparison: usize,
    method: TimingMethod,
}

impl Default for RecordingTimer {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            comparisons: vec!["Personal Best".into(), "Best Segments".into()],
            comparison: 0,
            method: TimingMethod::RealTime,
        }
    }
}

impl Timer for RecordingTimer {
    fn current_comparison(&self) -> &str {
        &self.comparisons[self.comparison]
    }

    fn current_timing_method(&self) -> TimingMethod {
        self.method
    }

    fn start(&mut self) {
        self.calls.push("start".into());
    }

    fn split(&mut self) {
        self.calls.push("split".into());
    }

    fn split_or_start(&mut self) {
        self.calls.push("split_or_start".into());
    }

    fn reset(&mut self, update_splits: bool) {
        self.calls.push(format!("reset {update_splits}"));
    }

    fn toggle_pause_or_start(&mut self) {
        self.calls.push("toggle_pause_or_start".into());
    }

    fn undo_split(&mut self) {
        self.calls.push("undo_split".into());
    }

    fn skip_split(&mut self) {
        self.calls.push("skip_split".into());
    }

    fn initialize_game_time(&mut self) {
        self.calls.push("initialize_game_time".into());
    }

    fn set_game_time(&mut self, time: TimeSpan) {
        self.calls.push(format!("set_game_time {time}"));
    }

    fn set_loading_times(&mut self, time: TimeSpan) {
        self.calls.push(format!("set_loading_times {time}"));
    }

    fn pause_game_time(&mut self) {
        self.calls.push("pause_game_time".into());
    }

    fn resume_game_time(&mut self) {
        self.calls.push("resume_game_time".into());
    }

    fn switch_to_previous_comparison(&mut self) {
        let len = self.comparisons.len();
        self.comparison = (self.comparison + len - 1) % len;
    }

    fn switch_to_next_comparison(&mut self) {
        self.comparison = (self.comparison + 1) % self.comparisons.len();
    }

    fn set_current_timing_method(&mut self, method: TimingMethod) {
        self.method = method;
    }
}

/// Shared timer that counts accessor acquisitions.
#[derive(Default)]
pub(crate) struct CountingTimer {
    inner: RwLock<RecordingTimer>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingTimer {
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.inner.read().calls.clone()
    }
}

impl SharedTimer for CountingTimer {
    type Timer = RecordingTimer;

    fn read_with<R>(&self, f: impl FnOnce(&RecordingTimer) -> R) -> R {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_with(f)
    }

    fn write_with<R>(&self, f: impl FnOnce(&mut RecordingTimer) -> R) -> R {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_with(f)
    }
}

/// Outbound sink that keeps every line it is given.
#[derive(Default)]
pub(crate) struct RecordingOutbound {
    pub(crate) open: bool,
    pub(crate) lines: Mutex<Vec<String>>,
}

impl RecordingOutbound {
    pub(crate) fn open() -> Self {
        Self {
            open: true,
            lines: Mutex::default(),
        }
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl Outbound for RecordingOutbound {
    fn send_line(&self, line: String) -> bool {
        if !self.open {
            return false;
        }
        self.lines.lock().push(line);
        true
    }
}
