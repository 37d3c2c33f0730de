use std::sync::Arc;

use tracing::debug;

use crate::connection::{
    ConnectionManager, ConnectionState, ConnectionUpdate, Connector, Notification,
};
use crate::dispatch::{dispatch, Dispatched, Origin};
use crate::error::ConnectError;
use crate::timer::{SharedTimer, Timer, TimerSnapshot, TimingMethod};
use crate::wire;

/// Something the host should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Notice(Notification),
    /// A peer message that was decoded and dispatched.
    Remote { line: String, outcome: Dispatched },
}

/// Host-facing control surface: local commands, a display snapshot, and the
/// remote-control link, all against one shared timer.
pub struct ControlSurface<S, C> {
    timer: Arc<S>,
    connection: ConnectionManager<C>,
}

impl<S, C> ControlSurface<S, C>
where
    S: SharedTimer,
    C: Connector,
{
    pub fn new(timer: Arc<S>, connector: C) -> Self {
        Self {
            timer,
            connection: ConnectionManager::new(connector),
        }
    }

    pub fn timer(&self) -> &Arc<S> {
        &self.timer
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Runs a command issued by the local user and echoes it to the peer.
    pub fn trigger<A: AsRef<str>>(&self, name: &str, args: &[A]) -> Dispatched {
        dispatch(self.timer.as_ref(), &self.connection, name, args, Origin::Local)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::capture(self.timer.as_ref())
    }

    pub fn switch_to_previous_comparison(&self) {
        self.timer.write_with(|t| t.switch_to_previous_comparison());
    }

    pub fn switch_to_next_comparison(&self) {
        self.timer.write_with(|t| t.switch_to_next_comparison());
    }

    pub fn set_timing_method(&self, method: TimingMethod) {
        self.timer.write_with(|t| t.set_current_timing_method(method));
    }

    pub fn connect(&mut self, address: &str) -> Result<bool, ConnectError> {
        self.connection.connect(address)
    }

    pub fn disconnect(&mut self) -> bool {
        self.connection.disconnect()
    }

    /// Waits for the next notice, applying peer commands as they arrive.
    pub async fn next_event(&mut self) -> SurfaceEvent {
        match self.connection.next_update().await {
            ConnectionUpdate::Notice(notice) => SurfaceEvent::Notice(notice),
            ConnectionUpdate::Message(line) => self.apply_remote(line),
        }
    }

    pub fn try_next_event(&mut self) -> Option<SurfaceEvent> {
        match self.connection.try_next_update()? {
            ConnectionUpdate::Notice(notice) => Some(SurfaceEvent::Notice(notice)),
            ConnectionUpdate::Message(line) => Some(self.apply_remote(line)),
        }
    }

    fn apply_remote(&self, line: String) -> SurfaceEvent {
        let (name, args) = wire::split(&line);
        let outcome = dispatch(
            self.timer.as_ref(),
            &self.connection,
            name,
            &args[..],
            Origin::Remote,
        );
        if outcome == Dispatched::Unknown {
            debug!(target = "remote.dispatch", line = %line, "peer sent an unknown command");
        }
        SurfaceEvent::Remote { line, outcome }
    }
}
