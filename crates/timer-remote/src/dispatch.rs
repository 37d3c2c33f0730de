use tracing::debug;

use crate::action::Action;
use crate::connection::{ConnectionManager, Connector};
use crate::timer::{SharedTimer, Timer};
use crate::wire;

/// Where a dispatched command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Issued by the local user; echoed to the peer.
    Local,
    /// Received from the peer; never echoed back.
    Remote,
}

/// Destination for echoed commands.
pub trait Outbound {
    /// Best-effort send. Returns whether the line was handed to a transport.
    fn send_line(&self, line: String) -> bool;
}

impl<C: Connector> Outbound for ConnectionManager<C> {
    fn send_line(&self, line: String) -> bool {
        self.send(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The name is not in the vocabulary; nothing happened.
    Unknown,
    Applied { action: Action, echoed: bool },
}

/// Applies a named command to the shared timer and echoes local ones.
///
/// Exactly one write accessor is taken for a known action and none for an
/// unknown one. Argument problems are handled inside the handler, which
/// leaves the timer untouched.
pub fn dispatch<S, O, A>(
    timer: &S,
    outbound: &O,
    name: &str,
    args: &[A],
    origin: Origin,
) -> Dispatched
where
    S: SharedTimer,
    O: Outbound + ?Sized,
    A: AsRef<str>,
{
    let action: Action = match name.parse() {
        Ok(action) => action,
        Err(err) => {
            debug!(target = "remote.dispatch", ?origin, error = %err, "ignoring command");
            return Dispatched::Unknown;
        }
    };

    let owned: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
    let handler = action.handler();
    timer.write_with(|t| handler(t as &mut dyn Timer, &owned));

    let echoed = match origin {
        Origin::Local => outbound.send_line(wire::encode(name, args)),
        Origin::Remote => false,
    };
    debug!(
        target = "remote.dispatch",
        action = %action,
        ?origin,
        echoed,
        "applied command"
    );
    Dispatched::Applied { action, echoed }
}
