//! Remote control for a shared split timer.
//!
//! Local commands and commands received from a peer over a WebSocket link
//! go through the same handler table. Local ones are echoed to the peer,
//! remote ones never are.
//!
//! - [`action`]: the closed command vocabulary and its handlers
//! - [`wire`]: single-line text encoding
//! - [`connection`]: the single outbound link and its state machine
//! - [`dispatch`]: applies commands under the timer's scoped accessors
//! - [`surface`]: the facade a host UI drives

pub mod action;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod surface;
pub mod timer;
pub mod wire;

#[cfg(test)]
mod testing;

pub use action::{Action, Command, UnknownAction, WriteHandler};
pub use connection::{
    parse_address, ConnectionManager, ConnectionState, ConnectionUpdate, Connector, Link,
    LinkCommand, LinkEvent, LinkEvents, Notification, WebSocketConnector,
};
pub use dispatch::{dispatch, Dispatched, Origin, Outbound};
pub use error::ConnectError;
pub use surface::{ControlSurface, SurfaceEvent};
pub use timer::{ParseTimeSpanError, SharedTimer, TimeSpan, Timer, TimerSnapshot, TimingMethod};
