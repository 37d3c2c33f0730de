use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::ConnectError;

/// Lifecycle of the single outbound remote-control link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        };
        f.write_str(label)
    }
}

/// Events reported by a transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Message(String),
    Failed(String),
    Closed,
}

/// Requests sent to a transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    Send(String),
    Close,
}

/// Event sink handed to a transport, tagged with the link's epoch.
#[derive(Debug, Clone)]
pub struct LinkEvents {
    epoch: u64,
    tx: mpsc::UnboundedSender<(u64, LinkEvent)>,
}

impl LinkEvents {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns false once the owning manager is gone.
    pub fn emit(&self, event: LinkEvent) -> bool {
        self.tx.send((self.epoch, event)).is_ok()
    }
}

/// Handle to one running transport.
pub struct Link {
    commands: mpsc::UnboundedSender<LinkCommand>,
    task: Option<JoinHandle<()>>,
}

impl Link {
    pub fn new(commands: mpsc::UnboundedSender<LinkCommand>, task: Option<JoinHandle<()>>) -> Self {
        Self { commands, task }
    }

    fn send(&self, line: String) -> bool {
        self.commands.send(LinkCommand::Send(line)).is_ok()
    }

    fn close(&self) -> bool {
        self.commands.send(LinkCommand::Close).is_ok()
    }

    fn abort(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Starts transports for the connection manager.
pub trait Connector: Send + Sync {
    fn open(&self, url: Url, events: LinkEvents) -> Link;
}

/// Text-frame WebSocket transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, url: Url, events: LinkEvents) -> Link {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_websocket(url, rx, events));
        Link::new(tx, Some(task))
    }
}

async fn run_websocket(
    url: Url,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: LinkEvents,
) {
    let (ws_stream, _) = match connect_async(url.as_str()).await {
        Ok(connected) => connected,
        Err(err) => {
            warn!(target = "remote.link", url = %url, error = %err, "websocket handshake failed");
            events.emit(LinkEvent::Failed(format!("Failed to connect: {err}")));
            return;
        }
    };
    events.emit(LinkEvent::Opened);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(LinkCommand::Send(line)) => {
                    if let Err(err) = ws_sender.send(Message::Text(line)).await {
                        warn!(target = "remote.link", error = %err, "websocket send failed");
                        events.emit(LinkEvent::Failed(format!("Connection error: {err}")));
                        return;
                    }
                }
                Some(LinkCommand::Close) | None => {
                    if let Err(err) = ws_sender.close().await {
                        debug!(
                            target = "remote.link",
                            error = %err,
                            "websocket close handshake failed"
                        );
                    }
                    break;
                }
            },
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    events.emit(LinkEvent::Message(text));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(target = "remote.link", error = %err, "websocket receive failed");
                    events.emit(LinkEvent::Failed(format!("Connection error: {err}")));
                    return;
                }
            },
        }
    }
    events.emit(LinkEvent::Closed);
}

/// User-facing notices produced by connection transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected,
    Disconnected,
    Error(String),
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Connected => f.write_str("Connected to server"),
            Notification::Disconnected => f.write_str("Closed connection to server"),
            Notification::Error(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Notice(Notification),
    Message(String),
}

/// Validates a user supplied server address.
pub fn parse_address(address: &str) -> Result<Url, ConnectError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ConnectError::EmptyAddress);
    }
    let url = Url::parse(address).map_err(|source| ConnectError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConnectError::UnsupportedScheme(other.to_string())),
    }
}

/// Owns at most one link to a remote peer and its state machine.
///
/// State only changes on calls made by the owner: `connect`, `disconnect`,
/// and the transport events consumed through `next_update`.
pub struct ConnectionManager<C> {
    connector: C,
    state: ConnectionState,
    target: Option<Url>,
    link: Option<Link>,
    epoch: u64,
    reached_open: bool,
    events_tx: mpsc::UnboundedSender<(u64, LinkEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, LinkEvent)>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            state: ConnectionState::Closed,
            target: None,
            link: None,
            epoch: 0,
            reached_open: false,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    /// Starts connecting. Returns `Ok(false)` when a link already exists.
    pub fn connect(&mut self, address: &str) -> Result<bool, ConnectError> {
        if self.state != ConnectionState::Closed {
            debug!(
                target = "remote.link",
                state = %self.state,
                "connect ignored, a link already exists"
            );
            return Ok(false);
        }

        let url = parse_address(address)?;
        self.epoch += 1;
        let events = LinkEvents {
            epoch: self.epoch,
            tx: self.events_tx.clone(),
        };
        info!(
            target = "remote.link",
            url = %url,
            epoch = self.epoch,
            "connecting to remote control server"
        );
        self.link = Some(self.connector.open(url.clone(), events));
        self.target = Some(url);
        self.reached_open = false;
        self.state = ConnectionState::Connecting;
        Ok(true)
    }

    /// Asks the link to close. Returns false when there is nothing to close.
    pub fn disconnect(&mut self) -> bool {
        match self.state {
            ConnectionState::Closed | ConnectionState::Closing => false,
            ConnectionState::Connecting | ConnectionState::Open => {
                self.state = ConnectionState::Closing;
                if let Some(link) = &self.link {
                    if !link.close() {
                        debug!(target = "remote.link", "link task already finished");
                    }
                }
                true
            }
        }
    }

    /// Best-effort send; dropped unless the link is open.
    pub fn send(&self, line: String) -> bool {
        match (&self.link, self.state) {
            (Some(link), ConnectionState::Open) => link.send(line),
            _ => {
                trace!(target = "remote.link", state = %self.state, "dropping outbound message");
                false
            }
        }
    }

    /// Waits for the next transition or message worth reporting.
    pub async fn next_update(&mut self) -> ConnectionUpdate {
        loop {
            let Some((epoch, event)) = self.events_rx.recv().await else {
                // The manager keeps a sender alive, so this never resolves.
                return std::future::pending().await;
            };
            if let Some(update) = self.apply(epoch, event) {
                return update;
            }
        }
    }

    /// Non-blocking variant of [`next_update`](Self::next_update).
    pub fn try_next_update(&mut self) -> Option<ConnectionUpdate> {
        while let Ok((epoch, event)) = self.events_rx.try_recv() {
            if let Some(update) = self.apply(epoch, event) {
                return Some(update);
            }
        }
        None
    }

    fn apply(&mut self, epoch: u64, event: LinkEvent) -> Option<ConnectionUpdate> {
        if epoch != self.epoch || self.link.is_none() {
            trace!(
                target = "remote.link",
                epoch,
                current = self.epoch,
                "ignoring stale link event"
            );
            return None;
        }

        match event {
            LinkEvent::Opened => {
                if self.state != ConnectionState::Connecting {
                    return None;
                }
                self.state = ConnectionState::Open;
                self.reached_open = true;
                info!(target = "remote.link", epoch, "remote control link open");
                Some(ConnectionUpdate::Notice(Notification::Connected))
            }
            LinkEvent::Message(text) => {
                if self.state == ConnectionState::Open {
                    Some(ConnectionUpdate::Message(text))
                } else {
                    None
                }
            }
            LinkEvent::Failed(reason) => {
                warn!(
                    target = "remote.link",
                    epoch,
                    reason = %reason,
                    "remote control link failed"
                );
                self.finish();
                Some(ConnectionUpdate::Notice(Notification::Error(reason)))
            }
            LinkEvent::Closed => {
                let was_open = self.reached_open;
                self.finish();
                info!(target = "remote.link", epoch, was_open, "remote control link closed");
                was_open.then_some(ConnectionUpdate::Notice(Notification::Disconnected))
            }
        }
    }

    fn finish(&mut self) {
        self.state = ConnectionState::Closed;
        self.link = None;
        self.target = None;
        self.reached_open = false;
    }
}

impl<C> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.abort();
        }
    }
}
