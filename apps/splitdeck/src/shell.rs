//! Line-oriented front end: typed commands in, timer output and link
//! notifications out.

use std::fmt::Write as _;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use parking_lot::RwLock;
use splits_share::SplitsIoClient;
use thiserror::Error;
use timer_remote::{
    Action, ConnectionState, Connector, ControlSurface, Dispatched, SharedTimer, SurfaceEvent,
    Timer, TimingMethod, WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::stopwatch::{Stopwatch, TimerPhase};

pub const HELP: &str = "\
commands:
  start | split | splitorstart | reset | togglepause | undo | skip
  initgametime | setgametime TIME | setloadingtimes TIME
  pausegametime | resumegametime
  connect [URL]           open the remote-control link
  disconnect              close the remote-control link
  status                  show the timer and link state
  next | prev             switch comparison
  method real|game        switch timing method
  upload PATH             share a run file on splits.io
  download ID [OUT]       fetch a run from splits.io
  pb USER GAME [OUT]      fetch a runner's personal best
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    /// A vocabulary action, dispatched locally and echoed to the peer.
    Action { name: String, args: Vec<String> },
    Connect(Option<String>),
    Disconnect,
    Status,
    NextComparison,
    PreviousComparison,
    Method(TimingMethod),
    Upload(PathBuf),
    Download { id: String, out: Option<PathBuf> },
    PersonalBest { user: String, game: String, out: Option<PathBuf> },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for ShellCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            return Ok(ShellCommand::Empty);
        };
        let rest: Vec<&str> = tokens.collect();

        if head.parse::<Action>().is_ok() {
            return Ok(ShellCommand::Action {
                name: head.to_string(),
                args: rest.iter().map(|arg| arg.to_string()).collect(),
            });
        }

        let command = match (head, rest.as_slice()) {
            ("connect", []) => ShellCommand::Connect(None),
            ("connect", [url]) => ShellCommand::Connect(Some(url.to_string())),
            ("connect", _) => return Err(ParseCommandError::Usage("connect [URL]")),
            ("disconnect", []) => ShellCommand::Disconnect,
            ("status", []) => ShellCommand::Status,
            ("next", []) => ShellCommand::NextComparison,
            ("prev", []) => ShellCommand::PreviousComparison,
            ("method", ["real"]) => ShellCommand::Method(TimingMethod::RealTime),
            ("method", ["game"]) => ShellCommand::Method(TimingMethod::GameTime),
            ("method", _) => return Err(ParseCommandError::Usage("method real|game")),
            ("upload", [path]) => ShellCommand::Upload(PathBuf::from(path)),
            ("upload", _) => return Err(ParseCommandError::Usage("upload PATH")),
            ("download", [id]) => ShellCommand::Download {
                id: id.to_string(),
                out: None,
            },
            ("download", [id, out]) => ShellCommand::Download {
                id: id.to_string(),
                out: Some(PathBuf::from(out)),
            },
            ("download", _) => return Err(ParseCommandError::Usage("download ID [OUT]")),
            ("pb", [user, game]) => ShellCommand::PersonalBest {
                user: user.to_string(),
                game: game.to_string(),
                out: None,
            },
            ("pb", [user, game, out]) => ShellCommand::PersonalBest {
                user: user.to_string(),
                game: game.to_string(),
                out: Some(PathBuf::from(out)),
            },
            ("pb", _) => return Err(ParseCommandError::Usage("pb USER GAME [OUT]")),
            ("help", _) => ShellCommand::Help,
            ("quit" | "exit", _) => ShellCommand::Quit,
            _ => return Err(ParseCommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

pub type SharedStopwatch = RwLock<Stopwatch>;

/// What a finished splits.io transfer reports back to the shell loop.
pub type JobOutcome = Result<String>;

pub struct Shell<C> {
    surface: ControlSurface<SharedStopwatch, C>,
    splits_io: Arc<SplitsIoClient>,
    default_ws_url: Option<String>,
    jobs: mpsc::UnboundedSender<JobOutcome>,
}

impl<C: Connector> Shell<C> {
    pub fn new(
        surface: ControlSurface<SharedStopwatch, C>,
        splits_io: SplitsIoClient,
        default_ws_url: Option<String>,
        jobs: mpsc::UnboundedSender<JobOutcome>,
    ) -> Self {
        Self {
            surface,
            splits_io: Arc::new(splits_io),
            default_ws_url,
            jobs,
        }
    }

    pub fn surface(&self) -> &ControlSurface<SharedStopwatch, C> {
        &self.surface
    }

    pub async fn next_event(&mut self) -> SurfaceEvent {
        self.surface.next_event().await
    }

    /// Runs one command and returns what to print, if anything.
    ///
    /// `Quit` and `Empty` are handled by the caller and print nothing here.
    /// splits.io transfers run on their own tasks and report through the
    /// jobs channel, so this never waits on the network.
    pub fn execute(&mut self, command: ShellCommand) -> Result<Option<String>> {
        let output = match command {
            ShellCommand::Empty | ShellCommand::Quit => None,
            ShellCommand::Help => Some(HELP.to_string()),
            ShellCommand::Action { name, args } => match self.surface.trigger(&name, &args[..]) {
                Dispatched::Applied { .. } => None,
                Dispatched::Unknown => Some(format!("unknown action '{name}'")),
            },
            ShellCommand::Connect(address) => {
                let address = address
                    .or_else(|| self.default_ws_url.clone())
                    .ok_or_else(|| anyhow!("no address given and no --ws-url configured"))?;
                if self.surface.connect(&address)? {
                    Some(format!("connecting to {address}"))
                } else {
                    Some(format!("connection is {}", self.surface.connection_state()))
                }
            }
            ShellCommand::Disconnect => Some(if self.surface.disconnect() {
                "closing connection".to_string()
            } else {
                "not connected".to_string()
            }),
            ShellCommand::Status => Some(self.status()),
            ShellCommand::NextComparison => {
                self.surface.switch_to_next_comparison();
                Some(format!("comparison: {}", self.surface.snapshot().comparison))
            }
            ShellCommand::PreviousComparison => {
                self.surface.switch_to_previous_comparison();
                Some(format!("comparison: {}", self.surface.snapshot().comparison))
            }
            ShellCommand::Method(method) => {
                self.surface.set_timing_method(method);
                Some(format!("timing method: {method}"))
            }
            ShellCommand::Upload(path) => {
                let started = format!("uploading {}", path.display());
                self.spawn_job(started, upload(self.splits_io.clone(), path))
            }
            ShellCommand::Download { id, out } => {
                let out = out.unwrap_or_else(|| PathBuf::from(format!("{id}.lss")));
                let started = format!("downloading run {id}");
                let splits_io = self.splits_io.clone();
                self.spawn_job(started, async move {
                    let run = splits_io.download_by_id(&id).await?;
                    save_run(&out, &run).await
                })
            }
            ShellCommand::PersonalBest { user, game, out } => {
                let out = out.unwrap_or_else(|| PathBuf::from(format!("{user}-{game}.lss")));
                let started = format!("fetching {user}'s personal best for {game}");
                let splits_io = self.splits_io.clone();
                self.spawn_job(started, async move {
                    let run = splits_io.download_pb_by_username(&user, &game).await?;
                    save_run(&out, &run).await
                })
            }
        };
        Ok(output)
    }

    fn spawn_job<F>(&self, started: String, job: F) -> Option<String>
    where
        F: Future<Output = JobOutcome> + Send + 'static,
    {
        let jobs = self.jobs.clone();
        tokio::spawn(async move {
            if jobs.send(job.await).is_err() {
                debug!(target = "splitdeck.shell", "shell gone before job finished");
            }
        });
        Some(started)
    }

    pub fn disconnect(&mut self) -> bool {
        self.surface.disconnect()
    }

    fn status(&self) -> String {
        let connection = self.surface.connection_state();
        self.surface
            .timer()
            .read_with(|stopwatch| render_status(stopwatch, connection))
    }
}

async fn upload(splits_io: Arc<SplitsIoClient>, path: PathBuf) -> JobOutcome {
    let run = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let claim_uri = splits_io.upload_lss(Bytes::from(run)).await?;
    info!(target = "splitdeck.shell", path = %path.display(), "run shared");
    Ok(format!("uploaded; claim the run at {claim_uri}"))
}

async fn save_run(path: &Path, run: &Bytes) -> Result<String> {
    tokio::fs::write(path, run)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(format!("saved {} bytes to {}", run.len(), path.display()))
}

fn show(time: Option<timer_remote::TimeSpan>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.to_string())
}

pub fn render_status(stopwatch: &Stopwatch, connection: ConnectionState) -> String {
    let phase = match stopwatch.phase() {
        TimerPhase::NotRunning => "not running",
        TimerPhase::Running => "running",
        TimerPhase::Paused => "paused",
        TimerPhase::Ended => "ended",
    };
    let mut out = String::new();
    let _ = writeln!(out, "timer: {phase}  link: {connection}");
    let _ = writeln!(
        out,
        "real time {}  game time {}{}",
        stopwatch.real_time(),
        show(stopwatch.game_time()),
        if stopwatch.is_game_time_paused() { " (paused)" } else { "" }
    );
    let _ = write!(
        out,
        "comparing against {} ({})",
        stopwatch.current_comparison(),
        stopwatch.current_timing_method()
    );
    let method = stopwatch.current_timing_method();
    for (index, segment) in stopwatch.segments().iter().enumerate() {
        let marker = if stopwatch.current_split_index() == Some(index) { '>' } else { ' ' };
        let _ = write!(
            out,
            "\n{marker} {:<16} {:>12} {:>12}",
            segment.name,
            show(segment.split_time.and_then(|t| t.get(method))),
            show(stopwatch.comparison_time(index)),
        );
    }
    out
}

/// What to print for an event coming off the link.
pub fn describe_event(event: &SurfaceEvent) -> String {
    match event {
        SurfaceEvent::Notice(notice) if notice.is_error() => format!("link error: {notice}"),
        SurfaceEvent::Notice(notice) => notice.to_string(),
        SurfaceEvent::Remote {
            outcome: Dispatched::Applied { action, .. },
            ..
        } => format!("peer: {action}"),
        SurfaceEvent::Remote {
            line,
            outcome: Dispatched::Unknown,
        } => format!("peer sent an unknown command: {line}"),
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(config: AppConfig) -> Result<()> {
    let stopwatch = Arc::new(RwLock::new(Stopwatch::numbered(config.segments)));
    let surface = ControlSurface::new(stopwatch, WebSocketConnector);
    let splits_io = SplitsIoClient::new(&config.splits_io_url);
    let (jobs_tx, mut jobs_rx) = mpsc::unbounded_channel();
    let mut shell = Shell::new(surface, splits_io, config.ws_url.clone(), jobs_tx);

    println!("splitdeck: {} segments, type 'help' for commands", config.segments);
    if config.ws_url.is_some() {
        match shell.execute(ShellCommand::Connect(None)) {
            Ok(Some(text)) => println!("{text}"),
            Ok(None) => {}
            Err(err) => eprintln!("error: {err:#}"),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    break;
                };
                let command = match line.parse::<ShellCommand>() {
                    Ok(ShellCommand::Quit) => break,
                    Ok(command) => command,
                    Err(err) => {
                        eprintln!("{err}");
                        continue;
                    }
                };
                match shell.execute(command) {
                    Ok(Some(text)) => println!("{text}"),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(target = "splitdeck.shell", error = %err, "command failed");
                        eprintln!("error: {err:#}");
                    }
                }
            }
            event = shell.next_event() => println!("{}", describe_event(&event)),
            Some(outcome) = jobs_rx.recv() => match outcome {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    warn!(target = "splitdeck.shell", error = %err, "splits.io job failed");
                    eprintln!("error: {err:#}");
                }
            },
        }
    }

    shell.disconnect();
    Ok(())
}
