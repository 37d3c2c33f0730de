use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::timer::{TimeSpan, Timer};

/// Handler applied to the write accessor of the shared timer.
pub type WriteHandler = fn(&mut dyn Timer, &[String]);

/// Remote-controllable timer commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Start,
    Split,
    SplitOrStart,
    Reset,
    TogglePause,
    Undo,
    Skip,
    InitGameTime,
    SetGameTime,
    SetLoadingTimes,
    PauseGameTime,
    ResumeGameTime,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::Start,
        Action::Split,
        Action::SplitOrStart,
        Action::Reset,
        Action::TogglePause,
        Action::Undo,
        Action::Skip,
        Action::InitGameTime,
        Action::SetGameTime,
        Action::SetLoadingTimes,
        Action::PauseGameTime,
        Action::ResumeGameTime,
    ];

    /// Name used on the wire and in the shell.
    pub fn name(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Split => "split",
            Action::SplitOrStart => "splitorstart",
            Action::Reset => "reset",
            Action::TogglePause => "togglepause",
            Action::Undo => "undo",
            Action::Skip => "skip",
            Action::InitGameTime => "initgametime",
            Action::SetGameTime => "setgametime",
            Action::SetLoadingTimes => "setloadingtimes",
            Action::PauseGameTime => "pausegametime",
            Action::ResumeGameTime => "resumegametime",
        }
    }

    /// Number of string arguments the handler consumes.
    pub fn arity(self) -> usize {
        match self {
            Action::SetGameTime | Action::SetLoadingTimes => 1,
            _ => 0,
        }
    }

    pub fn handler(self) -> WriteHandler {
        match self {
            Action::Start => |t, _| t.start(),
            Action::Split => |t, _| t.split(),
            Action::SplitOrStart => |t, _| t.split_or_start(),
            Action::Reset => |t, _| t.reset(true),
            Action::TogglePause => |t, _| t.toggle_pause_or_start(),
            Action::Undo => |t, _| t.undo_split(),
            Action::Skip => |t, _| t.skip_split(),
            Action::InitGameTime => |t, _| t.initialize_game_time(),
            Action::SetGameTime => set_game_time,
            Action::SetLoadingTimes => set_loading_times,
            Action::PauseGameTime => |t, _| t.pause_game_time(),
            Action::ResumeGameTime => |t, _| t.resume_game_time(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == name)
            .ok_or_else(|| UnknownAction(name.to_string()))
    }
}

/// An action together with the raw arguments it was issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            args: Vec::new(),
        }
    }

    pub fn with_args<I, A>(action: Action, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            action,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

fn time_arg(action: Action, args: &[String]) -> Option<TimeSpan> {
    let raw = args.first()?;
    match raw.parse() {
        Ok(time) => Some(time),
        Err(err) => {
            debug!(
                target = "remote.dispatch",
                action = %action,
                argument = %raw,
                error = %err,
                "ignoring unparsable time argument"
            );
            None
        }
    }
}

fn set_game_time(timer: &mut dyn Timer, args: &[String]) {
    if let Some(time) = time_arg(Action::SetGameTime, args) {
        timer.set_game_time(time);
    }
}

fn set_loading_times(timer: &mut dyn Timer, args: &[String]) {
    if let Some(time) = time_arg(Action::SetLoadingTimes, args) {
        timer.set_loading_times(time);
    }
}
