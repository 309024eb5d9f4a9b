use crate::value_objects::command::CommandKind;
use crate::value_objects::snapshot::Snapshot;
use serde::Serialize;

/// What a command precondition is evaluated against.
///
/// `snapshot` is the latest applied one and may be up to one poll period
/// stale. Before the first snapshot the job counts as not running.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub snapshot: Option<&'a Snapshot>,
    pub selected_weights: &'a str,
    pub in_flight: bool,
}

impl GateContext<'_> {
    fn running(&self) -> bool {
        self.snapshot.map(|s| s.running).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another command has not settled yet.
    Busy,
    AlreadyRunning,
    NotRunning,
    NoWeightsSelected,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Busy => write!(f, "another command is in flight"),
            Rejection::AlreadyRunning => write!(f, "training is already running"),
            Rejection::NotRunning => write!(f, "training is not running"),
            Rejection::NoWeightsSelected => write!(f, "no weights selected"),
        }
    }
}

pub fn check_command(kind: CommandKind, ctx: &GateContext<'_>) -> Result<(), Rejection> {
    if ctx.in_flight {
        return Err(Rejection::Busy);
    }
    match kind {
        CommandKind::Start if ctx.running() => Err(Rejection::AlreadyRunning),
        CommandKind::Stop if !ctx.running() => Err(Rejection::NotRunning),
        CommandKind::Evaluate | CommandKind::RecordVideo if ctx.selected_weights.is_empty() => {
            Err(Rejection::NoWeightsSelected)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionAvailability {
    pub start: bool,
    pub stop: bool,
    pub evaluate: bool,
    pub record_video: bool,
}

impl ActionAvailability {
    pub fn from_context(ctx: &GateContext<'_>) -> Self {
        Self {
            start: check_command(CommandKind::Start, ctx).is_ok(),
            stop: check_command(CommandKind::Stop, ctx).is_ok(),
            evaluate: check_command(CommandKind::Evaluate, ctx).is_ok(),
            record_video: check_command(CommandKind::RecordVideo, ctx).is_ok(),
        }
    }

    pub fn allows(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Start => self.start,
            CommandKind::Stop => self.stop,
            CommandKind::Evaluate => self.evaluate,
            CommandKind::RecordVideo => self.record_video,
        }
    }
}
