// Messages exchanged between the front end and the app event loop.
//
// The front end sends `UserCommand`s; the loop answers with `UiUpdate`s that
// carry structured outcomes. Turning them into text is the front end's job.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sorteador_core::bulk::BulkError;
use sorteador_core::{DrawError, DrawResult, ImportSummary, RosterError, TeamCount};

/// Actions a front end can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Add(String),
    Remove(String),
    Clear,
    Import(PathBuf),
    /// Export to the given path, or to the configured file name.
    Export(Option<PathBuf>),
    DrawSingle,
    /// Draw teams, using the current team count when `None`.
    DrawTeams(Option<usize>),
    SetTeams(usize),
    HideResults,
    /// Resend the current roster snapshot.
    Refresh,
    Save,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// What a notice is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    Added { name: String },
    Removed { name: String },
    Cleared { removed: usize },
    Imported(ImportSummary),
    Exported { path: PathBuf, count: usize },
    Drawn,
    Saved,
    Rejected(RosterError),
    DrawRejected(DrawError),
    ImportFailed { path: PathBuf, reason: String },
    ExportFailed { path: PathBuf, reason: String },
    SaveFailed,
}

impl NoticeEvent {
    /// Severity the front end should show this event with.
    pub fn level(&self) -> NoticeLevel {
        match self {
            NoticeEvent::Added { .. }
            | NoticeEvent::Removed { .. }
            | NoticeEvent::Cleared { .. }
            | NoticeEvent::Imported(_)
            | NoticeEvent::Exported { .. }
            | NoticeEvent::Drawn
            | NoticeEvent::Saved => NoticeLevel::Success,
            NoticeEvent::Rejected(RosterError::NameTooLong { .. } | RosterError::RosterFull { .. }) => {
                NoticeLevel::Error
            }
            NoticeEvent::Rejected(_) | NoticeEvent::DrawRejected(_) => NoticeLevel::Warning,
            NoticeEvent::ImportFailed { .. }
            | NoticeEvent::ExportFailed { .. }
            | NoticeEvent::SaveFailed => NoticeLevel::Error,
        }
    }

    pub(crate) fn import_failed(path: PathBuf, err: &BulkError) -> Self {
        NoticeEvent::ImportFailed {
            path,
            reason: err.to_string(),
        }
    }
}

/// A transient message. Expires after the configured TTL, signalled by
/// `UiUpdate::NoticeExpired` with the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub event: NoticeEvent,
}

/// Everything a front end needs to render the roster panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    pub names: Vec<String>,
    pub capacity: usize,
    pub teams: TeamCount,
    /// Entries still missing before `teams` teams can be drawn.
    pub teams_shortfall: usize,
}

impl RosterSnapshot {
    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn can_draw_single(&self) -> bool {
        !self.names.is_empty()
    }

    pub fn can_draw_teams(&self) -> bool {
        self.teams_shortfall == 0
    }
}

/// Updates pushed from the event loop to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    Snapshot(RosterSnapshot),
    Result {
        result: DrawResult,
        drawn_at: DateTime<Utc>,
    },
    ResultHidden,
    Notice(Notice),
    NoticeExpired(u64),
}
