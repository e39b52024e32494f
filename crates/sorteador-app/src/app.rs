// Application state and main event loop.
//
// Owns the roster, the team count, the last draw result and the persistence
// store. Processes user commands one at a time, autosaves on a timer and
// expires notices after the configured TTL.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sorteador_core::bulk::{self, BulkError};
use sorteador_core::config::Config;
use sorteador_core::draw::{self, DrawRequest, DrawResult, TeamCount};
use sorteador_core::roster::Roster;
use sorteador_core::store::{persist_roster, restore_roster, RosterStore};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::protocol::{Notice, NoticeEvent, RosterSnapshot, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Everything the event loop owns. Created in `main`, moved into [`run`] and
/// handed back once the loop has shut down.
pub struct AppState {
    pub config: Config,
    pub roster: Roster,
    pub teams: TeamCount,
    pub last_result: Option<DrawResult>,
    store: Box<dyn RosterStore>,
    dirty: bool,
    rng: StdRng,
    next_notice_id: u64,
}

impl AppState {
    /// Build the state, restoring the roster from `store`.
    pub fn new(config: Config, store: Box<dyn RosterStore>) -> Self {
        let roster = restore_roster(store.as_ref(), config.roster);
        AppState {
            teams: config.default_teams,
            config,
            roster,
            last_result: None,
            store,
            dirty: false,
            rng: StdRng::from_os_rng(),
            next_notice_id: 1,
        }
    }

    /// Replace the random source, e.g. with a seeded one in tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Whether the roster changed since the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            names: self.roster.names().to_vec(),
            capacity: self.roster.limits().max_entries,
            teams: self.teams,
            teams_shortfall: self.roster.shortfall(self.teams.get()),
        }
    }

    /// Write the roster to the store. Returns `true` on success.
    pub fn save(&mut self) -> bool {
        let ok = persist_roster(self.store.as_ref(), &self.roster);
        if ok {
            self.dirty = false;
            debug!("Saved {} names", self.roster.len());
        }
        ok
    }

    /// Save only if something changed since the last save.
    pub fn save_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return true;
        }
        self.save()
    }

    /// Apply one command and return the updates the front end should see.
    ///
    /// `Quit` is a no-op here; the event loop handles it.
    pub fn apply(&mut self, cmd: UserCommand) -> Vec<UiUpdate> {
        match cmd {
            UserCommand::Add(name) => match self.roster.add(&name) {
                Ok(name) => {
                    info!("Added {:?}", name);
                    self.dirty = true;
                    vec![
                        self.snapshot_update(),
                        self.notice(NoticeEvent::Added { name }),
                    ]
                }
                Err(e) => {
                    debug!("Add rejected: {}", e);
                    vec![self.notice(NoticeEvent::Rejected(e))]
                }
            },
            UserCommand::Remove(name) => {
                if self.roster.remove(&name) {
                    info!("Removed {:?}", name);
                    self.dirty = true;
                    vec![
                        self.snapshot_update(),
                        self.notice(NoticeEvent::Removed { name }),
                    ]
                } else {
                    debug!("Remove of absent name {:?} ignored", name);
                    Vec::new()
                }
            }
            UserCommand::Clear => match self.roster.clear() {
                Ok(removed) => {
                    info!("Cleared {} names", removed);
                    self.dirty = true;
                    let mut updates = Vec::new();
                    if self.last_result.take().is_some() {
                        updates.push(UiUpdate::ResultHidden);
                    }
                    updates.push(self.snapshot_update());
                    updates.push(self.notice(NoticeEvent::Cleared { removed }));
                    updates
                }
                Err(e) => vec![self.notice(NoticeEvent::Rejected(e))],
            },
            UserCommand::Import(path) => self.import(path),
            UserCommand::Export(path) => {
                let path = path.unwrap_or_else(|| PathBuf::from(&self.config.export_file));
                self.export(path)
            }
            UserCommand::DrawSingle => self.draw(DrawRequest::Single),
            UserCommand::DrawTeams(requested) => {
                if let Some(requested) = requested {
                    self.teams = TeamCount::clamped(requested);
                }
                self.draw(DrawRequest::Teams(self.teams))
            }
            UserCommand::SetTeams(requested) => {
                self.teams = TeamCount::clamped(requested);
                if self.teams.get() != requested {
                    debug!("Team count {} clamped to {}", requested, self.teams.get());
                }
                vec![self.snapshot_update()]
            }
            UserCommand::HideResults => {
                if self.last_result.take().is_some() {
                    vec![UiUpdate::ResultHidden]
                } else {
                    Vec::new()
                }
            }
            UserCommand::Refresh => vec![self.snapshot_update()],
            UserCommand::Save => {
                let event = if self.save() {
                    NoticeEvent::Saved
                } else {
                    NoticeEvent::SaveFailed
                };
                vec![self.notice(event)]
            }
            UserCommand::Quit => Vec::new(),
        }
    }

    fn import(&mut self, path: PathBuf) -> Vec<UiUpdate> {
        match bulk::import_file(&mut self.roster, &path) {
            Ok(summary) => {
                if summary.added > 0 {
                    self.dirty = true;
                }
                vec![
                    self.snapshot_update(),
                    self.notice(NoticeEvent::Imported(summary)),
                ]
            }
            Err(e) => {
                warn!("Import from {} failed: {}", path.display(), e);
                vec![self.notice(NoticeEvent::import_failed(path, &e))]
            }
        }
    }

    fn export(&mut self, path: PathBuf) -> Vec<UiUpdate> {
        match bulk::export_file(&self.roster, &path) {
            Ok(count) => vec![self.notice(NoticeEvent::Exported { path, count })],
            Err(BulkError::Roster(e)) => vec![self.notice(NoticeEvent::Rejected(e))],
            Err(e) => {
                warn!("Export to {} failed: {}", path.display(), e);
                let reason = e.to_string();
                vec![self.notice(NoticeEvent::ExportFailed { path, reason })]
            }
        }
    }

    fn draw(&mut self, request: DrawRequest) -> Vec<UiUpdate> {
        match draw::draw(request, self.roster.names(), &mut self.rng) {
            Ok(result) => {
                info!("Draw completed: {:?}", request);
                self.last_result = Some(result.clone());
                vec![
                    UiUpdate::Result {
                        result,
                        drawn_at: Utc::now(),
                    },
                    self.notice(NoticeEvent::Drawn),
                ]
            }
            Err(e) => {
                debug!("Draw rejected: {}", e);
                vec![self.notice(NoticeEvent::DrawRejected(e))]
            }
        }
    }

    fn snapshot_update(&self) -> UiUpdate {
        UiUpdate::Snapshot(self.snapshot())
    }

    fn notice(&mut self, event: NoticeEvent) -> UiUpdate {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        UiUpdate::Notice(Notice {
            id,
            level: event.level(),
            event,
        })
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens for user commands, fires the autosave timer and expires notices.
/// Ends on `UserCommand::Quit` or when the command channel closes, saves one
/// last time and returns the state.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<AppState> {
    info!("Application event loop started");

    let notice_ttl = state.config.notice_ttl;
    // Pending expirations, oldest first. The TTL is fixed so deadlines are
    // already sorted.
    let mut expiring: VecDeque<(u64, Instant)> = VecDeque::new();

    let mut autosave = tokio::time::interval(state.config.autosave_interval);
    // The first tick completes immediately; consume it so the first save
    // happens after one full interval.
    autosave.tick().await;

    let _ = ui_tx.send(UiUpdate::Snapshot(state.snapshot())).await;

    loop {
        let next_expiry = expiring.front().map(|&(_, at)| at);

        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        for update in state.apply(cmd) {
                            if let UiUpdate::Notice(notice) = &update {
                                expiring.push_back((notice.id, Instant::now() + notice_ttl));
                            }
                            let _ = ui_tx.send(update).await;
                        }
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Autosave ---
            _ = autosave.tick() => {
                if state.is_dirty() {
                    debug!("Autosave tick");
                    state.save_if_dirty();
                }
            }

            // --- Notice expiry ---
            _ = tokio::time::sleep_until(next_expiry.unwrap_or_else(Instant::now)), if next_expiry.is_some() => {
                if let Some((id, _)) = expiring.pop_front() {
                    let _ = ui_tx.send(UiUpdate::NoticeExpired(id)).await;
                }
            }
        }
    }

    if !state.save() {
        warn!("Final save failed; changes since the last save are lost");
    }
    info!("Application event loop stopped");
    Ok(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
