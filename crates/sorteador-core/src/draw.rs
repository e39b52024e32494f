// Draw engine: single-winner draws and balanced team partitions.
//
// Stateless. Every operation takes a roster snapshot and a random source and
// returns a fresh result; nothing is remembered between draws.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Fewest teams a partition may have.
pub const MIN_TEAMS: usize = 2;

/// Most teams a partition may have.
pub const MAX_TEAMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("roster has no entries to draw from")]
    EmptyRoster,

    #[error("{required} entries are needed to form {required} teams, only {available} available")]
    InsufficientMembers { required: usize, available: usize },
}

// ---------------------------------------------------------------------------
// Team count
// ---------------------------------------------------------------------------

/// A number of teams, always within `MIN_TEAMS..=MAX_TEAMS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamCount(usize);

impl TeamCount {
    /// Clamp any requested count into the supported range.
    pub fn clamped(requested: usize) -> Self {
        TeamCount(requested.clamp(MIN_TEAMS, MAX_TEAMS))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TeamCount {
    fn default() -> Self {
        TeamCount(MIN_TEAMS)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One team of a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Sequential label, starting at 1.
    pub number: usize,
    pub members: Vec<String>,
}

impl Team {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// What the caller asked to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRequest {
    Single,
    Teams(TeamCount),
}

/// Outcome of a successful draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawResult {
    SingleWinner(String),
    TeamPartition(Vec<Team>),
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Run the requested draw against a roster snapshot.
pub fn draw<R: Rng + ?Sized>(
    request: DrawRequest,
    names: &[String],
    rng: &mut R,
) -> Result<DrawResult, DrawError> {
    match request {
        DrawRequest::Single => draw_single(names, rng).map(DrawResult::SingleWinner),
        DrawRequest::Teams(count) => {
            draw_teams(names, count.get(), rng).map(DrawResult::TeamPartition)
        }
    }
}

/// Pick one name, each with equal probability.
pub fn draw_single<R: Rng + ?Sized>(names: &[String], rng: &mut R) -> Result<String, DrawError> {
    if names.is_empty() {
        return Err(DrawError::EmptyRoster);
    }
    let idx = rng.random_range(0..names.len());
    Ok(names[idx].clone())
}

/// Split the roster into `teams_count` balanced teams.
///
/// The roster is shuffled uniformly (Fisher-Yates) and dealt round-robin, so
/// team sizes differ by at most one and team 1 receives any remainder first.
/// `teams_count` is clamped to `MIN_TEAMS..=MAX_TEAMS`.
pub fn draw_teams<R: Rng + ?Sized>(
    names: &[String],
    teams_count: usize,
    rng: &mut R,
) -> Result<Vec<Team>, DrawError> {
    let teams_count = TeamCount::clamped(teams_count).get();

    if names.is_empty() {
        return Err(DrawError::EmptyRoster);
    }
    if names.len() < teams_count {
        return Err(DrawError::InsufficientMembers {
            required: teams_count,
            available: names.len(),
        });
    }

    let mut shuffled = names.to_vec();
    shuffled.shuffle(rng);

    let per_team = shuffled.len().div_ceil(teams_count);
    let mut teams: Vec<Team> = (1..=teams_count)
        .map(|number| Team {
            number,
            members: Vec::with_capacity(per_team),
        })
        .collect();

    for (i, name) in shuffled.into_iter().enumerate() {
        teams[i % teams_count].members.push(name);
    }

    Ok(teams)
}
