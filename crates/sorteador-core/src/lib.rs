// Library root: roster management, the draw engine, and the persistence and
// configuration layers around them. Re-exports the types most callers need.

pub mod bulk;
pub mod config;
pub mod db;
pub mod draw;
pub mod roster;
pub mod store;

pub use draw::{DrawError, DrawRequest, DrawResult, Team, TeamCount};
pub use roster::{ImportSummary, Roster, RosterError, RosterLimits};
pub use store::RosterStore;
