// Roster management: the ordered, deduplicated list of names to draw from.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of entries a roster may hold unless configured otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Maximum length of a single name, in characters, after trimming.
pub const DEFAULT_MAX_NAME_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Rejected roster operations. None of these are fatal; the caller decides
/// how to present them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("name is empty")]
    EmptyName,

    #[error("name is {len} characters long, maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("`{name}` is already on the roster")]
    DuplicateName { name: String },

    #[error("roster is full ({max} entries)")]
    RosterFull { max: usize },

    #[error("roster is already empty")]
    AlreadyEmpty,

    #[error("roster has no entries")]
    EmptyRoster,
}

impl RosterError {
    /// Advisory outcomes describe a no-op rather than bad input.
    pub fn is_advisory(&self) -> bool {
        matches!(self, RosterError::AlreadyEmpty | RosterError::EmptyRoster)
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Size and length bounds enforced on every roster mutation.
///
/// Deserialized directly from the `[roster]` table of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RosterLimits {
    pub max_entries: usize,
    pub max_name_len: usize,
}

impl Default for RosterLimits {
    fn default() -> Self {
        RosterLimits {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Non-blank candidate lines considered, after the batch cap.
    pub read: usize,
    /// Names actually appended to the roster.
    pub added: usize,
    /// Candidates already on the roster, or repeated earlier in the batch.
    pub duplicates: usize,
    /// Candidates longer than `max_name_len`.
    pub too_long: usize,
    /// Candidates left over once the roster filled up.
    pub over_capacity: usize,
    /// Non-blank lines past the batch cap, never considered.
    pub beyond_batch: usize,
}

impl ImportSummary {
    /// Candidates that were read but not added.
    pub fn skipped(&self) -> usize {
        self.duplicates + self.too_long + self.over_capacity
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// An ordered collection of unique names.
///
/// Uniqueness is exact and case-sensitive. Insertion order is preserved and
/// is the order used for display and export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
    limits: RosterLimits,
}

impl Roster {
    /// Create an empty roster with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty roster with the given limits.
    pub fn with_limits(limits: RosterLimits) -> Self {
        Roster {
            names: Vec::new(),
            limits,
        }
    }

    /// Rebuild a roster from previously persisted names.
    ///
    /// Stored data is not trusted: every entry goes through the same trim,
    /// length, dedupe and capacity rules as `add`. Entries that fail are
    /// dropped and logged.
    pub fn from_names<I, S>(names: I, limits: RosterLimits) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roster = Roster::with_limits(limits);
        for raw in names {
            if let Err(e) = roster.add(raw.as_ref()) {
                warn!("Dropping stored roster entry {:?}: {}", raw.as_ref(), e);
            }
        }
        roster
    }

    /// Add a single name to the end of the roster.
    ///
    /// Checks, in order: empty after trimming, too long, already present,
    /// roster full. Returns the accepted (trimmed) name.
    pub fn add(&mut self, name: &str) -> Result<String, RosterError> {
        let name = self.normalize(name)?;

        if self.contains(name) {
            return Err(RosterError::DuplicateName {
                name: name.to_string(),
            });
        }

        if self.is_full() {
            return Err(RosterError::RosterFull {
                max: self.limits.max_entries,
            });
        }

        let name = name.to_string();
        self.names.push(name.clone());
        debug!("Added {:?} ({} entries)", name, self.names.len());
        Ok(name)
    }

    /// Remove the first entry equal to `name`. Absent names are a no-op.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(idx) => {
                self.names.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Returns how many entries were removed.
    pub fn clear(&mut self) -> Result<usize, RosterError> {
        if self.names.is_empty() {
            return Err(RosterError::AlreadyEmpty);
        }
        let removed = self.names.len();
        self.names.clear();
        Ok(removed)
    }

    /// Merge newline-delimited names into the roster.
    ///
    /// Lines are trimmed and blank lines discarded. The batch itself is capped
    /// at `max_entries` candidates before merging; the merged roster keeps the
    /// existing entries first, then new names in input order, silently
    /// dropping duplicates, and is capped at `max_entries` again. Lines longer
    /// than `max_name_len` are skipped.
    pub fn import_bulk(&mut self, text: &str) -> ImportSummary {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let candidates: Vec<&str> = lines.by_ref().take(self.limits.max_entries).collect();

        let mut summary = ImportSummary {
            read: candidates.len(),
            beyond_batch: lines.count(),
            ..ImportSummary::default()
        };
        for (i, candidate) in candidates.iter().enumerate() {
            if self.is_full() {
                summary.over_capacity = candidates.len() - i;
                break;
            }
            let len = candidate.chars().count();
            if len > self.limits.max_name_len {
                warn!(
                    "Skipping imported name of {} characters (max {})",
                    len, self.limits.max_name_len
                );
                summary.too_long += 1;
                continue;
            }
            if self.contains(candidate) {
                summary.duplicates += 1;
                continue;
            }
            self.names.push((*candidate).to_string());
            summary.added += 1;
        }

        summary
    }

    /// All names joined with `\n`, in roster order.
    pub fn export_text(&self) -> Result<String, RosterError> {
        if self.names.is_empty() {
            return Err(RosterError::EmptyRoster);
        }
        Ok(self.names.join("\n"))
    }

    /// Names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.names.len() >= self.limits.max_entries
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn limits(&self) -> RosterLimits {
        self.limits
    }

    /// How many more entries are needed before `teams` teams can be formed.
    pub fn shortfall(&self, teams: usize) -> usize {
        teams.saturating_sub(self.names.len())
    }

    fn normalize<'a>(&self, raw: &'a str) -> Result<&'a str, RosterError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyName);
        }
        let len = name.chars().count();
        if len > self.limits.max_name_len {
            return Err(RosterError::NameTooLong {
                len,
                max: self.limits.max_name_len,
            });
        }
        Ok(name)
    }
}
