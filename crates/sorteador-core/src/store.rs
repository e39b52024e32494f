// Persistence boundary for the roster.
//
// The app only needs two operations: save the current names and load them
// back on the next start. Failures here never reach the roster itself.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{info, warn};

use crate::roster::{Roster, RosterLimits};

/// Key-value style persistence for a roster's names.
pub trait RosterStore: Send {
    /// Persist the names, replacing whatever was stored before.
    fn save(&self, names: &[String]) -> Result<()>;

    /// Load the stored names. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<String>>>;
}

impl<T: RosterStore + Sync> RosterStore for Arc<T> {
    fn save(&self, names: &[String]) -> Result<()> {
        (**self).save(names)
    }

    fn load(&self) -> Result<Option<Vec<String>>> {
        (**self).load()
    }
}

/// Volatile store used by tests and as a fallback when no database is
/// available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    names: Mutex<Option<Vec<String>>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `names`.
    pub fn with_names(names: Vec<String>) -> Self {
        MemoryStore {
            names: Mutex::new(Some(names)),
            fail_saves: false,
        }
    }

    /// A store whose `save` always fails, for exercising error paths.
    pub fn failing() -> Self {
        MemoryStore {
            names: Mutex::new(None),
            fail_saves: true,
        }
    }

    /// Snapshot of what was last saved.
    pub fn saved(&self) -> Option<Vec<String>> {
        self.names.lock().map(|guard| guard.clone()).unwrap_or(None)
    }
}

impl RosterStore for MemoryStore {
    fn save(&self, names: &[String]) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("storage unavailable");
        }
        let mut guard = self
            .names
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store mutex poisoned"))?;
        *guard = Some(names.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<String>>> {
        let guard = self
            .names
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store mutex poisoned"))?;
        Ok(guard.clone())
    }
}

/// Load a roster from `store`, falling back to an empty roster when nothing
/// was saved or the store cannot be read.
pub fn restore_roster(store: &dyn RosterStore, limits: RosterLimits) -> Roster {
    match store.load() {
        Ok(Some(names)) => {
            let stored = names.len();
            let roster = Roster::from_names(names, limits);
            info!("Restored {} of {} stored names", roster.len(), stored);
            roster
        }
        Ok(None) => {
            info!("No saved roster found, starting empty");
            Roster::with_limits(limits)
        }
        Err(e) => {
            warn!("Could not load saved roster, starting empty: {:#}", e);
            Roster::with_limits(limits)
        }
    }
}

/// Save the roster, logging instead of propagating failures.
///
/// Returns `true` if the write succeeded.
pub fn persist_roster(store: &dyn RosterStore, roster: &Roster) -> bool {
    match store.save(roster.names()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not save roster: {:#}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store whose reads always fail.
    struct BrokenStore;

    impl RosterStore for BrokenStore {
        fn save(&self, _names: &[String]) -> Result<()> {
            anyhow::bail!("disk on fire")
        }

        fn load(&self) -> Result<Option<Vec<String>>> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);

        let names = vec!["Ana".to_string(), "Bruno".to_string()];
        store.save(&names).unwrap();
        assert_eq!(store.load().unwrap(), Some(names.clone()));
        assert_eq!(store.saved(), Some(names));
    }

    #[test]
    fn shared_store_sees_saves_through_arc() {
        let shared = Arc::new(MemoryStore::new());
        let boxed: Box<dyn RosterStore> = Box::new(Arc::clone(&shared));
        boxed.save(&["Ana".to_string()]).unwrap();
        assert_eq!(shared.saved(), Some(vec!["Ana".to_string()]));
    }

    #[test]
    fn restore_from_empty_store_is_empty_roster() {
        let roster = restore_roster(&MemoryStore::new(), RosterLimits::default());
        assert!(roster.is_empty());
    }

    #[test]
    fn restore_from_broken_store_is_empty_roster() {
        let roster = restore_roster(&BrokenStore, RosterLimits::default());
        assert!(roster.is_empty());
    }

    #[test]
    fn restore_sanitizes_stored_names() {
        let store = MemoryStore::with_names(vec![
            "Ana".to_string(),
            "Ana".to_string(),
            "  ".to_string(),
            "Bruno".to_string(),
        ]);
        let roster = restore_roster(&store, RosterLimits::default());
        assert_eq!(roster.names(), &["Ana", "Bruno"]);
    }

    #[test]
    fn persist_failure_is_reported_not_raised() {
        let mut roster = Roster::new();
        roster.add("Ana").unwrap();
        assert!(!persist_roster(&BrokenStore, &roster));
        assert!(!persist_roster(&MemoryStore::failing(), &roster));

        let store = MemoryStore::new();
        assert!(persist_roster(&store, &roster));
        assert_eq!(store.saved(), Some(vec!["Ana".to_string()]));
    }
}
