//! Global roster edit lock
//!
//! One writer (the administrator, through the ledger's writer actor) and
//! any number of readers. Every roster mutation takes the lock explicitly.
//!
//! Locks are only created by the ledger when it opens; callers receive
//! clones of that lock. A lock that does not share the ledger's state is
//! refused by the writer.

use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared flag deciding whether rosters may be created, edited or deleted
#[derive(Debug, Clone)]
pub struct RosterLock {
    locked: Arc<RwLock<bool>>,
}

impl RosterLock {
    pub(crate) fn new(locked: bool) -> Self {
        Self {
            locked: Arc::new(RwLock::new(locked)),
        }
    }

    /// Current state
    pub fn is_locked(&self) -> bool {
        *self.locked.read()
    }

    /// Fail with [`Error::RostersLocked`] while engaged
    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            return Err(Error::RostersLocked(
                "roster changes are disabled by the administrator".to_string(),
            ));
        }
        Ok(())
    }

    /// True when both handles are clones of the same lock
    pub(crate) fn shares_state(&self, other: &RosterLock) -> bool {
        Arc::ptr_eq(&self.locked, &other.locked)
    }

    pub(crate) fn set(&self, locked: bool) {
        *self.locked.write() = locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let lock = RosterLock::new(false);
        let reader = lock.clone();
        assert!(reader.ensure_unlocked().is_ok());
        assert!(reader.shares_state(&lock));

        lock.set(true);
        assert!(reader.is_locked());
        assert!(matches!(reader.ensure_unlocked(), Err(Error::RostersLocked(_))));
    }

    #[test]
    fn test_separate_locks_do_not_share_state() {
        let lock = RosterLock::new(true);
        let other = RosterLock::new(false);

        assert!(!other.shares_state(&lock));
        assert!(other.ensure_unlocked().is_ok());
    }
}
