use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use content_core::Space;
use tracing::debug;

type Held = Arc<Mutex<HashSet<(Space, Space)>>>;

/// In-process advisory locks, one per `(source, target)` space pair.
///
/// Clones share the same lock table, so services that must not promote the
/// same pair concurrently should be built from clones of one `PromotionLocks`.
#[derive(Debug, Clone, Default)]
pub struct PromotionLocks {
    held: Held,
}

impl PromotionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `source -> target`, or `None` if it is already held.
    pub fn try_acquire(&self, source: Space, target: Space) -> Option<PromotionGuard> {
        let mut held = self.held.lock().expect("promotion locks poisoned");
        if !held.insert((source, target)) {
            return None;
        }
        debug!(%source, %target, "promotion lock acquired");
        Some(PromotionGuard {
            held: Arc::clone(&self.held),
            pair: (source, target),
        })
    }

    pub fn is_held(&self, source: Space, target: Space) -> bool {
        let held = self.held.lock().expect("promotion locks poisoned");
        held.contains(&(source, target))
    }
}

/// Releases its pair when dropped.
#[derive(Debug)]
pub struct PromotionGuard {
    held: Held,
    pair: (Space, Space),
}

impl Drop for PromotionGuard {
    fn drop(&mut self) {
        // Never panic in drop; a poisoned table still gets the pair removed.
        let mut held = match self.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.pair);
    }
}
