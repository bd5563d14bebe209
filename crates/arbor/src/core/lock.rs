use tracing::warn;

/// A reentrant counter that defers change notifications and reconciliation
/// until every `begin` has been matched by an `end`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateLock {
    /// Current nesting depth.
    depth: usize,
}

impl UpdateLock {
    /// Take the lock, or nest one level deeper.
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Release one level. Returns true if this call released the lock
    /// completely.
    ///
    /// Releasing an unlocked lock is a caller bug, but it happens during
    /// teardown paths where failing would only cascade, so the depth saturates
    /// at zero and the mismatch is logged.
    pub fn end(&mut self) -> bool {
        if self.depth == 0 {
            warn!("update lock released without a matching begin");
            return false;
        }
        self.depth -= 1;
        self.depth == 0
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True if the lock is open.
    pub fn can_update(&self) -> bool {
        self.depth == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting() {
        let mut l = UpdateLock::default();
        assert!(l.can_update());
        l.begin();
        l.begin();
        assert_eq!(l.depth(), 2);
        assert!(!l.end());
        assert!(!l.can_update());
        assert!(l.end());
        assert!(l.can_update());
    }

    #[test]
    fn underflow_saturates() {
        let mut l = UpdateLock::default();
        assert!(!l.end());
        assert_eq!(l.depth(), 0);
        l.begin();
        assert!(l.end());
    }
}
