//! Optimistic concurrency expectations for single-record writes.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Precondition attached to a conditional write.
///
/// Records carry a revision that starts at 1 when created and grows by one per
/// successful write. A write only applies when the stored state matches the
/// expectation; otherwise it fails as a conflict and nothing is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpectedRevision {
    /// Skip the check (unconditional upsert/delete).
    Any,
    /// The record must not exist yet.
    Absent,
    /// The record must exist at exactly this revision.
    Exact(u64),
}

impl ExpectedRevision {
    /// Expectation matching the state that was just read.
    pub fn from_current(current: Option<u64>) -> Self {
        match current {
            Some(rev) => ExpectedRevision::Exact(rev),
            None => ExpectedRevision::Absent,
        }
    }

    /// `actual` is `None` when no record is stored.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedRevision::Any, _) => true,
            (ExpectedRevision::Absent, None) => true,
            (ExpectedRevision::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}
