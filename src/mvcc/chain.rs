//! Append-only version chains.
//!
//! A chain is a singly linked list of immutable [`Snapshot`]s from newest to
//! oldest. Appending never touches existing entries: a new head is built
//! pointing at the old one, so readers holding any snapshot keep seeing a
//! consistent history for as long as they hold it.

use std::sync::Arc;

use tracing::warn;

use crate::error::{MvccError, MvccResult};

/// Transaction id stamped on each version.
pub type TxnId = u64;

/// What a version records about its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionStatus {
    /// First version of the key, or the first after a delete.
    Inserted,
    /// Overwrites a live version.
    Updated,
    /// Tombstone: the key is logically deleted from this version on.
    Deleted,
}

/// One immutable version of a key.
#[derive(Debug)]
pub struct Snapshot<T> {
    version: TxnId,
    status: VersionStatus,
    value: Option<Arc<T>>,
    older: Option<Arc<Snapshot<T>>>,
    /// Number of entries from this one to the oldest retained.
    depth: usize,
}

impl<T> Snapshot<T> {
    /// Transaction that wrote this version.
    pub fn version(&self) -> TxnId {
        self.version
    }

    pub fn status(&self) -> VersionStatus {
        self.status
    }

    /// Payload, or `None` for a tombstone.
    pub fn value(&self) -> Option<&T> {
        self.value.as_deref()
    }

    /// Shared handle to the payload.
    pub fn payload(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.status == VersionStatus::Deleted
    }

    /// The immediately older version.
    pub fn older(&self) -> Option<&Arc<Snapshot<T>>> {
        self.older.as_ref()
    }
}

/// Iterator over a chain from newest to oldest.
pub struct History<T> {
    next: Option<Arc<Snapshot<T>>>,
}

impl<T> Iterator for History<T> {
    type Item = Arc<Snapshot<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.older.clone();
        Some(current)
    }
}

/// Handle to a key's newest version. Cloning shares the chain.
pub struct VersionChain<T> {
    head: Arc<Snapshot<T>>,
}

impl<T> Clone for VersionChain<T> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
        }
    }
}

impl<T> std::fmt::Debug for VersionChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionChain")
            .field("version", &self.head.version)
            .field("status", &self.head.status)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> VersionChain<T> {
    /// A single-entry chain for a newly inserted key.
    pub fn new(version: TxnId, value: Arc<T>) -> Self {
        Self {
            head: Arc::new(Snapshot {
                version,
                status: VersionStatus::Inserted,
                value: Some(value),
                older: None,
                depth: 1,
            }),
        }
    }

    /// The newest version.
    pub fn head(&self) -> &Arc<Snapshot<T>> {
        &self.head
    }

    /// Number of retained versions.
    pub fn len(&self) -> usize {
        self.head.depth
    }

    /// Versions from newest to oldest.
    pub fn history(&self) -> History<T> {
        History {
            next: Some(Arc::clone(&self.head)),
        }
    }

    /// The newest version written at or before `txn`.
    pub fn visible_at(&self, txn: TxnId) -> Option<Arc<Snapshot<T>>> {
        self.history().find(|snapshot| snapshot.version <= txn)
    }

    /// Build the chain with a new head on top of this one.
    ///
    /// `version` must be newer than the current head. With `max_depth` set,
    /// only that many of the newest versions are kept.
    pub(crate) fn append(
        &self,
        version: TxnId,
        status: VersionStatus,
        value: Option<Arc<T>>,
        max_depth: Option<usize>,
    ) -> MvccResult<Self> {
        if version <= self.head.version {
            warn!(head = self.head.version, attempted = version, "rejected non-monotonic version");
            return Err(MvccError::NonMonotonicVersion {
                head: self.head.version,
                attempted: version,
            });
        }
        let chain = Self {
            head: Arc::new(Snapshot {
                version,
                status,
                value,
                older: Some(Arc::clone(&self.head)),
                depth: self.head.depth + 1,
            }),
        };
        Ok(match max_depth {
            Some(max) if chain.len() > max => chain.truncated(max),
            _ => chain,
        })
    }

    /// Rebuild the newest `keep` versions as a standalone chain.
    fn truncated(&self, keep: usize) -> Self {
        let kept: Vec<Arc<Snapshot<T>>> = self.history().take(keep.max(1)).collect();
        let mut older = None;
        for (i, snapshot) in kept.iter().rev().enumerate() {
            older = Some(Arc::new(Snapshot {
                version: snapshot.version,
                status: snapshot.status,
                value: snapshot.value.clone(),
                older,
                depth: i + 1,
            }));
        }
        match older {
            Some(head) => Self { head },
            None => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(chain: &VersionChain<&'static str>) -> Vec<TxnId> {
        chain.history().map(|s| s.version()).collect()
    }

    #[test]
    fn test_append_keeps_history() {
        let v1 = VersionChain::new(1, Arc::new("a"));
        let v2 = v1.append(2, VersionStatus::Updated, Some(Arc::new("b")), None).unwrap();
        let v3 = v2.append(5, VersionStatus::Updated, Some(Arc::new("c")), None).unwrap();

        assert_eq!(versions(&v3), vec![5, 2, 1]);
        assert_eq!(v3.head().value(), Some(&"c"));
        assert_eq!(v3.len(), 3);
        // Older handles are unaffected.
        assert_eq!(versions(&v1), vec![1]);
        assert_eq!(v2.head().value(), Some(&"b"));
    }

    #[test]
    fn test_rejects_non_monotonic_version() {
        let chain = VersionChain::new(7, Arc::new("a"));
        let err = chain
            .append(7, VersionStatus::Updated, Some(Arc::new("b")), None)
            .unwrap_err();
        assert_eq!(err, MvccError::NonMonotonicVersion { head: 7, attempted: 7 });
        assert!(chain.append(3, VersionStatus::Deleted, None, None).is_err());
    }

    #[test]
    fn test_visible_at() {
        let chain = VersionChain::new(10, Arc::new("a"))
            .append(20, VersionStatus::Updated, Some(Arc::new("b")), None)
            .unwrap()
            .append(30, VersionStatus::Deleted, None, None)
            .unwrap();

        assert!(chain.visible_at(5).is_none());
        assert_eq!(chain.visible_at(10).unwrap().value(), Some(&"a"));
        assert_eq!(chain.visible_at(25).unwrap().value(), Some(&"b"));
        let latest = chain.visible_at(u64::MAX).unwrap();
        assert!(latest.is_deleted());
        assert_eq!(latest.value(), None);
    }

    #[test]
    fn test_truncation_keeps_newest() {
        let mut chain = VersionChain::new(1, Arc::new("v"));
        for txn in 2..=6 {
            chain = chain
                .append(txn, VersionStatus::Updated, Some(Arc::new("v")), Some(3))
                .unwrap();
        }
        assert_eq!(chain.len(), 3);
        assert_eq!(versions(&chain), vec![6, 5, 4]);
        assert_eq!(chain.history().last().unwrap().status(), VersionStatus::Updated);
    }

    #[test]
    fn test_held_snapshot_outlives_truncation() {
        let chain = VersionChain::new(1, Arc::new("old"));
        let held = Arc::clone(chain.head());
        let chain = chain
            .append(2, VersionStatus::Updated, Some(Arc::new("new")), Some(1))
            .unwrap();
        assert_eq!(versions(&chain), vec![2]);
        assert_eq!(held.value(), Some(&"old"));
    }
}
