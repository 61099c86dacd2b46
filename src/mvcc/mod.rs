//! Multi-version layer over the ART.
//!
//! Each key maps to a [`VersionChain`]. Writes never overwrite a payload:
//! they append a new head stamped with the caller's transaction id, and
//! deletes append a tombstone. Which versions a transaction may see is left
//! to the caller; [`MvccArt::read_at`] gives the newest version at or
//! before a given id.

mod chain;

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::art::{Art, Upsert};
use crate::config::Config;
use crate::error::{MvccError, MvccResult};

pub use chain::{History, Snapshot, TxnId, VersionChain, VersionStatus};

/// A concurrent ART whose values are version chains.
pub struct MvccArt<T> {
    tree: Art<VersionChain<T>>,
    config: Config,
}

/// The head of `chain` unless it is a tombstone.
fn live<T>(chain: &VersionChain<T>) -> Option<&Arc<Snapshot<T>>> {
    let head = chain.head();
    (!head.is_deleted()).then_some(head)
}

impl<T> MvccArt<T> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            tree: Art::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of keys with a chain, including logically deleted ones.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Drop every key and its history.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Write `value` for `key` at `txn`.
    ///
    /// An absent key gets a fresh chain. A present key gets a new head
    /// linked to the previous one, which stays reachable through
    /// [`Snapshot::older`]. Returns the new head.
    pub fn insert(&self, key: &[u8], value: T, txn: TxnId) -> MvccResult<Arc<Snapshot<T>>> {
        let max_depth = self.config.max_version_depth;
        self.write(key, |existing| match existing {
            None => Ok(VersionChain::new(txn, Arc::new(value))),
            Some(chain) => {
                let status = if chain.head().is_deleted() {
                    VersionStatus::Inserted
                } else {
                    VersionStatus::Updated
                };
                chain.append(txn, status, Some(Arc::new(value)), max_depth)
            }
        })
    }

    /// Append a new version for a key that is currently live.
    pub fn update(&self, key: &[u8], value: T, txn: TxnId) -> MvccResult<Arc<Snapshot<T>>> {
        let max_depth = self.config.max_version_depth;
        self.write(key, |existing| match existing.filter(|chain| !chain.head().is_deleted()) {
            Some(chain) => chain.append(txn, VersionStatus::Updated, Some(Arc::new(value)), max_depth),
            None => Err(MvccError::KeyNotFound),
        })
    }

    /// Append a tombstone for `key`. The key stays in the tree with its
    /// history; see [`MvccArt::purge`] for structural removal.
    pub fn delete(&self, key: &[u8], txn: TxnId) -> MvccResult<Arc<Snapshot<T>>> {
        let max_depth = self.config.max_version_depth;
        self.write(key, |existing| {
            let chain = existing.ok_or(MvccError::KeyNotFound)?;
            if chain.head().is_deleted() {
                return Err(MvccError::AlreadyDeleted {
                    version: chain.head().version(),
                });
            }
            chain.append(txn, VersionStatus::Deleted, None, max_depth)
        })
    }

    fn write<F>(&self, key: &[u8], f: F) -> MvccResult<Arc<Snapshot<T>>>
    where
        F: FnOnce(Option<&VersionChain<T>>) -> MvccResult<VersionChain<T>>,
    {
        let chain = match self.tree.upsert(key, f)? {
            Upsert::Inserted(chain) | Upsert::Replaced { current: chain, .. } => chain,
        };
        let head = chain.head();
        trace!(txn = head.version(), status = ?head.status(), "appended version");
        Ok(Arc::clone(head))
    }

    /// Append `value` at `txn` to every live key whose current payload
    /// satisfies `predicate`.
    ///
    /// Each new head is passed to `visit`, which may stop the pass. Returns
    /// the number of keys rewritten. All rewritten keys share one payload.
    pub fn update_where<P, F>(&self, mut predicate: P, value: T, txn: TxnId, mut visit: F) -> MvccResult<usize>
    where
        P: FnMut(&T) -> bool,
        F: FnMut(&[u8], &Arc<Snapshot<T>>) -> ControlFlow<()>,
    {
        let payload = Arc::new(value);
        let max_depth = self.config.max_version_depth;
        let rewritten = self.tree.rewrite_where(
            |_, chain| match live(chain).and_then(|head| head.value()) {
                Some(current) if predicate(current) => chain
                    .append(txn, VersionStatus::Updated, Some(Arc::clone(&payload)), max_depth)
                    .map(Some),
                _ => Ok(None),
            },
            |key, chain| visit(key, chain.head()),
        )?;
        debug!(txn, rewritten, "update_where finished");
        Ok(rewritten)
    }

    /// Append a tombstone at `txn` to every live key whose current payload
    /// satisfies `predicate`. Keys already deleted are skipped.
    pub fn delete_where<P, F>(&self, mut predicate: P, txn: TxnId, mut visit: F) -> MvccResult<usize>
    where
        P: FnMut(&T) -> bool,
        F: FnMut(&[u8], &Arc<Snapshot<T>>) -> ControlFlow<()>,
    {
        let max_depth = self.config.max_version_depth;
        let deleted = self.tree.rewrite_where(
            |_, chain| match live(chain).and_then(|head| head.value()) {
                Some(current) if predicate(current) => chain
                    .append(txn, VersionStatus::Deleted, None, max_depth)
                    .map(Some),
                _ => Ok(None),
            },
            |key, chain| visit(key, chain.head()),
        )?;
        debug!(txn, deleted, "delete_where finished");
        Ok(deleted)
    }

    /// Remove `key` and its whole history from the tree.
    pub fn purge(&self, key: &[u8]) -> Option<VersionChain<T>> {
        self.tree.remove(key)
    }

    /// The key's chain.
    pub fn chain(&self, key: &[u8]) -> Option<VersionChain<T>> {
        self.tree.get(key)
    }

    /// Newest version of `key`, which may be a tombstone.
    pub fn current(&self, key: &[u8]) -> Option<Arc<Snapshot<T>>> {
        self.chain(key).map(|chain| Arc::clone(chain.head()))
    }

    /// Current payload of `key`, unless it is deleted.
    pub fn get(&self, key: &[u8]) -> Option<Arc<T>> {
        self.current(key)?.payload().cloned()
    }

    /// Newest version of `key` written at or before `txn`, which may be a
    /// tombstone.
    pub fn read_at(&self, key: &[u8], txn: TxnId) -> Option<Arc<Snapshot<T>>> {
        self.chain(key)?.visible_at(txn)
    }

    /// Every retained version of `key`, newest first.
    pub fn history(&self, key: &[u8]) -> Vec<Arc<Snapshot<T>>> {
        self.chain(key).map(|chain| chain.history().collect()).unwrap_or_default()
    }

    /// Visit the head of every live key in ascending key order.
    pub fn for_each<B, F>(&self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&[u8], &Arc<Snapshot<T>>) -> ControlFlow<B>,
    {
        self.tree.for_each(|key, chain| match live(chain) {
            Some(head) => visit(key, head),
            None => ControlFlow::Continue(()),
        })
    }

    /// Visit the head of every live key starting with `prefix`.
    pub fn scan_prefix<B, F>(&self, prefix: &[u8], mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&[u8], &Arc<Snapshot<T>>) -> ControlFlow<B>,
    {
        self.tree.for_each_prefix(prefix, |key, chain| match live(chain) {
            Some(head) => visit(key, head),
            None => ControlFlow::Continue(()),
        })
    }

    /// Visit the head of every live key whose payload satisfies `predicate`.
    pub fn for_each_where<B, P, F>(&self, mut predicate: P, mut visit: F) -> ControlFlow<B>
    where
        P: FnMut(&T) -> bool,
        F: FnMut(&[u8], &Arc<Snapshot<T>>) -> ControlFlow<B>,
    {
        self.for_each(|key, head| match head.value() {
            Some(value) if predicate(value) => visit(key, head),
            _ => ControlFlow::Continue(()),
        })
    }
}

impl<T> Default for MvccArt<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MvccArt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvccArt")
            .field("tree", &self.tree)
            .field("config", &self.config)
            .finish()
    }
}
