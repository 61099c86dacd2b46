//! Adaptive Radix Tree (ART) implementation.
//!
//! A concurrent radix tree over byte-string keys that adapts node sizes
//! based on the number of children. Paths are compressed: each inner node
//! stores the bytes every key beneath it shares.
//!
//! Every node sits behind its own lock. Lookups couple shared locks down
//! the path. Writers couple upgradable locks and only take a node
//! exclusively for the change they make to it.

mod debug;
mod delete;
mod dispatch;
mod insert;
mod iter;
mod node;
mod permit;
mod search;

use std::convert::Infallible;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

pub use debug::ArtStats;
pub use node::NodeKind;

pub(crate) use insert::Upsert;

use iter::Halt;
use node::{node_ref, Node, NodeRef};
use search::End;

/// A concurrent Adaptive Radix Tree mapping byte strings to values.
///
/// All operations take `&self`; share the tree between threads with an
/// `Arc`. Lookups return clones of the stored values.
pub struct Art<V> {
    root: NodeRef<V>,
    len: AtomicUsize,
}

impl<V> Art<V> {
    /// Create a new empty ART.
    pub fn new() -> Self {
        Self {
            root: node_ref(Node::Empty),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of the root node, or `None` for an empty tree.
    pub fn root_kind(&self) -> Option<NodeKind> {
        self.root.read().kind()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        *self.root.write() = Node::Empty;
        let removed = std::mem::take(self.len.get_mut());
        debug!(removed, "cleared tree");
    }

    /// Visit every entry in ascending key order until `visit` breaks.
    pub fn for_each<B, F>(&self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&[u8], &V) -> ControlFlow<B>,
    {
        iter::walk(&self.root.read(), &mut visit)
    }

    /// Visit every entry whose key starts with `prefix`, in ascending order.
    pub fn for_each_prefix<B, F>(&self, prefix: &[u8], mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&[u8], &V) -> ControlFlow<B>,
    {
        iter::walk_prefix(&self.root.read(), prefix, 0, &mut visit)
    }

    /// Visit, in ascending order, every entry whose value satisfies
    /// `predicate`.
    pub fn for_each_where<B, P, F>(&self, mut predicate: P, mut visit: F) -> ControlFlow<B>
    where
        P: FnMut(&V) -> bool,
        F: FnMut(&[u8], &V) -> ControlFlow<B>,
    {
        self.for_each(|key, value| {
            if predicate(value) {
                visit(key, value)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Rewrite values in place across the whole tree.
    ///
    /// `rewrite_entry` sees every entry in ascending order and returns a
    /// replacement or `None`. Each replacement is then passed to `visit`,
    /// which may stop the walk. Returns the number of entries rewritten.
    pub(crate) fn rewrite_where<E, R, F>(&self, mut rewrite_entry: R, mut visit: F) -> Result<usize, E>
    where
        R: FnMut(&[u8], &V) -> Result<Option<V>, E>,
        F: FnMut(&[u8], &V) -> ControlFlow<()>,
    {
        let mut count = 0;
        let outcome = iter::rewrite(self.root.upgradable_read(), &mut rewrite_entry, &mut visit, &mut count);
        match outcome {
            ControlFlow::Continue(()) | ControlFlow::Break(Halt::Stopped) => Ok(count),
            ControlFlow::Break(Halt::Failed(err)) => Err(err),
        }
    }
}

impl<V: Clone> Art<V> {
    /// Look up the value stored for `key`.
    pub fn get(&self, key: &[u8]) -> Option<V> {
        search::search(&self.root, key)
    }

    /// Check if `key` is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Insert a key-value pair, returning the previous value if any.
    pub fn insert(&self, key: &[u8], value: V) -> Option<V> {
        match self.upsert(key, |_| Ok::<_, Infallible>(value)) {
            Ok(Upsert::Inserted(_)) => None,
            Ok(Upsert::Replaced { previous, .. }) => Some(previous),
            Err(never) => match never {},
        }
    }

    /// Insert or replace the value for `key` with one derived from the
    /// current value. `f` runs while writers are kept off the key's path;
    /// an error from `f` leaves the tree unchanged.
    pub(crate) fn upsert<E, F>(&self, key: &[u8], f: F) -> Result<Upsert<V>, E>
    where
        F: FnOnce(Option<&V>) -> Result<V, E>,
    {
        let outcome = insert::upsert(self.root.upgradable_read(), key, 0, f)?;
        if let Upsert::Inserted(_) = outcome {
            self.len.fetch_add(1, Ordering::AcqRel);
        }
        Ok(outcome)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &[u8]) -> Option<V> {
        let removed = delete::delete(self.root.upgradable_read(), key, 0);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Entry with the smallest key.
    pub fn minimum(&self) -> Option<(Vec<u8>, V)> {
        search::extreme(&self.root.read(), End::Min).map(|(key, value)| (key.to_vec(), value))
    }

    /// Entry with the largest key.
    pub fn maximum(&self) -> Option<(Vec<u8>, V)> {
        search::extreme(&self.root.read(), End::Max).map(|(key, value)| (key.to_vec(), value))
    }

    /// Collect every entry in ascending key order.
    pub fn entries(&self) -> Vec<(Vec<u8>, V)> {
        let mut out = Vec::with_capacity(self.len());
        let _ = self.for_each(|key, value| {
            out.push((key.to_vec(), value.clone()));
            ControlFlow::<()>::Continue(())
        });
        out
    }

    /// Collect every entry whose key starts with `prefix`.
    pub fn prefix_entries(&self, prefix: &[u8]) -> Vec<(Vec<u8>, V)> {
        let mut out = Vec::new();
        let _ = self.for_each_prefix(prefix, |key, value| {
            out.push((key.to_vec(), value.clone()));
            ControlFlow::<()>::Continue(())
        });
        out
    }
}

impl<V> Default for Art<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for Art<V> {
    fn drop(&mut self) {
        debug!(len = self.len(), "dropping tree");
    }
}

impl<V> std::fmt::Debug for Art<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Art")
            .field("len", &self.len())
            .field("root", &self.root_kind())
            .finish()
    }
}
