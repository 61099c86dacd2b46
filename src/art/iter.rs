//! Ordered traversals: full, prefix-restricted and rewriting walks.
//!
//! Read walks hold a shared permit on every node of the current path, so the
//! subtree being visited cannot change underneath the visitor. Visitors must
//! not call back into the tree.

use std::ops::ControlFlow;

use super::node::{Leaf, Node};
use super::permit::{escalate, relax, Upgradable};

/// Visit every entry beneath `node` in ascending key order.
///
/// A terminal leaf is visited before its node's children.
pub(crate) fn walk<V, B, F>(node: &Node<V>, visit: &mut F) -> ControlFlow<B>
where
    F: FnMut(&[u8], &V) -> ControlFlow<B>,
{
    match node {
        Node::Empty => ControlFlow::Continue(()),
        Node::Leaf(leaf) => visit(&leaf.key, &leaf.value),
        Node::Inner(inner) => {
            if let Some(leaf) = &inner.header.terminal {
                visit(&leaf.key, &leaf.value)?;
            }
            for (_, child) in inner.body.children() {
                walk(&child.read(), visit)?;
            }
            ControlFlow::Continue(())
        }
    }
}

/// Visit every entry whose key starts with `prefix`, in ascending order.
///
/// Subtrees whose compressed prefix rules them out are skipped without being
/// entered. Once `prefix` is consumed the remaining subtree is walked whole.
pub(crate) fn walk_prefix<V, B, F>(
    node: &Node<V>,
    prefix: &[u8],
    depth: usize,
    visit: &mut F,
) -> ControlFlow<B>
where
    F: FnMut(&[u8], &V) -> ControlFlow<B>,
{
    let inner = match node {
        Node::Empty => return ControlFlow::Continue(()),
        Node::Leaf(leaf) => {
            if leaf.key.starts_with(prefix) {
                return visit(&leaf.key, &leaf.value);
            }
            return ControlFlow::Continue(());
        }
        Node::Inner(inner) => inner,
    };

    if depth >= prefix.len() {
        // Everything below shares the path consumed so far; one leaf decides.
        return match node.minimum_key() {
            Some(key) if key.starts_with(prefix) => walk(node, visit),
            _ => ControlFlow::Continue(()),
        };
    }

    let mut depth = depth;
    let header = &inner.header;
    if header.prefix_len > 0 {
        let matched = inner.prefix_mismatch(prefix, depth);
        if depth + matched == prefix.len() {
            // The prefix ends inside (or exactly at the end of) this node's
            // compressed prefix.
            return walk(node, visit);
        }
        if matched < header.prefix_len {
            return ControlFlow::Continue(());
        }
        depth += header.prefix_len;
    }

    // A terminal here is shorter than the prefix.
    match inner.find_child(prefix[depth]) {
        Some(child) => walk_prefix(&child.read(), prefix, depth + 1, visit),
        None => ControlFlow::Continue(()),
    }
}

/// Outcome of a rewriting walk that stopped early.
pub(crate) enum Halt<E> {
    /// The visitor asked to stop.
    Stopped,
    Failed(E),
}

/// Walk every entry, letting `rewrite_entry` replace values in place.
///
/// Writers are kept out of the current path with upgradable permits; a
/// node is only escalated while one of its values is being replaced.
/// `rewrite_entry` returns the new value for an entry or `None` to leave it.
/// Each replacement is passed to `visit` and counted in `count`.
pub(crate) fn rewrite<V, E, R, F>(
    permit: Upgradable<'_, V>,
    rewrite_entry: &mut R,
    visit: &mut F,
    count: &mut usize,
) -> ControlFlow<Halt<E>>
where
    R: FnMut(&[u8], &V) -> Result<Option<V>, E>,
    F: FnMut(&[u8], &V) -> ControlFlow<()>,
{
    let mut permit = permit;

    let replacement = match &*permit {
        Node::Empty => return ControlFlow::Continue(()),
        Node::Leaf(leaf) => attempt(leaf, rewrite_entry)?,
        Node::Inner(inner) => match &inner.header.terminal {
            Some(leaf) => attempt(leaf, rewrite_entry)?,
            None => None,
        },
    };

    if let Some(value) = replacement {
        let mut node = escalate(permit);
        let leaf = match &mut *node {
            Node::Leaf(leaf) => Some(leaf),
            Node::Inner(inner) => inner.header.terminal.as_mut(),
            Node::Empty => None,
        };
        if let Some(leaf) = leaf {
            leaf.value = value;
            *count += 1;
            if visit(&leaf.key, &leaf.value).is_break() {
                return ControlFlow::Break(Halt::Stopped);
            }
        }
        permit = relax(node);
    }

    if let Node::Inner(inner) = &*permit {
        for (_, child) in inner.body.children() {
            rewrite(child.upgradable_read(), rewrite_entry, visit, count)?;
        }
    }
    ControlFlow::Continue(())
}

fn attempt<V, E, R>(leaf: &Leaf<V>, rewrite_entry: &mut R) -> ControlFlow<Halt<E>, Option<V>>
where
    R: FnMut(&[u8], &V) -> Result<Option<V>, E>,
{
    match rewrite_entry(&leaf.key, &leaf.value) {
        Ok(value) => ControlFlow::Continue(value),
        Err(err) => ControlFlow::Break(Halt::Failed(err)),
    }
}
