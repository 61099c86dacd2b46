//! Insertion: in-place leaf and prefix splits, terminal leaves and child
//! addition, all under upgradable lock coupling.

use std::mem;

use tracing::trace;

use super::node::{longest_common_prefix, node_ref, Inner, Leaf, Node, NodeRef, MAX_PREFIX_LEN};
use super::permit::{escalate, Upgradable};

/// Result of an upsert.
pub(crate) enum Upsert<V> {
    /// The key was absent; `V` is the value now stored.
    Inserted(V),
    /// The key was present.
    Replaced { previous: V, current: V },
}

/// What a frame decided to do after inspecting its node under an upgradable
/// permit.
enum Step<V> {
    /// Tree is empty; the root slot becomes a leaf.
    Install,
    /// The node is the leaf for this key.
    Overwrite,
    /// The node is a leaf for a different key.
    SplitLeaf,
    /// The key diverges inside the node's compressed prefix.
    SplitPrefix { matched: usize },
    /// The key ends right after the node's prefix.
    Terminal,
    /// No child for the next byte.
    AddChild { depth: usize },
    Descend { child: NodeRef<V>, depth: usize },
}

fn plan<V>(node: &Node<V>, key: &[u8], depth: usize) -> Step<V> {
    let inner = match node {
        Node::Empty => return Step::Install,
        Node::Leaf(leaf) if leaf.matches(key) => return Step::Overwrite,
        Node::Leaf(_) => return Step::SplitLeaf,
        Node::Inner(inner) => inner,
    };

    let mut depth = depth;
    let header = &inner.header;
    if header.prefix_len > 0 {
        let matched = inner.prefix_mismatch(key, depth);
        if matched < header.prefix_len {
            return Step::SplitPrefix { matched };
        }
        depth += header.prefix_len;
    }
    if depth == key.len() {
        return Step::Terminal;
    }
    match inner.find_child(key[depth]) {
        Some(child) => Step::Descend {
            child: child.clone(),
            depth,
        },
        None => Step::AddChild { depth },
    }
}

/// Insert or replace the value for `key` in the subtree held by `permit`.
///
/// `f` receives the current value, if any, and produces the value to store.
/// It runs before the permit is escalated, so an error leaves the tree
/// untouched.
pub(crate) fn upsert<V, E, F>(
    permit: Upgradable<'_, V>,
    key: &[u8],
    depth: usize,
    f: F,
) -> Result<Upsert<V>, E>
where
    V: Clone,
    F: FnOnce(Option<&V>) -> Result<V, E>,
{
    let step = plan(&permit, key, depth);
    match step {
        Step::Install => {
            let value = f(None)?;
            let mut node = escalate(permit);
            *node = Node::Leaf(Leaf::new(key, value.clone()));
            trace!(key_len = key.len(), "installed root leaf");
            Ok(Upsert::Inserted(value))
        }
        Step::Overwrite => {
            let value = match &*permit {
                Node::Leaf(leaf) => f(Some(&leaf.value))?,
                _ => unreachable!("overwrite planned on a non-leaf"),
            };
            let mut node = escalate(permit);
            let Node::Leaf(leaf) = &mut *node else {
                unreachable!("overwrite planned on a non-leaf");
            };
            let previous = mem::replace(&mut leaf.value, value.clone());
            Ok(Upsert::Replaced {
                previous,
                current: value,
            })
        }
        Step::SplitLeaf => {
            let value = f(None)?;
            let mut node = escalate(permit);
            let Node::Leaf(existing) = mem::replace(&mut *node, Node::Empty) else {
                unreachable!("leaf split planned on a non-leaf");
            };
            let split = split_leaf(existing, Leaf::new(key, value.clone()), depth);
            *node = Node::Inner(split);
            Ok(Upsert::Inserted(value))
        }
        Step::SplitPrefix { matched } => {
            let value = f(None)?;
            let mut node = escalate(permit);
            let Node::Inner(existing) = mem::replace(&mut *node, Node::Empty) else {
                unreachable!("prefix split planned on a non-inner node");
            };
            let split = split_prefix(existing, Leaf::new(key, value.clone()), depth, matched);
            *node = Node::Inner(split);
            Ok(Upsert::Inserted(value))
        }
        Step::Terminal => {
            let value = match &*permit {
                Node::Inner(inner) => f(inner.header.terminal.as_ref().map(|leaf| &leaf.value))?,
                _ => unreachable!("terminal planned on a non-inner node"),
            };
            let mut node = escalate(permit);
            let Node::Inner(inner) = &mut *node else {
                unreachable!("terminal planned on a non-inner node");
            };
            if let Some(leaf) = &mut inner.header.terminal {
                debug_assert!(leaf.matches(key));
                let previous = mem::replace(&mut leaf.value, value.clone());
                return Ok(Upsert::Replaced {
                    previous,
                    current: value,
                });
            }
            inner.header.terminal = Some(Leaf::new(key, value.clone()));
            Ok(Upsert::Inserted(value))
        }
        Step::AddChild { depth } => {
            let value = f(None)?;
            let mut node = escalate(permit);
            let Node::Inner(inner) = &mut *node else {
                unreachable!("child addition planned on a non-inner node");
            };
            let leaf = node_ref(Node::Leaf(Leaf::new(key, value.clone())));
            inner.add_child(key[depth], leaf);
            Ok(Upsert::Inserted(value))
        }
        Step::Descend { child, depth } => {
            let next = child.upgradable_read();
            drop(permit);
            upsert(next, key, depth + 1, f)
        }
    }
}

/// Replace a leaf with a Node4 holding it and `incoming`.
///
/// Both keys agree on their first `depth` bytes. The Node4's prefix is their
/// common run beyond that; a key ending exactly there becomes the terminal.
fn split_leaf<V>(existing: Leaf<V>, incoming: Leaf<V>, depth: usize) -> Inner<V> {
    let common = longest_common_prefix(&existing.key, &incoming.key, depth);
    let mut inner = Inner::new4();
    inner.header.set_prefix(&incoming.key[depth..], common);
    let split = depth + common;
    trace!(depth, common, "split leaf");

    for leaf in [existing, incoming] {
        if leaf.key.len() == split {
            inner.header.terminal = Some(leaf);
        } else {
            let byte = leaf.key[split];
            inner.add_child(byte, node_ref(Node::Leaf(leaf)));
        }
    }
    inner
}

/// Split `existing` at `matched` bytes into its prefix.
///
/// The new Node4 takes the shared part of the prefix; `existing` keeps the
/// remainder after the byte it now hangs under. Prefix bytes past the stored
/// part are recovered from a representative leaf before anything moves.
fn split_prefix<V>(mut existing: Inner<V>, incoming: Leaf<V>, depth: usize, matched: usize) -> Inner<V> {
    let mut parent = Inner::new4();
    parent.header.set_prefix(&existing.header.partial, matched);

    let remaining = existing.header.prefix_len - (matched + 1);
    let byte = if existing.header.prefix_len <= MAX_PREFIX_LEN {
        let header = &mut existing.header;
        let byte = header.partial[matched];
        let rest = header.partial[matched + 1..].to_vec();
        header.set_prefix(&rest, remaining);
        byte
    } else {
        let leaf_key = existing.representative_key();
        let at = depth + matched;
        existing.header.set_prefix(&leaf_key[at + 1..], remaining);
        leaf_key[at]
    };
    trace!(depth, matched, remaining, "split prefix");

    parent.add_child(byte, node_ref(Node::Inner(existing)));
    if incoming.key.len() == depth + matched {
        parent.header.terminal = Some(incoming);
    } else {
        let byte = incoming.key[depth + matched];
        parent.add_child(byte, node_ref(Node::Leaf(incoming)));
    }
    parent
}
