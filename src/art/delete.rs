//! Deletion: leaf and terminal removal, followed by shrinking and Node4
//! collapse in place.

use std::mem;

use tracing::trace;

use super::node::{Node, NodeRef};
use super::permit::{escalate, Upgradable};

enum Step<V> {
    Missing,
    /// The node itself is the matching leaf. Only the root slot gets here;
    /// deeper leaves are removed by their parent.
    Detach,
    RemoveTerminal,
    Inspect {
        child: NodeRef<V>,
        byte: u8,
        depth: usize,
    },
}

fn plan<V>(node: &Node<V>, key: &[u8], depth: usize) -> Step<V> {
    let inner = match node {
        Node::Empty => return Step::Missing,
        Node::Leaf(leaf) if leaf.matches(key) => return Step::Detach,
        Node::Leaf(_) => return Step::Missing,
        Node::Inner(inner) => inner,
    };

    let mut depth = depth;
    let header = &inner.header;
    if header.prefix_len > 0 {
        if header.check_prefix(key, depth) != header.partial.len() {
            return Step::Missing;
        }
        depth += header.prefix_len;
    }
    if depth > key.len() {
        return Step::Missing;
    }
    if depth == key.len() {
        return match &header.terminal {
            Some(leaf) if leaf.matches(key) => Step::RemoveTerminal,
            _ => Step::Missing,
        };
    }
    let byte = key[depth];
    match inner.find_child(byte) {
        Some(child) => Step::Inspect {
            child: child.clone(),
            byte,
            depth,
        },
        None => Step::Missing,
    }
}

/// What the child of an inspected slot turned out to be.
enum Found {
    Target,
    Deeper,
    Missing,
}

/// Remove `key` from the subtree held by `permit`, returning its value.
pub(crate) fn delete<V>(permit: Upgradable<'_, V>, key: &[u8], depth: usize) -> Option<V> {
    let step = plan(&permit, key, depth);
    match step {
        Step::Missing => None,
        Step::Detach => {
            let mut node = escalate(permit);
            match mem::replace(&mut *node, Node::Empty) {
                Node::Leaf(leaf) => Some(leaf.value),
                _ => unreachable!("detach planned on a non-leaf"),
            }
        }
        Step::RemoveTerminal => {
            let mut node = escalate(permit);
            let leaf = match &mut *node {
                Node::Inner(inner) => inner.header.terminal.take()?,
                _ => unreachable!("terminal removal planned on a non-inner node"),
            };
            node.collapse();
            Some(leaf.value)
        }
        Step::Inspect { child, byte, depth } => {
            let child_permit = child.upgradable_read();
            let found = match &*child_permit {
                Node::Leaf(leaf) if leaf.matches(key) => Found::Target,
                Node::Inner(_) => Found::Deeper,
                _ => Found::Missing,
            };
            match found {
                Found::Missing => None,
                Found::Deeper => {
                    drop(permit);
                    delete(child_permit, key, depth + 1)
                }
                Found::Target => {
                    let mut node = escalate(permit);
                    if let Node::Inner(inner) = &mut *node {
                        inner.remove_child(byte);
                    }
                    let mut leaf_node = escalate(child_permit);
                    let removed = mem::replace(&mut *leaf_node, Node::Empty);
                    drop(leaf_node);
                    node.collapse();
                    trace!(byte, depth, "removed leaf");
                    match removed {
                        Node::Leaf(leaf) => Some(leaf.value),
                        _ => unreachable!("removal planned on a non-leaf"),
                    }
                }
            }
        }
    }
}
