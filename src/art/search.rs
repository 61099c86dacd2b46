//! Point lookups and the minimum/maximum leaf queries.

use std::sync::Arc;

use super::node::{Node, NodeRef};
use super::permit::Shared;

/// Look up `key` from the root, coupling shared permits down the path.
///
/// Each step takes the child's permit before letting go of the parent's.
/// The prefix check is optimistic: only stored prefix bytes are compared and
/// the final leaf comparison catches any divergence beyond them.
pub(crate) fn search<V: Clone>(root: &NodeRef<V>, key: &[u8]) -> Option<V> {
    let mut permit: Shared<V> = root.read_arc();
    let mut depth = 0;
    loop {
        let child: NodeRef<V> = match &*permit {
            Node::Empty => return None,
            Node::Leaf(leaf) => return leaf.matches(key).then(|| leaf.value.clone()),
            Node::Inner(inner) => {
                let header = &inner.header;
                if header.prefix_len > 0 {
                    if header.check_prefix(key, depth) != header.partial.len() {
                        return None;
                    }
                    depth += header.prefix_len;
                }
                if depth >= key.len() {
                    return header
                        .terminal
                        .as_ref()
                        .filter(|leaf| leaf.matches(key))
                        .map(|leaf| leaf.value.clone());
                }
                inner.find_child(key[depth])?.clone()
            }
        };
        permit = child.read_arc();
        depth += 1;
    }
}

/// Which end of the key order to walk towards.
#[derive(Debug, Clone, Copy)]
pub(crate) enum End {
    Min,
    Max,
}

/// The smallest or largest entry beneath `node`.
///
/// A terminal leaf sorts before every child of its node.
pub(crate) fn extreme<V: Clone>(node: &Node<V>, end: End) -> Option<(Arc<[u8]>, V)> {
    match node {
        Node::Empty => None,
        Node::Leaf(leaf) => Some((leaf.key.clone(), leaf.value.clone())),
        Node::Inner(inner) => {
            let terminal = inner.header.terminal.as_ref();
            let child = match end {
                End::Min => {
                    if let Some(leaf) = terminal {
                        return Some((leaf.key.clone(), leaf.value.clone()));
                    }
                    inner.body.first_child()
                }
                End::Max => inner.body.last_child(),
            };
            match child {
                Some(child) => extreme(&child.read(), end),
                None => terminal.map(|leaf| (leaf.key.clone(), leaf.value.clone())),
            }
        }
    }
}
