//! Debug utilities for ART troubleshooting.

use std::fmt::{Debug, Write};

use super::node::{Body, Inner, Node, NodeKind, MAX_PREFIX_LEN};
use super::Art;

/// Node counts gathered by [`Art::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtStats {
    /// Number of Node4 instances
    pub node4_count: usize,
    /// Number of Node16 instances
    pub node16_count: usize,
    /// Number of Node48 instances
    pub node48_count: usize,
    /// Number of Node256 instances
    pub node256_count: usize,
    /// Number of leaf nodes
    pub leaf_count: usize,
    /// Number of terminal leaves stored inside inner nodes
    pub terminal_count: usize,
    /// Bytes used for key storage
    pub key_bytes: usize,
    /// Length of the longest root-to-leaf path, in nodes
    pub max_height: usize,
}

impl ArtStats {
    /// Total number of inner nodes.
    pub fn inner_count(&self) -> usize {
        self.node4_count + self.node16_count + self.node48_count + self.node256_count
    }

    fn record<V>(&mut self, node: &Node<V>, height: usize) {
        self.max_height = self.max_height.max(height);
        match node {
            Node::Empty => {}
            Node::Leaf(leaf) => {
                self.leaf_count += 1;
                self.key_bytes += leaf.key.len();
            }
            Node::Inner(inner) => {
                match inner.body.kind() {
                    NodeKind::Node4 => self.node4_count += 1,
                    NodeKind::Node16 => self.node16_count += 1,
                    NodeKind::Node48 => self.node48_count += 1,
                    NodeKind::Node256 => self.node256_count += 1,
                    NodeKind::Leaf => {}
                }
                if let Some(leaf) = &inner.header.terminal {
                    self.terminal_count += 1;
                    self.key_bytes += leaf.key.len();
                }
                for (_, child) in inner.body.children() {
                    self.record(&child.read(), height + 1);
                }
            }
        }
    }
}

impl<V> Art<V> {
    /// Count nodes by variant.
    pub fn stats(&self) -> ArtStats {
        let mut stats = ArtStats::default();
        let root = self.root.read();
        if !matches!(*root, Node::Empty) {
            stats.record(&*root, 1);
        }
        stats
    }

    /// Verify tree integrity - returns list of issues found.
    ///
    /// Checks child counts against each variant's bounds, key ordering,
    /// Node48 index consistency, that every leaf agrees with the prefixes and
    /// dispatch bytes on its path, and that the leaf count matches `len()`.
    pub fn verify_integrity(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let root = self.root.read();
        let mut leaves = 0;
        if !matches!(*root, Node::Empty) {
            verify_node(&*root, 0, &mut Vec::new(), &mut issues, &mut leaves);
        }
        if leaves != self.len() {
            issues.push(format!("found {} leaves but len() is {}", leaves, self.len()));
        }
        issues
    }
}

impl<V: Debug> Art<V> {
    /// Render the tree structure for debugging.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== ART Debug ===");
        let _ = writeln!(out, "Size: {}", self.len());
        let root = self.root.read();
        match &*root {
            Node::Empty => {
                let _ = writeln!(out, "(empty)");
            }
            node => dump_node(node, 0, &mut out),
        }
        let _ = writeln!(out, "=================");
        out
    }
}

fn dump_node<V: Debug>(node: &Node<V>, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match node {
        Node::Empty => {
            let _ = writeln!(out, "{pad}(detached)");
        }
        Node::Leaf(leaf) => {
            let _ = writeln!(
                out,
                "{pad}Leaf: {:?} -> {:?}",
                String::from_utf8_lossy(&leaf.key),
                leaf.value
            );
        }
        Node::Inner(inner) => {
            let header = &inner.header;
            let _ = writeln!(
                out,
                "{pad}{:?} (prefix={:?}, prefix_len={}, children={})",
                inner.body.kind(),
                String::from_utf8_lossy(&header.partial),
                header.prefix_len,
                header.num_children
            );
            if let Some(leaf) = &header.terminal {
                let _ = writeln!(
                    out,
                    "{pad}  [terminal {:?}] -> {:?}",
                    String::from_utf8_lossy(&leaf.key),
                    leaf.value
                );
            }
            for (byte, child) in inner.body.children() {
                let _ = writeln!(out, "{pad}  [{:?}] ->", byte as char);
                dump_node(&child.read(), indent + 2, out);
            }
        }
    }
}

/// Byte every key under the current path must carry at a given offset.
type Constraint = (usize, u8);

fn verify_node<V>(
    node: &Node<V>,
    depth: usize,
    path: &mut Vec<Constraint>,
    issues: &mut Vec<String>,
    leaves: &mut usize,
) {
    match node {
        Node::Empty => issues.push(format!("detached node reachable at depth {depth}")),
        Node::Leaf(leaf) => {
            *leaves += 1;
            check_key(&leaf.key, path, issues);
            if leaf.key.len() < depth {
                issues.push(format!("leaf {:?} is shorter than its depth {depth}", leaf.key));
            }
        }
        Node::Inner(inner) => {
            let mark = path.len();
            let header = &inner.header;
            if header.partial.len() != header.prefix_len.min(MAX_PREFIX_LEN) {
                issues.push(format!(
                    "stored prefix has {} bytes for prefix_len {}",
                    header.partial.len(),
                    header.prefix_len
                ));
            }
            path.extend(header.partial.iter().enumerate().map(|(i, &b)| (depth + i, b)));
            let split = depth + header.prefix_len;

            if let Some(leaf) = &header.terminal {
                *leaves += 1;
                check_key(&leaf.key, path, issues);
                if leaf.key.len() != split {
                    issues.push(format!(
                        "terminal {:?} does not end at depth {split}",
                        leaf.key
                    ));
                }
            }
            verify_body(inner, issues);

            for (byte, child) in inner.body.children() {
                path.push((split, byte));
                verify_node(&child.read(), split + 1, path, issues, leaves);
                path.pop();
            }
            path.truncate(mark);
        }
    }
}

fn check_key(key: &[u8], path: &[Constraint], issues: &mut Vec<String>) {
    for &(offset, byte) in path {
        if key.get(offset) != Some(&byte) {
            issues.push(format!(
                "key {key:?} disagrees with its path at offset {offset} (expected {byte})"
            ));
            return;
        }
    }
}

fn verify_body<V>(inner: &Inner<V>, issues: &mut Vec<String>) {
    let n = inner.header.num_children;
    let kind = inner.body.kind();
    let actual = inner.body.children().count();
    if actual != n as usize {
        issues.push(format!("{kind:?} has {actual} children but num_children={n}"));
    }

    let (min, max) = match kind {
        NodeKind::Node4 => (1, 4),
        NodeKind::Node16 => (4, 16),
        NodeKind::Node48 => (13, 48),
        NodeKind::Node256 => (38, 256),
        NodeKind::Leaf => (0, 0),
    };
    if !(min..=max).contains(&n) {
        issues.push(format!("{kind:?} holds {n} children, outside {min}..={max}"));
    }
    if kind == NodeKind::Node4 && n < 2 && inner.header.terminal.is_none() {
        issues.push(format!("Node4 with {n} children and no terminal was not collapsed"));
    }

    match &inner.body {
        Body::Node4 { keys, children } => check_sorted(&keys[..children.len()], kind, issues),
        Body::Node16 { keys, children } => check_sorted(&keys[..children.len()], kind, issues),
        Body::Node48 { index, slots } => {
            let mut seen = [false; 48];
            for (byte, &slot) in index.iter().enumerate() {
                if slot == 0 {
                    continue;
                }
                let pos = slot as usize - 1;
                if pos >= 48 || slots[pos].is_none() {
                    issues.push(format!("Node48 byte {byte} points at empty slot {slot}"));
                } else if std::mem::replace(&mut seen[pos], true) {
                    issues.push(format!("Node48 slot {slot} is shared"));
                }
            }
            let filled = slots.iter().filter(|s| s.is_some()).count();
            let indexed = seen.iter().filter(|&&s| s).count();
            if filled != indexed {
                issues.push(format!("Node48 has {filled} filled slots but {indexed} indexed"));
            }
        }
        Body::Node256 { .. } => {}
    }
}

fn check_sorted(keys: &[u8], kind: NodeKind, issues: &mut Vec<String>) {
    if keys.windows(2).any(|w| w[0] >= w[1]) {
        issues.push(format!("{kind:?} keys out of order: {keys:?}"));
    }
}
