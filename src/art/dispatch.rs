//! Child dispatch: find, add (with growth), remove (with shrinking) and the
//! Node4 collapse that follows a removal.

use std::mem;

use tracing::trace;

use super::node::{Body, Inner, Node, NodeRef};

/// Node16 shrinks to Node4 when removal leaves this many children.
const NODE16_SHRINK_AT: u16 = 3;
/// Node48 shrinks to Node16 when removal leaves this many children.
const NODE48_SHRINK_AT: u16 = 12;
/// Node256 shrinks to Node48 when removal leaves this many children.
const NODE256_SHRINK_AT: u16 = 37;

/// Bit `i` set when `keys[i] == byte`, restricted to the first `len` lanes.
#[inline]
fn eq_mask(keys: &[u8; 16], byte: u8, len: usize) -> u32 {
    let mut bits = 0u32;
    for (i, &k) in keys.iter().enumerate() {
        bits |= u32::from(k == byte) << i;
    }
    bits & ((1u32 << len) - 1)
}

/// Bit `i` set when `byte < keys[i]`, restricted to the first `len` lanes.
#[inline]
fn lt_mask(keys: &[u8; 16], byte: u8, len: usize) -> u32 {
    let mut bits = 0u32;
    for (i, &k) in keys.iter().enumerate() {
        bits |= u32::from(byte < k) << i;
    }
    bits & ((1u32 << len) - 1)
}

impl<V> Inner<V> {
    /// Find the child for `byte`.
    pub(crate) fn find_child(&self, byte: u8) -> Option<&NodeRef<V>> {
        match &self.body {
            Body::Node4 { keys, children } => keys[..children.len()]
                .iter()
                .position(|&k| k == byte)
                .map(|i| &children[i]),
            Body::Node16 { keys, children } => {
                let bits = eq_mask(keys, byte, children.len());
                (bits != 0).then(|| &children[bits.trailing_zeros() as usize])
            }
            Body::Node48 { index, slots } => match index[byte as usize] {
                0 => None,
                slot => slots[slot as usize - 1].as_ref(),
            },
            Body::Node256 { children } => children[byte as usize].as_ref(),
        }
    }

    /// Add a child for `byte`, growing into the next variant when full.
    ///
    /// `byte` must not already be present.
    pub(crate) fn add_child(&mut self, byte: u8, child: NodeRef<V>) {
        if self.is_full() {
            self.grow();
        }
        let n = self.header.num_children as usize;
        match &mut self.body {
            Body::Node4 { keys, children } => {
                let pos = keys[..n].iter().position(|&k| byte < k).unwrap_or(n);
                keys.copy_within(pos..n, pos + 1);
                keys[pos] = byte;
                children.insert(pos, child);
            }
            Body::Node16 { keys, children } => {
                let bits = lt_mask(keys, byte, n);
                let pos = if bits != 0 {
                    bits.trailing_zeros() as usize
                } else {
                    n
                };
                keys.copy_within(pos..n, pos + 1);
                keys[pos] = byte;
                children.insert(pos, child);
            }
            Body::Node48 { index, slots } => {
                // Reuse the first free slot.
                let Some(pos) = slots.iter().position(Option::is_none) else {
                    unreachable!("Node48 reported room but has no free slot");
                };
                slots[pos] = Some(child);
                index[byte as usize] = pos as u8 + 1;
            }
            Body::Node256 { children } => {
                children[byte as usize] = Some(child);
            }
        }
        self.header.num_children += 1;
    }

    fn is_full(&self) -> bool {
        let n = self.header.num_children;
        match self.body {
            Body::Node4 { .. } => n >= 4,
            Body::Node16 { .. } => n >= 16,
            Body::Node48 { .. } => n >= 48,
            Body::Node256 { .. } => false,
        }
    }

    /// Move the children into the next larger variant.
    fn grow(&mut self) {
        let old = mem::replace(&mut self.body, Body::node4());
        let from = old.kind();
        self.body = match old {
            Body::Node4 { keys, children } => {
                let mut body = Body::node16();
                if let Body::Node16 {
                    keys: new_keys,
                    children: new_children,
                } = &mut body
                {
                    new_keys[..children.len()].copy_from_slice(&keys[..children.len()]);
                    new_children.extend(children);
                }
                body
            }
            Body::Node16 { keys, children } => {
                let mut body = Body::node48();
                if let Body::Node48 { index, slots } = &mut body {
                    for (i, (byte, child)) in keys.iter().zip(children).enumerate() {
                        slots[i] = Some(child);
                        index[*byte as usize] = i as u8 + 1;
                    }
                }
                body
            }
            Body::Node48 { index, mut slots } => {
                let mut body = Body::node256();
                if let Body::Node256 { children } = &mut body {
                    for (byte, &slot) in index.iter().enumerate() {
                        if slot != 0 {
                            children[byte] = slots[slot as usize - 1].take();
                        }
                    }
                }
                body
            }
            full @ Body::Node256 { .. } => full,
        };
        trace!(?from, to = ?self.body.kind(), children = self.header.num_children, "grew node");
    }

    /// Remove the child for `byte`, shrinking into the next smaller variant
    /// when the count drops to its threshold.
    pub(crate) fn remove_child(&mut self, byte: u8) -> Option<NodeRef<V>> {
        let n = self.header.num_children as usize;
        let removed = match &mut self.body {
            Body::Node4 { keys, children } => {
                let pos = keys[..n].iter().position(|&k| k == byte)?;
                keys.copy_within(pos + 1..n, pos);
                children.remove(pos)
            }
            Body::Node16 { keys, children } => {
                let bits = eq_mask(keys, byte, n);
                if bits == 0 {
                    return None;
                }
                let pos = bits.trailing_zeros() as usize;
                keys.copy_within(pos + 1..n, pos);
                children.remove(pos)
            }
            Body::Node48 { index, slots } => {
                let slot = mem::replace(&mut index[byte as usize], 0);
                if slot == 0 {
                    return None;
                }
                slots[slot as usize - 1].take()?
            }
            Body::Node256 { children } => children[byte as usize].take()?,
        };
        self.header.num_children -= 1;

        let remaining = self.header.num_children;
        let shrink = match self.body {
            Body::Node4 { .. } => false,
            Body::Node16 { .. } => remaining == NODE16_SHRINK_AT,
            Body::Node48 { .. } => remaining == NODE48_SHRINK_AT,
            Body::Node256 { .. } => remaining == NODE256_SHRINK_AT,
        };
        if shrink {
            self.shrink();
        }
        Some(removed)
    }

    /// Move the children into the next smaller variant, keeping byte order.
    fn shrink(&mut self) {
        let old = mem::replace(&mut self.body, Body::node4());
        let from = old.kind();
        self.body = match old {
            Body::Node16 { keys, children } => {
                let mut new_keys = [0u8; 4];
                new_keys[..children.len()].copy_from_slice(&keys[..children.len()]);
                Body::Node4 {
                    keys: new_keys,
                    children: children.into_iter().collect(),
                }
            }
            Body::Node48 { index, mut slots } => {
                let mut body = Body::node16();
                if let Body::Node16 { keys, children } = &mut body {
                    for (byte, &slot) in index.iter().enumerate() {
                        if slot == 0 {
                            continue;
                        }
                        if let Some(child) = slots[slot as usize - 1].take() {
                            keys[children.len()] = byte as u8;
                            children.push(child);
                        }
                    }
                }
                body
            }
            Body::Node256 { mut children } => {
                let mut body = Body::node48();
                if let Body::Node48 { index, slots } = &mut body {
                    let live = children
                        .iter_mut()
                        .enumerate()
                        .filter_map(|(byte, child)| child.take().map(|c| (byte, c)));
                    for (pos, (byte, child)) in live.enumerate() {
                        slots[pos] = Some(child);
                        index[byte] = pos as u8 + 1;
                    }
                }
                body
            }
            small @ Body::Node4 { .. } => small,
        };
        trace!(?from, to = ?self.body.kind(), children = self.header.num_children, "shrank node");
    }
}

impl<V> Node<V> {
    /// Collapse a Node4 that no longer needs to exist.
    ///
    /// A Node4 holding only its terminal leaf becomes that leaf. A Node4 with
    /// a single child and no terminal is replaced by the child, with this
    /// node's prefix and the dispatch byte prepended to the child's prefix.
    /// The child's lock is taken exclusively while its content is moved up;
    /// it is left [`Node::Empty`] and unreachable afterwards.
    pub(crate) fn collapse(&mut self) {
        let Node::Inner(inner) = self else {
            return;
        };
        if inner.header.num_children == 0 {
            if let Some(leaf) = inner.header.terminal.take() {
                trace!("collapsed node4 into its terminal leaf");
                *self = Node::Leaf(leaf);
            }
            return;
        }
        if inner.header.num_children != 1 || inner.header.terminal.is_some() {
            return;
        }
        let Body::Node4 { keys, children } = &mut inner.body else {
            return;
        };
        let byte = keys[0];
        let Some(child) = children.pop() else {
            return;
        };
        inner.header.num_children = 0;

        let content = mem::replace(&mut *child.write(), Node::Empty);
        let merged = match content {
            Node::Inner(mut below) => {
                below.header.absorb_parent(&inner.header, byte);
                Node::Inner(below)
            }
            other => other,
        };
        trace!(byte, "collapsed node4 into its only child");
        *self = merged;
    }
}
