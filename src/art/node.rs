//! ART node types with adaptive sizing.
//!
//! Every inner node carries a [`Header`] (child count, compressed prefix and
//! an optional terminal leaf) and a [`Body`] whose layout depends on how many
//! children it has:
//!
//! - Node4: Up to 4 children, sorted keys
//! - Node16: 5-16 children, sorted keys compared as one 16-lane mask
//! - Node48: 17-48 children (256-byte index + 48 slots)
//! - Node256: 49-256 children (direct array indexing)
//!
//! Each node lives behind its own lock ([`NodeRef`]). Structural changes
//! rewrite the content of that lock in place, so the `Arc` a parent holds
//! never has to be swapped.

use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

/// Number of compressed-prefix bytes stored inline in a header.
pub(crate) const MAX_PREFIX_LEN: usize = 10;

/// Shared, individually locked reference to a node.
pub(crate) type NodeRef<V> = Arc<RwLock<Node<V>>>;

/// Inline prefix bytes: the first `min(prefix_len, MAX_PREFIX_LEN)` bytes.
pub(crate) type Partial = SmallVec<[u8; MAX_PREFIX_LEN]>;

pub(crate) fn node_ref<V>(node: Node<V>) -> NodeRef<V> {
    Arc::new(RwLock::new(node))
}

/// The type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A leaf holding a full key and its value.
    Leaf,
    /// An inner node with up to 4 children.
    Node4,
    /// An inner node with up to 16 children.
    Node16,
    /// An inner node with up to 48 children.
    Node48,
    /// An inner node with up to 256 children.
    Node256,
}

/// A full key and the value stored for it.
pub(crate) struct Leaf<V> {
    pub(crate) key: Arc<[u8]>,
    pub(crate) value: V,
}

impl<V> Leaf<V> {
    pub(crate) fn new(key: &[u8], value: V) -> Self {
        Self {
            key: Arc::from(key),
            value,
        }
    }

    #[inline]
    pub(crate) fn matches(&self, key: &[u8]) -> bool {
        *self.key == *key
    }
}

/// State shared by all inner variants.
pub(crate) struct Header<V> {
    /// Live children in the body. The terminal leaf is not counted.
    pub(crate) num_children: u16,
    /// Full length of the compressed prefix.
    pub(crate) prefix_len: usize,
    /// Stored prefix bytes; shorter than `prefix_len` when the prefix exceeds
    /// `MAX_PREFIX_LEN`.
    pub(crate) partial: Partial,
    /// Leaf whose key ends exactly after this node's prefix.
    pub(crate) terminal: Option<Leaf<V>>,
}

impl<V> Header<V> {
    fn new() -> Self {
        Self {
            num_children: 0,
            prefix_len: 0,
            partial: Partial::new(),
            terminal: None,
        }
    }

    /// Set a prefix of `len` bytes, storing as much of `source` as fits.
    pub(crate) fn set_prefix(&mut self, source: &[u8], len: usize) {
        let stored = len.min(MAX_PREFIX_LEN);
        self.prefix_len = len;
        self.partial = Partial::from_slice(&source[..stored]);
    }

    /// Optimistic prefix check against the stored bytes only.
    ///
    /// Returns the number of matching bytes; a full match equals
    /// `partial.len()`.
    pub(crate) fn check_prefix(&self, key: &[u8], depth: usize) -> usize {
        let remaining = key.len().saturating_sub(depth);
        let max_cmp = self.partial.len().min(remaining);
        self.partial[..max_cmp]
            .iter()
            .zip(&key[depth..depth + max_cmp])
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Prepend `parent`'s prefix and the dispatch byte that led here.
    ///
    /// Used when a Node4 with a single child is merged into that child.
    pub(crate) fn absorb_parent(&mut self, parent: &Header<V>, byte: u8) {
        let mut partial = parent.partial.clone();
        if parent.prefix_len < MAX_PREFIX_LEN {
            partial.push(byte);
        }
        let room = MAX_PREFIX_LEN.saturating_sub(partial.len());
        partial.extend(self.partial.iter().copied().take(room));
        self.prefix_len += parent.prefix_len + 1;
        self.partial = partial;
    }
}

/// Child storage of an inner node.
pub(crate) enum Body<V> {
    Node4 {
        /// Sorted dispatch bytes; only the first `num_children` are live.
        keys: [u8; 4],
        children: SmallVec<[NodeRef<V>; 4]>,
    },
    Node16 {
        /// Sorted dispatch bytes; only the first `num_children` are live.
        keys: [u8; 16],
        children: Vec<NodeRef<V>>,
    },
    Node48 {
        /// Byte -> 1-based slot; 0 means absent.
        index: Box<[u8; 256]>,
        slots: Box<[Option<NodeRef<V>>; 48]>,
    },
    Node256 {
        children: Box<[Option<NodeRef<V>>; 256]>,
    },
}

impl<V> Body<V> {
    pub(crate) fn node4() -> Self {
        Body::Node4 {
            keys: [0; 4],
            children: SmallVec::new(),
        }
    }

    pub(crate) fn node16() -> Self {
        Body::Node16 {
            keys: [0; 16],
            children: Vec::with_capacity(16),
        }
    }

    pub(crate) fn node48() -> Self {
        Body::Node48 {
            index: Box::new([0; 256]),
            slots: Box::new(std::array::from_fn(|_| None)),
        }
    }

    pub(crate) fn node256() -> Self {
        Body::Node256 {
            children: Box::new(std::array::from_fn(|_| None)),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Body::Node4 { .. } => NodeKind::Node4,
            Body::Node16 { .. } => NodeKind::Node16,
            Body::Node48 { .. } => NodeKind::Node48,
            Body::Node256 { .. } => NodeKind::Node256,
        }
    }

    /// Children in ascending dispatch-byte order.
    pub(crate) fn children(&self) -> Children<'_, V> {
        match self {
            Body::Node4 { keys, children } => Children::Sorted {
                keys: &keys[..children.len()],
                children,
                pos: 0,
            },
            Body::Node16 { keys, children } => Children::Sorted {
                keys: &keys[..children.len()],
                children,
                pos: 0,
            },
            Body::Node48 { index, slots } => Children::Indexed {
                index,
                slots,
                byte: 0,
            },
            Body::Node256 { children } => Children::Direct { children, byte: 0 },
        }
    }

    pub(crate) fn first_child(&self) -> Option<&NodeRef<V>> {
        self.children().next().map(|(_, child)| child)
    }

    pub(crate) fn last_child(&self) -> Option<&NodeRef<V>> {
        match self {
            Body::Node4 { children, .. } => children.last(),
            Body::Node16 { children, .. } => children.last(),
            Body::Node48 { index, slots } => index
                .iter()
                .rev()
                .find(|&&slot| slot != 0)
                .and_then(|&slot| slots[slot as usize - 1].as_ref()),
            Body::Node256 { children } => children.iter().rev().flatten().next(),
        }
    }
}

/// Ordered iterator over `(dispatch byte, child)` pairs.
pub(crate) enum Children<'a, V> {
    Sorted {
        keys: &'a [u8],
        children: &'a [NodeRef<V>],
        pos: usize,
    },
    Indexed {
        index: &'a [u8; 256],
        slots: &'a [Option<NodeRef<V>>; 48],
        byte: usize,
    },
    Direct {
        children: &'a [Option<NodeRef<V>>; 256],
        byte: usize,
    },
}

impl<'a, V> Iterator for Children<'a, V> {
    type Item = (u8, &'a NodeRef<V>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Children::Sorted {
                keys,
                children,
                pos,
            } => {
                let i = *pos;
                let child = children.get(i)?;
                *pos += 1;
                Some((keys[i], child))
            }
            Children::Indexed { index, slots, byte } => {
                while *byte < 256 {
                    let b = *byte;
                    *byte += 1;
                    let slot = index[b];
                    if slot != 0 {
                        if let Some(child) = &slots[slot as usize - 1] {
                            return Some((b as u8, child));
                        }
                    }
                }
                None
            }
            Children::Direct { children, byte } => {
                while *byte < 256 {
                    let b = *byte;
                    *byte += 1;
                    if let Some(child) = &children[b] {
                        return Some((b as u8, child));
                    }
                }
                None
            }
        }
    }
}

/// An inner node: common header plus variant-specific child storage.
pub(crate) struct Inner<V> {
    pub(crate) header: Header<V>,
    pub(crate) body: Body<V>,
}

impl<V> Inner<V> {
    pub(crate) fn new4() -> Self {
        Self {
            header: Header::new(),
            body: Body::node4(),
        }
    }

    /// Key of the smallest leaf beneath this node.
    pub(crate) fn minimum_key(&self) -> Option<Arc<[u8]>> {
        if let Some(terminal) = &self.header.terminal {
            return Some(terminal.key.clone());
        }
        let child = self.body.first_child()?;
        let guard = child.read();
        guard.minimum_key()
    }

    /// A leaf key from which prefix bytes beyond `MAX_PREFIX_LEN` can be read.
    pub(crate) fn representative_key(&self) -> Arc<[u8]> {
        match self.minimum_key() {
            Some(key) => key,
            None => unreachable!("inner node without any leaf beneath it"),
        }
    }

    /// Number of prefix bytes matching `key` from `depth`.
    ///
    /// Unlike [`Header::check_prefix`] this is exact: bytes past the stored
    /// part of a long prefix are compared against a representative leaf. The
    /// result never exceeds `prefix_len`.
    pub(crate) fn prefix_mismatch(&self, key: &[u8], depth: usize) -> usize {
        let header = &self.header;
        let mut idx = header.check_prefix(key, depth);
        if idx < header.partial.len() || header.prefix_len <= MAX_PREFIX_LEN {
            return idx;
        }

        let leaf_key = self.representative_key();
        let limit = (leaf_key.len().min(key.len()) - depth).min(header.prefix_len);
        while idx < limit {
            if leaf_key[depth + idx] != key[depth + idx] {
                return idx;
            }
            idx += 1;
        }
        idx
    }
}

/// A node in the tree.
pub(crate) enum Node<V> {
    /// An absent node. Only the root slot holds this while the tree is
    /// empty; it is also what is left behind in a lock whose content was
    /// moved elsewhere.
    Empty,
    Leaf(Leaf<V>),
    Inner(Inner<V>),
}

impl<V> Node<V> {
    pub(crate) fn kind(&self) -> Option<NodeKind> {
        match self {
            Node::Empty => None,
            Node::Leaf(_) => Some(NodeKind::Leaf),
            Node::Inner(inner) => Some(inner.body.kind()),
        }
    }

    pub(crate) fn minimum_key(&self) -> Option<Arc<[u8]>> {
        match self {
            Node::Empty => None,
            Node::Leaf(leaf) => Some(leaf.key.clone()),
            Node::Inner(inner) => inner.minimum_key(),
        }
    }
}

/// Length of the common run of `a` and `b` starting at `depth`.
pub(crate) fn longest_common_prefix(a: &[u8], b: &[u8], depth: usize) -> usize {
    a[depth..]
        .iter()
        .zip(&b[depth..])
        .take_while(|(x, y)| x == y)
        .count()
}
