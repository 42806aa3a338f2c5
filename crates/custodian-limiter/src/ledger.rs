//! Insertion-ordered container with auto-generated keys.
//!
//! Nodes are stored by key and doubly linked in insertion order. Keys are
//! minted from a counter that starts at [`constants::FIRST_LEDGER_KEY`] and
//! is never rewound, so a key is never reused and no free-list is needed.
//! Key `0` is the "absent" sentinel; it is the niche of [`LedgerKey`], so
//! `Option<LedgerKey>` costs nothing.
//!
//! Removal from anywhere frees the node at once, and the table shrinks when
//! it is mostly empty, so storage follows the number of live entries rather
//! than the number ever inserted.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;

use custodian_types::{CustodianError, Result, constants};

/// Key of one ledger slot. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LedgerKey(NonZeroU64);

impl LedgerKey {
    /// Wrap a raw key. Returns `None` for the sentinel `0`.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tables at or below twice this capacity are never shrunk.
const MIN_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<LedgerKey>,
    next: Option<LedgerKey>,
}

/// Ordered associative container with O(1) append, O(1) removal anywhere,
/// and forward traversal in insertion order.
#[derive(Debug, Clone)]
pub struct OrderedKeyedLedger<T> {
    nodes: HashMap<LedgerKey, Node<T>>,
    /// Next key to mint.
    next_key: u64,
    head: Option<LedgerKey>,
    tail: Option<LedgerKey>,
    len: usize,
}

impl<T> OrderedKeyedLedger<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_key: constants::FIRST_LEDGER_KEY,
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Append `value` under a freshly minted key.
    ///
    /// # Errors
    /// `ArithmeticOverflow` once 2^64 - 1 keys have been minted.
    pub fn generate(&mut self, value: T) -> Result<LedgerKey> {
        let key = LedgerKey::from_raw(self.next_key).ok_or(CustodianError::ArithmeticOverflow {
            context: "ledger key",
        })?;
        self.next_key = self
            .next_key
            .checked_add(1)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "ledger key",
            })?;

        self.nodes.insert(
            key,
            Node {
                value,
                prev: self.tail,
                next: None,
            },
        );

        match self.tail {
            Some(tail) => {
                if let Some(node) = self.node_mut(tail) {
                    node.next = Some(key);
                }
            }
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.len += 1;
        Ok(key)
    }

    /// Oldest surviving key.
    #[must_use]
    pub fn first(&self) -> Option<LedgerKey> {
        self.head
    }

    /// Newest surviving key.
    #[must_use]
    pub fn last(&self) -> Option<LedgerKey> {
        self.tail
    }

    /// Key inserted immediately after `key`, or `None` if `key` is the
    /// newest (or absent).
    #[must_use]
    pub fn next(&self, key: LedgerKey) -> Option<LedgerKey> {
        self.node(key).and_then(|n| n.next)
    }

    /// Key inserted immediately before `key`.
    #[must_use]
    pub fn prev(&self, key: LedgerKey) -> Option<LedgerKey> {
        self.node(key).and_then(|n| n.prev)
    }

    #[must_use]
    pub fn get(&self, key: LedgerKey) -> Option<&T> {
        self.node(key).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, key: LedgerKey) -> Option<&mut T> {
        self.node_mut(key).map(|n| &mut n.value)
    }

    #[must_use]
    pub fn contains(&self, key: LedgerKey) -> bool {
        self.node(key).is_some()
    }

    /// Delete `key` and return the key that followed it, so callers can
    /// walk and delete without re-querying.
    ///
    /// # Errors
    /// `UnknownLedgerKey` if `key` is not present.
    pub fn remove(&mut self, key: LedgerKey) -> Result<Option<LedgerKey>> {
        self.take(key).map(|(_, next)| next)
    }

    /// Like [`remove`](Self::remove), also handing back the stored value.
    pub fn take(&mut self, key: LedgerKey) -> Result<(T, Option<LedgerKey>)> {
        let node = self
            .nodes
            .remove(&key)
            .ok_or(CustodianError::UnknownLedgerKey(key.get()))?;

        match node.prev {
            Some(prev) => {
                if let Some(p) = self.node_mut(prev) {
                    p.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(n) = self.node_mut(next) {
                    n.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        self.len -= 1;
        self.shrink_if_sparse();
        Ok((node.value, node.next))
    }

    /// Remove every entry. Key minting continues from where it left off.
    pub fn clear(&mut self) {
        self.nodes = HashMap::new();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of entries the ledger can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Forward traversal, oldest first.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ledger: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn node(&self, key: LedgerKey) -> Option<&Node<T>> {
        self.nodes.get(&key)
    }

    fn node_mut(&mut self, key: LedgerKey) -> Option<&mut Node<T>> {
        self.nodes.get_mut(&key)
    }

    /// Shrink the table once fewer than a quarter of its capacity is live.
    fn shrink_if_sparse(&mut self) {
        let capacity = self.nodes.capacity();
        if capacity > 2 * MIN_CAPACITY && self.len < capacity / 4 {
            self.nodes.shrink_to((self.len * 2).max(MIN_CAPACITY));
        }
    }
}

impl<T> Default for OrderedKeyedLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward iterator over `(key, value)` pairs.
pub struct Iter<'a, T> {
    ledger: &'a OrderedKeyedLedger<T>,
    cursor: Option<LedgerKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (LedgerKey, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let node = self.ledger.node(key)?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a OrderedKeyedLedger<T> {
    type Item = (LedgerKey, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
