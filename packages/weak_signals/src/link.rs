//! Chains of links that know what references them.
//!
//! A classic doubly-linked list stores a pointer to the previous element, which forces every
//! operation to special-case the head of the list. The links in a [`LinkChain`] instead remember
//! the *pointer that references them*: either the head of the chain or the `next` field of
//! another link. Every link is therefore the head of its own sub-chain and splicing a link in or
//! out is the same operation wherever it happens to be.
//!
//! Links live in an arena owned by the chain and are addressed by a generation-checked
//! [`LinkKey`]. Once a link is removed its key never resolves again, even if the storage is
//! reused for another link.

use std::mem;

/// Identifies one link in a [`LinkChain`].
///
/// Keys remain valid until the link is removed from the chain. A stale key is never confused
/// with a newer link stored in the same place.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LinkKey {
    index: usize,
    generation: u64,
}

/// The pointer that references a link.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Back {
    /// The head of the chain.
    Head,

    /// The `next` field of the link at this index.
    After(usize),
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    next: Option<usize>,
    back: Back,
}

#[derive(Debug)]
enum Entry<T> {
    Linked {
        generation: u64,
        node: Node<T>,
    },
    Vacant {
        generation: u64,
        next_free: Option<usize>,
    },
}

/// An ordered chain of values where each link can be removed in O(1) given its [`LinkKey`].
///
/// New links are always inserted at the head. The chain does not interpret the values it
/// stores; it only maintains the order of the links and lets callers splice them.
///
/// # Example
///
/// ```
/// use weak_signals::LinkChain;
///
/// let mut chain = LinkChain::new();
/// let tail = chain.insert_at_head("tail");
/// let head = chain.insert_at_head("head");
///
/// assert_eq!(chain.head(), Some(head));
/// assert_eq!(chain.next(head), Some(tail));
///
/// chain.unlink(head);
/// assert_eq!(chain.head(), Some(tail));
/// assert!(!chain.is_linked(head));
/// ```
#[derive(Debug)]
pub struct LinkChain<T> {
    entries: Vec<Entry<T>>,

    /// Index of the first link, if any.
    head: Option<usize>,

    /// Head of the intrusive freelist of vacant entries.
    next_free: Option<usize>,

    len: usize,
}

impl<T> LinkChain<T> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            head: None,
            next_free: None,
            len: 0,
        }
    }

    /// The number of links in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chain has no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// The first link of the chain.
    #[must_use]
    pub fn head(&self) -> Option<LinkKey> {
        self.head.and_then(|index| self.key_at(index))
    }

    /// The link that follows `key`, or [`None`] if `key` is the last link or is not linked.
    #[must_use]
    pub fn next(&self, key: LinkKey) -> Option<LinkKey> {
        self.node(key)?.next.and_then(|index| self.key_at(index))
    }

    /// Whether `key` identifies a link that is currently part of this chain.
    #[must_use]
    pub fn is_linked(&self, key: LinkKey) -> bool {
        self.node(key).is_some()
    }

    /// The value stored in the link identified by `key`.
    #[must_use]
    pub fn get(&self, key: LinkKey) -> Option<&T> {
        self.node(key).map(|node| &node.value)
    }

    /// Splices a new link in as the first element of the chain.
    pub fn insert_at_head(&mut self, value: T) -> LinkKey {
        let next = self.head;

        let key = self.occupy(Node {
            value,
            next,
            back: Back::Head,
        });

        // The old head is now referenced by the `next` field of the new link.
        if let Some(old_head) = next.and_then(|index| self.node_at_mut(index)) {
            old_head.back = Back::After(key.index);
        }

        self.head = Some(key.index);

        // Cannot overflow because every link occupies memory.
        self.len = self.len.wrapping_add(1);

        key
    }

    /// Removes the link identified by `key` from the chain, returning its value.
    ///
    /// Whatever referenced the removed link now references the link that followed it.
    ///
    /// Returns [`None`] if the key is stale or was never part of this chain.
    pub fn unlink(&mut self, key: LinkKey) -> Option<T> {
        let (next, back) = {
            let node = self.node(key)?;
            (node.next, node.back)
        };

        self.point(back, next);

        if let Some(next_node) = next.and_then(|index| self.node_at_mut(index)) {
            next_node.back = back;
        }

        let vacant = Entry::Vacant {
            generation: key.generation.wrapping_add(1),
            next_free: self.next_free,
        };

        let entry = self.entries.get_mut(key.index)?;

        let Entry::Linked { node, .. } = mem::replace(entry, vacant) else {
            return None;
        };

        self.next_free = Some(key.index);
        self.len = self.len.saturating_sub(1);

        Some(node.value)
    }

    /// Exchanges the positions of two links in the chain.
    ///
    /// Neighbouring links reference each other, so their mutual references are flipped
    /// instead of copied, otherwise a link would end up referencing itself.
    ///
    /// Returns `false` (and does nothing) if either key is not linked.
    pub fn swap(&mut self, a: LinkKey, b: LinkKey) -> bool {
        if a == b {
            return self.is_linked(a);
        }

        let (Some(node_a), Some(node_b)) = (self.node(a), self.node(b)) else {
            return false;
        };

        let (a_back, a_next) = (node_a.back, node_a.next);
        let (b_back, b_next) = (node_b.back, node_b.next);

        let new_a_back = if b_back == Back::After(a.index) {
            Back::After(b.index)
        } else {
            b_back
        };
        let new_a_next = if b_next == Some(a.index) {
            Some(b.index)
        } else {
            b_next
        };
        let new_b_back = if a_back == Back::After(b.index) {
            Back::After(a.index)
        } else {
            a_back
        };
        let new_b_next = if a_next == Some(b.index) {
            Some(a.index)
        } else {
            a_next
        };

        if let Some(node) = self.node_at_mut(a.index) {
            node.back = new_a_back;
            node.next = new_a_next;
        }

        if let Some(node) = self.node_at_mut(b.index) {
            node.back = new_b_back;
            node.next = new_b_next;
        }

        // Fix whatever references each link.
        self.point(new_a_back, Some(a.index));
        self.point(new_b_back, Some(b.index));

        // Fix the back references of the links that follow.
        if let Some(node) = new_a_next.and_then(|index| self.node_at_mut(index)) {
            node.back = Back::After(a.index);
        }

        if let Some(node) = new_b_next.and_then(|index| self.node_at_mut(index)) {
            node.back = Back::After(b.index);
        }

        true
    }

    /// Removes every link, head first. Returns the number of links removed.
    pub fn clear(&mut self) -> usize {
        let mut removed: usize = 0;

        while let Some(head) = self.head() {
            if self.unlink(head).is_none() {
                break;
            }

            // Cannot overflow because every link occupies memory.
            removed = removed.wrapping_add(1);
        }

        removed
    }

    /// Iterates over the links from head to tail.
    pub fn iter(&self) -> LinkIter<'_, T> {
        LinkIter {
            chain: self,
            cursor: self.head,
        }
    }

    fn key_at(&self, index: usize) -> Option<LinkKey> {
        match self.entries.get(index)? {
            Entry::Linked { generation, .. } => Some(LinkKey {
                index,
                generation: *generation,
            }),
            Entry::Vacant { .. } => None,
        }
    }

    fn node(&self, key: LinkKey) -> Option<&Node<T>> {
        match self.entries.get(key.index)? {
            Entry::Linked { generation, node } if *generation == key.generation => Some(node),
            _ => None,
        }
    }

    fn node_at_mut(&mut self, index: usize) -> Option<&mut Node<T>> {
        match self.entries.get_mut(index)? {
            Entry::Linked { node, .. } => Some(node),
            Entry::Vacant { .. } => None,
        }
    }

    /// Makes the pointer identified by `back` reference the link at `target`.
    fn point(&mut self, back: Back, target: Option<usize>) {
        match back {
            Back::Head => self.head = target,
            Back::After(index) => {
                if let Some(node) = self.node_at_mut(index) {
                    node.next = target;
                }
            }
        }
    }

    fn occupy(&mut self, node: Node<T>) -> LinkKey {
        let reusable = self.next_free.and_then(|index| match self.entries.get(index)? {
            Entry::Vacant {
                generation,
                next_free,
            } => Some((index, *generation, *next_free)),
            Entry::Linked { .. } => None,
        });

        if let Some((index, generation, next_free)) = reusable {
            if let Some(entry) = self.entries.get_mut(index) {
                *entry = Entry::Linked { generation, node };
                self.next_free = next_free;
                return LinkKey { index, generation };
            }
        }

        let index = self.entries.len();
        self.entries.push(Entry::Linked {
            generation: 0,
            node,
        });

        LinkKey {
            index,
            generation: 0,
        }
    }
}

impl<T> Default for LinkChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a LinkChain<T> {
    type Item = (LinkKey, &'a T);
    type IntoIter = LinkIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the links of a [`LinkChain`], from head to tail.
#[derive(Debug)]
pub struct LinkIter<'a, T> {
    chain: &'a LinkChain<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for LinkIter<'a, T> {
    type Item = (LinkKey, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;

        match self.chain.entries.get(index)? {
            Entry::Linked { generation, node } => {
                self.cursor = node.next;

                Some((
                    LinkKey {
                        index,
                        generation: *generation,
                    },
                    &node.value,
                ))
            }
            Entry::Vacant { .. } => {
                self.cursor = None;
                None
            }
        }
    }
}
