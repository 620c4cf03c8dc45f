//! Ordered, name-indexed node list
//!
//! Nodes live in a vector and are linked by index, so ids stay stable for
//! the life of the list. A hash map from the case-folded name to the node
//! index gives O(1) lookup; the prev/next links give O(1) positional insert.

use std::collections::HashMap;
use ahash::RandomState;

use crate::error::{Error, Result};

/// Node in the doubly-linked list
struct Node<V> {
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Where a new node goes relative to the existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Front,
    Back,
    Before(usize),
    After(usize),
}

/// Insertion-ordered list with case-insensitive name lookup
pub(crate) struct OrderedList<V> {
    map: HashMap<String, usize, RandomState>,
    nodes: Vec<Node<V>>,
    head: Option<usize>,
    tail: Option<usize>,
}

/// Case-fold a name for lookup
pub(crate) fn fold(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

impl<V> OrderedList<V> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Index of the node registered under `name`, ignoring case
    pub fn find(&self, name: &str) -> Option<usize> {
        self.map.get(&fold(name)).copied()
    }

    pub fn get(&self, idx: usize) -> Option<&V> {
        self.nodes.get(idx).map(|node| &node.value)
    }

    /// Value of a node reached through `first`/`next_of`, which only hand
    /// out indices of linked nodes
    pub fn at(&self, idx: usize) -> &V {
        &self.nodes[idx].value
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut V> {
        self.nodes.get_mut(idx).map(|node| &mut node.value)
    }

    pub fn first(&self) -> Option<usize> {
        self.head
    }

    /// Index of the node following `idx` in list order
    pub fn next_of(&self, idx: usize) -> Option<usize> {
        self.nodes.get(idx).and_then(|node| node.next)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk the values in list order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Link a new node under `name` at `position`.
    ///
    /// The caller guarantees `name` is not already present. An anchor index
    /// that does not exist is rejected before anything is modified.
    pub fn insert(&mut self, name: &str, value: V, position: Position) -> Result<usize> {
        if let Position::Before(anchor) | Position::After(anchor) = position {
            if anchor >= self.nodes.len() {
                return Err(Error::InvalidArgument("anchor does not belong to this list"));
            }
        }

        let folded = fold(name);
        self.nodes
            .try_reserve(1)
            .map_err(Error::out_of_memory(std::mem::size_of::<Node<V>>()))?;
        self.map
            .try_reserve(1)
            .map_err(Error::out_of_memory(folded.len()))?;

        let idx = self.nodes.len();
        self.nodes.push(Node {
            value,
            prev: None,
            next: None,
        });
        self.map.insert(folded, idx);

        if self.head.is_none() {
            self.head = Some(idx);
            self.tail = Some(idx);
            return Ok(idx);
        }

        match position {
            Position::Front => self.link_before(idx, self.head),
            Position::Back => self.link_after(idx, self.tail),
            Position::Before(anchor) => self.link_before(idx, Some(anchor)),
            Position::After(anchor) => self.link_after(idx, Some(anchor)),
        }

        Ok(idx)
    }

    fn link_before(&mut self, idx: usize, anchor: Option<usize>) {
        let Some(anchor) = anchor else {
            return;
        };
        let prev = self.nodes[anchor].prev;

        self.nodes[idx].prev = prev;
        self.nodes[idx].next = Some(anchor);
        self.nodes[anchor].prev = Some(idx);

        match prev {
            Some(prev_idx) => self.nodes[prev_idx].next = Some(idx),
            None => self.head = Some(idx),
        }
    }

    fn link_after(&mut self, idx: usize, anchor: Option<usize>) {
        let Some(anchor) = anchor else {
            return;
        };
        let next = self.nodes[anchor].next;

        self.nodes[idx].prev = Some(anchor);
        self.nodes[idx].next = next;
        self.nodes[anchor].next = Some(idx);

        match next {
            Some(next_idx) => self.nodes[next_idx].prev = Some(idx),
            None => self.tail = Some(idx),
        }
    }
}

impl<V> Default for OrderedList<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over an [`OrderedList`]
pub(crate) struct Iter<'a, V> {
    list: &'a OrderedList<V>,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (usize, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.list.nodes[idx];
        self.cursor = node.next;
        Some((idx, &node.value))
    }
}
