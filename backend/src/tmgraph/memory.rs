//! Snapshot memory
//!
//! Double-ended history of graph snapshots, e.g. one snapshot per week of
//! replay. Every element passes [`check_is_graph`] before it is stored, and
//! bulk insertions are all-or-nothing.
//!
//! Memory is unbounded unless built with [`Memory::bounded`], which gives
//! max-length deque semantics:
//! - `append` on a full memory evicts the front (oldest) snapshot
//! - `append_left` on a full memory evicts the back snapshot
//! - `insert` on a full memory fails with [`MemoryError::Full`]
//!
//! Evicted snapshots are dropped; nothing else holds references into them.

use crate::graph::device::Device;
use crate::graph::store::{check_is_graph, GraphError, GraphStore};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors that can occur during memory operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Element {index} is not a valid graph: {source}")]
    InvalidSnapshot {
        index: usize,
        #[source]
        source: GraphError,
    },

    #[error("Insert position {index} out of range (memory holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Memory is full (capacity {0})")]
    Full(usize),
}

/// Type-checked double-ended sequence of graph snapshots
///
/// # Example
///
/// ```rust
/// use aml_graph_core_rs::{AttrMap, AttributedGraph, Memory, BALANCE};
///
/// let mut nodes = AttrMap::new();
/// nodes.insert(BALANCE.to_string(), vec![100]);
/// let graph = AttributedGraph::with_nodes(1, nodes).unwrap();
///
/// let mut memory = Memory::bounded(2);
/// memory.append(graph.clone()).unwrap();
/// memory.append(graph.clone()).unwrap();
/// memory.append(graph).unwrap();
///
/// assert_eq!(memory.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Memory<G: GraphStore> {
    snapshots: VecDeque<G>,
    capacity: Option<usize>,
}

impl<G: GraphStore> Memory<G> {
    /// Unbounded memory; the caller manages its length
    pub fn new() -> Self {
        Self {
            snapshots: VecDeque::new(),
            capacity: None,
        }
    }

    /// Memory holding at most `capacity` snapshots
    ///
    /// # Panics
    /// Panics if `capacity` is zero
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "memory capacity must be positive");
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Push a snapshot at the back
    pub fn append(&mut self, graph: G) -> Result<(), MemoryError> {
        validate(0, &graph)?;
        self.push_back(graph);
        Ok(())
    }

    /// Push a snapshot at the front
    pub fn append_left(&mut self, graph: G) -> Result<(), MemoryError> {
        validate(0, &graph)?;
        self.push_front(graph);
        Ok(())
    }

    /// Push every snapshot at the back, in order
    ///
    /// Nothing is inserted unless every element is valid.
    pub fn extend<I>(&mut self, graphs: I) -> Result<(), MemoryError>
    where
        I: IntoIterator<Item = G>,
    {
        let staged = validate_all(graphs)?;
        for graph in staged {
            self.push_back(graph);
        }
        Ok(())
    }

    /// Push every snapshot at the front, one after another
    ///
    /// The elements end up in reverse iteration order. Nothing is inserted
    /// unless every element is valid.
    pub fn extend_left<I>(&mut self, graphs: I) -> Result<(), MemoryError>
    where
        I: IntoIterator<Item = G>,
    {
        let staged = validate_all(graphs)?;
        for graph in staged {
            self.push_front(graph);
        }
        Ok(())
    }

    /// Insert a snapshot so that it ends up at position `index`
    pub fn insert(&mut self, index: usize, graph: G) -> Result<(), MemoryError> {
        validate(0, &graph)?;
        if index > self.snapshots.len() {
            return Err(MemoryError::IndexOutOfRange {
                index,
                len: self.snapshots.len(),
            });
        }
        if let Some(capacity) = self.capacity {
            if self.snapshots.len() >= capacity {
                return Err(MemoryError::Full(capacity));
            }
        }
        self.snapshots.insert(index, graph);
        Ok(())
    }

    /// Move every held snapshot to `device`
    pub fn to(&mut self, device: Device) {
        for graph in self.snapshots.iter_mut() {
            graph.to_device(device);
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Maximum length, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&G> {
        self.snapshots.get(index)
    }

    pub fn front(&self) -> Option<&G> {
        self.snapshots.front()
    }

    pub fn back(&self) -> Option<&G> {
        self.snapshots.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &G> {
        self.snapshots.iter()
    }

    pub fn pop_front(&mut self) -> Option<G> {
        self.snapshots.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<G> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    fn push_back(&mut self, graph: G) {
        if self.is_full() {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(graph);
    }

    fn push_front(&mut self, graph: G) {
        if self.is_full() {
            self.snapshots.pop_back();
        }
        self.snapshots.push_front(graph);
    }

    fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.snapshots.len() >= capacity)
    }
}

impl<G: GraphStore> Default for Memory<G> {
    fn default() -> Self {
        Self::new()
    }
}

fn validate<G: GraphStore>(index: usize, graph: &G) -> Result<(), MemoryError> {
    check_is_graph(graph).map_err(|source| MemoryError::InvalidSnapshot { index, source })
}

fn validate_all<G, I>(graphs: I) -> Result<Vec<G>, MemoryError>
where
    G: GraphStore,
    I: IntoIterator<Item = G>,
{
    let staged: Vec<G> = graphs.into_iter().collect();
    for (index, graph) in staged.iter().enumerate() {
        validate(index, graph)?;
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attributed::AttributedGraph;
    use crate::graph::store::BALANCE;
    use crate::models::transaction::AttrMap;

    fn graph(balance: i64) -> AttributedGraph {
        let mut nodes = AttrMap::new();
        nodes.insert(BALANCE.to_string(), vec![balance]);
        AttributedGraph::with_nodes(1, nodes).unwrap()
    }

    fn balance(graph: &AttributedGraph) -> i64 {
        graph.node_attr(BALANCE).unwrap()[0]
    }

    #[test]
    fn test_bounded_append_left_evicts_back() {
        let mut memory = Memory::bounded(2);
        memory.append(graph(1)).unwrap();
        memory.append(graph(2)).unwrap();
        memory.append_left(graph(0)).unwrap();

        let balances: Vec<i64> = memory.iter().map(balance).collect();
        assert_eq!(balances, vec![0, 1]);
    }

    #[test]
    #[should_panic(expected = "memory capacity must be positive")]
    fn test_zero_capacity_panics() {
        let _ = Memory::<AttributedGraph>::bounded(0);
    }
}
