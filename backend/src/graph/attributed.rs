//! Attributed transaction graph
//!
//! Concrete [`GraphStore`]: nodes are accounts, edges are transactions.
//! Structure is kept as two parallel endpoint vectors (edge `i` runs
//! `src[i] -> dst[i]`), attributes as named i64 columns.
//!
//! # Critical Invariants
//!
//! 1. Every node attribute has exactly `num_nodes` entries
//! 2. Every edge attribute has exactly `num_edges` entries
//! 3. Every endpoint is `< num_nodes`
//! 4. Once a graph has edge attributes, appended edges carry exactly the
//!    same attribute names

use crate::graph::device::Device;
use crate::graph::store::{GraphError, GraphStore};
use crate::models::transaction::AttrMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// In-memory attributed multigraph
///
/// # Example
///
/// ```rust
/// use aml_graph_core_rs::{AttributedGraph, AttrMap, GraphStore, BALANCE};
///
/// let mut nodes = AttrMap::new();
/// nodes.insert(BALANCE.to_string(), vec![100, 50]);
///
/// let mut graph = AttributedGraph::with_nodes(2, nodes).unwrap();
/// let mut edges = AttrMap::new();
/// edges.insert("TX_AMOUNT".to_string(), vec![30]);
/// graph.add_edges(&[0], &[1], edges).unwrap();
///
/// assert_eq!(graph.num_edges(), 1);
/// assert_eq!(graph.edge(0), Some((0, 1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedGraph {
    num_nodes: usize,
    src: Vec<usize>,
    dst: Vec<usize>,
    node_data: AttrMap,
    edge_data: AttrMap,
    #[serde(default)]
    device: Device,
}

/// Content that identifies a graph state (device placement excluded)
#[derive(Serialize)]
struct CanonicalGraph<'a> {
    num_nodes: usize,
    src: &'a [usize],
    dst: &'a [usize],
    node_data: &'a AttrMap,
    edge_data: &'a AttrMap,
}

impl AttributedGraph {
    /// Create an edgeless graph with the given node attributes
    pub fn with_nodes(num_nodes: usize, node_data: AttrMap) -> Result<Self, GraphError> {
        Self::from_edges(num_nodes, Vec::new(), Vec::new(), node_data, AttrMap::new())
    }

    /// Replace (or add) a node attribute array
    pub fn set_node_attr(&mut self, name: &str, values: Vec<i64>) -> Result<(), GraphError> {
        check_len(name, self.num_nodes, values.len())?;
        self.node_data.insert(name.to_string(), values);
        Ok(())
    }

    /// Replace an existing edge attribute array
    pub fn set_edge_attr(&mut self, name: &str, values: Vec<i64>) -> Result<(), GraphError> {
        if !self.edge_data.contains_key(name) {
            return Err(GraphError::MissingEdgeAttribute(name.to_string()));
        }
        check_len(name, self.src.len(), values.len())?;
        self.edge_data.insert(name.to_string(), values);
        Ok(())
    }

    /// Names of the node attributes, sorted
    pub fn node_attr_names(&self) -> Vec<String> {
        self.node_data.keys().cloned().collect()
    }

    /// Iterate all edges as `(src, dst)` in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.src.iter().copied().zip(self.dst.iter().copied())
    }

    /// Number of edges leaving `node`
    pub fn out_degree(&self, node: usize) -> usize {
        self.src.iter().filter(|&&s| s == node).count()
    }

    /// Number of edges entering `node`
    pub fn in_degree(&self, node: usize) -> usize {
        self.dst.iter().filter(|&&d| d == node).count()
    }

    /// Sum of a node attribute (e.g. total balance), `None` if absent
    ///
    /// Summed in i128 so large balances cannot overflow.
    pub fn node_attr_sum(&self, name: &str) -> Option<i128> {
        self.node_data
            .get(name)
            .map(|values| values.iter().copied().map(i128::from).sum())
    }

    /// SHA-256 over the canonical JSON form of the graph content
    ///
    /// Two graphs with the same structure and attributes have the same
    /// fingerprint regardless of device placement.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let canonical = CanonicalGraph {
            num_nodes: self.num_nodes,
            src: &self.src,
            dst: &self.dst,
            node_data: &self.node_data,
            edge_data: &self.edge_data,
        };
        let json = serde_json::to_vec(&canonical)?;

        let mut hasher = Sha256::new();
        hasher.update(&json);
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn check_endpoints(&self, src: &[usize], dst: &[usize]) -> Result<(), GraphError> {
        if src.len() != dst.len() {
            return Err(GraphError::EndpointLengthMismatch {
                src: src.len(),
                dst: dst.len(),
            });
        }
        match src.iter().chain(dst).find(|&&n| n >= self.num_nodes) {
            Some(&node) => Err(GraphError::NodeOutOfRange {
                node,
                num_nodes: self.num_nodes,
            }),
            None => Ok(()),
        }
    }
}

impl GraphStore for AttributedGraph {
    fn from_edges(
        num_nodes: usize,
        src: Vec<usize>,
        dst: Vec<usize>,
        node_data: AttrMap,
        edge_data: AttrMap,
    ) -> Result<Self, GraphError> {
        let graph = Self {
            num_nodes,
            src,
            dst,
            node_data,
            edge_data,
            device: Device::Cpu,
        };
        graph.validate()?;
        Ok(graph)
    }

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_edges(&self) -> usize {
        self.src.len()
    }

    fn node_attr(&self, name: &str) -> Option<&[i64]> {
        self.node_data.get(name).map(Vec::as_slice)
    }

    fn node_attr_mut(&mut self, name: &str) -> Option<&mut [i64]> {
        self.node_data.get_mut(name).map(Vec::as_mut_slice)
    }

    fn edge_attr(&self, name: &str) -> Option<&[i64]> {
        self.edge_data.get(name).map(Vec::as_slice)
    }

    fn edge_attr_mut(&mut self, name: &str) -> Option<&mut [i64]> {
        self.edge_data.get_mut(name).map(Vec::as_mut_slice)
    }

    fn edge_attr_names(&self) -> Vec<String> {
        self.edge_data.keys().cloned().collect()
    }

    fn add_edges(&mut self, src: &[usize], dst: &[usize], data: AttrMap) -> Result<(), GraphError> {
        self.check_endpoints(src, dst)?;

        // An edgeless graph without edge attributes adopts the incoming schema
        let adopting = self.src.is_empty() && self.edge_data.is_empty();
        if !adopting && !data.keys().eq(self.edge_data.keys()) {
            return Err(GraphError::EdgeSchemaMismatch {
                expected: self.edge_attr_names(),
                found: data.keys().cloned().collect(),
            });
        }
        for (name, values) in &data {
            check_len(name, src.len(), values.len())?;
        }

        self.src.extend_from_slice(src);
        self.dst.extend_from_slice(dst);
        for (name, values) in data {
            self.edge_data.entry(name).or_default().extend(values);
        }
        Ok(())
    }

    fn edge(&self, index: usize) -> Option<(usize, usize)> {
        Some((*self.src.get(index)?, *self.dst.get(index)?))
    }

    fn device(&self) -> Device {
        self.device
    }

    fn to_device(&mut self, device: Device) {
        // Columns stay in host memory; only the placement tag moves
        self.device = device;
    }

    fn validate(&self) -> Result<(), GraphError> {
        if self.src.len() != self.dst.len() {
            return Err(GraphError::EndpointLengthMismatch {
                src: self.src.len(),
                dst: self.dst.len(),
            });
        }
        self.check_endpoints(&self.src, &self.dst)?;
        for (name, values) in &self.node_data {
            check_len(name, self.num_nodes, values.len())?;
        }
        for (name, values) in &self.edge_data {
            check_len(name, self.src.len(), values.len())?;
        }
        Ok(())
    }
}

fn check_len(name: &str, expected: usize, found: usize) -> Result<(), GraphError> {
    if expected == found {
        Ok(())
    } else {
        Err(GraphError::AttributeLength {
            name: name.to_string(),
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::BALANCE;

    fn two_nodes() -> AttributedGraph {
        let mut nodes = AttrMap::new();
        nodes.insert(BALANCE.to_string(), vec![100, 50]);
        AttributedGraph::with_nodes(2, nodes).unwrap()
    }

    fn amounts(values: Vec<i64>) -> AttrMap {
        let mut data = AttrMap::new();
        data.insert("TX_AMOUNT".to_string(), values);
        data
    }

    #[test]
    fn test_first_insertion_adopts_schema() {
        let mut graph = two_nodes();
        graph.add_edges(&[0], &[1], amounts(vec![30])).unwrap();
        assert_eq!(graph.edge_attr_names(), vec!["TX_AMOUNT".to_string()]);
    }

    #[test]
    fn test_schema_mismatch_leaves_graph_untouched() {
        let mut graph = two_nodes();
        graph.add_edges(&[0], &[1], amounts(vec![30])).unwrap();
        let before = graph.clone();

        let mut other = AttrMap::new();
        other.insert("TIMESTAMP".to_string(), vec![1]);
        let err = graph.add_edges(&[1], &[0], other).unwrap_err();

        assert!(matches!(err, GraphError::EdgeSchemaMismatch { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_out_of_range_endpoint_rejected() {
        let mut graph = two_nodes();
        let err = graph.add_edges(&[0], &[2], amounts(vec![1])).unwrap_err();
        assert_eq!(err, GraphError::NodeOutOfRange { node: 2, num_nodes: 2 });
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_node_attr_sum_is_wide() {
        let mut nodes = AttrMap::new();
        nodes.insert(BALANCE.to_string(), vec![i64::MAX, i64::MAX]);
        let graph = AttributedGraph::with_nodes(2, nodes).unwrap();
        assert_eq!(graph.node_attr_sum(BALANCE), Some(2 * i128::from(i64::MAX)));
    }

    #[test]
    fn test_fingerprint_ignores_device() {
        let graph = two_nodes();
        let mut moved = graph.clone();
        moved.to_device(Device::Cuda(0));
        assert_eq!(graph.fingerprint().unwrap(), moved.fingerprint().unwrap());
    }
}
