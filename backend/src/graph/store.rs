//! Graph store capability contract
//!
//! The temporal controller and the snapshot memory only need a narrow view
//! of the graph: build from an edge list, append edges, read and write named
//! node/edge attribute arrays, deep copy (`Clone`), and move between devices.
//! Any backend that implements [`GraphStore`] can be replayed.

use crate::graph::device::Device;
use crate::models::transaction::AttrMap;
use thiserror::Error;

/// Node attribute holding the account balance (i64 cents)
pub const BALANCE: &str = "BALANCE";
/// Node attribute holding the encoded country
pub const COUNTRY: &str = "COUNTRY";
/// Node attribute holding the encoded account type
pub const ACCOUNT_TYPE: &str = "ACCOUNT_TYPE";

/// Errors raised by graph stores
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node attribute '{0}' not found")]
    MissingNodeAttribute(String),

    #[error("Edge attribute '{0}' not found")]
    MissingEdgeAttribute(String),

    #[error("Node {node} out of range (graph has {num_nodes} nodes)")]
    NodeOutOfRange { node: usize, num_nodes: usize },

    #[error("Endpoint lists differ in length: {src} sources, {dst} destinations")]
    EndpointLengthMismatch { src: usize, dst: usize },

    #[error("Attribute '{name}' has length {found}, expected {expected}")]
    AttributeLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Edge attribute schema mismatch: graph has {expected:?}, got {found:?}")]
    EdgeSchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Balance of node {node} would overflow")]
    BalanceOverflow { node: usize },
}

/// Capability contract for an attributed, growable graph
///
/// `Clone` must produce a fully independent deep copy: mutating the clone
/// never affects the original. Snapshots and resets rely on this.
pub trait GraphStore: Clone {
    /// Build a graph from an edge list plus node and edge attribute maps
    fn from_edges(
        num_nodes: usize,
        src: Vec<usize>,
        dst: Vec<usize>,
        node_data: AttrMap,
        edge_data: AttrMap,
    ) -> Result<Self, GraphError>
    where
        Self: Sized;

    fn num_nodes(&self) -> usize;

    fn num_edges(&self) -> usize;

    /// Read a node attribute array
    fn node_attr(&self, name: &str) -> Option<&[i64]>;

    /// Write access to a node attribute array
    fn node_attr_mut(&mut self, name: &str) -> Option<&mut [i64]>;

    /// Read an edge attribute array
    fn edge_attr(&self, name: &str) -> Option<&[i64]>;

    /// Write access to an edge attribute array
    fn edge_attr_mut(&mut self, name: &str) -> Option<&mut [i64]>;

    /// Names of the edge attributes, sorted
    fn edge_attr_names(&self) -> Vec<String>;

    /// Append edges `src[i] -> dst[i]` with per-edge attributes
    ///
    /// Implementations must validate everything before mutating, so a
    /// failed call leaves the graph untouched.
    fn add_edges(&mut self, src: &[usize], dst: &[usize], data: AttrMap) -> Result<(), GraphError>;

    /// Endpoints of edge `index`
    fn edge(&self, index: usize) -> Option<(usize, usize)>;

    fn device(&self) -> Device;

    /// Relocate all attribute storage to `device`
    fn to_device(&mut self, device: Device);

    /// Structural integrity check
    ///
    /// Every node attribute has `num_nodes` entries, every edge attribute
    /// has `num_edges` entries, and every endpoint is a valid node.
    fn validate(&self) -> Result<(), GraphError>;
}

/// Runtime gate for values entering snapshot history
///
/// The type system already guarantees `graph` is a [`GraphStore`]; this
/// additionally rejects structurally corrupt graphs.
pub fn check_is_graph<G: GraphStore>(graph: &G) -> Result<(), GraphError> {
    graph.validate()
}
