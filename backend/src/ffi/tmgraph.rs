//! PyO3 wrapper for TMGraph
//!
//! This module provides the Python interface to the temporal graph.

use std::sync::Arc;

use pyo3::exceptions::{PyIOError, PyNotImplementedError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{batch_error_to_py, dict_to_columns, step_result_to_py, tmgraph_error_to_py};
use crate::graph::device::{Device, ParseDeviceError};
use crate::graph::store::{GraphStore, BALANCE};
use crate::ingest::loader::{load_graph_local, IngestError};
use crate::models::transaction::TransactionBatch;
use crate::tmgraph::{TMGraph as RustTMGraph, TMGraphConfig};

/// Python wrapper for the Rust temporal graph
///
/// # Example (from Python)
///
/// ```python
/// from aml_graph_core_rs import TMGraph
///
/// tmg = TMGraph.from_dir("data/aml_sim_small")
/// result = tmg.step()
/// print(f"t={tmg.t}: {result['num_transactions']} transactions")
/// tmg.reset()
/// ```
#[pyclass(name = "TMGraph")]
pub struct PyTMGraph {
    inner: RustTMGraph,
}

#[pymethods]
impl PyTMGraph {
    /// Load an AMLSim directory as accounts plus a transaction ledger
    ///
    /// Raises IOError if the directory cannot be loaded.
    #[staticmethod]
    #[pyo3(signature = (data_path, backup_initial = true))]
    fn from_dir(data_path: &str, backup_initial: bool) -> PyResult<Self> {
        let loaded = load_graph_local(data_path, false).map_err(ingest_error_to_py)?;
        let config = TMGraphConfig {
            backup_initial,
            ..Default::default()
        };
        let inner = RustTMGraph::with_config(loaded.graph, loaded.ledger.map(Arc::new), config);
        Ok(PyTMGraph { inner })
    }

    /// Advance one timestep
    ///
    /// `transactions`, if given, is a dict of the six batch fields mapped to
    /// lists and takes precedence over the ledger.
    #[pyo3(signature = (transactions = None))]
    fn step(
        &mut self,
        py: Python<'_>,
        transactions: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<Py<PyDict>> {
        let explicit = match transactions {
            Some(dict) => Some(
                TransactionBatch::from_columns(dict_to_columns(dict)?)
                    .map_err(|e| batch_error_to_py(&e))?,
            ),
            None => None,
        };

        let result = self
            .inner
            .step(explicit.as_ref())
            .map_err(tmgraph_error_to_py)?;
        step_result_to_py(py, &result)
    }

    /// Restore the initial graph; returns False when no backup exists
    fn reset(&mut self) -> bool {
        self.inner.reset().is_none()
    }

    /// Historical state retrieval is not supported
    fn get_state(&self, _t: usize) -> PyResult<()> {
        Err(PyNotImplementedError::new_err(
            "historical state retrieval is not implemented",
        ))
    }

    /// Move the live graph to a device ("cpu", "cuda", "cuda:N")
    fn graph_to(&mut self, device: &str) -> PyResult<()> {
        self.inner.graph_to(parse_device(device)?);
        Ok(())
    }

    /// Move the initial-graph backup to a device; returns False when no
    /// backup exists
    fn backup_to(&mut self, device: &str) -> PyResult<bool> {
        Ok(self.inner.backup_to(parse_device(device)?).is_none())
    }

    /// Current time (next timestep to apply)
    #[getter]
    fn t(&self) -> usize {
        self.inner.t()
    }

    /// Account balances in node order (cents)
    fn balances(&self) -> Vec<i64> {
        self.inner
            .graph()
            .node_attr(BALANCE)
            .map(<[i64]>::to_vec)
            .unwrap_or_default()
    }

    fn num_nodes(&self) -> usize {
        self.inner.graph().num_nodes()
    }

    fn num_edges(&self) -> usize {
        self.inner.graph().num_edges()
    }

    /// Timesteps left in the ledger
    fn remaining_steps(&self) -> usize {
        self.inner.remaining_steps()
    }
}

fn parse_device(device: &str) -> PyResult<Device> {
    device
        .parse()
        .map_err(|e: ParseDeviceError| PyValueError::new_err(e.to_string()))
}

fn ingest_error_to_py(err: IngestError) -> PyErr {
    PyIOError::new_err(format!("Failed to load data: {}", err))
}
