//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, lists).

use pyo3::exceptions::{
    PyKeyError, PyNotImplementedError, PyRuntimeError, PyTypeError, PyValueError,
};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::ledger::LedgerError;
use crate::models::transaction::{BatchError, Column, ColumnMap};
use crate::tmgraph::{StepResult, TMGraphError};

// ========================================================================
// Python → Rust
// ========================================================================

/// Convert a `{field: list}` dict into a column map
///
/// Lists of ints become `Int` columns, lists of floats `Float` columns.
///
/// # Errors
/// Raises TypeError for keys that are not strings or values that are not
/// numeric lists.
pub fn dict_to_columns(dict: &Bound<'_, PyDict>) -> PyResult<ColumnMap> {
    let mut columns = ColumnMap::new();
    for (key, value) in dict.iter() {
        let field: String = key
            .extract()
            .map_err(|_| PyTypeError::new_err("transaction field names must be strings"))?;

        let column = if let Ok(ints) = value.extract::<Vec<i64>>() {
            Column::Int(ints)
        } else if let Ok(floats) = value.extract::<Vec<f64>>() {
            Column::Float(floats)
        } else {
            return Err(PyTypeError::new_err(format!(
                "field '{}' must be a list of numbers",
                field
            )));
        };
        columns.insert(field, column);
    }
    Ok(columns)
}

// ========================================================================
// Rust → Python
// ========================================================================

/// Convert a step result into a Python dict
pub fn step_result_to_py(py: Python<'_>, result: &StepResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("timestep", result.timestep)?;
    dict.set_item("num_transactions", result.num_transactions)?;
    dict.set_item("total_amount", result.total_amount)?;
    dict.set_item("source", format!("{:?}", result.source))?;
    Ok(dict.unbind())
}

/// Map a batch error onto the matching Python exception
pub fn batch_error_to_py(err: &BatchError) -> PyErr {
    match err {
        BatchError::TypeMismatch { .. } => PyTypeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Map a controller error onto the matching Python exception
pub fn tmgraph_error_to_py(err: TMGraphError) -> PyErr {
    match &err {
        TMGraphError::InvalidState(_) => PyRuntimeError::new_err(err.to_string()),
        TMGraphError::MissingTimestep(_) => PyKeyError::new_err(err.to_string()),
        TMGraphError::Batch(batch) => batch_error_to_py(batch),
        TMGraphError::Ledger(LedgerError::InvalidBatch { source, .. }) => {
            batch_error_to_py(source)
        }
        TMGraphError::Ledger(LedgerError::Unimplemented(_)) | TMGraphError::Unimplemented(_) => {
            PyNotImplementedError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}
