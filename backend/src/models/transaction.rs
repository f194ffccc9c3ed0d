//! Transaction batch model
//!
//! A batch holds every transaction applied at one timestep as six
//! equal-length columns:
//! - `TX_ID` - transaction identifier
//! - `SENDER_ACCOUNT_ID` / `RECEIVER_ACCOUNT_ID` - node ids of the endpoints
//! - `TX_AMOUNT` - amount (i64 cents, never negative)
//! - `TIMESTAMP` - the timestep the transaction belongs to
//! - `TX_TYPE` - encoded transaction type
//!
//! Batches arrive either already typed (`TransactionBatch::new`,
//! `from_rows`) or as a loosely typed column map (`from_columns`), which is
//! where schema and type checking happens.
//!
//! CRITICAL: All money values are i64 (cents)

use crate::models::money::to_minor_units;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// ============================================================================
// Schema
// ============================================================================

pub const TX_ID: &str = "TX_ID";
pub const SENDER_ACCOUNT_ID: &str = "SENDER_ACCOUNT_ID";
pub const RECEIVER_ACCOUNT_ID: &str = "RECEIVER_ACCOUNT_ID";
pub const TX_AMOUNT: &str = "TX_AMOUNT";
pub const TIMESTAMP: &str = "TIMESTAMP";
pub const TX_TYPE: &str = "TX_TYPE";

/// The exact field set every batch must carry
pub const BATCH_FIELDS: [&str; 6] = [
    TX_ID,
    SENDER_ACCOUNT_ID,
    RECEIVER_ACCOUNT_ID,
    TX_AMOUNT,
    TIMESTAMP,
    TX_TYPE,
];

/// Batch fields stored as edge attributes (endpoints become edge structure)
pub const EDGE_FIELDS: [&str; 4] = [TX_ID, TX_AMOUNT, TIMESTAMP, TX_TYPE];

/// Named integer columns (node or edge attributes)
pub type AttrMap = BTreeMap<String, Vec<i64>>;

/// Loosely typed column map, keyed by field name
pub type ColumnMap = BTreeMap<String, Column>;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building or validating a batch
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BatchError {
    #[error("Batch schema mismatch: missing {missing:?}, unexpected {extra:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Field {field} must be a numeric array, found {found}")]
    TypeMismatch { field: String, found: &'static str },

    #[error("Field {field} has length {found}, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Field {field} holds invalid value {value} at row {row}")]
    InvalidValue {
        field: String,
        row: usize,
        value: String,
    },

    #[error("Transaction amount must not be negative (row {row}: {amount})")]
    NegativeAmount { row: usize, amount: i64 },

    #[error("Total batch amount overflows i64 at row {row}")]
    TotalOverflow { row: usize },

    #[error("Row {row} has timestamp {found}, expected {expected}")]
    TimestampMismatch {
        row: usize,
        expected: i64,
        found: i64,
    },
}

// ============================================================================
// Columns
// ============================================================================

/// A loosely typed column, as handed over by a tabular data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    Bool(Vec<bool>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the column's element type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Column::Int(_) => "int",
            Column::Float(_) => "float",
            Column::Text(_) => "text",
            Column::Bool(_) => "bool",
        }
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int(values)
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float(values)
    }
}

/// Check that a column map carries exactly the batch fields
pub fn check_schema(columns: &ColumnMap) -> Result<(), BatchError> {
    let required: BTreeSet<&str> = BATCH_FIELDS.iter().copied().collect();
    let present: BTreeSet<&str> = columns.keys().map(String::as_str).collect();

    if required == present {
        return Ok(());
    }

    Err(BatchError::SchemaMismatch {
        missing: required
            .difference(&present)
            .map(|s| s.to_string())
            .collect(),
        extra: present
            .difference(&required)
            .map(|s| s.to_string())
            .collect(),
    })
}

// ============================================================================
// Rows
// ============================================================================

/// One transaction, used to assemble batches row by row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub tx_id: i64,
    pub sender: usize,
    pub receiver: usize,
    pub amount: i64,
    pub timestamp: i64,
    pub tx_type: i64,
}

// ============================================================================
// Batch
// ============================================================================

/// Validated six-column transaction batch
///
/// # Example
/// ```
/// use aml_graph_core_rs::{TransactionBatch, TransactionRow};
///
/// let batch = TransactionBatch::from_rows(&[TransactionRow {
///     tx_id: 1,
///     sender: 0,
///     receiver: 1,
///     amount: 3_000,
///     timestamp: 0,
///     tx_type: 0,
/// }])
/// .unwrap();
///
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch.total_amount(), Ok(3_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBatch {
    tx_id: Vec<i64>,
    sender: Vec<usize>,
    receiver: Vec<usize>,
    amount: Vec<i64>,
    timestamp: Vec<i64>,
    tx_type: Vec<i64>,
}

impl TransactionBatch {
    /// Build a batch from typed columns
    ///
    /// # Errors
    /// - `LengthMismatch` if the columns differ in length
    /// - `NegativeAmount` if any amount is below zero
    /// - `TotalOverflow` if the amounts do not sum within i64
    /// - `InvalidValue` if any timestamp is negative
    pub fn new(
        tx_id: Vec<i64>,
        sender: Vec<usize>,
        receiver: Vec<usize>,
        amount: Vec<i64>,
        timestamp: Vec<i64>,
        tx_type: Vec<i64>,
    ) -> Result<Self, BatchError> {
        let expected = tx_id.len();
        let lengths = [
            (SENDER_ACCOUNT_ID, sender.len()),
            (RECEIVER_ACCOUNT_ID, receiver.len()),
            (TX_AMOUNT, amount.len()),
            (TIMESTAMP, timestamp.len()),
            (TX_TYPE, tx_type.len()),
        ];
        for (field, found) in lengths {
            if found != expected {
                return Err(BatchError::LengthMismatch {
                    field: field.to_string(),
                    expected,
                    found,
                });
            }
        }

        if let Some((row, &amount)) = amount.iter().enumerate().find(|(_, a)| **a < 0) {
            return Err(BatchError::NegativeAmount { row, amount });
        }
        checked_total(&amount)?;

        if let Some((row, ts)) = timestamp.iter().enumerate().find(|(_, t)| **t < 0) {
            return Err(BatchError::InvalidValue {
                field: TIMESTAMP.to_string(),
                row,
                value: ts.to_string(),
            });
        }

        Ok(Self {
            tx_id,
            sender,
            receiver,
            amount,
            timestamp,
            tx_type,
        })
    }

    /// An empty batch (a timestep with no activity)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a batch from individual rows
    pub fn from_rows(rows: &[TransactionRow]) -> Result<Self, BatchError> {
        Self::new(
            rows.iter().map(|r| r.tx_id).collect(),
            rows.iter().map(|r| r.sender).collect(),
            rows.iter().map(|r| r.receiver).collect(),
            rows.iter().map(|r| r.amount).collect(),
            rows.iter().map(|r| r.timestamp).collect(),
            rows.iter().map(|r| r.tx_type).collect(),
        )
    }

    /// Build a batch from a loosely typed column map
    ///
    /// Every field must be an `Int` column, except `TX_AMOUNT` which may
    /// also be a `Float` column of major units (converted to cents).
    /// Account ids must be non-negative.
    ///
    /// # Errors
    /// - `SchemaMismatch` if any field is missing or unexpected
    /// - `TypeMismatch` if a column is not numeric
    /// - the errors of [`TransactionBatch::new`]
    pub fn from_columns(mut columns: ColumnMap) -> Result<Self, BatchError> {
        check_schema(&columns)?;

        // Type checks run over every field before any conversion
        for (field, column) in &columns {
            let numeric = match column {
                Column::Int(_) => true,
                Column::Float(_) => field == TX_AMOUNT,
                Column::Text(_) | Column::Bool(_) => false,
            };
            if !numeric {
                return Err(BatchError::TypeMismatch {
                    field: field.clone(),
                    found: column.type_name(),
                });
            }
        }

        let mut take_int = |field: &str| -> Vec<i64> {
            match columns.remove(field) {
                Some(Column::Int(values)) => values,
                _ => Vec::new(),
            }
        };

        let tx_id = take_int(TX_ID);
        let sender = to_node_ids(SENDER_ACCOUNT_ID, take_int(SENDER_ACCOUNT_ID))?;
        let receiver = to_node_ids(RECEIVER_ACCOUNT_ID, take_int(RECEIVER_ACCOUNT_ID))?;
        let timestamp = take_int(TIMESTAMP);
        let tx_type = take_int(TX_TYPE);

        let amount = match columns.remove(TX_AMOUNT) {
            Some(Column::Int(values)) => values,
            Some(Column::Float(values)) => values
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    to_minor_units(v).ok_or_else(|| BatchError::InvalidValue {
                        field: TX_AMOUNT.to_string(),
                        row,
                        value: v.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        Self::new(tx_id, sender, receiver, amount, timestamp, tx_type)
    }

    /// Check that every row carries the given timestamp
    pub fn check_timestamp(&self, expected: i64) -> Result<(), BatchError> {
        match self.timestamp.iter().position(|&t| t != expected) {
            Some(row) => Err(BatchError::TimestampMismatch {
                row,
                expected,
                found: self.timestamp[row],
            }),
            None => Ok(()),
        }
    }

    /// Number of transactions in the batch
    pub fn len(&self) -> usize {
        self.tx_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx_id.is_empty()
    }

    pub fn tx_ids(&self) -> &[i64] {
        &self.tx_id
    }

    pub fn senders(&self) -> &[usize] {
        &self.sender
    }

    pub fn receivers(&self) -> &[usize] {
        &self.receiver
    }

    pub fn amounts(&self) -> &[i64] {
        &self.amount
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamp
    }

    pub fn tx_types(&self) -> &[i64] {
        &self.tx_type
    }

    /// Row view of transaction `index`
    pub fn row(&self, index: usize) -> Option<TransactionRow> {
        if index >= self.len() {
            return None;
        }
        Some(TransactionRow {
            tx_id: self.tx_id[index],
            sender: self.sender[index],
            receiver: self.receiver[index],
            amount: self.amount[index],
            timestamp: self.timestamp[index],
            tx_type: self.tx_type[index],
        })
    }

    /// Iterate the batch row by row
    pub fn rows(&self) -> impl Iterator<Item = TransactionRow> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    /// Sum of all amounts (i64 cents)
    ///
    /// Batches built through the constructors always fit; a batch
    /// deserialised from elsewhere may not.
    pub fn total_amount(&self) -> Result<i64, BatchError> {
        checked_total(&self.amount)
    }

    /// Edge attributes for this batch: every field except the endpoints
    pub fn edge_data(&self) -> AttrMap {
        let mut data = AttrMap::new();
        data.insert(TX_ID.to_string(), self.tx_id.clone());
        data.insert(TX_AMOUNT.to_string(), self.amount.clone());
        data.insert(TIMESTAMP.to_string(), self.timestamp.clone());
        data.insert(TX_TYPE.to_string(), self.tx_type.clone());
        data
    }

    /// Split into one batch per distinct timestamp, in ascending order
    pub fn partition_by_timestamp(&self) -> BTreeMap<i64, TransactionBatch> {
        let mut parts: BTreeMap<i64, TransactionBatch> = BTreeMap::new();
        for row in self.rows() {
            let part = parts.entry(row.timestamp).or_default();
            part.tx_id.push(row.tx_id);
            part.sender.push(row.sender);
            part.receiver.push(row.receiver);
            part.amount.push(row.amount);
            part.timestamp.push(row.timestamp);
            part.tx_type.push(row.tx_type);
        }
        parts
    }
}

fn checked_total(amounts: &[i64]) -> Result<i64, BatchError> {
    amounts
        .iter()
        .enumerate()
        .try_fold(0i64, |total, (row, &amount)| {
            total
                .checked_add(amount)
                .ok_or(BatchError::TotalOverflow { row })
        })
}

fn to_node_ids(field: &str, values: Vec<i64>) -> Result<Vec<usize>, BatchError> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            usize::try_from(v).map_err(|_| BatchError::InvalidValue {
                field: field.to_string(),
                row,
                value: v.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnMap {
        let mut map = ColumnMap::new();
        map.insert(TX_ID.to_string(), Column::Int(vec![10, 11]));
        map.insert(SENDER_ACCOUNT_ID.to_string(), Column::Int(vec![0, 1]));
        map.insert(RECEIVER_ACCOUNT_ID.to_string(), Column::Int(vec![1, 2]));
        map.insert(TX_AMOUNT.to_string(), Column::Float(vec![1.5, 2.25]));
        map.insert(TIMESTAMP.to_string(), Column::Int(vec![3, 3]));
        map.insert(TX_TYPE.to_string(), Column::Int(vec![0, 1]));
        map
    }

    #[test]
    fn test_float_amounts_become_cents() {
        let batch = TransactionBatch::from_columns(columns()).unwrap();
        assert_eq!(batch.amounts(), &[150, 225]);
    }

    #[test]
    fn test_float_id_column_rejected() {
        let mut map = columns();
        map.insert(TX_ID.to_string(), Column::Float(vec![10.0, 11.0]));
        let err = TransactionBatch::from_columns(map).unwrap_err();
        assert_eq!(
            err,
            BatchError::TypeMismatch {
                field: TX_ID.to_string(),
                found: "float",
            }
        );
    }

    #[test]
    fn test_negative_account_id_rejected() {
        let mut map = columns();
        map.insert(SENDER_ACCOUNT_ID.to_string(), Column::Int(vec![0, -1]));
        assert!(matches!(
            TransactionBatch::from_columns(map),
            Err(BatchError::InvalidValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_total_overflow_rejected() {
        let half = (1i64 << 62) + 1;
        let err = TransactionBatch::new(
            vec![1, 2],
            vec![0, 2],
            vec![1, 3],
            vec![half, half],
            vec![0, 0],
            vec![0, 0],
        )
        .unwrap_err();
        assert_eq!(err, BatchError::TotalOverflow { row: 1 });
    }

    #[test]
    fn test_edge_data_excludes_endpoints() {
        let batch = TransactionBatch::from_columns(columns()).unwrap();
        let data = batch.edge_data();
        assert_eq!(data.len(), EDGE_FIELDS.len());
        assert!(!data.contains_key(SENDER_ACCOUNT_ID));
        assert!(!data.contains_key(RECEIVER_ACCOUNT_ID));
    }
}
