//! Transaction Ledger
//!
//! Time-indexed store of transaction batches awaiting application. Each
//! timestep maps to exactly one [`TransactionBatch`] whose rows all carry
//! that timestep as their `TIMESTAMP`.
//!
//! # Critical Invariants
//!
//! 1. **Exact schema**: every batch has the six batch fields, no more, no fewer
//! 2. **Time consistency**: batch timestamps equal the containing timestep
//! 3. **Immutability**: once inserted, a timestep's batch is never replaced
//! 4. **All-or-nothing updates**: a rejected update leaves the ledger unchanged

use crate::graph::device::Device;
use crate::models::transaction::{BatchError, ColumnMap, TransactionBatch};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A discrete unit of simulated time
pub type Timestep = usize;

/// Errors that can occur during ledger operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid batch for timestep {timestep}: {source}")]
    InvalidBatch {
        timestep: Timestep,
        #[source]
        source: BatchError,
    },

    #[error("Timestep {0} is already present in the ledger")]
    TimestepOccupied(Timestep),

    #[error("No transactions recorded for timestep {0}")]
    MissingTimestep(Timestep),

    #[error("Timestamp {0} cannot index a timestep")]
    NegativeTimestamp(i64),

    #[error("Timestep {0} does not fit in a timestamp")]
    TimestepOutOfRange(Timestep),

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),
}

/// Validated mapping from timestep to transaction batch
///
/// # Example
///
/// ```rust
/// use aml_graph_core_rs::{Ledger, TransactionBatch, TransactionRow};
///
/// let batch = TransactionBatch::from_rows(&[TransactionRow {
///     tx_id: 1, sender: 0, receiver: 1, amount: 3_000, timestamp: 0, tx_type: 0,
/// }]).unwrap();
///
/// let mut ledger = Ledger::new();
/// ledger.update([(0, batch)]).unwrap();
///
/// assert!(ledger.contains(0));
/// assert_eq!(ledger.batch(0).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<Timestep, TransactionBatch>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition a batch of many timesteps into a ledger
    ///
    /// # Errors
    /// `NegativeTimestamp` if a timestamp is negative
    pub fn from_batch(batch: &TransactionBatch) -> Result<Self, LedgerError> {
        let mut entries = BTreeMap::new();
        for (timestamp, part) in batch.partition_by_timestamp() {
            let timestep = Timestep::try_from(timestamp)
                .map_err(|_| LedgerError::NegativeTimestamp(timestamp))?;
            entries.insert(timestep, part);
        }
        Ok(Self { entries })
    }

    /// Insert typed batches
    ///
    /// Every entry is validated before any is inserted.
    ///
    /// # Errors
    /// - `InvalidBatch` (`TimestampMismatch`) if a row's timestamp differs from its key
    /// - `TimestepOccupied` if a key is already present, or repeated in `entries`
    pub fn update<I>(&mut self, entries: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = (Timestep, TransactionBatch)>,
    {
        let staged: Vec<(Timestep, TransactionBatch)> = entries.into_iter().collect();

        let mut seen = BTreeSet::new();
        for (timestep, batch) in &staged {
            self.validate_addition(*timestep, batch)?;
            if !seen.insert(*timestep) {
                return Err(LedgerError::TimestepOccupied(*timestep));
            }
        }

        self.entries.extend(staged);
        Ok(())
    }

    /// Insert loosely typed column maps
    ///
    /// # Errors
    /// - `InvalidBatch` (`SchemaMismatch`) if a field is missing or unexpected
    /// - `InvalidBatch` (`TypeMismatch`) if a column is not numeric
    /// - everything [`Ledger::update`] rejects
    pub fn update_columns<I>(&mut self, entries: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = (Timestep, ColumnMap)>,
    {
        let typed = entries
            .into_iter()
            .map(|(timestep, columns)| {
                TransactionBatch::from_columns(columns)
                    .map(|batch| (timestep, batch))
                    .map_err(|source| LedgerError::InvalidBatch { timestep, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.update(typed)
    }

    fn validate_addition(
        &self,
        timestep: Timestep,
        batch: &TransactionBatch,
    ) -> Result<(), LedgerError> {
        if self.entries.contains_key(&timestep) {
            return Err(LedgerError::TimestepOccupied(timestep));
        }
        let expected =
            i64::try_from(timestep).map_err(|_| LedgerError::TimestepOutOfRange(timestep))?;
        batch
            .check_timestamp(expected)
            .map_err(|source| LedgerError::InvalidBatch { timestep, source })
    }

    /// Batch for `timestep`, if present
    pub fn get(&self, timestep: Timestep) -> Option<&TransactionBatch> {
        self.entries.get(&timestep)
    }

    /// Batch for `timestep`
    ///
    /// # Errors
    /// `MissingTimestep` if the ledger has no entry for `timestep`
    pub fn batch(&self, timestep: Timestep) -> Result<&TransactionBatch, LedgerError> {
        self.get(timestep)
            .ok_or(LedgerError::MissingTimestep(timestep))
    }

    pub fn contains(&self, timestep: Timestep) -> bool {
        self.entries.contains_key(&timestep)
    }

    /// Number of timesteps with a batch
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All timesteps, ascending
    pub fn timesteps(&self) -> impl Iterator<Item = Timestep> + '_ {
        self.entries.keys().copied()
    }

    pub fn first_timestep(&self) -> Option<Timestep> {
        self.entries.keys().next().copied()
    }

    pub fn last_timestep(&self) -> Option<Timestep> {
        self.entries.keys().next_back().copied()
    }

    /// Total number of transactions across all timesteps
    pub fn num_transactions(&self) -> usize {
        self.entries.values().map(TransactionBatch::len).sum()
    }

    /// Iterate `(timestep, batch)` in ascending time order
    pub fn iter(&self) -> impl Iterator<Item = (Timestep, &TransactionBatch)> {
        self.entries.iter().map(|(t, b)| (*t, b))
    }

    /// Move ledger storage to `device`
    ///
    /// Whether batches should move eagerly or on retrieval is undecided, so
    /// this fails rather than silently doing nothing.
    pub fn to(&self, _device: Device) -> Result<(), LedgerError> {
        Err(LedgerError::Unimplemented("ledger device transfer"))
    }
}
