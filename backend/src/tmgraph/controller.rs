//! Temporal graph controller
//!
//! Replays a transaction ledger onto a graph one timestep at a time.
//!
//! # Step Sequence
//!
//! 1. **Resolve**: pick the explicit batch if one was given, otherwise the
//!    ledger entry for the current time
//! 2. **Validate**: endpoints in range, `BALANCE` present, batch total and
//!    net balances fit in i64
//! 3. **Edges**: append one edge per transaction (sender → receiver)
//! 4. **Balances**: debit every sender, credit every receiver
//! 5. **Advance**: `t += 1`
//!
//! Steps 3-4 land together or not at all; `t` only moves after both.
//!
//! # Critical Invariants
//!
//! 1. **Balance conservation**: a step never changes the sum of balances
//! 2. **Edge monotonicity**: a step adds exactly `batch.len()` edges
//! 3. **Time monotonicity**: a successful step advances `t` by exactly one
//! 4. **Backup isolation**: the initial backup is a deep copy and is never
//!    mutated by stepping

use crate::core::time::TimeManager;
use crate::graph::attributed::AttributedGraph;
use crate::graph::device::Device;
use crate::graph::store::{GraphError, GraphStore, BALANCE};
use crate::ledger::{Ledger, LedgerError, Timestep};
use crate::models::transaction::{BatchError, TransactionBatch};
use crate::tmgraph::memory::{Memory, MemoryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Errors and warnings
// ============================================================================

/// Errors that abort a controller operation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TMGraphError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No transactions available for timestep {0}")]
    MissingTimestep(Timestep),

    #[error("Batch rejected: {0}")]
    Batch(#[from] BatchError),

    #[error("Graph rejected update: {0}")]
    Graph(#[from] GraphError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),
}

/// Recoverable conditions: the operation degraded to a no-op
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    #[error("Backup graph does not exist")]
    MissingBackup,

    #[error("Transaction ledger not provided")]
    MissingLedger,
}

// ============================================================================
// Configuration and results
// ============================================================================

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TMGraphConfig {
    /// Deep-copy the graph at construction so `reset` can restore it
    pub backup_initial: bool,

    /// Steps grouped into one period (see [`TMGraph::period_complete`])
    pub steps_per_period: usize,
}

impl Default for TMGraphConfig {
    fn default() -> Self {
        Self {
            backup_initial: true,
            steps_per_period: 1,
        }
    }
}

/// Where the data for a step came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchSource {
    Explicit,
    Ledger,
}

/// Summary of one applied step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Timestep that was applied (value of `t` before the step)
    pub timestep: Timestep,
    /// Transactions applied
    pub num_transactions: usize,
    /// Total value moved (i64 cents)
    pub total_amount: i64,
    pub source: BatchSource,
}

// ============================================================================
// Controller
// ============================================================================

/// Temporal transaction graph
///
/// Owns the live graph and shares a read-only ledger.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use aml_graph_core_rs::{
///     AttrMap, AttributedGraph, GraphStore, Ledger, TMGraph, TransactionBatch, TransactionRow,
///     BALANCE,
/// };
///
/// let mut nodes = AttrMap::new();
/// nodes.insert(BALANCE.to_string(), vec![100, 50]);
/// let graph = AttributedGraph::with_nodes(2, nodes).unwrap();
///
/// let batch = TransactionBatch::from_rows(&[TransactionRow {
///     tx_id: 1, sender: 0, receiver: 1, amount: 30, timestamp: 0, tx_type: 0,
/// }]).unwrap();
/// let mut ledger = Ledger::new();
/// ledger.update([(0, batch)]).unwrap();
///
/// let mut tmg = TMGraph::new(graph, Some(Arc::new(ledger)));
/// tmg.step(None).unwrap();
///
/// assert_eq!(tmg.t(), 1);
/// assert_eq!(tmg.graph().node_attr(BALANCE).unwrap(), &[70, 80]);
/// ```
#[derive(Debug, Clone)]
pub struct TMGraph<G: GraphStore = AttributedGraph> {
    graph: G,
    ledger: Option<Arc<Ledger>>,
    time: TimeManager,
    initial_backup: Option<G>,
}

impl<G: GraphStore> TMGraph<G> {
    /// Create a controller with the default configuration (backup enabled)
    pub fn new(graph: G, ledger: Option<Arc<Ledger>>) -> Self {
        Self::with_config(graph, ledger, TMGraphConfig::default())
    }

    /// Create a controller
    ///
    /// # Panics
    /// Panics if `config.steps_per_period` is zero
    pub fn with_config(graph: G, ledger: Option<Arc<Ledger>>, config: TMGraphConfig) -> Self {
        let initial_backup = config.backup_initial.then(|| graph.clone());
        Self {
            graph,
            ledger,
            time: TimeManager::new(config.steps_per_period),
            initial_backup,
        }
    }

    /// Advance the graph one timestep
    ///
    /// An explicit batch takes precedence over the ledger for this call; the
    /// ledger entry for the current time is neither consulted nor consumed.
    ///
    /// # Errors
    /// - `InvalidState` if no batch is given and there is no ledger
    /// - `MissingTimestep` if the ledger has no entry for the current time
    /// - `Batch` (`TotalOverflow`) if the batch total does not fit in i64
    /// - `Graph` if the batch references unknown nodes, the graph lacks a
    ///   `BALANCE` attribute, a balance would overflow, or the edge
    ///   attributes do not match the graph's
    ///
    /// On error the graph and `t` are unchanged.
    pub fn step(
        &mut self,
        transactions: Option<&TransactionBatch>,
    ) -> Result<StepResult, TMGraphError> {
        let t = self.time.current_step();
        let ledger = self.ledger.clone();

        let (batch, source) = match (transactions, ledger.as_deref()) {
            (Some(batch), _) => (batch, BatchSource::Explicit),
            (None, Some(ledger)) => (
                ledger.get(t).ok_or(TMGraphError::MissingTimestep(t))?,
                BatchSource::Ledger,
            ),
            (None, None) => {
                return Err(TMGraphError::InvalidState(
                    "provide transaction data or init with a transaction ledger".to_string(),
                ))
            }
        };

        let total_amount = self.apply(batch)?;
        self.time.advance_step();

        debug!(
            timestep = t,
            transactions = batch.len(),
            edges = self.graph.num_edges(),
            "applied timestep"
        );

        Ok(StepResult {
            timestep: t,
            num_transactions: batch.len(),
            total_amount,
            source,
        })
    }

    /// Apply the ledger entry for the current time
    ///
    /// Unlike [`TMGraph::step`], a timestep the ledger has no entry for is
    /// applied as an empty batch, so time still advances past gaps.
    ///
    /// # Errors
    /// `InvalidState` without a ledger, otherwise whatever [`TMGraph::step`]
    /// returns.
    pub fn advance(&mut self) -> Result<StepResult, TMGraphError> {
        let has_entry = match &self.ledger {
            Some(ledger) => ledger.contains(self.t()),
            None => {
                return Err(TMGraphError::InvalidState(
                    "advance requires a transaction ledger".to_string(),
                ))
            }
        };

        if has_entry {
            self.step(None)
        } else {
            let mut result = self.step(Some(&TransactionBatch::empty()))?;
            result.source = BatchSource::Ledger;
            Ok(result)
        }
    }

    /// Advance through every remaining ledger timestep
    ///
    /// # Errors
    /// See [`TMGraph::advance`]. Steps applied before a failure stay applied.
    pub fn run_to_end(&mut self) -> Result<Vec<StepResult>, TMGraphError> {
        if self.ledger.is_none() {
            return Err(TMGraphError::InvalidState(
                "run_to_end requires a transaction ledger".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(self.remaining_steps());
        while !self.is_exhausted() {
            results.push(self.advance()?);
        }
        Ok(results)
    }

    /// Full graph as it was at timestep `t`
    ///
    /// Not supported: the controller keeps no per-step history. Use a
    /// [`Memory`] with [`TMGraph::remember`] to retain snapshots.
    pub fn get_state(&self, _t: Timestep) -> Result<G, TMGraphError> {
        Err(TMGraphError::Unimplemented("historical state retrieval"))
    }

    /// Restore the initial backup and rewind to `t = 0`
    ///
    /// Without a backup this logs a warning and changes nothing.
    pub fn reset(&mut self) -> Option<Warning> {
        match &self.initial_backup {
            Some(backup) => {
                self.graph = backup.clone();
                self.time.reset();
                None
            }
            None => Some(report(Warning::MissingBackup)),
        }
    }

    /// Push a deep copy of the live graph onto the back of `memory`
    pub fn remember(&self, memory: &mut Memory<G>) -> Result<(), TMGraphError> {
        memory.append(self.graph.clone())?;
        Ok(())
    }

    /// Move graph, backup and ledger to `device`
    ///
    /// # Errors
    /// `Ledger(Unimplemented)` when a ledger is attached; the graph and
    /// backup have already moved at that point.
    pub fn to(&mut self, device: Device) -> Result<Vec<Warning>, TMGraphError> {
        self.graph_to(device);
        let warnings = [self.backup_to(device), self.ledger_to(device)?];
        Ok(warnings.into_iter().flatten().collect())
    }

    /// Move the live graph to `device`
    pub fn graph_to(&mut self, device: Device) {
        self.graph.to_device(device);
    }

    /// Move the initial backup to `device`
    pub fn backup_to(&mut self, device: Device) -> Option<Warning> {
        match self.initial_backup.as_mut() {
            Some(backup) => {
                backup.to_device(device);
                None
            }
            None => Some(report(Warning::MissingBackup)),
        }
    }

    /// Move the ledger to `device`
    pub fn ledger_to(&mut self, device: Device) -> Result<Option<Warning>, TMGraphError> {
        match &self.ledger {
            Some(ledger) => {
                ledger.to(device)?;
                Ok(None)
            }
            None => Ok(Some(report(Warning::MissingLedger))),
        }
    }

    /// Current time: the next timestep to be applied
    pub fn t(&self) -> Timestep {
        self.time.current_step()
    }

    pub fn time(&self) -> &TimeManager {
        &self.time
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Direct write access to the live graph
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_deref()
    }

    pub fn initial_backup(&self) -> Option<&G> {
        self.initial_backup.as_ref()
    }

    pub fn has_backup(&self) -> bool {
        self.initial_backup.is_some()
    }

    /// Ledger timesteps not yet reached (gaps included), 0 without a ledger
    pub fn remaining_steps(&self) -> usize {
        self.ledger
            .as_ref()
            .and_then(|ledger| ledger.last_timestep())
            .map_or(0, |last| (last + 1).saturating_sub(self.t()))
    }

    /// True once `t` is past the last ledger timestep (or there is no ledger)
    pub fn is_exhausted(&self) -> bool {
        self.remaining_steps() == 0
    }

    /// True when the last step closed a period
    pub fn period_complete(&self) -> bool {
        self.time.is_period_boundary()
    }

    /// Apply one batch: validate, append edges, then write balances
    ///
    /// Returns the total value moved.
    fn apply(&mut self, batch: &TransactionBatch) -> Result<i64, TMGraphError> {
        let total_amount = batch.total_amount()?;
        let balances = self.settled_balances(batch)?;
        self.graph
            .add_edges(batch.senders(), batch.receivers(), batch.edge_data())?;
        if let Some(current) = self.graph.node_attr_mut(BALANCE) {
            current.copy_from_slice(&balances);
        }
        Ok(total_amount)
    }

    /// Balances after applying every transfer in `batch`
    ///
    /// Each node's net delta is summed in i128 and applied once, so the
    /// outcome does not depend on row order. Nothing is written here.
    fn settled_balances(&self, batch: &TransactionBatch) -> Result<Vec<i64>, TMGraphError> {
        let num_nodes = self.graph.num_nodes();
        let current = self
            .graph
            .node_attr(BALANCE)
            .ok_or_else(|| GraphError::MissingNodeAttribute(BALANCE.to_string()))?;

        let mut deltas = vec![0i128; num_nodes];
        let transfers = batch
            .senders()
            .iter()
            .zip(batch.receivers())
            .zip(batch.amounts());
        for ((&sender, &receiver), &amount) in transfers {
            for node in [sender, receiver] {
                if node >= num_nodes {
                    return Err(GraphError::NodeOutOfRange { node, num_nodes }.into());
                }
            }
            deltas[sender] -= i128::from(amount);
            deltas[receiver] += i128::from(amount);
        }

        current
            .iter()
            .zip(&deltas)
            .enumerate()
            .map(|(node, (&balance, &delta))| {
                i64::try_from(i128::from(balance) + delta)
                    .map_err(|_| TMGraphError::Graph(GraphError::BalanceOverflow { node }))
            })
            .collect()
    }
}

fn report(warning: Warning) -> Warning {
    warn!("WARNING: {}", warning);
    warning
}
