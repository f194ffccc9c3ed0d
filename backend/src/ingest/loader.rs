//! AMLSim dataset loading
//!
//! Reads `accounts.csv`, `transactions.csv` and `alerts.csv` from a
//! directory and turns them into graph-ready columns.
//!
//! # Load Sequence
//!
//! 1. Read the three record sets (independent of each other)
//! 2. Build the categorical encoders
//! 3. Assign node ids (ascending `ACCOUNT_ID`) and check that every
//!    transaction endpoint is a known account
//! 4. Encode on demand: node attributes, transaction batch, ledger
//!
//! Encoders always exist before anything is encoded.

use crate::graph::attributed::AttributedGraph;
use crate::graph::store::{GraphError, GraphStore, ACCOUNT_TYPE, BALANCE, COUNTRY};
use crate::ingest::encoding::DataDicts;
use crate::ingest::records::{AccountRecord, AlertRecord, TransactionRecord};
use crate::ledger::{Ledger, LedgerError};
use crate::models::account::Account;
use crate::models::money::to_minor_units;
use crate::models::transaction::{AttrMap, BatchError, TransactionBatch};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

pub const ACCOUNTS_FILE: &str = "accounts.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const ALERTS_FILE: &str = "alerts.csv";

/// Errors that can occur while loading a dataset
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Provided data path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Account {0} appears more than once")]
    DuplicateAccount(u64),

    #[error("Transaction {tx_id} references unknown account {account_id}")]
    UnknownAccount { tx_id: i64, account_id: u64 },

    #[error("Unknown {field} label '{label}'")]
    UnknownCategory { field: &'static str, label: String },

    #[error("Invalid {field} value {value} for id {id}")]
    InvalidAmount {
        field: &'static str,
        id: i64,
        value: f64,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),
}

/// Raw AMLSim dataset plus its encoders
#[derive(Debug, Clone)]
pub struct AmlData {
    /// Sorted by `account_id`; position is the node id
    accounts: Vec<AccountRecord>,
    transactions: Vec<TransactionRecord>,
    alerts: Vec<AlertRecord>,
    dicts: DataDicts,
    node_of: BTreeMap<u64, usize>,
}

impl AmlData {
    /// Load the three CSV files from `data_dir`
    ///
    /// # Errors
    /// - `NotADirectory` if `data_dir` is not a directory
    /// - `Csv` if a file is missing or malformed
    /// - the integrity errors of [`AmlData::from_records`]
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, IngestError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(IngestError::NotADirectory(data_dir.to_path_buf()));
        }

        let start = Instant::now();
        let accounts: Vec<AccountRecord> = read_records(&data_dir.join(ACCOUNTS_FILE))?;
        let transactions: Vec<TransactionRecord> =
            read_records(&data_dir.join(TRANSACTIONS_FILE))?;
        let alerts: Vec<AlertRecord> = read_records(&data_dir.join(ALERTS_FILE))?;

        info!(
            accounts = accounts.len(),
            transactions = transactions.len(),
            alerts = alerts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded AMLSim data from {}",
            data_dir.display()
        );

        Self::from_records(accounts, transactions, alerts)
    }

    /// Assemble a dataset from already-parsed records
    ///
    /// # Errors
    /// - `DuplicateAccount` if an account id repeats
    /// - `UnknownAccount` if a transaction endpoint is not an account
    pub fn from_records(
        mut accounts: Vec<AccountRecord>,
        transactions: Vec<TransactionRecord>,
        alerts: Vec<AlertRecord>,
    ) -> Result<Self, IngestError> {
        accounts.sort_by_key(|a| a.account_id);

        let mut node_of = BTreeMap::new();
        for (node, account) in accounts.iter().enumerate() {
            if node_of.insert(account.account_id, node).is_some() {
                return Err(IngestError::DuplicateAccount(account.account_id));
            }
        }

        for tx in &transactions {
            for account_id in [tx.sender_account_id, tx.receiver_account_id] {
                if !node_of.contains_key(&account_id) {
                    return Err(IngestError::UnknownAccount {
                        tx_id: tx.tx_id,
                        account_id,
                    });
                }
            }
        }

        let dicts = DataDicts::build(&accounts, &transactions);

        Ok(Self {
            accounts,
            transactions,
            alerts,
            dicts,
            node_of,
        })
    }

    pub fn num_accounts(&self) -> usize {
        self.accounts.len()
    }

    pub fn account_records(&self) -> &[AccountRecord] {
        &self.accounts
    }

    pub fn transaction_records(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    pub fn alert_records(&self) -> &[AlertRecord] {
        &self.alerts
    }

    pub fn dicts(&self) -> &DataDicts {
        &self.dicts
    }

    /// Node id assigned to an AMLSim account id
    pub fn node_id(&self, account_id: u64) -> Option<usize> {
        self.node_of.get(&account_id).copied()
    }

    /// AMLSim account id of a node
    pub fn account_id(&self, node: usize) -> Option<u64> {
        self.accounts.get(node).map(|a| a.account_id)
    }

    /// Encoded accounts in node order
    pub fn accounts(&self) -> Result<Vec<Account>, IngestError> {
        self.accounts
            .iter()
            .map(|record| -> Result<Account, IngestError> {
                let account = Account::new(
                    record.account_id,
                    balance_cents(record)?,
                    self.encode_country(&record.country)?,
                    self.encode_account_type(&record.account_type)?,
                );
                Ok(match &record.customer_id {
                    Some(customer) => account.with_customer(customer.clone()),
                    None => account,
                })
            })
            .collect()
    }

    /// Node attributes: `BALANCE` (cents), `COUNTRY`, `ACCOUNT_TYPE`
    pub fn node_data(&self) -> Result<AttrMap, IngestError> {
        let accounts = self.accounts()?;
        let mut data = AttrMap::new();
        data.insert(
            BALANCE.to_string(),
            accounts.iter().map(Account::initial_balance).collect(),
        );
        data.insert(
            COUNTRY.to_string(),
            accounts.iter().map(Account::country).collect(),
        );
        data.insert(
            ACCOUNT_TYPE.to_string(),
            accounts.iter().map(Account::account_type).collect(),
        );
        Ok(data)
    }

    /// Every transaction as one batch, endpoints as node ids
    pub fn transaction_batch(&self) -> Result<TransactionBatch, IngestError> {
        let n = self.transactions.len();
        let mut tx_id = Vec::with_capacity(n);
        let mut sender = Vec::with_capacity(n);
        let mut receiver = Vec::with_capacity(n);
        let mut amount = Vec::with_capacity(n);
        let mut timestamp = Vec::with_capacity(n);
        let mut tx_type = Vec::with_capacity(n);

        for tx in &self.transactions {
            tx_id.push(tx.tx_id);
            sender.push(self.endpoint(tx, tx.sender_account_id)?);
            receiver.push(self.endpoint(tx, tx.receiver_account_id)?);
            amount.push(to_minor_units(tx.tx_amount).ok_or(IngestError::InvalidAmount {
                field: "TX_AMOUNT",
                id: tx.tx_id,
                value: tx.tx_amount,
            })?);
            timestamp.push(tx.timestamp);
            tx_type.push(self.dicts.tx_type.encode(&tx.tx_type).ok_or_else(|| {
                IngestError::UnknownCategory {
                    field: "TX_TYPE",
                    label: tx.tx_type.clone(),
                }
            })?);
        }

        Ok(TransactionBatch::new(
            tx_id, sender, receiver, amount, timestamp, tx_type,
        )?)
    }

    /// Partition every transaction into a ledger by timestamp
    pub fn make_transaction_ledger(&self) -> Result<Ledger, IngestError> {
        Ok(Ledger::from_batch(&self.transaction_batch()?)?)
    }

    /// Accounts owned by each customer
    pub fn customer_accounts(&self) -> BTreeMap<String, Vec<u64>> {
        let mut owned: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for account in &self.accounts {
            if let Some(customer) = &account.customer_id {
                owned
                    .entry(customer.clone())
                    .or_default()
                    .push(account.account_id);
            }
        }
        owned
    }

    /// Owning customer of each account
    pub fn account_to_customer(&self) -> BTreeMap<u64, String> {
        self.accounts
            .iter()
            .filter_map(|a| a.customer_id.clone().map(|c| (a.account_id, c)))
            .collect()
    }

    /// Alert rows that reference transaction `tx_id`
    pub fn alerts_for_transaction(&self, tx_id: i64) -> Vec<&AlertRecord> {
        self.alerts.iter().filter(|a| a.tx_id == tx_id).collect()
    }

    /// Accounts flagged as suspicious
    pub fn sar_accounts(&self) -> BTreeSet<u64> {
        self.accounts
            .iter()
            .filter(|a| a.is_sar)
            .map(|a| a.account_id)
            .collect()
    }

    fn endpoint(&self, tx: &TransactionRecord, account_id: u64) -> Result<usize, IngestError> {
        self.node_id(account_id).ok_or(IngestError::UnknownAccount {
            tx_id: tx.tx_id,
            account_id,
        })
    }

    fn encode_country(&self, label: &str) -> Result<i64, IngestError> {
        self.dicts
            .country
            .encode(label)
            .ok_or_else(|| IngestError::UnknownCategory {
                field: "COUNTRY",
                label: label.to_string(),
            })
    }

    fn encode_account_type(&self, label: &str) -> Result<i64, IngestError> {
        self.dicts
            .account_type
            .encode(label)
            .ok_or_else(|| IngestError::UnknownCategory {
                field: "ACCOUNT_TYPE",
                label: label.to_string(),
            })
    }
}

/// A loaded dataset together with its graph and, optionally, its ledger
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub data: AmlData,
    pub graph: AttributedGraph,
    /// Present when transactions were left out of the graph for replay
    pub ledger: Option<Ledger>,
}

impl AmlData {
    /// Graph with every transaction already materialised as an edge
    pub fn full_graph(&self) -> Result<AttributedGraph, IngestError> {
        let batch = self.transaction_batch()?;
        Ok(AttributedGraph::from_edges(
            self.num_accounts(),
            batch.senders().to_vec(),
            batch.receivers().to_vec(),
            self.node_data()?,
            batch.edge_data(),
        )?)
    }

    /// Edgeless graph of accounts, ready for replay
    pub fn account_graph(&self) -> Result<AttributedGraph, IngestError> {
        Ok(AttributedGraph::with_nodes(
            self.num_accounts(),
            self.node_data()?,
        )?)
    }
}

/// Load an AMLSim directory into a graph
///
/// With `load_all_transactions` every transaction becomes an edge up front
/// and no ledger is built. Otherwise the graph holds accounts only and the
/// transactions come back as a ledger for replay.
pub fn load_graph_local(
    data_path: impl AsRef<Path>,
    load_all_transactions: bool,
) -> Result<LoadedGraph, IngestError> {
    let data = AmlData::load(data_path)?;

    let (graph, ledger) = if load_all_transactions {
        info!("loading all transactions into graph");
        (data.full_graph()?, None)
    } else {
        info!("building transaction ledger");
        let ledger = data.make_transaction_ledger()?;
        (data.account_graph()?, Some(ledger))
    };

    info!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        timesteps = ledger.as_ref().map_or(0, Ledger::len),
        "graph created"
    );

    Ok(LoadedGraph {
        data,
        graph,
        ledger,
    })
}

/// Load an AMLSim dataset from object storage
pub fn load_graph_remote(_bucket: &str, _data_path: &str) -> Result<LoadedGraph, IngestError> {
    Err(IngestError::Unimplemented("object storage retrieval"))
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    let to_err = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(to_err)?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(to_err)
}

fn balance_cents(record: &AccountRecord) -> Result<i64, IngestError> {
    to_minor_units(record.init_balance).ok_or(IngestError::InvalidAmount {
        field: "INIT_BALANCE",
        id: record.account_id as i64,
        value: record.init_balance,
    })
}
