//! Categorical encodings
//!
//! Graph attributes are numeric, so string-valued fields (country, account
//! type, transaction type) are mapped to dense integer ids. Ids follow the
//! sorted order of the distinct labels, so the same data always produces
//! the same encoding.

use crate::ingest::records::{AccountRecord, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bidirectional label ↔ id dictionary
///
/// # Example
/// ```
/// use aml_graph_core_rs::ingest::CategoryEncoder;
///
/// let encoder = CategoryEncoder::from_labels(["US", "CA", "US"]);
/// assert_eq!(encoder.len(), 2);
/// assert_eq!(encoder.encode("CA"), Some(0));
/// assert_eq!(encoder.decode(1), Some("US"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    label_to_id: BTreeMap<String, i64>,
    id_to_label: Vec<String>,
}

impl CategoryEncoder {
    /// Build from every label occurrence (duplicates collapse)
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();

        let id_to_label: Vec<String> = distinct.into_iter().collect();
        let label_to_id = id_to_label
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id as i64))
            .collect();

        Self {
            label_to_id,
            id_to_label,
        }
    }

    pub fn encode(&self, label: &str) -> Option<i64> {
        self.label_to_id.get(label).copied()
    }

    pub fn decode(&self, id: i64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.id_to_label.get(index))
            .map(String::as_str)
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.id_to_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_label.is_empty()
    }

    /// Labels in id order
    pub fn labels(&self) -> &[String] {
        &self.id_to_label
    }
}

/// The three encoders an AMLSim dataset needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDicts {
    pub country: CategoryEncoder,
    pub account_type: CategoryEncoder,
    pub tx_type: CategoryEncoder,
}

impl DataDicts {
    /// Build every encoder from the raw records
    pub fn build(accounts: &[AccountRecord], transactions: &[TransactionRecord]) -> Self {
        Self {
            country: CategoryEncoder::from_labels(accounts.iter().map(|a| &a.country)),
            account_type: CategoryEncoder::from_labels(accounts.iter().map(|a| &a.account_type)),
            tx_type: CategoryEncoder::from_labels(transactions.iter().map(|t| &t.tx_type)),
        }
    }
}
