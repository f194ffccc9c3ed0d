//! AMLSim CSV records
//!
//! One struct per file, deserialised by header name. Columns not listed
//! here (e.g. `TX_BEHAVIOR_ID`) are ignored.

use serde::{Deserialize, Deserializer, Serialize};

/// Row of `accounts.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "ACCOUNT_ID")]
    pub account_id: u64,

    #[serde(rename = "CUSTOMER_ID", default)]
    pub customer_id: Option<String>,

    /// Opening balance in major units
    #[serde(rename = "INIT_BALANCE")]
    pub init_balance: f64,

    #[serde(rename = "COUNTRY")]
    pub country: String,

    #[serde(rename = "ACCOUNT_TYPE")]
    pub account_type: String,

    #[serde(rename = "IS_SAR", default, deserialize_with = "de_flag")]
    pub is_sar: bool,
}

/// Row of `transactions.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "TX_ID")]
    pub tx_id: i64,

    #[serde(rename = "SENDER_ACCOUNT_ID")]
    pub sender_account_id: u64,

    #[serde(rename = "RECEIVER_ACCOUNT_ID")]
    pub receiver_account_id: u64,

    #[serde(rename = "TX_TYPE")]
    pub tx_type: String,

    /// Amount in major units
    #[serde(rename = "TX_AMOUNT")]
    pub tx_amount: f64,

    #[serde(rename = "TIMESTAMP")]
    pub timestamp: i64,

    #[serde(rename = "IS_SAR", default, deserialize_with = "de_flag")]
    pub is_sar: bool,

    /// AMLSim writes -1 when the transaction belongs to no alert
    #[serde(rename = "ALERT_ID", default)]
    pub alert_id: Option<i64>,
}

impl TransactionRecord {
    /// Alert this transaction belongs to, if any
    pub fn alert(&self) -> Option<i64> {
        self.alert_id.filter(|&id| id >= 0)
    }
}

/// Row of `alerts.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "ALERT_ID")]
    pub alert_id: i64,

    #[serde(rename = "ALERT_TYPE")]
    pub alert_type: String,

    #[serde(rename = "IS_SAR", default, deserialize_with = "de_flag")]
    pub is_sar: bool,

    #[serde(rename = "TX_ID")]
    pub tx_id: i64,

    #[serde(rename = "SENDER_ACCOUNT_ID")]
    pub sender_account_id: u64,

    #[serde(rename = "RECEIVER_ACCOUNT_ID")]
    pub receiver_account_id: u64,

    #[serde(rename = "TX_TYPE")]
    pub tx_type: String,

    #[serde(rename = "TX_AMOUNT")]
    pub tx_amount: f64,

    #[serde(rename = "TIMESTAMP")]
    pub timestamp: i64,
}

/// Accepts `True`/`False` (pandas style), `true`/`false` and `1`/`0`
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean flag '{}'",
            other
        ))),
    }
}
