//! Account model
//!
//! An account is a node of the transaction graph. Categorical fields
//! (country, account type) are stored already encoded to dense integer ids.
//!
//! CRITICAL: All money values are i64 (cents)

use serde::{Deserialize, Serialize};

/// Encoded AMLSim account
///
/// # Example
/// ```
/// use aml_graph_core_rs::Account;
///
/// let account = Account::new(0, 10_000, 2, 1).with_customer("C_0".to_string());
/// assert_eq!(account.initial_balance(), 10_000);
/// assert_eq!(account.customer_id(), Some("C_0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// AMLSim ACCOUNT_ID
    id: u64,

    /// Opening balance (i64 cents)
    initial_balance: i64,

    /// Encoded COUNTRY
    country: i64,

    /// Encoded ACCOUNT_TYPE
    account_type: i64,

    /// Owning customer, when the source data names one
    customer_id: Option<String>,
}

impl Account {
    /// Create a new account without an owning customer
    pub fn new(id: u64, initial_balance: i64, country: i64, account_type: i64) -> Self {
        Self {
            id,
            initial_balance,
            country,
            account_type,
            customer_id: None,
        }
    }

    /// Attach the owning customer id
    pub fn with_customer(mut self, customer_id: String) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn initial_balance(&self) -> i64 {
        self.initial_balance
    }

    pub fn country(&self) -> i64 {
        self.country
    }

    pub fn account_type(&self) -> i64 {
        self.account_type
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }
}
