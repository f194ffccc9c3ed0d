//! Tests for AMLSim dataset loading

use std::fs;
use std::path::Path;

use aml_graph_core_rs::ingest::{
    load_graph_remote, CategoryEncoder, ACCOUNTS_FILE, ALERTS_FILE, TRANSACTIONS_FILE,
};
use aml_graph_core_rs::{
    load_graph_local, AmlData, GraphStore, IngestError, TMGraph, ACCOUNT_TYPE, BALANCE, COUNTRY,
};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

const ACCOUNTS: &str = "\
ACCOUNT_ID,CUSTOMER_ID,INIT_BALANCE,COUNTRY,ACCOUNT_TYPE,IS_SAR,TX_BEHAVIOR_ID
30,C2,10.00,US,I,False,1
10,C1,100.00,US,I,False,1
20,C1,50.50,CA,B,True,2
";

const TRANSACTIONS: &str = "\
TX_ID,SENDER_ACCOUNT_ID,RECEIVER_ACCOUNT_ID,TX_TYPE,TX_AMOUNT,TIMESTAMP,IS_SAR,ALERT_ID
1,10,20,TRANSFER,30.00,0,False,-1
2,20,30,TRANSFER,5.25,0,True,7
3,30,10,CASH,1.00,2,False,-1
";

const ALERTS: &str = "\
ALERT_ID,ALERT_TYPE,IS_SAR,TX_ID,SENDER_ACCOUNT_ID,RECEIVER_ACCOUNT_ID,TX_TYPE,TX_AMOUNT,TIMESTAMP
7,fan_out,True,2,20,30,TRANSFER,5.25,0
";

fn write_dataset(dir: &Path, accounts: &str, transactions: &str, alerts: &str) {
    fs::write(dir.join(ACCOUNTS_FILE), accounts).unwrap();
    fs::write(dir.join(TRANSACTIONS_FILE), transactions).unwrap();
    fs::write(dir.join(ALERTS_FILE), alerts).unwrap();
}

fn dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), ACCOUNTS, TRANSACTIONS, ALERTS);
    dir
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_reads_all_files() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    assert_eq!(data.num_accounts(), 3);
    assert_eq!(data.transaction_records().len(), 3);
    assert_eq!(data.alert_records().len(), 1);
    assert_eq!(data.alert_records()[0].alert_type, "fan_out");
}

#[test]
fn test_node_ids_follow_account_id_order() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    assert_eq!(data.node_id(10), Some(0));
    assert_eq!(data.node_id(20), Some(1));
    assert_eq!(data.node_id(30), Some(2));
    assert_eq!(data.node_id(99), None);
    assert_eq!(data.account_id(2), Some(30));
}

#[test]
fn test_not_a_directory() {
    let dir = dataset();
    let file = dir.path().join(ACCOUNTS_FILE);

    let err = AmlData::load(&file).unwrap_err();

    assert!(matches!(err, IngestError::NotADirectory(path) if path == file));
}

#[test]
fn test_missing_file_is_csv_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(ACCOUNTS_FILE), ACCOUNTS).unwrap();

    let err = AmlData::load(dir.path()).unwrap_err();

    assert!(matches!(err, IngestError::Csv { path, .. } if path.ends_with(TRANSACTIONS_FILE)));
}

#[test]
fn test_unknown_endpoint_rejected() {
    let dir = TempDir::new().unwrap();
    let transactions = "\
TX_ID,SENDER_ACCOUNT_ID,RECEIVER_ACCOUNT_ID,TX_TYPE,TX_AMOUNT,TIMESTAMP,IS_SAR,ALERT_ID
1,10,44,TRANSFER,1.00,0,False,-1
";
    write_dataset(dir.path(), ACCOUNTS, transactions, ALERTS);

    let err = AmlData::load(dir.path()).unwrap_err();

    assert!(matches!(
        err,
        IngestError::UnknownAccount {
            tx_id: 1,
            account_id: 44
        }
    ));
}

#[test]
fn test_duplicate_account_rejected() {
    let dir = TempDir::new().unwrap();
    let accounts = "\
ACCOUNT_ID,CUSTOMER_ID,INIT_BALANCE,COUNTRY,ACCOUNT_TYPE,IS_SAR
10,C1,1.0,US,I,False
10,C1,2.0,US,I,False
20,C2,1.0,US,I,False
30,C2,1.0,US,I,False
";
    write_dataset(dir.path(), accounts, TRANSACTIONS, ALERTS);

    assert!(matches!(
        AmlData::load(dir.path()).unwrap_err(),
        IngestError::DuplicateAccount(10)
    ));
}

#[test]
fn test_load_graph_remote_is_unimplemented() {
    assert!(matches!(
        load_graph_remote("bucket", "path"),
        Err(IngestError::Unimplemented(_))
    ));
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encoders_use_sorted_labels() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();
    let dicts = data.dicts();

    assert_eq!(dicts.country.labels(), &["CA".to_string(), "US".to_string()]);
    assert_eq!(dicts.account_type.encode("B"), Some(0));
    assert_eq!(dicts.account_type.encode("I"), Some(1));
    assert_eq!(dicts.tx_type.encode("CASH"), Some(0));
    assert_eq!(dicts.tx_type.decode(1), Some("TRANSFER"));
    assert_eq!(dicts.tx_type.decode(2), None);
}

#[test]
fn test_category_encoder_rejects_negative_id() {
    let encoder = CategoryEncoder::from_labels(["a"]);
    assert_eq!(encoder.decode(-1), None);
    assert!(CategoryEncoder::from_labels(Vec::<String>::new()).is_empty());
}

#[test]
fn test_node_data_in_cents() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    let nodes = data.node_data().unwrap();

    assert_eq!(nodes[BALANCE], vec![10_000, 5_050, 1_000]);
    assert_eq!(nodes[COUNTRY], vec![1, 0, 1]);
    assert_eq!(nodes[ACCOUNT_TYPE], vec![1, 0, 1]);
}

#[test]
fn test_transaction_batch_maps_endpoints() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    let batch = data.transaction_batch().unwrap();

    assert_eq!(batch.senders(), &[0, 1, 2]);
    assert_eq!(batch.receivers(), &[1, 2, 0]);
    assert_eq!(batch.amounts(), &[3_000, 525, 100]);
    assert_eq!(batch.tx_types(), &[1, 1, 0]);
}

#[test]
fn test_ledger_partitions_by_timestamp() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    let ledger = data.make_transaction_ledger().unwrap();

    assert_eq!(ledger.timesteps().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(ledger.batch(0).unwrap().tx_ids(), &[1, 2]);
    assert_eq!(ledger.batch(2).unwrap().tx_ids(), &[3]);
}

// ============================================================================
// Customers and alerts
// ============================================================================

#[test]
fn test_customer_mappings() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    let owned = data.customer_accounts();
    assert_eq!(owned["C1"], vec![10, 20]);
    assert_eq!(owned["C2"], vec![30]);
    assert_eq!(data.account_to_customer()[&20], "C1");
}

#[test]
fn test_alerts_and_sar_flags() {
    let dir = dataset();
    let data = AmlData::load(dir.path()).unwrap();

    assert_eq!(data.alerts_for_transaction(2).len(), 1);
    assert!(data.alerts_for_transaction(1).is_empty());
    assert_eq!(data.sar_accounts().into_iter().collect::<Vec<_>>(), vec![20]);

    let records = data.transaction_records();
    assert_eq!(records[0].alert(), None);
    assert_eq!(records[1].alert(), Some(7));
    assert!(records[1].is_sar);
}

// ============================================================================
// Graph construction
// ============================================================================

#[test]
fn test_load_all_transactions_builds_full_graph() {
    let dir = dataset();

    let loaded = load_graph_local(dir.path(), true).unwrap();

    assert!(loaded.ledger.is_none());
    assert_eq!(loaded.graph.num_nodes(), 3);
    assert_eq!(loaded.graph.num_edges(), 3);
    assert_eq!(loaded.graph.edge_attr("TX_ID").unwrap(), &[1, 2, 3]);
}

#[test]
fn test_ledger_mode_replays_to_full_graph() {
    let dir = dataset();
    let loaded = load_graph_local(dir.path(), false).unwrap();
    assert_eq!(loaded.graph.num_edges(), 0);

    let ledger = loaded.ledger.map(std::sync::Arc::new);
    let mut tmg = TMGraph::new(loaded.graph, ledger);
    tmg.run_to_end().unwrap();

    let full = loaded.data.full_graph().unwrap();
    assert_eq!(tmg.graph().edges().collect::<Vec<_>>(), full.edges().collect::<Vec<_>>());
    assert_eq!(
        tmg.graph().edge_attr("TX_AMOUNT").unwrap(),
        full.edge_attr("TX_AMOUNT").unwrap()
    );
    // 100.00 - 30.00 + 1.00, 50.50 + 30.00 - 5.25, 10.00 + 5.25 - 1.00
    assert_eq!(
        tmg.graph().node_attr(BALANCE).unwrap(),
        &[7_100, 7_525, 1_425]
    );
}
