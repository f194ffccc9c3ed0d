//! Property-based tests for the replay invariants
//!
//! - Total balance is conserved by every step
//! - Each step adds exactly one edge per transaction
//! - Time advances by one per successful step and never otherwise
//! - Reset restores the initial graph no matter how far replay went

use std::sync::Arc;

use aml_graph_core_rs::{
    AttrMap, AttributedGraph, GraphStore, Ledger, Memory, TMGraph, TransactionBatch,
    TransactionRow, BALANCE,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

const MAX_NODES: usize = 8;

fn balances_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1_000_000i64..1_000_000i64, 1..=MAX_NODES)
}

/// Transfers as (sender, receiver, amount); endpoints are reduced modulo the
/// node count when the batch is built
fn transfers_strategy() -> impl Strategy<Value = Vec<(usize, usize, i64)>> {
    prop::collection::vec((0..MAX_NODES, 0..MAX_NODES, 0i64..100_000), 0..20)
}

fn graph(balances: &[i64]) -> AttributedGraph {
    let mut nodes = AttrMap::new();
    nodes.insert(BALANCE.to_string(), balances.to_vec());
    AttributedGraph::with_nodes(balances.len(), nodes).unwrap()
}

fn batch(num_nodes: usize, timestamp: i64, transfers: &[(usize, usize, i64)]) -> TransactionBatch {
    let rows: Vec<TransactionRow> = transfers
        .iter()
        .enumerate()
        .map(|(i, &(sender, receiver, amount))| TransactionRow {
            tx_id: i as i64,
            sender: sender % num_nodes,
            receiver: receiver % num_nodes,
            amount,
            timestamp,
            tx_type: 0,
        })
        .collect();
    TransactionBatch::from_rows(&rows).unwrap()
}

fn total(tmg: &TMGraph) -> i64 {
    tmg.graph().node_attr(BALANCE).unwrap().iter().sum()
}

proptest! {
    // Property: a step never creates or destroys money
    #[test]
    fn test_step_conserves_balance(
        balances in balances_strategy(),
        transfers in transfers_strategy()
    ) {
        let mut tmg = TMGraph::new(graph(&balances), None);
        let before = total(&tmg);

        tmg.step(Some(&batch(balances.len(), 0, &transfers))).unwrap();

        prop_assert_eq!(total(&tmg), before);
    }

    // Property: row order within a batch does not change the settled balances
    #[test]
    fn test_settlement_order_independent(
        balances in balances_strategy(),
        transfers in transfers_strategy()
    ) {
        let mut forward = TMGraph::new(graph(&balances), None);
        let mut backward = TMGraph::new(graph(&balances), None);
        let reversed: Vec<_> = transfers.iter().rev().copied().collect();

        forward.step(Some(&batch(balances.len(), 0, &transfers))).unwrap();
        backward.step(Some(&batch(balances.len(), 0, &reversed))).unwrap();

        prop_assert_eq!(
            forward.graph().node_attr(BALANCE),
            backward.graph().node_attr(BALANCE)
        );
    }

    // Property: edges grow by exactly the batch size, and t by exactly one
    #[test]
    fn test_step_edge_and_time_monotonicity(
        balances in balances_strategy(),
        steps in prop::collection::vec(transfers_strategy(), 1..6)
    ) {
        let mut tmg = TMGraph::new(graph(&balances), None);

        for (t, transfers) in steps.iter().enumerate() {
            let edges_before = tmg.graph().num_edges();
            prop_assert_eq!(tmg.t(), t);

            tmg.step(Some(&batch(balances.len(), t as i64, transfers))).unwrap();

            prop_assert_eq!(tmg.graph().num_edges(), edges_before + transfers.len());
            prop_assert_eq!(tmg.t(), t + 1);
        }
    }

    // Property: a rejected step changes neither graph nor time
    #[test]
    fn test_rejected_step_is_atomic(
        balances in balances_strategy(),
        transfers in transfers_strategy(),
        bad_node in MAX_NODES..MAX_NODES * 2
    ) {
        let mut tmg = TMGraph::new(graph(&balances), None);
        let before = tmg.graph().clone();

        let mut rows: Vec<TransactionRow> = batch(balances.len(), 0, &transfers).rows().collect();
        rows.push(TransactionRow {
            tx_id: -1,
            sender: 0,
            receiver: bad_node,
            amount: 1,
            timestamp: 0,
            tx_type: 0,
        });
        let bad = TransactionBatch::from_rows(&rows).unwrap();

        prop_assert!(tmg.step(Some(&bad)).is_err());
        prop_assert_eq!(tmg.graph(), &before);
        prop_assert_eq!(tmg.t(), 0);
    }

    // Property: reset is exact and idempotent after any replay
    #[test]
    fn test_reset_restores_initial_graph(
        balances in balances_strategy(),
        steps in prop::collection::vec(transfers_strategy(), 0..5)
    ) {
        let num_nodes = balances.len();
        let mut ledger = Ledger::new();
        ledger
            .update(
                steps
                    .iter()
                    .enumerate()
                    .map(|(t, transfers)| (t, batch(num_nodes, t as i64, transfers))),
            )
            .unwrap();

        let initial = graph(&balances);
        let mut tmg = TMGraph::new(initial.clone(), Some(Arc::new(ledger)));
        tmg.run_to_end().unwrap();
        prop_assert_eq!(tmg.t(), steps.len());

        prop_assert_eq!(tmg.reset(), None);
        prop_assert_eq!(tmg.graph(), &initial);
        prop_assert_eq!(tmg.t(), 0);

        prop_assert_eq!(tmg.reset(), None);
        prop_assert_eq!(tmg.graph(), &initial);
    }

    // Property: a bounded memory never exceeds its capacity and keeps the newest
    #[test]
    fn test_bounded_memory_keeps_latest(
        capacity in 1usize..5,
        count in 0usize..12
    ) {
        let mut memory = Memory::bounded(capacity);
        for tag in 0..count {
            memory.append(graph(&[tag as i64])).unwrap();
        }

        prop_assert_eq!(memory.len(), count.min(capacity));
        let tags: Vec<i64> = memory
            .iter()
            .map(|g| g.node_attr(BALANCE).unwrap()[0])
            .collect();
        let expected: Vec<i64> = (count.saturating_sub(capacity)..count)
            .map(|t| t as i64)
            .collect();
        prop_assert_eq!(tags, expected);
    }
}
