//! Graph-structure detectors: influence, layering depth, counterparty
//! concentration, deep forwarding chains, and cross-account coordination.

use std::collections::{HashMap, HashSet, VecDeque};

use ringlens_core::{StatsCache, TransactionGraph, HOUR_MS};

use crate::detectors::distinct_receivers;
use crate::signals::{Signal, SignalMap};

/// PageRank damping factor.
const DAMPING: f64 = 0.85;

/// Fixed iteration count; kept low to match the reference output exactly.
const INFLUENCE_ITERATIONS: usize = 3;

/// Layering BFS bounds.
const LAYERING_MAX_DEPTH: usize = 6;
const LAYERING_VISIT_CAP: usize = 100;

/// Chain DFS bounds.
const CHAIN_MAX_DEPTH: usize = 8;
const CHAIN_MIN_LEN: usize = 5;
const CHAINS_RETAINED: usize = 3;

/// Coordination scan bounds.
const COORDINATION_MIN_DEGREE: usize = 20;
const COORDINATION_TOP: usize = 100;
const COORDINATION_LOOKAHEAD: usize = 20;
const COORDINATION_TOLERANCE_MS: i64 = HOUR_MS;

/// Weighted PageRank-style influence over amount-weighted edges, run for
/// three iterations with uniform teleport and normalized by the maximum
/// final value. Batches larger than `sample_size` are restricted to the most
/// active accounts.
pub fn detect_network_influence(
    graph: &TransactionGraph,
    stats: &StatsCache,
    sample_size: usize,
) -> SignalMap {
    let mut accounts: Vec<&str> = graph.accounts().iter().map(String::as_str).collect();
    if accounts.len() > sample_size {
        accounts.sort_by(|a, b| {
            stats
                .activity_of(b)
                .cmp(&stats.activity_of(a))
                .then_with(|| a.cmp(b))
        });
        accounts.truncate(sample_size);
        accounts.sort_unstable();
    }
    let index: HashMap<&str, usize> = accounts.iter().enumerate().map(|(i, &a)| (a, i)).collect();
    let n = accounts.len();
    if n == 0 {
        return SignalMap::new();
    }

    // Amount-weighted adjacency restricted to the sample.
    let mut out_weight = vec![0.0f64; n];
    let mut edges: HashMap<(usize, usize), f64> = HashMap::new();
    for txn in graph.transactions() {
        let (Some(&u), Some(&v)) = (
            index.get(txn.sender_id.as_str()),
            index.get(txn.receiver_id.as_str()),
        ) else {
            continue;
        };
        *edges.entry((u, v)).or_insert(0.0) += txn.amount;
        out_weight[u] += txn.amount;
    }

    let teleport = (1.0 - DAMPING) / n as f64;
    let mut rank = vec![1.0 / n as f64; n];
    for _ in 0..INFLUENCE_ITERATIONS {
        let mut next = vec![teleport; n];
        for (&(u, v), &weight) in &edges {
            if out_weight[u] > 0.0 {
                next[v] += DAMPING * rank[u] * weight / out_weight[u];
            }
        }
        rank = next;
    }

    let max_rank = rank.iter().cloned().fold(0.0f64, f64::max);
    if max_rank <= 0.0 {
        return SignalMap::new();
    }

    let mut signals = SignalMap::new();
    for (i, &account) in accounts.iter().enumerate() {
        let normalized = rank[i] / max_rank;
        if normalized > 0.5 {
            signals.insert(account.to_string(), Signal::NetworkInfluence { normalized });
        }
    }
    signals
}

/// Bounded BFS measuring how deep funds can be traced downstream from each
/// account. Fires when the maximum observed depth reaches four.
pub fn detect_layering(graph: &TransactionGraph) -> SignalMap {
    let receivers = distinct_receivers(graph);
    let mut signals = SignalMap::new();

    for account in graph.accounts() {
        if graph.out_degree(account) == 0 {
            continue;
        }
        let mut visited: HashSet<&str> = HashSet::from([account.as_str()]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(account.as_str(), 0)]);
        let mut max_depth = 0usize;
        let mut downstream = 0usize;

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= LAYERING_MAX_DEPTH || downstream >= LAYERING_VISIT_CAP {
                continue;
            }
            let next_depth = depth + 1;
            for next in receivers.get(node).map(Vec::as_slice).unwrap_or(&[]) {
                if downstream >= LAYERING_VISIT_CAP {
                    break;
                }
                if visited.insert(next.as_str()) {
                    downstream += 1;
                    max_depth = max_depth.max(next_depth);
                    queue.push_back((next.as_str(), next_depth));
                }
            }
        }

        if max_depth >= 4 {
            signals.insert(
                account.clone(),
                Signal::Layering {
                    max_depth,
                    reached: downstream,
                },
            );
        }
    }
    signals
}

/// Few counterparties relative to volume: for accounts with at least ten
/// transactions, fires when unique counterparties divided by transaction
/// count drops below 0.3.
pub fn detect_low_diversity(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let n = graph.degree(account);
        if n < 10 {
            continue;
        }
        let mut counterparty_counts: HashMap<&str, usize> = HashMap::new();
        for txn in graph.outgoing_txns(account) {
            *counterparty_counts.entry(txn.receiver_id.as_str()).or_insert(0) += 1;
        }
        for txn in graph.incoming_txns(account) {
            *counterparty_counts.entry(txn.sender_id.as_str()).or_insert(0) += 1;
        }
        let unique = counterparty_counts.len();
        let ratio = unique as f64 / n as f64;
        if ratio < 0.3 {
            let top = counterparty_counts.values().copied().max().unwrap_or(0);
            signals.insert(
                account.clone(),
                Signal::LowDiversity {
                    ratio,
                    top_share: top as f64 / n as f64,
                },
            );
        }
    }
    signals
}

/// Deep forwarding chains (opt-in): DFS with a path visit set, depth capped
/// at eight hops, recording every simple path of five or more accounts. The
/// three longest chains per start are retained.
pub fn detect_laundering_chains(graph: &TransactionGraph) -> SignalMap {
    let receivers = distinct_receivers(graph);
    let mut signals = SignalMap::new();

    for start in graph.accounts() {
        if graph.out_degree(start) == 0 {
            continue;
        }

        let mut chain_count = 0usize;
        let mut lengths: Vec<usize> = Vec::new();

        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        let mut path: Vec<&str> = vec![start.as_str()];
        let mut on_path: HashSet<&str> = HashSet::from([start.as_str()]);

        while let Some(frame) = stack.last_mut() {
            let (node, offset) = (frame.0, frame.1);
            let neighbors = receivers.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if offset >= neighbors.len() {
                stack.pop();
                path.pop();
                on_path.remove(node);
                continue;
            }
            frame.1 += 1;
            let next = neighbors[offset].as_str();
            if on_path.contains(next) || path.len() > CHAIN_MAX_DEPTH {
                continue;
            }

            stack.push((next, 0));
            path.push(next);
            on_path.insert(next);

            if path.len() >= CHAIN_MIN_LEN {
                chain_count += 1;
                lengths.push(path.len());
            }
        }

        if chain_count > 0 {
            lengths.sort_unstable_by(|a, b| b.cmp(a));
            lengths.truncate(CHAINS_RETAINED);
            signals.insert(
                start.clone(),
                Signal::MoneyLaunderingChain {
                    longest: lengths[0],
                    chain_count,
                },
            );
        }
    }
    signals
}

/// Correlated timelines across highly active accounts. Only the top 100
/// accounts by activity are considered, each compared against the next 20 in
/// activity order; two timelines correlate when at least 70% of the shorter
/// one has a counterpart within one hour in the other.
pub fn detect_coordinated_behavior(graph: &TransactionGraph, stats: &StatsCache) -> SignalMap {
    let mut candidates: Vec<&str> = graph
        .accounts()
        .iter()
        .map(String::as_str)
        .filter(|a| stats.activity_of(a) >= COORDINATION_MIN_DEGREE)
        .collect();
    candidates.sort_by(|a, b| {
        stats
            .activity_of(b)
            .cmp(&stats.activity_of(a))
            .then_with(|| a.cmp(b))
    });
    candidates.truncate(COORDINATION_TOP);

    let timelines: Vec<Vec<i64>> = candidates
        .iter()
        .map(|a| graph.events_sorted(a).iter().map(|t| t.ts_millis()).collect())
        .collect();

    let mut partners: HashMap<&str, usize> = HashMap::new();
    for i in 0..candidates.len() {
        let end = (i + 1 + COORDINATION_LOOKAHEAD).min(candidates.len());
        for j in i + 1..end {
            if timelines_correlated(&timelines[i], &timelines[j]) {
                *partners.entry(candidates[i]).or_insert(0) += 1;
                *partners.entry(candidates[j]).or_insert(0) += 1;
            }
        }
    }

    let mut signals = SignalMap::new();
    for (account, count) in partners {
        if count >= 2 {
            signals.insert(account.to_string(), Signal::CoordinatedBehavior { partners: count });
        }
    }
    signals
}

/// Whether at least 70% of the shorter timeline's events have a counterpart
/// in the longer one within one hour.
fn timelines_correlated(a: &[i64], b: &[i64]) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return false;
    }
    let matched = short
        .iter()
        .filter(|&&ts| has_event_within(long, ts, COORDINATION_TOLERANCE_MS))
        .count();
    matched as f64 / short.len() as f64 >= 0.70
}

/// Binary search for any event within `tolerance` of `ts`.
fn has_event_within(sorted: &[i64], ts: i64, tolerance: i64) -> bool {
    let idx = sorted.partition_point(|&t| t < ts);
    let after = sorted.get(idx).map_or(false, |&t| t - ts <= tolerance);
    let before = idx > 0 && ts - sorted[idx - 1] <= tolerance;
    after || before
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ringlens_core::Transaction;

    fn txn_at(id: &str, from: &str, to: &str, amount: f64, day: u32, hour: u32, min: u32) -> Transaction {
        let ts = NaiveDate::from_ymd_opt(2024, 9, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap();
        Transaction::new(id, from, to, amount, ts)
    }

    #[test]
    fn test_influence_hub_dominates() {
        // Everyone pays H; H's rank towers over the leaves'.
        let txns: Vec<Transaction> = (0..6)
            .map(|i| txn_at(&format!("t{i}"), &format!("S{i}"), "H", 1000.0, 1, i as u32, 0))
            .collect();
        let graph = TransactionGraph::build(txns).unwrap();
        let stats = StatsCache::compute(&graph);
        let signals = detect_network_influence(&graph, &stats, 500);
        match signals.get("H") {
            Some(Signal::NetworkInfluence { normalized }) => {
                assert!((normalized - 1.0).abs() < 1e-9)
            }
            other => panic!("expected influence signal for H, got {other:?}"),
        }
        assert!(!signals.contains_key("S0"));
    }

    #[test]
    fn test_layering_depth_of_chain() {
        // A -> B -> C -> D -> E: depth 4 from A.
        let txns = vec![
            txn_at("t1", "A", "B", 100.0, 1, 0, 0),
            txn_at("t2", "B", "C", 100.0, 1, 1, 0),
            txn_at("t3", "C", "D", 100.0, 1, 2, 0),
            txn_at("t4", "D", "E", 100.0, 1, 3, 0),
        ];
        let graph = TransactionGraph::build(txns).unwrap();
        let signals = detect_layering(&graph);
        match signals.get("A") {
            Some(Signal::Layering { max_depth, reached }) => {
                assert_eq!(*max_depth, 4);
                assert_eq!(*reached, 4);
            }
            other => panic!("expected layering for A, got {other:?}"),
        }
        // B only reaches depth 3.
        assert!(!signals.contains_key("B"));
    }

    #[test]
    fn test_low_diversity_ratio() {
        // 12 transactions, 2 counterparties: ratio 0.17.
        let mut txns = Vec::new();
        for i in 0..8 {
            txns.push(txn_at(&format!("o{i}"), "A", "B", 100.0, 1, i as u32, 0));
        }
        for i in 0..4 {
            txns.push(txn_at(&format!("i{i}"), "C", "A", 100.0, 2, i as u32, 0));
        }
        let graph = TransactionGraph::build(txns).unwrap();
        match detect_low_diversity(&graph).get("A") {
            Some(Signal::LowDiversity { ratio, top_share }) => {
                assert!(*ratio < 0.3);
                assert!((top_share - 8.0 / 12.0).abs() < 1e-9);
            }
            other => panic!("expected low diversity, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_detection() {
        // A -> B -> C -> D -> E -> F: longest chain from A has 6 accounts.
        let txns = vec![
            txn_at("t1", "A", "B", 100.0, 1, 0, 0),
            txn_at("t2", "B", "C", 100.0, 1, 1, 0),
            txn_at("t3", "C", "D", 100.0, 1, 2, 0),
            txn_at("t4", "D", "E", 100.0, 1, 3, 0),
            txn_at("t5", "E", "F", 100.0, 1, 4, 0),
        ];
        let graph = TransactionGraph::build(txns).unwrap();
        let signals = detect_laundering_chains(&graph);
        match signals.get("A") {
            Some(Signal::MoneyLaunderingChain { longest, .. }) => assert_eq!(*longest, 6),
            other => panic!("expected chain signal for A, got {other:?}"),
        }
        // D can reach only F: path of 3, below the floor.
        assert!(!signals.contains_key("D"));
    }

    #[test]
    fn test_coordinated_behavior_three_synchronized_accounts() {
        // Three accounts each with 20 events at nearly the same minutes.
        let mut txns = Vec::new();
        for (name, offset) in [("A1", 0u32), ("A2", 10), ("A3", 20)] {
            for i in 0..20 {
                txns.push(txn_at(
                    &format!("{name}x{i}"),
                    name,
                    &format!("Z{name}{i}"),
                    50.0,
                    1 + (i as u32) / 4,
                    (i as u32) % 4 * 3,
                    offset,
                ));
            }
        }
        let graph = TransactionGraph::build(txns).unwrap();
        let stats = StatsCache::compute(&graph);
        let signals = detect_coordinated_behavior(&graph, &stats);
        for account in ["A1", "A2", "A3"] {
            match signals.get(account) {
                Some(Signal::CoordinatedBehavior { partners }) => assert!(*partners >= 2),
                other => panic!("expected coordination for {account}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_has_event_within() {
        let times = [0i64, 10 * HOUR_MS, 20 * HOUR_MS];
        assert!(has_event_within(&times, 10 * HOUR_MS + 30 * 60 * 1000, HOUR_MS));
        assert!(!has_event_within(&times, 5 * HOUR_MS, HOUR_MS));
    }
}
