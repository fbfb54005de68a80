//! Pattern detector family.
//!
//! Every detector consumes the immutable graph and statistics cache and
//! returns its own signal map; detectors never raise and never see each
//! other's output. The detection stage fans out over rayon but collects
//! results in a fixed vocabulary order, keeping runs reproducible.

use rayon::prelude::*;

use ringlens_core::{StatsCache, TransactionGraph};
use std::collections::HashMap;

use crate::config::AnalysisConfig;
use crate::signals::SignalMap;

pub mod amounts;
pub mod cycles;
pub mod flow;
pub mod network;
pub mod temporal;

/// Everything the detection stage hands to scoring and reporting.
#[derive(Debug)]
pub struct DetectionOutput {
    /// Signal maps in fixed vocabulary order (see `run_all`).
    pub maps: Vec<SignalMap>,
    /// Normalized cycles recorded by the cycle detector.
    pub cycles: Vec<Vec<String>>,
}

/// Runs every detector and collects signal maps in vocabulary order:
/// cycle, fan_out, fan_in, shell_account, passthrough, structuring,
/// threshold_avoidance, velocity_anomaly, amount_anomaly, unusual_timing,
/// burst_activity, dormancy_reactivation, amount_splitting,
/// frequency_anomaly, network_influence, round_trip, layering,
/// low_diversity, amount_progression, temporal_clustering,
/// money_laundering_chain, coordinated_behavior, smurfing_pattern,
/// wash_trading.
///
/// A disabled detector contributes an empty map, which downstream stages
/// read as "no signal fired for any account".
pub fn run_all(
    graph: &TransactionGraph,
    stats: &StatsCache,
    config: &AnalysisConfig,
) -> DetectionOutput {
    let cycle_findings = cycles::detect_cycles(graph, config.max_cycles);

    type DetectorFn<'a> = Box<dyn Fn() -> SignalMap + Send + Sync + 'a>;
    let deep = config.enable_deep_chain_analysis;
    let sample = config.centrality_sample_size;

    let jobs: Vec<DetectorFn> = vec![
        Box::new(|| flow::detect_fan_out(graph)),
        Box::new(|| flow::detect_fan_in(graph)),
        Box::new(|| flow::detect_shell_accounts(graph)),
        Box::new(|| flow::detect_passthrough(graph)),
        Box::new(|| amounts::detect_structuring(graph)),
        Box::new(|| amounts::detect_threshold_avoidance(graph)),
        Box::new(|| temporal::detect_velocity_anomaly(graph)),
        Box::new(move || amounts::detect_amount_anomaly(graph, stats)),
        Box::new(|| temporal::detect_unusual_timing(graph)),
        Box::new(|| temporal::detect_burst_activity(graph)),
        Box::new(|| temporal::detect_dormancy_reactivation(graph)),
        Box::new(|| amounts::detect_amount_splitting(graph)),
        Box::new(|| temporal::detect_frequency_anomaly(graph)),
        Box::new(move || network::detect_network_influence(graph, stats, sample)),
        Box::new(|| cycles::detect_round_trips(graph)),
        Box::new(|| network::detect_layering(graph)),
        Box::new(|| network::detect_low_diversity(graph)),
        Box::new(|| amounts::detect_amount_progression(graph)),
        Box::new(|| temporal::detect_temporal_clustering(graph)),
        Box::new(move || {
            if deep {
                network::detect_laundering_chains(graph)
            } else {
                SignalMap::new()
            }
        }),
        Box::new(move || network::detect_coordinated_behavior(graph, stats)),
        Box::new(|| amounts::detect_smurfing_clusters(graph)),
        Box::new(|| flow::detect_wash_trading(graph)),
    ];

    let rest: Vec<SignalMap> = jobs.par_iter().map(|job| job()).collect();

    let mut maps = Vec::with_capacity(rest.len() + 1);
    maps.push(cycle_findings.signals);
    maps.extend(rest);

    DetectionOutput {
        maps,
        cycles: cycle_findings.cycles,
    }
}

/// Distinct receivers per account, sorted for deterministic expansion order.
/// Shared by the DFS/BFS detectors (cycles, layering, chains).
pub(crate) fn distinct_receivers(graph: &TransactionGraph) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::with_capacity(graph.account_count());
    for account in graph.accounts() {
        let mut receivers: Vec<String> = graph
            .outgoing_txns(account)
            .map(|t| t.receiver_id.clone())
            .collect();
        receivers.sort_unstable();
        receivers.dedup();
        map.insert(account.clone(), receivers);
    }
    map
}

/// Mean of a sample, 0 for an empty one.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance of a sample, 0 for fewer than two values.
pub(crate) fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ringlens_core::Transaction;

    fn txn(id: &str, from: &str, to: &str, amount: f64, hour: u32) -> Transaction {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Transaction::new(id, from, to, amount, ts)
    }

    #[test]
    fn test_map_order_is_stable() {
        let graph = TransactionGraph::build(vec![
            txn("t1", "A", "B", 100.0, 0),
            txn("t2", "B", "C", 100.0, 1),
            txn("t3", "C", "A", 100.0, 2),
        ])
        .unwrap();
        let stats = StatsCache::compute(&graph);
        let config = AnalysisConfig::default();

        let first = run_all(&graph, &stats, &config);
        let second = run_all(&graph, &stats, &config);
        assert_eq!(first.maps.len(), 24);
        assert_eq!(first.cycles, second.cycles);
        for (a, b) in first.maps.iter().zip(second.maps.iter()) {
            assert_eq!(a.len(), b.len());
        }
    }

    #[test]
    fn test_disabled_deep_chains_is_empty_map() {
        let graph = TransactionGraph::build(vec![txn("t1", "A", "B", 10.0, 0)]).unwrap();
        let stats = StatsCache::compute(&graph);
        let config = AnalysisConfig::default();
        let output = run_all(&graph, &stats, &config);
        // money_laundering_chain sits at index 20 of the vocabulary order
        assert!(output.maps[20].is_empty());
    }
}
