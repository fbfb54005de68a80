//! Amount-shape detectors: round amounts, threshold hugging, outliers,
//! splitting, progression, and smurfing clusters.

use std::collections::HashSet;

use ringlens_core::{StatsCache, Transaction, TransactionGraph, HOUR_MS};

use crate::detectors::mean;
use crate::signals::{ProgressionDirection, Signal, SignalMap};

/// Round-amount bases checked by the structuring detector.
const ROUND_BASES: [f64; 3] = [1000.0, 500.0, 100.0];

/// Share of round amounts above which structuring fires.
const STRUCTURING_FRACTION: f64 = 0.70;

/// Reporting-threshold band.
const THRESHOLD_LOW: f64 = 9000.0;
const THRESHOLD_HIGH: f64 = 9999.0;

/// Splitting window.
const SPLIT_WINDOW_MS: i64 = 24 * HOUR_MS;

/// Whether an amount is an exact multiple of a base, to cent precision.
fn is_multiple_of(amount: f64, base: f64) -> bool {
    let ratio = amount / base;
    (ratio - ratio.round()).abs() < 1e-6 && amount > 0.0
}

/// Deliberate use of round amounts: more than 70% of the account's
/// transactions are exact multiples of 1000, 500, or 100.
pub fn detect_structuring(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let events = graph.events_sorted(account);
        if events.is_empty() {
            continue;
        }
        let round = events
            .iter()
            .filter(|t| ROUND_BASES.iter().any(|&base| is_multiple_of(t.amount, base)))
            .count();
        let fraction = round as f64 / events.len() as f64;
        if fraction > STRUCTURING_FRACTION {
            signals.insert(
                account.clone(),
                Signal::Structuring {
                    round_fraction: fraction,
                },
            );
        }
    }
    signals
}

/// Amounts parked just under the reporting threshold: fires when the mean of
/// the account's amounts lies inside [9000, 9999]. The payload's clustering
/// consistency is the fraction of amounts inside the band.
pub fn detect_threshold_avoidance(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let events = graph.events_sorted(account);
        if events.is_empty() {
            continue;
        }
        let amounts: Vec<f64> = events.iter().map(|t| t.amount).collect();
        let mean_amount = mean(&amounts);
        if (THRESHOLD_LOW..=THRESHOLD_HIGH).contains(&mean_amount) {
            let in_band = amounts
                .iter()
                .filter(|&&a| (THRESHOLD_LOW..=THRESHOLD_HIGH).contains(&a))
                .count();
            signals.insert(
                account.clone(),
                Signal::ThresholdAvoidance {
                    mean_amount,
                    clustering: in_band as f64 / amounts.len() as f64,
                },
            );
        }
    }
    signals
}

/// Share of an account's amounts outside the global IQR fences; fires above
/// 30%.
pub fn detect_amount_anomaly(graph: &TransactionGraph, stats: &StatsCache) -> SignalMap {
    let (lo, hi) = stats.iqr_fences();
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let events = graph.events_sorted(account);
        if events.is_empty() {
            continue;
        }
        let outliers = events
            .iter()
            .filter(|t| t.amount < lo || t.amount > hi)
            .count();
        let fraction = outliers as f64 / events.len() as f64;
        if fraction > 0.30 {
            signals.insert(
                account.clone(),
                Signal::AmountAnomaly {
                    outlier_fraction: fraction,
                },
            );
        }
    }
    signals
}

/// Several near-equal outgoing amounts inside one day: a 24-hour window
/// slides over the outgoing sequence; a window qualifies when at least three
/// of its amounts sit within 20% of the window mean. The largest qualifying
/// group is retained.
pub fn detect_amount_splitting(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let outgoing = graph.outgoing_sorted(account);
        if outgoing.len() < 3 {
            continue;
        }
        let times: Vec<i64> = outgoing.iter().map(|t| t.ts_millis()).collect();

        let mut best: Option<(usize, i64)> = None;
        let mut right = 0usize;
        for left in 0..outgoing.len() {
            if right < left {
                right = left;
            }
            while right < outgoing.len() && times[right] - times[left] <= SPLIT_WINDOW_MS {
                right += 1;
            }
            let window = &outgoing[left..right];
            if window.len() < 3 {
                continue;
            }
            let amounts: Vec<f64> = window.iter().map(|t| t.amount).collect();
            let window_mean = mean(&amounts);
            if window_mean <= 0.0 {
                continue;
            }
            let close = amounts
                .iter()
                .filter(|&&a| (a - window_mean).abs() <= 0.20 * window_mean)
                .count();
            if close >= 3 && best.map_or(true, |(b, _)| close > b) {
                best = Some((close, times[left]));
            }
        }

        if let Some((group_size, window_start_ms)) = best {
            signals.insert(
                account.clone(),
                Signal::AmountSplitting {
                    group_size,
                    window_start_ms,
                },
            );
        }
    }
    signals
}

/// Monotone escalation (or de-escalation) of outgoing amounts: counts steps
/// that rise or drop by more than 20% and fires when either share of steps
/// exceeds 0.6.
pub fn detect_amount_progression(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let outgoing = graph.outgoing_sorted(account);
        if outgoing.len() < 5 {
            continue;
        }
        let amounts: Vec<f64> = outgoing.iter().map(|t| t.amount).collect();
        let steps = amounts.len() - 1;
        let mut increasing = 0usize;
        let mut decreasing = 0usize;
        for pair in amounts.windows(2) {
            if pair[1] > pair[0] * 1.20 {
                increasing += 1;
            } else if pair[1] < pair[0] * 0.80 {
                decreasing += 1;
            }
        }
        let inc_ratio = increasing as f64 / steps as f64;
        let dec_ratio = decreasing as f64 / steps as f64;

        let signal = if inc_ratio > 0.6 {
            let first = amounts[0];
            let last = amounts[amounts.len() - 1];
            Some(Signal::AmountProgression {
                direction: ProgressionDirection::Increasing,
                step_ratio: inc_ratio,
                multiplier: if first > 0.0 { last / first } else { 0.0 },
            })
        } else if dec_ratio > 0.6 {
            let first = amounts[0];
            let last = amounts[amounts.len() - 1];
            Some(Signal::AmountProgression {
                direction: ProgressionDirection::Decreasing,
                step_ratio: dec_ratio,
                multiplier: if last > 0.0 { first / last } else { 0.0 },
            })
        } else {
            None
        };

        if let Some(signal) = signal {
            signals.insert(account.clone(), signal);
        }
    }
    signals
}

/// Greedy amount clustering over an account's outgoing transactions: a
/// transaction joins the first cluster whose running mean it sits within 15%
/// of. Clusters of at least ten transactions spanning at least eight
/// distinct receivers count; the detector fires at two such clusters.
pub fn detect_smurfing_clusters(graph: &TransactionGraph) -> SignalMap {
    const QUALIFYING_CLUSTER_CAP: usize = 5;
    let mut signals = SignalMap::new();

    for account in graph.accounts() {
        let outgoing = graph.outgoing_sorted(account);
        if outgoing.len() < 10 {
            continue;
        }

        struct Cluster<'a> {
            sum: f64,
            txns: Vec<&'a Transaction>,
        }
        let mut clusters: Vec<Cluster> = Vec::new();

        for &txn in &outgoing {
            let joined = clusters.iter_mut().find(|c| {
                let cluster_mean = c.sum / c.txns.len() as f64;
                cluster_mean > 0.0 && (txn.amount - cluster_mean).abs() <= 0.15 * cluster_mean
            });
            match joined {
                Some(cluster) => {
                    cluster.sum += txn.amount;
                    cluster.txns.push(txn);
                }
                None => clusters.push(Cluster {
                    sum: txn.amount,
                    txns: vec![txn],
                }),
            }
        }

        let mut qualifying = 0usize;
        let mut largest = 0usize;
        for cluster in &clusters {
            if cluster.txns.len() < 10 {
                continue;
            }
            let receivers: HashSet<&str> = cluster
                .txns
                .iter()
                .map(|t| t.receiver_id.as_str())
                .collect();
            if receivers.len() >= 8 {
                qualifying += 1;
                largest = largest.max(cluster.txns.len());
                if qualifying >= QUALIFYING_CLUSTER_CAP {
                    break;
                }
            }
        }

        if qualifying >= 2 {
            signals.insert(
                account.clone(),
                Signal::SmurfingClusters {
                    clusters: qualifying,
                    largest,
                },
            );
        }
    }
    signals
}
