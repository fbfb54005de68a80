//! Global statistics cache.
//!
//! One pass over every transaction, computed exactly once per analysis and
//! strictly read-only thereafter. Detectors receive it as an immutable
//! reference; there is no process-wide state.

use std::collections::HashMap;

use crate::graph::TransactionGraph;

/// Aggregates over the whole batch, frozen for the run.
#[derive(Debug, Clone)]
pub struct StatsCache {
    /// Mean transaction amount.
    pub amount_mean: f64,
    /// Population standard deviation of amounts.
    pub amount_stddev: f64,
    /// Median amount.
    pub amount_median: f64,
    /// First quartile.
    pub amount_q1: f64,
    /// Third quartile.
    pub amount_q3: f64,
    /// Total number of transactions.
    pub total_transactions: usize,
    /// Per-account activity: combined incoming and outgoing count.
    pub activity: HashMap<String, usize>,
    /// Earliest timestamp, milliseconds since the epoch.
    pub min_timestamp_ms: i64,
    /// Latest timestamp, milliseconds since the epoch.
    pub max_timestamp_ms: i64,
}

impl StatsCache {
    /// Computes the cache from the graph in a single pass plus one sort for
    /// the quartiles. Mean and variance use a Welford update so high-magnitude
    /// amounts do not lose precision to a sum of squares.
    pub fn compute(graph: &TransactionGraph) -> Self {
        let mut amounts: Vec<f64> = Vec::with_capacity(graph.transaction_count());
        let mut min_ts = i64::MAX;
        let mut max_ts = i64::MIN;

        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut n = 0usize;

        for txn in graph.transactions() {
            amounts.push(txn.amount);
            let ts = txn.ts_millis();
            min_ts = min_ts.min(ts);
            max_ts = max_ts.max(ts);

            n += 1;
            let delta = txn.amount - mean;
            mean += delta / n as f64;
            m2 += delta * (txn.amount - mean);
        }

        let stddev = if n > 0 { (m2 / n as f64).sqrt() } else { 0.0 };

        amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let (q1, median, q3) = quartiles(&amounts);

        let mut activity: HashMap<String, usize> = HashMap::new();
        for account in graph.accounts() {
            activity.insert(account.clone(), graph.degree(account));
        }

        Self {
            amount_mean: mean,
            amount_stddev: stddev,
            amount_median: median,
            amount_q1: q1,
            amount_q3: q3,
            total_transactions: n,
            activity,
            min_timestamp_ms: min_ts,
            max_timestamp_ms: max_ts,
        }
    }

    /// Combined in+out count for an account (0 if unseen).
    pub fn activity_of(&self, account: &str) -> usize {
        self.activity.get(account).copied().unwrap_or(0)
    }

    /// IQR outlier fences `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
    pub fn iqr_fences(&self) -> (f64, f64) {
        let iqr = self.amount_q3 - self.amount_q1;
        (self.amount_q1 - 1.5 * iqr, self.amount_q3 + 1.5 * iqr)
    }
}

/// Index-based quartiles over a sorted sample: Q1 and Q3 by position, median
/// averaging the two middle elements for even sizes.
fn quartiles(sorted: &[f64]) -> (f64, f64, f64) {
    if sorted.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = sorted.len();
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let q1 = sorted[n / 4];
    let q3 = sorted[((3 * n) / 4).min(n - 1)];
    (q1, median, q3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use chrono::NaiveDate;

    fn txn(id: &str, from: &str, to: &str, amount: f64, hour: u32) -> Transaction {
        let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Transaction::new(id, from, to, amount, ts)
    }

    fn graph_of(amounts: &[f64]) -> TransactionGraph {
        let txns = amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| txn(&format!("t{i}"), "A", "B", a, (i % 24) as u32))
            .collect();
        TransactionGraph::build(txns).unwrap()
    }

    #[test]
    fn test_mean_and_stddev() {
        let stats = StatsCache::compute(&graph_of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));
        assert!((stats.amount_mean - 5.0).abs() < 1e-9);
        assert!((stats.amount_stddev - 2.0).abs() < 1e-9);
        assert_eq!(stats.total_transactions, 8);
    }

    #[test]
    fn test_quartiles_by_index() {
        let stats = StatsCache::compute(&graph_of(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]));
        assert_eq!(stats.amount_q1, 3.0);
        assert_eq!(stats.amount_median, 4.5);
        assert_eq!(stats.amount_q3, 7.0);
    }

    #[test]
    fn test_activity_counts_both_directions() {
        let graph = TransactionGraph::build(vec![
            txn("t1", "A", "B", 10.0, 1),
            txn("t2", "B", "C", 10.0, 2),
        ])
        .unwrap();
        let stats = StatsCache::compute(&graph);
        assert_eq!(stats.activity_of("A"), 1);
        assert_eq!(stats.activity_of("B"), 2);
        assert_eq!(stats.activity_of("C"), 1);
        assert_eq!(stats.activity_of("unknown"), 0);
    }

    #[test]
    fn test_iqr_fences() {
        let stats = StatsCache::compute(&graph_of(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]));
        let (lo, hi) = stats.iqr_fences();
        assert!((lo - (3.0 - 6.0)).abs() < 1e-9);
        assert!((hi - (7.0 + 6.0)).abs() < 1e-9);
    }
}
