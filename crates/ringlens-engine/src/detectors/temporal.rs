//! Time-shape detectors: rate spikes, odd hours, bursts, dormancy,
//! sustained frequency, and hour-of-day clustering.
//!
//! Hours and weekdays are read straight from the timestamp's native
//! calendar; no time-zone conversion is applied anywhere in this module.

use chrono::{Datelike, Timelike, Weekday};

use ringlens_core::{Transaction, TransactionGraph, DAY_MS, HOUR_MS};

use crate::signals::{Signal, SignalMap};

/// Sliding-window widths for the velocity scan, in hours.
const VELOCITY_WINDOWS_H: [i64; 4] = [1, 6, 24, 72];

/// Transactions per hour above which velocity fires.
const VELOCITY_PEAK_RATE: f64 = 5.0;

/// Gap factor under which an inter-arrival counts as part of a burst.
const BURST_GAP_FACTOR: f64 = 0.2;

/// Dormancy gap floor, in days.
const DORMANCY_GAP_DAYS: f64 = 30.0;

/// Peak hourly transaction rate over sliding windows of 1, 6, 24, and 72
/// hours, for accounts with at least ten transactions.
pub fn detect_velocity_anomaly(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        if graph.degree(account) < 10 {
            continue;
        }
        let times: Vec<i64> = graph
            .events_sorted(account)
            .iter()
            .map(|t| t.ts_millis())
            .collect();

        let mut peak_rate: f64 = 0.0;
        for &hours in &VELOCITY_WINDOWS_H {
            let window_ms = hours * HOUR_MS;
            let mut right = 0usize;
            for left in 0..times.len() {
                if right < left {
                    right = left;
                }
                while right < times.len() && times[right] - times[left] <= window_ms {
                    right += 1;
                }
                let rate = (right - left) as f64 / hours as f64;
                peak_rate = peak_rate.max(rate);
            }
        }

        if peak_rate > VELOCITY_PEAK_RATE {
            signals.insert(account.clone(), Signal::VelocityAnomaly { peak_rate });
        }
    }
    signals
}

/// Night-hour (23:00-05:00) or weekend concentration for accounts with at
/// least five transactions.
pub fn detect_unusual_timing(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let events = graph.events_sorted(account);
        if events.len() < 5 {
            continue;
        }
        let n = events.len() as f64;
        let night = events.iter().filter(|t| is_night(t)).count() as f64 / n;
        let weekend = events.iter().filter(|t| is_weekend(t)).count() as f64 / n;
        if night > 0.5 || weekend > 0.7 {
            signals.insert(
                account.clone(),
                Signal::UnusualTiming {
                    night_fraction: night,
                    weekend_fraction: weekend,
                },
            );
        }
    }
    signals
}

fn is_night(txn: &Transaction) -> bool {
    let hour = txn.timestamp.hour();
    hour >= 23 || hour < 5
}

fn is_weekend(txn: &Transaction) -> bool {
    matches!(txn.timestamp.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Runs of inter-arrival gaps below one fifth of the account's mean gap.
/// Fires when a maximal run of at least three consecutive short gaps exists.
pub fn detect_burst_activity(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        if graph.degree(account) < 10 {
            continue;
        }
        let times: Vec<i64> = graph
            .events_sorted(account)
            .iter()
            .map(|t| t.ts_millis())
            .collect();
        let gaps: Vec<f64> = times.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        if gaps.is_empty() {
            continue;
        }
        let mu = gaps.iter().sum::<f64>() / gaps.len() as f64;
        if mu <= 0.0 {
            continue;
        }
        let threshold = BURST_GAP_FACTOR * mu;

        let mut max_run = 0usize;
        let mut run_count = 0usize;
        let mut current = 0usize;
        for &gap in &gaps {
            if gap < threshold {
                current += 1;
            } else {
                if current >= 3 {
                    run_count += 1;
                }
                max_run = max_run.max(current);
                current = 0;
            }
        }
        if current >= 3 {
            run_count += 1;
        }
        max_run = max_run.max(current);

        if max_run >= 3 {
            signals.insert(account.clone(), Signal::BurstActivity { max_run, run_count });
        }
    }
    signals
}

/// Long silence followed by renewed activity: the longest gap between
/// consecutive events exceeds 30 days and at least three events follow it.
pub fn detect_dormancy_reactivation(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let times: Vec<i64> = graph
            .events_sorted(account)
            .iter()
            .map(|t| t.ts_millis())
            .collect();
        if times.len() < 4 {
            continue;
        }

        let mut longest_gap = 0i64;
        let mut gap_end_idx = 0usize;
        for (i, w) in times.windows(2).enumerate() {
            let gap = w[1] - w[0];
            if gap > longest_gap {
                longest_gap = gap;
                gap_end_idx = i + 1;
            }
        }

        let gap_days = longest_gap as f64 / DAY_MS as f64;
        let post_events = times.len() - gap_end_idx;
        if gap_days > DORMANCY_GAP_DAYS && post_events >= 3 {
            signals.insert(
                account.clone(),
                Signal::DormancyReactivation {
                    gap_days,
                    post_events,
                },
            );
        }
    }
    signals
}

/// Sustained daily rate: accounts with at least twenty transactions whose
/// mean per-day rate over their observed span exceeds twenty.
pub fn detect_frequency_anomaly(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        if graph.degree(account) < 20 {
            continue;
        }
        let times: Vec<i64> = graph
            .events_sorted(account)
            .iter()
            .map(|t| t.ts_millis())
            .collect();
        let span_days = ((times[times.len() - 1] - times[0]) as f64 / DAY_MS as f64).max(1.0);
        let per_day = times.len() as f64 / span_days;
        if per_day > 20.0 {
            signals.insert(account.clone(), Signal::FrequencyAnomaly { per_day });
        }
    }
    signals
}

/// Activity concentrated in a narrow set of hours: at most three hour bins
/// sit within 80% of the peak bin and together hold more than half of the
/// account's transactions.
pub fn detect_temporal_clustering(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let events = graph.events_sorted(account);
        if events.is_empty() {
            continue;
        }
        let mut bins = [0usize; 24];
        for txn in &events {
            bins[txn.timestamp.hour() as usize] += 1;
        }
        let max_count = *bins.iter().max().unwrap_or(&0);
        if max_count == 0 {
            continue;
        }
        let floor = 0.8 * max_count as f64;
        let peak_hours: Vec<u32> = (0..24u32)
            .filter(|&h| bins[h as usize] as f64 >= floor && bins[h as usize] > 0)
            .collect();
        let peak_total: usize = peak_hours.iter().map(|&h| bins[h as usize]).sum();
        let concentration = peak_total as f64 / events.len() as f64;

        if peak_hours.len() <= 3 && concentration > 0.5 {
            signals.insert(
                account.clone(),
                Signal::TemporalClustering {
                    peak_hours,
                    concentration,
                },
            );
        }
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn_ymd(
        id: &str,
        from: &str,
        to: &str,
        (y, m, d): (i32, u32, u32),
        (hh, mm): (u32, u32),
    ) -> Transaction {
        let ts = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap();
        Transaction::new(id, from, to, 100.0, ts)
    }

    #[test]
    fn test_velocity_fires_on_dense_hour() {
        // 12 transactions inside 70 minutes: 1h-window rate well above 5/h.
        let txns: Vec<Transaction> = (0..12)
            .map(|i| {
                txn_ymd(
                    &format!("t{i}"),
                    "A",
                    "B",
                    (2024, 7, 1),
                    (10 + (i as u32) / 10, (i as u32 * 6) % 60),
                )
            })
            .collect();
        let graph = TransactionGraph::build(txns).unwrap();
        let signals = detect_velocity_anomaly(&graph);
        match signals.get("A") {
            Some(Signal::VelocityAnomaly { peak_rate }) => assert!(*peak_rate > 5.0),
            other => panic!("expected velocity anomaly, got {other:?}"),
        }
    }

    #[test]
    fn test_velocity_spread_activity_quiet() {
        // 10 transactions one per day: max hourly rate ~1.
        let txns: Vec<Transaction> = (0..10)
            .map(|i| txn_ymd(&format!("t{i}"), "A", "B", (2024, 7, 1 + i as u32), (10, 0)))
            .collect();
        let graph = TransactionGraph::build(txns).unwrap();
        assert!(detect_velocity_anomaly(&graph).is_empty());
    }

    #[test]
    fn test_unusual_timing_night_share() {
        // 4 of 6 events at 02:00 (night): fraction 0.66 > 0.5.
        let mut txns: Vec<Transaction> = (0..4)
            .map(|i| txn_ymd(&format!("n{i}"), "A", "B", (2024, 7, 1 + i as u32), (2, 0)))
            .collect();
        txns.push(txn_ymd("d0", "A", "B", (2024, 7, 10), (14, 0)));
        txns.push(txn_ymd("d1", "A", "B", (2024, 7, 11), (15, 0)));
        let graph = TransactionGraph::build(txns).unwrap();
        match detect_unusual_timing(&graph).get("A") {
            Some(Signal::UnusualTiming { night_fraction, .. }) => {
                assert!(*night_fraction > 0.5)
            }
            other => panic!("expected unusual timing, got {other:?}"),
        }
    }

    #[test]
    fn test_unusual_timing_weekend_share() {
        // 2024-07-06/07 are Sat/Sun; 5 of 6 events on weekends.
        let mut txns: Vec<Transaction> = (0..5)
            .map(|i| {
                let day = if i % 2 == 0 { 6 } else { 7 };
                txn_ymd(&format!("w{i}"), "A", "B", (2024, 7, day), (10 + i as u32, 0))
            })
            .collect();
        txns.push(txn_ymd("m0", "A", "B", (2024, 7, 8), (10, 0)));
        let graph = TransactionGraph::build(txns).unwrap();
        match detect_unusual_timing(&graph).get("A") {
            Some(Signal::UnusualTiming {
                weekend_fraction, ..
            }) => assert!(*weekend_fraction > 0.7),
            other => panic!("expected unusual timing, got {other:?}"),
        }
    }

    #[test]
    fn test_burst_run_detected() {
        // Events: 3 spread days, then 5 within minutes, then 2 spread.
        let mut txns = Vec::new();
        for i in 0..3 {
            txns.push(txn_ymd(&format!("s{i}"), "A", "B", (2024, 7, 1 + i as u32), (9, 0)));
        }
        for i in 0..5 {
            txns.push(txn_ymd(&format!("b{i}"), "A", "B", (2024, 7, 10), (12, i as u32)));
        }
        txns.push(txn_ymd("e0", "A", "B", (2024, 7, 20), (9, 0)));
        txns.push(txn_ymd("e1", "A", "B", (2024, 7, 25), (9, 0)));
        let graph = TransactionGraph::build(txns).unwrap();
        match detect_burst_activity(&graph).get("A") {
            Some(Signal::BurstActivity { max_run, .. }) => assert!(*max_run >= 4),
            other => panic!("expected burst, got {other:?}"),
        }
    }

    #[test]
    fn test_dormancy_reactivation() {
        let mut txns = vec![
            txn_ymd("t0", "A", "B", (2024, 1, 1), (9, 0)),
            txn_ymd("t1", "A", "B", (2024, 1, 2), (9, 0)),
        ];
        // 60-day silence, then four events.
        for i in 0..4 {
            txns.push(txn_ymd(&format!("r{i}"), "A", "B", (2024, 3, 2 + i as u32), (9, 0)));
        }
        let graph = TransactionGraph::build(txns).unwrap();
        match detect_dormancy_reactivation(&graph).get("A") {
            Some(Signal::DormancyReactivation {
                gap_days,
                post_events,
            }) => {
                assert!(*gap_days > 30.0);
                assert_eq!(*post_events, 4);
            }
            other => panic!("expected dormancy, got {other:?}"),
        }
    }

    #[test]
    fn test_frequency_anomaly() {
        // 25 transactions inside one day: rate 25/day > 20.
        let txns: Vec<Transaction> = (0..25)
            .map(|i| txn_ymd(&format!("t{i}"), "A", "B", (2024, 7, 1), (i as u32 % 24, 30)))
            .collect();
        let graph = TransactionGraph::build(txns).unwrap();
        assert!(detect_frequency_anomaly(&graph).contains_key("A"));
    }

    #[test]
    fn test_temporal_clustering_single_hour() {
        // 8 of 10 events at 03:00.
        let mut txns: Vec<Transaction> = (0..8)
            .map(|i| txn_ymd(&format!("c{i}"), "A", "B", (2024, 7, 1 + i as u32), (3, 0)))
            .collect();
        txns.push(txn_ymd("o0", "A", "B", (2024, 7, 20), (11, 0)));
        txns.push(txn_ymd("o1", "A", "B", (2024, 7, 21), (16, 0)));
        let graph = TransactionGraph::build(txns).unwrap();
        match detect_temporal_clustering(&graph).get("A") {
            Some(Signal::TemporalClustering {
                peak_hours,
                concentration,
            }) => {
                assert_eq!(peak_hours, &vec![3]);
                assert!(*concentration > 0.7);
            }
            other => panic!("expected temporal clustering, got {other:?}"),
        }
    }

    #[test]
    fn test_temporal_clustering_flat_profile_quiet() {
        let txns: Vec<Transaction> = (0..12)
            .map(|i| txn_ymd(&format!("t{i}"), "A", "B", (2024, 7, 1 + i as u32), (2 * i as u32, 0)))
            .collect();
        let graph = TransactionGraph::build(txns).unwrap();
        assert!(detect_temporal_clustering(&graph).is_empty());
    }
}
