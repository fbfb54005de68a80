//! Flow-shape detectors: dispersion, collection, relays, and mirrored
//! transfers.

use std::collections::{HashMap, HashSet};

use ringlens_core::{Transaction, TransactionGraph, HOUR_MS};

use crate::signals::{Signal, SignalMap};

/// Minimum transactions before the fan detectors bother scanning.
const FAN_MIN_TXNS: usize = 15;

/// Distinct counterparties that must coincide in one window.
const FAN_MIN_COUNTERPARTIES: usize = 15;

/// Fan window width.
const FAN_WINDOW_MS: i64 = 72 * HOUR_MS;

/// Passthrough forwarding window.
const PASSTHROUGH_WINDOW_MS: i64 = 6 * HOUR_MS;

/// Matched in/out pairs retained per account.
const PASSTHROUGH_PAIR_CAP: usize = 100;

/// Wash-trade matching window.
const WASH_WINDOW_MS: i64 = 48 * HOUR_MS;

/// Wash-trade matches retained per account.
const WASH_MATCH_CAP: usize = 10;

/// One sender dispersing to many distinct receivers within 72 hours.
pub fn detect_fan_out(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        if graph.out_degree(account) < FAN_MIN_TXNS {
            continue;
        }
        let txns = graph.outgoing_sorted(account);
        if let Some((count, start, end)) =
            max_distinct_in_window(&txns, |t| t.receiver_id.as_str())
        {
            if count >= FAN_MIN_COUNTERPARTIES {
                signals.insert(
                    account.clone(),
                    Signal::FanOut {
                        counterparties: count,
                        window_start_ms: start,
                        window_end_ms: end,
                    },
                );
            }
        }
    }
    signals
}

/// Many distinct senders converging on one receiver within 72 hours.
pub fn detect_fan_in(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        if graph.in_degree(account) < FAN_MIN_TXNS {
            continue;
        }
        let txns = graph.incoming_sorted(account);
        if let Some((count, start, end)) = max_distinct_in_window(&txns, |t| t.sender_id.as_str()) {
            if count >= FAN_MIN_COUNTERPARTIES {
                signals.insert(
                    account.clone(),
                    Signal::FanIn {
                        counterparties: count,
                        window_start_ms: start,
                        window_end_ms: end,
                    },
                );
            }
        }
    }
    signals
}

/// Slides a 72-hour window by left anchor over time-sorted transactions and
/// returns the maximum distinct-counterparty count with its window bounds.
fn max_distinct_in_window<'a, F>(
    txns: &[&'a Transaction],
    counterparty: F,
) -> Option<(usize, i64, i64)>
where
    F: Fn(&'a Transaction) -> &'a str,
{
    if txns.is_empty() {
        return None;
    }
    let times: Vec<i64> = txns.iter().map(|t| t.ts_millis()).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut best: Option<(usize, i64, i64)> = None;
    let mut right = 0usize;

    for left in 0..txns.len() {
        while right < txns.len() && times[right] - times[left] <= FAN_WINDOW_MS {
            *counts.entry(counterparty(txns[right])).or_insert(0) += 1;
            right += 1;
        }
        let distinct = counts.len();
        let candidate = (distinct, times[left], times[right - 1]);
        if best.map_or(true, |(b, _, _)| distinct > b) {
            best = Some(candidate);
        }

        let leaving = counterparty(txns[left]);
        if let Some(n) = counts.get_mut(leaving) {
            *n -= 1;
            if *n == 0 {
                counts.remove(leaving);
            }
        }
    }
    best
}

/// Near-inactive accounts that still relay funds: total degree in [1, 3]
/// with at least one transaction in each direction.
pub fn detect_shell_accounts(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let in_count = graph.in_degree(account);
        let out_count = graph.out_degree(account);
        let degree = in_count + out_count;
        if (1..=3).contains(&degree) && in_count >= 1 && out_count >= 1 {
            signals.insert(
                account.clone(),
                Signal::ShellAccount {
                    in_count,
                    out_count,
                },
            );
        }
    }
    signals
}

/// Incoming funds forwarded onward within six hours. Every matched
/// (incoming, outgoing) pair counts, capped per account.
pub fn detect_passthrough(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let incoming = graph.incoming_sorted(account);
        let outgoing = graph.outgoing_sorted(account);
        if incoming.is_empty() || outgoing.is_empty() {
            continue;
        }

        let out_times: Vec<i64> = outgoing.iter().map(|t| t.ts_millis()).collect();
        let mut pair_count = 0usize;
        let mut min_lag = i64::MAX;
        let mut start = 0usize;

        'pairs: for txn in &incoming {
            let in_ts = txn.ts_millis();
            while start < out_times.len() && out_times[start] < in_ts {
                start += 1;
            }
            for &out_ts in &out_times[start..] {
                if out_ts - in_ts > PASSTHROUGH_WINDOW_MS {
                    break;
                }
                pair_count += 1;
                min_lag = min_lag.min(out_ts - in_ts);
                if pair_count >= PASSTHROUGH_PAIR_CAP {
                    break 'pairs;
                }
            }
        }

        if pair_count > 0 {
            signals.insert(
                account.clone(),
                Signal::Passthrough {
                    pair_count,
                    min_lag_ms: min_lag,
                },
            );
        }
    }
    signals
}

/// Outgoing transfers mirrored back by the same counterparty at a similar
/// amount within 48 hours. Each incoming leg matches at most once.
pub fn detect_wash_trading(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();
    for account in graph.accounts() {
        let outgoing = graph.outgoing_sorted(account);
        if outgoing.is_empty() {
            continue;
        }

        let mut incoming_by_sender: HashMap<&str, Vec<(i64, f64, usize)>> = HashMap::new();
        for (idx, txn) in graph.incoming_sorted(account).into_iter().enumerate() {
            incoming_by_sender
                .entry(txn.sender_id.as_str())
                .or_default()
                .push((txn.ts_millis(), txn.amount, idx));
        }

        let mut used: HashSet<usize> = HashSet::new();
        let mut count = 0usize;

        for out in &outgoing {
            if count >= WASH_MATCH_CAP {
                break;
            }
            let Some(candidates) = incoming_by_sender.get(out.receiver_id.as_str()) else {
                continue;
            };
            let out_ts = out.ts_millis();
            let tolerance = 0.10 * out.amount;
            let matched = candidates.iter().find(|&&(ts, amount, idx)| {
                !used.contains(&idx)
                    && (ts - out_ts).abs() <= WASH_WINDOW_MS
                    && (amount - out.amount).abs() <= tolerance
            });
            if let Some(&(_, _, idx)) = matched {
                used.insert(idx);
                count += 1;
            }
        }

        if count >= 3 {
            signals.insert(account.clone(), Signal::WashTrading { count });
        }
    }
    signals
}
