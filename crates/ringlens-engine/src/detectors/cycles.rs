//! Cycle and round-trip detection.
//!
//! Cycles of length 3-5 are enumerated with an iterative DFS carrying an
//! explicit path stack and an on-path set; recursion is never used, so a
//! pathological graph cannot overflow the native stack.

use std::collections::{HashMap, HashSet};

use ringlens_core::{TransactionGraph, HOUR_MS};

use crate::detectors::distinct_receivers;
use crate::signals::{Signal, SignalMap};

/// Recorded cycles per starting account before the DFS gives up.
const PER_START_CYCLE_CAP: usize = 100;

/// Outgoing expansions from each start; a path of five nodes suffices for
/// the longest reportable cycle.
const MAX_EXPANSIONS: usize = 4;

/// Round-trip matching window.
const ROUND_TRIP_WINDOW_MS: i64 = 48 * HOUR_MS;

/// Round trips retained per origin account.
const ROUND_TRIP_CAP: usize = 10;

/// Result of cycle enumeration: the per-account signals plus the normalized
/// cycles themselves (the report counts them).
#[derive(Debug)]
pub struct CycleFindings {
    pub signals: SignalMap,
    pub cycles: Vec<Vec<String>>,
}

/// Enumerates simple directed cycles of length 3, 4, or 5.
///
/// Each cycle is normalized by rotating it to start at its lexicographically
/// smallest member; cycles are direction-sensitive, so a reversed ordering is
/// a distinct cycle. Enumeration stops at `max_cycles` overall and at
/// [`PER_START_CYCLE_CAP`] per starting account.
pub fn detect_cycles(graph: &TransactionGraph, max_cycles: usize) -> CycleFindings {
    let receivers = distinct_receivers(graph);
    let mut seen: HashSet<String> = HashSet::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    'starts: for start in graph.accounts() {
        let mut recorded_here = 0usize;

        // Iterative DFS: each frame is (account, next neighbor offset).
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

            if on_path.contains(next) {
                let pos = path.iter().position(|&a| a == next).unwrap_or(0);
                let len = path.len() - pos;
                if (3..=5).contains(&len) {
                    let cycle: Vec<String> = path[pos..].iter().map(|a| a.to_string()).collect();
                    let normalized = normalize_cycle(cycle);
                    let key = normalized.join("->");
                    if seen.insert(key) {
                        cycles.push(normalized);
                        recorded_here += 1;
                        if cycles.len() >= max_cycles {
                            break 'starts;
                        }
                        if recorded_here >= PER_START_CYCLE_CAP {
                            break;
                        }
                    }
                }
            } else if path.len() <= MAX_EXPANSIONS {
                stack.push((next, 0));
                path.push(next);
                on_path.insert(next);
            }
        }
    }

    let mut membership: HashMap<&str, (usize, usize)> = HashMap::new();
    for cycle in &cycles {
        for account in cycle {
            let entry = membership.entry(account.as_str()).or_insert((usize::MAX, 0));
            entry.0 = entry.0.min(cycle.len());
            entry.1 += 1;
        }
    }

    let signals: SignalMap = membership
        .into_iter()
        .map(|(account, (min_length, cycle_count))| {
            (
                account.to_string(),
                Signal::Cycle {
                    min_length,
                    cycle_count,
                },
            )
        })
        .collect();

    CycleFindings { signals, cycles }
}

/// Rotates a cycle so its lexicographically smallest member comes first.
fn normalize_cycle(cycle: Vec<String>) -> Vec<String> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[pivot..]);
    rotated.extend_from_slice(&cycle[..pivot]);
    rotated
}

/// Detects A -> B -> A round trips completed within 48 hours, the outgoing
/// leg first. Each incoming leg is consumed at most once; matching stops at
/// [`ROUND_TRIP_CAP`] per origin. Fires at two or more round trips.
pub fn detect_round_trips(graph: &TransactionGraph) -> SignalMap {
    let mut signals = SignalMap::new();

    for account in graph.accounts() {
        let outgoing = graph.outgoing_sorted(account);
        if outgoing.is_empty() {
            continue;
        }

        // Incoming legs grouped by counterparty, in time order.
        let mut incoming_by_sender: HashMap<&str, Vec<(i64, usize)>> = HashMap::new();
        for (idx, txn) in graph.incoming_sorted(account).into_iter().enumerate() {
            incoming_by_sender
                .entry(txn.sender_id.as_str())
                .or_default()
                .push((txn.ts_millis(), idx));
        }

        let mut used: HashSet<(i64, usize)> = HashSet::new();
        let mut count = 0usize;

        for out in &outgoing {
            if count >= ROUND_TRIP_CAP {
                break;
            }
            let Some(returns) = incoming_by_sender.get(out.receiver_id.as_str()) else {
                continue;
            };
            let out_ts = out.ts_millis();
            let matched = returns.iter().find(|&&(ts, idx)| {
                ts > out_ts && ts - out_ts <= ROUND_TRIP_WINDOW_MS && !used.contains(&(ts, idx))
            });
            if let Some(&key) = matched {
                used.insert(key);
                count += 1;
            }
        }

        if count >= 2 {
            signals.insert(account.clone(), Signal::RoundTrip { count });
        }
    }

    signals
}
