//! Suspicion scoring.
//!
//! The score is a weighted sum of per-signal contributions plus a Louvain
//! community bonus, minus legitimacy penalties, clamped to [0, 100]. Every
//! weight below is a fixed contract; changing one changes every report.

use std::collections::HashSet;

use ringlens_core::{round_score, TransactionGraph, DAY_MS};

use crate::community::Community;
use crate::detectors::{mean, population_variance};
use crate::signals::{Signal, SignalMap};

/// Louvain bonus ceiling.
const LOUVAIN_BONUS_CAP: f64 = 40.0;

/// A fully scored account, suspicious or not; ring assembly reads scores for
/// every ring member, so nothing is discarded here.
#[derive(Debug, Clone)]
pub struct ScoredAccount {
    pub account_id: String,
    /// Clamped to [0, 100], rounded to one decimal.
    pub score: f64,
    /// Fired pattern labels in detection order.
    pub patterns: Vec<String>,
    /// Whether the account crossed the multi-signal classification bar.
    pub suspicious: bool,
}

/// Scores every account against the collected signal maps and retained
/// Louvain communities.
pub fn score_accounts(
    graph: &TransactionGraph,
    maps: &[SignalMap],
    communities: &[Community],
) -> Vec<ScoredAccount> {
    graph
        .accounts()
        .iter()
        .map(|account| score_account(graph, account, maps, communities))
        .collect()
}

fn score_account(
    graph: &TransactionGraph,
    account: &str,
    maps: &[SignalMap],
    communities: &[Community],
) -> ScoredAccount {
    let mut score = 0.0;
    let mut patterns: Vec<String> = Vec::new();
    let mut has_cycle = false;

    for map in maps {
        if let Some(signal) = map.get(account) {
            score += contribution(signal);
            patterns.push(signal.label().to_string());
            if matches!(signal, Signal::Cycle { .. }) {
                has_cycle = true;
            }
        }
    }

    if let Some(community) = communities.iter().find(|c| c.members.iter().any(|m| m == account)) {
        score += louvain_bonus(community, account);
        patterns.push("louvain_smurfing_ring".to_string());
        patterns.push(format!("louvain_{}", community.pattern.label()));
    }

    score -= legitimacy_penalty(graph, account);

    let score = round_score(score.clamp(0.0, 100.0));
    let suspicious = classify(score, patterns.len(), has_cycle);

    ScoredAccount {
        account_id: account.to_string(),
        score,
        patterns,
        suspicious,
    }
}

/// Per-signal contribution; the largest applicable sub-case wins.
fn contribution(signal: &Signal) -> f64 {
    match signal {
        Signal::Cycle { min_length, .. } => match min_length {
            3 => 35.0,
            4 => 28.0,
            _ => 22.0,
        },
        Signal::FanOut { counterparties, .. } | Signal::FanIn { counterparties, .. } => {
            (12.0 + (0.6 * (counterparties.saturating_sub(15)) as f64).floor()).min(18.0)
        }
        Signal::ShellAccount { .. } => 12.0,
        Signal::Passthrough { pair_count, .. } => match pair_count {
            n if *n >= 10 => 8.0,
            n if *n >= 5 => 6.0,
            _ => 4.0,
        },
        Signal::Structuring { round_fraction } => match round_fraction {
            f if *f >= 0.9 => 8.0,
            f if *f >= 0.8 => 6.0,
            _ => 5.0,
        },
        Signal::ThresholdAvoidance { clustering, .. } => match clustering {
            c if *c >= 0.80 => 8.0,
            c if *c >= 0.60 => 6.0,
            _ => 5.0,
        },
        Signal::VelocityAnomaly { peak_rate } => match peak_rate {
            r if *r > 15.0 => 10.0,
            r if *r > 10.0 => 7.0,
            _ => 4.0,
        },
        Signal::AmountAnomaly { outlier_fraction } => match outlier_fraction {
            f if *f > 0.7 => 8.0,
            f if *f > 0.5 => 6.0,
            _ => 4.0,
        },
        Signal::UnusualTiming {
            night_fraction,
            weekend_fraction,
        } => {
            let night = if *night_fraction > 0.5 { 4.0 } else { 0.0 };
            let weekend = if *weekend_fraction > 0.7 { 3.0 } else { 0.0 };
            night + weekend
        }
        Signal::BurstActivity { max_run, .. } => match max_run {
            n if *n >= 10 => 8.0,
            n if *n >= 5 => 6.0,
            _ => 4.0,
        },
        Signal::DormancyReactivation {
            gap_days,
            post_events,
        } => {
            if *gap_days > 180.0 && *post_events > 10 {
                10.0
            } else if *gap_days > 90.0 && *post_events > 5 {
                7.0
            } else {
                4.0
            }
        }
        Signal::AmountSplitting { group_size, .. } => match group_size {
            n if *n >= 10 => 8.0,
            n if *n >= 5 => 6.0,
            _ => 4.0,
        },
        Signal::FrequencyAnomaly { per_day } => match per_day {
            r if *r > 50.0 => 8.0,
            r if *r > 20.0 => 6.0,
            _ => 4.0,
        },
        Signal::NetworkInfluence { normalized } => match normalized {
            v if *v > 0.8 => 6.0,
            v if *v > 0.6 => 4.0,
            _ => 2.0,
        },
        Signal::RoundTrip { count } => match count {
            n if *n >= 5 => 8.0,
            n if *n >= 3 => 5.0,
            _ => 3.0,
        },
        Signal::Layering { max_depth, reached } => {
            let base = match max_depth {
                d if *d >= 6 => 5.0,
                d if *d >= 5 => 3.0,
                _ => 2.0,
            };
            base + if *reached > 50 { 2.0 } else { 0.0 }
        }
        Signal::LowDiversity { ratio, top_share } => {
            let mut value = 3.0;
            if *ratio < 0.2 {
                value += 2.0;
            }
            if *top_share > 0.7 {
                value += 1.0;
            }
            value
        }
        Signal::AmountProgression {
            step_ratio,
            multiplier,
            ..
        } => {
            if *multiplier > 10.0 {
                6.0
            } else if *multiplier > 5.0 {
                4.0
            } else if *step_ratio > 0.8 {
                3.0
            } else {
                2.0
            }
        }
        Signal::TemporalClustering {
            peak_hours,
            concentration,
        } => {
            if peak_hours.len() == 1 && *concentration > 0.7 {
                5.0
            } else if *concentration > 0.6 {
                3.0
            } else {
                2.0
            }
        }
        Signal::MoneyLaunderingChain {
            longest,
            chain_count,
        } => {
            let base = match longest {
                n if *n >= 7 => 12.0,
                n if *n >= 6 => 8.0,
                _ => 5.0,
            };
            (base + if *chain_count >= 10 { 3.0f64 } else { 0.0 }).min(15.0)
        }
        Signal::CoordinatedBehavior { partners } => match partners {
            n if *n >= 5 => 10.0,
            n if *n >= 3 => 7.0,
            _ => 5.0,
        },
        Signal::SmurfingClusters { clusters, .. } => match clusters {
            n if *n >= 5 => 10.0,
            n if *n >= 3 => 7.0,
            _ => 5.0,
        },
        Signal::WashTrading { count } => match count {
            n if *n >= 10 => 10.0,
            n if *n >= 5 => 7.0,
            _ => 5.0,
        },
    }
}

/// Louvain membership bonus, capped at 40.
fn louvain_bonus(community: &Community, account: &str) -> f64 {
    let role = if community.is_central(account) { 15.0 } else { 10.0 };
    let density_bonus = match community.density {
        d if d > 0.5 => 3.0,
        d if d > 0.3 => 2.0,
        d if d > 0.1 => 1.0,
        _ => 0.0,
    };
    let consistency_bonus = match community.amount_consistency {
        c if c > 0.9 => 3.0,
        c if c > 0.7 => 2.0,
        c if c > 0.5 => 1.0,
        _ => 0.0,
    };
    (20.0 * community.smurfing_score
        + role
        + community.pattern.score_bonus()
        + density_bonus
        + consistency_bonus)
        .min(LOUVAIN_BONUS_CAP)
}

/// Multi-signal classification bar.
fn classify(score: f64, pattern_count: usize, has_cycle: bool) -> bool {
    score >= 80.0
        || (score >= 70.0 && pattern_count >= 3)
        || (score >= 60.0 && has_cycle && pattern_count >= 3)
        || (score >= 50.0 && has_cycle && pattern_count >= 4)
}

/// Total legitimacy penalty for behavior consistent with lawful activity.
fn legitimacy_penalty(graph: &TransactionGraph, account: &str) -> f64 {
    let mut penalty = 0.0;

    let outgoing = graph.outgoing_sorted(account);
    let incoming = graph.incoming_sorted(account);
    let out_amounts: Vec<f64> = outgoing.iter().map(|t| t.amount).collect();
    let out_times: Vec<i64> = outgoing.iter().map(|t| t.ts_millis()).collect();

    // Payroll: many outgoing payments at a few fixed amounts on a roughly
    // monthly rhythm.
    if outgoing.len() >= 10 {
        let unique_amounts: HashSet<i64> = out_amounts
            .iter()
            .map(|a| (a * 100.0).round() as i64)
            .collect();
        if unique_amounts.len() <= 3 {
            let gaps: Vec<f64> = out_times.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
            let mean_gap_days = mean(&gaps) / DAY_MS as f64;
            if (6.0..=31.0).contains(&mean_gap_days) {
                penalty += 25.0;
            } else {
                penalty += 15.0;
            }
        }
    }

    // Merchant: a stream of small payments from many distinct senders.
    if incoming.len() >= 20 {
        let in_mean = mean(&incoming.iter().map(|t| t.amount).collect::<Vec<_>>());
        if in_mean < 100.0 {
            let senders: HashSet<&str> = incoming.iter().map(|t| t.sender_id.as_str()).collect();
            let diversity = senders.len() as f64 / incoming.len() as f64;
            if diversity > 0.5 {
                penalty += 20.0;
            } else {
                penalty += 10.0;
            }
        }
    }

    // Utility: recurring payments to a single receiver.
    if outgoing.len() >= 5 && single_receiver(&outgoing) {
        let gaps: Vec<f64> = out_times.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        let gap_mean = mean(&gaps);
        let regular = gap_mean <= 0.0 || population_variance(&gaps).sqrt() / gap_mean < 0.5;
        penalty += if regular { 15.0 } else { 8.0 };
    }

    // Business: heavy balanced two-way traffic with a broad counterparty set.
    let degree = graph.degree(account);
    if degree > 50 && !outgoing.is_empty() {
        let ratio = incoming.len() as f64 / outgoing.len() as f64;
        if (0.5..=2.0).contains(&ratio) {
            let mut counterparties: HashSet<&str> = HashSet::new();
            counterparties.extend(outgoing.iter().map(|t| t.receiver_id.as_str()));
            counterparties.extend(incoming.iter().map(|t| t.sender_id.as_str()));
            if counterparties.len() as f64 / degree as f64 > 0.3 {
                penalty += 20.0;
            }
        }
    }

    // Savings: a handful of consistent transfers to one destination.
    if (3..=20).contains(&outgoing.len()) && single_receiver(&outgoing) {
        let amount_mean = mean(&out_amounts);
        if amount_mean > 0.0 {
            let cv_squared = population_variance(&out_amounts) / (amount_mean * amount_mean);
            if cv_squared < 0.1 {
                penalty += 15.0;
            }
        }
    }

    penalty
}

fn single_receiver(outgoing: &[&ringlens_core::Transaction]) -> bool {
    let mut receivers = outgoing.iter().map(|t| t.receiver_id.as_str());
    match receivers.next() {
        Some(first) => receivers.all(|r| r == first),
        None => false,
    }
}
