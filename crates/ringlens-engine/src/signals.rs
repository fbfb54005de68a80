//! Per-detector signals.
//!
//! Each detector emits a map from account to one tagged payload variant with
//! a fixed shape the scorer dispatches on. Absence of an account means the
//! signal did not fire; a present entry always carries every field the
//! scorer reads.

use std::collections::BTreeMap;

/// Direction of a detected amount progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionDirection {
    Increasing,
    Decreasing,
}

/// Detector-specific payload attached to an account.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Member of one or more short directed cycles.
    Cycle {
        /// Smallest cycle length the account participates in.
        min_length: usize,
        /// Number of recorded cycles containing the account.
        cycle_count: usize,
    },
    /// Many distinct receivers inside one 72-hour window.
    FanOut {
        counterparties: usize,
        window_start_ms: i64,
        window_end_ms: i64,
    },
    /// Many distinct senders inside one 72-hour window.
    FanIn {
        counterparties: usize,
        window_start_ms: i64,
        window_end_ms: i64,
    },
    /// Near-inactive relay: tiny degree with flow in both directions.
    ShellAccount { in_count: usize, out_count: usize },
    /// Incoming funds forwarded within six hours.
    Passthrough { pair_count: usize, min_lag_ms: i64 },
    /// Dominance of round amounts.
    Structuring { round_fraction: f64 },
    /// Mean amount parked just under the reporting threshold.
    ThresholdAvoidance {
        mean_amount: f64,
        /// Fraction of amounts inside [9000, 9999].
        clustering: f64,
    },
    /// Peak hourly transaction rate over sliding windows.
    VelocityAnomaly { peak_rate: f64 },
    /// Share of amounts outside the global IQR fences.
    AmountAnomaly { outlier_fraction: f64 },
    /// Night-hour or weekend concentration.
    UnusualTiming {
        night_fraction: f64,
        weekend_fraction: f64,
    },
    /// Runs of abnormally short inter-arrival gaps.
    BurstActivity { max_run: usize, run_count: usize },
    /// Long silence followed by renewed activity.
    DormancyReactivation { gap_days: f64, post_events: usize },
    /// Several similar amounts inside one day.
    AmountSplitting { group_size: usize, window_start_ms: i64 },
    /// Sustained high daily transaction rate.
    FrequencyAnomaly { per_day: f64 },
    /// Weighted PageRank-style influence, normalized by the maximum.
    NetworkInfluence { normalized: f64 },
    /// Out-and-back transfers with one counterparty.
    RoundTrip { count: usize },
    /// Deep downstream forwarding structure.
    Layering {
        max_depth: usize,
        /// Distinct downstream accounts reached.
        reached: usize,
    },
    /// Few counterparties relative to volume.
    LowDiversity {
        ratio: f64,
        /// Share of transactions with the single most frequent counterparty.
        top_share: f64,
    },
    /// Monotone escalation or de-escalation of outgoing amounts.
    AmountProgression {
        direction: ProgressionDirection,
        step_ratio: f64,
        multiplier: f64,
    },
    /// Activity concentrated in a narrow set of hours.
    TemporalClustering {
        peak_hours: Vec<u32>,
        concentration: f64,
    },
    /// Long forwarding chains (deep analysis only).
    MoneyLaunderingChain { longest: usize, chain_count: usize },
    /// Timelines correlated with other active accounts.
    CoordinatedBehavior { partners: usize },
    /// Multiple tight amount clusters spread over many receivers.
    SmurfingClusters { clusters: usize, largest: usize },
    /// Bidirectional near-equal transfers with one counterparty.
    WashTrading { count: usize },
}

impl Signal {
    /// Stable pattern label for the report vocabulary.
    pub fn label(&self) -> &'static str {
        match self {
            Signal::Cycle { .. } => "cycle",
            Signal::FanOut { .. } => "fan_out",
            Signal::FanIn { .. } => "fan_in",
            Signal::ShellAccount { .. } => "shell_account",
            Signal::Passthrough { .. } => "passthrough",
            Signal::Structuring { .. } => "structuring",
            Signal::ThresholdAvoidance { .. } => "threshold_avoidance",
            Signal::VelocityAnomaly { .. } => "velocity_anomaly",
            Signal::AmountAnomaly { .. } => "amount_anomaly",
            Signal::UnusualTiming { .. } => "unusual_timing",
            Signal::BurstActivity { .. } => "burst_activity",
            Signal::DormancyReactivation { .. } => "dormancy_reactivation",
            Signal::AmountSplitting { .. } => "amount_splitting",
            Signal::FrequencyAnomaly { .. } => "frequency_anomaly",
            Signal::NetworkInfluence { .. } => "network_influence",
            Signal::RoundTrip { .. } => "round_trip",
            Signal::Layering { .. } => "layering",
            Signal::LowDiversity { .. } => "low_diversity",
            Signal::AmountProgression { .. } => "amount_progression",
            Signal::TemporalClustering { .. } => "temporal_clustering",
            Signal::MoneyLaunderingChain { .. } => "money_laundering_chain",
            Signal::CoordinatedBehavior { .. } => "coordinated_behavior",
            Signal::SmurfingClusters { .. } => "smurfing_pattern",
            Signal::WashTrading { .. } => "wash_trading",
        }
    }
}

/// Account -> fired signal, ordered by account id for deterministic
/// downstream iteration.
pub type SignalMap = BTreeMap<String, Signal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_vocabulary() {
        let signal = Signal::SmurfingClusters {
            clusters: 2,
            largest: 12,
        };
        assert_eq!(signal.label(), "smurfing_pattern");
        let signal = Signal::Cycle {
            min_length: 3,
            cycle_count: 1,
        };
        assert_eq!(signal.label(), "cycle");
    }
}
