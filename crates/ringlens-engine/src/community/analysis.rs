//! Community analysis and smurfing scoring.

use std::collections::{HashMap, HashSet};

use ringlens_core::{Transaction, TransactionGraph};

use crate::community::louvain_communities;
use crate::detectors::{mean, population_variance};

/// Size bounds for a community worth analyzing.
const MIN_COMMUNITY_SIZE: usize = 3;
const MAX_COMMUNITY_SIZE: usize = 100;

/// Smurfing score above which a community is retained.
const SMURFING_SCORE_FLOOR: f64 = 0.25;

/// Classified shape of a smurfing community, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityPattern {
    /// Tightly consistent amounts across the community.
    StructuredSmurfing,
    /// Internal activity compressed into a narrow time band.
    CoordinatedBurstSmurfing,
    /// One dominant collector in a dense community.
    SingleBeneficiarySmurfing,
    /// Several collectors sharing a dense community.
    MultiBeneficiaryRing,
    /// Loose, spread-out smurfing structure.
    DistributedSmurfingNetwork,
}

impl CommunityPattern {
    /// Lowercase label used in the `louvain_<pattern>` account label.
    pub fn label(&self) -> &'static str {
        match self {
            CommunityPattern::StructuredSmurfing => "structured_smurfing",
            CommunityPattern::CoordinatedBurstSmurfing => "coordinated_burst_smurfing",
            CommunityPattern::SingleBeneficiarySmurfing => "single_beneficiary_smurfing",
            CommunityPattern::MultiBeneficiaryRing => "multi_beneficiary_ring",
            CommunityPattern::DistributedSmurfingNetwork => "distributed_smurfing_network",
        }
    }

    /// Scorer bonus for the pattern class.
    pub(crate) fn score_bonus(&self) -> f64 {
        match self {
            CommunityPattern::StructuredSmurfing => 5.0,
            CommunityPattern::CoordinatedBurstSmurfing => 4.0,
            CommunityPattern::SingleBeneficiarySmurfing => 3.0,
            CommunityPattern::MultiBeneficiaryRing => 3.0,
            CommunityPattern::DistributedSmurfingNetwork => 2.0,
        }
    }
}

/// A retained smurfing community with its analysis record.
#[derive(Debug, Clone)]
pub struct Community {
    /// Member accounts, sorted ascending.
    pub members: Vec<String>,
    /// Internal directed edges (parallel edges included) over `n * (n - 1)`.
    pub density: f64,
    /// Members whose internal in-degree exceeds twice the average.
    pub central_beneficiaries: Vec<String>,
    /// `1 - min(var / mean, 1)` over internal amounts (0 when the mean is 0).
    pub amount_consistency: f64,
    /// `clamp(1 - stddev / mean, 0, 1)` over internal inter-arrival gaps.
    pub temporal_clustering: f64,
    /// Sum of internal transaction amounts.
    pub total_internal_volume: f64,
    /// Classified pattern.
    pub pattern: CommunityPattern,
    /// Composite smurfing score in [0, 1].
    pub smurfing_score: f64,
}

impl Community {
    /// Whether an account is one of the community's central beneficiaries.
    pub fn is_central(&self, account: &str) -> bool {
        self.central_beneficiaries.iter().any(|a| a == account)
    }
}

/// Runs Louvain and analyzes every community of qualifying size, retaining
/// those whose smurfing score clears the floor.
pub fn detect_smurfing_communities(graph: &TransactionGraph) -> Vec<Community> {
    louvain_communities(graph)
        .into_iter()
        .filter(|members| (MIN_COMMUNITY_SIZE..=MAX_COMMUNITY_SIZE).contains(&members.len()))
        .filter_map(|members| analyze_community(graph, members))
        .filter(|c| c.smurfing_score > SMURFING_SCORE_FLOOR)
        .collect()
}

/// Computes the analysis record for one community.
fn analyze_community(graph: &TransactionGraph, members: Vec<String>) -> Option<Community> {
    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();
    let internal: Vec<&Transaction> = graph
        .transactions()
        .iter()
        .filter(|t| {
            member_set.contains(t.sender_id.as_str()) && member_set.contains(t.receiver_id.as_str())
        })
        .collect();
    if internal.is_empty() {
        return None;
    }

    let n = members.len();

    // Internal in-degree per member (self-loops excluded).
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut directed_count = 0usize;
    for txn in internal.iter().filter(|t| !t.is_self_loop()) {
        *in_degree.entry(txn.receiver_id.as_str()).or_insert(0) += 1;
        directed_count += 1;
    }

    // Density counts internal directed edges, parallel edges included.
    let density = directed_count as f64 / (n * (n - 1)) as f64;
    let avg_in = directed_count as f64 / n as f64;
    let mut central_beneficiaries: Vec<String> = members
        .iter()
        .filter(|m| {
            avg_in > 0.0
                && in_degree.get(m.as_str()).copied().unwrap_or(0) as f64 > 2.0 * avg_in
        })
        .cloned()
        .collect();
    central_beneficiaries.sort_unstable();

    let amounts: Vec<f64> = internal.iter().map(|t| t.amount).collect();
    let amount_mean = mean(&amounts);
    let amount_consistency = if amount_mean > 0.0 {
        1.0 - (population_variance(&amounts) / amount_mean).min(1.0)
    } else {
        0.0
    };

    let mut times: Vec<i64> = internal.iter().map(|t| t.ts_millis()).collect();
    times.sort_unstable();
    let temporal_clustering = inter_arrival_clustering(&times);

    let smurfing_score = 0.25 * (1.5 * density).min(1.0)
        + 0.25 * (central_beneficiaries.len() as f64 / 2.0).min(1.0)
        + 0.30 * amount_consistency
        + 0.20 * temporal_clustering;

    let pattern = classify(
        amount_consistency,
        temporal_clustering,
        central_beneficiaries.len(),
        density,
    );

    Some(Community {
        members,
        density,
        central_beneficiaries,
        amount_consistency,
        temporal_clustering,
        total_internal_volume: amounts.iter().sum(),
        pattern,
        smurfing_score,
    })
}

/// Coefficient-of-variation form over sorted event times: 1 when all events
/// coincide, 0 when gaps scatter wider than their mean.
fn inter_arrival_clustering(times: &[i64]) -> f64 {
    if times.len() < 2 {
        return if times.is_empty() { 0.0 } else { 1.0 };
    }
    let gaps: Vec<f64> = times.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let gap_mean = mean(&gaps);
    if gap_mean <= 0.0 {
        return 1.0;
    }
    let stddev = population_variance(&gaps).sqrt();
    (1.0 - stddev / gap_mean).clamp(0.0, 1.0)
}

/// Pattern classification, first match wins.
fn classify(
    consistency: f64,
    clustering: f64,
    centrals: usize,
    density: f64,
) -> CommunityPattern {
    if consistency > 0.85 {
        CommunityPattern::StructuredSmurfing
    } else if clustering > 0.7 {
        CommunityPattern::CoordinatedBurstSmurfing
    } else if centrals == 1 && density > 0.2 {
        CommunityPattern::SingleBeneficiarySmurfing
    } else if centrals >= 2 && density > 0.3 {
        CommunityPattern::MultiBeneficiaryRing
    } else {
        CommunityPattern::DistributedSmurfingNetwork
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ringlens_core::Transaction;

    fn txn_at(id: &str, from: &str, to: &str, amount: f64, hour: u32, min: u32) -> Transaction {
        let ts = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap();
        Transaction::new(id, from, to, amount, ts)
    }

    /// Eight senders, two near-identical payments each, one collector,
    /// all within six hours.
    fn smurfing_batch() -> Vec<Transaction> {
        let mut txns = Vec::new();
        for i in 0..8 {
            txns.push(txn_at(
                &format!("a{i}"),
                &format!("S{i}"),
                "R",
                10_000.0,
                (i / 2) as u32,
                (i % 2) * 30,
            ));
            txns.push(txn_at(
                &format!("b{i}"),
                &format!("S{i}"),
                "R",
                10_000.0,
                3 + (i / 2) as u32,
                (i % 2) * 30,
            ));
        }
        txns
    }

    #[test]
    fn test_structured_smurfing_community() {
        let graph = TransactionGraph::build(smurfing_batch()).unwrap();
        let communities = detect_smurfing_communities(&graph);
        assert_eq!(communities.len(), 1);
        let community = &communities[0];

        assert_eq!(community.members.len(), 9);
        assert_eq!(community.central_beneficiaries, vec!["R".to_string()]);
        assert!(community.density > 0.2);
        assert!(community.amount_consistency > 0.85);
        assert_eq!(community.pattern, CommunityPattern::StructuredSmurfing);
        assert!(community.smurfing_score > 0.25);
        assert!(community.is_central("R"));
        assert!(!community.is_central("S0"));
    }

    #[test]
    fn test_small_communities_skipped() {
        let graph = TransactionGraph::build(vec![
            txn_at("t1", "A", "B", 100.0, 0, 0),
            txn_at("t2", "B", "A", 100.0, 1, 0),
        ])
        .unwrap();
        assert!(detect_smurfing_communities(&graph).is_empty());
    }

    #[test]
    fn test_inter_arrival_clustering_edges() {
        assert_eq!(inter_arrival_clustering(&[]), 0.0);
        assert_eq!(inter_arrival_clustering(&[5]), 1.0);
        // Identical timestamps: mean gap zero.
        assert_eq!(inter_arrival_clustering(&[5, 5, 5]), 1.0);
        // Evenly spaced gaps: stddev zero, clustering 1.
        assert_eq!(inter_arrival_clustering(&[0, 10, 20, 30]), 1.0);
    }

    #[test]
    fn test_classification_precedence() {
        assert_eq!(classify(0.9, 0.9, 1, 0.5), CommunityPattern::StructuredSmurfing);
        assert_eq!(
            classify(0.5, 0.8, 1, 0.5),
            CommunityPattern::CoordinatedBurstSmurfing
        );
        assert_eq!(
            classify(0.5, 0.5, 1, 0.3),
            CommunityPattern::SingleBeneficiarySmurfing
        );
        assert_eq!(classify(0.5, 0.5, 2, 0.4), CommunityPattern::MultiBeneficiaryRing);
        assert_eq!(
            classify(0.5, 0.5, 0, 0.1),
            CommunityPattern::DistributedSmurfingNetwork
        );
    }
}
