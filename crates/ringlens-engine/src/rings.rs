//! Fraud-ring assembly.
//!
//! Connectivity rings come from BFS components over the suspicious-account
//! subgraph (directed edges symmetrized). Retained Louvain communities are
//! then folded in: a community overlapping an existing ring by more than 70%
//! of the smaller side merges into it, anything else lands as its own ring
//! with `detection_method = "louvain"`.

use std::collections::{HashMap, HashSet, VecDeque};

use ringlens_core::{round_score, FraudRing, RingPatternType, TransactionGraph};

use crate::community::Community;
use crate::scoring::ScoredAccount;

/// Overlap ratio above which a Louvain community merges into an existing ring.
const MERGE_OVERLAP: f64 = 0.7;

/// Output of ring assembly.
#[derive(Debug)]
pub struct RingAssembly {
    pub rings: Vec<FraudRing>,
    /// Suspicious account -> ring id of the first ring containing it.
    pub account_ring: HashMap<String, String>,
}

struct ProtoRing {
    members: Vec<String>,
    community: Option<usize>,
}

/// Assembles rings from connectivity and Louvain evidence and scores them.
pub fn assemble_rings(
    graph: &TransactionGraph,
    scored: &[ScoredAccount],
    communities: &[Community],
) -> RingAssembly {
    let suspicious: Vec<&str> = scored
        .iter()
        .filter(|a| a.suspicious)
        .map(|a| a.account_id.as_str())
        .collect();
    let suspicious_set: HashSet<&str> = suspicious.iter().copied().collect();

    // Symmetrized adjacency restricted to suspicious accounts.
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for txn in graph.transactions() {
        let (s, r) = (txn.sender_id.as_str(), txn.receiver_id.as_str());
        if s != r && suspicious_set.contains(s) && suspicious_set.contains(r) {
            adjacency.entry(s).or_default().push(r);
            adjacency.entry(r).or_default().push(s);
        }
    }

    // BFS components in sorted discovery order; lone accounts stay ring-less.
    let mut protos: Vec<ProtoRing> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for &start in &suspicious {
        if seen.contains(start) {
            continue;
        }
        let mut component = vec![start];
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]) {
                if seen.insert(next) {
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        if component.len() >= 2 {
            let mut members: Vec<String> = component.iter().map(|s| s.to_string()).collect();
            members.sort_unstable();
            protos.push(ProtoRing {
                members,
                community: None,
            });
        }
    }

    // Fold in Louvain communities.
    for (idx, community) in communities.iter().enumerate() {
        let community_set: HashSet<&str> =
            community.members.iter().map(String::as_str).collect();
        let merged = protos.iter_mut().find(|ring| {
            let overlap = ring
                .members
                .iter()
                .filter(|m| community_set.contains(m.as_str()))
                .count();
            let smaller = ring.members.len().min(community.members.len());
            smaller > 0 && overlap as f64 / smaller as f64 > MERGE_OVERLAP
        });
        match merged {
            Some(ring) => {
                let mut union: Vec<String> = ring.members.clone();
                union.extend(community.members.iter().cloned());
                union.sort_unstable();
                union.dedup();
                ring.members = union;
            }
            None => protos.push(ProtoRing {
                members: community.members.clone(),
                community: Some(idx),
            }),
        }
    }

    let scores: HashMap<&str, f64> = scored
        .iter()
        .map(|a| (a.account_id.as_str(), a.score))
        .collect();

    let mut rings = Vec::with_capacity(protos.len());
    let mut account_ring: HashMap<String, String> = HashMap::new();
    for (i, proto) in protos.into_iter().enumerate() {
        let ring_id = format!("RING-{:03}", i + 1);
        let louvain = proto.community.map(|idx| &communities[idx]);
        let pattern_type = classify_ring(graph, &proto.members, louvain.is_some());
        let risk_score = ring_risk(&proto.members, &scores);

        for member in &proto.members {
            if suspicious_set.contains(member.as_str()) {
                account_ring
                    .entry(member.clone())
                    .or_insert_with(|| ring_id.clone());
            }
        }

        rings.push(FraudRing {
            ring_id,
            member_accounts: proto.members,
            pattern_type,
            risk_score,
            detection_method: louvain.map(|_| "louvain".to_string()),
            density: louvain.map(|c| c.density),
            central_beneficiaries: louvain.map(|c| c.central_beneficiaries.clone()),
        });
    }

    RingAssembly {
        rings,
        account_ring,
    }
}

/// Ring pattern classification. Louvain-origin rings are smurfing by
/// construction; for connectivity rings a three-member ring reads as a
/// cycle, then average member degree separates shells, smurfing hubs, and
/// mixed structures.
fn classify_ring(graph: &TransactionGraph, members: &[String], louvain: bool) -> RingPatternType {
    if louvain {
        return RingPatternType::Smurfing;
    }
    if members.len() == 3 {
        return RingPatternType::Cycle;
    }
    let avg_degree =
        members.iter().map(|m| graph.degree(m)).sum::<usize>() as f64 / members.len() as f64;
    if avg_degree <= 3.0 {
        RingPatternType::ShellChain
    } else if avg_degree > 20.0 {
        RingPatternType::Smurfing
    } else {
        RingPatternType::Hybrid
    }
}

/// Risk score: weighted blend of the worst and average member scores,
/// scaled up with ring size and clamped to [0, 100].
fn ring_risk(members: &[String], scores: &HashMap<&str, f64>) -> f64 {
    let member_scores: Vec<f64> = members
        .iter()
        .map(|m| scores.get(m.as_str()).copied().unwrap_or(0.0))
        .collect();
    let max = member_scores.iter().cloned().fold(0.0f64, f64::max);
    let avg = member_scores.iter().sum::<f64>() / member_scores.len().max(1) as f64;
    let size_multiplier = 1.0 + 0.1 * (members.len().saturating_sub(2).min(8)) as f64;
    round_score(((0.6 * max + 0.4 * avg) * size_multiplier).clamp(0.0, 100.0))
}
