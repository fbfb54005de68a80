//! Report assembly: ordering, rounding, and packaging of the final result.

use ringlens_core::{FraudReport, ReportSummary, SuspiciousAccount};

use crate::rings::RingAssembly;
use crate::scoring::ScoredAccount;

/// Counts fed into the report summary by the analyzer.
pub(crate) struct RunCounts {
    pub total_accounts: usize,
    pub cycles_detected: usize,
    pub louvain_rings: usize,
    pub patterns_analyzed: usize,
    pub processing_seconds: f64,
}

/// Packages scored accounts and assembled rings into the stable outbound
/// shape: suspicious accounts sorted by score descending (ties by account id
/// ascending), ring ids attached where membership exists.
pub(crate) fn build_report(
    scored: Vec<ScoredAccount>,
    assembly: RingAssembly,
    counts: RunCounts,
) -> FraudReport {
    let mut suspicious_accounts: Vec<SuspiciousAccount> = scored
        .into_iter()
        .filter(|a| a.suspicious)
        .map(|a| {
            let ring_id = assembly.account_ring.get(&a.account_id).cloned();
            SuspiciousAccount {
                account_id: a.account_id,
                suspicion_score: a.score,
                detected_patterns: a.patterns,
                ring_id,
            }
        })
        .collect();
    suspicious_accounts.sort_by(|a, b| {
        b.suspicion_score
            .partial_cmp(&a.suspicion_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    let summary = ReportSummary {
        total_accounts_analyzed: counts.total_accounts,
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: assembly.rings.len(),
        processing_time_seconds: counts.processing_seconds,
        cycles_detected: counts.cycles_detected,
        louvain_smurfing_rings_detected: counts.louvain_rings,
        patterns_analyzed: counts.patterns_analyzed,
    };

    FraudReport {
        suspicious_accounts,
        fraud_rings: assembly.rings,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scored(account: &str, score: f64, suspicious: bool) -> ScoredAccount {
        ScoredAccount {
            account_id: account.to_string(),
            score,
            patterns: vec!["cycle".to_string()],
            suspicious,
        }
    }

    #[test]
    fn test_ordering_score_desc_then_id_asc() {
        let scored = vec![
            scored("B", 70.0, true),
            scored("A", 70.0, true),
            scored("C", 90.0, true),
            scored("D", 10.0, false),
        ];
        let assembly = RingAssembly {
            rings: vec![],
            account_ring: HashMap::new(),
        };
        let report = build_report(
            scored,
            assembly,
            RunCounts {
                total_accounts: 4,
                cycles_detected: 0,
                louvain_rings: 0,
                patterns_analyzed: 22,
                processing_seconds: 0.0,
            },
        );

        let ids: Vec<&str> = report
            .suspicious_accounts
            .iter()
            .map(|a| a.account_id.as_str())
            .collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(report.summary.suspicious_accounts_flagged, 3);
        assert_eq!(report.summary.total_accounts_analyzed, 4);
    }
}
