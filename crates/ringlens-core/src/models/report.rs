//! Report models: the stable outbound shape consumed by callers.

use serde::{Deserialize, Serialize};

/// Rounds a score to one decimal place, the report-wide convention.
pub fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

/// A flagged account with its score and the patterns that fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    /// Account identifier.
    pub account_id: String,
    /// Final suspicion score in [0, 100], one decimal.
    pub suspicion_score: f64,
    /// Fired pattern labels, in detection order.
    pub detected_patterns: Vec<String>,
    /// Ring this account belongs to, if any.
    pub ring_id: Option<String>,
}

/// Classified shape of a fraud ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingPatternType {
    Cycle,
    Smurfing,
    ShellChain,
    Hybrid,
}

/// A group of suspicious accounts assembled from connectivity and Louvain
/// evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudRing {
    /// Ring identifier, assigned in discovery order (`RING-001`, ...).
    pub ring_id: String,
    /// Member accounts, sorted ascending, no duplicates.
    pub member_accounts: Vec<String>,
    /// Classified pattern type.
    pub pattern_type: RingPatternType,
    /// Risk score in [0, 100], one decimal.
    pub risk_score: f64,
    /// How the ring was discovered (`louvain` for community-derived rings).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<String>,
    /// Internal edge density of the originating community.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    /// Central beneficiaries of the originating community.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub central_beneficiaries: Option<Vec<String>>,
}

/// Aggregate counts for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
    pub cycles_detected: usize,
    pub louvain_smurfing_rings_detected: usize,
    pub patterns_analyzed: usize,
}

/// The complete analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudReport {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: ReportSummary,
}
