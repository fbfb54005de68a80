//! Analysis entry point.

use std::time::Instant;

use tracing::{debug, info};

use ringlens_core::{EngineResult, FraudReport, StatsCache, Transaction, TransactionGraph};

use crate::community::detect_smurfing_communities;
use crate::config::AnalysisConfig;
use crate::detectors;
use crate::progress::{ProgressCallback, ProgressReporter};
use crate::report::{build_report, RunCounts};
use crate::rings::assemble_rings;
use crate::scoring::score_accounts;

/// Batch fraud analyzer.
///
/// Stateless across calls: every [`analyze`](FraudAnalyzer::analyze) builds
/// its own graph, statistics, and signal maps and releases them with the
/// report. The optional progress callback is invoked synchronously between
/// stages and cannot mutate engine state.
pub struct FraudAnalyzer {
    config: AnalysisConfig,
    progress: Option<ProgressCallback>,
}

impl FraudAnalyzer {
    /// Creates an analyzer with the given configuration.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Attaches a progress callback invoked at stage milestones.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Runs the full pipeline over one validated batch.
    pub fn analyze(&self, transactions: Vec<Transaction>) -> EngineResult<FraudReport> {
        self.config.validate()?;
        let started = Instant::now();
        let progress = ProgressReporter::new(self.progress.as_ref());

        info!(transactions = transactions.len(), "starting fraud analysis");
        progress.milestone("Building transaction graph", 5);
        let graph = TransactionGraph::build(transactions)?;
        debug!(
            accounts = graph.account_count(),
            transactions = graph.transaction_count(),
            "graph built"
        );

        progress.milestone("Computing global statistics", 10);
        let stats = StatsCache::compute(&graph);

        progress.milestone("Running pattern detectors", 20);
        let detection = detectors::run_all(&graph, &stats, &self.config);
        debug!(cycles = detection.cycles.len(), "detectors finished");

        progress.milestone("Detecting smurfing communities", 70);
        let communities = detect_smurfing_communities(&graph);
        debug!(communities = communities.len(), "louvain finished");

        progress.milestone("Scoring accounts", 85);
        let scored = score_accounts(&graph, &detection.maps, &communities);

        progress.milestone("Assembling fraud rings", 93);
        let assembly = assemble_rings(&graph, &scored, &communities);

        let counts = RunCounts {
            total_accounts: graph.account_count(),
            cycles_detected: detection.cycles.len(),
            louvain_rings: communities.len(),
            patterns_analyzed: self.config.patterns_analyzed(),
            processing_seconds: started.elapsed().as_secs_f64(),
        };
        let report = build_report(scored, assembly, counts);
        progress.milestone("Report ready", 100);
        info!(
            suspicious = report.summary.suspicious_accounts_flagged,
            rings = report.summary.fraud_rings_detected,
            "analysis complete"
        );
        Ok(report)
    }
}

impl Default for FraudAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}
