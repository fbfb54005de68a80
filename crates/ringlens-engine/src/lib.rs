//! # ringlens-engine
//!
//! The batch analysis engine. One call to [`FraudAnalyzer::analyze`] runs the
//! fixed pipeline over a validated transaction batch:
//!
//! graph -> statistics -> pattern detectors -> Louvain communities ->
//! suspicion scoring -> ring assembly -> report
//!
//! Shared data (graph, statistics, signal maps) is write-once per run and
//! read-only afterward; the detection stage fans out across a rayon pool and
//! collects results in a fixed order so repeated runs on the same input yield
//! byte-identical reports.

pub mod analyzer;
pub mod community;
pub mod config;
pub mod detectors;
pub mod progress;
pub mod report;
pub mod rings;
pub mod scoring;
pub mod signals;

pub use analyzer::*;
pub use community::{Community, CommunityPattern};
pub use config::*;
pub use progress::*;
pub use signals::{Signal, SignalMap};
