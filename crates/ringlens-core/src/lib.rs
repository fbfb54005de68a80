//! # ringlens-core
//!
//! Core domain types for batch AML analytics over transaction graphs:
//! - Transaction records and the directed multigraph built from them
//! - Global statistics cache (amount distribution, per-account activity)
//! - Report models (suspicious accounts, fraud rings, summary)
//! - Engine error taxonomy

pub mod error;
pub mod graph;
pub mod models;
pub mod stats;

pub use error::*;
pub use graph::*;
pub use models::*;
pub use stats::*;
