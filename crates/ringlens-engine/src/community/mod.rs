//! Community detection for smurfing rings.
//!
//! A weighted undirected projection of the transaction graph feeds a
//! simplified Louvain sweep; qualifying communities are then analyzed for
//! density, central beneficiaries, amount consistency, and temporal
//! clustering, and scored for smurfing likelihood.

pub mod analysis;
pub mod louvain;

pub use analysis::*;
pub use louvain::*;
