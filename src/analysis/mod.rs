//! Analysis modules.
//!
//! Parsing and normalizing critic responses, then reducing them into a
//! single consensus.

pub mod aggregator;
pub mod consensus;
pub mod extract;
pub mod merger;
pub mod normalizer;
pub mod parser;
pub mod verdict;

pub use aggregator::{average_scores, historical_average, weakest_field, weighted_overall};
pub use consensus::ConsensusEngine;
pub use merger::merge_findings;
pub use normalizer::Normalizer;
pub use parser::extract_json_object;
pub use verdict::{resolve_verdict, trips_red_flag, Resolution};
