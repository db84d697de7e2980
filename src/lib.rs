//! critic-consensus: reduce several LLM critiques of a draft into one
//! structured, reproducible verdict.
//!
//! The core is [`analysis::ConsensusEngine`], configured by a
//! [`rubric::Rubric`]. The remaining modules back the command-line tool.

pub mod analysis;
pub mod cli;
pub mod collect;
pub mod config;
pub mod models;
pub mod report;
pub mod rubric;
pub mod scanner;

pub use analysis::ConsensusEngine;
pub use models::{ConsensusResult, CriticResponse, ParsedCritique, Severity, Tenths};
pub use rubric::{Rubric, RubricError, RubricPreset};
