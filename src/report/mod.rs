//! Report rendering.

mod generator;
pub mod sentences;

pub use generator::{generate_json_report, generate_markdown_report};
pub use sentences::{flagged_sentences, highlighted_draft, split_sentences};
