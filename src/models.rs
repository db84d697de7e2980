//! Data models for the consensus aggregator.
//!
//! This module contains the core data structures used throughout
//! the crate for representing critic responses, parsed critiques and
//! the final consensus record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a verdict, ordered best to worst.
///
/// Rubrics attach their own labels (`CLEAR`/`PUBLISH`, `REVISE`,
/// `REJECT`/`REWRITE`) to these three levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Ready to go out as-is.
    Clear,
    /// Needs another pass.
    Revise,
    /// Structurally broken; start over.
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Clear => write!(f, "Clear"),
            Severity::Revise => write!(f, "Revise"),
            Severity::Reject => write!(f, "Reject"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Clear => "🟢",
            Severity::Revise => "🟡",
            Severity::Reject => "🔴",
        }
    }
}

/// Fixed-precision decimal with one fractional digit.
///
/// Stored as a whole number of tenths so averages are exact and
/// reproducible. Serialized as a plain JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tenths(i64);

impl Tenths {
    /// Build from a raw count of tenths (`705` is `70.5`).
    pub const fn from_tenths(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Build from a whole number.
    pub const fn from_whole(value: i64) -> Self {
        Self(value * 10)
    }

    /// The mean `sum / count`, rounded half away from zero to one decimal.
    ///
    /// Returns `None` when `count` is zero.
    pub fn from_mean(sum: i64, count: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let count = count as i64;
        let numerator = sum * 20;
        let denominator = count * 2;
        let rounded = if numerator >= 0 {
            (numerator + count) / denominator
        } else {
            (numerator - count) / denominator
        };
        Some(Self(rounded))
    }

    /// Round an `f64` to one decimal, half away from zero.
    ///
    /// The value is first snapped to six decimals so binary noise such as
    /// `71.55000000000001` cannot move a tie.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let snapped = (value * 10.0 * 1e6).round() / 1e6;
        Some(Self(snapped.round() as i64))
    }

    /// Raw count of tenths.
    pub fn tenths(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

impl Serialize for Tenths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Tenths {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Tenths::from_f64(value).ok_or_else(|| serde::de::Error::custom("score is not finite"))
    }
}

/// Raw output of one critic, as handed over by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticResponse {
    /// Critic identity (e.g. "claude", "gpt", "gemini").
    pub critic: String,
    /// Whatever the critic returned, possibly empty.
    pub text: String,
}

impl CriticResponse {
    pub fn new(critic: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            critic: critic.into(),
            text: text.into(),
        }
    }

    /// Whether this response signals an upstream failure.
    ///
    /// Empty text, or text containing `marker` (case-insensitive).
    pub fn is_failed(&self, marker: &str) -> bool {
        if self.text.trim().is_empty() {
            return true;
        }
        !marker.is_empty() && self.text.to_lowercase().contains(&marker.to_lowercase())
    }
}

/// One critic's response after normalization.
///
/// Every rubric field has a defined value: missing scores are absent from
/// `scores`, everything else falls back to an empty container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedCritique {
    /// Critic identity.
    pub critic: String,
    /// Whether an embedded JSON object was found.
    pub structured: bool,
    /// Numeric fields that were present and within 0..=100.
    pub scores: BTreeMap<String, u8>,
    /// Individual verdict, `None` meaning "no opinion".
    pub verdict: Option<Severity>,
    /// List-typed fields.
    pub lists: BTreeMap<String, Vec<Value>>,
    /// Mapping-typed fields (term -> alternatives).
    pub mappings: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Singleton text fields.
    pub texts: BTreeMap<String, String>,
}

impl ParsedCritique {
    pub fn score(&self, field: &str) -> Option<u8> {
        self.scores.get(field).copied()
    }

    pub fn list(&self, field: &str) -> &[Value] {
        self.lists.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn text(&self, field: &str) -> &str {
        self.texts.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Average of one rubric numeric field across critics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAverage {
    /// Rubric field name.
    pub field: String,
    /// Mean of contributed values, `None` when nobody reported it.
    pub average: Option<Tenths>,
    /// Number of critics that contributed a value.
    pub contributors: usize,
    /// Weight in the overall score, if the field is weighted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Which rule of the decision policy produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictRule {
    /// A critic returned the worst verdict.
    Veto,
    /// Enough critics tripped a structural red flag.
    RedFlag,
    /// Enough critics agreed on the best verdict.
    Majority,
    /// Verdicts were collected but none of the above applied.
    Fallback,
    /// No critic produced a usable verdict.
    NoVotes,
}

impl fmt::Display for VerdictRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictRule::Veto => write!(f, "veto"),
            VerdictRule::RedFlag => write!(f, "red-flag escalation"),
            VerdictRule::Majority => write!(f, "majority"),
            VerdictRule::Fallback => write!(f, "fallback"),
            VerdictRule::NoVotes => write!(f, "no votes"),
        }
    }
}

/// A merged qualitative finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergedFinding {
    /// Sorted sentence indices.
    Indices(Vec<i64>),
    /// Term -> deduplicated alternatives.
    Alternatives(BTreeMap<String, Vec<String>>),
    /// Single text value.
    Text(String),
    /// Any list-shaped finding.
    List(Vec<Value>),
}

/// How one critic took part in the consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticOutcome {
    pub critic: String,
    /// False when the response was empty or signalled a failure.
    pub included: bool,
    /// True when a JSON object was found.
    pub structured: bool,
    /// The critic's own verdict label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    /// Whether the critic tripped a red flag.
    pub red_flag: bool,
}

/// The reduced verdict for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Name of the rubric used.
    pub rubric: String,
    /// Per-field averages in rubric order.
    pub scores: Vec<FieldAverage>,
    /// Weighted overall score; absent when any weighted average is absent.
    pub overall_score: Option<Tenths>,
    /// Consensus verdict label.
    pub verdict: String,
    pub severity: Severity,
    pub verdict_rule: VerdictRule,
    /// Number of critics that tripped a red flag.
    pub red_flags: usize,
    /// Merged findings keyed by rubric field.
    pub findings: BTreeMap<String, MergedFinding>,
    /// Per-critic participation, in input order.
    pub critics: Vec<CriticOutcome>,
    /// Mean overall score of past pieces, filled in by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_average: Option<Tenths>,
}

impl ConsensusResult {
    /// Average for a named field.
    pub fn score(&self, field: &str) -> Option<Tenths> {
        self.scores
            .iter()
            .find(|s| s.field == field)
            .and_then(|s| s.average)
    }

    pub fn finding(&self, field: &str) -> Option<&MergedFinding> {
        self.findings.get(field)
    }

    /// Number of critics that took part.
    pub fn participants(&self) -> usize {
        self.critics.iter().filter(|c| c.included).count()
    }
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the critic outputs came from.
    pub source: String,
    /// Date and time of the run.
    pub generated_at: DateTime<Utc>,
    /// Number of critic responses supplied.
    pub critics_supplied: usize,
    /// Number of critics excluded as failed.
    pub critics_failed: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete report written by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub consensus: ConsensusResult,
    /// Flagged sentences quoted from the draft, when one was supplied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged_sentences: Vec<FlaggedSentence>,
    /// The draft with flagged sentences wrapped in `<mark>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_draft: Option<String>,
}

/// A sentence of the draft flagged by at least one critic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedSentence {
    pub index: usize,
    pub text: String,
}
