//! Rubric configuration.
//!
//! A rubric is a declarative value object: which numeric fields exist and
//! how they are weighted, the verdict vocabulary, which qualitative
//! findings get merged and how, and the optional red-flag thresholds.
//! The aggregator itself is generic over it.

use crate::models::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while validating a rubric.
#[derive(Debug, Error)]
pub enum RubricError {
    #[error("rubric field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("weight for `{field}` must be a finite, non-negative number (got {weight})")]
    InvalidWeight { field: String, weight: f64 },

    #[error("invalid pattern for `{field}`: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern for `{field}` has no capture group: {pattern}")]
    MissingCapture { field: String, pattern: String },

    #[error("verdict labels must be non-empty and distinct")]
    InvalidLabels,

    #[error("red flag refers to undeclared score field `{0}`")]
    UnknownRedFlagField(String),

    #[error("`{0}` must be at least 1")]
    ZeroCount(&'static str),

    #[error("failed to read rubric file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rubric file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// A numeric 0-100 field reported by critics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreField {
    /// JSON key, e.g. `orwellian_clarity_score`.
    pub name: String,

    /// Weight in the overall score. Unweighted fields are averaged only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Case-insensitive prose patterns tried in order when the critic
    /// returned no JSON. Group 1 must capture the number.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl ScoreField {
    fn new(name: &str, weight: Option<f64>, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Labels attached to each severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictLabels {
    pub clear: String,
    pub revise: String,
    pub reject: String,
    /// Status a caller stores before the aggregator has run.
    #[serde(default = "default_pending")]
    pub pending: String,
}

fn default_pending() -> String {
    "PROCESSING".to_string()
}

impl VerdictLabels {
    pub fn label(&self, severity: Severity) -> &str {
        match severity {
            Severity::Clear => &self.clear,
            Severity::Revise => &self.revise,
            Severity::Reject => &self.reject,
        }
    }

    /// Match an uppercased label against the vocabulary.
    pub fn severity_of(&self, label: &str) -> Option<Severity> {
        let label = label.trim().to_uppercase();
        if label.is_empty() {
            None
        } else if label == self.clear.to_uppercase() {
            Some(Severity::Clear)
        } else if label == self.revise.to_uppercase() {
            Some(Severity::Revise)
        } else if label == self.reject.to_uppercase() {
            Some(Severity::Reject)
        } else {
            None
        }
    }
}

/// Verdict vocabulary and the prose fallbacks used to find it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// JSON keys holding the verdict, tried in order.
    #[serde(default = "default_verdict_keys")]
    pub keys: Vec<String>,

    pub labels: VerdictLabels,

    /// Markers introducing an explicit verdict in prose.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    /// Words counting towards the best severity.
    #[serde(default)]
    pub clear_indicators: Vec<String>,

    /// Words counting towards the worst severity.
    #[serde(default)]
    pub reject_indicators: Vec<String>,

    /// The winning indicator count must exceed this.
    #[serde(default = "default_indicator_threshold")]
    pub indicator_threshold: usize,

    /// Best-severity votes needed for a majority.
    #[serde(default = "default_clear_quorum")]
    pub clear_quorum: usize,
}

fn default_verdict_keys() -> Vec<String> {
    vec!["final_verdict".to_string(), "verdict".to_string()]
}

fn default_markers() -> Vec<String> {
    vec!["FINAL VERDICT:".to_string(), "VERDICT:".to_string()]
}

fn default_indicator_threshold() -> usize {
    2
}

fn default_clear_quorum() -> usize {
    2
}

/// How a qualitative finding is merged across critics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// Lowercased, deduplicated, sorted.
    Terms,
    /// Deduplicated and sorted, text kept as-is.
    Set,
    /// Integer sentence positions, deduplicated, sorted ascending.
    Indices,
    /// Term -> alternatives; lists concatenated then deduplicated.
    Alternatives,
    /// Concatenated in critic order, repeats kept.
    Concat,
    /// Concatenated in critic order, first occurrence kept.
    Distinct,
    /// Single text; first critic with a non-empty value wins.
    First,
}

impl MergeKind {
    /// Shape of the field in a single critique.
    pub fn shape(self) -> FieldShape {
        match self {
            MergeKind::Terms
            | MergeKind::Set
            | MergeKind::Indices
            | MergeKind::Concat
            | MergeKind::Distinct => FieldShape::List,
            MergeKind::Alternatives => FieldShape::Mapping,
            MergeKind::First => FieldShape::Text,
        }
    }
}

/// Shape a finding takes inside one parsed critique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    List,
    Mapping,
    Text,
}

/// A qualitative finding field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingField {
    pub name: String,
    pub merge: MergeKind,
    /// Cap on merged entries (`concat` and `distinct` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FindingField {
    fn new(name: &str, merge: MergeKind) -> Self {
        Self {
            name: name.to_string(),
            merge,
            limit: None,
        }
    }

    fn limited(name: &str, merge: MergeKind, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(name, merge)
        }
    }
}

/// Structural red-flag thresholds.
///
/// A critic trips a flag when it reports high intensity with low density,
/// or low density with low soundness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlagConfig {
    /// Rhetorical force, e.g. `venom_density`.
    pub intensity_field: String,
    /// Substantive density, e.g. `value_density`.
    pub density_field: String,
    /// Structural soundness, e.g. `physics_engine_score`.
    pub soundness_field: String,

    #[serde(default = "default_high_intensity")]
    pub high_intensity: u8,
    #[serde(default = "default_low_density")]
    pub low_density: u8,
    #[serde(default = "default_low_soundness")]
    pub low_soundness: u8,

    /// Critics that must trip a flag before the verdict escalates.
    #[serde(default = "default_min_critics")]
    pub min_critics: usize,
}

pub const DEFAULT_HIGH_INTENSITY: u8 = 70;
pub const DEFAULT_LOW_DENSITY: u8 = 40;
pub const DEFAULT_LOW_SOUNDNESS: u8 = 30;
pub const DEFAULT_RED_FLAG_CRITICS: usize = 2;

fn default_high_intensity() -> u8 {
    DEFAULT_HIGH_INTENSITY
}

fn default_low_density() -> u8 {
    DEFAULT_LOW_DENSITY
}

fn default_low_soundness() -> u8 {
    DEFAULT_LOW_SOUNDNESS
}

fn default_min_critics() -> usize {
    DEFAULT_RED_FLAG_CRITICS
}

/// A complete rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub name: String,

    /// Substring marking a failed critic response.
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,

    #[serde(default)]
    pub scores: Vec<ScoreField>,

    pub verdict: VerdictConfig,

    #[serde(default)]
    pub findings: Vec<FindingField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_flags: Option<RedFlagConfig>,
}

fn default_failure_marker() -> String {
    "failed".to_string()
}

/// Built-in rubric presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RubricPreset {
    /// Clinical tone critique (CLEAR / REVISE / REJECT)
    ClinicalSovereign,
    /// Orwell-Hitchens writing critique (PUBLISH / REVISE / REWRITE)
    #[default]
    OrwellHitchens,
}

impl RubricPreset {
    pub fn rubric(self) -> Rubric {
        match self {
            RubricPreset::ClinicalSovereign => Rubric::clinical_sovereign(),
            RubricPreset::OrwellHitchens => Rubric::orwell_hitchens(),
        }
    }
}

const GENERIC_SCORE: &str = r"score[:\s]+(\d+)(?:/100)?";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Rubric {
    /// Clinical tone critique with red-flag escalation.
    pub fn clinical_sovereign() -> Self {
        Self {
            name: "clinical-sovereign".to_string(),
            failure_marker: default_failure_marker(),
            scores: vec![
                ScoreField::new(
                    "physics_engine_score",
                    Some(0.35),
                    &[r"physics\s+engine(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "zero_kelvin_shield_score",
                    Some(0.25),
                    &[r"zero[-\s]+kelvin\s+shield(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "verdict_output_score",
                    Some(0.20),
                    &[r"verdict\s+output(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "scalpel_edge_score",
                    Some(0.15),
                    &[r"scalpel\s+edge(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "kinetic_action_score",
                    Some(0.05),
                    &[r"kinetic\s+action(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "clinical_tone_score",
                    None,
                    &[
                        r"clinical\s+tone\s+score[:\s]+(\d+)",
                        r"tone\s+score[:\s]+(\d+)",
                        GENERIC_SCORE,
                    ],
                ),
                ScoreField::new("venom_density", None, &[r"venom\s+density[:\s]+(\d+)"]),
                ScoreField::new("value_density", None, &[r"value\s+density[:\s]+(\d+)"]),
            ],
            verdict: VerdictConfig {
                keys: default_verdict_keys(),
                labels: VerdictLabels {
                    clear: "CLEAR".to_string(),
                    revise: "REVISE".to_string(),
                    reject: "REJECT".to_string(),
                    pending: default_pending(),
                },
                markers: default_markers(),
                clear_indicators: strings(&["clear", "publish", "approved", "ready"]),
                reject_indicators: strings(&["reject", "fail", "unacceptable", "do not publish"]),
                indicator_threshold: default_indicator_threshold(),
                clear_quorum: default_clear_quorum(),
            },
            findings: vec![
                FindingField::new("structural_failures", MergeKind::Concat),
                FindingField::new("sentence_triggers", MergeKind::Indices),
                FindingField::new("forbidden_alternatives", MergeKind::Alternatives),
                FindingField::new("artifact", MergeKind::First),
            ],
            red_flags: Some(RedFlagConfig {
                intensity_field: "venom_density".to_string(),
                density_field: "value_density".to_string(),
                soundness_field: "physics_engine_score".to_string(),
                high_intensity: DEFAULT_HIGH_INTENSITY,
                low_density: DEFAULT_LOW_DENSITY,
                low_soundness: DEFAULT_LOW_SOUNDNESS,
                min_critics: DEFAULT_RED_FLAG_CRITICS,
            }),
        }
    }

    /// Orwellian clarity / Hitchensian fire writing critique.
    pub fn orwell_hitchens() -> Self {
        Self {
            name: "orwell-hitchens".to_string(),
            failure_marker: default_failure_marker(),
            scores: vec![
                ScoreField::new(
                    "orwellian_clarity_score",
                    Some(0.40),
                    &[r"orwellian\s+clarity(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "hitchensian_fire_score",
                    Some(0.30),
                    &[r"hitchensian\s+fire(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "vivid_physicality_score",
                    Some(0.20),
                    &[r"vivid\s+physicality(?:\s+score)?[:\s]+(\d+)"],
                ),
                ScoreField::new(
                    "technical_execution_score",
                    Some(0.10),
                    &[r"technical\s+execution(?:\s+score)?[:\s]+(\d+)"],
                ),
            ],
            verdict: VerdictConfig {
                keys: vec!["verdict".to_string(), "final_verdict".to_string()],
                labels: VerdictLabels {
                    clear: "PUBLISH".to_string(),
                    revise: "REVISE".to_string(),
                    reject: "REWRITE".to_string(),
                    pending: default_pending(),
                },
                markers: default_markers(),
                clear_indicators: strings(&["publish", "ready", "strong", "clear", "excellent"]),
                reject_indicators: strings(&["rewrite", "fail", "weak", "unclear", "confusing"]),
                indicator_threshold: default_indicator_threshold(),
                clear_quorum: default_clear_quorum(),
            },
            findings: vec![
                FindingField::new("abstract_nouns", MergeKind::Terms),
                FindingField::new("passive_voice_sentences", MergeKind::Indices),
                FindingField::new("jargon_violations", MergeKind::Alternatives),
                FindingField::new("weak_verbs", MergeKind::Terms),
                FindingField::new("rhetorical_highlights", MergeKind::Concat),
                FindingField::new("summary", MergeKind::First),
                FindingField::new("diagnostic_summary", MergeKind::First),
                FindingField::limited("before_after_examples", MergeKind::Concat, 5),
                FindingField::new("strengths_to_amplify", MergeKind::Concat),
                FindingField::new("recurring_patterns", MergeKind::Set),
                FindingField::limited("concrete_next_steps", MergeKind::Distinct, 5),
                FindingField::new("one_sentence_verdict", MergeKind::First),
            ],
            red_flags: None,
        }
    }

    /// Load a rubric from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RubricError> {
        let content = std::fs::read_to_string(path).map_err(|source| RubricError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| RubricError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Render as TOML, for `--print-rubric`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn score_field(&self, name: &str) -> Option<&ScoreField> {
        self.scores.iter().find(|f| f.name == name)
    }

    /// Fields that take part in the overall score.
    pub fn weighted_fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores
            .iter()
            .filter_map(|f| f.weight.map(|w| (f.name.as_str(), w)))
    }

    /// Check internal consistency. Pattern syntax is checked when the
    /// patterns are compiled.
    pub fn validate(&self) -> Result<(), RubricError> {
        let mut seen = HashSet::new();
        let names = self
            .scores
            .iter()
            .map(|f| &f.name)
            .chain(self.findings.iter().map(|f| &f.name));
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(RubricError::DuplicateField(name.clone()));
            }
        }

        for field in &self.scores {
            if let Some(weight) = field.weight {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(RubricError::InvalidWeight {
                        field: field.name.clone(),
                        weight,
                    });
                }
            }
        }

        let labels = &self.verdict.labels;
        let upper: Vec<String> = [&labels.clear, &labels.revise, &labels.reject]
            .iter()
            .map(|l| l.trim().to_uppercase())
            .collect();
        if upper.iter().any(String::is_empty)
            || upper[0] == upper[1]
            || upper[1] == upper[2]
            || upper[0] == upper[2]
        {
            return Err(RubricError::InvalidLabels);
        }

        if self.verdict.clear_quorum == 0 {
            return Err(RubricError::ZeroCount("verdict.clear_quorum"));
        }

        if let Some(ref flags) = self.red_flags {
            if flags.min_critics == 0 {
                return Err(RubricError::ZeroCount("red_flags.min_critics"));
            }
            for name in [
                &flags.intensity_field,
                &flags.density_field,
                &flags.soundness_field,
            ] {
                if self.score_field(name).is_none() {
                    return Err(RubricError::UnknownRedFlagField(name.clone()));
                }
            }
        }

        Ok(())
    }
}
