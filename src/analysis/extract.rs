//! Field extraction strategies.
//!
//! Every field is read through a short chain of extractors: structured
//! JSON first, then prose patterns, then heuristics, then a default.
//! The first extractor that yields a value wins. Prose extractors only
//! run when the critic returned no JSON object at all.

use crate::models::Severity;
use crate::rubric::{RubricError, VerdictLabels};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use tracing::trace;

/// What an extractor gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    /// Raw critic text.
    pub text: &'a str,
    /// Embedded JSON object, if one was found.
    pub json: Option<&'a Map<String, Value>>,
}

impl<'a> Source<'a> {
    pub fn new(text: &'a str, json: Option<&'a Map<String, Value>>) -> Self {
        Self { text, json }
    }

    pub fn is_structured(&self) -> bool {
        self.json.is_some()
    }
}

/// One step in an extraction chain.
pub trait Extractor<T>: Send + Sync {
    /// Short name used in trace output.
    fn name(&self) -> &'static str;

    /// Return the value, or `None` to let the next step try.
    fn extract(&self, source: &Source<'_>) -> Option<T>;
}

/// Ordered extractors, first success wins.
pub struct Chain<T> {
    steps: Vec<Box<dyn Extractor<T>>>,
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<T> std::fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("Chain").field("steps", &names).finish()
    }
}

impl<T> Chain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: impl Extractor<T> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn run(&self, source: &Source<'_>) -> Option<T> {
        for step in &self.steps {
            if let Some(value) = step.extract(source) {
                trace!("extractor {} matched", step.name());
                return Some(value);
            }
        }
        None
    }
}

/// Coerce a JSON value to a 0-100 score.
///
/// Integers, finite floats (truncated) and strings holding an integer are
/// accepted. Anything out of range is treated as absent, never clamped.
pub fn coerce_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                let f = n.as_f64()?;
                if !f.is_finite() || f.abs() > i64::MAX as f64 {
                    return None;
                }
                f.trunc() as i64
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    if (0..=100).contains(&number) {
        Some(number as u8)
    } else {
        None
    }
}

/// Compile a case-insensitive prose pattern with at least one group.
pub fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, RubricError> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RubricError::InvalidPattern {
            field: field.to_string(),
            source,
        })?;

    if regex.captures_len() < 2 {
        return Err(RubricError::MissingCapture {
            field: field.to_string(),
            pattern: pattern.to_string(),
        });
    }

    Ok(regex)
}

/// Score read from the embedded JSON object.
pub struct JsonScore {
    key: String,
}

impl JsonScore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Extractor<u8> for JsonScore {
    fn name(&self) -> &'static str {
        "json-score"
    }

    fn extract(&self, source: &Source<'_>) -> Option<u8> {
        source.json?.get(&self.key).and_then(coerce_score)
    }
}

/// Score read from labelled prose such as "Clinical Tone Score: 65".
pub struct LabeledScore {
    patterns: Vec<Regex>,
}

impl LabeledScore {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }
}

impl Extractor<u8> for LabeledScore {
    fn name(&self) -> &'static str {
        "labeled-score"
    }

    fn extract(&self, source: &Source<'_>) -> Option<u8> {
        if source.is_structured() {
            return None;
        }
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(source.text)?;
            let score = captures.get(1)?.as_str().parse::<u64>().ok()?;
            (score <= 100).then_some(score as u8)
        })
    }
}

/// Verdict read from the embedded JSON object.
///
/// The first configured key that is present decides; an unrecognised
/// label there means "no opinion".
pub struct JsonVerdict {
    keys: Vec<String>,
    labels: VerdictLabels,
}

impl JsonVerdict {
    pub fn new(keys: Vec<String>, labels: VerdictLabels) -> Self {
        Self { keys, labels }
    }
}

impl Extractor<Severity> for JsonVerdict {
    fn name(&self) -> &'static str {
        "json-verdict"
    }

    fn extract(&self, source: &Source<'_>) -> Option<Severity> {
        let json = source.json?;
        let value = self
            .keys
            .iter()
            .filter_map(|key| json.get(key))
            .find(|v| !v.is_null())?;
        value.as_str().and_then(|s| self.labels.severity_of(s))
    }
}

/// Verdict named in prose that carries an explicit "VERDICT:" marker.
///
/// The marker only gates the step: once any marker appears, the whole
/// text is searched for labels by substring, best severity first, then
/// worst, then middle.
pub struct LabeledVerdict {
    markers: Vec<String>,
    labels: VerdictLabels,
}

impl LabeledVerdict {
    pub fn new(markers: Vec<String>, labels: VerdictLabels) -> Self {
        Self { markers, labels }
    }
}

impl Extractor<Severity> for LabeledVerdict {
    fn name(&self) -> &'static str {
        "labeled-verdict"
    }

    fn extract(&self, source: &Source<'_>) -> Option<Severity> {
        if source.is_structured() {
            return None;
        }
        let upper = source.text.to_uppercase();
        let marked = self
            .markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| upper.contains(&m.to_uppercase()));
        if !marked {
            return None;
        }

        [Severity::Clear, Severity::Reject, Severity::Revise]
            .into_iter()
            .find(|&severity| {
                let label = self.labels.label(severity).to_uppercase();
                !label.is_empty() && upper.contains(&label)
            })
    }
}

/// Verdict guessed from positive and negative indicator words.
pub struct IndicatorVerdict {
    clear_words: Vec<String>,
    reject_words: Vec<String>,
    threshold: usize,
}

impl IndicatorVerdict {
    pub fn new(clear_words: &[String], reject_words: &[String], threshold: usize) -> Self {
        Self {
            clear_words: clear_words.iter().map(|w| w.to_lowercase()).collect(),
            reject_words: reject_words.iter().map(|w| w.to_lowercase()).collect(),
            threshold,
        }
    }

    fn count(words: &[String], haystack: &str) -> usize {
        words
            .iter()
            .filter(|w| !w.is_empty() && haystack.contains(w.as_str()))
            .count()
    }
}

impl Extractor<Severity> for IndicatorVerdict {
    fn name(&self) -> &'static str {
        "indicator-verdict"
    }

    fn extract(&self, source: &Source<'_>) -> Option<Severity> {
        if source.is_structured() {
            return None;
        }
        let lower = source.text.to_lowercase();
        let clear = Self::count(&self.clear_words, &lower);
        let reject = Self::count(&self.reject_words, &lower);

        if reject > clear && reject > self.threshold {
            Some(Severity::Reject)
        } else if clear > reject && clear > self.threshold {
            Some(Severity::Clear)
        } else {
            None
        }
    }
}

/// Fixed verdict for prose responses nothing else could read.
pub struct DefaultVerdict(pub Severity);

impl Extractor<Severity> for DefaultVerdict {
    fn name(&self) -> &'static str {
        "default-verdict"
    }

    fn extract(&self, source: &Source<'_>) -> Option<Severity> {
        (!source.is_structured()).then_some(self.0)
    }
}
