//! Per-critic normalization.
//!
//! Turns one raw critic response into a [`ParsedCritique`] where every
//! rubric field has a well-typed value. A malformed field only ever
//! affects itself.

use crate::analysis::extract::{
    compile_pattern, Chain, DefaultVerdict, IndicatorVerdict, JsonScore, JsonVerdict,
    LabeledScore, LabeledVerdict, Source,
};
use crate::analysis::parser::extract_json_object;
use crate::models::{CriticResponse, ParsedCritique, Severity};
use crate::rubric::{FieldShape, Rubric, RubricError};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Normalizer compiled from a rubric.
#[derive(Debug)]
pub struct Normalizer {
    scores: Vec<(String, Chain<u8>)>,
    verdict: Chain<Severity>,
    findings: Vec<(String, FieldShape)>,
}

impl Normalizer {
    /// Compile the extraction chains for a rubric.
    pub fn new(rubric: &Rubric) -> Result<Self, RubricError> {
        let mut scores = Vec::with_capacity(rubric.scores.len());
        for field in &rubric.scores {
            let patterns = field
                .patterns
                .iter()
                .map(|p| compile_pattern(&field.name, p))
                .collect::<Result<Vec<_>, _>>()?;
            let chain = Chain::new()
                .then(JsonScore::new(field.name.clone()))
                .then(LabeledScore::new(patterns));
            scores.push((field.name.clone(), chain));
        }

        let config = &rubric.verdict;
        let verdict = Chain::new()
            .then(JsonVerdict::new(config.keys.clone(), config.labels.clone()))
            .then(LabeledVerdict::new(
                config.markers.clone(),
                config.labels.clone(),
            ))
            .then(IndicatorVerdict::new(
                &config.clear_indicators,
                &config.reject_indicators,
                config.indicator_threshold,
            ))
            .then(DefaultVerdict(Severity::Revise));

        let findings = rubric
            .findings
            .iter()
            .map(|f| (f.name.clone(), f.merge.shape()))
            .collect();

        Ok(Self {
            scores,
            verdict,
            findings,
        })
    }

    /// Normalize one critic response. Never fails.
    pub fn normalize(&self, response: &CriticResponse) -> ParsedCritique {
        let json = extract_json_object(&response.text);
        let source = Source::new(&response.text, json.as_ref());

        let scores: BTreeMap<String, u8> = self
            .scores
            .iter()
            .filter_map(|(name, chain)| chain.run(&source).map(|v| (name.clone(), v)))
            .collect();

        let verdict = self.verdict.run(&source);

        let mut parsed = ParsedCritique {
            critic: response.critic.clone(),
            structured: json.is_some(),
            scores,
            verdict,
            ..Default::default()
        };

        for (name, shape) in &self.findings {
            let raw = json.as_ref().and_then(|m| m.get(name));
            match shape {
                FieldShape::List => {
                    parsed.lists.insert(name.clone(), as_list(raw));
                }
                FieldShape::Mapping => {
                    parsed.mappings.insert(name.clone(), as_mapping(raw));
                }
                FieldShape::Text => {
                    parsed.texts.insert(name.clone(), as_text(raw));
                }
            }
        }

        debug!(
            "Parsed {} critique: structured={}, {} scores, verdict={:?}",
            parsed.critic,
            parsed.structured,
            parsed.scores.len(),
            parsed.verdict
        );

        parsed
    }
}

/// A JSON array, or empty.
fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// A JSON object of term -> alternatives, or empty.
///
/// A scalar alternative is wrapped into a one-element list; entries that
/// are neither strings nor numbers are dropped.
fn as_mapping(value: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(term, alternatives)| (term.clone(), alternatives_of(alternatives)))
        .collect()
}

fn alternatives_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// A text field, or empty.
fn as_text(value: Option<&Value>) -> String {
    value.and_then(scalar_text).unwrap_or_default()
}

/// Render a scalar JSON value as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orwell() -> Normalizer {
        Normalizer::new(&Rubric::orwell_hitchens()).unwrap()
    }

    fn clinical() -> Normalizer {
        Normalizer::new(&Rubric::clinical_sovereign()).unwrap()
    }

    #[test]
    fn test_full_json_critique() {
        let text = json!({
            "orwellian_clarity_score": 70,
            "hitchensian_fire_score": "75",
            "vivid_physicality_score": 65,
            "technical_execution_score": 80,
            "verdict": "revise",
            "abstract_nouns": ["Situation", "factor"],
            "passive_voice_sentences": [2, 5],
            "jargon_violations": {"leverage": ["use"], "synergy": "cooperation"},
            "diagnostic_summary": "Fog over a sound argument."
        })
        .to_string();

        let parsed = orwell().normalize(&CriticResponse::new("claude", text));

        assert!(parsed.structured);
        assert_eq!(parsed.score("orwellian_clarity_score"), Some(70));
        assert_eq!(parsed.score("hitchensian_fire_score"), Some(75));
        assert_eq!(parsed.verdict, Some(Severity::Revise));
        assert_eq!(parsed.list("abstract_nouns").len(), 2);
        assert_eq!(
            parsed.mappings["jargon_violations"]["synergy"],
            vec!["cooperation".to_string()]
        );
        assert_eq!(parsed.text("diagnostic_summary"), "Fog over a sound argument.");
        assert_eq!(parsed.text("one_sentence_verdict"), "");
    }

    #[test]
    fn test_out_of_range_scores_are_absent() {
        let text = r#"{"orwellian_clarity_score": 150, "hitchensian_fire_score": -5, "vivid_physicality_score": 0}"#;
        let parsed = orwell().normalize(&CriticResponse::new("gpt", text));
        assert_eq!(parsed.score("orwellian_clarity_score"), None);
        assert_eq!(parsed.score("hitchensian_fire_score"), None);
        assert_eq!(parsed.score("vivid_physicality_score"), Some(0));
    }

    #[test]
    fn test_malformed_shapes_fall_back_to_defaults() {
        let text = r#"{
            "abstract_nouns": "situation",
            "jargon_violations": ["leverage"],
            "diagnostic_summary": {"nested": true},
            "orwellian_clarity_score": 71
        }"#;
        let parsed = orwell().normalize(&CriticResponse::new("gemini", text));
        assert!(parsed.list("abstract_nouns").is_empty());
        assert!(parsed.mappings["jargon_violations"].is_empty());
        assert_eq!(parsed.text("diagnostic_summary"), "");
        // The bad fields do not take the good one down with them.
        assert_eq!(parsed.score("orwellian_clarity_score"), Some(71));
    }

    #[test]
    fn test_missing_verdict_in_json_is_no_opinion() {
        let parsed = orwell().normalize(&CriticResponse::new(
            "gpt",
            r#"{"orwellian_clarity_score": 70}"#,
        ));
        assert_eq!(parsed.verdict, None);

        let parsed = orwell().normalize(&CriticResponse::new("gpt", r#"{"verdict": "SHIP IT"}"#));
        assert_eq!(parsed.verdict, None);
    }

    #[test]
    fn test_prose_fallback_for_orwell() {
        let text = "Orwellian Clarity: 62/100\nHitchensian Fire: 55/100\n\
                    Vivid Physicality: 48/100\nTechnical Execution: 80/100\n\
                    Verdict: REVISE\n\nWhat's working...";
        let parsed = orwell().normalize(&CriticResponse::new("claude", text));
        assert!(!parsed.structured);
        assert_eq!(parsed.score("orwellian_clarity_score"), Some(62));
        assert_eq!(parsed.score("hitchensian_fire_score"), Some(55));
        assert_eq!(parsed.score("vivid_physicality_score"), Some(48));
        assert_eq!(parsed.score("technical_execution_score"), Some(80));
        assert_eq!(parsed.verdict, Some(Severity::Revise));
        assert!(parsed.list("weak_verbs").is_empty());
    }

    #[test]
    fn test_prose_fallback_for_clinical_score() {
        let parsed = clinical().normalize(&CriticResponse::new(
            "gemini",
            "Overall the tone is detached. Clinical Tone Score: 65\nFINAL VERDICT: CLEAR",
        ));
        assert_eq!(parsed.score("clinical_tone_score"), Some(65));
        assert_eq!(parsed.verdict, Some(Severity::Clear));
    }

    #[test]
    fn test_structured_input_skips_prose_patterns() {
        let text = "Clinical Tone Score: 65\n{\"final_verdict\": \"REVISE\"}";
        let parsed = clinical().normalize(&CriticResponse::new("claude", text));
        assert!(parsed.structured);
        assert_eq!(parsed.score("clinical_tone_score"), None);
        assert_eq!(parsed.verdict, Some(Severity::Revise));
    }

    #[test]
    fn test_arbitrary_prose_never_panics() {
        let n = clinical();
        for text in ["", "{", "}{", "{{{}}}", "score: 99999999999999999999999", "💥 {\"a\": }"] {
            let parsed = n.normalize(&CriticResponse::new("x", text));
            assert!(parsed.scores.values().all(|&s| s <= 100));
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = orwell();
        let response = CriticResponse::new(
            "claude",
            r#"Intro {"orwellian_clarity_score": 66, "weak_verbs": ["is"], "verdict": "PUBLISH"}"#,
        );
        assert_eq!(n.normalize(&response), n.normalize(&response));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let mut rubric = Rubric::orwell_hitchens();
        rubric.scores[0].patterns = vec!["(unclosed".to_string()];
        assert!(matches!(
            Normalizer::new(&rubric),
            Err(RubricError::InvalidPattern { .. })
        ));
    }
}
