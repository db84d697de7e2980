//! Markdown report generation.
//!
//! This module renders a consensus [`Report`] as Markdown or JSON.

use crate::analysis::weakest_field;
use crate::models::{
    ConsensusResult, CriticOutcome, FieldAverage, FlaggedSentence, MergedFinding, Report,
    ReportMetadata, Severity,
};
use anyhow::Result;
use serde_json::Value;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Critic Consensus Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, &report.consensus));
    output.push_str(&generate_verdict_section(&report.consensus));
    output.push_str(&generate_scores_section(&report.consensus.scores));
    output.push_str(&generate_critics_section(&report.consensus.critics));
    output.push_str(&generate_findings_section(&report.consensus));
    output.push_str(&generate_flagged_section(&report.flagged_sentences));
    if let Some(ref draft) = report.highlighted_draft {
        output.push_str(&format!("## Highlighted Draft\n\n{}\n\n", draft));
    }
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, consensus: &ConsensusResult) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rubric:** `{}`\n", consensus.rubric));
    section.push_str(&format!(
        "- **Critics Supplied:** {}\n",
        metadata.critics_supplied
    ));
    if metadata.critics_failed > 0 {
        section.push_str(&format!(
            "- **Critics Excluded:** {}\n",
            metadata.critics_failed
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the verdict section.
fn generate_verdict_section(consensus: &ConsensusResult) -> String {
    let mut section = String::new();

    section.push_str("## Verdict\n\n");
    section.push_str(&format!(
        "{} **{}** (decided by {})\n\n",
        consensus.severity.emoji(),
        consensus.verdict,
        consensus.verdict_rule
    ));

    match consensus.overall_score {
        Some(score) => section.push_str(&format!("- **Overall Score:** {}\n", score)),
        None => section.push_str("- **Overall Score:** n/a (a weighted dimension went unscored)\n"),
    }
    if let Some(history) = consensus.historical_average {
        section.push_str(&format!("- **Historical Average:** {}\n", history));
    }
    if consensus.red_flags > 0 {
        section.push_str(&format!(
            "- **Red Flags:** {} critic(s)\n",
            consensus.red_flags
        ));
    }
    if let Some(weakest) = weakest_field(&consensus.scores) {
        if let Some(average) = weakest.average {
            section.push_str(&format!(
                "- **Weakest Dimension:** {} ({})\n",
                humanize(&weakest.field),
                average
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the per-field score table.
fn generate_scores_section(scores: &[FieldAverage]) -> String {
    if scores.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Scores\n\n");
    section.push_str("| Dimension | Average | Critics | Weight |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for score in scores {
        let average = score
            .average
            .map_or_else(|| "n/a".to_string(), |a| a.to_string());
        let weight = score
            .weight
            .map_or_else(|| "-".to_string(), |w| format!("{:.0}%", w * 100.0));
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            humanize(&score.field),
            average,
            score.contributors,
            weight
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-critic table.
fn generate_critics_section(critics: &[CriticOutcome]) -> String {
    if critics.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Critics\n\n");
    section.push_str("| Critic | Status | Input | Verdict | Red Flag |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    for critic in critics {
        let status = if critic.included { "included" } else { "excluded" };
        let input = match (critic.included, critic.structured) {
            (false, _) => "-",
            (true, true) => "json",
            (true, false) => "prose",
        };
        let red_flag = if critic.red_flag {
            Severity::Reject.emoji()
        } else {
            ""
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            critic.critic,
            status,
            input,
            critic.verdict.as_deref().unwrap_or("-"),
            red_flag
        ));
    }
    section.push('\n');

    section
}

/// Generate the merged findings section. Empty findings are left out.
fn generate_findings_section(consensus: &ConsensusResult) -> String {
    let non_empty: Vec<_> = consensus
        .findings
        .iter()
        .filter(|(_, finding)| !is_empty(finding))
        .collect();

    if non_empty.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Findings\n\n");

    for (field, finding) in non_empty {
        section.push_str(&format!("### {}\n\n", humanize(field)));
        match finding {
            MergedFinding::Text(text) => {
                section.push_str(&format!("> {}\n", text));
            }
            MergedFinding::Indices(indices) => {
                let rendered: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                section.push_str(&format!("Sentences: {}\n", rendered.join(", ")));
            }
            MergedFinding::Alternatives(map) => {
                for (term, alternatives) in map {
                    if alternatives.is_empty() {
                        section.push_str(&format!("- `{}`\n", term));
                    } else {
                        section.push_str(&format!(
                            "- `{}` -> {}\n",
                            term,
                            alternatives.join(", ")
                        ));
                    }
                }
            }
            MergedFinding::List(items) => {
                for item in items {
                    section.push_str(&format!("- {}\n", render_value(item)));
                }
            }
        }
        section.push('\n');
    }

    section
}

/// Generate the flagged sentence section.
fn generate_flagged_section(flagged: &[FlaggedSentence]) -> String {
    if flagged.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Flagged Sentences\n\n");
    for sentence in flagged {
        section.push_str(&format!("{}. {}\n", sentence.index, sentence.text));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by critic-consensus v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn is_empty(finding: &MergedFinding) -> bool {
    match finding {
        MergedFinding::Indices(v) => v.is_empty(),
        MergedFinding::Alternatives(m) => m.is_empty(),
        MergedFinding::Text(t) => t.trim().is_empty(),
        MergedFinding::List(v) => v.is_empty(),
    }
}

/// Strings verbatim, objects as `key: value` pairs, anything else as JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("**{}:** {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// `orwellian_clarity_score` -> `Orwellian Clarity Score`.
fn humanize(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Tenths, VerdictRule};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            source: "critiques/".to_string(),
            generated_at: Utc::now(),
            critics_supplied: 3,
            critics_failed: 1,
            duration_seconds: 0.2,
        };

        let mut findings = BTreeMap::new();
        findings.insert(
            "abstract_nouns".to_string(),
            MergedFinding::List(vec![json!("factor"), json!("situation")]),
        );
        findings.insert(
            "jargon_violations".to_string(),
            MergedFinding::Alternatives(
                [("leverage".to_string(), vec!["use".to_string()])]
                    .into_iter()
                    .collect(),
            ),
        );
        findings.insert(
            "one_sentence_verdict".to_string(),
            MergedFinding::Text("Sound argument, buried in fog.".to_string()),
        );
        findings.insert("weak_verbs".to_string(), MergedFinding::List(vec![]));

        let consensus = ConsensusResult {
            rubric: "orwell-hitchens".to_string(),
            scores: vec![
                FieldAverage {
                    field: "orwellian_clarity_score".to_string(),
                    average: Some(Tenths::from_tenths(700)),
                    contributors: 2,
                    weight: Some(0.4),
                },
                FieldAverage {
                    field: "hitchensian_fire_score".to_string(),
                    average: None,
                    contributors: 0,
                    weight: Some(0.3),
                },
            ],
            overall_score: None,
            verdict: "REVISE".to_string(),
            severity: Severity::Revise,
            verdict_rule: VerdictRule::Fallback,
            red_flags: 0,
            findings,
            critics: vec![
                CriticOutcome {
                    critic: "claude".to_string(),
                    included: true,
                    structured: true,
                    verdict: Some("REVISE".to_string()),
                    red_flag: false,
                },
                CriticOutcome {
                    critic: "gemini".to_string(),
                    included: false,
                    structured: false,
                    verdict: None,
                    red_flag: false,
                },
            ],
            historical_average: Some(Tenths::from_tenths(655)),
        };

        Report {
            metadata,
            consensus,
            flagged_sentences: vec![FlaggedSentence {
                index: 2,
                text: "Mistakes were made.".to_string(),
            }],
            highlighted_draft: Some(
                "Rail is late. Costs rose. <mark>Mistakes were made.</mark>".to_string(),
            ),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Critic Consensus Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("🟡 **REVISE** (decided by fallback)"));
        assert!(markdown.contains("| Orwellian Clarity Score | 70.0 | 2 | 40% |"));
        assert!(markdown.contains("| Hitchensian Fire Score | n/a | 0 | 30% |"));
        assert!(markdown.contains("| gemini | excluded | - | - |  |"));
        assert!(markdown.contains("- `leverage` -> use"));
        assert!(markdown.contains("> Sound argument, buried in fog."));
        assert!(markdown.contains("2. Mistakes were made."));
        assert!(markdown.contains(
            "## Highlighted Draft\n\nRail is late. Costs rose. <mark>Mistakes were made.</mark>"
        ));
        assert!(markdown.contains("**Historical Average:** 65.5"));
        // Empty findings are left out.
        assert!(!markdown.contains("### Weak Verbs"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata, &report.consensus);

        assert!(section.contains("critiques/"));
        assert!(section.contains("`orwell-hitchens`"));
        assert!(section.contains("Critics Excluded:** 1"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("plain")), "plain");
        assert_eq!(
            render_value(&json!({"before": "It was decided", "after": "We decided"})),
            "**after:** We decided; **before:** It was decided"
        );
        assert_eq!(render_value(&json!(3)), "3");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("orwellian_clarity_score"), "Orwellian Clarity Score");
        assert_eq!(humanize("artifact"), "Artifact");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"consensus\""));
        assert!(json.contains("\"verdict_rule\": \"fallback\""));
        assert!(json.contains("\"historical_average\": 65.5"));
    }
}
