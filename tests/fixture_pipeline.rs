//! The CLI pipeline, driven through the library over `fixtures/`.

use critic_consensus::analysis::historical_average;
use critic_consensus::collect::{self, RetryPolicy};
use critic_consensus::models::{MergedFinding, Report, ReportMetadata, VerdictRule};
use critic_consensus::report;
use critic_consensus::scanner::ScanConfig;
use critic_consensus::{ConsensusEngine, Rubric, Tenths};
use std::path::PathBuf;
use std::time::Duration;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        delay: Duration::from_millis(1),
    }
}

#[test]
fn fixture_critiques_reach_a_consensus() {
    let engine = ConsensusEngine::new(Rubric::orwell_hitchens()).unwrap();
    let sources = collect::discover(&fixtures().join("critiques"), &ScanConfig::default()).unwrap();

    let names: Vec<_> = sources.iter().map(|s| s.critic.as_str()).collect();
    assert_eq!(names, vec!["claude", "gpt", "gemini"]);

    let responses = tokio_test::block_on(collect::collect_critiques(&sources, &policy()));
    let result = engine.evaluate(&responses);

    // gemini reported a failure and is left out.
    assert_eq!(result.participants(), 2);
    assert!(result.critics[0].structured);
    assert!(!result.critics[1].structured);

    assert_eq!(result.score("orwellian_clarity_score"), Some(Tenths::from_whole(71)));
    assert_eq!(result.score("hitchensian_fire_score"), Some(Tenths::from_tenths(765)));
    // 28.4 + 22.95 + 13.3 + 8.1 = 72.75
    assert_eq!(result.overall_score, Some(Tenths::from_tenths(728)));
    assert_eq!(result.verdict, "REVISE");
    assert_eq!(result.verdict_rule, VerdictRule::Fallback);
    assert_eq!(
        result.finding("weak_verbs"),
        Some(&MergedFinding::List(vec!["has".into(), "is".into()]))
    );
}

#[test]
fn fixture_history_and_draft_fill_the_report() {
    let engine = ConsensusEngine::new(Rubric::orwell_hitchens()).unwrap();
    let scan_config = ScanConfig::default();

    let sources = collect::discover(&fixtures().join("critiques"), &scan_config).unwrap();
    let responses = tokio_test::block_on(collect::collect_critiques(&sources, &policy()));
    let mut consensus = engine.evaluate(&responses);

    let past = tokio_test::block_on(collect::collect_history(
        &engine,
        &fixtures().join("history"),
        &scan_config,
        &policy(),
    ))
    .unwrap();
    // 63.1 and 78.5
    assert_eq!(past, vec![Tenths::from_tenths(631), Tenths::from_tenths(785)]);
    consensus.historical_average = historical_average(&past);
    assert_eq!(consensus.historical_average, Some(Tenths::from_tenths(708)));

    let draft = std::fs::read_to_string(fixtures().join("draft.txt")).unwrap();
    let flagged = report::flagged_sentences(&draft, &consensus);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].text, "Mistakes were made in the rollout.");

    let full = Report {
        metadata: ReportMetadata {
            source: "fixtures/critiques".to_string(),
            generated_at: chrono::Utc::now(),
            critics_supplied: responses.len(),
            critics_failed: responses.len() - consensus.participants(),
            duration_seconds: 0.0,
        },
        highlighted_draft: report::highlighted_draft(&draft, &consensus),
        consensus,
        flagged_sentences: flagged,
    };

    let markdown = report::generate_markdown_report(&full);
    assert!(markdown.contains("**REVISE**"));
    assert!(markdown.contains("Historical Average:** 70.8"));
    assert!(markdown.contains("1. Mistakes were made in the rollout."));
    assert!(markdown.contains("- `leverage` -> use"));
    assert!(markdown.contains("<mark>Mistakes were made in the rollout.</mark>"));

    let json: serde_json::Value =
        serde_json::from_str(&report::generate_json_report(&full).unwrap()).unwrap();
    assert_eq!(json["consensus"]["overall_score"], 72.8);
    assert_eq!(json["metadata"]["critics_failed"], 1);
}
