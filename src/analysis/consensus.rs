//! Consensus engine.
//!
//! Ties the pieces together: excludes failed critics, normalizes the rest
//! and reduces them into one [`ConsensusResult`].

use crate::analysis::aggregator::{average_scores, weighted_overall};
use crate::analysis::merger::merge_findings;
use crate::analysis::normalizer::Normalizer;
use crate::analysis::verdict::{resolve_verdict, trips_red_flag};
use crate::models::{ConsensusResult, CriticOutcome, CriticResponse, ParsedCritique};
use crate::rubric::{Rubric, RubricError};
use tracing::{info, warn};

/// A rubric compiled into a reusable aggregator.
///
/// Holds no per-evaluation state, so one engine can serve any number of
/// evaluations, concurrently if need be.
#[derive(Debug)]
pub struct ConsensusEngine {
    rubric: Rubric,
    normalizer: Normalizer,
}

impl ConsensusEngine {
    /// Validate the rubric and compile its extraction chains.
    pub fn new(rubric: Rubric) -> Result<Self, RubricError> {
        rubric.validate()?;
        let normalizer = Normalizer::new(&rubric)?;
        Ok(Self { rubric, normalizer })
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Normalize a single critic response.
    pub fn parse(&self, response: &CriticResponse) -> ParsedCritique {
        self.normalizer.normalize(response)
    }

    /// Reduce the critics' responses into one consensus record.
    ///
    /// Total: any input, including an empty list, yields a result.
    pub fn evaluate(&self, responses: &[CriticResponse]) -> ConsensusResult {
        let mut outcomes = Vec::with_capacity(responses.len());
        let mut records = Vec::with_capacity(responses.len());

        for response in responses {
            if response.is_failed(&self.rubric.failure_marker) {
                warn!("Excluding critic {}: empty or failed response", response.critic);
                outcomes.push(CriticOutcome {
                    critic: response.critic.clone(),
                    included: false,
                    structured: false,
                    verdict: None,
                    red_flag: false,
                });
                continue;
            }

            let record = self.parse(response);
            let labels = &self.rubric.verdict.labels;
            outcomes.push(CriticOutcome {
                critic: record.critic.clone(),
                included: true,
                structured: record.structured,
                verdict: record.verdict.map(|v| labels.label(v).to_string()),
                red_flag: self
                    .rubric
                    .red_flags
                    .as_ref()
                    .is_some_and(|flags| trips_red_flag(&record, flags)),
            });
            records.push(record);
        }

        let scores = average_scores(&records, &self.rubric);
        let overall_score = weighted_overall(&scores);
        let resolution = resolve_verdict(&records, &self.rubric);
        let findings = merge_findings(&records, &self.rubric);
        let verdict = self
            .rubric
            .verdict
            .labels
            .label(resolution.severity)
            .to_string();

        info!(
            "Consensus over {}/{} critics: {} via {} (overall {})",
            records.len(),
            responses.len(),
            verdict,
            resolution.rule,
            overall_score.map_or_else(|| "n/a".to_string(), |s| s.to_string())
        );

        ConsensusResult {
            rubric: self.rubric.name.clone(),
            scores,
            overall_score,
            verdict,
            severity: resolution.severity,
            verdict_rule: resolution.rule,
            red_flags: resolution.red_flags,
            findings,
            critics: outcomes,
            historical_average: None,
        }
    }
}
