//! Consensus verdict policy.
//!
//! Rules are evaluated top-down and the first one that applies decides:
//! veto, red-flag escalation, best-severity majority, then the middle
//! severity whether or not anyone voted.

use crate::models::{ParsedCritique, Severity, VerdictRule};
use crate::rubric::{RedFlagConfig, Rubric};

/// Outcome of the verdict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub severity: Severity,
    pub rule: VerdictRule,
    /// Critics that tripped a red flag.
    pub red_flags: usize,
}

/// Whether one critic's auxiliary scores form a red-flag combination.
///
/// Absent scores never trip a flag.
pub fn trips_red_flag(record: &ParsedCritique, flags: &RedFlagConfig) -> bool {
    let intensity = record.score(&flags.intensity_field);
    let density = record.score(&flags.density_field);
    let soundness = record.score(&flags.soundness_field);

    let Some(density) = density else {
        return false;
    };
    if density >= flags.low_density {
        return false;
    }

    let all_force_no_substance = intensity.is_some_and(|i| i >= flags.high_intensity);
    let hollow_and_unsound = soundness.is_some_and(|s| s < flags.low_soundness);

    all_force_no_substance || hollow_and_unsound
}

/// Apply the decision policy to the per-critic records.
///
/// Independent of record order.
pub fn resolve_verdict(records: &[ParsedCritique], rubric: &Rubric) -> Resolution {
    let votes: Vec<Severity> = records.iter().filter_map(|r| r.verdict).collect();
    let red_flags = rubric
        .red_flags
        .as_ref()
        .map(|flags| records.iter().filter(|r| trips_red_flag(r, flags)).count())
        .unwrap_or(0);

    let decide = |severity, rule| Resolution {
        severity,
        rule,
        red_flags,
    };

    if votes.contains(&Severity::Reject) {
        return decide(Severity::Reject, VerdictRule::Veto);
    }

    if let Some(ref flags) = rubric.red_flags {
        if red_flags >= flags.min_critics {
            return decide(Severity::Reject, VerdictRule::RedFlag);
        }
    }

    let clear_votes = votes.iter().filter(|&&v| v == Severity::Clear).count();
    if clear_votes >= rubric.verdict.clear_quorum {
        return decide(Severity::Clear, VerdictRule::Majority);
    }

    if !votes.is_empty() {
        return decide(Severity::Revise, VerdictRule::Fallback);
    }

    decide(Severity::Revise, VerdictRule::NoVotes)
}
