//! Score aggregation and statistics.
//!
//! This module averages numeric rubric fields across critics and combines
//! the averages into the weighted overall score.

use crate::models::{FieldAverage, ParsedCritique, Tenths};
use crate::rubric::Rubric;

/// Average every rubric numeric field over the critics that reported it.
///
/// A field nobody reported gets `average: None`, never zero.
pub fn average_scores(records: &[ParsedCritique], rubric: &Rubric) -> Vec<FieldAverage> {
    rubric
        .scores
        .iter()
        .map(|field| {
            let values: Vec<i64> = records
                .iter()
                .filter_map(|r| r.score(&field.name))
                .map(i64::from)
                .collect();

            FieldAverage {
                field: field.name.clone(),
                average: Tenths::from_mean(values.iter().sum(), values.len()),
                contributors: values.len(),
                weight: field.weight,
            }
        })
        .collect()
}

/// Weighted overall score.
///
/// Only computed when every weighted field has an average; one missing
/// constituent blocks it entirely. Rubrics without weights have none.
pub fn weighted_overall(averages: &[FieldAverage]) -> Option<Tenths> {
    let mut weighted = averages.iter().filter(|a| a.weight.is_some()).peekable();
    weighted.peek()?;

    let mut total = 0.0;
    for average in weighted {
        let value = average.average?;
        total += value.as_f64() * average.weight.unwrap_or(0.0);
    }

    Tenths::from_f64(total)
}

/// Mean of past overall scores, e.g. from a writer's published pieces.
pub fn historical_average(scores: &[Tenths]) -> Option<Tenths> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(Tenths::tenths).sum();
    Some(Tenths::from_tenths(round_div(sum, scores.len() as i64)))
}

/// Integer division rounding half away from zero.
fn round_div(numerator: i64, denominator: i64) -> i64 {
    let doubled = numerator * 2;
    if doubled >= 0 {
        (doubled + denominator) / (denominator * 2)
    } else {
        (doubled - denominator) / (denominator * 2)
    }
}

/// Field with the lowest average, for report highlights.
pub fn weakest_field(averages: &[FieldAverage]) -> Option<&FieldAverage> {
    averages
        .iter()
        .filter(|a| a.weight.is_some() && a.average.is_some())
        .min_by_key(|a| a.average)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critique(scores: &[(&str, u8)]) -> ParsedCritique {
        ParsedCritique {
            critic: "test".to_string(),
            structured: true,
            scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_average_scores() {
        let rubric = Rubric::orwell_hitchens();
        let records = vec![
            critique(&[("orwellian_clarity_score", 70)]),
            critique(&[("orwellian_clarity_score", 72)]),
            critique(&[("orwellian_clarity_score", 68)]),
        ];

        let averages = average_scores(&records, &rubric);

        assert_eq!(averages.len(), 4);
        assert_eq!(averages[0].field, "orwellian_clarity_score");
        assert_eq!(averages[0].average, Some(Tenths::from_tenths(700)));
        assert_eq!(averages[0].contributors, 3);
        assert_eq!(averages[0].weight, Some(0.40));
    }

    #[test]
    fn test_average_uses_only_contributors() {
        let rubric = Rubric::orwell_hitchens();
        let records = vec![
            critique(&[("hitchensian_fire_score", 80)]),
            critique(&[]),
            critique(&[("hitchensian_fire_score", 61)]),
        ];

        let averages = average_scores(&records, &rubric);
        let fire = &averages[1];
        assert_eq!(fire.contributors, 2);
        assert_eq!(fire.average, Some(Tenths::from_tenths(705)));
    }

    #[test]
    fn test_missing_field_is_absent_not_zero() {
        let rubric = Rubric::orwell_hitchens();
        let records = vec![critique(&[("orwellian_clarity_score", 0)])];

        let averages = average_scores(&records, &rubric);
        assert_eq!(averages[0].average, Some(Tenths::from_tenths(0)));
        assert_eq!(averages[2].average, None);
        assert_eq!(averages[2].contributors, 0);
        assert_eq!(weighted_overall(&averages), None);
    }

    #[test]
    fn test_weighted_overall() {
        let rubric = Rubric::orwell_hitchens();
        let records = vec![critique(&[
            ("orwellian_clarity_score", 70),
            ("hitchensian_fire_score", 80),
            ("vivid_physicality_score", 60),
            ("technical_execution_score", 90),
        ])];

        let averages = average_scores(&records, &rubric);
        // 28 + 24 + 12 + 9
        assert_eq!(weighted_overall(&averages), Some(Tenths::from_tenths(730)));
    }

    #[test]
    fn test_overall_ignores_unweighted_fields() {
        let rubric = Rubric::clinical_sovereign();
        let records = vec![critique(&[
            ("physics_engine_score", 80),
            ("zero_kelvin_shield_score", 90),
            ("verdict_output_score", 85),
            ("scalpel_edge_score", 70),
            ("kinetic_action_score", 40),
        ])];

        let averages = average_scores(&records, &rubric);
        assert_eq!(averages.iter().find(|a| a.field == "venom_density").unwrap().average, None);
        // 28 + 22.5 + 17 + 10.5 + 2
        assert_eq!(weighted_overall(&averages), Some(Tenths::from_tenths(800)));
    }

    #[test]
    fn test_no_weighted_fields_means_no_overall() {
        let averages = vec![FieldAverage {
            field: "clarity".to_string(),
            average: Some(Tenths::from_whole(50)),
            contributors: 1,
            weight: None,
        }];
        assert_eq!(weighted_overall(&averages), None);
    }

    #[test]
    fn test_historical_average() {
        let scores = [Tenths::from_tenths(716), Tenths::from_tenths(655)];
        // (71.6 + 65.5) / 2 = 68.55 -> 68.6
        assert_eq!(historical_average(&scores), Some(Tenths::from_tenths(686)));
        assert_eq!(historical_average(&[]), None);
    }

    #[test]
    fn test_weakest_field() {
        let rubric = Rubric::orwell_hitchens();
        let records = vec![critique(&[
            ("orwellian_clarity_score", 70),
            ("vivid_physicality_score", 40),
        ])];
        let averages = average_scores(&records, &rubric);
        assert_eq!(
            weakest_field(&averages).map(|a| a.field.as_str()),
            Some("vivid_physicality_score")
        );
    }
}
