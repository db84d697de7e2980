//! Qualitative finding merge.
//!
//! Each finding field declares how critics' contributions combine: sets
//! are sorted and so independent of critic order; concatenations and
//! first-match fields follow critic order.

use crate::analysis::normalizer::scalar_text;
use crate::models::{MergedFinding, ParsedCritique};
use crate::rubric::{FindingField, MergeKind, Rubric};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Merge every finding field of the rubric.
pub fn merge_findings(records: &[ParsedCritique], rubric: &Rubric) -> BTreeMap<String, MergedFinding> {
    rubric
        .findings
        .iter()
        .map(|field| (field.name.clone(), merge_field(records, field)))
        .collect()
}

/// Merge one finding field across critics.
pub fn merge_field(records: &[ParsedCritique], field: &FindingField) -> MergedFinding {
    let name = field.name.as_str();
    match field.merge {
        MergeKind::Terms => MergedFinding::List(sorted_set(records, name, |s| s.to_lowercase())),
        MergeKind::Set => MergedFinding::List(sorted_set(records, name, |s| s)),
        MergeKind::Indices => MergedFinding::Indices(merge_indices(records, name)),
        MergeKind::Alternatives => MergedFinding::Alternatives(merge_alternatives(records, name)),
        MergeKind::Concat => {
            let mut merged: Vec<Value> = records
                .iter()
                .flat_map(|r| r.list(name).iter().cloned())
                .collect();
            truncate(&mut merged, field.limit);
            MergedFinding::List(merged)
        }
        MergeKind::Distinct => {
            let mut merged: Vec<Value> = Vec::new();
            for item in records.iter().flat_map(|r| r.list(name)) {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            truncate(&mut merged, field.limit);
            MergedFinding::List(merged)
        }
        MergeKind::First => MergedFinding::Text(first_text(records, name)),
    }
}

fn truncate(items: &mut Vec<Value>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}

/// Union of scalar list entries, transformed and sorted.
fn sorted_set(records: &[ParsedCritique], name: &str, key: impl Fn(String) -> String) -> Vec<Value> {
    let set: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.list(name))
        .filter_map(scalar_text)
        .map(key)
        .collect();
    set.into_iter().map(Value::String).collect()
}

/// Union of sentence indices; entries that are not integers are dropped.
fn merge_indices(records: &[ParsedCritique], name: &str) -> Vec<i64> {
    let set: BTreeSet<i64> = records
        .iter()
        .flat_map(|r| r.list(name))
        .filter_map(coerce_index)
        .collect();
    set.into_iter().collect()
}

fn coerce_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            (f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Term -> alternatives, concatenated in critic order, repeats dropped.
fn merge_alternatives(records: &[ParsedCritique], name: &str) -> BTreeMap<String, Vec<String>> {
    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records {
        let Some(mapping) = record.mappings.get(name) else {
            continue;
        };
        for (term, alternatives) in mapping {
            let entry = merged.entry(term.clone()).or_default();
            for alternative in alternatives {
                if !entry.contains(alternative) {
                    entry.push(alternative.clone());
                }
            }
        }
    }
    merged
}

/// First non-empty value in critic order. Whitespace counts as a value.
fn first_text(records: &[ParsedCritique], name: &str) -> String {
    records
        .iter()
        .map(|r| r.text(name))
        .find(|t| !t.is_empty())
        .unwrap_or("")
        .to_string()
}
