//! Draft sentence splitting.
//!
//! Critics refer to sentences by zero-based index, counting the way
//! [`split_sentences`] does.

use crate::models::{ConsensusResult, FlaggedSentence, MergedFinding};
use std::collections::BTreeSet;

/// Split text after `.`, `!` or `?` followed by whitespace.
///
/// The whitespace run between sentences is dropped; nothing else is
/// trimmed or rewritten.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let Some(&(_, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        sentences.push(&text[start..end]);
        let mut resume = text.len();
        while let Some(&(j, w)) = chars.peek() {
            if w.is_whitespace() {
                chars.next();
            } else {
                resume = j;
                break;
            }
        }
        start = resume;
    }

    if start < text.len() || sentences.is_empty() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Sentence indices flagged by any index-valued finding.
pub fn flagged_indices(result: &ConsensusResult) -> BTreeSet<i64> {
    result
        .findings
        .values()
        .filter_map(|finding| match finding {
            MergedFinding::Indices(indices) => Some(indices.iter().copied()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Quote the flagged sentences of a draft. Indices past the end are skipped.
pub fn flagged_sentences(draft: &str, result: &ConsensusResult) -> Vec<FlaggedSentence> {
    let sentences = split_sentences(draft);
    flagged_indices(result)
        .into_iter()
        .filter_map(|index| {
            let index = usize::try_from(index).ok()?;
            sentences.get(index).map(|text| FlaggedSentence {
                index,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Rejoin the draft with flagged sentences wrapped in `<mark>` tags.
pub fn highlight_sentences(draft: &str, indices: &BTreeSet<i64>) -> String {
    if indices.is_empty() {
        return draft.to_string();
    }
    split_sentences(draft)
        .into_iter()
        .enumerate()
        .map(|(i, sentence)| {
            if indices.contains(&(i as i64)) {
                format!("<mark>{}</mark>", sentence)
            } else {
                sentence.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The highlighted draft, or `None` when no flagged index lands on a
/// sentence of this draft.
pub fn highlighted_draft(draft: &str, result: &ConsensusResult) -> Option<String> {
    let indices = flagged_indices(result);
    let count = split_sentences(draft).len() as i64;
    if !indices.iter().any(|i| (0..count).contains(i)) {
        return None;
    }
    Some(highlight_sentences(draft, &indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, VerdictRule};
    use std::collections::BTreeMap;

    fn result_with(findings: Vec<(&str, MergedFinding)>) -> ConsensusResult {
        ConsensusResult {
            rubric: "test".to_string(),
            scores: vec![],
            overall_score: None,
            verdict: "REVISE".to_string(),
            severity: Severity::Revise,
            verdict_rule: VerdictRule::NoVotes,
            red_flags: 0,
            findings: findings
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
            critics: vec![],
            historical_average: None,
        }
    }

    #[test]
    fn test_split_sentences() {
        let text = "The report was written. Mistakes were made!  Why?\nBecause.";
        assert_eq!(
            split_sentences(text),
            vec!["The report was written.", "Mistakes were made!", "Why?", "Because."]
        );
    }

    #[test]
    fn test_split_keeps_inner_punctuation() {
        assert_eq!(split_sentences("Version 2.5 shipped."), vec!["Version 2.5 shipped."]);
        assert_eq!(split_sentences("No terminator"), vec!["No terminator"]);
        assert_eq!(split_sentences(""), vec![""]);
    }

    #[test]
    fn test_flagged_sentences() {
        let result = result_with(vec![
            ("passive_voice_sentences", MergedFinding::Indices(vec![1, 7])),
            ("sentence_triggers", MergedFinding::Indices(vec![-1, 0])),
            ("artifact", MergedFinding::Text("x".to_string())),
        ]);
        let draft = "We shipped it. It was decided. Done.";
        let flagged = flagged_sentences(draft, &result);
        assert_eq!(
            flagged,
            vec![
                FlaggedSentence { index: 0, text: "We shipped it.".to_string() },
                FlaggedSentence { index: 1, text: "It was decided.".to_string() },
            ]
        );
    }

    #[test]
    fn test_highlight_sentences() {
        let indices: BTreeSet<i64> = [1].into_iter().collect();
        assert_eq!(
            highlight_sentences("One. Two. Three.", &indices),
            "One. <mark>Two.</mark> Three."
        );
        assert_eq!(highlight_sentences("One.  Two.", &BTreeSet::new()), "One.  Two.");
    }

    #[test]
    fn test_highlighted_draft() {
        let draft = "We shipped it. It was decided. Done.";
        let result = result_with(vec![(
            "passive_voice_sentences",
            MergedFinding::Indices(vec![1, 9]),
        )]);
        assert_eq!(
            highlighted_draft(draft, &result),
            Some("We shipped it. <mark>It was decided.</mark> Done.".to_string())
        );

        // Nothing in range, nothing to highlight.
        let result = result_with(vec![("sentence_triggers", MergedFinding::Indices(vec![9]))]);
        assert_eq!(highlighted_draft(draft, &result), None);
        assert_eq!(highlighted_draft(draft, &result_with(vec![])), None);
    }
}
