//! Answer normalization and fuzzy scoring.
//!
//! Replies arrive as free text with arbitrary casing, punctuation and
//! typos. Both sides of every comparison go through [`normalize`] first;
//! [`score`] then rates the pair 0-100 with an edit-distance ratio that
//! forgives swapped and dropped characters.

use crate::models::ScoreResult;

/// Canonical comparison form: trimmed, lower-cased, every character that
/// is neither alphanumeric nor whitespace dropped, whitespace runs
/// collapsed to single spaces. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if !c.is_alphanumeric() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        // Lowercasing can expand to multiple chars; keep only the ones
        // that survive the alphanumeric filter so a second pass is a
        // no-op.
        for lc in c.to_lowercase() {
            if lc.is_alphanumeric() {
                out.push(lc);
            }
        }
    }

    out
}

/// Similarity between two strings as an integer in [0, 100], computed as
/// a normalized Damerau-Levenshtein ratio over characters:
/// `100 * (1 - distance / max(len(a), len(b)))`. Symmetric, and 100 for
/// equal inputs (including two empty strings).
pub fn score(a: &str, b: &str) -> u32 {
    (strsim::normalized_damerau_levenshtein(a, b) * 100.0).round() as u32
}

/// Score a raw reply against the canonical (already normalized) answer.
/// A score exactly at the threshold counts as correct.
pub fn evaluate(reply: &str, canonical_answer: &str, threshold: u32) -> ScoreResult {
    let score = score(&normalize(reply), canonical_answer);
    ScoreResult {
        score,
        correct: score >= threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_punctuation_and_runs() {
        assert_eq!(normalize("  The   Matrix!! "), "the matrix");
        assert_eq!(normalize("Pulp-Fiction"), "pulpfiction");
        assert_eq!(normalize("2001: A Space Odyssey"), "2001 a space odyssey");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!?"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "  The   Matrix!! ",
            "¿Qué? ÉLAN-vital",
            "İstanbul, not Constantinople",
            "\t\nmixed \u{a0}whitespace\u{2003}everywhere ",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn score_is_symmetric_and_reflexive() {
        let pairs = [("the matrix", "teh matrx"), ("inception", "the matrix"), ("", "abc")];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a));
        }
        assert_eq!(score("the matrix", "the matrix"), 100);
        assert_eq!(score("", ""), 100);
    }

    #[test]
    fn exact_answer_after_normalization_scores_100() {
        let result = evaluate("the matrix", &normalize("The Matrix"), 80);
        assert_eq!(result.score, 100);
        assert!(result.correct);
    }

    #[test]
    fn close_typo_clears_default_threshold() {
        // Transposition plus a dropped letter still counts at 80.
        let result = evaluate("teh matrx", &normalize("The Matrix"), 80);
        assert!(result.score >= 80, "score was {}", result.score);
        assert!(result.correct);
    }

    #[test]
    fn unrelated_answer_fails() {
        let result = evaluate("Inception", &normalize("The Matrix"), 80);
        assert!(result.score < 50, "score was {}", result.score);
        assert!(!result.correct);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let answer = normalize("The Matrix");
        let result = evaluate("teh matrx", &answer, 80);
        // This pair lands exactly on the default threshold.
        assert_eq!(result.score, 80);
        assert!(result.correct);

        let stricter = evaluate("teh matrx", &answer, 81);
        assert!(!stricter.correct);
    }
}
