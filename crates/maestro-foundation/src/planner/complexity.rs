//! Task Complexity Classification
//!
//! A pure function of the query string. The simple rules are checked first,
//! then the complex rules; everything else is moderate. Thresholds come from
//! [`ComplexityThresholds`] and are config-adjustable.

use maestro_kernel::config::ComplexityThresholds;

/// Classification outcome driving tier selection in the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    /// One obvious agent; keyword routing applies.
    Simple,
    /// A known shape; template selection applies.
    Moderate,
    /// Needs memory adaptation or LLM decomposition.
    Complex,
}

/// Imperative verbs that mark a query simple when they lead it.
const IMPERATIVE_VERBS: &[&str] = &[
    "fix", "review", "explain", "show", "list",
    // German equivalents
    "behebe", "prüfe", "erkläre", "zeige", "liste",
];

/// Cues that mark a query as multi-objective regardless of length.
const MULTI_OBJECTIVE_CUES: &[&str] = &[
    "integrate",
    "integriere",
    "with tests and documentation",
    "mit tests und dokumentation",
];

/// Classify `query` into simple, moderate, or complex.
pub fn classify(query: &str, thresholds: &ComplexityThresholds) -> Complexity {
    let trimmed = query.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let token_count = tokens.len();
    let lower = trimmed.to_lowercase();

    // Simple rules.
    if token_count <= thresholds.simple_max_tokens {
        return Complexity::Simple;
    }
    if let Some(first) = tokens.first() {
        let verb: String = first
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if IMPERATIVE_VERBS.contains(&verb.as_str()) {
            return Complexity::Simple;
        }
    }
    if trimmed.ends_with('?') && token_count <= thresholds.simple_question_max_tokens {
        return Complexity::Simple;
    }

    // Complex rules.
    if token_count >= thresholds.complex_min_tokens {
        return Complexity::Complex;
    }
    if trimmed.matches(',').count() >= thresholds.complex_min_commas {
        return Complexity::Complex;
    }
    if lower.matches(" and ").count() >= 2 || lower.matches(" und ").count() >= 2 {
        return Complexity::Complex;
    }
    if MULTI_OBJECTIVE_CUES.iter().any(|cue| lower.contains(cue)) {
        return Complexity::Complex;
    }

    Complexity::Moderate
}
