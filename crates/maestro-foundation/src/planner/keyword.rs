//! Keyword Routing
//!
//! A static keyword-to-agent table with confidences in [0, 5]. Matched
//! confidences are summed per agent and clamped to 5.0; the highest-scoring
//! agent wins. A best score at or below [`MIN_CONFIDENCE`] means the query
//! falls through to the template path.

use std::collections::HashMap;

/// Minimum winning score for keyword routing to apply.
pub const MIN_CONFIDENCE: f32 = 1.0;

/// One table row: keyword, target agent, confidence contribution.
struct KeywordRule {
    keyword: &'static str,
    agent: &'static str,
    confidence: f32,
}

const KEYWORD_TABLE: &[KeywordRule] = &[
    // fixer
    KeywordRule { keyword: "fix", agent: "fixer", confidence: 4.0 },
    KeywordRule { keyword: "bug", agent: "fixer", confidence: 3.0 },
    KeywordRule { keyword: "error", agent: "fixer", confidence: 2.5 },
    KeywordRule { keyword: "crash", agent: "fixer", confidence: 2.5 },
    KeywordRule { keyword: "behebe", agent: "fixer", confidence: 4.0 },
    KeywordRule { keyword: "fehler", agent: "fixer", confidence: 3.0 },
    // reviewer
    KeywordRule { keyword: "review", agent: "reviewer", confidence: 4.0 },
    KeywordRule { keyword: "audit", agent: "reviewer", confidence: 3.0 },
    KeywordRule { keyword: "prüfe", agent: "reviewer", confidence: 4.0 },
    // docbot
    KeywordRule { keyword: "explain", agent: "docbot", confidence: 3.0 },
    KeywordRule { keyword: "document", agent: "docbot", confidence: 4.0 },
    KeywordRule { keyword: "docs", agent: "docbot", confidence: 3.5 },
    KeywordRule { keyword: "readme", agent: "docbot", confidence: 3.5 },
    KeywordRule { keyword: "erkläre", agent: "docbot", confidence: 3.0 },
    KeywordRule { keyword: "dokumentiere", agent: "docbot", confidence: 4.0 },
    // research
    KeywordRule { keyword: "research", agent: "research", confidence: 4.0 },
    KeywordRule { keyword: "investigate", agent: "research", confidence: 3.5 },
    KeywordRule { keyword: "compare", agent: "research", confidence: 2.5 },
    KeywordRule { keyword: "search", agent: "research", confidence: 2.0 },
    KeywordRule { keyword: "recherchiere", agent: "research", confidence: 4.0 },
    // codesmith
    KeywordRule { keyword: "implement", agent: "codesmith", confidence: 3.5 },
    KeywordRule { keyword: "refactor", agent: "codesmith", confidence: 3.0 },
    KeywordRule { keyword: "optimize", agent: "codesmith", confidence: 2.5 },
    KeywordRule { keyword: "implementiere", agent: "codesmith", confidence: 3.5 },
    // architect
    KeywordRule { keyword: "design", agent: "architect", confidence: 3.5 },
    KeywordRule { keyword: "architecture", agent: "architect", confidence: 4.0 },
    KeywordRule { keyword: "architektur", agent: "architect", confidence: 4.0 },
];

fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Score every agent against `query`. Scores are clamped to 5.0.
pub fn score(query: &str) -> HashMap<&'static str, f32> {
    let tokens = tokenize(query);
    let mut scores: HashMap<&'static str, f32> = HashMap::new();

    for rule in KEYWORD_TABLE {
        if tokens.iter().any(|t| t == rule.keyword) {
            let entry = scores.entry(rule.agent).or_insert(0.0);
            *entry = (*entry + rule.confidence).min(5.0);
        }
    }

    scores
}

/// Pick the best agent for `query`, or `None` when no score clears
/// [`MIN_CONFIDENCE`]. Ties are broken alphabetically for determinism.
pub fn route(query: &str) -> Option<(String, f32)> {
    let scores = score(query);
    let mut ranked: Vec<(&str, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    match ranked.first() {
        Some((agent, confidence)) if *confidence > MIN_CONFIDENCE => {
            Some((agent.to_string(), *confidence))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_routes_to_fixer() {
        let (agent, confidence) = route("Fix bug in auth").unwrap();
        assert_eq!(agent, "fixer");
        // "fix" (4.0) + "bug" (3.0), clamped to the confidence ceiling.
        assert!((confidence - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn german_keywords_route() {
        let (agent, _) = route("Behebe den Fehler im Login").unwrap();
        assert_eq!(agent, "fixer");
    }

    #[test]
    fn review_routes_to_reviewer() {
        let (agent, _) = route("Review the payment module").unwrap();
        assert_eq!(agent, "reviewer");
    }

    #[test]
    fn keywords_match_whole_tokens_only() {
        // "prefix" must not trigger the "fix" rule.
        assert!(score("prefix the names").is_empty());
    }

    #[test]
    fn low_confidence_falls_through() {
        assert!(route("deploy it now").is_none());
        assert!(route("").is_none());
    }

    #[test]
    fn routing_is_deterministic() {
        let a = route("fix the review process");
        let b = route("fix the review process");
        assert_eq!(a, b);
    }
}
