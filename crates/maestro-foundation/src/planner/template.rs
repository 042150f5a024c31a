//! Plan Templates
//!
//! Intent cues map a moderate query to a fixed ordered agent sequence.
//! Conditional steps (the fixer after a review) are realized with a dispatch
//! guard and a dependency on the previous step, never by removal.

use maestro_kernel::plan::{ExecutionPlan, Step, StepGuard};

/// Context key the reviewer sets when it found issues; the template fixer
/// step is guarded on it.
pub const REVIEW_ISSUES_KEY: &str = "review_issues";

/// One step of a template: agent, task prefix, and wiring.
pub struct TemplateStep {
    pub agent: &'static str,
    pub role: &'static str,
    /// Depend on the immediately preceding template step.
    pub depends_on_prev: bool,
    /// Skip unless this context key is truthy at dispatch time.
    pub guard_key: Option<&'static str>,
}

const fn step(agent: &'static str, role: &'static str, depends_on_prev: bool) -> TemplateStep {
    TemplateStep {
        agent,
        role,
        depends_on_prev,
        guard_key: None,
    }
}

/// Full development cycle for "build an app" style requests.
const BUILD_APP: &[TemplateStep] = &[
    step("architect", "Design the architecture", false),
    step("codesmith", "Implement", true),
    step("reviewer", "Review the implementation", true),
    TemplateStep {
        agent: "fixer",
        role: "Fix the issues found",
        depends_on_prev: true,
        guard_key: Some(REVIEW_ISSUES_KEY),
    },
];

const BUG_FIX: &[TemplateStep] = &[
    step("fixer", "Fix", false),
    step("reviewer", "Review the fix", true),
];

const RESEARCH: &[TemplateStep] = &[
    step("research", "Research", false),
    step("docbot", "Document the findings", true),
];

const DOCUMENTATION: &[TemplateStep] = &[step("docbot", "Document", false)];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Select a template by intent cues. `BUILD_APP` is the default shape for
/// development requests without a more specific cue.
pub fn select(query: &str) -> &'static [TemplateStep] {
    let lower = query.to_lowercase();

    let build_verbs = [
        "build", "create", "develop", "make", "entwickle", "erstelle", "baue",
    ];
    let build_nouns = [
        "app",
        "application",
        "webapp",
        "website",
        "service",
        "api",
        "tool",
        "applikation",
        "anwendung",
        "seite",
    ];
    if contains_any(&lower, &build_verbs) && contains_any(&lower, &build_nouns) {
        return BUILD_APP;
    }

    if contains_any(&lower, &["fix", "bug", "behebe", "fehler", "broken"]) {
        return BUG_FIX;
    }

    if contains_any(&lower, &["research", "investigate", "compare", "recherchiere"]) {
        return RESEARCH;
    }

    if contains_any(&lower, &["document", "docs", "readme", "dokumentiere"]) {
        return DOCUMENTATION;
    }

    BUILD_APP
}

/// Instantiate a template against the user query.
pub fn instantiate(template: &[TemplateStep], query: &str) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();

    for entry in template {
        let mut step = Step::new(entry.agent, format!("{}: {}", entry.role, query));
        if entry.depends_on_prev && !plan.is_empty() {
            step = step.with_dependencies(vec![plan.len() as u32]);
        }
        if let Some(key) = entry.guard_key {
            step = step.with_guard(StepGuard::SkipUnlessContext {
                key: key.to_string(),
            });
        }
        plan = plan.append(step);
    }

    plan
}

/// Convenience: select and instantiate in one call.
pub fn plan_for(query: &str) -> ExecutionPlan {
    instantiate(select(query), query)
}
