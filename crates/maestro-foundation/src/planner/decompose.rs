//! LLM Plan Decomposition
//!
//! For complex tasks with no usable memory, the planner asks the registry's
//! `orchestrator` executor for a strict JSON decomposition. The response is
//! schema-validated here; anything invalid makes the caller fall back to the
//! template path.

use serde::Deserialize;
use std::collections::HashMap;

use maestro_kernel::error::{EngineError, EngineResult};
use maestro_kernel::plan::{ExecutionPlan, Step};
use maestro_kernel::registry::AgentRegistry;

/// Raw JSON shape the orchestrator must return.
#[derive(Debug, Deserialize)]
struct RawDecomposition {
    subtasks: Vec<RawSubtask>,
    #[serde(default)]
    parallelizable: bool,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct RawSubtask {
    id: u32,
    description: String,
    agent: String,
    #[serde(default)]
    dependencies: Vec<u32>,
    #[serde(default)]
    estimated_duration: u64,
}

/// Build the decomposition prompt handed to the orchestrator executor.
pub fn decomposition_prompt(query: &str, agents: &[String]) -> String {
    format!(
        "Decompose the following development task into subtasks.\n\
         Task: {query}\n\
         Available agents: {agents}\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"subtasks\": [{{\"id\": 1, \"description\": \"...\", \"agent\": \"...\", \
         \"dependencies\": [], \"estimated_duration\": 60}}], \
         \"parallelizable\": false, \"reasoning\": \"...\"}}\n\
         Every agent must be one of the available agents and dependencies may \
         only reference earlier subtask ids.",
        query = query,
        agents = agents.join(", "),
    )
}

/// Strip a Markdown code fence and isolate the outermost JSON object.
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s < e => &trimmed[s..=e],
        _ => trimmed,
    }
}

/// Parse and validate an orchestrator response into a plan.
///
/// Validation: at least one subtask, unique strictly-ascending ids,
/// dependencies referencing earlier ids only, and every agent registered.
pub fn parse_and_validate(content: &str, registry: &AgentRegistry) -> EngineResult<ExecutionPlan> {
    let raw: RawDecomposition = serde_json::from_str(extract_json(content))
        .map_err(|e| EngineError::PlannerFailed(format!("decomposition is not valid JSON: {}", e)))?;

    if raw.subtasks.is_empty() {
        return Err(EngineError::PlannerFailed(
            "decomposition contains no subtasks".into(),
        ));
    }

    let mut previous_id = 0u32;
    let mut seen = std::collections::HashSet::new();
    for subtask in &raw.subtasks {
        if subtask.id <= previous_id {
            return Err(EngineError::PlannerFailed(format!(
                "subtask ids must be strictly ascending, got {} after {}",
                subtask.id, previous_id
            )));
        }
        previous_id = subtask.id;

        if subtask.description.trim().is_empty() {
            return Err(EngineError::PlannerFailed(format!(
                "subtask {} has an empty description",
                subtask.id
            )));
        }
        if !registry.contains(&subtask.agent) {
            return Err(EngineError::PlannerFailed(format!(
                "subtask {} names unregistered agent '{}'",
                subtask.id, subtask.agent
            )));
        }
        for dep in &subtask.dependencies {
            if !seen.contains(dep) {
                return Err(EngineError::PlannerFailed(format!(
                    "subtask {} depends on {} which is not an earlier subtask",
                    subtask.id, dep
                )));
            }
        }
        seen.insert(subtask.id);
    }

    // Re-key raw ids onto plan positions so appended ids stay len+1.
    let id_to_position: HashMap<u32, u32> = raw
        .subtasks
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i as u32 + 1))
        .collect();

    let mut plan = ExecutionPlan::new();
    plan.parallel_hint = raw.parallelizable;

    for subtask in &raw.subtasks {
        let dependencies: Vec<u32> = subtask
            .dependencies
            .iter()
            .filter_map(|dep| id_to_position.get(dep).copied())
            .collect();
        plan = plan.append(
            Step::new(subtask.agent.clone(), subtask.description.clone())
                .with_dependencies(dependencies),
        );
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_kernel::agent::{AgentExecutor, AgentOutput, AgentTask};
    use maestro_kernel::error::EngineResult;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullAgent {
        name: &'static str,
    }

    #[async_trait]
    impl AgentExecutor for NullAgent {
        async fn execute(&self, _task: &AgentTask) -> EngineResult<AgentOutput> {
            Ok(AgentOutput::success(""))
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn registry() -> AgentRegistry {
        AgentRegistry::builder()
            .register(Arc::new(NullAgent { name: "architect" }))
            .register(Arc::new(NullAgent { name: "codesmith" }))
            .register(Arc::new(NullAgent { name: "reviewer" }))
            .build()
    }

    const VALID: &str = r#"{
        "subtasks": [
            {"id": 1, "description": "Design the schema", "agent": "architect", "dependencies": [], "estimated_duration": 120},
            {"id": 2, "description": "Implement the API", "agent": "codesmith", "dependencies": [1], "estimated_duration": 600},
            {"id": 3, "description": "Review everything", "agent": "reviewer", "dependencies": [2], "estimated_duration": 60}
        ],
        "parallelizable": false,
        "reasoning": "classic three phase build"
    }"#;

    #[test]
    fn valid_decomposition_parses() {
        let plan = parse_and_validate(VALID, &registry()).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps[0].agent, "architect");
        assert_eq!(plan.steps[1].dependencies, vec![1]);
        assert_eq!(plan.steps[2].dependencies, vec![2]);
        assert!(!plan.parallel_hint);
    }

    #[test]
    fn fenced_output_is_tolerated() {
        let fenced = format!("```json\n{}\n```", VALID);
        let plan = parse_and_validate(&fenced, &registry()).unwrap();
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn parallelizable_sets_plan_hint() {
        let content = r#"{
            "subtasks": [
                {"id": 1, "description": "Research backends", "agent": "architect", "dependencies": []},
                {"id": 2, "description": "Research frontends", "agent": "codesmith", "dependencies": []}
            ],
            "parallelizable": true,
            "reasoning": "independent"
        }"#;
        let plan = parse_and_validate(content, &registry()).unwrap();
        assert!(plan.parallel_hint);
    }

    #[test]
    fn unregistered_agent_is_rejected() {
        let content = r#"{
            "subtasks": [
                {"id": 1, "description": "Do magic", "agent": "wizard", "dependencies": []}
            ],
            "parallelizable": false,
            "reasoning": ""
        }"#;
        let err = parse_and_validate(content, &registry()).unwrap_err();
        assert!(err.to_string().contains("wizard"));
    }

    #[test]
    fn forward_dependency_is_rejected() {
        let content = r#"{
            "subtasks": [
                {"id": 1, "description": "First", "agent": "architect", "dependencies": [2]},
                {"id": 2, "description": "Second", "agent": "codesmith", "dependencies": []}
            ],
            "parallelizable": false,
            "reasoning": ""
        }"#;
        assert!(parse_and_validate(content, &registry()).is_err());
    }

    #[test]
    fn non_json_is_rejected() {
        assert!(parse_and_validate("I think we should start with...", &registry()).is_err());
        assert!(parse_and_validate("{\"subtasks\": []}", &registry()).is_err());
    }

    #[test]
    fn non_ascending_ids_are_rejected() {
        let content = r#"{
            "subtasks": [
                {"id": 2, "description": "B", "agent": "codesmith", "dependencies": []},
                {"id": 1, "description": "A", "agent": "architect", "dependencies": []}
            ],
            "parallelizable": false,
            "reasoning": ""
        }"#;
        assert!(parse_and_validate(content, &registry()).is_err());
    }
}
