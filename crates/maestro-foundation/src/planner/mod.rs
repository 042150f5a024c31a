//! Planner
//!
//! Turns a user query into an initial execution plan and handles runtime
//! replan requests. Synthesis is three-tiered: keyword routing for simple
//! queries, template selection for moderate ones, and memory adaptation or
//! LLM decomposition for complex ones. Every tier degrades to the template
//! path, so initial planning only fails on truly broken setups.

pub mod adapt;
pub mod complexity;
pub mod decompose;
pub mod keyword;
pub mod template;

pub use complexity::{Complexity, classify};

use std::sync::Arc;
use tracing::{debug, info, warn};

use maestro_kernel::agent::{AgentStatus, AgentTask};
use maestro_kernel::config::{EngineConfig, PlannerMode};
use maestro_kernel::error::{EngineError, EngineResult};
use maestro_kernel::plan::{ExecutionPlan, Step};
use maestro_kernel::registry::AgentRegistry;
use maestro_kernel::state::{WorkflowState, WorkflowStatus};
use maestro_kernel::store::{PlanMemoryStore, filter_success};

/// Three-tier plan synthesis plus replan handling.
pub struct Planner {
    registry: Arc<AgentRegistry>,
    memory: Arc<dyn PlanMemoryStore>,
    config: Arc<EngineConfig>,
}

impl Planner {
    pub fn new(
        registry: Arc<AgentRegistry>,
        memory: Arc<dyn PlanMemoryStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            registry,
            memory,
            config,
        }
    }

    /// Fill the initial plan for a freshly created workflow.
    ///
    /// A failure here is fatal for the workflow; the engine records it and
    /// marks the workflow failed.
    pub async fn plan_initial(&self, state: &mut WorkflowState) -> EngineResult<()> {
        let query = state.user_query.clone();

        let plan = match self.config.planner_mode {
            PlannerMode::Keyword => self.keyword_or_template(&query),
            PlannerMode::Template => template::plan_for(&query),
            PlannerMode::Llm => self.llm_or_template(&query).await,
            PlannerMode::Auto => self.auto_plan(&query).await,
        };

        if plan.is_empty() {
            return Err(EngineError::PlannerFailed(
                "planning produced an empty plan".into(),
            ));
        }

        info!(
            workflow_id = %state.workflow_id,
            steps = plan.len(),
            "initial plan created"
        );

        state.execution_plan = plan;
        state.status = WorkflowStatus::Executing;
        Ok(())
    }

    async fn auto_plan(&self, query: &str) -> ExecutionPlan {
        match classify(query, &self.config.complexity) {
            Complexity::Simple => self.keyword_or_template(query),
            Complexity::Moderate => template::plan_for(query),
            Complexity::Complex => {
                if let Some(plan) = self.memory_adapted(query).await {
                    plan
                } else {
                    self.llm_or_template(query).await
                }
            }
        }
    }

    /// Keyword tier: a single-step plan when one agent clearly matches,
    /// otherwise the template path.
    fn keyword_or_template(&self, query: &str) -> ExecutionPlan {
        match keyword::route(query) {
            Some((agent, confidence)) if self.registry.contains(&agent) => {
                debug!(agent = %agent, confidence, "keyword routing matched");
                ExecutionPlan::new().append(Step::new(agent, query))
            }
            _ => template::plan_for(query),
        }
    }

    /// Memory tier: adapt the best successful prior plan when it clears the
    /// similarity threshold. Store failures are tolerated.
    async fn memory_adapted(&self, query: &str) -> Option<ExecutionPlan> {
        let hits = match self.memory.search(query, self.config.memory_search_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "plan memory unavailable, planning fresh");
                return None;
            }
        };

        let successful = filter_success(hits);
        let best = successful.first()?;
        if best.score < self.config.memory_similarity_threshold {
            return None;
        }

        debug!(
            score = best.score,
            prior_task = %best.entry.task_text,
            "adapting plan from memory"
        );
        let plan = adapt::adapt(&best.entry, query);
        if plan.is_empty() { None } else { Some(plan) }
    }

    /// LLM tier with template fallback on any invalid output.
    async fn llm_or_template(&self, query: &str) -> ExecutionPlan {
        match self.llm_decompose(query).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "LLM decomposition failed, falling back to template");
                template::plan_for(query)
            }
        }
    }

    async fn llm_decompose(&self, query: &str) -> EngineResult<ExecutionPlan> {
        let orchestrator = self.registry.get("orchestrator").ok_or_else(|| {
            EngineError::PlannerFailed("no orchestrator executor registered".into())
        })?;

        let prompt = decompose::decomposition_prompt(query, &self.registry.names());
        let output = orchestrator.execute(&AgentTask::new(prompt)).await?;

        if output.status != AgentStatus::Success {
            return Err(EngineError::PlannerFailed(format!(
                "orchestrator returned an error: {}",
                output.content
            )));
        }

        decompose::parse_and_validate(&output.content, &self.registry)
    }

    /// Handle a replan request signalled through the collaboration flags.
    ///
    /// Appends one step with no dependencies (immediate eligibility is the
    /// point) and clears the flags. An unregistered suggested agent rejects
    /// the replan silently; hitting the loop guard fails the workflow.
    /// Returns the id of the appended step, if any.
    pub fn replan(&self, state: &mut WorkflowState) -> Option<u32> {
        if !state.needs_replan {
            return None;
        }

        let Some(agent) = state.suggested_agent.clone() else {
            warn!(
                workflow_id = %state.workflow_id,
                "replan rejected: no suggested agent"
            );
            state.clear_replan_flags();
            return None;
        };

        if !self.registry.contains(&agent) {
            warn!(
                workflow_id = %state.workflow_id,
                agent = %agent,
                "replan rejected: suggested agent is not registered"
            );
            state.clear_replan_flags();
            return None;
        }

        if state.replan_count >= self.config.replan_loop_guard {
            state.clear_replan_flags();
            state.record_error(None, "planner", "replan_limit");
            state.finish(WorkflowStatus::Failed);
            warn!(
                workflow_id = %state.workflow_id,
                limit = self.config.replan_loop_guard,
                "replan limit reached, failing workflow"
            );
            return None;
        }

        let task = state
            .suggested_query
            .clone()
            .unwrap_or_else(|| state.user_query.clone());

        state.execution_plan = state.execution_plan.append(Step::new(agent.clone(), task));
        state.replan_count += 1;
        state.clear_replan_flags();
        state.status = WorkflowStatus::Executing;

        let step_id = state.execution_plan.len() as u32;
        info!(
            workflow_id = %state.workflow_id,
            step_id,
            agent = %agent,
            "replan appended step"
        );
        Some(step_id)
    }
}
