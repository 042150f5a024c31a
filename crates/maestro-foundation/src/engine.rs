//! Workflow Engine
//!
//! Drives a workflow state through nodes until terminal: route, dispatch the
//! selected node, checkpoint, repeat. Suspends durably on approval gates and
//! resumes when the external decision arrives, including across restarts.
//! One workflow executes one node at a time; multiple workflows run
//! concurrently, bounded by a FIFO semaphore.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use maestro_kernel::agent::{AgentOutput, AgentStatus, AgentTask};
use maestro_kernel::approval::{ApprovalResolution, Decision, PendingApproval};
use maestro_kernel::config::EngineConfig;
use maestro_kernel::error::{EngineError, EngineResult};
use maestro_kernel::event::{WorkflowEvent, summarize};
use maestro_kernel::plan::{ExecutionPlan, StepGuard, StepStatus};
use maestro_kernel::registry::AgentRegistry;
use maestro_kernel::state::{WorkflowState, WorkflowStatus};
use maestro_kernel::store::{PlanMemoryEntry, PlanMemoryStore, StateStore};

use crate::approval::ApprovalManager;
use crate::planner::Planner;
use crate::router::{Route, route};

/// How a driving call returned control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The workflow finished successfully.
    Completed,
    /// The workflow ended with `status = failed`.
    Failed,
    /// The workflow is dormant, waiting on an approval decision.
    Suspended,
}

/// What `recover()` found and did after a restart.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Non-terminal workflows that were driven forward, with their outcome.
    pub resumed: Vec<(String, RunOutcome)>,
    /// Workflows left dormant on their approval gate.
    pub awaiting_approval: Vec<String>,
}

/// Result of one step dispatch, normalized before merging into state.
enum StepOutcome {
    Output(AgentOutput),
    Crashed(String),
    TimedOut(u64),
}

/// The execution engine.
pub struct WorkflowEngine {
    registry: Arc<AgentRegistry>,
    state_store: Arc<dyn StateStore>,
    memory: Arc<dyn PlanMemoryStore>,
    approvals: Arc<ApprovalManager>,
    planner: Planner,
    config: Arc<EngineConfig>,
    event_tx: Option<mpsc::Sender<WorkflowEvent>>,
    /// FIFO backpressure over concurrently executing workflows.
    semaphore: Arc<Semaphore>,
    /// Live cancellation flags, keyed by workflow id.
    cancel_flags: DashMap<String, Arc<AtomicBool>>,
}

impl WorkflowEngine {
    pub fn new(
        registry: Arc<AgentRegistry>,
        state_store: Arc<dyn StateStore>,
        memory: Arc<dyn PlanMemoryStore>,
        approvals: Arc<ApprovalManager>,
        config: EngineConfig,
    ) -> Self {
        let config = Arc::new(config);
        let planner = Planner::new(registry.clone(), memory.clone(), config.clone());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_workflows));

        Self {
            registry,
            state_store,
            memory,
            approvals,
            planner,
            config,
            event_tx: None,
            semaphore,
            cancel_flags: DashMap::new(),
        }
    }

    /// Attach an event sender; every lifecycle event is forwarded to it.
    pub fn with_event_sender(mut self, tx: mpsc::Sender<WorkflowEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Outstanding approvals, oldest first.
    pub async fn list_pending_approvals(&self) -> Vec<PendingApproval> {
        self.approvals.list_pending().await
    }

    async fn emit(&self, event: WorkflowEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    async fn checkpoint(&self, state: &WorkflowState) -> EngineResult<()> {
        debug!(workflow_id = %state.workflow_id, status = %state.status, "checkpoint");
        self.state_store.save(state).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Create and drive a new workflow. Blocks until the workflow is
    /// terminal or suspends on an approval gate. Requests beyond the
    /// concurrency cap queue FIFO.
    pub async fn start_workflow(
        &self,
        workflow_id: impl Into<String>,
        user_query: impl Into<String>,
        workspace_path: Option<String>,
    ) -> EngineResult<RunOutcome> {
        let workflow_id = workflow_id.into();

        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Internal("engine semaphore closed".into()))?;

        if self.state_store.load(&workflow_id).await?.is_some() {
            return Err(EngineError::ValidationFailed(format!(
                "workflow '{}' already exists",
                workflow_id
            )));
        }

        let state = WorkflowState::new(workflow_id.clone(), user_query, workspace_path);
        self.checkpoint(&state).await?;

        info!(workflow_id = %workflow_id, "workflow started");
        self.run_loop(state).await
    }

    /// Bridge an external approval decision back into a suspended workflow.
    ///
    /// Returns `None` when there is no matching pending approval (unknown
    /// workflow, or a duplicate decision) — never an error, so transports can
    /// always acknowledge.
    pub async fn resolve_approval(
        &self,
        workflow_id: &str,
        resolution: ApprovalResolution,
    ) -> EngineResult<Option<RunOutcome>> {
        let Some(_pending) = self.approvals.resolve(workflow_id).await? else {
            return Ok(None);
        };

        let Some(mut state) = self.state_store.load(workflow_id).await? else {
            warn!(workflow_id, "pending approval had no stored workflow state");
            return Ok(None);
        };

        if state.status != WorkflowStatus::WaitingArchitectureApproval {
            warn!(
                workflow_id,
                status = %state.status,
                "approval decision for a workflow that is not suspended"
            );
            return Ok(None);
        }

        if let Some(feedback) = &resolution.feedback {
            state.set_context("approval_feedback", json!(feedback));
        }

        match resolution.decision {
            Decision::Approved => {
                state.set_context("architecture_approved", json!(true));
                state.status = WorkflowStatus::Executing;
            }
            Decision::Modified => {
                state.set_context("architecture_approved", json!(true));
                if let Some(modifications) = resolution.modifications {
                    state.set_context("approval_modifications", modifications);
                }
                state.status = WorkflowStatus::Executing;
            }
            Decision::Rejected => {
                state.set_context("architecture_approved", json!(false));
                match resolution.feedback {
                    // Rejection with feedback becomes a replan request: the
                    // architect revises before execution continues.
                    Some(feedback) => {
                        state.set_replan_request("architect", feedback);
                        state.status = WorkflowStatus::Executing;
                    }
                    None => {
                        Self::skip_pending_steps(&mut state);
                        state.record_error(None, "approval", "approval_rejected");
                        state.finish(WorkflowStatus::Failed);
                    }
                }
            }
        }

        info!(workflow_id, decision = ?resolution.decision, "workflow resumed from approval");
        self.checkpoint(&state).await?;
        self.run_loop(state).await.map(Some)
    }

    /// Request cancellation. Running workflows observe the flag between
    /// nodes; dormant ones observe it on their next resume.
    pub async fn cancel(&self, workflow_id: &str) -> EngineResult<()> {
        if let Some(flag) = self.cancel_flags.get(workflow_id) {
            flag.store(true, Ordering::Relaxed);
        }

        if let Some(mut state) = self.state_store.load(workflow_id).await? {
            if !state.is_terminal() && !state.cancel_requested {
                state.cancel_requested = true;
                self.checkpoint(&state).await?;
            }
        }

        info!(workflow_id, "cancellation requested");
        Ok(())
    }

    /// Reload every non-terminal workflow after a restart. Suspended
    /// workflows stay dormant on their gate; the rest are driven forward.
    pub async fn recover(&self) -> EngineResult<RecoveryReport> {
        let restored = self.approvals.restore().await?;
        debug!(restored, "pending approvals restored");

        let mut report = RecoveryReport {
            awaiting_approval: self
                .state_store
                .list_by_status(WorkflowStatus::WaitingArchitectureApproval)
                .await?,
            ..RecoveryReport::default()
        };

        for status in [WorkflowStatus::Planning, WorkflowStatus::Executing] {
            for workflow_id in self.state_store.list_by_status(status).await? {
                let Some(state) = self.state_store.load(&workflow_id).await? else {
                    continue;
                };
                info!(workflow_id = %workflow_id, "resuming workflow after restart");
                let outcome = self.run_loop(state).await?;
                report.resumed.push((workflow_id, outcome));
            }
        }

        Ok(report)
    }

    /// Auto-reject every pending approval past its deadline and resume the
    /// affected workflows with rejection semantics. Returns their ids.
    pub async fn timeout_sweep(&self) -> EngineResult<Vec<String>> {
        let expired = self.approvals.sweep(Utc::now()).await?;
        let mut swept = Vec::new();

        for approval in expired {
            let workflow_id = approval.workflow_id.clone();
            let Some(mut state) = self.state_store.load(&workflow_id).await? else {
                continue;
            };
            if state.status != WorkflowStatus::WaitingArchitectureApproval {
                continue;
            }

            state.set_context("architecture_approved", json!(false));
            Self::skip_pending_steps(&mut state);
            state.record_error(None, "approval", "timeout");
            state.finish(WorkflowStatus::Failed);

            self.checkpoint(&state).await?;
            self.run_loop(state).await?;
            swept.push(workflow_id);
        }

        Ok(swept)
    }

    // -----------------------------------------------------------------------
    // The loop
    // -----------------------------------------------------------------------

    async fn run_loop(&self, mut state: WorkflowState) -> EngineResult<RunOutcome> {
        let cancel = {
            let entry = self
                .cancel_flags
                .entry(state.workflow_id.clone())
                .or_insert_with(|| Arc::new(AtomicBool::new(state.cancel_requested)));
            entry.value().clone()
        };

        loop {
            if (state.cancel_requested || cancel.load(Ordering::Relaxed)) && !state.is_terminal() {
                state.cancel_requested = true;
                state.record_error(None, "engine", "cancelled");
                state.finish(WorkflowStatus::Failed);
                info!(workflow_id = %state.workflow_id, "workflow cancelled");
            }

            match route(&state) {
                Route::Planner => self.planner_node(&mut state).await,
                Route::Approval => {
                    self.checkpoint(&state).await?;
                    info!(
                        workflow_id = %state.workflow_id,
                        "workflow suspended on approval gate"
                    );
                    return Ok(RunOutcome::Suspended);
                }
                Route::Agent(_) => {
                    state = self.execute_next(state, &cancel).await?;
                }
                Route::Deadlock => {
                    let blocked: Vec<String> = state
                        .execution_plan
                        .blocked_steps()
                        .iter()
                        .map(|s| {
                            format!(
                                "step {} ({}) waiting on {:?}",
                                s.id, s.agent, s.dependencies
                            )
                        })
                        .collect();
                    error!(
                        workflow_id = %state.workflow_id,
                        blocked = %blocked.join("; "),
                        "dependency deadlock"
                    );
                    state.record_error(None, "router", format!("deadlock: {}", blocked.join("; ")));
                    state.finish(WorkflowStatus::Failed);
                }
                Route::End => {
                    return self.finalize(state).await;
                }
            }

            self.checkpoint(&state).await?;
        }
    }

    /// Planner node: initial synthesis or a replan request.
    async fn planner_node(&self, state: &mut WorkflowState) {
        if state.needs_replan {
            if let Some(step_id) = self.planner.replan(state) {
                let agent = state
                    .execution_plan
                    .get(step_id)
                    .map(|s| s.agent.clone())
                    .unwrap_or_default();
                self.emit(WorkflowEvent::ReplanApplied {
                    workflow_id: state.workflow_id.clone(),
                    step_id,
                    agent,
                })
                .await;
            }
            return;
        }

        self.emit(WorkflowEvent::PlanningStarted {
            workflow_id: state.workflow_id.clone(),
        })
        .await;

        match self.planner.plan_initial(state).await {
            Ok(()) => {
                let agents = state
                    .execution_plan
                    .steps
                    .iter()
                    .map(|s| s.agent.clone())
                    .collect();
                self.emit(WorkflowEvent::PlanCreated {
                    workflow_id: state.workflow_id.clone(),
                    agents,
                })
                .await;
            }
            Err(e) => {
                // Initial planning failure is fatal for the workflow.
                error!(workflow_id = %state.workflow_id, error = %e, "initial planning failed");
                state.record_error(None, "planner", e.to_string());
                state.finish(WorkflowStatus::Failed);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step execution
    // -----------------------------------------------------------------------

    async fn execute_next(
        &self,
        mut state: WorkflowState,
        cancel: &Arc<AtomicBool>,
    ) -> EngineResult<WorkflowState> {
        // An interrupted step resumes before anything new starts.
        let step_id = match state.execution_plan.first_in_progress() {
            Some(step) => step.id,
            None => match state.execution_plan.next_eligible() {
                Some(step) => step.id,
                None => return Ok(state),
            },
        };

        // Guard evaluation happens at dispatch time, against live context.
        // Only pending steps are guarded; an interrupted step that already
        // started always resumes.
        let guard = state
            .execution_plan
            .get(step_id)
            .filter(|s| s.status == StepStatus::Pending)
            .and_then(|s| s.guard.clone());
        if let Some(StepGuard::SkipUnlessContext { key }) = guard {
            if !state.context_truthy(&key) {
                if let Some(step) = state.execution_plan.get_mut(step_id) {
                    step.skip();
                }
                debug!(
                    workflow_id = %state.workflow_id,
                    step_id,
                    key = %key,
                    "step skipped by guard"
                );
                self.emit(WorkflowEvent::StepSkipped {
                    workflow_id: state.workflow_id.clone(),
                    step_id,
                })
                .await;
                return Ok(state);
            }
        }

        let group = parallel_group(&state.execution_plan, step_id);
        if group.len() > 1 {
            self.execute_group(state, group, cancel).await
        } else {
            self.execute_single(state, step_id, cancel).await
        }
    }

    async fn execute_single(
        &self,
        mut state: WorkflowState,
        step_id: u32,
        cancel: &Arc<AtomicBool>,
    ) -> EngineResult<WorkflowState> {
        let (agent_name, task_text) = match state.execution_plan.get(step_id) {
            Some(step) => (step.agent.clone(), step.task.clone()),
            None => return Ok(state),
        };

        let Some(executor) = self.registry.get(&agent_name) else {
            if let Some(step) = state.execution_plan.get_mut(step_id) {
                step.fail();
            }
            let message = format!("agent '{}' is not registered", agent_name);
            warn!(workflow_id = %state.workflow_id, step_id, %message);
            state.record_error(Some(step_id), &agent_name, message.clone());
            self.emit(WorkflowEvent::StepFailed {
                workflow_id: state.workflow_id.clone(),
                step_id,
                error: message,
            })
            .await;
            return Ok(state);
        };

        if let Some(step) = state.execution_plan.get_mut(step_id) {
            step.begin();
        }
        state.current_agent = Some(agent_name.clone());
        self.checkpoint(&state).await?;
        self.emit(WorkflowEvent::StepStarted {
            workflow_id: state.workflow_id.clone(),
            step_id,
            agent: agent_name.clone(),
        })
        .await;

        let task = AgentTask {
            task: task_text,
            context: state.context.clone(),
            workspace_path: state.workspace_path.clone(),
        };
        let timeout = self.config.timeout_for(&agent_name);
        let dispatch = tokio::time::timeout(timeout, executor.execute(&task)).await;

        // In-flight work was allowed to finish; a cancellation that arrived
        // meanwhile discards the result.
        if cancel.load(Ordering::Relaxed) {
            state.cancel_requested = true;
            debug!(workflow_id = %state.workflow_id, step_id, "discarding result after cancel");
            return Ok(state);
        }

        let outcome = match dispatch {
            Err(_) => StepOutcome::TimedOut(timeout.as_millis() as u64),
            Ok(Err(e)) => StepOutcome::Crashed(e.to_string()),
            Ok(Ok(output)) => StepOutcome::Output(output),
        };
        self.apply_step_outcome(&mut state, step_id, &agent_name, outcome)
            .await?;
        Ok(state)
    }

    /// Dispatch a group of equally-eligible steps concurrently and merge
    /// results in ascending step-id order. Each executor sees the state
    /// snapshot from dispatch time.
    async fn execute_group(
        &self,
        mut state: WorkflowState,
        group: Vec<u32>,
        cancel: &Arc<AtomicBool>,
    ) -> EngineResult<WorkflowState> {
        let mut specs = Vec::new();
        for step_id in &group {
            let Some(step) = state.execution_plan.get(*step_id) else {
                continue;
            };
            specs.push((*step_id, step.agent.clone(), step.task.clone()));
        }

        for (step_id, agent_name, _) in &specs {
            if let Some(step) = state.execution_plan.get_mut(*step_id) {
                step.begin();
            }
            state.current_agent = Some(agent_name.clone());
        }
        self.checkpoint(&state).await?;

        let mut join_set = JoinSet::new();
        for (step_id, agent_name, task_text) in specs {
            let Some(executor) = self.registry.get(&agent_name) else {
                if let Some(step) = state.execution_plan.get_mut(step_id) {
                    step.fail();
                }
                state.record_error(
                    Some(step_id),
                    &agent_name,
                    format!("agent '{}' is not registered", agent_name),
                );
                continue;
            };

            self.emit(WorkflowEvent::StepStarted {
                workflow_id: state.workflow_id.clone(),
                step_id,
                agent: agent_name.clone(),
            })
            .await;

            let task = AgentTask {
                task: task_text,
                context: state.context.clone(),
                workspace_path: state.workspace_path.clone(),
            };
            let timeout = self.config.timeout_for(&agent_name);

            join_set.spawn(async move {
                let dispatch = tokio::time::timeout(timeout, executor.execute(&task)).await;
                (step_id, agent_name, timeout, dispatch)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(
                    workflow_id = %state.workflow_id,
                    error = %e,
                    "parallel step task failed to join"
                ),
            }
        }

        if cancel.load(Ordering::Relaxed) {
            state.cancel_requested = true;
            return Ok(state);
        }

        // Deterministic merge order regardless of completion order.
        results.sort_by_key(|(step_id, ..)| *step_id);
        for (step_id, agent_name, timeout, dispatch) in results {
            let outcome = match dispatch {
                Err(_) => StepOutcome::TimedOut(timeout.as_millis() as u64),
                Ok(Err(e)) => StepOutcome::Crashed(e.to_string()),
                Ok(Ok(output)) => StepOutcome::Output(output),
            };
            self.apply_step_outcome(&mut state, step_id, &agent_name, outcome)
                .await?;
        }

        Ok(state)
    }

    /// Merge one step's outcome into the state: step lifecycle, result,
    /// context updates, collaboration hints, approval gates, token counts.
    async fn apply_step_outcome(
        &self,
        state: &mut WorkflowState,
        step_id: u32,
        agent_name: &str,
        outcome: StepOutcome,
    ) -> EngineResult<()> {
        match outcome {
            StepOutcome::TimedOut(duration_ms) => {
                let message = format!("timed out after {}ms", duration_ms);
                if let Some(step) = state.execution_plan.get_mut(step_id) {
                    step.fail();
                }
                warn!(workflow_id = %state.workflow_id, step_id, %message);
                state.record_error(Some(step_id), agent_name, message.clone());
                self.emit(WorkflowEvent::StepFailed {
                    workflow_id: state.workflow_id.clone(),
                    step_id,
                    error: message,
                })
                .await;
            }
            StepOutcome::Crashed(message) => {
                if let Some(step) = state.execution_plan.get_mut(step_id) {
                    step.fail();
                }
                warn!(workflow_id = %state.workflow_id, step_id, error = %message, "step crashed");
                state.record_error(Some(step_id), agent_name, message.clone());
                self.emit(WorkflowEvent::StepFailed {
                    workflow_id: state.workflow_id.clone(),
                    step_id,
                    error: message,
                })
                .await;
            }
            StepOutcome::Output(output) => {
                state.metadata.prompt_tokens += output.prompt_tokens();
                state.metadata.completion_tokens += output.completion_tokens();

                match output.status {
                    AgentStatus::Error => {
                        if let Some(step) = state.execution_plan.get_mut(step_id) {
                            step.result = Some(Value::String(output.content.clone()));
                            step.fail();
                        }
                        state.record_error(Some(step_id), agent_name, output.content.clone());
                        self.emit(WorkflowEvent::StepFailed {
                            workflow_id: state.workflow_id.clone(),
                            step_id,
                            error: output.content,
                        })
                        .await;
                    }
                    AgentStatus::Success => {
                        if let Some(step) = state.execution_plan.get_mut(step_id) {
                            step.complete(Value::String(output.content.clone()));
                        }

                        state.set_context(
                            "previous_step_result",
                            Value::String(output.content.clone()),
                        );
                        for (key, value) in output.context {
                            state.context.insert(key, value);
                        }

                        if let Some(hints) = output.hints {
                            if hints.needs_replan {
                                state.needs_replan = true;
                                state.suggested_agent = hints.suggested_agent;
                                state.suggested_query = hints.suggested_query;
                                debug!(
                                    workflow_id = %state.workflow_id,
                                    step_id,
                                    suggested = ?state.suggested_agent,
                                    "collaboration hints request a replan"
                                );
                            }
                        }

                        if let Some(request) = output.approval {
                            self.approvals
                                .create(
                                    &state.workflow_id,
                                    request.clone(),
                                    self.config.approval_timeout_seconds,
                                )
                                .await?;
                            state.status = WorkflowStatus::WaitingArchitectureApproval;
                            self.emit(WorkflowEvent::ApprovalRequired {
                                workflow_id: state.workflow_id.clone(),
                                action_type: request.action_type,
                                payload: request.payload,
                            })
                            .await;
                        }

                        self.emit(WorkflowEvent::StepCompleted {
                            workflow_id: state.workflow_id.clone(),
                            step_id,
                            result_summary: summarize(&output.content),
                        })
                        .await;
                    }
                }
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    fn skip_pending_steps(state: &mut WorkflowState) {
        for step in &mut state.execution_plan.steps {
            step.skip();
        }
    }

    async fn finalize(&self, mut state: WorkflowState) -> EngineResult<RunOutcome> {
        if !state.is_terminal() {
            // Routing ran dry. A plan that lost steps to failures ends the
            // workflow failed; skipped steps alone do not.
            let any_failed = state
                .execution_plan
                .steps
                .iter()
                .any(|s| s.status == StepStatus::Failed);
            state.finish(if any_failed {
                WorkflowStatus::Failed
            } else {
                WorkflowStatus::Completed
            });
        } else if state.metadata.ended_at.is_none() {
            state.metadata.ended_at = Some(Utc::now());
        }
        state.current_agent = None;
        self.checkpoint(&state).await?;

        let success = state.status == WorkflowStatus::Completed;
        let duration = state.metadata.duration_seconds().unwrap_or(0.0);
        let error_summary = if state.errors.is_empty() {
            None
        } else {
            Some(
                state
                    .errors
                    .iter()
                    .map(|e| e.message.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        // Memory write failures must not undo a finished workflow.
        let entry = PlanMemoryEntry::new(
            state.user_query.clone(),
            state.execution_plan.shape(),
            success,
            duration,
            error_summary,
        );
        if let Err(e) = self.memory.store(entry).await {
            warn!(workflow_id = %state.workflow_id, error = %e, "plan memory write failed");
        }

        if success {
            let summary = state
                .context
                .get("previous_step_result")
                .and_then(Value::as_str)
                .map(summarize)
                .unwrap_or_else(|| "workflow completed".to_string());
            info!(workflow_id = %state.workflow_id, "workflow completed");
            self.emit(WorkflowEvent::WorkflowCompleted {
                workflow_id: state.workflow_id.clone(),
                summary,
            })
            .await;
        } else {
            info!(workflow_id = %state.workflow_id, errors = state.errors.len(), "workflow failed");
            self.emit(WorkflowEvent::WorkflowFailed {
                workflow_id: state.workflow_id.clone(),
                errors: state.errors.clone(),
            })
            .await;
        }

        self.cancel_flags.remove(&state.workflow_id);
        Ok(if success {
            RunOutcome::Completed
        } else {
            RunOutcome::Failed
        })
    }
}

/// Steps that may run as one concurrent group: the plan opted in via its
/// parallel hint, and every member is pending, unguarded, eligible, and
/// shares the exact dependency set of the group's first step.
fn parallel_group(plan: &ExecutionPlan, first_id: u32) -> Vec<u32> {
    if !plan.parallel_hint || plan.any_in_progress() {
        return vec![first_id];
    }
    let Some(first) = plan.get(first_id) else {
        return vec![first_id];
    };
    if first.guard.is_some() {
        return vec![first_id];
    }

    let mut group = Vec::new();
    for step in &plan.steps {
        if step.status == StepStatus::Pending
            && step.guard.is_none()
            && step.dependencies == first.dependencies
        {
            group.push(step.id);
        }
    }

    if group.contains(&first_id) { group } else { vec![first_id] }
}
