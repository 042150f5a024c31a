//! Scripted agents and wiring helpers shared by the integration tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use maestro_foundation::approval::ApprovalManager;
use maestro_foundation::engine::WorkflowEngine;
use maestro_kernel::agent::{AgentExecutor, AgentOutput, AgentTask};
use maestro_kernel::config::EngineConfig;
use maestro_kernel::error::EngineResult;
use maestro_kernel::event::WorkflowEvent;
use maestro_kernel::registry::AgentRegistry;
use maestro_kernel::store::{ApprovalStore, PlanMemoryStore, StateStore};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("maestro_foundation=debug,maestro_kernel=debug")
        .try_init();
}

/// Agent that always succeeds with fixed content.
pub struct StaticAgent {
    name: String,
    content: String,
}

impl StaticAgent {
    pub fn arc(name: impl Into<String>, content: impl Into<String>) -> Arc<dyn AgentExecutor> {
        Arc::new(Self {
            name: name.into(),
            content: content.into(),
        })
    }
}

#[async_trait]
impl AgentExecutor for StaticAgent {
    async fn execute(&self, _task: &AgentTask) -> EngineResult<AgentOutput> {
        Ok(AgentOutput::success(self.content.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Agent that replays scripted outputs in order; the last one repeats.
pub struct ScriptedAgent {
    name: String,
    outputs: Mutex<VecDeque<AgentOutput>>,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    pub fn arc(name: impl Into<String>, outputs: Vec<AgentOutput>) -> Arc<dyn AgentExecutor> {
        Arc::new(Self {
            name: name.into(),
            outputs: Mutex::new(outputs.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AgentExecutor for ScriptedAgent {
    async fn execute(&self, _task: &AgentTask) -> EngineResult<AgentOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut outputs = self.outputs.lock().unwrap();
        let output = if outputs.len() > 1 {
            outputs.pop_front()
        } else {
            outputs.front().cloned()
        };
        Ok(output.unwrap_or_else(|| AgentOutput::success("done")))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Agent that sleeps before answering, for cancellation and overlap tests.
pub struct SlowAgent {
    name: String,
    delay: Duration,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl SlowAgent {
    pub fn arc(name: impl Into<String>, delay: Duration) -> Arc<dyn AgentExecutor> {
        Arc::new(Self {
            name: name.into(),
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Variant sharing overlap counters with other agents.
    pub fn probed(
        name: impl Into<String>,
        delay: Duration,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    ) -> Arc<dyn AgentExecutor> {
        Arc::new(Self {
            name: name.into(),
            delay,
            active,
            max_active,
        })
    }
}

#[async_trait]
impl AgentExecutor for SlowAgent {
    async fn execute(&self, _task: &AgentTask) -> EngineResult<AgentOutput> {
        let concurrent = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(concurrent, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(AgentOutput::success(format!("{} finished", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build an immutable registry from executors.
pub fn registry(executors: Vec<Arc<dyn AgentExecutor>>) -> Arc<AgentRegistry> {
    let mut builder = AgentRegistry::builder();
    for executor in executors {
        builder = builder.register(executor);
    }
    Arc::new(builder.build())
}

/// Wire an engine over one backend serving all three store roles.
pub fn engine_over<S>(
    registry: Arc<AgentRegistry>,
    store: Arc<S>,
    config: EngineConfig,
) -> (WorkflowEngine, mpsc::Receiver<WorkflowEvent>)
where
    S: StateStore + PlanMemoryStore + ApprovalStore + 'static,
{
    let (tx, rx) = mpsc::channel(1024);
    let approvals = Arc::new(ApprovalManager::new(store.clone()));
    let engine = WorkflowEngine::new(registry, store.clone(), store, approvals, config)
        .with_event_sender(tx);
    (engine, rx)
}

/// Drain everything currently buffered on the event channel.
pub fn drain_events(rx: &mut mpsc::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
