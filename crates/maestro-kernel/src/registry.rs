//! Agent Registry
//!
//! Maps stable lowercase agent names to executors. The registry is populated
//! once at engine startup and is immutable afterwards; agents cannot be added
//! at runtime (the node set is fixed, only the plan of steps is mutable).

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::AgentExecutor;

/// Immutable name -> executor map.
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn AgentExecutor>>,
}

impl AgentRegistry {
    /// Start building a registry.
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::new()
    }

    /// Look up an executor by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentExecutor>> {
        self.agents.get(name).cloned()
    }

    /// Returns `true` when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// All registered names, sorted for determinism.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Builder consumed by `build()`; registration after startup is not possible.
#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: HashMap<String, Arc<dyn AgentExecutor>>,
}

impl AgentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under its own name, lowercased. A later
    /// registration with the same name replaces the earlier one.
    pub fn register(mut self, executor: Arc<dyn AgentExecutor>) -> Self {
        let name = executor.name().to_lowercase();
        self.agents.insert(name, executor);
        self
    }

    /// Finalize into an immutable registry.
    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents: self.agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentOutput, AgentTask};
    use crate::error::EngineResult;
    use async_trait::async_trait;

    struct EchoAgent {
        name: &'static str,
    }

    #[async_trait]
    impl AgentExecutor for EchoAgent {
        async fn execute(&self, task: &AgentTask) -> EngineResult<AgentOutput> {
            Ok(AgentOutput::success(task.task.clone()))
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn registry_lookup() {
        let registry = AgentRegistry::builder()
            .register(Arc::new(EchoAgent { name: "fixer" }))
            .register(Arc::new(EchoAgent { name: "reviewer" }))
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("fixer"));
        assert!(!registry.contains("nonexistent"));
        assert!(registry.get("reviewer").is_some());
        assert_eq!(registry.names(), vec!["fixer", "reviewer"]);
    }

    #[test]
    fn names_are_lowercased() {
        let registry = AgentRegistry::builder()
            .register(Arc::new(EchoAgent { name: "Reviewer" }))
            .build();
        assert!(registry.contains("reviewer"));
        assert!(!registry.contains("Reviewer"));
    }
}
