//! Engine Configuration
//!
//! All knobs recognized by the orchestration core, with serde defaults so a
//! partial TOML file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Which plan-synthesis tier the planner uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerMode {
    /// Always keyword routing (falls back to templates on no match).
    Keyword,
    /// Always template selection.
    Template,
    /// Always LLM decomposition (falls back to templates on bad output).
    Llm,
    /// Tier chosen by complexity classification.
    #[default]
    Auto,
}

// ---------------------------------------------------------------------------
// Complexity thresholds
// ---------------------------------------------------------------------------

/// Thresholds for the complexity classifier.
///
/// Defaults: queries of at most 3 tokens are simple, questions of at most
/// 6 tokens are simple, queries of 16 or more tokens are complex, and more
/// than two comma-separated clauses (2+ commas) mark a query complex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    #[serde(default = "default_simple_max_tokens")]
    pub simple_max_tokens: usize,
    #[serde(default = "default_simple_question_max_tokens")]
    pub simple_question_max_tokens: usize,
    #[serde(default = "default_complex_min_tokens")]
    pub complex_min_tokens: usize,
    #[serde(default = "default_complex_min_commas")]
    pub complex_min_commas: usize,
}

fn default_simple_max_tokens() -> usize {
    3
}
fn default_simple_question_max_tokens() -> usize {
    6
}
fn default_complex_min_tokens() -> usize {
    16
}
fn default_complex_min_commas() -> usize {
    2
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            simple_max_tokens: default_simple_max_tokens(),
            simple_question_max_tokens: default_simple_question_max_tokens(),
            complex_min_tokens: default_complex_min_tokens(),
            complex_min_commas: default_complex_min_commas(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Configuration for the workflow engine and planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on concurrently executing workflows; requests beyond it
    /// queue FIFO.
    #[serde(default = "default_max_concurrent_workflows")]
    pub max_concurrent_workflows: usize,

    /// Maximum replans per workflow; exceeding marks it failed.
    #[serde(default = "default_replan_loop_guard")]
    pub replan_loop_guard: u32,

    /// Similarity above which the memory-adaptation fast path is taken.
    #[serde(default = "default_memory_similarity_threshold")]
    pub memory_similarity_threshold: f32,

    /// How many memory entries to retrieve per planning attempt.
    #[serde(default = "default_memory_search_k")]
    pub memory_search_k: usize,

    #[serde(default)]
    pub planner_mode: PlannerMode,

    /// Seconds until a pending approval is auto-rejected.
    #[serde(default = "default_approval_timeout_seconds")]
    pub approval_timeout_seconds: u64,

    /// Per-agent node timeouts in seconds.
    #[serde(default = "default_agent_timeouts")]
    pub agent_timeouts: HashMap<String, u64>,

    /// Timeout for agents without an entry in `agent_timeouts`.
    #[serde(default = "default_agent_timeout_seconds")]
    pub default_agent_timeout_seconds: u64,

    #[serde(default)]
    pub complexity: ComplexityThresholds,
}

fn default_max_concurrent_workflows() -> usize {
    16
}
fn default_replan_loop_guard() -> u32 {
    10
}
fn default_memory_similarity_threshold() -> f32 {
    0.85
}
fn default_memory_search_k() -> usize {
    3
}
fn default_approval_timeout_seconds() -> u64 {
    1800
}
fn default_agent_timeout_seconds() -> u64 {
    300
}

fn default_agent_timeouts() -> HashMap<String, u64> {
    // Code-generating agents get the long budget, the reviewer is quick,
    // research sits in between.
    HashMap::from([
        ("orchestrator".to_string(), 900),
        ("architect".to_string(), 900),
        ("codesmith".to_string(), 900),
        ("fixer".to_string(), 900),
        ("reviewer".to_string(), 60),
        ("research".to_string(), 300),
    ])
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workflows: default_max_concurrent_workflows(),
            replan_loop_guard: default_replan_loop_guard(),
            memory_similarity_threshold: default_memory_similarity_threshold(),
            memory_search_k: default_memory_search_k(),
            planner_mode: PlannerMode::default(),
            approval_timeout_seconds: default_approval_timeout_seconds(),
            agent_timeouts: default_agent_timeouts(),
            default_agent_timeout_seconds: default_agent_timeout_seconds(),
            complexity: ComplexityThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrent workflow cap.
    pub fn with_max_concurrent_workflows(mut self, max: usize) -> Self {
        self.max_concurrent_workflows = max;
        self
    }

    /// Set the replan guard.
    pub fn with_replan_loop_guard(mut self, guard: u32) -> Self {
        self.replan_loop_guard = guard;
        self
    }

    /// Set the memory similarity threshold.
    pub fn with_memory_similarity_threshold(mut self, threshold: f32) -> Self {
        self.memory_similarity_threshold = threshold;
        self
    }

    /// Set the planner mode.
    pub fn with_planner_mode(mut self, mode: PlannerMode) -> Self {
        self.planner_mode = mode;
        self
    }

    /// Set the approval timeout.
    pub fn with_approval_timeout_seconds(mut self, seconds: u64) -> Self {
        self.approval_timeout_seconds = seconds;
        self
    }

    /// Override one agent's timeout.
    pub fn with_agent_timeout(mut self, agent: impl Into<String>, seconds: u64) -> Self {
        self.agent_timeouts.insert(agent.into(), seconds);
        self
    }

    /// Node timeout for `agent`.
    pub fn timeout_for(&self, agent: &str) -> Duration {
        let seconds = self
            .agent_timeouts
            .get(agent)
            .copied()
            .unwrap_or(self.default_agent_timeout_seconds);
        Duration::from_secs(seconds)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrent_workflows == 0 {
            return Err(EngineError::ValidationFailed(
                "max_concurrent_workflows must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.memory_similarity_threshold) {
            return Err(EngineError::ValidationFailed(format!(
                "memory_similarity_threshold must be in [0, 1], got {}",
                self.memory_similarity_threshold
            )));
        }
        if self.memory_search_k == 0 {
            return Err(EngineError::ValidationFailed(
                "memory_search_k must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document, applying defaults for missing keys.
    pub fn from_toml_str(input: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| EngineError::ValidationFailed(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a TOML config file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
