//! Transformation agents: a closed registry of issue detectors, each paired
//! with a generative proposal step.
//!
//! Agents are identified by [`AgentKind`] rather than name strings, so the
//! agent set is an enumerable type and dispatch cannot miss at runtime.

pub mod adapter;
pub mod analyzers;

use crate::language::Language;
use serde::{Deserialize, Serialize};

pub use adapter::invoke;

/// Every transformation agent the pipeline can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Cryptic single-letter identifiers.
    Rename,
    /// Duplicated or unused imports.
    Import,
    /// Repeated statement blocks.
    Duplication,
    /// Functions past the length budget.
    LongFunction,
    /// Deeply-branched functions.
    Complexity,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Rename,
        AgentKind::Import,
        AgentKind::Duplication,
        AgentKind::LongFunction,
        AgentKind::Complexity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::Rename => "rename",
            AgentKind::Import => "import",
            AgentKind::Duplication => "duplication",
            AgentKind::LongFunction => "long-function",
            AgentKind::Complexity => "complexity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rename" => Some(AgentKind::Rename),
            "import" | "imports" => Some(AgentKind::Import),
            "duplication" | "dedup" => Some(AgentKind::Duplication),
            "long-function" | "long_function" | "longfunction" => Some(AgentKind::LongFunction),
            "complexity" => Some(AgentKind::Complexity),
            _ => None,
        }
    }

    /// Default sampling temperature, tuned per task.
    ///
    /// Mechanical edits (renames, imports) want precision; factoring out
    /// duplication benefits from a little more freedom. Usable ranges,
    /// should these need re-tuning: rename 0.1-0.3, import 0.1-0.4,
    /// long-function 0.2-0.5, complexity 0.3-0.6, duplication 0.4-0.7.
    pub fn default_temperature(&self) -> f32 {
        match self {
            AgentKind::Rename => 0.1,
            AgentKind::Import => 0.2,
            AgentKind::LongFunction => 0.3,
            AgentKind::Complexity => 0.4,
            AgentKind::Duplication => 0.5,
        }
    }

    /// Run this agent's deterministic issue detector.
    pub fn analyze(&self, code: &str, language: Language) -> Vec<String> {
        match self {
            AgentKind::Rename => analyzers::find_short_names(code),
            AgentKind::Import => analyzers::find_duplicate_imports(code, language),
            AgentKind::Duplication => analyzers::find_duplicate_lines(code),
            AgentKind::LongFunction => analyzers::find_long_functions(code, language),
            AgentKind::Complexity => analyzers::find_complex_functions(code, language),
        }
    }
}
