//! Shared pipeline state and the records that make up the audit trail.
//!
//! `PipelineState` is the single mutable context threaded through every
//! stage. Everything appended to it (`agent_results`, `history`) is
//! append-only: records are created once and never mutated, so the trail a
//! caller gets back is an honest replay of what happened.

use crate::agents::AgentKind;
use crate::language::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Loop status for the pipeline as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Waiting for the next corrective pass.
    Pending,
    /// A corrective pass has been applied, not yet validated.
    Patched,
    /// Validation ran; errors (if any) are classified in `last_errors`.
    Tested,
    /// No blocking errors remain.
    Converged,
    /// Iteration cap reached without convergence. Terminal but non-fatal.
    MaxReached,
}

/// User-visible terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Converged with no residual issues.
    Success,
    /// Converged, style-only issues remain.
    Warning,
    /// Cap reached or the last-known-valid fallback was used.
    Degraded,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Warning => "warning",
            RunStatus::Degraded => "degraded",
        }
    }
}

/// Outcome of a single agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentOutcome {
    /// Analysis found issues and the backend produced a proposal.
    Success,
    /// Analysis was clean; the generative backend was never called.
    Skipped,
    /// The backend call failed; the buffer passed through unchanged.
    Failed(String),
}

impl AgentOutcome {
    /// Wire-format string (`success`, `skipped`, `failed:<reason>`).
    pub fn as_status_str(&self) -> String {
        match self {
            AgentOutcome::Success => "success".to_string(),
            AgentOutcome::Skipped => "skipped".to_string(),
            AgentOutcome::Failed(reason) => format!("failed:{}", reason),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AgentOutcome::Failed(_))
    }
}

/// Immutable record of one agent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: AgentKind,
    pub findings: Vec<String>,
    pub proposed_code: String,
    pub temperature_used: Option<f32>,
    pub duration_ms: u64,
    pub outcome: AgentOutcome,
}

impl AgentResult {
    /// Whether this result carries a real change relative to its input.
    pub fn is_distinct_proposal(&self, input: &str) -> bool {
        !self.outcome.is_failed() && self.proposed_code != input
    }
}

/// How severe a classified validation error is for the convergence gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Syntax or type failure. Must be fixed before success.
    Blocking,
    /// Formatter or linter failure. Tolerated in a warning end state.
    Style,
    /// Anything else (test failures, timeouts, unclassified tools).
    Other,
}

/// One classified validation failure, fed into the next corrective pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub tool: String,
    pub raw_message: String,
    pub kind: ErrorKind,
}

/// Overall verdict of a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Warning,
    Failed,
}

/// How a tool's exit was classified when building the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolClass {
    Syntax,
    Types,
    Lint,
    Format,
    Test,
}

impl ToolClass {
    /// Map a tool class to the error kind its failures produce.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            ToolClass::Syntax | ToolClass::Types => ErrorKind::Blocking,
            ToolClass::Lint | ToolClass::Format => ErrorKind::Style,
            ToolClass::Test => ErrorKind::Other,
        }
    }
}

/// Raw outcome of one tool invocation inside a validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReport {
    pub tool: String,
    pub class: ToolClass,
    /// None when the process was killed before exiting.
    pub exit_code: Option<i32>,
    pub output: String,
    /// Tool missing from PATH or not applicable - not a failure.
    pub skipped: bool,
    /// The tool ran past its deadline and was killed.
    pub timed_out: bool,
    pub passed: bool,
}

/// Cheap text metrics computed without external tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub total_lines: usize,
    pub non_blank_lines: usize,
    pub chars: usize,
    pub long_line_count: usize,
    pub consistent_indentation: bool,
}

/// Output of the validation gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub overall: Verdict,
    pub tool_reports: Vec<ToolReport>,
    pub metrics: CodeMetrics,
}

impl ValidationReport {
    /// Derive classified error records from the failing tool reports.
    pub fn error_records(&self) -> Vec<ErrorRecord> {
        self.tool_reports
            .iter()
            .filter(|report| !report.skipped && !report.passed)
            .map(|report| ErrorRecord {
                tool: report.tool.clone(),
                raw_message: report.output.clone(),
                // A timeout says nothing about the code itself
                kind: if report.timed_out {
                    ErrorKind::Other
                } else {
                    report.class.error_kind()
                },
            })
            .collect()
    }

    pub fn has_blocking_errors(&self) -> bool {
        self.error_records()
            .iter()
            .any(|record| record.kind == ErrorKind::Blocking)
    }
}

/// One convergence-loop pass, kept verbatim for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub errors_before: Vec<ErrorRecord>,
    pub code_before: String,
    pub code_after: String,
    pub report_after: ValidationReport,
}

/// Timestamped audit-log entry for a stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub at: DateTime<Utc>,
    pub stage: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<Box<IterationRecord>>,
}

impl HistoryEvent {
    pub fn new(stage: &str, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            stage: stage.to_string(),
            message: message.into(),
            iteration: None,
        }
    }

    pub fn iteration(record: IterationRecord) -> Self {
        Self {
            at: Utc::now(),
            stage: "iteration".to_string(),
            message: format!("convergence pass {}", record.iteration),
            iteration: Some(Box::new(record)),
        }
    }
}

/// The single mutable context threaded through every stage.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub original_code: String,
    /// The only code buffer. Single writer at any instant.
    pub current_code: String,
    /// Most recent buffer content that passed the basic parse check.
    pub last_valid_code: Option<String>,
    pub language: Language,
    pub selected_agents: Vec<AgentKind>,
    pub executed_agents: HashSet<AgentKind>,
    pub agent_results: Vec<AgentResult>,
    pub temperature_overrides: HashMap<AgentKind, f32>,
    pub iteration_count: u32,
    pub last_errors: Vec<ErrorRecord>,
    pub status: PipelineStatus,
    pub history: Vec<HistoryEvent>,
}

impl PipelineState {
    pub fn new(code: String, language: Language, selected_agents: Vec<AgentKind>) -> Self {
        Self {
            original_code: code.clone(),
            current_code: code,
            last_valid_code: None,
            language,
            selected_agents,
            executed_agents: HashSet::new(),
            agent_results: Vec::new(),
            temperature_overrides: HashMap::new(),
            iteration_count: 0,
            last_errors: Vec::new(),
            status: PipelineStatus::Pending,
            history: Vec::new(),
        }
    }

    pub fn with_temperature_overrides(mut self, overrides: HashMap<AgentKind, f32>) -> Self {
        self.temperature_overrides = overrides;
        self
    }

    pub fn record(&mut self, stage: &str, message: impl Into<String>) {
        self.history.push(HistoryEvent::new(stage, message));
    }

    /// Remember the current buffer as parse-valid.
    pub fn mark_buffer_valid(&mut self) {
        self.last_valid_code = Some(self.current_code.clone());
    }
}

/// What `run_pipeline` hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub final_code: String,
    pub status: RunStatus,
    pub agent_results: Vec<AgentResult>,
    pub validation_history: Vec<ValidationReport>,
    pub history: Vec<HistoryEvent>,
    pub iterations: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(tool: &str, class: ToolClass, passed: bool) -> ToolReport {
        ToolReport {
            tool: tool.to_string(),
            class,
            exit_code: Some(if passed { 0 } else { 1 }),
            output: format!("{} output", tool),
            skipped: false,
            timed_out: false,
            passed,
        }
    }

    #[test]
    fn test_error_records_skip_passing_and_skipped_tools() {
        let report = ValidationReport {
            overall: Verdict::Failed,
            tool_reports: vec![
                report_with("py_compile", ToolClass::Syntax, false),
                report_with("ruff", ToolClass::Lint, true),
                ToolReport {
                    tool: "mypy".to_string(),
                    class: ToolClass::Types,
                    exit_code: None,
                    output: String::new(),
                    skipped: true,
                    timed_out: false,
                    passed: false,
                },
            ],
            metrics: CodeMetrics::default(),
        };

        let records = report.error_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tool, "py_compile");
        assert_eq!(records[0].kind, ErrorKind::Blocking);
        assert!(report.has_blocking_errors());
    }

    #[test]
    fn test_classification_two_tier() {
        assert_eq!(ToolClass::Syntax.error_kind(), ErrorKind::Blocking);
        assert_eq!(ToolClass::Types.error_kind(), ErrorKind::Blocking);
        assert_eq!(ToolClass::Lint.error_kind(), ErrorKind::Style);
        assert_eq!(ToolClass::Format.error_kind(), ErrorKind::Style);
        assert_eq!(ToolClass::Test.error_kind(), ErrorKind::Other);
    }

    #[test]
    fn test_agent_outcome_status_str() {
        assert_eq!(AgentOutcome::Success.as_status_str(), "success");
        assert_eq!(
            AgentOutcome::Failed("timeout".to_string()).as_status_str(),
            "failed:timeout"
        );
    }

    #[test]
    fn test_failed_result_is_never_a_distinct_proposal() {
        let result = AgentResult {
            agent: AgentKind::Rename,
            findings: vec!["a".to_string()],
            proposed_code: "changed".to_string(),
            temperature_used: Some(0.1),
            duration_ms: 5,
            outcome: AgentOutcome::Failed("unreachable".to_string()),
        };
        assert!(!result.is_distinct_proposal("original"));
    }
}
