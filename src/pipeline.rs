//! Pipeline entry point: sequence agents, merge, converge, report.

use crate::agents::{self, AgentKind};
use crate::backend::GenerativeBackend;
use crate::converge::{self, ConvergeOptions};
use crate::enrich::PromptEnricher;
use crate::language::Language;
use crate::merge::{self, MergeOutcome};
use crate::sequencer::{self, SequencingMode, Step};
use crate::state::{PipelineState, PipelineStatus, RunOutcome, RunStatus, Verdict};
use crate::syntax;
use std::collections::HashMap;

/// Caller-supplied configuration for one pipeline run.
///
/// An explicit value, not process-wide state: two concurrent runs with
/// different options cannot observe each other.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub auto_patch: bool,
    pub auto_test: bool,
    pub max_iterations: u32,
    pub sequencing: SequencingMode,
    pub temperature_overrides: HashMap<AgentKind, f32>,
    pub tool_timeout_ms: u64,
    pub backend_timeout_ms: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            auto_patch: true,
            auto_test: true,
            max_iterations: 3,
            sequencing: SequencingMode::default(),
            temperature_overrides: HashMap::new(),
            tool_timeout_ms: 30_000,
            backend_timeout_ms: 60_000,
        }
    }
}

fn converge_options(options: &PipelineOptions) -> ConvergeOptions {
    ConvergeOptions {
        max_iterations: options.max_iterations,
        tool_timeout_ms: options.tool_timeout_ms,
        backend_timeout_ms: options.backend_timeout_ms,
        auto_patch: options.auto_patch,
        auto_test: options.auto_test,
    }
}

/// Track the parse-valid watermark whenever the buffer changes.
fn note_buffer(state: &mut PipelineState) {
    if syntax::parse_ok(&state.current_code, state.language) {
        state.mark_buffer_valid();
    }
}

/// Run the full transformation pipeline over one code buffer.
///
/// Expected failures (backend down, tools missing, model nonsense) never
/// surface as `Err`; they degrade inside the run and show up in the returned
/// status and history. `Err` is reserved for caller mistakes (empty input)
/// and genuine programming errors.
pub async fn run_pipeline(
    code: &str,
    language: Language,
    selected_agents: Vec<AgentKind>,
    options: PipelineOptions,
    backend: &dyn GenerativeBackend,
    enricher: &dyn PromptEnricher,
) -> anyhow::Result<RunOutcome> {
    if code.trim().is_empty() {
        anyhow::bail!("input code must be non-empty");
    }

    let mut state = PipelineState::new(code.to_string(), language, selected_agents)
        .with_temperature_overrides(options.temperature_overrides.clone());
    note_buffer(&mut state);
    state.record(
        "start",
        format!(
            "pipeline started: {} agents, {:?} sequencing",
            state.selected_agents.len(),
            options.sequencing
        ),
    );
    tracing::info!(
        language = language.label(),
        agents = state.selected_agents.len(),
        "pipeline started"
    );

    // Agent phase: run each selected agent once, in caller order.
    let mut proposal_pairs: Vec<(String, String)> = Vec::new();
    loop {
        let agent = match sequencer::next_step(&state) {
            Step::Agent(agent) => agent,
            Step::Merge => break,
        };

        let input = match options.sequencing {
            SequencingMode::Chained => state.current_code.clone(),
            SequencingMode::Independent => state.original_code.clone(),
        };
        let temperature = state.temperature_overrides.get(&agent).copied();

        let result = agents::invoke(
            agent,
            &input,
            language,
            temperature,
            options.backend_timeout_ms,
            backend,
            enricher,
        )
        .await;

        state.record(
            "agent",
            format!(
                "{}: {} ({} findings, {}ms)",
                agent.label(),
                result.outcome.as_status_str(),
                result.findings.len(),
                result.duration_ms
            ),
        );

        if options.sequencing == SequencingMode::Chained {
            // Chain: the next agent sees this agent's output. A failed agent
            // proposes its own input, so the buffer is untouched.
            state.current_code = result.proposed_code.clone();
            note_buffer(&mut state);
        }
        proposal_pairs.push((input, result.proposed_code.clone()));
        state.executed_agents.insert(agent);
        state.agent_results.push(result);
    }

    // Merge phase: fold the distinct proposals into one candidate.
    let proposals = match options.sequencing {
        // The chained buffer already folds every change; the distinct set is
        // the buffer itself (when anything changed at all).
        SequencingMode::Chained => {
            if state.current_code != state.original_code {
                vec![state.current_code.clone()]
            } else {
                Vec::new()
            }
        }
        SequencingMode::Independent => merge::distinct_proposals(
            proposal_pairs
                .iter()
                .map(|(input, proposed)| (input.as_str(), proposed.as_str())),
        ),
    };

    let (merged, merge_outcome) = merge::merge(
        &state.original_code,
        &proposals,
        language,
        options.backend_timeout_ms,
        backend,
    )
    .await;
    state.current_code = merged;
    note_buffer(&mut state);
    match &merge_outcome {
        MergeOutcome::Original => state.record("merge", "no proposals, original kept"),
        MergeOutcome::SingleProposal => state.record("merge", "single proposal adopted verbatim"),
        MergeOutcome::Consolidated => {
            state.record("merge", format!("{} proposals consolidated", proposals.len()))
        }
        MergeOutcome::DegradedToNewest(err) => state.record(
            "merge",
            format!("consolidation failed ({}), newest proposal kept", err),
        ),
    }

    // Convergence loop: patch and re-validate until clean or capped.
    let validation_history = converge::run(&mut state, backend, &converge_options(&options)).await?;

    // The buffer handed back must parse; otherwise revert to the last
    // buffer that did.
    let mut fallback_used = false;
    if !syntax::parse_ok(&state.current_code, state.language) {
        if let Some(valid) = state.last_valid_code.clone() {
            state.record("finalize", "final buffer does not parse, reverting to last valid");
            tracing::warn!("final buffer unparseable, falling back to last valid buffer");
            state.current_code = valid;
            fallback_used = true;
        } else {
            // Nothing ever parsed - not even the input. Hand back the newest
            // buffer; the status below says how much to trust it.
            state.record("finalize", "no parse-valid buffer seen during this run");
            fallback_used = true;
        }
    }

    let status = final_status(&state, &validation_history, fallback_used);
    state.record("finalize", format!("pipeline finished: {}", status.label()));
    tracing::info!(
        status = status.label(),
        iterations = state.iteration_count,
        "pipeline finished"
    );

    Ok(RunOutcome {
        final_code: state.current_code,
        status,
        agent_results: state.agent_results,
        validation_history,
        history: state.history,
        iterations: state.iteration_count,
    })
}

fn final_status(
    state: &PipelineState,
    validation_history: &[crate::state::ValidationReport],
    fallback_used: bool,
) -> RunStatus {
    if fallback_used || state.status == PipelineStatus::MaxReached {
        return RunStatus::Degraded;
    }
    match validation_history.last() {
        Some(report) if report.overall == Verdict::Warning => RunStatus::Warning,
        Some(report) if report.overall == Verdict::Failed => RunStatus::Degraded,
        _ => RunStatus::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::NoEnrichment;
    use crate::testing::ScriptedBackend;

    fn options_without_validation() -> PipelineOptions {
        PipelineOptions {
            auto_patch: false,
            auto_test: false,
            ..PipelineOptions::default()
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let backend = ScriptedBackend::empty();
        let result = run_pipeline(
            "   \n",
            Language::Python,
            vec![AgentKind::Rename],
            PipelineOptions::default(),
            &backend,
            &NoEnrichment,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_clean_input_costs_zero_backend_calls() {
        let backend = ScriptedBackend::empty();
        let code = "import os\n\ndef fetch_home():\n    return os.environ.get(\"HOME\")\n";
        let outcome = run_pipeline(
            code,
            Language::Python,
            AgentKind::ALL.to_vec(),
            options_without_validation(),
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();

        assert_eq!(backend.calls(), 0);
        assert_eq!(outcome.final_code, code);
        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.agent_results.len(), AgentKind::ALL.len());
    }

    #[tokio::test]
    async fn test_agent_results_cover_every_invoked_agent() {
        let backend = ScriptedBackend::failing("offline");
        let outcome = run_pipeline(
            "a = 1\nb = 2\n",
            Language::Python,
            vec![AgentKind::Rename, AgentKind::Import],
            options_without_validation(),
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();

        assert_eq!(outcome.agent_results.len(), 2);
        // Rename had findings and failed; import had none and skipped
        assert!(outcome.agent_results[0].outcome.is_failed());
        assert_eq!(outcome.final_code, "a = 1\nb = 2\n");
    }

    #[tokio::test]
    async fn test_chained_agents_see_previous_output() {
        // Rename responds with renamed code that still contains the
        // duplicated import, then import responds with it removed.
        let backend = ScriptedBackend::with_responses(vec![
            "import os\nimport os\nfirst_value = 1\nsecond_value = 2\n".to_string(),
            "import os\nfirst_value = 1\nsecond_value = 2\n".to_string(),
        ]);
        let code = "import os\nimport os\na = 1\nb = 2\n";

        let outcome = run_pipeline(
            code,
            Language::Python,
            vec![AgentKind::Rename, AgentKind::Import],
            options_without_validation(),
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();

        assert_eq!(backend.calls(), 2);
        // The sanitizer trims the trailing newline when it normalizes output
        assert_eq!(
            outcome.final_code,
            "import os\nfirst_value = 1\nsecond_value = 2"
        );
        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.iterations, 0);
    }

    #[tokio::test]
    async fn test_independent_mode_consolidates_with_merge_call() {
        let backend = ScriptedBackend::with_responses(vec![
            // rename proposal
            "first = 1\nsecond = 2\nprint(first + second)\nprint(first + second)\n".to_string(),
            // duplication proposal
            "a = 1\nb = 2\nprint(a + b)\n".to_string(),
            // merge consolidation
            "first = 1\nsecond = 2\nprint(first + second)\n".to_string(),
        ]);
        let code = "a = 1\nb = 2\nprint(a + b)\nprint(a + b)\n";

        let outcome = run_pipeline(
            code,
            Language::Python,
            vec![AgentKind::Rename, AgentKind::Duplication],
            PipelineOptions {
                sequencing: SequencingMode::Independent,
                ..options_without_validation()
            },
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();

        assert_eq!(backend.calls(), 3);
        assert_eq!(
            outcome.final_code,
            "first = 1\nsecond = 2\nprint(first + second)"
        );
    }

    #[tokio::test]
    async fn test_unparseable_proposal_falls_back_to_last_valid() {
        // The only agent proposes garbage that still looks like code, so it
        // survives sanitization but fails the parse gate at finalization.
        let backend = ScriptedBackend::with_responses(vec![
            "def broken(:\n    return 1\n".to_string(),
        ]);
        let code = "a = 1\n";

        let outcome = run_pipeline(
            code,
            Language::Python,
            vec![AgentKind::Rename],
            options_without_validation(),
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();

        assert_eq!(outcome.final_code, code);
        assert_eq!(outcome.status, RunStatus::Degraded);
    }

    #[tokio::test]
    async fn test_history_records_start_and_finish() {
        let backend = ScriptedBackend::empty();
        let outcome = run_pipeline(
            "value = 1\nprint(value)\n",
            Language::Python,
            Vec::new(),
            options_without_validation(),
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();

        assert!(outcome.history.first().unwrap().stage == "start");
        assert!(outcome.history.last().unwrap().stage == "finalize");
    }
}
