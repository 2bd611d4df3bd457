//! The bounded patch/test feedback loop.
//!
//! Each pass applies a corrective step and re-validates, classifying what
//! remains. Deterministic fixes always run before generative ones, the
//! iteration cap guarantees termination, and every pass lands in the audit
//! trail as an [`IterationRecord`].

use crate::backend::{GenerateRequest, GenerativeBackend};
use crate::prompts;
use crate::sanitize;
use crate::state::{
    ErrorKind, HistoryEvent, IterationRecord, PipelineState, PipelineStatus, ValidationReport,
    Verdict,
};
use crate::syntax;
use crate::validate::{self, ValidateOptions};

/// Near-zero temperature for repair calls - corrections, not creativity.
const REPAIR_TEMPERATURE: f32 = 0.05;

/// Knobs for the convergence loop.
#[derive(Debug, Clone)]
pub struct ConvergeOptions {
    /// Hard cap on patch iterations.
    pub max_iterations: u32,
    pub tool_timeout_ms: u64,
    pub backend_timeout_ms: u64,
    pub auto_patch: bool,
    pub auto_test: bool,
}

impl Default for ConvergeOptions {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            tool_timeout_ms: 30_000,
            backend_timeout_ms: 60_000,
            auto_patch: true,
            auto_test: true,
        }
    }
}

fn validate_options(options: &ConvergeOptions) -> ValidateOptions {
    ValidateOptions {
        tool_timeout_ms: options.tool_timeout_ms,
    }
}

/// Adopt a new buffer, tracking the parse-valid watermark.
fn adopt_buffer(state: &mut PipelineState, code: String) {
    state.current_code = code;
    if syntax::parse_ok(&state.current_code, state.language) {
        state.mark_buffer_valid();
    }
}

/// One corrective pass over the buffer.
///
/// Tier 1 is deterministic and always runs: sanitizer normalization plus
/// write-mode formatter/linter fixers. Tier 2 - the generative repair - runs
/// only when blocking or unclassified errors survived tier 1's cheap fixes.
async fn corrective_pass(
    state: &mut PipelineState,
    backend: &dyn GenerativeBackend,
    options: &ConvergeOptions,
) -> anyhow::Result<()> {
    let cleaned = sanitize::extract_code(&state.current_code, state.language);
    if cleaned != state.current_code {
        state.record("patch", "sanitizer normalized the buffer");
        adopt_buffer(state, cleaned);
    }

    let code = state.current_code.clone();
    let language = state.language;
    let vopts = validate_options(options);
    let fixed = tokio::task::spawn_blocking(move || {
        validate::apply_deterministic_fixes(&code, language, &vopts)
    })
    .await??;
    if let Some(fixed) = fixed {
        state.record("patch", "deterministic fixers rewrote the buffer");
        adopt_buffer(state, fixed);
    }

    let remaining: Vec<_> = state
        .last_errors
        .iter()
        .filter(|record| record.kind != ErrorKind::Style)
        .cloned()
        .collect();
    if remaining.is_empty() {
        return Ok(());
    }

    let system_prompt = prompts::repair_system(state.language);
    let user_prompt = prompts::repair_user(&remaining, &state.current_code);
    let request = GenerateRequest {
        system_prompt: &system_prompt,
        user_prompt: &user_prompt,
        temperature: REPAIR_TEMPERATURE,
        timeout_ms: options.backend_timeout_ms,
    };

    match backend.generate(request).await {
        Ok(raw) => {
            let extracted = sanitize::extract_code(&raw, state.language);
            if sanitize::looks_like_code(&extracted, state.language) {
                state.record("patch", format!("generative repair for {} errors", remaining.len()));
                adopt_buffer(state, extracted);
            } else {
                // Unusable output: keep the buffer, surface the miss
                tracing::warn!("repair output did not look like code, keeping buffer");
                state.record("patch", "repair output unusable, buffer kept");
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "repair backend call failed");
            state.record("patch", format!("repair call failed: {}", err));
        }
    }

    Ok(())
}

/// Drive the patch/test loop to a terminal status.
///
/// Returns the validation reports in order. Never returns `Err` for expected
/// failure classes - tool and backend problems degrade inside the loop.
pub async fn run(
    state: &mut PipelineState,
    backend: &dyn GenerativeBackend,
    options: &ConvergeOptions,
) -> anyhow::Result<Vec<ValidationReport>> {
    let mut reports = Vec::new();

    if !options.auto_test {
        // Nothing to converge against; one optional cleanup pass and out
        if options.auto_patch {
            corrective_pass(state, backend, options).await?;
            state.status = PipelineStatus::Patched;
        }
        state.status = PipelineStatus::Converged;
        return Ok(reports);
    }

    loop {
        let errors_before = state.last_errors.clone();
        let code_before = state.current_code.clone();

        if options.auto_patch {
            corrective_pass(state, backend, options).await?;
        }
        state.status = PipelineStatus::Patched;

        let code = state.current_code.clone();
        let language = state.language;
        let vopts = validate_options(options);
        let report =
            tokio::task::spawn_blocking(move || validate::validate(&code, language, &vopts))
                .await??;
        state.status = PipelineStatus::Tested;
        state.last_errors = report.error_records();
        state.history.push(HistoryEvent::iteration(IterationRecord {
            iteration: state.iteration_count,
            errors_before,
            code_before,
            code_after: state.current_code.clone(),
            report_after: report.clone(),
        }));
        reports.push(report.clone());

        let blocking_remains = report.has_blocking_errors();
        if report.overall != Verdict::Failed && !blocking_remains {
            state.status = PipelineStatus::Converged;
            state.record("converge", "no blocking errors remain");
            break;
        }

        if !options.auto_patch {
            // Re-validating unchanged code cannot change the verdict
            state.status = PipelineStatus::MaxReached;
            state.record("converge", "blocking errors remain and patching is disabled");
            break;
        }

        if state.iteration_count >= options.max_iterations {
            state.status = PipelineStatus::MaxReached;
            state.record(
                "converge",
                format!("iteration cap {} reached", options.max_iterations),
            );
            break;
        }

        state.iteration_count += 1;
        state.status = PipelineStatus::Pending;
        tracing::debug!(iteration = state.iteration_count, "re-entering convergence loop");
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::language::Language;
    use crate::testing::ScriptedBackend;

    fn options() -> ConvergeOptions {
        ConvergeOptions {
            // Keep external tools out of unit tests
            tool_timeout_ms: 10_000,
            ..ConvergeOptions::default()
        }
    }

    fn state_for(code: &str) -> PipelineState {
        PipelineState::new(code.to_string(), Language::Python, vec![AgentKind::Rename])
    }

    #[tokio::test]
    async fn test_no_test_mode_converges_immediately() {
        let backend = ScriptedBackend::empty();
        let mut state = state_for("value = 1\nprint(value)\n");
        let opts = ConvergeOptions {
            auto_test: false,
            auto_patch: false,
            ..options()
        };

        let reports = run(&mut state, &backend, &opts).await.unwrap();
        assert!(reports.is_empty());
        assert_eq!(state.status, PipelineStatus::Converged);
        assert_eq!(state.iteration_count, 0);
    }

    #[tokio::test]
    async fn test_iteration_count_never_exceeds_cap() {
        // A buffer no deterministic fix can save, and a backend that keeps
        // returning the same broken code
        let backend = ScriptedBackend::with_responses(vec![
            "def broken(:\n    pass\n".to_string(),
            "def broken(:\n    pass\n".to_string(),
            "def broken(:\n    pass\n".to_string(),
            "def broken(:\n    pass\n".to_string(),
        ]);
        let mut state = state_for("def broken(:\n    pass\n");
        let opts = ConvergeOptions {
            max_iterations: 2,
            ..options()
        };

        let reports = run(&mut state, &backend, &opts).await.unwrap();
        assert!(state.iteration_count <= 2);
        // One report per pass: initial + up to cap retries
        assert!(reports.len() <= 3);
        assert!(matches!(
            state.status,
            PipelineStatus::Converged | PipelineStatus::MaxReached
        ));
    }

    #[tokio::test]
    async fn test_iteration_records_land_in_history() {
        let backend = ScriptedBackend::with_responses(vec![String::new(); 4]);
        let mut state = state_for("value = 1\nprint(value)\n");
        let opts = ConvergeOptions {
            max_iterations: 1,
            ..options()
        };

        let _ = run(&mut state, &backend, &opts).await.unwrap();
        let iteration_events = state
            .history
            .iter()
            .filter(|event| event.iteration.is_some())
            .count();
        assert!(iteration_events >= 1);
        assert!(iteration_events as u32 <= opts.max_iterations + 1);
    }

    #[tokio::test]
    async fn test_sanitizer_normalization_runs_in_patch_tier() {
        let backend = ScriptedBackend::with_responses(vec![String::new(); 4]);
        let mut state = state_for("Here's the code:\n```python\nvalue = 1\nprint(value)\n```\n");
        let opts = ConvergeOptions {
            max_iterations: 1,
            ..options()
        };

        let _ = run(&mut state, &backend, &opts).await.unwrap();
        assert!(state.current_code.starts_with("value = 1"));
    }

    #[tokio::test]
    async fn test_repair_backend_failure_degrades_to_noop() {
        let backend = ScriptedBackend::failing("unreachable");
        let mut state = state_for("def broken(:\n    pass\n");
        let opts = ConvergeOptions {
            max_iterations: 1,
            ..options()
        };

        let result = run(&mut state, &backend, &opts).await;
        assert!(result.is_ok());
        assert!(matches!(
            state.status,
            PipelineStatus::Converged | PipelineStatus::MaxReached
        ));
    }
}
