//! Uniform invocation contract wrapping each transformation agent.
//!
//! `invoke` is the only way the pipeline talks to an agent: analyze, maybe
//! generate, always record. Backend failures are swallowed into the result
//! record - a failing agent is a no-op for the code buffer, visible only in
//! the audit trail.

use super::AgentKind;
use crate::backend::{clamp_temperature, GenerateRequest, GenerativeBackend};
use crate::enrich::{enrich_or_base, PromptEnricher};
use crate::language::Language;
use crate::prompts;
use crate::sanitize;
use crate::state::{AgentOutcome, AgentResult};
use std::time::Instant;

/// Invoke one agent against the current buffer.
///
/// When analysis yields no findings the generative backend is never called:
/// there is nothing to fix, and an unprompted model pass is pure risk.
pub async fn invoke(
    agent: AgentKind,
    code: &str,
    language: Language,
    temperature: Option<f32>,
    timeout_ms: u64,
    backend: &dyn GenerativeBackend,
    enricher: &dyn PromptEnricher,
) -> AgentResult {
    let start = Instant::now();
    let findings = agent.analyze(code, language);

    if findings.is_empty() {
        tracing::debug!(agent = agent.label(), "analysis clean, skipping generation");
        return AgentResult {
            agent,
            findings,
            proposed_code: code.to_string(),
            temperature_used: None,
            duration_ms: start.elapsed().as_millis() as u64,
            outcome: AgentOutcome::Skipped,
        };
    }

    let temperature = clamp_temperature(temperature.unwrap_or_else(|| agent.default_temperature()));
    let base_prompt = prompts::agent_system(agent, language);
    let system_prompt = enrich_or_base(enricher, &base_prompt, code, language);
    let user_prompt = prompts::agent_user(&findings, code);

    let request = GenerateRequest {
        system_prompt: &system_prompt,
        user_prompt: &user_prompt,
        temperature,
        timeout_ms,
    };

    match backend.generate(request).await {
        Ok(raw) => {
            let proposed = sanitize::extract_code(&raw, language);
            AgentResult {
                agent,
                findings,
                proposed_code: proposed,
                temperature_used: Some(temperature),
                duration_ms: start.elapsed().as_millis() as u64,
                outcome: AgentOutcome::Success,
            }
        }
        Err(err) => {
            tracing::warn!(agent = agent.label(), error = %err, "agent backend call failed");
            AgentResult {
                agent,
                findings,
                proposed_code: code.to_string(),
                temperature_used: Some(temperature),
                duration_ms: start.elapsed().as_millis() as u64,
                outcome: AgentOutcome::Failed(err.to_string()),
            }
        }
    }
}
