//! Folding agent proposals into one candidate code version.
//!
//! In chained mode the buffer already reflects every applied change and at
//! most one distinct proposal survives the filter, so merge reduces to its
//! identity cases and costs nothing. Independent mode is where the
//! consolidation call earns its keep.

use crate::backend::{GenerateRequest, GenerativeBackend};
use crate::language::Language;
use crate::prompts;
use crate::sanitize;

/// Low temperature for consolidation - precision over creativity.
const MERGE_TEMPERATURE: f32 = 0.2;

/// What the merge stage produced, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No distinct proposals; the original passes through verbatim.
    Original,
    /// Exactly one distinct proposal; returned verbatim, no backend call.
    SingleProposal,
    /// Multiple proposals consolidated by the backend.
    Consolidated,
    /// Backend consolidation failed; degraded to the newest proposal.
    DegradedToNewest(String),
}

/// Merge the original code with the distinct non-trivial proposals.
///
/// Identity contract: zero proposals yields the original unchanged, one
/// proposal yields that proposal verbatim. Both short-circuit before any
/// backend call, which also makes the stage idempotent.
pub async fn merge(
    original: &str,
    proposals: &[String],
    language: Language,
    timeout_ms: u64,
    backend: &dyn GenerativeBackend,
) -> (String, MergeOutcome) {
    match proposals {
        [] => (original.to_string(), MergeOutcome::Original),
        [only] => (only.clone(), MergeOutcome::SingleProposal),
        _ => {
            let system_prompt = prompts::merge_system(language);
            let user_prompt = prompts::merge_user(original, proposals);
            let request = GenerateRequest {
                system_prompt: &system_prompt,
                user_prompt: &user_prompt,
                temperature: MERGE_TEMPERATURE,
                timeout_ms,
            };

            match backend.generate(request).await {
                Ok(raw) => {
                    let merged = sanitize::extract_code(&raw, language);
                    (merged, MergeOutcome::Consolidated)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "merge consolidation failed, keeping newest proposal");
                    let newest = proposals
                        .last()
                        .cloned()
                        .unwrap_or_else(|| original.to_string());
                    (newest, MergeOutcome::DegradedToNewest(err.to_string()))
                }
            }
        }
    }
}

/// Filter agent proposals down to the distinct, non-trivial set: proposals
/// that differ from the code their agent received.
pub fn distinct_proposals<'a, I>(proposal_pairs: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut distinct: Vec<String> = Vec::new();
    for (input, proposed) in proposal_pairs {
        if proposed != input && !distinct.iter().any(|existing| existing == proposed) {
            distinct.push(proposed.to_string());
        }
    }
    distinct
}
