//! Optional prompt enrichment (retrieval context, project conventions).
//!
//! Enrichment is strictly best-effort: the hook may consult an index, a
//! retrieval service, or nothing at all, and any failure degrades to the
//! base prompt. The pipeline never blocks or fails on this path.

use crate::language::Language;

/// Hook for injecting extra context into an agent's system prompt.
pub trait PromptEnricher: Send + Sync {
    fn enrich(&self, base_prompt: &str, code: &str, language: Language) -> anyhow::Result<String>;
}

/// Default enricher: passes the base prompt through untouched.
pub struct NoEnrichment;

impl PromptEnricher for NoEnrichment {
    fn enrich(&self, base_prompt: &str, _code: &str, _language: Language) -> anyhow::Result<String> {
        Ok(base_prompt.to_string())
    }
}

/// Apply an enricher, falling back to the base prompt on any failure.
pub fn enrich_or_base(
    enricher: &dyn PromptEnricher,
    base_prompt: &str,
    code: &str,
    language: Language,
) -> String {
    match enricher.enrich(base_prompt, code, language) {
        Ok(enriched) if !enriched.trim().is_empty() => enriched,
        Ok(_) => base_prompt.to_string(),
        Err(err) => {
            tracing::debug!("prompt enrichment skipped: {}", err);
            base_prompt.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEnricher;

    impl PromptEnricher for FailingEnricher {
        fn enrich(&self, _base: &str, _code: &str, _language: Language) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("retrieval index unavailable"))
        }
    }

    struct SuffixEnricher;

    impl PromptEnricher for SuffixEnricher {
        fn enrich(&self, base: &str, _code: &str, _language: Language) -> anyhow::Result<String> {
            Ok(format!("{}\n\nPROJECT CONTEXT:\nuses snake_case", base))
        }
    }

    #[test]
    fn test_failure_degrades_to_base_prompt() {
        let out = enrich_or_base(&FailingEnricher, "base", "code", Language::Python);
        assert_eq!(out, "base");
    }

    #[test]
    fn test_successful_enrichment_is_used() {
        let out = enrich_or_base(&SuffixEnricher, "base", "code", Language::Python);
        assert!(out.starts_with("base"));
        assert!(out.contains("PROJECT CONTEXT"));
    }

    #[test]
    fn test_empty_enrichment_falls_back() {
        struct EmptyEnricher;
        impl PromptEnricher for EmptyEnricher {
            fn enrich(
                &self,
                _base: &str,
                _code: &str,
                _language: Language,
            ) -> anyhow::Result<String> {
                Ok("   ".to_string())
            }
        }
        let out = enrich_or_base(&EmptyEnricher, "base", "code", Language::Python);
        assert_eq!(out, "base");
    }
}
