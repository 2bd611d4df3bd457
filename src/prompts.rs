//! System prompts for agent, merge, and repair calls.

use crate::agents::AgentKind;
use crate::language::Language;
use crate::state::ErrorRecord;

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED BUILDING BLOCKS (used by multiple prompts to reduce duplication)
// ═══════════════════════════════════════════════════════════════════════════════

/// Code-only output rules - shared across every generation prompt.
///
/// Models ignore a single polite instruction far more often than an explicit
/// rule list, so this stays blunt and enumerated.
const CODE_ONLY_RULES: &str = r#"OUTPUT RULES:
- Return ONLY code. No explanations before or after.
- No "Here's", "Voici", "The code", or similar openers.
- No numbered lists, no bullet points.
- No markdown fences.
- The first line of your reply must already be code.
- Preserve behavior and public names unless the task says otherwise."#;

const MINIMAL_DIFF_RULES: &str = r#"SCOPE:
- Keep the change minimal and focused on the listed issues.
- Do not reformat untouched lines.
- Do not add features, comments, or docstrings."#;

// ═══════════════════════════════════════════════════════════════════════════════
// PROMPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Role-specific instruction for one transformation agent.
pub fn agent_system(agent: AgentKind, language: Language) -> String {
    let role = match agent {
        AgentKind::Rename => {
            "You rename cryptic identifiers to meaningful names. Every rename must be applied consistently at each use site."
        }
        AgentKind::Import => {
            "You clean up import sections: remove duplicated and unused imports, keep ordering conventional for the language."
        }
        AgentKind::Duplication => {
            "You factor out duplicated code into well-named helpers, preserving behavior exactly."
        }
        AgentKind::LongFunction => {
            "You split oversized functions into smaller, single-purpose ones with clear names."
        }
        AgentKind::Complexity => {
            "You reduce deeply-branched logic: flatten nesting, extract conditions, prefer early returns."
        }
    };

    format!(
        "You are a {language} refactoring agent. {role}\n\n{code_rules}\n\n{scope_rules}",
        language = language.label(),
        role = role,
        code_rules = CODE_ONLY_RULES,
        scope_rules = MINIMAL_DIFF_RULES,
    )
}

/// User prompt for an agent call: the findings, then the code itself.
pub fn agent_user(findings: &[String], code: &str) -> String {
    format!(
        "Issues detected:\n{findings}\n\nCODE:\n{code}",
        findings = findings
            .iter()
            .map(|finding| format!("- {}", finding))
            .collect::<Vec<_>>()
            .join("\n"),
        code = code,
    )
}

/// System prompt for the consolidation pass over multiple proposals.
pub fn merge_system(language: Language) -> String {
    format!(
        "You merge several proposed revisions of the same {language} file into one coherent version. \
Apply every non-conflicting change; when proposals conflict, prefer the one that keeps the code simplest.\n\n{code_rules}",
        language = language.label(),
        code_rules = CODE_ONLY_RULES,
    )
}

/// User prompt for the merge call: original first, proposals numbered after.
pub fn merge_user(original: &str, proposals: &[String]) -> String {
    let mut prompt = format!("ORIGINAL:\n{}\n", original);
    for (idx, proposal) in proposals.iter().enumerate() {
        prompt.push_str(&format!("\nPROPOSAL {}:\n{}\n", idx + 1, proposal));
    }
    prompt
}

/// System prompt for the convergence loop's generative repair pass.
pub fn repair_system(language: Language) -> String {
    format!(
        "You are a {language} syntax and error corrector. Fix exactly the reported errors and nothing else.\n\n{code_rules}",
        language = language.label(),
        code_rules = CODE_ONLY_RULES,
    )
}

/// User prompt for a repair call, listing the remaining classified errors.
pub fn repair_user(errors: &[ErrorRecord], code: &str) -> String {
    let error_lines = errors
        .iter()
        .map(|record| {
            let first_line = record
                .raw_message
                .lines()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("");
            format!("- [{}] {}", record.tool, first_line.trim())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Errors to fix:\n{errors}\n\nCODE:\n{code}",
        errors = error_lines,
        code = code,
    )
}
