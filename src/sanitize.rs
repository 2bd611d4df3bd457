//! Recovering usable code from free-form generated text.
//!
//! Model output may contain prose, numbered explanations, fenced code
//! blocks, or all three at once. `extract_code` applies a fixed chain of
//! heuristics and always returns something non-empty: a later validation
//! stage is better placed to reject a broken blob than this module is to
//! silently discard content.

use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

/// Candidates shorter than this are treated as extraction failures.
/// A single short import ("import os") must still survive.
const MIN_EXTRACT_LEN: usize = 5;

/// Minimum share of non-blank lines that must look like code.
///
/// A deliberately loose acceptance bar calibrated against free-form model
/// output. Tunable constant, not a contract.
const CODE_LINE_RATIO: f64 = 0.3;

/// Opening phrases that mark a line as commentary, not code.
/// The French entries match the phrasing some models fall back to.
const EXPLANATORY_PATTERNS: &[&str] = &[
    r"^here'?s?\s+",
    r"^voici\s+",
    r"^le code",
    r"^the code",
    r"^corrected",
    r"^corrig",
    r"^refactored",
    r"^improved",
    r"^\d+\.\s+",
    r"^[-*]\s+",
    r"^this\s+",
    r"^note:",
    r"^explanation",
    r"^i'?ve",
    r"^addresses",
    r"^sure[,!]",
    r"^certainly",
    r"^hope\s+",
];

fn explanatory_regexes() -> &'static Vec<Regex> {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        EXPLANATORY_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

fn is_explanatory(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    explanatory_regexes().iter().any(|re| re.is_match(&lower))
}

/// Whether a single line plausibly starts code in the given language.
fn line_is_code(line: &str, language: Language) -> bool {
    let stripped = line.trim();
    if stripped.is_empty() {
        return false;
    }

    if language
        .code_starters()
        .iter()
        .any(|starter| stripped.starts_with(starter))
    {
        return true;
    }

    static CONST_RE: OnceLock<Option<Regex>> = OnceLock::new();
    static ASSIGN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let const_re = CONST_RE.get_or_init(|| Regex::new(r"^[A-Z_][A-Z_0-9]*\s*=").ok());
    let assign_re = ASSIGN_RE.get_or_init(|| Regex::new(r"^[a-z_]\w*\s*[=(\.]").ok());

    if const_re.as_ref().is_some_and(|re| re.is_match(stripped)) {
        return true;
    }
    if assign_re.as_ref().is_some_and(|re| re.is_match(stripped)) {
        return true;
    }

    // Indented continuation lines count as code
    line.starts_with(' ') || line.starts_with('\t') || stripped.starts_with('}')
}

/// Whether a block of text reads as code rather than commentary.
///
/// The first non-blank line must pass the code-start heuristic and must not
/// open with a known commentary phrase; past that, at least
/// `CODE_LINE_RATIO` of non-blank lines must look like code.
pub fn looks_like_code(text: &str, language: Language) -> bool {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let Some(first) = lines.first() else {
        return false;
    };

    if is_explanatory(first) || !line_is_code(first, language) {
        return false;
    }

    let code_lines = lines
        .iter()
        .filter(|line| line_is_code(line, language))
        .count();
    (code_lines as f64 / lines.len() as f64) >= CODE_LINE_RATIO
}

/// Pass 1: walk lines, skip leading commentary, accumulate from the first
/// code line, stop again at trailing commentary.
fn extract_by_line_classification(raw: &str, language: Language) -> String {
    let mut code_lines: Vec<&str> = Vec::new();
    let mut code_started = false;

    for line in raw.lines() {
        let stripped = line.trim();

        if !code_started && stripped.is_empty() {
            continue;
        }

        // Fence delimiters and bare language tags are never content
        if matches!(
            stripped,
            "```python" | "```py" | "```js" | "```javascript" | "```typescript" | "```ts"
                | "```rust" | "```rs" | "```go" | "```" | "python" | "py"
        ) {
            continue;
        }

        if !code_started {
            if is_explanatory(stripped) {
                continue;
            }
            if line_is_code(line, language) {
                code_started = true;
                code_lines.push(line);
            }
        } else {
            // Trailing commentary marks the end of the code body
            if is_explanatory(stripped) {
                break;
            }
            code_lines.push(line);
        }
    }

    code_lines.join("\n").trim_end().to_string()
}

/// Pass 2: take the interior of the first fenced code block.
fn extract_fenced_block(raw: &str) -> Option<String> {
    static FENCE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = FENCE_RE
        .get_or_init(|| Regex::new(r"(?s)```[a-zA-Z]*\n(.*?)```").ok())
        .as_ref()?;
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Pass 3: everything from the first top-level declaration keyword onward.
fn extract_from_keyword_anchor(raw: &str, language: Language) -> Option<String> {
    let mut earliest: Option<usize> = None;
    for keyword in language.anchor_keywords() {
        if let Some(idx) = raw.find(keyword) {
            earliest = Some(earliest.map_or(idx, |cur| cur.min(idx)));
        }
    }
    earliest.map(|idx| raw[idx..].trim().to_string())
}

/// Pass 4: remove leading "N." / "N:" numbering artifacts.
fn strip_line_numbers(text: &str) -> String {
    static NUMBER_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = NUMBER_RE
        .get_or_init(|| Regex::new(r"(?m)^\d+[.:]\s*").ok())
        .as_ref()
    else {
        return text.to_string();
    };
    re.replace_all(text, "").to_string()
}

/// Recover pure code from arbitrary generated text.
///
/// Heuristics run in a fixed precedence order; the first candidate accepted
/// by [`looks_like_code`] wins. When everything fails, the raw text comes
/// back unmodified - passing an obviously-broken blob to the validator beats
/// silently discarding content.
pub fn extract_code(raw: &str, language: Language) -> String {
    let mut candidate = extract_by_line_classification(raw, language);

    if candidate.is_empty() || !looks_like_code(&candidate, language) {
        if let Some(fenced) = extract_fenced_block(raw) {
            if !fenced.is_empty() {
                candidate = fenced;
            }
        }
    }

    if candidate.is_empty() || !looks_like_code(&candidate, language) {
        if let Some(anchored) = extract_from_keyword_anchor(raw, language) {
            candidate = anchored;
        }
    }

    if !candidate.is_empty() {
        candidate = strip_line_numbers(&candidate);
    }

    if candidate.trim().is_empty() || candidate.len() < MIN_EXTRACT_LEN {
        tracing::debug!("code extraction fell back to raw text");
        return raw.to_string();
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_python_block() {
        let raw = "Here's the fix:\n```python\nimport os\n```\nHope this helps!";
        assert_eq!(extract_code(raw, Language::Python), "import os");
    }

    #[test]
    fn test_clean_code_is_untouched() {
        let code = "import os\n\ndef main():\n    return os.getcwd()";
        assert_eq!(extract_code(code, Language::Python), code);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let raw = "Sure, here you go:\n```python\ndef add(a, b):\n    return a + b\n```";
        let once = extract_code(raw, Language::Python);
        let twice = extract_code(&once, Language::Python);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_never_empty_for_nonempty_input() {
        for raw in [
            "I'm sorry, I can't help with that.",
            "1. First step\n2. Second step",
            "x",
        ] {
            assert!(!extract_code(raw, Language::Python).is_empty());
        }
    }

    #[test]
    fn test_strips_leading_prose_without_fences() {
        let raw = "Here's the improved version with better naming:\n\nimport sys\n\ndef total(values):\n    return sum(values)\n";
        let extracted = extract_code(raw, Language::Python);
        assert!(extracted.starts_with("import sys"));
        assert!(!extracted.to_lowercase().contains("here's"));
    }

    #[test]
    fn test_strips_trailing_commentary() {
        let raw = "def f():\n    return 1\n\nThis refactoring addresses the naming issue.";
        let extracted = extract_code(raw, Language::Python);
        assert!(extracted.contains("return 1"));
        assert!(!extracted.contains("addresses"));
    }

    #[test]
    fn test_strips_line_number_artifacts() {
        let raw = "1. import os\n2. import sys\n3. print(os.sep)";
        let extracted = extract_code(raw, Language::Python);
        assert!(extracted.contains("import os"));
        assert!(!extracted.contains("1."));
    }

    #[test]
    fn test_keyword_anchor_rescues_buried_code() {
        // No line starts as code, so the line classifier yields nothing and
        // the keyword anchor takes over mid-line.
        let raw = "We should add import os somewhere sensible near the top.";
        let extracted = extract_code(raw, Language::Python);
        assert!(extracted.starts_with("import os"));
    }

    #[test]
    fn test_give_up_fallback_returns_raw() {
        let raw = "No code here at all, just a short refusal sentence.";
        assert_eq!(extract_code(raw, Language::Python), raw);
    }

    #[test]
    fn test_looks_like_code_rejects_prose_opener() {
        assert!(!looks_like_code(
            "Here's what I changed:\nimport os",
            Language::Python
        ));
        assert!(looks_like_code("import os\nimport sys", Language::Python));
    }

    #[test]
    fn test_looks_like_code_ratio_bar() {
        // One code line out of four non-blank lines is below the 30% bar
        let text = "import os\nalpha beta gamma\ndelta epsilon\nzeta eta theta";
        assert!(!looks_like_code(text, Language::Python));
    }

    #[test]
    fn test_rust_and_go_starters() {
        let rust_raw = "Here is the idiomatic version:\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```";
        assert!(extract_code(rust_raw, Language::Rust).starts_with("fn main()"));

        let go_raw = "Voici le code:\npackage main\n\nfunc main() {}\n";
        assert!(extract_code(go_raw, Language::Go).starts_with("package main"));
    }
}
