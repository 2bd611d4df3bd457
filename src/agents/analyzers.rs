//! Deterministic issue detectors, one per agent.
//!
//! These are pattern scans, not analyses: cheap, reproducible, and
//! intentionally conservative. They decide whether the generative step runs
//! at all, so a false negative costs one missed cleanup while a false
//! positive costs a model call.

use crate::language::Language;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

/// Functions longer than this are flagged by the long-function scan.
const LONG_FUNCTION_LINES: usize = 20;

/// Branch-keyword count above which a function is flagged as complex.
const COMPLEXITY_THRESHOLD: usize = 10;

/// Duplicated lines shorter than this are ignored (closing braces, `else:`).
const MIN_DUPLICATE_LINE_LEN: usize = 8;

/// Detect single-letter variable names bound by assignment.
pub fn find_short_names(code: &str) -> Vec<String> {
    static SHORT_NAME_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = SHORT_NAME_RE
        .get_or_init(|| Regex::new(r"(?m)^\s*(?:let\s+|var\s+|const\s+)?([a-z])\s*:?=").ok())
        .as_ref()
    else {
        return Vec::new();
    };

    let mut names = BTreeSet::new();
    for caps in re.captures_iter(code) {
        if let Some(name) = caps.get(1) {
            names.insert(name.as_str().to_string());
        }
    }
    names
        .into_iter()
        .map(|name| format!("single-letter variable '{}'", name))
        .collect()
}

/// Detect import statements that appear more than once.
pub fn find_duplicate_imports(code: &str, language: Language) -> Vec<String> {
    let import_prefixes: &[&str] = match language {
        Language::Python => &["import ", "from "],
        Language::JavaScript | Language::TypeScript => &["import ", "const "],
        Language::Rust => &["use "],
        Language::Go => &["import "],
    };

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for line in code.lines() {
        let stripped = line.trim();
        if !import_prefixes
            .iter()
            .any(|prefix| stripped.starts_with(prefix))
        {
            continue;
        }
        if !seen.insert(stripped.to_string()) && !duplicates.contains(&stripped.to_string()) {
            duplicates.push(stripped.to_string());
        }
    }
    duplicates
        .into_iter()
        .map(|import| format!("duplicated import: {}", import))
        .collect()
}

/// Detect non-trivial lines repeated verbatim.
pub fn find_duplicate_lines(code: &str) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in code.lines() {
        let stripped = line.trim();
        if stripped.len() < MIN_DUPLICATE_LINE_LEN {
            continue;
        }
        // Imports repeat legitimately across refactors; the import agent owns those
        if stripped.starts_with("import ") || stripped.starts_with("from ") {
            continue;
        }
        *counts.entry(stripped).or_insert(0) += 1;
    }

    let mut duplicated: Vec<&str> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(line, _)| line)
        .collect();
    duplicated.sort_unstable();
    duplicated
        .into_iter()
        .map(|line| format!("duplicated line: {}", line))
        .collect()
}

/// Line-counted function bodies, language-aware only at the keyword level.
fn function_spans(code: &str, language: Language) -> Vec<(String, usize)> {
    let keyword = language.function_keyword();
    let lines: Vec<&str> = code.lines().collect();
    let mut spans = Vec::new();

    let mut idx = 0;
    while idx < lines.len() {
        let stripped = lines[idx].trim_start();
        let is_def = stripped.starts_with(keyword)
            || (language == Language::Rust && stripped.starts_with("pub fn "))
            || (matches!(language, Language::JavaScript | Language::TypeScript)
                && stripped.starts_with("async function "));
        if !is_def {
            idx += 1;
            continue;
        }

        let name = stripped
            .split(keyword)
            .nth(1)
            .unwrap_or("")
            .split(['(', ' ', '<', '{'])
            .next()
            .unwrap_or("")
            .to_string();
        let indent = lines[idx].len() - lines[idx].trim_start().len();

        // Body extends until the next line at the same or lower indent level
        let mut end = idx + 1;
        while end < lines.len() {
            let line = lines[end];
            if !line.trim().is_empty() {
                let line_indent = line.len() - line.trim_start().len();
                if line_indent <= indent && end > idx + 1 {
                    break;
                }
            }
            end += 1;
        }

        spans.push((name, end - idx));
        idx = end;
    }

    spans
}

/// Detect functions longer than the length budget.
pub fn find_long_functions(code: &str, language: Language) -> Vec<String> {
    function_spans(code, language)
        .into_iter()
        .filter(|(name, len)| !name.is_empty() && *len > LONG_FUNCTION_LINES)
        .map(|(name, len)| format!("function '{}' spans {} lines", name, len))
        .collect()
}

/// Detect functions whose branch-keyword count crosses the threshold.
pub fn find_complex_functions(code: &str, language: Language) -> Vec<String> {
    fn flush(finished: Option<(String, usize)>, results: &mut Vec<String>) {
        if let Some((name, branches)) = finished {
            if branches > COMPLEXITY_THRESHOLD {
                results.push(format!("function '{}' has {} branch points", name, branches));
            }
        }
    }

    let keyword = language.function_keyword();
    let branch_keywords = language.branch_keywords();

    let mut results = Vec::new();
    let mut current: Option<(String, usize)> = None;
    let mut current_indent = 0;

    for line in code.lines() {
        let stripped = line.trim_start();
        let indent = line.len() - stripped.len();

        if stripped.starts_with(keyword) {
            flush(current.take(), &mut results);
            let name = stripped
                .split(keyword)
                .nth(1)
                .unwrap_or("")
                .split(['(', ' ', '<', '{'])
                .next()
                .unwrap_or("")
                .to_string();
            current = Some((name, 0));
            current_indent = indent;
            continue;
        }

        if current.is_none() {
            continue;
        }

        // Falling back to the definition's indent level ends the body in
        // indentation-scoped languages
        let dedented = !stripped.is_empty() && indent <= current_indent && !stripped.starts_with('}');
        if dedented && language == Language::Python {
            flush(current.take(), &mut results);
            continue;
        }

        if let Some((_, branches)) = current.as_mut() {
            *branches += branch_keywords
                .iter()
                .filter(|kw| stripped.contains(*kw))
                .count();
        }
    }

    flush(current, &mut results);
    results
}
