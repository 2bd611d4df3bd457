//! Validation gateway: write the buffer to a scratch dir, run the tool
//! catalog against it, fold exit codes into a classified report.
//!
//! Tool runs are independent reads of the same immutable snapshot, so they
//! fan out on rayon; the join changes latency only, never the report.

pub mod runner;
pub mod tools;

use crate::language::Language;
use crate::state::{CodeMetrics, ToolClass, ToolReport, ValidationReport, Verdict};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub use runner::{run_command_with_timeout, CommandRunResult};

const SCRATCH_ROOT_DIR: &str = "burnish-scratch";

/// Lines longer than this count against the long-line metric.
const LONG_LINE_CHARS: usize = 120;

/// Cap on the output kept per tool report.
const MAX_TOOL_OUTPUT_CHARS: usize = 4_000;

/// Knobs for one validation pass.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub tool_timeout_ms: u64,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            tool_timeout_ms: 30_000,
        }
    }
}

/// Scratch directory scoped to one validation call.
///
/// Removed on drop, so every exit path - success, failure, panic - releases
/// the directory.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create() -> anyhow::Result<Self> {
        let path = std::env::temp_dir()
            .join(SCRATCH_ROOT_DIR)
            .join(sanitize_component(&Uuid::new_v4().to_string()));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write_snippet(&self, code: &str, language: Language) -> anyhow::Result<PathBuf> {
        let filename = format!("snippet.{}", language.file_extension());
        let file = self.path.join(&filename);
        std::fs::write(&file, code)?;
        Ok(PathBuf::from(filename))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

fn sanitize_component(input: &str) -> String {
    let cleaned = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect::<String>();
    if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    }
}

fn tail_chars(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

/// Cheap text metrics computed without any external tool.
pub fn compute_metrics(code: &str, language: Language) -> CodeMetrics {
    let lines: Vec<&str> = code.lines().collect();
    let non_blank: Vec<&&str> = lines.iter().filter(|line| !line.trim().is_empty()).collect();

    let long_line_count = lines
        .iter()
        .filter(|line| line.chars().count() > LONG_LINE_CHARS)
        .count();

    // Indentation consistency only means something in layout-sensitive code
    let consistent_indentation = if language == Language::Python {
        let mut indent_sizes = std::collections::HashSet::new();
        for line in &non_blank {
            let indent = line.len() - line.trim_start().len();
            if indent > 0 {
                indent_sizes.insert(indent % 4 == 0);
            }
        }
        !indent_sizes.contains(&false)
    } else {
        true
    };

    CodeMetrics {
        total_lines: lines.len(),
        non_blank_lines: non_blank.len(),
        chars: code.chars().count(),
        long_line_count,
        consistent_indentation,
    }
}

fn run_one_tool(
    spec: &tools::ToolSpec,
    scratch: &Path,
    file: &Path,
    timeout_ms: u64,
) -> ToolReport {
    if !tools::program_available_on_path(spec.program) {
        tracing::debug!(tool = spec.name, "tool unavailable, recording as skipped");
        return ToolReport {
            tool: spec.name.to_string(),
            class: spec.class,
            exit_code: None,
            output: format!("{} not found on PATH", spec.program),
            skipped: true,
            timed_out: false,
            passed: false,
        };
    }

    let mut cmd = spec.command(scratch, file);
    match run_command_with_timeout(&mut cmd, Duration::from_millis(timeout_ms)) {
        Ok(result) => {
            let output = tail_chars(&result.combined_output(), MAX_TOOL_OUTPUT_CHARS);
            if spec.is_skip_exit(result.exit_code()) {
                return ToolReport {
                    tool: spec.name.to_string(),
                    class: spec.class,
                    exit_code: result.exit_code(),
                    output,
                    skipped: true,
                    timed_out: false,
                    passed: false,
                };
            }
            let mut passed = result.success();
            if passed && spec.fails_on_output() && !result.stdout.trim().is_empty() {
                passed = false;
            }
            ToolReport {
                tool: spec.name.to_string(),
                class: spec.class,
                exit_code: result.exit_code(),
                output,
                skipped: false,
                timed_out: result.timed_out,
                passed,
            }
        }
        // Launch failures are environment problems, not code problems
        Err(err) => ToolReport {
            tool: spec.name.to_string(),
            class: spec.class,
            exit_code: None,
            output: err,
            skipped: true,
            timed_out: false,
            passed: false,
        },
    }
}

fn aggregate(tool_reports: Vec<ToolReport>, metrics: CodeMetrics) -> ValidationReport {
    let mut overall = Verdict::Success;
    for report in &tool_reports {
        if report.skipped || report.passed {
            continue;
        }
        match report.class {
            // Style failures never escalate past warning
            ToolClass::Lint | ToolClass::Format if !report.timed_out => {
                if overall == Verdict::Success {
                    overall = Verdict::Warning;
                }
            }
            _ => overall = Verdict::Failed,
        }
    }

    ValidationReport {
        overall,
        tool_reports,
        metrics,
    }
}

/// Validate a code buffer with every applicable external tool.
///
/// Unavailable tools are recorded as skipped; only the tools that actually
/// ran contribute to the verdict. Never returns an error for tool failures -
/// an unexpected filesystem problem is the only `Err` path.
pub fn validate(
    code: &str,
    language: Language,
    options: &ValidateOptions,
) -> anyhow::Result<ValidationReport> {
    let scratch = ScratchDir::create()?;
    let file = scratch.write_snippet(code, language)?;

    let specs = tools::catalog(language);
    let mut tool_reports: Vec<ToolReport> = specs
        .par_iter()
        .map(|spec| run_one_tool(spec, scratch.path(), &file, options.tool_timeout_ms))
        .collect();
    // par_iter preserves order, but keep the catalog order explicit anyway
    tool_reports.sort_by_key(|report| {
        specs
            .iter()
            .position(|spec| spec.name == report.tool)
            .unwrap_or(usize::MAX)
    });

    let metrics = compute_metrics(code, language);
    Ok(aggregate(tool_reports, metrics))
}

/// Run the deterministic write-mode fixers over the buffer.
///
/// Returns the fixed buffer when any tool ran and changed it; `None` means
/// nothing applicable ran or nothing changed. Failures inside individual
/// fixers are ignored - the generative repair tier picks up whatever is
/// left.
pub fn apply_deterministic_fixes(
    code: &str,
    language: Language,
    options: &ValidateOptions,
) -> anyhow::Result<Option<String>> {
    let fixer_specs = tools::fixers(language);
    if fixer_specs.is_empty() {
        return Ok(None);
    }

    let scratch = ScratchDir::create()?;
    let file = scratch.write_snippet(code, language)?;

    let mut any_ran = false;
    for spec in &fixer_specs {
        if !tools::program_available_on_path(spec.program) {
            continue;
        }
        let mut cmd = spec.command(scratch.path(), &file);
        match run_command_with_timeout(&mut cmd, Duration::from_millis(options.tool_timeout_ms)) {
            Ok(result) if result.success() => {
                any_ran = true;
            }
            Ok(result) => {
                tracing::debug!(
                    tool = spec.name,
                    exit = ?result.exit_code(),
                    "fixer did not complete cleanly"
                );
            }
            Err(err) => {
                tracing::debug!(tool = spec.name, error = %err, "fixer failed to launch");
            }
        }
    }

    if !any_ran {
        return Ok(None);
    }

    let fixed = std::fs::read_to_string(scratch.path().join(&file))?;
    if fixed == code {
        Ok(None)
    } else {
        Ok(Some(fixed))
    }
}
