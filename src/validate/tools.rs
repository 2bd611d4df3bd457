//! Per-language catalog of static tools and auto-fixers.

use crate::language::Language;
use crate::state::ToolClass;
use std::path::Path;
use std::process::Command;

/// One external tool invocation the gateway knows how to run.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub class: ToolClass,
    pub program: &'static str,
    args: &'static [&'static str],
    /// Exit codes that mean "nothing to do", not failure
    /// (pytest exits 5 when no tests were collected).
    skip_exit_codes: &'static [i32],
    /// Some tools signal problems on stdout with a zero exit (gofmt -l).
    fail_on_output: bool,
    /// Wants the scratch dir passed via `--out-dir` (rustc).
    needs_out_dir: bool,
}

impl ToolSpec {
    const fn new(
        name: &'static str,
        class: ToolClass,
        program: &'static str,
        args: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            class,
            program,
            args,
            skip_exit_codes: &[],
            fail_on_output: false,
            needs_out_dir: false,
        }
    }

    /// Build the command for this tool against a file in the scratch dir.
    pub fn command(&self, scratch_dir: &Path, file: &Path) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.current_dir(scratch_dir);
        cmd.args(self.args);
        if self.needs_out_dir {
            cmd.arg("--out-dir").arg(scratch_dir);
        }
        cmd.arg(file);
        cmd
    }

    pub fn is_skip_exit(&self, code: Option<i32>) -> bool {
        code.is_some_and(|c| self.skip_exit_codes.contains(&c))
    }

    pub fn fails_on_output(&self) -> bool {
        self.fail_on_output
    }
}

/// Validation tools for a language, syntax first.
pub fn catalog(language: Language) -> Vec<ToolSpec> {
    match language {
        Language::Python => vec![
            ToolSpec::new("py_compile", ToolClass::Syntax, "python3", &["-m", "py_compile"]),
            ToolSpec::new("ruff", ToolClass::Lint, "ruff", &["check"]),
            ToolSpec::new("black", ToolClass::Format, "black", &["--check", "--quiet"]),
            ToolSpec::new(
                "mypy",
                ToolClass::Types,
                "mypy",
                &["--ignore-missing-imports", "--no-error-summary"],
            ),
            ToolSpec {
                skip_exit_codes: &[5],
                ..ToolSpec::new(
                    "pytest",
                    ToolClass::Test,
                    "pytest",
                    &["-q", "--disable-warnings", "--maxfail=1"],
                )
            },
        ],
        Language::JavaScript => vec![ToolSpec::new(
            "node_check",
            ToolClass::Syntax,
            "node",
            &["--check"],
        )],
        Language::TypeScript => vec![ToolSpec::new(
            "tsc",
            ToolClass::Types,
            "tsc",
            &["--noEmit", "--pretty", "false"],
        )],
        Language::Rust => vec![
            ToolSpec {
                needs_out_dir: true,
                ..ToolSpec::new(
                    "rustc",
                    ToolClass::Syntax,
                    "rustc",
                    &["--edition", "2021", "--crate-type", "lib", "--emit=metadata"],
                )
            },
            ToolSpec::new("rustfmt", ToolClass::Format, "rustfmt", &["--check"]),
        ],
        Language::Go => vec![
            ToolSpec::new("gofmt_syntax", ToolClass::Syntax, "gofmt", &["-e", "-l"]),
            ToolSpec {
                fail_on_output: true,
                ..ToolSpec::new("gofmt_style", ToolClass::Format, "gofmt", &["-l"])
            },
            ToolSpec::new("go_vet", ToolClass::Types, "go", &["vet"]),
        ],
    }
}

/// Deterministic write-mode fixers, cheapest first. These mutate the scratch
/// file in place; the gateway reads it back afterwards.
pub fn fixers(language: Language) -> Vec<ToolSpec> {
    match language {
        Language::Python => vec![
            ToolSpec::new("ruff_fix", ToolClass::Lint, "ruff", &["check", "--fix", "--quiet"]),
            ToolSpec::new("black_write", ToolClass::Format, "black", &["--quiet"]),
        ],
        Language::JavaScript | Language::TypeScript => Vec::new(),
        Language::Rust => vec![ToolSpec::new(
            "rustfmt_write",
            ToolClass::Format,
            "rustfmt",
            &["--edition", "2021"],
        )],
        Language::Go => vec![ToolSpec::new(
            "gofmt_write",
            ToolClass::Format,
            "gofmt",
            &["-w"],
        )],
    }
}

/// Whether a program resolves to an executable on PATH.
pub fn program_available_on_path(program: &str) -> bool {
    let program = program.trim();
    if program.is_empty() {
        return false;
    }
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(program);
        if !candidate.is_file() {
            continue;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(&candidate) {
                if meta.permissions().mode() & 0o111 != 0 {
                    return true;
                }
            }
        }
        #[cfg(not(unix))]
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_a_syntax_or_type_gate() {
        for language in [
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::Rust,
            Language::Go,
        ] {
            let has_blocking_gate = catalog(language)
                .iter()
                .any(|tool| matches!(tool.class, ToolClass::Syntax | ToolClass::Types));
            assert!(has_blocking_gate, "{:?} lacks a blocking gate", language);
        }
    }

    #[test]
    fn test_pytest_no_tests_collected_is_skippable() {
        let catalog = catalog(Language::Python);
        let pytest = catalog.iter().find(|tool| tool.name == "pytest").unwrap();
        assert!(pytest.is_skip_exit(Some(5)));
        assert!(!pytest.is_skip_exit(Some(1)));
        assert!(!pytest.is_skip_exit(None));
    }

    #[test]
    fn test_gofmt_style_fails_on_output() {
        let catalog = catalog(Language::Go);
        let style = catalog
            .iter()
            .find(|tool| tool.name == "gofmt_style")
            .unwrap();
        assert!(style.fails_on_output());
    }

    #[test]
    fn test_command_appends_target_file() {
        let spec = ToolSpec::new("ruff", ToolClass::Lint, "ruff", &["check"]);
        let cmd = spec.command(Path::new("/tmp/scratch"), Path::new("snippet.py"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args, vec!["check", "snippet.py"]);
    }

    #[test]
    fn test_program_availability_probe() {
        assert!(program_available_on_path("sh"));
        assert!(!program_available_on_path("definitely-not-a-real-binary-name"));
        assert!(!program_available_on_path(""));
    }
}
