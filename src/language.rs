//! Supported source languages and their text-level traits.
//!
//! The sanitizer and the analyzers work on raw text, so each language carries
//! the keyword tables those heuristics need. Anything deeper than keywords is
//! delegated to tree-sitter (`syntax`) or external tools (`validate`).

use serde::{Deserialize, Serialize};

/// Languages the pipeline can validate and repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
}

impl Language {
    pub fn label(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Rust => "Rust",
            Language::Go => "Go",
        }
    }

    /// Parse a user-supplied language name (CLI flag, config value).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" => Some(Language::JavaScript),
            "typescript" | "ts" => Some(Language::TypeScript),
            "rust" | "rs" => Some(Language::Rust),
            "go" | "golang" => Some(Language::Go),
            _ => None,
        }
    }

    /// Guess the language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Rust => "rs",
            Language::Go => "go",
        }
    }

    /// Line prefixes that mark the start of real code for this language.
    ///
    /// Used by the sanitizer's line classifier. Deliberately loose: a false
    /// positive costs one stray line, a false negative drops real code.
    pub fn code_starters(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "import ", "from ", "def ", "class ", "@", "if ", "elif ", "else:", "for ",
                "while ", "with ", "try:", "except", "finally:", "return ", "yield ", "raise ",
                "assert ", "print(", "#", "\"\"\"", "'''",
            ],
            Language::JavaScript | Language::TypeScript => &[
                "import ", "export ", "const ", "let ", "var ", "function ", "class ", "if ",
                "else ", "for ", "while ", "switch ", "return ", "async ", "await ", "//", "/*",
            ],
            Language::Rust => &[
                "use ", "pub ", "fn ", "struct ", "enum ", "impl ", "trait ", "mod ", "let ",
                "const ", "static ", "match ", "if ", "else ", "for ", "while ", "loop ",
                "return ", "#[", "//", "/*",
            ],
            Language::Go => &[
                "package ", "import ", "func ", "type ", "var ", "const ", "if ", "else ",
                "for ", "switch ", "return ", "defer ", "go ", "//", "/*",
            ],
        }
    }

    /// Top-level declaration keywords used by the keyword-anchor fallback:
    /// the earliest occurrence of one of these marks where code plausibly
    /// begins inside otherwise free-form text.
    pub fn anchor_keywords(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["import ", "from ", "def ", "class "],
            Language::JavaScript | Language::TypeScript => {
                &["import ", "export ", "function ", "const ", "class "]
            }
            Language::Rust => &["use ", "fn ", "pub fn ", "struct ", "impl "],
            Language::Go => &["package ", "import ", "func ", "type "],
        }
    }

    /// The prefix that opens a function definition, for the long-function scan.
    pub fn function_keyword(&self) -> &'static str {
        match self {
            Language::Python => "def ",
            Language::JavaScript | Language::TypeScript => "function ",
            Language::Rust => "fn ",
            Language::Go => "func ",
        }
    }

    /// Branching keywords counted by the complexity scan.
    pub fn branch_keywords(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["if ", "elif ", "for ", "while ", "except", "and ", "or "],
            Language::JavaScript | Language::TypeScript => {
                &["if ", "else if", "for ", "while ", "case ", "catch", "&&", "||"]
            }
            Language::Rust => &["if ", "else if", "for ", "while ", "match ", "&&", "||"],
            Language::Go => &["if ", "for ", "switch ", "case ", "select ", "&&", "||"],
        }
    }
}
