//! Basic parse checking via tree-sitter.
//!
//! This is the cheapest possible "does it still parse" oracle. It backs the
//! last-known-valid-buffer fallback and never replaces the external tools:
//! a clean parse here says nothing about types, lint, or tests.

use crate::language::Language;
use std::cell::RefCell;
use tree_sitter::Parser;

// Tree-sitter parsers are expensive to create but reusable per language, so
// each thread keeps its own pre-configured set.

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // Ignored here - surfaces as a parse failure at call time
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });

    static JS_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_javascript::LANGUAGE.into());
        p
    });

    static TS_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into());
        p
    });

    static RUST_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_rust::LANGUAGE.into());
        p
    });

    static GO_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_go::LANGUAGE.into());
        p
    });
}

fn parse_with_pooled_parser(content: &str, language: Language) -> Option<tree_sitter::Tree> {
    match language {
        Language::Python => PYTHON_PARSER.with(|p| p.borrow_mut().parse(content, None)),
        Language::JavaScript => JS_PARSER.with(|p| p.borrow_mut().parse(content, None)),
        Language::TypeScript => TS_PARSER.with(|p| p.borrow_mut().parse(content, None)),
        Language::Rust => RUST_PARSER.with(|p| p.borrow_mut().parse(content, None)),
        Language::Go => GO_PARSER.with(|p| p.borrow_mut().parse(content, None)),
    }
}

/// Returns true when `content` parses without error nodes.
///
/// Empty or whitespace-only input is rejected: an empty buffer technically
/// parses, but it is never a valid replacement for real code.
pub fn parse_ok(content: &str, language: Language) -> bool {
    if content.trim().is_empty() {
        return false;
    }
    let Some(tree) = parse_with_pooled_parser(content, language) else {
        return false;
    };
    let root = tree.root_node();
    !root.has_error()
}
