//! End-to-end pipeline runs over the scripted backend.
//!
//! External tools are disabled (`auto_test: false`) so these runs behave the
//! same on any host; the validation gateway has its own coverage.

use burnish::testing::ScriptedBackend;
use burnish::{
    pipeline, AgentKind, Language, NoEnrichment, PipelineOptions, RunStatus, SequencingMode,
};

fn offline_options() -> PipelineOptions {
    PipelineOptions {
        auto_patch: false,
        auto_test: false,
        ..PipelineOptions::default()
    }
}

const MESSY_CODE: &str = "import os\nimport os\na = 1\nb = 2\nprint(a + b)\n";

/// Rename flags the one-letter names, import flags the duplicate; after
/// chaining, the buffer has neither and the run is a clean success.
#[tokio::test]
async fn rename_then_import_chain_cleans_both_smells() {
    let backend = ScriptedBackend::with_responses(vec![
        "import os\nimport os\nfirst = 1\nsecond = 2\nprint(first + second)\n".to_string(),
        "Here's the cleaned version:\n```python\nimport os\nfirst = 1\nsecond = 2\nprint(first + second)\n```".to_string(),
    ]);

    let outcome = pipeline::run_pipeline(
        MESSY_CODE,
        Language::Python,
        vec![AgentKind::Rename, AgentKind::Import],
        offline_options(),
        &backend,
        &NoEnrichment,
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(backend.calls(), 2);
    assert_eq!(
        outcome.final_code,
        "import os\nfirst = 1\nsecond = 2\nprint(first + second)"
    );

    // Both executions are on the record, in selection order
    let agents: Vec<_> = outcome.agent_results.iter().map(|r| r.agent).collect();
    assert_eq!(agents, vec![AgentKind::Rename, AgentKind::Import]);
}

/// Identical selection plus identical scripted responses must give
/// identical output - routing has no hidden state.
#[tokio::test]
async fn repeated_runs_are_deterministic() {
    let mut finals = Vec::new();
    for _ in 0..2 {
        let backend = ScriptedBackend::with_responses(vec![
            "import os\nfirst = 1\nsecond = 2\nprint(first + second)\n".to_string(),
            "import os\nfirst = 1\nsecond = 2\nprint(first + second)\n".to_string(),
        ]);
        let outcome = pipeline::run_pipeline(
            MESSY_CODE,
            Language::Python,
            vec![AgentKind::Rename, AgentKind::Import],
            offline_options(),
            &backend,
            &NoEnrichment,
        )
        .await
        .unwrap();
        finals.push(outcome.final_code);
    }
    assert_eq!(finals[0], finals[1]);
}

/// A dead backend turns every finding-bearing agent into a recorded no-op;
/// the input passes through untouched and the caller still gets a code
/// buffer plus a full trail, never an error.
#[tokio::test]
async fn dead_backend_degrades_to_identity() {
    let backend = ScriptedBackend::failing("connection reset by peer");

    let outcome = pipeline::run_pipeline(
        MESSY_CODE,
        Language::Python,
        AgentKind::ALL.to_vec(),
        offline_options(),
        &backend,
        &NoEnrichment,
    )
    .await
    .unwrap();

    assert_eq!(outcome.final_code, MESSY_CODE);
    assert_eq!(outcome.agent_results.len(), AgentKind::ALL.len());
    for result in &outcome.agent_results {
        let status = result.outcome.as_status_str();
        assert!(
            status == "skipped" || status.starts_with("failed:"),
            "unexpected status {}",
            status
        );
    }
}

/// Independent sequencing: both agents see the original snapshot and the
/// merge stage consolidates their proposals with one extra call.
#[tokio::test]
async fn independent_mode_merges_proposals() {
    let backend = ScriptedBackend::with_responses(vec![
        "import os\nimport os\nfirst = 1\nsecond = 2\nprint(first + second)\n".to_string(),
        "import os\na = 1\nb = 2\nprint(a + b)\n".to_string(),
        "import os\nfirst = 1\nsecond = 2\nprint(first + second)\n".to_string(),
    ]);

    let outcome = pipeline::run_pipeline(
        MESSY_CODE,
        Language::Python,
        vec![AgentKind::Rename, AgentKind::Import],
        PipelineOptions {
            sequencing: SequencingMode::Independent,
            ..offline_options()
        },
        &backend,
        &NoEnrichment,
    )
    .await
    .unwrap();

    assert_eq!(backend.calls(), 3);
    assert_eq!(
        outcome.final_code,
        "import os\nfirst = 1\nsecond = 2\nprint(first + second)"
    );
}

/// The returned history always brackets the run: a start record first, the
/// finalize record last, agent steps in between.
#[tokio::test]
async fn history_is_a_complete_trail() {
    let backend = ScriptedBackend::failing("offline");

    let outcome = pipeline::run_pipeline(
        MESSY_CODE,
        Language::Python,
        vec![AgentKind::Rename],
        offline_options(),
        &backend,
        &NoEnrichment,
    )
    .await
    .unwrap();

    let stages: Vec<_> = outcome.history.iter().map(|e| e.stage.as_str()).collect();
    assert_eq!(stages.first(), Some(&"start"));
    assert_eq!(stages.last(), Some(&"finalize"));
    assert!(stages.contains(&"agent"));
    assert!(stages.contains(&"merge"));
}
