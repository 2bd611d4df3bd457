//! burnish - agentic code cleanup that always hands back parseable code.
//!
//! A set of transformation agents, each pairing a deterministic issue
//! detector with a generative proposal step, runs in sequence over a shared
//! code buffer. Free-form model output is sanitized back into code, external
//! tools judge the result, and a bounded patch/test loop repairs what they
//! flag. The pipeline never raises for expected failures: it degrades,
//! records, and returns the best buffer it saw.

pub mod agents;
pub mod backend;
pub mod config;
pub mod converge;
pub mod enrich;
pub mod language;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;
pub mod sequencer;
pub mod state;
pub mod syntax;
pub mod testing;
pub mod validate;

pub use agents::AgentKind;
pub use backend::{BackendError, GenerativeBackend, OpenRouterBackend};
pub use enrich::{NoEnrichment, PromptEnricher};
pub use language::Language;
pub use pipeline::{run_pipeline, PipelineOptions};
pub use sequencer::SequencingMode;
pub use state::{
    AgentOutcome, AgentResult, ErrorKind, ErrorRecord, RunOutcome, RunStatus, ValidationReport,
    Verdict,
};
