//! Routing: which agent runs next, and when to move to merge.

use crate::agents::AgentKind;
use crate::state::PipelineState;
use serde::{Deserialize, Serialize};

/// How agents see the code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencingMode {
    /// Each agent operates on the cumulative output of all previous agents.
    #[default]
    Chained,
    /// Each agent proposes independently against the original snapshot;
    /// the merge stage consolidates.
    Independent,
}

/// The next pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Agent(AgentKind),
    Merge,
}

/// Stateless routing: the first selected agent not yet executed is next;
/// once all have run, move to merge.
///
/// Scanning in caller order makes the execution sequence a total order, so a
/// fixed selection list plus fixed model responses yields identical runs.
pub fn next_step(state: &PipelineState) -> Step {
    for agent in &state.selected_agents {
        if !state.executed_agents.contains(agent) {
            return Step::Agent(*agent);
        }
    }
    Step::Merge
}
