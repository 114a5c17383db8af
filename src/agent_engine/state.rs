use serde::Serialize;

/// Lifecycle of one run. A fatal error leaves the loop through `Err` instead
/// of a state, so there is no failed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DriverState {
    Running,
    AwaitingResponse,
    Dispatching,
    Finished { reason: FinishReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The endpoint answered without requesting a tool.
    ContentOnly,
    /// `max_steps` ran out first.
    StepBudgetExhausted,
}

/// What `AgentEngine::run` hands back on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Latest non-empty assistant text, possibly from several steps back.
    pub answer: String,
    pub steps: usize,
    pub finish: FinishReason,
}

impl DriverState {
    pub fn is_finished(&self) -> bool {
        matches!(self, DriverState::Finished { .. })
    }
}
