use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::agent_engine::conversation::Conversation;
use crate::agent_engine::loop_control::LoopController;
use crate::agent_engine::state::{DriverState, FinishReason, RunOutcome};
use crate::config::AgentConfig;
use crate::errors::PilotResult;
use crate::executor::actions::ActionExecutor;
use crate::executor::dispatcher::ToolRegistry;
use crate::executor::payload::ToolError;
use crate::llm::provider::ChatEndpoint;
use crate::llm::tools::load_builtin_tools;
use crate::llm::types::{ChatMessage, ToolDef};

/// Drives one task to completion: request, append, dispatch, repeat.
pub struct AgentEngine {
    endpoint: Arc<dyn ChatEndpoint>,
    executor: ActionExecutor,
    registry: ToolRegistry,
    tools: Vec<ToolDef>,
    max_steps: usize,
    step_delay: Duration,
    keep_last: usize,
    state: DriverState,
}

impl AgentEngine {
    pub fn new(
        endpoint: Arc<dyn ChatEndpoint>,
        executor: ActionExecutor,
        agent: &AgentConfig,
        keep_last: usize,
    ) -> PilotResult<Self> {
        Ok(Self {
            endpoint,
            executor,
            registry: ToolRegistry::builtin(),
            tools: load_builtin_tools()?,
            max_steps: agent.max_steps,
            step_delay: agent.step_delay(),
            keep_last,
            state: DriverState::Running,
        })
    }

    /// Replaces the handler set. The advertised schema stays the built-in one.
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Runs `task` until the endpoint answers without a tool call or the step
    /// budget runs out. Any `Err` aborts the run.
    pub async fn run(&mut self, system_prompt: &str, task: &str) -> PilotResult<RunOutcome> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.drive(system_prompt, task).instrument(span).await
    }

    async fn drive(&mut self, system_prompt: &str, task: &str) -> PilotResult<RunOutcome> {
        let mut conversation = Conversation::new(system_prompt, task);
        let mut loop_ctrl = LoopController::new(self.max_steps);
        let mut answer = String::new();
        self.transition(DriverState::Running);
        tracing::info!(
            endpoint = self.endpoint.name(),
            max_steps = self.max_steps,
            "run started"
        );

        while !loop_ctrl.should_stop() {
            let step = loop_ctrl.record_step();

            self.transition(DriverState::AwaitingResponse);
            let reply = {
                let view = conversation.compacted(self.keep_last);
                tracing::debug!(step, turns = view.len(), "requesting completion");
                self.endpoint.complete(&view, &self.tools).await?
            };

            if let Some(text) = reply.text().filter(|t| !t.is_empty()) {
                answer = text.to_string();
            }
            let calls = reply.tool_calls().to_vec();
            conversation.push(ChatMessage::Assistant(reply));

            let Some((first, extra)) = calls.split_first() else {
                tracing::info!(step, "content-only response");
                return Ok(self.finish(answer, step, FinishReason::ContentOnly));
            };

            self.transition(DriverState::Dispatching);
            for call in extra {
                tracing::warn!(step, call_id = %call.id, tool = %call.function.name, "extra tool call refused");
                conversation.push(ChatMessage::tool(
                    &call.id,
                    &call.function.name,
                    ToolError::too_many_tool_calls().to_envelope(),
                ));
            }

            tracing::info!(step, call_id = %first.id, tool = %first.function.name, "dispatching");
            let outcome = self.registry.dispatch(first, &mut self.executor).await?;
            conversation.push(ChatMessage::tool(
                &first.id,
                &first.function.name,
                outcome.envelope,
            ));
            if let Some(png) = outcome.image {
                conversation.push(ChatMessage::screenshot(&png));
            }
            self.transition(DriverState::Running);

            if !loop_ctrl.should_stop() && !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        tracing::warn!(steps = loop_ctrl.steps(), "step budget exhausted");
        Ok(self.finish(answer, loop_ctrl.steps(), FinishReason::StepBudgetExhausted))
    }

    fn finish(&mut self, answer: String, steps: usize, finish: FinishReason) -> RunOutcome {
        self.transition(DriverState::Finished { reason: finish });
        RunOutcome {
            answer,
            steps,
            finish,
        }
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "state");
            self.state = next;
        }
    }
}
