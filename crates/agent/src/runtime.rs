use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use stockroom_core::config::AgentConfig;
use stockroom_core::errors::{ApplicationError, DomainError};

use crate::llm::{ChatMessage, ReasoningEngine};
use crate::memory::{ContextPatch, Role, SessionMemoryStore};
use crate::prompt::{tag_user_message, PromptBuilder, PromptError};
use crate::tools::ToolCatalog;
use crate::turn::{TurnEvent, TurnMachine, TurnState};

const GENERIC_FAILURE: &str =
    "Sorry, I ran into a problem while processing your request. Please try again in a moment.";
const DEADLINE_FAILURE: &str =
    "That request took too long to complete, so I stopped working on it. Please try again.";
const UNSUPPORTED_ACTION: &str =
    "I could not carry out that request because it asked for an unsupported action. Please rephrase it and try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub max_tool_rounds: u32,
    pub turn_deadline: Option<Duration>,
}

impl From<&AgentConfig> for RuntimeSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            turn_deadline: (config.turn_deadline_secs > 0)
                .then(|| Duration::from_secs(config.turn_deadline_secs)),
        }
    }
}

/// Result of one turn. Failed turns still carry a user-facing `text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub text: String,
    pub succeeded: bool,
    pub error: Option<ApplicationError>,
    pub correlation_id: String,
    pub tool_rounds: u32,
}

impl TurnOutcome {
    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn retryable(&self) -> bool {
        self.error.as_ref().is_some_and(ApplicationError::is_retryable)
    }
}

pub struct AgentRuntime {
    reasoner: Arc<dyn ReasoningEngine>,
    catalog: Arc<ToolCatalog>,
    prompts: PromptBuilder,
    settings: RuntimeSettings,
}

impl AgentRuntime {
    pub fn new(
        reasoner: Arc<dyn ReasoningEngine>,
        catalog: Arc<ToolCatalog>,
        settings: RuntimeSettings,
    ) -> Result<Self, PromptError> {
        Ok(Self { reasoner, catalog, prompts: PromptBuilder::new()?, settings })
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn memory(&self) -> &Arc<SessionMemoryStore> {
        self.catalog.memory()
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.settings
    }

    pub fn reasoner_name(&self) -> &str {
        self.reasoner.name()
    }

    pub async fn submit_message(&self, session_id: &str, text: &str) -> TurnOutcome {
        self.submit_message_with_deadline(session_id, text, self.settings.turn_deadline).await
    }

    /// Runs one turn to `Responded`. A `deadline` overrides the configured one;
    /// when it elapses the turn ends with a retryable failure.
    pub async fn submit_message_with_deadline(
        &self,
        session_id: &str,
        text: &str,
        deadline: Option<Duration>,
    ) -> TurnOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let mut machine = TurnMachine::new();
        info!(
            event_name = "agent.turn.received",
            session_id,
            correlation_id = %correlation_id,
            "turn received"
        );
        debug!(event_name = "agent.turn.message", session_id, message = text, "user message");

        let memory = self.memory();
        memory.append_turn(session_id, Role::User, text).await;
        memory.update_context(session_id, ContextPatch::default().with_user(session_id)).await;

        let result = {
            let drive = self.drive(session_id, text, &mut machine, &correlation_id);
            match deadline {
                Some(limit) => tokio::time::timeout(limit, drive).await.unwrap_or_else(|_| {
                    Err(ApplicationError::DeadlineExceeded { after_secs: limit.as_secs() })
                }),
                None => drive.await,
            }
        };

        let (text, error) = match result {
            Ok(answer) => {
                advance(&mut machine, TurnEvent::FinalAnswerProduced, session_id, &correlation_id);
                (answer, None)
            }
            Err(error) => {
                warn!(
                    event_name = "agent.turn.failed",
                    session_id,
                    correlation_id = %correlation_id,
                    state = ?machine.state(),
                    retryable = error.is_retryable(),
                    error = %error,
                    "turn failed"
                );
                advance(&mut machine, TurnEvent::TurnFailed, session_id, &correlation_id);
                (failure_answer(&error), Some(error))
            }
        };

        memory.append_turn(session_id, Role::Assistant, text.clone()).await;
        info!(
            event_name = "agent.turn.responded",
            session_id,
            correlation_id = %correlation_id,
            succeeded = error.is_none(),
            tool_rounds = machine.tool_rounds(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn responded"
        );

        TurnOutcome {
            text,
            succeeded: error.is_none(),
            error,
            correlation_id,
            tool_rounds: machine.tool_rounds(),
        }
    }

    async fn drive(
        &self,
        session_id: &str,
        text: &str,
        machine: &mut TurnMachine,
        correlation_id: &str,
    ) -> Result<String, ApplicationError> {
        let rendered = self.memory().render_context(session_id).await;
        try_advance(machine, TurnEvent::MemoryLoaded, session_id, correlation_id)?;

        let system = self.prompts.system_prompt(&rendered, &self.catalog.names())?;
        let mut messages =
            vec![ChatMessage::system(system), ChatMessage::user(tag_user_message(session_id, text))];
        let tools = self.catalog.definitions();
        try_advance(machine, TurnEvent::PromptRendered, session_id, correlation_id)?;
        try_advance(machine, TurnEvent::ReasoningRequested, session_id, correlation_id)?;

        loop {
            let step = self.reasoner.reason(&messages, &tools).await?;

            if step.is_final() {
                return step
                    .content
                    .filter(|answer| !answer.trim().is_empty())
                    .ok_or_else(|| {
                        ApplicationError::Upstream(
                            "reasoning capability returned an empty answer".to_string(),
                        )
                    });
            }

            if machine.tool_rounds() >= self.settings.max_tool_rounds {
                return Err(ApplicationError::Upstream(format!(
                    "reasoning capability did not converge within {} tool rounds",
                    self.settings.max_tool_rounds
                )));
            }

            try_advance(machine, TurnEvent::ToolCallsSelected, session_id, correlation_id)?;
            messages.push(ChatMessage::assistant(
                step.content.unwrap_or_default(),
                step.tool_calls.clone(),
            ));
            for call in &step.tool_calls {
                info!(
                    event_name = "agent.tool.dispatched",
                    session_id,
                    correlation_id,
                    tool = %call.name,
                    call_id = %call.id,
                    "dispatching tool call"
                );
                let output = self.catalog.invoke(session_id, &call.name, &call.arguments).await?;
                debug!(event_name = "agent.tool.output", session_id, tool = %call.name, output = %output);
                messages.push(ChatMessage::tool_result(call.id.clone(), output));
            }
            try_advance(machine, TurnEvent::ToolResultsReturned, session_id, correlation_id)?;
        }
    }
}

fn try_advance(
    machine: &mut TurnMachine,
    event: TurnEvent,
    session_id: &str,
    correlation_id: &str,
) -> Result<TurnState, ApplicationError> {
    let outcome = machine
        .apply(event)
        .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
    debug!(
        event_name = "agent.turn.transition",
        session_id,
        correlation_id,
        from = ?outcome.from,
        to = ?outcome.to,
        event = ?outcome.event,
        "turn state changed"
    );
    Ok(outcome.to)
}

fn advance(machine: &mut TurnMachine, event: TurnEvent, session_id: &str, correlation_id: &str) {
    if let Err(error) = try_advance(machine, event, session_id, correlation_id) {
        warn!(event_name = "agent.turn.transition_rejected", session_id, error = %error);
    }
}

/// User-facing answer for a failed turn.
pub fn failure_answer(error: &ApplicationError) -> String {
    match error {
        ApplicationError::Domain(domain) if domain.is_user_correctable() => domain.to_string(),
        ApplicationError::Domain(DomainError::InvalidAction(_) | DomainError::InvalidReportType(_)) => {
            UNSUPPORTED_ACTION.to_string()
        }
        ApplicationError::DeadlineExceeded { .. } => DEADLINE_FAILURE.to_string(),
        _ => GENERIC_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stockroom_core::config::AgentConfig;
    use stockroom_core::domain::product::ProductId;
    use stockroom_core::errors::{ApplicationError, DomainError};

    use super::{failure_answer, RuntimeSettings};

    #[test]
    fn zero_deadline_disables_the_turn_timeout() {
        let settings =
            RuntimeSettings::from(&AgentConfig { max_tool_rounds: 4, turn_deadline_secs: 0 });
        assert_eq!(settings.turn_deadline, None);

        let settings =
            RuntimeSettings::from(&AgentConfig { max_tool_rounds: 4, turn_deadline_secs: 45 });
        assert_eq!(settings.turn_deadline, Some(Duration::from_secs(45)));
    }

    #[test]
    fn user_correctable_failures_are_answered_verbatim() {
        let error = ApplicationError::from(DomainError::InsufficientStock {
            product_id: ProductId::new(),
            current: 3,
            requested: -4,
            resulting: -1,
        });
        assert_eq!(failure_answer(&error), error.to_string());
    }

    #[test]
    fn upstream_and_deadline_failures_get_generic_answers() {
        let upstream = failure_answer(&ApplicationError::Upstream("connection refused".to_string()));
        assert!(!upstream.contains("connection refused"));
        assert!(upstream.starts_with("Sorry"));

        let deadline = failure_answer(&ApplicationError::DeadlineExceeded { after_secs: 5 });
        assert!(deadline.contains("too long"));

        let action = failure_answer(&ApplicationError::from(DomainError::InvalidAction(
            "unknown tool `drop_table`".to_string(),
        )));
        assert!(action.contains("unsupported action"));
    }
}
