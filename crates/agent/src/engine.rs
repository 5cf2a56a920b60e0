use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use washline_core::domain::conversation::{
    BookingOutcome, ConversationId, ConversationState, Message, TenantId,
};
use washline_core::flows::StateClassifier;
use washline_db::repositories::ConversationRepository;

use crate::executors::{registry_for_turn, ToolDeps};
use crate::guard::{LoopGuard, MAX_CALLS_PER_TURN};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError, ToolCallRequest};
use crate::prompt::assemble_context;
use crate::tools::ToolError;

/// The reply sent when anything in a turn fails. Delivered verbatim to the
/// customer, so it has to stand on its own.
pub const FALLBACK_REPLY: &str =
    "Oops! Something went wrong on our end. Can you try that again? If it keeps happening, we'll have someone reach out.";

const NO_CONTENT_REPLY: &str = "I'm here to help! What do you need?";
const NO_CONTENT_AFTER_TOOLS_REPLY: &str = "Got it! What else can I help with?";

/// Everything one turn needs: who is talking, what they said, and what we
/// already know about the thread.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub tenant_id: TenantId,
    pub customer_phone: String,
    pub body: String,
    pub history: Vec<Message>,
    pub conversation_id: Option<ConversationId>,
    pub current_state: Option<ConversationState>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub new_state: Option<ConversationState>,
    pub tools_invoked: Vec<String>,
}

/// The seam the transport layer drives. `DialogueEngine` is the real
/// implementation; tests and the webhook handler's tests substitute stubs.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle_turn(&self, request: TurnRequest) -> TurnOutcome;
}

#[derive(Debug, Error)]
enum EngineError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

#[derive(Clone, Copy, Debug)]
pub struct EngineOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 150 }
    }
}

/// Drives one model conversation turn: tool-enabled completion, guarded tool
/// execution, tool-free reply completion, state derivation, persistence.
pub struct DialogueEngine {
    llm: Arc<dyn LlmClient>,
    tools: ToolDeps,
    conversations: Arc<dyn ConversationRepository>,
    classifier: Arc<dyn StateClassifier>,
    options: EngineOptions,
}

impl DialogueEngine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolDeps,
        conversations: Arc<dyn ConversationRepository>,
        classifier: Arc<dyn StateClassifier>,
        options: EngineOptions,
    ) -> Self {
        Self { llm, tools, conversations, classifier, options }
    }

    async fn run_turn(&self, request: &TurnRequest) -> Result<TurnOutcome, EngineError> {
        let current_state = request.current_state.unwrap_or_default();
        let mut context = assemble_context(&request.history, current_state, &request.body);

        let registry =
            registry_for_turn(&self.tools, &request.tenant_id, &request.customer_phone);

        let first = self
            .llm
            .complete(CompletionRequest {
                messages: context.clone(),
                tools: registry.specs(),
                temperature: self.options.temperature,
                max_tokens: self.options.max_tokens,
            })
            .await?;

        let mut tools_invoked: Vec<String> = Vec::new();
        let mut booking_confirmed = false;

        let reply = if first.tool_calls.is_empty() {
            non_empty(first.content, NO_CONTENT_REPLY)
        } else {
            // The per-turn ceiling applies to the completion's request list
            // too: anything past the first two is dropped unseen.
            let mut guard = LoopGuard::new();
            let mut executed: Vec<(ToolCallRequest, Value)> = Vec::new();

            for call in first.tool_calls.into_iter().take(MAX_CALLS_PER_TURN) {
                let verdict = guard.admit(&call.name, &call.arguments);
                if !verdict.is_execute() {
                    warn!(
                        event_name = "agent.turn.tool_call_skipped",
                        tool = %call.name,
                        reason = verdict.reason(),
                        "loop guard skipped a requested tool call"
                    );
                    continue;
                }

                let result = match registry.get(&call.name) {
                    Some(tool) => match tool.execute(call.arguments.clone()).await {
                        Ok(result) => {
                            tools_invoked.push(call.name.clone());
                            result
                        }
                        Err(tool_error) => {
                            warn!(
                                event_name = "agent.turn.tool_arguments_rejected",
                                tool = %call.name,
                                error = %tool_error,
                                "tool rejected the model's arguments"
                            );
                            json!({"error": tool_error.to_string()})
                        }
                    },
                    None => {
                        warn!(
                            event_name = "agent.turn.unknown_tool_requested",
                            tool = %call.name,
                            "model requested a tool that does not exist"
                        );
                        json!({"error": "Unknown tool"})
                    }
                };

                if call.name == "create_booking" && result["success"] == json!(true) {
                    booking_confirmed = true;
                }
                info!(
                    event_name = "agent.turn.tool_executed",
                    tool = %call.name,
                    "tool call processed"
                );
                executed.push((call, result));
            }

            if !executed.is_empty() {
                context.push(ChatMessage::assistant_tool_calls(
                    executed.iter().map(|(call, _)| call.clone()).collect(),
                ));
                for (call, result) in &executed {
                    context.push(ChatMessage::tool_result(call.id.clone(), result));
                }
            }

            let second = self
                .llm
                .complete(CompletionRequest {
                    messages: context,
                    tools: Vec::new(),
                    temperature: self.options.temperature,
                    max_tokens: self.options.max_tokens,
                })
                .await?;
            non_empty(second.content, NO_CONTENT_AFTER_TOOLS_REPLY)
        };

        let new_state = self.classifier.classify(&reply, current_state);
        self.persist_turn_results(request, new_state, booking_confirmed).await;

        Ok(TurnOutcome { reply, new_state: Some(new_state), tools_invoked })
    }

    /// State and outcome writes happen before the reply is returned, but a
    /// failed write must never block delivery: log and move on.
    async fn persist_turn_results(
        &self,
        request: &TurnRequest,
        new_state: ConversationState,
        booking_confirmed: bool,
    ) {
        let Some(conversation_id) = &request.conversation_id else {
            return;
        };

        if let Err(persist_error) = self.conversations.update_state(conversation_id, new_state).await
        {
            warn!(
                event_name = "agent.turn.state_persist_failed",
                conversation_id = %conversation_id.0,
                state = new_state.as_str(),
                error = %persist_error,
                "conversation state was not persisted"
            );
        }

        if booking_confirmed {
            if let Err(persist_error) =
                self.conversations.record_outcome(conversation_id, BookingOutcome::Booked).await
            {
                warn!(
                    event_name = "agent.turn.outcome_persist_failed",
                    conversation_id = %conversation_id.0,
                    error = %persist_error,
                    "booking outcome was not persisted"
                );
            }
        }
    }
}

fn non_empty(content: Option<String>, fallback: &str) -> String {
    match content {
        Some(text) if !text.trim().is_empty() => text,
        _ => fallback.to_string(),
    }
}

#[async_trait]
impl TurnHandler for DialogueEngine {
    async fn handle_turn(&self, request: TurnRequest) -> TurnOutcome {
        match self.run_turn(&request).await {
            Ok(outcome) => outcome,
            Err(turn_error) => {
                error!(
                    event_name = "agent.turn.failed",
                    tenant_id = %request.tenant_id.0,
                    error = %turn_error,
                    "turn failed, sending fallback reply"
                );
                TurnOutcome {
                    reply: FALLBACK_REPLY.to_string(),
                    new_state: None,
                    tools_invoked: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use washline_core::domain::conversation::{
        BookingOutcome, ConversationState, ConversationThread, TenantId,
    };
    use washline_core::domain::service::{ServiceId, ServiceOffering, ServiceType};
    use washline_core::flows::HeuristicStateClassifier;
    use washline_db::repositories::{
        ConversationRepository, InMemoryAppointmentRepository, InMemoryCatalogRepository,
        InMemoryConversationRepository, InMemoryCustomerRepository,
    };

    use crate::executors::ToolDeps;
    use crate::llm::{Completion, LlmError, Role, ScriptedLlmClient, ToolCallRequest};

    use super::{
        DialogueEngine, EngineOptions, TurnHandler, TurnRequest, FALLBACK_REPLY,
    };

    const PHONE: &str = "+14165550100";

    fn tenant() -> TenantId {
        TenantId("tenant-test".to_string())
    }

    struct Harness {
        engine: DialogueEngine,
        llm: Arc<ScriptedLlmClient>,
        conversations: Arc<InMemoryConversationRepository>,
        catalog: Arc<InMemoryCatalogRepository>,
        appointments: Arc<InMemoryAppointmentRepository>,
    }

    fn harness(script: Vec<Result<Completion, LlmError>>) -> Harness {
        let llm = Arc::new(ScriptedLlmClient::new(script));
        let conversations = Arc::new(InMemoryConversationRepository::default());
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        let appointments = Arc::new(InMemoryAppointmentRepository::default());
        let deps = ToolDeps {
            customers: Arc::new(InMemoryCustomerRepository::default()),
            catalog: catalog.clone(),
            appointments: appointments.clone(),
        };
        let engine = DialogueEngine::new(
            llm.clone(),
            deps,
            conversations.clone(),
            Arc::new(HeuristicStateClassifier::new()),
            EngineOptions::default(),
        );
        Harness { engine, llm, conversations, catalog, appointments }
    }

    async fn open_thread(harness: &Harness) -> ConversationThread {
        let thread = ConversationThread::open(tenant(), PHONE, Utc::now());
        harness.conversations.insert(&thread).await.expect("insert thread");
        thread
    }

    fn request(thread: &ConversationThread, body: &str) -> TurnRequest {
        TurnRequest {
            tenant_id: tenant(),
            customer_phone: PHONE.to_string(),
            body: body.to_string(),
            history: Vec::new(),
            conversation_id: Some(thread.id.clone()),
            current_state: Some(thread.state),
        }
    }

    fn text(reply: &str) -> Result<Completion, LlmError> {
        Ok(Completion { content: Some(reply.to_string()), tool_calls: Vec::new() })
    }

    fn tool_calls(calls: Vec<(&str, &str, serde_json::Value)>) -> Result<Completion, LlmError> {
        Ok(Completion {
            content: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, arguments)| ToolCallRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                })
                .collect(),
        })
    }

    async fn seed_express(harness: &Harness) {
        harness
            .catalog
            .push_service(ServiceOffering {
                id: ServiceId(Uuid::new_v4()),
                tenant_id: tenant(),
                service_type: ServiceType::Express,
                service_name: "Express Service".to_string(),
                base_price: 20.0,
                price_per_load: 12.0,
                turnaround_hours: 24,
                active: true,
            })
            .await;
    }

    #[tokio::test]
    async fn plain_reply_needs_a_single_completion() {
        let harness = harness(vec![text("Hey there! How can I help today?")]);
        let thread = open_thread(&harness).await;

        let outcome = harness.engine.handle_turn(request(&thread, "hi")).await;

        assert_eq!(outcome.reply, "Hey there! How can I help today?");
        assert!(outcome.tools_invoked.is_empty());
        assert_eq!(outcome.new_state, Some(ConversationState::Greeting));
        assert_eq!(harness.llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn five_identical_tool_calls_execute_once() {
        let args = json!({"phone": PHONE});
        let calls: Vec<(&str, &str, serde_json::Value)> = vec![
            ("call_1", "lookup_customer", args.clone()),
            ("call_2", "lookup_customer", args.clone()),
            ("call_3", "lookup_customer", args.clone()),
            ("call_4", "lookup_customer", args.clone()),
            ("call_5", "lookup_customer", args.clone()),
        ];
        let harness = harness(vec![tool_calls(calls), text("Welcome back, Dana!")]);
        let thread = open_thread(&harness).await;

        let outcome = harness.engine.handle_turn(request(&thread, "hi again")).await;

        assert_eq!(outcome.tools_invoked, vec!["lookup_customer".to_string()]);

        // Exactly one tool result was folded into the reply pass.
        let requests = harness.llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        let tool_results =
            requests[1].messages.iter().filter(|message| message.role == Role::Tool).count();
        assert_eq!(tool_results, 1);
        assert!(requests[1].tools.is_empty(), "reply pass must not offer tools");
    }

    #[tokio::test]
    async fn at_most_two_requested_calls_are_considered() {
        let harness = harness(vec![
            tool_calls(vec![
                ("call_1", "lookup_customer", json!({"phone": PHONE})),
                ("call_2", "list_services", json!({})),
                ("call_3", "list_availability", json!({"date": "2025-06-02"})),
            ]),
            text("Here's what we offer!"),
        ]);
        let thread = open_thread(&harness).await;

        let outcome = harness.engine.handle_turn(request(&thread, "what do you have?")).await;

        assert_eq!(
            outcome.tools_invoked,
            vec!["lookup_customer".to_string(), "list_services".to_string()]
        );
    }

    #[tokio::test]
    async fn model_failure_produces_fallback_without_state_change() {
        let harness = harness(vec![Err(LlmError::EmptyResponse)]);
        let thread = open_thread(&harness).await;
        harness
            .conversations
            .update_state(&thread.id, ConversationState::SelectingTime)
            .await
            .expect("preset state");

        let outcome = harness.engine.handle_turn(request(&thread, "2pm please")).await;

        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(outcome.tools_invoked.is_empty());
        assert_eq!(outcome.new_state, None);
        let stored = harness.conversations.thread(&thread.id).await.expect("thread");
        assert_eq!(stored.state, ConversationState::SelectingTime);
    }

    #[tokio::test]
    async fn booking_turn_persists_exactly_one_priced_appointment() {
        let harness = harness(vec![
            tool_calls(vec![(
                "call_1",
                "create_booking",
                json!({
                    "customer_name": "Dana Moss",
                    "address": "123 Main St, Toronto M5V 2T6",
                    "service_type": "express",
                    "number_of_loads": 2,
                    "scheduled_date": "2025-06-02",
                    "scheduled_time": "11:00",
                }),
            )]),
            text("All set! We'll text you 30 min before arrival \u{2705}"),
        ]);
        seed_express(&harness).await;
        let thread = open_thread(&harness).await;

        let outcome = harness.engine.handle_turn(request(&thread, "yes, book it")).await;

        assert_eq!(outcome.tools_invoked, vec!["create_booking".to_string()]);
        assert_eq!(outcome.new_state, Some(ConversationState::Completed));

        let appointments = harness.appointments.all().await;
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].payment_amount, 44.0);

        // The priced total the customer could be quoted came from the tool
        // result itself, not from model invention.
        let requests = harness.llm.recorded_requests();
        let tool_result = requests[1]
            .messages
            .iter()
            .find(|message| message.role == Role::Tool)
            .and_then(|message| message.content.clone())
            .expect("tool result present");
        assert!(tool_result.contains("44"));

        let stored = harness.conversations.thread(&thread.id).await.expect("thread");
        assert_eq!(stored.booking_outcome, BookingOutcome::Booked);
        assert_eq!(stored.state, ConversationState::Completed);
    }

    #[tokio::test]
    async fn state_persistence_failure_does_not_block_the_reply() {
        let harness = harness(vec![text("Great! What's your address?")]);
        let thread = open_thread(&harness).await;
        harness.conversations.set_fail_state_updates(true);

        let outcome = harness.engine.handle_turn(request(&thread, "I need a pickup")).await;

        assert_eq!(outcome.reply, "Great! What's your address?");
        assert_eq!(outcome.new_state, Some(ConversationState::CollectingAddress));
    }

    #[tokio::test]
    async fn blank_model_content_still_yields_a_non_empty_reply() {
        let harness =
            harness(vec![Ok(Completion { content: Some("  ".to_string()), tool_calls: vec![] })]);
        let thread = open_thread(&harness).await;

        let outcome = harness.engine.handle_turn(request(&thread, "hello?")).await;

        assert!(!outcome.reply.trim().is_empty());
    }

    #[tokio::test]
    async fn booking_flow_walks_the_states_in_order() {
        let harness = harness(vec![
            text("Hey! Need a laundry pickup? What's your address?"),
            text("We serve that area! Regular, Express, or Premium?"),
            text("When works for pickup - 9am, 11am, 2pm or 4pm?"),
            text("2 loads on Monday at 11am - sound good?"),
        ]);
        let thread = open_thread(&harness).await;

        let expected = [
            ConversationState::CollectingAddress,
            ConversationState::SelectingService,
            ConversationState::SelectingTime,
            ConversationState::ConfirmingBooking,
        ];

        let inputs = ["hi", "123 Main St, Toronto M5V 2T6", "express, 2 loads", "11am"];
        for (input, expected_state) in inputs.iter().zip(expected) {
            let stored = harness.conversations.thread(&thread.id).await.expect("thread");
            let mut turn = request(&thread, input);
            turn.current_state = Some(stored.state);
            let outcome = harness.engine.handle_turn(turn).await;
            assert_eq!(outcome.new_state, Some(expected_state));

            let stored = harness.conversations.thread(&thread.id).await.expect("thread");
            assert_eq!(stored.state, expected_state);
        }
    }

    #[tokio::test]
    async fn classifier_tie_breaks_resolve_to_confirming_over_selecting() {
        // "sound good" and "Express" both appear; service mention outranks
        // confirmation in the documented priority order.
        let harness = harness(vec![text("Express for 2 loads. Sound good?")]);
        let thread = open_thread(&harness).await;

        let outcome = harness.engine.handle_turn(request(&thread, "express please")).await;
        assert_eq!(outcome.new_state, Some(ConversationState::SelectingService));
    }
}
