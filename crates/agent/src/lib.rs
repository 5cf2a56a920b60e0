//! Conversation orchestration for Washline.
//!
//! This crate is the brain of the SMS booking flow:
//!
//! 1. **Context assembly** (`prompt`) - behavioral prompt + bounded history
//! 2. **Model access** (`llm`) - chat-completions client behind `LlmClient`
//! 3. **Guarded tool execution** (`guard`, `tools`, `executors`) - the seven
//!    business-data tools, bounded to two executions per turn with duplicate
//!    calls rejected
//! 4. **Turn orchestration** (`engine`) - two-pass completion pipeline,
//!    reply-based state derivation, fallback reply on any failure
//!
//! # Safety principle
//!
//! The model never writes business data directly and never gets to invent
//! facts: prices, slots, and confirmations only enter a reply via a tool
//! result from this turn, and every failure surfaces as a structured result
//! the model must relay rather than paper over.

pub mod engine;
pub mod executors;
pub mod guard;
pub mod llm;
pub mod prompt;
pub mod tools;

pub use engine::{
    DialogueEngine, EngineOptions, TurnHandler, TurnOutcome, TurnRequest, FALLBACK_REPLY,
};
pub use executors::{registry_for_turn, ToolDeps};
pub use guard::{GuardVerdict, LoopGuard, MAX_CALLS_PER_TOOL, MAX_CALLS_PER_TURN};
pub use llm::{
    ChatMessage, Completion, CompletionRequest, LlmClient, LlmError, OpenAiChatClient, Role,
    ToolCallRequest, ToolSpec,
};
pub use tools::{Tool, ToolError, ToolRegistry};
