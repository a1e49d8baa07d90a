//! Agent runtime - conversational orchestration over inventory operations
//!
//! This crate turns a chat message into validated inventory operations and a
//! final answer:
//! - Keeps short-lived per-session memory (recent turns plus a "current focus")
//! - Exposes the data access operations as strictly-typed tools
//! - Drives the reasoning capability through a bounded tool-calling loop
//!
//! # Architecture
//!
//! One turn moves through a fixed state machine (`turn`):
//! 1. **Received** - the user message is recorded in `memory`
//! 2. **Prompt** (`prompt`) - instructions plus the rendered session context
//! 3. **Reasoning** (`llm`, `openai`) - the model picks tools or answers
//! 4. **Tool dispatch** (`tools`, `inventory_tools`) - validated operations,
//!    whose effects are written back into session memory
//! 5. **Responded** - exactly once, also when the turn failed
//!
//! # Key Types
//!
//! - `AgentRuntime` - main orchestrator (see `runtime` module)
//! - `ReasoningEngine` - pluggable trait for the model behind the agent
//! - `ToolCatalog` - named tools with strict JSON schemas
//! - `SessionMemoryStore` - bounded conversational memory with idle eviction
//!
//! # Safety Principle
//!
//! The model only chooses which operation to call. Identifier checks, stock
//! arithmetic and persistence are deterministic and live in the core crate.

pub mod inventory_tools;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod prompt;
pub mod runtime;
pub mod tools;
pub mod turn;

pub use llm::{ReasoningEngine, ReasoningStep, ScriptedReasoner, ToolCall, ToolDefinition};
pub use memory::{ContextRecord, MemoryLimits, Role, SessionMemoryStore};
pub use openai::OpenAiCompatibleClient;
pub use runtime::{AgentRuntime, RuntimeSettings, TurnOutcome};
pub use tools::ToolCatalog;
