use std::sync::Arc;

use stockroom_agent::{AgentRuntime, ScriptedReasoner};
use stockroom_core::config::AppConfig;
use stockroom_core::inventory::InventoryOperations;
use stockroom_db::InMemoryInventoryStore;

use crate::bootstrap::build_runtime;

pub const USER: &str = "5f0c8d2e-7a41-4f0b-9d63-2b8e1c4a7f10";

pub fn runtime_with(reasoner: ScriptedReasoner) -> Arc<AgentRuntime> {
    let operations = InventoryOperations::new(Arc::new(InMemoryInventoryStore::new()));
    build_runtime(&AppConfig::default(), operations, Arc::new(reasoner)).expect("runtime")
}
