use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use stockroom_core::errors::{ApplicationError, DomainError};
use stockroom_core::inventory::InventoryOperations;

use crate::inventory_tools;
use crate::llm::ToolDefinition;
use crate::memory::SessionMemoryStore;

/// Everything a tool adapter may touch while executing one call.
pub struct ToolContext<'a> {
    pub session_id: &'a str,
    pub operations: &'a InventoryOperations,
    pub memory: &'a SessionMemoryStore,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Strict JSON object schema of the arguments.
    fn parameters(&self) -> Value;

    /// Runs the underlying operation and records its effect in session memory.
    /// Operation failures are returned untouched.
    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError>;
}

pub struct ToolCatalog {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
    operations: InventoryOperations,
    memory: Arc<SessionMemoryStore>,
}

impl ToolCatalog {
    pub fn new(operations: InventoryOperations, memory: Arc<SessionMemoryStore>) -> Self {
        Self { tools: BTreeMap::new(), operations, memory }
    }

    /// Catalog with every inventory tool registered.
    pub fn inventory(operations: InventoryOperations, memory: Arc<SessionMemoryStore>) -> Self {
        let mut catalog = Self::new(operations, memory);
        for tool in inventory_tools::all() {
            catalog.register(tool);
        }
        catalog
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn memory(&self) -> &Arc<SessionMemoryStore> {
        &self.memory
    }

    pub fn operations(&self) -> &InventoryOperations {
        &self.operations
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Dispatches one call by name. `raw_arguments` is the JSON text produced
    /// by the reasoning capability; the result is returned as JSON text.
    pub async fn invoke(
        &self,
        session_id: &str,
        name: &str,
        raw_arguments: &str,
    ) -> Result<String, ApplicationError> {
        let tool = self.tools.get(name).ok_or_else(|| {
            DomainError::InvalidAction(format!("unknown tool `{name}`"))
        })?;
        let arguments = parse_raw_arguments(name, raw_arguments)?;
        debug!(
            event_name = "agent.tool.arguments",
            session_id,
            tool = name,
            arguments = %arguments,
            "tool arguments decoded"
        );

        let context =
            ToolContext { session_id, operations: &self.operations, memory: self.memory.as_ref() };
        let result = tool.execute(&context, arguments).await?;
        info!(event_name = "agent.tool.completed", session_id, tool = name, "tool call completed");
        Ok(result.to_string())
    }
}

fn parse_raw_arguments(tool: &str, raw: &str) -> Result<Value, DomainError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(DomainError::InvalidAction(format!(
            "arguments for `{tool}` must be a JSON object, got {other}"
        ))),
        Err(error) => {
            Err(DomainError::InvalidAction(format!("arguments for `{tool}` are not JSON: {error}")))
        }
    }
}

/// Decodes an argument object into the tool's parameter record. Unknown or
/// mistyped fields are an `InvalidAction`.
pub fn decode_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: Value,
) -> Result<T, ApplicationError> {
    serde_json::from_value(arguments).map_err(|error| {
        DomainError::InvalidAction(format!("invalid arguments for `{tool}`: {error}")).into()
    })
}

pub fn encode_result<T: Serialize>(value: &T) -> Result<Value, ApplicationError> {
    serde_json::to_value(value)
        .map_err(|error| ApplicationError::Persistence(format!("failed to encode result: {error}")))
}

/// Null, absent and blank all mean "not supplied".
pub fn supplied(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

pub enum Param {
    Required(&'static str),
    Nullable(&'static str),
    OneOf(&'static [&'static str]),
}

/// Builds a strict object schema: every property is listed in `required`,
/// optional ones accept `null`.
pub fn object_schema(properties: &[(&'static str, Param, &'static str)]) -> Value {
    let mut schema_properties = Map::new();
    let mut required = Vec::with_capacity(properties.len());
    for (name, param, description) in properties {
        let property = match param {
            Param::Required(kind) => json!({ "type": kind, "description": description }),
            Param::Nullable(kind) => json!({ "type": [kind, "null"], "description": description }),
            Param::OneOf(values) => {
                json!({ "type": "string", "enum": values, "description": description })
            }
        };
        schema_properties.insert((*name).to_string(), property);
        required.push(Value::String((*name).to_string()));
    }

    json!({
        "type": "object",
        "properties": schema_properties,
        "required": required,
        "additionalProperties": false,
    })
}
