use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;

use stockroom_agent::llm::{ChatMessage, LlmError, MessageRole};
use stockroom_agent::{
    AgentRuntime, ReasoningEngine, ReasoningStep, Role, RuntimeSettings, ScriptedReasoner,
    SessionMemoryStore, ToolCall, ToolCatalog, ToolDefinition,
};
use stockroom_core::errors::{ApplicationError, DomainError};
use stockroom_core::inventory::{InventoryOperations, NewProductRequest, ProductQuery};
use stockroom_db::InMemoryInventoryStore;

const SESSION: &str = "9c5b94b1-35ad-49bb-b118-8e8fc24abf80";

struct Harness {
    operations: InventoryOperations,
    memory: Arc<SessionMemoryStore>,
    catalog: Arc<ToolCatalog>,
}

impl Harness {
    fn new() -> Self {
        let operations = InventoryOperations::new(Arc::new(InMemoryInventoryStore::new()));
        let memory = Arc::new(SessionMemoryStore::default());
        let catalog = Arc::new(ToolCatalog::inventory(operations.clone(), memory.clone()));
        Self { operations, memory, catalog }
    }

    fn runtime(&self, reasoner: Arc<dyn ReasoningEngine>, settings: RuntimeSettings) -> AgentRuntime {
        AgentRuntime::new(reasoner, self.catalog.clone(), settings).expect("runtime")
    }

    async fn seed_widget(&self) {
        self.operations
            .create_product(NewProductRequest {
                name: "Widget".to_string(),
                description: None,
                price: Decimal::new(499, 2),
                stock_quantity: 3,
                min_stock_level: Some(5),
                category: Some("Hardware".to_string()),
                barcode: None,
                user_id: SESSION.to_string(),
            })
            .await
            .expect("seed widget");
    }

    async fn widget_stock(&self) -> i32 {
        let products = self
            .operations
            .list_products(ProductQuery { search: Some("Widget".to_string()), ..Default::default() })
            .await
            .expect("list");
        products[0].stock_quantity
    }
}

fn settings() -> RuntimeSettings {
    RuntimeSettings { max_tool_rounds: 8, turn_deadline: Some(Duration::from_secs(5)) }
}

fn call(id: &str, name: &str, arguments: serde_json::Value) -> ReasoningStep {
    ReasoningStep::call(vec![ToolCall::new(id, name, arguments)])
}

fn search_widget() -> ReasoningStep {
    call("call-1", "get_products", json!({ "category": null, "lowStock": null, "search": "Widget" }))
}

fn restock_current(quantity: i32) -> ReasoningStep {
    call(
        "call-2",
        "update_stock",
        json!({
            "productId": null,
            "quantity": quantity,
            "movementType": "purchase",
            "notes": "restock",
            "userId": SESSION,
        }),
    )
}

#[tokio::test]
async fn search_then_update_without_product_id_restocks_the_remembered_product() {
    let harness = Harness::new();
    harness.seed_widget().await;
    let reasoner = Arc::new(ScriptedReasoner::new([
        search_widget(),
        restock_current(10),
        ReasoningStep::answer("Widget restocked: 3 -> 13."),
    ]));
    let runtime = harness.runtime(reasoner.clone(), settings());

    let outcome = runtime.submit_message(SESSION, "add 10 widgets").await;

    assert!(outcome.succeeded, "{:?}", outcome.error);
    assert_eq!(outcome.text, "Widget restocked: 3 -> 13.");
    assert_eq!(outcome.tool_rounds, 2);
    assert_eq!(harness.widget_stock().await, 13);

    let context = harness.memory.context(SESSION).await;
    assert_eq!(context.current_product.map(|product| product.stock_quantity), Some(13));
    assert_eq!(context.user_id.as_deref(), Some(SESSION));

    let requests = reasoner.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0][0].role, MessageRole::System);
    assert_eq!(requests[0][1].content, format!("[USER_ID: {SESSION}] add 10 widgets"));
    let last = requests[2].last().expect("tool result");
    assert_eq!(last.role, MessageRole::Tool);
    assert_eq!(last.tool_call_id.as_deref(), Some("call-2"));
    assert!(last.content.contains("\"new_stock\":13"));
}

#[tokio::test]
async fn turns_are_recorded_and_rendered_into_the_next_prompt() {
    let harness = Harness::new();
    harness.seed_widget().await;
    let reasoner = Arc::new(ScriptedReasoner::new([
        search_widget(),
        ReasoningStep::answer("Widget has 3 in stock."),
        ReasoningStep::answer("It is below its minimum of 5."),
    ]));
    let runtime = harness.runtime(reasoner.clone(), settings());

    runtime.submit_message(SESSION, "how many widgets?").await;
    runtime.submit_message(SESSION, "is that low?").await;

    let session = harness.memory.get_or_create(SESSION).await;
    let roles: Vec<Role> = session.turns.iter().map(|turn| turn.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);

    let second_turn_prompt = &reasoner.requests()[2][0].content;
    assert!(second_turn_prompt.contains("ASSISTANT: Widget has 3 in stock."));
    assert!(second_turn_prompt.contains("Currently discussing product: \"Widget\""));
    assert!(second_turn_prompt.contains("Last action performed: Retrieved 1 products"));
}

#[tokio::test]
async fn invalid_identifier_becomes_a_graceful_answer() {
    let harness = Harness::new();
    harness.seed_widget().await;
    let reasoner = Arc::new(ScriptedReasoner::new([call(
        "call-1",
        "update_stock",
        json!({
            "productId": "Widget",
            "quantity": 5,
            "movementType": "purchase",
            "notes": null,
            "userId": SESSION,
        }),
    )]));
    let runtime = harness.runtime(reasoner, settings());

    let outcome = runtime.submit_message(SESSION, "add 5 to Widget").await;

    assert!(!outcome.succeeded);
    assert!(!outcome.retryable());
    assert!(outcome.text.contains("search for the record first"));
    assert!(matches!(
        outcome.error,
        Some(ApplicationError::Domain(DomainError::InvalidIdentifier { field: "productId", .. }))
    ));
    assert_eq!(harness.widget_stock().await, 3);

    let session = harness.memory.get_or_create(SESSION).await;
    let last = session.turns.back().expect("assistant turn");
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.text, outcome.text);
}

#[tokio::test]
async fn overdraw_is_reported_without_changing_stock() {
    let harness = Harness::new();
    harness.seed_widget().await;
    let reasoner = Arc::new(ScriptedReasoner::new([search_widget(), restock_current(-4)]));
    let runtime = harness.runtime(reasoner, settings());

    let outcome = runtime.submit_message(SESSION, "sell 4 widgets").await;

    assert!(!outcome.succeeded);
    assert!(outcome.text.starts_with("Insufficient stock"));
    assert_eq!(harness.widget_stock().await, 3);
}

#[tokio::test]
async fn upstream_failure_is_retryable_and_generic() {
    let harness = Harness::new();
    let reasoner = Arc::new(ScriptedReasoner::with_results([Err(LlmError::Transport(
        "connection refused".to_string(),
    ))]));
    let runtime = harness.runtime(reasoner, settings());

    let outcome = runtime.submit_message(SESSION, "hello").await;

    assert!(!outcome.succeeded);
    assert!(outcome.retryable());
    assert!(!outcome.text.contains("connection refused"));
    assert!(outcome.error_detail().is_some_and(|detail| detail.contains("connection refused")));
}

#[tokio::test]
async fn tool_loop_is_bounded() {
    let harness = Harness::new();
    let reasoner = Arc::new(ScriptedReasoner::new([
        call("c1", "get_sales", json!({ "customerId": null, "dateFrom": null, "dateTo": null, "limit": null })),
        call("c2", "get_sales", json!({ "customerId": null, "dateFrom": null, "dateTo": null, "limit": null })),
        call("c3", "get_sales", json!({ "customerId": null, "dateFrom": null, "dateTo": null, "limit": null })),
    ]));
    let runtime = harness
        .runtime(reasoner, RuntimeSettings { max_tool_rounds: 2, turn_deadline: None });

    let outcome = runtime.submit_message(SESSION, "loop forever").await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.tool_rounds, 2);
    assert!(outcome.error_detail().is_some_and(|detail| detail.contains("did not converge")));
}

#[tokio::test]
async fn unknown_tool_ends_the_turn_as_invalid_action() {
    let harness = Harness::new();
    let reasoner = Arc::new(ScriptedReasoner::new([call("c1", "drop_tables", json!({}))]));
    let runtime = harness.runtime(reasoner, settings());

    let outcome = runtime.submit_message(SESSION, "wipe it").await;

    assert!(matches!(
        outcome.error,
        Some(ApplicationError::Domain(DomainError::InvalidAction(_)))
    ));
    assert!(outcome.text.contains("unsupported action"));
}

struct StalledReasoner;

#[async_trait]
impl ReasoningEngine for StalledReasoner {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn reason(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ReasoningStep, LlmError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ReasoningStep::answer("too late"))
    }
}

#[tokio::test]
async fn caller_deadline_aborts_a_stalled_turn() {
    let harness = Harness::new();
    let runtime = harness.runtime(Arc::new(StalledReasoner), settings());

    let outcome = runtime
        .submit_message_with_deadline(SESSION, "hello?", Some(Duration::from_millis(50)))
        .await;

    assert!(!outcome.succeeded);
    assert!(outcome.retryable());
    assert!(matches!(outcome.error, Some(ApplicationError::DeadlineExceeded { .. })));

    let session = harness.memory.get_or_create(SESSION).await;
    assert_eq!(session.turns.len(), 2);
    assert_eq!(session.turns[1].text, outcome.text);
}

#[tokio::test]
async fn empty_final_answer_is_an_upstream_failure() {
    let harness = Harness::new();
    let reasoner = Arc::new(ScriptedReasoner::new([ReasoningStep::answer("   ")]));
    let runtime = harness.runtime(reasoner, settings());

    let outcome = runtime.submit_message(SESSION, "hi").await;

    assert!(matches!(outcome.error, Some(ApplicationError::Upstream(_))));
}
