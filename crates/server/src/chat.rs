use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stockroom_agent::AgentRuntime;
use stockroom_core::errors::{ApplicationError, InterfaceError};
use stockroom_core::inventory::{
    CustomerQuery, InventoryOperations, NewProductRequest, ProductQuery, SalesQuery,
};
use tracing::{info, warn};
use uuid::Uuid;

const DIAGNOSTIC_LIMIT: u32 = 5;
const TEST_ACTIONS: [&str; 5] = ["products", "customers", "sales", "low-stock", "categories"];

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<AgentRuntime>,
    auth_header: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub success: bool,
    pub response: String,
    pub session_id: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            response: None,
            details: None,
            retryable: false,
            correlation_id: None,
        }
    }
}

type ApiFailure = (StatusCode, Json<ApiError>);

#[derive(Clone, Debug, Serialize)]
pub struct ServiceBanner {
    pub message: &'static str,
    pub reasoner: String,
    pub tools: Vec<&'static str>,
    pub capabilities: [&'static str; 6],
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestQuery {
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestCommand {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub min_stock_level: Option<i32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
struct Listing<T> {
    success: bool,
    count: usize,
    data: Vec<T>,
}

impl<T: Serialize> Listing<T> {
    fn respond(data: Vec<T>) -> Response {
        Json(Self { success: true, count: data.len(), data }).into_response()
    }
}

#[derive(Clone, Debug, Serialize)]
struct TestUsage {
    message: &'static str,
    available_actions: [&'static str; 5],
    usage: &'static str,
}

pub fn router(runtime: Arc<AgentRuntime>, auth_header: impl Into<String>) -> Router {
    Router::new()
        .route("/api/agent/chat", get(service_banner).post(chat))
        .route("/api/agent/test", get(run_test_query).post(run_test_command))
        .with_state(ChatState { runtime, auth_header: auth_header.into() })
}

pub async fn chat(
    State(state): State<ChatState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiFailure> {
    let user_id = authenticated_user(&headers, &state)?;
    let message = match body {
        Ok(Json(ChatRequest { message: Some(message) })) if !message.trim().is_empty() => message,
        Ok(_) => return Err(bad_request("Message is required")),
        Err(rejection) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError { details: Some(rejection.body_text()), ..ApiError::new("Message is required") }),
            ));
        }
    };

    let outcome = state.runtime.submit_message(&user_id, &message).await;
    if outcome.succeeded {
        return Ok(Json(ChatReply {
            success: true,
            response: outcome.text,
            session_id: user_id,
            correlation_id: outcome.correlation_id,
        }));
    }

    let retryable = outcome.retryable();
    let status =
        if retryable { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::INTERNAL_SERVER_ERROR };
    warn!(
        event_name = "server.chat.turn_failed",
        session_id = %user_id,
        correlation_id = %outcome.correlation_id,
        status = status.as_u16(),
        retryable,
        "chat turn failed"
    );
    Err((
        status,
        Json(ApiError {
            response: Some(outcome.text.clone()),
            details: outcome.error_detail(),
            retryable,
            correlation_id: Some(outcome.correlation_id),
            ..ApiError::new("Failed to process request")
        }),
    ))
}

pub async fn service_banner(State(state): State<ChatState>) -> Json<ServiceBanner> {
    Json(ServiceBanner {
        message: "Inventory agent is running",
        reasoner: state.runtime.reasoner_name().to_string(),
        tools: state.runtime.catalog().names(),
        capabilities: [
            "Search and list products",
            "Create products",
            "Update stock levels",
            "Manage customers",
            "Review sales history",
            "Generate inventory reports",
        ],
    })
}

pub async fn run_test_query(
    State(state): State<ChatState>,
    headers: HeaderMap,
    Query(query): Query<TestQuery>,
) -> Result<Response, ApiFailure> {
    authenticated_user(&headers, &state)?;
    let operations = state.runtime.catalog().operations();
    let correlation_id = Uuid::new_v4().to_string();
    let action = query.action.unwrap_or_default();

    let response = match action.as_str() {
        "products" => Listing::respond(
            operations.list_products(ProductQuery::default()).await.map_err(|error| {
                application_failure(error, &correlation_id)
            })?,
        ),
        "low-stock" => Listing::respond(
            operations
                .list_products(ProductQuery { low_stock: true, ..ProductQuery::default() })
                .await
                .map_err(|error| application_failure(error, &correlation_id))?,
        ),
        "customers" => Listing::respond(
            operations
                .list_customers(CustomerQuery { search: None, limit: Some(DIAGNOSTIC_LIMIT) })
                .await
                .map_err(|error| application_failure(error, &correlation_id))?,
        ),
        "sales" => Listing::respond(
            operations
                .list_sales(SalesQuery { limit: Some(DIAGNOSTIC_LIMIT), ..SalesQuery::default() })
                .await
                .map_err(|error| application_failure(error, &correlation_id))?,
        ),
        "categories" => Listing::respond(
            categories(operations).await.map_err(|error| application_failure(error, &correlation_id))?,
        ),
        _ => Json(TestUsage {
            message: "Agent diagnostics endpoint",
            available_actions: TEST_ACTIONS,
            usage: "GET /api/agent/test?action=<action>",
        })
        .into_response(),
    };

    info!(
        event_name = "server.test.query",
        correlation_id = %correlation_id,
        action = %action,
        "diagnostic query served"
    );
    Ok(response)
}

pub async fn run_test_command(
    State(state): State<ChatState>,
    headers: HeaderMap,
    body: Result<Json<TestCommand>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let user_id = authenticated_user(&headers, &state)?;
    let Ok(Json(command)) = body else {
        return Err(bad_request("Invalid action"));
    };
    if command.action != "create-product" {
        return Err(bad_request("Invalid action"));
    }

    let payload: ProductPayload = serde_json::from_value(command.data).map_err(|error| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError { details: Some(error.to_string()), ..ApiError::new("Invalid product data") }),
        )
    })?;

    let correlation_id = Uuid::new_v4().to_string();
    let created = state
        .runtime
        .catalog()
        .operations()
        .create_product(NewProductRequest {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            stock_quantity: payload.stock_quantity,
            min_stock_level: payload.min_stock_level,
            category: payload.category,
            barcode: payload.barcode,
            user_id,
        })
        .await
        .map_err(|error| application_failure(error, &correlation_id))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "success": true, "data": created })))
        .into_response())
}

async fn categories(operations: &InventoryOperations) -> Result<Vec<String>, ApplicationError> {
    let products = operations.list_products(ProductQuery::default()).await?;
    let distinct: BTreeSet<String> =
        products.into_iter().filter_map(|product| product.category).collect();
    Ok(distinct.into_iter().collect())
}

fn authenticated_user(headers: &HeaderMap, state: &ChatState) -> Result<String, ApiFailure> {
    let provided = headers
        .get(state.auth_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match provided {
        Some(user_id) => Ok(user_id.to_string()),
        None => Err((StatusCode::UNAUTHORIZED, Json(ApiError::new("Unauthorized")))),
    }
}

fn bad_request(message: &str) -> ApiFailure {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(message)))
}

fn application_failure(error: ApplicationError, correlation_id: &str) -> ApiFailure {
    let retryable = error.is_retryable();
    let detail = error.to_string();
    let interface = error.into_interface(correlation_id);
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let details = match interface {
        InterfaceError::BadRequest { .. } => Some(detail),
        _ => None,
    };

    (
        status,
        Json(ApiError {
            details,
            retryable,
            correlation_id: Some(interface.correlation_id().to_string()),
            ..ApiError::new(interface.user_message())
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::{Query, State},
        http::{HeaderMap, HeaderValue, Request, StatusCode},
        Json,
    };
    use serde_json::{json, Value};
    use stockroom_agent::llm::LlmError;
    use stockroom_agent::{ReasoningStep, ScriptedReasoner};
    use tower::ServiceExt;

    use super::{chat, router, run_test_command, run_test_query, ChatRequest, ChatState, TestCommand, TestQuery};
    use crate::test_support::{runtime_with, USER};

    fn state(reasoner: ScriptedReasoner) -> ChatState {
        ChatState { runtime: runtime_with(reasoner), auth_header: "x-authenticated-user".to_string() }
    }

    fn signed_in() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-authenticated-user", HeaderValue::from_static(USER));
        headers
    }

    fn message(text: &str) -> Result<Json<ChatRequest>, axum::extract::rejection::JsonRejection> {
        Ok(Json(ChatRequest { message: Some(text.to_string()) }))
    }

    #[tokio::test]
    async fn chat_returns_answer_with_session_id() {
        let state = state(ScriptedReasoner::new([ReasoningStep::answer("Hello there.")]));

        let Json(reply) = chat(State(state), signed_in(), message("hi")).await.expect("reply");

        assert!(reply.success);
        assert_eq!(reply.response, "Hello there.");
        assert_eq!(reply.session_id, USER);
    }

    #[tokio::test]
    async fn chat_requires_auth_header() {
        let state = state(ScriptedReasoner::new([]));

        let (status, Json(body)) =
            chat(State(state), HeaderMap::new(), message("hi")).await.expect_err("unauthorized");

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn chat_rejects_blank_message() {
        let state = state(ScriptedReasoner::new([]));

        let (status, Json(body)) =
            chat(State(state), signed_in(), message("   ")).await.expect_err("bad request");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Message is required");
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_service_unavailable() {
        let state = state(ScriptedReasoner::with_results([Err(LlmError::Transport(
            "connection refused".to_string(),
        ))]));

        let (status, Json(body)) =
            chat(State(state), signed_in(), message("hi")).await.expect_err("failure");

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, "Failed to process request");
        assert!(body.retryable);
        assert!(body.response.is_some_and(|text| text.starts_with("Sorry")));
        assert!(body.details.is_some_and(|details| details.contains("connection refused")));
    }

    #[tokio::test]
    async fn non_retryable_failure_maps_to_internal_error() {
        let state = state(ScriptedReasoner::new([ReasoningStep::call(vec![
            stockroom_agent::ToolCall::new("c1", "drop_tables", json!({})),
        ])]));

        let (status, Json(body)) =
            chat(State(state), signed_in(), message("wipe it")).await.expect_err("failure");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.retryable);
    }

    #[tokio::test]
    async fn test_endpoint_creates_and_lists_products() {
        let state = state(ScriptedReasoner::new([]));
        let command = TestCommand {
            action: "create-product".to_string(),
            data: json!({ "name": "Gasket", "price": "2.50", "stock_quantity": 1, "category": "Parts" }),
        };

        let created =
            run_test_command(State(state.clone()), signed_in(), Ok(Json(command))).await.expect("created");
        assert_eq!(created.status(), StatusCode::CREATED);

        let response = run_test_query(
            State(state),
            signed_in(),
            Query(TestQuery { action: Some("low-stock".to_string()) }),
        )
        .await
        .expect("listing");
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.expect("body"))
                .expect("json");

        assert_eq!(body["success"], json!(true));
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["data"][0]["name"], json!("Gasket"));
    }

    #[tokio::test]
    async fn test_endpoint_rejects_unknown_command() {
        let state = state(ScriptedReasoner::new([]));
        let command = TestCommand { action: "drop-everything".to_string(), data: Value::Null };

        let (status, Json(body)) =
            run_test_command(State(state), signed_in(), Ok(Json(command))).await.expect_err("rejected");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid action");
    }

    #[tokio::test]
    async fn unknown_test_action_returns_usage() {
        let state = state(ScriptedReasoner::new([]));

        let response = run_test_query(State(state), signed_in(), Query(TestQuery { action: None }))
            .await
            .expect("usage");
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.expect("body"))
                .expect("json");

        assert_eq!(body["available_actions"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn router_wires_chat_routes_behind_auth() {
        let app = router(runtime_with(ScriptedReasoner::new([])), "x-authenticated-user");

        let banner = app
            .clone()
            .oneshot(Request::get("/api/agent/chat").body(Body::empty()).expect("request"))
            .await
            .expect("banner");
        assert_eq!(banner.status(), StatusCode::OK);

        let unauthorized = app
            .oneshot(
                Request::post("/api/agent/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"hi"}"#))
                    .expect("request"),
            )
            .await
            .expect("chat");
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn router_rejects_malformed_chat_body() {
        let app = router(runtime_with(ScriptedReasoner::new([])), "x-authenticated-user");

        let response = app
            .oneshot(
                Request::post("/api/agent/chat")
                    .header("content-type", "application/json")
                    .header("x-authenticated-user", USER)
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("chat");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
