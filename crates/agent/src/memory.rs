//! Per-session conversational memory.
//!
//! A session is keyed by the authenticated user id and holds a bounded FIFO of
//! turns plus a small structured context record. Nothing here is durable: the
//! store lives for the process and idle sessions are swept after a TTL.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use stockroom_core::config::{AppConfig, MemoryConfig};
use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFocus {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: i32,
    pub min_stock_level: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFocus {
    pub id: CustomerId,
    pub name: String,
}

/// What the conversation is currently about. Every field is overwritten
/// independently; there is no history of earlier foci.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub current_product: Option<ProductFocus>,
    pub current_customer: Option<CustomerFocus>,
    pub last_action: Option<String>,
    pub user_id: Option<String>,
}

impl ContextRecord {
    pub fn is_empty(&self) -> bool {
        self.current_product.is_none()
            && self.current_customer.is_none()
            && self.last_action.is_none()
            && self.user_id.is_none()
    }

    /// Shallow merge: only the fields present in `patch` are replaced.
    pub fn merge(&mut self, patch: ContextPatch) {
        let ContextPatch { current_product, current_customer, last_action, user_id } = patch;
        if let Some(product) = current_product {
            self.current_product = Some(product);
        }
        if let Some(customer) = current_customer {
            self.current_customer = Some(customer);
        }
        if let Some(action) = last_action {
            self.last_action = Some(action);
        }
        if let Some(user_id) = user_id {
            self.user_id = Some(user_id);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextPatch {
    pub current_product: Option<ProductFocus>,
    pub current_customer: Option<CustomerFocus>,
    pub last_action: Option<String>,
    pub user_id: Option<String>,
}

impl ContextPatch {
    pub fn action(text: impl Into<String>) -> Self {
        Self { last_action: Some(text.into()), ..Self::default() }
    }

    pub fn with_product(mut self, product: ProductFocus) -> Self {
        self.current_product = Some(product);
        self
    }

    pub fn with_customer(mut self, customer: CustomerFocus) -> Self {
        self.current_customer = Some(customer);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub turns: VecDeque<Turn>,
    pub context: ContextRecord,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self { turns: VecDeque::new(), context: ContextRecord::default(), last_active: now }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLimits {
    pub max_turns: usize,
    pub render_turns: usize,
    pub idle_ttl: Duration,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self::from(&AppConfig::default().memory)
    }
}

impl From<&MemoryConfig> for MemoryLimits {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            render_turns: config.render_turns,
            idle_ttl: Duration::from_secs(config.session_ttl_secs),
        }
    }
}

/// Process-wide session map. Each call takes the lock once, so a turn that
/// reads and then writes may interleave with another turn of the same session;
/// the later write wins.
#[derive(Debug, Default)]
pub struct SessionMemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
    limits: MemoryLimits,
}

impl SessionMemoryStore {
    pub fn new(limits: MemoryLimits) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), limits }
    }

    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    pub async fn get_or_create(&self, session_id: &str) -> Session {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_insert_with(|| Session::new(Utc::now())).clone()
    }

    pub async fn append_turn(&self, session_id: &str, role: Role, text: impl Into<String>) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| Session::new(now));
        session.turns.push_back(Turn { role, text: text.into(), timestamp: now });
        while session.turns.len() > self.limits.max_turns {
            session.turns.pop_front();
        }
        session.last_active = now;
    }

    pub async fn update_context(&self, session_id: &str, patch: ContextPatch) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| Session::new(now));
        session.context.merge(patch);
        session.last_active = now;
    }

    pub async fn context(&self, session_id: &str) -> ContextRecord {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.context.clone())
            .unwrap_or_default()
    }

    pub async fn render_context(&self, session_id: &str) -> String {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) => render(session, self.limits.render_turns),
            None => String::new(),
        }
    }

    /// Drops sessions idle for longer than the configured TTL, returning how
    /// many were removed.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(self.limits.idle_ttl) else {
            return 0;
        };
        let cutoff = now - ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active >= cutoff);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(
                event_name = "agent.memory.evicted",
                evicted,
                remaining = sessions.len(),
                "idle sessions evicted"
            );
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Text projection of a session for the system prompt: the last
/// `render_turns` turns followed by the non-empty context fields.
pub fn render(session: &Session, render_turns: usize) -> String {
    let mut rendered = String::new();

    if !session.turns.is_empty() {
        rendered.push_str("\n## Recent Conversation:\n");
        let skip = session.turns.len().saturating_sub(render_turns);
        for turn in session.turns.iter().skip(skip) {
            let _ = writeln!(rendered, "{}: {}", turn.role.label(), turn.text);
        }
    }

    let context = &session.context;
    if !context.is_empty() {
        rendered.push_str("\n## Current Context:\n");
        if let Some(product) = &context.current_product {
            let _ = writeln!(
                rendered,
                "- Currently discussing product: \"{}\" (ID: {})",
                product.name, product.id
            );
            let _ = writeln!(rendered, "  - Current stock: {}", product.stock_quantity);
            let _ = writeln!(rendered, "  - Minimum level: {}", product.min_stock_level);
        }
        if let Some(customer) = &context.current_customer {
            let _ = writeln!(
                rendered,
                "- Currently discussing customer: \"{}\" (ID: {})",
                customer.name, customer.id
            );
        }
        if let Some(action) = &context.last_action {
            let _ = writeln!(rendered, "- Last action performed: {action}");
        }
        if let Some(user_id) = &context.user_id {
            let _ = writeln!(rendered, "- User ID: {user_id}");
        }
    }

    rendered
}
