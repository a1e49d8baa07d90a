use tera::{Context, Tera};
use thiserror::Error;

use stockroom_core::errors::ApplicationError;

const SYSTEM_PROMPT: &str = "system_prompt.md";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template failed: {0}")]
    Template(#[from] tera::Error),
}

impl From<PromptError> for ApplicationError {
    fn from(error: PromptError) -> Self {
        ApplicationError::Configuration(error.to_string())
    }
}

/// Renders the fixed instructions around the session's context projection.
pub struct PromptBuilder {
    templates: Tera,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        Self::from_template(include_str!("../../../templates/agent/system_prompt.md"))
    }

    pub fn from_template(template: &str) -> Result<Self, PromptError> {
        let mut templates = Tera::default();
        templates.add_raw_template(SYSTEM_PROMPT, template)?;
        Ok(Self { templates })
    }

    pub fn system_prompt(
        &self,
        rendered_context: &str,
        tool_names: &[&str],
    ) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("context", rendered_context.trim());
        context.insert("tool_names", tool_names);
        Ok(self.templates.render(SYSTEM_PROMPT, &context)?)
    }
}

/// Prefixes the user message with the identity marker the instructions refer to.
pub fn tag_user_message(user_id: &str, text: &str) -> String {
    format!("[USER_ID: {user_id}] {text}")
}
