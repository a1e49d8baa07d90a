use thiserror::Error;

use crate::domain::product::ProductId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(
        "Invalid {field} format: \"{value}\". {field} must be a valid UUID. Please search for the record first to get its proper ID."
    )]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("{entity} not found with ID: {id}. Please verify it exists and use the correct UUID.")]
    NotFound { entity: &'static str, id: String },
    #[error(
        "Insufficient stock for this operation: product {product_id} has {current} in stock, change of {requested} would leave {resulting}"
    )]
    InsufficientStock { product_id: ProductId, current: i32, requested: i32, resulting: i64 },
    #[error("Invalid report type: `{0}` (expected low_stock|movement_summary|category_summary)")]
    InvalidReportType(String),
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    #[error("Invalid {field}: {message}")]
    InvalidArgument { field: &'static str, message: String },
}

impl DomainError {
    /// Whether the end user can fix the request by rephrasing it.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier { .. }
                | Self::NotFound { .. }
                | Self::InsufficientStock { .. }
                | Self::InvalidArgument { .. }
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("turn deadline of {after_secs}s exceeded")]
    DeadlineExceeded { after_secs: u64 },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Transient failures a caller may retry; business-rule failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::DeadlineExceeded { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "Authentication is required for this request.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Unauthorized(message) => {
                Self::Unauthorized { message, correlation_id }
            }
            ApplicationError::Persistence(message) | ApplicationError::Upstream(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            error @ ApplicationError::DeadlineExceeded { .. } => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
