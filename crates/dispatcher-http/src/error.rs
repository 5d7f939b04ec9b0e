//! Error handling for the trigger endpoints
//!
//! Every failure leaves the server as a JSON [`ErrorResponse`] with a
//! snake_case [`ErrorCode`], the request id and a timestamp. Server-side
//! failures are logged at `error`, client-side ones at `warn`.
//!
//! | Failure | Status | Code |
//! |---------|--------|------|
//! | Room or agent name absent | 400 | `missing_required_field` |
//! | Name present but invalid, bad query string | 400 | `invalid_input` |
//! | Malformed JSON body | 400 | `invalid_json` |
//! | Registry settings missing | 500 | `configuration_error` |
//! | Nothing to stop | 404 | `dispatch_not_found` |
//! | Registry call failed | 500 | `registry_unavailable` |

use axum::{
    extract::Request,
    http::{
        StatusCode,
        header::{self, HeaderValue},
    },
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use dispatcher_core::{
    AgentName, IdValidationError, NotFoundReason, ReconcileError, RegistryError, RoomName,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation id attached to every request and error body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random request ID using UUID v4
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a request ID without validation
    #[doc(hidden)]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request id stored in request extensions by [`request_id_middleware`]
#[derive(Debug, Clone)]
pub struct RequestIdExtension(pub RequestId);

const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Client-supplied ids: 1..=128 chars of `[A-Za-z0-9_-]`
fn validate_request_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_REQUEST_ID_LENGTH
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Middleware that extracts or generates the `X-Request-ID`
///
/// A valid client-supplied id is kept, anything else is replaced by a UUID.
/// The id is stored in request extensions and echoed on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| validate_request_id(s))
        .map(RequestId::new_unchecked)
        .unwrap_or_else(RequestId::generate);

    request
        .extensions_mut()
        .insert(RequestIdExtension(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(
            header::HeaderName::from_static("x-request-id"),
            header_value,
        );
    }

    response
}

/// Type-safe error codes for trigger errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingRequiredField,
    InvalidInput,
    InvalidJson,
    ConfigurationError,
    DispatchNotFound,
    RegistryUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredField => "missing_required_field",
            Self::InvalidInput => "invalid_input",
            Self::InvalidJson => "invalid_json",
            Self::ConfigurationError => "configuration_error",
            Self::DispatchNotFound => "dispatch_not_found",
            Self::RegistryUnavailable => "registry_unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error body
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    #[schema(value_type = String)]
    pub request_id: RequestId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    pub fn new(error: ErrorCode, message: impl Into<String>, request_id: RequestId) -> Self {
        Self {
            error: error.as_str().to_string(),
            message: message.into(),
            details: None,
            request_id,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_details<T: Serialize>(mut self, details: T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }
}

/// What went wrong while handling a trigger
#[derive(Debug, Clone)]
pub enum TriggerErrorKind {
    /// Field absent or blank
    MissingRequiredField { field: &'static str },
    /// Field present but rejected
    InvalidInput { field: &'static str, reason: String },
    /// Request body is not the expected JSON
    InvalidJson { reason: String },
    /// Registry URL, key or secret not set
    ConfigurationError { missing: Vec<&'static str> },
    /// Nothing dispatched for this room and agent
    DispatchNotFound {
        room: RoomName,
        agent_name: AgentName,
        reason: NotFoundReason,
    },
    /// Registry call failed
    Registry(RegistryError),
}

/// HTTP-layer error carrying the request id
#[derive(Debug, Clone)]
pub struct TriggerError {
    kind: TriggerErrorKind,
    request_id: RequestId,
}

impl TriggerError {
    pub fn new(kind: TriggerErrorKind, request_id: RequestId) -> Self {
        Self { kind, request_id }
    }

    pub fn missing_required_field(field: &'static str, request_id: RequestId) -> Self {
        Self::new(TriggerErrorKind::MissingRequiredField { field }, request_id)
    }

    pub fn invalid_input(
        field: &'static str,
        reason: impl Into<String>,
        request_id: RequestId,
    ) -> Self {
        Self::new(
            TriggerErrorKind::InvalidInput {
                field,
                reason: reason.into(),
            },
            request_id,
        )
    }

    pub fn invalid_json(reason: impl Into<String>, request_id: RequestId) -> Self {
        Self::new(
            TriggerErrorKind::InvalidJson {
                reason: reason.into(),
            },
            request_id,
        )
    }

    pub fn configuration_error(missing: Vec<&'static str>, request_id: RequestId) -> Self {
        Self::new(TriggerErrorKind::ConfigurationError { missing }, request_id)
    }

    /// Map an identifier validation failure on `field`
    pub fn from_validation(
        field: &'static str,
        err: &IdValidationError,
        request_id: RequestId,
    ) -> Self {
        if err.is_missing() {
            Self::missing_required_field(field, request_id)
        } else {
            Self::invalid_input(field, err.to_string(), request_id)
        }
    }

    pub fn from_reconcile(err: ReconcileError, request_id: RequestId) -> Self {
        let kind = match err {
            ReconcileError::NotFound {
                room,
                agent_name,
                reason,
            } => TriggerErrorKind::DispatchNotFound {
                room,
                agent_name,
                reason,
            },
            ReconcileError::Registry(err) => TriggerErrorKind::Registry(err),
        };
        Self::new(kind, request_id)
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.kind {
            TriggerErrorKind::MissingRequiredField { .. }
            | TriggerErrorKind::InvalidInput { .. }
            | TriggerErrorKind::InvalidJson { .. } => StatusCode::BAD_REQUEST,
            TriggerErrorKind::ConfigurationError { .. } | TriggerErrorKind::Registry(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TriggerErrorKind::DispatchNotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            TriggerErrorKind::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            TriggerErrorKind::InvalidInput { .. } => ErrorCode::InvalidInput,
            TriggerErrorKind::InvalidJson { .. } => ErrorCode::InvalidJson,
            TriggerErrorKind::ConfigurationError { .. } => ErrorCode::ConfigurationError,
            TriggerErrorKind::DispatchNotFound { .. } => ErrorCode::DispatchNotFound,
            TriggerErrorKind::Registry(_) => ErrorCode::RegistryUnavailable,
        }
    }

    fn user_facing_message(&self) -> String {
        match &self.kind {
            TriggerErrorKind::MissingRequiredField { field } => match *field {
                "room" => "Room name is required".to_string(),
                "agentName" => "Agent name is required".to_string(),
                other => format!("{other} is required"),
            },
            TriggerErrorKind::InvalidInput { field, reason } => {
                format!("Invalid {field}: {reason}")
            }
            TriggerErrorKind::InvalidJson { reason } => format!("Invalid JSON body: {reason}"),
            // Variable names stay in the server log.
            TriggerErrorKind::ConfigurationError { .. } => {
                "Server configuration is missing".to_string()
            }
            TriggerErrorKind::DispatchNotFound { reason, .. } => reason.to_string(),
            TriggerErrorKind::Registry(err) => err.to_string(),
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(
            self.error_code(),
            self.user_facing_message(),
            self.request_id.clone(),
        );

        match &self.kind {
            TriggerErrorKind::MissingRequiredField { field }
            | TriggerErrorKind::InvalidInput { field, .. } => {
                response.with_details(serde_json::json!({ "field": field }))
            }
            TriggerErrorKind::DispatchNotFound {
                room,
                agent_name,
                reason,
            } => response.with_details(serde_json::json!({
                "room": room,
                "agent_name": agent_name,
                "reason": match reason {
                    NotFoundReason::NoDispatches => "no_dispatches",
                    NotFoundReason::AgentNotDispatched => "agent_not_dispatched",
                },
            })),
            TriggerErrorKind::Registry(err) => response.with_details(serde_json::json!({
                "retryable": err.is_retryable(),
            })),
            TriggerErrorKind::InvalidJson { .. } | TriggerErrorKind::ConfigurationError { .. } => {
                response
            }
        }
    }
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TriggerErrorKind::ConfigurationError { missing } => {
                write!(f, "Registry configuration missing: {}", missing.join(", "))
            }
            TriggerErrorKind::DispatchNotFound {
                room,
                agent_name,
                reason,
            } => write!(f, "{reason} (room {room}, agent {agent_name})"),
            _ => f.write_str(&self.user_facing_message()),
        }
    }
}

impl std::error::Error for TriggerError {}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = self.to_error_response();

        if status_code.is_server_error() {
            tracing::error!(
                error_code = %self.error_code(),
                request_id = %self.request_id(),
                status_code = %status_code,
                error_message = %self,
                "Trigger failed"
            );
        } else {
            tracing::warn!(
                error_code = %self.error_code(),
                request_id = %self.request_id(),
                status_code = %status_code,
                error_message = %self,
                "Trigger rejected"
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for trigger handlers
pub type TriggerResult<T> = Result<T, TriggerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher_core::DispatchId;
    use rstest::rstest;

    fn rid() -> RequestId {
        RequestId::new_unchecked("req-1")
    }

    fn not_found(reason: NotFoundReason) -> TriggerError {
        TriggerError::from_reconcile(
            ReconcileError::NotFound {
                room: RoomName::parse("demo-1").unwrap(),
                agent_name: AgentName::default(),
                reason,
            },
            rid(),
        )
    }

    #[rstest]
    #[case(TriggerError::missing_required_field("room", rid()), StatusCode::BAD_REQUEST, "missing_required_field")]
    #[case(TriggerError::invalid_input("room", "too long", rid()), StatusCode::BAD_REQUEST, "invalid_input")]
    #[case(TriggerError::invalid_json("EOF", rid()), StatusCode::BAD_REQUEST, "invalid_json")]
    #[case(TriggerError::configuration_error(vec!["LIVEKIT_URL"], rid()), StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")]
    #[case(not_found(NotFoundReason::NoDispatches), StatusCode::NOT_FOUND, "dispatch_not_found")]
    #[case(TriggerError::from_reconcile(RegistryError::timeout("slow").into(), rid()), StatusCode::INTERNAL_SERVER_ERROR, "registry_unavailable")]
    fn test_status_and_code_mapping(
        #[case] error: TriggerError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.error_code().as_str(), code);
        assert_eq!(error.to_error_response().error, code);
    }

    #[test]
    fn test_missing_room_message() {
        let response = TriggerError::missing_required_field("room", rid()).to_error_response();
        assert_eq!(response.message, "Room name is required");
        assert_eq!(response.request_id, rid());
        assert_eq!(response.details.unwrap()["field"], "room");
    }

    #[test]
    fn test_not_found_messages_distinguish_reason() {
        let empty = not_found(NotFoundReason::NoDispatches).to_error_response();
        let other = not_found(NotFoundReason::AgentNotDispatched).to_error_response();

        assert_eq!(empty.message, "No dispatches found for the room");
        assert_eq!(other.message, "Agent dispatch not found for the room");
        assert_eq!(empty.details.unwrap()["reason"], "no_dispatches");
        assert_eq!(other.details.unwrap()["reason"], "agent_not_dispatched");
    }

    #[test]
    fn test_registry_message_surfaced_verbatim() {
        let source = RegistryError::rejected(503, "upstream down");
        let response =
            TriggerError::from_reconcile(source.clone().into(), rid()).to_error_response();
        assert_eq!(response.message, source.to_string());
        assert_eq!(response.details.unwrap()["retryable"], true);

        let source = RegistryError::dispatch_not_found(
            &DispatchId::new_unchecked("AD_1"),
            &RoomName::parse("demo-1").unwrap(),
        );
        let error = TriggerError::from_reconcile(source.into(), rid());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_configuration_error_hides_variable_names() {
        let error = TriggerError::configuration_error(vec!["LIVEKIT_API_SECRET"], rid());
        let response = error.to_error_response();
        assert_eq!(response.message, "Server configuration is missing");
        assert!(response.details.is_none());
        assert!(error.to_string().contains("LIVEKIT_API_SECRET"));
    }

    #[test]
    fn test_validation_mapping() {
        let blank = RoomName::parse("   ").unwrap_err();
        let error = TriggerError::from_validation("room", &blank, rid());
        assert_eq!(error.error_code(), ErrorCode::MissingRequiredField);

        let padded = RoomName::parse(" demo ").unwrap_err();
        let error = TriggerError::from_validation("room", &padded, rid());
        assert_eq!(error.error_code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn test_request_id_validation() {
        assert!(validate_request_id("abc-123_DEF"));
        assert!(!validate_request_id(""));
        assert!(!validate_request_id("has space"));
        assert!(!validate_request_id("key:value"));
        assert!(!validate_request_id(&"a".repeat(129)));
    }
}
