use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error")]
    Db {
        message: String,
        #[source]
        source: sqlx::error::Error,
    },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),
    #[error("timeTo cannot be in the past")]
    InvalidRange,
    /// Server misconfiguration that is not a database failure, e.g. missing managed state.
    #[error("Internal server error")]
    Internal(String),
}

/// Body of every error response: `{"message": "..."}` or `{"message": ["...", ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub message: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ErrorMessage {
    Single(String),
    Many(Vec<String>),
}

impl ErrorBody {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            message: ErrorMessage::Single(message.into()),
        }
    }

    pub fn many(messages: Vec<String>) -> Self {
        Self {
            message: ErrorMessage::Many(messages),
        }
    }
}

impl std::fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorMessage::Single(message) => f.write_str(message),
            ErrorMessage::Many(messages) => f.write_str(&messages.join("; ")),
        }
    }
}

/// Flattens field errors into `"field: message"` lines, ordered by field name.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().map(|(field, errs)| (field.to_string(), errs)).collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                let reason = err.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| err.code.to_string());
                format!("{}: {}", field, reason)
            })
        })
        .collect()
}

impl AppError {
    pub fn db(message: impl Into<String>, source: sqlx::error::Error) -> Self {
        Self::Db {
            message: message.into(),
            source,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::ValidationError(errors) => ErrorBody::many(validation_messages(errors)),
            other => ErrorBody::single(other.to_string()),
        }
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::Db { .. } => Status::InternalServerError,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::ValidationError(_) => Status::UnprocessableEntity,
            AppError::InvalidRange => Status::BadRequest,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        let user_id = req
            .local_cache(|| None::<crate::auth::CurrentUser>)
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        let status = Status::from(&self);

        // 5xx at error level, rejected input at warn
        if status.class().is_server_error() {
            error!(
                error = ?self,
                request_id = %request_id,
                user_id = %user_id,
                method = %method,
                uri = %uri,
                "request failed"
            );
        } else {
            warn!(
                error = %self,
                request_id = %request_id,
                user_id = %user_id,
                method = %method,
                uri = %uri,
                "request rejected"
            );
        }

        let body = serde_json::to_string(&self.body()).unwrap_or_else(|_| r#"{"message":"Internal server error"}"#.to_string());

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Bad Request - timeTo is earlier than timeFrom"),
            ("401", "Unauthorized"),
            ("422", "Unprocessable Entity - missing or malformed fields"),
            ("500", "Internal Server Error"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::db("Database error", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    fn field_errors() -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.add("timeTo", ValidationError::new("invalid_date").with_message("Invalid date".into()));
        errors.add("timeFrom", ValidationError::new("required").with_message("Required".into()));
        errors
    }

    #[test]
    fn validation_messages_are_sorted_by_field() {
        let messages = validation_messages(&field_errors());
        assert_eq!(messages, vec!["timeFrom: Required".to_string(), "timeTo: Invalid date".to_string()]);
    }

    #[test]
    fn validation_message_falls_back_to_code() {
        let mut errors = ValidationErrors::new();
        errors.add("date", ValidationError::new("invalid_date"));
        assert_eq!(validation_messages(&errors), vec!["date: invalid_date".to_string()]);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(Status::from(&AppError::ValidationError(field_errors())), Status::UnprocessableEntity);
        assert_eq!(Status::from(&AppError::InvalidRange), Status::BadRequest);
        assert_eq!(Status::from(&AppError::Unauthorized), Status::Unauthorized);
        assert_eq!(Status::from(&AppError::Internal("pool".into())), Status::InternalServerError);
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let body = serde_json::to_value(AppError::Internal("PgPool is not managed".into()).body()).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "Internal server error" }));
    }

    #[test]
    fn invalid_range_body_is_a_single_message() {
        let body = serde_json::to_value(AppError::InvalidRange.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "timeTo cannot be in the past" }));
    }

    #[test]
    fn validation_body_is_a_message_list() {
        let body = serde_json::to_value(AppError::ValidationError(field_errors()).body()).unwrap();
        assert_eq!(body, serde_json::json!({ "message": ["timeFrom: Required", "timeTo: Invalid date"] }));
    }

    #[test]
    fn database_errors_do_not_leak_details() {
        let err = AppError::db("Database error", sqlx::Error::PoolTimedOut);
        assert_eq!(err.body(), ErrorBody::single("Internal server error"));
    }
}
