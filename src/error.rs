use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::util::add_schema_response;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::db::ConnectionError;
use crate::schema::{FieldIssue, ValidationError};
use crate::store::{QueryError, StoreError};

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Connection(ConnectionError),
    Query(QueryError),
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

/// JSON body returned for every non-success response.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Per-field problems, present for validation failures only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            fields: Vec::new(),
        }
    }
}

impl ApiError {
    fn parts(self) -> (Status, ErrorResponse) {
        match self {
            ApiError::Validation(err) => {
                log::debug!("rejected record: {}", err);
                let fields = err.issues.iter().map(FieldIssue::to_string).collect();
                let mut body = ErrorResponse::new("ValidationError", err.to_string());
                body.fields = fields;
                (Status::BadRequest, body)
            }
            ApiError::Connection(err) => {
                log::error!("store unavailable: {}", err);
                (
                    Status::ServiceUnavailable,
                    ErrorResponse::new("ConnectionError", "email store is unavailable"),
                )
            }
            ApiError::Query(err) => {
                log::error!("query error: {}", err);
                (
                    Status::InternalServerError,
                    ErrorResponse::new("QueryError", "failed to access stored emails"),
                )
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, ErrorResponse::new("NotFound", msg))
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, ErrorResponse::new("BadRequest", msg))
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (
                    Status::InternalServerError,
                    ErrorResponse::new("InternalError", msg),
                )
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_response) = self.parts();

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let schema = generator.json_schema::<ErrorResponse>();
        let mut responses = Responses::default();
        // 400 validation, 404 unknown route, 500 query failure, 503 store unreachable.
        for code in [400, 404, 500, 503] {
            add_schema_response(&mut responses, code, "application/json", schema.clone())?;
        }
        Ok(responses)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(err) => ApiError::Validation(err),
            StoreError::Connection(err) => ApiError::Connection(err),
            StoreError::Query(err) => ApiError::Query(err),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}
