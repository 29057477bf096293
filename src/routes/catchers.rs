//! JSON replacements for Rocket's default HTML error pages.

use rocket::{Request, catch};

use crate::error::ApiError;

#[catch(400)]
pub fn bad_request(req: &Request<'_>) -> ApiError {
    ApiError::BadRequest(format!("malformed request to {}", req.uri()))
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> ApiError {
    ApiError::NotFound(format!("no route for {} {}", req.method(), req.uri()))
}

/// Rocket answers 422 when a JSON body does not match the expected shape.
#[catch(422)]
pub fn unprocessable(req: &Request<'_>) -> ApiError {
    ApiError::BadRequest(format!("request body for {} could not be parsed", req.uri()))
}

#[catch(500)]
pub fn internal_error(_: &Request<'_>) -> ApiError {
    ApiError::InternalError("unexpected server error".to_string())
}
