//! Ingest and query endpoints for classified email records.

use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{EmailRecord, SaveResponse};
use crate::schema::EmailRecordInput;
use crate::store::EmailStore;

/// List the 100 most recent email records, newest first.
#[openapi(tag = "Emails")]
#[get("/emails")]
pub async fn list_emails(store: &State<EmailStore>) -> Result<Json<Vec<EmailRecord>>, ApiError> {
    let emails = store.recent().await?;
    log::debug!("returning {} email records", emails.len());
    Ok(Json(emails))
}

/// Persist one classified email record.
///
/// Duplicate submissions create duplicate records.
#[openapi(tag = "Emails")]
#[post("/save-email", data = "<input>")]
pub async fn save_email(
    input: Json<EmailRecordInput>,
    store: &State<EmailStore>,
) -> Result<Json<SaveResponse>, ApiError> {
    store.save(input.into_inner()).await?;
    Ok(Json(SaveResponse { success: true }))
}
