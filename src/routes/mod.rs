//! HTTP route handlers.
//!
//! `emails` and `health` expose typed Rocket handlers annotated with
//! `#[openapi]` so `rocket_okapi` can derive an OpenAPI document;
//! `catchers` turns Rocket's own failures into the JSON error shape.

pub mod catchers;
pub mod emails;
pub mod health;
