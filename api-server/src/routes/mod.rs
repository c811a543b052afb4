//! HTTP route handlers grouped by resource.
//!
//! Handlers are annotated with `#[openapi]` so `rocket_okapi` can derive
//! the OpenAPI document served next to the Swagger UI.

pub mod companies;
pub mod countries;
pub mod failed_entries;
pub mod health;
pub mod imports;
