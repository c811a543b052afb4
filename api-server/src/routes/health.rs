//! Liveness and readiness endpoints.

use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// `ok` when the check passed.
    pub status: String,
}

/// Liveness check; does not touch the database.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check; succeeds once the database answers.
#[openapi(tag = "Health")]
#[get("/health/ready")]
pub async fn readiness_check(pool: &State<PgPool>) -> Result<Json<HealthResponse>, ApiError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool.inner())
        .await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
