use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{FailedEntry, PageResponse};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// List recorded import failures, newest first
#[openapi(tag = "Failed Entries")]
#[get("/failed-entries?<limit>&<offset>")]
pub async fn list_failed_entries(
    limit: Option<i64>,
    offset: Option<i64>,
    pool: &State<PgPool>,
) -> Result<Json<PageResponse<Vec<FailedEntry>>>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);

    let entries: Vec<FailedEntry> = sqlx::query_as(
        r#"SELECT id, row_id, attribute, error_msg, firstname, lastname, sex, email, country, created_at
           FROM failed_entries_users
           ORDER BY created_at DESC, id DESC
           LIMIT $1 OFFSET $2"#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.inner())
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM failed_entries_users")
        .fetch_one(pool.inner())
        .await?;

    Ok(Json(PageResponse {
        data: entries,
        limit,
        offset,
        total,
    }))
}
