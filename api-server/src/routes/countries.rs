use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{Country, DataResponse};
use crate::seed_data::{COUNTRIES, seed_countries};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeedResponse {
    pub message: String,
    pub inserted: u64,
    pub total: usize,
}

/// List the country codes accepted by imports
#[openapi(tag = "Countries")]
#[get("/countries")]
pub async fn list_countries(
    pool: &State<PgPool>,
) -> Result<Json<DataResponse<Vec<Country>>>, ApiError> {
    let countries: Vec<Country> = sqlx::query_as("SELECT code, name FROM countries ORDER BY code")
        .fetch_all(pool.inner())
        .await?;

    Ok(Json(DataResponse { data: countries }))
}

/// Load the ISO 3166-1 country codes into the reference table
#[openapi(tag = "Admin")]
#[post("/admin/countries/seed")]
pub async fn seed_country_codes(pool: &State<PgPool>) -> Result<Json<SeedResponse>, ApiError> {
    let inserted = seed_countries(pool.inner()).await?;

    Ok(Json(SeedResponse {
        message: format!("Seeded {} new countries", inserted),
        inserted,
        total: COUNTRIES.len(),
    }))
}
