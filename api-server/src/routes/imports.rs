//! User import endpoints.
//!
//! Both endpoints run one import synchronously and answer with the run
//! summary plus every failure descriptor collected on the way. An aborted
//! run answers 500 and still carries the failures seen before the abort.

use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::PgPool;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::import::{
    Failure, ImportConfig, ImportCoordinator, ImportSummary, Row, RunState, read_csv_rows,
};
use crate::models::DataResponse;
use crate::store::PgImportStore;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportRequest {
    /// Rows keyed by column name, in file order.
    pub rows: Vec<Row>,
    /// Overrides the configured batch size for this run.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ImportResponse {
    pub summary: ImportSummary,
    pub failures: Vec<Failure>,
}

async fn run_import(
    pool: &PgPool,
    config: &ImportConfig,
    company_id: i64,
    rows: Vec<Row>,
    batch_size: Option<usize>,
) -> Result<ImportResponse, ApiError> {
    let mut config = config.clone();
    if let Some(batch_size) = batch_size {
        config = config.with_batch_size(batch_size);
    }

    let store = PgImportStore::new(pool.clone());
    let mut importer = ImportCoordinator::new(store, company_id, config)?;
    let summary = match importer.run(rows).await {
        Ok(summary) => summary,
        Err(err) if importer.state() == RunState::Aborted => {
            return Err(ApiError::ImportAborted {
                message: err.to_string(),
                failures: importer.into_failures(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    Ok(ImportResponse {
        summary,
        failures: importer.into_failures(),
    })
}

/// Import users from JSON rows for a company
#[openapi(tag = "Imports")]
#[post("/companies/<company_id>/user-imports", format = "json", data = "<request>")]
pub async fn import_users(
    company_id: i64,
    request: Json<ImportRequest>,
    pool: &State<PgPool>,
    config: &State<ImportConfig>,
) -> Result<Json<DataResponse<ImportResponse>>, ApiError> {
    let request = request.into_inner();
    log::info!(
        "received {} rows for company {}",
        request.rows.len(),
        company_id
    );

    let response = run_import(
        pool.inner(),
        config.inner(),
        company_id,
        request.rows,
        request.batch_size,
    )
    .await?;

    Ok(Json(DataResponse { data: response }))
}

/// Import users from a CSV document with a heading row
#[openapi(tag = "Imports")]
#[post("/companies/<company_id>/user-imports/csv?<batch_size>", format = "text/csv", data = "<body>")]
pub async fn import_users_csv(
    company_id: i64,
    batch_size: Option<usize>,
    body: String,
    pool: &State<PgPool>,
    config: &State<ImportConfig>,
) -> Result<Json<DataResponse<ImportResponse>>, ApiError> {
    let rows = read_csv_rows(body.as_bytes())?;
    log::info!("parsed {} csv rows for company {}", rows.len(), company_id);

    let response = run_import(pool.inner(), config.inner(), company_id, rows, batch_size).await?;

    Ok(Json(DataResponse { data: response }))
}
