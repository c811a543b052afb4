use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{Company, DataResponse, User};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCompanyRequest {
    name: String,
}

/// Create a company that users can be imported into
#[openapi(tag = "Companies")]
#[post("/companies", format = "json", data = "<request>")]
pub async fn create_company(
    request: Json<CreateCompanyRequest>,
    pool: &State<PgPool>,
) -> Result<Json<DataResponse<Company>>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Company name must not be empty".to_string()));
    }

    let company: Company = sqlx::query_as(
        "INSERT INTO companies (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(pool.inner())
    .await?;

    log::info!("created company {} ({})", company.id, company.name);
    Ok(Json(DataResponse { data: company }))
}

/// List users linked to a company
#[openapi(tag = "Companies")]
#[get("/companies/<company_id>/users")]
pub async fn list_company_users(
    company_id: i64,
    pool: &State<PgPool>,
) -> Result<Json<DataResponse<Vec<User>>>, ApiError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1)")
        .bind(company_id)
        .fetch_one(pool.inner())
        .await?;
    if !exists {
        return Err(ApiError::NotFound(format!("Company {company_id} not found")));
    }

    let users: Vec<User> = sqlx::query_as(
        r#"SELECT u.id, u.username, u.firstname, u.lastname, u.sex, u.country, u.email, u.created_at
           FROM users u
           JOIN company_user cu ON cu.user_id = u.id
           WHERE cu.company_id = $1
           ORDER BY u.id ASC"#,
    )
    .bind(company_id)
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(DataResponse { data: users }))
}
