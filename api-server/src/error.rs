use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

use crate::import::{CsvRowsError, Failure, ImportError};

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    BadRequest(String),
    InternalError(String),
    /// A run stopped on a store error; carries the failures collected before it.
    ImportAborted {
        message: String,
        failures: Vec<Failure>,
    },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<Vec<Failure>>,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message, failures) = match self {
            ApiError::DatabaseError(e) => {
                log::error!("database error: {}", e);
                (Status::InternalServerError, "DatabaseError", e.to_string(), None)
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg, None)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg, None)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg, None)
            }
            ApiError::ImportAborted { message, failures } => {
                log::error!("import aborted with {} failures: {}", failures.len(), message);
                (Status::InternalServerError, "ImportAborted", message, Some(failures))
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            failures,
        };

        let json = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        Ok(Responses::default())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::DatabaseError(err),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnknownCompany(id) => ApiError::NotFound(format!("Company {id} not found")),
            ImportError::InvalidState(_) => ApiError::BadRequest(err.to_string()),
            ImportError::UsernameExhausted { .. }
            | ImportError::InvalidRule { .. }
            | ImportError::BatchWrite { .. }
            | ImportError::FailureWrite { .. }
            | ImportError::Store(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<CsvRowsError> for ApiError {
    fn from(err: CsvRowsError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
