//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// Error definitions for the simulation server.
#[derive(Debug)]
pub enum IssuesError {
    /// When a requested resource (page, mode, kind) is not found
    NotFound(String),
    /// When DB operations fail
    DatabaseError(sea_orm::DbErr),
    /// When a template fails to render
    Template(askama::Error),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for IssuesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuesError::NotFound(what) => write!(f, "Not found: {what}"),
            IssuesError::DatabaseError(err) => write!(f, "Database error: {err}"),
            IssuesError::Template(err) => write!(f, "Template error: {err}"),
            IssuesError::InternalServerError(message) => {
                write!(f, "Internal server error: {message}")
            }
        }
    }
}

impl std::error::Error for IssuesError {}

impl From<sea_orm::DbErr> for IssuesError {
    fn from(err: sea_orm::DbErr) -> Self {
        IssuesError::DatabaseError(err)
    }
}

impl From<askama::Error> for IssuesError {
    fn from(err: askama::Error) -> Self {
        IssuesError::Template(err)
    }
}

impl From<std::io::Error> for IssuesError {
    fn from(err: std::io::Error) -> Self {
        IssuesError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for IssuesError {
    fn into_response(self) -> axum::response::Response {
        match self {
            IssuesError::NotFound(what) => {
                info!("404 {what}");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Not Found"));
                *response.status_mut() = axum::http::StatusCode::NOT_FOUND;
                response
            }
            IssuesError::DatabaseError(err) => {
                tracing::error!("Database error: {}", err);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Database error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            IssuesError::Template(err) => {
                tracing::error!("Template error: {}", err);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            IssuesError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
