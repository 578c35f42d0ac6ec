pub(crate) use crate::error::IssuesError;
pub(crate) use crate::simulation::{Endpoint, Kind, Mode};
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Path, State};
pub(crate) use axum::http::{HeaderMap, header::CONTENT_TYPE};
pub(crate) use axum::response::{IntoResponse, Response};
pub(crate) use tracing::{debug, info, warn};
