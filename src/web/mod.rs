//! HTTP and WebSocket front end
use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header::CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::get;
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use crate::hub::SimulationHub;
use crate::simulation::{Mode, SimulationService};

mod prelude;
mod socket;
mod views;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    db: Arc<DatabaseConnection>,
    hub: SimulationHub,
    problems: Arc<SimulationService>,
    solutions: Arc<SimulationService>,
}

impl AppState {
    fn new(db: DatabaseConnection) -> Self {
        let db = Arc::new(db);
        let hub = SimulationHub::new();
        Self {
            problems: Arc::new(SimulationService::new(
                Mode::Problems,
                hub.clone(),
                Some(db.clone()),
            )),
            solutions: Arc::new(SimulationService::new(
                Mode::Solutions,
                hub.clone(),
                Some(db.clone()),
            )),
            db,
            hub,
        }
    }

    fn service(&self, mode: Mode) -> &SimulationService {
        match mode {
            Mode::Problems => &self.problems,
            Mode::Solutions => &self.solutions,
        }
    }
}

fn mode_routes(mode: Mode) -> Router<AppState> {
    Router::new()
        .route(
            "/stop",
            get(move |state: State<AppState>| views::stop_handler(mode, state)),
        )
        .route(
            "/progress",
            get(move |state: State<AppState>, headers: HeaderMap| {
                views::progress_handler(mode, state, headers)
            }),
        )
        .route(
            "/{page}",
            get(move |state: State<AppState>, page: Path<String>| {
                views::simulate_page_handler(mode, state, page)
            }),
        )
}

fn create_router() -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(views::home_handler))
        .route("/reservations", get(views::reservations_handler))
        .route("/ws/{mode}/{kind}", get(socket::socket_handler))
        .route("/static/styles.css", get(styles_handler))
        .route("/static/script.js", get(script_handler));
    for mode in [Mode::Problems, Mode::Solutions] {
        router = router
            .route(mode.index_path(), get(move || views::index_handler(mode)))
            .nest(mode.route_prefix(), mode_routes(mode));
    }
    router
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

async fn script_handler() -> impl IntoResponse {
    const SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/script.js"));
    ([(CONTENT_TYPE, "text/javascript")], SCRIPT)
}

/// The full application, ready to serve.
pub fn app(db: DatabaseConnection) -> Router {
    create_router().with_state(AppState::new(db))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

/// Bind `listen_addr:port` and serve until ctrl-c.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    db: DatabaseConnection,
) -> Result<(), anyhow::Error> {
    let app = app(db);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}
