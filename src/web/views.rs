use super::prelude::*;
use crate::constants::RESERVATIONS_PAGE_SIZE;
use crate::db::entities::reservations;
use axum::Json;
use axum::http::header::ACCEPT;
use axum::response::Redirect;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) sessions: usize,
}

#[derive(Clone, Debug)]
pub(crate) struct ScenarioLink {
    pub(crate) title: &'static str,
    pub(crate) href: String,
    pub(crate) blurb: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) heading: &'static str,
    pub(crate) scenarios: Vec<ScenarioLink>,
    pub(crate) progress_path: String,
    pub(crate) stop_path: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "simulation.html")]
pub(crate) struct SimulationTemplate {
    pub(crate) heading: String,
    pub(crate) simulation: String,
    pub(crate) ws_path: String,
    pub(crate) stop_path: String,
    pub(crate) progress_path: String,
    pub(crate) back_path: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "progress.html")]
pub(crate) struct ProgressTemplate {
    pub(crate) heading: String,
}

#[derive(Clone, Debug)]
pub(crate) struct ReservationRow {
    pub(crate) username: String,
    pub(crate) slot: String,
    pub(crate) status: String,
    pub(crate) created_at: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "reservations.html")]
pub(crate) struct ReservationsTemplate {
    pub(crate) reservations: Vec<ReservationRow>,
}

fn blurb(mode: Mode, kind: Kind) -> &'static str {
    match (mode, kind) {
        (Mode::Problems, Kind::Deadlock) => {
            "Two threads each lock one resource, then wait forever for the other's."
        }
        (Mode::Problems, Kind::Starvation) => {
            "A greedy user holds the reservation lock so the other never books a slot."
        }
        (Mode::Problems, Kind::Livelock) => {
            "Two agents keep stepping aside for each other and never get anywhere."
        }
        (Mode::Solutions, Kind::Deadlock) => "Both threads lock the resources in the same order.",
        (Mode::Solutions, Kind::Starvation) => {
            "A fair lock hands out the reservation in the order users asked for it."
        }
        (Mode::Solutions, Kind::Livelock) => {
            "Agents give up after a few attempts instead of adjusting forever."
        }
    }
}

fn running_message(mode: Mode, kind: Kind) -> String {
    match mode {
        Mode::Problems => format!(
            "{} simulation is running. Please observe the behavior...",
            kind.title()
        ),
        Mode::Solutions => format!(
            "{} solution is running. Please observe the behavior...",
            kind.title()
        ),
    }
}

/// handles the / GET
pub(crate) async fn home_handler(State(state): State<AppState>) -> HomeTemplate {
    HomeTemplate {
        sessions: state.hub.session_count(),
    }
}

/// `/problems` and `/solutions`
pub(crate) async fn index_handler(mode: Mode) -> IndexTemplate {
    let prefix = mode.route_prefix();
    IndexTemplate {
        heading: match mode {
            Mode::Problems => "Concurrency problems",
            Mode::Solutions => "Concurrency solutions",
        },
        scenarios: Kind::ALL
            .into_iter()
            .map(|kind| ScenarioLink {
                title: kind.title(),
                href: format!("{prefix}/{kind}-page"),
                blurb: blurb(mode, kind),
            })
            .collect(),
        progress_path: format!("{prefix}/progress"),
        stop_path: format!("{prefix}/stop"),
    }
}

/// `/simulate-{mode}/{kind}-page`: sets the scenario up; it starts once the page's socket connects
pub(crate) async fn simulate_page_handler(
    mode: Mode,
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<SimulationTemplate, IssuesError> {
    let kind = Kind::from_page(&page)?;
    state.service(mode).launch(kind).await;

    let prefix = mode.route_prefix();
    Ok(SimulationTemplate {
        heading: match mode {
            Mode::Problems => format!("{} simulation", kind.title()),
            Mode::Solutions => format!("{} solution", kind.title()),
        },
        simulation: running_message(mode, kind),
        ws_path: Endpoint::new(mode, kind).path(),
        stop_path: format!("{prefix}/stop"),
        progress_path: format!("{prefix}/progress"),
        back_path: mode.index_path(),
    })
}

/// `/simulate-{mode}/stop`
pub(crate) async fn stop_handler(mode: Mode, State(state): State<AppState>) -> Redirect {
    match state.service(mode).stop().await {
        Some(kind) => info!("Stopped {kind} {mode} simulation"),
        None => debug!("Nothing to stop in {mode}"),
    }
    Redirect::to(mode.index_path())
}

enum Wants {
    Html,
    Json,
    Text,
}

fn wants(headers: &HeaderMap) -> Wants {
    let accept = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if accept.contains("text/html") {
        Wants::Html
    } else if accept.contains("application/json") {
        Wants::Json
    } else {
        Wants::Text
    }
}

/// `/simulate-{mode}/progress`: a page for browsers, whose script then fetches the same
/// address for the plain-text log.
pub(crate) async fn progress_handler(
    mode: Mode,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let progress = state.service(mode).progress().await;
    match wants(&headers) {
        Wants::Html => ProgressTemplate {
            heading: format!("{} progress", mode.as_str()),
        }
        .into_response(),
        Wants::Json => Json(progress).into_response(),
        Wants::Text => (
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            progress.text(),
        )
            .into_response(),
    }
}

/// `/reservations`
pub(crate) async fn reservations_handler(
    State(state): State<AppState>,
) -> Result<ReservationsTemplate, IssuesError> {
    let rows = reservations::recent(&*state.db, RESERVATIONS_PAGE_SIZE).await?;
    Ok(ReservationsTemplate {
        reservations: rows
            .into_iter()
            .map(|row| ReservationRow {
                username: row.username,
                slot: row.slot,
                status: row.status,
                created_at: row.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .collect(),
    })
}
