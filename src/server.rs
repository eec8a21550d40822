use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use ical_filter::CalendarConfig;
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, warn};

use crate::feed;

type Calendars = Arc<HashMap<String, Arc<CalendarConfig>>>;

#[derive(Clone)]
struct AppState {
    calendars: Calendars,
    client: Client,
}

pub fn router(calendars: Vec<CalendarConfig>, client: Client) -> Router {
    let calendars = calendars
        .into_iter()
        .map(|calendar| {
            debug!(calendar = %calendar.name, http_path = %calendar.feed_path(), "configuring endpoint");
            (calendar.name.clone(), Arc::new(calendar))
        })
        .collect::<HashMap<_, _>>();

    Router::new()
        .route("/calendars/:name/feed", get(handle_feed))
        .route("/liveness", get(|| async {}))
        .route("/readiness", get(|| async {}))
        .with_state(AppState {
            calendars: Arc::new(calendars),
            client,
        })
}

/// Serves `router` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

pub async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutting down");
}

/// The first `token` query parameter; repeated ones are ignored.
fn token(query: &[(String, String)]) -> &str {
    query
        .iter()
        .find(|(key, _)| key == "token")
        .map_or("", |(_, value)| value.as_str())
}

async fn handle_feed(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let Some(calendar) = state.calendars.get(&name) else {
        debug!(calendar = %name, client_ip = %client_addr, "unknown calendar requested");
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    debug!(calendar = %name, client_ip = %client_addr, "received request for calendar");

    if !calendar.authorize(token(&query)) {
        warn!(calendar = %name, client_ip = %client_addr, "unauthorized access attempt");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    match feed::fetch(&state.client, calendar).await {
        Ok(body) => {
            info!(calendar = %name, client_ip = %client_addr, "calendar request processed");
            ([(header::CONTENT_TYPE, "text/calendar")], body).into_response()
        }
        Err(err) => {
            error!(calendar = %name, error = %err, "error fetching and filtering feed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
