use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use identity::{identity_from_authorization, verify_token, TokenConfig, TokenError};
use serde::Deserialize;
use server_api::{dispatch, ensure_administrator, ApiContext};
use shared::{
    domain::{EventId, Identity},
    error::{ApiError, ErrorCode},
    protocol::{ElectionEvent, ElectionRequest, ElectionResponse, EventRecord},
};
use storage::Storage;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

const MAX_RPC_BODY_BYTES: usize = 16 * 1024;
const MAX_EVENT_PAGE: u32 = 100;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
    storage: Storage,
    events: broadcast::Sender<ElectionEvent>,
    tokens: TokenConfig,
}

#[derive(Debug, Deserialize)]
struct ListEventsQuery {
    limit: Option<u32>,
    before: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext::open(
        Arc::new(storage.clone()),
        Identity::new(settings.administrator.trim()),
    )
    .await
    .map_err(shared::error::ApiException::from)?;
    let (events, _) = broadcast::channel(settings.event_buffer);
    let api = api.with_events(events.clone());

    let state = AppState {
        api,
        storage,
        events,
        tokens: TokenConfig {
            secret: settings.auth_secret,
            ttl_seconds: settings.token_ttl_seconds,
        },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, %database_url, "election server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/rpc",
            post(rpc).layer(RequestBodyLimitLayer::new(MAX_RPC_BODY_BYTES)),
        )
        .route("/winner", get(http_winner))
        .route("/events", get(http_list_events))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.storage.health_check().await.map_err(|e| {
        error!(error = %e, "health check failed");
        reject(ApiError::new(ErrorCode::Internal, format!("{e:#}")))
    })?;
    Ok("ok")
}

async fn rpc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ElectionRequest>,
) -> Result<Json<ElectionResponse>, HttpError> {
    let caller = optional_caller(&state.tokens, &headers)?;
    let response = dispatch(&state.api, caller.as_ref(), request)
        .await
        .map_err(reject)?;
    Ok(Json(response))
}

async fn http_winner(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ElectionResponse>, HttpError> {
    let response = dispatch(&state.api, None, ElectionRequest::Winner)
        .await
        .map_err(reject)?;
    Ok(Json(response))
}

async fn http_list_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventRecord>>, HttpError> {
    let caller = required_caller(&state.tokens, &headers)?;
    ensure_administrator(&state.api, &caller)
        .await
        .map_err(reject)?;

    let limit = q.limit.unwrap_or(MAX_EVENT_PAGE).clamp(1, MAX_EVENT_PAGE);
    let events = state
        .storage
        .list_events(limit, q.before.map(EventId))
        .await
        .map_err(|e| reject(ApiError::new(ErrorCode::Internal, format!("{e:#}"))))?;
    Ok(Json(events))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<WsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let subscriber = match q.token.as_deref() {
        Some(token) => verify_token(&state.tokens, token).map_err(unauthorized)?,
        None => required_caller(&state.tokens, &headers)?,
    };
    Ok(ws.on_upgrade(move |socket| ws_connection(state, socket, subscriber)))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket, subscriber: Identity) {
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();
    debug!(%subscriber, "event subscriber connected");

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%subscriber, skipped, "event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

fn optional_caller(tokens: &TokenConfig, headers: &HeaderMap) -> Result<Option<Identity>, HttpError> {
    match authorization(headers) {
        None => Ok(None),
        value => identity_from_authorization(tokens, value)
            .map(Some)
            .map_err(unauthorized),
    }
}

fn required_caller(tokens: &TokenConfig, headers: &HeaderMap) -> Result<Identity, HttpError> {
    identity_from_authorization(tokens, authorization(headers)).map_err(unauthorized)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

fn unauthorized(err: TokenError) -> HttpError {
    debug!(error = %err, "rejected bearer token");
    reject(ApiError::new(ErrorCode::Unauthorized, err.to_string()))
}

fn reject(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::InvalidState => StatusCode::CONFLICT,
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
