//! REST endpoint handlers.
//!
//! Reads go straight to `WheelState`. Mutations are emitted on the bus as
//! `WheelCommand`s for the system actor; handlers that must return the
//! result (spin, refresh, preview publish, selection) wait for the matching
//! `WheelOutcome`.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;

use super::WebState;
use crate::state::config::generate_id;
use gamewheel::{
    CurrentSelection, ErrorResponse, GamewheelEvent, GamewheelMessage, IdleWheelState, ModeRequest,
    PoolResponse, PublishIdleRequest, SelectRequest, SettingsUpdate, SpinDescriptor, SpinRequest,
    WheelAction, WheelCommand, WheelResult,
};

/// How long a handler waits for the system actor to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Bus helpers
// ---------------------------------------------------------------------------

/// Fire-and-forget command.
fn emit(state: &WebState, action: WheelAction) {
    let _ = state.bus_tx.send(
        GamewheelMessage::new(WheelCommand {
            request_id: None,
            action,
        })
        .source("web"),
    );
}

/// Emit a command and wait for its `WheelOutcome`.
async fn request(state: &WebState, action: WheelAction) -> Result<WheelResult, ApiError> {
    let request_id = generate_id();
    let mut bus_rx = state.bus_tx.subscribe();

    let _ = state.bus_tx.send(
        GamewheelMessage::new(WheelCommand {
            request_id: Some(request_id.clone()),
            action,
        })
        .source("web"),
    );

    let result = tokio::time::timeout(REPLY_TIMEOUT, async {
        loop {
            match bus_rx.recv().await {
                Ok(msg) => {
                    if let GamewheelEvent::WheelOutcome(outcome) = msg.event
                        && outcome.request_id == request_id
                    {
                        return Some(outcome.result);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    })
    .await;

    match result {
        Ok(Some(r)) => Ok(r),
        _ => {
            tracing::warn!("wheel command {request_id}: timed out waiting for the system actor");
            Err(ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "timed out waiting for the wheel",
            ))
        }
    }
}

fn refused(result: WheelResult) -> ApiError {
    match result {
        WheelResult::EmptyPool => ApiError::new(StatusCode::CONFLICT, "no items in wheel"),
        WheelResult::Invalid { reason } => ApiError::new(StatusCode::BAD_REQUEST, reason),
        other => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unexpected reply: {other:?}"),
        ),
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /wheel/state, GET /overlay/wheel-state
pub async fn get_state(State(state): State<Arc<WebState>>) -> Json<IdleWheelState> {
    Json(state.root.wheel.snapshot())
}

/// GET /wheel/pool
pub async fn get_pool(State(state): State<Arc<WebState>>) -> Json<PoolResponse> {
    Json(state.root.wheel.pool())
}

/// GET /overlay/spin: the latest spin, or `{}` before the first one.
pub async fn get_spin(State(state): State<Arc<WebState>>) -> Response {
    match state.root.wheel.spin() {
        Some(spin) => Json(spin).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// GET /wheel/current: `null` until something is selected.
pub async fn get_current(State(state): State<Arc<WebState>>) -> Json<Option<CurrentSelection>> {
    Json(state.root.wheel.current())
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /wheel/spin: body optional (`{durationMs?, turns?}`).
pub async fn post_spin(
    State(state): State<Arc<WebState>>,
    body: Bytes,
) -> Result<Json<SpinDescriptor>, ApiError> {
    let spin_request = if body.iter().all(u8::is_ascii_whitespace) {
        SpinRequest::default()
    } else {
        serde_json::from_slice::<SpinRequest>(&body)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid spin request: {e}")))?
    };

    match request(
        &state,
        WheelAction::Spin {
            request: spin_request,
        },
    )
    .await?
    {
        WheelResult::Spun { spin } => Ok(Json(*spin)),
        other => Err(refused(other)),
    }
}

/// POST /wheel/mode: applied asynchronously by the system actor.
pub async fn post_mode(
    State(state): State<Arc<WebState>>,
    Json(body): Json<ModeRequest>,
) -> StatusCode {
    emit(&state, WheelAction::SetMode { mode: body.mode });
    StatusCode::ACCEPTED
}

/// POST /wheel/settings: partial update.
pub async fn post_settings(
    State(state): State<Arc<WebState>>,
    Json(update): Json<SettingsUpdate>,
) -> StatusCode {
    emit(&state, WheelAction::UpdateSettings { update });
    StatusCode::ACCEPTED
}

/// POST /wheel/refresh: re-read the library and draw a fresh idle sample.
pub async fn post_refresh(
    State(state): State<Arc<WebState>>,
) -> Result<Json<IdleWheelState>, ApiError> {
    match request(&state, WheelAction::Refresh).await? {
        WheelResult::Applied => Ok(Json(state.root.wheel.snapshot())),
        WheelResult::Invalid { reason } => Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, reason)),
        other => Err(refused(other)),
    }
}

/// POST /overlay/wheel-state: publish an admin preview as the idle sample.
pub async fn post_idle(
    State(state): State<Arc<WebState>>,
    Json(body): Json<PublishIdleRequest>,
) -> Result<Json<IdleWheelState>, ApiError> {
    match request(&state, WheelAction::PublishIdle { request: body }).await? {
        WheelResult::Applied => Ok(Json(state.root.wheel.snapshot())),
        other => Err(refused(other)),
    }
}

/// POST /wheel/current: make an entity the current game.
pub async fn post_current(
    State(state): State<Arc<WebState>>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<CurrentSelection>, ApiError> {
    match request(&state, WheelAction::Select { entity: body.entity }).await? {
        WheelResult::Applied => state
            .root
            .wheel
            .current()
            .map(Json)
            .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "selection not recorded")),
        other => Err(refused(other)),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::actors::Actor;
    use crate::actors::system::{SystemActor, WheelService};
    use crate::bus::{BUS_CAPACITY, BusSender};
    use crate::library::{Library, LibraryGame};
    use crate::state::SystemState;
    use gamewheel::{GameStatus, SLOT_COUNT};

    /// Running system actor + router. Stops the actor thread on drop.
    struct Harness {
        app: Router,
        state: Arc<WebState>,
        shutdown: Arc<AtomicBool>,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.shutdown.store(true, Ordering::Relaxed);
        }
    }

    fn library(n: usize) -> Library {
        Library {
            games: (0..n)
                .map(|i| LibraryGame {
                    id: format!("g{i}"),
                    title: format!("Game {i}"),
                    console: Some(if i % 2 == 0 { "SNES" } else { "NES" }.into()),
                    console_id: None,
                    image_url: None,
                    status: GameStatus::NotStarted,
                })
                .collect(),
            suggestions: Vec::new(),
        }
    }

    fn harness(lib: Library) -> Harness {
        let config_path = std::env::temp_dir()
            .join(format!("gamewheel-web-{}", uuid::Uuid::new_v4()))
            .join("config.toml");
        let (system_state, writer) = SystemState::new(config_path);
        let root = Arc::new(system_state);
        let (bus_tx, _) = broadcast::channel(BUS_CAPACITY);

        let shutdown = Arc::new(AtomicBool::new(false));
        let sender = BusSender::new("system".into(), bus_tx.clone(), Arc::clone(&shutdown));
        let receiver = sender.subscribe();
        let (actor, ready_rx) = SystemActor::new(WheelService::new(writer, Box::new(lib)));
        actor.start(Arc::clone(&root), sender, receiver);
        ready_rx.recv().unwrap();

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let state = Arc::new(WebState {
            root,
            bus_tx,
            addr,
            actor_id: "webserver.0".into(),
            request_count: AtomicU64::new(0),
        });
        Harness {
            app: super::super::router(Arc::clone(&state), None),
            state,
            shutdown,
        }
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let req = builder.body(Body::from(body.unwrap_or("").to_string())).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn state_has_full_sample_and_no_spin() {
        let h = harness(library(3));
        let (status, body) = call(&h.app, "GET", "/wheel/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "game");
        assert_eq!(body["poolSize"], 3);
        assert_eq!(body["sample"].as_array().unwrap().len(), SLOT_COUNT);
        assert!(body.get("spin").is_none());

        let (_, overlay) = call(&h.app, "GET", "/overlay/wheel-state", None).await;
        assert_eq!(overlay["sample"], body["sample"]);
        assert_eq!(h.state.request_count.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn spin_round_trip() {
        let h = harness(library(5));
        let (_, before) = call(&h.app, "GET", "/overlay/spin", None).await;
        assert_eq!(before, serde_json::json!({}));

        let (status, spin) = call(&h.app, "POST", "/wheel/spin", Some(r#"{"durationMs": 3000}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(spin["durationMs"], 3000);
        assert_eq!(spin["ageMs"], 0);
        let target = spin["targetIdx"].as_u64().unwrap() as usize;
        assert!(spin["sample"][target].is_object());

        let (_, polled) = call(&h.app, "GET", "/overlay/spin", None).await;
        assert_eq!(polled["spinId"], spin["spinId"]);
        assert_eq!(polled["ts"], spin["ts"]);
        assert!(polled["ageMs"].is_u64());

        let (_, state) = call(&h.app, "GET", "/wheel/state", None).await;
        assert_eq!(state["sample"], spin["sample"]);
        assert_eq!(state["spin"]["spinId"], spin["spinId"]);
    }

    #[tokio::test]
    async fn spin_without_body_uses_defaults() {
        let h = harness(library(2));
        let (status, spin) = call(&h.app, "POST", "/wheel/spin", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(spin["durationMs"], 4500);
        assert_eq!(spin["turns"], 8);
    }

    #[tokio::test]
    async fn spin_errors_map_to_status_codes() {
        let h = harness(Library::default());
        let (status, body) = call(&h.app, "POST", "/wheel/spin", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "no items in wheel");

        let (status, _) = call(&h.app, "POST", "/wheel/spin", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mode_change_is_applied_by_system_actor() {
        let h = harness(library(4));
        let (status, _) = call(&h.app, "POST", "/wheel/mode", Some(r#"{"mode":"console"}"#)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let mut body = serde_json::Value::Null;
        for _ in 0..50 {
            body = call(&h.app, "GET", "/wheel/state", None).await.1;
            if body["mode"] == "console" && body["poolSize"] == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(body["mode"], "console");
        assert_eq!(body["poolSize"], 2);

        let (_, pool) = call(&h.app, "GET", "/wheel/pool", None).await;
        assert_eq!(pool["pool"][0]["id"], "console-NES");
        assert_eq!(pool["pool"][0]["kind"], "console");
    }

    #[tokio::test]
    async fn preview_publish_and_selection() {
        let h = harness(library(4));
        let preview = r#"{"sample":[{"id":"g3","title":"Game 3"},null,{"id":"g1","title":"Game 1"}],"poolSize":4}"#;
        let (status, state) = call(&h.app, "POST", "/overlay/wheel-state", Some(preview)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["sample"][0]["id"], "g3");
        assert!(state["sample"][1].is_null());
        assert_eq!(state["sample"].as_array().unwrap().len(), SLOT_COUNT);

        let (_, none) = call(&h.app, "GET", "/wheel/current", None).await;
        assert!(none.is_null());

        let (status, current) =
            call(&h.app, "POST", "/wheel/current", Some(r#"{"entity":{"id":"g1","title":"Game 1"}}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(current["status"], "in_progress");
        assert_eq!(current["entity"]["id"], "g1");
    }
}
