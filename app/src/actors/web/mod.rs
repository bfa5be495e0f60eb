//! Axum web server: the wheel's REST endpoints plus the static viewer.

pub mod routes;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use gamewheel::{ActorState, ActorStatus, GamewheelMessage};

/// Shared state for the web layer.
pub struct WebState {
    pub root: Arc<SystemState>,
    pub bus_tx: broadcast::Sender<GamewheelMessage>,
    pub addr: SocketAddr,
    pub actor_id: String,
    pub request_count: AtomicU64,
}

fn emit_status(status: ActorStatus, state: &WebState) {
    let mut telemetry = HashMap::from([
        ("bind".into(), state.addr.to_string()),
        (
            "requests".into(),
            state.request_count.load(Ordering::Relaxed).to_string(),
        ),
    ]);
    if status == ActorStatus::Disconnected {
        telemetry.insert("error".into(), "bind failed".into());
    }
    let _ = state
        .bus_tx
        .send(GamewheelMessage::new(ActorState::new(status, telemetry)).source(&state.actor_id));
}

// ---------------------------------------------------------------------------
// WebActor: wraps the axum web server as a normal actor
// ---------------------------------------------------------------------------

/// Web server actor. Spawns a dedicated thread with its own tokio runtime.
pub struct WebActor {
    addr: SocketAddr,
    ui_dir: Option<String>,
    shutdown_tx: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl WebActor {
    pub fn new(addr: SocketAddr, ui_dir: Option<String>) -> Self {
        Self {
            addr,
            ui_dir,
            shutdown_tx: Mutex::new(None),
        }
    }
}

impl Actor for WebActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, _receiver: BusReceiver) {
        let addr = self.addr;
        let ui_dir = self.ui_dir.clone();
        let actor_id = sender.actor_id().to_string();
        let bus_tx = sender.raw_sender().clone();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        *self.shutdown_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(shutdown_tx);

        let web = Arc::new(WebState {
            root: state,
            bus_tx,
            addr,
            actor_id: actor_id.clone(),
            request_count: AtomicU64::new(0),
        });
        let spawned = std::thread::Builder::new().name(actor_id).spawn(move || {
            match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(run(web, ui_dir, shutdown_rx)),
                Err(e) => tracing::error!("web server: failed to create runtime: {e}"),
            }
        });
        if let Err(e) = spawned {
            tracing::error!("failed to spawn webserver thread: {e}");
        }
    }

    fn stop(&self) {
        if let Some(tx) = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = tx.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the REST router. Static viewer assets are served from `ui_dir`
/// for any path the API does not claim.
pub fn router(state: Arc<WebState>, ui_dir: Option<&str>) -> Router {
    let counter_state = Arc::clone(&state);
    let count_middleware = axum::middleware::from_fn(move |req, next: axum::middleware::Next| {
        let st = Arc::clone(&counter_state);
        async move {
            st.request_count.fetch_add(1, Ordering::Relaxed);
            next.run(req).await
        }
    });

    let mut app = Router::new()
        .route("/wheel/state", get(routes::get_state))
        .route("/wheel/pool", get(routes::get_pool))
        .route("/wheel/spin", post(routes::post_spin))
        .route("/wheel/mode", post(routes::post_mode))
        .route("/wheel/settings", post(routes::post_settings))
        .route("/wheel/refresh", post(routes::post_refresh))
        .route(
            "/wheel/current",
            get(routes::get_current).post(routes::post_current),
        )
        .route(
            "/overlay/wheel-state",
            get(routes::get_state).post(routes::post_idle),
        )
        .route("/overlay/spin", get(routes::get_spin));

    if let Some(dir) = ui_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(count_middleware)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Web server run loop
// ---------------------------------------------------------------------------

/// Run the web server. Blocks until the shutdown signal.
async fn run(
    state: Arc<WebState>,
    ui_dir: Option<String>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let addr = state.addr;

    // Periodic telemetry emitter (every 5s)
    let telemetry_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(5));
        loop {
            interval.tick().await;
            emit_status(ActorStatus::Connected, &telemetry_state);
        }
    });

    if let Some(dir) = &ui_dir {
        tracing::info!("web server: serving viewer from {dir}");
    }
    let app = router(Arc::clone(&state), ui_dir.as_deref());

    // Retry bind until success or shutdown
    let mut shutdown_rx = shutdown_rx;
    let listener = loop {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(l) => break l,
            Err(e) => {
                tracing::warn!("web server: failed to bind {addr}: {e}, retrying in 3s");
                emit_status(ActorStatus::Disconnected, &state);
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_secs(3)) => continue,
                    _ = &mut shutdown_rx => return,
                }
            }
        }
    };

    tracing::info!("web server listening on {addr}");
    emit_status(ActorStatus::Connected, &state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async { drop(shutdown_rx.await) })
        .await
        .ok();
}
