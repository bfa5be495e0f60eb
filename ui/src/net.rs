//! Networking: ehttp REST polling and commands.
//!
//! Async results are placed in a shared `Pending` queue (Arc<Mutex>)
//! that the app drains each frame. Sync state is never touched from a
//! callback.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{
    ErrorResponse, IdleWheelState, ModeRequest, PoolResponse, PublishIdleRequest, SelectRequest,
    SettingsUpdate, SpinDescriptor, SpinRequest, ViewerRole,
};

// ---------------------------------------------------------------------------
// Pending results queue, shared between async callbacks and the app.
// Arc<Mutex> instead of Rc<RefCell> because ehttp 0.6 requires Send callbacks.
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Pending {
    /// Polled idle states, oldest first.
    pub states: Vec<IdleWheelState>,
    /// Polled or freshly created spins, oldest first.
    pub spins: Vec<SpinDescriptor>,
    pub pool: Option<PoolResponse>,
    /// Request failures worth showing to the operator.
    pub errors: Vec<String>,
    /// Outcome of the last poll: `true` reachable, `false` failed.
    pub reachable: Option<bool>,
}

pub type PendingHandle = Arc<Mutex<Pending>>;

pub fn new_pending() -> PendingHandle {
    Arc::new(Mutex::new(Pending::default()))
}

// ---------------------------------------------------------------------------
// Helpers: platform-specific URL resolution
// ---------------------------------------------------------------------------

const FALLBACK_BASE: &str = "http://127.0.0.1:8787";

#[cfg(target_arch = "wasm32")]
fn api_base() -> String {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    if origin.is_empty() || origin == "null" {
        FALLBACK_BASE.to_string()
    } else {
        origin
    }
}

#[cfg(not(target_arch = "wasm32"))]
static NATIVE_BASE_URL: std::sync::OnceLock<String> = std::sync::OnceLock::new();

/// Set the base URL for native builds (e.g. "http://127.0.0.1:8787").
/// Must be called before the app is created.
#[cfg(not(target_arch = "wasm32"))]
pub fn set_base_url(url: String) {
    NATIVE_BASE_URL.set(url).ok();
}

#[cfg(not(target_arch = "wasm32"))]
fn api_base() -> String {
    NATIVE_BASE_URL
        .get()
        .cloned()
        .unwrap_or_else(|| FALLBACK_BASE.to_string())
}

fn with_pending(pending: &PendingHandle, f: impl FnOnce(&mut Pending)) {
    if let Ok(mut p) = pending.lock() {
        f(&mut p);
    }
}

fn json_post(url: &str, body: &impl Serialize) -> ehttp::Request {
    let body = serde_json::to_vec(body).unwrap_or_default();
    let mut req = ehttp::Request::post(url, body);
    req.headers
        .insert("Content-Type".to_string(), "application/json".to_string());
    req
}

/// Decode a 2xx body, or turn the response into an operator-facing message.
fn decode<T: DeserializeOwned>(result: ehttp::Result<ehttp::Response>) -> Result<T, String> {
    let resp = result?;
    if !resp.ok {
        let reason = serde_json::from_slice::<ErrorResponse>(&resp.bytes)
            .map(|e| e.error)
            .unwrap_or_else(|_| resp.status_text.clone());
        return Err(format!("{} {}", resp.status, reason));
    }
    serde_json::from_slice(&resp.bytes).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Fire the GETs for one poll tick. The overlay reads the spin endpoint
/// separately; the admin gets the spin embedded in the state.
pub fn poll(ctx: &egui::Context, pending: &PendingHandle, role: ViewerRole) {
    match role {
        ViewerRole::Overlay => {
            fetch_spin(ctx, pending);
            fetch_state(ctx, pending, "/overlay/wheel-state");
        }
        ViewerRole::Admin => fetch_state(ctx, pending, "/wheel/state"),
    }
}

fn fetch_state(ctx: &egui::Context, pending: &PendingHandle, path: &str) {
    let ctx = ctx.clone();
    let pending = Arc::clone(pending);
    let url = format!("{}{path}", api_base());
    ehttp::fetch(ehttp::Request::get(&url), move |result| {
        match decode::<IdleWheelState>(result) {
            Ok(state) => with_pending(&pending, |p| {
                p.states.push(state);
                p.reachable = Some(true);
            }),
            Err(e) => {
                log::debug!("poll {url} failed: {e}");
                with_pending(&pending, |p| p.reachable = Some(false));
            }
        }
        ctx.request_repaint();
    });
}

fn fetch_spin(ctx: &egui::Context, pending: &PendingHandle) {
    let ctx = ctx.clone();
    let pending = Arc::clone(pending);
    let url = format!("{}/overlay/spin", api_base());
    ehttp::fetch(ehttp::Request::get(&url), move |result| {
        // `{}` before the first spin does not decode and is simply skipped.
        match decode::<SpinDescriptor>(result) {
            Ok(spin) => {
                with_pending(&pending, |p| p.spins.push(spin));
                ctx.request_repaint();
            }
            Err(e) => log::debug!("poll {url}: {e}"),
        }
    });
}

pub fn fetch_pool(ctx: &egui::Context, pending: &PendingHandle) {
    let ctx = ctx.clone();
    let pending = Arc::clone(pending);
    let url = format!("{}/wheel/pool", api_base());
    ehttp::fetch(ehttp::Request::get(&url), move |result| {
        match decode::<PoolResponse>(result) {
            Ok(pool) => with_pending(&pending, |p| p.pool = Some(pool)),
            Err(e) => with_pending(&pending, |p| p.errors.push(format!("pool: {e}"))),
        }
        ctx.request_repaint();
    });
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Request a spin. The returned descriptor is fed straight into the sync
/// state; the next poll reports the same `ts` and is ignored.
pub fn post_spin(ctx: &egui::Context, pending: &PendingHandle, req: &SpinRequest) {
    let ctx = ctx.clone();
    let pending = Arc::clone(pending);
    let url = format!("{}/wheel/spin", api_base());
    ehttp::fetch(json_post(&url, req), move |result| {
        match decode::<SpinDescriptor>(result) {
            Ok(spin) => with_pending(&pending, |p| p.spins.push(spin)),
            Err(e) => with_pending(&pending, |p| p.errors.push(format!("spin: {e}"))),
        }
        ctx.request_repaint();
    });
}

/// Commands answered with an empty 202 or a body the app does not need.
fn post_command(ctx: &egui::Context, pending: &PendingHandle, path: &str, body: &impl Serialize) {
    let ctx = ctx.clone();
    let pending = Arc::clone(pending);
    let label = path.trim_start_matches('/').to_string();
    let url = format!("{}{path}", api_base());
    ehttp::fetch(json_post(&url, body), move |result| {
        let failure = match result {
            Ok(resp) if resp.ok => None,
            Ok(resp) => Some(
                serde_json::from_slice::<ErrorResponse>(&resp.bytes)
                    .map(|e| format!("{} {}", resp.status, e.error))
                    .unwrap_or_else(|_| format!("{} {}", resp.status, resp.status_text)),
            ),
            Err(e) => Some(e),
        };
        if let Some(e) = failure {
            with_pending(&pending, |p| p.errors.push(format!("{label}: {e}")));
        }
        ctx.request_repaint();
    });
}

pub fn post_mode(ctx: &egui::Context, pending: &PendingHandle, req: &ModeRequest) {
    post_command(ctx, pending, "/wheel/mode", req);
}

pub fn post_settings(ctx: &egui::Context, pending: &PendingHandle, update: &SettingsUpdate) {
    post_command(ctx, pending, "/wheel/settings", update);
}

pub fn post_refresh(ctx: &egui::Context, pending: &PendingHandle) {
    post_command(ctx, pending, "/wheel/refresh", &serde_json::json!({}));
}

pub fn post_current(ctx: &egui::Context, pending: &PendingHandle, req: &SelectRequest) {
    post_command(ctx, pending, "/wheel/current", req);
}

/// Publish a locally shuffled preview as the idle sample for every viewer.
pub fn post_idle(ctx: &egui::Context, pending: &PendingHandle, req: &PublishIdleRequest) {
    post_command(ctx, pending, "/overlay/wheel-state", req);
}
