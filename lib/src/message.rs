//! `GamewheelMessage` bus types.
//!
//! The server runs a single `broadcast<GamewheelMessage>` channel. Each
//! message carries the global ID of its originator, a timestamp, and a
//! typed event. The web layer emits `WheelCommand`s; the system actor is
//! the only consumer that mutates wheel state and answers with a
//! `WheelOutcome` when the command carried a `request_id`.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CandidateEntity, PublishIdleRequest, SettingsUpdate, SpinDescriptor, SpinRequest, WheelMode,
};

// ---------------------------------------------------------------------------
// Top-level message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamewheelMessage {
    #[serde(default)]
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: GamewheelEvent,
}

#[cfg(not(target_arch = "wasm32"))]
impl GamewheelMessage {
    /// New message stamped with the current UTC time.
    pub fn new(event: impl Into<GamewheelEvent>) -> Self {
        Self {
            source: String::new(),
            timestamp: Utc::now(),
            event: event.into(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

impl From<WheelCommand> for GamewheelEvent {
    fn from(cmd: WheelCommand) -> Self {
        GamewheelEvent::WheelCommand(cmd)
    }
}

impl From<WheelAction> for GamewheelEvent {
    fn from(action: WheelAction) -> Self {
        GamewheelEvent::WheelCommand(WheelCommand {
            request_id: None,
            action,
        })
    }
}

impl From<WheelOutcome> for GamewheelEvent {
    fn from(outcome: WheelOutcome) -> Self {
        GamewheelEvent::WheelOutcome(outcome)
    }
}

impl From<ActorState> for GamewheelEvent {
    fn from(state: ActorState) -> Self {
        GamewheelEvent::ActorStatus(state)
    }
}

impl From<AlertMessage> for GamewheelEvent {
    fn from(alert: AlertMessage) -> Self {
        GamewheelEvent::Alert(alert)
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GamewheelEvent {
    /// Wheel mutation request (emitted by REST handlers).
    WheelCommand(WheelCommand),
    /// Result of a `WheelCommand` that carried a `request_id`.
    WheelOutcome(WheelOutcome),
    /// Actor lifecycle + telemetry.
    ActorStatus(ActorState),
    /// User-visible warn/error condition.
    Alert(AlertMessage),
}

// ---------------------------------------------------------------------------
// WheelCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelCommand {
    /// Correlation ID for request-reply. When present the system actor
    /// answers with a `WheelOutcome` carrying the same ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub action: WheelAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WheelAction {
    SetMode { mode: WheelMode },
    UpdateSettings { update: SettingsUpdate },
    Spin { request: SpinRequest },
    PublishIdle { request: PublishIdleRequest },
    /// Re-read the library and regenerate the idle sample.
    Refresh,
    Select { entity: CandidateEntity },
}

impl fmt::Display for WheelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetMode { mode } => write!(f, "set_mode({mode})"),
            Self::UpdateSettings { .. } => write!(f, "update_settings"),
            Self::Spin { .. } => write!(f, "spin"),
            Self::PublishIdle { .. } => write!(f, "publish_idle"),
            Self::Refresh => write!(f, "refresh"),
            Self::Select { entity } => write!(f, "select({})", entity.id),
        }
    }
}

// ---------------------------------------------------------------------------
// WheelOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelOutcome {
    pub request_id: String,
    pub result: WheelResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WheelResult {
    Applied,
    Spun { spin: Box<SpinDescriptor> },
    /// Nothing eligible to land on.
    EmptyPool,
    Invalid { reason: String },
}

// ---------------------------------------------------------------------------
// ActorStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Starting,
    Disconnected,
    Connected,
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Actor lifecycle status plus free-form key/value telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    pub status: ActorStatus,
    #[serde(default)]
    pub telemetry: HashMap<String, String>,
}

impl ActorState {
    pub fn new(status: ActorStatus, telemetry: HashMap<String, String>) -> Self {
        Self { status, telemetry }
    }
}

// ---------------------------------------------------------------------------
// AlertMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warn,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warn => write!(f, "warn"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub level: AlertLevel,
    pub message: String,
}
