//! REST API request/response types shared between the app and UI crates.

use serde::{Deserialize, Serialize};

use crate::{CandidateEntity, FilterSettings, Sample, SpinDescriptor, WheelMode};

/// GET /wheel/state and GET /overlay/wheel-state response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleWheelState {
    pub mode: WheelMode,
    pub sample: Sample,
    #[serde(default)]
    pub pool_size: usize,
    #[serde(default)]
    pub settings: FilterSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin: Option<SpinDescriptor>,
}

/// POST /wheel/mode request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRequest {
    pub mode: WheelMode,
}

/// POST /wheel/spin request body. Unset fields fall back to the settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turns: Option<u32>,
}

/// POST /overlay/wheel-state request body: publish a preview sample as the
/// idle sample without starting a spin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishIdleRequest {
    pub sample: Sample,
    #[serde(default)]
    pub pool_size: usize,
}

/// GET /wheel/pool response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResponse {
    pub mode: WheelMode,
    pub pool: Vec<CandidateEntity>,
}

/// Play status of the current game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// GET /wheel/current response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSelection {
    pub entity: CandidateEntity,
    pub status: GameStatus,
}

/// POST /wheel/current request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectRequest {
    pub entity: CandidateEntity,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
