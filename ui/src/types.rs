//! Wire types re-exported from `gamewheel` plus UI-local records.

pub use gamewheel::{
    AlertLevel, BonusCategory, BonusMode, CandidateEntity, ClockReading, CurrentSelection, ErrorResponse,
    FilterSettings, IdleWheelState, ModeRequest, PoolResponse, PublishIdleRequest, Sample,
    SelectRequest, SettingsUpdate, SpinDescriptor, SpinRequest, SpinSource, ViewerRole,
    WheelMode,
};

/// One line in the admin activity log.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    /// RFC 3339 local-receipt time.
    pub timestamp: String,
    pub kind: ActivityKind,
    pub text: String,
    /// Only set for request failures.
    pub level: Option<AlertLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Spin,
    Winner,
    Idle,
    Mode,
    Request,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Spin,
        ActivityKind::Winner,
        ActivityKind::Idle,
        ActivityKind::Mode,
        ActivityKind::Request,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ActivityKind::Spin => "spin",
            ActivityKind::Winner => "winner",
            ActivityKind::Idle => "idle",
            ActivityKind::Mode => "mode",
            ActivityKind::Request => "request",
        }
    }
}
