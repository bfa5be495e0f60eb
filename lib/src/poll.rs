//! Polling cadence and the per-viewer reconciliation driver.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    ClientSyncState, ClockReading, FilterSettings, IdleObservation, IdleWheelState, ModeController,
    ModeRequest, SpinDescriptor, SpinObservation, Transition, WheelMode, WinnerEffect,
};

/// Which surface a viewer is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    /// Operator panel: slower polling, applies winner effects, skips stale replays.
    #[default]
    Admin,
    /// Broadcast overlay: fast polling, display only.
    Overlay,
}

impl ViewerRole {
    pub fn poll_interval_ms(self) -> f64 {
        match self {
            Self::Admin => 1000.0,
            Self::Overlay => 250.0,
        }
    }

    /// Whether a spin that finished long before it was first seen is still animated.
    pub fn replays_stale_spins(self) -> bool {
        matches!(self, Self::Overlay)
    }

    pub fn applies_winner_effects(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Parse `?role=` style values. Anything unknown is `None`.
    pub fn from_query(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "overlay" => Some(Self::Overlay),
            _ => None,
        }
    }
}

impl fmt::Display for ViewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Overlay => write!(f, "overlay"),
        }
    }
}

/// Fixed-interval timer on the monotonic frame clock.
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    interval_ms: f64,
    next_due_ms: Option<f64>,
}

impl PollSchedule {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            next_due_ms: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// `true` once per interval. The first call is always due.
    pub fn due(&mut self, now_ms: f64) -> bool {
        match self.next_due_ms {
            Some(next) if now_ms < next => false,
            _ => {
                self.next_due_ms = Some(now_ms + self.interval_ms);
                true
            }
        }
    }

    /// Milliseconds until the next poll (zero when overdue).
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        self.next_due_ms.map_or(0.0, |next| (next - now_ms).max(0.0))
    }
}

/// What one polled state response changed.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub mode_changed: bool,
    pub spin: Option<SpinObservation>,
    pub idle: IdleObservation,
}

/// Output of one frame tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub transitions: Vec<Transition>,
    /// Follow-up actions for revealed winners. Only populated for the admin.
    pub effects: Vec<WinnerEffect>,
}

/// Ties one viewer's sync state, mode tracking and poll timer together.
///
/// The viewer's network layer calls `due` every frame and issues the GETs
/// when it returns `true`; whatever comes back is fed through `on_state` /
/// `on_spin`. `on_frame` advances the animation.
#[derive(Debug, Clone)]
pub struct ReconciliationPoller {
    role: ViewerRole,
    schedule: PollSchedule,
    sync: ClientSyncState,
    mode: ModeController,
    settings: Option<FilterSettings>,
}

impl ReconciliationPoller {
    pub fn new(role: ViewerRole) -> Self {
        Self {
            role,
            schedule: PollSchedule::new(role.poll_interval_ms()),
            sync: ClientSyncState::new(role),
            mode: ModeController::new(),
            settings: None,
        }
    }

    pub fn role(&self) -> ViewerRole {
        self.role
    }

    pub fn sync(&self) -> &ClientSyncState {
        &self.sync
    }

    pub fn mode(&self) -> &ModeController {
        &self.mode
    }

    /// Filters last reported by the server.
    pub fn settings(&self) -> Option<&FilterSettings> {
        self.settings.as_ref()
    }

    pub fn due(&mut self, now_ms: f64) -> bool {
        self.schedule.due(now_ms)
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    /// Ask for a mode switch. The local mode is untouched until a poll confirms it.
    pub fn request_mode(&mut self, mode: WheelMode) -> Option<ModeRequest> {
        self.mode.request(mode)
    }

    /// Feed a polled spin descriptor (the overlay's `/overlay/spin`).
    pub fn on_spin(&mut self, descriptor: SpinDescriptor, now: ClockReading) -> SpinObservation {
        self.sync.observe_spin(descriptor, now)
    }

    /// Feed a polled idle state. The mode is reconciled first, then any
    /// embedded spin, then the idle sample.
    pub fn on_state(&mut self, state: IdleWheelState, now: ClockReading) -> StateUpdate {
        let mode_changed = self.mode.observe(state.mode);
        if mode_changed {
            self.sync.reset_for_mode_change();
        }
        self.settings = Some(state.settings.clone());

        let spin = state
            .spin
            .clone()
            .map(|descriptor| self.sync.observe_spin(descriptor, now));
        let idle = self.sync.observe_idle(&state, now.mono_ms);

        StateUpdate {
            mode_changed,
            spin,
            idle,
        }
    }

    pub fn on_frame(&mut self, now_ms: f64) -> Frame {
        let transitions = self.sync.advance(now_ms);
        let effects = if self.role.applies_winner_effects() {
            transitions
                .iter()
                .filter_map(|t| match t {
                    Transition::Revealed { winner, .. } => Some(self.mode.winner_effect(winner)),
                    _ => None,
                })
                .collect()
        } else {
            Vec::new()
        };
        Frame {
            transitions,
            effects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CandidateEntity, Sample, sample_hash};

    fn at(mono_ms: f64) -> ClockReading {
        ClockReading {
            wall_ms: 1_000_000 + mono_ms as i64,
            mono_ms,
        }
    }

    fn state(mode: WheelMode, sample: Sample, spin: Option<SpinDescriptor>) -> IdleWheelState {
        IdleWheelState {
            mode,
            pool_size: sample.occupied_count(),
            sample,
            settings: FilterSettings::default(),
            spin,
        }
    }

    fn games() -> Sample {
        Sample::from_entities((0..5).map(|i| CandidateEntity::game(format!("g{i}"), format!("Game {i}"))))
    }

    fn consoles() -> Sample {
        Sample::from_entities(["Game Boy", "NES", "SNES"].map(CandidateEntity::console))
    }

    fn spin_of(sample: Sample, target_idx: usize, ts: i64) -> SpinDescriptor {
        SpinDescriptor {
            spin_id: format!("spin-{ts}"),
            sample_hash: sample_hash(&sample),
            pool_size: sample.occupied_count(),
            sample,
            target_idx,
            duration_ms: 4500,
            turns: 8,
            server_timestamp: ts,
            mode: WheelMode::Game,
            age_ms: Some(0),
        }
    }

    #[test]
    fn poll_intervals_per_role() {
        assert_eq!(ViewerRole::Admin.poll_interval_ms(), 1000.0);
        assert_eq!(ViewerRole::Overlay.poll_interval_ms(), 250.0);
        assert_eq!(ViewerRole::from_query("Overlay"), Some(ViewerRole::Overlay));
        assert_eq!(ViewerRole::from_query("nope"), None);
    }

    #[test]
    fn schedule_fires_once_per_interval() {
        let mut s = PollSchedule::new(250.0);
        assert!(s.due(0.0));
        assert!(!s.due(100.0));
        assert_eq!(s.remaining_ms(100.0), 150.0);
        assert!(s.due(250.0));
        assert!(!s.due(499.0));
        assert!(s.due(900.0));
    }

    #[test]
    fn admin_derives_effect_from_revealed_game() {
        let mut p = ReconciliationPoller::new(ViewerRole::Admin);
        let sample = games();
        let update = p.on_state(state(WheelMode::Game, sample.clone(), Some(spin_of(sample.clone(), 2, 1_000_000))), at(0.0));
        assert_eq!(update.spin, Some(SpinObservation::Started));
        assert_eq!(update.idle, IdleObservation::Spinning);

        assert_eq!(p.on_frame(2000.0), Frame::default());
        let frame = p.on_frame(4500.0);
        assert_eq!(frame.transitions.len(), 1);
        assert_eq!(
            frame.effects,
            vec![WinnerEffect::SelectGame(sample.entity(2).unwrap().clone())]
        );
    }

    #[test]
    fn overlay_never_derives_effects() {
        let mut p = ReconciliationPoller::new(ViewerRole::Overlay);
        p.on_spin(spin_of(games(), 0, 1_000_000), at(0.0));
        let frame = p.on_frame(5000.0);
        assert_eq!(frame.transitions.len(), 1);
        assert!(frame.effects.is_empty());
    }

    #[test]
    fn game_to_console_switch_clears_winner_and_repopulates() {
        let mut p = ReconciliationPoller::new(ViewerRole::Admin);
        let sample = games();
        p.on_state(state(WheelMode::Game, sample.clone(), Some(spin_of(sample.clone(), 1, 1_000_000))), at(0.0));
        p.on_frame(4500.0);
        assert_eq!(p.sync().selected_idx(), Some(1));

        // The request alone changes nothing locally.
        assert_eq!(p.request_mode(WheelMode::Console), Some(ModeRequest { mode: WheelMode::Console }));
        assert_eq!(p.mode().current(), Some(WheelMode::Game));
        assert_eq!(p.sync().selected_idx(), Some(1));

        // Within the reveal window, but the authoritative mode switched.
        let update = p.on_state(state(WheelMode::Console, consoles(), Some(spin_of(sample, 1, 1_000_000))), at(6000.0));
        assert!(update.mode_changed);
        assert_eq!(update.spin, Some(SpinObservation::Unchanged));
        assert_eq!(update.idle, IdleObservation::Applied);
        assert_eq!(p.sync().selected_idx(), None);
        assert_eq!(p.sync().winner(), None);
        assert_eq!(p.sync().sample().entity(2).unwrap().id, "console-SNES");
        assert_eq!(p.mode().current(), Some(WheelMode::Console));
        assert_eq!(p.mode().pending(), None);
    }

    #[test]
    fn console_winner_becomes_filter_effect() {
        let mut p = ReconciliationPoller::new(ViewerRole::Admin);
        let mut spin = spin_of(consoles(), 1, 1_000_000);
        spin.mode = WheelMode::Console;
        p.on_state(state(WheelMode::Console, consoles(), Some(spin)), at(0.0));
        let frame = p.on_frame(4500.0);
        assert_eq!(frame.effects, vec![WinnerEffect::ApplyConsoleFilter("NES".into())]);
    }
}
