//! Wheel mode (console vs. game) and the effects of a revealed winner.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CandidateEntity, EntityKind, ModeRequest};

/// Which candidate domain the wheel draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum WheelMode {
    Console,
    #[default]
    Game,
}

impl fmt::Display for WheelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::Game => write!(f, "game"),
        }
    }
}

/// What the admin surface should do with a revealed winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerEffect {
    /// Make the game the current selection (game-state collaborator).
    SelectGame(CandidateEntity),
    /// Narrow the next game pool to this console. No status change.
    ApplyConsoleFilter(String),
}

/// Tracks the server-authoritative mode for one viewer.
///
/// Local requests never flip the mode directly; the mode only changes when a
/// poll reports the new authoritative value.
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    current: Option<WheelMode>,
    requested: Option<WheelMode>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last authoritative mode seen, if any poll has landed yet.
    pub fn current(&self) -> Option<WheelMode> {
        self.current
    }

    /// Mode asked for but not yet confirmed by the server.
    pub fn pending(&self) -> Option<WheelMode> {
        self.requested
    }

    /// Record a mode change request. Returns the body to POST, or `None`
    /// when the server already reports that mode.
    pub fn request(&mut self, mode: WheelMode) -> Option<ModeRequest> {
        if self.current == Some(mode) {
            self.requested = None;
            return None;
        }
        self.requested = Some(mode);
        Some(ModeRequest { mode })
    }

    /// Apply a polled authoritative mode. Returns `true` when it differs
    /// from the previously observed one (the first observation is not a change).
    pub fn observe(&mut self, mode: WheelMode) -> bool {
        if self.requested == Some(mode) {
            self.requested = None;
        }
        let changed = self.current.is_some_and(|m| m != mode);
        self.current = Some(mode);
        changed
    }

    pub fn winner_effect(&self, winner: &CandidateEntity) -> WinnerEffect {
        winner_effect(winner)
    }
}

/// Effects are keyed on the entity itself, so a spin that raced a mode
/// switch still does the right thing for what actually landed.
pub fn winner_effect(winner: &CandidateEntity) -> WinnerEffect {
    match winner.kind {
        EntityKind::Console => WinnerEffect::ApplyConsoleFilter(
            winner
                .console_name
                .clone()
                .unwrap_or_else(|| winner.title.clone()),
        ),
        EntityKind::Game | EntityKind::Suggestion => WinnerEffect::SelectGame(winner.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_not_applied_until_observed() {
        let mut mc = ModeController::new();
        assert!(!mc.observe(WheelMode::Game));
        let req = mc.request(WheelMode::Console).unwrap();
        assert_eq!(req.mode, WheelMode::Console);
        assert_eq!(mc.current(), Some(WheelMode::Game));
        assert_eq!(mc.pending(), Some(WheelMode::Console));

        // A poll that still reports the old mode leaves the request pending.
        assert!(!mc.observe(WheelMode::Game));
        assert_eq!(mc.pending(), Some(WheelMode::Console));

        assert!(mc.observe(WheelMode::Console));
        assert_eq!(mc.current(), Some(WheelMode::Console));
        assert_eq!(mc.pending(), None);
    }

    #[test]
    fn requesting_current_mode_is_a_no_op() {
        let mut mc = ModeController::new();
        mc.observe(WheelMode::Console);
        assert!(mc.request(WheelMode::Console).is_none());
    }

    #[test]
    fn console_winner_becomes_filter() {
        let effect = winner_effect(&CandidateEntity::console("Sega Saturn"));
        assert_eq!(effect, WinnerEffect::ApplyConsoleFilter("Sega Saturn".into()));
    }

    #[test]
    fn game_winner_becomes_selection() {
        let game = CandidateEntity::game("g1", "Panzer Dragoon").with_console("Sega Saturn");
        assert_eq!(winner_effect(&game), WinnerEffect::SelectGame(game));
    }
}
