//! Toolkit-independent wheel scene.
//!
//! The scene is rebuilt from `(sample, angle, phase)` every frame. Wedge `i`
//! always corresponds to `sample[i]`; nothing is re-sorted here.

use std::f64::consts::PI;

use crate::{Phase, POINTER_ANGLE, SLOT_COUNT, Sample, segment_angle};

/// Labels longer than this are cut.
pub const MAX_LABEL_CHARS: usize = 18;

/// Wedge fill colors, cycled by slot index.
pub const PALETTE: [[u8; 3]; 12] = [
    [0xFF, 0x55, 0x55],
    [0x55, 0xFF, 0x55],
    [0x55, 0x55, 0xFF],
    [0xFF, 0xFF, 0x55],
    [0xFF, 0x55, 0xFF],
    [0x55, 0xFF, 0xFF],
    [0xFF, 0x99, 0x55],
    [0x99, 0xFF, 0x55],
    [0x55, 0x99, 0xFF],
    [0xFF, 0x55, 0x99],
    [0x99, 0x55, 0xFF],
    [0x55, 0xFF, 0x99],
];

/// One wedge, angles in radians (canvas convention, y down).
#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub index: usize,
    pub start_angle: f64,
    pub end_angle: f64,
    pub label: String,
    pub occupied: bool,
    pub palette_index: usize,
    /// Label would read upside down at this angle; rotate it a half turn.
    pub flip_label: bool,
}

impl Wedge {
    pub fn mid_angle(&self) -> f64 {
        (self.start_angle + self.end_angle) / 2.0
    }

    pub fn color(&self) -> [u8; 3] {
        PALETTE[self.palette_index]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WheelScene {
    pub wedges: Vec<Wedge>,
    pub pointer_angle: f64,
    pub rotation: f64,
    /// Wedge to emphasize; only set while a winner is revealed.
    pub highlight: Option<usize>,
}

impl WheelScene {
    pub fn build(sample: &Sample, angle: f64, phase: &Phase) -> Self {
        let seg = segment_angle();
        let wedges = sample
            .iter()
            .take(SLOT_COUNT)
            .enumerate()
            .map(|(index, slot)| {
                let start_angle = index as f64 * seg + angle;
                let end_angle = start_angle + seg;
                let mid = ((start_angle + end_angle) / 2.0).rem_euclid(2.0 * PI);
                Wedge {
                    index,
                    start_angle,
                    end_angle,
                    label: slot.entity().map(|e| truncate_label(&e.title)).unwrap_or_default(),
                    occupied: slot.is_occupied(),
                    palette_index: index % PALETTE.len(),
                    flip_label: mid > PI / 2.0 && mid < 1.5 * PI,
                }
            })
            .collect();

        let highlight = match phase {
            Phase::Revealed { target_idx, .. } => Some(*target_idx),
            _ => None,
        };

        Self {
            wedges,
            pointer_angle: POINTER_ANGLE,
            rotation: angle,
            highlight,
        }
    }

    /// Wedge currently under the pointer, if any.
    pub fn wedge_at_pointer(&self) -> Option<&Wedge> {
        let seg = segment_angle();
        let rel = (self.pointer_angle - self.rotation).rem_euclid(2.0 * PI);
        let idx = (rel / seg).floor() as usize;
        self.wedges.get(idx.min(SLOT_COUNT - 1))
    }
}

/// Trim and cut to `MAX_LABEL_CHARS` (17 chars plus an ellipsis when longer).
pub fn truncate_label(title: &str) -> String {
    let cleaned = title.trim();
    if cleaned.chars().count() > MAX_LABEL_CHARS {
        let mut out: String = cleaned.chars().take(MAX_LABEL_CHARS - 1).collect();
        out.push('…');
        out
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CandidateEntity, final_angle};

    #[test]
    fn long_labels_are_cut() {
        assert_eq!(truncate_label("  Chrono Trigger "), "Chrono Trigger");
        assert_eq!(truncate_label("exactly eighteen!!"), "exactly eighteen!!");
        let cut = truncate_label("The Legend of Zelda: A Link to the Past");
        assert_eq!(cut, "The Legend of Zel…");
        assert_eq!(cut.chars().count(), 18);
    }

    #[test]
    fn wedges_keep_sample_order() {
        let sample = Sample::from_entities([CandidateEntity::game("b", "Beta"), CandidateEntity::game("a", "Alpha")]);
        let scene = WheelScene::build(&sample, 0.0, &Phase::Idle);
        assert_eq!(scene.wedges.len(), SLOT_COUNT);
        assert_eq!(scene.wedges[0].label, "Beta");
        assert_eq!(scene.wedges[1].label, "Alpha");
        assert!(!scene.wedges[2].occupied);
        assert_eq!(scene.wedges[12].palette_index, 0);
        assert_eq!(scene.highlight, None);
    }

    #[test]
    fn highlight_only_when_revealed() {
        let sample = Sample::from_entities((0..4).map(|i| CandidateEntity::game(format!("g{i}"), "x")));
        let revealed = Phase::Revealed {
            target_idx: 3,
            winner: sample.entity(3).unwrap().clone(),
            deadline_ms: 0.0,
        };
        assert_eq!(WheelScene::build(&sample, 0.0, &revealed).highlight, Some(3));
        assert_eq!(WheelScene::build(&sample, 0.0, &Phase::Idle).highlight, None);
    }

    #[test]
    fn landed_angle_puts_target_under_pointer() {
        let sample = Sample::from_entities((0..16).map(|i| CandidateEntity::game(format!("g{i}"), "x")));
        for idx in [0, 5, 15] {
            let scene = WheelScene::build(&sample, final_angle(idx, 8), &Phase::Idle);
            assert_eq!(scene.wedge_at_pointer().unwrap().index, idx);
        }
    }
}
