//! Deterministic spin animation.
//!
//! The wheel angle is a pure function of the spin descriptor and the
//! evaluation instant. Every spin starts from a baseline angle of zero, so
//! two viewers that anchored the same descriptor compute identical angles
//! at the same instant regardless of what they were showing before.

use std::f64::consts::PI;

use crate::{SLOT_COUNT, SpinDescriptor};

/// How long a revealed winner stays pinned before idle updates resume.
pub const REVEAL_WINDOW_MS: f64 = 10_000.0;

/// Pointer position (top of the wheel in canvas coordinates, y down).
pub const POINTER_ANGLE: f64 = 1.5 * PI;

pub fn segment_angle() -> f64 {
    2.0 * PI / SLOT_COUNT as f64
}

/// Rotation that centers wedge `idx` under the pointer.
pub fn target_angle(idx: usize) -> f64 {
    let seg = segment_angle();
    POINTER_ANGLE - (idx as f64 * seg + seg / 2.0)
}

pub fn final_angle(idx: usize, turns: u32) -> f64 {
    target_angle(idx) + 2.0 * PI * turns as f64
}

/// Cubic ease-out.
pub fn ease_out_cubic(p: f64) -> f64 {
    1.0 - (1.0 - p).powi(3)
}

/// Pair of local clock readings taken at the same moment.
///
/// `wall_ms` is epoch milliseconds (comparable with server timestamps),
/// `mono_ms` is the viewer's monotonic frame clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    pub wall_ms: i64,
    pub mono_ms: f64,
}

/// A spin anchored on the local monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinTimeline {
    pub start_ms: f64,
    pub duration_ms: f64,
    pub final_angle: f64,
}

impl SpinTimeline {
    /// Anchor `spin` on the local clock.
    ///
    /// Prefers the server-reported age of the spin (`ageMs`), which is immune
    /// to client/server wall clock skew. Falls back to the delay between the
    /// server timestamp and local wall time, floored at zero.
    pub fn anchor(spin: &SpinDescriptor, now: ClockReading) -> Self {
        let offset = match spin.age_ms {
            Some(age) => age as f64,
            None => now.wall_ms.saturating_sub(spin.server_timestamp).max(0) as f64,
        };
        Self {
            start_ms: now.mono_ms - offset,
            duration_ms: spin.duration_ms.max(1) as f64,
            final_angle: final_angle(spin.target_idx, spin.turns),
        }
    }

    pub fn progress(&self, t: f64) -> f64 {
        ((t - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn angle(&self, t: f64) -> f64 {
        self.final_angle * ease_out_cubic(self.progress(t))
    }

    pub fn is_complete(&self, t: f64) -> bool {
        self.progress(t) >= 1.0
    }

    /// Instant the animation lands on the target.
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    /// Instant the reveal window closes. Anchored to the timeline so every
    /// viewer unpins the winner at the same moment.
    pub fn reveal_deadline(&self) -> f64 {
        self.end_ms() + REVEAL_WINDOW_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CandidateEntity, Sample, WheelMode, sample_hash};

    fn descriptor(target_idx: usize, ts: i64, age_ms: Option<u64>) -> SpinDescriptor {
        let sample = Sample::from_entities((0..16).map(|i| CandidateEntity::game(format!("g{i}"), "t")));
        SpinDescriptor {
            spin_id: "s".into(),
            sample_hash: sample_hash(&sample),
            sample,
            target_idx,
            duration_ms: 4000,
            turns: 8,
            server_timestamp: ts,
            pool_size: 16,
            mode: WheelMode::Game,
            age_ms,
        }
    }

    #[test]
    fn final_angle_centers_target_under_pointer() {
        let seg = segment_angle();
        for idx in 0..SLOT_COUNT {
            let a = final_angle(idx, 8);
            // Center of wedge idx after rotation a, normalized to [0, 2π).
            let center = (idx as f64 * seg + seg / 2.0 + a).rem_euclid(2.0 * PI);
            assert!((center - POINTER_ANGLE).abs() < 1e-9, "idx {idx}: {center}");
        }
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn two_viewers_compute_identical_angles() {
        let d = descriptor(5, 1_000_000, None);
        // Both viewers received it 300ms late, on different monotonic clocks.
        let a = SpinTimeline::anchor(&d, ClockReading { wall_ms: 1_000_300, mono_ms: 50_000.0 });
        let b = SpinTimeline::anchor(&d, ClockReading { wall_ms: 1_000_300, mono_ms: 50_000.0 });
        for step in 0..50 {
            let t = 49_700.0 + step as f64 * 97.0;
            assert_eq!(a.angle(t).to_bits(), b.angle(t).to_bits());
        }
    }

    #[test]
    fn late_arrival_is_compensated() {
        let d = descriptor(0, 1_000_000, None);
        let tl = SpinTimeline::anchor(&d, ClockReading { wall_ms: 1_001_000, mono_ms: 10_000.0 });
        assert_eq!(tl.start_ms, 9_000.0);
        assert_eq!(tl.progress(10_000.0), 0.25);
    }

    #[test]
    fn future_timestamp_is_not_negative_offset() {
        let d = descriptor(0, 2_000_000, None);
        let tl = SpinTimeline::anchor(&d, ClockReading { wall_ms: 1_000_000, mono_ms: 10_000.0 });
        assert_eq!(tl.start_ms, 10_000.0);
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let now = ClockReading { wall_ms: 1_000_000, mono_ms: 10_000.0 };
        let ancient = SpinTimeline::anchor(&descriptor(0, i64::MIN, None), now);
        assert!(ancient.is_complete(10_000.0));
        let far_future = SpinTimeline::anchor(&descriptor(0, i64::MAX, None), ClockReading { wall_ms: i64::MIN + 1, ..now });
        assert_eq!(far_future.start_ms, 10_000.0);
    }

    #[test]
    fn server_age_overrides_wall_clock() {
        // Client wall clock is an hour off; the age still anchors correctly.
        let d = descriptor(0, 1_000_000, Some(500));
        let tl = SpinTimeline::anchor(&d, ClockReading { wall_ms: 4_600_000, mono_ms: 10_000.0 });
        assert_eq!(tl.start_ms, 9_500.0);
    }

    #[test]
    fn angle_lands_on_final_and_clamps() {
        let d = descriptor(3, 0, Some(0));
        let tl = SpinTimeline::anchor(&d, ClockReading { wall_ms: 0, mono_ms: 0.0 });
        assert_eq!(tl.angle(-100.0), 0.0);
        assert_eq!(tl.angle(4_000.0), tl.final_angle);
        assert_eq!(tl.angle(9_999.0), tl.final_angle);
        assert!(tl.is_complete(4_000.0));
        assert!(!tl.is_complete(3_999.0));
        assert_eq!(tl.reveal_deadline(), 14_000.0);
    }
}
