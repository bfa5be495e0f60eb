//! Per-viewer reconciliation of polled server state.
//!
//! `ClientSyncState` is owned by exactly one viewer. Polled spin and idle
//! state are fed in through `observe_spin` / `observe_idle`, and the frame
//! loop calls `advance` to move the animation forward. Every mutation swaps
//! whole values (the sample is an `Arc<Sample>`), so a renderer holding a
//! previous snapshot never sees a half-applied update.

use std::sync::Arc;

use crate::{
    CandidateEntity, ClockReading, IdleWheelState, Sample, SampleHash, SpinDescriptor, SpinError,
    SpinTimeline, ValidSpin, ViewerRole, sample_hash,
};

/// Grace period after a spin lands during which the admin surface still
/// plays it. Older spins are recorded but not replayed.
pub const STALE_SPIN_GRACE_MS: f64 = 1000.0;

/// Viewer lifecycle: `Idle → Spinning → Revealed → Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Spinning {
        spin: ValidSpin,
        timeline: SpinTimeline,
    },
    Revealed {
        target_idx: usize,
        winner: CandidateEntity,
        deadline_ms: f64,
    },
}

/// Result of feeding a polled spin descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinObservation {
    /// Same timestamp as the last spin seen.
    Unchanged,
    /// Older than the last spin seen (a reordered response).
    OutOfOrder,
    /// New spin; animation started (superseding any in-flight one).
    Started,
    /// New spin, but already finished long ago and this role does not replay.
    Skipped,
    /// New spin with an invalid target. Recorded so it is not re-evaluated.
    Rejected(SpinError),
}

/// Result of feeding a polled idle sample.
#[derive(Debug, Clone, PartialEq)]
pub enum IdleObservation {
    Applied,
    Unchanged,
    /// A spin animation is in flight.
    Spinning,
    /// Same content as the spin being revealed.
    GuardedBySpin,
    /// Distinct sample during the reveal window; applied when it closes.
    Deferred,
}

/// Phase change produced by `advance`.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Revealed {
        spin_id: String,
        target_idx: usize,
        winner: CandidateEntity,
    },
    Cleared,
    /// A sample parked during the reveal window was applied.
    IdleApplied,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingIdle {
    sample: Sample,
    pool_size: usize,
    hash: SampleHash,
}

#[derive(Debug, Clone)]
pub struct ClientSyncState {
    role: ViewerRole,
    last_spin_ts: Option<i64>,
    last_idle_hash: Option<SampleHash>,
    guarded_spin_hash: Option<SampleHash>,
    phase: Phase,
    angle: f64,
    sample: Arc<Sample>,
    pool_size: usize,
    pending_idle: Option<PendingIdle>,
}

impl ClientSyncState {
    pub fn new(role: ViewerRole) -> Self {
        Self {
            role,
            last_spin_ts: None,
            last_idle_hash: None,
            guarded_spin_hash: None,
            phase: Phase::Idle,
            angle: 0.0,
            sample: Arc::new(Sample::empty()),
            pool_size: 0,
            pending_idle: None,
        }
    }

    pub fn role(&self) -> ViewerRole {
        self.role
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn sample(&self) -> &Arc<Sample> {
        &self.sample
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn is_spinning(&self) -> bool {
        matches!(self.phase, Phase::Spinning { .. })
    }

    /// A spin needs at least one occupied wedge and no animation in flight.
    pub fn can_request_spin(&self) -> bool {
        !self.sample.is_all_empty() && !self.is_spinning()
    }

    pub fn selected_idx(&self) -> Option<usize> {
        match &self.phase {
            Phase::Revealed { target_idx, .. } => Some(*target_idx),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<&CandidateEntity> {
        match &self.phase {
            Phase::Revealed { winner, .. } => Some(winner),
            _ => None,
        }
    }

    pub fn reveal_deadline(&self) -> Option<f64> {
        match &self.phase {
            Phase::Revealed { deadline_ms, .. } => Some(*deadline_ms),
            _ => None,
        }
    }

    pub fn last_spin_timestamp(&self) -> Option<i64> {
        self.last_spin_ts
    }

    pub fn last_idle_hash(&self) -> Option<&SampleHash> {
        self.last_idle_hash.as_ref()
    }

    pub fn guarded_spin_hash(&self) -> Option<&SampleHash> {
        self.guarded_spin_hash.as_ref()
    }

    /// Feed the latest polled spin.
    ///
    /// Only a strictly newer server timestamp starts a spin. A new spin
    /// replaces whatever is in flight; spins are never queued or merged.
    pub fn observe_spin(&mut self, descriptor: SpinDescriptor, now: ClockReading) -> SpinObservation {
        let ts = descriptor.server_timestamp;
        if let Some(last) = self.last_spin_ts {
            if ts == last {
                return SpinObservation::Unchanged;
            }
            if ts < last {
                return SpinObservation::OutOfOrder;
            }
        }
        self.last_spin_ts = Some(ts);

        let spin = match ValidSpin::try_from(descriptor) {
            Ok(spin) => spin,
            Err(e) => return SpinObservation::Rejected(e),
        };
        let timeline = SpinTimeline::anchor(spin.descriptor(), now);
        if !self.role.replays_stale_spins() && now.mono_ms > timeline.end_ms() + STALE_SPIN_GRACE_MS {
            return SpinObservation::Skipped;
        }

        self.guarded_spin_hash = Some(spin.hash().clone());
        self.sample = Arc::new(spin.sample().clone());
        self.pool_size = spin.descriptor().pool_size;
        self.pending_idle = None;
        self.angle = 0.0;
        self.phase = Phase::Spinning { spin, timeline };
        SpinObservation::Started
    }

    /// Feed the latest polled idle state.
    pub fn observe_idle(&mut self, idle: &IdleWheelState, now_ms: f64) -> IdleObservation {
        if self.is_spinning() {
            return IdleObservation::Spinning;
        }
        let hash = sample_hash(&idle.sample);
        if self.guarded_spin_hash.as_ref() == Some(&hash) {
            // The server's idle sample is the revealed spin's sample; any
            // parked sample is older than that.
            self.pending_idle = None;
            return IdleObservation::GuardedBySpin;
        }
        if self.last_idle_hash.as_ref() == Some(&hash) {
            self.pending_idle = None;
            self.pool_size = idle.pool_size;
            return IdleObservation::Unchanged;
        }
        if let Phase::Revealed { deadline_ms, .. } = self.phase {
            if now_ms < deadline_ms {
                self.pending_idle = Some(PendingIdle {
                    sample: idle.sample.clone(),
                    pool_size: idle.pool_size,
                    hash,
                });
                return IdleObservation::Deferred;
            }
            self.clear_reveal();
        }
        self.apply_idle(idle.sample.clone(), idle.pool_size, hash);
        IdleObservation::Applied
    }

    /// Advance the animation to `now_ms` (monotonic). Called every frame.
    pub fn advance(&mut self, now_ms: f64) -> Vec<Transition> {
        let mut transitions = Vec::new();

        if let Phase::Spinning { spin, timeline } = &self.phase {
            self.angle = timeline.angle(now_ms);
            if timeline.is_complete(now_ms) {
                let revealed = Transition::Revealed {
                    spin_id: spin.descriptor().spin_id.clone(),
                    target_idx: spin.target_idx(),
                    winner: spin.winner().clone(),
                };
                self.phase = Phase::Revealed {
                    target_idx: spin.target_idx(),
                    winner: spin.winner().clone(),
                    deadline_ms: timeline.reveal_deadline(),
                };
                transitions.push(revealed);
            }
        }

        if let Phase::Revealed { deadline_ms, .. } = self.phase
            && now_ms >= deadline_ms
        {
            self.clear_reveal();
            transitions.push(Transition::Cleared);
            if let Some(pending) = self.pending_idle.take() {
                self.apply_idle(pending.sample, pending.pool_size, pending.hash);
                transitions.push(Transition::IdleApplied);
            }
        }

        transitions
    }

    /// The authoritative mode changed: drop the winner (unless a spin is in
    /// flight) and forget the idle hash so the next poll repopulates the
    /// sample from the new pool.
    pub fn reset_for_mode_change(&mut self) {
        self.last_idle_hash = None;
        self.pending_idle = None;
        if !self.is_spinning() {
            self.clear_reveal();
        }
    }

    fn clear_reveal(&mut self) {
        self.phase = Phase::Idle;
        self.guarded_spin_hash = None;
    }

    fn apply_idle(&mut self, sample: Sample, pool_size: usize, hash: SampleHash) {
        self.sample = Arc::new(sample);
        self.pool_size = pool_size;
        self.last_idle_hash = Some(hash);
    }
}
