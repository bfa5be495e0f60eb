//! Spin descriptors: the authoritative record of one selection event.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CandidateEntity, SLOT_COUNT, Sample, SampleHash, WheelMode, sample_hash};

/// Authoritative spin as published by the server.
///
/// `ts` is the server's epoch-millisecond timestamp and doubles as the
/// change-detection key. `ageMs` is stamped on every response with the
/// milliseconds elapsed since the server accepted the spin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinDescriptor {
    #[serde(default)]
    pub spin_id: String,
    pub sample: Sample,
    pub target_idx: usize,
    pub duration_ms: u64,
    pub turns: u32,
    #[serde(rename = "ts")]
    pub server_timestamp: i64,
    #[serde(default)]
    pub sample_hash: SampleHash,
    #[serde(default)]
    pub pool_size: usize,
    #[serde(default)]
    pub mode: WheelMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<u64>,
}

/// Why a descriptor was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpinError {
    #[error("target index {0} is outside the wheel")]
    TargetOutOfRange(usize),
    #[error("target index {0} points at an empty slot")]
    EmptyTarget(usize),
    #[error("sample has no occupied slots")]
    EmptySample,
}

/// A descriptor whose target slot is known to be occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSpin {
    descriptor: SpinDescriptor,
    winner: CandidateEntity,
    hash: SampleHash,
}

impl ValidSpin {
    pub fn descriptor(&self) -> &SpinDescriptor {
        &self.descriptor
    }

    pub fn winner(&self) -> &CandidateEntity {
        &self.winner
    }

    pub fn target_idx(&self) -> usize {
        self.descriptor.target_idx
    }

    pub fn sample(&self) -> &Sample {
        &self.descriptor.sample
    }

    /// Hash recomputed from the sample (the wire `sampleHash` is advisory).
    pub fn hash(&self) -> &SampleHash {
        &self.hash
    }
}

impl TryFrom<SpinDescriptor> for ValidSpin {
    type Error = SpinError;

    fn try_from(descriptor: SpinDescriptor) -> Result<Self, Self::Error> {
        if descriptor.sample.is_all_empty() {
            return Err(SpinError::EmptySample);
        }
        let idx = descriptor.target_idx;
        if idx >= SLOT_COUNT {
            return Err(SpinError::TargetOutOfRange(idx));
        }
        let winner = descriptor
            .sample
            .entity(idx)
            .cloned()
            .ok_or(SpinError::EmptyTarget(idx))?;
        let hash = sample_hash(&descriptor.sample);
        Ok(Self {
            descriptor,
            winner,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(sample: Sample, target_idx: usize) -> SpinDescriptor {
        SpinDescriptor {
            spin_id: "s1".into(),
            sample_hash: sample_hash(&sample),
            sample,
            target_idx,
            duration_ms: 4500,
            turns: 8,
            server_timestamp: 1,
            pool_size: 2,
            mode: WheelMode::Game,
            age_ms: None,
        }
    }

    fn two_games() -> Sample {
        Sample::from_entities([CandidateEntity::game("a", "A"), CandidateEntity::game("b", "B")])
    }

    #[test]
    fn accepts_occupied_target() {
        let spin = ValidSpin::try_from(descriptor(two_games(), 1)).unwrap();
        assert_eq!(spin.winner().id, "b");
        assert_eq!(spin.hash(), &sample_hash(&two_games()));
    }

    #[test]
    fn rejects_empty_target() {
        let err = ValidSpin::try_from(descriptor(two_games(), 4)).unwrap_err();
        assert_eq!(err, SpinError::EmptyTarget(4));
    }

    #[test]
    fn rejects_out_of_range_target() {
        let err = ValidSpin::try_from(descriptor(two_games(), 16)).unwrap_err();
        assert_eq!(err, SpinError::TargetOutOfRange(16));
    }

    #[test]
    fn rejects_all_empty_sample() {
        let err = ValidSpin::try_from(descriptor(Sample::empty(), 0)).unwrap_err();
        assert_eq!(err, SpinError::EmptySample);
    }

    #[test]
    fn wire_shape_uses_ts_and_camel_case() {
        let d = descriptor(two_games(), 0);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["ts"], 1);
        assert_eq!(v["targetIdx"], 0);
        assert_eq!(v["durationMs"], 4500);
        assert_eq!(v["sampleHash"], d.sample_hash.as_str());
        assert!(v.get("ageMs").is_none());
        let back: SpinDescriptor = serde_json::from_value(v).unwrap();
        assert_eq!(back, d);
    }
}
