//! Pool sampling: draws the visible wheel sample from a candidate pool.

use rand::Rng;

use crate::{CandidateEntity, SLOT_COUNT, Sample, SlotState};

/// Draw `min(capacity, pool.len())` distinct entities uniformly without
/// replacement (partial Fisher–Yates), then pad with `Empty`.
///
/// `capacity` is clamped to `SLOT_COUNT`; slots past it stay `Empty`.
/// Uses the thread-local RNG; every call re-randomizes.
pub fn sample(pool: &[CandidateEntity], capacity: usize) -> Sample {
    sample_with(&mut rand::thread_rng(), pool, capacity)
}

pub fn sample_with<R: Rng>(
    rng: &mut R,
    pool: &[CandidateEntity],
    capacity: usize,
) -> Sample {
    let capacity = capacity.min(SLOT_COUNT);
    let mut working: Vec<&CandidateEntity> = pool.iter().collect();
    let take = capacity.min(working.len());
    let mut slots = Vec::with_capacity(capacity);
    for _ in 0..take {
        let idx = rng.gen_range(0..working.len());
        slots.push(SlotState::Occupied(working.swap_remove(idx).clone()));
    }
    Sample::from_slots(slots)
}

/// Build a display sample with `winner` pinned at `target_idx`.
///
/// Remaining slots are filled in index order by drawing without replacement
/// from the rest of the pool; leftovers stay `Empty`. Entities equal to the
/// winner (by id) are excluded so the winner appears exactly once.
pub fn sample_around<R: Rng>(
    rng: &mut R,
    pool: &[CandidateEntity],
    winner: &CandidateEntity,
    target_idx: usize,
    capacity: usize,
) -> Sample {
    let capacity = capacity.min(SLOT_COUNT);
    let target_idx = target_idx.min(capacity.saturating_sub(1));
    let mut rest: Vec<&CandidateEntity> = pool.iter().filter(|e| e.id != winner.id).collect();
    let mut slots = vec![SlotState::Empty; capacity];
    for (i, slot) in slots.iter_mut().enumerate() {
        if i == target_idx {
            *slot = SlotState::Occupied(winner.clone());
            continue;
        }
        if rest.is_empty() {
            continue;
        }
        let idx = rng.gen_range(0..rest.len());
        *slot = SlotState::Occupied(rest.swap_remove(idx).clone());
    }
    Sample::from_slots(slots)
}

/// Indices of occupied slots, ascending.
pub fn occupied_indices(sample: &Sample) -> Vec<usize> {
    sample
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_occupied())
        .map(|(i, _)| i)
        .collect()
}

/// Pick a uniformly random occupied slot. `None` for an all-`Empty` sample.
pub fn choose_target<R: Rng>(rng: &mut R, sample: &Sample) -> Option<usize> {
    let valid = occupied_indices(sample);
    if valid.is_empty() {
        return None;
    }
    Some(valid[rng.gen_range(0..valid.len())])
}
