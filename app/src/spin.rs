//! Authoritative spin computation.

use rand::Rng;

use gamewheel::sampler::{choose_target, sample_around};
use gamewheel::{
    CandidateEntity, FilterSettings, SLOT_COUNT, Sample, SpinDescriptor, SpinRequest, SpinSource,
    ValidSpin, WheelMode, clamp_duration, clamp_turns, sample_hash,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinRefused {
    EmptyPool,
    Invalid(String),
}

/// Inputs for one spin.
pub struct SpinContext<'a> {
    pub mode: WheelMode,
    pub settings: &'a FilterSettings,
    pub pool: &'a [CandidateEntity],
    /// The currently published idle sample and its pool size.
    pub idle_sample: &'a Sample,
    pub idle_pool_size: usize,
}

/// Compute a new authoritative spin.
///
/// With `SpinSource::Pool` the winner is drawn uniformly from the whole pool
/// and a display sample is built around it; with `SpinSource::Sample` the
/// target is drawn among the occupied slots of the visible idle sample.
/// Either way the returned descriptor has already passed `ValidSpin`
/// validation.
pub fn compute_spin<R: Rng>(
    rng: &mut R,
    ctx: &SpinContext<'_>,
    request: &SpinRequest,
    spin_id: String,
    server_timestamp: i64,
) -> Result<SpinDescriptor, SpinRefused> {
    let duration_ms = clamp_duration(request.duration_ms.unwrap_or(ctx.settings.spin_duration_ms));
    let turns = clamp_turns(request.turns.unwrap_or(ctx.settings.spin_turns));

    let (sample, target_idx, pool_size) = match ctx.settings.spin_source {
        SpinSource::Pool => {
            if ctx.pool.is_empty() {
                return Err(SpinRefused::EmptyPool);
            }
            let winner = &ctx.pool[rng.gen_range(0..ctx.pool.len())];
            // Keep the occupied wedges contiguous for small pools.
            let visible = ctx.pool.len().min(SLOT_COUNT);
            let target_idx = rng.gen_range(0..visible);
            let sample = sample_around(rng, ctx.pool, winner, target_idx, SLOT_COUNT);
            (sample, target_idx, ctx.pool.len())
        }
        SpinSource::Sample => {
            let target_idx = choose_target(rng, ctx.idle_sample).ok_or(SpinRefused::EmptyPool)?;
            (ctx.idle_sample.clone(), target_idx, ctx.idle_pool_size)
        }
    };

    let descriptor = SpinDescriptor {
        spin_id,
        sample_hash: sample_hash(&sample),
        sample,
        target_idx,
        duration_ms,
        turns,
        server_timestamp,
        pool_size,
        mode: ctx.mode,
        age_ms: None,
    };
    ValidSpin::try_from(descriptor)
        .map(|valid| valid.descriptor().clone())
        .map_err(|e| SpinRefused::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamewheel::{MAX_SPIN_DURATION_MS, MIN_SPIN_TURNS, SettingsUpdate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(n: usize) -> Vec<CandidateEntity> {
        (0..n).map(|i| CandidateEntity::game(format!("g{i}"), format!("Game {i}"))).collect()
    }

    fn run(settings: &FilterSettings, pool: &[CandidateEntity], idle: &Sample, seed: u64) -> Result<SpinDescriptor, SpinRefused> {
        let ctx = SpinContext {
            mode: WheelMode::Game,
            settings,
            pool,
            idle_sample: idle,
            idle_pool_size: pool.len(),
        };
        compute_spin(&mut StdRng::seed_from_u64(seed), &ctx, &SpinRequest::default(), "id".into(), 1)
    }

    #[test]
    fn pool_spin_always_targets_an_occupied_slot() {
        let settings = FilterSettings::default();
        for n in [1, 3, 16, 40] {
            let p = pool(n);
            for seed in 0..50 {
                let spin = run(&settings, &p, &Sample::empty(), seed).unwrap();
                let winner = spin.sample.entity(spin.target_idx).expect("occupied target");
                assert!(p.contains(winner));
                assert_eq!(spin.sample.occupied_count(), n.min(SLOT_COUNT));
                assert_eq!(spin.pool_size, n);
                assert_eq!(spin.sample_hash, sample_hash(&spin.sample));
            }
        }
    }

    #[test]
    fn sample_spin_picks_from_visible_wedges() {
        let mut settings = FilterSettings::default();
        settings.apply(&SettingsUpdate {
            spin_source: Some(SpinSource::Sample),
            ..Default::default()
        });
        let idle = Sample::from_entities(pool(4));
        for seed in 0..30 {
            let spin = run(&settings, &pool(40), &idle, seed).unwrap();
            assert!(spin.target_idx < 4);
            assert_eq!(spin.sample, idle);
        }
    }

    #[test]
    fn empty_pool_is_refused() {
        let settings = FilterSettings::default();
        assert_eq!(run(&settings, &[], &Sample::empty(), 0), Err(SpinRefused::EmptyPool));

        let mut sample_settings = settings.clone();
        sample_settings.spin_source = SpinSource::Sample;
        assert_eq!(run(&sample_settings, &pool(3), &Sample::empty(), 0), Err(SpinRefused::EmptyPool));
    }

    #[test]
    fn overrides_are_clamped() {
        let settings = FilterSettings::default();
        let p = pool(3);
        let idle = Sample::empty();
        let ctx = SpinContext {
            mode: WheelMode::Console,
            settings: &settings,
            pool: &p,
            idle_sample: &idle,
            idle_pool_size: 0,
        };
        let request = SpinRequest {
            duration_ms: Some(999_999),
            turns: Some(0),
        };
        let spin = compute_spin(&mut StdRng::seed_from_u64(7), &ctx, &request, "x".into(), 42).unwrap();
        assert_eq!(spin.duration_ms, MAX_SPIN_DURATION_MS);
        assert_eq!(spin.turns, MIN_SPIN_TURNS);
        assert_eq!(spin.server_timestamp, 42);
        assert_eq!(spin.mode, WheelMode::Console);
    }
}
