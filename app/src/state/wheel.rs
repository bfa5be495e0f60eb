//! Authoritative wheel state.
//!
//! `WheelState` is the read side shared with the web layer; the single
//! `WheelStateWriter` belongs to the system actor. Everything sits behind one
//! `RwLock` so a snapshot never mixes the mode of one update with the sample
//! of another.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use gamewheel::{
    CandidateEntity, CurrentSelection, FilterSettings, IdleWheelState, PoolResponse, Sample,
    SpinDescriptor, WheelMode,
};

/// The last accepted spin and the instant it was accepted.
struct PublishedSpin {
    descriptor: SpinDescriptor,
    accepted_at: Instant,
}

impl PublishedSpin {
    /// Copy of the descriptor with `ageMs` stamped for this response.
    fn stamped(&self) -> SpinDescriptor {
        let mut d = self.descriptor.clone();
        d.age_ms = Some(self.accepted_at.elapsed().as_millis() as u64);
        d
    }
}

struct WheelInner {
    mode: WheelMode,
    settings: FilterSettings,
    pool: Arc<Vec<CandidateEntity>>,
    sample: Sample,
    pool_size: usize,
    spin: Option<PublishedSpin>,
    current: Option<CurrentSelection>,
}

pub struct WheelState {
    inner: Arc<RwLock<WheelInner>>,
}

pub struct WheelStateWriter {
    inner: Arc<RwLock<WheelInner>>,
}

impl WheelState {
    pub fn new(mode: WheelMode, settings: FilterSettings) -> (Self, WheelStateWriter) {
        let inner = Arc::new(RwLock::new(WheelInner {
            mode,
            settings,
            pool: Arc::new(Vec::new()),
            sample: Sample::empty(),
            pool_size: 0,
            spin: None,
            current: None,
        }));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            WheelStateWriter { inner },
        )
    }

    /// `GET /wheel/state` body.
    pub fn snapshot(&self) -> IdleWheelState {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        IdleWheelState {
            mode: guard.mode,
            sample: guard.sample.clone(),
            pool_size: guard.pool_size,
            settings: guard.settings.clone(),
            spin: guard.spin.as_ref().map(PublishedSpin::stamped),
        }
    }

    /// Latest spin with `ageMs` stamped, if any spin happened since startup.
    pub fn spin(&self) -> Option<SpinDescriptor> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.spin.as_ref().map(PublishedSpin::stamped)
    }

    pub fn pool(&self) -> PoolResponse {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        PoolResponse {
            mode: guard.mode,
            pool: guard.pool.as_ref().clone(),
        }
    }

    pub fn current(&self) -> Option<CurrentSelection> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .clone()
    }

    pub fn mode(&self) -> WheelMode {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).mode
    }

    pub fn settings(&self) -> FilterSettings {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .settings
            .clone()
    }
}

impl WheelStateWriter {
    /// Replace mode, filters, the eligible pool and the idle sample drawn
    /// from it, all under one write lock.
    pub fn publish_idle(
        &self,
        mode: WheelMode,
        settings: FilterSettings,
        pool: Vec<CandidateEntity>,
        sample: Sample,
    ) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.mode = mode;
        guard.settings = settings;
        guard.pool_size = pool.len();
        guard.pool = Arc::new(pool);
        guard.sample = sample;
    }

    /// Replace only the idle sample (admin preview).
    pub fn set_idle_sample(&self, sample: Sample, pool_size: usize) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.sample = sample;
        guard.pool_size = pool_size;
    }

    /// Publish a spin. The idle sample follows the spin's sample so idle
    /// polls after the reveal show what the wheel landed on.
    pub fn record_spin(&self, descriptor: SpinDescriptor) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.sample = descriptor.sample.clone();
        guard.pool_size = descriptor.pool_size;
        guard.spin = Some(PublishedSpin {
            descriptor,
            accepted_at: Instant::now(),
        });
    }

    pub fn last_spin_timestamp(&self) -> Option<i64> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .spin
            .as_ref()
            .map(|s| s.descriptor.server_timestamp)
    }

    pub fn set_current(&self, selection: CurrentSelection) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).current = Some(selection);
    }

    /// Read back through the writer (the system actor holds no `WheelState`).
    pub fn view(&self) -> WheelState {
        WheelState {
            inner: Arc::clone(&self.inner),
        }
    }
}
