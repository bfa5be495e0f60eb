//! System actor: the single writer of wheel state.
//!
//! Subscribes to the bus and applies `WheelCommand`s one at a time through
//! the `WheelStateWriter`. Mode and filter changes are persisted to the
//! config file. Commands that carry a `request_id` get a `WheelOutcome`
//! back. This runs independently of the web server, so the wheel state is
//! consistent even with no web server configured.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::library::{CandidateSource, Library};
use crate::pool::build_pool;
use crate::spin::{SpinContext, SpinRefused, compute_spin};
use crate::state::{SystemState, WheelStateWriter};
use gamewheel::sampler;
use gamewheel::{
    AlertLevel, AlertMessage, CurrentSelection, FilterSettings, GameStatus, GamewheelEvent,
    SLOT_COUNT, WheelAction, WheelCommand, WheelMode, WheelOutcome, WheelResult,
};

/// How often the library revision is checked for external edits.
const LIBRARY_CHECK_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// WheelService: command semantics, independent of threads and the bus
// ---------------------------------------------------------------------------

/// Inputs the idle sample was drawn from. A different key means a new sample.
#[derive(Debug, Clone, PartialEq)]
struct IdleKey {
    mode: WheelMode,
    settings: FilterSettings,
    revision: u64,
}

pub struct WheelService {
    writer: WheelStateWriter,
    source: Box<dyn CandidateSource>,
    library: Library,
    revision: u64,
    idle_key: Option<IdleKey>,
    rng: StdRng,
}

impl WheelService {
    pub fn new(writer: WheelStateWriter, source: Box<dyn CandidateSource>) -> Self {
        Self::with_rng(writer, source, StdRng::from_entropy())
    }

    pub fn with_rng(writer: WheelStateWriter, source: Box<dyn CandidateSource>, rng: StdRng) -> Self {
        let mut service = Self {
            writer,
            source,
            library: Library::default(),
            revision: 0,
            idle_key: None,
            rng,
        };
        if let Err(e) = service.reload_library() {
            tracing::warn!("library: {e:#}");
        }
        service.refresh_idle(false);
        service
    }

    /// The revision is only recorded once the load succeeds, so a file that
    /// failed to parse is retried on the next tick.
    fn reload_library(&mut self) -> anyhow::Result<()> {
        let revision = self.source.revision();
        self.library = self.source.load()?;
        self.revision = revision;
        tracing::info!(
            "library: loaded {} games, {} suggestions (revision {})",
            self.library.games.len(),
            self.library.suggestions.len(),
            self.revision
        );
        Ok(())
    }

    /// Rebuild the pool and idle sample when the cache key changed (or
    /// unconditionally with `force`). Mode, filters, pool and sample are
    /// published in one write.
    fn ensure_idle(&mut self, mode: WheelMode, settings: FilterSettings, force: bool) {
        let key = IdleKey {
            mode,
            settings,
            revision: self.revision,
        };
        if !force && self.idle_key.as_ref() == Some(&key) {
            return;
        }
        let pool = build_pool(&self.library, key.mode, &key.settings);
        let sample = sampler::sample_with(&mut self.rng, &pool, SLOT_COUNT);
        tracing::debug!(
            "idle sample regenerated: mode={} pool={} occupied={}",
            key.mode,
            pool.len(),
            sample.occupied_count()
        );
        self.writer
            .publish_idle(key.mode, key.settings.clone(), pool, sample);
        self.idle_key = Some(key);
    }

    /// Re-check the cache against the current mode and filters.
    fn refresh_idle(&mut self, force: bool) {
        let view = self.writer.view();
        self.ensure_idle(view.mode(), view.settings(), force);
    }

    /// Periodic housekeeping: pick up library edits.
    pub fn tick(&mut self) -> anyhow::Result<()> {
        if self.source.revision() == self.revision {
            return Ok(());
        }
        let result = self.reload_library();
        self.refresh_idle(false);
        result
    }

    pub fn handle(&mut self, action: &WheelAction) -> WheelResult {
        match action {
            WheelAction::SetMode { mode } => {
                let settings = self.writer.view().settings();
                self.ensure_idle(*mode, settings, false);
                WheelResult::Applied
            }
            WheelAction::UpdateSettings { update } => {
                let mut settings = self.writer.view().settings();
                settings.apply(update);
                let mode = self.writer.view().mode();
                self.ensure_idle(mode, settings, false);
                WheelResult::Applied
            }
            WheelAction::Refresh => {
                if let Err(e) = self.reload_library() {
                    return WheelResult::Invalid {
                        reason: format!("{e:#}"),
                    };
                }
                self.refresh_idle(true);
                WheelResult::Applied
            }
            WheelAction::PublishIdle { request } => {
                if request.sample.is_all_empty() {
                    return WheelResult::Invalid {
                        reason: "preview sample has no occupied slots".into(),
                    };
                }
                let pool_size = if request.pool_size > 0 {
                    request.pool_size
                } else {
                    self.writer.view().pool().pool.len()
                };
                self.writer.set_idle_sample(request.sample.clone(), pool_size);
                WheelResult::Applied
            }
            WheelAction::Spin { request } => self.spin(request),
            WheelAction::Select { entity } => {
                let status = match self.library.game(&entity.id).map(|g| g.status) {
                    Some(GameStatus::Completed) => GameStatus::Completed,
                    _ => GameStatus::InProgress,
                };
                tracing::info!("current selection: {} ({})", entity.title, entity.id);
                self.writer.set_current(CurrentSelection {
                    entity: entity.clone(),
                    status,
                });
                WheelResult::Applied
            }
        }
    }

    fn spin(&mut self, request: &gamewheel::SpinRequest) -> WheelResult {
        // Spins always run against the current pool, not a stale cache.
        self.refresh_idle(false);
        let view = self.writer.view();
        let snapshot = view.snapshot();
        let pool = view.pool().pool;

        let now = Utc::now().timestamp_millis();
        let ts = match self.writer.last_spin_timestamp() {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        let ctx = SpinContext {
            mode: snapshot.mode,
            settings: &snapshot.settings,
            pool: &pool,
            idle_sample: &snapshot.sample,
            idle_pool_size: snapshot.pool_size,
        };
        let spin_id = uuid::Uuid::new_v4().to_string();

        match compute_spin(&mut self.rng, &ctx, request, spin_id, ts) {
            Ok(descriptor) => {
                tracing::info!(
                    "spin {}: target {} of {} (pool {}, {} ms, {} turns)",
                    descriptor.spin_id,
                    descriptor.target_idx,
                    descriptor.sample.occupied_count(),
                    descriptor.pool_size,
                    descriptor.duration_ms,
                    descriptor.turns
                );
                self.writer.record_spin(descriptor.clone());
                let mut reply = descriptor;
                reply.age_ms = Some(0);
                WheelResult::Spun {
                    spin: Box::new(reply),
                }
            }
            Err(SpinRefused::EmptyPool) => WheelResult::EmptyPool,
            Err(SpinRefused::Invalid(reason)) => WheelResult::Invalid { reason },
        }
    }
}

// ---------------------------------------------------------------------------
// System actor
// ---------------------------------------------------------------------------

/// Always-on actor owning the `WheelService` (and through it the sole
/// `WheelStateWriter`).
pub struct SystemActor {
    service: Mutex<Option<WheelService>>,
    ready_tx: Mutex<Option<std_mpsc::SyncSender<()>>>,
}

impl SystemActor {
    pub fn new(service: WheelService) -> (Self, std_mpsc::Receiver<()>) {
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(0);
        let actor = Self {
            service: Mutex::new(Some(service)),
            ready_tx: Mutex::new(Some(ready_tx)),
        };
        (actor, ready_rx)
    }
}

impl Actor for SystemActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        let service = self.service.lock().unwrap_or_else(|e| e.into_inner()).take();
        let ready_tx = self.ready_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        let (Some(service), Some(ready_tx)) = (service, ready_tx) else {
            tracing::warn!("system actor already started");
            return;
        };

        if let Err(e) = std::thread::Builder::new()
            .name("system".into())
            .spawn(move || run(service, state, sender, receiver, ready_tx))
        {
            tracing::error!("failed to spawn system thread: {e}");
        }
    }
}

fn run(
    mut service: WheelService,
    state: Arc<SystemState>,
    sender: BusSender,
    mut receiver: BusReceiver,
    ready_tx: std_mpsc::SyncSender<()>,
) {
    // Signal main thread that we're up and polling.
    let _ = ready_tx.send(());
    drop(ready_tx);

    let mut last_check = Instant::now();
    loop {
        match receiver.poll() {
            Err(PollError::Shutdown) => return,
            Ok(None) => {
                if last_check.elapsed() >= LIBRARY_CHECK_INTERVAL {
                    last_check = Instant::now();
                    if let Err(e) = service.tick() {
                        alert(&sender, AlertLevel::Warn, format!("library reload failed: {e:#}"));
                    }
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Ok(Some(msg)) => {
                if let GamewheelEvent::WheelCommand(cmd) = &msg.event {
                    handle_command(cmd, &mut service, &state, &sender);
                }
            }
        }
    }
}

fn handle_command(
    cmd: &WheelCommand,
    service: &mut WheelService,
    state: &SystemState,
    sender: &BusSender,
) {
    tracing::debug!("wheel command: {}", cmd.action);
    let result = service.handle(&cmd.action);

    match (&cmd.action, &result) {
        (WheelAction::SetMode { .. } | WheelAction::UpdateSettings { .. }, WheelResult::Applied) => {
            let mode = state.wheel.mode();
            let settings = state.wheel.settings();
            state.system.update(|c| {
                c.wheel.mode = mode;
                c.wheel.settings = settings;
            });
        }
        (_, WheelResult::EmptyPool) => {
            alert(sender, AlertLevel::Warn, "spin refused: no eligible candidates".into());
        }
        (_, WheelResult::Invalid { reason }) => {
            alert(sender, AlertLevel::Warn, format!("{} rejected: {reason}", cmd.action));
        }
        _ => {}
    }

    if let Some(request_id) = &cmd.request_id {
        sender.emit(WheelOutcome {
            request_id: request_id.clone(),
            result,
        });
    }
}

fn alert(sender: &BusSender, level: AlertLevel, message: String) {
    sender.emit(AlertMessage { level, message });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryGame;
    use crate::state::WheelState;
    use gamewheel::{
        CandidateEntity, PublishIdleRequest, Sample, SettingsUpdate, SpinRequest, SpinSource,
    };

    fn library() -> Library {
        let game = |id: &str, console: &str| LibraryGame {
            id: id.into(),
            title: format!("Title {id}"),
            console: Some(console.into()),
            console_id: None,
            image_url: None,
            status: if id == "g9" {
                GameStatus::Completed
            } else {
                GameStatus::NotStarted
            },
        };
        Library {
            games: vec![
                game("g1", "SNES"),
                game("g2", "SNES"),
                game("g3", "NES"),
                game("g4", "Genesis"),
                game("g9", "NES"),
            ],
            suggestions: Vec::new(),
        }
    }

    fn service(lib: Library) -> (WheelState, WheelService) {
        let (state, writer) = WheelState::new(WheelMode::Game, FilterSettings::default());
        let svc = WheelService::with_rng(writer, Box::new(lib), StdRng::seed_from_u64(3));
        (state, svc)
    }

    #[test]
    fn startup_populates_idle_sample() {
        let (state, _svc) = service(library());
        let snap = state.snapshot();
        assert_eq!(snap.pool_size, 5);
        assert_eq!(snap.sample.occupied_count(), 5);
        assert!(snap.spin.is_none());
    }

    #[test]
    fn idle_sample_is_cached_until_inputs_change() {
        let (state, mut svc) = service(library());
        let before = state.snapshot().sample;
        svc.handle(&WheelAction::UpdateSettings {
            update: SettingsUpdate::default(),
        });
        assert_eq!(state.snapshot().sample, before);

        svc.handle(&WheelAction::SetMode {
            mode: WheelMode::Console,
        });
        let snap = state.snapshot();
        assert_eq!(snap.mode, WheelMode::Console);
        assert_eq!(snap.pool_size, 3);
        assert!(snap.sample.iter().filter_map(|s| s.entity()).all(|e| e.id.starts_with("console-")));
    }

    #[test]
    fn spin_publishes_descriptor_and_syncs_idle_sample() {
        let (state, mut svc) = service(library());
        let result = svc.handle(&WheelAction::Spin {
            request: SpinRequest::default(),
        });
        let WheelResult::Spun { spin } = result else {
            panic!("expected a spin, got {result:?}");
        };
        assert!(spin.sample.entity(spin.target_idx).is_some());
        assert_eq!(spin.age_ms, Some(0));

        let snap = state.snapshot();
        assert_eq!(snap.sample, spin.sample);
        assert_eq!(snap.spin.unwrap().spin_id, spin.spin_id);
    }

    #[test]
    fn spin_timestamps_strictly_increase() {
        let (_state, mut svc) = service(library());
        let mut last = i64::MIN;
        for _ in 0..5 {
            let WheelResult::Spun { spin } = svc.handle(&WheelAction::Spin {
                request: SpinRequest::default(),
            }) else {
                panic!("expected a spin");
            };
            assert!(spin.server_timestamp > last);
            last = spin.server_timestamp;
        }
    }

    #[test]
    fn spin_on_empty_pool_is_refused() {
        let (state, mut svc) = service(Library::default());
        let result = svc.handle(&WheelAction::Spin {
            request: SpinRequest::default(),
        });
        assert_eq!(result, WheelResult::EmptyPool);
        assert!(state.spin().is_none());

        svc.handle(&WheelAction::UpdateSettings {
            update: SettingsUpdate {
                spin_source: Some(SpinSource::Sample),
                ..Default::default()
            },
        });
        assert_eq!(
            svc.handle(&WheelAction::Spin {
                request: SpinRequest::default()
            }),
            WheelResult::EmptyPool
        );
    }

    #[test]
    fn console_filter_narrows_game_pool() {
        let (state, mut svc) = service(library());
        svc.handle(&WheelAction::UpdateSettings {
            update: SettingsUpdate {
                console_filter: Some("SNES".into()),
                ..Default::default()
            },
        });
        let pool = state.pool().pool;
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|e| e.console_name.as_deref() == Some("SNES")));
    }

    #[test]
    fn published_preview_becomes_idle_sample() {
        let (state, mut svc) = service(library());
        let preview = Sample::from_entities([CandidateEntity::game("g3", "Title g3")]);
        let result = svc.handle(&WheelAction::PublishIdle {
            request: PublishIdleRequest {
                sample: preview.clone(),
                pool_size: 0,
            },
        });
        assert_eq!(result, WheelResult::Applied);
        let snap = state.snapshot();
        assert_eq!(snap.sample, preview);
        assert_eq!(snap.pool_size, 5);

        let empty = svc.handle(&WheelAction::PublishIdle {
            request: PublishIdleRequest {
                sample: Sample::empty(),
                pool_size: 0,
            },
        });
        assert!(matches!(empty, WheelResult::Invalid { .. }));
    }

    /// Library whose contents and revision the test controls. `None`
    /// contents fail to load, like a half-written file.
    #[derive(Clone, Default)]
    struct EditableSource(std::sync::Arc<std::sync::Mutex<(u64, Option<Library>)>>);

    impl EditableSource {
        fn set(&self, revision: u64, library: Option<Library>) {
            *self.0.lock().unwrap() = (revision, library);
        }
    }

    impl CandidateSource for EditableSource {
        fn load(&self) -> anyhow::Result<Library> {
            self.0
                .lock()
                .unwrap()
                .1
                .clone()
                .ok_or_else(|| anyhow::anyhow!("parsing library: unexpected end of input"))
        }

        fn revision(&self) -> u64 {
            self.0.lock().unwrap().0
        }
    }

    #[test]
    fn failed_reload_is_retried_on_next_tick() {
        let source = EditableSource::default();
        source.set(1, Some(Library::default()));
        let (state, writer) = WheelState::new(WheelMode::Game, FilterSettings::default());
        let mut svc =
            WheelService::with_rng(writer, Box::new(source.clone()), StdRng::seed_from_u64(5));
        assert_eq!(state.snapshot().pool_size, 0);

        source.set(2, None);
        assert!(svc.tick().is_err());
        assert_eq!(state.snapshot().pool_size, 0);

        // Same revision, now readable.
        source.set(2, Some(library()));
        svc.tick().unwrap();
        assert_eq!(state.snapshot().pool_size, 5);
    }

    #[test]
    fn selecting_moves_not_started_to_in_progress() {
        let (state, mut svc) = service(library());
        svc.handle(&WheelAction::Select {
            entity: CandidateEntity::game("g1", "Title g1"),
        });
        assert_eq!(state.current().unwrap().status, GameStatus::InProgress);

        svc.handle(&WheelAction::Select {
            entity: CandidateEntity::game("g9", "Title g9"),
        });
        let current = state.current().unwrap();
        assert_eq!(current.entity.id, "g9");
        assert_eq!(current.status, GameStatus::Completed);
    }
}
