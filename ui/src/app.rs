//! egui application: WheelApp.
//!
//! One app type serves both viewer roles. Every frame runs the same loop:
//! fire the poll when due, drain the `Pending` queue into the
//! `ReconciliationPoller`, advance the animation, apply winner effects
//! (admin only), then paint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::SecondsFormat;
use gamewheel::{
    IdleObservation, ReconciliationPoller, SLOT_COUNT, SpinObservation, Transition, WheelScene,
    WinnerEffect, sampler,
};

use crate::net::{self, PendingHandle};
use crate::panels::controls::SettingsForm;
use crate::types::{
    ActivityEntry, ActivityKind, AlertLevel, CandidateEntity, ClockReading, PoolResponse,
    PublishIdleRequest, SelectRequest, SettingsUpdate, SpinDescriptor, SpinRequest, ViewerRole,
    WheelMode,
};

const API_DOCS_MD: &str = include_str!("../../docs/API.md");
const MAX_ACTIVITY_ENTRIES: usize = 300;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct WheelApp {
    pub(crate) poller: ReconciliationPoller,

    // Networking
    pub(crate) pending: PendingHandle,
    pub(crate) reachable: bool,
    pub(crate) ever_reachable: bool,

    // Admin
    pub(crate) settings: SettingsForm,
    pub(crate) preview_requested: bool,
    pub(crate) spin_requested: bool,
    pub(crate) last_winner: Option<CandidateEntity>,
    pub(crate) show_api_docs: bool,
    pub(crate) api_docs_cache: egui_commonmark::CommonMarkCache,

    // Activity log
    pub(crate) activity: Vec<ActivityEntry>,
    pub(crate) activity_auto_scroll: bool,
    pub(crate) activity_filters: HashMap<ActivityKind, bool>,
}

impl WheelApp {
    /// No request is made here; the first frame is always due for a poll.
    pub fn new(_cc: &eframe::CreationContext<'_>, role: ViewerRole) -> Self {
        Self {
            poller: ReconciliationPoller::new(role),
            pending: net::new_pending(),
            reachable: false,
            ever_reachable: false,
            settings: SettingsForm::default(),
            preview_requested: false,
            spin_requested: false,
            last_winner: None,
            show_api_docs: false,
            api_docs_cache: egui_commonmark::CommonMarkCache::default(),
            activity: Vec::new(),
            activity_auto_scroll: true,
            activity_filters: ActivityKind::ALL.iter().map(|&k| (k, true)).collect(),
        }
    }

    pub fn role(&self) -> ViewerRole {
        self.poller.role()
    }

    pub(crate) fn push_activity(&mut self, kind: ActivityKind, text: String, level: Option<AlertLevel>) {
        self.activity.push(ActivityEntry {
            timestamp: chrono::Local::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
            text,
            level,
        });
        if self.activity.len() > MAX_ACTIVITY_ENTRIES {
            self.activity
                .drain(..self.activity.len() - MAX_ACTIVITY_ENTRIES);
        }
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    fn clock(ctx: &egui::Context) -> ClockReading {
        ClockReading {
            wall_ms: chrono::Utc::now().timestamp_millis(),
            mono_ms: ctx.input(|i| i.time) * 1000.0,
        }
    }

    /// Drain pending REST results into the sync state.
    fn apply_pending(&mut self, ctx: &egui::Context, now: ClockReading) {
        let (spins, states, pool, errors, reachable) = {
            let Ok(mut p) = self.pending.try_lock() else {
                return;
            };
            (
                std::mem::take(&mut p.spins),
                std::mem::take(&mut p.states),
                p.pool.take(),
                std::mem::take(&mut p.errors),
                p.reachable.take(),
            )
        };

        if let Some(r) = reachable {
            if r != self.reachable {
                log::info!("server {}", if r { "reachable" } else { "unreachable" });
            }
            self.reachable = r;
            self.ever_reachable |= r;
        }

        for spin in spins {
            self.spin_requested = false;
            let observation = self.poller.on_spin(spin.clone(), now);
            self.record_spin_observation(&spin, &observation);
        }

        for state in states {
            let spin = state.spin.clone();
            let settings = state.settings.clone();
            let update = self.poller.on_state(state, now);
            if update.mode_changed {
                let mode = self.poller.mode().current().unwrap_or_default();
                self.push_activity(ActivityKind::Mode, format!("mode is now {mode}"), None);
            }
            if let (Some(spin), Some(observation)) = (spin, update.spin) {
                self.record_spin_observation(&spin, &observation);
            }
            match update.idle {
                IdleObservation::Applied => {
                    self.push_activity(ActivityKind::Idle, "idle sample updated".into(), None);
                }
                IdleObservation::Deferred => {
                    log::debug!("idle sample parked until the reveal window closes");
                }
                _ => {}
            }
            self.settings.load_from(&settings);
        }

        if let Some(pool) = pool {
            self.apply_pool(ctx, pool);
        }

        for e in errors {
            self.spin_requested = false;
            self.push_activity(ActivityKind::Request, e, Some(AlertLevel::Warn));
        }
    }

    fn record_spin_observation(&mut self, spin: &SpinDescriptor, observation: &SpinObservation) {
        match observation {
            SpinObservation::Started => {
                let text = format!(
                    "spin {} started ({} ms, {} turns)",
                    short_id(&spin.spin_id),
                    spin.duration_ms,
                    spin.turns
                );
                self.push_activity(ActivityKind::Spin, text, None);
            }
            SpinObservation::Skipped => {
                let text = format!("spin {} already finished, not replayed", short_id(&spin.spin_id));
                self.push_activity(ActivityKind::Spin, text, None);
            }
            SpinObservation::Rejected(e) => {
                log::warn!("spin {} rejected: {e}", spin.spin_id);
                let text = format!("spin {} rejected: {e}", short_id(&spin.spin_id));
                self.push_activity(ActivityKind::Spin, text, Some(AlertLevel::Warn));
            }
            SpinObservation::Unchanged | SpinObservation::OutOfOrder => {}
        }
    }

    /// A pool fetched for the preview shuffle: sample it locally and
    /// publish the result as the idle sample.
    fn apply_pool(&mut self, ctx: &egui::Context, pool: PoolResponse) {
        if !self.preview_requested {
            return;
        }
        self.preview_requested = false;
        if pool.pool.is_empty() {
            self.push_activity(
                ActivityKind::Request,
                "preview: no items in wheel".into(),
                Some(AlertLevel::Warn),
            );
            return;
        }
        let request = PublishIdleRequest {
            sample: sampler::sample(&pool.pool, SLOT_COUNT),
            pool_size: pool.pool.len(),
        };
        net::post_idle(ctx, &self.pending, &request);
    }

    fn apply_frame(&mut self, ctx: &egui::Context, mono_ms: f64) {
        let frame = self.poller.on_frame(mono_ms);
        for transition in frame.transitions {
            match transition {
                Transition::Revealed { winner, .. } => {
                    let text = match &winner.console_name {
                        Some(console) => format!("winner: {} ({console})", winner.title),
                        None => format!("winner: {}", winner.title),
                    };
                    self.push_activity(ActivityKind::Winner, text, None);
                    self.last_winner = Some(winner);
                }
                Transition::IdleApplied => {
                    self.push_activity(ActivityKind::Idle, "parked idle sample applied".into(), None);
                }
                Transition::Cleared => {}
            }
        }
        for effect in frame.effects {
            self.apply_effect(ctx, effect);
        }
    }

    fn apply_effect(&mut self, ctx: &egui::Context, effect: WinnerEffect) {
        match effect {
            WinnerEffect::SelectGame(entity) => {
                net::post_current(ctx, &self.pending, &SelectRequest { entity });
            }
            WinnerEffect::ApplyConsoleFilter(console) => {
                self.push_activity(
                    ActivityKind::Request,
                    format!("console filter set to {console}"),
                    None,
                );
                let update = SettingsUpdate {
                    console_filter: Some(console),
                    ..Default::default()
                };
                net::post_settings(ctx, &self.pending, &update);
            }
        }
    }

    /// Milliseconds until something needs a repaint without user input.
    fn next_wake_ms(&self, mono_ms: f64) -> f64 {
        let mut wake = self.poller.schedule().remaining_ms(mono_ms);
        if let Some(deadline) = self.poller.sync().reveal_deadline() {
            wake = wake.min((deadline - mono_ms).max(0.0));
        }
        wake.max(16.0)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Spin needs at least one occupied wedge; otherwise no request is made.
    pub(crate) fn can_spin(&self) -> bool {
        self.poller.sync().can_request_spin() && !self.spin_requested
    }

    pub(crate) fn request_spin(&mut self, ctx: &egui::Context) {
        if !self.can_spin() {
            return;
        }
        self.spin_requested = true;
        net::post_spin(ctx, &self.pending, &SpinRequest::default());
    }

    pub(crate) fn request_mode(&mut self, ctx: &egui::Context, mode: WheelMode) {
        if let Some(req) = self.poller.request_mode(mode) {
            net::post_mode(ctx, &self.pending, &req);
        }
    }

    pub(crate) fn request_preview(&mut self, ctx: &egui::Context) {
        self.preview_requested = true;
        net::fetch_pool(ctx, &self.pending);
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn scene(&self) -> WheelScene {
        let sync = self.poller.sync();
        WheelScene::build(Arc::as_ref(sync.sample()), sync.angle(), sync.phase())
    }

    fn winner_banner(&self, ui: &mut egui::Ui, size: f32) {
        let Some(winner) = self.poller.sync().winner() else {
            return;
        };
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(&winner.title)
                    .size(size)
                    .strong()
                    .color(egui::Color32::from_rgb(255, 221, 87)),
            );
            if let Some(console) = &winner.console_name {
                ui.label(
                    egui::RichText::new(console)
                        .size(size * 0.6)
                        .color(egui::Color32::from_rgb(200, 200, 200)),
                );
            }
        });
    }

    fn render_overlay(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::from_rgb(16, 16, 20)))
            .show(ctx, |ui| {
                let scene = self.scene();
                ui.vertical_centered(|ui| {
                    crate::wheel::paint(ui, &scene);
                });
                self.winner_banner(ui, 30.0);
            });
    }

    fn render_admin(&mut self, ctx: &egui::Context) {
        if self.show_api_docs {
            let screen = ctx.content_rect();
            let win_size = [screen.width() * 0.9, screen.height() * 0.9];
            egui::Window::new("API Documentation")
                .open(&mut self.show_api_docs)
                .collapsible(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .fixed_size(win_size)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical()
                        .auto_shrink(false)
                        .show(ui, |ui| {
                            egui_commonmark::CommonMarkViewer::new().show(
                                ui,
                                &mut self.api_docs_cache,
                                API_DOCS_MD,
                            );
                        });
                });
        }

        // Dark screen until the server has answered once
        if !self.ever_reachable {
            egui::CentralPanel::default()
                .frame(egui::Frame::new().fill(egui::Color32::from_rgb(20, 20, 20)))
                .show(ctx, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            egui::RichText::new("CONNECTING")
                                .size(32.0)
                                .color(egui::Color32::from_rgb(140, 140, 140))
                                .strong(),
                        );
                    });
                });
            return;
        }

        egui::TopBottomPanel::top("admin_toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| self.render_toolbar(ui));
        });

        egui::SidePanel::left("admin_controls")
            .resizable(false)
            .default_width(230.0)
            .show(ctx, |ui| self.render_controls_panel(ui));

        egui::TopBottomPanel::bottom("admin_activity")
            .resizable(true)
            .default_height(160.0)
            .show(ctx, |ui| self.render_activity_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.reachable {
                let frame = egui::Frame::new()
                    .fill(egui::Color32::from_rgb(220, 53, 69))
                    .inner_margin(egui::Margin::same(6));
                frame.show(ui, |ui| {
                    ui.label(
                        egui::RichText::new("server unreachable, retrying")
                            .color(egui::Color32::WHITE)
                            .strong(),
                    );
                });
            }
            let scene = self.scene();
            ui.vertical_centered(|ui| {
                crate::wheel::paint(ui, &scene);
            });
            self.winner_banner(ui, 22.0);
        });
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();

        let spin_text = egui::RichText::new("SPIN").strong().size(16.0);
        if ui
            .add_enabled(self.can_spin(), egui::Button::new(spin_text))
            .clicked()
        {
            self.request_spin(&ctx);
        }
        ui.separator();

        let current = self.poller.mode().current();
        let pending = self.poller.mode().pending();
        for (mode, label) in [(WheelMode::Console, "Consoles"), (WheelMode::Game, "Games")] {
            let selected = current == Some(mode);
            let mut text = egui::RichText::new(label).strong().size(12.0);
            if pending == Some(mode) {
                text = text.italics();
            }
            if ui.selectable_label(selected, text).clicked() && !selected {
                self.request_mode(&ctx, mode);
            }
        }
        ui.separator();

        let idle = !self.poller.sync().is_spinning();
        if ui
            .add_enabled(idle && !self.preview_requested, egui::Button::new("Shuffle preview"))
            .clicked()
        {
            self.request_preview(&ctx);
        }
        if ui.add_enabled(idle, egui::Button::new("Refresh")).clicked() {
            net::post_refresh(&ctx, &self.pending);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button("API").clicked() {
                self.show_api_docs = true;
            }
            ui.label(
                egui::RichText::new("GAME WHEEL")
                    .strong()
                    .size(14.0)
                    .color(egui::Color32::from_rgb(140, 140, 140)),
            );
            if let Some(w) = &self.last_winner {
                ui.label(
                    egui::RichText::new(format!("last: {}", w.title))
                        .size(12.0)
                        .color(egui::Color32::from_rgb(180, 200, 255)),
                );
            }
        });
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

impl eframe::App for WheelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Self::clock(ctx);

        if self.poller.due(now.mono_ms) {
            net::poll(ctx, &self.pending, self.role());
        }
        self.apply_pending(ctx, now);
        self.apply_frame(ctx, now.mono_ms);

        match self.role() {
            ViewerRole::Overlay => self.render_overlay(ctx),
            ViewerRole::Admin => self.render_admin(ctx),
        }

        if self.poller.sync().is_spinning() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(Duration::from_millis(self.next_wake_ms(now.mono_ms) as u64));
        }
    }
}
