//! PlaybackController — the Stopped/Playing state machine and its
//! icon/menu synchronization contract.
//!
//! Two states, three transitions. Every transition updates the panel surface
//! before returning, so no turn of the event loop can observe a state that
//! disagrees with the glyph or the menu label. All failures end in a
//! confirmed Stopped state plus a log line; nothing propagates to the caller
//! and nothing is retried.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{EngineEvent, MediaEngine, PipelineState, SubscriptionId};
use crate::error::EditError;
use crate::panel::{Glyph, PanelHost};
use crate::session::{ActiveSession, PlaybackState};

/// Title for user-visible notifications.
const NOTIFY_TITLE: &str = "streamdot";

/// Result of one run of the external URL editor.
#[derive(Debug)]
pub enum EditOutcome {
    /// Editor exited 0; payload is its raw standard output.
    Submitted(String),
    /// Editor exited non-zero (dialog dismissed).
    Cancelled,
    /// Editor could not be launched or its output could not be read.
    Failed(EditError),
}

pub struct PlaybackController<E: MediaEngine, P: PanelHost> {
    engine: E,
    panel: P,
    stream_url: String,
    events: mpsc::Sender<(SubscriptionId, EngineEvent)>,
    session: Option<ActiveSession<E::Pipeline>>,
}

impl<E: MediaEngine, P: PanelHost> PlaybackController<E, P> {
    pub fn new(
        engine: E,
        mut panel: P,
        stream_url: String,
        events: mpsc::Sender<(SubscriptionId, EngineEvent)>,
    ) -> Self {
        // Paint the initial Stopped surface so the indicator is never blank.
        panel.set_glyph(PlaybackState::Stopped.glyph());
        panel.set_toggle_label(PlaybackState::Stopped.toggle_label());
        panel.set_url_label(&stream_url);
        Self {
            engine,
            panel,
            stream_url,
            events,
            session: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.session.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Start playback of the current URL. No-op while already Playing.
    pub async fn start(&mut self) {
        if self.session.is_some() {
            debug!("start ignored: already playing");
            return;
        }

        info!("starting playback: {}", self.stream_url);
        let mut pipeline = match self.engine.create_pipeline(&self.stream_url).await {
            Ok(p) => p,
            Err(e) => {
                error!("{e}");
                return;
            }
        };

        let subscription = self.engine.subscribe(&mut pipeline, self.events.clone());
        if let Err(e) = self.engine.set_playing(&pipeline).await {
            error!("{e}");
            self.engine.unsubscribe(subscription);
            self.engine.release(pipeline).await;
            return;
        }

        self.session = Some(ActiveSession {
            pipeline,
            subscription,
        });
        self.sync_surface();
    }

    /// Halt playback and discard the pipeline. No-op while already Stopped.
    pub async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            debug!("stop ignored: already stopped");
            return;
        };

        info!("stopping playback");
        // Unsubscribe first so a late bus callback cannot observe a session
        // whose handle is already gone.
        self.engine.unsubscribe(session.subscription);
        self.engine.release(session.pipeline).await;
        self.sync_surface();
    }

    /// Dispatch on the current state. Always reports the gesture handled.
    pub async fn toggle(&mut self) -> bool {
        debug!("toggle requested, current state: {:?}", self.state());
        match self.state() {
            PlaybackState::Stopped => self.start().await,
            PlaybackState::Playing => self.stop().await,
        }
        true
    }

    /// Handle a bus event. Events tagged with anything other than the live
    /// session's subscription id belong to a discarded pipeline and are
    /// dropped.
    pub async fn handle_event(&mut self, id: SubscriptionId, event: EngineEvent) {
        let live = self.session.as_ref().map(|s| s.subscription.id());
        if live != Some(id) {
            debug!("ignoring bus event for stale subscription {id}");
            return;
        }

        match event {
            EngineEvent::Error { message, detail } => {
                error!("stream error: {message} ({detail})");
                self.stop().await;
            }
            EngineEvent::EndOfStream => {
                info!("end of stream");
                self.stop().await;
            }
            EngineEvent::StateChanged { new, .. } => {
                // Redundant with the synchronous update in start(); harmless.
                if new == PipelineState::Playing {
                    self.panel.set_glyph(Glyph::Stop);
                }
            }
        }
    }

    /// Apply the result of a URL-editor run. The candidate is the trimmed
    /// editor output; it is taken only when non-empty and different from the
    /// current URL. No validation beyond that.
    pub fn apply_url_edit(&mut self, outcome: EditOutcome) {
        match outcome {
            EditOutcome::Submitted(raw) => {
                let candidate = raw.trim();
                if candidate.is_empty() || candidate == self.stream_url {
                    debug!("url edit produced no change");
                    return;
                }
                self.stream_url = candidate.to_string();
                self.panel.set_url_label(&self.stream_url);
                self.panel.notify(NOTIFY_TITLE, "URL updated successfully");
                info!("stream url changed to {}", self.stream_url);
            }
            EditOutcome::Cancelled => {
                info!("url edit cancelled");
                self.panel.notify(NOTIFY_TITLE, "URL was not changed");
            }
            EditOutcome::Failed(e) => {
                error!("url edit failed: {e}");
                self.panel.notify(NOTIFY_TITLE, "Failed to change URL");
            }
        }
    }

    /// Teardown: force a transition to Stopped, releasing any held pipeline.
    pub async fn shutdown(&mut self) {
        if self.session.is_some() {
            info!("shutting down while playing");
        }
        self.stop().await;
    }

    fn sync_surface(&mut self) {
        let state = self.state();
        self.panel.set_glyph(state.glyph());
        self.panel.set_toggle_label(state.toggle_label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Subscription;
    use crate::error::EngineError;
    use std::cell::RefCell;
    use std::rc::Rc;

    // ── fakes ─────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct EngineLog {
        create_attempts: usize,
        released: usize,
        play_commands: usize,
        subscribed: Vec<SubscriptionId>,
        unsubscribed: Vec<SubscriptionId>,
    }

    struct FakePipeline;

    struct FakeEngine {
        log: Rc<RefCell<EngineLog>>,
        fail_create: bool,
        fail_play: bool,
    }

    impl MediaEngine for FakeEngine {
        type Pipeline = FakePipeline;

        async fn create_pipeline(&mut self, _url: &str) -> Result<FakePipeline, EngineError> {
            self.log.borrow_mut().create_attempts += 1;
            if self.fail_create {
                return Err(EngineError::PipelineCreation("refused".into()));
            }
            Ok(FakePipeline)
        }

        fn subscribe(
            &mut self,
            _pipeline: &mut FakePipeline,
            _events: mpsc::Sender<(SubscriptionId, EngineEvent)>,
        ) -> Subscription {
            let subscription = Subscription::new();
            self.log.borrow_mut().subscribed.push(subscription.id());
            subscription
        }

        fn unsubscribe(&mut self, subscription: Subscription) {
            self.log.borrow_mut().unsubscribed.push(subscription.id());
        }

        async fn set_playing(&mut self, _pipeline: &FakePipeline) -> Result<(), EngineError> {
            if self.fail_play {
                return Err(EngineError::Command("pause refused".into()));
            }
            self.log.borrow_mut().play_commands += 1;
            Ok(())
        }

        async fn release(&mut self, _pipeline: FakePipeline) {
            self.log.borrow_mut().released += 1;
        }
    }

    #[derive(Default)]
    struct PanelLog {
        glyph: Option<Glyph>,
        toggle_label: String,
        url_label: String,
        glyph_sets: usize,
        url_label_sets: usize,
        notifications: Vec<(String, String)>,
        total_calls: usize,
    }

    struct FakePanel {
        log: Rc<RefCell<PanelLog>>,
    }

    impl PanelHost for FakePanel {
        fn set_glyph(&mut self, glyph: Glyph) {
            let mut log = self.log.borrow_mut();
            log.glyph = Some(glyph);
            log.glyph_sets += 1;
            log.total_calls += 1;
        }

        fn set_toggle_label(&mut self, label: &str) {
            let mut log = self.log.borrow_mut();
            log.toggle_label = label.to_string();
            log.total_calls += 1;
        }

        fn set_url_label(&mut self, url: &str) {
            let mut log = self.log.borrow_mut();
            log.url_label = url.to_string();
            log.url_label_sets += 1;
            log.total_calls += 1;
        }

        fn notify(&mut self, title: &str, body: &str) {
            let mut log = self.log.borrow_mut();
            log.notifications.push((title.to_string(), body.to_string()));
            log.total_calls += 1;
        }
    }

    type TestController = PlaybackController<FakeEngine, FakePanel>;

    fn rig(
        fail_create: bool,
        fail_play: bool,
    ) -> (TestController, Rc<RefCell<EngineLog>>, Rc<RefCell<PanelLog>>) {
        let engine_log = Rc::new(RefCell::new(EngineLog::default()));
        let panel_log = Rc::new(RefCell::new(PanelLog::default()));
        let engine = FakeEngine {
            log: engine_log.clone(),
            fail_create,
            fail_play,
        };
        let panel = FakePanel {
            log: panel_log.clone(),
        };
        let (tx, _rx) = mpsc::channel(8);
        let controller =
            PlaybackController::new(engine, panel, "http://radio.example/stream".to_string(), tx);
        // Forget the construction-time paint; tests assert on deltas.
        *panel_log.borrow_mut() = PanelLog::default();
        (controller, engine_log, panel_log)
    }

    fn live_subscription(engine_log: &Rc<RefCell<EngineLog>>) -> SubscriptionId {
        *engine_log.borrow().subscribed.last().expect("no subscription made")
    }

    // ── transitions ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn toggle_alternates_between_states() {
        let (mut c, _, _) = rig(false, false);
        for i in 1..=5 {
            assert!(c.toggle().await);
            let expected = if i % 2 == 1 {
                PlaybackState::Playing
            } else {
                PlaybackState::Stopped
            };
            assert_eq!(c.state(), expected, "after {i} toggles");
        }
    }

    #[tokio::test]
    async fn start_twice_constructs_at_most_once() {
        let (mut c, engine_log, _) = rig(false, false);
        c.start().await;
        c.start().await;
        assert_eq!(engine_log.borrow().create_attempts, 1);
        assert_eq!(c.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn stop_when_stopped_has_no_observable_effect() {
        let (mut c, engine_log, panel_log) = rig(false, false);
        c.stop().await;
        assert_eq!(panel_log.borrow().total_calls, 0);
        assert_eq!(engine_log.borrow().released, 0);
        assert!(engine_log.borrow().unsubscribed.is_empty());
    }

    #[tokio::test]
    async fn surface_matches_state_after_each_transition() {
        let (mut c, _, panel_log) = rig(false, false);

        c.start().await;
        assert_eq!(panel_log.borrow().glyph, Some(Glyph::Stop));
        assert_eq!(panel_log.borrow().toggle_label, "Stop");

        c.stop().await;
        assert_eq!(panel_log.borrow().glyph, Some(Glyph::Play));
        assert_eq!(panel_log.borrow().toggle_label, "Play");
    }

    // ── failure paths ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_failure_leaves_stopped_without_subscribing() {
        let (mut c, engine_log, panel_log) = rig(true, false);
        c.start().await;
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert!(engine_log.borrow().subscribed.is_empty());
        assert_eq!(panel_log.borrow().total_calls, 0);
    }

    #[tokio::test]
    async fn play_command_failure_releases_immediately() {
        let (mut c, engine_log, panel_log) = rig(false, true);
        c.start().await;
        assert_eq!(c.state(), PlaybackState::Stopped);
        let log = engine_log.borrow();
        assert_eq!(log.create_attempts, 1);
        assert_eq!(log.subscribed.len(), 1);
        assert_eq!(log.unsubscribed.len(), 1);
        assert_eq!(log.released, 1);
        drop(log);
        assert_eq!(panel_log.borrow().total_calls, 0);
    }

    // ── bus events ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn error_event_while_playing_stops_once() {
        let (mut c, engine_log, panel_log) = rig(false, false);
        c.start().await;
        let id = live_subscription(&engine_log);

        c.handle_event(
            id,
            EngineEvent::Error {
                message: "could not connect".into(),
                detail: "end-file reason=error".into(),
            },
        )
        .await;

        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(engine_log.borrow().released, 1);
        assert_eq!(engine_log.borrow().unsubscribed.len(), 1);
        assert_eq!(panel_log.borrow().glyph, Some(Glyph::Play));
    }

    #[tokio::test]
    async fn end_of_stream_stops() {
        let (mut c, engine_log, _) = rig(false, false);
        c.start().await;
        let id = live_subscription(&engine_log);

        c.handle_event(id, EngineEvent::EndOfStream).await;

        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(engine_log.borrow().released, 1);
    }

    #[tokio::test]
    async fn stale_subscription_events_are_ignored() {
        let (mut c, engine_log, _) = rig(false, false);
        c.start().await;
        let old_id = live_subscription(&engine_log);
        c.stop().await;
        c.start().await;

        c.handle_event(
            old_id,
            EngineEvent::Error {
                message: "late".into(),
                detail: "stale pipeline".into(),
            },
        )
        .await;

        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(engine_log.borrow().released, 1);
    }

    #[tokio::test]
    async fn state_changed_reasserts_the_stop_glyph() {
        let (mut c, engine_log, panel_log) = rig(false, false);
        c.start().await;
        let id = live_subscription(&engine_log);
        let glyph_sets_before = panel_log.borrow().glyph_sets;

        c.handle_event(
            id,
            EngineEvent::StateChanged {
                old: PipelineState::Paused,
                new: PipelineState::Playing,
                pending: PipelineState::Playing,
            },
        )
        .await;

        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(panel_log.borrow().glyph, Some(Glyph::Stop));
        assert_eq!(panel_log.borrow().glyph_sets, glyph_sets_before + 1);
        assert_eq!(engine_log.borrow().released, 0);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_while_playing_tears_down_exactly_once() {
        let (mut c, engine_log, _) = rig(false, false);
        c.start().await;

        c.shutdown().await;
        c.shutdown().await;

        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(engine_log.borrow().released, 1);
        assert_eq!(engine_log.borrow().unsubscribed.len(), 1);
    }

    // ── url edits ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn submitted_url_updates_field_and_label() {
        let (mut c, _, panel_log) = rig(false, false);
        c.apply_url_edit(EditOutcome::Submitted("http://example.com/a.mp3\n".into()));

        assert_eq!(c.stream_url(), "http://example.com/a.mp3");
        let log = panel_log.borrow();
        assert_eq!(log.url_label, "http://example.com/a.mp3");
        assert_eq!(log.notifications.len(), 1);
        assert_eq!(log.notifications[0].1, "URL updated successfully");
    }

    #[tokio::test]
    async fn cancelled_edit_keeps_url_and_notifies() {
        let (mut c, _, panel_log) = rig(false, false);
        let before = c.stream_url().to_string();

        c.apply_url_edit(EditOutcome::Cancelled);

        assert_eq!(c.stream_url(), before);
        let log = panel_log.borrow();
        assert_eq!(log.url_label_sets, 0);
        assert_eq!(log.notifications.len(), 1);
        assert_eq!(log.notifications[0].1, "URL was not changed");
    }

    #[tokio::test]
    async fn unchanged_or_empty_submission_is_a_no_op() {
        let (mut c, _, panel_log) = rig(false, false);
        let before = c.stream_url().to_string();

        c.apply_url_edit(EditOutcome::Submitted(format!("  {before}\n")));
        c.apply_url_edit(EditOutcome::Submitted("   \n".into()));

        assert_eq!(c.stream_url(), before);
        assert_eq!(panel_log.borrow().total_calls, 0);
    }

    #[tokio::test]
    async fn failed_edit_notifies_failure() {
        let (mut c, _, panel_log) = rig(false, false);
        let before = c.stream_url().to_string();

        c.apply_url_edit(EditOutcome::Failed(EditError::Launch(
            "no such file".into(),
        )));

        assert_eq!(c.stream_url(), before);
        let log = panel_log.borrow();
        assert_eq!(log.notifications.len(), 1);
        assert_eq!(log.notifications[0].1, "Failed to change URL");
    }
}
