//! Event-loop funnel: keys, engine bus events, and editor completions all
//! converge on one channel consumed by one task, so the controller is only
//! ever touched from a single place.

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use streamdot_core::controller::{EditOutcome, PlaybackController};
use streamdot_core::engine::{EngineEvent, SubscriptionId};

use crate::editor::UrlEditor;
use crate::mpv::MpvEngine;
use crate::panel::StatusPanel;

/// Everything that can wake the controller.
#[derive(Debug)]
pub enum AppEvent {
    Toggle,
    EditUrl,
    Engine(SubscriptionId, EngineEvent),
    EditFinished(EditOutcome),
    Quit,
}

pub struct App {
    controller: PlaybackController<MpvEngine, StatusPanel>,
    editor: UrlEditor,
    events_tx: mpsc::Sender<AppEvent>,
    edit_in_flight: bool,
}

impl App {
    pub fn new(
        controller: PlaybackController<MpvEngine, StatusPanel>,
        editor: UrlEditor,
        events_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            controller,
            editor,
            events_tx,
            edit_in_flight: false,
        }
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<AppEvent>) -> anyhow::Result<()> {
        while let Some(event) = events.recv().await {
            match event {
                AppEvent::Toggle => {
                    let handled = self.controller.toggle().await;
                    debug!("toggle gesture handled={handled}");
                }
                AppEvent::EditUrl => self.spawn_editor(),
                AppEvent::Engine(id, engine_event) => {
                    self.controller.handle_event(id, engine_event).await;
                }
                AppEvent::EditFinished(outcome) => {
                    self.edit_in_flight = false;
                    self.controller.apply_url_edit(outcome);
                }
                AppEvent::Quit => break,
            }
        }
        self.controller.shutdown().await;
        Ok(())
    }

    fn spawn_editor(&mut self) {
        if self.edit_in_flight {
            debug!("url editor already open");
            return;
        }
        self.edit_in_flight = true;

        let editor = self.editor.clone();
        let url = self.controller.stream_url().to_string();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = editor.run(&url).await;
            let _ = tx.send(AppEvent::EditFinished(outcome)).await;
        });
    }
}

/// Key input: space/enter toggles, `u` opens the URL editor, `q`/Esc/Ctrl-C
/// quits.
pub fn spawn_key_reader(tx: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = EventStream::new();
        while let Some(Ok(event)) = stream.next().await {
            let Event::Key(key) = event else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let app_event = match key.code {
                KeyCode::Char(' ') | KeyCode::Enter => AppEvent::Toggle,
                KeyCode::Char('u') => AppEvent::EditUrl,
                KeyCode::Char('q') | KeyCode::Esc => AppEvent::Quit,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    AppEvent::Quit
                }
                _ => continue,
            };
            let quitting = matches!(app_event, AppEvent::Quit);
            if tx.send(app_event).await.is_err() || quitting {
                break;
            }
        }
    })
}

/// Bridge the engine's tagged bus channel into the funnel.
pub fn spawn_engine_bridge(
    mut engine_rx: mpsc::Receiver<(SubscriptionId, EngineEvent)>,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some((id, event)) = engine_rx.recv().await {
            if tx.send(AppEvent::Engine(id, event)).await.is_err() {
                break;
            }
        }
    })
}
