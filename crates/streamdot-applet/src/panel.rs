//! Terminal status-line panel: the glyph slot plus menu labels rendered as
//! a single line that is rewritten in place.
//!
//! Notifications go to the desktop via `notify-send`; when that fails the
//! message is shown inline above the status line instead, so the user always
//! sees it somewhere.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use tracing::{debug, warn};

use streamdot_core::panel::{Glyph, PanelHost};

const NOTIFY_COMMAND: &str = "notify-send";

/// The rendered line. Shared with notification tasks so the inline fallback
/// can repaint the status line after printing.
struct PanelLine {
    glyph: Glyph,
    toggle_label: String,
    url: String,
}

impl PanelLine {
    fn status_line(&self) -> String {
        format!(
            "{} URL: {}  [space] {}  [u] change URL  [q] quit",
            self.glyph.symbol(),
            self.url,
            self.toggle_label
        )
    }

    fn redraw(&self) {
        let mut out = io::stdout();
        let _ = queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = write!(out, "{}", self.status_line());
        let _ = out.flush();
    }

    /// Print a notification on its own line, then repaint the status line
    /// below it.
    fn show_inline(&self, title: &str, body: &str) {
        let mut out = io::stdout();
        let _ = queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = write!(out, "{}\r\n", inline_line(title, body));
        let _ = out.flush();
        self.redraw();
    }
}

fn inline_line(title: &str, body: &str) -> String {
    format!("{title}: {body}")
}

/// Run the desktop notifier; reports whether the notification was shown.
async fn send_desktop_notification(command: &str, title: &str, body: &str) -> bool {
    match tokio::process::Command::new(command)
        .arg(title)
        .arg(body)
        .status()
        .await
    {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!("{command} exited with {status}");
            false
        }
        Err(e) => {
            warn!("{command} unavailable: {e}");
            false
        }
    }
}

pub struct StatusPanel {
    line: Arc<Mutex<PanelLine>>,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            line: Arc::new(Mutex::new(PanelLine {
                glyph: Glyph::Play,
                toggle_label: "Play".to_string(),
                url: String::new(),
            })),
        }
    }
}

impl PanelHost for StatusPanel {
    fn set_glyph(&mut self, glyph: Glyph) {
        if let Ok(mut line) = self.line.lock() {
            line.glyph = glyph;
            line.redraw();
        }
    }

    fn set_toggle_label(&mut self, label: &str) {
        if let Ok(mut line) = self.line.lock() {
            line.toggle_label = label.to_string();
            line.redraw();
        }
    }

    fn set_url_label(&mut self, url: &str) {
        if let Ok(mut line) = self.line.lock() {
            line.url = url.to_string();
            line.redraw();
        }
    }

    fn notify(&mut self, title: &str, body: &str) {
        debug!("notify: {title}: {body}");
        let line = self.line.clone();
        let title = title.to_string();
        let body = body.to_string();
        tokio::spawn(async move {
            if !send_desktop_notification(NOTIFY_COMMAND, &title, &body).await {
                if let Ok(line) = line.lock() {
                    line.show_inline(&title, &body);
                }
            }
        });
    }
}
