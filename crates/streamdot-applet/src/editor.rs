//! URL-change dialog subprocess.
//!
//! Runs the configured entry dialog (zenity by default) pre-filled with the
//! current URL, without blocking the event loop. Exit 0 submits the dialog's
//! standard output; any non-zero exit means the dialog was dismissed.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use streamdot_core::config::EditorConfig;
use streamdot_core::controller::EditOutcome;
use streamdot_core::error::EditError;

#[derive(Clone)]
pub struct UrlEditor {
    command: String,
    args: Vec<String>,
}

impl UrlEditor {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Launch the dialog pre-filled with `current_url` and classify the
    /// result. Never returns an error: every failure mode is an outcome.
    pub async fn run(&self, current_url: &str) -> EditOutcome {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{url}", current_url))
            .collect();
        debug!("launching url editor: {} {:?}", self.command, args);

        let output = match Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return EditOutcome::Failed(EditError::Launch(e.to_string())),
        };

        if !output.status.success() {
            info!("url editor exited with {}", output.status);
            return EditOutcome::Cancelled;
        }

        match String::from_utf8(output.stdout) {
            Ok(stdout) => EditOutcome::Submitted(stdout),
            Err(e) => EditOutcome::Failed(EditError::Result(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> UrlEditor {
        UrlEditor {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn exit_zero_submits_stdout() {
        let editor = sh("printf 'http://example.com/a.mp3\\n'");
        match editor.run("http://old.example/stream").await {
            EditOutcome::Submitted(out) => {
                assert_eq!(out.trim(), "http://example.com/a.mp3");
            }
            other => panic!("expected Submitted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn url_placeholder_is_substituted() {
        let editor = UrlEditor {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo \"$0\"".to_string(), "{url}".to_string()],
        };
        match editor.run("http://old.example/stream").await {
            EditOutcome::Submitted(out) => {
                assert_eq!(out.trim(), "http://old.example/stream");
            }
            other => panic!("expected Submitted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_is_cancelled() {
        let editor = sh("exit 1");
        assert!(matches!(
            editor.run("http://old.example/stream").await,
            EditOutcome::Cancelled
        ));
    }

    #[tokio::test]
    async fn non_utf8_output_is_a_result_failure() {
        let editor = sh("printf '\\377\\376'");
        assert!(matches!(
            editor.run("http://old.example/stream").await,
            EditOutcome::Failed(EditError::Result(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_failure() {
        let editor = UrlEditor {
            command: "/nonexistent/streamdot-no-such-editor".to_string(),
            args: vec![],
        };
        assert!(matches!(
            editor.run("http://old.example/stream").await,
            EditOutcome::Failed(EditError::Launch(_))
        ));
    }
}
