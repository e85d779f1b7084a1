//! Failure taxonomy.
//!
//! All failures are handled locally by forcing or confirming the Stopped
//! state and logging; nothing here is ever surfaced to a caller as a
//! propagated error. Mid-stream failures arrive as bus events
//! (`engine::EngineEvent::Error`), not as one of these types.

use thiserror::Error;

/// Errors from the media engine's synchronous command surface.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),
    #[error("playback command failed: {0}")]
    Command(String),
}

/// Errors from the URL-editor subprocess.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("failed to launch editor: {0}")]
    Launch(String),
    #[error("failed to read editor result: {0}")]
    Result(String),
}
