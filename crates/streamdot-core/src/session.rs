//! Playback session state.

use serde::{Deserialize, Serialize};

use crate::engine::Subscription;
use crate::panel::Glyph;

/// Playback state as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

impl PlaybackState {
    /// Menu action label: the label offers the transition, not the state.
    pub fn toggle_label(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "Play",
            PlaybackState::Playing => "Stop",
        }
    }

    pub fn glyph(self) -> Glyph {
        match self {
            PlaybackState::Stopped => Glyph::Play,
            PlaybackState::Playing => Glyph::Stop,
        }
    }
}

/// A live pipeline and the bus subscription watching it. The two are owned
/// together and released together; the controller's `Option<ActiveSession>`
/// is the single source of the Stopped/Playing distinction, so "handle
/// exists iff Playing" holds by construction.
pub struct ActiveSession<P> {
    pub pipeline: P,
    pub subscription: Subscription,
}
