//! MediaEngine collaborator seam.
//!
//! The controller never talks to a media framework directly: it builds a
//! pipeline, attaches its bus to a channel, issues begin/halt commands, and
//! releases the handle. Events are tagged with the subscription id that was
//! live when they were emitted, so a late callback from an already-discarded
//! pipeline can be recognised and dropped by the receiver.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::error::EngineError;

pub type SubscriptionId = u64;

static NEXT_SUB_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned by `subscribe` and consumed by `unsubscribe`, so the pair
/// is checkable at the type level.
#[derive(Debug)]
pub struct Subscription(SubscriptionId);

impl Subscription {
    pub fn new() -> Self {
        Self(NEXT_SUB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> SubscriptionId {
        self.0
    }
}

/// Coarse pipeline states reported on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Null,
    Paused,
    Playing,
}

/// Unsolicited events from a live pipeline's bus.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Fatal mid-stream error; terminal for the session.
    Error { message: String, detail: String },
    EndOfStream,
    StateChanged {
        old: PipelineState,
        new: PipelineState,
        pending: PipelineState,
    },
}

/// The media framework as the controller sees it.
#[allow(async_fn_in_trait)]
pub trait MediaEngine {
    type Pipeline;

    /// Build a pipeline for `url` without starting it.
    async fn create_pipeline(&mut self, url: &str) -> Result<Self::Pipeline, EngineError>;

    /// Attach the pipeline's bus to `events`. Delivered events carry the
    /// returned subscription's id.
    fn subscribe(
        &mut self,
        pipeline: &mut Self::Pipeline,
        events: mpsc::Sender<(SubscriptionId, EngineEvent)>,
    ) -> Subscription;

    /// Detach a bus subscription, consuming the token.
    fn unsubscribe(&mut self, subscription: Subscription);

    /// Begin playback.
    async fn set_playing(&mut self, pipeline: &Self::Pipeline) -> Result<(), EngineError>;

    /// Halt and discard the pipeline.
    async fn release(&mut self, pipeline: Self::Pipeline);
}
