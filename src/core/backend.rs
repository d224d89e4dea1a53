//! The seam between the playback engine and a concrete audio graph.
//!
//! The engine only ever talks to the graph through [`AudioBackend`], which
//! keeps the bookkeeping testable on the host while the wasm build plugs in
//! the WebAudio implementation from `audio.rs`.

use thiserror::Error;

/// Lifecycle state of the shared audio context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

impl ContextState {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        }
    }
}

/// Failure reported by the audio graph. Carries the platform's own message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Callback fired when a playback source reaches its end.
pub type EndedCallback = Box<dyn FnOnce()>;

/// Audio graph operations the playback engine depends on.
///
/// Everything runs on one thread; the futures returned by the async methods
/// are not `Send` and are never expected to be.
#[allow(async_fn_in_trait)]
pub trait AudioBackend {
    /// Decoded sample data, shared between the entry and its sources.
    type Buffer: Clone;
    /// Per-track gain stage, already routed into the master gain.
    type Gain;
    /// A single running playback unit.
    type Source;

    fn context_state(&self) -> ContextState;

    async fn resume(&self) -> BackendResult<()>;

    /// Fetch the resource at `location` and decode it into a buffer.
    async fn fetch_and_decode(&self, location: &str) -> BackendResult<Self::Buffer>;

    /// Create a gain node connected downstream to the master gain.
    fn create_track_gain(&self) -> BackendResult<Self::Gain>;

    fn set_gain(&self, gain: &Self::Gain, value: f32);

    /// Detach a gain stage that no entry refers to any more.
    fn release_gain(&self, gain: &Self::Gain);

    fn set_master_gain(&self, value: f32);

    /// Create a looping source bound to `buffer` and connected to `gain`.
    /// The source is not started.
    fn create_looping_source(
        &self,
        buffer: &Self::Buffer,
        gain: &Self::Gain,
    ) -> BackendResult<Self::Source>;

    /// Register the end-of-playback callback for `source`. The callback is
    /// dispatched later from the event loop, never from inside another
    /// backend call.
    fn on_ended(&self, source: &Self::Source, callback: EndedCallback);

    fn start(&self, source: &Self::Source) -> BackendResult<()>;

    /// Stop and disconnect `source`. Stopping an already stopped source is
    /// not an error.
    fn stop(&self, source: &Self::Source);
}
