//! Playback engine: per-track looping sources routed through one master gain.
//!
//! The engine owns the bookkeeping for every track it has been asked to load
//! and drives the audio graph through an [`AudioBackend`]. All operations run
//! on a single thread, but the async ones (loading and context resume) are
//! suspension points where other calls may interleave, so every continuation
//! re-reads the track table instead of trusting what it saw before awaiting.

use super::backend::{AudioBackend, BackendError, ContextState};
use super::constants::{clamp_volume, DEFAULT_TRACK_VOLUME, ENGINE_INITIAL_MASTER_VOLUME};
use fnv::{FnvHashMap, FnvHashSet};
use futures::future::join_all;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load track `{id}`: {cause}")]
    Load { id: String, cause: BackendError },
    #[error("failed to resume audio context: {0}")]
    ContextResume(BackendError),
    #[error("failed to start track `{id}`: {cause}")]
    Start { id: String, cause: BackendError },
}

// A started source together with the token of the start that created it.
// End callbacks compare tokens so a superseded source cannot clear the
// bookkeeping of its replacement.
struct ActiveSource<S> {
    token: u64,
    node: S,
}

struct TrackEntry<B: AudioBackend> {
    buffer: Option<B::Buffer>,
    source: Option<ActiveSource<B::Source>>,
    gain: B::Gain,
    playing: bool,
    volume: f32,
    // Bumped whenever the entry is stopped or replaced. A start that awaited
    // the context gives up if this moved while it was suspended.
    generation: u64,
}

struct EngineState<B: AudioBackend> {
    master_volume: f32,
    tracks: FnvHashMap<String, TrackEntry<B>>,
    last_paused: FnvHashSet<String>,
    // Bumped on every bulk pause so an in-flight bulk resume knows whether
    // the set it is about to clear is still the one it resumed.
    pause_epoch: u64,
    next_token: u64,
}

/// Handle to the shared playback engine.
///
/// Cloning is cheap and every clone drives the same audio graph and track
/// table.
pub struct PlaybackEngine<B: AudioBackend> {
    backend: Rc<B>,
    state: Rc<RefCell<EngineState<B>>>,
}

impl<B: AudioBackend> Clone for PlaybackEngine<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            state: self.state.clone(),
        }
    }
}

impl<B: AudioBackend + 'static> PlaybackEngine<B> {
    pub fn new(backend: B) -> Self {
        backend.set_master_gain(ENGINE_INITIAL_MASTER_VOLUME);
        Self {
            backend: Rc::new(backend),
            state: Rc::new(RefCell::new(EngineState {
                master_volume: ENGINE_INITIAL_MASTER_VOLUME,
                tracks: FnvHashMap::default(),
                last_paused: FnvHashSet::default(),
                pause_epoch: 0,
                next_token: 0,
            })),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn context_state(&self) -> ContextState {
        self.backend.context_state()
    }

    /// Fetch and decode `location` and install it as track `id`.
    ///
    /// The new entry starts silent at the default volume. If fetching or
    /// decoding fails a placeholder entry is still installed (no buffer,
    /// default volume, routed gain) and the error is returned. Loading an id
    /// that already exists replaces the entry, stops its current source and
    /// detaches its old gain stage.
    pub async fn load_track(&self, id: &str, location: &str) -> Result<(), EngineError> {
        let gain = self.backend.create_track_gain().map_err(|cause| {
            log::error!("[engine] no gain stage for {}: {}", id, cause);
            EngineError::Load {
                id: id.to_string(),
                cause,
            }
        })?;
        self.backend.set_gain(&gain, DEFAULT_TRACK_VOLUME);

        let decoded = self.backend.fetch_and_decode(location).await;

        let mut state = self.state.borrow_mut();
        let mut generation = 0;
        if let Some(previous) = state.tracks.remove(id) {
            if let Some(active) = previous.source {
                log::info!("[engine] reloading {} stops its running source", id);
                self.backend.stop(&active.node);
            }
            self.backend.release_gain(&previous.gain);
            generation = previous.generation + 1;
        }
        let (buffer, result) = match decoded {
            Ok(buffer) => {
                log::info!("[engine] loaded {} from {}", id, location);
                (Some(buffer), Ok(()))
            }
            Err(cause) => {
                log::error!("[engine] failed to load {} from {}: {}", id, location, cause);
                (
                    None,
                    Err(EngineError::Load {
                        id: id.to_string(),
                        cause,
                    }),
                )
            }
        };
        state.tracks.insert(
            id.to_string(),
            TrackEntry {
                buffer,
                source: None,
                gain,
                playing: false,
                volume: DEFAULT_TRACK_VOLUME,
                generation,
            },
        );
        result
    }

    /// Start looping track `id`.
    ///
    /// Unknown or unloaded tracks are ignored with a warning. A suspended
    /// context is resumed first; if that fails the track stays stopped and
    /// [`EngineError::ContextResume`] is returned. A pause, bulk pause or
    /// reload that lands while the resume is pending wins, and the track is
    /// not started. A failure to start the source itself is logged and
    /// swallowed. Clears the bulk-pause memory.
    pub async fn play_track(&self, id: &str) -> Result<(), EngineError> {
        self.forget_bulk_pause(id);
        self.start_track(id).await
    }

    /// Stop track `id`. Safe to call on paused or unknown tracks. Clears the
    /// bulk-pause memory.
    pub fn pause_track(&self, id: &str) {
        self.forget_bulk_pause(id);
        self.stop_track(id);
    }

    /// Store and apply a track volume, clamped to `[0, 1]`. Never starts or
    /// stops playback.
    pub fn set_track_volume(&self, id: &str, volume: f32) {
        let volume = clamp_volume(volume);
        let mut state = self.state.borrow_mut();
        if let Some(track) = state.tracks.get_mut(id) {
            track.volume = volume;
            self.backend.set_gain(&track.gain, volume);
        }
    }

    /// Stored volume of `id`, or 0 for unknown tracks.
    pub fn track_volume(&self, id: &str) -> f32 {
        self.state
            .borrow()
            .tracks
            .get(id)
            .map(|t| t.volume)
            .unwrap_or(0.0)
    }

    pub fn set_master_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        self.state.borrow_mut().master_volume = volume;
        self.backend.set_master_gain(volume);
    }

    pub fn master_volume(&self) -> f32 {
        self.state.borrow().master_volume
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.state
            .borrow()
            .tracks
            .get(id)
            .map(|t| t.playing)
            .unwrap_or(false)
    }

    pub fn is_track_loaded(&self, id: &str) -> bool {
        self.state
            .borrow()
            .tracks
            .get(id)
            .map(|t| t.buffer.is_some())
            .unwrap_or(false)
    }

    /// Ids of every track entry, placeholders included, sorted.
    pub fn track_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn playing_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .state
            .borrow()
            .tracks
            .iter()
            .filter(|(_, t)| t.playing)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Tracks captured by the most recent bulk pause, sorted.
    pub fn last_paused_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().last_paused.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every playing track and forget the bulk-pause capture.
    pub fn stop_all_tracks(&self) {
        let playing = self.playing_ids();
        for id in &playing {
            self.stop_track(id);
        }
        {
            let mut state = self.state.borrow_mut();
            state.last_paused.clear();
            cancel_pending_starts(&mut state);
        }
        log::info!("[engine] stopped {} tracks", playing.len());
    }

    /// Remember which tracks are playing, then stop them. Each call replaces
    /// the previous capture.
    pub fn pause_all_tracks(&self) {
        let playing = self.playing_ids();
        {
            let mut state = self.state.borrow_mut();
            state.last_paused = playing.iter().cloned().collect();
            state.pause_epoch += 1;
            cancel_pending_starts(&mut state);
        }
        for id in &playing {
            self.stop_track(id);
        }
        log::info!("[engine] paused {} tracks", playing.len());
    }

    /// Restart every track captured by the last bulk pause.
    ///
    /// Tracks start concurrently and independently; a failure on one is
    /// logged and does not hold back the others. The capture is cleared once
    /// all of them have settled, unless a newer bulk pause replaced it in the
    /// meantime.
    pub async fn resume_all_tracks(&self) {
        let (ids, epoch) = {
            let state = self.state.borrow();
            let mut ids: Vec<String> = state.last_paused.iter().cloned().collect();
            ids.sort();
            (ids, state.pause_epoch)
        };
        let results = join_all(ids.iter().map(|id| self.start_track(id))).await;
        for (id, result) in ids.iter().zip(results) {
            if let Err(e) = result {
                log::warn!("[engine] resume of {} failed: {}", id, e);
            }
        }
        let mut state = self.state.borrow_mut();
        if state.pause_epoch == epoch {
            state.last_paused.clear();
        }
        log::info!("[engine] resumed {} tracks", ids.len());
    }

    /// Resume the shared context if it is suspended. Meant to run on the
    /// first user gesture.
    pub async fn resume_context(&self) -> Result<(), EngineError> {
        if self.backend.context_state() == ContextState::Suspended {
            self.backend
                .resume()
                .await
                .map_err(EngineError::ContextResume)?;
            log::info!("[engine] audio context resumed");
        }
        Ok(())
    }

    fn forget_bulk_pause(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        if state.tracks.contains_key(id) && !state.last_paused.is_empty() {
            log::debug!("[engine] {} changed by hand; dropping bulk-pause capture", id);
            state.last_paused.clear();
        }
    }

    async fn start_track(&self, id: &str) -> Result<(), EngineError> {
        let context = self.backend.context_state();
        let generation = {
            let mut state = self.state.borrow_mut();
            let Some(track) = state.tracks.get_mut(id) else {
                log::warn!("[engine] play ignored: {} was never loaded", id);
                return Ok(());
            };
            if track.buffer.is_none() {
                log::warn!("[engine] play ignored: {} has no decoded audio", id);
                return Ok(());
            }
            if track.playing {
                if context == ContextState::Running {
                    return Ok(());
                }
                log::info!(
                    "[engine] restarting {} (context {})",
                    id,
                    context.as_str()
                );
                track.playing = false;
                if let Some(stale) = track.source.take() {
                    self.backend.stop(&stale.node);
                }
            }
            track.generation
        };

        if context == ContextState::Suspended {
            if let Err(cause) = self.backend.resume().await {
                log::error!("[engine] context resume failed while starting {}: {}", id, cause);
                return Err(EngineError::ContextResume(cause));
            }
            log::info!("[engine] audio context resumed for {}", id);
        }

        self.start_source(id, generation);
        Ok(())
    }

    // Start sequence. Runs without awaiting, so it sees a consistent table.
    // `generation` is the entry generation seen before any await.
    fn start_source(&self, id: &str, generation: u64) {
        let mut state = self.state.borrow_mut();
        let token = state.next_token;
        state.next_token += 1;

        let Some(track) = state.tracks.get_mut(id) else {
            return;
        };
        if track.generation != generation {
            log::debug!("[engine] {} was paused or reloaded while starting", id);
            return;
        }
        let Some(buffer) = track.buffer.clone() else {
            return;
        };
        if track.playing {
            // Another call started it while we waited on the context.
            return;
        }
        if let Some(stale) = track.source.take() {
            self.backend.stop(&stale.node);
        }

        let node = match self.backend.create_looping_source(&buffer, &track.gain) {
            Ok(node) => node,
            Err(cause) => {
                let err = EngineError::Start {
                    id: id.to_string(),
                    cause,
                };
                log::error!("[engine] {}", err);
                return;
            }
        };
        self.backend.set_gain(&track.gain, track.volume);

        let weak = Rc::downgrade(&self.state);
        let ended_id = id.to_string();
        self.backend
            .on_ended(&node, Box::new(move || source_ended(&weak, &ended_id, token)));

        match self.backend.start(&node) {
            Ok(()) => {
                track.source = Some(ActiveSource { token, node });
                track.playing = true;
                log::info!("[engine] {} started", id);
            }
            Err(cause) => {
                self.backend.stop(&node);
                let err = EngineError::Start {
                    id: id.to_string(),
                    cause,
                };
                log::error!("[engine] {}", err);
            }
        }
    }

    fn stop_track(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        let Some(track) = state.tracks.get_mut(id) else {
            return;
        };
        track.playing = false;
        track.generation += 1;
        if let Some(active) = track.source.take() {
            self.backend.stop(&active.node);
            log::debug!("[engine] {} stopped", id);
        }
    }
}

// Bulk pause and stop also cover tracks whose start is still waiting on the
// context.
fn cancel_pending_starts<B: AudioBackend>(state: &mut EngineState<B>) {
    for track in state.tracks.values_mut() {
        track.generation += 1;
    }
}

fn source_ended<B: AudioBackend>(state: &Weak<RefCell<EngineState<B>>>, id: &str, token: u64) {
    let Some(shared) = state.upgrade() else {
        return;
    };
    let mut state = shared.borrow_mut();
    if let Some(track) = state.tracks.get_mut(id) {
        if track.source.as_ref().map(|s| s.token) == Some(token) {
            log::warn!("[engine] {} ended unexpectedly", id);
            track.source = None;
            track.playing = false;
        }
    }
}
