use crate::audio::WebAudioBackend;
use crate::core::constants::{clamp_volume, DEFAULT_MASTER_VOLUME, DEFAULT_TRACK_VOLUME};
use crate::core::{
    apply_mix, catalog, reduce, Action, LastState, MixSound, MixerState, PlaybackEngine,
    SleepTimer,
};
use crate::{countdown, storage};
use anyhow::Context;
use futures::future::join_all;
use instant::Instant;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub type WebEngine = PlaybackEngine<WebAudioBackend>;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// State shared between the JS-facing handle and the countdown loop.
pub struct Shared {
    engine: OnceCell<WebEngine>,
    view: RefCell<MixerState>,
    pub(crate) timer: RefCell<Option<SleepTimer>>,
    pub(crate) countdown_running: Cell<bool>,
    on_timer_expired: RefCell<Option<js_sys::Function>>,
}

impl Shared {
    /// The shared engine, creating the audio context on first use.
    fn engine(&self) -> anyhow::Result<WebEngine> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine.clone());
        }
        let backend = WebAudioBackend::new().context("audio context unavailable")?;
        let engine = PlaybackEngine::new(backend);
        self.view.borrow().apply_volumes(&engine);
        _ = self.engine.set(engine.clone());
        Ok(engine)
    }

    // Sync operations never create the context: with no engine nothing is
    // loaded, so they have nothing to act on.
    fn existing_engine(&self) -> Option<WebEngine> {
        self.engine.get().cloned()
    }

    pub(crate) fn dispatch(&self, action: Action) {
        let mut view = self.view.borrow_mut();
        *view = reduce(view.clone(), action);
    }

    pub(crate) fn expire_timer(&self) {
        if let Some(engine) = self.existing_engine() {
            engine.stop_all_tracks();
        }
        self.timer.borrow_mut().take();
        self.dispatch(Action::TimerExpired);
        log::info!("[timer] expired; all tracks stopped");
        let callback = self.on_timer_expired.borrow().clone();
        if let Some(cb) = callback {
            _ = cb.call0(&JsValue::NULL);
        }
    }
}

/// The mixer handed to the page. Create one per session.
#[wasm_bindgen]
pub struct Mixer {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl Mixer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Mixer {
        let view = MixerState::initial(storage::load_theme(), storage::load_mixes());
        log::info!(
            "[mixer] ready: {} sounds, {} saved mixes, storage {}",
            view.sounds.len(),
            view.saved_mixes.len(),
            if storage::is_available() { "available" } else { "unavailable" }
        );
        Mixer {
            shared: Rc::new(Shared {
                engine: OnceCell::new(),
                view: RefCell::new(view),
                timer: RefCell::new(None),
                countdown_running: Cell::new(false),
                on_timer_expired: RefCell::new(None),
            }),
        }
    }

    /// Load every catalog sound concurrently. Resolves to the number that
    /// decoded successfully; failures leave silent placeholders.
    pub fn load_catalog(&self) -> js_sys::Promise {
        let shared = self.shared.clone();
        future_to_promise(async move {
            let engine = shared.engine().map_err(|e| js_error(format!("{:#}", e)))?;
            let results = join_all(
                catalog()
                    .iter()
                    .map(|s| engine.load_track(s.id, s.audio_url)),
            )
            .await;
            shared.view.borrow().apply_volumes(&engine);
            let loaded = results.iter().filter(|r| r.is_ok()).count();
            log::info!("[mixer] catalog loaded: {}/{}", loaded, results.len());
            Ok(JsValue::from_f64(loaded as f64))
        })
    }

    pub fn load_track(&self, id: String, url: String) -> js_sys::Promise {
        let shared = self.shared.clone();
        future_to_promise(async move {
            let engine = shared.engine().map_err(|e| js_error(format!("{:#}", e)))?;
            let result = engine.load_track(&id, &url).await;
            shared.view.borrow().apply_volumes(&engine);
            result.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn play_track(&self, id: String) -> js_sys::Promise {
        let shared = self.shared.clone();
        future_to_promise(async move {
            let engine = shared.engine().map_err(|e| js_error(format!("{:#}", e)))?;
            engine.play_track(&id).await.map_err(js_error)?;
            if engine.is_playing(&id) {
                shared.dispatch(Action::PlaySound { id });
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn pause_track(&self, id: String) {
        if let Some(engine) = self.shared.existing_engine() {
            engine.pause_track(&id);
        }
        self.shared.dispatch(Action::PauseSound { id });
    }

    pub fn set_track_volume(&self, id: String, volume: f32) {
        if let Some(engine) = self.shared.existing_engine() {
            engine.set_track_volume(&id, volume);
        }
        self.shared.dispatch(Action::SetVolume {
            id,
            volume: clamp_volume(volume),
        });
    }

    pub fn track_volume(&self, id: &str) -> f32 {
        self.shared
            .existing_engine()
            .map(|e| e.track_volume(id))
            .unwrap_or(0.0)
    }

    pub fn set_master_volume(&self, volume: f32) {
        if let Some(engine) = self.shared.existing_engine() {
            engine.set_master_volume(volume);
        }
        self.shared.dispatch(Action::SetMasterVolume {
            volume: clamp_volume(volume),
        });
    }

    pub fn master_volume(&self) -> f32 {
        match self.shared.existing_engine() {
            Some(engine) => engine.master_volume(),
            None => self.shared.view.borrow().master_volume,
        }
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.shared
            .existing_engine()
            .map(|e| e.is_playing(id))
            .unwrap_or(false)
    }

    pub fn is_track_loaded(&self, id: &str) -> bool {
        self.shared
            .existing_engine()
            .map(|e| e.is_track_loaded(id))
            .unwrap_or(false)
    }

    pub fn track_ids(&self) -> js_sys::Array {
        self.shared
            .existing_engine()
            .map(|e| e.track_ids())
            .unwrap_or_default()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    pub fn context_state(&self) -> String {
        self.shared
            .existing_engine()
            .map(|e| e.context_state().as_str())
            .unwrap_or("uninitialized")
            .to_string()
    }

    pub fn stop_all(&self) {
        if let Some(engine) = self.shared.existing_engine() {
            engine.stop_all_tracks();
        }
        self.shared.timer.borrow_mut().take();
        self.shared.dispatch(Action::StopAll);
    }

    pub fn pause_all(&self) {
        if let Some(engine) = self.shared.existing_engine() {
            engine.pause_all_tracks();
        }
        self.shared.dispatch(Action::MasterPause);
    }

    pub fn resume_all(&self) -> js_sys::Promise {
        let shared = self.shared.clone();
        future_to_promise(async move {
            let Some(engine) = shared.existing_engine() else {
                return Ok(JsValue::UNDEFINED);
            };
            let resumed = engine.last_paused_ids();
            engine.resume_all_tracks().await;
            shared.dispatch(Action::MasterResume);
            // Mirror tracks that failed to come back
            for id in resumed {
                if !engine.is_playing(&id) {
                    shared.dispatch(Action::PauseSound { id });
                }
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Call from the first user gesture; browsers keep audio muted until then.
    pub fn resume_context(&self) -> js_sys::Promise {
        let shared = self.shared.clone();
        future_to_promise(async move {
            let engine = shared.engine().map_err(|e| js_error(format!("{:#}", e)))?;
            engine.resume_context().await.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn start_timer(&self, duration_ms: f64) {
        let duration_ms = duration_ms.max(0.0) as u64;
        *self.shared.timer.borrow_mut() = Some(SleepTimer::start(
            Duration::from_millis(duration_ms),
            Instant::now(),
        ));
        self.shared.dispatch(Action::StartTimer { duration_ms });
        log::info!("[timer] started for {} ms", duration_ms);
        countdown::start_loop(self.shared.clone());
    }

    pub fn cancel_timer(&self) {
        self.shared.timer.borrow_mut().take();
        self.shared.dispatch(Action::CancelTimer);
    }

    pub fn timer_remaining_ms(&self) -> f64 {
        self.shared
            .timer
            .borrow()
            .map(|t| t.remaining(Instant::now()).as_millis() as f64)
            .unwrap_or(0.0)
    }

    pub fn set_on_timer_expired(&self, callback: Option<js_sys::Function>) {
        *self.shared.on_timer_expired.borrow_mut() = callback;
    }

    /// Save the current mix under `name` and return its id.
    pub fn save_mix(&self, name: String) -> Result<String, JsValue> {
        let now_ms = js_sys::Date::now() as u64;
        self.shared.dispatch(Action::SaveMix { name, now_ms });
        let view = self.shared.view.borrow();
        storage::save_mixes(&view.saved_mixes).map_err(js_error)?;
        Ok(view
            .saved_mixes
            .last()
            .map(|m| m.id.clone())
            .unwrap_or_default())
    }

    /// Apply a saved mix. Returns false if no mix has that id.
    pub fn load_mix(&self, mix_id: String) -> bool {
        let mix = self
            .shared
            .view
            .borrow()
            .saved_mixes
            .iter()
            .find(|m| m.id == mix_id)
            .cloned();
        let Some(mix) = mix else {
            log::warn!("[mixer] no saved mix {}", mix_id);
            return false;
        };
        if let Some(engine) = self.shared.existing_engine() {
            apply_mix(&engine, &mix);
        }
        self.shared.dispatch(Action::LoadMix { mix_id });
        true
    }

    pub fn delete_mix(&self, mix_id: String) -> Result<(), JsValue> {
        self.shared.dispatch(Action::DeleteMix { mix_id });
        storage::save_mixes(&self.shared.view.borrow().saved_mixes).map_err(js_error)
    }

    pub fn saved_mixes_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.shared.view.borrow().saved_mixes).map_err(js_error)
    }

    pub fn theme(&self) -> String {
        self.shared.view.borrow().theme.as_str().to_string()
    }

    pub fn toggle_theme(&self) -> String {
        self.shared.dispatch(Action::ToggleTheme);
        let theme = self.shared.view.borrow().theme;
        storage::save_theme(theme);
        theme.as_str().to_string()
    }

    /// Stop everything and return volumes to their defaults. Theme and saved
    /// mixes are kept.
    pub fn reset(&self) {
        if let Some(engine) = self.shared.existing_engine() {
            engine.stop_all_tracks();
            for id in engine.track_ids() {
                engine.set_track_volume(&id, DEFAULT_TRACK_VOLUME);
            }
            engine.set_master_volume(DEFAULT_MASTER_VOLUME);
        }
        self.shared.timer.borrow_mut().take();
        self.shared.dispatch(Action::Reset);
    }

    /// Remember master and track volumes for the next visit.
    pub fn persist_session(&self) {
        let view = self.shared.view.borrow();
        storage::save_last_state(&LastState {
            master_volume: view.master_volume,
            sound_states: view
                .sounds
                .iter()
                .map(|s| MixSound {
                    id: s.id.clone(),
                    volume: s.volume,
                })
                .collect(),
        });
    }

    /// Re-apply volumes remembered by `persist_session`. Returns false when
    /// nothing valid was stored.
    pub fn restore_session(&self) -> bool {
        let Some(last) = storage::load_last_state() else {
            return false;
        };
        self.set_master_volume(last.master_volume);
        for sound in last.sound_states {
            self.set_track_volume(sound.id, sound.volume);
        }
        true
    }

    pub fn clear_storage(&self) {
        storage::clear_all();
    }

    /// Current mirror state as JSON, for rendering.
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&*self.shared.view.borrow()).map_err(js_error)
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}
