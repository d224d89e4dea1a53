//! Read-only mirror of the mixer used for rendering.
//!
//! The engine is the source of truth for audio; this snapshot is kept in step
//! by the caller, one [`Action`] per user-visible change, through the pure
//! [`reduce`] transition.

use super::backend::AudioBackend;
use super::catalog::catalog;
use super::constants::{DEFAULT_MASTER_VOLUME, DEFAULT_TRACK_VOLUME};
use super::engine::PlaybackEngine;
use super::mix::{MixSound, SavedMix, Theme};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundState {
    pub id: String,
    pub is_playing: bool,
    pub volume: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub duration_ms: u64,
    pub remaining_ms: u64,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixerState {
    /// One entry per catalog sound, in catalog order.
    pub sounds: Vec<SoundState>,
    pub master_volume: f32,
    pub theme: Theme,
    pub timer: Option<TimerState>,
    pub saved_mixes: Vec<SavedMix>,
    /// Sounds that were playing when the master pause was pressed.
    pub paused_sound_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    PlaySound { id: String },
    PauseSound { id: String },
    SetVolume { id: String, volume: f32 },
    SetMasterVolume { volume: f32 },
    ToggleTheme,
    SetTheme { theme: Theme },
    StartTimer { duration_ms: u64 },
    UpdateTimer { remaining_ms: u64 },
    CancelTimer,
    TimerExpired,
    SaveMix { name: String, now_ms: u64 },
    LoadMix { mix_id: String },
    DeleteMix { mix_id: String },
    MasterPause,
    MasterResume,
    Reset,
    StopAll,
}

fn default_sounds() -> Vec<SoundState> {
    catalog()
        .iter()
        .map(|s| SoundState {
            id: s.id.to_string(),
            is_playing: false,
            volume: DEFAULT_TRACK_VOLUME,
        })
        .collect()
}

impl MixerState {
    /// Fresh state for a session, seeded with whatever was persisted.
    pub fn initial(theme: Option<Theme>, saved_mixes: Vec<SavedMix>) -> Self {
        Self {
            sounds: default_sounds(),
            master_volume: DEFAULT_MASTER_VOLUME,
            theme: theme.unwrap_or_default(),
            timer: None,
            saved_mixes,
            paused_sound_ids: Vec::new(),
        }
    }

    pub fn sound(&self, id: &str) -> Option<&SoundState> {
        self.sounds.iter().find(|s| s.id == id)
    }

    fn sound_mut(&mut self, id: &str) -> Option<&mut SoundState> {
        self.sounds.iter_mut().find(|s| s.id == id)
    }

    pub fn playing_ids(&self) -> Vec<String> {
        self.sounds
            .iter()
            .filter(|s| s.is_playing)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Push the mirrored master and track volumes into `engine`. Used after
    /// tracks are (re)loaded, since a fresh entry starts at the default
    /// volume whatever the user chose before the audio graph existed.
    pub fn apply_volumes<B: AudioBackend + 'static>(&self, engine: &PlaybackEngine<B>) {
        engine.set_master_volume(self.master_volume);
        for s in &self.sounds {
            engine.set_track_volume(&s.id, s.volume);
        }
    }

    fn stop_every_sound(&mut self) {
        for s in self.sounds.iter_mut() {
            s.is_playing = false;
        }
    }
}

pub fn reduce(mut state: MixerState, action: Action) -> MixerState {
    match action {
        Action::PlaySound { id } => {
            if let Some(s) = state.sound_mut(&id) {
                s.is_playing = true;
            }
            // A manual change invalidates what master resume would restore
            state.paused_sound_ids.clear();
        }
        Action::PauseSound { id } => {
            if let Some(s) = state.sound_mut(&id) {
                s.is_playing = false;
            }
            state.paused_sound_ids.clear();
        }
        Action::SetVolume { id, volume } => {
            if let Some(s) = state.sound_mut(&id) {
                s.volume = volume;
            }
        }
        Action::SetMasterVolume { volume } => state.master_volume = volume,
        Action::ToggleTheme => state.theme = state.theme.toggled(),
        Action::SetTheme { theme } => state.theme = theme,
        Action::StartTimer { duration_ms } => {
            state.timer = Some(TimerState {
                duration_ms,
                remaining_ms: duration_ms,
                is_active: true,
            });
        }
        Action::UpdateTimer { remaining_ms } => {
            if let Some(timer) = state.timer.as_mut() {
                timer.remaining_ms = remaining_ms;
            }
        }
        Action::CancelTimer => state.timer = None,
        Action::TimerExpired => {
            state.stop_every_sound();
            state.timer = None;
        }
        Action::SaveMix { name, now_ms } => {
            let sounds = state
                .sounds
                .iter()
                .filter(|s| s.is_playing || s.volume != DEFAULT_TRACK_VOLUME)
                .map(|s| MixSound {
                    id: s.id.clone(),
                    volume: s.volume,
                })
                .collect();
            state.saved_mixes.push(SavedMix {
                id: SavedMix::id_for_timestamp(now_ms),
                name,
                sounds,
                created_at: now_ms,
            });
        }
        Action::LoadMix { mix_id } => {
            let mix = state.saved_mixes.iter().find(|m| m.id == mix_id).cloned();
            let Some(mix) = mix else {
                return state;
            };
            for s in state.sounds.iter_mut() {
                s.is_playing = false;
                s.volume = DEFAULT_TRACK_VOLUME;
            }
            for entry in &mix.sounds {
                if let Some(s) = state.sound_mut(&entry.id) {
                    s.volume = entry.volume;
                }
            }
        }
        Action::DeleteMix { mix_id } => state.saved_mixes.retain(|m| m.id != mix_id),
        Action::MasterPause => {
            state.paused_sound_ids = state.playing_ids();
            state.stop_every_sound();
        }
        Action::MasterResume => {
            let ids = std::mem::take(&mut state.paused_sound_ids);
            for id in &ids {
                if let Some(s) = state.sound_mut(id) {
                    s.is_playing = true;
                }
            }
        }
        Action::Reset => {
            state.sounds = default_sounds();
            state.master_volume = DEFAULT_MASTER_VOLUME;
            state.timer = None;
            state.paused_sound_ids.clear();
        }
        Action::StopAll => {
            state.stop_every_sound();
            state.timer = None;
            state.paused_sound_ids.clear();
        }
    }
    state
}
