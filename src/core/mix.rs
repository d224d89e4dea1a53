//! Saved mixes and the JSON documents persisted alongside them.
//!
//! Parsing is forgiving: corrupted documents load as empty and malformed
//! entries are dropped, so a bad write never locks the user out of the rest
//! of their mixes.

use super::backend::AudioBackend;
use super::constants::DEFAULT_TRACK_VOLUME;
use super::engine::PlaybackEngine;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixSound {
    pub id: String,
    pub volume: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMix {
    pub id: String,
    pub name: String,
    pub sounds: Vec<MixSound>,
    pub created_at: u64,
}

impl SavedMix {
    pub fn id_for_timestamp(created_at: u64) -> String {
        format!("mix-{}", created_at)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse the stored form. Anything but `light` or `dark` is rejected.
    pub fn parse(raw: &str) -> Option<Theme> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Volumes and master level remembered between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastState {
    pub master_volume: f32,
    pub sound_states: Vec<MixSound>,
}

#[derive(Serialize)]
struct SavedMixesDocument<'a> {
    mixes: &'a [SavedMix],
}

pub fn serialize_saved_mixes(mixes: &[SavedMix]) -> serde_json::Result<String> {
    serde_json::to_string(&SavedMixesDocument { mixes })
}

pub fn parse_saved_mixes(raw: &str) -> Vec<SavedMix> {
    let doc: serde_json::Value = match serde_json::from_str(raw) {
        Ok(doc) => doc,
        Err(e) => {
            log::error!("[mix] saved mixes are not valid JSON: {}", e);
            return Vec::new();
        }
    };
    let Some(entries) = doc.get("mixes").and_then(|m| m.as_array()) else {
        log::warn!("[mix] saved mixes document has no mix list");
        return Vec::new();
    };
    let mixes: Vec<SavedMix> = entries
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect();
    if mixes.len() != entries.len() {
        log::warn!(
            "[mix] dropped {} malformed saved mixes",
            entries.len() - mixes.len()
        );
    }
    mixes
}

pub fn serialize_last_state(state: &LastState) -> serde_json::Result<String> {
    serde_json::to_string(state)
}

pub fn parse_last_state(raw: &str) -> Option<LastState> {
    match serde_json::from_str(raw) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("[mix] ignoring invalid last state: {}", e);
            None
        }
    }
}

/// Apply a saved mix: everything stops, tracks the mix does not list return
/// to the default volume, and each listed track takes the stored volume.
/// Playback is left for the user to start.
pub fn apply_mix<B: AudioBackend + 'static>(engine: &PlaybackEngine<B>, mix: &SavedMix) {
    engine.stop_all_tracks();
    for id in engine.track_ids() {
        engine.set_track_volume(&id, DEFAULT_TRACK_VOLUME);
    }
    for sound in &mix.sounds {
        engine.set_track_volume(&sound.id, sound.volume);
    }
    log::info!("[mix] applied \"{}\" ({} sounds)", mix.name, mix.sounds.len());
}
