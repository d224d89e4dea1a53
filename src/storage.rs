//! `localStorage` persistence for theme, saved mixes and the last session.

use crate::core::constants::{STORAGE_KEY_LAST_STATE, STORAGE_KEY_SAVED_MIXES, STORAGE_KEY_THEME};
use crate::core::mix::{self, LastState, SavedMix, Theme};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("localStorage is not available")]
    Unavailable,
    #[error("Storage quota exceeded. Please delete some saved mixes.")]
    QuotaExceeded,
    #[error("failed to encode stored data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Js(String),
}

impl From<JsValue> for StorageError {
    fn from(e: JsValue) -> Self {
        let quota = e
            .dyn_ref::<web::DomException>()
            .map(|d| d.name() == "QuotaExceededError")
            .unwrap_or(false);
        if quota {
            StorageError::QuotaExceeded
        } else {
            StorageError::Js(format!("{:?}", e))
        }
    }
}

fn local_storage() -> Result<web::Storage, StorageError> {
    web::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or(StorageError::Unavailable)
}

fn read(key: &str) -> Option<String> {
    match local_storage().and_then(|s| s.get_item(key).map_err(StorageError::from)) {
        Ok(value) => value,
        Err(e) => {
            log::error!("[storage] failed to read {}: {}", key, e);
            None
        }
    }
}

fn write(key: &str, value: &str) -> Result<(), StorageError> {
    local_storage()?.set_item(key, value)?;
    Ok(())
}

pub fn is_available() -> bool {
    const PROBE: &str = "__storage_test__";
    local_storage()
        .and_then(|s| {
            s.set_item(PROBE, PROBE)?;
            s.remove_item(PROBE)?;
            Ok(())
        })
        .is_ok()
}

pub fn save_theme(theme: Theme) {
    if let Err(e) = write(STORAGE_KEY_THEME, theme.as_str()) {
        log::error!("[storage] failed to save theme: {}", e);
    }
}

pub fn load_theme() -> Option<Theme> {
    read(STORAGE_KEY_THEME).and_then(|raw| Theme::parse(&raw))
}

pub fn save_mixes(mixes: &[SavedMix]) -> Result<(), StorageError> {
    let json = mix::serialize_saved_mixes(mixes)?;
    write(STORAGE_KEY_SAVED_MIXES, &json).map_err(|e| {
        log::error!("[storage] failed to save mixes: {}", e);
        e
    })
}

pub fn load_mixes() -> Vec<SavedMix> {
    read(STORAGE_KEY_SAVED_MIXES)
        .map(|raw| mix::parse_saved_mixes(&raw))
        .unwrap_or_default()
}

pub fn save_last_state(state: &LastState) {
    let result = mix::serialize_last_state(state)
        .map_err(StorageError::from)
        .and_then(|json| write(STORAGE_KEY_LAST_STATE, &json));
    if let Err(e) = result {
        log::error!("[storage] failed to save last state: {}", e);
    }
}

pub fn load_last_state() -> Option<LastState> {
    read(STORAGE_KEY_LAST_STATE).and_then(|raw| mix::parse_last_state(&raw))
}

pub fn clear_all() {
    if let Ok(s) = local_storage() {
        for key in [STORAGE_KEY_THEME, STORAGE_KEY_SAVED_MIXES, STORAGE_KEY_LAST_STATE] {
            _ = s.remove_item(key);
        }
    }
}
