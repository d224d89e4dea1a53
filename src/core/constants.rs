/// Mixer defaults and persistence keys.
///
/// Named here so the engine, the state mirror and the web layer agree on the
/// same numbers without repeating magic values.
// Volume defaults
pub const DEFAULT_TRACK_VOLUME: f32 = 0.5; // applied to every freshly loaded track
pub const DEFAULT_MASTER_VOLUME: f32 = 0.7; // what the app shows and applies at startup
pub const ENGINE_INITIAL_MASTER_VOLUME: f32 = 1.0; // master gain before the app applies its default
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 1.0;

// Sleep timer durations (milliseconds)
pub const TIMER_FIFTEEN_MIN_MS: u64 = 15 * 60 * 1000;
pub const TIMER_THIRTY_MIN_MS: u64 = 30 * 60 * 1000;
pub const TIMER_ONE_HOUR_MS: u64 = 60 * 60 * 1000;
pub const TIMER_TWO_HOURS_MS: u64 = 2 * 60 * 60 * 1000;

// Timer choices offered to the user, in display order
pub const TIMER_OPTIONS: [(&str, u64); 4] = [
    ("15 min", TIMER_FIFTEEN_MIN_MS),
    ("30 min", TIMER_THIRTY_MIN_MS),
    ("1 hr", TIMER_ONE_HOUR_MS),
    ("2 hr", TIMER_TWO_HOURS_MS),
];

// localStorage keys
pub const STORAGE_KEY_THEME: &str = "nuvio-theme";
pub const STORAGE_KEY_SAVED_MIXES: &str = "nuvio-saved-mixes";
pub const STORAGE_KEY_LAST_STATE: &str = "nuvio-last-state";

/// Clamp a requested gain into `[MIN_VOLUME, MAX_VOLUME]`.
///
/// NaN maps to silence so a bad slider value can never reach a gain node.
#[inline]
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return MIN_VOLUME;
    }
    volume.clamp(MIN_VOLUME, MAX_VOLUME)
}
