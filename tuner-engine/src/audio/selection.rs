//! Microphone auto-selection
//!
//! Pure functions that decide which input device to select given the current
//! device set and the user's selection history. The history itself is owned
//! by whoever implements [`SelectionStore`]; every update here returns a new
//! [`MicSelectionState`] value instead of mutating the old one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::device::AudioDevice;

/// Default cap on the recent-selection list
pub const DEFAULT_MAX_RECENT: usize = 10;

/// Canonical identifier for a set of available devices
///
/// Two device lists with the same members produce the same key regardless of
/// enumeration order, so a selection recorded for "laptop mic + USB
/// interface" is found again whenever exactly those devices are present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentKey(String);

impl EnvironmentKey {
    /// Build the key for a set of device ids (sort + serialize)
    pub fn from_device_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        sorted.sort_unstable();
        Self(sorted.join("|"))
    }

    /// Build the key for an enumerated device list
    pub fn from_devices(devices: &[AudioDevice]) -> Self {
        Self::from_device_ids(devices.iter().map(|d| d.device_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Persisted microphone selection history
///
/// JSON-serializable: a string-to-string map of environment keys to device
/// ids, plus a most-recent-first device id list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicSelectionState {
    /// Device chosen the last time each environment (device set) was seen
    pub environment_selections: HashMap<String, String>,
    /// Recently chosen device ids, most recent first, deduplicated
    pub recent_selections: Vec<String>,
}

impl MicSelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded selection for an environment, if any
    pub fn selection_for(&self, key: &EnvironmentKey) -> Option<&str> {
        self.environment_selections.get(key.as_str()).map(String::as_str)
    }
}

/// Choose which microphone to use from the available devices
///
/// Priority order:
/// 1. the selection recorded for the current environment, if still available
/// 2. the most recent previous selection that is available
/// 3. `fallback` (typically the platform default device), if available
/// 4. the first available device
///
/// Returns `None` only when `available` is empty.
///
/// # Example
/// ```
/// use tuner_engine::audio::device::AudioDevice;
/// use tuner_engine::audio::selection::{select_microphone, MicSelectionState};
///
/// let available = vec![AudioDevice {
///     device_id: "usb-mic".into(),
///     label: "USB Microphone".into(),
///     is_default: false,
/// }];
/// let state = MicSelectionState::new();
/// assert_eq!(
///     select_microphone(&available, &state, None),
///     Some("usb-mic".to_string())
/// );
/// ```
pub fn select_microphone(
    available: &[AudioDevice],
    state: &MicSelectionState,
    fallback: Option<&str>,
) -> Option<String> {
    if available.is_empty() {
        return None;
    }

    let is_available = |id: &str| available.iter().any(|d| d.device_id == id);

    let key = EnvironmentKey::from_devices(available);
    if let Some(recorded) = state.selection_for(&key) {
        if is_available(recorded) {
            return Some(recorded.to_string());
        }
    }

    if let Some(recent) = state
        .recent_selections
        .iter()
        .find(|id| is_available(id))
    {
        return Some(recent.clone());
    }

    if let Some(fallback) = fallback {
        if is_available(fallback) {
            return Some(fallback.to_string());
        }
    }

    Some(available[0].device_id.clone())
}

/// Record a microphone selection, returning the updated state
///
/// The current environment's entry is set to `selected`, and `selected`
/// moves to the front of the recent list (any prior occurrence removed,
/// list truncated to `max_recent`). The input state is left untouched.
pub fn record_selection(
    state: &MicSelectionState,
    available: &[AudioDevice],
    selected: &str,
    max_recent: usize,
) -> MicSelectionState {
    let mut next = state.clone();

    let key = EnvironmentKey::from_devices(available);
    next.environment_selections
        .insert(key.as_str().to_string(), selected.to_string());

    next.recent_selections.retain(|id| id != selected);
    next.recent_selections.insert(0, selected.to_string());
    next.recent_selections.truncate(max_recent);

    next
}

/// Selection persistence errors
#[derive(Error, Debug)]
pub enum SelectionStoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Injected persistence boundary for [`MicSelectionState`]
///
/// The engine never writes selection history itself; the embedding
/// application decides where it lives (settings file, browser storage, ...).
pub trait SelectionStore {
    /// Load the persisted state, or a default when nothing is stored yet
    fn load(&self) -> Result<MicSelectionState, SelectionStoreError>;

    /// Persist the given state
    fn save(&self, state: &MicSelectionState) -> Result<(), SelectionStoreError>;
}

/// In-memory [`SelectionStore`], mainly for tests and demos
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    state: parking_lot::Mutex<MicSelectionState>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemorySelectionStore {
    fn load(&self) -> Result<MicSelectionState, SelectionStoreError> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &MicSelectionState) -> Result<(), SelectionStoreError> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> AudioDevice {
        AudioDevice {
            device_id: id.to_string(),
            label: id.to_string(),
            is_default: false,
        }
    }

    #[test]
    fn test_environment_key_order_independent() {
        let a = EnvironmentKey::from_device_ids(["mic-a", "mic-b", "mic-c"]);
        let b = EnvironmentKey::from_device_ids(["mic-c", "mic-a", "mic-b"]);
        assert_eq!(a, b);

        let c = EnvironmentKey::from_device_ids(["mic-a", "mic-b"]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_environment_selection_outranks_recency() {
        let available = vec![device("a"), device("b")];
        let key = EnvironmentKey::from_devices(&available);

        let mut state = MicSelectionState::new();
        state
            .environment_selections
            .insert(key.as_str().to_string(), "a".to_string());
        state.recent_selections = vec!["b".to_string()];

        assert_eq!(select_microphone(&available, &state, None), Some("a".to_string()));
    }

    #[test]
    fn test_recency_order_respected() {
        let available = vec![device("a"), device("b")];
        let mut state = MicSelectionState::new();
        state.recent_selections = vec!["b".to_string(), "a".to_string()];

        assert_eq!(select_microphone(&available, &state, None), Some("b".to_string()));
    }

    #[test]
    fn test_fallback_and_first_available() {
        let available = vec![device("a"), device("b")];
        let state = MicSelectionState::new();

        assert_eq!(
            select_microphone(&available, &state, Some("b")),
            Some("b".to_string())
        );
        // Fallback not available -> first device
        assert_eq!(
            select_microphone(&available, &state, Some("missing")),
            Some("a".to_string())
        );
        assert_eq!(select_microphone(&available, &state, None), Some("a".to_string()));
    }

    #[test]
    fn test_empty_available_returns_none() {
        let state = MicSelectionState::new();
        assert_eq!(select_microphone(&[], &state, Some("a")), None);
    }

    #[test]
    fn test_stale_environment_selection_is_skipped() {
        let available = vec![device("a"), device("b")];
        let key = EnvironmentKey::from_devices(&available);

        let mut state = MicSelectionState::new();
        state
            .environment_selections
            .insert(key.as_str().to_string(), "unplugged".to_string());
        state.recent_selections = vec!["b".to_string()];

        assert_eq!(select_microphone(&available, &state, None), Some("b".to_string()));
    }

    #[test]
    fn test_record_selection_is_pure() {
        let available = vec![device("a"), device("b")];
        let state = MicSelectionState::new();

        let next = record_selection(&state, &available, "b", DEFAULT_MAX_RECENT);

        assert!(state.environment_selections.is_empty());
        assert!(state.recent_selections.is_empty());

        let key = EnvironmentKey::from_devices(&available);
        assert_eq!(next.selection_for(&key), Some("b"));
        assert_eq!(next.recent_selections, vec!["b".to_string()]);
    }

    #[test]
    fn test_record_selection_dedupes_and_truncates() {
        let available = vec![device("a"), device("b")];
        let mut state = MicSelectionState::new();
        state.recent_selections = vec!["a".to_string(), "b".to_string()];

        let next = record_selection(&state, &available, "b", DEFAULT_MAX_RECENT);
        assert_eq!(next.recent_selections, vec!["b".to_string(), "a".to_string()]);

        // Cap enforcement
        let mut state = MicSelectionState::new();
        state.recent_selections = (0..DEFAULT_MAX_RECENT).map(|i| format!("mic-{i}")).collect();

        let next = record_selection(&state, &available, "new", DEFAULT_MAX_RECENT);
        assert_eq!(next.recent_selections.len(), DEFAULT_MAX_RECENT);
        assert_eq!(next.recent_selections[0], "new");
    }

    #[test]
    fn test_state_json_round_trip() {
        let available = vec![device("a")];
        let state = record_selection(&MicSelectionState::new(), &available, "a", 10);

        let json = serde_json::to_string(&state).unwrap();
        let restored: MicSelectionState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySelectionStore::new();
        assert_eq!(store.load().unwrap(), MicSelectionState::new());

        let available = vec![device("a")];
        let state = record_selection(&MicSelectionState::new(), &available, "a", 10);
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }
}
