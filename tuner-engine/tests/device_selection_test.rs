use tuner_engine::audio::device::AudioDevice;
use tuner_engine::audio::selection::{
    record_selection, select_microphone, EnvironmentKey, MemorySelectionStore, MicSelectionState,
    SelectionStore, DEFAULT_MAX_RECENT,
};

fn device(id: &str) -> AudioDevice {
    AudioDevice {
        device_id: id.to_string(),
        label: format!("Microphone {id}"),
        is_default: false,
    }
}

#[test]
fn test_environment_match_outranks_recency() {
    let available = vec![device("a"), device("b")];
    let key = EnvironmentKey::from_devices(&available);

    let mut state = MicSelectionState::new();
    state
        .environment_selections
        .insert(key.as_str().to_string(), "a".to_string());
    state.recent_selections = vec!["b".to_string()];

    assert_eq!(
        select_microphone(&available, &state, None),
        Some("a".to_string())
    );
}

#[test]
fn test_recency_without_environment_record() {
    let available = vec![device("a"), device("b")];
    let mut state = MicSelectionState::new();
    state.recent_selections = vec!["b".to_string(), "a".to_string()];

    assert_eq!(
        select_microphone(&available, &state, None),
        Some("b".to_string())
    );
}

#[test]
fn test_unavailable_recents_are_skipped() {
    let available = vec![device("a")];
    let mut state = MicSelectionState::new();
    state.recent_selections = vec!["gone-1".to_string(), "gone-2".to_string(), "a".to_string()];

    assert_eq!(
        select_microphone(&available, &state, None),
        Some("a".to_string())
    );
}

#[test]
fn test_fallback_when_no_history_applies() {
    let available = vec![device("a"), device("b"), device("c")];
    let state = MicSelectionState::new();

    assert_eq!(
        select_microphone(&available, &state, Some("c")),
        Some("c".to_string())
    );
}

#[test]
fn test_first_available_as_last_resort() {
    let available = vec![device("x"), device("y")];
    let mut state = MicSelectionState::new();
    state.recent_selections = vec!["unplugged".to_string()];

    assert_eq!(
        select_microphone(&available, &state, Some("also-unplugged")),
        Some("x".to_string())
    );
}

#[test]
fn test_no_devices_yields_none() {
    let state = MicSelectionState::new();
    assert_eq!(select_microphone(&[], &state, Some("a")), None);
}

#[test]
fn test_environment_key_ignores_order() {
    let forward = vec![device("a"), device("b"), device("c")];
    let reversed = vec![device("c"), device("b"), device("a")];

    assert_eq!(
        EnvironmentKey::from_devices(&forward),
        EnvironmentKey::from_devices(&reversed)
    );
}

#[test]
fn test_selection_round_trip_through_store() {
    // Simulates two app runs sharing one persistence boundary
    let store = MemorySelectionStore::new();
    let available = vec![device("a"), device("b")];

    // First run: the user picks "b"
    let state = store.load().unwrap();
    let state = record_selection(&state, &available, "b", DEFAULT_MAX_RECENT);
    store.save(&state).unwrap();

    // Second run: the heuristic finds "b" again for the same environment
    let state = store.load().unwrap();
    assert_eq!(
        select_microphone(&available, &state, Some("a")),
        Some("b".to_string())
    );
}

#[test]
fn test_environment_record_survives_device_set_change() {
    let desk_setup = vec![device("internal"), device("usb")];
    let laptop_only = vec![device("internal")];

    let state = MicSelectionState::new();
    let state = record_selection(&state, &desk_setup, "usb", DEFAULT_MAX_RECENT);

    // Different environment: "usb" is gone, recency falls back... but the
    // recent list still prefers it only when available
    assert_eq!(
        select_microphone(&laptop_only, &state, None),
        Some("internal".to_string())
    );

    // Back at the desk the environment record wins again
    assert_eq!(
        select_microphone(&desk_setup, &state, Some("internal")),
        Some("usb".to_string())
    );
}

#[test]
fn test_recent_list_bounded_and_deduplicated() {
    let available: Vec<AudioDevice> = (0..20).map(|i| device(&format!("mic-{i}"))).collect();

    let mut state = MicSelectionState::new();
    for i in 0..20 {
        state = record_selection(&state, &available, &format!("mic-{i}"), DEFAULT_MAX_RECENT);
    }
    // Re-select an existing entry; it moves to the front without growing
    state = record_selection(&state, &available, "mic-15", DEFAULT_MAX_RECENT);

    assert_eq!(state.recent_selections.len(), DEFAULT_MAX_RECENT);
    assert_eq!(state.recent_selections[0], "mic-15");
    let unique: std::collections::HashSet<_> = state.recent_selections.iter().collect();
    assert_eq!(unique.len(), state.recent_selections.len());
}

#[test]
fn test_state_is_json_serializable() {
    let available = vec![device("a")];
    let state = record_selection(&MicSelectionState::new(), &available, "a", DEFAULT_MAX_RECENT);

    let json = serde_json::to_string(&state).unwrap();
    let restored: MicSelectionState = serde_json::from_str(&json).unwrap();
    assert_eq!(state, restored);

    // Unknown/missing fields fall back to defaults
    let restored: MicSelectionState = serde_json::from_str("{}").unwrap();
    assert_eq!(restored, MicSelectionState::new());
}
