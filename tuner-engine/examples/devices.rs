//! Device selection demo
//!
//! Lists input devices and shows what the selection heuristic would pick
//! for the current environment, before and after recording a choice.
//!
//! Run: cargo run --example devices

use tuner_engine::audio::selection::{
    record_selection, select_microphone, MemorySelectionStore, SelectionStore, DEFAULT_MAX_RECENT,
};

fn main() -> anyhow::Result<()> {
    tuner_engine::utils::logging::init_logging();

    let devices = tuner_engine::audio::list_input_devices()?;
    println!("=== available input devices ===");
    for device in &devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}{}", device.device_id, marker);
    }

    let store = MemorySelectionStore::new();
    let state = store.load()?;

    let fallback = devices
        .iter()
        .find(|d| d.is_default)
        .map(|d| d.device_id.clone());

    let chosen = select_microphone(&devices, &state, fallback.as_deref());
    println!("\nheuristic picks: {:?}", chosen);

    // Record the last device as the user's choice and ask again
    if let Some(last) = devices.last() {
        let state = record_selection(&state, &devices, &last.device_id, DEFAULT_MAX_RECENT);
        store.save(&state)?;

        let state = store.load()?;
        let chosen = select_microphone(&devices, &state, fallback.as_deref());
        println!("after choosing '{}': {:?}", last.device_id, chosen);
    }

    Ok(())
}
