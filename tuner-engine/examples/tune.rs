//! Live tuner demo
//!
//! Captures from the default (or named) input device and prints the
//! detected pitch and level until interrupted.
//!
//! Run: cargo run --example tune [device-id]

use std::time::Duration;

use tuner_engine::config::EngineConfig;
use tuner_engine::engine::TunerEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tuner_engine::utils::logging::init_logging();

    let device_id = std::env::args().nth(1);

    println!("=== available input devices ===");
    let devices = tuner_engine::audio::list_input_devices()?;
    for (i, device) in devices.iter().enumerate() {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}: {}{}", i, device.label, marker);
    }
    println!();

    let mut engine = TunerEngine::new(EngineConfig::default())?;
    engine.start(device_id.as_deref()).await?;
    println!(
        "capturing from '{}' for 15 seconds...\n",
        engine.current_device().unwrap_or("unknown")
    );

    let store = std::sync::Arc::clone(engine.store());
    let _pitch_sub = store.subscribe_pitch(|snapshot| {
        if let Some(frequency) = snapshot.current_pitch.frequency {
            print!(
                "\rpitch: {:8.2} Hz   clarity: {:.2}   history: {:4} entries",
                frequency,
                snapshot.current_pitch.clarity,
                snapshot.pitch_history.len()
            );
        }
    });
    let _volume_sub = store.subscribe_volume(|level| {
        let bar_len = ((level.mono.db + 60.0) / 60.0 * 40.0).max(0.0) as usize;
        let bar: String = "#".repeat(bar_len.min(40));
        let mode = if level.is_stereo { "stereo" } else { "mono" };
        print!("\x1b[s\x1b[1B\rlevel: {:6.1} dB [{:40}] {}\x1b[u", level.mono.db, bar, mode);
    });

    tokio::time::sleep(Duration::from_secs(15)).await;

    engine.stop();
    println!("\n\ndone");
    Ok(())
}
