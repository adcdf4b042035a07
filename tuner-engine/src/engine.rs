//! Top-level engine
//!
//! [`TunerEngine`] is the single owner of the analysis subsystem: it holds
//! the store, the capture manager, and the configuration, and exposes the
//! start/stop surface the application drives. Consumers read state through
//! the store's slices; nothing here is a process-wide singleton, so tests
//! and embedders can hold as many engines as they like.

use std::sync::Arc;

use tracing::info;

use crate::audio::capture::CaptureManager;
use crate::audio::device::{list_input_devices, AudioDevice};
use crate::audio::error::{CaptureError, CaptureResult};
use crate::audio::selection::{record_selection, select_microphone, MicSelectionState};
use crate::config::{ConfigResult, EngineConfig};
use crate::store::AnalysisStore;

/// Real-time tuner analysis engine
///
/// # Example
/// ```no_run
/// use tuner_engine::config::EngineConfig;
/// use tuner_engine::engine::TunerEngine;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let mut engine = TunerEngine::new(EngineConfig::default())?;
/// engine.start(None).await?;
///
/// let store = std::sync::Arc::clone(engine.store());
/// let _sub = store.subscribe_pitch(|snapshot| {
///     if let Some(frequency) = snapshot.current_pitch.frequency {
///         println!("{:.1} Hz", frequency);
///     }
/// });
///
/// // ... later
/// engine.stop();
/// # Ok(())
/// # }
/// ```
pub struct TunerEngine {
    config: EngineConfig,
    store: Arc<AnalysisStore>,
    manager: CaptureManager,
}

impl TunerEngine {
    /// Create an engine with a validated configuration
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` when a parameter is outside its
    /// documented range.
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;

        let store = Arc::new(AnalysisStore::new(&config.analysis));
        let manager = CaptureManager::new(Arc::clone(&store), config.clone());

        info!("tuner engine created");
        Ok(Self {
            config,
            store,
            manager,
        })
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The observable analysis store
    ///
    /// Clone the `Arc` to hand slices to UI code or collaborators.
    pub fn store(&self) -> &Arc<AnalysisStore> {
        &self.store
    }

    /// Start capturing, optionally on a specific device
    ///
    /// Starting while already active hot-swaps the device; see
    /// [`CaptureManager::start`] for the invariants.
    pub async fn start(&mut self, device_id: Option<&str>) -> CaptureResult<()> {
        self.manager.start(device_id).await
    }

    /// Pick a device with the selection heuristic and start on it
    ///
    /// Enumerates the current devices, applies the environment/recency
    /// priority against `state` with the platform default as fallback, and
    /// starts capture. Returns the chosen device id so the caller can
    /// record it via [`crate::audio::selection::record_selection`] and
    /// persist the updated state.
    pub async fn start_preferred(&mut self, state: &MicSelectionState) -> CaptureResult<String> {
        let devices = list_input_devices()?;
        let fallback = devices
            .iter()
            .find(|d| d.is_default)
            .map(|d| d.device_id.clone());

        let chosen = select_microphone(&devices, state, fallback.as_deref())
            .ok_or(CaptureError::DeviceNotFound)?;

        self.start(Some(&chosen)).await?;
        Ok(chosen)
    }

    /// Record a device choice, returning the updated selection state
    ///
    /// Applies the engine's configured recent-selection cap; the caller
    /// persists the result through its [`crate::audio::selection::SelectionStore`].
    pub fn record_device_selection(
        &self,
        state: &MicSelectionState,
        available: &[AudioDevice],
        selected: &str,
    ) -> MicSelectionState {
        record_selection(state, available, selected, self.config.selection.max_recent)
    }

    /// Stop capturing; synchronous and idempotent
    pub fn stop(&mut self) {
        self.manager.stop();
    }

    /// Whether a capture session is observably running
    pub fn is_active(&self) -> bool {
        self.store.is_active()
    }

    /// Device id of the running session, if any
    pub fn current_device(&self) -> Option<&str> {
        self.manager.current_device()
    }
}
