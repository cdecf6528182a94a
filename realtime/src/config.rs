use std::sync::Arc;

use bleep_core::resources::SynthResources;
use bleep_core::AudioStreamParams;

/// Configuration for a queue-fronted synthesizer.
pub struct RealtimeSynthConfig {
    pub audio_params: AudioStreamParams,
    pub resources: Option<Arc<dyn SynthResources>>,
}

impl Default for RealtimeSynthConfig {
    fn default() -> Self {
        Self {
            audio_params: AudioStreamParams::new(44100, 2),
            resources: None,
        }
    }
}
