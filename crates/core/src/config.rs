//! Runtime configuration.
//!
//! Every field has a default so an empty (or absent) TOML file yields a
//! working configuration. Thresholds that have no derivation beyond "works on
//! typical lecture recordings" live here rather than as constants so they can
//! be tuned per deployment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PodiumError, Result};
use crate::provider::Provider;
use crate::types::MAX_RECOMMENDATIONS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub vision: VisionConfig,
    pub audio: AudioConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for each extractor call (seconds)
    pub extractor_timeout_secs: u64,
    /// Run vision and audio extraction concurrently
    pub parallel_extraction: bool,
    pub max_recommendations: usize,
    pub max_ai_recommendations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Process every n-th decoded frame
    pub sample_every_n_frames: u32,
    /// Hand-center displacement (unit square) counted as a gesture
    pub gesture_threshold: f64,
    /// Hand-center displacement (unit square) counted as fidgeting
    pub fidget_threshold: f64,
    /// Face-direction delta counted as a head turn
    pub face_direction_threshold: f64,
    /// Landmark sidecar command line; vision degrades when unset
    pub detector_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Spoken language (ISO 639-1), selects filler lexicon and whisper language
    pub language: String,
    pub whisper_model: String,
    /// Explicit ggml model file; defaults to the cache directory
    pub model_path: Option<PathBuf>,
    pub sample_rate: u32,
    pub min_pause_secs: f64,
    /// Frames quieter than this many dB below peak count as silence
    pub silence_top_db: f64,
    pub pitch_floor_hz: f64,
    pub pitch_ceiling_hz: f64,
    pub min_pitch_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Language of stop words and interaction markers
    pub language: String,
    /// Generative backend; `None` runs local heuristics only
    pub provider: Option<Provider>,
    /// Skip the generative backend even when a provider is configured
    pub offline: bool,
    /// Override of the provider's endpoint (self-hosted gateways, tests)
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extractor_timeout_secs: 90,
            parallel_extraction: true,
            max_recommendations: 10,
            max_ai_recommendations: 3,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            sample_every_n_frames: 30,
            gesture_threshold: 0.1,
            fidget_threshold: 0.3,
            face_direction_threshold: 0.3,
            detector_command: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            whisper_model: "base".to_string(),
            model_path: None,
            sample_rate: 16_000,
            min_pause_secs: 0.5,
            silence_top_db: 20.0,
            pitch_floor_hz: 75.0,
            pitch_ceiling_hz: 600.0,
            min_pitch_samples: 10,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            provider: Some(Provider::Gemini),
            offline: false,
            api_url: None,
            model: None,
            temperature: 0.3,
        }
    }
}

impl ContentConfig {
    /// Provider to use, if any
    pub fn active_provider(&self) -> Option<Provider> {
        if self.offline { None } else { self.provider }
    }
}

impl EngineConfig {
    pub fn extractor_timeout(&self) -> Duration {
        Duration::from_secs(self.extractor_timeout_secs)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(reason: String) -> Result<()> {
            Err(PodiumError::InvalidConfig { reason })
        }

        if self.engine.extractor_timeout_secs == 0 {
            return invalid("engine.extractor_timeout_secs must be > 0".into());
        }
        if self.engine.max_recommendations > MAX_RECOMMENDATIONS {
            return invalid(format!(
                "engine.max_recommendations must be at most {}",
                MAX_RECOMMENDATIONS
            ));
        }
        if self.engine.max_ai_recommendations > self.engine.max_recommendations {
            return invalid(format!(
                "engine.max_ai_recommendations ({}) exceeds engine.max_recommendations ({})",
                self.engine.max_ai_recommendations, self.engine.max_recommendations
            ));
        }
        if self.vision.sample_every_n_frames == 0 {
            return invalid("vision.sample_every_n_frames must be > 0".into());
        }
        if !(self.vision.gesture_threshold > 0.0
            && self.vision.gesture_threshold < self.vision.fidget_threshold)
        {
            return invalid(format!(
                "vision thresholds must satisfy 0 < gesture ({}) < fidget ({})",
                self.vision.gesture_threshold, self.vision.fidget_threshold
            ));
        }
        if let Some(cmd) = &self.vision.detector_command
            && cmd.is_empty()
        {
            return invalid("vision.detector_command must not be empty".into());
        }
        if self.audio.sample_rate == 0 {
            return invalid("audio.sample_rate must be > 0".into());
        }
        if !(self.audio.pitch_floor_hz > 0.0 && self.audio.pitch_floor_hz < self.audio.pitch_ceiling_hz)
        {
            return invalid(format!(
                "audio pitch range must satisfy 0 < floor ({}) < ceiling ({})",
                self.audio.pitch_floor_hz, self.audio.pitch_ceiling_hz
            ));
        }
        if self.audio.pitch_ceiling_hz * 2.0 > self.audio.sample_rate as f64 {
            return invalid("audio.pitch_ceiling_hz must be below half the sample rate".into());
        }
        if self.audio.min_pause_secs < 0.0 || self.audio.silence_top_db <= 0.0 {
            return invalid("audio pause settings must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.extractor_timeout_secs, 90);
        assert_eq!(config.vision.sample_every_n_frames, 30);
        assert_eq!(config.audio.language, "en");
        assert_eq!(config.content.provider, Some(Provider::Gemini));
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [vision]
            gesture_threshold = 0.05
            detector_command = ["python3", "landmarks.py"]

            [content]
            provider = "grok"
            "#,
        )
        .unwrap();

        assert_eq!(config.vision.gesture_threshold, 0.05);
        assert_eq!(config.vision.fidget_threshold, 0.3);
        assert_eq!(config.content.provider, Some(Provider::Grok));
        config.validate().unwrap();
    }

    #[test]
    fn inverted_motion_thresholds_are_rejected() {
        let mut config = Config::default();
        config.vision.gesture_threshold = 0.4;
        assert!(matches!(
            config.validate(),
            Err(PodiumError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.engine.extractor_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
