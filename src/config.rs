//! Configuration for the voice turn-taking pipeline.
//!
//! All sections use `#[serde(default)]` so a partial TOML file falls back to
//! defaults for anything it omits.

use serde::{Deserialize, Serialize};

/// Audio input format expected by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of incoming audio chunks in Hz.
    pub sample_rate: u32,
    /// Nominal duration of one audio chunk in milliseconds.
    pub frame_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_ms: 100,
        }
    }
}

/// Utterance endpointing parameters for the energy-based segmenter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// RMS energy below which a frame counts as silence.
    pub silence_energy_threshold: f32,
    /// Consecutive silent frames that end an utterance.
    pub silence_threshold_frames: u32,
    /// Minimum speech frames for a segment to count as an utterance.
    /// Shorter segments are discarded as noise.
    pub minimum_speech_frames: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            silence_energy_threshold: 0.05,
            silence_threshold_frames: 5,
            minimum_speech_frames: 3,
        }
    }
}

/// Feedback-guard timing around synthesized speech playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackGuardConfig {
    /// Time for the capture side to settle after playback ends, in ms.
    pub settle_ms: u64,
    /// Extra margin for residual echo to decay, in ms.
    pub echo_margin_ms: u64,
}

impl Default for FeedbackGuardConfig {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            echo_margin_ms: 200,
        }
    }
}

/// Response generation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Minimum interval between partial-response events, in ms.
    /// Streamed tokens arriving faster than this are coalesced.
    pub partial_interval_ms: u64,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            partial_interval_ms: 100,
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

/// Speaker diarization behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarizationConfig {
    /// Whether to run diarization on finalized speech segments.
    /// Ignored when no diarization component is configured.
    pub enabled: bool,
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Audio input format.
    pub audio: AudioConfig,
    /// Endpointing parameters.
    pub endpoint: EndpointConfig,
    /// Feedback-guard timing.
    pub guard: FeedbackGuardConfig,
    /// Response generation behavior.
    pub generation: GenerationConfig,
    /// Speaker diarization behavior.
    pub diarization: DiarizationConfig,
}

impl VoiceConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML for this schema.
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        toml::from_str(content).map_err(|e| crate::error::VoiceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot
    /// be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VoiceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Samples per audio frame at the configured rate.
    pub fn samples_per_frame(&self) -> usize {
        (self.audio.sample_rate as usize * self.audio.frame_ms as usize) / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = VoiceConfig::default();
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.audio.frame_ms, 100);
        assert!((config.endpoint.silence_energy_threshold - 0.05).abs() < f32::EPSILON);
        assert_eq!(config.endpoint.silence_threshold_frames, 5);
        assert_eq!(config.endpoint.minimum_speech_frames, 3);
        assert_eq!(config.guard.settle_ms, 300);
        assert_eq!(config.guard.echo_margin_ms, 200);
        assert_eq!(config.generation.partial_interval_ms, 100);
    }

    #[test]
    fn samples_per_frame_at_defaults() {
        let config = VoiceConfig::default();
        assert_eq!(config.samples_per_frame(), 1600);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = VoiceConfig::from_toml_str(
            r#"
            [endpoint]
            silence_threshold_frames = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint.silence_threshold_frames, 8);
        assert_eq!(config.endpoint.minimum_speech_frames, 3);
        assert_eq!(config.audio.sample_rate, 16_000);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voiceloop.toml");

        let mut config = VoiceConfig::default();
        config.endpoint.silence_energy_threshold = 0.08;
        config.endpoint.silence_threshold_frames = 7;
        config.endpoint.minimum_speech_frames = 4;
        config.guard.settle_ms = 250;

        config.save_to_file(&path).unwrap();
        let loaded = VoiceConfig::from_file(&path).unwrap();

        assert!((loaded.endpoint.silence_energy_threshold - 0.08).abs() < f32::EPSILON);
        assert_eq!(loaded.endpoint.silence_threshold_frames, 7);
        assert_eq!(loaded.endpoint.minimum_speech_frames, 4);
        assert_eq!(loaded.guard.settle_ms, 250);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = VoiceConfig::from_file(std::path::Path::new("/nonexistent/voiceloop.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn from_toml_str_invalid_returns_error() {
        assert!(VoiceConfig::from_toml_str("not valid toml {{{").is_err());
    }
}
