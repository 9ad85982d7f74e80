use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{MixerError, Result};

/// Interleaved channels of every source and of the mixed output.
pub const CHANNELS: usize = 2;

/// Largest magnitude used when converting between `i16` and float samples.
///
/// The clamp is symmetric, so `i16::MIN` is never produced by the mixer.
pub const SAMPLE_MAX: i16 = i16::MAX;

/// Bytes per interleaved sample in the device buffer.
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<i16>();

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mixer: MixerConfig,
}

impl AppConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.mixer.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(?path, ?config, "loaded configuration");
        Ok(config)
    }
}

/// Configuration specific to the mixing engine.
///
/// Everything here is fixed once a [`crate::Mixer`] is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Sample rate every source must be recorded at.
    pub sample_rate: u32,
    /// Number of stream slots in the pool.
    pub max_streams: usize,
    /// Capacity of the float accumulation buffer, in stereo frames.
    pub max_buffer_frames: usize,
    /// Frames requested per callback by the offline device.
    pub device_buffer_frames: usize,
    pub master_gain_left: f32,
    pub master_gain_right: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            max_streams: 16,
            max_buffer_frames: 2048,
            device_buffer_frames: 1024,
            master_gain_left: 1.0,
            master_gain_right: 1.0,
        }
    }
}

impl MixerConfig {
    /// Largest number of interleaved samples one callback may request.
    pub fn max_buffer_samples(&self) -> usize {
        self.max_buffer_frames * CHANNELS
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(MixerError::InvalidConfig("sample rate must be positive"));
        }
        if self.max_streams == 0 {
            return Err(MixerError::InvalidConfig("pool needs at least one stream"));
        }
        if self.max_buffer_frames == 0 {
            return Err(MixerError::InvalidConfig("mix buffer must hold a frame"));
        }
        if self.device_buffer_frames == 0 || self.device_buffer_frames > self.max_buffer_frames {
            return Err(MixerError::InvalidConfig(
                "device buffer must be between one frame and the mix buffer size",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.mixer.validate().is_ok());
        assert_eq!(config.mixer.max_buffer_samples(), 4096);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = AppConfig::from_json_str(r#"{ "mixer": { "max_streams": 4 } }"#).unwrap();
        assert_eq!(config.mixer.max_streams, 4);
        assert_eq!(config.mixer.sample_rate, 44_100);
    }

    #[test]
    fn rejects_oversized_device_buffer() {
        let err = AppConfig::from_json_str(
            r#"{ "mixer": { "max_buffer_frames": 256, "device_buffer_frames": 512 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, MixerError::InvalidConfig(_)));
    }

    #[test]
    fn reads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixer.json");
        std::fs::write(&path, r#"{ "mixer": { "sample_rate": 22050 } }"#).unwrap();

        let config = AppConfig::from_path(&path).unwrap();
        assert_eq!(config.mixer.sample_rate, 22_050);
    }
}
