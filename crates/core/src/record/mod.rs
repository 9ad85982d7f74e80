use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{config::CHANNELS, source::frames_to_seconds, Result};

/// Where and at which rate mixed output is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_path: PathBuf,
    pub sample_rate: u32,
}

impl RecordingSettings {
    pub fn new(output_path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            output_path: output_path.into(),
            sample_rate,
        }
    }
}

/// Streams interleaved stereo `i16` periods into a WAV file.
pub struct Recorder {
    settings: RecordingSettings,
    writer: hound::WavWriter<BufWriter<File>>,
    samples_written: usize,
}

impl Recorder {
    pub fn create(settings: RecordingSettings) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: CHANNELS as u16,
            sample_rate: settings.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&settings.output_path, spec)?;
        Ok(Self {
            settings,
            writer,
            samples_written: 0,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.settings.output_path
    }

    pub fn write(&mut self, samples: &[i16]) -> Result<()> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += samples.len();
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.samples_written / CHANNELS
    }

    /// Flushes the header and closes the file. Returns the recorded length
    /// in seconds.
    pub fn finalize(self) -> Result<f32> {
        let seconds = frames_to_seconds(self.frames_written(), self.settings.sample_rate);
        self.writer.finalize()?;
        tracing::info!(
            path = %self.settings.output_path.display(),
            seconds,
            "recording finalized"
        );
        Ok(seconds)
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("settings", &self.settings)
            .field("samples_written", &self.samples_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{loader::WavLoader, SourceLoader};

    #[test]
    fn recorded_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mix.wav");

        let mut recorder = Recorder::create(RecordingSettings::new(&path, 44_100)).unwrap();
        recorder.write(&[1, 2, 3, 4]).unwrap();
        recorder.write(&[-5, -6]).unwrap();
        assert_eq!(recorder.frames_written(), 3);
        assert_eq!(recorder.output_path(), path.as_path());
        recorder.finalize().unwrap();

        let source = WavLoader::new(44_100).load(path.to_str().unwrap()).unwrap();
        assert_eq!(source.samples(), &[1, 2, 3, 4, -5, -6]);
    }
}
