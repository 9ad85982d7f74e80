use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{
    config::{BYTES_PER_SAMPLE, CHANNELS},
    MixerError, Result, Source,
};

/// Collaborator that turns an identifier into a fully resident [`Source`].
///
/// Implementations must reject anything that does not match the engine's
/// fixed format; the mixer never converts rates or channel layouts.
pub trait SourceLoader {
    fn load(&self, identifier: &str) -> Result<Source>;
}

/// Loads 16-bit stereo PCM WAV files recorded at the engine sample rate.
#[derive(Debug, Clone, Copy)]
pub struct WavLoader {
    sample_rate: u32,
}

impl WavLoader {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decodes WAV data from any reader, validating the format first.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Source> {
        let reader = hound::WavReader::new(reader)?;
        let spec = reader.spec();

        if spec.sample_rate != self.sample_rate {
            return Err(MixerError::FormatMismatch {
                what: "sample rate",
                expected: self.sample_rate,
                found: spec.sample_rate,
            });
        }
        let expected_bits = (BYTES_PER_SAMPLE * 8) as u16;
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != expected_bits {
            return Err(MixerError::FormatMismatch {
                what: "integer bits per sample",
                expected: u32::from(expected_bits),
                found: u32::from(spec.bits_per_sample),
            });
        }
        if usize::from(spec.channels) != CHANNELS {
            return Err(MixerError::FormatMismatch {
                what: "channel count",
                expected: CHANNELS as u32,
                found: u32::from(spec.channels),
            });
        }

        let samples = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Source::from_samples(samples)
    }
}

impl SourceLoader for WavLoader {
    fn load(&self, identifier: &str) -> Result<Source> {
        let path = Path::new(identifier);
        let file = File::open(path)?;
        let source = self.load_reader(BufReader::new(file))?;

        tracing::info!(
            path = %path.display(),
            sample_rate = self.sample_rate,
            channels = CHANNELS,
            samples = source.len(),
            duration = source.duration_seconds(self.sample_rate),
            "loaded source"
        );
        Ok(source)
    }
}
