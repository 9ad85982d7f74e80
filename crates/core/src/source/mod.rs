use std::{f32::consts::TAU, fmt, sync::Arc};

use crate::{
    config::{CHANNELS, SAMPLE_MAX},
    MixerError, Result,
};

/// Fully resident, interleaved 16-bit PCM buffer.
///
/// Cloning is cheap: every clone shares the same immutable samples, so a
/// source stays alive for as long as any stream slot is bound to it.
#[derive(Clone, PartialEq, Eq)]
pub struct Source {
    samples: Arc<[i16]>,
}

impl Source {
    /// Wraps interleaved stereo samples (`L R L R ...`).
    ///
    /// The sample count must be a multiple of [`CHANNELS`] so that left and
    /// right are always read as a pair.
    pub fn from_samples(samples: impl Into<Arc<[i16]>>) -> Result<Self> {
        let samples = samples.into();
        if samples.len() % CHANNELS != 0 {
            return Err(MixerError::FormatMismatch {
                what: "interleaved sample count multiple of",
                expected: CHANNELS as u32,
                found: samples.len() as u32,
            });
        }
        Ok(Self { samples })
    }

    /// Generates a stereo sine tone with both channels in phase.
    pub fn sine(frequency: f32, seconds: f32, amplitude: f32, sample_rate: u32) -> Self {
        let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
        let mut samples = Vec::with_capacity(frames * CHANNELS);
        for n in 0..frames {
            let t = n as f32 / sample_rate as f32;
            let value = quantize(amplitude * (TAU * frequency * t).sin());
            samples.extend(std::iter::repeat(value).take(CHANNELS));
        }
        Self {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Total interleaved sample count.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn duration_seconds(&self, sample_rate: u32) -> f32 {
        frames_to_seconds(self.frames(), sample_rate)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("samples", &self.samples.len())
            .finish()
    }
}

/// Converts a PCM sample into the normalised float range.
#[inline]
pub fn to_float(sample: i16) -> f32 {
    sample as f32 / SAMPLE_MAX as f32
}

/// Converts a mixed float sample back to PCM, truncating toward zero and
/// clamping to `[-SAMPLE_MAX, SAMPLE_MAX]`.
#[inline]
pub fn quantize(value: f32) -> i16 {
    let max = SAMPLE_MAX as i32;
    // `as` saturates out-of-range floats and maps NaN to zero.
    let scaled = (value * SAMPLE_MAX as f32) as i32;
    scaled.clamp(-max, max) as i16
}

pub fn frames_to_seconds(frames: usize, sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f32 / sample_rate as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_odd_sample_counts() {
        let err = Source::from_samples(vec![1_i16, 2, 3]).unwrap_err();
        assert!(matches!(err, MixerError::FormatMismatch { .. }));
    }

    #[test]
    fn reports_frames_and_duration() {
        let source = Source::from_samples(vec![0_i16; 200]).unwrap();
        assert_eq!(source.len(), 200);
        assert_eq!(source.frames(), 100);
        assert!((source.duration_seconds(100) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn clones_share_samples() {
        let source = Source::from_samples(vec![7_i16; 4]).unwrap();
        let clone = source.clone();
        assert!(std::ptr::eq(source.samples(), clone.samples()));
    }

    #[test]
    fn quantize_truncates_and_clamps_symmetrically() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), SAMPLE_MAX);
        assert_eq!(quantize(3.5), SAMPLE_MAX);
        assert_eq!(quantize(-3.5), -SAMPLE_MAX);
        assert_eq!(quantize(-1.0), -SAMPLE_MAX);
        // 0.5 * 32767 = 16383.5 truncates to 16383.
        assert_eq!(quantize(0.5), 16_383);
        assert_eq!(quantize(-0.5), -16_383);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn conversion_round_trips_full_scale() {
        assert_eq!(quantize(to_float(SAMPLE_MAX)), SAMPLE_MAX);
        assert_eq!(quantize(to_float(-SAMPLE_MAX)), -SAMPLE_MAX);
        assert_eq!(quantize(to_float(i16::MIN)), -SAMPLE_MAX);
    }

    #[test]
    fn sine_is_stereo_and_bounded() {
        let tone = Source::sine(440.0, 0.5, 0.8, 8_000);
        assert_eq!(tone.frames(), 4_000);
        for frame in tone.samples().chunks(CHANNELS) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].unsigned_abs() <= (0.8 * SAMPLE_MAX as f32) as u16 + 1);
        }
    }
}
