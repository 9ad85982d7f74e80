use crate::{
    config::{BYTES_PER_SAMPLE, CHANNELS},
    Mixer,
};

/// Anything a device layer can pull periodic audio from.
///
/// Implementors must fully initialise `output` on every call.
pub trait DeviceCallback: Send + Sync {
    fn render(&self, output: &mut [u8]);
}

impl DeviceCallback for Mixer {
    fn render(&self, output: &mut [u8]) {
        self.fill_bytes(output);
    }
}

/// Deterministic stand-in for an audio device.
///
/// Pulls fixed-size periods from a callback on the caller's thread, the way a
/// driver would from its own, and hands each period back as samples.
#[derive(Debug)]
pub struct OfflineDevice {
    period: Vec<u8>,
    periods_rendered: u64,
}

impl OfflineDevice {
    /// Creates a device that requests `frames` stereo frames per period.
    pub fn new(frames: usize) -> Self {
        Self {
            period: vec![0; frames * CHANNELS * BYTES_PER_SAMPLE],
            periods_rendered: 0,
        }
    }

    /// Stereo frames per period.
    pub fn period_frames(&self) -> usize {
        self.period.len() / (CHANNELS * BYTES_PER_SAMPLE)
    }

    pub fn periods_rendered(&self) -> u64 {
        self.periods_rendered
    }

    /// Invokes the callback once and returns the decoded period.
    pub fn pull<C: DeviceCallback + ?Sized>(&mut self, callback: &C) -> Vec<i16> {
        callback.render(&mut self.period);
        self.periods_rendered += 1;
        self.period
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|bytes| i16::from_le_bytes([bytes[0], bytes[1]]))
            .collect()
    }
}
