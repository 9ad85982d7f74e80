//! Real-time side of the mixer.

use super::{Mixer, MixerState};
use crate::{
    config::CHANNELS,
    pool::StreamSlot,
    source::{quantize, to_float},
};

/// Device entry point: fills `output` with one period of little-endian
/// interleaved stereo `i16` audio. The requested byte count is `output.len()`.
///
/// The buffer is always fully written; silence where nothing plays.
pub fn audio_callback(mixer: &Mixer, output: &mut [u8]) {
    mixer.fill_bytes(output);
}

impl MixerState {
    /// Runs one mix pass over `samples` interleaved samples and hands each
    /// quantized result to `write` in order.
    pub(super) fn mix(&mut self, samples: usize, mut write: impl FnMut(usize, i16)) {
        let accum = &mut self.mix_buffer[..samples];
        accum.fill(0.0);

        if !self.suspended {
            let master = self.pool.master_gain();
            for slot in self.pool.iter_active_mut().filter(|slot| !slot.paused) {
                mix_slot(slot, master, accum);
            }
        }

        for (index, &value) in accum.iter().enumerate() {
            write(index, quantize(value));
        }
    }
}

/// Accumulates one voice into `accum`, advancing its cursor.
///
/// On exhaustion a repeating voice rewinds and skips the current frame; a
/// non-repeating voice pauses and stays allocated.
fn mix_slot(slot: &mut StreamSlot, master: (f32, f32), accum: &mut [f32]) {
    let Some(source) = slot.source.as_ref() else {
        return;
    };
    let samples = source.samples();
    let gain_left = master.0 * slot.gain_left;
    let gain_right = master.1 * slot.gain_right;

    for frame in accum.chunks_exact_mut(CHANNELS) {
        if slot.remaining > 0 {
            frame[0] += gain_left * to_float(samples[slot.position]);
            frame[1] += gain_right * to_float(samples[slot.position + 1]);
            slot.position += CHANNELS;
            slot.remaining -= CHANNELS;
        } else if slot.repeat {
            slot.position = 0;
            slot.remaining = samples.len();
        } else {
            slot.paused = true;
            break;
        }
    }
}
