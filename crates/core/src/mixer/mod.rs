//! Stream mixer: the control API and the real-time mixing callback.
//!
//! A [`Mixer`] is a cheap, clonable handle to one pool of voices guarded by a
//! single mutex. The control thread and the device thread each keep a clone.
//! Every control operation and every callback invocation holds the lock for
//! its whole duration, so the callback never sees a half-updated voice and a
//! control call never sees a voice mid-mix.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{
    config::{MixerConfig, BYTES_PER_SAMPLE, CHANNELS},
    pool::{StreamHandle, StreamPool, StreamStatus},
    source::frames_to_seconds,
    Result, Source,
};

mod callback;


pub use callback::audio_callback;

/// Options for [`Mixer::play`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayFlags {
    /// Rewind to the first sample before resuming.
    #[serde(default)]
    pub restart: bool,
    /// Loop on exhaustion instead of pausing. Sticky once set.
    #[serde(default)]
    pub repeat: bool,
}

impl PlayFlags {
    pub const NONE: Self = Self {
        restart: false,
        repeat: false,
    };
    pub const RESTART: Self = Self {
        restart: true,
        repeat: false,
    };
    pub const REPEAT: Self = Self {
        restart: false,
        repeat: true,
    };
}

impl std::ops::BitOr for PlayFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            restart: self.restart || rhs.restart,
            repeat: self.repeat || rhs.repeat,
        }
    }
}

/// State behind the mixer lock.
#[derive(Debug)]
struct MixerState {
    pool: StreamPool,
    /// Float accumulation buffer sized to the largest request the device may
    /// make, allocated once so the callback never allocates.
    mix_buffer: Box<[f32]>,
    suspended: bool,
}

/// Shared handle to a pool of mixing voices.
#[derive(Debug, Clone)]
pub struct Mixer {
    shared: Arc<Mutex<MixerState>>,
    sample_rate: u32,
    max_buffer_samples: usize,
}

impl Mixer {
    /// Builds a mixer with the pool size, buffer limit and master gain taken
    /// from `config`.
    pub fn new(config: &MixerConfig) -> Result<Self> {
        config.validate()?;

        let mut pool = StreamPool::new(config.max_streams);
        pool.set_master_gain(config.master_gain_left, config.master_gain_right);
        let max_buffer_samples = config.max_buffer_samples();

        tracing::debug!(
            streams = config.max_streams,
            max_buffer_samples,
            sample_rate = config.sample_rate,
            "mixer created"
        );

        Ok(Self {
            shared: Arc::new(Mutex::new(MixerState {
                pool,
                mix_buffer: vec![0.0; max_buffer_samples].into_boxed_slice(),
                suspended: false,
            })),
            sample_rate: config.sample_rate,
            max_buffer_samples,
        })
    }

    /// Sample rate the mixer was configured for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Largest interleaved sample count a single callback may request.
    pub fn max_buffer_samples(&self) -> usize {
        self.max_buffer_samples
    }

    pub fn capacity(&self) -> usize {
        self.lock().pool.capacity()
    }

    pub fn active_count(&self) -> usize {
        self.lock().pool.active_count()
    }

    /// Binds `source` to the lowest free slot. The new voice is paused until
    /// [`Mixer::play`] is called. Returns `None` when the pool is full.
    pub fn allocate(&self, source: Source) -> Option<StreamHandle> {
        let (handle, capacity) = {
            let mut state = self.lock();
            let handle = state.pool.allocate(source);
            (handle, state.pool.capacity())
        };
        match handle {
            Some(handle) => tracing::debug!(slot = handle.index(), "stream allocated"),
            None => tracing::warn!(capacity, "no free stream slot"),
        }
        handle
    }

    /// Frees a voice. Stale or already released handles are ignored.
    pub fn release(&self, handle: StreamHandle) {
        let released = self.lock().pool.release(handle);
        if released {
            tracing::debug!(slot = handle.index(), "stream released");
        }
    }

    /// Starts or resumes a voice.
    pub fn play(&self, handle: StreamHandle, flags: PlayFlags) {
        let mut state = self.lock();
        let Some(slot) = state.pool.get_mut(handle) else {
            return;
        };
        if flags.restart {
            slot.rewind();
        }
        if flags.repeat {
            slot.repeat = true;
        }
        slot.paused = false;
    }

    /// Pauses a voice, keeping its position.
    pub fn stop(&self, handle: StreamHandle) {
        if let Some(slot) = self.lock().pool.get_mut(handle) {
            slot.paused = true;
        }
    }

    /// Sets per-channel linear gain. Values above unity are allowed.
    pub fn set_gain(&self, handle: StreamHandle, left: f32, right: f32) {
        if let Some(slot) = self.lock().pool.get_mut(handle) {
            slot.gain_left = left;
            slot.gain_right = right;
        }
    }

    pub fn set_master_gain(&self, left: f32, right: f32) {
        self.lock().pool.set_master_gain(left, right);
    }

    pub fn master_gain(&self) -> (f32, f32) {
        self.lock().pool.master_gain()
    }

    /// Playback position in seconds, or `0.0` for an inactive handle.
    pub fn position_seconds(&self, handle: StreamHandle, sample_rate: u32) -> f32 {
        let state = self.lock();
        state.pool.get(handle).map_or(0.0, |slot| {
            frames_to_seconds(slot.position / CHANNELS, sample_rate)
        })
    }

    /// Length of the bound source in seconds, or `0.0` for an inactive handle.
    pub fn duration_seconds(&self, handle: StreamHandle, sample_rate: u32) -> f32 {
        let state = self.lock();
        state.pool.get(handle).map_or(0.0, |slot| {
            slot.source
                .as_ref()
                .map_or(0.0, |source| source.duration_seconds(sample_rate))
        })
    }

    pub fn status(&self, handle: StreamHandle) -> Option<StreamStatus> {
        self.lock().pool.status(handle)
    }

    /// True when the voice is allocated and not paused.
    pub fn is_playing(&self, handle: StreamHandle) -> bool {
        self.lock()
            .pool
            .get(handle)
            .is_some_and(|slot| !slot.paused)
    }

    /// Silences all output without touching any voice state.
    pub fn suspend(&self) {
        self.lock().suspended = true;
    }

    pub fn resume(&self) {
        self.lock().suspended = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.lock().suspended
    }

    /// Mixes one device period into `output` as interleaved `i16` samples.
    ///
    /// # Panics
    ///
    /// Panics if `output.len()` is not a multiple of the channel count or
    /// exceeds [`Mixer::max_buffer_samples`]. Both indicate a misconfigured
    /// device layer.
    pub fn fill(&self, output: &mut [i16]) {
        self.check_request(output.len());
        self.lock().mix(output.len(), |index, sample| output[index] = sample);
    }

    /// Same as [`Mixer::fill`], writing little-endian 16-bit bytes.
    ///
    /// # Panics
    ///
    /// Panics if `output.len()` is not a whole number of stereo frames or
    /// holds more samples than [`Mixer::max_buffer_samples`].
    pub fn fill_bytes(&self, output: &mut [u8]) {
        assert!(
            output.len() % (CHANNELS * BYTES_PER_SAMPLE) == 0,
            "device requested {} bytes, not a whole number of {}-byte frames",
            output.len(),
            CHANNELS * BYTES_PER_SAMPLE
        );
        let samples = output.len() / BYTES_PER_SAMPLE;
        self.check_request(samples);
        self.lock().mix(samples, |index, sample| {
            let offset = index * BYTES_PER_SAMPLE;
            output[offset..offset + BYTES_PER_SAMPLE].copy_from_slice(&sample.to_le_bytes());
        });
    }

    fn check_request(&self, samples: usize) {
        assert!(
            samples % CHANNELS == 0,
            "device requested {samples} samples, not a multiple of {CHANNELS} channels"
        );
        assert!(
            samples <= self.max_buffer_samples,
            "device requested {samples} samples, mix buffer holds {}",
            self.max_buffer_samples
        );
    }

    /// The lock only guards plain data and nothing panics while holding it,
    /// so a poisoned lock still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, MixerState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn with_pool<T>(&self, f: impl FnOnce(&StreamPool) -> T) -> T {
        f(&self.lock().pool)
    }
}
