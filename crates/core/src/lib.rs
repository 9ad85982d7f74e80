//! Core library for the stream mixer.
//!
//! A fixed pool of voices is mixed into interleaved stereo 16-bit output by a
//! periodically invoked callback, while any other thread starts, stops and
//! re-gains voices through the same [`Mixer`] handle. The surrounding modules
//! provide what a host needs around that core: WAV loading, a named source
//! bank, an offline device, cue-driven rendering and recording.

pub mod bank;
pub mod config;
pub mod device;
pub mod error;
pub mod loader;
pub mod mixer;
pub mod pool;
pub mod record;
pub mod source;
pub mod timeline;

pub use bank::SourceBank;
pub use config::{AppConfig, MixerConfig, CHANNELS, SAMPLE_MAX};
pub use device::{DeviceCallback, OfflineDevice};
pub use error::{MixerError, Result};
pub use loader::{SourceLoader, WavLoader};
pub use mixer::{audio_callback, Mixer, PlayFlags};
pub use pool::{StreamHandle, StreamPool, StreamStatus};
pub use record::{Recorder, RecordingSettings};
pub use source::Source;
pub use timeline::{Cue, CueAction, CueSheet, PlaybackClock, Scheduler, Session, VoiceSpec};
