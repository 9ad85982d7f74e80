use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    bank::SourceBank, device::OfflineDevice, Mixer, MixerError, PlayFlags, Result,
    StreamHandle,
};

/// Rendered-time clock advanced by whole device periods.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f32) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }

    /// Sets the clock to the start of frame `frames`.
    ///
    /// Derived from the frame count each time so repeated periods do not
    /// accumulate rounding error.
    pub fn seek_frames(&mut self, frames: usize, sample_rate: u32) {
        self.time_seconds = if sample_rate == 0 {
            0.0
        } else {
            (frames as f64 / f64::from(sample_rate)) as f32
        };
    }
}

/// Control operation applied to a named voice when its cue comes due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CueAction {
    Play {
        voice: String,
        #[serde(flatten)]
        flags: PlayFlags,
    },
    Stop {
        voice: String,
    },
    Gain {
        voice: String,
        left: f32,
        right: f32,
    },
    MasterGain {
        left: f32,
        right: f32,
    },
    Release {
        voice: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub time_seconds: f32,
    #[serde(flatten)]
    pub action: CueAction,
}

impl Cue {
    pub fn new(time_seconds: f32, action: CueAction) -> Self {
        Self {
            time_seconds,
            action,
        }
    }
}

/// A voice to allocate before rendering starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSpec {
    pub name: String,
    pub source: String,
}

/// Offline mix description: which files to load, which voices to allocate
/// on them, and when to poke those voices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CueSheet {
    /// Source name to loader identifier (a WAV path for the CLI).
    #[serde(default)]
    pub sources: HashMap<String, String>,
    #[serde(default)]
    pub voices: Vec<VoiceSpec>,
    #[serde(default)]
    pub cues: Vec<Cue>,
    pub duration_seconds: f32,
}

impl CueSheet {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Dispatches cues in time order as a [`PlaybackClock`] moves forward.
#[derive(Debug, Default)]
pub struct Scheduler {
    cues: Vec<Cue>,
    next_cue: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cues(&mut self, cues: Vec<Cue>) {
        self.cues = cues;
        // Stable sort keeps same-time cues in sheet order.
        self.cues.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        self.next_cue = 0;
    }

    pub fn pending(&self) -> usize {
        self.cues.len() - self.next_cue
    }

    /// Applies every cue due at or before the clock. Cues naming unknown
    /// voices are skipped with a warning. Returns how many cues fired.
    pub fn tick(
        &mut self,
        clock: &PlaybackClock,
        mixer: &Mixer,
        voices: &HashMap<String, StreamHandle>,
    ) -> usize {
        let mut fired = 0;
        while let Some(cue) = self.cues.get(self.next_cue) {
            if cue.time_seconds > clock.time_seconds {
                break;
            }
            apply(&cue.action, mixer, voices);
            self.next_cue += 1;
            fired += 1;
        }
        fired
    }
}

fn apply(action: &CueAction, mixer: &Mixer, voices: &HashMap<String, StreamHandle>) {
    let lookup = |voice: &str| {
        let handle = voices.get(voice).copied();
        if handle.is_none() {
            tracing::warn!(voice, "cue names an unknown voice");
        }
        handle
    };

    match action {
        CueAction::Play { voice, flags } => {
            if let Some(handle) = lookup(voice.as_str()) {
                mixer.play(handle, *flags);
            }
        }
        CueAction::Stop { voice } => {
            if let Some(handle) = lookup(voice.as_str()) {
                mixer.stop(handle);
            }
        }
        CueAction::Gain { voice, left, right } => {
            if let Some(handle) = lookup(voice.as_str()) {
                mixer.set_gain(handle, *left, *right);
            }
        }
        CueAction::MasterGain { left, right } => mixer.set_master_gain(*left, *right),
        CueAction::Release { voice } => {
            if let Some(handle) = lookup(voice.as_str()) {
                mixer.release(handle);
            }
        }
    }
}

/// A cue sheet bound to a mixer, ready to render.
#[derive(Debug)]
pub struct Session {
    mixer: Mixer,
    voices: HashMap<String, StreamHandle>,
    scheduler: Scheduler,
    clock: PlaybackClock,
    duration_seconds: f32,
}

impl Session {
    /// Allocates every voice of `sheet` from sources already in `bank`.
    pub fn prepare(sheet: &CueSheet, bank: &SourceBank, mixer: Mixer) -> Result<Self> {
        let mut voices = HashMap::with_capacity(sheet.voices.len());
        for spec in &sheet.voices {
            let source = bank.resolve(&spec.source)?;
            let handle = mixer
                .allocate(source)
                .ok_or_else(|| MixerError::PoolExhausted {
                    capacity: mixer.capacity(),
                })?;
            voices.insert(spec.name.clone(), handle);
        }

        let mut scheduler = Scheduler::new();
        scheduler.set_cues(sheet.cues.clone());

        Ok(Self {
            mixer,
            voices,
            scheduler,
            clock: PlaybackClock::default(),
            duration_seconds: sheet.duration_seconds.max(0.0),
        })
    }

    pub fn voice(&self, name: &str) -> Option<StreamHandle> {
        self.voices.get(name).copied()
    }

    /// Drives `device` until the sheet's duration is covered, handing every
    /// period to `sink`. Cues are applied at period boundaries.
    ///
    /// Fails with [`MixerError::InvalidConfig`] if the device period is empty.
    pub fn run<F>(&mut self, device: &mut OfflineDevice, mut sink: F) -> Result<usize>
    where
        F: FnMut(&[i16]) -> Result<()>,
    {
        let period_frames = device.period_frames();
        if period_frames == 0 {
            return Err(MixerError::InvalidConfig("device period must hold a frame"));
        }
        let sample_rate = self.mixer.sample_rate();
        let total_frames =
            (f64::from(self.duration_seconds) * f64::from(sample_rate)).round() as usize;
        let mut frames = 0;

        while frames < total_frames {
            self.clock.seek_frames(frames, sample_rate);
            self.scheduler.tick(&self.clock, &self.mixer, &self.voices);
            let period = device.pull(&self.mixer);
            sink(&period)?;
            frames += period_frames;
        }
        self.clock.seek_frames(frames, sample_rate);

        tracing::info!(
            frames,
            periods = device.periods_rendered(),
            unfired_cues = self.scheduler.pending(),
            "render finished"
        );
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MixerConfig, Source};

    fn mixer() -> Mixer {
        Mixer::new(&MixerConfig {
            sample_rate: 100,
            max_streams: 2,
            max_buffer_frames: 16,
            device_buffer_frames: 10,
            ..MixerConfig::default()
        })
        .unwrap()
    }

    fn sheet_json() -> &'static str {
        r#"{
            "sources": { "beep": "beep.wav" },
            "voices": [ { "name": "a", "source": "beep" } ],
            "cues": [
                { "time_seconds": 0.2, "action": "stop", "voice": "a" },
                { "time_seconds": 0.0, "action": "play", "voice": "a", "repeat": true },
                { "time_seconds": 0.0, "action": "gain", "voice": "a", "left": 0.5, "right": 0.5 },
                { "time_seconds": 0.1, "action": "play", "voice": "ghost" }
            ],
            "duration_seconds": 0.3
        }"#
    }

    fn bank() -> SourceBank {
        let mut bank = SourceBank::new();
        bank.register("beep", Source::from_samples(vec![10_000_i16; 6]).unwrap());
        bank
    }

    #[test]
    fn parses_cue_sheets() {
        let sheet = CueSheet::from_json_str(sheet_json()).unwrap();
        assert_eq!(sheet.voices.len(), 1);
        assert_eq!(
            sheet.cues[1].action,
            CueAction::Play {
                voice: "a".to_string(),
                flags: PlayFlags::REPEAT,
            }
        );
    }

    #[test]
    fn clock_never_goes_negative() {
        let mut clock = PlaybackClock::default();
        clock.advance(-1.0);
        assert_eq!(clock.time_seconds, 0.0);
    }

    #[test]
    fn scheduler_fires_due_cues_in_time_order() {
        let mixer = mixer();
        let handle = mixer
            .allocate(Source::from_samples(vec![0_i16; 4]).unwrap())
            .unwrap();
        let voices = HashMap::from([("a".to_string(), handle)]);

        let mut scheduler = Scheduler::new();
        scheduler.set_cues(vec![
            Cue::new(1.0, CueAction::Stop { voice: "a".into() }),
            Cue::new(
                0.0,
                CueAction::Play {
                    voice: "a".into(),
                    flags: PlayFlags::NONE,
                },
            ),
        ]);

        let mut clock = PlaybackClock::default();
        assert_eq!(scheduler.tick(&clock, &mixer, &voices), 1);
        assert!(mixer.is_playing(handle));

        clock.advance(0.5);
        assert_eq!(scheduler.tick(&clock, &mixer, &voices), 0);

        clock.advance(0.5);
        assert_eq!(scheduler.tick(&clock, &mixer, &voices), 1);
        assert!(!mixer.is_playing(handle));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn session_renders_the_whole_duration() {
        let sheet = CueSheet::from_json_str(sheet_json()).unwrap();
        let mut session = Session::prepare(&sheet, &bank(), mixer()).unwrap();
        let mut device = OfflineDevice::new(10);

        let mut rendered = Vec::new();
        let frames = session
            .run(&mut device, |period| {
                rendered.extend_from_slice(period);
                Ok(())
            })
            .unwrap();

        assert_eq!(frames, 30);
        assert_eq!(rendered.len(), 60);
        // Playing at half gain for the first 0.2 s, stopped afterwards.
        assert!(rendered[..2].iter().all(|&s| (s - 5_000).abs() <= 1));
        assert!(rendered[40..].iter().all(|&s| s == 0));
        assert!(session.voice("a").is_some());
    }

    #[test]
    fn cues_on_period_boundaries_fire_on_time() {
        let period_frames = 1024;
        let sample_rate = 44_100;
        let mut bank = SourceBank::new();
        bank.register("hum", Source::from_samples(vec![10_000_i16; 2048]).unwrap());

        for k in [10_usize, 50, 100, 200, 400] {
            let time_seconds = ((k * period_frames) as f64 / f64::from(sample_rate)) as f32;
            let sheet = CueSheet {
                voices: vec![VoiceSpec {
                    name: "a".into(),
                    source: "hum".into(),
                }],
                cues: vec![Cue::new(
                    time_seconds,
                    CueAction::Play {
                        voice: "a".into(),
                        flags: PlayFlags::REPEAT,
                    },
                )],
                duration_seconds: ((k + 2) * period_frames) as f32 / sample_rate as f32,
                ..CueSheet::default()
            };
            let mixer = Mixer::new(&MixerConfig::default()).unwrap();
            let mut session = Session::prepare(&sheet, &bank, mixer).unwrap();
            let mut device = OfflineDevice::new(period_frames);

            let mut index = 0;
            let mut first_audible = None;
            session
                .run(&mut device, |period| {
                    if first_audible.is_none() && period.iter().any(|&s| s != 0) {
                        first_audible = Some(index);
                    }
                    index += 1;
                    Ok(())
                })
                .unwrap();

            assert_eq!(first_audible, Some(k), "cue at period {k}");
        }
    }

    #[test]
    fn run_rejects_empty_device_period() {
        let sheet = CueSheet {
            duration_seconds: 1.0,
            ..CueSheet::default()
        };
        let mut session = Session::prepare(&sheet, &bank(), mixer()).unwrap();
        let mut device = OfflineDevice::new(0);

        let mut calls = 0;
        let err = session
            .run(&mut device, |_| {
                calls += 1;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, MixerError::InvalidConfig(_)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn prepare_fails_when_pool_is_too_small() {
        let sheet = CueSheet {
            voices: (0..3)
                .map(|n| VoiceSpec {
                    name: format!("v{n}"),
                    source: "beep".into(),
                })
                .collect(),
            duration_seconds: 1.0,
            ..CueSheet::default()
        };
        let err = Session::prepare(&sheet, &bank(), mixer()).unwrap_err();
        assert!(matches!(err, MixerError::PoolExhausted { capacity: 2 }));
    }

    #[test]
    fn prepare_fails_on_unknown_source() {
        let sheet = CueSheet {
            voices: vec![VoiceSpec {
                name: "a".into(),
                source: "nope".into(),
            }],
            ..CueSheet::default()
        };
        let err = Session::prepare(&sheet, &bank(), mixer()).unwrap_err();
        assert!(matches!(err, MixerError::UnknownSource(_)));
    }
}
