//! Fixed-capacity slot map of mixing voices.
//!
//! Handles carry the slot index plus the generation the slot had when it was
//! allocated. Releasing a slot bumps its generation, so a handle that outlived
//! its voice can never reach whichever voice reuses the slot later.

use crate::Source;

/// Opaque identifier of an allocated stream slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    index: u32,
    generation: u32,
}

impl StreamHandle {
    /// Slot index the handle refers to.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// One mixing voice.
///
/// A slot is active exactly when a source is bound to it; releasing drops the
/// binding, so there is no separate flag that could disagree with it.
#[derive(Debug, Clone)]
pub(crate) struct StreamSlot {
    pub(crate) source: Option<Source>,
    generation: u32,
    /// Next interleaved sample to read.
    pub(crate) position: usize,
    /// Interleaved samples left before completion or repeat.
    pub(crate) remaining: usize,
    pub(crate) paused: bool,
    pub(crate) repeat: bool,
    pub(crate) gain_left: f32,
    pub(crate) gain_right: f32,
}

impl StreamSlot {
    fn empty() -> Self {
        Self {
            source: None,
            generation: 0,
            position: 0,
            remaining: 0,
            paused: false,
            repeat: false,
            gain_left: 1.0,
            gain_right: 1.0,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Rewinds to the first sample and re-arms the full source length.
    pub(crate) fn rewind(&mut self) {
        self.position = 0;
        self.remaining = self.source.as_ref().map_or(0, Source::len);
    }

    pub(crate) fn status(&self) -> StreamStatus {
        StreamStatus {
            position: self.position,
            remaining: self.remaining,
            length: self.source.as_ref().map_or(0, Source::len),
            paused: self.paused,
            repeat: self.repeat,
            gain_left: self.gain_left,
            gain_right: self.gain_right,
        }
    }
}

/// Point-in-time copy of a voice's playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamStatus {
    pub position: usize,
    pub remaining: usize,
    /// Interleaved length of the bound source.
    pub length: usize,
    pub paused: bool,
    pub repeat: bool,
    pub gain_left: f32,
    pub gain_right: f32,
}

/// Fixed array of slots plus the pool-wide master gain.
#[derive(Debug)]
pub struct StreamPool {
    slots: Box<[StreamSlot]>,
    active_count: usize,
    master_gain_left: f32,
    master_gain_right: f32,
}

impl StreamPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| StreamSlot::empty()).collect(),
            active_count: 0,
            master_gain_left: 1.0,
            master_gain_right: 1.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_full(&self) -> bool {
        self.active_count == self.slots.len()
    }

    pub fn master_gain(&self) -> (f32, f32) {
        (self.master_gain_left, self.master_gain_right)
    }

    pub fn set_master_gain(&mut self, left: f32, right: f32) {
        self.master_gain_left = left;
        self.master_gain_right = right;
    }

    /// Binds `source` to the lowest-index free slot.
    ///
    /// New voices start paused at position zero with unity gain and no repeat.
    /// Returns `None` without touching the pool when every slot is taken.
    pub fn allocate(&mut self, source: Source) -> Option<StreamHandle> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.is_active())?;

        slot.position = 0;
        slot.remaining = source.len();
        slot.source = Some(source);
        slot.paused = true;
        slot.repeat = false;
        slot.gain_left = 1.0;
        slot.gain_right = 1.0;
        self.active_count += 1;

        Some(StreamHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Frees the slot behind `handle`. Returns whether anything was released.
    pub fn release(&mut self, handle: StreamHandle) -> bool {
        let Some(slot) = self.get_mut(handle) else {
            return false;
        };
        slot.source = None;
        slot.paused = false;
        slot.repeat = false;
        slot.position = 0;
        slot.remaining = 0;
        slot.generation = slot.generation.wrapping_add(1);
        self.active_count -= 1;
        true
    }

    pub fn status(&self, handle: StreamHandle) -> Option<StreamStatus> {
        self.get(handle).map(StreamSlot::status)
    }

    /// Resolves a handle to its slot if the handle is still current.
    pub(crate) fn get(&self, handle: StreamHandle) -> Option<&StreamSlot> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.is_active() && slot.generation == handle.generation)
    }

    pub(crate) fn get_mut(&mut self, handle: StreamHandle) -> Option<&mut StreamSlot> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.is_active() && slot.generation == handle.generation)
    }

    pub(crate) fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut StreamSlot> {
        self.slots.iter_mut().filter(|slot| slot.is_active())
    }

    #[cfg(test)]
    pub(crate) fn counted_active(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }
}
