use std::sync::{Mutex, MutexGuard, PoisonError};

use glimpse_types::frame::CapturedFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Primary => 0,
            Slot::Secondary => 1,
        }
    }
}

/// Copy of the primary buffer taken for one delivery attempt.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    generation: u64,
    pub frames: Vec<CapturedFrame>,
}

impl WorkingSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn payloads(&self) -> Vec<&[u8]> {
        self.frames.iter().map(|f| f.payload.as_slice()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Slot whose frames became the working set.
    pub winner: Slot,
    pub kept: usize,
    pub discarded: usize,
}

#[derive(Debug, Default)]
struct Slots {
    frames: [Vec<CapturedFrame>; 2],
    /// Bumped whenever a slot is cleared or replaced wholesale.
    generations: [u64; 2],
}

impl Slots {
    fn clear(&mut self, slot: Slot) -> usize {
        let idx = slot.index();
        self.generations[idx] += 1;
        std::mem::take(&mut self.frames[idx]).len()
    }
}

/// The pair of frame buffers behind a single lock.
///
/// Captures always land in the primary slot; the secondary slot only holds
/// frames seeded into it directly. Every operation holds the lock for its
/// whole duration, so readers never observe a half-cleared buffer.
#[derive(Debug, Default)]
pub struct DualBuffer {
    inner: Mutex<Slots>,
}

impl DualBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, frame: CapturedFrame) {
        self.append_to(Slot::Primary, frame);
    }

    /// Pushes a frame straight into `slot`, e.g. when restoring a backup.
    pub fn append_to(&self, slot: Slot, frame: CapturedFrame) {
        self.lock().frames[slot.index()].push(frame);
    }

    pub fn len(&self, slot: Slot) -> usize {
        self.lock().frames[slot.index()].len()
    }

    pub fn total_len(&self) -> usize {
        let slots = self.lock();
        slots.frames[0].len() + slots.frames[1].len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Drops every frame in `slot`; returns how many were dropped.
    pub fn clear(&self, slot: Slot) -> usize {
        self.lock().clear(slot)
    }

    pub fn clear_all(&self) {
        let mut slots = self.lock();
        slots.clear(Slot::Primary);
        slots.clear(Slot::Secondary);
    }

    /// Keeps whichever slot holds more frames and discards the other.
    ///
    /// The comparison is on counts only, so an older but larger secondary
    /// beats a newer primary. On a tie the secondary wins. The surviving
    /// frames end up in the primary slot.
    pub fn merge(&self) -> MergeOutcome {
        let mut slots = self.lock();
        let primary_len = slots.frames[Slot::Primary.index()].len();
        let secondary_len = slots.frames[Slot::Secondary.index()].len();

        if primary_len > secondary_len {
            let discarded = slots.clear(Slot::Secondary);
            MergeOutcome {
                winner: Slot::Primary,
                kept: primary_len,
                discarded,
            }
        } else {
            let promoted = std::mem::take(&mut slots.frames[Slot::Secondary.index()]);
            slots.generations[Slot::Secondary.index()] += 1;
            let discarded = slots.clear(Slot::Primary);
            slots.frames[Slot::Primary.index()] = promoted;
            MergeOutcome {
                winner: Slot::Secondary,
                kept: secondary_len,
                discarded,
            }
        }
    }

    /// Copies the primary slot for delivery without removing anything.
    pub fn working_set(&self) -> WorkingSet {
        let slots = self.lock();
        let idx = Slot::Primary.index();
        WorkingSet {
            generation: slots.generations[idx],
            frames: slots.frames[idx].clone(),
        }
    }

    /// Removes the frames of a delivered working set.
    ///
    /// Frames appended after the copy was taken stay put. If the primary slot
    /// was cleared in the meantime the delivered frames are already gone and
    /// nothing is removed. Returns the number of frames removed.
    pub fn acknowledge(&self, delivered: &WorkingSet) -> usize {
        let mut slots = self.lock();
        let idx = Slot::Primary.index();
        if slots.generations[idx] != delivered.generation {
            return 0;
        }
        let count = delivered.len().min(slots.frames[idx].len());
        slots.frames[idx].drain(..count);
        count
    }
}
