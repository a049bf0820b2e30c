use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use tracing::debug;

use crate::dual::{DualBuffer, Slot};

/// Rolling two-generation retention.
///
/// Each cycle clears one slot, alternating primary and secondary by tick
/// parity, so the two slots are never cleared by the same firing. Where new
/// captures go is not the cycler's business: they always land in primary.
/// Cycles are no-ops while buffering mode is off.
#[derive(Debug)]
pub struct BufferCycler {
    buffers: Arc<DualBuffer>,
    tick: AtomicU64,
    buffering_mode: AtomicBool,
}

impl BufferCycler {
    pub fn new(buffers: Arc<DualBuffer>, buffering_mode: bool) -> Self {
        Self {
            buffers,
            tick: AtomicU64::new(0),
            buffering_mode: AtomicBool::new(buffering_mode),
        }
    }

    pub fn set_buffering_mode(&self, enabled: bool) {
        self.buffering_mode.store(enabled, Ordering::SeqCst);
    }

    pub fn buffering_mode(&self) -> bool {
        self.buffering_mode.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    pub fn reset_ticks(&self) {
        self.tick.store(0, Ordering::SeqCst);
    }

    /// One timer firing. Returns the slot that was cleared, if any.
    pub fn cycle(&self) -> Option<Slot> {
        if !self.buffering_mode() {
            return None;
        }
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let slot = if tick % 2 == 0 {
            Slot::Primary
        } else {
            Slot::Secondary
        };
        let dropped = self.buffers.clear(slot);
        debug!("Buffer cycle {tick}: cleared {slot:?} ({dropped} frames)");
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use glimpse_types::frame::CapturedFrame;

    use super::*;

    fn frame(ts: i64) -> CapturedFrame {
        CapturedFrame::new(vec![1, 2, 3], ts)
    }

    #[test]
    fn disabled_cycler_has_no_effect() {
        let buffers = Arc::new(DualBuffer::new());
        buffers.append(frame(1));
        let cycler = BufferCycler::new(buffers.clone(), false);
        assert_eq!(cycler.cycle(), None);
        assert_eq!(cycler.ticks(), 0);
        assert_eq!(buffers.len(Slot::Primary), 1);
    }

    #[test]
    fn cycles_alternate_one_slot_at_a_time() {
        let buffers = Arc::new(DualBuffer::new());
        let cycler = BufferCycler::new(buffers.clone(), true);
        let cleared: Vec<_> = (0..6).filter_map(|_| cycler.cycle()).collect();
        assert_eq!(
            cleared,
            vec![
                Slot::Primary,
                Slot::Secondary,
                Slot::Primary,
                Slot::Secondary,
                Slot::Primary,
                Slot::Secondary
            ]
        );
        assert_eq!(cycler.ticks(), 6);
    }

    #[test]
    fn cycles_never_redirect_appends() {
        let buffers = Arc::new(DualBuffer::new());
        let cycler = BufferCycler::new(buffers.clone(), true);

        assert_eq!(cycler.cycle(), Some(Slot::Primary));
        assert_eq!(cycler.cycle(), Some(Slot::Secondary));
        buffers.append(frame(1));
        assert_eq!(buffers.len(Slot::Primary), 1);
        assert_eq!(buffers.len(Slot::Secondary), 0);
    }

    #[test]
    fn odd_cycle_keeps_primary_frames() {
        let buffers = Arc::new(DualBuffer::new());
        let cycler = BufferCycler::new(buffers.clone(), true);

        cycler.cycle();
        buffers.append(frame(1));
        buffers.append(frame(2));
        buffers.append_to(Slot::Secondary, frame(0));

        assert_eq!(cycler.cycle(), Some(Slot::Secondary));
        assert_eq!(buffers.len(Slot::Primary), 2);
        assert_eq!(buffers.len(Slot::Secondary), 0);

        assert_eq!(cycler.cycle(), Some(Slot::Primary));
        assert!(buffers.is_empty());
    }

    #[test]
    fn toggling_buffering_mode_and_resetting_ticks() {
        let buffers = Arc::new(DualBuffer::new());
        let cycler = BufferCycler::new(buffers, false);
        cycler.set_buffering_mode(true);
        assert!(cycler.buffering_mode());
        cycler.cycle();
        cycler.cycle();
        cycler.cycle();
        cycler.reset_ticks();
        assert_eq!(cycler.cycle(), Some(Slot::Primary));
    }
}
