//! Single-slot frame hand-off between the delivery task and the consumer
//!
//! All shared state lives behind one mutex: the buffered frame, the pause
//! gate, and the serial of the frame currently held by the consumer. Every
//! operation is one short critical section; no I/O or decoding happens under
//! the lock.
//!
//! Frames are never dropped while the lock is held. A superseded frame's
//! release hook re-enters this module through [`ReleaseSink::frame_released`],
//! so every path that sheds a frame moves it out of the critical section
//! first and lets it drop after the guard is gone.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::frame::{DepthFrame, FrameBuffer, ReleaseSink};

/// Counters describing slot traffic since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamerStats {
    /// Frames accepted into the slot.
    pub delivered: u64,
    /// Accepted frames replaced by a newer delivery before acquisition.
    pub discarded: u64,
    /// Deliveries dropped by the pause gate.
    pub suppressed: u64,
    /// Frames handed to the consumer.
    pub acquired: u64,
    /// Frame release notifications observed.
    pub released: u64,
}

/// The guarded single-slot buffer.
///
/// Holds at most one pending frame; a newer delivery replaces an unconsumed
/// older one (latest-frame-wins). Acquisition is gated on the release of the
/// previously acquired frame.
pub(crate) struct FrameSlot {
    state: Mutex<SlotState>,
    /// Self-handle created at construction; handed to every frame so its
    /// release can find the way back here without the caller threading a
    /// reference through.
    this: Weak<FrameSlot>,
}

struct SlotState {
    /// Latest delivered, not-yet-acquired frame. `Some` is the
    /// "new frame available" condition.
    current: Option<DepthFrame>,
    /// Pause gate shared with the delivery path.
    paused: bool,
    /// Delivery serial of the frame the consumer currently holds.
    outstanding: Option<u64>,
    /// Next delivery serial.
    next_serial: u64,
    stats: StreamerStats,
}

impl FrameSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(SlotState {
                current: None,
                paused: false,
                outstanding: None,
                next_serial: 0,
                stats: StreamerStats::default(),
            }),
            this: this.clone(),
        })
    }

    fn release_handle(&self) -> Weak<dyn ReleaseSink> {
        let weak: Weak<dyn ReleaseSink> = self.this.clone();
        weak
    }

    /// Delivery path: replace any unconsumed frame with the new one.
    ///
    /// Never blocks on the consumer. When paused, the buffer is left
    /// untouched and the delivery is dropped before a frame object is even
    /// created.
    pub(crate) fn deliver(&self, buffer: FrameBuffer) {
        let discarded = {
            let mut state = self.state.lock();
            if state.paused {
                state.stats.suppressed += 1;
                trace!(sequence = buffer.sequence, "delivery suppressed while paused");
                return;
            }
            let serial = state.next_serial;
            state.next_serial += 1;
            let frame = DepthFrame::bind(buffer, serial, self.release_handle());
            let discarded = state.current.replace(frame);
            state.stats.delivered += 1;
            if discarded.is_some() {
                state.stats.discarded += 1;
            }
            discarded
        };
        // The superseded frame (if any) drops here, outside the critical
        // section: its release hook locks this slot again.
        drop(discarded);
    }

    /// Atomic check-and-take: succeeds only when a frame is buffered and the
    /// previously acquired frame has been released.
    pub(crate) fn acquire(&self) -> Option<DepthFrame> {
        let mut state = self.state.lock();
        if state.outstanding.is_some() {
            return None;
        }
        let frame = state.current.take()?;
        state.outstanding = Some(frame.serial());
        state.stats.acquired += 1;
        Some(frame)
    }

    /// Whether a buffered, not-yet-acquired frame exists.
    pub(crate) fn is_available(&self) -> bool {
        self.state.lock().current.is_some()
    }

    /// Flip the pause gate. Returns `false` when already in the requested
    /// state (the transition is a no-op).
    pub(crate) fn set_paused(&self, paused: bool) -> bool {
        let mut state = self.state.lock();
        if state.paused == paused {
            return false;
        }
        state.paused = paused;
        true
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Drop any buffered frame. Used at teardown.
    pub(crate) fn clear(&self) {
        let dropped = {
            let mut state = self.state.lock();
            state.current.take()
        };
        drop(dropped);
    }

    pub(crate) fn stats(&self) -> StreamerStats {
        self.state.lock().stats
    }
}

impl ReleaseSink for FrameSlot {
    fn frame_released(&self, serial: u64) {
        let mut state = self.state.lock();
        state.stats.released += 1;
        // Only the consumer's own frame re-arms acquisition. A discarded
        // never-acquired frame releasing here must not unblock a consumer
        // that still holds an older frame.
        if state.outstanding == Some(serial) {
            state.outstanding = None;
        }
    }
}
