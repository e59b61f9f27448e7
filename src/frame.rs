//! Depth frame handle and release accounting
//!
//! [`DepthFrame`] is the unit of data handed to consumers. Ownership is
//! shared: the streamer's buffer slot and any number of consumer clones can
//! co-own a frame, and the drop of the *last* handle reports back to the
//! originating streamer exactly once. That report is what re-arms the
//! streamer's acquisition gate (see [`crate::DepthFrameStreamer`]).

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Capability for receiving frame-release notifications.
///
/// Implemented by the streamer's slot state; frames hold only a weak
/// reference so a frame outliving its streamer degrades to a silent drop.
pub(crate) trait ReleaseSink: Send + Sync {
    /// Called once when the last handle to the frame with this delivery
    /// serial is dropped.
    fn frame_released(&self, serial: u64);
}

/// A decoded depth frame as produced by a frame source, before it is bound
/// to a streamer.
///
/// `data` holds one `u16` depth sample (millimeters) per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub data: Vec<u16>,
    pub width: u16,
    pub height: u16,
    /// Sender-assigned sequence number.
    pub sequence: u64,
    /// Capture timestamp relative to the sender's stream epoch.
    pub timestamp: Duration,
}

impl FrameBuffer {
    /// Returns whether the payload length matches the declared dimensions.
    pub fn is_coherent(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize
    }
}

/// One decoded depth frame with shared ownership.
///
/// Cloning is cheap and shares the underlying buffer. Depth samples are in
/// millimeters, row-major.
#[derive(Clone)]
pub struct DepthFrame {
    inner: Arc<FrameInner>,
}

struct FrameInner {
    data: Box<[u16]>,
    width: u16,
    height: u16,
    sequence: u64,
    timestamp: Duration,
    /// Streamer-assigned delivery serial, distinct from the sender sequence.
    serial: u64,
    sink: Weak<dyn ReleaseSink>,
}

impl DepthFrame {
    pub(crate) fn bind(buffer: FrameBuffer, serial: u64, sink: Weak<dyn ReleaseSink>) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                data: buffer.data.into_boxed_slice(),
                width: buffer.width,
                height: buffer.height,
                sequence: buffer.sequence,
                timestamp: buffer.timestamp,
                serial,
                sink,
            }),
        }
    }

    pub(crate) fn serial(&self) -> u64 {
        self.inner.serial
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u16 {
        self.inner.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u16 {
        self.inner.height
    }

    /// Sender-assigned sequence number.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence
    }

    /// Capture timestamp relative to the sender's stream epoch.
    pub fn timestamp(&self) -> Duration {
        self.inner.timestamp
    }

    /// Raw depth samples in millimeters, row-major.
    pub fn data(&self) -> &[u16] {
        &self.inner.data
    }

    /// Depth sample at pixel `(x, y)`, or `None` when out of bounds.
    pub fn depth_at(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.inner.width || y >= self.inner.height {
            return None;
        }
        self.inner.data.get(y as usize * self.inner.width as usize + x as usize).copied()
    }
}

impl fmt::Debug for DepthFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthFrame")
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("sequence", &self.inner.sequence)
            .field("timestamp", &self.inner.timestamp)
            .finish_non_exhaustive()
    }
}

impl Drop for FrameInner {
    fn drop(&mut self) {
        // Fires once per frame: FrameInner is destroyed only when the last
        // Arc handle goes away.
        if let Some(sink) = self.sink.upgrade() {
            sink.frame_released(self.serial);
        }
    }
}
