//! Depth frame streamer: the consumer-facing surface of a stream
//!
//! A [`DepthFrameStreamer`] bridges an asynchronous delivery pipeline (a
//! [`FrameSource`] pushing decoded frames from a background task) with a
//! synchronous polling consumer. The hand-off is a single-slot buffer with
//! latest-frame-wins replacement; the slot module holds the locking
//! discipline.
//!
//! # Example
//!
//! ```rust,no_run
//! use depthcast::{DepthFrameStreamer, StreamConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> depthcast::Result<()> {
//! let config = StreamConfig::new("224.1.1.1".parse().unwrap(), 5000);
//! let streamer = DepthFrameStreamer::open(config).await?;
//!
//! loop {
//!     if let Some(frame) = streamer.acquire_latest_frame() {
//!         println!("frame {} ({}x{})", frame.sequence(), frame.width(), frame.height());
//!         // `frame` drops here; the next acquisition can succeed.
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(5));
//! }
//! # }
//! ```

mod slot;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::frame::DepthFrame;
use crate::receiver::{FrameSink, FrameSource, MulticastReceiver};
use crate::Result;

pub(crate) use slot::FrameSlot;
pub use slot::StreamerStats;

/// Streams depth frames from a multicast group and hands the latest one to a
/// polling consumer.
///
/// Exactly one frame is buffered between the delivery task and the consumer;
/// a newer frame replaces an unconsumed older one. A consumer that still
/// holds its previously acquired frame cannot acquire another until that
/// frame is dropped — holding frames too long throttles acquisition, it is
/// never an error.
///
/// Constructed via [`Client::open_depth_streamer`] or [`DepthFrameStreamer::open`];
/// the returned [`Arc`] is the shared-ownership handle callers clone freely.
///
/// [`Client::open_depth_streamer`]: crate::Client::open_depth_streamer
pub struct DepthFrameStreamer {
    slot: Arc<FrameSlot>,
    source: Box<dyn FrameSource>,
    config: StreamConfig,
    /// Serializes pause/resume transitions so concurrent control calls
    /// cannot interleave source stop/start out of order.
    control: tokio::sync::Mutex<()>,
    /// Cancelled at drop; fences off the delivery pipeline before the
    /// buffer is torn down.
    cancel: CancellationToken,
}

impl DepthFrameStreamer {
    /// Open a streamer on the given multicast endpoint and start delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the endpoint
    /// cannot be bound. Binding failure is fatal for this streamer instance
    /// and is not retried internally.
    pub async fn open(config: StreamConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let slot = FrameSlot::new();
        let cancel = CancellationToken::new();
        let sink = FrameSink::new(Arc::downgrade(&slot));
        let receiver =
            MulticastReceiver::bind(config.clone(), sink, cancel.child_token()).await?;

        let streamer = Self::activate(slot, Box::new(receiver), config, cancel).await?;
        info!(endpoint = %streamer.config.group_addr(), "depth streamer started");
        Ok(streamer)
    }

    /// Open a streamer over a custom frame source.
    ///
    /// Returns the streamer together with the [`FrameSink`] the source must
    /// deliver into. Intended for non-multicast pipelines and for tests that
    /// substitute a scripted source.
    pub async fn with_source(
        source: Box<dyn FrameSource>,
        config: StreamConfig,
    ) -> Result<(Arc<Self>, FrameSink)> {
        config.validate()?;

        let slot = FrameSlot::new();
        let sink = FrameSink::new(Arc::downgrade(&slot));
        let streamer = Self::activate(slot, source, config, CancellationToken::new()).await?;
        Ok((streamer, sink))
    }

    async fn activate(
        slot: Arc<FrameSlot>,
        source: Box<dyn FrameSource>,
        config: StreamConfig,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>> {
        // Initial state is Running: the pipeline starts before the streamer
        // is handed out.
        source.start().await?;

        Ok(Arc::new(Self { slot, source, config, control: tokio::sync::Mutex::new(()), cancel }))
    }

    /// Returns true iff a buffered, not-yet-acquired frame exists.
    ///
    /// Read under the slot mutex; does not mutate state and does not block
    /// beyond lock contention.
    pub fn is_new_frame_available(&self) -> bool {
        self.slot.is_available()
    }

    /// Take the latest buffered frame.
    ///
    /// Succeeds only when a frame is available *and* the previously acquired
    /// frame has been dropped. Both misses return `None`; neither is an
    /// error. The check and the take are one atomic operation — no other
    /// thread can observe the slot between them.
    pub fn acquire_latest_frame(&self) -> Option<DepthFrame> {
        self.slot.acquire()
    }

    /// Stop the delivery pipeline without discarding the buffered frame.
    ///
    /// Safe to call concurrently with an in-flight delivery: the pause gate
    /// and the delivery path share one critical section, so a delivery
    /// either lands before the gate flips or is dropped. Idempotent.
    pub async fn pause_streaming(&self) {
        let _transition = self.control.lock().await;
        if !self.slot.set_paused(true) {
            debug!("pause requested but streaming is already paused");
            return;
        }
        self.source.stop().await;
        debug!(endpoint = %self.config.group_addr(), "streaming paused");
    }

    /// Restart the delivery pipeline after [`pause_streaming`]. Idempotent.
    ///
    /// # Errors
    ///
    /// Restarting rebinds the receive socket, which can fail; the streamer
    /// then stays paused.
    ///
    /// [`pause_streaming`]: DepthFrameStreamer::pause_streaming
    pub async fn resume_streaming(&self) -> Result<()> {
        let _transition = self.control.lock().await;
        if !self.slot.is_paused() {
            debug!("resume requested but streaming is already running");
            return Ok(());
        }
        self.source.start().await?;
        self.slot.set_paused(false);
        debug!(endpoint = %self.config.group_addr(), "streaming resumed");
        Ok(())
    }

    /// Whether the streamer is currently paused.
    pub fn is_paused(&self) -> bool {
        self.slot.is_paused()
    }

    /// Slot traffic counters since construction.
    pub fn stats(&self) -> StreamerStats {
        self.slot.stats()
    }

    /// The stream's network configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl Drop for DepthFrameStreamer {
    fn drop(&mut self) {
        debug!(endpoint = %self.config.group_addr(), "dropping depth streamer");
        // Fence off the pipeline first, then release the buffered frame.
        // Deliveries racing the teardown fail their weak upgrade in the sink.
        self.cancel.cancel();
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameBuffer;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSource {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl FrameSource for Arc<RecordingSource> {
        async fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_config() -> StreamConfig {
        StreamConfig::new(Ipv4Addr::new(224, 1, 1, 1), 5000)
    }

    fn frame(sequence: u64) -> FrameBuffer {
        FrameBuffer {
            data: vec![0; 4],
            width: 2,
            height: 2,
            sequence,
            timestamp: Duration::from_micros(sequence),
        }
    }

    async fn recording_streamer() -> (Arc<DepthFrameStreamer>, FrameSink, Arc<RecordingSource>) {
        let source = Arc::new(RecordingSource::default());
        let (streamer, sink) =
            DepthFrameStreamer::with_source(Box::new(Arc::clone(&source)), test_config())
                .await
                .expect("streamer construction");
        (streamer, sink, source)
    }

    #[tokio::test]
    async fn construction_starts_the_source() {
        let (_streamer, _sink, source) = recording_streamer().await;
        assert_eq!(source.starts.load(Ordering::SeqCst), 1);
        assert_eq!(source.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_config_fails_construction() {
        let source = Arc::new(RecordingSource::default());
        let config = StreamConfig::new(Ipv4Addr::new(10, 0, 0, 1), 5000);
        let result = DepthFrameStreamer::with_source(Box::new(source), config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pause_and_resume_drive_the_source_once_each() {
        let (streamer, _sink, source) = recording_streamer().await;

        streamer.pause_streaming().await;
        streamer.pause_streaming().await;
        assert_eq!(source.stops.load(Ordering::SeqCst), 1, "second pause is a no-op");
        assert!(streamer.is_paused());

        streamer.resume_streaming().await.expect("resume");
        streamer.resume_streaming().await.expect("second resume");
        assert_eq!(source.starts.load(Ordering::SeqCst), 2, "initial start + one resume");
        assert!(!streamer.is_paused());
    }

    #[tokio::test]
    async fn delivery_after_drop_is_fenced_off() {
        let (streamer, sink, _source) = recording_streamer().await;
        sink.deliver(frame(1));
        assert!(streamer.is_new_frame_available());

        drop(streamer);
        // The slot is gone; delivery degrades to a silent drop.
        sink.deliver(frame(2));
    }

    #[tokio::test]
    async fn poll_surface_reflects_slot_state() {
        let (streamer, sink, _source) = recording_streamer().await;

        assert!(!streamer.is_new_frame_available());
        assert!(streamer.acquire_latest_frame().is_none());

        sink.deliver(frame(1));
        assert!(streamer.is_new_frame_available());

        let held = streamer.acquire_latest_frame().expect("frame available");
        assert_eq!(held.sequence(), 1);
        assert!(!streamer.is_new_frame_available());
    }
}
