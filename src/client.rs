//! Client owning the streamers of one multicast session
//!
//! A [`Client`] fixes the multicast group, interface, and latency bound for
//! a capture session and owns the streamers opened on it. It holds the
//! canonical strong reference to each streamer and hands out clones, so
//! callers never manage streamer lifetime themselves.
//!
//! ```rust,no_run
//! use depthcast::Client;
//!
//! # #[tokio::main]
//! # async fn main() -> depthcast::Result<()> {
//! let client = Client::new("224.1.1.1".parse().unwrap())?;
//! let streamer = client.open_depth_streamer().await?;
//!
//! if let Some(frame) = streamer.acquire_latest_frame() {
//!     println!("depth at center: {:?}", frame.depth_at(frame.width() / 2, frame.height() / 2));
//! }
//! # Ok(())
//! # }
//! ```

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{DEFAULT_DEPTH_PORT, DEFAULT_LATENCY, StreamConfig};
use crate::streamer::DepthFrameStreamer;
use crate::{Result, StreamError};

/// Owns the streamers of one multicast capture session.
pub struct Client {
    group: Ipv4Addr,
    interface: Ipv4Addr,
    latency: Duration,
    depth: Mutex<Option<Arc<DepthFrameStreamer>>>,
}

impl Client {
    /// Create a client for the given multicast group.
    ///
    /// # Errors
    ///
    /// Returns an error when `group` is not a multicast address.
    pub fn new(group: Ipv4Addr) -> Result<Self> {
        if !group.is_multicast() {
            return Err(StreamError::invalid_config(format!(
                "{group} is not a multicast address"
            )));
        }
        Ok(Self {
            group,
            interface: Ipv4Addr::UNSPECIFIED,
            latency: DEFAULT_LATENCY,
            depth: Mutex::new(None),
        })
    }

    /// Select the local interface on which streamers join the group.
    pub fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = interface;
        self
    }

    /// Set the receive latency bound used by streamers.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Open the depth-frame streamer for this session.
    ///
    /// The stream starts delivering immediately. The client keeps the
    /// canonical reference; the returned handle is a clone of it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AlreadyOpen`] when a depth streamer is already
    /// open, or a bind error when the endpoint cannot be established.
    pub async fn open_depth_streamer(&self) -> Result<Arc<DepthFrameStreamer>> {
        if self.depth.lock().is_some() {
            return Err(StreamError::AlreadyOpen);
        }

        let config = StreamConfig::new(self.group, DEFAULT_DEPTH_PORT)
            .with_interface(self.interface)
            .with_latency(self.latency);
        let streamer = DepthFrameStreamer::open(config).await?;

        let mut depth = self.depth.lock();
        if depth.is_some() {
            // A concurrent open won the race; discard ours.
            return Err(StreamError::AlreadyOpen);
        }
        *depth = Some(Arc::clone(&streamer));
        info!(group = %self.group, "depth streamer opened");
        Ok(streamer)
    }

    /// Shared-ownership accessor for the open depth streamer, if any.
    pub fn depth_streamer(&self) -> Option<Arc<DepthFrameStreamer>> {
        self.depth.lock().clone()
    }

    /// Close the depth stream.
    ///
    /// Pauses delivery first so the pipeline is quiet even while stale
    /// handles to the streamer are still held elsewhere, then drops the
    /// canonical reference.
    pub async fn close_depth_streamer(&self) {
        let streamer = self.depth.lock().take();
        if let Some(streamer) = streamer {
            streamer.pause_streaming().await;
            debug!(group = %self.group, "depth streamer closed");
        }
    }

    /// The multicast group this session subscribes to.
    pub fn group(&self) -> Ipv4Addr {
        self.group
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("group", &self.group)
            .field("interface", &self.interface)
            .field("latency", &self.latency)
            .field("depth_open", &self.depth.lock().is_some())
            .finish()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // The canonical streamer reference drops with the client; the
        // streamer's own Drop fences off its pipeline.
        debug!(group = %self.group, "client dropped");
    }
}
