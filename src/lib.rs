//! Client library for multicast depth-camera frame streams.
//!
//! Depthcast receives depth frames published to a UDP multicast group and
//! hands the latest one to a polling consumer, bridging the asynchronous
//! network delivery path with an application thread that runs at its own
//! cadence.
//!
//! # Design
//!
//! - **Latest-frame-wins**: exactly one frame is buffered between the
//!   receive task and the consumer; a newer frame replaces an unconsumed
//!   older one. There is no queue and no blocking wait on either side.
//! - **Release-gated acquisition**: a consumer that still holds its
//!   previously acquired [`DepthFrame`] cannot acquire another until the
//!   handle is dropped. Holding a frame too long throttles acquisition;
//!   it is never an error.
//! - **Pause/resume**: [`DepthFrameStreamer::pause_streaming`] stops the
//!   receive pipeline without discarding the buffered frame;
//!   [`DepthFrameStreamer::resume_streaming`] restarts it. Both are
//!   idempotent and cannot race an in-flight delivery.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use depthcast::Client;
//!
//! #[tokio::main]
//! async fn main() -> depthcast::Result<()> {
//!     let client = Client::new("224.1.1.1".parse().unwrap())?;
//!     let streamer = client.open_depth_streamer().await?;
//!
//!     loop {
//!         if streamer.is_new_frame_available() {
//!             if let Some(frame) = streamer.acquire_latest_frame() {
//!                 println!("frame {}: {}x{}", frame.sequence(), frame.width(), frame.height());
//!             }
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(5)).await;
//!     }
//! }
//! ```

// Core types and error handling
mod client;
mod config;
mod error;
mod frame;

// Delivery pipeline and consumer surface
pub mod receiver;
pub mod streamer;

// Core exports
pub use client::Client;
pub use config::{DEFAULT_DEPTH_PORT, DEFAULT_LATENCY, StreamConfig};
pub use error::{Result, StreamError};
pub use frame::{DepthFrame, FrameBuffer};

// Pipeline exports
pub use receiver::{FrameSink, FrameSource, MulticastReceiver};
pub use streamer::{DepthFrameStreamer, StreamerStats};
