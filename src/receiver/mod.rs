//! Frame delivery pipeline
//!
//! [`MulticastReceiver`] joins a multicast group and runs a background task
//! that decodes depth-frame datagrams and pushes them into the streamer's
//! [`FrameSink`]. The streamer depends on the pipeline only through the
//! [`FrameSource`] trait, so alternative pipelines (including scripted test
//! sources) plug in at the same seam.

pub mod wire;

use std::sync::Weak;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::StreamConfig;
use crate::frame::FrameBuffer;
use crate::streamer::FrameSlot;
use crate::Result;
use crate::StreamError;

/// Largest datagram the receiver accepts (UDP payload limit).
const MAX_DATAGRAM: usize = 65_507;

/// Consecutive socket errors tolerated before the receive task gives up.
const MAX_ERRORS: u32 = 10;

/// A delivery pipeline the streamer can start and stop.
///
/// `start` is called once at streamer construction and again on every
/// resume; `stop` on every pause. Both must be idempotent. Implementations
/// deliver decoded frames through the [`FrameSink`] they were built with.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Start (or restart) delivery.
    ///
    /// # Errors
    ///
    /// Restarting may need to re-establish network resources and can fail;
    /// the caller then stays paused.
    async fn start(&self) -> Result<()>;

    /// Stop delivery. Returns after the pipeline no longer pushes frames.
    async fn stop(&self);
}

/// Delivery capability handed to a [`FrameSource`].
///
/// Holds the streamer's buffer slot weakly: once the streamer is torn down,
/// delivery degrades to a silent drop, so a lagging pipeline can never touch
/// freed state.
#[derive(Clone)]
pub struct FrameSink {
    slot: Weak<FrameSlot>,
}

impl FrameSink {
    pub(crate) fn new(slot: Weak<FrameSlot>) -> Self {
        Self { slot }
    }

    /// Deliver one decoded frame to the streamer.
    ///
    /// Never blocks on the consumer: an unconsumed previous frame is
    /// replaced (latest-frame-wins).
    pub fn deliver(&self, frame: FrameBuffer) {
        match self.slot.upgrade() {
            Some(slot) => slot.deliver(frame),
            None => trace!(sequence = frame.sequence, "delivery after teardown dropped"),
        }
    }
}

/// UDP multicast receive pipeline.
///
/// Binds the configured port, joins the multicast group on the configured
/// interface, and decodes one frame per datagram (see [`wire`]).
pub struct MulticastReceiver {
    config: StreamConfig,
    sink: FrameSink,
    /// Parent token owned by the streamer; cancelling it fences off the
    /// receive task even without an explicit stop.
    lifetime: CancellationToken,
    state: tokio::sync::Mutex<ReceiverState>,
}

struct ReceiverState {
    /// Socket bound at construction, consumed by the first start. Restarts
    /// rebind.
    socket: Option<UdpSocket>,
    task: Option<JoinHandle<()>>,
    run: Option<CancellationToken>,
}

impl MulticastReceiver {
    /// Bind the endpoint and join the multicast group.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Bind`] when the port cannot be bound or the
    /// group cannot be joined. This is fatal for the streamer being
    /// constructed.
    pub async fn bind(
        config: StreamConfig,
        sink: FrameSink,
        lifetime: CancellationToken,
    ) -> Result<Self> {
        let socket = Self::bind_socket(&config).await?;
        info!(group = %config.group_addr(), interface = %config.interface, "multicast endpoint bound");

        Ok(Self {
            config,
            sink,
            lifetime,
            state: tokio::sync::Mutex::new(ReceiverState {
                socket: Some(socket),
                task: None,
                run: None,
            }),
        })
    }

    async fn bind_socket(config: &StreamConfig) -> Result<UdpSocket> {
        let socket = UdpSocket::bind(config.socket_addr())
            .await
            .map_err(|e| StreamError::bind_failed(config.group_addr(), e))?;
        socket
            .join_multicast_v4(config.group, config.interface)
            .map_err(|e| StreamError::bind_failed(config.group_addr(), e))?;
        Ok(socket)
    }
}

#[async_trait::async_trait]
impl FrameSource for MulticastReceiver {
    async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("receive task already running");
            return Ok(());
        }

        let socket = match state.socket.take() {
            Some(socket) => socket,
            None => Self::bind_socket(&self.config).await?,
        };

        let run = self.lifetime.child_token();
        let task =
            tokio::spawn(receive_task(socket, self.config.clone(), self.sink.clone(), run.clone()));
        state.run = Some(run);
        state.task = Some(task);
        Ok(())
    }

    async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(run) = state.run.take() {
            run.cancel();
        }
        if let Some(task) = state.task.take() {
            // Wait for the task so no delivery is attempted after stop
            // returns.
            let _ = task.await;
        }
    }
}

/// Receive loop: one datagram, one decoded frame, one delivery.
async fn receive_task(
    socket: UdpSocket,
    config: StreamConfig,
    sink: FrameSink,
    cancel: CancellationToken,
) {
    info!(group = %config.group_addr(), "receive task started");
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut frame_count = 0u64;
    let mut error_count = 0u32;

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("receive task cancelled");
                break;
            }
            received = tokio::time::timeout(config.latency, socket.recv_from(&mut buf)) => received,
        };

        match received {
            Err(_elapsed) => {
                debug!(bound = ?config.latency, "no datagram within latency bound");
            }
            Ok(Ok((len, source))) => {
                error_count = 0;
                match wire::decode(&buf[..len]) {
                    Ok(frame) => {
                        frame_count += 1;
                        trace!(
                            sequence = frame.sequence,
                            width = frame.width,
                            height = frame.height,
                            "frame {} decoded",
                            frame_count
                        );
                        sink.deliver(frame);
                    }
                    Err(e) => {
                        warn!(%source, error = %e, "dropping malformed datagram");
                    }
                }
            }
            Ok(Err(e)) => {
                error_count += 1;
                error!("socket error ({}/{}): {}", error_count, MAX_ERRORS, e);
                if error_count >= MAX_ERRORS {
                    error!("too many socket errors, stopping receive task");
                    break;
                }
                // Exponential backoff: 100ms, 200ms, 400ms, ...
                let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                tokio::time::sleep(backoff).await;
            }
        }
    }

    info!("receive task ended ({} frames)", frame_count);
}
