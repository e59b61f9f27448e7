//! End-to-end receive path over real UDP multicast
//!
//! Requires a multicast-capable network stack, so the tests are opt-in:
//! `cargo test -- --ignored multicast`

use std::net::SocketAddr;
use std::time::Duration;

use depthcast::{DepthFrameStreamer, FrameBuffer, StreamConfig, receiver::wire};

fn test_frame(sequence: u64) -> FrameBuffer {
    FrameBuffer {
        data: (0..64 * 48).map(|i| 500 + (i % 4000) as u16).collect(),
        width: 64,
        height: 48,
        sequence,
        timestamp: Duration::from_micros(sequence * 33_333),
    }
}

#[tokio::test]
#[ignore = "multicast_required"]
async fn frames_flow_from_socket_to_consumer() {
    let group = "239.255.77.7".parse().unwrap();
    let port = 56_700;
    let config = StreamConfig::new(group, port).with_latency(Duration::from_millis(100));

    let streamer = DepthFrameStreamer::open(config).await.expect("open streamer");

    let sender = tokio::net::UdpSocket::bind("0.0.0.0:0").await.expect("sender bind");
    let target = SocketAddr::from((group, port));

    // Publish until the receive task picks a frame up or the deadline hits.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let mut sequence = 0u64;
    let frame = loop {
        sequence += 1;
        let datagram = wire::encode(&test_frame(sequence));
        sender.send_to(&datagram, &target).await.expect("send frame");

        if let Some(frame) = streamer.acquire_latest_frame() {
            break frame;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("no frame received within deadline");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    assert_eq!(frame.width(), 64);
    assert_eq!(frame.height(), 48);
    assert!(frame.sequence() >= 1);
    assert_eq!(frame.depth_at(0, 0), Some(500));
}

#[tokio::test]
#[ignore = "multicast_required"]
async fn paused_streamer_ignores_traffic() {
    let group = "239.255.77.8".parse().unwrap();
    let port = 56_701;
    let config = StreamConfig::new(group, port).with_latency(Duration::from_millis(100));

    let streamer = DepthFrameStreamer::open(config).await.expect("open streamer");
    streamer.pause_streaming().await;

    let sender = tokio::net::UdpSocket::bind("0.0.0.0:0").await.expect("sender bind");
    let target = SocketAddr::from((group, port));
    for sequence in 1..=20 {
        let datagram = wire::encode(&test_frame(sequence));
        sender.send_to(&datagram, &target).await.expect("send frame");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(!streamer.is_new_frame_available(), "paused streamer must not buffer frames");

    streamer.resume_streaming().await.expect("resume");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let datagram = wire::encode(&test_frame(99));
        sender.send_to(&datagram, &target).await.expect("send frame");

        if streamer.is_new_frame_available() {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("no frame received after resume");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
