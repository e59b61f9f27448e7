//! Benchmarks for the deliver→acquire frame hand-off
//!
//! Measures the single-slot exchange in isolation (scripted source, no
//! network): how long a frame takes to cross from the delivery path to the
//! consumer, and the cost of the polling check.
//!
//! Run with: `cargo bench --features benchmark`

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use depthcast::{DepthFrameStreamer, FrameBuffer, FrameSink, FrameSource, Result, StreamConfig};
use std::sync::Arc;

struct NullSource;

#[async_trait::async_trait]
impl FrameSource for NullSource {
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) {}
}

fn streamer_fixture() -> (Arc<DepthFrameStreamer>, FrameSink) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        DepthFrameStreamer::with_source(
            Box::new(NullSource),
            StreamConfig::new("239.255.42.42".parse().unwrap(), 5000),
        )
        .await
        .expect("streamer")
    })
}

fn qvga_frame(sequence: u64) -> FrameBuffer {
    FrameBuffer {
        data: vec![1_200; 320 * 240],
        width: 320,
        height: 240,
        sequence,
        timestamp: Duration::from_micros(sequence * 33_333),
    }
}

fn bench_handoff(c: &mut Criterion) {
    let (streamer, sink) = streamer_fixture();
    let mut sequence = 0u64;

    c.bench_function("deliver_acquire_roundtrip_qvga", |b| {
        b.iter(|| {
            sequence += 1;
            sink.deliver(black_box(qvga_frame(sequence)));
            let frame = streamer.acquire_latest_frame().expect("frame available");
            black_box(frame.sequence());
            // Dropping the frame re-arms the acquisition gate.
        })
    });
}

fn bench_poll_miss(c: &mut Criterion) {
    let (streamer, _sink) = streamer_fixture();

    c.bench_function("poll_empty_slot", |b| {
        b.iter(|| {
            black_box(streamer.is_new_frame_available());
            black_box(streamer.acquire_latest_frame().is_none());
        })
    });
}

criterion_group!(benches, bench_handoff, bench_poll_miss);
criterion_main!(benches);
