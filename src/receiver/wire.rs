//! Datagram wire format for depth frames
//!
//! One datagram carries one complete frame. Binary layout (all integers
//! big-endian):
//!
//! ```text
//! [0..4]    magic          "DPFS" (0x44504653)
//! [4..12]   sequence       u64, sender-assigned frame counter
//! [12..20]  timestamp_us   u64, capture time since the sender's stream epoch
//! [20..22]  width          u16, pixels
//! [22..24]  height         u16, pixels
//! [24..]    payload        width*height u16 depth samples, millimeters
//! ```

use std::time::Duration;

use crate::frame::FrameBuffer;
use crate::{Result, StreamError};

const MAGIC: u32 = 0x4450_4653; // "DPFS"

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 24;

/// Decode one datagram into a [`FrameBuffer`].
///
/// # Errors
///
/// Returns a [`StreamError::Decode`] when the datagram is truncated, carries
/// the wrong magic, or its payload length disagrees with the declared
/// dimensions.
pub fn decode(datagram: &[u8]) -> Result<FrameBuffer> {
    if datagram.len() < HEADER_LEN {
        return Err(StreamError::decode_error(
            "frame header",
            format!("datagram of {} bytes is shorter than the header", datagram.len()),
        ));
    }

    let magic = u32::from_be_bytes(datagram[0..4].try_into().expect("sliced to 4 bytes"));
    if magic != MAGIC {
        return Err(StreamError::decode_error(
            "frame header",
            format!("bad magic {magic:#010x}"),
        ));
    }

    let sequence = u64::from_be_bytes(datagram[4..12].try_into().expect("sliced to 8 bytes"));
    let timestamp_us = u64::from_be_bytes(datagram[12..20].try_into().expect("sliced to 8 bytes"));
    let width = u16::from_be_bytes(datagram[20..22].try_into().expect("sliced to 2 bytes"));
    let height = u16::from_be_bytes(datagram[22..24].try_into().expect("sliced to 2 bytes"));

    let payload = &datagram[HEADER_LEN..];
    let expected = width as usize * height as usize * 2;
    if payload.len() != expected {
        return Err(StreamError::decode_error(
            "frame payload",
            format!("{}x{} frame needs {expected} payload bytes, got {}", width, height, payload.len()),
        ));
    }

    let data = payload
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    Ok(FrameBuffer {
        data,
        width,
        height,
        sequence,
        timestamp: Duration::from_micros(timestamp_us),
    })
}

/// Encode a [`FrameBuffer`] into a datagram. The inverse of [`decode`];
/// used by senders and by tests.
pub fn encode(frame: &FrameBuffer) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(HEADER_LEN + frame.data.len() * 2);
    datagram.extend_from_slice(&MAGIC.to_be_bytes());
    datagram.extend_from_slice(&frame.sequence.to_be_bytes());
    datagram.extend_from_slice(&(frame.timestamp.as_micros() as u64).to_be_bytes());
    datagram.extend_from_slice(&frame.width.to_be_bytes());
    datagram.extend_from_slice(&frame.height.to_be_bytes());
    for sample in &frame.data {
        datagram.extend_from_slice(&sample.to_be_bytes());
    }
    datagram
}
