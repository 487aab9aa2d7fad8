//! RPC frame reassembly.
//!
//! RegionServer RPC messages are length-prefixed: a 4-byte big-endian
//! integer N followed by N bytes. A message may span multiple TCP segments;
//! a segment carries at most one message. This module accumulates
//! per-client fragments until a frame completes.
//!
//! The observer also sees payloads that are not the start of an RPC at all:
//! the connection preamble, SASL exchanges, `ConnectionHeader` frames, and
//! mid-stream fragments of frames whose start was never captured. The
//! length validity filter drops those without touching any state.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use crate::packet::ClientKey;

/// Frames longer than this cannot be real RPC messages; a prefix decoding
/// to such a value marks a payload that is not a frame start.
const MAX_FRAME_LEN: usize = 1 << 30;

/// An RPC frame in flight, waiting for more fragments.
#[derive(Debug)]
pub struct FragmentBuffer {
    /// Timestamp of the most recent fragment, for eviction.
    pub ts: i64,
    /// Bytes collected so far, prefix excluded.
    pub accumulator: BytesMut,
    /// Declared frame length from the 4-byte prefix.
    pub total: usize,
    /// Bytes still to collect. Invariant: `0 <= remains <= total` and
    /// `accumulator.len() + remains == total`.
    pub remains: usize,
}

impl FragmentBuffer {
    /// Heap bytes this buffer stands for, counting what is still expected.
    pub fn expected_memory(&self) -> u64 {
        (self.remains + self.accumulator.len()) as u64
    }
}

/// Feeds one TCP payload into the per-client reassembly state. Returns the
/// completed frame body when this payload finishes one.
pub fn ingest(
    buffers: &mut HashMap<ClientKey, FragmentBuffer>,
    client: ClientKey,
    payload: &[u8],
    ts: i64,
) -> Option<Vec<u8>> {
    match buffers.remove(&client) {
        None => {
            let declared = if payload.len() >= 4 {
                u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize
            } else {
                0
            };
            if declared == 0 || declared >= MAX_FRAME_LEN {
                return None;
            }
            let body = &payload[4..];
            if body.len() >= declared {
                return Some(body[..declared].to_vec());
            }
            let mut accumulator = BytesMut::with_capacity(declared);
            accumulator.put_slice(body);
            buffers.insert(
                client,
                FragmentBuffer {
                    ts,
                    total: declared,
                    remains: declared - body.len(),
                    accumulator,
                },
            );
            None
        }
        Some(mut buffer) => {
            let take = payload.len().min(buffer.remains);
            buffer.accumulator.put_slice(&payload[..take]);
            buffer.remains -= take;
            if buffer.remains == 0 {
                Some(buffer.accumulator.to_vec())
            } else {
                buffer.ts = ts;
                buffers.insert(client, buffer);
                None
            }
        }
    }
}

/// Drops any in-flight frame for `client`. Called when downstream decoding
/// fails: the stream position for that client is no longer trustworthy.
pub fn discard(buffers: &mut HashMap<ClientKey, FragmentBuffer>, client: ClientKey) {
    buffers.remove(&client);
}
