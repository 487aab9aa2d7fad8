//! The pipeline driver.
//!
//! [`Pipeline::process`] is the per-packet composition: packet view →
//! framer → decoder → call table → scanner tracker → sink. [`run`] drives
//! it from a [`Source`], applying the progress/eviction tick, the
//! count/duration limits, and the cancellation flag.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::evict::Evictor;
use crate::rpc::{self, DecodeError, FrameMeta};
use crate::sink::{self, Sink, SinkError};
use crate::source::{Poll, Source};
use crate::state::SnifferState;
use crate::{framer, packet};

/// Sleep between retries after a timed-out read; bounds cancellation
/// latency for live captures.
const RETRY_SLEEP: Duration = Duration::from_millis(100);
/// Progress/eviction tick interval.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);
/// Packet count that forces a tick even under a fast wall clock.
const REPORT_PACKETS: u64 = 10_000;

/// Limits a capture run honors beyond EOF and cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureLimits {
    /// Stop after this many packets.
    pub count: Option<u64>,
    /// Stop after this much wall time.
    pub duration: Option<Duration>,
}

/// Totals reported when a run ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureSummary {
    pub packets: u64,
    /// Capture-time span between first and last packet, milliseconds.
    pub span_ms: i64,
}

/// The stateful stream processor: all per-client and per-scanner state plus
/// the monitored port set.
pub struct Pipeline {
    ports: HashSet<u16>,
    pub state: SnifferState,
}

impl Pipeline {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: ports.into_iter().collect(),
            state: SnifferState::new(),
        }
    }

    /// Feeds one captured frame through the pipeline. Decode failures
    /// discard the client's fragment buffer and are otherwise non-fatal;
    /// only sink errors propagate.
    pub fn process(
        &mut self,
        data: &[u8],
        ts: i64,
        sink: &mut dyn Sink,
    ) -> std::result::Result<(), SinkError> {
        let Some(view) = packet::parse(data, &self.ports) else {
            return Ok(());
        };
        let direction = view.direction(&self.ports);
        let client = view.client(direction);
        let meta = FrameMeta {
            client,
            server: view.server(direction),
            ts,
        };

        let Some(frame) = framer::ingest(&mut self.state.fragments, client, view.payload, ts)
        else {
            return Ok(());
        };

        let decoded = if direction.is_inbound() {
            rpc::decode_request(&frame, meta).inspect(|event| {
                self.state.store_call(client, event);
            })
        } else {
            rpc::decode_response(&frame, meta, |call_id| {
                self.state.take_call(client, call_id).map(|call| call.0)
            })
        };

        match decoded {
            Ok(mut event) => {
                self.state.track_scanner(client, direction, &mut event);
                sink::dispatch(sink, event)?;
            }
            // Not an RPC frame after all; resynchronize silently.
            Err(DecodeError::InvalidProtobuf(_)) => {
                framer::discard(&mut self.state.fragments, client);
            }
            Err(error) => {
                framer::discard(&mut self.state.fragments, client);
                warn!("dropping frame from {client}: {error}");
            }
        }
        Ok(())
    }
}

/// Drives `pipeline` from `source` until EOF, cancellation, or a limit.
/// Returns the run totals; the handle is released when `source` drops.
pub fn run(
    source: &mut Source,
    pipeline: &mut Pipeline,
    sink: &mut dyn Sink,
    evictor: &Evictor,
    limits: CaptureLimits,
    cancel: &AtomicBool,
) -> Result<CaptureSummary> {
    let started = Instant::now();
    let mut seen: u64 = 0;
    let mut first_ts: Option<i64> = None;
    let mut latest_ts: i64 = 0;
    let mut report_seen: u64 = 0;
    let mut report_wall = Instant::now();

    let over_duration =
        |started: Instant| limits.duration.is_some_and(|limit| started.elapsed() >= limit);

    loop {
        if cancel.load(Ordering::Relaxed) {
            info!("capture cancelled");
            break;
        }

        let frame = match source.next_frame()? {
            Poll::Eof => {
                debug!("end of capture");
                break;
            }
            Poll::TimedOut => {
                if over_duration(started) {
                    break;
                }
                std::thread::sleep(RETRY_SLEEP);
                continue;
            }
            Poll::Frame(frame) => frame,
        };

        latest_ts = frame.ts_ms;
        first_ts.get_or_insert(latest_ts);
        pipeline.process(&frame.data, latest_ts, sink)?;
        seen += 1;

        if report_wall.elapsed() >= REPORT_INTERVAL || seen - report_seen >= REPORT_PACKETS {
            let stats = source.stats();
            info!(
                "processed {seen} packet(s), received {}, dropped {}",
                stats.received, stats.dropped
            );
            evictor.sweep(&mut pipeline.state, latest_ts);
            report_seen = seen;
            report_wall = Instant::now();
        }

        if limits.count.is_some_and(|limit| seen >= limit) {
            info!("packet count limit reached");
            break;
        }
        if over_duration(started) {
            info!("capture duration limit reached");
            break;
        }
    }

    let summary = CaptureSummary {
        packets: seen,
        span_ms: first_ts.map_or(0, |first| latest_ts - first),
    };
    let stats = source.stats();
    info!(
        "capture finished: {} packet(s) in {} ms of capture time, received {}, dropped {}",
        summary.packets, summary.span_ms, stats.received, stats.dropped
    );
    Ok(summary)
}
