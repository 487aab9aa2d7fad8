//! Packet sources: a live NIC handle or an offline capture file, behind one
//! enum so the capture loop does not care which it is driving.
//!
//! Live handles are opened with a BPF port filter, full snaplen, and a
//! short read timeout; the timeout is what makes external cancellation
//! observable, since the loop re-checks its cancel flag on every timed-out
//! read.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no capture device available")]
    NoDevice,
    #[error("capture error: {0}")]
    Capture(#[from] pcap::Error),
}

/// One captured frame with its capture timestamp in epoch milliseconds.
#[derive(Debug, Clone)]
pub struct Frame {
    pub ts_ms: i64,
    pub data: Vec<u8>,
}

/// Outcome of one read attempt.
#[derive(Debug)]
pub enum Poll {
    Frame(Frame),
    /// The read timed out with no packet; retry after a short sleep.
    TimedOut,
    /// End of a capture file.
    Eof,
}

/// Capture statistics for progress reporting on live handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStats {
    pub received: u32,
    pub dropped: u32,
}

pub enum Source {
    Live(pcap::Capture<pcap::Active>),
    Offline(pcap::Capture<pcap::Offline>),
}

impl Source {
    /// Opens a live capture on `iface`, or on the platform default device
    /// when `iface` is `None`. Filters to the monitored ports in-kernel.
    pub fn live(iface: Option<&str>, ports: &[u16]) -> Result<Self, SourceError> {
        let device = match iface {
            Some(name) => pcap::Device::from(name),
            None => pcap::Device::lookup()?.ok_or(SourceError::NoDevice)?,
        };
        info!("opening live capture on {}", device.name);

        let mut capture = pcap::Capture::from_device(device)?
            .snaplen(65_536)
            .promisc(false)
            .timeout(1_000)
            .open()?;
        let filter = port_filter(ports);
        debug!("applying filter: {filter}");
        capture.filter(&filter, true)?;
        Ok(Source::Live(capture))
    }

    /// Opens a capture file. The port filter still applies so that frames
    /// captured with a wider filter are narrowed to the monitored ports.
    pub fn offline(path: &Path, ports: &[u16]) -> Result<Self, SourceError> {
        info!("reading capture file {}", path.display());
        let mut capture = pcap::Capture::from_file(path)?;
        capture.filter(&port_filter(ports), true)?;
        Ok(Source::Offline(capture))
    }

    /// Reads the next frame, mapping the library's timeout and
    /// end-of-capture conditions into [`Poll`].
    pub fn next_frame(&mut self) -> Result<Poll, SourceError> {
        let result = match self {
            Source::Live(capture) => capture.next_packet(),
            Source::Offline(capture) => capture.next_packet(),
        };
        match result {
            Ok(packet) => {
                let header = packet.header;
                let ts_ms =
                    header.ts.tv_sec as i64 * 1_000 + header.ts.tv_usec as i64 / 1_000;
                Ok(Poll::Frame(Frame {
                    ts_ms,
                    data: packet.data.to_vec(),
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(Poll::TimedOut),
            Err(pcap::Error::NoMorePackets) => Ok(Poll::Eof),
            Err(error) => Err(error.into()),
        }
    }

    /// Receiver-side statistics; zero for offline files.
    pub fn stats(&mut self) -> SourceStats {
        match self {
            Source::Live(capture) => capture
                .stats()
                .map(|stats| SourceStats {
                    received: stats.received,
                    dropped: stats.dropped,
                })
                .unwrap_or_default(),
            Source::Offline(_) => SourceStats::default(),
        }
    }
}

/// Builds the BPF expression `port P1 or port P2 …`.
fn port_filter(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|port| format!("port {port}"))
        .collect::<Vec<_>>()
        .join(" or ")
}
