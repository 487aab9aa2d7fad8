//! The observer's mutable state: fragment buffers, the call table, and the
//! scanner lifecycle records, owned as one bundle and mutated in place by
//! the capture loop.
//!
//! `call_id` is per-connection and reused, so every call-scoped map is
//! keyed by `(ClientKey, call_id)`. Scanner records are keyed by the
//! server-minted scanner id alone, which is global.

use std::collections::HashMap;

use crate::event::Event;
use crate::framer::FragmentBuffer;
use crate::packet::{ClientKey, Direction};

pub type CallKey = (ClientKey, u32);

/// The stored inbound request awaiting its response.
#[derive(Debug, Clone)]
pub struct CallRecord(pub Event);

impl CallRecord {
    pub fn ts(&self) -> i64 {
        self.0.ts
    }
}

/// A scan request whose response, which will reveal the minted scanner id,
/// has not yet arrived.
#[derive(Debug, Clone)]
pub struct PendingScan {
    pub table: Option<String>,
    pub region: Option<String>,
    pub row: Option<String>,
    pub ts: i64,
}

impl PendingScan {
    fn of(event: &Event) -> Self {
        Self {
            table: event.table.clone(),
            region: event.region.clone(),
            row: event.row.clone(),
            ts: event.ts,
        }
    }
}

/// A live server-side scanner: exists from the observed open response until
/// the observed close request.
#[derive(Debug, Clone)]
pub struct ScannerRecord {
    pub table: Option<String>,
    pub region: Option<String>,
    pub ts: i64,
}

/// The scanner-lifecycle operations, dispatched as tagged variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOp {
    Open,
    Next,
    Close,
    Small,
}

impl ScanOp {
    /// Maps a refined method name to its lifecycle operation; `None` for
    /// non-scan methods.
    pub fn of_method(method: &str) -> Option<Self> {
        match method {
            "open-scanner" => Some(ScanOp::Open),
            "next-rows" => Some(ScanOp::Next),
            "close-scanner" => Some(ScanOp::Close),
            "small-scan" => Some(ScanOp::Small),
            _ => None,
        }
    }
}

/// All per-stream observer state.
#[derive(Debug, Default)]
pub struct SnifferState {
    pub fragments: HashMap<ClientKey, FragmentBuffer>,
    pub calls: HashMap<CallKey, CallRecord>,
    pub pending_scans: HashMap<CallKey, PendingScan>,
    pub scanners: HashMap<u64, ScannerRecord>,
}

impl SnifferState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an inbound request, overwriting any stale entry left by a
    /// reused call id on the same connection.
    pub fn store_call(&mut self, client: ClientKey, event: &Event) {
        self.calls
            .insert((client, event.call_id), CallRecord(event.clone()));
    }

    /// Removes and returns the request a response answers.
    pub fn take_call(&mut self, client: ClientKey, call_id: u32) -> Option<CallRecord> {
        self.calls.remove(&(client, call_id))
    }

    /// Advances the scanner state machine for a decoded scan event and
    /// augments the event with whatever attribution the machine holds.
    ///
    /// Unknown scanner ids are not an error: the open may simply never have
    /// been captured. The event is emitted regardless.
    pub fn track_scanner(&mut self, client: ClientKey, direction: Direction, event: &mut Event) {
        let Some(op) = ScanOp::of_method(&event.method) else {
            return;
        };
        let key = (client, event.call_id);
        match (op, direction) {
            // A scan opens: remember the request until the response mints
            // the scanner id.
            (ScanOp::Open | ScanOp::Small, Direction::Inbound) => {
                self.pending_scans.insert(key, PendingScan::of(event));
            }
            // The open response: promote the pending request to a live
            // scanner under the minted id.
            (ScanOp::Open, Direction::Outbound) => {
                if let Some(pending) = self.pending_scans.remove(&key) {
                    event.merge_attribution(&pending.table, &pending.region, &pending.row);
                    if let Some(scanner_id) = event.scanner {
                        self.scanners.insert(
                            scanner_id,
                            ScannerRecord {
                                table: pending.table,
                                region: pending.region,
                                ts: event.ts,
                            },
                        );
                    }
                }
            }
            // Row fetches keep the scanner alive and inherit its region.
            (ScanOp::Next, _) => {
                if let Some(scanner_id) = event.scanner
                    && let Some(record) = self.scanners.get_mut(&scanner_id)
                {
                    record.ts = event.ts;
                    let (table, region) = (record.table.clone(), record.region.clone());
                    event.merge_attribution(&table, &region, &None);
                }
            }
            // The close request retires the scanner; the response needs no
            // handling of its own.
            (ScanOp::Close, Direction::Inbound) => {
                if let Some(scanner_id) = event.scanner {
                    self.scanners.remove(&scanner_id);
                }
            }
            // A small scan opens and closes in one exchange; the response
            // just clears the pending entry.
            (ScanOp::Small, Direction::Outbound) => {
                self.pending_scans.remove(&key);
                if let Some(scanner_id) = event.scanner
                    && let Some(record) = self.scanners.get(&scanner_id)
                {
                    let (table, region) = (record.table.clone(), record.region.clone());
                    event.merge_attribution(&table, &region, &None);
                }
            }
            (ScanOp::Close, Direction::Outbound) => {}
        }
    }
}
