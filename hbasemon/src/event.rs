//! The structured events handed to sinks.

use std::net::IpAddr;

use serde::Serialize;

/// One decoded RPC frame, request or response, with whatever attribution
/// the observer could establish at emission time.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Lowercased method, refined where possible: `get`, `put`, `delete`,
    /// `append`, `increment`, `multi`, `open-scanner`, `next-rows`,
    /// `close-scanner`, `small-scan`, or `unknown` for an uncorrelated
    /// response.
    pub method: String,
    pub call_id: u32,
    /// True for client→server requests.
    pub inbound: bool,
    /// Capture timestamp, milliseconds since the epoch.
    pub ts: i64,
    pub server: IpAddr,
    pub client: IpAddr,
    /// The client's TCP port.
    pub port: u16,
    /// RPC frame length in bytes, prefix excluded.
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of actions in a multi batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<usize>,
    /// Per-action sub-requests of a multi batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<SubEvent>>,
}

impl Event {
    /// A bare event carrying only the fields every frame has.
    pub fn bare(
        method: impl Into<String>,
        call_id: u32,
        inbound: bool,
        ts: i64,
        server: IpAddr,
        client: IpAddr,
        port: u16,
        size: usize,
    ) -> Self {
        Self {
            method: method.into(),
            call_id,
            inbound,
            ts,
            server,
            client,
            port,
            size,
            table: None,
            region: None,
            row: None,
            cells: None,
            scanner: None,
            elapsed_ms: None,
            error: None,
            batch: None,
            actions: None,
        }
    }

    /// Fills attribution fields from a stored record without overwriting
    /// anything this event already established.
    pub fn merge_attribution(&mut self, table: &Option<String>, region: &Option<String>, row: &Option<String>) {
        if self.table.is_none() {
            self.table = table.clone();
        }
        if self.region.is_none() {
            self.region = region.clone();
        }
        if self.row.is_none() {
            self.row = row.clone();
        }
    }
}

/// One action of a multi batch, emitted as its own row when the batch has
/// more than one. `client`, `port`, and `call_id` are copied down from the
/// parent event at emission time.
#[derive(Debug, Clone, Serialize)]
pub struct SubEvent {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubEvent {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            client: None,
            port: None,
            call_id: None,
            table: None,
            region: None,
            row: None,
            cells: None,
            error: None,
        }
    }
}
