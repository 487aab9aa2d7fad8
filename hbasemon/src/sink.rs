//! Event sinks.
//!
//! The capture loop hands every finished event to [`dispatch`], which
//! applies the multi-batch unpacking rules and then writes through the
//! configured [`Sink`]. Sink failures are surfaced to the caller; the core
//! never retries.

use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::event::Event;

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod table;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[cfg(feature = "kafka")]
    #[error("kafka producer: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Which sub-row table a multi action lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubKind {
    /// Request-side actions of a multi batch.
    Actions,
    /// Response-side results of a multi batch.
    Results,
}

impl SubKind {
    pub fn table(self) -> &'static str {
        match self {
            SubKind::Actions => "actions",
            SubKind::Results => "results",
        }
    }
}

/// Where emitted events go.
pub trait Sink {
    fn emit(&mut self, event: &Event) -> Result<(), SinkError>;
    fn emit_sub(&mut self, kind: SubKind, sub: &crate::event::SubEvent) -> Result<(), SinkError>;
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Applies multi-batch unpacking, then emits.
///
/// `batch` is the action count. A single-action batch collapses into the
/// top-level event; a larger batch additionally emits one sub-row per
/// action with the identifying fields copied down, and sums the actions'
/// cell counts into the top-level event when nothing set it.
pub fn dispatch(sink: &mut dyn Sink, mut event: Event) -> Result<(), SinkError> {
    if let Some(actions) = event.actions.clone() {
        let batch = actions.len();
        event.batch = Some(batch);
        if batch == 1 {
            let action = &actions[0];
            event.method = action.method.clone();
            if action.table.is_some() {
                event.table = action.table.clone();
            }
            if action.region.is_some() {
                event.region = action.region.clone();
            }
            if action.row.is_some() {
                event.row = action.row.clone();
            }
            if action.cells.is_some() {
                event.cells = action.cells;
            }
            if action.error.is_some() {
                event.error = action.error.clone();
            }
        } else if batch > 1 {
            if event.cells.is_none() {
                event.cells = Some(actions.iter().filter_map(|a| a.cells).sum());
            }
            let kind = if event.inbound {
                SubKind::Actions
            } else {
                SubKind::Results
            };
            for action in &actions {
                let mut sub = action.clone();
                sub.client = Some(event.client);
                sub.port = Some(event.port);
                sub.call_id = Some(event.call_id);
                sink.emit_sub(kind, &sub)?;
            }
        }
    }
    sink.emit(&event)
}

/// A sink that renders every event as one structured log line. The default
/// for verbose runs with no store or producer configured.
#[derive(Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn emit(&mut self, event: &Event) -> Result<(), SinkError> {
        info!(target: "hbasemon::events", "{}", serde_json::to_string(event)?);
        Ok(())
    }

    fn emit_sub(&mut self, kind: SubKind, sub: &crate::event::SubEvent) -> Result<(), SinkError> {
        let line = json!({ "table": kind.table(), "row": sub });
        info!(target: "hbasemon::events", "{line}");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
