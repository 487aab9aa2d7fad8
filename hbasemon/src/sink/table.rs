//! The in-process tabular store.
//!
//! Events are inserted as JSON rows into four named tables: `requests` and
//! `responses` for top-level events, `actions` and `results` for the
//! per-action rows of multi batches. The store is what interactive
//! inspection and the scenario tests query.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use crate::event::{Event, SubEvent};

use super::{Sink, SinkError, SubKind};

#[derive(Debug, Default)]
pub struct TableSink {
    tables: BTreeMap<&'static str, Vec<Value>>,
}

impl TableSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows inserted into `table` so far, in insertion order.
    pub fn rows(&self, table: &str) -> &[Value] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    fn insert(&mut self, table: &'static str, row: Value) {
        self.tables.entry(table).or_default().push(row);
    }
}

impl Sink for TableSink {
    fn emit(&mut self, event: &Event) -> Result<(), SinkError> {
        let table = if event.inbound { "requests" } else { "responses" };
        self.insert(table, serde_json::to_value(event)?);
        Ok(())
    }

    fn emit_sub(&mut self, kind: SubKind, sub: &SubEvent) -> Result<(), SinkError> {
        self.insert(kind.table(), serde_json::to_value(sub)?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        for (table, rows) in &self.tables {
            info!("table {table}: {} row(s)", rows.len());
        }
        Ok(())
    }
}
