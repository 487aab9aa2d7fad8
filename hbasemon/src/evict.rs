//! Bounded-memory eviction of dangling observer state.
//!
//! The observer only ever sees one side of a conversation, so state can
//! dangle indefinitely: a client that vanished mid-frame, a response that
//! was never captured, a scanner that was never closed. Two sweeps keep the
//! state bounded:
//!
//! 1. **Age**: any entry untouched for two minutes of capture time is dead.
//! 2. **Memory**: if the expected footprint of what remains exceeds half
//!    the platform memory budget, the largest entries are dropped until the
//!    running total fits again.
//!
//! The wall clock for aging is the latest packet timestamp, not the host
//! clock, so offline file replays age state at capture speed.

use sysinfo::System;
use tracing::{debug, info};

use crate::packet::ClientKey;
use crate::state::SnifferState;

/// Capture-time age beyond which a state entry is considered dangling.
pub const MAX_AGE_MS: i64 = 120_000;

/// Fallback budget when the platform cannot report total memory.
const FALLBACK_MEMORY: u64 = 4 << 30;

/// Periodic state evictor. Construction snapshots the platform memory
/// budget once; the budget is half of it.
#[derive(Debug, Clone, Copy)]
pub struct Evictor {
    budget: u64,
}

impl Evictor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        Self::with_max_memory(if total == 0 { FALLBACK_MEMORY } else { total })
    }

    /// Budget override, exposed for tests and constrained deployments.
    pub fn with_max_memory(max_memory: u64) -> Self {
        Self {
            budget: max_memory / 2,
        }
    }

    /// Runs both sweeps against the latest capture timestamp.
    pub fn sweep(&self, state: &mut SnifferState, latest_ts: i64) {
        self.sweep_age(state, latest_ts);
        self.sweep_memory(state);
    }

    fn sweep_age(&self, state: &mut SnifferState, latest_ts: i64) {
        let deadline = latest_ts - MAX_AGE_MS;
        let before = state_len(state);
        state.fragments.retain(|_, buffer| buffer.ts >= deadline);
        state.calls.retain(|_, call| call.ts() >= deadline);
        state.pending_scans.retain(|_, scan| scan.ts >= deadline);
        state.scanners.retain(|_, scanner| scanner.ts >= deadline);
        let expired = before - state_len(state);
        if expired > 0 {
            info!("Expired {expired} state object(s)");
        }
    }

    /// Keeps the cheapest entries whose running footprint stays below the
    /// budget and drops the rest. Only fragment buffers hold payload bytes;
    /// every other record counts as zero and is always retained here.
    fn sweep_memory(&self, state: &mut SnifferState) {
        let total: u64 = state
            .fragments
            .values()
            .map(|buffer| buffer.expected_memory())
            .sum();
        if total <= self.budget {
            debug!(
                "state footprint {} within budget {}",
                human_bytes(total),
                human_bytes(self.budget)
            );
            return;
        }

        let mut sized: Vec<(ClientKey, u64)> = state
            .fragments
            .iter()
            .map(|(key, buffer)| (*key, buffer.expected_memory()))
            .collect();
        sized.sort_by_key(|(_, memory)| *memory);

        let mut running = 0u64;
        let mut dropped = 0usize;
        for (key, memory) in sized {
            if running + memory < self.budget {
                running += memory;
            } else {
                state.fragments.remove(&key);
                dropped += 1;
            }
        }
        info!(
            "Evicted {dropped} state object(s) over memory budget: {} -> {}",
            human_bytes(total),
            human_bytes(running)
        );
    }
}

impl Default for Evictor {
    fn default() -> Self {
        Self::new()
    }
}

fn state_len(state: &SnifferState) -> usize {
    state.fragments.len() + state.calls.len() + state.pending_scans.len() + state.scanners.len()
}

/// Formats a byte count in binary units for log lines.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
