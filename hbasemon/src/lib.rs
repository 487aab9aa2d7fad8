//! Passive HBase RegionServer RPC observer.
//!
//! hbasemon watches TCP traffic to and from RegionServer ports, reassembles
//! length-prefixed RPC frames split across segments, decodes them into
//! structured events, correlates responses with their requests by call id,
//! tracks server-side scanner lifecycles for region/table attribution, and
//! keeps its own state memory-bounded with age and budget eviction.
//!
//! The pipeline is `packet` → [`framer`] → [`rpc`] → [`state`] → [`sink`],
//! driven by [`capture::run`] and fed by a [`source::Source`]; [`evict`]
//! runs on the loop's periodic tick.

pub mod capture;
pub mod cli;
pub mod error;
pub mod event;
pub mod evict;
pub mod framer;
pub mod packet;
pub mod rpc;
pub mod sink;
pub mod source;
pub mod state;
