//! HBase RegionServer RPC wire types.
//!
//! This crate defines the protobuf messages a passive observer needs to
//! decode RegionServer request/response traffic: the RPC envelope headers
//! and the subset of the client protocol (`Get`, `Scan`, `Mutate`, `Multi`)
//! that carries workload-attribution fields. Messages are hand-written
//! `prost` structs rather than generated code so the crate carries only the
//! fields the decoder reads; protobuf skips unknown fields, so decoding
//! full production frames with these reduced schemas is lossless for the
//! fields declared here.
//!
//! # Wire format
//!
//! Every RPC message on the wire is `[4-byte big-endian length][body]`,
//! where the body is a varint-delimited header message followed by an
//! optional varint-delimited parameter message:
//!
//! ```text
//! +----------------+---------------------+---------------------+
//! | u32 length (N) | varint | header     | varint | parameter  |
//! +----------------+---------------------+---------------------+
//!                   <------------------ N bytes -------------->
//! ```
//!
//! Requests carry a [`rpc::RequestHeader`]; responses carry a
//! [`rpc::ResponseHeader`]. The parameter schema depends on
//! `RequestHeader.method_name`, which is why response decoding requires the
//! originating request to be known.
//!
//! All field tags match the upstream `RPC.proto` and `Client.proto`
//! definitions; repeated scalar fields are declared unpacked as proto2
//! requires.

pub mod client;
pub mod rpc;

/// Splits an HBase region name into its table prefix.
///
/// Region names have the form `<table>,<start-key>,<timestamp>.<encoded>.`;
/// everything before the first comma is the table name (possibly
/// `namespace:table`). Returns `None` for names without a comma, such as
/// encoded region names.
pub fn table_of_region(region: &str) -> Option<&str> {
    region.split_once(',').map(|(table, _)| table)
}
