//! RPC envelope headers from `RPC.proto`.
//!
//! The header is the first varint-delimited message inside every frame. For
//! requests it names the method and carries the per-connection call id; for
//! responses it echoes the call id and carries the remote exception, if any.

/// Metadata about the cell block shipped after the protobuf portion of a
/// frame. A passive observer does not reassemble the cell block itself, but
/// its presence explains `associated_cell_count` on results.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CellBlockMeta {
    /// Length of the cell block in bytes.
    #[prost(uint32, optional, tag = "1")]
    pub length: Option<u32>,
}

/// Header preceding every request parameter message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestHeader {
    /// Per-connection monotonically increasing call identifier, echoed on
    /// the response.
    #[prost(uint32, optional, tag = "1")]
    pub call_id: Option<u32>,
    /// Service method name, e.g. `Get`, `Scan`, `Multi`.
    #[prost(string, optional, tag = "3")]
    pub method_name: Option<String>,
    /// Whether a parameter message follows this header.
    #[prost(bool, optional, tag = "4")]
    pub request_param: Option<bool>,
    #[prost(message, optional, tag = "5")]
    pub cell_block_meta: Option<CellBlockMeta>,
    #[prost(int32, optional, tag = "6")]
    pub priority: Option<i32>,
    #[prost(uint32, optional, tag = "7")]
    pub timeout: Option<u32>,
}

/// Header preceding every response result message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseHeader {
    /// Call identifier this response answers.
    #[prost(uint32, optional, tag = "1")]
    pub call_id: Option<u32>,
    /// Set instead of a result message when the call failed server-side.
    #[prost(message, optional, tag = "2")]
    pub exception: Option<ExceptionResponse>,
    #[prost(message, optional, tag = "3")]
    pub cell_block_meta: Option<CellBlockMeta>,
}

/// Server-side failure description carried on a response header.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExceptionResponse {
    /// Fully qualified Java class of the thrown exception.
    #[prost(string, optional, tag = "1")]
    pub exception_class_name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub stack_trace: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub hostname: Option<String>,
    #[prost(int32, optional, tag = "4")]
    pub port: Option<i32>,
    #[prost(bool, optional, tag = "5")]
    pub do_not_retry: Option<bool>,
}
