//! Client protocol messages from `Client.proto`, reduced to the fields a
//! passive observer attributes workload with: regions, rows, scanner ids,
//! and cell counts.

use crate::table_of_region;

/// How a [`RegionSpecifier`] value is to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RegionSpecifierType {
    /// `<table>,<start-key>,<timestamp>.<encoded>.`
    RegionName = 1,
    /// The MD5-derived encoded suffix only; no table information.
    EncodedRegionName = 2,
}

/// Identifies the region a request targets.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegionSpecifier {
    #[prost(enumeration = "RegionSpecifierType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub value: Option<Vec<u8>>,
}

impl RegionSpecifier {
    /// The region name as a string, regardless of specifier type.
    pub fn region(&self) -> Option<String> {
        self.value
            .as_deref()
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// The table name, derivable only from full region names.
    pub fn table(&self) -> Option<String> {
        if self.r#type == Some(RegionSpecifierType::RegionName as i32) {
            self.value
                .as_deref()
                .and_then(|v| table_of_region(&String::from_utf8_lossy(v)).map(str::to_owned))
        } else {
            None
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Column {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub family: Option<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub qualifier: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cell {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub row: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub family: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub qualifier: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub value: Option<Vec<u8>>,
}

/// A row result. Cells either ride inline in `cell` or in the frame's cell
/// block, in which case only `associated_cell_count` reports them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Result {
    #[prost(message, repeated, tag = "1")]
    pub cell: Vec<Cell>,
    #[prost(int32, optional, tag = "2")]
    pub associated_cell_count: Option<i32>,
    #[prost(bool, optional, tag = "3")]
    pub exists: Option<bool>,
}

impl Result {
    /// Total cells this result stands for, counting both inline cells and
    /// cells shipped in the cell block.
    pub fn cell_count(&self) -> u32 {
        self.cell.len() as u32 + self.associated_cell_count.unwrap_or(0).max(0) as u32
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Get {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub row: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "2")]
    pub column: Vec<Column>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRequest {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(message, optional, tag = "2")]
    pub get: Option<Get>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResponse {
    #[prost(message, optional, tag = "1")]
    pub result: Option<Result>,
}

/// Scan bounds; only the row range matters for attribution.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Scan {
    #[prost(bytes = "vec", optional, tag = "3")]
    pub start_row: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub stop_row: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "14")]
    pub small: Option<bool>,
}

/// The single request message behind open/next/close scanner traffic. The
/// combination of `scanner_id` and `close_scanner` distinguishes the four
/// cases: neither set opens a scanner, both absent-and-set in one request is
/// a small scan, an id alone advances, an id plus the flag closes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanRequest {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(message, optional, tag = "2")]
    pub scan: Option<Scan>,
    #[prost(uint64, optional, tag = "3")]
    pub scanner_id: Option<u64>,
    #[prost(uint32, optional, tag = "4")]
    pub number_of_rows: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub close_scanner: Option<bool>,
    #[prost(uint64, optional, tag = "6")]
    pub next_call_seq: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanResponse {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub cells_per_result: Vec<u32>,
    /// Server-minted scanner id; present on the open response.
    #[prost(uint64, optional, tag = "2")]
    pub scanner_id: Option<u64>,
    #[prost(bool, optional, tag = "3")]
    pub more_results: Option<bool>,
    #[prost(message, repeated, tag = "5")]
    pub results: Vec<Result>,
    #[prost(bool, optional, tag = "9")]
    pub heartbeat_message: Option<bool>,
}

impl ScanResponse {
    /// Cells carried by this response, preferring the cell-block counts.
    pub fn cell_count(&self) -> u32 {
        if self.cells_per_result.is_empty() {
            self.results.iter().map(Result::cell_count).sum()
        } else {
            self.cells_per_result.iter().sum()
        }
    }
}

/// The kind of a [`MutationProto`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MutationType {
    Append = 0,
    Increment = 1,
    Put = 2,
    Delete = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QualifierValue {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub qualifier: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub value: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnValue {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub family: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "2")]
    pub qualifier_value: Vec<QualifierValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutationProto {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub row: Option<Vec<u8>>,
    #[prost(enumeration = "MutationType", optional, tag = "2")]
    pub mutate_type: Option<i32>,
    #[prost(message, repeated, tag = "3")]
    pub column_value: Vec<ColumnValue>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
    /// Cells shipped in the cell block instead of `column_value`.
    #[prost(int32, optional, tag = "8")]
    pub associated_cell_count: Option<i32>,
}

impl MutationProto {
    /// The mutation kind, when declared and known.
    pub fn kind(&self) -> Option<MutationType> {
        self.mutate_type.and_then(|v| MutationType::try_from(v).ok())
    }

    /// Total cells this mutation writes or deletes.
    pub fn cell_count(&self) -> u32 {
        let inline: usize = self.column_value.iter().map(|cv| cv.qualifier_value.len()).sum();
        inline as u32 + self.associated_cell_count.unwrap_or(0).max(0) as u32
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutateRequest {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(message, optional, tag = "2")]
    pub mutation: Option<MutationProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutateResponse {
    #[prost(message, optional, tag = "1")]
    pub result: Option<Result>,
    #[prost(bool, optional, tag = "2")]
    pub processed: Option<bool>,
}

/// One get or mutation inside a [`MultiRequest`] region batch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Action {
    #[prost(uint32, optional, tag = "1")]
    pub index: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub mutation: Option<MutationProto>,
    #[prost(message, optional, tag = "3")]
    pub get: Option<Get>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegionAction {
    #[prost(message, optional, tag = "1")]
    pub region: Option<RegionSpecifier>,
    #[prost(bool, optional, tag = "2")]
    pub atomic: Option<bool>,
    #[prost(message, repeated, tag = "3")]
    pub action: Vec<Action>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultiRequest {
    #[prost(message, repeated, tag = "1")]
    pub region_action: Vec<RegionAction>,
    #[prost(uint64, optional, tag = "2")]
    pub nonce_group: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NameBytesPair {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResultOrException {
    #[prost(uint32, optional, tag = "1")]
    pub index: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub result: Option<Result>,
    #[prost(message, optional, tag = "3")]
    pub exception: Option<NameBytesPair>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegionActionResult {
    #[prost(message, repeated, tag = "1")]
    pub result_or_exception: Vec<ResultOrException>,
    #[prost(message, optional, tag = "2")]
    pub exception: Option<NameBytesPair>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultiResponse {
    #[prost(message, repeated, tag = "1")]
    pub region_action_result: Vec<RegionActionResult>,
    #[prost(bool, optional, tag = "2")]
    pub processed: Option<bool>,
}
