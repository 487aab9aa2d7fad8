//! RPC frame decoding: envelope header plus method-specific parameter.
//!
//! A frame body is a varint-delimited header message followed by an
//! optional varint-delimited parameter message. Requests name their method
//! in the header; responses carry only the call id, so the parameter schema
//! of a response is chosen by the originating request, which the caller
//! supplies from the call table.

use std::net::IpAddr;

use hbasemon_wire::client::{
    GetRequest, GetResponse, MultiRequest, MultiResponse, MutateRequest, MutateResponse,
    MutationProto, MutationType, RegionSpecifier, ScanRequest, ScanResponse,
};
use hbasemon_wire::rpc::{RequestHeader, ResponseHeader};
use prost::Message;
use thiserror::Error;

use crate::event::{Event, SubEvent};
use crate::packet::ClientKey;

/// Decoding failures. `InvalidProtobuf` is deliberately its own variant:
/// the framer swallows it silently, while everything else is logged.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid protobuf: {0}")]
    InvalidProtobuf(#[from] prost::DecodeError),
    #[error("invalid method name: {0:?}")]
    InvalidMethodName(String),
}

/// Frame context the decoder stamps onto every event.
#[derive(Debug, Clone, Copy)]
pub struct FrameMeta {
    pub client: ClientKey,
    pub server: IpAddr,
    pub ts: i64,
}

/// Decodes an inbound frame into a request event.
pub fn decode_request(frame: &[u8], meta: FrameMeta) -> Result<Event, DecodeError> {
    let mut buf = frame;
    let header = RequestHeader::decode_length_delimited(&mut buf)?;

    let raw_method = header.method_name.unwrap_or_default();
    if raw_method.is_empty() || !raw_method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DecodeError::InvalidMethodName(raw_method));
    }
    let method = raw_method.to_ascii_lowercase();

    let mut event = Event::bare(
        method.clone(),
        header.call_id.unwrap_or(0),
        true,
        meta.ts,
        meta.server,
        meta.client.addr,
        meta.client.port,
        frame.len(),
    );

    match method.as_str() {
        "get" => {
            let request = GetRequest::decode_length_delimited(&mut buf)?;
            apply_region(&mut event, request.region.as_ref());
            event.row = request.get.and_then(|g| g.row).map(lossy);
        }
        "scan" => {
            let request = ScanRequest::decode_length_delimited(&mut buf)?;
            event.method = scan_method(&request).to_string();
            apply_region(&mut event, request.region.as_ref());
            event.scanner = request.scanner_id;
            event.row = request.scan.and_then(|s| s.start_row).map(lossy);
        }
        "mutate" => {
            let request = MutateRequest::decode_length_delimited(&mut buf)?;
            apply_region(&mut event, request.region.as_ref());
            if let Some(mutation) = request.mutation {
                event.method = mutation_method(&mutation).to_string();
                event.row = mutation.row.as_deref().map(|r| lossy(r.to_vec()));
                event.cells = Some(mutation.cell_count());
            }
        }
        "multi" => {
            let request = MultiRequest::decode_length_delimited(&mut buf)?;
            event.actions = Some(multi_actions(&request));
        }
        // Admin and coprocessor traffic: identity only.
        _ => {}
    }

    Ok(event)
}

/// Decodes an outbound frame into a response event.
///
/// The response header carries only the call id, so `request_lookup` is
/// consulted once the header is parsed; it yields (and consumes) the stored
/// inbound event for `(client, call_id)` when one was observed. Without it
/// the body cannot be interpreted and the event is emitted as `unknown`
/// with no elapsed time.
pub fn decode_response(
    frame: &[u8],
    meta: FrameMeta,
    request_lookup: impl FnOnce(u32) -> Option<Event>,
) -> Result<Event, DecodeError> {
    let mut buf = frame;
    let header = ResponseHeader::decode_length_delimited(&mut buf)?;
    let call_id = header.call_id.unwrap_or(0);
    let request = request_lookup(call_id);

    let method = request
        .as_ref()
        .map_or("unknown", |r| r.method.as_str())
        .to_string();
    let mut event = Event::bare(
        method,
        call_id,
        false,
        meta.ts,
        meta.server,
        meta.client.addr,
        meta.client.port,
        frame.len(),
    );

    if let Some(request) = &request {
        event.merge_attribution(&request.table, &request.region, &request.row);
        event.scanner = request.scanner;
        event.actions = request.actions.clone();
        event.elapsed_ms = Some(meta.ts - request.ts);
    }

    if let Some(exception) = header.exception {
        event.error = exception.exception_class_name;
        return Ok(event);
    }

    match event.method.as_str() {
        "get" => {
            let response = GetResponse::decode_length_delimited(&mut buf)?;
            event.cells = response.result.map(|r| r.cell_count());
        }
        "open-scanner" | "next-rows" | "close-scanner" | "small-scan" => {
            let response = ScanResponse::decode_length_delimited(&mut buf)?;
            if response.scanner_id.is_some() {
                event.scanner = response.scanner_id;
            }
            event.cells = Some(response.cell_count());
        }
        "put" | "delete" | "append" | "increment" | "mutate" => {
            let response = MutateResponse::decode_length_delimited(&mut buf)?;
            event.cells = response.result.map(|r| r.cell_count());
        }
        "multi" => {
            let response = MultiResponse::decode_length_delimited(&mut buf)?;
            merge_multi_results(&mut event, &response);
        }
        _ => {}
    }

    Ok(event)
}

/// Classifies a scan request into its lifecycle sub-method. Open = no
/// scanner id on the request; close = the close flag; both at once is a
/// small scan; neither is a next-rows fetch.
fn scan_method(request: &ScanRequest) -> &'static str {
    let opens = request.scanner_id.is_none();
    let closes = request.close_scanner.unwrap_or(false);
    match (opens, closes) {
        (true, true) => "small-scan",
        (true, false) => "open-scanner",
        (false, true) => "close-scanner",
        (false, false) => "next-rows",
    }
}

fn mutation_method(mutation: &MutationProto) -> &'static str {
    match mutation.kind() {
        Some(MutationType::Put) => "put",
        Some(MutationType::Delete) => "delete",
        Some(MutationType::Append) => "append",
        Some(MutationType::Increment) => "increment",
        None => "mutate",
    }
}

fn apply_region(event: &mut Event, region: Option<&RegionSpecifier>) {
    if let Some(region) = region {
        event.table = region.table();
        event.region = region.region();
    }
}

fn multi_actions(request: &MultiRequest) -> Vec<SubEvent> {
    let mut actions = Vec::new();
    for region_action in &request.region_action {
        let table = region_action.region.as_ref().and_then(RegionSpecifier::table);
        let region = region_action.region.as_ref().and_then(RegionSpecifier::region);
        for action in &region_action.action {
            let mut sub = if let Some(mutation) = &action.mutation {
                let mut sub = SubEvent::new(mutation_method(mutation));
                sub.row = mutation.row.clone().map(lossy);
                sub.cells = Some(mutation.cell_count());
                sub
            } else if let Some(get) = &action.get {
                let mut sub = SubEvent::new("get");
                sub.row = get.row.clone().map(lossy);
                sub
            } else {
                SubEvent::new("unknown")
            };
            sub.table = table.clone();
            sub.region = region.clone();
            actions.push(sub);
        }
    }
    actions
}

/// Zips per-action results into the request's action list, positionally.
/// Results arrive grouped by region in request order; a region-level
/// exception applies to every action of that group.
fn merge_multi_results(event: &mut Event, response: &MultiResponse) {
    let Some(actions) = event.actions.as_mut() else {
        return;
    };
    let mut results = response
        .region_action_result
        .iter()
        .flat_map(|group| {
            group.result_or_exception.iter().map(move |roe| {
                let error = roe
                    .exception
                    .as_ref()
                    .or(group.exception.as_ref())
                    .and_then(|e| e.name.clone());
                (roe.result.as_ref().map(|r| r.cell_count()), error)
            })
        });
    for action in actions.iter_mut() {
        let Some((cells, error)) = results.next() else {
            break;
        };
        if let Some(cells) = cells {
            action.cells = Some(cells);
        }
        action.error = error;
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}
