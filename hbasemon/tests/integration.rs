//! End-to-end pipeline scenarios: synthetic Ethernet/IPv4/TCP frames
//! carrying prost-encoded RPC traffic, driven through the full
//! packet → framer → decoder → correlation → scanner-tracker → sink path.

use std::net::Ipv4Addr;

use hbasemon::capture::Pipeline;
use hbasemon::event::{Event, SubEvent};
use hbasemon::evict::{Evictor, MAX_AGE_MS};
use hbasemon::sink::{Sink, SinkError, SubKind};
use hbasemon_wire::client::{
    Action, Get, GetRequest, GetResponse, MultiRequest, MultiResponse, MutationProto,
    MutationType, RegionAction, RegionActionResult, RegionSpecifier, RegionSpecifierType,
    Result as WireResult, ResultOrException, ScanRequest, ScanResponse,
};
use hbasemon_wire::rpc::{RequestHeader, ResponseHeader};
use prost::Message;

const CLIENT: (Ipv4Addr, u16) = (Ipv4Addr::new(10, 0, 0, 1), 5555);
const SERVER: (Ipv4Addr, u16) = (Ipv4Addr::new(10, 0, 0, 2), 16020);
const REGION: &str = "T1,,1500000000000.r1.";

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    subs: Vec<(SubKind, SubEvent)>,
}

impl Sink for Recorder {
    fn emit(&mut self, event: &Event) -> Result<(), SinkError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn emit_sub(&mut self, kind: SubKind, sub: &SubEvent) -> Result<(), SinkError> {
        self.subs.push((kind, sub.clone()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Builds an Ethernet/IPv4/TCP frame carrying `payload`.
fn tcp_frame(src: (Ipv4Addr, u16), dst: (Ipv4Addr, u16), payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(54 + payload.len());
    frame.extend_from_slice(&[0u8; 12]);
    frame.extend_from_slice(&0x0800u16.to_be_bytes());
    let total_len = (40 + payload.len()) as u16;
    frame.push(0x45);
    frame.push(0);
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 0]);
    frame.push(64);
    frame.push(6);
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(&src.0.octets());
    frame.extend_from_slice(&dst.0.octets());
    frame.extend_from_slice(&src.1.to_be_bytes());
    frame.extend_from_slice(&dst.1.to_be_bytes());
    frame.extend_from_slice(&[0; 8]);
    frame.push(5 << 4);
    frame.push(0x18);
    frame.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    frame.extend_from_slice(payload);
    frame
}

/// `[u32 length][header][param]` as it appears on the wire.
fn request_payload(call_id: u32, method: &str, param: &impl Message) -> Vec<u8> {
    let header = RequestHeader {
        call_id: Some(call_id),
        method_name: Some(method.to_string()),
        request_param: Some(true),
        ..Default::default()
    };
    let mut body = Vec::new();
    header.encode_length_delimited(&mut body).unwrap();
    param.encode_length_delimited(&mut body).unwrap();
    prefixed(&body)
}

fn response_payload(call_id: u32, param: &impl Message) -> Vec<u8> {
    let header = ResponseHeader {
        call_id: Some(call_id),
        ..Default::default()
    };
    let mut body = Vec::new();
    header.encode_length_delimited(&mut body).unwrap();
    param.encode_length_delimited(&mut body).unwrap();
    prefixed(&body)
}

fn prefixed(body: &[u8]) -> Vec<u8> {
    let mut payload = (body.len() as u32).to_be_bytes().to_vec();
    payload.extend_from_slice(body);
    payload
}

fn region_specifier() -> RegionSpecifier {
    RegionSpecifier {
        r#type: Some(RegionSpecifierType::RegionName as i32),
        value: Some(REGION.as_bytes().to_vec()),
    }
}

fn inbound(pipeline: &mut Pipeline, sink: &mut Recorder, payload: &[u8], ts: i64) {
    pipeline
        .process(&tcp_frame(CLIENT, SERVER, payload), ts, sink)
        .unwrap();
}

fn outbound(pipeline: &mut Pipeline, sink: &mut Recorder, payload: &[u8], ts: i64) {
    pipeline
        .process(&tcp_frame(SERVER, CLIENT, payload), ts, sink)
        .unwrap();
}

#[test]
fn single_get_single_packet() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let request = request_payload(
        1,
        "Get",
        &GetRequest {
            region: Some(region_specifier()),
            get: Some(Get {
                row: Some(b"k".to_vec()),
                column: vec![],
            }),
        },
    );
    inbound(&mut pipeline, &mut sink, &request, 1000);

    let response = response_payload(
        1,
        &GetResponse {
            result: Some(WireResult {
                associated_cell_count: Some(3),
                ..Default::default()
            }),
        },
    );
    outbound(&mut pipeline, &mut sink, &response, 1005);

    assert_eq!(sink.events.len(), 2);
    let reply = &sink.events[1];
    assert_eq!(reply.method, "get");
    assert_eq!(reply.cells, Some(3));
    assert_eq!(reply.table.as_deref(), Some("T1"));
    assert_eq!(reply.region.as_deref(), Some(REGION));
    assert_eq!(reply.row.as_deref(), Some("k"));
    assert_eq!(reply.elapsed_ms, Some(5));
    // Consumed on correlation: no call record remains.
    assert!(pipeline.state.calls.is_empty());
}

#[test]
fn fragmented_scan_open() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let request = request_payload(
        2,
        "Scan",
        &ScanRequest {
            region: Some(region_specifier()),
            ..Default::default()
        },
    );
    let split = request.len() - 16;
    inbound(&mut pipeline, &mut sink, &request[..split], 2000);
    assert!(sink.events.is_empty());
    assert_eq!(pipeline.state.fragments.len(), 1);

    inbound(&mut pipeline, &mut sink, &request[split..], 2001);
    assert_eq!(sink.events.len(), 1);
    assert_eq!(sink.events[0].method, "open-scanner");
    assert!(sink.events[0].inbound);
    assert!(pipeline.state.fragments.is_empty());
}

#[test]
fn scanner_lifecycle_attributes_next_rows() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let open_request = request_payload(
        10,
        "Scan",
        &ScanRequest {
            region: Some(region_specifier()),
            ..Default::default()
        },
    );
    inbound(&mut pipeline, &mut sink, &open_request, 3000);

    let open_response = response_payload(
        10,
        &ScanResponse {
            scanner_id: Some(42),
            ..Default::default()
        },
    );
    outbound(&mut pipeline, &mut sink, &open_response, 3001);
    assert!(pipeline.state.scanners.contains_key(&42));

    let next_request = request_payload(
        11,
        "Scan",
        &ScanRequest {
            scanner_id: Some(42),
            number_of_rows: Some(100),
            ..Default::default()
        },
    );
    inbound(&mut pipeline, &mut sink, &next_request, 3002);

    let next_response = response_payload(
        11,
        &ScanResponse {
            cells_per_result: vec![100],
            scanner_id: Some(42),
            ..Default::default()
        },
    );
    outbound(&mut pipeline, &mut sink, &next_response, 3003);

    let close_request = request_payload(
        12,
        "Scan",
        &ScanRequest {
            scanner_id: Some(42),
            close_scanner: Some(true),
            ..Default::default()
        },
    );
    inbound(&mut pipeline, &mut sink, &close_request, 3004);
    assert!(!pipeline.state.scanners.contains_key(&42));

    let methods: Vec<&str> = sink.events.iter().map(|e| e.method.as_str()).collect();
    assert_eq!(
        methods,
        ["open-scanner", "open-scanner", "next-rows", "next-rows", "close-scanner"]
    );

    // Both next-rows events inherit the open request's attribution.
    for event in &sink.events[2..4] {
        assert_eq!(event.table.as_deref(), Some("T1"), "{}", event.method);
        assert_eq!(event.region.as_deref(), Some(REGION));
    }
    assert_eq!(sink.events[3].cells, Some(100));
    assert_eq!(sink.events[3].elapsed_ms, Some(1));
}

#[test]
fn dangling_scanner_expires_by_age() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let open_request = request_payload(
        20,
        "Scan",
        &ScanRequest {
            region: Some(region_specifier()),
            ..Default::default()
        },
    );
    inbound(&mut pipeline, &mut sink, &open_request, 4000);
    let open_response = response_payload(
        20,
        &ScanResponse {
            scanner_id: Some(99),
            ..Default::default()
        },
    );
    outbound(&mut pipeline, &mut sink, &open_response, 4000);
    assert!(pipeline.state.scanners.contains_key(&99));

    let evictor = Evictor::with_max_memory(u64::MAX);
    evictor.sweep(&mut pipeline.state, 4000 + MAX_AGE_MS + 1);
    assert!(pipeline.state.scanners.is_empty());
}

#[test]
fn multi_request_response_with_sub_events() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let request = request_payload(
        30,
        "Multi",
        &MultiRequest {
            region_action: vec![RegionAction {
                region: Some(region_specifier()),
                atomic: None,
                action: vec![
                    Action {
                        index: Some(0),
                        get: Some(Get {
                            row: Some(b"a".to_vec()),
                            column: vec![],
                        }),
                        mutation: None,
                    },
                    Action {
                        index: Some(1),
                        mutation: Some(MutationProto {
                            row: Some(b"b".to_vec()),
                            mutate_type: Some(MutationType::Put as i32),
                            ..Default::default()
                        }),
                        get: None,
                    },
                ],
            }],
            nonce_group: None,
        },
    );
    inbound(&mut pipeline, &mut sink, &request, 5000);

    let response = response_payload(
        30,
        &MultiResponse {
            region_action_result: vec![RegionActionResult {
                result_or_exception: vec![
                    ResultOrException {
                        index: Some(0),
                        result: Some(WireResult {
                            associated_cell_count: Some(4),
                            ..Default::default()
                        }),
                        exception: None,
                    },
                    ResultOrException {
                        index: Some(1),
                        result: Some(WireResult {
                            associated_cell_count: Some(2),
                            ..Default::default()
                        }),
                        exception: None,
                    },
                ],
                exception: None,
            }],
            processed: Some(true),
        },
    );
    outbound(&mut pipeline, &mut sink, &response, 5001);

    assert_eq!(sink.events.len(), 2);
    let reply = &sink.events[1];
    assert_eq!(reply.batch, Some(2));
    assert_eq!(reply.cells, Some(6));
    let actions = reply.actions.as_ref().unwrap();
    assert_eq!(actions[0].cells, Some(4));
    assert_eq!(actions[1].cells, Some(2));

    let results: Vec<_> = sink
        .subs
        .iter()
        .filter(|(kind, _)| *kind == SubKind::Results)
        .collect();
    assert_eq!(results.len(), 2);
    for (_, sub) in &results {
        assert_eq!(sub.call_id, Some(30));
        assert_eq!(sub.port, Some(5555));
    }
}

#[test]
fn invalid_prefix_changes_nothing() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let mut payload = vec![0xff, 0xff, 0xff, 0xff];
    payload.extend_from_slice(&[0xab; 32]);
    inbound(&mut pipeline, &mut sink, &payload, 6000);

    assert!(sink.events.is_empty());
    assert!(pipeline.state.fragments.is_empty());
    assert!(pipeline.state.calls.is_empty());
    assert!(pipeline.state.scanners.is_empty());
}

/// Every emitted event carries the required identity fields; responses
/// whose request was reused under the same call id are still correlated to
/// the latest request.
#[test]
fn reused_call_ids_correlate_to_latest_request() {
    let mut pipeline = Pipeline::new([16020]);
    let mut sink = Recorder::default();

    let stale = request_payload(
        7,
        "Get",
        &GetRequest {
            region: Some(region_specifier()),
            get: Some(Get {
                row: Some(b"old".to_vec()),
                column: vec![],
            }),
        },
    );
    inbound(&mut pipeline, &mut sink, &stale, 1000);

    let fresh = request_payload(
        7,
        "Get",
        &GetRequest {
            region: Some(region_specifier()),
            get: Some(Get {
                row: Some(b"new".to_vec()),
                column: vec![],
            }),
        },
    );
    inbound(&mut pipeline, &mut sink, &fresh, 2000);
    assert_eq!(pipeline.state.calls.len(), 1);

    let response = response_payload(7, &GetResponse::default());
    outbound(&mut pipeline, &mut sink, &response, 2003);

    let reply = sink.events.last().unwrap();
    assert_eq!(reply.row.as_deref(), Some("new"));
    assert_eq!(reply.elapsed_ms, Some(3));
}
