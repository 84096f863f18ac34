use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use json_codec::JsonCodec;
use proptest::prelude::*;
use protocol::{
    codes, params, CallDescriptor, Codec, DecodedRequest, Fault, OutputOptions, RipcordError,
    Transport, TransportError, Value,
};
use rstest::rstest;

use crate::{Client, Reply};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Script {
    responses: VecDeque<Vec<u8>>,
    requests: Vec<(String, Vec<u8>)>,
}

/// Records every posted request and answers with queued payloads.
#[derive(Clone, Default)]
struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    fn respond(&self, value: Value) {
        let payload = JsonCodec
            .encode_response(&value, &OutputOptions::default())
            .unwrap();
        self.script.lock().unwrap().responses.push_back(payload);
    }

    fn requests(&self) -> Vec<DecodedRequest> {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|(_, body)| {
                JsonCodec
                    .decode_request(body, &OutputOptions::default())
                    .unwrap()
            })
            .collect()
    }

    fn posts(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }
}

impl Transport for ScriptedTransport {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push((url.to_string(), request.to_vec()));
        script
            .responses
            .pop_front()
            .ok_or_else(|| TransportError::new(url, "connection refused"))
    }
}

fn client(transport: &ScriptedTransport) -> Client {
    Client::builder("http://rpc.test/endpoint")
        .codec(JsonCodec)
        .transport(transport.clone())
        .build()
        .unwrap()
}

fn batch_request(request: &DecodedRequest) -> Vec<CallDescriptor> {
    let [Value::Array(entries)] = request.params.as_slice() else {
        panic!("batch request must carry one array argument: {request:?}");
    };
    entries
        .iter()
        .map(|entry| CallDescriptor::from_value(entry).unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Construction and namespaces
// ---------------------------------------------------------------------------

#[test]
fn build_without_codec_is_a_configuration_error() {
    let err = Client::builder("http://rpc.test")
        .transport(ScriptedTransport::default())
        .build()
        .unwrap_err();
    assert!(matches!(err, RipcordError::Configuration { .. }));
    assert_eq!(err.code(), codes::NOT_CONFIGURED);
}

#[test]
fn build_without_transport_is_a_configuration_error() {
    let err = Client::builder("http://rpc.test")
        .codec(JsonCodec)
        .build()
        .unwrap_err();
    assert_eq!(err.code(), codes::NOT_CONFIGURED);
}

#[test]
fn namespace_access_is_memoized_and_performs_no_io() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);

    let math = client.namespace("math");
    assert_eq!(math, client.namespace("math"));
    assert_eq!(math.namespace("trig"), math.namespace("trig"));
    assert_eq!(math.namespace("trig").prefix(), Some("math.trig"));
    assert_eq!(math.session_id(), client.session_id());
    assert_eq!(transport.posts(), 0);
}

#[test]
fn builder_namespace_prefixes_every_call() {
    let transport = ScriptedTransport::default();
    let client = Client::builder("http://rpc.test")
        .codec(JsonCodec)
        .transport(transport.clone())
        .namespace("math")
        .build()
        .unwrap();
    transport.respond(Value::Int(3));

    client.call("add", params![1, 2]).unwrap();
    assert_eq!(transport.requests()[0].method.as_deref(), Some("math.add"));
}

// ---------------------------------------------------------------------------
// Single calls
// ---------------------------------------------------------------------------

#[test]
fn single_call_resolves_name_and_returns_result() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    transport.respond(Value::Int(3));

    let reply = client.namespace("math").call("add", params![1, 2]).unwrap();

    assert_eq!(reply.into_value(), Some(Value::Int(3)));
    let requests = transport.requests();
    assert_eq!(requests[0].method.as_deref(), Some("math.add"));
    assert_eq!(requests[0].params, params![1, 2]);
}

#[test]
fn last_request_and_response_are_kept_for_diagnostics() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    assert_eq!(client.last_request(), None);
    transport.respond(Value::from("pong"));

    client.call("ping", params![]).unwrap();

    let request = client.last_request().unwrap();
    let decoded = JsonCodec
        .decode_request(&request, &OutputOptions::default())
        .unwrap();
    assert_eq!(decoded.method.as_deref(), Some("ping"));
    let response = client.namespace("any").last_response().unwrap();
    assert_eq!(
        JsonCodec.decode_response(&response, "utf-8").unwrap(),
        Value::from("pong")
    );
}

#[test]
fn failed_post_keeps_the_request_without_a_stale_response() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    transport.respond(Value::from("pong"));
    client.call("ping", params![]).unwrap();
    assert!(client.last_response().is_some());

    client.call("echo", params![]).unwrap_err();

    let request = client.last_request().unwrap();
    let decoded = JsonCodec
        .decode_request(&request, &OutputOptions::default())
        .unwrap();
    assert_eq!(decoded.method.as_deref(), Some("echo"));
    assert_eq!(client.last_response(), None);
}

#[rstest]
#[case::returned_as_data(false)]
#[case::raised(true)]
fn single_call_faults_follow_the_raise_setting(#[case] raise: bool) {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    client.set_raise_faults(raise);
    let fault = Fault::new(codes::METHOD_NOT_FOUND, "Method unknown not found.");
    transport.respond(fault.to_value());

    let outcome = client.call("unknown", params![]);

    if raise {
        match outcome {
            Err(RipcordError::RemoteFault { fault: raised }) => assert_eq!(raised, fault),
            other => panic!("expected a raised fault, got {other:?}"),
        }
    } else {
        assert_eq!(outcome.unwrap().into_value(), Some(fault.to_value()));
    }
}

#[test]
fn transport_failure_surfaces_as_cannot_access_url() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);

    let err = client.call("ping", params![]).unwrap_err();

    assert_eq!(err.code(), codes::CANNOT_ACCESS_URL);
    assert_eq!(err.to_string(), "Could not access http://rpc.test/endpoint");
}

#[rstest]
#[case::base64(Value::Base64("aGVsbG8=".into()), Value::Binary(b"hello".to_vec()))]
#[case::datetime(
    Value::DateTime("20240102T03:04:05".into()),
    Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap().timestamp())
)]
#[case::unparsable_datetime_left_alone(
    Value::DateTime("yesterday".into()),
    Value::DateTime("yesterday".into())
)]
#[case::plain(Value::from("text"), Value::from("text"))]
fn auto_decode_converts_wire_typed_scalars(#[case] wire: Value, #[case] expected: Value) {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    transport.respond(wire);

    let value = client.call("fetch", params![]).unwrap().into_value();
    assert_eq!(value, Some(expected));
}

#[test]
fn auto_decode_can_be_disabled() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    client.set_auto_decode(false);
    assert!(!client.auto_decodes());
    transport.respond(Value::Base64("aGVsbG8=".into()));

    let value = client.call("fetch", params![]).unwrap().into_value();
    assert_eq!(value, Some(Value::Base64("aGVsbG8=".into())));
}

#[test]
fn output_options_are_shared_across_the_namespace_tree() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);

    assert!(client.namespace("a").set_output_option("verbosity", "no_white_space"));
    assert!(!client.set_output_option("colour", "blue"));
    assert_eq!(
        client.output_options().verbosity,
        protocol::Verbosity::NoWhiteSpace
    );
}

// ---------------------------------------------------------------------------
// Deferred recording and batches
// ---------------------------------------------------------------------------

#[test]
fn multicall_without_arguments_returns_a_composer() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);

    let reply = client.namespace("system").call("multiCall", params![]).unwrap();
    let composer = reply.into_composer().unwrap();

    assert_eq!(composer.method(), "system.multiCall");
    assert!(!composer.is_recording());
    assert_eq!(transport.posts(), 0);
}

#[test]
fn recorded_calls_execute_in_one_round_trip() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    let batch = client.multi_call();
    batch.start();

    let first = client.namespace("math").call("add", params![1, 2]).unwrap();
    let second = client.call("echo", params!["hi"]).unwrap();
    let first_cell = first.bind().unwrap();
    let second = second.into_call().unwrap();
    assert!(!first_cell.is_filled());
    assert_eq!(batch.pending(), 2);
    assert_eq!(transport.posts(), 0);

    transport.respond(Value::Array(vec![
        Value::Array(params![3]),
        Value::Array(params!["hi"]),
    ]));
    let results = batch.execute().unwrap();

    assert_eq!(transport.posts(), 1);
    let request = &transport.requests()[0];
    assert_eq!(request.method.as_deref(), Some("system.multiCall"));
    assert_eq!(
        batch_request(request),
        vec![
            CallDescriptor::new("math.add", params![1, 2]),
            CallDescriptor::new("echo", params!["hi"]),
        ]
    );
    assert_eq!(results.keys().collect::<Vec<_>>(), ["0", "1"]);
    assert_eq!(first_cell.get(), Some(Value::Int(3)));
    assert_eq!(second.index(), Some(1));
    assert_eq!(second.result(), Some(Value::from("hi")));
    assert!(!batch.is_recording());
    assert_eq!(batch.pending(), 0);
}

#[test]
fn per_call_faults_are_data_even_when_raising() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    client.set_raise_faults(true);
    let batch = client.multi_call();
    batch.start();
    let ok = client.call("add", params![1, 2]).unwrap().into_call().unwrap();
    let bad = client.call("unknown", params![]).unwrap().into_call().unwrap();

    let fault = Fault::new(codes::METHOD_NOT_FOUND, "Method unknown not found.");
    transport.respond(Value::Array(vec![Value::Array(params![3]), fault.to_value()]));
    let results = batch.execute().unwrap();

    assert_eq!(ok.result(), Some(Value::Int(3)));
    assert_eq!(bad.result(), Some(fault.to_value()));
    assert_eq!(results.faults().collect::<Vec<_>>(), [("1", fault)]);
}

#[test]
fn whole_batch_fault_reaches_every_call_when_not_raising() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    let batch = client.multi_call();
    batch.start();
    let a = client.call("a", params![]).unwrap().into_call().unwrap();
    let b = client.call("b", params![]).unwrap().into_call().unwrap();

    let fault = Fault::new(codes::ILLEGAL_MULTICALL_PARAMS, "rejected");
    transport.respond(fault.to_value());
    batch.execute().unwrap();

    assert_eq!(a.result(), Some(fault.to_value()));
    assert_eq!(b.result(), Some(fault.to_value()));
}

#[test]
fn whole_batch_fault_is_raised_when_raising() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    client.set_raise_faults(true);
    let batch = client.multi_call();
    batch.start();
    client.call("a", params![]).unwrap();

    transport.respond(Fault::new(codes::ILLEGAL_MULTICALL_PARAMS, "rejected").to_value());
    let err = batch.execute().unwrap_err();
    assert_eq!(err.code(), codes::ILLEGAL_MULTICALL_PARAMS);
}

#[test]
fn mismatched_batch_response_is_a_codec_error() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    let batch = client.multi_call();
    batch.start();
    client.call("a", params![]).unwrap();
    client.call("b", params![]).unwrap();

    transport.respond(Value::Array(vec![Value::Array(params![1])]));
    let err = batch.execute().unwrap_err();
    assert!(matches!(err, RipcordError::Codec(_)));
}

#[test]
fn keyed_batch_results_come_back_under_the_same_keys() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    let add = |a: i64, b: i64| CallDescriptor::new("add", params![a, b]).to_value();
    let keyed: Value = [("a", add(1, 2)), ("b", add(3, 4))].into_iter().collect();

    transport.respond(Value::Array(vec![
        Value::Array(params![3]),
        Value::Array(params![7]),
    ]));
    let reply = client.call("system.multicall", vec![keyed]).unwrap();

    let results = reply.into_batch().unwrap();
    assert_eq!(results.get("a"), Some(&Value::Int(3)));
    assert_eq!(results.get("b"), Some(&Value::Int(7)));
    assert_eq!(transport.requests()[0].method.as_deref(), Some("system.multicall"));
}

#[test]
fn invalid_batch_entry_is_rejected_before_any_io() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);

    let err = client
        .multi_call_with([
            ("good", Value::from(CallDescriptor::new("add", params![1, 2]).to_value())),
            ("bad", Value::from(5)),
        ])
        .unwrap_err();

    assert_eq!(err.code(), codes::NOT_RIPCORD_CALL);
    assert_eq!(err.to_string(), "Argument bad is not a valid Ripcord call");
    assert_eq!(transport.posts(), 0);
}

#[test]
fn rejected_batch_stops_recording_and_leaves_calls_unindexed() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    let batch = client.multi_call();
    batch.start();
    let recorded = client.call("add", params![1, 1]).unwrap().into_call().unwrap();
    let built = crate::Call::new("add", params![2, 2]);

    let err = client
        .multi_call_with([
            ("built", crate::BatchEntry::from(built.clone())),
            ("bad", crate::BatchEntry::from(Value::from(5))),
        ])
        .unwrap_err();

    assert_eq!(err.code(), codes::NOT_RIPCORD_CALL);
    assert!(!batch.is_recording());
    assert_eq!(batch.pending(), 0);
    assert_eq!(recorded.index(), None);
    assert_eq!(built.index(), None);

    transport.respond(Value::Int(7));
    let reply = client.call("add", params![3, 4]).unwrap();
    assert!(matches!(reply, Reply::Value(Value::Int(7))));
    assert_eq!(transport.posts(), 1);
}

#[test]
fn explicit_batch_mixes_built_calls_and_descriptors() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    let call = crate::Call::new("add", params![1, 2]);
    let cell = call.bind();

    transport.respond(Value::Array(vec![
        Value::Array(params![3]),
        Value::Array(params!["x"]),
    ]));
    let results = client
        .multi_call_with([
            ("sum", crate::BatchEntry::from(call)),
            ("echo", CallDescriptor::new("echo", params!["x"]).into()),
        ])
        .unwrap();

    assert_eq!(cell.get(), Some(Value::Int(3)));
    assert_eq!(results.into_values(), params![3, "x"]);
}

#[test]
fn executed_reply_binds_to_a_filled_cell() {
    let transport = ScriptedTransport::default();
    let client = client(&transport);
    transport.respond(Value::Int(9));

    let reply = client.call("square", params![3]).unwrap();
    assert!(matches!(reply, Reply::Value(_)));
    assert_eq!(reply.bind().and_then(|cell| cell.get()), Some(Value::Int(9)));
}

proptest! {
    #[test]
    fn batch_results_align_with_submission_order(
        values in proptest::collection::vec(any::<i64>(), 1..12)
    ) {
        let transport = ScriptedTransport::default();
        let client = client(&transport);
        let batch = client.multi_call();
        batch.start();
        let calls: Vec<_> = values
            .iter()
            .map(|v| client.call("echo", params![*v]).unwrap().into_call().unwrap())
            .collect();

        transport.respond(Value::Array(
            values.iter().map(|v| Value::Array(params![*v])).collect(),
        ));
        let results = batch.execute().unwrap();

        prop_assert_eq!(results.len(), values.len());
        for (position, (call, value)) in calls.iter().zip(&values).enumerate() {
            prop_assert_eq!(call.index(), Some(position));
            prop_assert_eq!(call.result(), Some(Value::Int(*value)));
            prop_assert_eq!(results.get(&position.to_string()), Some(&Value::Int(*value)));
        }
    }
}
