//! Integration tests for importing legacy result directories

use std::fs;
use std::path::Path;

use protobench_core::normalize::{import_dir, ImportOutcome, ParserRegistry};
use protobench_core::Error;
use serde_json::json;
use tempfile::tempdir;

fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_string(&value).unwrap()).unwrap();
}

#[test]
fn test_import_all_shapes() {
    let dir = tempdir().unwrap();

    write_json(
        dir.path(),
        "grpc_out.txt",
        json!([
            {"request_id": 0, "grpc_requester_timestamp": "2024-01-01T00:00:00", "grpc_responder_timestamp": "2024-01-01T00:00:00.010"},
            {"request_id": 1, "grpc_requester_timestamp": "2024-01-01T00:00:01", "grpc_responder_timestamp": "2024-01-01T00:00:01.020"}
        ]),
    );
    write_json(
        dir.path(),
        "rest_out.txt",
        json!([{"request_timestamp": "2024-01-01T00:00:00", "response_timestamp": "2024-01-01T00:00:01"}]),
    );
    write_json(
        dir.path(),
        "graphql_out.txt",
        json!([
            {"requestTimestamp": "2024-01-01T00:00:00Z", "responseTimestamp": "2024-01-01T00:00:00.5Z"},
            {"requestTimestamp": "2024-01-01T00:00:01Z", "responseTimestamp": ""},
            {"requestTimestamp": "2024-01-01T00:00:02Z", "responseTimestamp": "2024-01-01T00:00:02.25Z"}
        ]),
    );
    write_json(
        dir.path(),
        "avro_out.txt",
        json!([{"request_timestamp": "2024-01-01T00:00:00", "response_timestamp": "2024-01-01T00:00:02"}]),
    );
    write_json(
        dir.path(),
        "cbor_out.txt",
        json!([{"request_timestamp": "2024-01-01T00:00:00", "response_timestamp": "2024-01-01T00:00:03"}]),
    );
    write_json(
        dir.path(),
        "sio_out.txt",
        json!({"request_ts": "2024-01-01T00:00:00", "respond_ts": ["2024-01-01T00:00:01", "2024-01-01T00:00:03"]}),
    );

    let report = import_dir(&ParserRegistry::with_defaults(), dir.path());

    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(report.imported_count(), 6);
    assert_eq!(report.failed_count(), 0);

    let mut protocols: Vec<&str> = report.runs().map(|r| r.protocol.as_str()).collect();
    protocols.sort_unstable();
    assert_eq!(protocols, vec!["AVRO", "CBOR", "GraphQL", "REST", "Socket.IO", "gRPC"]);

    let graphql = report.runs().find(|r| r.protocol == "GraphQL").unwrap();
    assert_eq!(graphql.metrics.len(), 2);
    assert_eq!(graphql.metrics[1].request_id, 2);
    assert!(graphql.run_id.starts_with("graphql_"));

    let sio = report.runs().find(|r| r.protocol == "Socket.IO").unwrap();
    assert_eq!(sio.stats.unwrap().max, 3.0);
    assert_eq!(sio.metadata["source_file"], "sio_out.txt");
}

#[test]
fn test_bad_file_does_not_abort_batch() {
    let dir = tempdir().unwrap();

    fs::write(dir.path().join("grpc_out.txt"), "this is not json").unwrap();
    write_json(dir.path(), "rest_out.txt", json!({"unexpected": "object"}));
    write_json(
        dir.path(),
        "cbor_out.txt",
        json!([{"request_timestamp": "2024-01-01T00:00:00", "response_timestamp": "2024-01-01T00:00:01"}]),
    );

    let report = import_dir(&ParserRegistry::with_defaults(), dir.path());

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.imported_count(), 1);
    assert_eq!(report.failed_count(), 2);

    for outcome in &report.outcomes {
        let name = outcome.file().file_name().unwrap().to_str().unwrap();
        match (name, outcome) {
            ("cbor_out.txt", ImportOutcome::Imported { run, .. }) => {
                assert_eq!(run.protocol, "CBOR");
            }
            ("grpc_out.txt", ImportOutcome::Failed { error, .. }) => {
                assert!(matches!(error, Error::SourceUnreadable { .. }));
            }
            ("rest_out.txt", ImportOutcome::Failed { error, .. }) => {
                assert!(matches!(error, Error::Payload(_)));
            }
            (name, outcome) => panic!("unexpected outcome for {name}: {outcome:?}"),
        }
    }
}

#[test]
fn test_only_present_files_are_reported() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "sio_out.txt", json!({"request_ts": "", "respond_ts": []}));
    write_json(dir.path(), "unrelated.json", json!([1, 2, 3]));

    let report = import_dir(&ParserRegistry::with_defaults(), dir.path());

    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].is_success());
    let run = report.runs().next().unwrap();
    assert!(run.metrics.is_empty());
    assert_eq!(run.stats.unwrap().count, 0);
}
