//! Built-in legacy result shapes

use serde_json::Value as JsonValue;

use super::{measure, LegacyParser};
use crate::model::Metric;
use crate::{Error, Result};

/// JSON array of records, each carrying its own request/response timestamps
///
/// Used by the gRPC, REST, GraphQL, AVRO and CBOR requesters, which differ
/// only in field names. The record position is the request id.
#[derive(Debug, Clone)]
pub struct RecordListParser {
    tag: String,
    protocol: String,
    source_file: String,
    request_field: String,
    response_field: String,
}

impl RecordListParser {
    pub fn new(
        tag: impl Into<String>,
        protocol: impl Into<String>,
        source_file: impl Into<String>,
        request_field: impl Into<String>,
        response_field: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            protocol: protocol.into(),
            source_file: source_file.into(),
            request_field: request_field.into(),
            response_field: response_field.into(),
        }
    }

    pub fn grpc() -> Self {
        Self::new(
            "grpc",
            "gRPC",
            "grpc_out.txt",
            "grpc_requester_timestamp",
            "grpc_responder_timestamp",
        )
    }

    pub fn rest() -> Self {
        Self::new("rest", "REST", "rest_out.txt", "request_timestamp", "response_timestamp")
    }

    pub fn graphql() -> Self {
        Self::new("graphql", "GraphQL", "graphql_out.txt", "requestTimestamp", "responseTimestamp")
    }

    pub fn avro() -> Self {
        Self::new("avro", "AVRO", "avro_out.txt", "request_timestamp", "response_timestamp")
    }

    pub fn cbor() -> Self {
        Self::new("cbor", "CBOR", "cbor_out.txt", "request_timestamp", "response_timestamp")
    }
}

impl LegacyParser for RecordListParser {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn extract_metrics(&self, payload: &JsonValue) -> Result<Vec<Metric>> {
        let records = payload.as_array().ok_or_else(|| {
            Error::Payload(format!("{} results must be a JSON array of records", self.protocol))
        })?;

        let metrics: Vec<Metric> = records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                let field = |name: &str| record.get(name).and_then(JsonValue::as_str);
                measure(idx as u64, field(&self.request_field), field(&self.response_field))
            })
            .collect();

        let skipped = records.len() - metrics.len();
        if skipped > 0 {
            tracing::warn!("{}: skipped {} of {} records", self.protocol, skipped, records.len());
        }
        Ok(metrics)
    }
}

/// Single object with one shared request timestamp and a list of response timestamps
///
/// Produced by push-style requesters (Socket.IO), where one broadcast request
/// fans out to many responses. The position in the response list is the request id.
#[derive(Debug, Clone)]
pub struct BroadcastParser {
    tag: String,
    protocol: String,
    source_file: String,
    request_field: String,
    responses_field: String,
}

impl BroadcastParser {
    pub fn new(
        tag: impl Into<String>,
        protocol: impl Into<String>,
        source_file: impl Into<String>,
        request_field: impl Into<String>,
        responses_field: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            protocol: protocol.into(),
            source_file: source_file.into(),
            request_field: request_field.into(),
            responses_field: responses_field.into(),
        }
    }

    pub fn socketio() -> Self {
        Self::new("socketio", "Socket.IO", "sio_out.txt", "request_ts", "respond_ts")
    }
}

impl LegacyParser for BroadcastParser {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn extract_metrics(&self, payload: &JsonValue) -> Result<Vec<Metric>> {
        let object = payload.as_object().ok_or_else(|| {
            Error::Payload(format!("{} results must be a JSON object", self.protocol))
        })?;

        let request = object.get(&self.request_field).and_then(JsonValue::as_str);
        let responses = match object.get(&self.responses_field) {
            None | Some(JsonValue::Null) => return Ok(Vec::new()),
            Some(JsonValue::Array(items)) => items,
            Some(_) => {
                return Err(Error::Payload(format!(
                    "{} field '{}' must be an array of timestamps",
                    self.protocol, self.responses_field
                )))
            }
        };

        let metrics: Vec<Metric> = responses
            .iter()
            .enumerate()
            .filter_map(|(idx, response)| measure(idx as u64, request, response.as_str()))
            .collect();

        let skipped = responses.len() - metrics.len();
        if skipped > 0 {
            tracing::warn!("{}: skipped {} of {} responses", self.protocol, skipped, responses.len());
        }
        Ok(metrics)
    }
}
