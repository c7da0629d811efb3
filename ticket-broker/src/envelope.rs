// ticket-broker/src/envelope.rs
// ============================================================================
// Module: Task Envelope Construction
// Description: Builds the positional-argument task body published to the
//              broker queues.
// Purpose: Keep message-shape construction pure and independently testable,
//          isolated from the AMQP transport in crate::publisher.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Every published task carries a single positional-argument tuple (§4.3):
//! `run.process` receives the incident projection, `run.hubstream_sync`
//! receives `{ticketId}`. This module builds the JSON body and the message
//! headers a worker needs to dispatch on the task name, independent of the
//! AMQP client.
//!
//! The original deployment's workers expect a pickle-serialized task body
//! (`serializer=pickle`); no Rust crate in this workspace's dependency
//! lineage speaks that wire format, so this implementation emits an
//! equivalent JSON envelope instead and records the gap as a cross-cutting
//! interop constraint (§9, `DESIGN.md`) rather than fabricating a
//! pickle-compatible dependency.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Task Message
// ============================================================================

/// A single task publish: a name plus its ordered positional arguments.
#[derive(Debug, Clone)]
pub struct TaskMessage {
    /// Dotted task name (`run.process`, `run.hubstream_sync`).
    pub name: String,
    /// Ordered positional arguments; always a one-tuple in this service.
    pub args: Vec<Value>,
    /// Correlation identifier carried in the AMQP properties.
    pub correlation_id: String,
}

impl TaskMessage {
    /// Builds the `run.process` task for the middleware queue.
    #[must_use]
    pub fn process(projection: Value, ticket_id: &str) -> Self {
        Self {
            name: "run.process".to_string(),
            args: vec![projection],
            correlation_id: ticket_id.to_string(),
        }
    }

    /// Builds the `run.hubstream_sync` task for the GDBS queue.
    #[must_use]
    pub fn hubstream_sync(ticket_id: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("ticketId".to_string(), Value::String(ticket_id.to_string()));
        Self {
            name: "run.hubstream_sync".to_string(),
            args: vec![Value::Object(payload)],
            correlation_id: ticket_id.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Body Construction
// ============================================================================

/// Builds the JSON task body: `[args, kwargs, embed]`, the same three-slot
/// shape a pickle-serialized task body would carry, with an empty `kwargs`
/// object and the embed fields the worker's task protocol expects.
#[must_use]
pub fn build_body(message: &TaskMessage) -> Vec<u8> {
    let body = json!([
        message.args,
        Value::Object(Map::new()),
        {
            "callbacks": Value::Null,
            "errbacks": Value::Null,
            "chain": Value::Null,
            "chord": Value::Null,
        }
    ]);
    serde_json::to_vec(&body).unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_task_carries_projection_as_sole_argument() {
        let projection = json!({"ticketId": "DCU1"});
        let message = TaskMessage::process(projection.clone(), "DCU1");
        assert_eq!(message.name, "run.process");
        assert_eq!(message.args, vec![projection]);
        assert_eq!(message.correlation_id, "DCU1");
    }

    #[test]
    fn hubstream_sync_task_carries_ticket_id_object() {
        let message = TaskMessage::hubstream_sync("DCU1");
        assert_eq!(message.name, "run.hubstream_sync");
        assert_eq!(message.args, vec![json!({"ticketId": "DCU1"})]);
    }

    #[test]
    fn body_is_a_three_slot_args_kwargs_embed_array() {
        let message = TaskMessage::hubstream_sync("DCU1");
        let body = build_body(&message);
        let decoded: Value = serde_json::from_slice(&body).expect("body must be valid json");
        let array = decoded.as_array().expect("body must be an array");
        assert_eq!(array.len(), 3);
        assert_eq!(array[0], json!([{"ticketId": "DCU1"}]));
        assert_eq!(array[1], json!({}));
    }
}
