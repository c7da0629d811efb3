// ticket-backend-http/tests/backend_http.rs
// ============================================================================
// Module: HTTP Backend Adapter Tests
// Description: Integration tests for HttpBackendAdapter against a local server.
// Purpose: Validate status parsing, X-Total-Count propagation, and write methods.
// Dependencies: ticket-backend-http, ticket-core, tiny_http
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::thread;

use serde_json::json;
use ticket_backend_http::HttpBackendAdapter;
use ticket_backend_http::HttpBackendConfig;
use ticket_core::BackendAdapter;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

fn local_adapter(addr: &str) -> HttpBackendAdapter {
    HttpBackendAdapter::new(HttpBackendConfig {
        base_url: format!("http://{addr}"),
        username: "svc".to_string(),
        password: "secret".to_string(),
        timeout_ms: 2_000,
    })
    .expect("client must build")
}

#[test]
fn get_parses_total_count_header_and_wrapped_result() {
    let server = Server::http("127.0.0.1:0").expect("server must bind");
    let addr = server.server_addr().to_ip().expect("addr must be ip").to_string();

    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let header = Header::from_bytes(&b"X-Total-Count"[..], &b"25"[..]).expect("header must build");
            let response = Response::from_string(r#"{"result":[{"u_number":"DCU1"}]}"#)
                .with_status_code(200)
                .with_header(header);
            let _ = request.respond(response);
        }
    });

    let adapter = local_adapter(&addr);
    let response = adapter.get("u_dcu_ticket?sysparm_limit=10").expect("get must succeed");

    assert_eq!(response.status, 200);
    assert_eq!(response.total_count, Some(25));
    assert_eq!(response.body["result"][0]["u_number"], "DCU1");

    handle.join().expect("server thread must not panic");
}

#[test]
fn post_sends_json_body_and_returns_created_status() {
    let server = Server::http("127.0.0.1:0").expect("server must bind");
    let addr = server.server_addr().to_ip().expect("addr must be ip").to_string();

    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let response =
                Response::from_string(r#"{"result":{"u_number":"DCU2"}}"#).with_status_code(201);
            let _ = request.respond(response);
        }
    });

    let adapter = local_adapter(&addr);
    let response = adapter.post("u_dcu_ticket", json!({"u_type": "PHISHING"})).expect("post must succeed");

    assert_eq!(response.status, 201);
    assert_eq!(response.body["result"]["u_number"], "DCU2");

    handle.join().expect("server thread must not panic");
}

#[test]
fn empty_body_is_treated_as_json_null() {
    let server = Server::http("127.0.0.1:0").expect("server must bind");
    let addr = server.server_addr().to_ip().expect("addr must be ip").to_string();

    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let response = Response::from_string("").with_status_code(204);
            let _ = request.respond(response);
        }
    });

    let adapter = local_adapter(&addr);
    let response = adapter.get("u_dcu_ticket/DCU1").expect("get must succeed");

    assert_eq!(response.status, 204);
    assert!(response.body.is_null());

    handle.join().expect("server thread must not panic");
}
