//! Proxy HTTP client and tool-surface tests against an in-process HTTP
//! fixture.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

use serde_json::json;

use javelin_debug::proxy::ProxyClient;
use javelin_debug::{Config, DebugTools};

/// Serves scripted HTTP responses for a fixed number of requests.
struct HttpFixture {
    port: u16,
    handle: Option<JoinHandle<Vec<(String, String)>>>,
}

impl HttpFixture {
    fn spawn(
        requests: usize,
        responder: impl Fn(&str, &str) -> (u16, String) + Send + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind http fixture");
        let port = listener.local_addr().expect("local addr").port();

        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..requests {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();

                // Drain headers; requests carry no bodies.
                let mut content_length = 0usize;
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).is_err() || header.trim().is_empty() {
                        break;
                    }
                    if let Some(value) = header
                        .to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(str::trim)
                        .and_then(|v| v.parse::<usize>().ok())
                    {
                        content_length = value;
                    }
                }
                if content_length > 0 {
                    let mut body = vec![0u8; content_length];
                    let _ = reader.read_exact(&mut body);
                }

                let (status, body) = responder(&method, &path);
                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    _ => "Error",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let mut stream = reader.into_inner();
                let _ = stream.write_all(response.as_bytes());
                seen.push((method, path));
            }
            seen
        });

        Self {
            port,
            handle: Some(handle),
        }
    }

    fn finish(mut self) -> Vec<(String, String)> {
        self.handle
            .take()
            .map(|handle| handle.join().unwrap_or_default())
            .unwrap_or_default()
    }
}

fn breakpoints_body() -> String {
    json!({
        "breakpoints": [
            {
                "requestId": 12,
                "classId": 512,
                "methodId": 1024,
                "codeIndex": 7,
                "className": "demo.C",
                "methodName": "method",
                "lineNumber": 10
            },
            { "requestId": 13, "classId": 513, "methodId": 1025, "codeIndex": 0 }
        ]
    })
    .to_string()
}

#[test]
fn breakpoint_listing_decodes_optional_fields() {
    let fixture = HttpFixture::spawn(1, |method, path| {
        assert_eq!(method, "GET");
        assert_eq!(path, "/breakpoints");
        (200, breakpoints_body())
    });

    let client = ProxyClient::new("127.0.0.1", fixture.port);
    let records = client.list_breakpoints().expect("list breakpoints");
    fixture.finish();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].request_id, 12);
    assert_eq!(records[0].class_name.as_deref(), Some("demo.C"));
    assert_eq!(records[0].line_number, Some(10));
    assert_eq!(records[1].class_name, None);
    assert_eq!(records[1].line_number, None);
}

#[test]
fn delete_distinguishes_deleted_from_unknown() {
    let fixture = HttpFixture::spawn(2, |method, path| {
        assert_eq!(method, "DELETE");
        match path {
            "/breakpoints/12" => (200, "{}".to_string()),
            "/breakpoints/99" => (404, "{}".to_string()),
            other => panic!("unexpected path {other}"),
        }
    });

    let client = ProxyClient::new("127.0.0.1", fixture.port);
    assert!(client.delete_breakpoint(12).expect("delete existing"));
    assert!(!client.delete_breakpoint(99).expect("delete unknown"));
    fixture.finish();
}

#[test]
fn current_thread_maps_404_to_none() {
    let fixture = HttpFixture::spawn(1, |_method, path| {
        assert_eq!(path, "/current-thread");
        (404, String::new())
    });
    let client = ProxyClient::new("127.0.0.1", fixture.port);
    assert!(client.current_thread().expect("current thread").is_none());

    // And a captured thread decodes.
    let _ = fixture.finish();
    let fixture = HttpFixture::spawn(1, |_method, _path| {
        (
            200,
            json!({
                "threadId": 77,
                "threadName": "main",
                "suspended": true,
                "frames": 3
            })
            .to_string(),
        )
    });
    let client = ProxyClient::new("127.0.0.1", fixture.port);
    let current = client
        .current_thread()
        .expect("current thread")
        .expect("captured");
    assert_eq!(current.thread_id, 77);
    assert_eq!(current.thread_name, "main");
    assert!(current.suspended);
    fixture.finish();
}

/// Minimal JDWP endpoint: accepts the handshake and answers IDSizes and
/// Version, which is everything `attach` needs. Lives until the client
/// closes its socket.
fn spawn_jdwp_stub() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind jdwp stub");
    let port = listener.local_addr().expect("local addr").port();

    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut greeting = [0u8; 14];
        if stream.read_exact(&mut greeting).is_err() {
            return;
        }
        let _ = stream.write_all(b"JDWP-Handshake");

        loop {
            let mut len_buf = [0u8; 4];
            if stream.read_exact(&mut len_buf).is_err() {
                return;
            }
            let length = u32::from_be_bytes(len_buf) as usize;
            let mut rest = vec![0u8; length - 4];
            if stream.read_exact(&mut rest).is_err() {
                return;
            }
            let id = u32::from_be_bytes(rest[0..4].try_into().unwrap());
            let (set, command) = (rest[5], rest[6]);

            let payload: Vec<u8> = match (set, command) {
                (1, 7) => (0..5).flat_map(|_| 8i32.to_be_bytes()).collect(),
                (1, 1) => {
                    let jdwp_string = |value: &str| {
                        let mut out = (value.len() as u32).to_be_bytes().to_vec();
                        out.extend_from_slice(value.as_bytes());
                        out
                    };
                    let mut body = Vec::new();
                    body.extend(jdwp_string("stub debugger"));
                    body.extend(11i32.to_be_bytes());
                    body.extend(0i32.to_be_bytes());
                    body.extend(jdwp_string("17.0.9"));
                    body.extend(jdwp_string("Stub VM"));
                    body
                }
                _ => Vec::new(),
            };

            let total = 11 + payload.len();
            let mut packet = Vec::with_capacity(total);
            packet.extend_from_slice(&(total as u32).to_be_bytes());
            packet.extend_from_slice(&id.to_be_bytes());
            packet.push(0x80);
            packet.extend_from_slice(&0u16.to_be_bytes());
            packet.extend_from_slice(&payload);
            if stream.write_all(&packet).is_err() {
                return;
            }
        }
    });

    port
}

/// Tools with an attached session (against the stub) and the proxy HTTP
/// client pointed at the fixture.
fn attached_tools_against(http_port: u16) -> DebugTools {
    let config = Config {
        jdwp_port: spawn_jdwp_stub(),
        proxy_port: http_port - 1,
        ..Config::default()
    };
    let tools = DebugTools::new(config);
    let attached = tools.dispatch("attach", &json!({}));
    assert!(attached.starts_with("Attached"), "{attached}");
    tools
}

#[test]
fn breakpoint_clearing_tools_delegate_to_the_proxy() {
    let fixture = HttpFixture::spawn(3, |method, path| match (method, path) {
        ("GET", "/breakpoints") => (200, breakpoints_body()),
        ("DELETE", "/breakpoints/12") | ("DELETE", "/breakpoints/13") => (200, "{}".to_string()),
        other => panic!("unexpected request {other:?}"),
    });

    let tools = attached_tools_against(fixture.port);
    let out = tools.dispatch("clear-all-breakpoints", &json!({}));
    assert_eq!(out, "Cleared 2 breakpoint(s)");

    let seen = fixture.finish();
    assert_eq!(seen[0], ("GET".to_string(), "/breakpoints".to_string()));
    assert!(seen.iter().any(|(m, p)| m == "DELETE" && p == "/breakpoints/12"));
}

#[test]
fn clearing_an_unknown_breakpoint_id_is_an_error_line() {
    let fixture = HttpFixture::spawn(1, |_method, _path| (404, "{}".to_string()));
    let tools = attached_tools_against(fixture.port);
    let out = tools.dispatch("clear-breakpoint-by-id", &json!({"requestId": 99}));
    assert_eq!(out, "ERROR: no breakpoint with request id 99");
    fixture.finish();
}

#[test]
fn get_current_thread_tool_renders_null_on_404() {
    let fixture = HttpFixture::spawn(1, |_method, _path| (404, String::new()));
    let tools = attached_tools_against(fixture.port);
    let out = tools.dispatch("get-current-thread", &json!({}));
    assert_eq!(out, "null");
    fixture.finish();
}

#[test]
fn watcher_evaluation_requires_an_attached_session() {
    // The ordering contract runs discovery before any evaluation; with no
    // session at all that surfaces as the NotAttached environment error.
    let tools = DebugTools::new(Config::default());
    let out = tools.dispatch(
        "evaluate-watchers",
        &json!({"threadId": 1, "scope": "current-frame"}),
    );
    assert!(out.starts_with("ERROR: not attached"), "{out}");
}
