//! Wire-level tests against a scripted in-process JDWP endpoint.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use javelin_jdwp::{JdwpClient, JdwpError};

const HANDSHAKE: &[u8] = b"JDWP-Handshake";

enum Step {
    /// Reply to the next non-IDSizes command with this payload.
    Reply(Vec<u8>),
    /// Reply to the next non-IDSizes command with this error code.
    Error(u16),
    /// Send an unsolicited event packet first, then reply with the payload.
    EventThenReply { event: Vec<u8>, payload: Vec<u8> },
}

struct ScriptedServer {
    port: u16,
    commands: Arc<Mutex<Vec<(u8, u8)>>>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedServer {
    fn spawn(script: Vec<Step>) -> Self {
        Self::spawn_with_handshake(script, true)
    }

    fn spawn_with_handshake(script: Vec<Step>, accept_handshake: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture listener");
        let port = listener.local_addr().expect("local addr").port();
        let commands: Arc<Mutex<Vec<(u8, u8)>>> = Arc::new(Mutex::new(Vec::new()));
        let log = commands.clone();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };

            let mut greeting = [0u8; HANDSHAKE.len()];
            if stream.read_exact(&mut greeting).is_err() {
                return;
            }
            if accept_handshake {
                let _ = stream.write_all(HANDSHAKE);
            } else {
                let _ = stream.write_all(b"NOT-A-DEBUGGER");
                return;
            }

            let mut script: VecDeque<Step> = script.into();
            loop {
                let Some((id, set, command)) = read_command(&mut stream) else {
                    return;
                };
                log.lock().unwrap().push((set, command));

                if (set, command) == (1, 7) {
                    // IDSizes: five 8-byte widths.
                    let mut payload = Vec::new();
                    for _ in 0..5 {
                        payload.extend_from_slice(&8i32.to_be_bytes());
                    }
                    write_reply(&mut stream, id, 0, &payload);
                    continue;
                }

                match script.pop_front() {
                    Some(Step::Reply(payload)) => write_reply(&mut stream, id, 0, &payload),
                    Some(Step::Error(code)) => write_reply(&mut stream, id, code, &[]),
                    Some(Step::EventThenReply { event, payload }) => {
                        write_event(&mut stream, &event);
                        write_reply(&mut stream, id, 0, &payload);
                    }
                    None => write_reply(&mut stream, id, 0, &[]),
                }
            }
        });

        Self {
            port,
            commands,
            handle: Some(handle),
        }
    }

    fn commands(&self) -> Vec<(u8, u8)> {
        self.commands.lock().unwrap().clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_command(stream: &mut TcpStream) -> Option<(u32, u8, u8)> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).ok()?;
    let length = u32::from_be_bytes(len_buf) as usize;
    let mut rest = vec![0u8; length - 4];
    stream.read_exact(&mut rest).ok()?;
    let id = u32::from_be_bytes(rest[0..4].try_into().unwrap());
    Some((id, rest[5], rest[6]))
}

fn write_reply(stream: &mut TcpStream, id: u32, error_code: u16, payload: &[u8]) {
    let length = 11 + payload.len();
    let mut packet = Vec::with_capacity(length);
    packet.extend_from_slice(&(length as u32).to_be_bytes());
    packet.extend_from_slice(&id.to_be_bytes());
    packet.push(0x80);
    packet.extend_from_slice(&error_code.to_be_bytes());
    packet.extend_from_slice(payload);
    let _ = stream.write_all(&packet);
}

fn write_event(stream: &mut TcpStream, data: &[u8]) {
    let length = 11 + data.len();
    let mut packet = Vec::with_capacity(length);
    packet.extend_from_slice(&(length as u32).to_be_bytes());
    packet.extend_from_slice(&0x7fff_fff0u32.to_be_bytes());
    packet.push(0); // flags: command
    packet.push(64);
    packet.push(100);
    packet.extend_from_slice(data);
    let _ = stream.write_all(&packet);
}

fn jdwp_string(value: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    out
}

fn version_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&jdwp_string("Java Debug Wire Protocol"));
    payload.extend_from_slice(&11i32.to_be_bytes());
    payload.extend_from_slice(&0i32.to_be_bytes());
    payload.extend_from_slice(&jdwp_string("17.0.9"));
    payload.extend_from_slice(&jdwp_string("OpenJDK 64-Bit Server VM"));
    payload
}

fn breakpoint_event(thread: u64) -> Vec<u8> {
    let mut data = Vec::new();
    data.push(1); // suspend policy: event thread
    data.extend_from_slice(&1i32.to_be_bytes());
    data.push(2); // event kind: breakpoint
    data.extend_from_slice(&7i32.to_be_bytes()); // request id
    data.extend_from_slice(&thread.to_be_bytes());
    data.push(1); // type tag: class
    data.extend_from_slice(&0x100u64.to_be_bytes());
    data.extend_from_slice(&0x200u64.to_be_bytes());
    data.extend_from_slice(&5u64.to_be_bytes());
    data
}

#[test]
fn connect_negotiates_handshake_and_id_sizes() {
    let server = ScriptedServer::spawn(vec![Step::Reply(version_payload())]);
    let mut client = JdwpClient::connect("127.0.0.1", server.port).expect("connect");

    let version = client.version().expect("version");
    assert_eq!(version.jdwp_major, 11);
    assert_eq!(version.vm_version, "17.0.9");

    let commands = server.commands();
    assert_eq!(commands.first(), Some(&(1, 7)), "IDSizes goes first");
    assert!(commands.contains(&(1, 1)));
}

#[test]
fn rejected_handshake_is_a_dedicated_error() {
    let server = ScriptedServer::spawn_with_handshake(Vec::new(), false);
    match JdwpClient::connect("127.0.0.1", server.port) {
        Err(JdwpError::HandshakeFailed) => {}
        other => panic!("expected HandshakeFailed, got {other:?}"),
    }
}

#[test]
fn vm_error_codes_are_surfaced() {
    let server = ScriptedServer::spawn(vec![Step::Error(20)]);
    let mut client = JdwpClient::connect("127.0.0.1", server.port).expect("connect");

    match client.thread_name(0x42) {
        Err(JdwpError::VmError(20)) => {}
        other => panic!("expected VmError(20), got {other:?}"),
    }
}

#[test]
fn events_interleaved_with_replies_land_in_the_history_ring() {
    let server = ScriptedServer::spawn(vec![Step::EventThenReply {
        event: breakpoint_event(0x77),
        payload: version_payload(),
    }]);
    let mut client = JdwpClient::connect("127.0.0.1", server.port).expect("connect");

    client.version().expect("version despite interleaved event");

    let events: Vec<_> = client.recent_events().collect();
    assert_eq!(events.len(), 1);
    match events[0] {
        javelin_jdwp::JdwpEvent::Breakpoint { thread, .. } => assert_eq!(*thread, 0x77),
        other => panic!("expected breakpoint event, got {other:?}"),
    }
}

#[test]
fn close_never_transmits_dispose() {
    let server = ScriptedServer::spawn(vec![Step::Reply(version_payload())]);
    let mut client = JdwpClient::connect("127.0.0.1", server.port).expect("connect");
    client.version().expect("version");
    client.close();

    // Give the fixture a beat to notice the socket closing.
    std::thread::sleep(std::time::Duration::from_millis(50));
    let commands = server.commands();
    assert!(
        !commands.contains(&(1, 6)),
        "Dispose must never reach the wire, got {commands:?}"
    );
}
