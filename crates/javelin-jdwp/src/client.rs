//! Synchronous JDWP client.
//!
//! One TCP connection, one outstanding command at a time. Event (command)
//! packets arriving while a reply is awaited are decoded into a bounded
//! history ring rather than dropped, so request/reply traffic stays aligned
//! even when the upstream proxy forwards events to every peer.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::codec::{Cursor, Out};
use crate::consts::{self, tag, Command};
use crate::error::JdwpError;
use crate::types::{
    ClassInfo, EventModifier, FieldInfo, FrameId, FrameInfo, IdSizes, JdwpEvent, JdwpValue,
    LineEntry, LineTable, MethodId, MethodInfo, ObjectId, ReferenceTypeId, RequestId, ThreadId,
    VariableInfo, VmVersion,
};

const HANDSHAKE: &[u8] = b"JDWP-Handshake";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_HISTORY_CAP: usize = 100;

/// Maximum element count per `ArrayReference.SetValues` round trip when
/// mirroring byte arrays into the target.
const SET_VALUES_CHUNK: usize = 4096;

pub struct JdwpClient {
    stream: TcpStream,
    next_packet_id: u32,
    id_sizes: IdSizes,
    events: VecDeque<JdwpEvent>,
}

#[derive(Debug)]
enum Packet {
    Reply {
        id: u32,
        error_code: u16,
        data: Vec<u8>,
    },
    Command {
        command_set: u8,
        command: u8,
        data: Vec<u8>,
    },
}

fn read_packet(reader: &mut impl Read) -> Result<Packet, JdwpError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let length = u32::from_be_bytes(len_buf) as usize;
    if length < 11 {
        return Err(JdwpError::Protocol(format!(
            "invalid packet length {length}"
        )));
    }

    let mut rest = vec![0u8; length - 4];
    reader.read_exact(&mut rest)?;

    let id = u32::from_be_bytes(rest[0..4].try_into().expect("4 bytes"));
    let flags = rest[4];

    if flags & 0x80 != 0 {
        let error_code = u16::from_be_bytes(rest[5..7].try_into().expect("2 bytes"));
        Ok(Packet::Reply {
            id,
            error_code,
            data: rest[7..].to_vec(),
        })
    } else {
        Ok(Packet::Command {
            command_set: rest[5],
            command: rest[6],
            data: rest[7..].to_vec(),
        })
    }
}

impl JdwpClient {
    /// Attaches to a JDWP endpoint: TCP connect, 14-byte handshake, then
    /// id-size negotiation.
    pub fn connect(host: &str, port: u16) -> Result<Self, JdwpError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                JdwpError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unable to resolve {host}:{port}"),
                ))
            })?;
        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_nodelay(true)?;

        stream.write_all(HANDSHAKE)?;
        stream.flush()?;
        let mut reply = [0u8; HANDSHAKE.len()];
        stream.read_exact(&mut reply)?;
        if reply != HANDSHAKE {
            return Err(JdwpError::HandshakeFailed);
        }

        let mut client = Self {
            stream,
            next_packet_id: 1,
            id_sizes: IdSizes::default(),
            events: VecDeque::new(),
        };
        client.id_sizes = client.fetch_id_sizes()?;
        tracing::debug!(?client.id_sizes, "attached to JDWP endpoint");
        Ok(client)
    }

    pub fn id_sizes(&self) -> IdSizes {
        self.id_sizes
    }

    /// Recently observed protocol events, oldest first (at most 100 kept).
    pub fn recent_events(&self) -> impl Iterator<Item = &JdwpEvent> {
        self.events.iter()
    }

    /// Closing never transmits `VirtualMachine.Dispose`: the upstream proxy
    /// interprets Dispose as a session kill for every attached peer. The
    /// socket is simply dropped.
    pub fn close(self) {
        tracing::debug!("closing JDWP connection without Dispose");
        drop(self.stream);
    }

    fn out(&self) -> Out {
        Out::new(self.id_sizes)
    }

    fn cursor<'a>(&self, data: &'a [u8]) -> Cursor<'a> {
        Cursor::new(data, self.id_sizes)
    }

    fn send_command(&mut self, command: Command, data: &[u8]) -> Result<Vec<u8>, JdwpError> {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.wrapping_add(1);

        let length = 11usize
            .checked_add(data.len())
            .ok_or_else(|| JdwpError::Protocol("packet too large".to_string()))?;
        let mut buf = Vec::with_capacity(length);
        buf.extend_from_slice(&(length as u32).to_be_bytes());
        buf.extend_from_slice(&id.to_be_bytes());
        buf.push(0); // flags
        buf.push(command.set);
        buf.push(command.command);
        buf.extend_from_slice(data);

        self.stream.write_all(&buf)?;
        self.stream.flush()?;

        loop {
            match read_packet(&mut self.stream)? {
                Packet::Reply {
                    id: reply_id,
                    error_code,
                    data,
                } => {
                    if reply_id != id {
                        return Err(JdwpError::Protocol(format!(
                            "unexpected reply id {reply_id}, expected {id}"
                        )));
                    }
                    if error_code != 0 {
                        return Err(JdwpError::VmError(error_code));
                    }
                    return Ok(data);
                }
                Packet::Command {
                    command_set,
                    command,
                    data,
                } => {
                    if (consts::Command { set: command_set, command })
                        == consts::EVENT_COMPOSITE
                    {
                        self.record_composite_event(&data);
                    } else {
                        tracing::debug!(command_set, command, "ignoring unsolicited command packet");
                    }
                }
            }
        }
    }

    fn record_composite_event(&mut self, data: &[u8]) {
        match self.decode_composite_event(data) {
            Ok(events) => {
                for event in events {
                    if self.events.len() == EVENT_HISTORY_CAP {
                        self.events.pop_front();
                    }
                    self.events.push_back(event);
                }
            }
            Err(err) => tracing::warn!(%err, "failed to decode composite event packet"),
        }
    }

    fn decode_composite_event(&self, data: &[u8]) -> Result<Vec<JdwpEvent>, JdwpError> {
        let mut cursor = self.cursor(data);
        let _suspend_policy = cursor.read_u8()?;
        let count = cursor.read_i32()?;
        let mut events = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let kind = cursor.read_u8()?;
            let event = match kind {
                consts::event_kind::VM_START => JdwpEvent::VmStart {
                    request_id: cursor.read_i32()?,
                    thread: cursor.read_object_id()?,
                },
                consts::event_kind::SINGLE_STEP => JdwpEvent::SingleStep {
                    request_id: cursor.read_i32()?,
                    thread: cursor.read_object_id()?,
                    location: cursor.read_location()?,
                },
                consts::event_kind::BREAKPOINT => JdwpEvent::Breakpoint {
                    request_id: cursor.read_i32()?,
                    thread: cursor.read_object_id()?,
                    location: cursor.read_location()?,
                },
                consts::event_kind::EXCEPTION => {
                    let request_id = cursor.read_i32()?;
                    let thread = cursor.read_object_id()?;
                    let location = cursor.read_location()?;
                    let _exception_tag = cursor.read_u8()?;
                    let exception = cursor.read_object_id()?;
                    let catch_location = cursor.read_location()?;
                    JdwpEvent::Exception {
                        request_id,
                        thread,
                        location,
                        exception,
                        catch_location: (catch_location.class_id != 0).then_some(catch_location),
                    }
                }
                consts::event_kind::THREAD_START => JdwpEvent::ThreadStart {
                    request_id: cursor.read_i32()?,
                    thread: cursor.read_object_id()?,
                },
                consts::event_kind::THREAD_DEATH => JdwpEvent::ThreadDeath {
                    request_id: cursor.read_i32()?,
                    thread: cursor.read_object_id()?,
                },
                consts::event_kind::CLASS_PREPARE => JdwpEvent::ClassPrepare {
                    request_id: cursor.read_i32()?,
                    thread: cursor.read_object_id()?,
                    ref_type_tag: cursor.read_u8()?,
                    type_id: cursor.read_reference_type_id()?,
                    signature: cursor.read_string()?,
                    status: cursor.read_i32()?,
                },
                consts::event_kind::VM_DEATH => JdwpEvent::VmDeath {
                    request_id: cursor.read_i32()?,
                },
                other => {
                    // Unknown layout; the rest of the packet cannot be
                    // decoded reliably, so stop here.
                    events.push(JdwpEvent::Other { event_kind: other });
                    break;
                }
            };
            events.push(event);
        }
        Ok(events)
    }

    fn fetch_id_sizes(&mut self) -> Result<IdSizes, JdwpError> {
        let reply = self.send_command(consts::VM_ID_SIZES, &[])?;
        let mut cursor = self.cursor(&reply);
        Ok(IdSizes {
            field_id: cursor.read_i32()? as usize,
            method_id: cursor.read_i32()? as usize,
            object_id: cursor.read_i32()? as usize,
            reference_type_id: cursor.read_i32()? as usize,
            frame_id: cursor.read_i32()? as usize,
        })
    }

    // --- VirtualMachine ---

    pub fn version(&mut self) -> Result<VmVersion, JdwpError> {
        let reply = self.send_command(consts::VM_VERSION, &[])?;
        let mut cursor = self.cursor(&reply);
        Ok(VmVersion {
            description: cursor.read_string()?,
            jdwp_major: cursor.read_i32()?,
            jdwp_minor: cursor.read_i32()?,
            vm_version: cursor.read_string()?,
            vm_name: cursor.read_string()?,
        })
    }

    pub fn classes_by_signature(&mut self, signature: &str) -> Result<Vec<ClassInfo>, JdwpError> {
        let mut out = self.out();
        out.write_string(signature);
        let reply = self.send_command(consts::VM_CLASSES_BY_SIGNATURE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut classes = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            classes.push(ClassInfo {
                ref_type_tag: cursor.read_u8()?,
                type_id: cursor.read_reference_type_id()?,
                signature: signature.to_string(),
                status: cursor.read_i32()?,
            });
        }
        Ok(classes)
    }

    pub fn all_classes(&mut self) -> Result<Vec<ClassInfo>, JdwpError> {
        let reply = self.send_command(consts::VM_ALL_CLASSES, &[])?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut classes = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            classes.push(ClassInfo {
                ref_type_tag: cursor.read_u8()?,
                type_id: cursor.read_reference_type_id()?,
                signature: cursor.read_string()?,
                status: cursor.read_i32()?,
            });
        }
        Ok(classes)
    }

    pub fn all_threads(&mut self) -> Result<Vec<ThreadId>, JdwpError> {
        let reply = self.send_command(consts::VM_ALL_THREADS, &[])?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut threads = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            threads.push(cursor.read_object_id()?);
        }
        Ok(threads)
    }

    pub fn vm_suspend(&mut self) -> Result<(), JdwpError> {
        self.send_command(consts::VM_SUSPEND, &[])?;
        Ok(())
    }

    pub fn vm_resume(&mut self) -> Result<(), JdwpError> {
        self.send_command(consts::VM_RESUME, &[])?;
        Ok(())
    }

    pub fn create_string(&mut self, value: &str) -> Result<ObjectId, JdwpError> {
        let mut out = self.out();
        out.write_string(value);
        let reply = self.send_command(consts::VM_CREATE_STRING, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_object_id()
    }

    // --- ReferenceType ---

    pub fn reference_type_signature(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> Result<String, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(type_id);
        let reply = self.send_command(consts::REFTYPE_SIGNATURE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_string()
    }

    /// The defining class loader; 0 means the bootstrap loader.
    pub fn reference_type_class_loader(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> Result<ObjectId, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(type_id);
        let reply = self.send_command(consts::REFTYPE_CLASS_LOADER, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_object_id()
    }

    pub fn reference_type_fields(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> Result<Vec<FieldInfo>, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(type_id);
        let reply = self.send_command(consts::REFTYPE_FIELDS, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut fields = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            fields.push(FieldInfo {
                field_id: cursor.read_field_id()?,
                name: cursor.read_string()?,
                signature: cursor.read_string()?,
                mod_bits: cursor.read_u32()?,
            });
        }
        Ok(fields)
    }

    pub fn reference_type_methods(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> Result<Vec<MethodInfo>, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(type_id);
        let reply = self.send_command(consts::REFTYPE_METHODS, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut methods = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            methods.push(MethodInfo {
                method_id: cursor.read_method_id()?,
                name: cursor.read_string()?,
                signature: cursor.read_string()?,
                mod_bits: cursor.read_u32()?,
            });
        }
        Ok(methods)
    }

    pub fn reference_type_source_file(
        &mut self,
        type_id: ReferenceTypeId,
    ) -> Result<String, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(type_id);
        let reply = self.send_command(consts::REFTYPE_SOURCE_FILE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_string()
    }

    // --- ClassType ---

    /// Immediate superclass; 0 for `java.lang.Object` and interfaces.
    pub fn class_type_superclass(
        &mut self,
        class_id: ReferenceTypeId,
    ) -> Result<ReferenceTypeId, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(class_id);
        let reply = self.send_command(consts::CLASSTYPE_SUPERCLASS, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_reference_type_id()
    }

    /// Invokes a static method. Returns the value and the thrown exception
    /// object id (0 when no exception was raised).
    pub fn class_type_invoke_method(
        &mut self,
        class_id: ReferenceTypeId,
        thread: ThreadId,
        method_id: MethodId,
        args: &[JdwpValue],
        options: i32,
    ) -> Result<(JdwpValue, ObjectId), JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(class_id);
        out.write_object_id(thread);
        out.write_method_id(method_id);
        out.write_i32(args.len() as i32);
        for arg in args {
            out.write_tagged_value(arg);
        }
        out.write_i32(options);
        let reply = self.send_command(consts::CLASSTYPE_INVOKE_METHOD, &out.into_bytes())?;
        self.read_invoke_reply(&reply)
    }

    // --- ArrayType ---

    pub fn array_type_new_instance(
        &mut self,
        array_type_id: ReferenceTypeId,
        length: i32,
    ) -> Result<ObjectId, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(array_type_id);
        out.write_i32(length);
        let reply = self.send_command(consts::ARRAYTYPE_NEW_INSTANCE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let _tag = cursor.read_u8()?;
        cursor.read_object_id()
    }

    // --- Method ---

    pub fn method_line_table(
        &mut self,
        class_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> Result<LineTable, JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(class_id);
        out.write_method_id(method_id);
        let reply = self.send_command(consts::METHOD_LINE_TABLE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let start = cursor.read_i64()?;
        let end = cursor.read_i64()?;
        let count = cursor.read_i32()?;
        let mut lines = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            lines.push(LineEntry {
                code_index: cursor.read_i64()? as u64,
                line: cursor.read_i32()?,
            });
        }
        Ok(LineTable { start, end, lines })
    }

    /// Returns the argument word count and the variable table. Fails with
    /// `ABSENT_INFORMATION` when the method was compiled without `-g`.
    pub fn method_variable_table(
        &mut self,
        class_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> Result<(u32, Vec<VariableInfo>), JdwpError> {
        let mut out = self.out();
        out.write_reference_type_id(class_id);
        out.write_method_id(method_id);
        let reply = self.send_command(consts::METHOD_VARIABLE_TABLE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let arg_cnt = cursor.read_u32()?;
        let count = cursor.read_i32()?;
        let mut vars = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            vars.push(VariableInfo {
                code_index: cursor.read_u64()?,
                name: cursor.read_string()?,
                signature: cursor.read_string()?,
                length: cursor.read_u32()?,
                slot: cursor.read_u32()?,
            });
        }
        Ok((arg_cnt, vars))
    }

    // --- ObjectReference ---

    pub fn object_reference_type(
        &mut self,
        object_id: ObjectId,
    ) -> Result<(u8, ReferenceTypeId), JdwpError> {
        let mut out = self.out();
        out.write_object_id(object_id);
        let reply = self.send_command(consts::OBJREF_REFERENCE_TYPE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let tag = cursor.read_u8()?;
        let type_id = cursor.read_reference_type_id()?;
        Ok((tag, type_id))
    }

    pub fn object_get_values(
        &mut self,
        object_id: ObjectId,
        fields: &[u64],
    ) -> Result<Vec<JdwpValue>, JdwpError> {
        let mut out = self.out();
        out.write_object_id(object_id);
        out.write_i32(fields.len() as i32);
        for field in fields {
            out.write_field_id(*field);
        }
        let reply = self.send_command(consts::OBJREF_GET_VALUES, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut values = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            values.push(cursor.read_tagged_value()?);
        }
        Ok(values)
    }

    /// Invokes an instance method (virtual dispatch). `class_id` is the
    /// class the method was resolved on.
    pub fn object_invoke_method(
        &mut self,
        object_id: ObjectId,
        thread: ThreadId,
        class_id: ReferenceTypeId,
        method_id: MethodId,
        args: &[JdwpValue],
        options: i32,
    ) -> Result<(JdwpValue, ObjectId), JdwpError> {
        let mut out = self.out();
        out.write_object_id(object_id);
        out.write_object_id(thread);
        out.write_reference_type_id(class_id);
        out.write_method_id(method_id);
        out.write_i32(args.len() as i32);
        for arg in args {
            out.write_tagged_value(arg);
        }
        out.write_i32(options);
        let reply = self.send_command(consts::OBJREF_INVOKE_METHOD, &out.into_bytes())?;
        self.read_invoke_reply(&reply)
    }

    pub fn disable_collection(&mut self, object_id: ObjectId) -> Result<(), JdwpError> {
        let mut out = self.out();
        out.write_object_id(object_id);
        self.send_command(consts::OBJREF_DISABLE_COLLECTION, &out.into_bytes())?;
        Ok(())
    }

    pub fn enable_collection(&mut self, object_id: ObjectId) -> Result<(), JdwpError> {
        let mut out = self.out();
        out.write_object_id(object_id);
        self.send_command(consts::OBJREF_ENABLE_COLLECTION, &out.into_bytes())?;
        Ok(())
    }

    // --- StringReference ---

    pub fn string_value(&mut self, string_id: ObjectId) -> Result<String, JdwpError> {
        let mut out = self.out();
        out.write_object_id(string_id);
        let reply = self.send_command(consts::STRING_VALUE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_string()
    }

    // --- ThreadReference ---

    pub fn thread_name(&mut self, thread: ThreadId) -> Result<String, JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        let reply = self.send_command(consts::THREAD_NAME, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_string()
    }

    pub fn thread_resume(&mut self, thread: ThreadId) -> Result<(), JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        self.send_command(consts::THREAD_RESUME, &out.into_bytes())?;
        Ok(())
    }

    /// Returns `(thread_status, suspend_status)`.
    pub fn thread_status(&mut self, thread: ThreadId) -> Result<(i32, i32), JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        let reply = self.send_command(consts::THREAD_STATUS, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let thread_status = cursor.read_i32()?;
        let suspend_status = cursor.read_i32()?;
        Ok((thread_status, suspend_status))
    }

    pub fn thread_frames(
        &mut self,
        thread: ThreadId,
        start: i32,
        length: i32,
    ) -> Result<Vec<FrameInfo>, JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        out.write_i32(start);
        out.write_i32(length);
        let reply = self.send_command(consts::THREAD_FRAMES, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut frames = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            frames.push(FrameInfo {
                frame_id: cursor.read_frame_id()?,
                location: cursor.read_location()?,
            });
        }
        Ok(frames)
    }

    pub fn thread_frame_count(&mut self, thread: ThreadId) -> Result<i32, JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        let reply = self.send_command(consts::THREAD_FRAME_COUNT, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_i32()
    }

    // --- ArrayReference ---

    pub fn array_length(&mut self, array_id: ObjectId) -> Result<i32, JdwpError> {
        let mut out = self.out();
        out.write_object_id(array_id);
        let reply = self.send_command(consts::ARRAY_LENGTH, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_i32()
    }

    pub fn array_get_values(
        &mut self,
        array_id: ObjectId,
        first_index: i32,
        length: i32,
    ) -> Result<Vec<JdwpValue>, JdwpError> {
        let mut out = self.out();
        out.write_object_id(array_id);
        out.write_i32(first_index);
        out.write_i32(length);
        let reply = self.send_command(consts::ARRAY_GET_VALUES, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        // ArrayRegion: primitive regions carry untagged values, object
        // regions carry individually tagged ones.
        let region_tag = cursor.read_u8()?;
        let count = cursor.read_i32()?;
        let mut values = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let value = if tag::is_object_like(region_tag) {
                cursor.read_tagged_value()?
            } else {
                cursor.read_untagged_value(region_tag)?
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Mirrors a local byte buffer into a target-side `byte[]`, chunking the
    /// writes to keep packet sizes bounded.
    pub fn array_set_bytes(&mut self, array_id: ObjectId, bytes: &[u8]) -> Result<(), JdwpError> {
        for (chunk_index, chunk) in bytes.chunks(SET_VALUES_CHUNK).enumerate() {
            let mut out = self.out();
            out.write_object_id(array_id);
            out.write_i32((chunk_index * SET_VALUES_CHUNK) as i32);
            out.write_i32(chunk.len() as i32);
            for byte in chunk {
                out.write_u8(*byte);
            }
            self.send_command(consts::ARRAY_SET_VALUES, &out.into_bytes())?;
        }
        Ok(())
    }

    // --- StackFrame ---

    /// Reads local variable values by `(slot, signature-tag)` pairs.
    pub fn frame_get_values(
        &mut self,
        thread: ThreadId,
        frame_id: FrameId,
        slots: &[(u32, u8)],
    ) -> Result<Vec<JdwpValue>, JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        out.write_frame_id(frame_id);
        out.write_i32(slots.len() as i32);
        for (slot, sig_tag) in slots {
            out.write_i32(*slot as i32);
            out.write_u8(*sig_tag);
        }
        let reply = self.send_command(consts::FRAME_GET_VALUES, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let count = cursor.read_i32()?;
        let mut values = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            values.push(cursor.read_tagged_value()?);
        }
        Ok(values)
    }

    /// The frame receiver; `None` for static and native frames.
    pub fn frame_this_object(
        &mut self,
        thread: ThreadId,
        frame_id: FrameId,
    ) -> Result<Option<(u8, ObjectId)>, JdwpError> {
        let mut out = self.out();
        out.write_object_id(thread);
        out.write_frame_id(frame_id);
        let reply = self.send_command(consts::FRAME_THIS_OBJECT, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let tag = cursor.read_u8()?;
        let id = cursor.read_object_id()?;
        Ok((id != 0).then_some((tag, id)))
    }

    // --- ClassObjectReference ---

    /// Unwraps a `java.lang.Class` object into the reference type it
    /// reflects. `defineClass`/`Class.forName` return class objects, not
    /// reference type ids.
    pub fn class_object_reflected_type(
        &mut self,
        class_object_id: ObjectId,
    ) -> Result<(u8, ReferenceTypeId), JdwpError> {
        let mut out = self.out();
        out.write_object_id(class_object_id);
        let reply = self.send_command(consts::CLASSOBJ_REFLECTED_TYPE, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        let tag = cursor.read_u8()?;
        let type_id = cursor.read_reference_type_id()?;
        Ok((tag, type_id))
    }

    // --- EventRequest ---

    pub fn event_request_set(
        &mut self,
        event_kind: u8,
        suspend_policy: u8,
        modifiers: &[EventModifier],
    ) -> Result<RequestId, JdwpError> {
        let mut out = self.out();
        out.write_u8(event_kind);
        out.write_u8(suspend_policy);
        out.write_i32(modifiers.len() as i32);
        for modifier in modifiers {
            match modifier {
                EventModifier::Count(count) => {
                    out.write_u8(consts::modifier_kind::COUNT);
                    out.write_i32(*count);
                }
                EventModifier::ThreadOnly(thread) => {
                    out.write_u8(consts::modifier_kind::THREAD_ONLY);
                    out.write_object_id(*thread);
                }
                EventModifier::ClassMatch(pattern) => {
                    out.write_u8(consts::modifier_kind::CLASS_MATCH);
                    out.write_string(pattern);
                }
                EventModifier::LocationOnly(location) => {
                    out.write_u8(consts::modifier_kind::LOCATION_ONLY);
                    out.write_location(location);
                }
                EventModifier::Step {
                    thread,
                    size,
                    depth,
                } => {
                    out.write_u8(consts::modifier_kind::STEP);
                    out.write_object_id(*thread);
                    out.write_i32(*size);
                    out.write_i32(*depth);
                }
                EventModifier::ExceptionOnly {
                    exception_or_null,
                    caught,
                    uncaught,
                } => {
                    out.write_u8(consts::modifier_kind::EXCEPTION_ONLY);
                    out.write_reference_type_id(*exception_or_null);
                    out.write_bool(*caught);
                    out.write_bool(*uncaught);
                }
            }
        }
        let reply = self.send_command(consts::EVENTREQ_SET, &out.into_bytes())?;
        let mut cursor = self.cursor(&reply);
        cursor.read_i32()
    }

    pub fn event_request_clear(
        &mut self,
        event_kind: u8,
        request_id: RequestId,
    ) -> Result<(), JdwpError> {
        let mut out = self.out();
        out.write_u8(event_kind);
        out.write_i32(request_id);
        self.send_command(consts::EVENTREQ_CLEAR, &out.into_bytes())?;
        Ok(())
    }

    fn read_invoke_reply(&self, reply: &[u8]) -> Result<(JdwpValue, ObjectId), JdwpError> {
        let mut cursor = self.cursor(reply);
        let value = cursor.read_tagged_value()?;
        let _exception_tag = cursor.read_u8()?;
        let exception = cursor.read_object_id()?;
        Ok((value, exception))
    }
}

impl std::fmt::Debug for JdwpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdwpClient")
            .field("peer", &self.stream.peer_addr().ok())
            .field("next_packet_id", &self.next_packet_id)
            .finish()
    }
}
