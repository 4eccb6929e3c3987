//! Synchronous wire-level client for the Java Debug Wire Protocol.
//!
//! This crate speaks the client role only: it attaches to a JDWP endpoint
//! over TCP, serialises commands one at a time, and exposes a thin typed
//! facade over the commands the engine needs (threads, frames, reference
//! types, method invocation, event requests, arrays, strings). Events
//! received while a reply is awaited land in a bounded history ring.

mod client;
mod codec;
pub mod consts;
mod error;
mod types;

pub use client::JdwpClient;
pub use consts::{
    error_code, event_kind, step, suspend_policy, tag, thread_status_name, INVOKE_SINGLE_THREADED,
    SUSPEND_STATUS_SUSPENDED,
};
pub use error::JdwpError;
pub use types::{
    ClassInfo, ClassLoaderId, EventModifier, FieldId, FieldInfo, FrameId, FrameInfo, IdSizes,
    JdwpEvent, JdwpValue, LineEntry, LineTable, Location, MethodId, MethodInfo, ObjectId,
    ReferenceTypeId, RequestId, ThreadId, VariableInfo, VmVersion,
};

/// Converts a binary class name (`com.example.Foo`) to a JNI-style type
/// signature (`Lcom/example/Foo;`).
pub fn class_name_to_signature(class: &str) -> String {
    let internal = class.replace('.', "/");
    format!("L{internal};")
}

/// Converts a JNI-style type signature to a Java source type name.
/// `Ljava/util/List;` → `java.util.List`, `[I` → `int[]`.
pub fn signature_to_type_name(signature: &str) -> String {
    let mut sig = signature;
    let mut dims = 0usize;
    while let Some(rest) = sig.strip_prefix('[') {
        dims += 1;
        sig = rest;
    }

    let base = if let Some(class) = sig.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        class.replace('/', ".")
    } else {
        match sig.as_bytes().first().copied() {
            Some(b'B') => "byte".to_string(),
            Some(b'C') => "char".to_string(),
            Some(b'D') => "double".to_string(),
            Some(b'F') => "float".to_string(),
            Some(b'I') => "int".to_string(),
            Some(b'J') => "long".to_string(),
            Some(b'S') => "short".to_string(),
            Some(b'Z') => "boolean".to_string(),
            Some(b'V') => "void".to_string(),
            _ => "<unknown>".to_string(),
        }
    };

    let mut out = base;
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_signature_conversion() {
        assert_eq!(
            class_name_to_signature("com.example.Foo"),
            "Lcom/example/Foo;"
        );
        assert_eq!(class_name_to_signature("Foo"), "LFoo;");
    }

    #[test]
    fn signature_to_type_name_handles_classes_primitives_and_arrays() {
        assert_eq!(signature_to_type_name("Ljava/util/List;"), "java.util.List");
        assert_eq!(signature_to_type_name("I"), "int");
        assert_eq!(signature_to_type_name("[I"), "int[]");
        assert_eq!(
            signature_to_type_name("[[Ljava/lang/String;"),
            "java.lang.String[][]"
        );
        assert_eq!(signature_to_type_name("Z"), "boolean");
    }
}
