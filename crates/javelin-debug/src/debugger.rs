//! The debugger core: one attached session plus the caches and registries
//! shared by the inspector, controller, discovery and evaluation layers.
//!
//! Component logic lives in the submodules (`inspect`, `control`,
//! `classpath`, `executor`, `eval`); they all operate on this struct.

mod classpath;
mod control;
mod eval;
mod executor;
mod inspect;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use javelin_jdwp::{
    error_code, JdwpClient, JdwpError, JdwpEvent, JdwpValue, MethodId, ObjectId, ReferenceTypeId,
    RequestId, ThreadId, SUSPEND_STATUS_SUSPENDED,
};

use crate::config::Config;
use crate::error::{DebugError, Result};
use crate::javac::JavacCompiler;
use crate::object_registry::ObjectRegistry;
use crate::proxy::ProxyClient;
use crate::session::Session;
use crate::watchers::WatcherRegistry;

pub use control::StepDepth;
pub use inspect::{FrameSummary, LocalEntry, ThreadSummary};

type CompiledClasses = HashMap<String, Vec<u8>>;

pub struct Debugger {
    config: Config,
    session: Session,
    proxy: ProxyClient,
    objects: Mutex<ObjectRegistry>,
    watchers: WatcherRegistry,
    compiler: Mutex<Option<Arc<JavacCompiler>>>,
    compile_cache: Mutex<HashMap<String, Arc<eval::CompiledUnit>>>,
    classpath: Mutex<Option<Vec<String>>>,
    step_requests: Mutex<HashMap<ThreadId, RequestId>>,
    /// Wrapper classes already defined in the target this session, keyed by
    /// `(loader, class name)`. The target keeps them alive until it exits.
    defined_classes: Mutex<HashSet<(ObjectId, String)>>,
}

impl Debugger {
    pub fn new(config: Config) -> Self {
        let proxy = ProxyClient::new("127.0.0.1", config.proxy_http_port());
        Self {
            config,
            session: Session::new(),
            proxy,
            objects: Mutex::new(ObjectRegistry::new()),
            watchers: WatcherRegistry::new(),
            compiler: Mutex::new(None),
            compile_cache: Mutex::new(HashMap::new()),
            classpath: Mutex::new(None),
            step_requests: Mutex::new(HashMap::new()),
            defined_classes: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn proxy(&self) -> &ProxyClient {
        &self.proxy
    }

    pub fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }

    /// Attaches (or re-attaches) the session. Session-scoped state (the
    /// object cache, the discovered classpath and the configured compiler)
    /// is reset because remote identities and loaders do not survive across
    /// sessions. Compiled bytecode survives: it depends only on source text
    /// and declared types.
    pub fn attach(&self, host: &str, port: u16) -> Result<String> {
        let banner = self.session.attach(host, port)?;
        self.objects.lock().clear();
        *self.classpath.lock() = None;
        *self.compiler.lock() = None;
        self.step_requests.lock().clear();
        self.defined_classes.lock().clear();
        Ok(banner)
    }

    pub fn detach(&self) -> bool {
        self.session.detach()
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_attached()
    }

    pub fn is_alive(&self) -> bool {
        self.session.is_alive()
    }

    pub fn recent_events(&self) -> Vec<JdwpEvent> {
        self.session.recent_events()
    }

    /// Javac invocations so far, `None` until the compiler is configured.
    pub fn compile_count(&self) -> Option<u64> {
        self.compiler
            .lock()
            .as_ref()
            .map(|compiler| compiler.compile_count())
    }

    pub(crate) fn with_client<T>(
        &self,
        f: impl FnMut(&mut JdwpClient) -> Result<T>,
    ) -> Result<T> {
        self.session.with_client(f)
    }
}

// --- Shared remote helpers used by several components. ---

/// Fails with `ThreadNotFound` / `ThreadNotSuspended` unless the thread
/// exists and is suspended.
pub(crate) fn ensure_suspended(client: &mut JdwpClient, thread: ThreadId) -> Result<()> {
    let (_status, suspend_status) = client.thread_status(thread).map_err(|err| {
        match err.vm_error_code() {
            Some(error_code::INVALID_THREAD) | Some(error_code::INVALID_OBJECT) => {
                DebugError::ThreadNotFound(thread)
            }
            _ => DebugError::from(err),
        }
    })?;
    if suspend_status & SUSPEND_STATUS_SUSPENDED == 0 {
        return Err(DebugError::ThreadNotSuspended(thread));
    }
    Ok(())
}

/// Binary name of an object's runtime class.
pub(crate) fn runtime_type_name(
    client: &mut JdwpClient,
    object_id: ObjectId,
) -> std::result::Result<String, JdwpError> {
    let (_tag, type_id) = client.object_reference_type(object_id)?;
    let signature = client.reference_type_signature(type_id)?;
    Ok(javelin_jdwp::signature_to_type_name(&signature))
}

/// Strips the synthetic-proxy suffix from a single class name: everything
/// from the first `$$` on cannot be referenced from source.
pub(crate) fn scrub_synthetic_name(name: &str) -> &str {
    match name.find("$$") {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Walks up the class chain until a name free of the `$$` marker is found;
/// when the whole chain is synthetic, the most derived name is truncated at
/// its first `$$` instead.
pub(crate) fn declared_type_name(
    client: &mut JdwpClient,
    type_id: ReferenceTypeId,
) -> std::result::Result<String, JdwpError> {
    let mut current = type_id;
    let mut first_name: Option<String> = None;
    loop {
        let signature = client.reference_type_signature(current)?;
        let name = javelin_jdwp::signature_to_type_name(&signature);
        if !name.contains("$$") {
            return Ok(name);
        }
        if first_name.is_none() {
            first_name = Some(name);
        }
        let superclass = client.class_type_superclass(current)?;
        if superclass == 0 {
            let name = first_name.unwrap_or_default();
            return Ok(scrub_synthetic_name(&name).to_string());
        }
        current = superclass;
    }
}

/// Finds a method by name (and optional JNI signature) on a type or any of
/// its superclasses. Returns the declaring type alongside the method id.
pub(crate) fn find_method_on_chain(
    client: &mut JdwpClient,
    type_id: ReferenceTypeId,
    name: &str,
    signature: Option<&str>,
) -> std::result::Result<Option<(ReferenceTypeId, MethodId)>, JdwpError> {
    let mut current = type_id;
    loop {
        let methods = client.reference_type_methods(current)?;
        if let Some(method) = methods.iter().find(|method| {
            method.name == name
                && signature
                    .map(|sig| method.signature == sig)
                    .unwrap_or(true)
        }) {
            return Ok(Some((current, method.method_id)));
        }
        let superclass = client.class_type_superclass(current)?;
        if superclass == 0 {
            return Ok(None);
        }
        current = superclass;
    }
}

/// Finds an instance field by name on a type or any of its superclasses.
pub(crate) fn find_field_on_chain(
    client: &mut JdwpClient,
    type_id: ReferenceTypeId,
    name: &str,
) -> std::result::Result<Option<javelin_jdwp::FieldInfo>, JdwpError> {
    let mut current = type_id;
    loop {
        let fields = client.reference_type_fields(current)?;
        if let Some(field) = fields.into_iter().find(|field| field.name == name) {
            return Ok(Some(field));
        }
        let superclass = client.class_type_superclass(current)?;
        if superclass == 0 {
            return Ok(None);
        }
        current = superclass;
    }
}

/// Reads one named instance field of an object, `None` when no such field
/// exists anywhere on the chain.
pub(crate) fn read_field(
    client: &mut JdwpClient,
    object_id: ObjectId,
    name: &str,
) -> std::result::Result<Option<JdwpValue>, JdwpError> {
    let (_tag, type_id) = client.object_reference_type(object_id)?;
    let Some(field) = find_field_on_chain(client, type_id, name)? else {
        return Ok(None);
    };
    let values = client.object_get_values(object_id, &[field.field_id])?;
    Ok(values.into_iter().next())
}

/// Maps protocol errors raised by a method invocation: a thread in the
/// wrong state is an `IncompatibleThreadState`, everything else converts
/// normally.
pub(crate) fn map_invoke_err(err: JdwpError) -> DebugError {
    match err.vm_error_code() {
        Some(error_code::THREAD_NOT_SUSPENDED)
        | Some(error_code::INVALID_THREAD)
        | Some(error_code::ALREADY_INVOKING) => DebugError::IncompatibleThreadState,
        _ => DebugError::from(err),
    }
}

/// Best-effort type name of a thrown exception object.
pub(crate) fn exception_type_name(client: &mut JdwpClient, exception: ObjectId) -> String {
    runtime_type_name(client, exception).unwrap_or_else(|_| "<unknown exception>".to_string())
}

/// Invokes an instance method by name on the receiver's runtime type chain,
/// single-threaded on the supplied thread. Thrown exceptions surface as
/// `InvocationThrew`.
pub(crate) fn invoke_instance(
    client: &mut JdwpClient,
    receiver: ObjectId,
    thread: ThreadId,
    name: &str,
    signature: &str,
    args: &[JdwpValue],
) -> Result<JdwpValue> {
    let (_tag, type_id) = client
        .object_reference_type(receiver)
        .map_err(map_invoke_err)?;
    let Some((declaring, method_id)) =
        find_method_on_chain(client, type_id, name, Some(signature)).map_err(map_invoke_err)?
    else {
        return Err(DebugError::MethodNotFound(name.to_string()));
    };
    let (value, exception) = client
        .object_invoke_method(
            receiver,
            thread,
            declaring,
            method_id,
            args,
            javelin_jdwp::INVOKE_SINGLE_THREADED,
        )
        .map_err(map_invoke_err)?;
    if exception != 0 {
        return Err(DebugError::InvocationThrew(exception_type_name(
            client, exception,
        )));
    }
    Ok(value)
}

/// Invokes a static method by name on a class, single-threaded.
pub(crate) fn invoke_static(
    client: &mut JdwpClient,
    class_id: ReferenceTypeId,
    thread: ThreadId,
    name: &str,
    signature: &str,
    args: &[JdwpValue],
) -> Result<JdwpValue> {
    let Some((declaring, method_id)) =
        find_method_on_chain(client, class_id, name, Some(signature)).map_err(map_invoke_err)?
    else {
        return Err(DebugError::MethodNotFound(name.to_string()));
    };
    let (value, exception) = client
        .class_type_invoke_method(
            declaring,
            thread,
            method_id,
            args,
            javelin_jdwp::INVOKE_SINGLE_THREADED,
        )
        .map_err(map_invoke_err)?;
    if exception != 0 {
        return Err(DebugError::InvocationThrew(exception_type_name(
            client, exception,
        )));
    }
    Ok(value)
}

/// Resolves a loaded class by binary name.
pub(crate) fn loaded_class(
    client: &mut JdwpClient,
    class_name: &str,
) -> Result<Option<ReferenceTypeId>> {
    let signature = javelin_jdwp::class_name_to_signature(class_name);
    let classes = client
        .classes_by_signature(&signature)
        .map_err(DebugError::from)?;
    Ok(classes.first().map(|class| class.type_id))
}

/// Creates a target-side string, pinning it against collection for the
/// invocation window it is needed in. Pinning is best-effort: a target that
/// refuses it merely risks a collected argument.
pub(crate) fn pinned_string(client: &mut JdwpClient, text: &str) -> Result<ObjectId> {
    let id = client.create_string(text).map_err(map_invoke_err)?;
    let _ = client.disable_collection(id);
    Ok(id)
}

pub(crate) fn unpin_object(client: &mut JdwpClient, object_id: ObjectId) {
    let _ = client.enable_collection(object_id);
}

/// Reads a remote string value; `None` for null or non-string values.
pub(crate) fn remote_string(
    client: &mut JdwpClient,
    value: &JdwpValue,
) -> std::result::Result<Option<String>, JdwpError> {
    match value {
        JdwpValue::Object { tag, id } if *id != 0 && *tag == javelin_jdwp::tag::STRING => {
            Ok(Some(client.string_value(*id)?))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_suffix_is_scrubbed_from_names() {
        assert_eq!(
            scrub_synthetic_name("demo.Svc$$EnhancerBySpringCGLIB$$1a2b"),
            "demo.Svc"
        );
        assert_eq!(scrub_synthetic_name("demo.Svc"), "demo.Svc");
        assert_eq!(scrub_synthetic_name("demo.Outer$Inner"), "demo.Outer$Inner");
    }

    #[test]
    fn invoke_error_mapping_distinguishes_thread_state() {
        assert!(matches!(
            map_invoke_err(JdwpError::VmError(error_code::THREAD_NOT_SUSPENDED)),
            DebugError::IncompatibleThreadState
        ));
        assert!(matches!(
            map_invoke_err(JdwpError::VmError(error_code::INVALID_OBJECT)),
            DebugError::Jdwp(_)
        ));
    }

    #[test]
    fn operations_before_attach_report_not_attached() {
        let debugger = Debugger::new(Config::default());
        assert!(matches!(
            debugger.list_threads(),
            Err(DebugError::NotAttached)
        ));
        assert!(matches!(debugger.resume(), Err(DebugError::NotAttached)));
        assert!(matches!(
            debugger.get_stack(1),
            Err(DebugError::NotAttached)
        ));
    }
}
