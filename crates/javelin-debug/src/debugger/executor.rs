//! Remote execution of compiled bytecode.
//!
//! Three invocations run in order on the supplied suspended thread, all in
//! single-threaded mode: (1) mirror the bytes and `defineClass` them on the
//! chosen loader, (2) `Class.forName(name, true, loader)` to force
//! preparation and initialization, (3) invoke the wrapper's static method.
//! Step (2) is not optional: method lookup on a mirror produced by
//! `defineClass` alone fails with CLASS_NOT_PREPARED.

use super::*;

const DEFINE_CLASS_SIG: &str = "(Ljava/lang/String;[BII)Ljava/lang/Class;";
const FOR_NAME_SIG: &str = "(Ljava/lang/String;ZLjava/lang/ClassLoader;)Ljava/lang/Class;";

/// Defines, initializes and invokes a generated class in the target.
/// `classes` holds every compiled class of the unit keyed by binary name;
/// `entry_class` names the one carrying the static `method_name`. With
/// `needs_define` false (a compilation-cache hit in the same session) the
/// define step is skipped; `Class.forName` still runs and resolves the
/// already-loaded class.
pub(super) fn execute_generated_class(
    client: &mut JdwpClient,
    thread: ThreadId,
    loader: ObjectId,
    entry_class: &str,
    classes: &CompiledClasses,
    method_name: &str,
    args: &[JdwpValue],
    needs_define: bool,
) -> Result<JdwpValue> {
    if needs_define {
        for (class_name, bytes) in classes {
            match define_class(client, thread, loader, class_name, bytes) {
                Ok(_) => {}
                // A LinkageError means the name is already defined on this
                // loader (a previous session injected it); forName below
                // resolves the existing class.
                Err(DebugError::DefineFailed(thrown)) if thrown.ends_with("LinkageError") => {
                    tracing::debug!(class_name, "class already defined in target");
                }
                Err(err) => return Err(err),
            }
        }
    }

    let class_object = force_initialize(client, thread, loader, entry_class)?;
    let (_tag, reflected_type) = client
        .class_object_reflected_type(class_object)
        .map_err(map_invoke_err)?;

    let methods = client
        .reference_type_methods(reflected_type)
        .map_err(map_invoke_err)?;
    let Some(method) = methods
        .iter()
        .find(|method| method.name == method_name && method.is_static())
    else {
        return Err(DebugError::MethodNotFound(method_name.to_string()));
    };

    let (value, exception) = client
        .class_type_invoke_method(
            reflected_type,
            thread,
            method.method_id,
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

/// Mirrors `bytes` into a target-side `byte[]` and calls
/// `loader.defineClass(name, bytes, 0, length)`.
fn define_class(
    client: &mut JdwpClient,
    thread: ThreadId,
    loader: ObjectId,
    class_name: &str,
    bytes: &[u8],
) -> Result<ObjectId> {
    let byte_array_type = client
        .classes_by_signature("[B")
        .map_err(map_invoke_err)?
        .into_iter()
        .next()
        .ok_or_else(|| DebugError::DefineFailed("byte[] type is not loaded".to_string()))?
        .type_id;

    let name_string = pinned_string(client, class_name)?;
    let array = client
        .array_type_new_instance(byte_array_type, bytes.len() as i32)
        .map_err(map_invoke_err)?;
    let _ = client.disable_collection(array);

    let result = (|| -> Result<ObjectId> {
        client.array_set_bytes(array, bytes).map_err(map_invoke_err)?;

        let (_tag, loader_type) = client.object_reference_type(loader).map_err(map_invoke_err)?;
        let Some((declaring, method_id)) =
            find_method_on_chain(client, loader_type, "defineClass", Some(DEFINE_CLASS_SIG))
                .map_err(map_invoke_err)?
        else {
            return Err(DebugError::DefineFailed(
                "loader has no defineClass(String, byte[], int, int)".to_string(),
            ));
        };

        let args = [
            JdwpValue::Object {
                tag: javelin_jdwp::tag::STRING,
                id: name_string,
            },
            JdwpValue::Object {
                tag: javelin_jdwp::tag::ARRAY,
                id: array,
            },
            JdwpValue::Int(0),
            JdwpValue::Int(bytes.len() as i32),
        ];
        let (value, exception) = client
            .object_invoke_method(
                loader,
                thread,
                declaring,
                method_id,
                &args,
                javelin_jdwp::INVOKE_SINGLE_THREADED,
            )
            .map_err(map_invoke_err)?;
        if exception != 0 {
            return Err(DebugError::DefineFailed(exception_type_name(
                client, exception,
            )));
        }
        value.object_id().ok_or_else(|| {
            DebugError::DefineFailed(format!("defineClass returned null for {class_name}"))
        })
    })();

    unpin_object(client, array);
    unpin_object(client, name_string);

    let class_object = result?;
    tracing::debug!(class_name, "defined class in target");
    Ok(class_object)
}

/// `Class.forName(name, true, loader)` drives the freshly defined class
/// through preparation and initialization. Returns the class object.
fn force_initialize(
    client: &mut JdwpClient,
    thread: ThreadId,
    loader: ObjectId,
    class_name: &str,
) -> Result<ObjectId> {
    let Some(class_class) = loaded_class(client, "java.lang.Class")? else {
        return Err(DebugError::DefineFailed(
            "java.lang.Class is not loaded".to_string(),
        ));
    };
    let Some((declaring, method_id)) =
        find_method_on_chain(client, class_class, "forName", Some(FOR_NAME_SIG))
            .map_err(map_invoke_err)?
    else {
        return Err(DebugError::MethodNotFound("forName".to_string()));
    };

    let name_string = pinned_string(client, class_name)?;
    let args = [
        JdwpValue::Object {
            tag: javelin_jdwp::tag::STRING,
            id: name_string,
        },
        JdwpValue::Boolean(true),
        JdwpValue::Object {
            tag: javelin_jdwp::tag::CLASS_LOADER,
            id: loader,
        },
    ];
    let invoked = client
        .class_type_invoke_method(
            declaring,
            thread,
            method_id,
            &args,
            javelin_jdwp::INVOKE_SINGLE_THREADED,
        )
        .map_err(map_invoke_err);
    unpin_object(client, name_string);

    let (value, exception) = invoked?;
    if exception != 0 {
        return Err(DebugError::InitializerThrew(exception_type_name(
            client, exception,
        )));
    }
    value.object_id().ok_or_else(|| {
        DebugError::DefineFailed(format!("Class.forName returned null for {class_name}"))
    })
}
