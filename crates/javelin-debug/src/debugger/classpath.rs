//! Target classpath discovery and compiler configuration.
//!
//! Discovery reaches into the live target: it reads the class-path system
//! property, then walks the supplied thread's context-class-loader chain
//! and asks every URL-capable loader for its entries. Every step is a
//! remote invocation, which is why discovery must run on a thread that is
//! already suspended at a breakpoint and never nested inside another
//! in-flight invocation on the same thread.

use std::collections::HashSet;

use super::*;

use crate::jdk;

const GET_PROPERTY_SIG: &str = "(Ljava/lang/String;)Ljava/lang/String;";
const GET_CONTEXT_LOADER_SIG: &str = "()Ljava/lang/ClassLoader;";
const GET_PARENT_SIG: &str = "()Ljava/lang/ClassLoader;";
const GET_URLS_SIG: &str = "()[Ljava/net/URL;";
const URL_GET_PATH_SIG: &str = "()Ljava/lang/String;";

impl Debugger {
    /// Discovers the target's classpath, memoized per session. The thread
    /// must be suspended at a breakpoint.
    pub fn discover_classpath(&self, thread: ThreadId) -> Result<Vec<String>> {
        if let Some(found) = self.classpath.lock().clone() {
            return Ok(found);
        }

        let entries = self.with_client(|client| {
            ensure_suspended(client, thread).map_err(|err| match err {
                DebugError::ThreadNotSuspended(_) => DebugError::NotSuspended,
                other => other,
            })?;
            discover_entries(client, thread)
        })?;

        if entries.is_empty() {
            return Err(DebugError::ClasspathEmpty);
        }
        tracing::info!(count = entries.len(), "classpath discovered");
        *self.classpath.lock() = Some(entries.clone());
        Ok(entries)
    }

    /// Configures the source compiler from the discovered classpath and a
    /// local platform matching the target's major version. Runs at most
    /// once per session; later calls are cheap no-ops. Must precede the
    /// first `evaluate` so no remote invocation nests inside another.
    pub fn configure_compiler_classpath(&self, thread: ThreadId) -> Result<String> {
        if self.compiler.lock().is_some() {
            return Ok("compiler classpath already configured for this session".to_string());
        }

        let entries = self.discover_classpath(thread)?;

        let (version, java_home) = self.with_client(|client| {
            let version = get_system_property(client, thread, "java.version")?
                .ok_or_else(|| {
                    DebugError::InvalidRequest("target did not report java.version".to_string())
                })?;
            let java_home = get_system_property(client, thread, "java.home")?;
            Ok((version, java_home))
        })?;

        let major = jdk::major_version(&version).ok_or_else(|| {
            DebugError::PlatformNotFound(format!("unparsable target java.version `{version}`"))
        })?;
        let platform = jdk::find_platform(major, java_home.as_deref())?;

        let separator = if cfg!(windows) { ";" } else { ":" };
        let classpath = entries.join(separator);
        *self.compiler.lock() = Some(Arc::new(JavacCompiler::new(&platform.home, classpath)));

        Ok(format!(
            "compiler configured: platform {} (major {major}), {} classpath entries",
            platform.home.display(),
            entries.len()
        ))
    }

    pub(super) fn configured_compiler(&self) -> Result<Arc<JavacCompiler>> {
        self.compiler.lock().clone().ok_or_else(|| {
            DebugError::InvalidRequest(
                "compiler classpath is not configured; run configure-compiler-classpath on a \
                 suspended thread first"
                    .to_string(),
            )
        })
    }
}

/// Remote `System.getProperty(name)` on the supplied suspended thread.
pub(super) fn get_system_property(
    client: &mut JdwpClient,
    thread: ThreadId,
    name: &str,
) -> Result<Option<String>> {
    let Some(system) = loaded_class(client, "java.lang.System")? else {
        return Err(DebugError::ClassNotLoaded("java.lang.System".to_string()));
    };
    let name_id = pinned_string(client, name)?;
    let result = invoke_static(
        client,
        system,
        thread,
        "getProperty",
        GET_PROPERTY_SIG,
        &[JdwpValue::Object {
            tag: javelin_jdwp::tag::STRING,
            id: name_id,
        }],
    );
    unpin_object(client, name_id);
    remote_string(client, &result?).map_err(DebugError::from)
}

fn discover_entries(client: &mut JdwpClient, thread: ThreadId) -> Result<Vec<String>> {
    let mut entries: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |entries: &mut Vec<String>, seen: &mut HashSet<String>, entry: String| {
        if !entry.is_empty() && seen.insert(entry.clone()) {
            entries.push(entry);
        }
    };

    // The standard property first; the separator betrays the target OS.
    if let Some(raw) = get_system_property(client, thread, "java.class.path")? {
        let separator = if raw.contains(';') { ';' } else { ':' };
        for part in raw.split(separator) {
            push(&mut entries, &mut seen, part.trim().to_string());
        }
    }

    // Then the context-class-loader chain of the supplied thread.
    let loader = invoke_instance(
        client,
        thread,
        thread,
        "getContextClassLoader",
        GET_CONTEXT_LOADER_SIG,
        &[],
    )?;
    let Some(mut loader_id) = loader.object_id() else {
        tracing::warn!("thread has no context class loader, keeping property classpath only");
        return Ok(entries);
    };

    let mut visited: HashSet<ObjectId> = HashSet::new();
    loop {
        if !visited.insert(loader_id) {
            tracing::warn!(loader_id, "class loader chain contains a cycle");
            break;
        }

        if is_url_capable_loader(client, loader_id).map_err(DebugError::from)? {
            for entry in loader_url_entries(client, thread, loader_id)? {
                push(&mut entries, &mut seen, entry);
            }
        }

        let parent = invoke_instance(client, loader_id, thread, "getParent", GET_PARENT_SIG, &[])?;
        match parent.object_id() {
            Some(parent_id) => loader_id = parent_id,
            None => break,
        }
    }

    Ok(entries)
}

/// URL-based loaders and the servlet-container web-app loaders expose their
/// entries via `getURLs()`.
fn is_url_capable_loader(
    client: &mut JdwpClient,
    loader_id: ObjectId,
) -> std::result::Result<bool, JdwpError> {
    let (_tag, type_id) = client.object_reference_type(loader_id)?;
    let mut current = type_id;
    loop {
        let signature = client.reference_type_signature(current)?;
        let name = javelin_jdwp::signature_to_type_name(&signature);
        if name == "java.net.URLClassLoader" || name.ends_with("WebappClassLoader") {
            return Ok(true);
        }
        let superclass = client.class_type_superclass(current)?;
        if superclass == 0 {
            return Ok(false);
        }
        current = superclass;
    }
}

fn loader_url_entries(
    client: &mut JdwpClient,
    thread: ThreadId,
    loader_id: ObjectId,
) -> Result<Vec<String>> {
    let urls = invoke_instance(client, loader_id, thread, "getURLs", GET_URLS_SIG, &[])?;
    let Some(array_id) = urls.object_id() else {
        return Ok(Vec::new());
    };

    let length = client.array_length(array_id).map_err(DebugError::from)?;
    if length <= 0 {
        return Ok(Vec::new());
    }
    let url_objects = client
        .array_get_values(array_id, 0, length)
        .map_err(DebugError::from)?;

    let mut out = Vec::with_capacity(url_objects.len());
    for url in url_objects {
        let Some(url_id) = url.object_id() else {
            continue;
        };
        let path = invoke_instance(client, url_id, thread, "getPath", URL_GET_PATH_SIG, &[])?;
        if let Some(path) = remote_string(client, &path).map_err(DebugError::from)? {
            out.push(normalize_url_path(&path));
        }
    }
    Ok(out)
}

/// Decodes a `file:` URL path into a filesystem entry: percent sequences
/// are decoded, any `file:` prefix is stripped, and Windows drive paths
/// lose the artificial leading slash (`/C:/x` → `C:/x`).
pub(super) fn normalize_url_path(path: &str) -> String {
    let decoded = percent_decode(path);
    let stripped = decoded.strip_prefix("file:").unwrap_or(&decoded);
    let bytes = stripped.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' {
        return stripped[1..].to_string();
    }
    stripped.to_string()
}

/// Minimal percent-decoding; malformed sequences pass through untouched.
pub(super) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let Some(byte) = std::str::from_utf8(&bytes[index + 1..index + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(byte);
                index += 3;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decoding_handles_spaces_and_malformed_sequences() {
        assert_eq!(percent_decode("/opt/my%20app/lib"), "/opt/my app/lib");
        assert_eq!(percent_decode("no-escapes"), "no-escapes");
        assert_eq!(percent_decode("broken%2"), "broken%2");
        assert_eq!(percent_decode("broken%zz"), "broken%zz");
    }

    #[test]
    fn url_paths_normalize_to_filesystem_entries() {
        assert_eq!(normalize_url_path("/opt/app/classes/"), "/opt/app/classes/");
        assert_eq!(
            normalize_url_path("file:/opt/app/lib/dep.jar"),
            "/opt/app/lib/dep.jar"
        );
        assert_eq!(
            normalize_url_path("/C:/apps/demo/lib/dep.jar"),
            "C:/apps/demo/lib/dep.jar"
        );
        assert_eq!(
            normalize_url_path("/opt/my%20app/classes"),
            "/opt/my app/classes"
        );
    }
}
