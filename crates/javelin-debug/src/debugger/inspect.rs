//! Thread, frame, local and object read-out with typed rendering.
//!
//! Rendering is also what populates the object cache: every non-primitive
//! value that reaches the client gets inserted keyed by its remote id, so
//! later `get-fields` calls can resolve it.

use super::*;

use javelin_jdwp::{tag, thread_status_name, FrameInfo, Location};

/// Upper bound on rendered array elements.
const ARRAY_ELEMENT_CAP: usize = 100;
/// Upper bound on rendered collection elements / map entries.
const COLLECTION_CAP: usize = 50;
/// Rendered string previews are truncated past this many characters.
const STRING_PREVIEW_CAP: usize = 200;

#[derive(Debug, Clone)]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub name: String,
    pub status_code: i32,
    pub status_name: &'static str,
    pub suspended: bool,
    pub frame_count: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct FrameSummary {
    pub index: usize,
    pub class_name: String,
    pub method_name: String,
    pub source_name: Option<String>,
    pub line: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub name: String,
    pub declared_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionKind {
    ArrayList,
    HashMap,
    LinkedHashMap,
    TreeMap,
    HashSet,
    LinkedHashSet,
    TreeSet,
}

impl CollectionKind {
    fn from_class_name(name: &str) -> Option<Self> {
        match name {
            "java.util.ArrayList" => Some(Self::ArrayList),
            "java.util.HashMap" => Some(Self::HashMap),
            "java.util.LinkedHashMap" => Some(Self::LinkedHashMap),
            "java.util.TreeMap" => Some(Self::TreeMap),
            "java.util.HashSet" => Some(Self::HashSet),
            "java.util.LinkedHashSet" => Some(Self::LinkedHashSet),
            "java.util.TreeSet" => Some(Self::TreeSet),
            _ => None,
        }
    }
}

impl Debugger {
    /// Every thread in the target: id, name, raw status, suspension flag,
    /// and the frame count for suspended threads.
    pub fn list_threads(&self) -> Result<Vec<ThreadSummary>> {
        self.with_client(|client| {
            let threads = client.all_threads().map_err(DebugError::from)?;
            let mut out = Vec::with_capacity(threads.len());
            for thread in threads {
                let name = client
                    .thread_name(thread)
                    .unwrap_or_else(|_| "<unnamed>".to_string());
                // Threads can die between the listing and the status call.
                let (status_code, suspend_status) =
                    client.thread_status(thread).unwrap_or((-1, 0));
                let suspended = suspend_status & SUSPEND_STATUS_SUSPENDED != 0;
                let frame_count = if suspended {
                    client.thread_frame_count(thread).ok()
                } else {
                    None
                };
                out.push(ThreadSummary {
                    id: thread,
                    name,
                    status_code,
                    status_name: thread_status_name(status_code),
                    suspended,
                    frame_count,
                });
            }
            Ok(out)
        })
    }

    /// Ordered frames of a suspended thread, outermost call last.
    pub fn get_stack(&self, thread: ThreadId) -> Result<Vec<FrameSummary>> {
        self.with_client(|client| {
            ensure_suspended(client, thread)?;
            let frames = client.thread_frames(thread, 0, -1).map_err(DebugError::from)?;
            let mut out = Vec::with_capacity(frames.len());
            for (index, frame) in frames.iter().enumerate() {
                out.push(summarize_frame(client, index, frame)?);
            }
            Ok(out)
        })
    }

    /// Visible locals of one frame, rendered.
    pub fn get_locals(&self, thread: ThreadId, frame_index: usize) -> Result<Vec<LocalEntry>> {
        self.with_client(|client| {
            let frame = frame_at(client, thread, frame_index)?;
            let locals = in_scope_variables(client, &frame)?;

            let slots: Vec<(u32, u8)> = locals
                .iter()
                .map(|var| (var.slot, var.signature.bytes().next().unwrap_or(b'L')))
                .collect();
            let values = client
                .frame_get_values(thread, frame.frame_id, &slots)
                .map_err(DebugError::from)?;

            let mut out = Vec::with_capacity(locals.len());
            for (var, value) in locals.iter().zip(values.iter()) {
                out.push(LocalEntry {
                    name: var.name.clone(),
                    declared_type: javelin_jdwp::signature_to_type_name(&var.signature),
                    value: render_value(client, &self.objects, value)?,
                });
            }
            Ok(out)
        })
    }

    /// Fields (or elements, or a semantic collection view) of a cached
    /// object. The object must have been rendered before.
    pub fn get_fields(&self, object_id: ObjectId) -> Result<Vec<String>> {
        let cached = self.objects.lock().get(object_id).cloned()?;

        self.with_client(|client| {
            if cached.tag == tag::ARRAY {
                return render_array_elements(client, &self.objects, object_id);
            }

            let kind = collection_kind_of(client, object_id).map_err(|err| {
                match err.vm_error_code() {
                    Some(error_code::INVALID_OBJECT) => {
                        self.objects.lock().mark_invalid(object_id);
                        DebugError::ObjectNotCached(object_id)
                    }
                    _ => DebugError::from(err),
                }
            })?;

            let mut lines = Vec::new();
            if let Some((kind, type_name)) = kind {
                match render_collection(client, &self.objects, object_id, kind, &type_name) {
                    Ok(mut semantic) => lines.append(&mut semantic),
                    Err(err) => lines.push(format!("... (error reading collection: {err})")),
                }
                lines.push("Raw fields:".to_string());
            }

            lines.extend(render_object_fields(client, &self.objects, object_id)?);
            Ok(lines)
        })
    }
}

fn summarize_frame(
    client: &mut JdwpClient,
    index: usize,
    frame: &FrameInfo,
) -> Result<FrameSummary> {
    let signature = client
        .reference_type_signature(frame.location.class_id)
        .map_err(DebugError::from)?;
    let class_name = javelin_jdwp::signature_to_type_name(&signature);

    let methods = client
        .reference_type_methods(frame.location.class_id)
        .map_err(DebugError::from)?;
    let method_name = methods
        .iter()
        .find(|method| method.method_id == frame.location.method_id)
        .map(|method| method.name.clone())
        .unwrap_or_else(|| "<unknown>".to_string());

    let source_name = client.reference_type_source_file(frame.location.class_id).ok();
    let line = line_for_location(client, &frame.location);

    Ok(FrameSummary {
        index,
        class_name,
        method_name,
        source_name,
        line,
    })
}

/// The last line-table entry at or before the location's code index.
pub(super) fn line_for_location(client: &mut JdwpClient, location: &Location) -> Option<i32> {
    let table = client
        .method_line_table(location.class_id, location.method_id)
        .ok()?;
    let mut best = None;
    for entry in &table.lines {
        if entry.code_index <= location.index {
            best = Some(entry.line);
        }
    }
    best
}

pub(super) fn frame_at(
    client: &mut JdwpClient,
    thread: ThreadId,
    frame_index: usize,
) -> Result<FrameInfo> {
    ensure_suspended(client, thread)?;
    let frames = client.thread_frames(thread, 0, -1).map_err(DebugError::from)?;
    frames
        .get(frame_index)
        .copied()
        .ok_or(DebugError::FrameOutOfRange {
            index: frame_index,
            frames: frames.len(),
        })
}

/// Variables of the frame's method that are in scope at its code index,
/// sorted and deduplicated by slot.
pub(super) fn in_scope_variables(
    client: &mut JdwpClient,
    frame: &FrameInfo,
) -> Result<Vec<javelin_jdwp::VariableInfo>> {
    let (_arg_cnt, vars) = client
        .method_variable_table(frame.location.class_id, frame.location.method_id)
        .map_err(|err| match err.vm_error_code() {
            Some(error_code::ABSENT_INFORMATION) => DebugError::NoDebugInfo(
                "method has no local variable table (compiled without -g)".to_string(),
            ),
            _ => DebugError::from(err),
        })?;

    let mut in_scope: Vec<_> = vars
        .into_iter()
        .filter(|var| {
            var.code_index <= frame.location.index
                && frame.location.index < var.code_index + u64::from(var.length)
        })
        .collect();
    in_scope.sort_by_key(|var| var.slot);
    in_scope.dedup_by(|a, b| a.slot == b.slot);
    Ok(in_scope)
}

/// Renders one value per the fixed rules; inserts every non-primitive into
/// the object cache as a side effect.
pub(super) fn render_value(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    value: &JdwpValue,
) -> Result<String> {
    Ok(match value {
        JdwpValue::Void => "void".to_string(),
        JdwpValue::Boolean(v) => v.to_string(),
        JdwpValue::Byte(v) => v.to_string(),
        JdwpValue::Short(v) => v.to_string(),
        JdwpValue::Int(v) => v.to_string(),
        JdwpValue::Long(v) => v.to_string(),
        JdwpValue::Float(v) => trim_float(f64::from(*v)),
        JdwpValue::Double(v) => trim_float(*v),
        JdwpValue::Char(v) => {
            let ch = char::from_u32(u32::from(*v)).unwrap_or('\u{FFFD}');
            format!("'{ch}'")
        }
        JdwpValue::Object { id: 0, .. } => "null".to_string(),
        JdwpValue::Object { tag: t, id } => {
            return render_object(client, objects, *t, *id);
        }
    })
}

fn render_object(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    value_tag: u8,
    object_id: ObjectId,
) -> Result<String> {
    if value_tag == tag::STRING {
        return match client.string_value(object_id) {
            Ok(text) => {
                objects
                    .lock()
                    .insert(object_id, value_tag, "java.lang.String");
                Ok(format!(
                    "\"{}\"",
                    escape_java_string(&text, STRING_PREVIEW_CAP)
                ))
            }
            Err(err) => collected_or_err(objects, object_id, err),
        };
    }

    let type_name = match runtime_type_name(client, object_id) {
        Ok(name) => name,
        Err(err) => return collected_or_err(objects, object_id, err),
    };

    // Boxed primitives read as their wrapped value.
    if is_primitive_wrapper(&type_name) {
        objects.lock().insert(object_id, value_tag, &type_name);
        if let Ok(Some(inner)) = read_field(client, object_id, "value") {
            if !matches!(inner, JdwpValue::Object { .. }) {
                return render_value(client, objects, &inner);
            }
        }
    }

    if value_tag == tag::ARRAY {
        let length = match client.array_length(object_id) {
            Ok(length) => length,
            Err(err) => return collected_or_err(objects, object_id, err),
        };
        objects.lock().insert(object_id, value_tag, &type_name);
        let element_type = type_name.strip_suffix("[]").unwrap_or(&type_name);
        return Ok(format!("Array#{object_id} ({element_type}[{length}])"));
    }

    objects.lock().insert(object_id, value_tag, &type_name);
    Ok(format!("Object#{object_id} ({type_name})"))
}

/// An `INVALID_OBJECT` reply means the remote object was collected: the
/// cache entry is invalidated and the render degrades instead of failing.
fn collected_or_err(
    objects: &Mutex<ObjectRegistry>,
    object_id: ObjectId,
    err: JdwpError,
) -> Result<String> {
    if err.vm_error_code() == Some(error_code::INVALID_OBJECT) {
        objects.lock().mark_invalid(object_id);
        return Ok(format!("Object#{object_id} <collected>"));
    }
    Err(err.into())
}

fn render_array_elements(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    array_id: ObjectId,
) -> Result<Vec<String>> {
    let type_name = runtime_type_name(client, array_id).map_err(DebugError::from)?;
    let length = client.array_length(array_id).map_err(DebugError::from)?;
    let shown = (length.max(0) as usize).min(ARRAY_ELEMENT_CAP);

    let mut lines = Vec::with_capacity(shown + 2);
    lines.push(format!("Array ({type_name}), length {length}"));
    if shown > 0 {
        let values = client
            .array_get_values(array_id, 0, shown as i32)
            .map_err(DebugError::from)?;
        for (index, value) in values.iter().enumerate() {
            let rendered = render_value(client, objects, value)?;
            lines.push(format!("[{index}] = {rendered}"));
        }
    }
    if let Some(tail) = summarize_tail(length.max(0) as usize, shown, "elements") {
        lines.push(tail);
    }
    Ok(lines)
}

/// `... (N more ...)` tail when a listing was capped.
fn summarize_tail(total: usize, shown: usize, noun: &str) -> Option<String> {
    (total > shown).then(|| format!("... ({} more {noun})", total - shown))
}

/// Matches the object's class chain against the recognized collection
/// shapes.
fn collection_kind_of(
    client: &mut JdwpClient,
    object_id: ObjectId,
) -> std::result::Result<Option<(CollectionKind, String)>, JdwpError> {
    let (_tag, type_id) = client.object_reference_type(object_id)?;
    let mut current = type_id;
    loop {
        let signature = client.reference_type_signature(current)?;
        let name = javelin_jdwp::signature_to_type_name(&signature);
        if let Some(kind) = CollectionKind::from_class_name(&name) {
            return Ok(Some((kind, name)));
        }
        let superclass = client.class_type_superclass(current)?;
        if superclass == 0 {
            return Ok(None);
        }
        current = superclass;
    }
}

fn render_collection(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    object_id: ObjectId,
    kind: CollectionKind,
    type_name: &str,
) -> Result<Vec<String>> {
    match kind {
        CollectionKind::ArrayList => render_array_list(client, objects, object_id, type_name),
        CollectionKind::LinkedHashMap => {
            render_linked_map(client, objects, object_id, type_name, MapRender::Entries)
        }
        CollectionKind::HashMap => {
            render_bucket_map(client, objects, object_id, type_name, MapRender::Entries)
        }
        CollectionKind::TreeMap => {
            render_tree_map(client, objects, object_id, type_name, MapRender::Entries)
        }
        CollectionKind::HashSet | CollectionKind::LinkedHashSet => {
            render_set_via_inner_map(client, objects, object_id, type_name, "map")
        }
        CollectionKind::TreeSet => {
            render_set_via_inner_map(client, objects, object_id, type_name, "m")
        }
    }
}

/// Whether map traversals emit `key = value` pairs or keys only (sets are
/// backed by maps).
#[derive(Clone, Copy, PartialEq, Eq)]
enum MapRender {
    Entries,
    KeysOnly,
}

fn read_int_field(
    client: &mut JdwpClient,
    object_id: ObjectId,
    name: &str,
) -> std::result::Result<Option<i32>, JdwpError> {
    Ok(match read_field(client, object_id, name)? {
        Some(JdwpValue::Int(v)) => Some(v),
        _ => None,
    })
}

fn render_array_list(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    list_id: ObjectId,
    type_name: &str,
) -> Result<Vec<String>> {
    let size = read_int_field(client, list_id, "size")
        .map_err(DebugError::from)?
        .unwrap_or(0)
        .max(0) as usize;
    let mut lines = vec![format!("List view ({type_name})"), format!("Size: {size}")];

    let backing = read_field(client, list_id, "elementData").map_err(DebugError::from)?;
    let shown = size.min(COLLECTION_CAP);
    if let Some(JdwpValue::Object { id, .. }) = backing {
        if id != 0 && shown > 0 {
            let values = client
                .array_get_values(id, 0, shown as i32)
                .map_err(DebugError::from)?;
            for (index, value) in values.iter().enumerate() {
                let rendered = render_value(client, objects, value)?;
                lines.push(format!("[{index}] = {rendered}"));
            }
        }
    }
    if let Some(tail) = summarize_tail(size, shown, "elements") {
        lines.push(tail);
    }
    Ok(lines)
}

/// LinkedHashMap: walk the doubly-linked entry list from `head` via
/// `after`; entry key/value live on the inherited HashMap node.
fn render_linked_map(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    map_id: ObjectId,
    type_name: &str,
    mode: MapRender,
) -> Result<Vec<String>> {
    let size = read_int_field(client, map_id, "size")
        .map_err(DebugError::from)?
        .unwrap_or(0)
        .max(0) as usize;
    let mut lines = map_header(type_name, size, mode);

    let mut entry = read_field(client, map_id, "head").map_err(DebugError::from)?;
    let mut shown = 0usize;
    while let Some(JdwpValue::Object { id, .. }) = entry {
        if id == 0 || shown >= COLLECTION_CAP {
            break;
        }
        lines.push(render_map_entry(client, objects, id, mode)?);
        shown += 1;
        entry = read_field(client, id, "after").map_err(DebugError::from)?;
    }

    if let Some(tail) = summarize_tail(size, shown, tail_noun(mode)) {
        lines.push(tail);
    }
    Ok(lines)
}

/// HashMap: iterate the bucket table, following each bucket's `next` chain.
fn render_bucket_map(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    map_id: ObjectId,
    type_name: &str,
    mode: MapRender,
) -> Result<Vec<String>> {
    let size = read_int_field(client, map_id, "size")
        .map_err(DebugError::from)?
        .unwrap_or(0)
        .max(0) as usize;
    let mut lines = map_header(type_name, size, mode);

    let mut shown = 0usize;
    if let Some(JdwpValue::Object { id: table_id, .. }) =
        read_field(client, map_id, "table").map_err(DebugError::from)?
    {
        if table_id != 0 {
            let bucket_count = client.array_length(table_id).map_err(DebugError::from)?;
            'buckets: for bucket in 0..bucket_count {
                let nodes = client
                    .array_get_values(table_id, bucket, 1)
                    .map_err(DebugError::from)?;
                let mut node = nodes.into_iter().next();
                while let Some(JdwpValue::Object { id, .. }) = node {
                    if id == 0 {
                        break;
                    }
                    if shown >= COLLECTION_CAP {
                        break 'buckets;
                    }
                    lines.push(render_map_entry(client, objects, id, mode)?);
                    shown += 1;
                    node = read_field(client, id, "next").map_err(DebugError::from)?;
                }
            }
        }
    }

    if let Some(tail) = summarize_tail(size, shown, tail_noun(mode)) {
        lines.push(tail);
    }
    Ok(lines)
}

/// TreeMap: iterative in-order walk over `left`/`right` from `root`.
fn render_tree_map(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    map_id: ObjectId,
    type_name: &str,
    mode: MapRender,
) -> Result<Vec<String>> {
    let size = read_int_field(client, map_id, "size")
        .map_err(DebugError::from)?
        .unwrap_or(0)
        .max(0) as usize;
    let mut lines = map_header(type_name, size, mode);

    let mut stack: Vec<ObjectId> = Vec::new();
    let mut current = object_id_of(read_field(client, map_id, "root").map_err(DebugError::from)?);
    let mut shown = 0usize;

    while (current.is_some() || !stack.is_empty()) && shown < COLLECTION_CAP {
        while let Some(node) = current {
            stack.push(node);
            current = object_id_of(read_field(client, node, "left").map_err(DebugError::from)?);
        }
        let Some(node) = stack.pop() else {
            break;
        };
        lines.push(render_map_entry(client, objects, node, mode)?);
        shown += 1;
        current = object_id_of(read_field(client, node, "right").map_err(DebugError::from)?);
    }

    if let Some(tail) = summarize_tail(size, shown, tail_noun(mode)) {
        lines.push(tail);
    }
    Ok(lines)
}

/// Sets delegate to their backing map, rendering keys only.
fn render_set_via_inner_map(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    set_id: ObjectId,
    type_name: &str,
    map_field: &str,
) -> Result<Vec<String>> {
    let Some(inner) = object_id_of(read_field(client, set_id, map_field).map_err(DebugError::from)?)
    else {
        return Ok(vec![
            format!("Set view ({type_name})"),
            "Size: 0".to_string(),
        ]);
    };

    let inner_kind = collection_kind_of(client, inner).map_err(DebugError::from)?;
    let mut lines = match inner_kind {
        Some((CollectionKind::LinkedHashMap, _)) => {
            render_linked_map(client, objects, inner, type_name, MapRender::KeysOnly)?
        }
        Some((CollectionKind::TreeMap, _)) => {
            render_tree_map(client, objects, inner, type_name, MapRender::KeysOnly)?
        }
        _ => render_bucket_map(client, objects, inner, type_name, MapRender::KeysOnly)?,
    };
    if let Some(first) = lines.first_mut() {
        *first = format!("Set view ({type_name})");
    }
    Ok(lines)
}

fn map_header(type_name: &str, size: usize, mode: MapRender) -> Vec<String> {
    let label = match mode {
        MapRender::Entries => "Map view",
        MapRender::KeysOnly => "Set view",
    };
    vec![format!("{label} ({type_name})"), format!("Size: {size}")]
}

fn tail_noun(mode: MapRender) -> &'static str {
    match mode {
        MapRender::Entries => "entries",
        MapRender::KeysOnly => "elements",
    }
}

fn render_map_entry(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    entry_id: ObjectId,
    mode: MapRender,
) -> Result<String> {
    let key = read_field(client, entry_id, "key")
        .map_err(DebugError::from)?
        .unwrap_or(JdwpValue::null());
    let key = render_value(client, objects, &key)?;
    match mode {
        MapRender::KeysOnly => Ok(format!("- {key}")),
        MapRender::Entries => {
            let value = read_field(client, entry_id, "value")
                .map_err(DebugError::from)?
                .unwrap_or(JdwpValue::null());
            let value = render_value(client, objects, &value)?;
            Ok(format!("{key} = {value}"))
        }
    }
}

fn object_id_of(value: Option<JdwpValue>) -> Option<ObjectId> {
    match value {
        Some(JdwpValue::Object { id, .. }) if id != 0 => Some(id),
        _ => None,
    }
}

/// Declared and inherited instance fields with rendered values.
fn render_object_fields(
    client: &mut JdwpClient,
    objects: &Mutex<ObjectRegistry>,
    object_id: ObjectId,
) -> Result<Vec<String>> {
    let (_tag, type_id) = client
        .object_reference_type(object_id)
        .map_err(DebugError::from)?;

    let mut fields = Vec::new();
    let mut current = type_id;
    loop {
        let declared = client
            .reference_type_fields(current)
            .map_err(DebugError::from)?;
        fields.extend(declared.into_iter().filter(|field| !field.is_static()));
        let superclass = client.class_type_superclass(current).map_err(DebugError::from)?;
        if superclass == 0 {
            break;
        }
        current = superclass;
    }

    if fields.is_empty() {
        return Ok(vec!["(no instance fields)".to_string()]);
    }

    let ids: Vec<u64> = fields.iter().map(|field| field.field_id).collect();
    let values = client
        .object_get_values(object_id, &ids)
        .map_err(DebugError::from)?;

    let mut lines = Vec::with_capacity(fields.len());
    for (field, value) in fields.iter().zip(values.iter()) {
        let rendered = render_value(client, objects, value)?;
        lines.push(format!("{} = {}", field.name, rendered));
    }
    Ok(lines)
}

fn is_primitive_wrapper(type_name: &str) -> bool {
    matches!(
        type_name,
        "java.lang.Boolean"
            | "java.lang.Byte"
            | "java.lang.Character"
            | "java.lang.Short"
            | "java.lang.Integer"
            | "java.lang.Long"
            | "java.lang.Float"
            | "java.lang.Double"
    )
}

pub(super) fn trim_float(value: f64) -> String {
    if value.is_nan() || value.is_infinite() {
        return value.to_string();
    }
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

pub(super) fn escape_java_string(input: &str, max_len: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in input.chars() {
        if used >= max_len {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
        used += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rendering_drops_integral_noise() {
        assert_eq!(trim_float(1.0), "1");
        assert_eq!(trim_float(1.5), "1.5");
        assert_eq!(trim_float(f64::NAN), "NaN");
    }

    #[test]
    fn string_escaping_handles_specials_and_truncation() {
        assert_eq!(escape_java_string("a\"b\n", 10), "a\\\"b\\n");
        let long = "x".repeat(300);
        let escaped = escape_java_string(&long, 200);
        assert!(escaped.ends_with('…'));
        assert_eq!(escaped.chars().count(), 201);
    }

    #[test]
    fn capped_listings_summarize_the_remainder() {
        assert_eq!(
            summarize_tail(120, 50, "elements"),
            Some("... (70 more elements)".to_string())
        );
        assert_eq!(summarize_tail(50, 50, "elements"), None);
        assert_eq!(summarize_tail(3, 3, "entries"), None);
    }

    #[test]
    fn boxed_primitive_types_are_recognized() {
        assert!(is_primitive_wrapper("java.lang.Integer"));
        assert!(is_primitive_wrapper("java.lang.Character"));
        assert!(!is_primitive_wrapper("java.lang.String"));
        assert!(!is_primitive_wrapper("java.math.BigInteger"));
    }

    #[test]
    fn collection_kinds_match_exact_class_names_only() {
        assert_eq!(
            CollectionKind::from_class_name("java.util.ArrayList"),
            Some(CollectionKind::ArrayList)
        );
        assert_eq!(
            CollectionKind::from_class_name("java.util.LinkedHashMap"),
            Some(CollectionKind::LinkedHashMap)
        );
        assert_eq!(CollectionKind::from_class_name("java.util.Vector"), None);
        assert_eq!(CollectionKind::from_class_name("demo.MyList"), None);
    }
}
