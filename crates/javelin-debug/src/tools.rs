//! The named operation surface exposed to the automation client.
//!
//! Every operation returns structured text; failures are rendered as a
//! single `ERROR: …` line (with remediation appended for the environment
//! errors) instead of raised. Ordering contracts live here: watcher
//! evaluation configures the compiler classpath before the first
//! evaluation call so that discovery never nests inside an in-flight
//! remote invocation.

use serde_json::Value;

use javelin_jdwp::JdwpEvent;

use crate::config::Config;
use crate::debugger::{Debugger, StepDepth};
use crate::error::{DebugError, Result};

pub struct DebugTools {
    debugger: Debugger,
}

impl DebugTools {
    pub fn new(config: Config) -> Self {
        Self {
            debugger: Debugger::new(config),
        }
    }

    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    /// Runs a named operation with JSON arguments. Never panics and never
    /// raises: every failure comes back as an `ERROR: …` line.
    pub fn dispatch(&self, tool: &str, args: &Value) -> String {
        match self.run(tool, args) {
            Ok(text) => text,
            Err(err) => render_error(&err),
        }
    }

    /// Every operation except `attach`, `detach` and the liveness probe
    /// requires an attached session, the registry- and proxy-backed ones
    /// included.
    fn ensure_attached(&self) -> Result<()> {
        if self.debugger.is_attached() {
            Ok(())
        } else {
            Err(DebugError::NotAttached)
        }
    }

    fn run(&self, tool: &str, args: &Value) -> Result<String> {
        match tool {
            "attach" => {
                let host = opt_str_arg(args, "host").unwrap_or_else(|| "127.0.0.1".to_string());
                let port = match opt_i64_arg(args, "port") {
                    Some(port) => port as u16,
                    None => self.debugger.config().jdwp_port,
                };
                let banner = self.debugger.attach(&host, port)?;
                Ok(format!("Attached to {host}:{port} ({banner})"))
            }
            "detach" => Ok(if self.debugger.detach() {
                "Detached (local cleanup only, no Dispose sent)".to_string()
            } else {
                "Not attached".to_string()
            }),
            "is-alive" => Ok(self.debugger.is_alive().to_string()),

            "list-threads" => {
                let threads = self.debugger.list_threads()?;
                let lines: Vec<String> = threads
                    .iter()
                    .map(|thread| {
                        let frames = thread
                            .frame_count
                            .map(|count| count.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        format!(
                            "Thread#{} \"{}\" status={}({}) suspended={} frames={}",
                            thread.id,
                            thread.name,
                            thread.status_name,
                            thread.status_code,
                            thread.suspended,
                            frames
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "get-stack" => {
                let thread = u64_arg(args, "threadId")?;
                let frames = self.debugger.get_stack(thread)?;
                let lines: Vec<String> = frames
                    .iter()
                    .map(|frame| {
                        let source = frame.source_name.as_deref().unwrap_or("<unknown>");
                        let line = frame
                            .line
                            .map(|line| line.to_string())
                            .unwrap_or_else(|| "?".to_string());
                        format!(
                            "#{} {}.{} ({source}:{line})",
                            frame.index, frame.class_name, frame.method_name
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "get-locals" => {
                let thread = u64_arg(args, "threadId")?;
                let frame = opt_i64_arg(args, "frameIndex").unwrap_or(0) as usize;
                let locals = self.debugger.get_locals(thread, frame)?;
                if locals.is_empty() {
                    return Ok("(no visible locals)".to_string());
                }
                let lines: Vec<String> = locals
                    .iter()
                    .map(|local| {
                        format!("{} ({}) = {}", local.name, local.declared_type, local.value)
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "get-fields" => {
                let object_id = u64_arg(args, "objectId")?;
                Ok(self.debugger.get_fields(object_id)?.join("\n"))
            }

            "resume" => {
                self.debugger.resume()?;
                Ok("Resumed all threads".to_string())
            }
            "step-over" | "step-into" | "step-out" => {
                let thread = u64_arg(args, "threadId")?;
                let depth = match tool {
                    "step-into" => StepDepth::Into,
                    "step-out" => StepDepth::Out,
                    _ => StepDepth::Over,
                };
                self.debugger.step(thread, depth)?;
                Ok(format!("Stepping thread {thread} ({tool})"))
            }
            "set-breakpoint" => {
                let class = str_arg(args, "className")?;
                let line = i64_arg(args, "line")? as i32;
                let request = self.debugger.set_breakpoint(&class, line)?;
                Ok(format!(
                    "Breakpoint installed at {class}:{line} (request {request})"
                ))
            }
            "clear-breakpoint" => {
                self.ensure_attached()?;
                let class = str_arg(args, "className")?;
                let line = i64_arg(args, "line")? as i32;
                let removed = self.debugger.clear_breakpoint(&class, line)?;
                Ok(format!("Cleared {removed} breakpoint(s) at {class}:{line}"))
            }
            "clear-breakpoint-by-id" => {
                self.ensure_attached()?;
                let request = i64_arg(args, "requestId")? as i32;
                self.debugger.clear_breakpoint_by_id(request)?;
                Ok(format!("Cleared breakpoint {request}"))
            }
            "clear-all-breakpoints" => {
                self.ensure_attached()?;
                let removed = self.debugger.clear_all_breakpoints()?;
                Ok(format!("Cleared {removed} breakpoint(s)"))
            }
            "list-breakpoints" => {
                self.ensure_attached()?;
                let records = self.debugger.proxy().list_breakpoints()?;
                if records.is_empty() {
                    return Ok("(no breakpoints)".to_string());
                }
                let lines: Vec<String> = records
                    .iter()
                    .map(|record| {
                        format!(
                            "Breakpoint {} at {}:{} ({})",
                            record.request_id,
                            record.class_name.as_deref().unwrap_or("<unknown>"),
                            record
                                .line_number
                                .map(|line| line.to_string())
                                .unwrap_or_else(|| "?".to_string()),
                            record.method_name.as_deref().unwrap_or("<unknown>"),
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }

            "configure-compiler-classpath" => {
                let thread = u64_arg(args, "threadId")?;
                self.debugger.configure_compiler_classpath(thread)
            }
            "evaluate" => {
                let thread = u64_arg(args, "threadId")?;
                let frame = opt_i64_arg(args, "frameIndex").unwrap_or(0) as usize;
                let expression = str_arg(args, "expression")?;
                // Enforce the ordering contract here rather than failing:
                // discovery must precede the evaluation invocation.
                self.debugger.configure_compiler_classpath(thread)?;
                self.debugger.evaluate(thread, frame, &expression)
            }

            "create-watcher" => {
                self.ensure_attached()?;
                let label = str_arg(args, "label")?;
                let breakpoint = i64_arg(args, "breakpointId")? as i32;
                let expression = str_arg(args, "expression")?;
                let watcher = self
                    .debugger
                    .watchers()
                    .create(&label, breakpoint, &expression);
                Ok(format!(
                    "Watcher {} \"{}\" on breakpoint {} = `{}`",
                    watcher.id, watcher.label, watcher.breakpoint_id, watcher.expression
                ))
            }
            "get-watcher" => {
                self.ensure_attached()?;
                let id = str_arg(args, "watcherId")?;
                let watcher = self
                    .debugger
                    .watchers()
                    .get(&id)
                    .ok_or(DebugError::WatcherNotFound(id))?;
                Ok(format!(
                    "Watcher {} \"{}\" on breakpoint {} = `{}`",
                    watcher.id, watcher.label, watcher.breakpoint_id, watcher.expression
                ))
            }
            "list-watchers" => {
                self.ensure_attached()?;
                let watchers = self.debugger.watchers().all();
                if watchers.is_empty() {
                    return Ok("(no watchers)".to_string());
                }
                let lines: Vec<String> = watchers
                    .iter()
                    .map(|watcher| {
                        format!(
                            "{} \"{}\" breakpoint={} `{}`",
                            watcher.id, watcher.label, watcher.breakpoint_id, watcher.expression
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "delete-watcher" => {
                self.ensure_attached()?;
                let id = str_arg(args, "watcherId")?;
                if self.debugger.watchers().delete(&id) {
                    Ok(format!("Deleted watcher {id}"))
                } else {
                    Err(DebugError::WatcherNotFound(id))
                }
            }
            "delete-watchers-for-breakpoint" => {
                self.ensure_attached()?;
                let breakpoint = i64_arg(args, "breakpointId")? as i32;
                let removed = self.debugger.watchers().delete_for_breakpoint(breakpoint);
                Ok(format!(
                    "Deleted {removed} watcher(s) for breakpoint {breakpoint}"
                ))
            }
            "clear-watchers" => {
                self.ensure_attached()?;
                self.debugger.watchers().clear();
                Ok("Cleared all watchers".to_string())
            }
            "evaluate-watchers" => {
                self.ensure_attached()?;
                let thread = u64_arg(args, "threadId")?;
                let scope = opt_str_arg(args, "scope")
                    .unwrap_or_else(|| "current-frame".to_string());
                let breakpoint = opt_i64_arg(args, "breakpointId").map(|id| id as i32);
                self.evaluate_watchers(thread, &scope, breakpoint)
            }

            "get-current-thread" => {
                self.ensure_attached()?;
                match self.debugger.proxy().current_thread()? {
                    Some(current) => Ok(format!(
                        "Thread#{} \"{}\" suspended={} frames={}",
                        current.thread_id, current.thread_name, current.suspended, current.frames
                    )),
                    None => Ok("null".to_string()),
                }
            }
            "get-event-history" => {
                self.ensure_attached()?;
                let events = self.debugger.recent_events();
                if events.is_empty() {
                    return Ok("(no events)".to_string());
                }
                let lines: Vec<String> = events.iter().map(render_event).collect();
                Ok(lines.join("\n"))
            }

            other => Err(DebugError::InvalidRequest(format!(
                "unknown tool `{other}`"
            ))),
        }
    }

    /// Evaluates the watchers bound to the breakpoints the thread is
    /// currently stopped in. Per-watcher failures are captured inline and
    /// never abort the batch.
    fn evaluate_watchers(
        &self,
        thread: u64,
        scope: &str,
        breakpoint_id: Option<i32>,
    ) -> Result<String> {
        // Discovery first, so no remote invocation nests inside another.
        self.debugger.configure_compiler_classpath(thread)?;
        let stack = self.debugger.get_stack(thread)?;

        match scope {
            "current-frame" => {
                let Some(frame) = stack.first() else {
                    return Ok("(thread has no frames)".to_string());
                };
                let breakpoint = match breakpoint_id {
                    Some(id) => id,
                    None => {
                        let line = frame.line.ok_or_else(|| {
                            DebugError::InvalidRequest(
                                "current frame has no line information".to_string(),
                            )
                        })?;
                        self.debugger
                            .proxy()
                            .find_breakpoint_at(&frame.class_name, line)?
                            .map(|record| record.request_id)
                            .ok_or_else(|| {
                                DebugError::InvalidRequest(format!(
                                    "no breakpoint registered at {}:{line}",
                                    frame.class_name
                                ))
                            })?
                    }
                };

                let watchers = self.debugger.watchers().for_breakpoint(breakpoint);
                if watchers.is_empty() {
                    return Ok(format!("(no watchers for breakpoint {breakpoint})"));
                }
                let lines: Vec<String> = watchers
                    .iter()
                    .map(|watcher| {
                        let value = self.evaluate_inline(thread, 0, &watcher.expression);
                        format!("{} = {value}", watcher.label)
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "full-stack" => {
                let records = self.debugger.proxy().list_breakpoints()?;
                let mut lines = Vec::new();
                for frame in &stack {
                    let Some(line) = frame.line else { continue };
                    let Some(record) = records.iter().find(|record| {
                        record.class_name.as_deref() == Some(frame.class_name.as_str())
                            && record.line_number == Some(line)
                    }) else {
                        continue;
                    };
                    for watcher in self.debugger.watchers().for_breakpoint(record.request_id) {
                        let value = self.evaluate_inline(thread, frame.index, &watcher.expression);
                        lines.push(format!(
                            "#{} {}:{} {} = {value}",
                            frame.index, frame.class_name, line, watcher.label
                        ));
                    }
                }
                if lines.is_empty() {
                    return Ok("(no watchers matched the stack)".to_string());
                }
                Ok(lines.join("\n"))
            }
            other => Err(DebugError::InvalidRequest(format!(
                "unknown scope `{other}` (expected current-frame or full-stack)"
            ))),
        }
    }

    fn evaluate_inline(&self, thread: u64, frame_index: usize, expression: &str) -> String {
        match self.debugger.evaluate(thread, frame_index, expression) {
            Ok(value) => value,
            Err(err) => format!("[ERROR: {err}]"),
        }
    }
}

/// The user-visible failure shape: one line, with remediation for the
/// environment errors.
pub fn render_error(err: &DebugError) -> String {
    match err.remediation() {
        Some(remediation) => format!("ERROR: {err}. {remediation}"),
        None => format!("ERROR: {err}"),
    }
}

fn render_event(event: &JdwpEvent) -> String {
    match event {
        JdwpEvent::VmStart { thread, .. } => format!("vm-start thread={thread}"),
        JdwpEvent::SingleStep {
            thread, location, ..
        } => format!("step thread={thread} index={}", location.index),
        JdwpEvent::Breakpoint {
            request_id,
            thread,
            location,
        } => format!(
            "breakpoint request={request_id} thread={thread} index={}",
            location.index
        ),
        JdwpEvent::Exception {
            thread,
            exception,
            catch_location,
            ..
        } => format!(
            "exception thread={thread} object={exception} caught={}",
            catch_location.is_some()
        ),
        JdwpEvent::ThreadStart { thread, .. } => format!("thread-start thread={thread}"),
        JdwpEvent::ThreadDeath { thread, .. } => format!("thread-death thread={thread}"),
        JdwpEvent::ClassPrepare { signature, .. } => format!("class-prepare {signature}"),
        JdwpEvent::VmDeath { .. } => "vm-death".to_string(),
        JdwpEvent::Other { event_kind } => format!("event kind={event_kind}"),
    }
}

fn str_arg(args: &Value, name: &str) -> Result<String> {
    opt_str_arg(args, name)
        .ok_or_else(|| DebugError::InvalidRequest(format!("missing argument `{name}`")))
}

fn opt_str_arg(args: &Value, name: &str) -> Option<String> {
    args.get(name)?.as_str().map(str::to_string)
}

fn i64_arg(args: &Value, name: &str) -> Result<i64> {
    opt_i64_arg(args, name)
        .ok_or_else(|| DebugError::InvalidRequest(format!("missing argument `{name}`")))
}

fn opt_i64_arg(args: &Value, name: &str) -> Option<i64> {
    args.get(name)?.as_i64()
}

/// Thread and object identifiers arrive as JSON numbers; they are opaque
/// 64-bit ids, so the `i64 → u64` cast is a lossless bit-cast.
fn u64_arg(args: &Value, name: &str) -> Result<u64> {
    let value = args
        .get(name)
        .ok_or_else(|| DebugError::InvalidRequest(format!("missing argument `{name}`")))?;
    value
        .as_u64()
        .or_else(|| value.as_i64().map(|v| v as u64))
        .ok_or_else(|| DebugError::InvalidRequest(format!("argument `{name}` must be a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn errors_render_as_single_error_lines() {
        let rendered = render_error(&DebugError::ThreadNotFound(9));
        assert_eq!(rendered, "ERROR: no such thread: 9");
    }

    #[test]
    fn environment_errors_carry_remediation() {
        let rendered = render_error(&DebugError::NotAttached);
        assert!(rendered.starts_with("ERROR: not attached"));
        assert!(rendered.contains("attach"));
    }

    #[test]
    fn dispatch_never_raises_for_unknown_tools() {
        let tools = DebugTools::new(Config::default());
        let out = tools.dispatch("frobnicate", &json!({}));
        assert!(out.starts_with("ERROR: invalid request: unknown tool"));
    }

    #[test]
    fn operations_before_attach_render_not_attached() {
        let tools = DebugTools::new(Config::default());
        let out = tools.dispatch("list-threads", &json!({}));
        assert!(out.starts_with("ERROR: not attached"), "{out}");
        let out = tools.dispatch("resume", &json!({}));
        assert!(out.starts_with("ERROR: not attached"), "{out}");
        let out = tools.dispatch("evaluate", &json!({"threadId": 1, "expression": "1+1"}));
        assert!(out.starts_with("ERROR: not attached"), "{out}");
    }

    #[test]
    fn missing_arguments_are_reported_per_name() {
        let tools = DebugTools::new(Config::default());
        let out = tools.dispatch("get-stack", &json!({}));
        assert_eq!(out, "ERROR: invalid request: missing argument `threadId`");
    }

    #[test]
    fn registry_and_proxy_tools_are_gated_on_attachment() {
        let tools = DebugTools::new(Config::default());
        for (tool, args) in [
            (
                "create-watcher",
                json!({"label": "size", "breakpointId": 3, "expression": "request.size()"}),
            ),
            ("list-watchers", json!({})),
            ("clear-all-breakpoints", json!({})),
            ("get-current-thread", json!({})),
            ("get-event-history", json!({})),
        ] {
            let out = tools.dispatch(tool, &args);
            assert!(out.starts_with("ERROR: not attached"), "{tool}: {out}");
        }
    }

    #[test]
    fn detach_and_liveness_are_usable_before_attach() {
        let tools = DebugTools::new(Config::default());
        assert_eq!(tools.dispatch("is-alive", &json!({})), "false");
        assert_eq!(tools.dispatch("detach", &json!({})), "Not attached");
    }

    #[test]
    fn thread_ids_accept_negative_json_numbers_as_bit_casts() {
        let args = json!({"threadId": -1});
        assert_eq!(u64_arg(&args, "threadId").unwrap(), u64::MAX);
    }
}
