//! Execution control: resume, single-shot line steps, breakpoints.
//!
//! The proxy's HTTP store is authoritative for breakpoint listing and
//! deletion; this module installs requests over the debug channel and
//! delegates clearing to the proxy.

use super::*;

use javelin_jdwp::{event_kind, step, suspend_policy, EventModifier, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

impl StepDepth {
    fn wire_depth(self) -> i32 {
        match self {
            StepDepth::Into => step::DEPTH_INTO,
            StepDepth::Over => step::DEPTH_OVER,
            StepDepth::Out => step::DEPTH_OUT,
        }
    }
}

impl Debugger {
    /// Resumes all threads.
    pub fn resume(&self) -> Result<()> {
        self.with_client(|client| {
            client.vm_resume().map_err(DebugError::from)?;
            Ok(())
        })
    }

    /// Installs a single-shot line-granularity step request and resumes the
    /// thread. A previous pending step on the same thread is cleared first.
    pub fn step(&self, thread: ThreadId, depth: StepDepth) -> Result<()> {
        self.with_client(|client| {
            ensure_suspended(client, thread)?;

            if let Some(stale) = self.step_requests.lock().remove(&thread) {
                let _ = client.event_request_clear(event_kind::SINGLE_STEP, stale);
            }

            let request = client
                .event_request_set(
                    event_kind::SINGLE_STEP,
                    suspend_policy::EVENT_THREAD,
                    &[
                        EventModifier::Step {
                            thread,
                            size: step::SIZE_LINE,
                            depth: depth.wire_depth(),
                        },
                        // One shot: the request auto-disposes after firing.
                        EventModifier::Count(1),
                    ],
                )
                .map_err(DebugError::from)?;
            self.step_requests.lock().insert(thread, request);

            client.thread_resume(thread).map_err(DebugError::from)?;
            tracing::debug!(thread, ?depth, request, "step request installed");
            Ok(())
        })
    }

    /// Resolves `class:line` to its first executable location and installs
    /// an enabled breakpoint there.
    pub fn set_breakpoint(&self, class_name: &str, line: i32) -> Result<RequestId> {
        self.with_client(|client| {
            let Some(type_id) = loaded_class(client, class_name)? else {
                return Err(DebugError::ClassNotLoaded(class_name.to_string()));
            };

            let Some(location) = first_location_on_line(client, type_id, line)? else {
                return Err(DebugError::NoExecutableCode {
                    class: class_name.to_string(),
                    line,
                });
            };

            let request = client
                .event_request_set(
                    event_kind::BREAKPOINT,
                    suspend_policy::EVENT_THREAD,
                    &[EventModifier::LocationOnly(location)],
                )
                .map_err(DebugError::from)?;
            tracing::info!(class_name, line, request, "breakpoint installed");
            Ok(request)
        })
    }

    /// Removes every breakpoint the proxy knows at `class:line`. Returns the
    /// number removed.
    pub fn clear_breakpoint(&self, class_name: &str, line: i32) -> Result<usize> {
        let records = self.proxy.list_breakpoints()?;
        let mut removed = 0;
        for record in records {
            if record.class_name.as_deref() == Some(class_name)
                && record.line_number == Some(line)
                && self.proxy.delete_breakpoint(record.request_id)?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn clear_breakpoint_by_id(&self, request_id: RequestId) -> Result<()> {
        if self.proxy.delete_breakpoint(request_id)? {
            Ok(())
        } else {
            Err(DebugError::BreakpointNotFound(request_id))
        }
    }

    pub fn clear_all_breakpoints(&self) -> Result<usize> {
        let records = self.proxy.list_breakpoints()?;
        let mut removed = 0;
        for record in records {
            if self.proxy.delete_breakpoint(record.request_id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Reference type tag for classes, used when composing breakpoint
/// locations.
const TYPE_TAG_CLASS: u8 = 1;

/// The first executable location on `line`: the lowest code index carrying
/// the line, taken from the first method that declares it.
fn first_location_on_line(
    client: &mut JdwpClient,
    type_id: ReferenceTypeId,
    line: i32,
) -> Result<Option<Location>> {
    let methods = client
        .reference_type_methods(type_id)
        .map_err(DebugError::from)?;

    for method in methods {
        let Ok(table) = client.method_line_table(type_id, method.method_id) else {
            // Abstract and native methods have no line table.
            continue;
        };
        let index = table
            .lines
            .iter()
            .filter(|entry| entry.line == line)
            .map(|entry| entry.code_index)
            .min();
        if let Some(index) = index {
            return Ok(Some(Location {
                type_tag: TYPE_TAG_CLASS,
                class_id: type_id,
                method_id: method.method_id,
                index,
            }));
        }
    }
    Ok(None)
}
