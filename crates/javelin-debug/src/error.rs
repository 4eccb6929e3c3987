use thiserror::Error;

use javelin_jdwp::JdwpError;

pub type Result<T> = std::result::Result<T, DebugError>;

/// A single javac diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

#[derive(Debug, Error)]
pub enum DebugError {
    // Session layer.
    #[error("not attached to a target VM")]
    NotAttached,
    #[error("debug transport failed: {0}")]
    TransportFailed(String),
    #[error("endpoint does not speak JDWP")]
    ProtocolMismatch,

    // Inspection layer.
    #[error("no such thread: {0}")]
    ThreadNotFound(u64),
    #[error("thread {0} is not suspended")]
    ThreadNotSuspended(u64),
    #[error("frame index {index} is out of range (thread has {frames} frames)")]
    FrameOutOfRange { index: usize, frames: usize },
    #[error("no debug information: {0}")]
    NoDebugInfo(String),

    // Control layer.
    #[error("class is not loaded in the target: {0}")]
    ClassNotLoaded(String),
    #[error("no executable code at {class}:{line}")]
    NoExecutableCode { class: String, line: i32 },
    #[error("no breakpoint with request id {0}")]
    BreakpointNotFound(i32),

    // Discovery layer.
    #[error("thread must be suspended at a breakpoint before discovery can run")]
    NotSuspended,
    #[error("no usable class loader for the current frame")]
    NoContextLoader,
    #[error("no local platform runtime matches the target: {0}")]
    PlatformNotFound(String),
    #[error("classpath discovery produced no entries")]
    ClasspathEmpty,

    // Compiler.
    #[error("compilation failed:\n{}", render_diagnostics(.0))]
    CompilationFailed(Vec<Diagnostic>),

    // Remote execution.
    #[error("defineClass failed: {0}")]
    DefineFailed(String),
    #[error("class initializer threw {0}")]
    InitializerThrew(String),
    #[error("generated class has no static method named {0}")]
    MethodNotFound(String),
    #[error("invocation threw {0}")]
    InvocationThrew(String),
    #[error("target thread is not in a valid state for remote invocation")]
    IncompatibleThreadState,

    // Registry / cache.
    #[error("object {0} is not in cache")]
    ObjectNotCached(u64),
    #[error("no watcher with id {0}")]
    WatcherNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Residual protocol errors with no more specific mapping.
    #[error("jdwp: {0}")]
    Jdwp(JdwpError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<JdwpError> for DebugError {
    fn from(err: JdwpError) -> Self {
        match err {
            JdwpError::Io(e) => DebugError::TransportFailed(e.to_string()),
            JdwpError::Protocol(msg) => DebugError::TransportFailed(msg),
            JdwpError::InvalidUtf8(e) => DebugError::TransportFailed(e.to_string()),
            JdwpError::HandshakeFailed => DebugError::ProtocolMismatch,
            other => DebugError::Jdwp(other),
        }
    }
}

impl DebugError {
    /// Deterministic remediation advice for the environment errors; appended
    /// to the user-visible failure line.
    pub fn remediation(&self) -> Option<String> {
        match self {
            DebugError::NotAttached => Some(
                "Call `attach` with the proxy host and port before any other operation."
                    .to_string(),
            ),
            DebugError::PlatformNotFound(detail) => Some(format!(
                "Install a JDK whose major version matches the target. {detail}"
            )),
            DebugError::ClasspathEmpty => Some(
                "Re-run classpath discovery on a thread that is suspended at a breakpoint \
                 inside application code."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_to_transport_failed() {
        let err: DebugError =
            JdwpError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone")).into();
        assert!(matches!(err, DebugError::TransportFailed(_)));
    }

    #[test]
    fn handshake_rejection_maps_to_protocol_mismatch() {
        let err: DebugError = JdwpError::HandshakeFailed.into();
        assert!(matches!(err, DebugError::ProtocolMismatch));
    }

    #[test]
    fn vm_errors_stay_protocol_level() {
        let err: DebugError = JdwpError::VmError(20).into();
        assert!(matches!(err, DebugError::Jdwp(JdwpError::VmError(20))));
    }

    #[test]
    fn compilation_failure_lists_diagnostics() {
        let err = DebugError::CompilationFailed(vec![Diagnostic {
            file: "Expr.java".to_string(),
            line: 3,
            message: "cannot find symbol".to_string(),
        }]);
        let rendered = err.to_string();
        assert!(rendered.contains("Expr.java:3: cannot find symbol"));
    }

    #[test]
    fn only_environment_errors_carry_remediation() {
        assert!(DebugError::NotAttached.remediation().is_some());
        assert!(DebugError::ClasspathEmpty.remediation().is_some());
        assert!(DebugError::PlatformNotFound("probed /usr/lib/jvm".to_string())
            .remediation()
            .is_some());
        assert!(DebugError::NotSuspended.remediation().is_none());
        assert!(DebugError::ThreadNotFound(1).remediation().is_none());
    }
}
