//! Debug-inspection and expression-evaluation engine for JVM targets.
//!
//! The engine attaches to a paused runtime through a multiplexing JDWP
//! proxy, projects its live state (threads, frames, variables, object
//! graphs, collections) to an automation client, controls execution, and
//! evaluates source-level expressions inside the target by compiling a
//! wrapper class, injecting the bytecode into a live class loader, forcing
//! its preparation and invoking its static method on the debugger thread.

pub mod config;
pub mod debugger;
pub mod error;
pub mod javac;
pub mod jdk;
pub mod object_registry;
pub mod proxy;
pub mod session;
pub mod tools;
pub mod watchers;

pub use config::Config;
pub use debugger::{Debugger, StepDepth};
pub use error::{DebugError, Result};
pub use tools::DebugTools;
