//! Client for the sidecar proxy's auxiliary HTTP API.
//!
//! The proxy is the authoritative store for installed breakpoints and for
//! the most recent breakpoint hit; this module only reads and deletes.

use serde::{Deserialize, Serialize};

use crate::error::{DebugError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointRecord {
    pub request_id: i32,
    #[serde(default)]
    pub class_id: i64,
    #[serde(default)]
    pub method_id: i64,
    #[serde(default)]
    pub code_index: i64,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub line_number: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BreakpointList {
    breakpoints: Vec<BreakpointRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentThread {
    pub thread_id: i64,
    pub thread_name: String,
    pub suspended: bool,
    pub frames: i32,
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
    base: String,
}

impl ProxyClient {
    pub fn new(host: &str, http_port: u16) -> Self {
        Self {
            base: format!("http://{host}:{http_port}"),
        }
    }

    pub fn list_breakpoints(&self) -> Result<Vec<BreakpointRecord>> {
        let url = format!("{}/breakpoints", self.base);
        let response = ureq::get(&url)
            .call()
            .map_err(|err| DebugError::TransportFailed(err.to_string()))?;
        let list: BreakpointList = response
            .into_json()
            .map_err(|err| DebugError::TransportFailed(err.to_string()))?;
        Ok(list.breakpoints)
    }

    /// Returns false when the proxy does not know the request id.
    pub fn delete_breakpoint(&self, request_id: i32) -> Result<bool> {
        let url = format!("{}/breakpoints/{request_id}", self.base);
        match ureq::delete(&url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(err) => Err(DebugError::TransportFailed(err.to_string())),
        }
    }

    /// The thread most recently paused at a breakpoint; `None` when the
    /// proxy has not captured one.
    pub fn current_thread(&self) -> Result<Option<CurrentThread>> {
        let url = format!("{}/current-thread", self.base);
        match ureq::get(&url).call() {
            Ok(response) => {
                let current = response
                    .into_json()
                    .map_err(|err| DebugError::TransportFailed(err.to_string()))?;
                Ok(Some(current))
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(DebugError::TransportFailed(err.to_string())),
        }
    }

    /// Finds a breakpoint record matching `class:line` in the proxy's table.
    pub fn find_breakpoint_at(&self, class_name: &str, line: i32) -> Result<Option<BreakpointRecord>> {
        Ok(self.list_breakpoints()?.into_iter().find(|record| {
            record.class_name.as_deref() == Some(class_name) && record.line_number == Some(line)
        }))
    }
}
