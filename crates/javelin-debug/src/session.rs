//! The attached debug session.
//!
//! One TCP connection to the proxy ingress, shared by every component. The
//! protocol handle lives behind a mutex so that all requests are serialised;
//! a transient transport fault invalidates the handle and the session
//! re-attaches to the last endpoint, retrying the interrupted operation
//! once.

use parking_lot::Mutex;

use javelin_jdwp::{JdwpClient, JdwpEvent};

use crate::error::{DebugError, Result};

pub struct Session {
    handle: Mutex<Option<JdwpClient>>,
    last_endpoint: Mutex<Option<(String, u16)>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
            last_endpoint: Mutex::new(None),
        }
    }

    /// Attaches to `host:port`, replacing any previous connection. Returns
    /// the target VM's name and version banner.
    pub fn attach(&self, host: &str, port: u16) -> Result<String> {
        let mut client = JdwpClient::connect(host, port).map_err(DebugError::from)?;
        let version = client.version().map_err(DebugError::from)?;

        tracing::info!(host, port, vm = %version.vm_name, "attached");
        *self.last_endpoint.lock() = Some((host.to_string(), port));
        *self.handle.lock() = Some(client);
        Ok(format!("{} {}", version.vm_name, version.vm_version))
    }

    pub fn is_attached(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Cheap synchronous liveness probe: fetches the VM version banner. Any
    /// transport fault clears the handle.
    pub fn is_alive(&self) -> bool {
        let mut guard = self.handle.lock();
        let Some(client) = guard.as_mut() else {
            return false;
        };
        match client.version() {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(%err, "liveness probe failed, dropping handle");
                *guard = None;
                false
            }
        }
    }

    /// Local-only detach. The protocol's Dispose command is deliberately not
    /// sent: the upstream proxy would treat it as a session kill for every
    /// attached peer. Returns false when there was nothing to detach.
    pub fn detach(&self) -> bool {
        let taken = self.handle.lock().take();
        match taken {
            Some(client) => {
                client.close();
                tracing::info!("detached (local cleanup only)");
                true
            }
            None => false,
        }
    }

    /// Runs `f` with a live protocol handle, re-attaching to the last
    /// endpoint when the handle is dead. A transport fault inside `f`
    /// triggers one transparent re-attach and one retry of `f`.
    pub fn with_client<T>(
        &self,
        mut f: impl FnMut(&mut JdwpClient) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.handle.lock();
        if guard.is_none() {
            self.reconnect_into(&mut guard)?;
        }
        let client = guard.as_mut().ok_or(DebugError::NotAttached)?;

        match f(client) {
            Err(DebugError::TransportFailed(first)) => {
                tracing::warn!(error = %first, "transport fault mid-operation, re-attaching once");
                *guard = None;
                self.reconnect_into(&mut guard)?;
                let client = guard.as_mut().ok_or(DebugError::NotAttached)?;
                f(client)
            }
            other => other,
        }
    }

    fn reconnect_into(&self, guard: &mut Option<JdwpClient>) -> Result<()> {
        let Some((host, port)) = self.last_endpoint.lock().clone() else {
            return Err(DebugError::NotAttached);
        };
        tracing::info!(host = %host, port, "re-attaching to last endpoint");
        let client = JdwpClient::connect(&host, port).map_err(DebugError::from)?;
        *guard = Some(client);
        Ok(())
    }

    /// Snapshot of the protocol event history (oldest first). Empty when
    /// detached; never triggers a reconnect.
    pub fn recent_events(&self) -> Vec<JdwpEvent> {
        self.handle
            .lock()
            .as_ref()
            .map(|client| client.recent_events().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_before_attach_fail_with_not_attached() {
        let session = Session::new();
        let result = session.with_client(|_client| Ok(()));
        assert!(matches!(result, Err(DebugError::NotAttached)));
        assert!(!session.is_attached());
        assert!(!session.is_alive());
    }

    #[test]
    fn detach_before_attach_is_a_no_op() {
        let session = Session::new();
        assert!(!session.detach());
    }
}
