use std::path::PathBuf;

pub const DEFAULT_JDWP_PORT: u16 = 61959;
pub const DEFAULT_PROXY_PORT: u16 = 55005;

const JDWP_PORT_ENV: &str = "JAVELIN_JDWP_PORT";
const PROXY_PORT_ENV: &str = "JAVELIN_PROXY_PORT";
const HOME_ENV: &str = "JAVELIN_HOME";

/// Process configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// JDWP ingress port of the multiplexing proxy.
    pub jdwp_port: u16,
    /// Base port of the proxy; its auxiliary HTTP API listens on `+ 1`.
    pub proxy_port: u16,
    /// Directory holding the collaborator proxy artifact.
    pub home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jdwp_port: DEFAULT_JDWP_PORT,
            proxy_port: DEFAULT_PROXY_PORT,
            home: default_home(),
        }
    }
}

fn default_home() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Tests inject a
    /// map here instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(port) = lookup(JDWP_PORT_ENV) {
            match port.trim().parse() {
                Ok(port) => config.jdwp_port = port,
                Err(_) => tracing::warn!(%port, "ignoring unparsable {JDWP_PORT_ENV}"),
            }
        }
        if let Some(port) = lookup(PROXY_PORT_ENV) {
            match port.trim().parse() {
                Ok(port) => config.proxy_port = port,
                Err(_) => tracing::warn!(%port, "ignoring unparsable {PROXY_PORT_ENV}"),
            }
        }
        if let Some(home) = lookup(HOME_ENV) {
            if !home.trim().is_empty() {
                config.home = PathBuf::from(home);
            }
        }
        config
    }

    /// Port of the proxy's auxiliary HTTP API.
    pub fn proxy_http_port(&self) -> u16 {
        self.proxy_port + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.jdwp_port, 61959);
        assert_eq!(config.proxy_port, 55005);
        assert_eq!(config.proxy_http_port(), 55006);
    }

    #[test]
    fn environment_overrides_ports() {
        let config = Config::from_lookup(|name| match name {
            JDWP_PORT_ENV => Some("6000".to_string()),
            PROXY_PORT_ENV => Some("7000".to_string()),
            HOME_ENV => Some("/opt/javelin".to_string()),
            _ => None,
        });
        assert_eq!(config.jdwp_port, 6000);
        assert_eq!(config.proxy_port, 7000);
        assert_eq!(config.proxy_http_port(), 7001);
        assert_eq!(config.home, PathBuf::from("/opt/javelin"));
    }

    #[test]
    fn unparsable_ports_fall_back_to_defaults() {
        let config = Config::from_lookup(|name| match name {
            JDWP_PORT_ENV => Some("not-a-port".to_string()),
            _ => None,
        });
        assert_eq!(config.jdwp_port, DEFAULT_JDWP_PORT);
    }
}
