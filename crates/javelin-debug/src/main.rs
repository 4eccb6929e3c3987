use std::io::{BufRead, Write};

use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use javelin_debug::{Config, DebugTools};

/// JDWP debug-inspection and expression-evaluation engine.
///
/// Reads newline-delimited JSON requests `{"tool": "...", "args": {...}}`
/// on stdin and writes one JSON response line per request on stdout. The
/// operation surface itself lives in the library; this binary is a thin
/// harness over it.
#[derive(Debug, Parser)]
#[command(name = "javelin-debug", version, about)]
struct Cli {
    /// Host of the proxy ingress to attach to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Override the JDWP port (otherwise JAVELIN_JDWP_PORT or 61959).
    #[arg(long)]
    jdwp_port: Option<u16>,

    /// Override the proxy base port (otherwise JAVELIN_PROXY_PORT or 55005).
    #[arg(long)]
    proxy_port: Option<u16>,

    /// Attach immediately instead of waiting for an `attach` request.
    #[arg(long)]
    attach: bool,
}

#[derive(Debug, serde::Deserialize)]
struct Request {
    tool: String,
    #[serde(default)]
    args: Value,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(port) = cli.jdwp_port {
        config.jdwp_port = port;
    }
    if let Some(port) = cli.proxy_port {
        config.proxy_port = port;
    }
    tracing::debug!(
        jdwp_port = config.jdwp_port,
        proxy_port = config.proxy_port,
        home = %config.home.display(),
        "configuration loaded"
    );

    let tools = DebugTools::new(config);
    let stdout = std::io::stdout();

    if cli.attach {
        let result = tools.dispatch("attach", &json!({ "host": cli.host }));
        writeln!(stdout.lock(), "{}", json!({ "result": result }))?;
    }

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<Request>(&line) {
            Ok(request) => tools.dispatch(&request.tool, &request.args),
            Err(err) => format!("ERROR: invalid request line: {err}"),
        };

        writeln!(stdout.lock(), "{}", json!({ "result": result }))?;
    }

    Ok(())
}
