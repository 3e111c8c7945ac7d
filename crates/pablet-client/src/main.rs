//! pablet: remote trackpad client, entry point.
//!
//! Reads pointer events and connection commands as JSON lines (stdin by
//! default), classifies them into gestures, and streams the encoded frames to
//! a remote host over a WebSocket.
//!
//! # Usage
//!
//! ```text
//! pablet [OPTIONS]
//!
//! Options:
//!   --host <HOST>                  Connect to this host on startup
//!   --port <PORT>                  Remote port [default from config: 3244]
//!   --scheme <SCHEME>              URI scheme [default from config: ws]
//!   --connect-timeout-ms <MS>      Give up opening after this long
//!   --config <PATH>                Config file (default: platform config dir)
//!   --input <PATH>                 Read the feed from a file or named pipe
//! ```
//!
//! # Precedence
//!
//! CLI arguments beat `PABLET_*` environment variables, which beat the config
//! file, which beats the built-in defaults.
//!
//! | Variable                    | Overrides                       |
//! |-----------------------------|---------------------------------|
//! | `PABLET_HOST`               | `connection.host`               |
//! | `PABLET_PORT`               | `connection.port`               |
//! | `PABLET_SCHEME`             | `connection.scheme`             |
//! | `PABLET_CONNECT_TIMEOUT_MS` | `connection.connect_timeout_ms` |
//! | `PABLET_CONFIG`             | config file path                |
//! | `PABLET_INPUT`              | input feed path                 |
//!
//! `RUST_LOG` overrides `logging.level`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::time::timeout;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pablet_client::application::{run, RemotePointer, TransportEvent};
use pablet_client::domain::ClientConfig;
use pablet_client::infrastructure::{
    load_config, EventSource, JsonLinesSource, WebSocketTransport,
};

/// How long to wait for the link to finish its close handshake on exit.
const CLOSE_LINGER: Duration = Duration::from_millis(500);

/// How long to wait for blocking reader threads (stdin) when shutting down.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote trackpad client.
///
/// Streams touch and mouse gestures to a remote host over a WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "pablet",
    about = "Use a touchscreen as a remote trackpad over WebSocket",
    version
)]
struct Cli {
    /// Host to connect to on startup.
    ///
    /// Without it, the client waits for a `{"type":"connect"}` feed line.
    #[arg(long, env = "PABLET_HOST")]
    host: Option<String>,

    /// Port the remote host listens on.
    #[arg(long, env = "PABLET_PORT")]
    port: Option<u16>,

    /// URI scheme of the endpoint.
    #[arg(long, env = "PABLET_SCHEME")]
    scheme: Option<String>,

    /// Give up on opening a connection after this many milliseconds.
    #[arg(long, env = "PABLET_CONNECT_TIMEOUT_MS")]
    connect_timeout_ms: Option<u64>,

    /// Path to the TOML config file.
    #[arg(long, env = "PABLET_CONFIG")]
    config: Option<PathBuf>,

    /// Read the JSON-lines feed from this file instead of stdin.
    ///
    /// Meant for a named pipe or another live producer.  The client stops at
    /// end of file, and pointer lines that arrive before the connection opens
    /// are dropped, so a regular file is not replayed as a session.
    #[arg(long, env = "PABLET_INPUT")]
    input: Option<PathBuf>,
}

impl Cli {
    /// Layers the CLI (and environment) values over `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration cannot be used: an
    /// unsupported scheme, a zero port, or a zero connect timeout.
    fn into_client_config(self, file: ClientConfig) -> anyhow::Result<ClientConfig> {
        let mut config = file;
        let connection = &mut config.connection;

        if let Some(host) = self.host {
            connection.host = Some(host);
        }
        if let Some(port) = self.port {
            connection.port = port;
        }
        if let Some(scheme) = self.scheme {
            connection.scheme = scheme;
        }
        if let Some(ms) = self.connect_timeout_ms {
            connection.connect_timeout_ms = ms;
        }

        if connection.scheme != "ws" {
            bail!(
                "unsupported scheme '{}': this build connects over plain 'ws' only",
                connection.scheme
            );
        }
        if connection.port == 0 {
            bail!("port must be non-zero");
        }
        if connection.connect_timeout_ms == 0 {
            bail!("connect timeout must be non-zero");
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The client runs on a single-threaded Tokio runtime: one dispatch loop owns
/// the gesture classifier and the transport session, so neither needs a lock.
/// The runtime is built by hand rather than with `#[tokio::main]` so shutdown
/// can be bounded; a pending stdin read sits on a blocking thread that would
/// otherwise hold the process open until the next line arrives.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let input = cli.input.clone();

    let file_config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let config = cli.into_client_config(file_config)?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins when set; otherwise the configured level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build Tokio runtime")?;

    let result = runtime.block_on(run_client(config, input));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

/// Wires the feed, the transport, and the dispatch loop, then tears down.
async fn run_client(config: ClientConfig, input: Option<PathBuf>) -> anyhow::Result<()> {
    let source: Box<dyn EventSource> = match &input {
        Some(path) => Box::new(
            JsonLinesSource::open_file(path)
                .await
                .with_context(|| format!("failed to open input feed {}", path.display()))?,
        ),
        None => Box::new(JsonLinesSource::stdin()),
    };

    let (transport, mut events) = WebSocketTransport::new(&config.connection);
    let mut pointer = RemotePointer::new(transport, config.connection.endpoint_config());
    let feed = pointer
        .attach_listeners(source)
        .context("failed to attach input listeners")?;

    info!(
        "pablet starting: endpoint {}://<host>:{}, status {}",
        config.connection.scheme,
        config.connection.port,
        pointer.session().state()
    );

    if let Some(host) = &config.connection.host {
        pointer
            .connect(host)
            .with_context(|| format!("cannot connect to configured host '{host}'"))?;
    }

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C; shutting down"),
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    let reason = run(&mut pointer, feed, &mut events, shutdown).await;
    info!("dispatch loop stopped: {reason:?}");

    if pointer.teardown() {
        // Give the link task a moment to send its Close frame.
        let _ = timeout(CLOSE_LINGER, async {
            while let Some(event) = events.recv().await {
                if !matches!(event, TransportEvent::Opened { .. }) {
                    break;
                }
            }
        })
        .await;
    }

    info!("pablet stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_without_arguments_leaves_everything_unset() {
        // Arrange / Act
        let cli = Cli::parse_from(["pablet"]);

        // Assert
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.config.is_none());
        assert!(cli.input.is_none());
    }

    #[test]
    fn test_cli_defaults_keep_file_values() {
        // Arrange
        let cli = Cli::parse_from(["pablet"]);
        let mut file = ClientConfig::default();
        file.connection.host = Some("from-file".to_string());
        file.connection.port = 4000;

        // Act
        let config = cli.into_client_config(file).unwrap();

        // Assert
        assert_eq!(config.connection.host.as_deref(), Some("from-file"));
        assert_eq!(config.connection.port, 4000);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = Cli::parse_from([
            "pablet",
            "--host",
            "192.168.100.4",
            "--port",
            "9000",
            "--connect-timeout-ms",
            "250",
        ]);
        let mut file = ClientConfig::default();
        file.connection.host = Some("from-file".to_string());

        let config = cli.into_client_config(file).unwrap();

        assert_eq!(config.connection.host.as_deref(), Some("192.168.100.4"));
        assert_eq!(config.connection.port, 9000);
        assert_eq!(config.connection.connect_timeout_ms, 250);
    }

    #[test]
    fn test_default_config_targets_port_3244() {
        let cli = Cli::parse_from(["pablet"]);
        let config = cli.into_client_config(ClientConfig::default()).unwrap();
        assert_eq!(config.connection.port, 3244);
        assert_eq!(config.connection.scheme, "ws");
    }

    #[test]
    fn test_cli_config_and_input_paths() {
        let cli = Cli::parse_from(["pablet", "--config", "/tmp/p.toml", "--input", "feed.jsonl"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert_eq!(cli.input, Some(PathBuf::from("feed.jsonl")));
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        let cli = Cli::parse_from(["pablet", "--scheme", "http"]);
        assert!(cli.into_client_config(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let cli = Cli::parse_from(["pablet", "--port", "0"]);
        assert!(cli.into_client_config(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_zero_connect_timeout_is_rejected() {
        let cli = Cli::parse_from(["pablet", "--connect-timeout-ms", "0"]);
        assert!(cli.into_client_config(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_port_fails_to_parse() {
        let result = Cli::try_parse_from(["pablet", "--port", "70000"]);
        assert!(result.is_err());
    }
}
