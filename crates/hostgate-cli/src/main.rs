//! # Hostgate CLI Entry Point
//!
//! Main binary for the hostgate script gateway. Starts a gateway in front of
//! a Boa JavaScript host, or talks to a running one.
//!
//! ## Usage
//!
//! ```bash
//! # Start a gateway on the default port (8080)
//! hostgate serve
//!
//! # Start on another port with a 10 second execution bound
//! hostgate serve --port 9000 --script-timeout-ms 10000
//!
//! # Run a script file (outputs raw JSON)
//! hostgate exec http://127.0.0.1:8080 job.js
//!
//! # Health and stop
//! hostgate health http://127.0.0.1:8080
//! hostgate stop http://127.0.0.1:8080
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use hostgate_client::GatewayClient;
use hostgate_common::ExecutionResult;
use hostgate_server::{BoaHost, ExecutionLimits, Gateway, HostProxy, ServerConfig};

/// Environment variable consulted when `--port` is not given.
const PORT_ENV: &str = "HOSTGATE_PORT";

/// Validates that a URL string starts with http://
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http://",
            description,
            url
        ))
    }
}

/// Picks the port parameter: the flag wins, then the environment.
fn resolve_port_param(flag: Option<String>, env: Option<String>) -> Option<String> {
    flag.or(env)
}

/// Reads a script or prelude file.
fn load_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file {}", path.display()))
}

#[derive(FromArgs)]
/// Hostgate - serialized remote script execution over HTTP
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Exec(ExecArgs),
    Health(HealthArgs),
    Stop(StopArgs),
}

/// Arguments for starting a gateway.
///
/// The gateway binds `127.0.0.1`, `localhost` and the machine's primary IPv4
/// address on one port unless `--bind` is given, then serves until a client
/// requests `/exit` or the process receives Ctrl-C.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start a gateway in front of a JavaScript host
struct ServeArgs {
    /// port to listen on
    ///
    /// Falls back to the HOSTGATE_PORT environment variable, then to 8080.
    #[argh(option, short = 'p')]
    port: Option<String>,

    /// optional bound on how long a request waits for its script, in ms
    ///
    /// Without it a request waits until the script finishes. Must be between
    /// 1 and 3600000 (1 hour).
    #[argh(option, long = "script-timeout-ms")]
    script_timeout_ms: Option<u64>,

    /// maximum request body size in bytes (default 16 MiB)
    #[argh(option, long = "max-body-bytes")]
    max_body_bytes: Option<usize>,

    /// host to bind; repeat for several
    #[argh(option, short = 'b', long = "bind")]
    bind: Vec<String>,

    /// javaScript file evaluated once before the first request
    #[argh(option, long = "prelude")]
    prelude: Option<String>,
}

/// Arguments for running a script file on a gateway.
///
/// Prints the raw JSON envelope to stdout and exits non-zero if the script
/// did not succeed.
#[derive(FromArgs)]
#[argh(subcommand, name = "exec")]
/// run a script file on a gateway
struct ExecArgs {
    /// address of the gateway (e.g., http://127.0.0.1:8080)
    #[argh(positional)]
    server_address: String,

    /// path to the script file
    #[argh(positional)]
    script: String,

    /// correlation token echoed back on success; defaults to the script path
    #[argh(option, short = 't', long = "token")]
    token: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "health")]
/// check whether a gateway is listening
struct HealthArgs {
    /// address of the gateway (e.g., http://127.0.0.1:8080)
    #[argh(positional)]
    server_address: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "stop")]
/// ask a gateway to stop listening
struct StopArgs {
    /// address of the gateway (e.g., http://127.0.0.1:8080)
    #[argh(positional)]
    server_address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Client commands print raw JSON; keep stdout free of logs
    if matches!(cli.command, Commands::Serve(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Exec(args) => run_exec(args).await,
        Commands::Health(args) => {
            let result = client_for(&args.server_address)?.health().await?;
            print_result(&result);
            Ok(())
        }
        Commands::Stop(args) => {
            let result = client_for(&args.server_address)?.exit().await?;
            print_result(&result);
            Ok(())
        }
    }
}

/// Executes the `serve` subcommand.
///
/// The host is built on its own thread, the gateway binds and starts, and
/// this task then waits for the listener to stop.
async fn run_serve(args: ServeArgs) -> Result<()> {
    let port = resolve_port_param(args.port, std::env::var(PORT_ENV).ok());
    let mut config = ServerConfig::from_param(port.as_deref())?;

    if !args.bind.is_empty() {
        config = config.with_bind_hosts(args.bind);
    }

    let mut limits = ExecutionLimits::new();
    if let Some(ms) = args.script_timeout_ms {
        limits = limits.with_execution_timeout(Duration::from_millis(ms));
        tracing::info!("Script wait bounded to {}ms", ms);
    }
    if let Some(bytes) = args.max_body_bytes {
        limits = limits.with_max_body_bytes(bytes);
    }
    limits
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid limits: {}", e))?;
    config = config.with_limits(limits.clone());

    let prelude = match &args.prelude {
        Some(path) => Some(load_script(Path::new(path))?),
        None => None,
    };

    let proxy = HostProxy::spawn(
        move || match prelude {
            Some(source) => BoaHost::with_prelude(&source),
            None => BoaHost::new(),
        },
        limits,
    )?;

    let gateway = Gateway::new(proxy);
    gateway.start(&config)?;

    tokio::select! {
        _ = gateway.wait_async() => {
            tracing::info!("Gateway stopped by /exit request");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down");
        }
    }

    gateway.proxy().shutdown();
    Ok(())
}

/// Executes the `exec` subcommand.
async fn run_exec(args: ExecArgs) -> Result<()> {
    let script = load_script(Path::new(&args.script))?;
    let token = args.token.unwrap_or_else(|| args.script.clone());

    let result = client_for(&args.server_address)?
        .execute(&script, &token)
        .await?;
    print_result(&result);

    if !result.is_success() {
        anyhow::bail!("Script failed with errcode {}", result.status_code());
    }

    Ok(())
}

fn client_for(server_address: &str) -> Result<GatewayClient> {
    validate_http_url(server_address, "server address")?;
    Ok(GatewayClient::new(server_address)?)
}

fn print_result(result: &ExecutionResult) {
    println!("{}", result.to_json());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let args: Cli = Cli::from_args(&["hostgate"], &["serve"]).unwrap();
        match args.command {
            Commands::Serve(ServeArgs { port, script_timeout_ms, max_body_bytes, bind, prelude }) => {
                assert!(port.is_none());
                assert!(script_timeout_ms.is_none());
                assert!(max_body_bytes.is_none());
                assert!(bind.is_empty());
                assert!(prelude.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_options() {
        let args: Cli = Cli::from_args(&["hostgate"], &[
            "serve",
            "--port", "9000",
            "--script-timeout-ms", "2500",
            "--max-body-bytes", "1024",
            "--bind", "127.0.0.1",
            "--bind", "10.0.0.5",
            "--prelude", "init.js",
        ]).unwrap();
        match args.command {
            Commands::Serve(ServeArgs { port, script_timeout_ms, max_body_bytes, bind, prelude }) => {
                assert_eq!(port, Some("9000".to_string()));
                assert_eq!(script_timeout_ms, Some(2500));
                assert_eq!(max_body_bytes, Some(1024));
                assert_eq!(bind, vec!["127.0.0.1".to_string(), "10.0.0.5".to_string()]);
                assert_eq!(prelude, Some("init.js".to_string()));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_exec() {
        let args: Cli = Cli::from_args(&["hostgate"], &[
            "exec",
            "http://127.0.0.1:8080",
            "job.js",
        ]).unwrap();
        match args.command {
            Commands::Exec(ExecArgs { server_address, script, token }) => {
                assert_eq!(server_address, "http://127.0.0.1:8080");
                assert_eq!(script, "job.js");
                assert!(token.is_none());
            }
            _ => panic!("Expected Exec command"),
        }
    }

    #[test]
    fn test_cli_parse_exec_with_token() {
        let args: Cli = Cli::from_args(&["hostgate"], &[
            "exec",
            "--token", "/tmp/a.ess",
            "http://127.0.0.1:8080",
            "job.js",
        ]).unwrap();
        match args.command {
            Commands::Exec(ExecArgs { token, .. }) => {
                assert_eq!(token, Some("/tmp/a.ess".to_string()));
            }
            _ => panic!("Expected Exec command"),
        }
    }

    #[test]
    fn test_cli_parse_health_and_stop() {
        let args: Cli = Cli::from_args(&["hostgate"], &["health", "http://127.0.0.1:8080"]).unwrap();
        assert!(matches!(args.command, Commands::Health(HealthArgs { .. })));

        let args: Cli = Cli::from_args(&["hostgate"], &["stop", "http://127.0.0.1:8080"]).unwrap();
        match args.command {
            Commands::Stop(StopArgs { server_address }) => {
                assert_eq!(server_address, "http://127.0.0.1:8080");
            }
            _ => panic!("Expected Stop command"),
        }
    }

    #[test]
    fn test_cli_parse_exec_missing_file() {
        let result = Cli::from_args(&["hostgate"], &["exec", "http://127.0.0.1:8080"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_unknown_subcommand() {
        assert!(Cli::from_args(&["hostgate"], &["node"]).is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("http://127.0.0.1:8080", "server address").is_ok());
        assert!(validate_http_url("127.0.0.1:8080", "server address").is_err());
        assert!(validate_http_url("https://example.com", "server address").is_err());
    }

    #[test]
    fn test_port_flag_beats_environment() {
        assert_eq!(
            resolve_port_param(Some("9000".into()), Some("9100".into())),
            Some("9000".to_string())
        );
        assert_eq!(resolve_port_param(None, Some("9100".into())), Some("9100".to_string()));
        assert_eq!(resolve_port_param(None, None), None);
    }

    #[test]
    fn test_load_script() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "print('hello');").unwrap();

        assert_eq!(load_script(file.path()).unwrap(), "print('hello');");
    }

    #[test]
    fn test_load_script_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(&dir.path().join("missing.js")).unwrap_err();
        assert!(err.to_string().contains("missing.js"));
    }
}
