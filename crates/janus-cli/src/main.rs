//! Janus gateway CLI
//!
//! Drives a gateway session over the HTTP long-poll API:
//! - `create`: open a session and print its id
//! - `attach`: attach a plugin and print its handle
//! - `message`: send a body to a plugin and print the resulting event
//! - `listen`: long-poll a fresh session and print events as JSON lines

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use janus_rpc::{Event, PollExit, PollLoop, ReqwestTransport, Session};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

/// Janus gateway command line client
#[derive(Parser)]
#[command(name = "janus")]
#[command(about = "Talk to a Janus WebRTC gateway over HTTP long-poll")]
#[command(version)]
#[command(after_help = "\
Examples:
  janus create                              Open a session
  janus attach echotest                     Attach janus.plugin.echotest
  janus message echotest '{\"audio\":true}'   Send a body to a plugin
  janus listen --count 10                   Print the next 10 events
  janus --url http://gw:8088/janus create   Use a different gateway
")]
struct Cli {
    /// Gateway base URL (overrides the config file)
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    /// Config file (defaults to `~/.config/janus/config.json`)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session and print its id
    Create,

    /// Attach a plugin to a new session
    Attach {
        /// Plugin name (`echotest`) or namespace (`janus.plugin.echotest`)
        plugin: String,
    },

    /// Send a message to a plugin and print the resulting event
    Message {
        /// Plugin name (`echotest`) or namespace (`janus.plugin.echotest`)
        plugin: String,

        /// Message body as JSON
        #[arg(default_value = "{}")]
        body: String,
    },

    /// Long-poll a new session and print events as JSON lines
    Listen {
        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
}

/// Set up logging to stderr, optionally mirrored to a file.
/// Debug builds default to debug level, release builds to info.
fn setup_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("janus={default_level}")));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let file_layer = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;

            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the whole process
            std::mem::forget(guard);

            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.server_url.clone_from(url);
    }

    Ok(config)
}

async fn connect(config: &Config) -> Result<Session<ReqwestTransport>> {
    let transport = ReqwestTransport::with_timeout(config.request_timeout())
        .context("Failed to build HTTP client")?;

    let mut session = Session::new(transport);
    session
        .connect(&config.server_url)
        .await
        .with_context(|| format!("Failed to create session at {}", config.server_url))?;

    Ok(session)
}

async fn attach(config: &Config, plugin: &str) -> Result<(Session<ReqwestTransport>, String)> {
    let mut session = connect(config).await?;

    session
        .activate(plugin)
        .await
        .with_context(|| format!("Failed to attach plugin '{plugin}'"))?;

    let (_, short_name) = janus_rpc::qualify_namespace(plugin);
    Ok((session, short_name))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_file.as_ref())?;
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Create => run_create(&config).await,
        Commands::Attach { plugin } => run_attach(&config, &plugin).await,
        Commands::Message { plugin, body } => run_message(&config, &plugin, &body).await,
        Commands::Listen { count } => run_listen(&config, count).await,
    }
}

async fn run_create(config: &Config) -> Result<()> {
    let session = connect(config).await?;

    let Some(id) = session.id() else {
        bail!("Gateway did not assign a session id");
    };
    println!("{id}");
    Ok(())
}

async fn run_attach(config: &Config, plugin: &str) -> Result<()> {
    let (session, short_name) = attach(config, plugin).await?;
    let handle = session.plugin(&short_name)?;

    println!(
        "Session {}: plugin '{}' attached as handle {}",
        session.id().map(ToString::to_string).unwrap_or_default(),
        handle.name(),
        handle.handle()
    );
    Ok(())
}

async fn run_message(config: &Config, plugin: &str, body: &str) -> Result<()> {
    let body: serde_json::Value =
        serde_json::from_str(body).context("Invalid JSON for message body")?;

    let (session, short_name) = attach(config, plugin).await?;

    let reply = session
        .plugin(&short_name)?
        .send(body)
        .await
        .context("Message command failed")?;

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

async fn run_listen(config: &Config, count: Option<usize>) -> Result<()> {
    let session = Arc::new(connect(config).await?);

    let poll = PollLoop::new()
        .interval(config.poll_interval())
        .max_consecutive_errors(config.max_consecutive_errors);

    let (tx, mut rx) = mpsc::channel(64);
    let poller = {
        let session = session.clone();
        tokio::spawn(async move { poll.run(&*session, tx).await })
    };

    let mut seen = 0usize;
    let poller_done = loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(body) = event else { break true };
                println!("{body}");

                if Event::from_value(body).is_ok_and(|e| e.is_keepalive())
                    && let Err(e) = session.keepalive().await
                {
                    warn!(error = %e, "keepalive failed");
                }

                seen += 1;
                if count.is_some_and(|max| seen >= max) {
                    break false;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break false;
            }
        }
    };

    drop(rx);
    if !poller_done {
        // The loop may be parked inside a long-poll request
        poller.abort();
        return Ok(());
    }

    match poller.await.context("Poll task panicked")? {
        PollExit::ReceiverClosed => Ok(()),
        PollExit::Failed(e) => Err(e).context("Long-poll failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_message_body_defaults_to_empty_object() {
        let cli = Cli::parse_from(["janus", "message", "echotest"]);
        match cli.command {
            Commands::Message { plugin, body } => {
                assert_eq!(plugin, "echotest");
                assert_eq!(body, "{}");
            }
            _ => panic!("Expected message command"),
        }
    }

    #[test]
    fn test_url_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"serverUrl": "http://from-file/janus"}"#).unwrap();

        let config_arg = path.to_str().unwrap();
        let cli = Cli::parse_from(["janus", "--config", config_arg, "create"]);
        assert_eq!(load_config(&cli).unwrap().server_url, "http://from-file/janus");

        let cli = Cli::parse_from([
            "janus",
            "create",
            "--config",
            config_arg,
            "--url",
            "http://flag/janus/",
        ]);
        assert_eq!(load_config(&cli).unwrap().server_url, "http://flag/janus/");
    }
}
