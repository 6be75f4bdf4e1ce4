// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{net::IpAddr, sync::Arc};

use anyhow::Error;
use bookchat::Catalog;
use bookchat_server::{BookchatService, ServiceConfig};
use clap::Parser;
use tokio::signal::unix;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "bookchat-service",
    version,
    about = "Run a GraphQL service exposing a fixed book catalog and chats"
)]
struct ServiceOptions {
    /// The port on which to run the server.
    #[arg(long, env = "BOOKCHAT_PORT", default_value_t = bookchat_server::DEFAULT_PORT)]
    port: u16,

    /// The address on which to run the server.
    #[arg(long, env = "BOOKCHAT_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// The number of Tokio worker threads to use.
    #[arg(long, env = "BOOKCHAT_TOKIO_THREADS")]
    tokio_threads: Option<usize>,

    /// The number of Tokio blocking threads to use.
    #[arg(long, env = "BOOKCHAT_TOKIO_BLOCKING_THREADS")]
    tokio_blocking_threads: Option<usize>,

    #[command(subcommand)]
    command: Option<ServiceCommand>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceCommand {
    /// Run the service (the default).
    Run,

    /// Print the GraphQL schema in SDL format.
    Schema,
}

/// Listens for shutdown signals, and notifies the [`CancellationToken`] if one is
/// received.
async fn listen_for_shutdown_signals(shutdown_sender: CancellationToken) {
    let mut sigint =
        unix::signal(unix::SignalKind::interrupt()).expect("Failed to set up SIGINT handler");
    let mut sigterm =
        unix::signal(unix::SignalKind::terminate()).expect("Failed to set up SIGTERM handler");
    let mut sighup =
        unix::signal(unix::SignalKind::hangup()).expect("Failed to set up SIGHUP handler");

    tokio::select! {
        _ = sigint.recv() => (),
        _ = sigterm.recv() => (),
        _ = sighup.recv() => (),
    }

    info!("Shutdown signal received");
    shutdown_sender.cancel();
}

async fn run(options: ServiceOptions) -> Result<(), Error> {
    let config = ServiceConfig {
        host: options.host,
        port: options.port,
    };
    let service = BookchatService::new(config, Catalog::new());

    let cancellation_token = CancellationToken::new();
    let child_token = cancellation_token.child_token();
    tokio::spawn(listen_for_shutdown_signals(cancellation_token));
    service.run(child_token).await
}

fn main() -> Result<(), Error> {
    use is_terminal::IsTerminal as _;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let options = ServiceOptions::parse();

    if options.command == Some(ServiceCommand::Schema) {
        print!("{}", bookchat_server::schema(Arc::new(Catalog::new())).sdl());
        return Ok(());
    }

    let mut runtime = if options.tokio_threads == Some(1) {
        tokio::runtime::Builder::new_current_thread()
    } else {
        let mut builder = tokio::runtime::Builder::new_multi_thread();

        if let Some(threads) = options.tokio_threads {
            builder.worker_threads(threads);
        }

        builder
    };

    if let Some(blocking_threads) = options.tokio_blocking_threads {
        runtime.max_blocking_threads(blocking_threads);
    }

    runtime.enable_all().build()?.block_on(run(options))
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::{ServiceCommand, ServiceOptions};

    #[test]
    fn default_options() {
        let options = ServiceOptions::try_parse_from(["bookchat-service"]).unwrap();
        assert_eq!(options.port, 4000);
        assert!(options.host.is_unspecified());
        assert_eq!(options.command, None);
        assert_eq!(options.tokio_threads, None);
    }

    #[test]
    fn schema_subcommand() {
        let options =
            ServiceOptions::try_parse_from(["bookchat-service", "--port", "8080", "schema"])
                .unwrap();
        assert_eq!(options.port, 8080);
        assert_eq!(options.command, Some(ServiceCommand::Schema));
    }

    #[test]
    fn rejects_invalid_host() {
        assert!(ServiceOptions::try_parse_from(["bookchat-service", "--host", "nowhere"]).is_err());
    }
}
