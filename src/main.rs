use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio_stream::wrappers::LinesStream;
use tracing_subscriber::EnvFilter;

use mesh_now::chat::ChatApp;
use mesh_now::cli::Args;
use mesh_now::devtools::Devtools;
use mesh_now::gateway;
use mesh_now::terminal::TerminalSurface;
use mesh_now::transport::{LoggingTransport, ReqwestTransport};
use mesh_now::MeshClient;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until input closes.
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "mesh-now", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&args.log_level);

    if args.mock_gateway {
        let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
        eprintln!(
            "{}",
            format!("  Mock gateway running at http://localhost:{}", args.port).bright_green()
        );
        eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());
        let state = gateway::new_gateway(args.gateway_options());
        tokio::select! {
            result = gateway::serve(listener, state) => result?,
            _ = shutdown_signal() => {}
        }
        return Ok(());
    }

    let config = args.resolve_config()?;
    if !config.color {
        colored::control::set_override(false);
    }

    let devtools = Devtools::new(config.log_capacity);
    let transport = LoggingTransport::new(ReqwestTransport::new(&config), devtools.clone());
    let client = MeshClient::new(transport);
    let surface = TerminalSurface::stdout(config.panel_rows);

    eprintln!(
        "{}",
        format!("  Connecting to {}", config.base_url()).bright_green()
    );
    eprintln!(
        "{}",
        "  Type a message and press Enter. /devtools or Ctrl+` toggles the log panel, /quit exits."
            .bright_blue()
    );

    let mut app = ChatApp::new(client, devtools, surface, &config);
    app.initialize().await;

    let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    app.run(lines, shutdown_signal()).await?;
    Ok(())
}
