use anyhow::Result;
use clap::Parser;
use setlist::{
    app::App,
    config::Config,
    source::SheetsClient,
    terminal::{forward_commands, TerminalSink, HELP},
};
use std::sync::Arc;
use tokio::{io::BufReader, sync::mpsc};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) config ───────────────────────────────────────────────────
    let config = Config::parse();
    let credential = config.credential()?;
    let source = Arc::new(SheetsClient::new(&config.spreadsheet_id, credential));

    // ─── 3) first frame ──────────────────────────────────────────────
    let mut app = App::new(source, TerminalSink::new(std::io::stdout()));
    app.start().await;
    println!("{HELP}");

    // ─── 4) stdin → events → app ─────────────────────────────────────
    let (tx, rx) = mpsc::channel(32);
    let input = tokio::spawn(async move {
        if let Err(e) = forward_commands(BufReader::new(tokio::io::stdin()), tx).await {
            error!(error = %e, "reading stdin failed");
        }
    });

    app.run(rx).await;
    if let Err(e) = input.await {
        error!(error = %e, "stdin task failed");
    }

    info!("all done");
    Ok(())
}
