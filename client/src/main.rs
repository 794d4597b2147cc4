use clap::Parser;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use client::media::{NullCapture, NullPeerConnector};
use client::meeting::PresentationController;
use client::state_store::{Action, StateStore};
use client::{create_termination, Interrupted};

#[derive(Debug, Parser)]
#[command(name = "office-client", about = "Headless client for the shared virtual office")]
struct Args {
    /// Server address to connect to
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
    /// Display name announced after joining
    #[arg(long)]
    name: Option<String>,
    /// Office password, when one is required
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let stream = TcpStream::connect(&args.addr).await?;
    let server_handle = comms::transport::client::split_tcp_stream(stream);

    let (terminator, interrupt_rx) = create_termination();
    let (state_store, mut state_rx) = StateStore::new();
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let (notice_tx, mut notice_rx) = broadcast::channel(64);

    if let Some(name) = args.name {
        action_tx.send(Action::SetName { name })?;
    }

    // a headless client logs what a rendering layer would draw
    tokio::spawn(async move { while state_rx.recv().await.is_some() {} });
    tokio::spawn(async move {
        while let Ok(notice) = notice_rx.recv().await {
            info!(?notice, "domain notice");
        }
    });

    let controller =
        PresentationController::new(Box::new(NullCapture), Box::new(NullPeerConnector::new()));

    let interrupted = state_store
        .main_loop(
            terminator,
            action_rx,
            interrupt_rx,
            server_handle,
            controller,
            notice_tx,
            args.password,
        )
        .await?;

    match interrupted {
        Interrupted::UserInt => info!("exited per user request"),
        Interrupted::OsSigInt => info!("exited because of an os sig int"),
        Interrupted::ServerClosed => info!("exited because the server closed the session"),
    }

    Ok(())
}
