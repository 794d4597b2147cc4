use std::time::Duration;

use clap::Parser;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
    sync::broadcast,
    task::JoinSet,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::office::{Office, OfficeMetadata};

mod office;
mod session;

#[derive(Debug, Parser)]
#[command(name = "office-server", about = "Authoritative server for a shared virtual office")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,
    /// Replication tick interval in milliseconds
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Password required to join; the office is open when omitted
    #[arg(long)]
    password: Option<String>,
    /// Display name of the office
    #[arg(long, default_value = "Public Office")]
    name: String,
    /// Short description shown to joining clients
    #[arg(long, default_value = "An open space for meeting and collaborating")]
    description: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let office = Office::spawn(
        OfficeMetadata::new(&args.name, &args.description, args.password.clone()),
        Duration::from_millis(args.tick_ms),
    );

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to create interrupt signal stream");
    let listener = TcpListener::bind(&args.listen)
        .await
        .expect("could not bind to the listen address");
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    info!(listen = %args.listen, office = %args.name, "listening for office sessions");
    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                info!("server interrupted, gracefully shutting down");
                if let Err(err) = quit_tx.send(()) {
                    error!("failed to send quit signal: {}", err);
                }
                break;
            }
            Ok((socket, _)) = listener.accept() => {
                join_set.spawn(session::handle_session(office.clone(), quit_rx.resubscribe(), socket));
            }
        }
    }

    while join_set.join_next().await.is_some() {}
    info!("server shut down");
}
