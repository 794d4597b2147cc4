use anyhow::Context;
use comms::{
    command::{self, UserCommand},
    event::{self, Event},
    state::StateSnapshot,
    transport,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;

const PORT: usize = 8092;

/// Minimal demonstration of the office transport: a server task welcoming a
/// single client, and a client task joining and posting one chat message.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (server, client) = tokio::join!(server_example(), client_example());

    server.context("server side failed")?;
    client.context("client side failed")?;

    Ok(())
}

async fn server_example() -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", PORT))
        .await
        .expect("could not bind to the port");

    let (tcp_stream, _addr) = listener.accept().await?;
    let (mut command_stream, mut event_writer) = transport::server::split_tcp_stream(tcp_stream);

    event_writer
        .write(&Event::Welcome(event::WelcomeReplyEvent {
            session_id: "session-id-1".into(),
            office: event::OfficeDetail {
                id: "office-id-1".into(),
                name: "Public Office".into(),
                description: "example office".into(),
            },
            snapshot: StateSnapshot::default(),
        }))
        .await?;

    while let Some(result) = command_stream.next().await {
        match result {
            Ok(command) => println!("server received: {:?}", command),
            Err(e) => println!("server could not read command: {}", e),
        }
    }

    Ok(())
}

async fn client_example() -> anyhow::Result<()> {
    let tcp_stream = TcpStream::connect(format!("localhost:{}", PORT)).await?;
    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);

    match event_stream.next().await {
        Some(Ok(event)) => println!("client received: {:?}", event),
        Some(Err(e)) => return Err(anyhow::anyhow!("could not parse event: {}", e)),
        None => return Err(anyhow::anyhow!("server closed the connection")),
    }

    command_writer
        .write(&UserCommand::Join(command::JoinCommand { password: None }))
        .await?;

    command_writer
        .write(&UserCommand::AddChatMessage(command::AddChatMessageCommand {
            content: "hello from the example client".into(),
        }))
        .await?;

    Ok(())
}
