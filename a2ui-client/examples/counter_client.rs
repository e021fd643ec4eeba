//! Consume the counter_server example.
//!
//! Creates a session, applies the stream to a local session runtime and
//! prints each counter value as it changes.
//!
//! Run the server first, then: cargo run -p a2ui-client --example counter_client

use futures::StreamExt;

use a2ui_client::{HttpClientConfig, HttpStreamClient};
use a2ui_session::{Session, SessionHandle};
use a2ui_transport::{StreamItem, UiStream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpStreamClient::new(HttpClientConfig::new("http://127.0.0.1:8080"))?;
    let session_id = client.create_session().await?;
    println!("session {session_id}");

    let session = SessionHandle::spawn(Session::new());
    let stream_handle = client.stream(&session_id);
    let mut stream = stream_handle.open().await?;

    while let Some(item) = stream.next().await {
        match item {
            Ok(StreamItem::Envelope(envelope)) => {
                session.apply_envelope(envelope).await?;
                if let Some(surface) = session.surface("main").await? {
                    if let Some(counter) = surface.read("/counter") {
                        println!("counter = {counter}");
                    }
                }
            }
            Ok(StreamItem::Done) => {
                println!("stream done");
                break;
            }
            Err(error) => eprintln!("stream error: {error}"),
        }
    }
    Ok(())
}
