//! Websocket change feed
//! Subscribes to the change notification feed and forwards decoded theme events
//! into the scheduler's intake channel. Reconnects after a fixed pause whenever
//! the connection drops, and stops once the intake channel is closed.

use futures::StreamExt;
use log::{info, trace, warn};
use tokio::{
    net::TcpStream,
    select,
    sync::mpsc::{self, error::SendError},
    task::JoinHandle,
    time::sleep,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::{config::FeedConfig, domain::theme_sync::change_event::ChangeEvent};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, PartialEq, Eq)]
enum FeedExit {
    Disconnected,
    IntakeClosed,
}

pub fn spawn_websocket_feed(config: FeedConfig, tx: mpsc::Sender<ChangeEvent>) -> JoinHandle<()> {
    tokio::spawn(async move { run_feed(config, tx).await })
}

async fn run_feed(config: FeedConfig, tx: mpsc::Sender<ChangeEvent>) {
    let url = config.url().as_str();

    loop {
        info!("Connecting to change feed {}", url);
        match connect_async(url).await {
            Ok((stream, _response)) => {
                info!("Change feed connected, topic '{}'", config.topic());
                if pump(stream, config.topic(), &tx).await == FeedExit::IntakeClosed {
                    break;
                }
                warn!("Change feed {} disconnected", url);
            }
            Err(e) => warn!("Change feed connection to {} failed: {}", url, e),
        }

        select! {
            _ = sleep(*config.reconnect_delay()) => {},
            _ = tx.closed() => break,
        }
    }
    info!("Change feed stopped.");
}

/// Pings are answered by tungstenite itself while the stream is read
async fn pump(mut stream: FeedStream, topic: &str, tx: &mpsc::Sender<ChangeEvent>) -> FeedExit {
    loop {
        let message = select! {
            message = stream.next() => message,
            _ = tx.closed() => return FeedExit::IntakeClosed,
        };

        let forwarded = match message {
            Some(Ok(Message::Text(text))) => forward(&text, topic, tx).await,
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                Ok(text) => forward(&text, topic, tx).await,
                Err(_) => {
                    warn!("Dropping binary frame that is not UTF-8");
                    Ok(())
                }
            },
            Some(Ok(Message::Close(_))) | None => return FeedExit::Disconnected,
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) => {
                warn!("Change feed read error: {}", e);
                return FeedExit::Disconnected;
            }
        };

        if forwarded.is_err() {
            return FeedExit::IntakeClosed;
        }
    }
}

async fn forward(
    frame: &str,
    topic: &str,
    tx: &mpsc::Sender<ChangeEvent>,
) -> Result<(), SendError<ChangeEvent>> {
    match ChangeEvent::from_frame(frame, topic) {
        Ok(Some(event)) => tx.send(event).await,
        Ok(None) => {
            trace!("Skipping frame outside topic '{}'", topic);
            Ok(())
        }
        Err(e) => {
            warn!("Dropping undecodable frame: {}", e);
            Ok(())
        }
    }
}
