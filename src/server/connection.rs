//! Per-connection task
//!
//! Performs the WebSocket handshake, then runs a read loop feeding the hub
//! and a writer task draining the connection's mailbox. Whichever side stops
//! first ends the connection; disconnect handling always runs afterwards.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::error::{Error, Result};
use crate::protocol::{Inbound, Notification};
use crate::registry::{mailbox, ConnectionId, Mailbox, OutboundFrame, RelayHub};
use crate::server::config::ServerConfig;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// One accepted client connection
pub struct Connection {
    id: ConnectionId,
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: ServerConfig,
    hub: Arc<RelayHub>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        hub: Arc<RelayHub>,
    ) -> Self {
        Self {
            id,
            socket,
            peer_addr,
            config,
            hub,
        }
    }

    /// Serve the connection until either side closes it
    pub async fn run(self) -> Result<()> {
        let Connection {
            id,
            socket,
            peer_addr,
            config,
            hub,
        } = self;

        let ws_config = WebSocketConfig {
            max_message_size: Some(config.max_message_size),
            max_frame_size: Some(config.max_message_size),
            ..Default::default()
        };

        let ws = tokio::time::timeout(
            config.handshake_timeout,
            tokio_tungstenite::accept_async_with_config(socket, Some(ws_config)),
        )
        .await
        .map_err(|_| Error::HandshakeTimeout)??;

        tracing::debug!(connection_id = %id, peer = %peer_addr, "WebSocket handshake complete");

        let (sink, mut stream) = ws.split();
        let (handle, mailbox) = mailbox(config.outbound_queue_capacity);
        hub.on_open(id, handle).await;

        let mut writer = tokio::spawn(write_loop(id, sink, mailbox, config.close_timeout));
        let mut writer_done = false;

        let result = tokio::select! {
            result = read_loop(id, &hub, &mut stream, config.close_timeout) => result,
            joined = &mut writer => {
                writer_done = true;
                match joined {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(connection_id = %id, error = %e, "Writer task failed");
                        Ok(())
                    }
                }
            }
        };

        hub.on_close(id).await;

        if writer_done {
            // We sent Close first; give the peer a chance to acknowledge it
            drain(&mut stream, config.close_timeout).await;
        } else {
            // The peer is gone; anything still queued has nowhere to go
            writer.abort();
        }

        result
    }
}

async fn read_loop(
    id: ConnectionId,
    hub: &RelayHub,
    stream: &mut WsStream,
    close_timeout: Duration,
) -> Result<()> {
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => hub.on_message(id, Inbound::from_text(text)).await,
            Message::Binary(data) => hub.on_message(id, Inbound::from_binary(data)).await,
            Message::Close(frame) => {
                tracing::debug!(connection_id = %id, frame = ?frame, "Close received");
                drain(stream, close_timeout).await;
                break;
            }
            // Ping replies are queued by tungstenite itself
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    Ok(())
}

/// Keep reading until the stream ends so tungstenite can flush its Close reply
async fn drain(stream: &mut WsStream, close_timeout: Duration) {
    let _ = tokio::time::timeout(close_timeout, async {
        while let Some(Ok(_)) = stream.next().await {}
    })
    .await;
}

async fn write_loop(
    id: ConnectionId,
    mut sink: WsSink,
    mailbox: Mailbox,
    close_timeout: Duration,
) -> Result<()> {
    let Mailbox {
        mut outbound,
        mut evicted,
    } = mailbox;

    loop {
        tokio::select! {
            biased;

            notice = &mut evicted => {
                // An error means the hub dropped the handle: the connection is closing anyway
                if let Ok(notice) = notice {
                    match evict(&mut sink, notice, close_timeout).await {
                        Ok(()) => tracing::info!(connection_id = %id, "Evicted producer closed"),
                        Err(e) => tracing::warn!(
                            connection_id = %id,
                            error = %e,
                            "Evicted producer did not take the close, dropping it"
                        ),
                    }
                }
                return Ok(());
            }

            frame = outbound.recv() => match frame {
                Some(OutboundFrame::Data(data)) => {
                    sink.send(Message::Binary(data.to_vec())).await?;
                }
                Some(OutboundFrame::Notice(notice)) => {
                    sink.send(Message::Text(notice.to_json()?)).await?;
                }
                None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
            },
        }
    }
}

/// Send `notice` followed by a Close frame, giving up after `close_timeout`
async fn evict<S>(sink: &mut S, notice: Notification, close_timeout: Duration) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let reason = match &notice {
        Notification::Disconnect { reason } => reason.clone(),
        _ => String::new(),
    };
    let text = notice.to_json()?;

    tokio::time::timeout(close_timeout, async {
        sink.send(Message::Text(text)).await?;
        sink.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: reason.into(),
        })))
        .await
    })
    .await
    .map_err(|_| Error::CloseTimeout)??;

    Ok(())
}
