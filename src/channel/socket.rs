use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};
use url::Url;

use super::protocol::{decode_frame, encode_frame, ClientEvent, ServerEvent};
use crate::session::SessionEvent;
use crate::utils::ClientError;

/// Sending half of the channel, shared with the backend
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelHandle {
    /// Queue an event for the socket task
    pub fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.outbound
            .send(event)
            .map_err(|_| ClientError::ChannelDisconnected)
    }

    /// A handle whose outbound queue is returned to the caller instead of a socket
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }
}

impl From<ServerEvent> for SessionEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::ConnectionReady { message } => SessionEvent::ConnectionReady { message },
            ServerEvent::LlmResponse { answer } => SessionEvent::LlmResponse { answer },
            ServerEvent::Error { message } => SessionEvent::ServerError { message },
        }
    }
}

/// Open the channel in a background task.
///
/// Socket open/close are reported as `ChannelConnected` / `ChannelDisconnected`;
/// a failed handshake is reported as `ChannelUnreachable`. No reconnect is
/// attempted.
pub fn spawn_channel(
    url: Url,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> (ChannelHandle, JoinHandle<()>) {
    let (outbound, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_channel(url, rx, events));
    (ChannelHandle { outbound }, task)
}

async fn run_channel(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    info!("Connecting channel to {}", url);
    let (ws_stream, _) = match connect_async(url.as_str()).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Channel connect failed: {}", e);
            let _ = events.send(SessionEvent::ChannelUnreachable(e.to_string()));
            return;
        }
    };

    let _ = events.send(SessionEvent::ChannelConnected);
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => {
                let msg = match frame {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("Channel read error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    WsMessage::Text(text) => match decode_frame(&text) {
                        Ok(Some(event)) => {
                            debug!("Channel event: {:?}", event);
                            if events.send(event.into()).is_err() {
                                // Nobody is listening anymore
                                return;
                            }
                        }
                        Ok(None) => debug!("Skipping unknown channel event: {}", text),
                        Err(e) => warn!("Skipping malformed frame: {}", e),
                    },
                    WsMessage::Ping(data) => {
                        let _ = write.send(WsMessage::Pong(data)).await;
                    }
                    WsMessage::Close(_) => {
                        info!("Channel closed by server");
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = outbound.recv() => {
                let Some(event) = outgoing else {
                    // Client is shutting down
                    let _ = write.send(WsMessage::Close(None)).await;
                    return;
                };
                let text = match encode_frame(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Could not encode {:?}: {}", event, e);
                        continue;
                    }
                };
                if let Err(e) = write.send(WsMessage::Text(text)).await {
                    warn!("Channel write error: {}", e);
                    break;
                }
            }
        }
    }

    let _ = events.send(SessionEvent::ChannelDisconnected);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_events_map_to_session_events() {
        let event: SessionEvent = ServerEvent::LlmResponse {
            answer: "X is...".to_string(),
        }
        .into();
        assert!(matches!(event, SessionEvent::LlmResponse { answer } if answer == "X is..."));

        let event: SessionEvent = ServerEvent::Error {
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(event, SessionEvent::ServerError { message } if message == "boom"));
    }

    #[tokio::test]
    async fn test_send_after_task_gone_reports_disconnect() {
        let (handle, rx) = ChannelHandle::detached();
        drop(rx);
        let err = handle
            .send(ClientEvent::ChatMessage {
                message: "hi".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::ChannelDisconnected));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Port 9 (discard) on localhost is not a WebSocket server
        let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
        let (_handle, task) = spawn_channel(url, tx);
        task.await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::ChannelUnreachable(_))
        ));
    }
}
