//! WebSocket transport for the dfuse streaming API
//!
//! One task owns the socket: outbound frames arrive over a command
//! channel, inbound frames are parsed and forwarded as [`TransportEvent`]s.
//! When the peer drops the connection the task reconnects with capped
//! exponential backoff until the socket is disconnected.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{ActionTracesRequest, InboundMessage, OutboundMessage, UnlistenRequest};
use super::{ActionFilter, Subscription, Transport, TransportEvent};
use crate::error::TransportError;

/// First reconnect delay
const RECONNECT_BASE: Duration = Duration::from_millis(500);
/// Reconnect delay ceiling
const RECONNECT_MAX: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket implementation of [`Transport`]
pub struct EoswsSocket {
    endpoint: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<OutboundMessage>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl EoswsSocket {
    /// Create a socket for `endpoint`, returning the event receiver the
    /// caller drains for messages, closes, errors, and reconnects
    pub fn new(endpoint: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                endpoint: endpoint.into(),
                events,
                outbound: None,
                cancel: None,
                task: None,
            },
            rx,
        )
    }

    fn send_frame(&self, frame: OutboundMessage) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        outbound
            .send(frame)
            .map_err(|_| TransportError::TaskStopped)
    }
}

#[async_trait::async_trait]
impl Transport for EoswsSocket {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.task.is_some() {
            return Ok(());
        }

        let (ws, _) = connect_async(&self.endpoint).await?;
        info!("Connected to streaming endpoint");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_socket(
            ws,
            self.endpoint.clone(),
            outbound_rx,
            self.events.clone(),
            cancel.child_token(),
        ));

        self.outbound = Some(outbound_tx);
        self.cancel = Some(cancel);
        self.task = Some(task);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let task = self.task.take().ok_or(TransportError::NotConnected)?;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.outbound = None;

        // JoinError only happens on panic or abort
        let _ = task.await;
        info!("Disconnected from streaming endpoint");
        Ok(())
    }

    async fn subscribe(&mut self, filter: &ActionFilter) -> Result<Subscription, TransportError> {
        let req_id = Uuid::new_v4().simple().to_string();
        self.send_frame(OutboundMessage::GetActionTraces {
            req_id: req_id.clone(),
            listen: true,
            data: ActionTracesRequest {
                account: filter.account.clone(),
                action_name: filter.action.clone(),
            },
        })?;

        debug!(
            "Subscribed to {}:{} as {}",
            filter.account, filter.action, req_id
        );
        Ok(Subscription::new(req_id))
    }

    async fn unsubscribe(&mut self, subscription: &Subscription) -> Result<(), TransportError> {
        self.send_frame(OutboundMessage::Unlisten {
            data: UnlistenRequest {
                req_id: subscription.req_id().to_string(),
            },
        })
    }
}

/// Why a connection stopped being served
enum ConnectionEnd {
    /// `disconnect()` was called
    Cancelled,
    /// The peer dropped the connection
    Dropped,
}

async fn run_socket(
    mut ws: WsStream,
    endpoint: String,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    events: mpsc::UnboundedSender<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        match serve_connection(&mut ws, &mut outbound, &events, &cancel).await {
            ConnectionEnd::Cancelled => {
                let _ = ws.close(None).await;
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            ConnectionEnd::Dropped => {
                let _ = events.send(TransportEvent::Closed);
            }
        }

        // Reconnect with capped exponential backoff
        let mut delay = RECONNECT_BASE;
        ws = loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            match connect_async(&endpoint).await {
                Ok((ws, _)) => break ws,
                Err(e) => {
                    warn!("Reconnect failed, retrying in {:?}: {}", delay, e);
                    delay = (delay * 2).min(RECONNECT_MAX);
                }
            }
        };

        info!("Reconnected to streaming endpoint");
        let _ = events.send(TransportEvent::Reconnected);
    }
}

async fn serve_connection(
    ws: &mut WsStream,
    outbound: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ConnectionEnd::Cancelled,

            frame = outbound.recv() => {
                // A closed command channel means the socket handle is gone
                let Some(frame) = frame else {
                    return ConnectionEnd::Cancelled;
                };
                match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if let Err(e) = ws.send(Message::text(text)).await {
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            return ConnectionEnd::Dropped;
                        }
                    }
                    Err(e) => warn!("Failed to encode outbound frame: {}", e),
                }
            }

            inbound = ws.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<InboundMessage>(text.as_str()) {
                            Ok(message) => {
                                let _ = events.send(TransportEvent::Message(message));
                            }
                            Err(e) => debug!("Dropping unparseable frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Dropped,
                    Some(Ok(other)) => debug!("Ignoring non-text frame: {:?}", other),
                    Some(Err(e)) => {
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        return ConnectionEnd::Dropped;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn transfer_filter() -> ActionFilter {
        ActionFilter {
            account: "eosio.token".to_string(),
            action: "transfer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let (mut socket, _events) = EoswsSocket::new("ws://127.0.0.1:1");

        assert!(matches!(
            socket.subscribe(&transfer_filter()).await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            socket.disconnect().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_and_receive_action_trace() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            // Expect the subscribe frame, then answer with one action trace
            let frame = ws.next().await.unwrap().unwrap();
            let text = frame.into_text().unwrap();
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(value["type"], "get_action_traces");
            assert_eq!(value["listen"], true);
            assert_eq!(value["data"]["account"], "eosio.token");

            let trace = json!({
                "type": "action_trace",
                "req_id": value["req_id"],
                "data": {"trace": {"act": {
                    "account": "eosio.token",
                    "name": "transfer",
                    "data": {"from": "alice", "to": "bob", "quantity": "1.0000 EOS", "memo": "hi"}
                }}}
            });
            ws.send(Message::text(trace.to_string())).await.unwrap();
        });

        let (mut socket, mut events) = EoswsSocket::new(format!("ws://{}", addr));
        socket.connect().await.unwrap();

        let subscription = socket.subscribe(&transfer_filter()).await.unwrap();
        assert!(!subscription.req_id().is_empty());

        match events.recv().await.unwrap() {
            TransportEvent::Message(InboundMessage::ActionTrace { .. }) => {}
            other => panic!("unexpected event: {:?}", other),
        }

        socket.disconnect().await.unwrap();
        server.await.unwrap();
    }
}
