//! Stream viewer controller
//!
//! Owns the connection state, the bounded transfer log, the error log,
//! and the single feed subscription. The terminal UI calls [`StreamViewer::start`]
//! and [`StreamViewer::stop`] and feeds transport events in; rendering
//! reads the state back out. The subscription handle never leaves this
//! module.

mod log;

pub use log::{ErrorLog, TransferLog, TRANSFER_LOG_CAP};

use tracing::{debug, info, warn};

use crate::config::{Config, MISSING_TOKEN_HELP};
use crate::stream::{
    ActionFilter, InboundMessage, Subscription, TransferData, Transport, TransportEvent,
};

/// Connection state as last reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Controller for one action-trace feed
pub struct StreamViewer<T: Transport> {
    transport: T,
    filter: ActionFilter,
    has_credential: bool,
    state: ConnectionState,
    subscription: Option<Subscription>,
    transfers: TransferLog,
    errors: ErrorLog,
}

impl<T: Transport> StreamViewer<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            transport,
            filter: ActionFilter {
                account: config.account.clone(),
                action: config.action.clone(),
            },
            has_credential: config.api_token.is_some(),
            state: ConnectionState::Disconnected,
            subscription: None,
            transfers: TransferLog::new(),
            errors: ErrorLog::new(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn transfers(&self) -> &TransferLog {
        &self.transfers
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Launch the feed: connect, then subscribe.
    ///
    /// Without a configured token this only populates the error panel.
    /// Calling while a feed is already live tears the old one down first,
    /// so two subscriptions can never be active at once.
    pub async fn start(&mut self) {
        if !self.has_credential {
            self.errors.replace(MISSING_TOKEN_HELP);
            return;
        }

        if self.subscription.is_some() || self.state == ConnectionState::Connected {
            self.teardown().await;
        }

        self.errors.clear();
        self.transfers.clear();

        match self.transport.connect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!(
                    "Connected, subscribing to {}:{}",
                    self.filter.account, self.filter.action
                );
                self.subscribe_feed().await;
            }
            Err(e) => {
                self.errors
                    .replace(["Unable to connect to socket.".to_string(), e.to_string()]);
            }
        }
    }

    /// Stop the feed: cancel the subscription, then disconnect.
    ///
    /// A no-op when no subscription is active.
    pub async fn stop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };

        if let Err(e) = self.transport.unsubscribe(&subscription).await {
            warn!(
                "Failed to cancel subscription {}: {}",
                subscription.req_id(),
                e
            );
        }

        if let Err(e) = self.transport.disconnect().await {
            self.errors.replace([
                "Unable to disconnect socket correctly.".to_string(),
                e.to_string(),
            ]);
        }
    }

    /// Best-effort teardown on application exit
    pub async fn shutdown(&mut self) {
        self.teardown().await;
    }

    /// Dispatch one transport event
    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(message) => self.on_message(message),
            TransportEvent::Closed => self.on_closed(),
            TransportEvent::Error(err) => self.on_error(&err),
            TransportEvent::Reconnected => self.on_reconnected().await,
        }
    }

    /// Inbound frame: action traces append to the transfer log, every
    /// other kind is deliberately ignored
    pub fn on_message(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::ActionTrace { data, .. } => {
                match serde_json::from_value::<TransferData>(data.trace.act.data) {
                    Ok(transfer) => self.transfers.push(format_transfer(&transfer)),
                    Err(e) => debug!("Action data is not a transfer: {}", e),
                }
            }
            InboundMessage::Listening { req_id } => {
                debug!("Stream {} is live", req_id.unwrap_or_default());
            }
            _ => {}
        }
    }

    pub fn on_closed(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Socket-level failure; replaces any previous error lines
    pub fn on_error(&mut self, err: &str) {
        self.errors.replace([
            "An error occurred with the socket.".to_string(),
            err.to_string(),
        ]);
    }

    /// The transport re-established the connection. The server has
    /// forgotten the old registration, so a fresh subscription replaces
    /// the stale handle.
    pub async fn on_reconnected(&mut self) {
        self.state = ConnectionState::Connected;
        self.subscribe_feed().await;
    }

    async fn subscribe_feed(&mut self) {
        match self.transport.subscribe(&self.filter).await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                self.errors.replace([
                    "Unable to subscribe to transfers.".to_string(),
                    e.to_string(),
                ]);
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            let _ = self.transport.unsubscribe(&subscription).await;
        }
        let _ = self.transport.disconnect().await;
        self.state = ConnectionState::Disconnected;
    }
}

/// Render one transfer as a display string
fn format_transfer(transfer: &TransferData) -> String {
    format!(
        "Transfer [{} -> {}, {}] ({})",
        transfer.from, transfer.to, transfer.quantity, transfer.memo
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    enum Call {
        Connect,
        Disconnect,
        Subscribe,
        Unsubscribe(String),
    }

    #[derive(Default)]
    struct FakeTransport {
        calls: Vec<Call>,
        fail_connect: bool,
        fail_disconnect: bool,
        subscriptions: usize,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            self.calls.push(Call::Connect);
            if self.fail_connect {
                return Err(TransportError::NotConnected);
            }
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), TransportError> {
            self.calls.push(Call::Disconnect);
            if self.fail_disconnect {
                return Err(TransportError::TaskStopped);
            }
            Ok(())
        }

        async fn subscribe(
            &mut self,
            _filter: &ActionFilter,
        ) -> Result<Subscription, TransportError> {
            self.calls.push(Call::Subscribe);
            self.subscriptions += 1;
            Ok(Subscription::new(format!("req-{}", self.subscriptions)))
        }

        async fn unsubscribe(&mut self, subscription: &Subscription) -> Result<(), TransportError> {
            self.calls
                .push(Call::Unsubscribe(subscription.req_id().to_string()));
            Ok(())
        }
    }

    fn config_with_token() -> Config {
        Config {
            api_token: Some("test-token".to_string()),
            ..Config::default()
        }
    }

    fn action_trace(from: &str, to: &str, quantity: &str, memo: &str) -> InboundMessage {
        serde_json::from_value(json!({
            "type": "action_trace",
            "req_id": "req-1",
            "data": {"trace": {"act": {
                "account": "eosio.token",
                "name": "transfer",
                "data": {"from": from, "to": to, "quantity": quantity, "memo": memo}
            }}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_without_token_shows_help() {
        let mut viewer = StreamViewer::new(&Config::default(), FakeTransport::default());
        viewer.start().await;

        assert_eq!(viewer.connection_state(), ConnectionState::Disconnected);
        assert!(viewer.transfers().is_empty());
        let lines: Vec<&str> = viewer.errors().lines().iter().map(String::as_str).collect();
        assert_eq!(lines, MISSING_TOKEN_HELP.to_vec());
        // No connection attempt was made
        assert!(viewer.transport.calls.is_empty());
    }

    #[tokio::test]
    async fn test_start_connects_and_subscribes_once() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;

        assert_eq!(viewer.connection_state(), ConnectionState::Connected);
        assert!(viewer.errors().is_empty());
        assert_eq!(viewer.transport.calls, vec![Call::Connect, Call::Subscribe]);
        assert_eq!(viewer.subscription, Some(Subscription::new("req-1")));
    }

    #[tokio::test]
    async fn test_start_failure_stays_disconnected() {
        let transport = FakeTransport {
            fail_connect: true,
            ..FakeTransport::default()
        };
        let mut viewer = StreamViewer::new(&config_with_token(), transport);
        viewer.start().await;

        assert_eq!(viewer.connection_state(), ConnectionState::Disconnected);
        assert_eq!(viewer.subscription, None);
        assert_eq!(viewer.errors().lines()[0], "Unable to connect to socket.");
        assert_eq!(viewer.errors().lines().len(), 2);
        // Subscribe was never attempted
        assert_eq!(viewer.transport.calls, vec![Call::Connect]);
    }

    #[tokio::test]
    async fn test_stop_without_subscription_is_noop() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.stop().await;

        assert!(viewer.transport.calls.is_empty());
        assert!(viewer.errors().is_empty());
    }

    #[tokio::test]
    async fn test_stop_cancels_then_disconnects() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;
        viewer.stop().await;

        assert_eq!(viewer.subscription, None);
        assert_eq!(
            viewer.transport.calls,
            vec![
                Call::Connect,
                Call::Subscribe,
                Call::Unsubscribe("req-1".to_string()),
                Call::Disconnect,
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_reports_disconnect_failure() {
        let transport = FakeTransport {
            fail_disconnect: true,
            ..FakeTransport::default()
        };
        let mut viewer = StreamViewer::new(&config_with_token(), transport);
        viewer.start().await;
        viewer.stop().await;

        assert_eq!(
            viewer.errors().lines()[0],
            "Unable to disconnect socket correctly."
        );
    }

    #[tokio::test]
    async fn test_transfer_formatting() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;
        viewer.on_message(action_trace("alice", "bob", "1.0000 EOS", "hi"));

        let rendered: Vec<&str> = viewer.transfers().iter_newest_first().collect();
        assert_eq!(rendered, vec!["Transfer [alice -> bob, 1.0000 EOS] (hi)"]);
    }

    #[tokio::test]
    async fn test_non_matching_kind_is_ignored() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;

        let listening: InboundMessage =
            serde_json::from_value(json!({"type": "listening", "req_id": "req-1"})).unwrap();
        let unknown: InboundMessage =
            serde_json::from_value(json!({"type": "table_delta", "data": {}})).unwrap();
        viewer.on_message(listening);
        viewer.on_message(unknown);
        viewer.on_message(InboundMessage::Ping);

        assert!(viewer.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_log_capped_via_events() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;

        for i in 0..150 {
            viewer.on_message(action_trace(
                &format!("sender{}", i),
                "bob",
                "1.0000 EOS",
                "",
            ));
        }

        assert_eq!(viewer.transfers().len(), TRANSFER_LOG_CAP);
        // Newest renders first, oldest 50 were dropped
        let rendered: Vec<&str> = viewer.transfers().iter_newest_first().collect();
        assert_eq!(rendered[0], "Transfer [sender149 -> bob, 1.0000 EOS] ()");
        assert_eq!(rendered[99], "Transfer [sender50 -> bob, 1.0000 EOS] ()");
    }

    #[tokio::test]
    async fn test_reconnect_restores_state_and_resubscribes() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;

        viewer.on_closed();
        assert_eq!(viewer.connection_state(), ConnectionState::Disconnected);

        viewer.on_reconnected().await;
        assert_eq!(viewer.connection_state(), ConnectionState::Connected);
        // A fresh subscription replaced the stale one
        assert_eq!(viewer.subscription, Some(Subscription::new("req-2")));
    }

    #[tokio::test]
    async fn test_error_replaces_previous_lines() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.on_error("boom");
        viewer.on_error("bang");

        assert_eq!(
            viewer.errors().lines(),
            &[
                "An error occurred with the socket.".to_string(),
                "bang".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_restart_tears_down_old_feed() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.start().await;
        viewer.start().await;

        assert_eq!(
            viewer.transport.calls,
            vec![
                Call::Connect,
                Call::Subscribe,
                Call::Unsubscribe("req-1".to_string()),
                Call::Disconnect,
                Call::Connect,
                Call::Subscribe,
            ]
        );
        // Exactly one subscription is live
        assert_eq!(viewer.subscription, Some(Subscription::new("req-2")));
    }

    #[tokio::test]
    async fn test_start_clears_previous_state() {
        let mut viewer = StreamViewer::new(&config_with_token(), FakeTransport::default());
        viewer.on_error("stale error");
        viewer.start().await;
        viewer.on_message(action_trace("alice", "bob", "1.0000 EOS", "hi"));

        assert!(viewer.errors().is_empty());
        assert_eq!(viewer.transfers().len(), 1);
    }
}
