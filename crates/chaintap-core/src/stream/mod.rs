//! Streaming transport
//!
//! The viewer talks to the streaming API through the [`Transport`] trait;
//! [`EoswsSocket`] is the WebSocket implementation. Asynchronous socket
//! activity (messages, closes, errors, reconnects) is delivered as
//! [`TransportEvent`]s over an unbounded channel, so the viewer can be
//! driven by a fake transport in tests.

mod messages;
mod socket;

pub use messages::{
    Act, ActionTraceData, ActionTracesRequest, InboundMessage, OutboundMessage, StreamError, Trace,
    TransferData, UnlistenRequest,
};
pub use socket::EoswsSocket;

use async_trait::async_trait;

use crate::error::TransportError;

/// Filter for an action-trace feed
#[derive(Debug, Clone)]
pub struct ActionFilter {
    /// Contract account, e.g. `eosio.token`
    pub account: String,
    /// Action name, e.g. `transfer`
    pub action: String,
}

/// Handle to one active feed registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    req_id: String,
}

impl Subscription {
    pub fn new(req_id: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
        }
    }

    /// Request id this subscription listens under
    pub fn req_id(&self) -> &str {
        &self.req_id
    }
}

/// Asynchronous transport activity, delivered over the event channel
#[derive(Debug)]
pub enum TransportEvent {
    /// Parsed inbound frame
    Message(InboundMessage),
    /// Connection dropped
    Closed,
    /// Socket-level failure
    Error(String),
    /// Connection re-established after a drop
    Reconnected,
}

/// Connection and subscription operations of the streaming API
#[async_trait]
pub trait Transport: Send {
    /// Open the connection
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the connection
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Register an action-trace feed
    async fn subscribe(&mut self, filter: &ActionFilter) -> Result<Subscription, TransportError>;

    /// Cancel a feed registration
    async fn unsubscribe(&mut self, subscription: &Subscription) -> Result<(), TransportError>;
}
