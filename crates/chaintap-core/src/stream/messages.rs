//! Wire messages of the streaming API
//!
//! Frames are JSON objects discriminated on a `type` tag (dfuse eosws v1
//! shapes). Only `action_trace` carries data the viewer consumes; the
//! remaining kinds are decoded so they can be ignored deliberately.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent to the streaming API
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Open an action-trace feed
    #[serde(rename = "get_action_traces")]
    GetActionTraces {
        req_id: String,
        listen: bool,
        data: ActionTracesRequest,
    },

    /// Cancel a feed
    #[serde(rename = "unlisten")]
    Unlisten { data: UnlistenRequest },
}

/// Feed filter of a `get_action_traces` request
#[derive(Debug, Clone, Serialize)]
pub struct ActionTracesRequest {
    pub account: String,
    pub action_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlistenRequest {
    pub req_id: String,
}

/// Frames received from the streaming API
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// One executed action matching a feed
    #[serde(rename = "action_trace")]
    ActionTrace {
        #[serde(default)]
        req_id: Option<String>,
        data: ActionTraceData,
    },

    /// The feed is live
    #[serde(rename = "listening")]
    Listening {
        #[serde(default)]
        req_id: Option<String>,
    },

    /// Head-block progress marker
    #[serde(rename = "progress")]
    Progress {
        #[serde(default)]
        req_id: Option<String>,
    },

    /// Server-side stream error
    #[serde(rename = "error")]
    Error { data: StreamError },

    /// Keepalive
    #[serde(rename = "ping")]
    Ping,

    /// Any frame kind this client does not consume
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionTraceData {
    #[serde(default)]
    pub block_num: Option<u64>,
    pub trace: Trace,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trace {
    pub act: Act,
}

/// One contract action execution
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Act {
    pub account: String,
    pub name: String,
    /// Action input; shape depends on the action. Transfers decode via
    /// [`TransferData`].
    pub data: Value,
}

/// Input data of a token transfer action
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferData {
    pub from: String,
    pub to: String,
    pub quantity: String,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
