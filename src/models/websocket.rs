use serde::{Deserialize, Serialize};

/// One inbound push-channel frame: a single SMS vote landed. Parsed strictly;
/// anything that does not fit this shape is a malformed message and gets
/// dropped at the channel boundary.
#[derive(Deserialize, Debug, Clone)]
pub struct SocketMessage {
    pub voting_id: i64,
    pub voting_item_id: i64,
    pub client_id: i64,
    pub message: String,
    pub date: String,
}

/// What the reducer actually consumes: target item plus an increment.
/// The wire only ever means +1, but the reducer supports a general amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEvent {
    pub voting_item_id: i64,
    pub increment: u64,
}

impl From<SocketMessage> for TallyEvent {
    fn from(msg: SocketMessage) -> Self {
        Self {
            voting_item_id: msg.voting_item_id,
            increment: 1,
        }
    }
}

/// Liveness probe sent on the heartbeat interval.
#[derive(Serialize)]
pub struct PingMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
}

impl PingMessage {
    pub fn new() -> Self {
        Self { msg_type: "ping" }
    }
}
