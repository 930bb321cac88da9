//! Gateway API types (mirror what the Mesh-NOW firmware web server exposes).

use serde::{Deserialize, Serialize};

pub const SEND_PATH: &str = "/send";
pub const MESSAGES_PATH: &str = "/messages";
pub const PEERS_PATH: &str = "/peers";
pub const WIFI_INFO_PATH: &str = "/wifi-info";

/// A chat message as delivered by `/messages`.
///
/// `timestamp` is whatever clock the gateway uses (the firmware sends
/// milliseconds since boot); it defaults to 0 when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: u64,
}

impl Message {
    pub fn new(sender: impl Into<String>, content: impl Into<String>, timestamp: u64) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
        }
    }
}

/// Body of `GET /messages`. A missing `messages` field reads as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// `/peers` answers either an id list or a bare count depending on firmware
/// revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerList {
    Count(u64),
    Ids(Vec<String>),
}

impl PeerList {
    pub fn count(&self) -> usize {
        match self {
            PeerList::Count(n) => *n as usize,
            PeerList::Ids(ids) => ids.len(),
        }
    }
}

/// Body of `GET /peers`. A missing or null `peers` field counts as 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeersResponse {
    #[serde(default)]
    pub peers: Option<PeerList>,
}

impl PeersResponse {
    pub fn count(&self) -> usize {
        self.peers.as_ref().map(PeerList::count).unwrap_or(0)
    }
}

/// Body of `GET /wifi-info`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiInfo {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub channel: u8,
}

// Password stays out of logs.
impl std::fmt::Debug for WifiInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiInfo")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}
