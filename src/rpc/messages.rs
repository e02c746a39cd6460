//! Wire format shared by the controller and the tagger host.
//!
//! Every message is a JSON object with a numeric `id` and a `type` tag.
//! Calls always carry a fresh id greater than zero; a reply repeats the id of
//! the call it answers. Progress notifications are not replies to anything
//! and carry [`SENTINEL_ID`].

use serde::{Deserialize, Serialize};

use crate::dictionary::{Origin, ProgressEvent};

/// Id carried by unsolicited worker messages
pub const SENTINEL_ID: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMessage {
    pub id: u64,
    #[serde(flatten)]
    pub call: Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Call {
    #[serde(rename_all = "camelCase")]
    Init {
        url: String,
        cache_name: String,
        #[serde(default)]
        no_cache: bool,
    },
    Parse {
        arg: String,
    },
    ParseToNodes {
        arg: String,
    },
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::Init { .. } => "init",
            Call::Parse { .. } => "parse",
            Call::ParseToNodes { .. } => "parseToNodes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub id: u64,
    #[serde(flatten)]
    pub reply: Reply,
}

impl ReplyMessage {
    /// Sentinel-id notification for one acquired dictionary file.
    pub fn progress(event: &ProgressEvent) -> Self {
        let (name, size, total) = (event.name.clone(), event.size, event.total);
        let reply = match event.origin {
            Origin::Network => Reply::Network { name, size, total },
            Origin::Cache => Reply::Cache { name, size, total },
        };
        Self {
            id: SENTINEL_ID,
            reply,
        }
    }
}

/// A node as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireNode {
    pub surface: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Ready,
    Parse {
        result: String,
    },
    ParseToNodes {
        result: Vec<WireNode>,
    },
    Network {
        name: String,
        size: u64,
        total: Option<u64>,
    },
    Cache {
        name: String,
        size: u64,
        total: Option<u64>,
    },
    Error {
        message: String,
    },
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Ready => "ready",
            Reply::Parse { .. } => "parse",
            Reply::ParseToNodes { .. } => "parseToNodes",
            Reply::Network { .. } => "network",
            Reply::Cache { .. } => "cache",
            Reply::Error { .. } => "error",
        }
    }

    /// The progress event carried by a `network` or `cache` message.
    pub fn progress(&self) -> Option<ProgressEvent> {
        let (origin, name, size, total) = match self {
            Reply::Network { name, size, total } => (Origin::Network, name, size, total),
            Reply::Cache { name, size, total } => (Origin::Cache, name, size, total),
            _ => return None,
        };
        Some(ProgressEvent {
            origin,
            name: name.clone(),
            size: *size,
            total: *total,
        })
    }
}
