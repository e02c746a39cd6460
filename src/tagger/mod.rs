//! The tagger and everything around it.
//!
//! The morphological analyzer itself is external. [`TaggerEngine`],
//! [`Tagger`] and [`NodeSource`] describe the surface this crate needs from
//! it; a binding to the native library implements them. [`TaggerHost`] runs
//! on the worker side of an RPC channel and owns the tagger instance;
//! [`MecabWorker`] is the controller-side handle.

mod features;
mod host;
mod worker;

pub use features::parse_features;
pub use host::{HostConfig, TaggerHost};
pub use worker::{MecabWorker, WorkerOptions};

use serde::Serialize;

use crate::error::Result;
use crate::rpc::WireNode;

/// Node status as reported by the native tagger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Known word
    Normal,
    /// Word not in the dictionary
    Unknown,
    /// Beginning of sentence
    Bos,
    /// End of sentence
    Eos,
    /// End of n-best output
    Eon,
}

impl NodeStatus {
    pub fn from_raw(stat: u8) -> Option<Self> {
        match stat {
            0 => Some(NodeStatus::Normal),
            1 => Some(NodeStatus::Unknown),
            2 => Some(NodeStatus::Bos),
            3 => Some(NodeStatus::Eos),
            4 => Some(NodeStatus::Eon),
            _ => None,
        }
    }
}

/// One node read out of the native node chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub surface: String,
    /// Comma separated feature line, see [`parse_features`]
    pub feature: String,
    pub status: NodeStatus,
}

/// Walks a tagger's node chain
pub trait NodeSource {
    fn next_node(&mut self) -> Option<RawNode>;
}

impl<I: Iterator<Item = RawNode>> NodeSource for I {
    fn next_node(&mut self) -> Option<RawNode> {
        self.next()
    }
}

/// A live tagger instance
pub trait Tagger: Send {
    /// Analyze `text` into the tagger's configured string output.
    fn parse_to_string(&mut self, text: &str) -> Result<String>;

    /// Analyze `text` into a node chain, BOS node first.
    fn parse_to_nodes<'a>(&'a mut self, text: &str) -> Result<Box<dyn NodeSource + 'a>>;
}

/// Factory for tagger instances
pub trait TaggerEngine: Send + Sync {
    /// Create a tagger from MeCab-style command line arguments.
    ///
    /// `None` means the native constructor returned a null handle.
    fn new_tagger(&self, argv: &[String]) -> Option<Box<dyn Tagger>>;
}

/// Turn a node chain into wire nodes.
///
/// The BOS node is skipped and the walk stops at EOS. Only known words get
/// their feature line split into fields.
pub fn collect_nodes(source: &mut dyn NodeSource) -> Vec<WireNode> {
    let mut nodes = Vec::new();
    while let Some(node) = source.next_node() {
        let features = match node.status {
            NodeStatus::Bos | NodeStatus::Eon => continue,
            NodeStatus::Eos => break,
            NodeStatus::Normal => parse_features(&node.feature),
            NodeStatus::Unknown => Vec::new(),
        };
        nodes.push(WireNode {
            surface: node.surface,
            features,
        });
    }
    nodes
}

/// A node handed to the caller of [`MecabWorker::parse_to_nodes`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedNode<T> {
    pub surface: String,
    pub features: Vec<String>,
    /// `features` mapped through the dictionary's mapper, if it has one and
    /// the fields fit
    pub feature: Option<T>,
}
