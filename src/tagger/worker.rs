//! Controller-side handle to a tagger host.
//!
//! A [`MecabWorker`] starts uninitialized, becomes ready after one
//! successful [`initialize`](MecabWorker::initialize), and stays ready for
//! the rest of its life. A failed initialization is permanent: create a new
//! worker to try again.

use tokio::sync::mpsc;

use super::{ParsedNode, TaggerHost};
use crate::dictionary::{Dictionary, FeatureMapper, ProgressEvent};
use crate::error::{Error, Result};
use crate::rpc::{Call, ChannelOptions, Notification, Reply, RpcChannel, duplex};

type ProgressCallback = Box<dyn FnMut(&ProgressEvent) + Send>;

#[derive(Default)]
pub struct WorkerOptions {
    /// Fetch the archive even if a cached copy exists, and do not cache it
    pub no_cache: bool,
    /// Called once per dictionary file while initializing
    pub on_progress: Option<ProgressCallback>,
}

impl WorkerOptions {
    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ProgressEvent) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
    Failed(String),
}

pub struct MecabWorker<T = ()> {
    channel: RpcChannel,
    notifications: mpsc::UnboundedReceiver<Notification>,
    mapper: Option<FeatureMapper<T>>,
    state: State,
}

impl<T> MecabWorker<T> {
    /// Start `host` on the current tokio runtime and connect to it.
    pub fn spawn(host: TaggerHost) -> Result<Self> {
        Self::spawn_with_options(host, ChannelOptions::default())
    }

    pub fn spawn_with_options(host: TaggerHost, options: ChannelOptions) -> Result<Self> {
        let (controller, worker) = duplex();
        let (listener, notifications) = mpsc::unbounded_channel();

        // Opening the channel checks for a runtime before anything is spawned
        let channel = RpcChannel::open(controller, listener, options)?;
        tokio::spawn(host.run(worker));

        Ok(Self {
            channel,
            notifications,
            mapper: None,
            state: State::Uninitialized,
        })
    }

    /// Spawn a host and initialize it with `dictionary` in one step.
    pub async fn create(
        host: TaggerHost,
        dictionary: &Dictionary<T>,
        options: WorkerOptions,
    ) -> Result<Self> {
        let mut worker = Self::spawn(host)?;
        worker.initialize(dictionary, options).await?;
        Ok(worker)
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    /// Load `dictionary` into the host.
    ///
    /// Progress notifications that arrive before the host answers are
    /// passed to `options.on_progress` in order.
    pub async fn initialize(
        &mut self,
        dictionary: &Dictionary<T>,
        options: WorkerOptions,
    ) -> Result<()> {
        match &self.state {
            State::Uninitialized => {}
            State::Ready => return Err(Error::AlreadyInitialized),
            State::Failed(message) => return Err(Error::Remote(message.clone())),
        }

        let mut on_progress = options.on_progress;
        let call = self.channel.call(Call::Init {
            url: dictionary.url.clone(),
            cache_name: dictionary.cache_name.clone(),
            no_cache: options.no_cache,
        });
        tokio::pin!(call);

        let result = loop {
            tokio::select! {
                biased;
                Some(notification) = self.notifications.recv() => {
                    relay(notification, &mut on_progress);
                }
                result = &mut call => break result,
            }
        };
        // Notifications are queued before the reply that follows them
        while let Ok(notification) = self.notifications.try_recv() {
            relay(notification, &mut on_progress);
        }

        let outcome = match result {
            Ok(Reply::Ready) => Ok(()),
            Ok(other) => Err(Error::UnexpectedMessage(other.kind().to_string())),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                self.mapper = dictionary.mapper.clone();
                self.state = State::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Analyze `text` and return the tagger's string output, trimmed.
    pub async fn parse(&self, text: &str) -> Result<String> {
        self.ensure_ready()?;
        match self
            .channel
            .call(Call::Parse {
                arg: text.to_string(),
            })
            .await?
        {
            Reply::Parse { result } => Ok(result),
            other => Err(Error::UnexpectedMessage(other.kind().to_string())),
        }
    }

    /// Analyze `text` into nodes, decoding each node's features with the
    /// dictionary's mapper.
    pub async fn parse_to_nodes(&self, text: &str) -> Result<Vec<ParsedNode<T>>> {
        self.ensure_ready()?;
        let nodes = match self
            .channel
            .call(Call::ParseToNodes {
                arg: text.to_string(),
            })
            .await?
        {
            Reply::ParseToNodes { result } => result,
            other => return Err(Error::UnexpectedMessage(other.kind().to_string())),
        };

        Ok(nodes
            .into_iter()
            .map(|node| ParsedNode {
                feature: self.mapper.as_ref().and_then(|m| m(&node.features)),
                surface: node.surface,
                features: node.features,
            })
            .collect())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            State::Ready => Ok(()),
            _ => Err(Error::NotReady),
        }
    }
}

fn relay(notification: Notification, on_progress: &mut Option<ProgressCallback>) {
    match notification {
        Notification::Progress(event) => {
            log::debug!("{:?} {} ({} bytes)", event.origin, event.name, event.size);
            if let Some(callback) = on_progress.as_mut() {
                callback(&event);
            }
        }
        Notification::Error(message) => log::warn!("tagger host: {}", message),
    }
}
