//! Correlated request/response over a message channel.
//!
//! [`RpcChannel::call`] assigns each call a fresh id, parks a oneshot sender
//! in the pending table and sends the serialized call. A background task
//! reads replies and completes whichever pending call has the same id, so
//! any number of calls can be in flight at once and replies may arrive in
//! any order. Messages with [`SENTINEL_ID`] are not replies; they go to the
//! notification listener instead.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::messages::{Call, CallMessage, Reply, ReplyMessage, SENTINEL_ID};
use crate::dictionary::ProgressEvent;
use crate::error::{Error, Result};

/// One side of an in-process message channel carrying JSON text
pub struct Endpoint {
    outbox: Outbox,
    inbox: mpsc::UnboundedReceiver<String>,
}

/// Create a connected pair of endpoints.
pub fn duplex() -> (Endpoint, Endpoint) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        Endpoint {
            outbox: Outbox { tx: a_tx },
            inbox: b_rx,
        },
        Endpoint {
            outbox: Outbox { tx: b_tx },
            inbox: a_rx,
        },
    )
}

impl Endpoint {
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Receive the next raw message, or `None` once the peer is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbox.recv().await
    }

    pub fn into_parts(self) -> (Outbox, mpsc::UnboundedReceiver<String>) {
        (self.outbox, self.inbox)
    }
}

/// Sending half of an [`Endpoint`]; cheap to clone
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    pub fn send_raw(&self, text: String) -> Result<()> {
        self.tx.send(text).map_err(|_| Error::ChannelClosed)
    }

    pub fn send<T: Serialize>(&self, message: &T) -> Result<()> {
        self.send_raw(serde_json::to_string(message)?)
    }
}

/// Sentinel-id message delivered outside any call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Progress(ProgressEvent),
    /// Error reported by the worker without a call to attach it to
    Error(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelOptions {
    /// Treat a reply for an unknown call as fatal: close the channel and
    /// reject every pending call. Off by default, when it is only logged.
    pub strict: bool,
}

type Waiter = oneshot::Sender<Result<Reply>>;

#[derive(Default)]
struct PendingTable {
    calls: HashMap<u64, Waiter>,
    closed: bool,
}

#[derive(Clone, Default)]
struct Pending(Arc<Mutex<PendingTable>>);

impl Pending {
    fn lock(&self) -> MutexGuard<'_, PendingTable> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, id: u64, waiter: Waiter) -> Result<()> {
        let mut table = self.lock();
        if table.closed {
            return Err(Error::ChannelClosed);
        }
        table.calls.insert(id, waiter);
        Ok(())
    }

    fn take(&self, id: u64) -> Option<Waiter> {
        self.lock().calls.remove(&id)
    }

    /// Reject every pending call and refuse new ones.
    fn close(&self) {
        let waiters: Vec<Waiter> = {
            let mut table = self.lock();
            table.closed = true;
            table.calls.drain().map(|(_, w)| w).collect()
        };
        for waiter in waiters {
            let _ = waiter.send(Err(Error::ChannelClosed));
        }
    }
}

pub struct RpcChannel {
    outbox: Outbox,
    next_id: AtomicU64,
    pending: Pending,
    reader: JoinHandle<()>,
}

impl RpcChannel {
    /// Start demultiplexing replies arriving on `endpoint`.
    ///
    /// Sentinel-id messages are forwarded to `listener`. Must be called
    /// from within a tokio runtime.
    pub fn open(
        endpoint: Endpoint,
        listener: mpsc::UnboundedSender<Notification>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Capability(
                "Cannot initialize MeCab. No async runtime is available to host the worker."
                    .to_string(),
            )
        })?;

        let (outbox, inbox) = endpoint.into_parts();
        let pending = Pending::default();
        let reader = runtime.spawn(dispatch_replies(
            inbox,
            pending.clone(),
            listener,
            options,
        ));

        Ok(Self {
            outbox,
            next_id: AtomicU64::new(SENTINEL_ID + 1),
            pending,
            reader,
        })
    }

    /// Send `call` and wait for its reply.
    ///
    /// An `error` reply becomes [`Error::Remote`] with the worker's message.
    /// If the channel shuts down first the call fails with
    /// [`Error::ChannelClosed`].
    pub async fn call(&self, call: Call) -> Result<Reply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = call.kind();
        let text = serde_json::to_string(&CallMessage { id, call })?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx)?;
        if let Err(e) = self.outbox.send_raw(text) {
            self.pending.take(id);
            return Err(e);
        }
        log::trace!("sent {} call {}", kind, id);

        rx.await.unwrap_or(Err(Error::ChannelClosed))
    }

    /// Number of calls still waiting for a reply
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().calls.len()
    }
}

impl Drop for RpcChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn dispatch_replies(
    mut inbox: mpsc::UnboundedReceiver<String>,
    pending: Pending,
    listener: mpsc::UnboundedSender<Notification>,
    options: ChannelOptions,
) {
    while let Some(text) = inbox.recv().await {
        let message: ReplyMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(e) => {
                log::error!("undecodable reply ({}): {}", e, text);
                // Fail the call the reply was meant for, if it names one
                if let Some(waiter) = peek_id(&text).and_then(|id| pending.take(id)) {
                    let _ = waiter.send(Err(Error::UnexpectedMessage(text)));
                }
                continue;
            }
        };

        if message.id == SENTINEL_ID {
            notify(&listener, message.reply);
            continue;
        }

        match pending.take(message.id) {
            Some(waiter) => {
                let result = match message.reply {
                    Reply::Error { message } => Err(Error::Remote(message)),
                    reply => Ok(reply),
                };
                // The caller may have stopped waiting; that is fine.
                let _ = waiter.send(result);
            }
            None if options.strict => {
                log::error!(
                    "No pending request for {} message {}, closing channel",
                    message.reply.kind(),
                    message.id
                );
                break;
            }
            None => {
                log::warn!(
                    "No pending request for {} message {}",
                    message.reply.kind(),
                    message.id
                );
            }
        }
    }

    pending.close();
}

fn notify(listener: &mpsc::UnboundedSender<Notification>, reply: Reply) {
    let notification = match reply {
        Reply::Error { message } => {
            log::warn!("worker reported: {}", message);
            Notification::Error(message)
        }
        other => match other.progress() {
            Some(event) => Notification::Progress(event),
            None => {
                log::warn!("ignoring unsolicited {} message", other.kind());
                return;
            }
        },
    };
    let _ = listener.send(notification);
}

fn peek_id(text: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()?
        .get("id")?
        .as_u64()
}
