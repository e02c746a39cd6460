//! Worker side of the tagger RPC.
//!
//! The host owns the tagger instance outright. Calls are handled one at a
//! time in arrival order, so a parse request that arrives while the
//! dictionary is still downloading is answered after initialization
//! finishes. Failures are flattened to their message text in an `error`
//! reply.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use super::{Tagger, TaggerEngine, collect_nodes};
use crate::dictionary::DictionaryAcquirer;
use crate::error::{Error, Result};
use crate::rpc::{Call, CallMessage, Endpoint, Outbox, Reply, ReplyMessage, SENTINEL_ID};

const MECABRC: &str = "mecabrc";

#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory the acquired dictionaries are written to, one
    /// subdirectory per cache name
    pub dictionary_dir: PathBuf,
    /// Leading tagger arguments; `-r` and `-d` are appended
    pub tagger_args: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            dictionary_dir: std::env::temp_dir().join("mecab-worker"),
            tagger_args: vec!["mecab".into(), "-C".into(), "-Owakati".into()],
        }
    }
}

pub struct TaggerHost {
    engine: Arc<dyn TaggerEngine>,
    acquirer: DictionaryAcquirer,
    config: HostConfig,
    tagger: Option<Box<dyn Tagger>>,
}

impl TaggerHost {
    pub fn new(
        engine: Arc<dyn TaggerEngine>,
        acquirer: DictionaryAcquirer,
        config: HostConfig,
    ) -> Self {
        Self {
            engine,
            acquirer,
            config,
            tagger: None,
        }
    }

    /// Serve calls arriving on `endpoint` until the controller goes away.
    pub async fn run(mut self, endpoint: Endpoint) {
        let (outbox, mut inbox) = endpoint.into_parts();

        while let Some(text) = inbox.recv().await {
            let message: CallMessage = match serde_json::from_str(&text) {
                Ok(message) => message,
                Err(e) => {
                    log::error!("undecodable call ({}): {}", e, text);
                    continue;
                }
            };

            let kind = message.call.kind();
            let reply = match self.handle(message.call, &outbox).await {
                Ok(reply) => reply,
                Err(e) => {
                    log::debug!("{} call {} failed: {}", kind, message.id, e);
                    Reply::Error {
                        message: e.to_string(),
                    }
                }
            };

            if outbox
                .send(&ReplyMessage {
                    id: message.id,
                    reply,
                })
                .is_err()
            {
                break;
            }
        }

        log::debug!("tagger host stopped");
    }

    async fn handle(&mut self, call: Call, outbox: &Outbox) -> Result<Reply> {
        match call {
            Call::Init {
                url,
                cache_name,
                no_cache,
            } => {
                self.initialize(&url, &cache_name, no_cache, outbox).await?;
                Ok(Reply::Ready)
            }
            Call::Parse { arg } => {
                let tagger = self.tagger.as_mut().ok_or(Error::NotReady)?;
                let result = tagger.parse_to_string(&arg)?.trim().to_string();
                Ok(Reply::Parse { result })
            }
            Call::ParseToNodes { arg } => {
                let tagger = self.tagger.as_mut().ok_or(Error::NotReady)?;
                let mut chain = tagger.parse_to_nodes(&arg)?;
                Ok(Reply::ParseToNodes {
                    result: collect_nodes(chain.as_mut()),
                })
            }
        }
    }

    async fn initialize(
        &mut self,
        url: &str,
        cache_name: &str,
        no_cache: bool,
        outbox: &Outbox,
    ) -> Result<()> {
        if self.tagger.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        crate::cache::check_bucket_name(cache_name)?;

        let files = self
            .acquirer
            .acquire(cache_name, url, no_cache, |event| {
                // Progress is best effort; a vanished controller shows up
                // when the reply is sent.
                let _ = outbox.send(&ReplyMessage::progress(event));
            })
            .await?;

        let root = self.config.dictionary_dir.join(cache_name);
        let dicdir = files.materialize(&root).await?;
        let mecabrc = root.join(MECABRC);
        fs::write(&mecabrc, "# This is a dummy file.\n").await?;

        let mut argv = self.config.tagger_args.clone();
        argv.push("-r".to_string());
        argv.push(mecabrc.to_string_lossy().into_owned());
        argv.push("-d".to_string());
        argv.push(dicdir.to_string_lossy().into_owned());
        log::debug!("creating tagger with {:?}", argv);

        match self.engine.new_tagger(&argv) {
            Some(tagger) => {
                self.tagger = Some(tagger);
                Ok(())
            }
            None => {
                let _ = outbox.send(&ReplyMessage {
                    id: SENTINEL_ID,
                    reply: Reply::Error {
                        message: Error::TaggerInit.to_string(),
                    },
                });
                Err(Error::TaggerInit)
            }
        }
    }
}
