#![allow(dead_code)]

use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mecab_worker::cache::{CacheBucket, CacheStore, MemoryCache};
use mecab_worker::error::{Error, Result};
use mecab_worker::io::{ByteStream, FetchResponse, Fetcher, MemoryStream};
use mecab_worker::tagger::{NodeSource, NodeStatus, RawNode, Tagger, TaggerEngine};

/// Builds a ZIP archive in memory: local headers, a central directory and
/// an end record, the way ordinary zip tools lay it out.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<FixtureEntry>,
}

struct FixtureEntry {
    name: String,
    data: Vec<u8>,
    deflate: bool,
    extra: Vec<u8>,
    descriptor: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, false)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, true)
    }

    fn push(mut self, name: &str, data: &[u8], deflate: bool) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            data: data.to_vec(),
            deflate,
            extra: Vec::new(),
            descriptor: false,
        });
        self
    }

    /// Append an extra field record to the last entry.
    pub fn extra(mut self, id: u16, payload: &[u8]) -> Self {
        let entry = self.entries.last_mut().unwrap();
        entry.extra.write_u16::<LittleEndian>(id).unwrap();
        entry.extra.write_u16::<LittleEndian>(payload.len() as u16).unwrap();
        entry.extra.extend_from_slice(payload);
        self
    }

    /// Set flag bit 3 on the last entry and follow its payload with a
    /// signed data descriptor. The header keeps its sizes.
    pub fn with_descriptor(mut self) -> Self {
        self.entries.last_mut().unwrap().descriptor = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with(|_, _| {})
    }

    /// Build, letting `patch` edit each local header's 30 fixed bytes.
    pub fn build_with(&self, patch: impl Fn(usize, &mut [u8])) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let mut crc = flate2::Crc::new();
            crc.update(&entry.data);
            let payload = if entry.deflate {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&entry.data).unwrap();
                encoder.finish().unwrap()
            } else {
                entry.data.clone()
            };
            let method: u16 = if entry.deflate { 8 } else { 0 };
            let flags: u16 = if entry.descriptor { 0x0008 } else { 0 };
            let offset = out.len() as u32;

            let mut header = Vec::new();
            header.write_u32::<LittleEndian>(0x04034b50).unwrap();
            header.write_u16::<LittleEndian>(20).unwrap();
            header.write_u16::<LittleEndian>(flags).unwrap();
            header.write_u16::<LittleEndian>(method).unwrap();
            header.write_u16::<LittleEndian>(0x6000).unwrap();
            header.write_u16::<LittleEndian>(0x5821).unwrap();
            header.write_u32::<LittleEndian>(crc.sum()).unwrap();
            header.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            header.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
            header.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            header.write_u16::<LittleEndian>(entry.extra.len() as u16).unwrap();
            patch(index, &mut header);

            out.extend_from_slice(&header);
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.extra);
            out.extend_from_slice(&payload);
            if entry.descriptor {
                out.write_u32::<LittleEndian>(0x08074b50).unwrap();
                out.write_u32::<LittleEndian>(crc.sum()).unwrap();
                out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
                out.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
            }

            central.write_u32::<LittleEndian>(0x02014b50).unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.extend_from_slice(&header[4..28]);
            central.write_u16::<LittleEndian>(0).unwrap(); // extra length
            central.write_u16::<LittleEndian>(0).unwrap(); // comment length
            central.write_u16::<LittleEndian>(0).unwrap(); // disk number
            central.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
            central.write_u32::<LittleEndian>(0).unwrap(); // external attrs
            central.write_u32::<LittleEndian>(offset).unwrap();
            central.extend_from_slice(entry.name.as_bytes());
        }

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.write_u32::<LittleEndian>(0x06054b50).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(central.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out
    }
}

/// The nine files of a binary MeCab dictionary, in archive order
pub const DICTIONARY_FILES: [&str; 9] = [
    "char.bin",
    "dicrc",
    "left-id.def",
    "matrix.bin",
    "pos-id.def",
    "rewrite.def",
    "right-id.def",
    "sys.dic",
    "unk.dic",
];

/// A small dictionary archive under `base/`
pub fn dictionary_archive(base: &str) -> Vec<u8> {
    let mut builder = ZipBuilder::new().stored(&format!("{}/", base), b"");
    for (i, file) in DICTIONARY_FILES.iter().enumerate() {
        let name = format!("{}/{}", base, file);
        let body = format!("{} contents {}\n", file, "x".repeat(i * 40));
        builder = if i % 2 == 0 {
            builder.deflated(&name, body.as_bytes())
        } else {
            builder.stored(&name, body.as_bytes())
        };
    }
    builder.build()
}

/// Byte stream that fails with an I/O error after handing out `limit` bytes
pub struct FailingStream {
    inner: MemoryStream,
    remaining: usize,
}

#[async_trait]
impl ByteStream for FailingStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.remaining == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }
        match self.inner.next_chunk().await? {
            Some(mut chunk) => {
                chunk.truncate(self.remaining);
                self.remaining -= chunk.len();
                Ok(Some(chunk))
            }
            None => Ok(None),
        }
    }
}

/// Fetcher serving in-memory archives and counting requests
#[derive(Default)]
pub struct FakeFetcher {
    archives: Mutex<HashMap<String, Vec<u8>>>,
    fail_after: Mutex<HashMap<String, usize>>,
    requests: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, archive: Vec<u8>) -> Self {
        self.archives.lock().unwrap().insert(url.to_string(), archive);
        self
    }

    /// Serve `url` but break the connection after `bytes` bytes.
    pub fn serve_failing(self, url: &str, archive: Vec<u8>, bytes: usize) -> Self {
        self.fail_after.lock().unwrap().insert(url.to_string(), bytes);
        self.serve(url, archive)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let archive = self.archives.lock().unwrap().get(source).cloned();
        let archive = archive.ok_or_else(|| Error::Fetch {
            url: source.to_string(),
            status: "404 Not Found".to_string(),
        })?;
        let length = archive.len() as u64;
        let inner = MemoryStream::new(archive, 37);

        let fail_after = self.fail_after.lock().unwrap().get(source).copied();
        let body: Box<dyn ByteStream> = match fail_after {
            Some(limit) => Box::new(FailingStream {
                inner,
                remaining: limit,
            }),
            None => Box::new(inner),
        };
        Ok(FetchResponse {
            content_length: Some(length),
            body,
        })
    }
}

/// Memory cache that counts writes
#[derive(Default)]
pub struct CountingCache {
    inner: MemoryCache,
    puts: Arc<AtomicUsize>,
    fail_put: Option<usize>,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `nth` put (counting from 1) fail with an I/O error.
    pub fn failing_put(nth: usize) -> Self {
        Self {
            fail_put: Some(nth),
            ..Self::default()
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn has(&self, name: &str) -> Result<bool> {
        self.inner.has(name).await
    }

    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>> {
        Ok(Arc::new(CountingBucket {
            inner: self.inner.open(name).await?,
            puts: self.puts.clone(),
            fail_put: self.fail_put,
        }))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        self.inner.delete(name).await
    }
}

struct CountingBucket {
    inner: Arc<dyn CacheBucket>,
    puts: Arc<AtomicUsize>,
    fail_put: Option<usize>,
}

#[async_trait]
impl CacheBucket for CountingBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let nth = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_put == Some(nth) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "no space left on device",
            )));
        }
        self.inner.put(key, data).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}

/// Engine whose taggers split on whitespace.
///
/// Creation fails when `refuse` is set or unless `-d` names a directory
/// containing `dicrc`. Words starting with `?` come back as unknown nodes.
#[derive(Default)]
pub struct FakeEngine {
    pub refuse: bool,
    pub argv: Mutex<Vec<Vec<String>>>,
}

impl FakeEngine {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

impl TaggerEngine for FakeEngine {
    fn new_tagger(&self, argv: &[String]) -> Option<Box<dyn Tagger>> {
        self.argv.lock().unwrap().push(argv.to_vec());
        if self.refuse {
            return None;
        }
        let dicdir = argv
            .iter()
            .position(|a| a == "-d")
            .and_then(|i| argv.get(i + 1))?;
        if !Path::new(dicdir).join("dicrc").is_file() {
            return None;
        }
        Some(Box::new(FakeTagger))
    }
}

struct FakeTagger;

impl Tagger for FakeTagger {
    fn parse_to_string(&mut self, text: &str) -> Result<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        Ok(format!("{} \n", words.join(" ")))
    }

    fn parse_to_nodes<'a>(&'a mut self, text: &str) -> Result<Box<dyn NodeSource + 'a>> {
        let mut nodes = vec![RawNode {
            surface: String::new(),
            feature: "BOS/EOS,*,*,*".to_string(),
            status: NodeStatus::Bos,
        }];
        for word in text.split_whitespace() {
            nodes.push(match word.strip_prefix('?') {
                Some(rest) => RawNode {
                    surface: rest.to_string(),
                    feature: "名詞,一般,*".to_string(),
                    status: NodeStatus::Unknown,
                },
                None => RawNode {
                    surface: word.to_string(),
                    feature: format!("名詞,\"{},{}\",*", word, word.len()),
                    status: NodeStatus::Normal,
                },
            });
        }
        nodes.push(RawNode {
            surface: String::new(),
            feature: "BOS/EOS,*,*,*".to_string(),
            status: NodeStatus::Eos,
        });
        Ok(Box::new(nodes.into_iter()))
    }
}

/// A fresh scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mecab-worker-test-{}-{}",
        std::process::id(),
        name
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
