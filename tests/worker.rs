mod common;

use std::sync::{Arc, Mutex};

use common::{
    CountingCache, FakeEngine, FakeFetcher, ZipBuilder, dictionary_archive, scratch_dir,
};
use mecab_worker::dictionary::{
    Dictionary, DictionaryAcquirer, Origin, ProgressEvent, UnidicFeature26,
};
use mecab_worker::error::{Error, ErrorKind};
use mecab_worker::tagger::{HostConfig, MecabWorker, TaggerHost, WorkerOptions};
use mecab_worker::{CacheStore, MemoryCache};

const URL: &str = "https://dicts.example.com/ipadic-2.7.0_bin.zip";
const NAME: &str = "ipadic-2.7.0_bin";

struct Fixture {
    fetcher: Arc<FakeFetcher>,
    cache: Arc<CountingCache>,
    engine: Arc<FakeEngine>,
    config: HostConfig,
}

impl Fixture {
    fn new(test: &str, fetcher: FakeFetcher, engine: FakeEngine) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache: Arc::new(CountingCache::new()),
            engine: Arc::new(engine),
            config: HostConfig {
                dictionary_dir: scratch_dir(test),
                ..HostConfig::default()
            },
        }
    }

    fn host(&self) -> TaggerHost {
        let acquirer = DictionaryAcquirer::new(self.fetcher.clone(), self.cache.clone());
        TaggerHost::new(self.engine.clone(), acquirer, self.config.clone())
    }
}

fn recording() -> (Arc<Mutex<Vec<ProgressEvent>>>, WorkerOptions) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let options =
        WorkerOptions::default().on_progress(move |e| sink.lock().unwrap().push(e.clone()));
    (events, options)
}

#[tokio::test]
async fn second_worker_initializes_from_cache() {
    let fixture = Fixture::new(
        "cache-replay",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);

    let (events, options) = recording();
    let worker = MecabWorker::create(fixture.host(), &dict, options).await.unwrap();
    assert!(worker.is_ready());
    let network: Vec<_> = events.lock().unwrap().drain(..).collect();
    assert_eq!(network.len(), 9);
    assert!(network.iter().all(|e| e.origin == Origin::Network));

    let (events, options) = recording();
    let _second = MecabWorker::create(fixture.host(), &dict, options).await.unwrap();
    let cached: Vec<_> = events.lock().unwrap().drain(..).collect();
    assert_eq!(cached.len(), 9);
    assert!(cached.iter().all(|e| e.origin == Origin::Cache && e.total.is_none()));

    let names =
        |events: &[ProgressEvent]| events.iter().map(|e| e.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&network), names(&cached));
    assert_eq!(fixture.fetcher.requests(), 1);
    assert_eq!(fixture.cache.puts(), 9);
}

#[tokio::test]
async fn tagger_gets_materialized_dictionary() {
    let fixture = Fixture::new(
        "argv",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);
    MecabWorker::create(fixture.host(), &dict, WorkerOptions::default())
        .await
        .unwrap();

    let argv = fixture.engine.argv.lock().unwrap()[0].clone();
    assert_eq!(&argv[..4], ["mecab", "-C", "-Owakati", "-r"]);
    let root = fixture.config.dictionary_dir.join(NAME);
    assert_eq!(argv[4], root.join("mecabrc").to_string_lossy());
    assert_eq!(argv[5], "-d");
    assert_eq!(argv[6], root.join("ipadic").to_string_lossy());
    assert!(root.join("ipadic").join("sys.dic").is_file());
}

#[tokio::test]
async fn parses_text_and_nodes() {
    let fixture = Fixture::new(
        "parse",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);
    let worker = MecabWorker::create(fixture.host(), &dict, WorkerOptions::default())
        .await
        .unwrap();

    assert_eq!(worker.parse("  東京  に 行く ").await.unwrap(), "東京 に 行く");

    let nodes = worker.parse_to_nodes("東京 ?ほげ").await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].surface, "東京");
    assert_eq!(nodes[0].features, vec!["名詞", "東京,6", "*"]);
    assert_eq!(nodes[0].feature, None);
    assert_eq!(nodes[1].surface, "ほげ");
    assert!(nodes[1].features.is_empty());

    assert!(worker.parse_to_nodes("").await.unwrap().is_empty());
}

#[tokio::test]
async fn overlapping_calls_each_get_their_reply() {
    let fixture = Fixture::new(
        "overlap",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);
    let worker = MecabWorker::create(fixture.host(), &dict, WorkerOptions::default())
        .await
        .unwrap();

    let (a, b, c) = tokio::join!(
        worker.parse("one two"),
        worker.parse_to_nodes("three"),
        worker.parse("four"),
    );
    assert_eq!(a.unwrap(), "one two");
    assert_eq!(b.unwrap()[0].surface, "three");
    assert_eq!(c.unwrap(), "four");
}

#[tokio::test]
async fn mapper_decodes_matching_records_only() {
    let fixture = Fixture::new(
        "mapper",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );

    let unidic = Dictionary::<UnidicFeature26>::new(URL, NAME)
        .with_mapper(UnidicFeature26::from_fields);
    let worker = MecabWorker::create(fixture.host(), &unidic, WorkerOptions::default())
        .await
        .unwrap();
    let nodes = worker.parse_to_nodes("東京").await.unwrap();
    assert_eq!(nodes[0].feature, None);
    assert_eq!(nodes[0].features.len(), 3);

    let pos = Dictionary::<String>::new(URL, NAME)
        .with_mapper(|fields| (fields.len() == 3).then(|| fields[0].clone()));
    let worker = MecabWorker::create(fixture.host(), &pos, WorkerOptions::default())
        .await
        .unwrap();
    let nodes = worker.parse_to_nodes("東京 大阪").await.unwrap();
    assert!(nodes.iter().all(|n| n.feature.as_deref() == Some("名詞")));
}

#[tokio::test]
async fn calls_before_initialize_are_refused() {
    let fixture = Fixture::new("not-ready", FakeFetcher::new(), FakeEngine::default());
    let worker: MecabWorker = MecabWorker::spawn(fixture.host()).unwrap();

    assert!(!worker.is_ready());
    assert!(matches!(worker.parse("x").await, Err(Error::NotReady)));
    assert!(matches!(worker.parse_to_nodes("x").await, Err(Error::NotReady)));
}

#[tokio::test]
async fn initialize_twice_is_refused() {
    let fixture = Fixture::new(
        "twice",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);
    let mut worker = MecabWorker::create(fixture.host(), &dict, WorkerOptions::default())
        .await
        .unwrap();

    let err = worker.initialize(&dict, WorkerOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized));
    assert!(worker.is_ready());
}

#[tokio::test]
async fn failed_initialize_is_permanent() {
    let archive = ZipBuilder::new().stored("d/sys.dic", b"no marker").build();
    let fixture = Fixture::new(
        "no-dicrc",
        FakeFetcher::new().serve(URL, archive),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);
    let mut worker: MecabWorker = MecabWorker::spawn(fixture.host()).unwrap();

    let err = worker.initialize(&dict, WorkerOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Remote(ref m) if m == "dicrc file not found in archive"));
    assert_eq!(err.kind(), ErrorKind::Protocol);

    let again = worker.initialize(&dict, WorkerOptions::default()).await.unwrap_err();
    assert_eq!(again.to_string(), err.to_string());
    assert_eq!(fixture.fetcher.requests(), 1);
    assert!(matches!(worker.parse("x").await, Err(Error::NotReady)));
}

#[tokio::test]
async fn null_tagger_handle_fails_initialization() {
    let fixture = Fixture::new(
        "refuse",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::refusing(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);

    let err = MecabWorker::create(fixture.host(), &dict, WorkerOptions::default())
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "Failed initializing MeCab. Are the dictionaries mounted?"
    );
    assert_eq!(fixture.engine.argv.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn fetch_failure_reaches_the_caller() {
    let fixture = Fixture::new("fetch-404", FakeFetcher::new(), FakeEngine::default());
    let dict: Dictionary = Dictionary::new(URL, NAME);

    let err = MecabWorker::create(fixture.host(), &dict, WorkerOptions::default().no_cache(true))
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        format!("Failed to fetch dictionary: {} (404 Not Found)", URL)
    );
    assert_eq!(fixture.cache.puts(), 0);
}

#[test]
fn spawning_without_runtime_is_a_capability_error() {
    let acquirer =
        DictionaryAcquirer::new(Arc::new(FakeFetcher::new()), Arc::new(MemoryCache::new()));
    let host = TaggerHost::new(Arc::new(FakeEngine::default()), acquirer, HostConfig::default());

    let err = MecabWorker::<()>::spawn(host).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert!(err.to_string().starts_with("Cannot initialize MeCab."));
}

#[tokio::test]
async fn no_cache_leaves_store_empty() {
    let fixture = Fixture::new(
        "no-cache",
        FakeFetcher::new().serve(URL, dictionary_archive("ipadic")),
        FakeEngine::default(),
    );
    let dict: Dictionary = Dictionary::new(URL, NAME);
    let (events, options) = recording();
    MecabWorker::create(fixture.host(), &dict, options.no_cache(true))
        .await
        .unwrap();

    assert_eq!(events.lock().unwrap().len(), 9);
    assert_eq!(fixture.cache.puts(), 0);
    assert!(!fixture.cache.has(NAME).await.unwrap());
}
