use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wallcraft::source::CatalogNavigator;
use wallcraft::{
    AcquireError, AcquireState, CatalogRequest, CatalogSettings, FailureKind, HttpFetcher,
    ImageAcquisitionPipeline, NetworkError, NoProgress, PipelineError, ProgressSink, RandomSource,
    SeededRandom, Storage, StorageError,
};

const BASE: &str = "https://site.example";
const CATALOG_PREFIX: &str = "https://site.example/catalog/anime/1920x1080/page";
const DETAIL_URL: &str = "https://site.example/wallpaper/123";
const IMAGE_URL: &str = "https://cdn.example/img/456.jpg";
const PAYLOAD: &[u8] = b"\xff\xd8\xff\xe0 fake jpeg payload";

#[derive(Clone)]
enum Reply {
    Text(String),
    Bytes(Vec<u8>),
    Status(u16),
}

/// 按 URL 前缀匹配路由，先注册的优先
#[derive(Default)]
struct StubFetcher {
    routes: Vec<(String, Reply)>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn route(mut self, prefix: &str, reply: Reply) -> Self {
        self.routes.push((prefix.to_string(), reply));
        self
    }

    fn reply(&self, url: &str) -> Result<Reply, NetworkError> {
        self.requests.lock().unwrap().push(url.to_string());
        let reply = self
            .routes
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Status(404));
        match reply {
            Reply::Status(status) => Err(NetworkError::Status {
                url: url.to_string(),
                status,
            }),
            other => Ok(other),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetcher for StubFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, NetworkError> {
        match self.reply(url)? {
            Reply::Text(text) => Ok(text),
            Reply::Bytes(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Reply::Status(_) => unreachable!(),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        match self.reply(url)? {
            Reply::Text(text) => Ok(text.into_bytes()),
            Reply::Bytes(bytes) => Ok(bytes),
            Reply::Status(_) => unreachable!(),
        }
    }
}

/// 依次回放预设的抽样结果，用完后一直返回 0
struct ScriptedRandom(Mutex<VecDeque<usize>>);

impl ScriptedRandom {
    fn new(draws: &[usize]) -> Self {
        Self(Mutex::new(draws.iter().copied().collect()))
    }
}

impl RandomSource for ScriptedRandom {
    fn below(&self, upper: usize) -> usize {
        self.0.lock().unwrap().pop_front().unwrap_or(0) % upper
    }
}

/// 只记录调用，不落盘
#[derive(Default)]
struct RecordingStorage {
    calls: AtomicUsize,
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> Result<PathBuf, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.saved.lock().unwrap().push((filename.to_string(), bytes));
        Ok(PathBuf::from("/walls").join(filename))
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<AcquireState>>);

impl ProgressSink for RecordingSink {
    fn emit(&self, state: AcquireState) {
        self.0.lock().unwrap().push(state);
    }
}

fn settings() -> CatalogSettings {
    CatalogSettings {
        base_url: BASE.to_string(),
        ..CatalogSettings::default()
    }
}

fn catalog_html(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<li class="wallpapers__item"><a class="wallpapers__link" href="{href}"><img src="thumb.jpg"></a></li>"#))
        .collect();
    format!(r#"<html><body><ul class="wallpapers__list">{items}</ul></body></html>"#)
}

fn detail_html(src: &str) -> String {
    format!(
        r#"<html><body><div class="wallpaper-table"><img class="wallpaper__image" src="{src}" alt=""></div></body></html>"#
    )
}

fn happy_fetcher() -> StubFetcher {
    StubFetcher::default()
        .route(CATALOG_PREFIX, Reply::Text(catalog_html(&["/wallpaper/123"])))
        .route(DETAIL_URL, Reply::Text(detail_html(IMAGE_URL)))
        .route(IMAGE_URL, Reply::Bytes(PAYLOAD.to_vec()))
}

fn pipeline(fetcher: Arc<StubFetcher>, random: Arc<dyn RandomSource>) -> ImageAcquisitionPipeline {
    ImageAcquisitionPipeline::new(settings(), fetcher, random).unwrap()
}

fn request() -> CatalogRequest {
    CatalogRequest::new("anime", "1920x1080")
}

#[tokio::test]
async fn acquire_returns_payload_and_filename_from_image_url() {
    let fetcher = Arc::new(happy_fetcher());
    let pipeline = pipeline(fetcher.clone(), Arc::new(ScriptedRandom::new(&[41, 0])));

    let image = pipeline.acquire(&request()).await.unwrap();

    assert_eq!(image.bytes, PAYLOAD);
    assert_eq!(image.suggested_filename, "456.jpg");
    assert_eq!(image.image_url, IMAGE_URL);
    // 每个阶段恰好一次请求，目录页号由抽样结果决定
    assert_eq!(
        fetcher.requests(),
        vec![format!("{CATALOG_PREFIX}42"), DETAIL_URL.to_string(), IMAGE_URL.to_string()]
    );
}

#[tokio::test]
async fn single_entry_is_picked_for_every_seed() {
    let fetcher = Arc::new(happy_fetcher());
    for seed in 0..64 {
        let navigator = CatalogNavigator::new(
            Arc::new(settings()),
            fetcher.clone(),
            Arc::new(SeededRandom::new(seed)),
        )
        .unwrap();
        let entry = navigator.pick_random_entry(&request()).await.unwrap();
        assert_eq!(entry.detail_page_url, "/wallpaper/123", "seed {seed}");
    }
}

#[tokio::test]
async fn entry_comes_from_the_fetched_page() {
    let fetcher = Arc::new(StubFetcher::default().route(
        CATALOG_PREFIX,
        Reply::Text(catalog_html(&["/wallpaper/a", "/wallpaper/b", "/wallpaper/c"])),
    ));
    let navigator = CatalogNavigator::new(
        Arc::new(settings()),
        fetcher.clone(),
        Arc::new(ScriptedRandom::new(&[0, 2])),
    )
    .unwrap();

    let entry = navigator.pick_random_entry(&request()).await.unwrap();

    assert_eq!(entry.detail_page_url, "/wallpaper/c");
    assert_eq!(fetcher.requests(), vec![format!("{CATALOG_PREFIX}1")]);
}

#[tokio::test]
async fn page_without_markers_fails_with_no_entries() {
    let fetcher = Arc::new(StubFetcher::default().route(
        CATALOG_PREFIX,
        Reply::Text("<html><body><p>Nothing here</p></body></html>".to_string()),
    ));
    for seed in 0..8 {
        let pipeline = pipeline(fetcher.clone(), Arc::new(SeededRandom::new(seed)));
        let err = pipeline.acquire(&request()).await.unwrap_err();
        assert!(matches!(err, AcquireError::NoEntriesFound { .. }), "{err:?}");
    }
}

#[tokio::test]
async fn entry_without_link_is_malformed() {
    let fetcher = Arc::new(StubFetcher::default().route(
        CATALOG_PREFIX,
        Reply::Text(r#"<a class="wallpapers__link"><img src="t.jpg"></a>"#.to_string()),
    ));
    let pipeline = pipeline(fetcher, Arc::new(ScriptedRandom::new(&[])));

    let err = pipeline.acquire(&request()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::MalformedEntry);
}

#[tokio::test]
async fn detail_page_without_image_marker_fails() {
    let fetcher = Arc::new(
        StubFetcher::default()
            .route(CATALOG_PREFIX, Reply::Text(catalog_html(&["/wallpaper/123"])))
            .route(
                DETAIL_URL,
                Reply::Text(r#"<img class="preview__image" src="https://cdn.example/p.jpg">"#.to_string()),
            ),
    );
    let pipeline = pipeline(fetcher, Arc::new(ScriptedRandom::new(&[])));

    let err = pipeline.acquire(&request()).await.unwrap_err();
    match err {
        AcquireError::ImageUrlNotFound { url } => assert_eq!(url, DETAIL_URL),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_image_body_is_a_download_failure() {
    let fetcher = Arc::new(
        StubFetcher::default()
            .route(CATALOG_PREFIX, Reply::Text(catalog_html(&["/wallpaper/123"])))
            .route(DETAIL_URL, Reply::Text(detail_html(IMAGE_URL)))
            .route(IMAGE_URL, Reply::Bytes(Vec::new())),
    );
    let pipeline = pipeline(fetcher, Arc::new(ScriptedRandom::new(&[])));

    let err = pipeline.acquire(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        AcquireError::DownloadFailed(NetworkError::EmptyBody { .. })
    ));
}

#[tokio::test]
async fn network_failure_at_any_stage_never_reaches_storage() {
    let cases = [
        (
            StubFetcher::default().route(CATALOG_PREFIX, Reply::Status(500)),
            FailureKind::Network,
        ),
        (
            StubFetcher::default()
                .route(CATALOG_PREFIX, Reply::Text(catalog_html(&["/wallpaper/123"])))
                .route(DETAIL_URL, Reply::Status(404)),
            FailureKind::Network,
        ),
        (
            StubFetcher::default()
                .route(CATALOG_PREFIX, Reply::Text(catalog_html(&["/wallpaper/123"])))
                .route(DETAIL_URL, Reply::Text(detail_html(IMAGE_URL)))
                .route(IMAGE_URL, Reply::Status(503)),
            FailureKind::DownloadFailed,
        ),
    ];

    for (fetcher, expected) in cases {
        let storage = RecordingStorage::default();
        let pipeline = pipeline(Arc::new(fetcher), Arc::new(ScriptedRandom::new(&[])));

        let err = pipeline
            .acquire_and_save(&request(), &storage, &NoProgress)
            .await
            .unwrap_err();

        match err {
            PipelineError::Acquire(err) => assert_eq!(err.kind(), expected),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn acquire_and_save_hands_bytes_to_storage() {
    let storage = RecordingStorage::default();
    let pipeline = pipeline(Arc::new(happy_fetcher()), Arc::new(ScriptedRandom::new(&[])));

    let saved = pipeline
        .acquire_and_save(&request(), &storage, &NoProgress)
        .await
        .unwrap();

    assert_eq!(saved.path, PathBuf::from("/walls/456.jpg"));
    assert_eq!(saved.byte_len, PAYLOAD.len());
    let recorded = storage.saved.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "456.jpg");
    assert_eq!(recorded[0].1, PAYLOAD);
}

#[tokio::test]
async fn progress_walks_the_state_machine() {
    let pipeline = pipeline(Arc::new(happy_fetcher()), Arc::new(ScriptedRandom::new(&[])));
    let sink = RecordingSink::default();

    pipeline.acquire_with_progress(&request(), &sink).await.unwrap();

    assert_eq!(
        *sink.0.lock().unwrap(),
        vec![
            AcquireState::Idle,
            AcquireState::CatalogFetching,
            AcquireState::EntrySelected,
            AcquireState::DetailFetching,
            AcquireState::ImageUrlResolved,
            AcquireState::Downloading,
            AcquireState::Completed,
        ]
    );
}

#[tokio::test]
async fn failure_ends_in_failed_state() {
    let fetcher = StubFetcher::default()
        .route(CATALOG_PREFIX, Reply::Text(catalog_html(&["/wallpaper/123"])))
        .route(DETAIL_URL, Reply::Status(502));
    let pipeline = pipeline(Arc::new(fetcher), Arc::new(ScriptedRandom::new(&[])));
    let sink = RecordingSink::default();

    pipeline.acquire_with_progress(&request(), &sink).await.unwrap_err();

    assert_eq!(
        *sink.0.lock().unwrap(),
        vec![
            AcquireState::Idle,
            AcquireState::CatalogFetching,
            AcquireState::EntrySelected,
            AcquireState::DetailFetching,
            AcquireState::Failed(FailureKind::Network),
        ]
    );
}

#[tokio::test]
async fn concurrent_acquisitions_share_one_pipeline() {
    let fetcher = Arc::new(happy_fetcher());
    let pipeline = Arc::new(pipeline(fetcher.clone(), Arc::new(SeededRandom::new(3))));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..6 {
        let pipeline = pipeline.clone();
        tasks.spawn(async move { pipeline.acquire(&request()).await });
    }

    let mut done = 0;
    while let Some(result) = tasks.join_next().await {
        let image = result.unwrap().unwrap();
        assert_eq!(image.suggested_filename, "456.jpg");
        done += 1;
    }
    assert_eq!(done, 6);
    assert_eq!(fetcher.requests().len(), 18);
}

#[test]
fn invalid_markers_are_rejected_at_construction() {
    let settings = CatalogSettings {
        entry_marker: "a[[[".to_string(),
        ..settings()
    };
    let result = ImageAcquisitionPipeline::new(
        settings,
        Arc::new(StubFetcher::default()),
        Arc::new(ScriptedRandom::new(&[])),
    );
    assert!(result.is_err());
}
