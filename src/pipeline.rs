// pipeline.rs — 壁纸采集管线
// 目录页 -> 详情页 -> 原图下载 -> 交给 Storage 保存，任何一步失败都直接终止本次采集

use crate::error::{AcquireError, ConfigError, FailureKind, PipelineError};
use crate::http::HttpFetcher;
use crate::random::RandomSource;
use crate::source::{
    CatalogNavigator, CatalogRequest, CatalogSettings, DownloadedImage, ImageDownloader,
    ImagePageResolver,
};
use crate::storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;

/// 单次采集的状态机
///
/// `Idle → CatalogFetching → EntrySelected → DetailFetching → ImageUrlResolved
/// → Downloading → Completed`，任何非终态都可能进入 `Failed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
    Idle,
    CatalogFetching,
    EntrySelected,
    DetailFetching,
    ImageUrlResolved,
    Downloading,
    Completed,
    Failed(FailureKind),
}

/// 状态变化的接收方，命令行用它打印进度
pub trait ProgressSink: Send + Sync {
    fn emit(&self, state: AcquireState);
}

/// 丢弃所有状态的空实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _state: AcquireState) {}
}

/// 保存成功后的结果
#[derive(Debug, Clone)]
pub struct SavedWallpaper {
    pub path: PathBuf,
    pub image_url: String,
    pub byte_len: usize,
}

/// 串联三个阶段的管线
///
/// 管线本身不持有可变状态，多个 `acquire` 可以并发执行，
/// 它们只共享只读的 `CatalogSettings` 与 `Arc` 包装的抓取器和随机源。
pub struct ImageAcquisitionPipeline {
    navigator: CatalogNavigator,
    resolver: ImagePageResolver,
    downloader: ImageDownloader,
}

impl ImageAcquisitionPipeline {
    pub fn new(
        settings: CatalogSettings,
        fetcher: Arc<dyn HttpFetcher>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, ConfigError> {
        let settings = Arc::new(settings);
        Ok(Self {
            navigator: CatalogNavigator::new(settings.clone(), fetcher.clone(), random)?,
            resolver: ImagePageResolver::new(settings, fetcher.clone())?,
            downloader: ImageDownloader::new(fetcher),
        })
    }

    pub async fn acquire(&self, request: &CatalogRequest) -> Result<DownloadedImage, AcquireError> {
        self.acquire_with_progress(request, &NoProgress).await
    }

    pub async fn acquire_with_progress(
        &self,
        request: &CatalogRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadedImage, AcquireError> {
        sink.emit(AcquireState::Idle);
        let result = self.run_stages(request, sink).await;
        if let Err(err) = &result {
            tracing::debug!(error = %err, "acquisition failed");
            sink.emit(AcquireState::Failed(err.kind()));
        }
        result
    }

    /// 采集并保存，只有三个网络阶段全部成功后才会调用 `Storage::save`
    pub async fn acquire_and_save(
        &self,
        request: &CatalogRequest,
        storage: &dyn Storage,
        sink: &dyn ProgressSink,
    ) -> Result<SavedWallpaper, PipelineError> {
        let image = self.acquire_with_progress(request, sink).await?;
        let byte_len = image.bytes.len();
        let path = storage.save(image.bytes, &image.suggested_filename).await?;
        tracing::info!(path = %path.display(), bytes = byte_len, "wallpaper saved");
        Ok(SavedWallpaper {
            path,
            image_url: image.image_url,
            byte_len,
        })
    }

    async fn run_stages(
        &self,
        request: &CatalogRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadedImage, AcquireError> {
        sink.emit(AcquireState::CatalogFetching);
        let entry = self.navigator.pick_random_entry(request).await?;
        sink.emit(AcquireState::EntrySelected);

        sink.emit(AcquireState::DetailFetching);
        let resolved = self.resolver.resolve_image_url(&entry.detail_page_url).await?;
        sink.emit(AcquireState::ImageUrlResolved);

        sink.emit(AcquireState::Downloading);
        let bytes = self.downloader.download(&resolved.image_url).await?;
        sink.emit(AcquireState::Completed);

        Ok(DownloadedImage {
            bytes,
            suggested_filename: resolved.suggested_filename().to_string(),
            image_url: resolved.image_url,
        })
    }
}
