// download.rs — 原图下载

use crate::error::{AcquireError, NetworkError};
use crate::http::HttpFetcher;
use std::sync::Arc;

pub struct ImageDownloader {
    fetcher: Arc<dyn HttpFetcher>,
}

impl ImageDownloader {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self { fetcher }
    }

    /// 下载整张图片到内存
    ///
    /// 任何网络错误都包装为 `DownloadFailed`，空响应体同样算失败。
    pub async fn download(&self, image_url: &str) -> Result<Vec<u8>, AcquireError> {
        tracing::debug!(url = %image_url, "downloading image");
        let bytes = self
            .fetcher
            .fetch_bytes(image_url)
            .await
            .map_err(AcquireError::DownloadFailed)?;

        if bytes.is_empty() {
            return Err(AcquireError::DownloadFailed(NetworkError::EmptyBody {
                url: image_url.to_string(),
            }));
        }
        Ok(bytes)
    }
}

/// 取 URL 最后一个 `/` 之后的部分作为文件名，去掉查询串与片段
///
/// 例如 `https://host/path/to/image123.jpg` -> `image123.jpg`
pub fn suggested_filename(image_url: &str) -> &str {
    let without_fragment = image_url.split('#').next().unwrap_or(image_url);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    path.rsplit('/').next().unwrap_or(path)
}
