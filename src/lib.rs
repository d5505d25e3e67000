// lib.rs — wallcraft 核心库
// 从壁纸目录站随机抓取一张壁纸：目录翻页、详情页解析、原图下载与本地保存

pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod random;
pub mod source;
pub mod storage;

pub use error::{AcquireError, FailureKind, NetworkError, PipelineError, StorageError};
pub use http::{FetchSettings, HttpFetcher, ReqwestFetcher};
pub use pipeline::{AcquireState, ImageAcquisitionPipeline, NoProgress, ProgressSink, SavedWallpaper};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use source::{CatalogRequest, CatalogSettings, DownloadedImage};
pub use storage::{DirStorage, Storage};
