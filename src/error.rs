// error.rs — 错误类型定义
// 核心库使用 thiserror 定义强类型错误，二进制入口再统一转为 Box<dyn Error>

use std::path::PathBuf;
use thiserror::Error;

/// 单次 HTTP 请求失败
///
/// 非 200 状态码与传输层错误（含超时）都归为此类，不做自动重试。
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },
}

impl NetworkError {
    /// 若失败来自 HTTP 状态码则返回该状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Transport { url, .. } | Self::EmptyBody { url } => url,
        }
    }
}

/// 采集失败的类别，用于状态机的 `Failed` 终态和调用方的展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Network,
    NoEntriesFound,
    MalformedEntry,
    ImageUrlNotFound,
    DownloadFailed,
}

/// 壁纸采集管线的错误
///
/// 每个阶段只产生自己那一类错误，管线原样向上传递。
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("no wallpaper entries found on {url}")]
    NoEntriesFound { url: String },

    #[error("wallpaper entry on {url} has no usable link")]
    MalformedEntry { url: String },

    #[error("image element not found on {url}")]
    ImageUrlNotFound { url: String },

    #[error("image download failed: {0}")]
    DownloadFailed(#[source] NetworkError),
}

impl AcquireError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::NoEntriesFound { .. } => FailureKind::NoEntriesFound,
            Self::MalformedEntry { .. } => FailureKind::MalformedEntry,
            Self::ImageUrlNotFound { .. } => FailureKind::ImageUrlNotFound,
            Self::DownloadFailed(_) => FailureKind::DownloadFailed,
        }
    }
}

/// 本地保存失败
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name: {0:?}")]
    InvalidFilename(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free file name for {0} in the wallpaper directory")]
    NoFreeName(String),
}

/// 下载并保存一张壁纸的完整流程错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 配置加载、校验与保存错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine the home directory ($HOME is not set)")]
    NoHome,

    #[error("unknown category {value:?}, expected one of: {allowed}")]
    UnknownCategory { value: String, allowed: String },

    #[error("unknown resolution {value:?}, expected one of: {allowed}")]
    UnknownResolution { value: String, allowed: String },

    #[error("invalid CSS selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("max_pages must be at least 1")]
    InvalidMaxPages,

    #[error("unknown config key {0:?}")]
    UnknownKey(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 设置系统壁纸失败
#[derive(Debug, Error)]
pub enum WallpaperError {
    #[error("image file does not exist: {0}")]
    NotFound(PathBuf),

    #[error("image path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("failed to set wallpaper: {0}")]
    Backend(String),
}
