// source/mod.rs — 壁纸目录站的数据模型
// 目录翻页 -> 详情页 -> 原图三个阶段分别放在 catalog / detail / download 子模块

pub mod catalog;
pub mod detail;
pub mod download;

pub use catalog::CatalogNavigator;
pub use detail::ImagePageResolver;
pub use download::{ImageDownloader, suggested_filename};

use crate::error::ConfigError;
use scraper::Selector;

pub const DEFAULT_BASE_URL: &str = "https://wallpaperscraft.ru";
pub const DEFAULT_CATALOG_PATH: &str = "/catalog";
/// 目录站已知的最大页数
pub const DEFAULT_MAX_PAGES: u32 = 254;
/// 目录页中每个缩略图链接的 CSS 标记
pub const DEFAULT_ENTRY_MARKER: &str = ".wallpapers__link";
/// 详情页中原图元素的 CSS 标记
pub const DEFAULT_IMAGE_MARKER: &str = ".wallpaper__image";

/// 一次采集请求：分类 + 分辨率
///
/// 两者都是不透明的 token，白名单校验由调用方在构造之前完成。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub category: String,
    pub resolution: String,
}

impl CatalogRequest {
    pub fn new(category: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            resolution: resolution.into(),
        }
    }
}

/// 抓取到的一页目录 HTML
#[derive(Debug, Clone)]
pub struct CatalogPage {
    /// 解析相对链接用的站点根地址
    pub base_url: String,
    pub url: String,
    pub page: u32,
    pub html: String,
}

/// 目录页中的一个候选壁纸
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperEntry {
    pub detail_page_url: String,
}

/// 从详情页解析出的原图地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub image_url: String,
}

impl ResolvedImage {
    pub fn suggested_filename(&self) -> &str {
        suggested_filename(&self.image_url)
    }
}

/// 已完整下载到内存中的图片，交给 Storage 之前一直由管线持有
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
    pub image_url: String,
}

/// 目录站的只读配置，所有并发采集共享
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub catalog_path: String,
    pub max_pages: u32,
    pub entry_marker: String,
    pub image_marker: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            entry_marker: DEFAULT_ENTRY_MARKER.to_string(),
            image_marker: DEFAULT_IMAGE_MARKER.to_string(),
        }
    }
}

impl CatalogSettings {
    /// 某个分类 + 分辨率对应的目录路径，如 `/catalog/anime/1920x1080`
    pub fn catalog_path_for(&self, request: &CatalogRequest) -> String {
        format!(
            "{}/{}/{}",
            self.catalog_path.trim_end_matches('/'),
            request.category,
            request.resolution
        )
    }

    /// 目录第 `page` 页的完整 URL
    pub fn catalog_url(&self, request: &CatalogRequest, page: u32) -> String {
        format!("{}{}/page{}", self.base(), self.catalog_path_for(request), page)
    }

    /// 将站内相对路径拼接为绝对 URL，已是绝对地址时原样返回
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base(), path)
        } else {
            format!("{}/{}", self.base(), path)
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

pub(crate) fn parse_selector(marker: &str) -> Result<Selector, ConfigError> {
    Selector::parse(marker).map_err(|err| ConfigError::InvalidSelector {
        selector: marker.to_string(),
        reason: err.to_string(),
    })
}
