// catalog.rs — 目录页导航
// 随机翻到一页目录，解析出所有壁纸缩略图链接，再随机挑一个

use super::{CatalogPage, CatalogRequest, CatalogSettings, WallpaperEntry, parse_selector};
use crate::error::{AcquireError, ConfigError};
use crate::http::HttpFetcher;
use crate::random::{RandomSource, draw_page};
use scraper::{Html, Selector};
use std::sync::Arc;

/// 目录页中解析出的一个候选条目
///
/// 链接属性可能缺失，是否可用要等被选中之后才判断。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCandidate {
    pub href: Option<String>,
}

pub struct CatalogNavigator {
    settings: Arc<CatalogSettings>,
    fetcher: Arc<dyn HttpFetcher>,
    random: Arc<dyn RandomSource>,
    entry_selector: Selector,
}

impl CatalogNavigator {
    pub fn new(
        settings: Arc<CatalogSettings>,
        fetcher: Arc<dyn HttpFetcher>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, ConfigError> {
        if settings.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages);
        }
        let entry_selector = parse_selector(&settings.entry_marker)?;
        Ok(Self {
            settings,
            fetcher,
            random,
            entry_selector,
        })
    }

    /// 随机抽一页目录并选出其中一个壁纸条目
    pub async fn pick_random_entry(
        &self,
        request: &CatalogRequest,
    ) -> Result<WallpaperEntry, AcquireError> {
        let page = draw_page(self.random.as_ref(), self.settings.max_pages);
        let catalog_page = self.fetch_page(request, page).await?;
        self.pick_from_page(&catalog_page)
    }

    /// 抓取指定页码的目录
    pub async fn fetch_page(
        &self,
        request: &CatalogRequest,
        page: u32,
    ) -> Result<CatalogPage, AcquireError> {
        let url = self.settings.catalog_url(request, page);
        tracing::debug!(%url, page, "fetching catalog page");
        let html = self.fetcher.fetch_text(&url).await?;
        Ok(CatalogPage {
            base_url: self.settings.base_url.clone(),
            url,
            page,
            html,
        })
    }

    /// 只在同一页解析出的条目中挑选
    pub fn pick_from_page(&self, page: &CatalogPage) -> Result<WallpaperEntry, AcquireError> {
        let mut candidates = parse_entries(&page.html, &self.entry_selector);
        if candidates.is_empty() {
            tracing::debug!(url = %page.url, "no entry markers on catalog page");
            return Err(AcquireError::NoEntriesFound {
                url: page.url.clone(),
            });
        }

        let index = self.random.below(candidates.len());
        tracing::debug!(index, total = candidates.len(), "entry selected");
        match candidates.swap_remove(index).href {
            Some(href) if !href.trim().is_empty() => Ok(WallpaperEntry {
                detail_page_url: href.trim().to_string(),
            }),
            _ => Err(AcquireError::MalformedEntry {
                url: page.url.clone(),
            }),
        }
    }
}

/// 按文档顺序收集所有条目标记
///
/// html5ever 对残缺的 HTML 也能容错解析，找不到标记时返回空列表而不是报错。
pub fn parse_entries(html: &str, selector: &Selector) -> Vec<EntryCandidate> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .map(|element| EntryCandidate {
            href: element.value().attr("href").map(str::to_string),
        })
        .collect()
}
