// detail.rs — 壁纸详情页解析

use super::{CatalogSettings, ResolvedImage, parse_selector, suggested_filename};
use crate::error::{AcquireError, ConfigError};
use crate::http::HttpFetcher;
use scraper::{Html, Selector};
use std::sync::Arc;

/// 从详情页提取原图直链
pub struct ImagePageResolver {
    settings: Arc<CatalogSettings>,
    fetcher: Arc<dyn HttpFetcher>,
    image_selector: Selector,
}

impl ImagePageResolver {
    pub fn new(
        settings: Arc<CatalogSettings>,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Result<Self, ConfigError> {
        let image_selector = parse_selector(&settings.image_marker)?;
        Ok(Self {
            settings,
            fetcher,
            image_selector,
        })
    }

    pub async fn resolve_image_url(
        &self,
        detail_page_url: &str,
    ) -> Result<ResolvedImage, AcquireError> {
        let url = self.settings.absolute_url(detail_page_url);
        tracing::debug!(%url, "fetching detail page");
        let html = self.fetcher.fetch_text(&url).await?;

        // 指向目录而非文件的地址同样算作没有找到图片
        let image_url = extract_image_url(&html, &self.image_selector)
            .filter(|src| !suggested_filename(src).is_empty())
            .ok_or(AcquireError::ImageUrlNotFound { url })?;

        tracing::debug!(%image_url, "image url resolved");
        Ok(ResolvedImage { image_url })
    }
}

/// 取第一个匹配图片标记的元素的 `src`，缺失或为空时返回 `None`
pub fn extract_image_url(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(selector).next()?;
    element
        .value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DEFAULT_IMAGE_MARKER;

    fn selector() -> Selector {
        parse_selector(DEFAULT_IMAGE_MARKER).unwrap()
    }

    #[test]
    fn extracts_src_of_main_image() {
        let html = r#"
            <div class="wallpaper">
              <img class="wallpaper__image" src="https://images.wallpaperscraft.ru/image/single/girl_anime_art_1920x1080.jpg" alt="">
            </div>"#;
        assert_eq!(
            extract_image_url(html, &selector()).as_deref(),
            Some("https://images.wallpaperscraft.ru/image/single/girl_anime_art_1920x1080.jpg")
        );
    }

    #[test]
    fn first_marker_wins() {
        let html = r#"
            <img class="wallpaper__image" src="https://cdn.example/first.jpg">
            <img class="wallpaper__image" src="https://cdn.example/second.jpg">"#;
        assert_eq!(
            extract_image_url(html, &selector()).as_deref(),
            Some("https://cdn.example/first.jpg")
        );
    }

    #[test]
    fn missing_marker_or_attribute_gives_none() {
        assert_eq!(
            extract_image_url(r#"<img class="preview" src="x.jpg">"#, &selector()),
            None
        );
        assert_eq!(
            extract_image_url(r#"<img class="wallpaper__image">"#, &selector()),
            None
        );
        assert_eq!(
            extract_image_url(r#"<img class="wallpaper__image" src="  ">"#, &selector()),
            None
        );
    }
}
