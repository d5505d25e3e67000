// setter.rs — 系统壁纸设置模块

use std::path::Path;
use wallcraft::error::WallpaperError;

/// 将指定路径的图片设置为系统壁纸
///
/// 各桌面环境的差异由 `wallpaper` crate 处理，这里只负责校验路径并把失败转换为明确的错误。
pub fn set_from_path(path: impl AsRef<Path>) -> Result<(), WallpaperError> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(WallpaperError::NotFound(path_ref.to_path_buf()));
    }

    // 桌面环境通常要求绝对路径
    let absolute = path_ref
        .canonicalize()
        .map_err(|_| WallpaperError::NotFound(path_ref.to_path_buf()))?;
    let path_str = absolute
        .to_str()
        .ok_or_else(|| WallpaperError::NonUtf8Path(absolute.clone()))?;

    println!("  -> {}", absolute.display());
    tracing::debug!(path = %path_str, "setting desktop wallpaper");

    wallpaper::set_from_path(path_str).map_err(|e| WallpaperError::Backend(e.to_string()))
}
