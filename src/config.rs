// config.rs — 配置管理模块
// 遵循 Unix 风格：优先从 ~/.config/wallcraft/config.toml 读取配置

use crate::error::ConfigError;
use crate::http::{FetchSettings, default_user_agent};
use crate::source::{
    CatalogRequest, CatalogSettings, DEFAULT_BASE_URL, DEFAULT_CATALOG_PATH, DEFAULT_ENTRY_MARKER,
    DEFAULT_IMAGE_MARKER, DEFAULT_MAX_PAGES,
};
use schemars::JsonSchema; // 引入用于生成 JSON Schema 的 trait
use serde::{Deserialize, Serialize}; // 引入序列化与反序列化 trait
use shellexpand::tilde; // 用于展开 ~ 和环境变量
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 展开路径中的 ~ 和环境变量 ($HOME, $XDG_CONFIG_HOME 等)
fn expand_path(path_str: &str) -> PathBuf {
    let expanded = tilde(path_str).into_owned();
    PathBuf::from(expanded)
}

/// 相对路径一律相对于 $HOME
fn resolve_dir(path_str: &str, home: &Path) -> PathBuf {
    let p = expand_path(path_str);
    if p.is_absolute() { p } else { home.join(p) }
}

/// 映射 config.toml 文件内容的嵌套结构体
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
struct ConfigFile {
    #[serde(default)]
    common: CommonConfig,
    #[serde(default)]
    catalog: CatalogConfig,
    #[serde(default)]
    http: HttpConfig,
    #[serde(default)]
    download: DownloadConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
struct CommonConfig {
    /// 壁纸保存目录 (支持 ~、$HOME 等环境变量，相对路径则相对于 $HOME)
    wallpaper_dir: Option<String>,
    /// 默认分类
    #[serde(default = "default_category")]
    category: String,
    /// 默认分辨率
    #[serde(default = "default_resolution")]
    resolution: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            wallpaper_dir: None,
            category: default_category(),
            resolution: default_resolution(),
        }
    }
}

/// 目录站相关配置
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 目录路径前缀，实际地址为 `<base_url><catalog_path>/<分类>/<分辨率>/page<N>`
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    /// 随机页码的上限
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// 目录页中壁纸链接的 CSS 选择器
    #[serde(default = "default_entry_marker")]
    pub entry_marker: String,
    /// 详情页中原图元素的 CSS 选择器
    #[serde(default = "default_image_marker")]
    pub image_marker: String,
    /// 允许的分类
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// 允许的分辨率
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            catalog_path: default_catalog_path(),
            max_pages: default_max_pages(),
            entry_marker: default_entry_marker(),
            image_marker: default_image_marker(),
            categories: default_categories(),
            resolutions: default_resolutions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct HttpConfig {
    /// 单个请求的超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 自定义 User-Agent，不配置则使用 wallcraft/<版本号>
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct DownloadConfig {
    /// 批量下载时同时进行的采集数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// 采集失败后重新随机抓取的次数
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            retries: default_retries(),
        }
    }
}

fn default_category() -> String {
    "anime".to_string()
}
fn default_resolution() -> String {
    "1920x1080".to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_catalog_path() -> String {
    DEFAULT_CATALOG_PATH.to_string()
}
fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}
fn default_entry_marker() -> String {
    DEFAULT_ENTRY_MARKER.to_string()
}
fn default_image_marker() -> String {
    DEFAULT_IMAGE_MARKER.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_max_concurrent() -> usize {
    3
}
fn default_retries() -> u32 {
    2
}

fn default_categories() -> Vec<String> {
    [
        "3d",
        "abstract",
        "anime",
        "art",
        "vector",
        "city",
        "food",
        "animals",
        "space",
        "love",
        "macro",
        "cars",
        "minimalism",
        "motorcycles",
        "music",
        "holidays",
        "nature",
        "other",
        "words",
        "sport",
        "textures",
        "dark",
        "hi-tech",
        "fantasy",
        "flowers",
        "black_and_white",
        "black",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_resolutions() -> Vec<String> {
    ["1366x768", "1600x900", "1920x1080", "2560x1440", "3840x2160"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// 各平台默认的壁纸目录
fn default_wallpaper_dir(home: &Path) -> PathBuf {
    if cfg!(target_os = "linux") {
        home.join("Downloads").join("Wallpapers")
    } else {
        home.join("Pictures").join("Wallpapers")
    }
}

/// 应用全局配置项
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 壁纸保存目录
    pub wallpaper_dir: PathBuf,
    /// 配置文件所在路径
    pub config_path: PathBuf,
    /// 默认分类
    pub category: String,
    /// 默认分辨率
    pub resolution: String,
    pub catalog: CatalogConfig,
    pub http: HttpConfig,
    pub download: DownloadConfig,
    /// 相对路径的基准目录
    home: PathBuf,
}

impl AppConfig {
    /// 读取配置文件并叠加环境变量
    ///
    /// 优先级：环境变量 > 配置文件 > 内置默认值
    pub fn load() -> Result<Self, ConfigError> {
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map(PathBuf::from)
            .map_err(|_| ConfigError::NoHome)?;

        let config_path = env::var("WALLCRAFT_CONFIG")
            .map(|p| resolve_dir(&p, &home))
            .unwrap_or_else(|_| home.join(".config").join("wallcraft").join("config.toml"));

        let config_file = Self::load_config_from_file(&config_path).unwrap_or_default();
        let mut config = Self::from_file(config_file, &home, config_path);

        if let Ok(base_url) = env::var("WALLCRAFT_BASE_URL") {
            config.catalog.base_url = base_url;
        }
        if let Ok(dir) = env::var("WALLCRAFT_DIR") {
            config.wallpaper_dir = resolve_dir(&dir, &home);
        }

        Ok(config)
    }

    /// 从 TOML 文本构造配置，不读取环境变量
    pub fn parse(content: &str, home: &Path, config_path: PathBuf) -> Result<Self, toml::de::Error> {
        let config_file: ConfigFile = toml::from_str(content)?;
        Ok(Self::from_file(config_file, home, config_path))
    }

    fn from_file(config_file: ConfigFile, home: &Path, config_path: PathBuf) -> Self {
        let wallpaper_dir = match config_file.common.wallpaper_dir {
            Some(dir_str) => resolve_dir(&dir_str, home),
            None => default_wallpaper_dir(home),
        };

        Self {
            wallpaper_dir,
            config_path,
            category: config_file.common.category,
            resolution: config_file.common.resolution,
            catalog: config_file.catalog,
            http: config_file.http,
            download: config_file.download,
            home: home.to_path_buf(),
        }
    }

    /// 辅助函数：解析 TOML 配置文件
    ///
    /// 文件不存在时静默使用默认值，格式错误时记录警告后同样回退到默认值。
    fn load_config_from_file(path: &Path) -> Option<ConfigFile> {
        let content = fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(file) => Some(file),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config file");
                None
            }
        }
    }

    /// 确保配置目录与壁纸目录存在
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.wallpaper_dir)
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            base_url: self.catalog.base_url.clone(),
            catalog_path: self.catalog.catalog_path.clone(),
            max_pages: self.catalog.max_pages,
            entry_marker: self.catalog.entry_marker.clone(),
            image_marker: self.catalog.image_marker.clone(),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone().unwrap_or_else(default_user_agent),
        }
    }

    /// 按白名单校验分类与分辨率，未指定时使用配置中的默认值
    pub fn catalog_request(
        &self,
        category: Option<&str>,
        resolution: Option<&str>,
    ) -> Result<CatalogRequest, ConfigError> {
        let category = category.unwrap_or(&self.category);
        let resolution = resolution.unwrap_or(&self.resolution);
        self.check_category(category)?;
        self.check_resolution(resolution)?;
        Ok(CatalogRequest::new(category, resolution))
    }

    fn check_category(&self, category: &str) -> Result<(), ConfigError> {
        if self.catalog.categories.iter().any(|c| c == category) {
            Ok(())
        } else {
            Err(ConfigError::UnknownCategory {
                value: category.to_string(),
                allowed: self.catalog.categories.join(", "),
            })
        }
    }

    fn check_resolution(&self, resolution: &str) -> Result<(), ConfigError> {
        if self.catalog.resolutions.iter().any(|r| r == resolution) {
            Ok(())
        } else {
            Err(ConfigError::UnknownResolution {
                value: resolution.to_string(),
                allowed: self.catalog.resolutions.join(", "),
            })
        }
    }

    /// 修改单个配置项（不写盘，调用方随后调用 `save`）
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "category" => {
                self.check_category(value)?;
                self.category = value.to_string();
            }
            "res" | "resolution" => {
                self.check_resolution(value)?;
                self.resolution = value.to_string();
            }
            "dir" | "wallpaper_dir" => self.wallpaper_dir = resolve_dir(value, &self.home),
            "base_url" => self.catalog.base_url = value.to_string(),
            "max_pages" => {
                let pages: u32 = value.parse().map_err(|_| invalid())?;
                if pages == 0 {
                    return Err(ConfigError::InvalidMaxPages);
                }
                self.catalog.max_pages = pages;
            }
            "retries" => self.download.retries = value.parse().map_err(|_| invalid())?,
            "max_concurrent" => {
                let n: usize = value.parse().map_err(|_| invalid())?;
                if n == 0 {
                    return Err(invalid());
                }
                self.download.max_concurrent = n;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn to_file(&self) -> ConfigFile {
        ConfigFile {
            common: CommonConfig {
                wallpaper_dir: Some(self.wallpaper_dir.to_string_lossy().to_string()),
                category: self.category.clone(),
                resolution: self.resolution.clone(),
            },
            catalog: self.catalog.clone(),
            http: self.http.clone(),
            download: self.download.clone(),
        }
    }

    /// 将配置保存回文件
    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(&self.to_file())?;
        let io_err = |source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        };
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.config_path, toml_str).map_err(io_err)
    }

    /// 获取配置文件的 JSON Schema
    pub fn get_schema() -> serde_json::Result<String> {
        let schema = schemars::schema_for!(ConfigFile);
        serde_json::to_string_pretty(&schema)
    }

    /// 将当前配置转换为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let toml_str = toml::to_string_pretty(&self.to_file())?;

        // toml 库不支持带注释序列化，所以手动插入
        Ok(toml_str.replace(
            "[catalog]",
            "# 目录站配置\n# 页面地址: <base_url><catalog_path>/<category>/<resolution>/page<N>\n[catalog]",
        ))
    }
}
