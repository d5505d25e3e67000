// storage.rs — 壁纸落盘
// 管线把完整的图片字节交给 Storage，由它负责建目录、命名与处理重名

use crate::error::StorageError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt; // 异步写入 trait，提供 write_all() 等方法

/// 所有由本工具保存的文件都带这个前缀，`list` 与 `clean` 依赖它识别文件
pub const FILE_PREFIX: &str = "wallcraft-";

const MAX_COLLISION_SUFFIX: u32 = 999;

/// 进程内临时文件序号
static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

#[async_trait]
pub trait Storage: Send + Sync {
    /// 保存图片并返回最终路径，`bytes` 的所有权转移给 Storage
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> Result<PathBuf, StorageError>;
}

/// 保存到本地目录
#[derive(Debug, Clone)]
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 候选目标文件名：`name.jpg`, `name-1.jpg`, `name-2.jpg` ...
    fn candidate(filename: &str, n: u32) -> String {
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        match (n, ext) {
            (0, _) => format!("{FILE_PREFIX}{filename}"),
            (n, Some(ext)) => format!("{FILE_PREFIX}{stem}-{n}.{ext}"),
            (n, None) => format!("{FILE_PREFIX}{stem}-{n}"),
        }
    }

    /// 把写好的临时文件挂到第一个空闲的目标名上
    ///
    /// `hard_link` 在目标已存在时返回 `AlreadyExists`，占位与落盘是同一个原子操作，
    /// 并发保存同名文件时每个调用都会拿到不同的路径。
    async fn claim(&self, part_path: &Path, filename: &str) -> Result<PathBuf, StorageError> {
        for n in 0..=MAX_COLLISION_SUFFIX {
            let path = self.dir.join(Self::candidate(filename, n));
            match fs::hard_link(part_path, &path).await {
                Ok(()) => return Ok(path),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
        Err(StorageError::NoFreeName(filename.to_string()))
    }
}

#[async_trait]
impl Storage for DirStorage {
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> Result<PathBuf, StorageError> {
        let filename = sanitize_filename(filename)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        // 每次保存独占一个临时文件，写完再占用目标名，中途取消不会留下残缺的图片
        let part_path = self.dir.join(format!(
            "{FILE_PREFIX}{filename}.{}-{}.part",
            std::process::id(),
            PART_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let io_err = |source| StorageError::Io {
            path: part_path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part_path)
            .await
            .map_err(io_err)?;
        file.write_all(&bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        drop(file);

        let claimed = self.claim(&part_path, filename).await;
        if let Err(err) = fs::remove_file(&part_path).await {
            tracing::warn!(path = %part_path.display(), error = %err, "failed to remove temporary file");
        }
        claimed
    }
}

/// 只保留最后一个路径分量，拒绝 `..` 之类的名字
fn sanitize_filename(filename: &str) -> Result<&str, StorageError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }
    Ok(name)
}

/// 列出目录中由本工具保存的文件，按文件名排序
pub fn list_saved(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FILE_PREFIX) && !n.ends_with(".part"));
        if path.is_file() && is_ours {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
