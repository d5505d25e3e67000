// cli.rs — 命令行接口定义模块
// 使用 clap 的 derive 模式定义所有子命令和参数

use clap::{Args, Parser, Subcommand}; // Parser: 解析命令行参数的 trait; Subcommand: 定义子命令的 trait
use clap_complete::Shell; // Shell 枚举：Bash, Zsh, Fish, Elvish, PowerShell
use std::num::NonZeroUsize;

/// 随机壁纸下载工具
///
/// 从 wallpaperscraft 目录中随机挑选一张壁纸，下载到本地，
/// 并可直接设置为桌面背景。
#[derive(Parser)]
#[command(name = "wallcraft")]
#[command(version)] // 自动从 Cargo.toml 读取 version 字段
#[command(about = "随机壁纸下载工具 — 从 wallpaperscraft 目录随机抓取壁纸并设为桌面背景")]
pub struct Cli {
    /// 输出更详细的日志（-v 调试，-vv 跟踪）
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 一次采集共用的参数
#[derive(Args, Debug, Clone)]
pub struct AcquireArgs {
    /// 壁纸分类（使用 `wallcraft categories` 查看可选值）
    #[arg(short, long)]
    pub category: Option<String>,

    /// 壁纸分辨率（使用 `wallcraft resolutions` 查看可选值）
    #[arg(short, long)]
    pub resolution: Option<String>,

    /// 失败后重新随机抓取的次数（默认读取配置）
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// 固定随机种子，便于复现同一次抓取
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 随机下载壁纸
    ///
    /// 用法示例:
    ///   wallcraft fetch
    ///   wallcraft fetch -c nature -r 2560x1440
    ///   wallcraft fetch -n 5
    Fetch {
        #[command(flatten)]
        acquire: AcquireArgs,

        /// 下载数量（至少 1）
        #[arg(short = 'n', long, default_value = "1", value_name = "N")]
        count: NonZeroUsize,
    },

    /// 一键更换：随机下载一张壁纸并设置为系统壁纸
    ///
    /// 用法示例:
    ///   wallcraft set
    ///   wallcraft set -c space -r 3840x2160
    Set {
        #[command(flatten)]
        acquire: AcquireArgs,
    },

    /// 将本地指定的图片设置为系统壁纸
    ///
    /// 用法示例:
    ///   wallcraft apply image.jpg
    Apply {
        /// 图片的本地路径
        image: String,
    },

    /// 列出已下载的壁纸图片
    List,

    /// 列出所有可用的分类
    Categories,

    /// 列出所有可用的分辨率
    Resolutions,

    /// 生成 shell 补全脚本（支持 bash, zsh, fish, elvish, powershell）
    ///
    /// 用法示例：
    ///   wallcraft completions zsh > ~/.zsh/completions/_wallcraft
    Completions {
        /// 目标 shell 类型
        shell: Shell,
    },

    /// 配置管理操作
    ///
    /// 用法示例:
    ///   wallcraft config show
    ///   wallcraft config set category nature
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// 清理所有带有 wallcraft- 前缀的下载文件
    Clean,
}

/// 配置管理操作
#[derive(Subcommand)]
pub enum ConfigAction {
    /// 查看当前配置简报
    Show,
    /// 生成配置文件对应的 JSON Schema
    Schema,
    /// 以 TOML 格式打印当前完整配置内容
    Dump,
    /// 设置配置项的值 (支持: category, resolution, wallpaper_dir, base_url, max_pages, retries, max_concurrent)
    Set {
        /// 要设置的键
        key: String,
        /// 要设置的值
        value: String,
    },
}
