// main.rs — 程序入口
// 负责初始化异步运行时、日志与多语言，解析命令行参数并分发子命令

mod cli; // 声明 cli 模块，对应 src/cli.rs
mod logging;
mod setter;

// 初始化多语言支持，嵌入 locales 目录下的所有翻译
rust_i18n::i18n!("locales", fallback = "en");

use clap::{CommandFactory, Parser}; // 引入 Parser trait 的 parse() 方法; CommandFactory 用于生成补全脚本
use clap_complete::generate; // 引入补全脚本生成函数
use cli::{AcquireArgs, Cli, Commands, ConfigAction};
use rust_i18n::t; // 引入翻译宏
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use wallcraft::config::AppConfig;
use wallcraft::storage::{self, DirStorage, FILE_PREFIX, Storage};
use wallcraft::{
    AcquireState, CatalogRequest, ImageAcquisitionPipeline, NoProgress, PipelineError,
    ProgressSink, RandomSource, ReqwestFetcher, SavedWallpaper, SeededRandom, ThreadRandom,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// `#[tokio::main]` 宏将 async main 转换为同步 main + tokio 运行时
#[tokio::main]
async fn main() {
    // 自动检测系统语言并设置
    let locale = std::env::var("LANG").unwrap_or_else(|_| "en".to_string());
    if locale.starts_with("zh") {
        rust_i18n::set_locale("zh-CN");
    } else {
        rust_i18n::set_locale("en");
    }

    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{} {}", t!("error_prefix"), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = AppConfig::load()?;
    config.ensure_dirs()?;

    // 根据子命令分发执行逻辑
    match cli.command {
        Commands::Fetch { acquire, count } => handle_fetch(&config, &acquire, count).await?,
        Commands::Set { acquire } => {
            let saved = handle_single(&config, &acquire).await?;
            println!("{}", t!("setting_wallpaper"));
            setter::set_from_path(&saved.path)?;
            println!("{}", t!("set_done"));
        }
        Commands::Apply { image } => {
            println!("{}", t!("setting_wallpaper"));
            setter::set_from_path(&image)?;
            println!("{}", t!("set_done"));
        }
        Commands::List => handle_list(&config)?,
        Commands::Categories => {
            print_tokens(&t!("categories_title"), &config.catalog.categories, &config.category)
        }
        Commands::Resolutions => print_tokens(
            &t!("resolutions_title"),
            &config.catalog.resolutions,
            &config.resolution,
        ),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "wallcraft",
                &mut std::io::stdout(),
            );
        }
        Commands::Config { action } => handle_config(&mut config, &action)?,
        Commands::Clean => handle_clean(&config)?,
    }

    Ok(())
}

/// 在终端打印单次采集的进度
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn emit(&self, state: AcquireState) {
        match state {
            AcquireState::CatalogFetching => println!("{}", t!("stage_catalog")),
            AcquireState::DetailFetching => println!("{}", t!("stage_detail")),
            AcquireState::Downloading => println!("{}", t!("stage_download")),
            _ => {}
        }
    }
}

fn build_pipeline(config: &AppConfig, seed: Option<u64>) -> CliResult<Arc<ImageAcquisitionPipeline>> {
    let fetcher = Arc::new(ReqwestFetcher::new(&config.fetch_settings())?);
    let random: Arc<dyn RandomSource> = match seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    };
    let pipeline = ImageAcquisitionPipeline::new(config.catalog_settings(), fetcher, random)?;
    Ok(Arc::new(pipeline))
}

fn build_request(config: &AppConfig, args: &AcquireArgs) -> CliResult<CatalogRequest> {
    let request = config.catalog_request(args.category.as_deref(), args.resolution.as_deref())?;
    println!(
        "{}",
        t!("fetch_start", category => request.category, resolution => request.resolution)
    );
    Ok(request)
}

/// 重试策略由调用方决定：每次失败后重新走一遍完整采集（新的随机页与条目）
///
/// 只有采集阶段的失败会重试，保存失败直接返回。
async fn acquire_with_retries(
    pipeline: &ImageAcquisitionPipeline,
    request: &CatalogRequest,
    storage: &dyn Storage,
    retries: u32,
    sink: &dyn ProgressSink,
) -> Result<SavedWallpaper, PipelineError> {
    let mut attempt = 0;
    loop {
        match pipeline.acquire_and_save(request, storage, sink).await {
            Ok(saved) => return Ok(saved),
            Err(PipelineError::Acquire(err)) if attempt < retries => {
                attempt += 1;
                tracing::warn!(attempt, retries, error = %err, "acquisition failed, retrying");
                println!("{}", t!("retrying", attempt => attempt, total => retries, reason => err));
            }
            Err(err) => return Err(err),
        }
    }
}

/// 下载一张壁纸并返回保存结果
async fn handle_single(config: &AppConfig, args: &AcquireArgs) -> CliResult<SavedWallpaper> {
    let request = build_request(config, args)?;
    let pipeline = build_pipeline(config, args.seed)?;
    let storage = DirStorage::new(&config.wallpaper_dir);
    let retries = args.retries.unwrap_or(config.download.retries);

    let saved = acquire_with_retries(&pipeline, &request, &storage, retries, &ConsoleProgress).await?;
    println!("{}", t!("save_path", path => saved.path.display()));
    Ok(saved)
}

/// 处理 fetch 子命令：批量下载时按配置的并发上限同时采集
async fn handle_fetch(config: &AppConfig, args: &AcquireArgs, count: NonZeroUsize) -> CliResult<()> {
    let count = count.get();
    if count == 1 {
        handle_single(config, args).await?;
        println!("{}", t!("download_done", count => 1));
        return Ok(());
    }

    let request = build_request(config, args)?;
    let pipeline = build_pipeline(config, args.seed)?;
    let storage = Arc::new(DirStorage::new(&config.wallpaper_dir));
    let retries = args.retries.unwrap_or(config.download.retries);
    let semaphore = Arc::new(Semaphore::new(config.download.max_concurrent.max(1)));

    let mut tasks = JoinSet::new();
    for index in 0..count {
        let pipeline = pipeline.clone();
        let storage = storage.clone();
        let request = request.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            // 持有许可直到本次采集结束
            let _permit = semaphore.acquire_owned().await;
            let result =
                acquire_with_retries(&pipeline, &request, storage.as_ref(), retries, &NoProgress)
                    .await;
            (index, result)
        });
    }

    let mut saved = 0;
    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            (index, Ok(wallpaper)) => {
                saved += 1;
                println!(
                    "{}",
                    t!(
                        "download_info",
                        current => index + 1,
                        total => count,
                        path => wallpaper.path.display()
                    )
                );
            }
            (index, Err(err)) => {
                failed += 1;
                eprintln!(
                    "{}",
                    t!("download_failed", current => index + 1, total => count, reason => err)
                );
            }
        }
    }

    println!("{}", t!("download_done", count => saved));
    if failed > 0 {
        return Err(t!("error_some_failed", count => failed).to_string().into());
    }
    Ok(())
}

/// 处理 list 子命令：列出已下载的壁纸
fn handle_list(config: &AppConfig) -> CliResult<()> {
    let files = storage::list_saved(&config.wallpaper_dir)?;
    if files.is_empty() {
        println!("{}", t!("no_wallpapers", path => config.wallpaper_dir.display()));
        return Ok(());
    }
    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}

/// 打印白名单，并标记当前默认值
fn print_tokens(title: &str, tokens: &[String], current: &str) {
    println!("{} ({})", title, tokens.len());
    println!("{}", "-".repeat(30));
    for token in tokens {
        let marker = if token == current { "*" } else { " " };
        println!("{} {}", marker, token);
    }
}

/// 处理 clean 子命令：清理所有以 wallcraft- 开头的文件（包括中断留下的 .part）
fn handle_clean(config: &AppConfig) -> CliResult<()> {
    let dir = &config.wallpaper_dir;
    let mut deleted_count = 0;

    if dir.exists() {
        println!("{}", t!("cleaning_dir", path => dir.display()));

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if filename.starts_with(FILE_PREFIX) {
                    std::fs::remove_file(&path)?;
                    deleted_count += 1;
                    println!("  {} {}", t!("deleted"), filename);
                }
            }
        }
    }

    println!("{}", t!("clean_done", count => deleted_count));
    Ok(())
}

/// 处理 config 子命令：查看或修改配置
fn handle_config(config: &mut AppConfig, action: &ConfigAction) -> CliResult<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", t!("config_title"));
            println!("{}", t!("config_path", path => config.config_path.display()));
            println!(
                "{}",
                t!("config_wallpaper_dir", path => config.wallpaper_dir.display())
            );
            println!("{}", t!("config_base_url", url => config.catalog.base_url));
            println!("{}", t!("config_category", category => config.category));
            println!("{}", t!("config_res", res => config.resolution));
            println!("{}", t!("config_max_pages", pages => config.catalog.max_pages));
        }
        ConfigAction::Schema => {
            println!("{}", AppConfig::get_schema()?);
        }
        ConfigAction::Dump => {
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            config.save()?;
            println!("{}", t!("config_updated", key => key, value => value));
        }
    }
    Ok(())
}
