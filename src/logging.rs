// logging.rs — 日志初始化
// 日志写到 stderr，正常的命令输出仍然走 stdout

use tracing_subscriber::prelude::*;

/// 初始化全局 tracing subscriber
///
/// 级别优先取 `WALLCRAFT_LOG`，否则由 `-v` 的次数决定（默认只输出警告）。
/// 除 ERROR 外只保留本 crate 的日志，避免 reqwest/hyper 的噪音。
pub fn init(verbose: u8) {
    let log_level = std::env::var("WALLCRAFT_LOG")
        .ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(match verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        });

    let log_format = tracing_subscriber::fmt::format()
        .compact()
        .without_time()
        .with_target(false);

    let log_filter = tracing_subscriber::fmt::Layer::default()
        .with_writer(std::io::stderr)
        .event_format(log_format)
        .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
            metadata.level() == &tracing::Level::ERROR
                || (metadata.target().starts_with("wallcraft") && metadata.level() <= &log_level)
        }));

    tracing_subscriber::registry().with(log_filter).init();
}
