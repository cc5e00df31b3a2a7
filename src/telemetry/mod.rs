//! 遥测模块
//!
//! 提供 tracing 订阅器的初始化。库代码只通过 `tracing` 宏记录
//! 结构化日志，订阅器由二进制入口在启动时安装一次。

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 初始化 tracing 订阅器
///
/// `level` 为配置或命令行给出的日志级别字符串，无法识别时回落到
/// `info`。重复初始化（例如测试环境）不报错。
pub fn init_tracing(level: &str) {
    let max_level = parse_level(level);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing 订阅器已初始化，跳过重复安装");
    }
}

/// 解析日志级别字符串，无法识别时回落到 info
fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!("无法识别的日志级别 \"{}\"，使用 info", other);
            Level::INFO
        }
    }
}
