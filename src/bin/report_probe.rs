//! 报告流探针
//!
//! 命令行工具：打开一次真实的活动报告流，随各分节陆续完成把分节
//! 状态打印到终端，终态到达后退出。用于在没有仪表盘界面的情况下
//! 验证服务端流行为与凭证配置。

use anyhow::{bail, Context, Result};
use clap::Parser;
use pulseboard_lib::config::{self, expand_tilde};
use pulseboard_lib::models::SectionState;
use pulseboard_lib::streaming::StreamConfig;
use pulseboard_lib::{
    ActivityReportProvider, Credentials, DateRange, Report, ReportStreamController, ReportUpdate,
    TerminalStatus,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "report_probe")]
#[command(about = "打开一次活动报告流并打印各分节的完成情况", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.pulseboard/config.toml）
    #[arg(long)]
    config: Option<String>,

    /// 组织名（覆盖配置文件）
    #[arg(long)]
    organization: Option<String>,

    /// OAuth 访问令牌（与 --pat 二选一）
    #[arg(long, conflicts_with = "pat")]
    token: Option<String>,

    /// Azure DevOps 个人访问令牌（与 --token 二选一）
    #[arg(long)]
    pat: Option<String>,

    /// 报告日期范围：最近 N 天
    #[arg(long, default_value = "7")]
    days: i64,

    /// 报告服务基础地址（覆盖配置文件）
    #[arg(long)]
    base_url: Option<String>,

    /// 日志级别
    #[arg(long, value_parser = ["error", "warn", "info", "debug", "trace"])]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => expand_tilde(path),
        None => config::default_config_path().context("无法确定默认配置路径")?,
    };
    let app_config = config::load_config(&config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.display()))?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&app_config.logging.level);
    pulseboard_lib::telemetry::init_tracing(level);

    let organization = cli
        .organization
        .or(app_config.connection.organization)
        .context("缺少组织名：使用 --organization 或在配置文件中设置")?;

    let credentials = match (cli.token, cli.pat) {
        (Some(token), None) => Credentials::bearer(&organization, token),
        (None, Some(pat)) => Credentials::pat(&organization, pat),
        (None, None) => bail!("缺少凭证：使用 --token 或 --pat"),
        (Some(_), Some(_)) => unreachable!("clap 已拒绝同时提供两种凭证"),
    };

    let range = DateRange::last_days(cli.days).context("日期范围非法")?;

    let base_url = cli.base_url.or(app_config.connection.base_url);
    let provider = match base_url {
        Some(url) => ActivityReportProvider::with_base_url(&url)
            .map_err(|e| anyhow::anyhow!(e.user_friendly_message()))?,
        None => ActivityReportProvider::new(),
    };

    let stream_config: StreamConfig = app_config.stream;
    let controller = ReportStreamController::new(Arc::new(provider), stream_config);
    let mut updates = controller.subscribe();

    println!("组织: {}  范围: {}", organization, range);
    controller.start(range, credentials);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                controller.cancel();
                println!("\n已取消。");
                return Ok(());
            }
            update = updates.recv() => match update {
                Ok(ReportUpdate::Snapshot { report, .. }) => print_report(&report),
                Ok(ReportUpdate::Terminal { status, .. }) => {
                    print_terminal(&status);
                    if !status.is_ok() {
                        std::process::exit(1);
                    }
                    return Ok(());
                }
                Err(err) => bail!("更新通道中断: {}", err),
            },
        }
    }
}

/// 打印当前快照的分节状态一览
fn print_report(report: &Report) {
    println!("---");
    for (name, state) in report.sections() {
        let rendered = match state {
            SectionState::Pending => "等待中".to_string(),
            SectionState::Ready { data } => format!("就绪  {}", data),
            SectionState::Failed { message } => format!("失败  {}", message),
        };
        println!("{:16} {}", name.display_name(), rendered);
    }
}

/// 打印终态
fn print_terminal(status: &TerminalStatus) {
    match status {
        TerminalStatus::Completed {
            generated_at,
            duration_ms,
        } => println!("完成: 生成于 {}，耗时 {} ms", generated_at, duration_ms),
        TerminalStatus::Failed { message } => println!("失败: {}", message),
    }
}
