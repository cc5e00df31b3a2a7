//! pulseboard — Azure DevOps 活动报告流式聚合客户端
//!
//! 打开服务端推送的多分节报告事件流，增量解析跨任意 chunk 边界
//! 到达的帧，把每个分节的结果合并为一个不断演进的报告值，供仪表
//! 盘在各分节完成时逐步渲染。
//!
//! # 模块布局
//!
//! - [`models`]: 报告、分节状态、日期范围等数据模型
//! - [`streaming`]: 帧解码、事件解析、分节聚合与流控制器
//! - [`providers`]: 报告服务的 HTTP 连接层
//! - [`credential`]: 请求凭证与组织范围
//! - [`config`]: TOML 应用配置
//! - [`telemetry`]: tracing 订阅器初始化
//!
//! # 数据流
//!
//! 网络字节 → [`streaming::FrameDecoder`] → 原始帧 →
//! [`streaming::parser`] → 类型化事件 → [`streaming::ReportAggregator`]
//! → 报告快照 → 广播通道 → 界面。

pub mod config;
pub mod credential;
pub mod models;
pub mod providers;
pub mod streaming;
pub mod telemetry;

// 重新导出最常用的类型
pub use credential::Credentials;
pub use models::{DateRange, Report, SectionName, SectionState, TerminalStatus};
pub use providers::{ActivityReportProvider, ReportStreamProvider};
pub use streaming::{ReportStreamController, ReportUpdate, StreamConfig};
