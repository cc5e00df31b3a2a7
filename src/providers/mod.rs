//! 报告服务 Provider 模块
//!
//! 封装与活动报告服务之间的 HTTP 交互。流控制器只依赖
//! [`ReportStreamProvider`] trait，真实网络实现与测试替身可以互换。
//!
//! # 主要组件
//!
//! - `error`: 请求级错误类型定义
//! - `activity`: 活动报告流 Provider trait 与真实网络实现

pub mod activity;
pub mod error;

// 重新导出核心类型
pub use activity::{
    reqwest_stream_to_stream_response, ActivityReportProvider, ReportStreamProvider,
    StreamResponse,
};
pub use error::ApiError;
