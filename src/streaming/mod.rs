//! 活动报告流核心模块
//!
//! 该模块把服务端推送的多分节事件流还原为一个不断演进的报告值：
//! 字节流经帧解码器重组为完整帧，帧经事件解析器转换为类型化事件，
//! 事件由分节聚合器应用到报告上，流控制器串联三者并负责请求生命
//! 周期、超时与取消。
//!
//! # 主要组件
//!
//! - `error`: 流式错误类型定义
//! - `metrics`: 流式指标类型定义
//! - `config`: 报告流配置
//! - `decoder`: 帧解码器（任意 chunk 边界下的帧重组）
//! - `parser`: 事件解析器（帧文本到类型化事件）
//! - `aggregator`: 分节聚合器（报告状态机）
//! - `controller`: 流控制器（代次生命周期与广播）

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod metrics;
pub mod parser;

// 重新导出核心类型
pub use aggregator::ReportAggregator;
pub use config::StreamConfig;
pub use controller::{ReportStreamController, ReportUpdate};
pub use decoder::{DecoderState, FrameDecoder};
pub use error::StreamError;
pub use metrics::StreamMetrics;
pub use parser::{parse_event, parse_frame, Frame, SectionOutcome, StreamEvent};
