//! 数据模型模块
//!
//! 定义活动报告的核心数据结构与请求边界上的校验类型。
//!
//! # 主要组件
//!
//! - `report`: 报告、分节状态与终态类型
//! - `date_range`: 日期范围及其边界校验

pub mod date_range;
pub mod report;

// 重新导出核心类型
pub use date_range::{DateRange, DateRangeError, MAX_RANGE_DAYS};
pub use report::{Report, ReportMeta, ReportStatus, SectionName, SectionState, TerminalStatus};
