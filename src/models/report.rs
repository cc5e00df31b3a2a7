//! 活动报告数据模型
//!
//! 定义一次报告代次内不断演进的报告值及其快照语义。报告由聚合器独占
//! 持有，界面侧只读取克隆出来的快照。
//!
//! # 需求覆盖
//!
//! - 需求 3.1: 同名分节末次写入生效
//! - 需求 3.3: 完成时冻结元数据
//! - 需求 3.4: 致命错误保留已有分节数据

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 报告分节名称
///
/// 固定的小集合，对应仪表盘上五个独立完成的面板。线上格式为 kebab-case，
/// 同时兼容旧版客户端发送的 camelCase 写法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionName {
    /// 拉取请求统计
    #[serde(alias = "pullRequests")]
    PullRequests,
    /// 拉取请求讨论统计
    #[serde(alias = "prDiscussion")]
    PrDiscussion,
    /// 构建统计
    Builds,
    /// 发布统计
    Releases,
    /// 工作项统计
    #[serde(alias = "workItems")]
    WorkItems,
}

impl SectionName {
    /// 全部分节，按仪表盘展示顺序排列
    pub const ALL: [SectionName; 5] = [
        SectionName::PullRequests,
        SectionName::PrDiscussion,
        SectionName::Builds,
        SectionName::Releases,
        SectionName::WorkItems,
    ];

    /// 线上格式的分节名
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::PullRequests => "pull-requests",
            SectionName::PrDiscussion => "pr-discussion",
            SectionName::Builds => "builds",
            SectionName::Releases => "releases",
            SectionName::WorkItems => "work-items",
        }
    }

    /// 从线上名称解析分节，未知名称返回 None
    ///
    /// 兼容 kebab-case 与 camelCase 两种写法。
    pub fn from_wire(name: &str) -> Option<SectionName> {
        match name {
            "pull-requests" | "pullRequests" => Some(SectionName::PullRequests),
            "pr-discussion" | "prDiscussion" => Some(SectionName::PrDiscussion),
            "builds" => Some(SectionName::Builds),
            "releases" => Some(SectionName::Releases),
            "work-items" | "workItems" => Some(SectionName::WorkItems),
            _ => None,
        }
    }

    /// 展示用的中文名称
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionName::PullRequests => "拉取请求",
            SectionName::PrDiscussion => "PR 讨论",
            SectionName::Builds => "构建",
            SectionName::Releases => "发布",
            SectionName::WorkItems => "工作项",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 分节状态
///
/// 同一代次内同名分节的后续事件直接覆盖之前的状态，不做负载合并。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SectionState {
    /// 尚未收到该分节的任何事件
    Pending,
    /// 分节数据已就绪
    Ready {
        /// 分节负载，结构因分节而异，核心不解释其内容
        data: Value,
    },
    /// 分节生成失败
    Failed {
        /// 失败原因，直接展示给界面
        message: String,
    },
}

impl SectionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SectionState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SectionState::Ready { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SectionState::Failed { .. })
    }

    /// 就绪时的分节负载
    pub fn data(&self) -> Option<&Value> {
        match self {
            SectionState::Ready { data } => Some(data),
            _ => None,
        }
    }
}

/// 报告元数据
///
/// 流进行中由分节事件盖上临时时间戳（无耗时），complete 事件到达后
/// 冻结为服务端给出的权威值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// 报告生成时间
    pub generated_at: DateTime<Utc>,
    /// 服务端统计的生成耗时（毫秒），完成前为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// 报告代次状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ReportStatus {
    /// 流进行中
    Streaming,
    /// 收到 complete 事件，正常结束
    Completed,
    /// 代次整体失败，已有分节数据仍然保留
    Failed {
        /// 失败原因
        message: String,
    },
}

/// 活动报告
///
/// 分节名到分节状态的有序映射，外加可选的元数据和代次状态。
/// 创建时全部分节为 Pending；由聚合器就地更新；新代次开始时整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    sections: IndexMap<SectionName, SectionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<ReportMeta>,
    status: ReportStatus,
}

impl Report {
    /// 创建全 Pending 的新报告
    pub fn new() -> Self {
        let mut sections = IndexMap::with_capacity(SectionName::ALL.len());
        for name in SectionName::ALL {
            sections.insert(name, SectionState::Pending);
        }
        Report {
            sections,
            meta: None,
            status: ReportStatus::Streaming,
        }
    }

    /// 读取指定分节的状态
    pub fn section(&self, name: SectionName) -> &SectionState {
        static PENDING: SectionState = SectionState::Pending;
        self.sections.get(&name).unwrap_or(&PENDING)
    }

    /// 按展示顺序遍历全部分节
    pub fn sections(&self) -> impl Iterator<Item = (SectionName, &SectionState)> {
        self.sections.iter().map(|(name, state)| (*name, state))
    }

    pub fn meta(&self) -> Option<&ReportMeta> {
        self.meta.as_ref()
    }

    pub fn status(&self) -> &ReportStatus {
        &self.status
    }

    /// 代次是否已到达终态（完成或失败）
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, ReportStatus::Streaming)
    }

    /// 已就绪的分节数量
    pub fn ready_count(&self) -> usize {
        self.sections.values().filter(|s| s.is_ready()).count()
    }

    /// 已失败的分节数量
    pub fn failed_count(&self) -> usize {
        self.sections.values().filter(|s| s.is_failed()).count()
    }

    /// 覆盖写入一个分节的状态
    pub(crate) fn set_section(&mut self, name: SectionName, state: SectionState) {
        self.sections.insert(name, state);
    }

    /// 盖上临时元数据时间戳，保留已有耗时为空
    pub(crate) fn stamp_provisional_meta(&mut self, at: DateTime<Utc>) {
        self.meta = Some(ReportMeta {
            generated_at: at,
            duration_ms: None,
        });
    }

    /// 冻结为服务端给出的权威元数据并标记完成
    pub(crate) fn freeze_meta(&mut self, generated_at: DateTime<Utc>, duration_ms: u64) {
        self.meta = Some(ReportMeta {
            generated_at,
            duration_ms: Some(duration_ms),
        });
        self.status = ReportStatus::Completed;
    }

    /// 标记代次整体失败，分节内容不变
    pub(crate) fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = ReportStatus::Failed {
            message: message.into(),
        };
    }
}

impl Default for Report {
    fn default() -> Self {
        Report::new()
    }
}

/// 报告代次的终态
///
/// 正常完成时携带服务端的生成时间与耗时，失败时携带面向界面的消息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TerminalStatus {
    /// 代次正常完成
    #[serde(rename_all = "camelCase")]
    Completed {
        generated_at: DateTime<Utc>,
        duration_ms: u64,
    },
    /// 代次失败
    Failed { message: String },
}

impl TerminalStatus {
    /// 是否为成功终态
    pub fn is_ok(&self) -> bool {
        matches!(self, TerminalStatus::Completed { .. })
    }

    /// 失败时的展示消息
    pub fn message(&self) -> Option<&str> {
        match self {
            TerminalStatus::Failed { message } => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// 测试模块
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_name_wire_format() {
        assert_eq!(SectionName::PullRequests.as_str(), "pull-requests");
        assert_eq!(SectionName::PrDiscussion.as_str(), "pr-discussion");
        assert_eq!(SectionName::WorkItems.as_str(), "work-items");

        let json = serde_json::to_string(&SectionName::PullRequests).unwrap();
        assert_eq!(json, "\"pull-requests\"");
    }

    #[test]
    fn test_section_name_from_wire_accepts_both_casings() {
        assert_eq!(
            SectionName::from_wire("pull-requests"),
            Some(SectionName::PullRequests)
        );
        assert_eq!(
            SectionName::from_wire("pullRequests"),
            Some(SectionName::PullRequests)
        );
        assert_eq!(
            SectionName::from_wire("prDiscussion"),
            Some(SectionName::PrDiscussion)
        );
        assert_eq!(SectionName::from_wire("builds"), Some(SectionName::Builds));
        assert_eq!(SectionName::from_wire("unknown-section"), None);
    }

    #[test]
    fn test_section_name_alias_deserialization() {
        let name: SectionName = serde_json::from_str("\"workItems\"").unwrap();
        assert_eq!(name, SectionName::WorkItems);
        let name: SectionName = serde_json::from_str("\"work-items\"").unwrap();
        assert_eq!(name, SectionName::WorkItems);
    }

    #[test]
    fn test_new_report_all_pending() {
        let report = Report::new();
        assert_eq!(report.sections().count(), 5);
        for name in SectionName::ALL {
            assert!(report.section(name).is_pending());
        }
        assert!(report.meta().is_none());
        assert!(!report.is_terminal());
        assert_eq!(report.ready_count(), 0);
        assert_eq!(report.failed_count(), 0);
    }

    #[test]
    fn test_report_section_overwrite() {
        let mut report = Report::new();
        report.set_section(
            SectionName::Builds,
            SectionState::Failed {
                message: "boom".to_string(),
            },
        );
        assert!(report.section(SectionName::Builds).is_failed());

        report.set_section(
            SectionName::Builds,
            SectionState::Ready {
                data: json!({"totalBuilds": 5}),
            },
        );
        assert!(report.section(SectionName::Builds).is_ready());
        assert_eq!(
            report.section(SectionName::Builds).data(),
            Some(&json!({"totalBuilds": 5}))
        );
    }

    #[test]
    fn test_report_meta_lifecycle() {
        let mut report = Report::new();
        let provisional = Utc::now();
        report.stamp_provisional_meta(provisional);
        assert_eq!(report.meta().unwrap().duration_ms, None);

        let authoritative: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        report.freeze_meta(authoritative, 1200);
        let meta = report.meta().unwrap();
        assert_eq!(meta.generated_at, authoritative);
        assert_eq!(meta.duration_ms, Some(1200));
        assert!(report.is_terminal());
        assert_eq!(*report.status(), ReportStatus::Completed);
    }

    #[test]
    fn test_report_failure_preserves_sections() {
        let mut report = Report::new();
        report.set_section(
            SectionName::Releases,
            SectionState::Ready {
                data: json!({"count": 3}),
            },
        );
        report.mark_failed("上游超时");
        assert!(report.is_terminal());
        assert!(report.section(SectionName::Releases).is_ready());
        match report.status() {
            ReportStatus::Failed { message } => assert_eq!(message, "上游超时"),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_report_serialization_shape() {
        let mut report = Report::new();
        report.set_section(
            SectionName::Builds,
            SectionState::Ready {
                data: json!({"failed": 1}),
            },
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["sections"]["builds"]["state"], "ready");
        assert_eq!(value["sections"]["builds"]["data"]["failed"], 1);
        assert_eq!(value["sections"]["pull-requests"]["state"], "pending");
        assert_eq!(value["status"]["phase"], "streaming");
    }

    #[test]
    fn test_terminal_status() {
        let ok = TerminalStatus::Completed {
            generated_at: Utc::now(),
            duration_ms: 42,
        };
        assert!(ok.is_ok());
        assert_eq!(ok.message(), None);

        let failed = TerminalStatus::Failed {
            message: "网络错误".to_string(),
        };
        assert!(!failed.is_ok());
        assert_eq!(failed.message(), Some("网络错误"));

        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["outcome"], "failed");
    }
}
