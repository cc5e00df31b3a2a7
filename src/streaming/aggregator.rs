//! 报告分节聚合器
//!
//! 独占持有一个 [`Report`] 值，把类型化的流事件逐个应用到对应分节上，
//! 每次变更后对外提供不可变快照。所有方法都是同步的，相对报告大小
//! 为 O(1)（只触碰一个分节槽位）。
//!
//! # 需求覆盖
//!
//! - 需求 3.1: 同名分节末次写入生效
//! - 需求 3.2: 分节之间互不影响
//! - 需求 3.3: complete 冻结权威元数据
//! - 需求 3.4: 致命错误保留已有分节数据
//! - 需求 3.5: 重置产生全 Pending 的新报告
//! - 需求 3.6: 终态之后的分节事件可安全忽略

use crate::models::{Report, SectionName, SectionState};
use crate::streaming::parser::SectionOutcome;
use chrono::{DateTime, Utc};

/// 报告分节聚合器
///
/// 一次代次对应一个聚合器实例（或一次 [`reset`](Self::reset)）。
#[derive(Debug, Default)]
pub struct ReportAggregator {
    report: Report,
}

impl ReportAggregator {
    /// 创建聚合器，初始报告全部分节为 Pending
    pub fn new() -> Self {
        Self {
            report: Report::new(),
        }
    }

    /// 应用一个分节事件，返回更新后的快照
    ///
    /// 覆盖写入该分节的状态并盖上临时的元数据时间戳（耗时留空，
    /// 待 complete 事件冻结）。代次已到终态时事件被忽略，返回
    /// 未变化的快照。
    pub fn apply_section(&mut self, name: SectionName, outcome: SectionOutcome) -> Report {
        if self.report.is_terminal() {
            tracing::debug!(section = %name, "代次已到终态，忽略迟到的分节事件");
            return self.snapshot();
        }

        let state = match outcome {
            SectionOutcome::Ready(data) => SectionState::Ready { data },
            SectionOutcome::Failed(message) => SectionState::Failed { message },
        };
        self.report.set_section(name, state);
        self.report.stamp_provisional_meta(Utc::now());
        self.snapshot()
    }

    /// 应用 complete 事件，冻结服务端给出的权威元数据
    ///
    /// 分节内容不做任何改动。
    pub fn apply_complete(&mut self, generated_at: DateTime<Utc>, duration_ms: u64) -> Report {
        self.report.freeze_meta(generated_at, duration_ms);
        self.snapshot()
    }

    /// 标记整个代次失败
    ///
    /// 已聚合的分节数据全部保留，供界面继续展示；是否清空由
    /// 界面侧自行决定。
    pub fn apply_fatal_error(&mut self, message: impl Into<String>) -> Report {
        self.report.mark_failed(message);
        self.snapshot()
    }

    /// 重置为全 Pending 的新报告，服务新的代次
    pub fn reset(&mut self) -> Report {
        self.report = Report::new();
        self.snapshot()
    }

    /// 当前状态的不可变快照
    pub fn snapshot(&self) -> Report {
        self.report.clone()
    }
}

// ============================================================================
// 测试模块
// ============================================================================


// ============================================================================
// 属性测试
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_outcome() -> impl Strategy<Value = SectionOutcome> {
        prop_oneof![
            (0i64..1000).prop_map(|v| SectionOutcome::Ready(json!({ "count": v }))),
            "[a-z ]{1,20}".prop_map(SectionOutcome::Failed),
        ]
    }

    fn outcome_matches(state: &SectionState, outcome: &SectionOutcome) -> bool {
        match (state, outcome) {
            (SectionState::Ready { data }, SectionOutcome::Ready(expected)) => data == expected,
            (SectionState::Failed { message }, SectionOutcome::Failed(expected)) => {
                message == expected
            }
            _ => false,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Feature: activity-report-streaming, Property 2**
        /// 任意事件序列下，每个分节的最终状态等于它收到的最后一个结果
        /// **Validates: Requirements 3.1**
        #[test]
        fn prop_last_write_wins(
            events in prop::collection::vec((0usize..5, arb_outcome()), 1..30),
        ) {
            let mut aggregator = ReportAggregator::new();
            for (index, outcome) in &events {
                aggregator.apply_section(SectionName::ALL[*index], outcome.clone());
            }
            let snapshot = aggregator.snapshot();

            for (position, name) in SectionName::ALL.iter().enumerate() {
                let last = events.iter().rev().find(|(index, _)| *index == position);
                match last {
                    Some((_, outcome)) => {
                        prop_assert!(outcome_matches(snapshot.section(*name), outcome));
                    }
                    None => prop_assert!(snapshot.section(*name).is_pending()),
                }
            }
        }

        /// **Feature: activity-report-streaming, Property 3**
        /// 只更新一个分节时，其余分节保持 Pending
        /// **Validates: Requirements 3.2**
        #[test]
        fn prop_section_isolation(
            index in 0usize..5,
            outcomes in prop::collection::vec(arb_outcome(), 1..10),
        ) {
            let mut aggregator = ReportAggregator::new();
            let target = SectionName::ALL[index];
            for outcome in outcomes {
                aggregator.apply_section(target, outcome);
            }
            let snapshot = aggregator.snapshot();
            for name in SectionName::ALL {
                if name == target {
                    prop_assert!(!snapshot.section(name).is_pending());
                } else {
                    prop_assert!(snapshot.section(name).is_pending());
                }
            }
        }

        /// 致命错误在任意前置事件序列后都保留全部已聚合数据
        /// **Validates: Requirements 3.4**
        #[test]
        fn prop_fatal_preserves_aggregated_state(
            events in prop::collection::vec((0usize..5, arb_outcome()), 0..20),
            message in "[a-z ]{1,20}",
        ) {
            let mut aggregator = ReportAggregator::new();
            for (index, outcome) in &events {
                aggregator.apply_section(SectionName::ALL[*index], outcome.clone());
            }
            let before = aggregator.snapshot();
            let after = aggregator.apply_fatal_error(message);

            prop_assert!(after.is_terminal());
            for name in SectionName::ALL {
                prop_assert_eq!(before.section(name), after.section(name));
            }
        }
    }
}
