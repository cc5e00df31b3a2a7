//! 日期范围模型
//!
//! 报告请求的日期范围在进入流核心之前完成边界校验，流核心本身不再
//! 做任何日期检查。
//!
//! # 需求覆盖
//!
//! - 需求 5.3: 日期范围边界校验（结束不早于开始、不晚于当前、跨度不超上限）

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 日期范围跨度上限（天）
pub const MAX_RANGE_DAYS: i64 = 90;

/// 日期范围校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("结束时间早于开始时间")]
    EndBeforeStart,

    #[error("结束时间晚于当前时间")]
    EndInFuture,

    #[error("日期范围超过 {MAX_RANGE_DAYS} 天上限: 实际约 {actual_days} 天")]
    SpanTooLarge { actual_days: i64 },
}

/// 已通过校验的日期范围
///
/// 只能通过 [`DateRange::new`] 或 [`DateRange::last_days`] 构造，
/// 构造成功即保证满足全部边界条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// 校验并构造日期范围
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::EndBeforeStart);
        }
        if end > Utc::now() {
            return Err(DateRangeError::EndInFuture);
        }
        let span = end - start;
        if span > Duration::days(MAX_RANGE_DAYS) {
            return Err(DateRangeError::SpanTooLarge {
                actual_days: span.num_days(),
            });
        }
        Ok(DateRange { start, end })
    }

    /// 以当前时间为结束、向前回溯指定天数的范围
    pub fn last_days(days: i64) -> Result<Self, DateRangeError> {
        let end = Utc::now();
        let start = end - Duration::days(days);
        DateRange::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// 范围跨度（整天数，向下取整）
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// `startDate` 查询参数值（RFC3339）
    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// `endDate` 查询参数值（RFC3339）
    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start_param(), self.end_param())
    }
}

// ============================================================================
// 测试模块
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    #[test]
    fn test_valid_range() {
        let range = DateRange::new(days_ago(7), days_ago(1)).unwrap();
        assert_eq!(range.span_days(), 6);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = DateRange::new(days_ago(1), days_ago(7)).unwrap_err();
        assert_eq!(err, DateRangeError::EndBeforeStart);
    }

    #[test]
    fn test_end_in_future_rejected() {
        let future = Utc::now() + Duration::hours(1);
        let err = DateRange::new(days_ago(1), future).unwrap_err();
        assert_eq!(err, DateRangeError::EndInFuture);
    }

    #[test]
    fn test_span_over_limit_rejected() {
        let err = DateRange::new(days_ago(120), days_ago(1)).unwrap_err();
        assert!(matches!(err, DateRangeError::SpanTooLarge { .. }));
    }

    #[test]
    fn test_span_exactly_at_limit_accepted() {
        let end = days_ago(1);
        let start = end - Duration::days(MAX_RANGE_DAYS);
        assert!(DateRange::new(start, end).is_ok());
    }

    #[test]
    fn test_last_days() {
        let range = DateRange::last_days(7).unwrap();
        assert_eq!(range.span_days(), 7);
        assert!(DateRange::last_days(365).is_err());
    }

    #[test]
    fn test_query_params_rfc3339() {
        let range = DateRange::new(days_ago(7), days_ago(1)).unwrap();
        assert!(range.start_param().contains('T'));
        assert!(range.end_param().ends_with('Z'));
    }
}
