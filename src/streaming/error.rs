//! 活动报告流错误类型
//!
//! 定义报告流接收与解析过程中可能发生的各种错误类型。
//!
//! # 需求覆盖
//!
//! - 需求 1.4: 缓冲区上限
//! - 需求 4.2: 非 2xx 响应立即失败
//! - 需求 4.5: 意外关闭合成失败
//! - 需求 4.7: 超时处理

use serde::{Deserialize, Serialize};
use std::fmt;

/// 报告流错误类型
///
/// 涵盖一次报告代次从建立连接到终态之间可能发生的所有错误情况。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StreamError {
    /// 网络错误
    ///
    /// 当网络连接失败、DNS 解析失败或连接被重置时发生。
    Network(String),

    /// 超时错误
    ///
    /// 当两个数据块之间的间隔或整个流的持续时间超过配置的超时时间时发生。
    /// 对应需求 4.7
    Timeout,

    /// 解析错误
    ///
    /// 当帧文本或事件负载无法解析时发生。单个帧的解析失败不会中断流，
    /// 该错误仅用于日志与指标记录。
    Parse(String),

    /// 报告服务错误
    ///
    /// 当报告服务返回非 2xx 状态码时发生。
    /// 对应需求 4.2
    Api {
        /// HTTP 状态码
        status: u16,
        /// 错误消息
        message: String,
    },

    /// 缓冲区溢出
    ///
    /// 当未闭合的帧数据超过配置的缓冲区上限时发生。
    /// 对应需求 1.4
    BufferOverflow,

    /// 流意外关闭
    ///
    /// 当传输层在 complete 或 error 事件之前结束时发生。
    /// 对应需求 4.5
    Closed,

    /// 内部错误
    ///
    /// 其他内部错误。
    Internal(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Network(msg) => write!(f, "网络错误: {}", msg),
            StreamError::Timeout => write!(f, "报告流超时"),
            StreamError::Parse(msg) => write!(f, "解析错误: {}", msg),
            StreamError::Api { status, message } => {
                write!(f, "报告服务错误 ({}): {}", status, message)
            }
            StreamError::BufferOverflow => write!(f, "帧缓冲区溢出"),
            StreamError::Closed => write!(f, "报告流在完成前意外关闭"),
            StreamError::Internal(msg) => write!(f, "内部错误: {}", msg),
        }
    }
}

impl std::error::Error for StreamError {}

// ============================================================================
// From trait 实现 - 用于错误转换
// ============================================================================

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Network(err.to_string())
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StreamError::Timeout
        } else if err.is_connect() {
            StreamError::Network(format!("连接失败: {}", err))
        } else if let Some(status) = err.status() {
            StreamError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_request() {
            StreamError::Network(format!("请求错误: {}", err))
        } else {
            StreamError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Parse(err.to_string())
    }
}

impl From<String> for StreamError {
    fn from(msg: String) -> Self {
        StreamError::Internal(msg)
    }
}

// ============================================================================
// 辅助方法
// ============================================================================

impl StreamError {
    /// 创建网络错误
    pub fn network(msg: impl Into<String>) -> Self {
        StreamError::Network(msg.into())
    }

    /// 创建解析错误
    pub fn parse(msg: impl Into<String>) -> Self {
        StreamError::Parse(msg.into())
    }

    /// 创建报告服务错误
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        StreamError::Api {
            status,
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        StreamError::Internal(msg.into())
    }

    /// 判断错误是否可重试
    ///
    /// 网络错误、超时、意外关闭以及部分服务错误（429、5xx）可以重试。
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Network(_) => true,
            StreamError::Timeout => true,
            StreamError::Closed => true,
            StreamError::Api { status, .. } => *status == 429 || *status >= 500,
            StreamError::Parse(_) => false,
            StreamError::BufferOverflow => false,
            StreamError::Internal(_) => false,
        }
    }

    /// 获取 HTTP 状态码（如果适用）
    pub fn status(&self) -> Option<u16> {
        match self {
            StreamError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 获取面向界面展示的错误消息
    ///
    /// 终态失败时由控制器写入 `TerminalStatus::Failed`，界面直接展示。
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Network(_) => "网络连接失败，请检查网络后重试".to_string(),
            StreamError::Timeout => "报告生成超时，请缩小日期范围后重试".to_string(),
            StreamError::Api { status, message } => {
                format!("报告服务返回错误 ({}): {}", status, message)
            }
            StreamError::BufferOverflow => "报告数据异常（单帧过大），已中止接收".to_string(),
            StreamError::Closed => "报告流在完成前意外关闭".to_string(),
            StreamError::Parse(_) | StreamError::Internal(_) => {
                "报告接收过程中发生内部错误".to_string()
            }
        }
    }
}

// ============================================================================
// 测试模块
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "网络错误: connection refused");

        let err = StreamError::Timeout;
        assert_eq!(err.to_string(), "报告流超时");

        let err = StreamError::api(503, "service unavailable");
        assert_eq!(err.to_string(), "报告服务错误 (503): service unavailable");
    }

    #[test]
    fn test_stream_error_is_retryable() {
        assert!(StreamError::Network("test".to_string()).is_retryable());
        assert!(StreamError::Timeout.is_retryable());
        assert!(StreamError::Closed.is_retryable());
        assert!(StreamError::api(429, "rate limited").is_retryable());
        assert!(StreamError::api(500, "server error").is_retryable());
        assert!(!StreamError::api(401, "unauthorized").is_retryable());
        assert!(!StreamError::Parse("invalid json".to_string()).is_retryable());
        assert!(!StreamError::BufferOverflow.is_retryable());
    }

    #[test]
    fn test_stream_error_status() {
        assert_eq!(StreamError::api(429, "test").status(), Some(429));
        assert_eq!(StreamError::Timeout.status(), None);
        assert_eq!(StreamError::Closed.status(), None);
    }

    #[test]
    fn test_stream_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let stream_err: StreamError = io_err.into();
        assert!(matches!(stream_err, StreamError::Network(_)));
    }

    #[test]
    fn test_stream_error_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let stream_err: StreamError = json_err.into();
        assert!(matches!(stream_err, StreamError::Parse(_)));
    }

    #[test]
    fn test_stream_error_serialization() {
        let err = StreamError::api(500, "internal server error");
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: StreamError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_stream_error_user_message() {
        let err = StreamError::Closed;
        assert_eq!(err.user_message(), "报告流在完成前意外关闭");

        let err = StreamError::api(403, "forbidden");
        assert!(err.user_message().contains("403"));
    }
}
