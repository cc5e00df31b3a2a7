//! 报告服务错误类型
//!
//! 提供统一的请求级错误处理机制，区分可重试和不可重试错误，
//! 并提供用户友好的中文错误信息。

use std::error::Error;
use std::fmt;

/// 报告服务请求错误
///
/// 建立报告流连接阶段的错误分类。连接建立之后的错误由
/// `streaming::StreamError` 表达。
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 网络错误（可重试）
    /// 包括连接超时、DNS 解析失败等
    NetworkError(String),

    /// 认证错误（需要重新登录或更换令牌）
    /// 401/403
    AuthenticationError(String),

    /// 限流错误（需要等待）
    /// 429
    RateLimitError(String),

    /// 服务器错误（临时问题，可重试）
    /// 5xx 错误
    ServerError(String),

    /// 请求错误（不可重试）
    /// 4xx 错误（除认证和限流外）
    RequestError(String),

    /// 配置错误（需要检查配置）
    /// 基础地址非法、组织名缺失等
    ConfigurationError(String),

    /// 未知错误
    Unknown(String),
}

impl ApiError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkError(_) | ApiError::ServerError(_) | ApiError::RateLimitError(_)
        )
    }

    /// 获取用户友好的中文错误信息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ApiError::NetworkError(msg) => {
                format!("网络连接失败，请检查网络设置后重试。详情：{}", msg)
            }
            ApiError::AuthenticationError(msg) => {
                format!("认证失败，请检查访问令牌与组织设置。详情：{}", msg)
            }
            ApiError::RateLimitError(msg) => {
                format!("请求过于频繁，请稍后重试。详情：{}", msg)
            }
            ApiError::ServerError(msg) => {
                format!("报告服务暂时不可用，请稍后重试。详情：{}", msg)
            }
            ApiError::RequestError(msg) => {
                format!("请求失败。详情：{}", msg)
            }
            ApiError::ConfigurationError(msg) => {
                format!("配置错误，请检查连接设置。详情：{}", msg)
            }
            ApiError::Unknown(msg) => {
                format!("发生未知错误。详情：{}", msg)
            }
        }
    }

    /// 获取简短的错误描述
    pub fn short_message(&self) -> &str {
        match self {
            ApiError::NetworkError(_) => "网络连接失败",
            ApiError::AuthenticationError(_) => "认证失败",
            ApiError::RateLimitError(_) => "请求过于频繁",
            ApiError::ServerError(_) => "服务器错误",
            ApiError::RequestError(_) => "请求失败",
            ApiError::ConfigurationError(_) => "配置错误",
            ApiError::Unknown(_) => "未知错误",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &str {
        match self {
            ApiError::NetworkError(_) => "NetworkError",
            ApiError::AuthenticationError(_) => "AuthenticationError",
            ApiError::RateLimitError(_) => "RateLimitError",
            ApiError::ServerError(_) => "ServerError",
            ApiError::RequestError(_) => "RequestError",
            ApiError::ConfigurationError(_) => "ConfigurationError",
            ApiError::Unknown(_) => "Unknown",
        }
    }

    /// 从 HTTP 状态码创建错误
    ///
    /// 报告流请求失败时不读取响应体，错误信息只由状态码推导。
    pub fn from_http_status(status: u16) -> Self {
        let detail = format!("HTTP {} {}", status, status_label(status));
        match status {
            401 | 403 => ApiError::AuthenticationError(detail),
            429 => ApiError::RateLimitError(detail),
            400..=499 => ApiError::RequestError(detail),
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::Unknown(detail),
        }
    }

    /// 从 reqwest 错误创建
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::NetworkError("请求超时".to_string())
        } else if err.is_connect() {
            ApiError::NetworkError("无法连接到报告服务".to_string())
        } else if let Some(status) = err.status() {
            ApiError::from_http_status(status.as_u16())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

/// 常见状态码的标准短语
fn status_label(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_friendly_message())
    }
}

impl Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::from_reqwest_error(&err)
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::ConfigurationError(format!("基础地址非法: {}", err))
    }
}
