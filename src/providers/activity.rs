//! 活动报告流 Provider
//!
//! 负责建立活动报告的流式 HTTP 连接：拼接日期范围查询参数、附加
//! 认证与组织范围请求头、检查响应状态，并把响应体转换为统一的
//! 字节流类型交给流控制器。
//!
//! # 需求覆盖
//!
//! - 需求 4.1: 请求携带日期范围查询参数与认证请求头
//! - 需求 4.2: 非 2xx 响应立即失败，不读取响应体

use crate::credential::{Credentials, ORGANIZATION_HEADER};
use crate::models::DateRange;
use crate::providers::ApiError;
use crate::streaming::StreamError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// 流式响应类型别名
///
/// 一个异步字节流，每个 Item 是一个 chunk 的字节数据或错误。
/// 使用 `Pin<Box<...>>` 以支持动态分发和异步迭代。
pub type StreamResponse = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// 报告流 Provider Trait
///
/// 流控制器通过该接口建立连接，测试时可以用脚本化的实现替换
/// 真实网络。
#[async_trait]
pub trait ReportStreamProvider: Send + Sync {
    /// 打开一次活动报告流
    ///
    /// # Arguments
    ///
    /// * `range` - 已通过边界校验的日期范围
    /// * `credentials` - 组织范围与认证方式
    /// * `request_id` - 请求关联 ID，写入请求头供服务端日志关联
    ///
    /// # Returns
    ///
    /// * `Ok(StreamResponse)` - 连接建立成功，返回响应体字节流
    /// * `Err(ApiError)` - 连接建立失败（网络错误或非 2xx 状态）
    async fn open_stream(
        &self,
        range: &DateRange,
        credentials: &Credentials,
        request_id: Uuid,
    ) -> Result<StreamResponse, ApiError>;
}

/// 默认的报告服务基础地址
const DEFAULT_BASE_URL: &str = "https://pulseboard.dev/api";

/// 流端点相对路径
const STREAM_ENDPOINT: &str = "activity/report/stream";

/// 连接建立超时（秒）
///
/// 只约束建立连接与收到响应头，不约束流本身的持续时间。
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 活动报告流 Provider（真实网络实现）
#[derive(Debug)]
pub struct ActivityReportProvider {
    base_url: Url,
    client: Client,
}

impl ActivityReportProvider {
    /// 使用默认基础地址创建 Provider
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL).expect("默认基础地址必须合法")
    }

    /// 使用自定义基础地址创建 Provider
    ///
    /// 地址末尾带不带 `/` 都能正确拼接端点。
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::ConfigurationError(format!("HTTP 客户端创建失败: {}", e)))?;
        Ok(Self { base_url, client })
    }

    /// 基础地址
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 构建完整的流端点 URL（含日期范围查询参数）
    fn build_url(&self, range: &DateRange) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(STREAM_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("startDate", &range.start_param())
            .append_pair("endDate", &range.end_param());
        Ok(url)
    }
}

impl Default for ActivityReportProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStreamProvider for ActivityReportProvider {
    async fn open_stream(
        &self,
        range: &DateRange,
        credentials: &Credentials,
        request_id: Uuid,
    ) -> Result<StreamResponse, ApiError> {
        let url = self.build_url(range)?;

        tracing::info!(
            url = %url,
            organization = credentials.organization(),
            request_id = %request_id,
            "建立活动报告流连接"
        );

        let response = self
            .client
            .get(url)
            .header("Authorization", credentials.authorization_header())
            .header(ORGANIZATION_HEADER, credentials.organization())
            .header("Accept", "text/event-stream")
            .header("X-Request-Id", request_id.to_string())
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            // 不读取响应体，立刻释放连接
            tracing::warn!(
                status = status.as_u16(),
                request_id = %request_id,
                "报告服务返回非 2xx 状态"
            );
            return Err(ApiError::from_http_status(status.as_u16()));
        }

        Ok(reqwest_stream_to_stream_response(response))
    }
}

/// 将 reqwest 的 bytes_stream 转换为 StreamResponse
///
/// 辅助函数，用于把 reqwest 的响应流统一为 [`StreamResponse`] 类型。
pub fn reqwest_stream_to_stream_response(response: reqwest::Response) -> StreamResponse {
    use futures::StreamExt;

    let stream = response.bytes_stream().map(|result| result.map_err(StreamError::from));

    Box::pin(stream)
}

// ============================================================================
// 测试模块
// ============================================================================
