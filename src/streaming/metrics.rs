//! 报告流指标类型
//!
//! 定义单个报告代次的传输与解析统计数据。
//!
//! # 需求覆盖
//!
//! - 需求 6.2: 记录流指标（TTFB、chunk 与帧计数、丢弃率）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 报告流指标
///
/// 每个代次创建一个实例，终态时通过 [`log_metrics`](Self::log_metrics)
/// 输出结构化日志。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetrics {
    /// 首字节时间（毫秒）
    ///
    /// 从代次启动到收到第一个响应字节的时间。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<u64>,

    /// chunk 数量
    pub chunk_count: u32,

    /// 接收到的总字节数
    pub total_bytes: usize,

    /// 解码出的完整帧数量
    pub frame_count: u32,

    /// 成功解析并应用的事件数量
    pub event_count: u32,

    /// 被丢弃的帧数量（形状不符、负载非法或事件未知）
    pub dropped_frame_count: u32,

    /// 代次开始时间
    pub start_time: DateTime<Utc>,

    /// 代次结束时间（如果已结束）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// 首个 chunk 时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_chunk_time: Option<DateTime<Utc>>,

    /// 最后一个 chunk 时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_time: Option<DateTime<Utc>>,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self {
            ttfb_ms: None,
            chunk_count: 0,
            total_bytes: 0,
            frame_count: 0,
            event_count: 0,
            dropped_frame_count: 0,
            start_time: Utc::now(),
            end_time: None,
            first_chunk_time: None,
            last_chunk_time: None,
        }
    }
}

impl StreamMetrics {
    /// 创建新的指标实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录收到第一个 chunk
    ///
    /// 自动计算 TTFB 并记录首个 chunk 时间。
    pub fn record_first_chunk(&mut self) {
        let now = Utc::now();
        self.first_chunk_time = Some(now);
        self.ttfb_ms = Some((now - self.start_time).num_milliseconds().max(0) as u64);
    }

    /// 记录收到一个 chunk
    pub fn record_chunk(&mut self, bytes: usize) {
        self.chunk_count += 1;
        self.total_bytes += bytes;
        self.last_chunk_time = Some(Utc::now());

        if self.first_chunk_time.is_none() {
            self.record_first_chunk();
        }
    }

    /// 记录解码出的完整帧
    pub fn record_frames(&mut self, count: u32) {
        self.frame_count += count;
    }

    /// 记录成功应用的事件
    pub fn record_event(&mut self) {
        self.event_count += 1;
    }

    /// 记录被丢弃的帧
    pub fn record_dropped_frame(&mut self) {
        self.dropped_frame_count += 1;
    }

    /// 代次结束，记录结束时间
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// 获取总耗时（毫秒）
    ///
    /// 代次已结束时返回开始到结束的时间，否则返回开始到现在的时间。
    pub fn duration_ms(&self) -> u64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds().max(0) as u64
    }

    /// 获取平均 chunk 间隔（毫秒）
    ///
    /// chunk 数量少于 2 时返回 None。
    pub fn avg_chunk_interval_ms(&self) -> Option<f64> {
        if self.chunk_count < 2 {
            return None;
        }

        let first = self.first_chunk_time?;
        let last = self.last_chunk_time?;
        let interval_ms = (last - first).num_milliseconds().max(0) as f64;
        Some(interval_ms / (self.chunk_count - 1) as f64)
    }

    /// 获取吞吐量（字节/秒）
    ///
    /// 耗时为 0 时返回 None。
    pub fn throughput_bytes_per_sec(&self) -> Option<f64> {
        let duration_ms = self.duration_ms();
        if duration_ms == 0 {
            return None;
        }
        Some(self.total_bytes as f64 / (duration_ms as f64 / 1000.0))
    }

    /// 获取帧丢弃率
    ///
    /// 被丢弃的帧数量 / 解码出的帧数量。帧数量为 0 时返回 0.0。
    pub fn drop_rate(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.dropped_frame_count as f64 / self.frame_count as f64
    }

    /// 判断代次是否已结束
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// 转换为摘要字符串
    pub fn summary(&self) -> String {
        let duration = self.duration_ms();
        let ttfb = self
            .ttfb_ms
            .map(|t| format!("{}ms", t))
            .unwrap_or_else(|| "N/A".to_string());
        let throughput = self
            .throughput_bytes_per_sec()
            .map(|t| format!("{:.2} KB/s", t / 1024.0))
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "chunks: {}, bytes: {}, frames: {}, events: {}, dropped: {}, duration: {}ms, ttfb: {}, throughput: {}",
            self.chunk_count,
            self.total_bytes,
            self.frame_count,
            self.event_count,
            self.dropped_frame_count,
            duration,
            ttfb,
            throughput
        )
    }

    /// 记录详细指标到日志
    pub fn log_metrics(&self, generation: u64) {
        let throughput = self.throughput_bytes_per_sec().unwrap_or(0.0);
        let drop_rate = self.drop_rate();
        let avg_interval = self.avg_chunk_interval_ms().unwrap_or(0.0);

        info!(
            generation,
            chunk_count = self.chunk_count,
            total_bytes = self.total_bytes,
            frame_count = self.frame_count,
            event_count = self.event_count,
            dropped_frame_count = self.dropped_frame_count,
            duration_ms = self.duration_ms(),
            ttfb_ms = ?self.ttfb_ms,
            throughput_kbps = format!("{:.2}", throughput / 1024.0),
            avg_chunk_interval_ms = format!("{:.2}", avg_interval),
            drop_rate = format!("{:.4}", drop_rate),
            "活动报告流指标"
        );
    }
}

// ============================================================================
// 测试模块
// ============================================================================
