//! 报告流配置
//!
//! 控制单个报告代次接收行为的各项参数。
//!
//! # 需求覆盖
//!
//! - 需求 1.4: 缓冲区上限
//! - 需求 4.7: 超时处理
//! - 需求 5.2: 字段默认值

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 报告流配置
///
/// 所有字段都有默认值，配置文件里只需写出需要覆盖的项。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 未闭合帧数据的缓冲区上限（字节）
    ///
    /// 用于限制内存使用，防止异常的超长帧耗尽内存。
    /// 对应需求 1.4
    #[serde(default = "default_max_frame_buffer_size")]
    pub max_frame_buffer_size: usize,

    /// 整个报告流的最大持续时间（毫秒）
    ///
    /// 超过该时间仍未收到终态事件则以超时失败结束代次。
    /// 对应需求 4.7
    #[serde(default = "default_stream_timeout_ms")]
    pub stream_timeout_ms: u64,

    /// chunk 超时时间（毫秒）
    ///
    /// 两个 chunk 之间的最大等待时间。
    /// 对应需求 4.7
    #[serde(default = "default_chunk_timeout_ms")]
    pub chunk_timeout_ms: u64,

    /// 更新通道容量
    ///
    /// 快照与终态事件广播通道的缓冲长度。
    #[serde(default = "default_update_channel_capacity")]
    pub update_channel_capacity: usize,
}

fn default_max_frame_buffer_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_stream_timeout_ms() -> u64 {
    300_000 // 5 分钟
}

fn default_chunk_timeout_ms() -> u64 {
    30_000 // 30 秒
}

fn default_update_channel_capacity() -> usize {
    1000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_frame_buffer_size: default_max_frame_buffer_size(),
            stream_timeout_ms: default_stream_timeout_ms(),
            chunk_timeout_ms: default_chunk_timeout_ms(),
            update_channel_capacity: default_update_channel_capacity(),
        }
    }
}

impl StreamConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置缓冲区上限
    pub fn with_max_frame_buffer_size(mut self, size: usize) -> Self {
        self.max_frame_buffer_size = size;
        self
    }

    /// 设置流超时时间
    pub fn with_stream_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.stream_timeout_ms = timeout_ms;
        self
    }

    /// 设置 chunk 超时时间
    pub fn with_chunk_timeout_ms(mut self, chunk_timeout_ms: u64) -> Self {
        self.chunk_timeout_ms = chunk_timeout_ms;
        self
    }

    /// 设置更新通道容量
    pub fn with_update_channel_capacity(mut self, capacity: usize) -> Self {
        self.update_channel_capacity = capacity;
        self
    }

    /// 获取流超时 Duration
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }

    /// 获取 chunk 超时 Duration
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_timeout_ms)
    }
}

// ============================================================================
// 测试模块
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.max_frame_buffer_size, 1024 * 1024);
        assert_eq!(config.stream_timeout_ms, 300_000);
        assert_eq!(config.chunk_timeout_ms, 30_000);
        assert_eq!(config.update_channel_capacity, 1000);
    }

    #[test]
    fn test_builder_methods() {
        let config = StreamConfig::new()
            .with_max_frame_buffer_size(64 * 1024)
            .with_stream_timeout_ms(60_000)
            .with_chunk_timeout_ms(5_000)
            .with_update_channel_capacity(16);
        assert_eq!(config.max_frame_buffer_size, 64 * 1024);
        assert_eq!(config.stream_timeout(), Duration::from_secs(60));
        assert_eq!(config.chunk_timeout(), Duration::from_secs(5));
        assert_eq!(config.update_channel_capacity, 16);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: StreamConfig = toml::from_str("chunk_timeout_ms = 5000").unwrap();
        assert_eq!(config.chunk_timeout_ms, 5_000);
        assert_eq!(config.stream_timeout_ms, 300_000);
        assert_eq!(config.max_frame_buffer_size, 1024 * 1024);
    }
}
