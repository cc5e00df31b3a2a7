//! 报告流事件解析器
//!
//! 将单个帧的文本解析为类型化的流事件。格式不符或负载非法的帧
//! 只记录日志后丢弃，绝不中断整个流。
//!
//! # 需求覆盖
//!
//! - 需求 2.1: 两行帧结构（event 行 + data 行）
//! - 需求 2.2: section 事件（data 或 error 二选一）
//! - 需求 2.3: complete 事件（生成时间与耗时）
//! - 需求 2.4: error 事件（流级致命错误）
//! - 需求 2.5: 未知事件名前向兼容
//! - 需求 2.6: 非法 JSON 容忍

use crate::models::SectionName;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// 从线上还原出的原始帧
///
/// 生命周期极短：要么立即转换为 [`StreamEvent`]，要么被丢弃。
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 事件名（`event:` 行）
    pub event: String,
    /// 负载原文（`data:` 行，单行 JSON）
    pub data: String,
}

/// 分节事件携带的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    /// 分节数据就绪
    Ready(Value),
    /// 分节生成失败
    Failed(String),
}

/// 类型化的流事件
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// 单个分节的结果
    Section {
        name: SectionName,
        outcome: SectionOutcome,
    },
    /// 代次正常结束，携带服务端统计的元数据
    Complete {
        generated_at: DateTime<Utc>,
        duration_ms: u64,
    },
    /// 流级致命错误
    Fatal { message: String },
}

/// `section` 事件负载
#[derive(Debug, Deserialize)]
struct SectionPayload {
    name: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// `complete` 事件负载
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletePayload {
    generated_at: DateTime<Utc>,
    /// 生成耗时（整数毫秒）
    duration: u64,
}

/// `error` 事件负载
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
}

/// 解析一个帧的文本
///
/// 帧必须恰好包含一个 `event: <name>` 行和紧随其后的一个
/// `data: <json>` 行（行尾的 `\r` 被清理，空行被忽略）。
/// 任何其他形状返回 `None`。
pub fn parse_frame(raw: &str) -> Option<Frame> {
    let mut event: Option<&str> = None;
    let mut data: Option<&str> = None;

    for line in raw.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            if event.is_some() {
                return None;
            }
            event = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data:") {
            // data 行必须跟在 event 行之后，且只允许一行
            if event.is_none() || data.is_some() {
                return None;
            }
            data = Some(rest.strip_prefix(' ').unwrap_or(rest));
        } else {
            return None;
        }
    }

    match (event, data) {
        (Some(event), Some(data)) if !event.is_empty() => Some(Frame {
            event: event.to_string(),
            data: data.to_string(),
        }),
        _ => None,
    }
}

/// 将一个帧解析为类型化事件
///
/// 返回 `None` 表示该帧被丢弃（未知事件、未知分节或负载非法），
/// 调用方继续处理后续帧。
pub fn parse_event(frame: &Frame) -> Option<StreamEvent> {
    match frame.event.as_str() {
        "section" => {
            let payload: SectionPayload = match serde_json::from_str(&frame.data) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::debug!(error = %err, "section 事件负载解析失败，丢弃该帧");
                    return None;
                }
            };
            let name = match SectionName::from_wire(&payload.name) {
                Some(name) => name,
                None => {
                    tracing::debug!(name = %payload.name, "未知的分节名，丢弃该帧");
                    return None;
                }
            };
            // data 与 error 同时出现时以 error 为准
            let outcome = if let Some(message) = payload.error {
                SectionOutcome::Failed(message)
            } else if let Some(data) = payload.data {
                SectionOutcome::Ready(data)
            } else {
                tracing::debug!(name = %payload.name, "section 事件既无 data 也无 error，丢弃该帧");
                return None;
            };
            Some(StreamEvent::Section { name, outcome })
        }
        "complete" => match serde_json::from_str::<CompletePayload>(&frame.data) {
            Ok(payload) => Some(StreamEvent::Complete {
                generated_at: payload.generated_at,
                duration_ms: payload.duration,
            }),
            Err(err) => {
                tracing::debug!(error = %err, "complete 事件负载解析失败，丢弃该帧");
                None
            }
        },
        "error" => match serde_json::from_str::<ErrorPayload>(&frame.data) {
            Ok(payload) => Some(StreamEvent::Fatal {
                message: payload.error,
            }),
            Err(err) => {
                tracing::debug!(error = %err, "error 事件负载解析失败，丢弃该帧");
                None
            }
        },
        other => {
            // 前向兼容：未知事件名直接忽略
            tracing::debug!(event = other, "未知事件类型，忽略该帧");
            None
        }
    }
}

// ============================================================================
// 测试模块
// ============================================================================


// ============================================================================
// 属性测试
// ============================================================================
