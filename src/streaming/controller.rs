//! 报告流控制器
//!
//! 驱动一次报告代次的完整生命周期：建立连接、读取 chunk、解码帧、
//! 解析事件、更新聚合器，并在每次状态变更后向订阅方广播快照。
//! 同一控制器实例同时只允许一个活动代次，启动新代次会隐式取消
//! 进行中的代次；过期代次的任何发布都会被发布闸门拦截，绝不会
//! 覆盖新代次的状态。
//!
//! # 需求覆盖
//!
//! - 需求 4.1: 建立携带日期范围与凭证的流式请求
//! - 需求 4.2: 非 2xx 响应立即以失败终态结束，不读取响应体
//! - 需求 4.3: 每次状态变更后发布快照
//! - 需求 4.4: 取消后不再发布该代次的任何更新
//! - 需求 4.5: 传输在终态事件之前结束时合成"意外关闭"失败
//! - 需求 4.6: 新代次隐式取消进行中的代次
//! - 需求 4.7: chunk 间隔与整体时长超时

use crate::credential::Credentials;
use crate::models::{DateRange, Report, TerminalStatus};
use crate::providers::ReportStreamProvider;
use crate::streaming::aggregator::ReportAggregator;
use crate::streaming::config::StreamConfig;
use crate::streaming::decoder::FrameDecoder;
use crate::streaming::error::StreamError;
use crate::streaming::metrics::StreamMetrics;
use crate::streaming::parser::{parse_event, parse_frame, StreamEvent};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 报告更新事件
///
/// 通过广播通道发送给界面侧订阅者，每个事件都带所属代次编号。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReportUpdate {
    /// 状态变更后的报告快照
    #[serde(rename_all = "camelCase")]
    Snapshot { generation: u64, report: Report },
    /// 代次终态
    #[serde(rename_all = "camelCase")]
    Terminal {
        generation: u64,
        status: TerminalStatus,
    },
}

impl ReportUpdate {
    /// 事件所属的代次编号
    pub fn generation(&self) -> u64 {
        match self {
            ReportUpdate::Snapshot { generation, .. } => *generation,
            ReportUpdate::Terminal { generation, .. } => *generation,
        }
    }

    /// 是否为终态事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportUpdate::Terminal { .. })
    }
}

/// 发布闸门
///
/// 记录当前活动代次与终态发送情况。所有发布都要先过闸门：
/// 过期代次、已发终态之后以及已取消的代次的发布全部被拦截。
#[derive(Debug, Default)]
struct EmissionGate {
    /// 当前活动代次
    generation: u64,
    /// 当前代次的终态是否已发送
    terminal_sent: bool,
    /// 当前代次是否已被调用方取消
    cancelled: bool,
}

/// 控制器内部共享状态
///
/// 代次任务持有 `Arc<ControllerInner>`，发布统一走
/// [`ControllerInner::publish`]。
struct ControllerInner {
    provider: Arc<dyn ReportStreamProvider>,
    config: StreamConfig,
    update_sender: broadcast::Sender<ReportUpdate>,
    gate: Mutex<EmissionGate>,
    /// 最近一次通过闸门的快照（拉模型访问用）
    latest: Mutex<Report>,
}

impl ControllerInner {
    /// 发布一个更新事件
    ///
    /// 返回 false 表示事件被闸门拦截（代次过期、终态已发或已取消），
    /// 代次任务据此尽快退出。
    fn publish(&self, update: ReportUpdate) -> bool {
        let mut gate = self.gate.lock();
        if update.generation() != gate.generation || gate.terminal_sent || gate.cancelled {
            tracing::debug!(
                generation = update.generation(),
                active = gate.generation,
                "更新被发布闸门拦截"
            );
            return false;
        }
        match &update {
            ReportUpdate::Snapshot { report, .. } => {
                *self.latest.lock() = report.clone();
            }
            ReportUpdate::Terminal { .. } => {
                gate.terminal_sent = true;
            }
        }
        drop(gate);

        // 没有订阅者时发送失败是正常情况
        let _ = self.update_sender.send(update);
        true
    }

    /// 当前代次是否仍然活跃（未取消且编号一致）
    fn is_active(&self, generation: u64) -> bool {
        let gate = self.gate.lock();
        gate.generation == generation && !gate.cancelled && !gate.terminal_sent
    }
}

/// 报告流控制器
///
/// # 示例
///
/// ```ignore
/// let controller = ReportStreamController::new(provider, StreamConfig::default());
/// let mut updates = controller.subscribe();
/// controller.start(range, credentials);
///
/// while let Ok(update) = updates.recv().await {
///     match update {
///         ReportUpdate::Snapshot { report, .. } => render(&report),
///         ReportUpdate::Terminal { status, .. } => break,
///     }
/// }
/// ```
pub struct ReportStreamController {
    inner: Arc<ControllerInner>,
    /// 代次编号分配器，只增不减
    generation: AtomicU64,
    /// 当前代次的取消令牌
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl ReportStreamController {
    /// 创建控制器
    pub fn new(provider: Arc<dyn ReportStreamProvider>, config: StreamConfig) -> Self {
        let (update_sender, _) = broadcast::channel(config.update_channel_capacity);
        Self {
            inner: Arc::new(ControllerInner {
                provider,
                config,
                update_sender,
                gate: Mutex::new(EmissionGate::default()),
                latest: Mutex::new(Report::new()),
            }),
            generation: AtomicU64::new(0),
            cancel_token: Mutex::new(None),
        }
    }

    /// 订阅报告更新事件
    pub fn subscribe(&self) -> broadcast::Receiver<ReportUpdate> {
        self.inner.update_sender.subscribe()
    }

    /// 将订阅接收端适配为 `futures::Stream`
    ///
    /// 落后于广播缓冲（Lagged）时跳过被挤掉的事件继续接收。
    pub fn updates(&self) -> impl Stream<Item = ReportUpdate> {
        let mut receiver = self.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(update) => yield update,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "订阅者落后于广播缓冲，跳过部分更新");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// 最近一次发布的报告快照（拉模型）
    pub fn latest(&self) -> Report {
        self.inner.latest.lock().clone()
    }

    /// 当前代次编号（诊断用）
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 启动一次新的报告代次
    ///
    /// 进行中的代次被隐式取消；结果通过订阅通道送达。返回新代次
    /// 的编号，供日志关联。
    pub fn start(&self, range: DateRange, credentials: Credentials) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // 先取消旧代次，再打开新代次的闸门
        let token = CancellationToken::new();
        {
            let mut slot = self.cancel_token.lock();
            if let Some(previous) = slot.take() {
                previous.cancel();
            }
            *slot = Some(token.clone());
        }
        {
            let mut gate = self.inner.gate.lock();
            gate.generation = generation;
            gate.terminal_sent = false;
            gate.cancelled = false;
        }

        tracing::info!(generation, range = %range, "启动报告代次");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            run_generation(inner, generation, range, credentials, token).await;
        });

        generation
    }

    /// 取消当前代次
    ///
    /// 取消后该代次不再发布任何快照或终态（调用方主动取消，无需
    /// 再收到通知）。
    pub fn cancel(&self) {
        {
            let mut gate = self.inner.gate.lock();
            gate.cancelled = true;
        }
        if let Some(token) = self.cancel_token.lock().take() {
            token.cancel();
        }
        tracing::info!(
            generation = self.generation.load(Ordering::SeqCst),
            "报告代次已取消"
        );
    }
}

/// 代次任务：一次报告代次的完整读取循环
async fn run_generation(
    inner: Arc<ControllerInner>,
    generation: u64,
    range: DateRange,
    credentials: Credentials,
    token: CancellationToken,
) {
    let request_id = Uuid::new_v4();
    let mut metrics = StreamMetrics::new();
    let mut aggregator = ReportAggregator::new();
    let mut decoder = FrameDecoder::with_max_buffer_size(inner.config.max_frame_buffer_size);

    // 初始快照：全部分节 Pending，界面据此进入加载态
    if !inner.publish(ReportUpdate::Snapshot {
        generation,
        report: aggregator.snapshot(),
    }) {
        return;
    }

    let mut stream = match inner
        .provider
        .open_stream(&range, &credentials, request_id)
        .await
    {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(generation, error = %err, "报告流连接建立失败");
            fail(&inner, generation, &mut aggregator, err.user_friendly_message());
            metrics.finish();
            metrics.log_metrics(generation);
            return;
        }
    };

    let deadline = Instant::now() + inner.config.stream_timeout();
    let chunk_timeout = inner.config.chunk_timeout();
    let mut terminal_seen = false;

    'read: loop {
        let chunk = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(generation, "读取循环收到取消信号");
                break 'read;
            }
            _ = sleep_until(deadline) => {
                fail(&inner, generation, &mut aggregator, StreamError::Timeout.user_message());
                terminal_seen = true;
                break 'read;
            }
            next = timeout(chunk_timeout, stream.next()) => match next {
                Err(_) => {
                    fail(&inner, generation, &mut aggregator, StreamError::Timeout.user_message());
                    terminal_seen = true;
                    break 'read;
                }
                Ok(chunk) => chunk,
            },
        };

        match chunk {
            Some(Ok(bytes)) => {
                metrics.record_chunk(bytes.len());
                let frames = match decoder.push(&bytes) {
                    Ok(frames) => frames,
                    Err(err) => {
                        fail(&inner, generation, &mut aggregator, err.user_message());
                        terminal_seen = true;
                        break 'read;
                    }
                };
                metrics.record_frames(frames.len() as u32);

                for raw in frames {
                    let event = match parse_frame(&raw).as_ref().and_then(parse_event) {
                        Some(event) => {
                            metrics.record_event();
                            event
                        }
                        None => {
                            metrics.record_dropped_frame();
                            continue;
                        }
                    };

                    match event {
                        StreamEvent::Section { name, outcome } => {
                            let snapshot = aggregator.apply_section(name, outcome);
                            if !inner.publish(ReportUpdate::Snapshot {
                                generation,
                                report: snapshot,
                            }) {
                                break 'read;
                            }
                        }
                        StreamEvent::Complete {
                            generated_at,
                            duration_ms,
                        } => {
                            let snapshot = aggregator.apply_complete(generated_at, duration_ms);
                            inner.publish(ReportUpdate::Snapshot {
                                generation,
                                report: snapshot,
                            });
                            inner.publish(ReportUpdate::Terminal {
                                generation,
                                status: TerminalStatus::Completed {
                                    generated_at,
                                    duration_ms,
                                },
                            });
                            terminal_seen = true;
                            break 'read;
                        }
                        StreamEvent::Fatal { message } => {
                            fail(&inner, generation, &mut aggregator, message);
                            terminal_seen = true;
                            break 'read;
                        }
                    }
                }
            }
            Some(Err(err)) => {
                tracing::warn!(generation, error = %err, "报告流读取错误");
                fail(&inner, generation, &mut aggregator, err.user_message());
                terminal_seen = true;
                break 'read;
            }
            None => {
                // 传输自然结束但没有终态事件：按意外关闭处理
                let discarded = decoder.close();
                if discarded > 0 {
                    tracing::debug!(generation, discarded, "传输结束时丢弃未闭合的残留字节");
                }
                fail(&inner, generation, &mut aggregator, StreamError::Closed.user_message());
                terminal_seen = true;
                break 'read;
            }
        }
    }

    if !terminal_seen && inner.is_active(generation) {
        // 只有发布被闸门拦截才会走到这里；正常取消不补发终态
        tracing::debug!(generation, "读取循环退出但代次仍活跃");
    }

    metrics.finish();
    metrics.log_metrics(generation);
}

/// 以失败终态结束代次：先发布标记失败的快照，再发布终态事件
fn fail(
    inner: &ControllerInner,
    generation: u64,
    aggregator: &mut ReportAggregator,
    message: String,
) {
    let snapshot = aggregator.apply_fatal_error(message.clone());
    inner.publish(ReportUpdate::Snapshot {
        generation,
        report: snapshot,
    });
    inner.publish(ReportUpdate::Terminal {
        generation,
        status: TerminalStatus::Failed { message },
    });
}

// ============================================================================
// 测试模块
// ============================================================================
