//! 报告流帧解码器
//!
//! 将到达边界完全任意的字节流还原为以空行分隔的完整帧序列，
//! 支持增量解码与跨 chunk 的帧重组。
//!
//! # 需求覆盖
//!
//! - 需求 1.1: 任意分块边界下的帧重组
//! - 需求 1.2: 不完整的尾部数据保留到下一个 chunk
//! - 需求 1.3: 传输结束时丢弃未闭合的残留数据
//! - 需求 1.4: 缓冲区上限保护
//! - 需求 1.5: 仅含空白的内容不产生帧

use crate::streaming::error::StreamError;

/// 解码器状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderState {
    /// 等待数据
    Idle,
    /// 正在解码
    Decoding,
    /// 传输已结束
    Closed,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::Idle
    }
}

/// 报告流帧解码器
///
/// 帧以空行分隔（连续两个换行符，兼容 CRLF 写法）。缓冲区按字节持有，
/// 只有在看到完整分隔符之后才把一段字节转换为帧文本，因此多字节
/// UTF-8 字符被 chunk 边界切开也不会产生乱码。
///
/// # 示例
///
/// ```ignore
/// let mut decoder = FrameDecoder::new();
///
/// let frames = decoder.push(chunk)?;
/// for frame in frames {
///     // 交给事件解析器处理
/// }
///
/// // 传输结束，丢弃未闭合的残留
/// let discarded = decoder.close();
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    /// 缓冲区，保存最后一个分隔符之后的字节
    buffer: Vec<u8>,

    /// 当前状态
    state: DecoderState,

    /// 未闭合数据的最大字节数（防止内存耗尽）
    max_buffer_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// 默认最大缓冲区大小 (1MB)
    pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

    /// 创建新的解码器
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: DecoderState::Idle,
            max_buffer_size: Self::DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// 创建带自定义缓冲区上限的解码器
    pub fn with_max_buffer_size(max_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            state: DecoderState::Idle,
            max_buffer_size: max_size,
        }
    }

    /// 获取当前状态
    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// 获取缓冲区当前字节数
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// 重置解码器，准备服务新的代次
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Idle;
    }

    /// 处理接收到的字节
    ///
    /// 追加到缓冲区后抽取所有已闭合的帧，按到达顺序返回；最后一段
    /// 不完整的数据留在缓冲区等待后续 chunk。
    ///
    /// # 参数
    ///
    /// * `chunk` - 接收到的字节数据
    ///
    /// # 返回
    ///
    /// 完整帧的文本列表；若未闭合数据超过上限则返回
    /// [`StreamError::BufferOverflow`]。
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, StreamError> {
        if self.state == DecoderState::Closed {
            tracing::debug!(bytes = chunk.len(), "解码器已关闭，丢弃后续数据");
            return Ok(Vec::new());
        }
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        if self.state == DecoderState::Idle {
            self.state = DecoderState::Decoding;
        }

        self.buffer.extend_from_slice(chunk);
        let frames = self.drain_frames();

        // 抽完完整帧之后，剩下的必须是一个未闭合的帧前缀
        if self.buffer.len() > self.max_buffer_size {
            return Err(StreamError::BufferOverflow);
        }

        Ok(frames)
    }

    /// 传输结束
    ///
    /// 未以分隔符闭合的残留数据不可信，直接丢弃。
    ///
    /// # 返回
    ///
    /// 被丢弃的字节数（供调用方记录日志）。
    pub fn close(&mut self) -> usize {
        let discarded = self.buffer.len();
        self.buffer.clear();
        self.state = DecoderState::Closed;
        discarded
    }

    /// 从缓冲区中抽取所有已闭合的帧
    fn drain_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        let mut pos = 0;
        let mut i = 0;

        while i < self.buffer.len() {
            if self.buffer[i] != b'\n' {
                i += 1;
                continue;
            }

            // buffer[i] 结束了一行，检查随后是否为空行:
            // 形式一 "\n\n"，形式二 "\n\r\n"
            let delimiter_len = match (self.buffer.get(i + 1), self.buffer.get(i + 2)) {
                (Some(b'\n'), _) => 2,
                (Some(b'\r'), Some(b'\n')) => 3,
                // 尾部字节不足以判断，保留等待更多数据
                (None, _) | (Some(b'\r'), None) => break,
                _ => {
                    i += 1;
                    continue;
                }
            };

            let segment = &self.buffer[pos..i];
            // 仅含空白的段不构成帧
            if !segment.iter().all(|b| b.is_ascii_whitespace()) {
                frames.push(String::from_utf8_lossy(segment).into_owned());
            }

            pos = i + delimiter_len;
            i = pos;
        }

        if pos > 0 {
            self.buffer.drain(..pos);
        }

        frames
    }
}

// ============================================================================
// 测试模块
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_new() {
        let decoder = FrameDecoder::new();
        assert_eq!(decoder.state(), &DecoderState::Idle);
        assert_eq!(decoder.buffer_size(), 0);
    }

    #[test]
    fn test_single_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder
            .push(b"event: section\ndata: {\"name\":\"builds\"}\n\n")
            .unwrap();
        assert_eq!(frames, vec!["event: section\ndata: {\"name\":\"builds\"}"]);
        assert_eq!(decoder.buffer_size(), 0);
    }

    #[test]
    fn test_multiple_frames_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder
            .push(b"event: a\ndata: {}\n\nevent: b\ndata: {}\n\n")
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], "event: a\ndata: {}");
        assert_eq!(frames[1], "event: b\ndata: {}");
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: sect").unwrap();
        assert!(frames.is_empty());
        assert!(decoder.buffer_size() > 0);

        let frames = decoder.push(b"ion\ndata: {\"x\":1}\n\n").unwrap();
        assert_eq!(frames, vec!["event: section\ndata: {\"x\":1}"]);
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        // 分隔符的两个换行符分属两个 chunk
        let frames = decoder.push(b"event: a\ndata: {}\n").unwrap();
        assert!(frames.is_empty());
        let frames = decoder.push(b"\n").unwrap();
        assert_eq!(frames, vec!["event: a\ndata: {}"]);
    }

    #[test]
    fn test_one_byte_chunks() {
        let stream = b"event: a\ndata: {\"v\":1}\n\nevent: b\ndata: {\"v\":2}\n\n";
        let mut decoder = FrameDecoder::new();
        let mut collected = Vec::new();
        for byte in stream.iter() {
            collected.extend(decoder.push(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(
            collected,
            vec!["event: a\ndata: {\"v\":1}", "event: b\ndata: {\"v\":2}"]
        );
    }

    #[test]
    fn test_crlf_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: a\r\ndata: {}\r\n\r\n").unwrap();
        // 行内的 \r 保留，由事件解析器按行清理
        assert_eq!(frames, vec!["event: a\r\ndata: {}\r"]);
    }

    #[test]
    fn test_crlf_delimiter_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: a\r\ndata: {}\r\n\r").unwrap();
        assert!(frames.is_empty());
        let frames = decoder.push(b"\n").unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"\n\n\n\n").unwrap().is_empty());
        assert!(decoder.push(b"   \n\n").unwrap().is_empty());
    }

    #[test]
    fn test_close_discards_partial() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"event: a\ndata: {}\n\nevent: tail").unwrap();
        let discarded = decoder.close();
        assert_eq!(discarded, "event: tail".len());
        assert_eq!(decoder.state(), &DecoderState::Closed);

        // 关闭后的数据被忽略
        assert!(decoder.push(b"event: b\ndata: {}\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"partial frame").unwrap();
        decoder.close();
        decoder.reset();
        assert_eq!(decoder.state(), &DecoderState::Idle);
        assert_eq!(decoder.buffer_size(), 0);
        let frames = decoder.push(b"event: a\ndata: {}\n\n").unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_buffer_overflow_protection() {
        let mut decoder = FrameDecoder::with_max_buffer_size(32);
        let long_line = vec![b'x'; 64];
        let err = decoder.push(&long_line).unwrap_err();
        assert_eq!(err, StreamError::BufferOverflow);
    }

    #[test]
    fn test_large_chunk_with_many_frames_not_overflow() {
        // 上限约束的是未闭合的尾部，而不是单个 chunk 的大小
        let mut decoder = FrameDecoder::with_max_buffer_size(32);
        let chunk = b"event: a\ndata: {}\n\n".repeat(10);
        let frames = decoder.push(&chunk).unwrap();
        assert_eq!(frames.len(), 10);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let stream = "event: section\ndata: {\"msg\":\"构建失败\"}\n\n".as_bytes();
        let mut decoder = FrameDecoder::new();
        let mut collected = Vec::new();
        // 逐字节喂入，多字节字符必然被切开
        for byte in stream.iter() {
            collected.extend(decoder.push(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(collected, vec!["event: section\ndata: {\"msg\":\"构建失败\"}"]);
    }

    #[test]
    fn test_empty_input() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"").unwrap().is_empty());
        assert_eq!(decoder.state(), &DecoderState::Idle);
    }
}

// ============================================================================
// 属性测试
// ============================================================================
