use futures_util::{stream::BoxStream, StreamExt};
use serde_json::Value;

use crate::error::SuggestError;

/** \brief 传输层交给归一化器的原始字节流。 */
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, SuggestError>>;

const DONE_SENTINEL: &str = "[DONE]";

/**
 * \brief SSE 读取循环的累加器：已还原文本 + 跨块残留的半行。
 * \details 每次调用只属于一条流；按到达顺序追加，流结束后调用 `finish` 刷出残留行。
 * 同一事件内相邻的纯文本 `data:` 行以换行拼接；JSON 片段之间不加分隔。
 */
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    pending: Vec<u8>,
    /** \brief 当前事件中上一行是否为纯文本 `data:` 负载 */
    in_raw_run: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * \brief 追加一块字节，处理其中所有完整行，最后一段不完整的行留待下次。
     * \details 在字节层面切行，多字节字符被拆在两块之间也不会损坏。
     */
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            self.consume_line(line.trim_end_matches('\r'));
        }
    }

    /** \brief 目前已还原的文本。 */
    pub fn text(&self) -> &str {
        &self.text
    }

    /**
     * \brief 流结束：残留行若以 `data:` 开头按数据行处理，否则原样追加（不补换行）。
     */
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\r');
            if let Some(payload) = data_payload(line) {
                self.consume_data(payload);
            } else if !line.trim().is_empty() && !line.starts_with(':') {
                self.text.push_str(line);
            }
        }
        self.text
    }

    fn consume_line(&mut self, line: &str) {
        if let Some(payload) = data_payload(line) {
            self.consume_data(payload);
            return;
        }
        if line.trim().is_empty() {
            // 事件边界
            self.in_raw_run = false;
            return;
        }
        if line.starts_with(':') {
            return;
        }
        // 信封之外的裸文本行，换行属于原文
        self.in_raw_run = false;
        self.text.push_str(line);
        self.text.push('\n');
    }

    fn consume_data(&mut self, payload: &str) {
        if payload.trim() == DONE_SENTINEL {
            self.in_raw_run = false;
            return;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(v) => {
                self.in_raw_run = false;
                if let Some(fragment) = event_text(&v) {
                    self.text.push_str(fragment);
                }
            }
            Err(_) if payload.trim_start().starts_with('{') => {
                // 半截 JSON 丢弃
                self.in_raw_run = false;
            }
            Err(_) => {
                if self.in_raw_run {
                    self.text.push('\n');
                }
                self.text.push_str(payload);
                self.in_raw_run = true;
            }
        }
    }
}

/**
 * \brief 取 `data:` 之后的负载，去掉一个可选前导空格。
 */
fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/**
 * \brief 按优先级从事件 JSON 中取正文：
 * `content` → `choices[0].delta.content` → `message.content` → `text` → 字符串本身。
 */
pub fn event_text(v: &Value) -> Option<&str> {
    if let Some(s) = v.as_str() {
        return Some(s);
    }
    let candidates = [
        v.get("content"),
        v.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content")),
        v.get("message").and_then(|m| m.get("content")),
        v.get("text"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

/**
 * \brief 读完整条字节流并返回还原后的全文。块之间严格按到达顺序处理。
 */
pub async fn collect_text(mut stream: ByteStream) -> Result<String, SuggestError> {
    let mut acc = StreamAccumulator::new();
    while let Some(chunk) = stream.next().await {
        acc.push(&chunk?);
    }
    Ok(acc.finish())
}
