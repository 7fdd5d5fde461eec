use crate::{
    error::SuggestError,
    llm::{extract_reply_text, RawReply},
    parse::{self, ParsedReply},
    registry::Protocol,
    sse,
};

/**
 * \brief 把调度结果还原为全文并提取结构化字段。
 * \details JSON 响应体走 `parse_json_reply`；SSE 流先逐块累加，再走三层解析。
 * 解析失败从不报错，只会得到空建议；错误只来自读流过程中的传输故障。
 */
pub async fn normalize(protocol: Protocol, reply: RawReply) -> Result<ParsedReply, SuggestError> {
    match reply {
        RawReply::Json(body) => Ok(parse::parse_json_reply(&extract_reply_text(protocol, &body))),
        RawReply::Stream(stream) => {
            let text = sse::collect_text(stream).await?;
            Ok(parse::parse_structured_text(&text))
        }
    }
}
