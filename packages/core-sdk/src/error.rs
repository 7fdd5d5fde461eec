use thiserror::Error;

/** \brief 付费提示的默认文案（错误体中既无 detail 也无正文时使用）。 */
pub const DEFAULT_PAYMENT_MESSAGE: &str = "余额不足，请充值后继续使用";

/**
 * \brief 建议生成链路中的错误分类。
 * \details 仅 `PaymentRequired` 会越过 `service::suggest` 的边界，其余均降级为占位建议。
 */
#[derive(Debug, Error)]
pub enum SuggestError {
    /** \brief 缺少必填凭据字段，未发起任何网络请求。 */
    #[error("configuration error: {0}")]
    Configuration(String),

    /** \brief 非 2xx 响应（402 特例除外）。 */
    #[error("transport error: status {status}")]
    Transport { status: u16, body: String },

    #[error("payment required: {0}")]
    PaymentRequired(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/**
 * \brief 402 付费提示，作为结构化结果交给调用方。
 */
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payment required: {message}")]
pub struct PaymentRequired {
    pub message: String,
}

/**
 * \brief 从 402 错误体提取可读文案：优先 `detail` 字段，其次原始正文，最后默认文案。
 */
pub fn payment_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = v.get("detail").and_then(|d| d.as_str()) {
            if !detail.trim().is_empty() {
                return detail.to_string();
            }
        }
    }
    let raw = body.trim();
    if raw.is_empty() {
        DEFAULT_PAYMENT_MESSAGE.to_string()
    } else {
        raw.to_string()
    }
}
