use futures_util::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, RequestBuilder, Response, StatusCode,
};
use serde_json::{json, Value};

use crate::{
    composer::{self, ComposedPrompt},
    error::{payment_message, SuggestError},
    models::{ApiConfig, RequestContext},
    registry::{Protocol, ProviderId},
    sse::ByteStream,
    telemetry,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const PROBE_MAX_TOKENS: u32 = 10;
const PROBE_PROMPT: &str = "Hi";

/**
 * \brief 校验后的凭据。custom 必须同时有 base_url 与 token，其余 Provider 必须有 api_key。
 */
#[derive(Clone)]
pub struct Credentials {
    pub provider: ProviderId,
    /** \brief api_key，或 custom 的 Bearer Token */
    pub secret: String,
    pub model: String,
    /** \brief 已去除末尾斜杠的基地址 */
    pub base_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("secret", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Credentials {
    /**
     * \brief 由前端配置解析凭据；缺字段在发起网络请求前即以 Configuration 错误拒绝。
     */
    pub fn from_config(config: &ApiConfig) -> Result<Self, SuggestError> {
        let provider: ProviderId = config.provider.parse()?;
        let descriptor = provider.descriptor();
        let override_base = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty());

        let (secret, base_url) = match provider {
            ProviderId::Custom => {
                let token = config
                    .token
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        SuggestError::Configuration("custom provider requires a token".into())
                    })?;
                let base = override_base.ok_or_else(|| {
                    SuggestError::Configuration("custom provider requires a base url".into())
                })?;
                (token.to_string(), base.to_string())
            }
            _ => {
                let key = config.api_key.trim();
                if key.is_empty() {
                    return Err(SuggestError::Configuration(format!(
                        "{provider} requires an api key"
                    )));
                }
                (
                    key.to_string(),
                    override_base.unwrap_or(descriptor.base_url).to_string(),
                )
            }
        };

        let model = match config.model.trim() {
            "" => descriptor.default_model().unwrap_or_default().to_string(),
            m => m.to_string(),
        };

        Ok(Self {
            provider,
            secret,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        match self.provider.protocol() {
            Protocol::Anthropic => format!("{}/messages", self.base_url),
            Protocol::OpenAiCompatible => format!("{}/chat/completions", self.base_url),
            Protocol::CustomSse => format!("{}/api/chat/completions", self.base_url),
        }
    }
}

/**
 * \brief 调度结果：同步 JSON 响应体，或仍在接收中的 SSE 字节流。
 */
pub enum RawReply {
    Json(Value),
    Stream(ByteStream),
}

impl std::fmt::Debug for RawReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawReply::Json(v) => f.debug_tuple("Json").field(v).finish(),
            RawReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/**
 * \brief 发送一次请求（不重试），按 Provider 的协议选择请求形态。
 * \param prompt  自然语言指令，custom 协议下不使用
 * \param context 原始结构化上下文，仅 custom 协议使用
 */
pub async fn dispatch(
    client: &Client,
    creds: &Credentials,
    prompt: &ComposedPrompt,
    context: &RequestContext,
) -> Result<RawReply, SuggestError> {
    let url = creds.endpoint();
    telemetry::log_event(
        "llm.dispatch",
        &format!(
            "provider={} model={} url={}",
            creds.provider, creds.model, url
        ),
    );

    match creds.provider.protocol() {
        Protocol::Anthropic => {
            let body = json!({
                "model": creds.model,
                "max_tokens": MAX_TOKENS,
                "system": prompt.instructions,
                "messages": [{"role": "user", "content": prompt.user_turn}],
            });
            let resp = apply_auth(client.post(url), creds)?.json(&body).send().await?;
            let resp = check_status(creds, resp).await?;
            Ok(RawReply::Json(resp.json().await?))
        }
        Protocol::OpenAiCompatible => {
            let body = json!({
                "model": creds.model,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    {"role": "system", "content": prompt.instructions},
                    {"role": "user", "content": prompt.user_turn},
                ],
                "response_format": {"type": "json_object"},
            });
            let resp = apply_auth(client.post(url), creds)?.json(&body).send().await?;
            let resp = check_status(creds, resp).await?;
            Ok(RawReply::Json(resp.json().await?))
        }
        Protocol::CustomSse => {
            let body = composer::structured_payload(context, &creds.model);
            let resp = apply_auth(client.post(url), creds)?
                .header(ACCEPT, "text/event-stream")
                .json(&body)
                .send()
                .await?;
            let resp = check_status(creds, resp).await?;
            let stream = resp
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(SuggestError::from))
                .boxed();
            Ok(RawReply::Stream(stream))
        }
    }
}

/**
 * \brief 连通性探测：一次最小请求，任何 2xx 即视为成功，不读取响应体。
 */
pub async fn probe(client: &Client, creds: &Credentials) -> Result<(), SuggestError> {
    let body = match creds.provider.protocol() {
        Protocol::Anthropic | Protocol::OpenAiCompatible => json!({
            "model": creds.model,
            "max_tokens": PROBE_MAX_TOKENS,
            "messages": [{"role": "user", "content": PROBE_PROMPT}],
        }),
        Protocol::CustomSse => {
            let ctx = RequestContext {
                last_message: PROBE_PROMPT.to_string(),
                ..RequestContext::default()
            };
            composer::structured_payload(&ctx, &creds.model)
        }
    };
    let resp = apply_auth(client.post(creds.endpoint()), creds)?
        .json(&body)
        .send()
        .await?;
    check_status(creds, resp).await?;
    telemetry::log_event(
        "llm.probe",
        &format!("provider={} model={} ok", creds.provider, creds.model),
    );
    Ok(())
}

/**
 * \brief 按协议附加鉴权与 Provider 专属请求头。
 */
fn apply_auth(builder: RequestBuilder, creds: &Credentials) -> Result<RequestBuilder, SuggestError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let builder = match creds.provider.protocol() {
        Protocol::Anthropic => {
            headers.insert("x-api-key", header_value(&creds.secret)?);
            headers.insert(
                "anthropic-version",
                HeaderValue::from_static(ANTHROPIC_VERSION),
            );
            builder
        }
        Protocol::OpenAiCompatible | Protocol::CustomSse => builder.bearer_auth(&creds.secret),
    };
    for &(name, value) in creds.provider.descriptor().extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SuggestError::Configuration(format!("invalid header name: {e}")))?;
        headers.insert(name, HeaderValue::from_static(value));
    }
    Ok(builder.headers(headers))
}

fn header_value(value: &str) -> Result<HeaderValue, SuggestError> {
    HeaderValue::from_str(value)
        .map_err(|e| SuggestError::Configuration(format!("invalid header value: {e}")))
}

/**
 * \brief 非 2xx 统一转为错误；仅 custom 协议的 402 区分为付费提示。
 */
async fn check_status(creds: &Credentials, resp: Response) -> Result<Response, SuggestError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    telemetry::log_error(
        "llm.dispatch",
        &format!(
            "provider={} request failed: {} -> {}",
            creds.provider, status, text
        ),
    );
    if status == StatusCode::PAYMENT_REQUIRED && creds.provider.protocol() == Protocol::CustomSse {
        return Err(SuggestError::PaymentRequired(payment_message(&text)));
    }
    Err(SuggestError::Transport {
        status: status.as_u16(),
        body: text,
    })
}

/**
 * \brief 同步 JSON 响应中的正文：OpenAI 兼容取 `choices[0].message.content`，
 * Anthropic 取 `content[0].text`。
 */
pub fn extract_reply_text(protocol: Protocol, v: &Value) -> String {
    let text = match protocol {
        Protocol::Anthropic => v
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str()),
        Protocol::OpenAiCompatible | Protocol::CustomSse => v
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str()),
    };
    text.unwrap_or("").to_string()
}
