use reqwest::Client;

use crate::{
    composer,
    error::{PaymentRequired, SuggestError},
    fallback,
    llm::{self, Credentials},
    models::{ApiConfig, SuggestRequest, SuggestionResult},
    normalizer, telemetry,
};

/**
 * \brief 生成回复建议的完整链路：组装 → 调度 → 归一化 → 兜底。
 * \details 除 402 付费提示外，任何失败都会记录日志并返回占位建议；调用方总能拿到可展示的结果。
 */
pub async fn suggest(
    client: &Client,
    request: &SuggestRequest,
) -> Result<SuggestionResult, PaymentRequired> {
    let Some(config) = request.api_config.as_ref().filter(|c| c.has_secret()) else {
        telemetry::log_event("service.suggest", "no api config, serving demo suggestions");
        return Ok(fallback::demo());
    };

    match try_suggest(client, config, request).await {
        Ok(result) => Ok(result),
        Err(SuggestError::PaymentRequired(message)) => {
            telemetry::log_error(
                "service.suggest",
                &format!("payment required: {}", message),
            );
            Err(PaymentRequired { message })
        }
        Err(e) => {
            telemetry::log_error(
                "service.suggest",
                &format!("provider={} failed: {}", config.provider, e),
            );
            Ok(fallback::demo())
        }
    }
}

/**
 * \brief 不做兜底的内部链路，便于区分各类错误。
 */
pub async fn try_suggest(
    client: &Client,
    config: &ApiConfig,
    request: &SuggestRequest,
) -> Result<SuggestionResult, SuggestError> {
    let creds = Credentials::from_config(config)?;
    let context = request.context();
    let prompt = composer::compose(&context);
    let reply = llm::dispatch(client, &creds, &prompt, &context).await?;
    let parsed = normalizer::normalize(creds.provider.protocol(), reply).await?;
    if parsed.suggestions.is_empty() {
        telemetry::log_event(
            "service.suggest",
            &format!("provider={} returned no suggestions", creds.provider),
        );
    }
    Ok(fallback::fill_empty(parsed))
}

/**
 * \brief 连通性测试：校验凭据后发一次最小请求。
 */
pub async fn test_connection(client: &Client, config: &ApiConfig) -> Result<(), SuggestError> {
    let creds = Credentials::from_config(config)?;
    llm::probe(client, &creds).await
}
