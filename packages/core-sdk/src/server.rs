use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::services::ServeDir;

use crate::{
    config::ServerConfig,
    error::SuggestError,
    fallback,
    models::{ApiConfig, SuggestRequest},
    registry::{self, ProviderDescriptor},
    service, telemetry,
};

/**
 * \brief 处理器共享状态：注入的配置与复用的 HTTP 客户端。
 */
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

/**
 * \brief 启动本地 HTTP 服务，提供静态前端与 API。
 */
pub async fn run(config: ServerConfig) -> Result<()> {
    telemetry::configure(config.telemetry_enabled, config.log_dir.clone());
    if telemetry::is_enabled() {
        println!("Telemetry logging to {}", config.log_dir.display());
    }
    let addr = config.addr.clone();
    let state = AppState::new(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("Server listening on http://{}", addr);
    telemetry::log_event("server", &format!("listening on {}", addr));
    axum::serve(listener, app).await?;
    Ok(())
}

/**
 * \brief 构建路由；未匹配的路径交给静态资源目录。
 */
pub fn router(state: AppState) -> Router {
    let static_service =
        get_service(ServeDir::new(state.config.static_root()).append_index_html_on_directories(true));

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/test-connection", post(test_connection))
        .route("/api/providers", get(list_providers))
        .route("/api/health", get(health_check))
        .fallback_service(static_service)
        .with_state(state)
}

#[derive(Serialize, Debug)]
struct PaymentRequiredBody {
    error: &'static str,
    message: String,
    suggestions: Vec<String>,
}

#[derive(Serialize, Debug)]
struct ProvidersResponse {
    providers: &'static [ProviderDescriptor],
}

/**
 * \brief 生成回复建议：POST /api/chat
 * \details 始终返回 200；失败降级为占位建议，402 以结构化字段告知前端。
 */
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            telemetry::log_error("server.chat", &format!("bad request body: {}", rejection));
            return Json(fallback::demo()).into_response();
        }
    };

    telemetry::log_event(
        "server.chat",
        &format!(
            "provider={} history={} styles={}",
            request
                .api_config
                .as_ref()
                .map(|c| c.provider.as_str())
                .unwrap_or("none"),
            request.history.len(),
            request.settings.style.joined()
        ),
    );

    match service::suggest(&state.client, &request).await {
        Ok(result) => Json(result).into_response(),
        Err(payment) => Json(PaymentRequiredBody {
            error: "PAYMENT_REQUIRED",
            message: payment.message,
            suggestions: vec![fallback::PAYMENT_NOTICE.to_string()],
        })
        .into_response(),
    }
}

/**
 * \brief 连通性测试：POST /api/test-connection
 */
async fn test_connection(
    State(state): State<AppState>,
    payload: Result<Json<ApiConfig>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(Json(config)) = payload else {
        return connection_failed(StatusCode::BAD_REQUEST);
    };

    match service::test_connection(&state.client, &config).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))),
        Err(e) => {
            telemetry::log_error(
                "server.test_connection",
                &format!("provider={} failed: {}", config.provider, e),
            );
            match e {
                SuggestError::Configuration(_)
                | SuggestError::Transport { .. }
                | SuggestError::PaymentRequired(_) => connection_failed(StatusCode::BAD_REQUEST),
                SuggestError::Http(_) | SuggestError::Decode(_) => {
                    connection_failed(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
    }
}

fn connection_failed(status: StatusCode) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": "Connection failed" })))
}

/**
 * \brief Provider 目录：GET /api/providers
 */
async fn list_providers() -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: registry::all(),
    })
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") }))
}
