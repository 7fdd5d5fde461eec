#![allow(dead_code)]

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use serde_json::Value;

/**
 * \brief 记录 mock Provider 收到的请求头与请求体。
 */
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Recorder {
    pub fn push(&self, headers: HeaderMap, body: Value) {
        self.inner.lock().expect("lock recorder").push((headers, body));
    }

    pub fn take(&self) -> Vec<(HeaderMap, Value)> {
        std::mem::take(&mut *self.inner.lock().expect("lock recorder"))
    }
}

/** \brief 在随机端口上启动路由，返回 `http://127.0.0.1:port`。 */
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock");
    });
    format!("http://{}", addr)
}

/** \brief 一个已关闭端口的地址，用于模拟网络不可达。 */
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn json_route(path: &str, status: StatusCode, reply: Value, rec: Recorder) -> Router {
    Router::new().route(
        path,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let rec = rec.clone();
            let reply = reply.clone();
            async move {
                rec.push(headers, body);
                (status, Json(reply))
            }
        }),
    )
}

pub fn text_route(path: &str, status: StatusCode, reply: &'static str, rec: Recorder) -> Router {
    Router::new().route(
        path,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let rec = rec.clone();
            async move {
                rec.push(headers, body);
                (status, reply)
            }
        }),
    )
}

/**
 * \brief 以分块 SSE 响应回复；每个元素作为独立的 body 块发送。
 */
pub fn sse_route(path: &str, chunks: Vec<&'static str>, rec: Recorder) -> Router {
    Router::new().route(
        path,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let rec = rec.clone();
            let chunks = chunks.clone();
            async move {
                rec.push(headers, body);
                let stream = async_stream::stream! {
                    for chunk in chunks {
                        yield Ok::<_, Infallible>(chunk);
                    }
                };
                Response::builder()
                    .header(header::CONTENT_TYPE, "text/event-stream")
                    .body(Body::from_stream(stream))
                    .expect("build sse response")
            }
        }),
    )
}

pub fn openai_body(content: &str) -> Value {
    serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

pub fn anthropic_body(text: &str) -> Value {
    serde_json::json!({"content": [{"type": "text", "text": text}]})
}
