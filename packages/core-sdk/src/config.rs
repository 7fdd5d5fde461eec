use std::{path::PathBuf, time::Duration};

use anyhow::Result;

/**
 * \brief 服务配置。由启动方构造后注入，不作为全局状态。
 */
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /** \brief 监听地址，如 "127.0.0.1:5173" */
    pub addr: String,
    /** \brief 前端构建产物目录 */
    pub ui_dir: PathBuf,
    /** \brief 前端目录不存在时的备用目录 */
    pub ui_fallback_dir: PathBuf,
    pub telemetry_enabled: bool,
    pub log_dir: PathBuf,
    /** \brief 出站请求超时；None 表示一直等到远端关闭连接 */
    pub request_timeout: Option<Duration>,
}

impl ServerConfig {
    /**
     * \brief 以默认值为基础，读取 `REPLYMATE_*` 环境变量覆盖。
     */
    pub fn from_env(addr: &str) -> Self {
        Self::from_lookup(addr, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(addr: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ui_dir = lookup("REPLYMATE_UI_DIR").unwrap_or_else(|| "packages/ui/dist".to_string());
        let ui_fallback_dir = lookup("REPLYMATE_UI_FALLBACK").unwrap_or_else(|| "web".to_string());
        let log_dir = lookup("REPLYMATE_LOG_DIR").unwrap_or_else(|| "logs".to_string());
        let telemetry_enabled = lookup("REPLYMATE_TELEMETRY")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let request_timeout = lookup("REPLYMATE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            addr: addr.to_string(),
            ui_dir: PathBuf::from(ui_dir),
            ui_fallback_dir: PathBuf::from(ui_fallback_dir),
            telemetry_enabled,
            log_dir: PathBuf::from(log_dir),
            request_timeout,
        }
    }

    /** \brief 实际用于静态资源的目录：优先 ui_dir，不存在时用备用目录。 */
    pub fn static_root(&self) -> &PathBuf {
        if self.ui_dir.exists() {
            &self.ui_dir
        } else {
            &self.ui_fallback_dir
        }
    }

    /**
     * \brief 构建进程内共享的 HTTP 客户端。
     */
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
