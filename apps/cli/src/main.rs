use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use replymate_core_sdk::{
    config::ServerConfig,
    models::{ApiConfig, ChatSettings, ContactInfo, HistoryEntry, StyleSet, SuggestRequest},
    registry, server, service, telemetry,
};

/** \brief 付费提示对应的退出码。 */
const EXIT_PAYMENT_REQUIRED: i32 = 2;

/**
 * \brief CLI 程序入口：聊天回复建议。
 */
#[derive(Parser, Debug)]
#[command(name = "replymate", version, about = "ReplyMate chat reply suggestions")]
struct Cli {
    /** \brief 将事件写入日志目录 */
    #[arg(long, global = true)]
    telemetry: bool,

    #[command(subcommand)]
    command: Commands,
}

/**
 * \brief 模型服务凭据参数。
 */
#[derive(Args, Debug)]
struct ApiArgs {
    /** \brief Provider：openai/openrouter/anthropic/deepseek/moonshot/custom */
    #[arg(long, default_value = "openai")]
    provider: String,
    #[arg(long, env = "REPLYMATE_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,
    /** \brief custom Provider 的 Bearer Token */
    #[arg(long, env = "REPLYMATE_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /** \brief 模型名，留空使用目录中的第一个 */
    #[arg(long, default_value = "")]
    model: String,
    #[arg(long, env = "REPLYMATE_BASE_URL")]
    base_url: Option<String>,
}

impl ApiArgs {
    fn into_config(self) -> ApiConfig {
        ApiConfig {
            provider: self.provider,
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
            token: self.token,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 启动本地 HTTP 服务并提供前端页面。
     */
    Serve {
        #[arg(long, default_value = "127.0.0.1:5173")]
        addr: String,
    },

    /**
     * \brief 列出内置 Provider 与模型。
     */
    Providers,

    /**
     * \brief 针对对方最新消息生成回复建议。
     */
    Suggest {
        #[command(flatten)]
        api: ApiArgs,
        /** \brief 对方称呼 */
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: Option<String>,
        #[arg(long)]
        job: Option<String>,
        #[arg(long)]
        background: Option<String>,
        #[arg(long)]
        relationship: Option<String>,
        /** \brief 回复风格，可重复 */
        #[arg(long = "style")]
        styles: Vec<String>,
        #[arg(long)]
        custom_prompt: Option<String>,
        #[arg(long)]
        feedback: Option<String>,
        /** \brief 历史消息 JSON 文件：[{"role":"contact","content":"..."}] */
        #[arg(long)]
        history: Option<PathBuf>,
        /** \brief 对方最新消息 */
        #[arg(long)]
        message: String,
    },

    /**
     * \brief 测试模型服务连通性。
     */
    Probe {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_config = ServerConfig::from_env("");
    telemetry::configure(
        cli.telemetry || env_config.telemetry_enabled,
        env_config.log_dir.clone(),
    );

    match cli.command {
        Commands::Serve { addr } => {
            let mut config = ServerConfig::from_env(&addr);
            config.telemetry_enabled |= cli.telemetry;
            server::run(config).await?;
        }
        Commands::Providers => {
            for p in registry::all() {
                let base = if p.base_url.is_empty() {
                    "(user supplied)"
                } else {
                    p.base_url
                };
                println!("{} | {} | {}", p.id, p.name, base);
                for m in p.models {
                    println!("    {} ({})", m.id, m.name);
                }
            }
        }
        Commands::Suggest {
            api,
            name,
            age,
            job,
            background,
            relationship,
            styles,
            custom_prompt,
            feedback,
            history,
            message,
        } => {
            let history = match history {
                Some(path) => load_history(&path)?,
                None => Vec::new(),
            };
            let request = SuggestRequest {
                contact_info: ContactInfo {
                    name,
                    age,
                    job,
                    background,
                    relationship,
                },
                settings: ChatSettings {
                    style: StyleSet::new(styles),
                    custom_prompt,
                },
                history,
                last_message: message,
                user_feedback: feedback,
                api_config: Some(api.into_config()),
            };

            let client = env_config.http_client()?;
            match service::suggest(&client, &request).await {
                Ok(result) => {
                    for (i, s) in result.suggestions.iter().enumerate() {
                        println!("{}. {}", i + 1, s);
                    }
                    if let Some(analysis) = result.analysis {
                        println!("\n局势分析：\n{}", analysis);
                    }
                    if let Some(cases) = result.reference_cases {
                        println!("\n参考案例：\n{}", cases);
                    }
                }
                Err(payment) => {
                    eprintln!("{}", payment.message);
                    std::process::exit(EXIT_PAYMENT_REQUIRED);
                }
            }
        }
        Commands::Probe { api } => {
            let config = api.into_config();
            let client = env_config.http_client()?;
            service::test_connection(&client, &config)
                .await
                .with_context(|| format!("connection to {} failed", config.provider))?;
            println!("Connection ok ({})", config.provider);
        }
    }

    Ok(())
}

fn load_history(path: &Path) -> Result<Vec<HistoryEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read history file {} failed", path.display()))?;
    serde_json::from_str(&raw).context("parse history file failed")
}
