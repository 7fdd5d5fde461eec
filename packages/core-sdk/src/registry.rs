use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::error::SuggestError;

/**
 * \brief 已知 Provider 标识。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAI,
    OpenRouter,
    Anthropic,
    DeepSeek,
    Moonshot,
    Custom,
}

/**
 * \brief 线协议。新增 Provider 只需补一个枚举值和一条目录项，调度点按协议分派。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /** \brief `{base}/messages`，同步 JSON。 */
    Anthropic,
    /** \brief `{base}/chat/completions`，同步 JSON。 */
    OpenAiCompatible,
    /** \brief `{base}/api/chat/completions`，SSE 字节流。 */
    CustomSse,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
}

/**
 * \brief Provider 目录项，进程启动即确定，不可变。
 */
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub name: &'static str,
    pub base_url: &'static str,
    pub models: &'static [ModelOption],
    pub protocol: Protocol,
    #[serde(skip)]
    pub extra_headers: &'static [(&'static str, &'static str)],
}

impl ProviderDescriptor {
    /** \brief 目录中的首个模型，用作未选择模型时的默认值。 */
    pub fn default_model(&self) -> Option<&'static str> {
        self.models.first().map(|m| m.id)
    }
}

const fn model(id: &'static str, name: &'static str) -> ModelOption {
    ModelOption { id, name }
}

static PROVIDERS: [ProviderDescriptor; 6] = [
    ProviderDescriptor {
        id: ProviderId::OpenAI,
        name: "OpenAI",
        base_url: "https://api.openai.com/v1",
        models: &[
            model("gpt-4o", "GPT-4o"),
            model("gpt-4o-mini", "GPT-4o Mini"),
            model("gpt-4-turbo", "GPT-4 Turbo"),
            model("gpt-3.5-turbo", "GPT-3.5 Turbo"),
        ],
        protocol: Protocol::OpenAiCompatible,
        extra_headers: &[],
    },
    ProviderDescriptor {
        id: ProviderId::OpenRouter,
        name: "OpenRouter",
        base_url: "https://openrouter.ai/api/v1",
        models: &[
            model("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet"),
            model("anthropic/claude-3-haiku", "Claude 3 Haiku"),
            model("openai/gpt-4o", "GPT-4o"),
            model("openai/gpt-4o-mini", "GPT-4o Mini"),
            model("google/gemini-pro-1.5", "Gemini Pro 1.5"),
            model("google/gemini-3-pro-preview", "Gemini 3 Pro Preview"),
            model("google/gemini-2.5-pro", "Gemini 2.5 Pro"),
            model("meta-llama/llama-3.1-70b-instruct", "Llama 3.1 70B"),
            model("deepseek/deepseek-chat", "DeepSeek Chat"),
            model("qwen/qwen-2.5-72b-instruct", "Qwen 2.5 72B"),
        ],
        protocol: Protocol::OpenAiCompatible,
        extra_headers: &[
            ("HTTP-Referer", "https://chat-helper.app"),
            ("X-Title", "AI Chat Helper"),
        ],
    },
    ProviderDescriptor {
        id: ProviderId::Anthropic,
        name: "Anthropic",
        base_url: "https://api.anthropic.com/v1",
        models: &[
            model("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet"),
            model("claude-3-5-haiku-20241022", "Claude 3.5 Haiku"),
            model("claude-3-opus-20240229", "Claude 3 Opus"),
        ],
        protocol: Protocol::Anthropic,
        extra_headers: &[],
    },
    ProviderDescriptor {
        id: ProviderId::DeepSeek,
        name: "DeepSeek",
        base_url: "https://api.deepseek.com",
        models: &[
            model("deepseek-chat", "DeepSeek Chat"),
            model("deepseek-coder", "DeepSeek Coder"),
        ],
        protocol: Protocol::OpenAiCompatible,
        extra_headers: &[],
    },
    ProviderDescriptor {
        id: ProviderId::Moonshot,
        name: "Moonshot (月之暗面)",
        base_url: "https://api.moonshot.cn/v1",
        models: &[
            model("moonshot-v1-8k", "Moonshot v1 8K"),
            model("moonshot-v1-32k", "Moonshot v1 32K"),
            model("moonshot-v1-128k", "Moonshot v1 128K"),
        ],
        protocol: Protocol::OpenAiCompatible,
        extra_headers: &[],
    },
    ProviderDescriptor {
        id: ProviderId::Custom,
        name: "自定义 SSE 接口",
        base_url: "",
        models: &[model("custom-sse", "自定义 SSE")],
        protocol: Protocol::CustomSse,
        extra_headers: &[],
    },
];

/** \brief 全部 Provider 目录，顺序即展示顺序。 */
pub fn all() -> &'static [ProviderDescriptor] {
    &PROVIDERS
}

/**
 * \brief 按标识查找目录项。目录按枚举声明顺序排列，下标即判别值。
 */
pub fn descriptor(id: ProviderId) -> &'static ProviderDescriptor {
    &PROVIDERS[id as usize]
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAI => "openai",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Anthropic => "anthropic",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Moonshot => "moonshot",
            ProviderId::Custom => "custom",
        }
    }

    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        descriptor(*self)
    }

    pub fn protocol(&self) -> Protocol {
        self.descriptor().protocol
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = SuggestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAI),
            "openrouter" => Ok(ProviderId::OpenRouter),
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "deepseek" => Ok(ProviderId::DeepSeek),
            "moonshot" => Ok(ProviderId::Moonshot),
            "custom" => Ok(ProviderId::Custom),
            other => Err(SuggestError::Configuration(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}
