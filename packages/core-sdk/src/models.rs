use serde::{Deserialize, Deserializer, Serialize};

/** \brief 风格集合为空时使用的默认风格。 */
pub const DEFAULT_STYLE: &str = "自然";

/**
 * \brief 对方（联系人）资料。
 * \details 除称呼外均为可选；空白字符串视为缺失。
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    /** \brief 称呼 */
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/**
 * \brief 消息发送方。未知角色一律视为对方。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    #[serde(other)]
    Contact,
}

/**
 * \brief 历史消息，仅保留角色与正文（id、时间戳等字段在反序列化时丢弃）。
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Speaker,
    #[serde(default)]
    pub content: String,
}

/**
 * \brief 有序且非空的风格标签集合。
 * \details 兼容旧版单字符串写法：`"幽默"` 与 `["幽默"]` 等价。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StyleSet(Vec<String>);

impl StyleSet {
    /**
     * \brief 由任意标签列表构造，丢弃空白标签，结果为空时回落到默认风格。
     */
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags
            .into_iter()
            .map(Into::into)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            Self(vec![DEFAULT_STYLE.to_string()])
        } else {
            Self(tags)
        }
    }

    /** \brief 旧版单字符串风格转为单元素集合。 */
    pub fn from_legacy(style: &str) -> Self {
        Self::new([style])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /** \brief 以统一分隔符拼接，数组来源与单字符串来源输出一致。 */
    pub fn joined(&self) -> String {
        self.0.join("、")
    }
}

impl Default for StyleSet {
    fn default() -> Self {
        Self(vec![DEFAULT_STYLE.to_string()])
    }
}

impl<'de> Deserialize<'de> for StyleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawStyle {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Option::<RawStyle>::deserialize(deserializer)? {
            Some(RawStyle::One(s)) => StyleSet::from_legacy(&s),
            Some(RawStyle::Many(list)) => StyleSet::new(list),
            None => StyleSet::default(),
        })
    }
}

/**
 * \brief 回复设置：风格与额外要求。
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    #[serde(default)]
    pub style: StyleSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

/**
 * \brief 前端提交的模型服务配置（未校验）。
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /** \brief Provider 标识，如 openai/anthropic/custom */
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /** \brief 自定义 SSE 接口使用的 Bearer Token */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ApiConfig {
    /**
     * \brief 是否携带了可用密钥；custom 看 token，其余看 api_key。
     */
    pub fn has_secret(&self) -> bool {
        if self.provider.trim().eq_ignore_ascii_case("custom") {
            self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
        } else {
            !self.api_key.trim().is_empty()
        }
    }
}

/**
 * \brief `POST /api/chat` 请求体。
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub settings: ChatSettings,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub last_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfig>,
}

impl SuggestRequest {
    /** \brief 拆出与凭据无关的请求上下文。 */
    pub fn context(&self) -> RequestContext {
        RequestContext {
            contact: self.contact_info.clone(),
            styles: self.settings.style.clone(),
            custom_prompt: non_blank(self.settings.custom_prompt.as_deref()),
            user_feedback: non_blank(self.user_feedback.as_deref()),
            history: self.history.clone(),
            last_message: self.last_message.clone(),
        }
    }
}

/**
 * \brief 生成建议所需的全部上下文，与 Provider 无关。
 */
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub contact: ContactInfo,
    pub styles: StyleSet,
    pub custom_prompt: Option<String>,
    pub user_feedback: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub last_message: String,
}

/**
 * \brief 一次请求的最终结果。
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResult {
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_cases: Option<String>,
}

impl SuggestionResult {
    pub fn from_suggestions<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suggestions: items.into_iter().map(Into::into).collect(),
            analysis: None,
            reference_cases: None,
        }
    }
}

/**
 * \brief 归一化空白：None、空串与纯空白都视为缺失。
 */
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_style_string_coerced_to_single_element() {
        let settings: ChatSettings =
            serde_json::from_str(r#"{"style":"幽默"}"#).expect("parse settings");
        assert_eq!(settings.style.as_slice(), ["幽默".to_string()]);
    }

    #[test]
    fn test_style_array_and_legacy_join_identically() {
        let from_array: StyleSet = serde_json::from_str(r#"["幽默","成熟"]"#).expect("array");
        let from_legacy = StyleSet::from_legacy("幽默");
        assert_eq!(from_array.joined(), "幽默、成熟");
        assert_eq!(from_legacy.joined(), "幽默");
        assert_eq!(
            StyleSet::new(["幽默", "成熟"]).joined(),
            from_array.joined()
        );
    }

    #[test]
    fn test_empty_style_falls_back_to_default() {
        let empty: StyleSet = serde_json::from_str("[]").expect("empty array");
        assert_eq!(empty.as_slice(), [DEFAULT_STYLE.to_string()]);
        let blank: StyleSet = serde_json::from_str(r#""  ""#).expect("blank string");
        assert_eq!(blank.as_slice(), [DEFAULT_STYLE.to_string()]);
        let null: ChatSettings = serde_json::from_str(r#"{"style":null}"#).expect("null");
        assert_eq!(null.style.as_slice(), [DEFAULT_STYLE.to_string()]);
    }

    #[test]
    fn test_history_drops_extra_fields_and_maps_unknown_role() {
        let history: Vec<HistoryEntry> = serde_json::from_str(
            r#"[{"id":"1","role":"user","content":"hi","timestamp":1},
                {"id":"2","role":"contact","content":"yo"},
                {"role":"assistant","content":"??"}]"#,
        )
        .expect("parse history");
        assert_eq!(history[0].role, Speaker::User);
        assert_eq!(history[1].role, Speaker::Contact);
        assert_eq!(history[2].role, Speaker::Contact);
        let back = serde_json::to_value(&history[0]).expect("serialize");
        assert_eq!(back, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_has_secret_per_provider() {
        let mut cfg = ApiConfig {
            provider: "openai".into(),
            api_key: "sk-1".into(),
            ..Default::default()
        };
        assert!(cfg.has_secret());
        cfg.api_key = "   ".into();
        assert!(!cfg.has_secret());

        let custom = ApiConfig {
            provider: "custom".into(),
            api_key: "ignored".into(),
            token: Some("tok".into()),
            ..Default::default()
        };
        assert!(custom.has_secret());
        let custom_no_token = ApiConfig {
            token: None,
            ..custom
        };
        assert!(!custom_no_token.has_secret());
    }

    #[test]
    fn test_context_normalizes_blank_optionals() {
        let req: SuggestRequest = serde_json::from_str(
            r#"{"contactInfo":{"name":"小王"},
                "settings":{"style":["调皮"],"customPrompt":"  "},
                "history":[],"lastMessage":"在吗","userFeedback":""}"#,
        )
        .expect("parse request");
        let ctx = req.context();
        assert_eq!(ctx.custom_prompt, None);
        assert_eq!(ctx.user_feedback, None);
        assert_eq!(ctx.last_message, "在吗");
        assert!(req.api_config.is_none());
    }
}
