use serde_json::{json, Value};

use crate::models::{non_blank, RequestContext, Speaker};

/** \brief 自然语言 Prompt 中保留的最近历史条数。 */
pub const HISTORY_WINDOW: usize = 10;

const UNKNOWN: &str = "未知";
const NONE: &str = "无";
const NO_HISTORY: &str = "（暂无历史消息）";
const USER_LABEL: &str = "我";

/**
 * \brief 组装后的 Prompt：系统指令与用户轮次。
 * \details 与 Provider 无关，由调度器决定指令以 system 消息还是顶层 system 字段发送。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub instructions: String,
    pub user_turn: String,
}

/**
 * \brief 根据联系人资料、风格、额外要求、反馈与历史生成 Prompt。纯函数。
 */
pub fn compose(ctx: &RequestContext) -> ComposedPrompt {
    let contact = &ctx.contact;
    let styles = ctx.styles.joined();

    let mut instructions = format!(
        "你是一个社交沟通助手，帮助用户回复聊天消息。\n\n\
         对方信息：\n\
         - 称呼：{name}\n\
         - 年龄：{age}\n\
         - 职业：{job}\n\
         - 背景：{background}\n\
         - 关系：{relationship}\n\n\
         用户希望的回复风格：{styles}\n",
        name = contact.name.trim(),
        age = field_or(contact.age.as_deref(), UNKNOWN),
        job = field_or(contact.job.as_deref(), UNKNOWN),
        background = field_or(contact.background.as_deref(), NONE),
        relationship = field_or(contact.relationship.as_deref(), UNKNOWN),
    );
    if let Some(custom) = non_blank(ctx.custom_prompt.as_deref()) {
        instructions.push_str(&format!("额外要求：{custom}\n"));
    }
    if let Some(feedback) = non_blank(ctx.user_feedback.as_deref()) {
        instructions.push_str(&format!("用户反馈：{feedback}\n"));
    }
    instructions.push_str(&format!(
        "\n请根据对话历史和对方最新消息，生成3个不同的回复建议：\n\
         1. 一个标准/安全的回复\n\
         2. 一个更有创意或大胆的回复（符合风格设定）\n\
         3. 一个简短精炼的回复\n\n\
         所有回复都要完美匹配\"{styles}\"的语气风格。\n\
         只返回JSON格式：{{\"suggestions\": [\"回复1\", \"回复2\", \"回复3\"]}}"
    ));

    let user_turn = format!(
        "对方最新消息：{}\n\n最近对话记录：\n{}\n\n请生成3个回复建议。",
        ctx.last_message,
        render_history(ctx)
    );

    ComposedPrompt {
        instructions,
        user_turn,
    }
}

/**
 * \brief 以 `称呼: 正文` 形式渲染最近 10 条历史。
 */
pub fn render_history(ctx: &RequestContext) -> String {
    if ctx.history.is_empty() {
        return NO_HISTORY.to_string();
    }
    let start = ctx.history.len().saturating_sub(HISTORY_WINDOW);
    ctx.history[start..]
        .iter()
        .map(|m| {
            let label = match m.role {
                Speaker::User => USER_LABEL,
                Speaker::Contact => ctx.contact.name.trim(),
            };
            format!("{}: {}", label, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/**
 * \brief custom Provider 的结构化负载：完整历史、无系统指令，由远端自行组织 Prompt。
 */
pub fn structured_payload(ctx: &RequestContext, model: &str) -> Value {
    let mut settings = json!({ "style": ctx.styles.as_slice() });
    if let Some(custom) = &ctx.custom_prompt {
        settings["customPrompt"] = json!(custom);
    }
    let mut body = json!({
        "contactInfo": ctx.contact,
        "settings": settings,
        "history": ctx.history,
        "lastMessage": ctx.last_message,
        "model": model,
    });
    if let Some(feedback) = &ctx.user_feedback {
        body["userFeedback"] = json!(feedback);
    }
    body
}

fn field_or<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(placeholder)
}
