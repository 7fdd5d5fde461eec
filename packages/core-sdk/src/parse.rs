use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/**
 * \brief 从模型文本中提取出的结构化结果。建议为空表示未能解析，由兜底策略处理。
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub suggestions: Vec<String>,
    pub analysis: Option<String>,
    pub reference_cases: Option<String>,
}

impl ParsedReply {
    fn suggestions_only(suggestions: Vec<String>) -> Self {
        Self {
            suggestions,
            ..Self::default()
        }
    }
}

/**
 * \brief 第一层的直接 JSON 结果：包含模型原文的叙述字段，或直接给出的建议数组。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonReply {
    Narrative(String),
    Suggestions(Vec<String>),
}

/** \brief 承载模型原始叙述的字段名，按优先级排列。 */
const NARRATIVE_FIELDS: [&str; 2] = ["model_answer", "answer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Analysis,
    ReferenceCases,
    Replies,
}

static EMBEDDED_SUGGESTIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)\{.*"suggestions".*\}"#).expect("valid embedded regex"));

static NUMBERED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("valid numbered regex"));

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*|【)?[ \t]*(局势分析|情况分析|参考案例|推荐回复|回复建议|situation analysis|reference cases|recommended replies)[ \t]*(?:\*\*|】)?[ \t]*(?:[:：][ \t]*(?:\*\*)?[ \t]*|\r?$)",
    )
    .expect("valid header regex")
});

/**
 * \brief 同步 JSON 路径：正文整体按 `{suggestions:[...]}` 解析，失败则截取第一个含
 * `"suggestions"` 的花括号块再解析；都失败返回空结果。
 */
pub fn parse_json_reply(text: &str) -> ParsedReply {
    let direct = serde_json::from_str::<Value>(text.trim())
        .ok()
        .and_then(|v| suggestions_array(&v));
    let suggestions = direct
        .or_else(|| {
            let block = EMBEDDED_SUGGESTIONS.find(text)?;
            let v = serde_json::from_str::<Value>(block.as_str()).ok()?;
            suggestions_array(&v)
        })
        .unwrap_or_default();
    ParsedReply::suggestions_only(suggestions)
}

/**
 * \brief SSE 路径：依次尝试直接 JSON、Markdown 分节、裸编号列表，首个成功即返回。
 * \details 叙述字段优先于建议数组；分析与参考案例只由 Markdown 分节产出。
 */
pub fn parse_structured_text(text: &str) -> ParsedReply {
    let narrative = match direct_json(text) {
        Some(JsonReply::Suggestions(list)) => return ParsedReply::suggestions_only(list),
        Some(JsonReply::Narrative(n)) => n,
        None => text.to_string(),
    };

    let mut reply = markdown_sections(&narrative).unwrap_or_default();
    if reply.suggestions.is_empty() {
        if let Some(list) = numbered_list(&narrative) {
            reply.suggestions = list.suggestions;
        }
    }
    reply
}

/**
 * \brief 第一层：全文按 JSON 解析。
 */
pub fn direct_json(text: &str) -> Option<JsonReply> {
    let v: Value = serde_json::from_str(text.trim()).ok()?;
    if let Some(s) = v.as_str() {
        return Some(JsonReply::Narrative(s.to_string()));
    }
    let narrative = NARRATIVE_FIELDS
        .iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty());
    if let Some(n) = narrative {
        return Some(JsonReply::Narrative(n.to_string()));
    }
    suggestions_array(&v).map(JsonReply::Suggestions)
}

/**
 * \brief 第二层：按 局势分析 / 参考案例 / 推荐回复 标题切分。
 * \details 标题独占一行，或以冒号结尾、正文接在同一行。每节从标题延伸到下一个标题或文末；
 * 推荐回复只保留编号行。一个标题都没有时返回 None。
 */
pub fn markdown_sections(text: &str) -> Option<ParsedReply> {
    let headers: Vec<(Section, usize, usize)> = SECTION_HEADER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = section_kind(caps.get(1)?.as_str())?;
            Some((kind, whole.start(), whole.end()))
        })
        .collect();
    if headers.is_empty() {
        return None;
    }

    let body_of = |wanted: Section| -> Option<&str> {
        let idx = headers.iter().position(|(k, _, _)| *k == wanted)?;
        let start = headers[idx].2;
        let end = headers.get(idx + 1).map(|h| h.1).unwrap_or(text.len());
        let body = text[start..end].trim();
        (!body.is_empty()).then_some(body)
    };

    let suggestions = body_of(Section::Replies)
        .map(numbered_items)
        .unwrap_or_default();

    Some(ParsedReply {
        suggestions,
        analysis: body_of(Section::Analysis).map(str::to_string),
        reference_cases: body_of(Section::ReferenceCases).map(str::to_string),
    })
}

/**
 * \brief 第三层：全文中第一段连续的 `数字. 文本` 行。段内空行不打断，其余行结束该段。
 */
pub fn numbered_list(text: &str) -> Option<ParsedReply> {
    let mut run: Vec<String> = Vec::new();
    let mut started = false;
    for line in text.lines() {
        if let Some(item) = numbered_item(line) {
            started = true;
            if let Some(item) = item {
                run.push(item);
            }
        } else if started && !line.trim().is_empty() {
            break;
        }
    }
    (!run.is_empty()).then(|| ParsedReply::suggestions_only(run))
}

fn numbered_items(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(numbered_item)
        .flatten()
        .collect()
}

/**
 * \brief 外层 None 表示不是编号行；内层 None 表示去掉编号后为空。
 */
fn numbered_item(line: &str) -> Option<Option<String>> {
    let caps = NUMBERED_LINE.captures(line)?;
    let item = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    Some((!item.is_empty()).then(|| item.to_string()))
}

fn section_kind(label: &str) -> Option<Section> {
    match label.to_lowercase().as_str() {
        "局势分析" | "情况分析" | "situation analysis" => Some(Section::Analysis),
        "参考案例" | "reference cases" => Some(Section::ReferenceCases),
        "推荐回复" | "回复建议" | "recommended replies" => Some(Section::Replies),
        _ => None,
    }
}

fn suggestions_array(v: &Value) -> Option<Vec<String>> {
    let arr = v.get("suggestions")?.as_array()?;
    Some(
        arr.iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_json_reply() {
        let r = parse_json_reply(r#"{"suggestions":["a","b","c"]}"#);
        assert_eq!(r.suggestions, vec!["a", "b", "c"]);
        assert_eq!(r.analysis, None);
        assert_eq!(r.reference_cases, None);
    }

    #[test]
    fn test_embedded_json_reply() {
        let r = parse_json_reply(r#"here is your answer: {"suggestions":["x","y"]} thanks"#);
        assert_eq!(r.suggestions, vec!["x", "y"]);
    }

    #[test]
    fn test_json_reply_without_structure_is_empty() {
        assert!(parse_json_reply("sorry, I cannot help").suggestions.is_empty());
        assert!(parse_json_reply(r#"{"suggestions": oops}"#).suggestions.is_empty());
        assert!(parse_json_reply("").suggestions.is_empty());
    }

    #[test]
    fn test_markdown_sections_extracted_in_order() {
        let text = "## 局势分析\n对方在试探你的态度。\n可以顺势接话。\n\n## 推荐回复\n1. foo\n2. bar\n3. baz\n";
        let r = parse_structured_text(text);
        assert_eq!(
            r.analysis.as_deref(),
            Some("对方在试探你的态度。\n可以顺势接话。")
        );
        assert_eq!(r.suggestions, vec!["foo", "bar", "baz"]);
        assert_eq!(r.reference_cases, None);
    }

    #[test]
    fn test_all_three_sections_with_bold_headers() {
        let text = "**局势分析**\n气氛轻松\n**参考案例：**\n1. 案例一\n**推荐回复**\n1. 好呀\n2. \n3. 改天吧";
        let r = parse_structured_text(text);
        assert_eq!(r.analysis.as_deref(), Some("气氛轻松"));
        assert_eq!(r.reference_cases.as_deref(), Some("1. 案例一"));
        assert_eq!(r.suggestions, vec!["好呀", "改天吧"]);
    }

    #[test]
    fn test_inline_section_bodies_after_colon() {
        let text = "局势分析：对方心情不错，想约你\n参考案例：朋友约饭时爽快答应\n推荐回复：\n1. 好呀\n2. 改天吧";
        let r = parse_structured_text(text);
        assert_eq!(r.analysis.as_deref(), Some("对方心情不错，想约你"));
        assert_eq!(r.reference_cases.as_deref(), Some("朋友约饭时爽快答应"));
        assert_eq!(r.suggestions, vec!["好呀", "改天吧"]);

        let r = parse_structured_text("**局势分析：** 气氛轻松\n**推荐回复：** \n1. 嗨");
        assert_eq!(r.analysis.as_deref(), Some("气氛轻松"));
        assert_eq!(r.suggestions, vec!["嗨"]);
    }

    #[test]
    fn test_label_inside_prose_is_not_a_header() {
        let r = parse_structured_text("局势分析很重要\n1. 先问问近况");
        assert_eq!(r.analysis, None);
        assert_eq!(r.suggestions, vec!["先问问近况"]);
    }

    #[test]
    fn test_sections_in_any_order() {
        let text = "### 推荐回复\n1. a\n2. b\n### 局势分析\n说明";
        let r = parse_structured_text(text);
        assert_eq!(r.suggestions, vec!["a", "b"]);
        assert_eq!(r.analysis.as_deref(), Some("说明"));
    }

    #[test]
    fn test_single_numbered_line_is_kept() {
        let r = parse_structured_text("some preamble\n1. only one line\nthe end");
        assert_eq!(r.suggestions, vec!["only one line"]);
        assert_eq!(r.analysis, None);
    }

    #[test]
    fn test_numbered_list_takes_first_run_only() {
        let r = numbered_list("intro\n1. a\n\n2. b\nbreak\n1. c\n").unwrap();
        assert_eq!(r.suggestions, vec!["a", "b"]);
    }

    #[test]
    fn test_no_structure_yields_empty() {
        let r = parse_structured_text("just chatting, nothing numbered here");
        assert_eq!(r, ParsedReply::default());
        assert_eq!(parse_structured_text(""), ParsedReply::default());
    }

    #[test]
    fn test_direct_json_suggestions_skip_markdown() {
        let body = serde_json::json!({
            "suggestions": ["s1", "s2"],
            "note": "## 推荐回复\n1. no",
        })
        .to_string();
        let r = parse_structured_text(&body);
        assert_eq!(r.suggestions, vec!["s1", "s2"]);
        assert_eq!(r.analysis, None);
    }

    #[test]
    fn test_narrative_field_wins_over_suggestions() {
        let body = serde_json::json!({
            "model_answer": "## 局势分析\n平静\n## 推荐回复\n1. 嗨\n2. 你好",
            "suggestions": ["ignored"],
        })
        .to_string();
        let r = parse_structured_text(&body);
        assert_eq!(r.suggestions, vec!["嗨", "你好"]);
        assert_eq!(r.analysis.as_deref(), Some("平静"));
    }

    #[test]
    fn test_json_string_is_treated_as_narrative() {
        assert_eq!(
            direct_json(r#""1. hi""#),
            Some(JsonReply::Narrative("1. hi".into()))
        );
        assert_eq!(parse_structured_text(r#""1. hi""#).suggestions, vec!["hi"]);
    }

    #[test]
    fn test_headers_without_replies_fall_through_to_numbered_list() {
        let r = parse_structured_text("## 局势分析\n对方很忙\n1. 稍后再聊");
        assert_eq!(r.analysis.as_deref(), Some("对方很忙\n1. 稍后再聊"));
        assert_eq!(r.suggestions, vec!["稍后再聊"]);
    }
}
