use crate::{models::SuggestionResult, parse::ParsedReply};

/** \brief 未配置模型服务（演示模式）或请求失败时的占位建议。 */
pub const DEMO_SUGGESTIONS: [&str; 3] = [
    "这听起来很有趣！能跟我多说一些吗？",
    "哈哈，我完全理解你的意思~",
    "嗯嗯，然后呢？",
];

/** \brief 请求成功但没有解析出任何建议时的占位建议。 */
pub const EMPTY_RESULT_SUGGESTIONS: [&str; 3] = ["这听起来很有趣！", "我理解你的意思~", "嗯嗯"];

/** \brief 付费提示响应中附带的单条建议。 */
pub const PAYMENT_NOTICE: &str = "账户余额不足，请充值后重试";

/** \brief 演示模式 / 失败兜底结果。 */
pub fn demo() -> SuggestionResult {
    SuggestionResult::from_suggestions(DEMO_SUGGESTIONS)
}

/**
 * \brief 把解析结果转为最终结果；建议为空时替换为空结果占位，分析与参考案例保留。
 */
pub fn fill_empty(parsed: ParsedReply) -> SuggestionResult {
    let suggestions = if parsed.suggestions.is_empty() {
        EMPTY_RESULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        parsed.suggestions
    };
    SuggestionResult {
        suggestions,
        analysis: parsed.analysis,
        reference_cases: parsed.reference_cases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_parse_uses_distinct_placeholder() {
        let result = fill_empty(ParsedReply::default());
        assert_eq!(result.suggestions, EMPTY_RESULT_SUGGESTIONS.to_vec());
        assert_ne!(result.suggestions, demo().suggestions);
    }

    #[test]
    fn test_non_empty_parse_passes_through() {
        let parsed = ParsedReply {
            suggestions: vec!["only".into()],
            analysis: Some("a".into()),
            reference_cases: None,
        };
        let result = fill_empty(parsed);
        assert_eq!(result.suggestions, vec!["only"]);
        assert_eq!(result.analysis.as_deref(), Some("a"));
    }

    #[test]
    fn test_placeholders_are_three_items() {
        assert_eq!(demo().suggestions.len(), 3);
        assert_eq!(EMPTY_RESULT_SUGGESTIONS.len(), 3);
    }
}
