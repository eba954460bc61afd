use crate::model::Value;

/// Scheme code from a `CODE/Description` cell: the text before the first `/`,
/// trimmed. Blank cells and values without a `/` have no code.
pub fn extract_scheme_code(value: &Value) -> Option<String> {
    let text = value.as_text()?;
    if text.trim().is_empty() {
        return None;
    }
    text.split_once('/').map(|(code, _)| code.trim().to_string())
}

/// Descriptor text after the code prefix (`129B/ABSL Fund` -> `ABSL Fund`),
/// or the whole string when there is no `/`.
pub fn strip_code_prefix(descriptor: &str) -> &str {
    descriptor
        .split_once('/')
        .map(|(_, rest)| rest)
        .unwrap_or(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_code_before_first_slash() {
        assert_eq!(
            extract_scheme_code(&Value::text("129B/ABSL Flexi Cap Fund")).as_deref(),
            Some("129B")
        );
        assert_eq!(
            extract_scheme_code(&Value::text(" 12 /A/B")).as_deref(),
            Some("12")
        );
        assert_eq!(extract_scheme_code(&Value::text("/Orphan")).as_deref(), Some(""));
    }

    #[test]
    fn no_slash_or_blank_has_no_code() {
        assert_eq!(extract_scheme_code(&Value::text("NoSlash")), None);
        assert_eq!(extract_scheme_code(&Value::Empty), None);
        assert_eq!(extract_scheme_code(&Value::text("   ")), None);
        assert_eq!(extract_scheme_code(&Value::NotFound), None);
        assert_eq!(extract_scheme_code(&Value::Number(129.0)), None);
    }

    #[test]
    fn strip_prefix() {
        assert_eq!(strip_code_prefix("129B/ABSL Fund"), "ABSL Fund");
        assert_eq!(strip_code_prefix("ABSL Fund"), "ABSL Fund");
    }
}
