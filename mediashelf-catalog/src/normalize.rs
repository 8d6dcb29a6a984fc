//! Field-level rules shared by provider mappings.

use serde::Deserialize;
use serde_json::Value;

use crate::types::UNTITLED;

/// Text field that providers report either bare or wrapped.
///
/// Open Library uses all three shapes depending on the record's age.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TextField {
    Plain(String),
    Wrapped { value: Option<String> },
    List(Vec<String>),
}

impl TextField {
    pub(crate) fn into_text(self) -> Option<String> {
        match self {
            TextField::Plain(text) => Some(text),
            TextField::Wrapped { value } => value,
            TextField::List(items) => items.into_iter().find(|item| !item.is_empty()),
        }
    }
}

/// Drops missing and empty strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// First usable title among the candidates, else the "Untitled" sentinel.
pub(crate) fn title_or_untitled<I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .find_map(non_empty)
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Stringifies a provider identifier that may arrive as a number or a string.
pub(crate) fn stringify_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Stringifies a loosely-typed date or year, treating empty and zero as absent.
pub(crate) fn date_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    }
}

/// Rewrites an `http://` scheme to `https://`; other URLs pass through.
pub(crate) fn upgrade_to_https(url: String) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_title_fallback_order() {
        assert_eq!(
            title_or_untitled([Some("Alien".to_string()), Some("ignored".to_string())]),
            "Alien"
        );
        assert_eq!(
            title_or_untitled([None, Some("The Office".to_string())]),
            "The Office"
        );
        assert_eq!(title_or_untitled([Some(String::new()), None]), UNTITLED);
    }

    #[test]
    fn test_stringify_id() {
        assert_eq!(stringify_id(Some(&json!(603))).as_deref(), Some("603"));
        assert_eq!(stringify_id(Some(&json!("zyTCAlFPjgYC"))).as_deref(), Some("zyTCAlFPjgYC"));
        assert_eq!(stringify_id(Some(&json!(""))), None);
        assert_eq!(stringify_id(Some(&Value::Null)), None);
        assert_eq!(stringify_id(None), None);
    }

    #[test]
    fn test_date_string() {
        assert_eq!(date_string(Some(&json!(1954))).as_deref(), Some("1954"));
        assert_eq!(date_string(Some(&json!("2004-05"))).as_deref(), Some("2004-05"));
        assert_eq!(date_string(Some(&json!(""))), None);
        assert_eq!(date_string(Some(&json!(0))), None);
    }

    #[test]
    fn test_upgrade_to_https() {
        assert_eq!(
            upgrade_to_https("http://books.google.com/content?id=1&img=1".to_string()),
            "https://books.google.com/content?id=1&img=1"
        );
        assert_eq!(
            upgrade_to_https("https://image.example/a.jpg".to_string()),
            "https://image.example/a.jpg"
        );
    }

    #[test]
    fn test_text_field_shapes() {
        let plain: TextField = serde_json::from_value(json!("It was a dark night.")).unwrap();
        let wrapped: TextField =
            serde_json::from_value(json!({ "type": "/type/text", "value": "Wrapped." })).unwrap();
        let list: TextField = serde_json::from_value(json!(["", "First."])).unwrap();

        assert_eq!(plain.into_text().as_deref(), Some("It was a dark night."));
        assert_eq!(wrapped.into_text().as_deref(), Some("Wrapped."));
        assert_eq!(list.into_text().as_deref(), Some("First."));
    }
}
