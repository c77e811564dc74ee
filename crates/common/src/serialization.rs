//! JSON output helpers.
//!
//! Metric files are written pretty-printed with two-space indentation and
//! literal (unescaped) non-ASCII text, with keys in insertion order.

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize to the metric-file JSON layout.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON")
}

/// Same as [`to_pretty_json`] with a trailing newline.
pub fn to_pretty_json_line<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = to_pretty_json(value)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_json_keeps_unicode_and_order() {
        let value = json!({"zeta": "翻译", "alpha": 1});
        let text = to_pretty_json(&value).unwrap();
        assert!(text.contains("翻译"));
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert!(text.contains("\n  \"alpha\""));
    }

    #[test]
    fn test_json_line_ends_with_newline() {
        assert!(to_pretty_json_line(&json!([1])).unwrap().ends_with('\n'));
    }
}
