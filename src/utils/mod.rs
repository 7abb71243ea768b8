//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Truncate text to a maximum length in bytes, respecting char boundaries
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut cut = max_len.saturating_sub(3);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

/// Parse a base URL, making sure relative joins land below it
///
/// `Url::join` drops the last path segment unless the base ends with `/`.
pub fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("Invalid base URL: {raw}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Hide all but the first characters of a secret for display
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::from("<unset>");
    }
    let visible: String = secret.chars().take(2).collect();
    format!("{visible}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world  "), "hello world");
        assert_eq!(normalize_whitespace("bad\n\ngateway"), "bad gateway");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("very long text here", 10), "very lo...");
        // multi-byte chars are never split
        assert_eq!(truncate_text("ééééé", 6), "é...");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = base_url("https://channeldock.com/portal/api/v2/center").unwrap();
        assert_eq!(
            url.join("shipment").unwrap().as_str(),
            "https://channeldock.com/portal/api/v2/center/shipment"
        );

        let url = base_url("https://my.dhlecommerce.nl/").unwrap();
        assert_eq!(
            url.join("api/user/login").unwrap().as_str(),
            "https://my.dhlecommerce.nl/api/user/login"
        );

        assert!(base_url("not a url").is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<unset>");
        assert_eq!(mask_secret("hunter2"), "hu***");
    }
}
