use crate::domain::model::NA;
use regex::Regex;
use std::sync::LazyLock;

// 不做大小寫轉換、IDNA 或移除埠號，host 原樣回傳
static DOMAIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?([^/]+)").unwrap());

/// Returns the host part of the first `http(s)://[www.]host` match, if any.
pub fn try_extract(url: &str) -> Option<&str> {
    DOMAIN_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Host of `url` with a leading `www.` removed, or `"NA"` when the string
/// does not look like an http(s) URL.
pub fn extract(url: &str) -> String {
    try_extract(url).unwrap_or(NA).to_string()
}
