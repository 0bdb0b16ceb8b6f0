//! Client class detection from request headers

use std::sync::LazyLock;

use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use regex::Regex;

use crate::types::ClientClass;

static MOBILE_USER_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Mobile|Android|iPhone|iPad|iPod|Windows Phone")
        .expect("Invalid mobile user agent regex")
});

/// Headers set by hybrid app shells
const HYBRID_APP_HEADERS: &[&str] = &["x-capacitor-client", "x-ionic-client"];

/// Mobile when the user agent says so, a hybrid app header is present, or
/// the body asked for it
pub fn detect(headers: &HeaderMap, body_flag: bool) -> ClientClass {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let is_mobile = body_flag
        || MOBILE_USER_AGENT.is_match(user_agent)
        || HYBRID_APP_HEADERS
            .iter()
            .any(|name| headers.contains_key(*name));

    ClientClass::from_mobile_flag(is_mobile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_user_agent(ua: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(ua));
        headers
    }

    #[test]
    fn test_mobile_user_agents() {
        for ua in [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)",
            "Mozilla/5.0 (Linux; android 14; Pixel 8)",
            "Mozilla/5.0 (Windows Phone 10.0)",
        ] {
            assert_eq!(detect(&with_user_agent(ua), false), ClientClass::Mobile, "{ua}");
        }
    }

    #[test]
    fn test_desktop_is_standard() {
        let headers = with_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0");
        assert_eq!(detect(&headers, false), ClientClass::Standard);
        assert_eq!(detect(&HeaderMap::new(), false), ClientClass::Standard);
    }

    #[test]
    fn test_hybrid_header_and_body_flag() {
        let mut headers = HeaderMap::new();
        headers.insert("x-capacitor-client", HeaderValue::from_static("true"));
        assert_eq!(detect(&headers, false), ClientClass::Mobile);
        assert_eq!(detect(&HeaderMap::new(), true), ClientClass::Mobile);
    }
}
