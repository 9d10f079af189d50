use chrono::Utc;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

/// The identity a client presents to the service: the numeric device/web id
/// and the synthetic user id embedded in every cookie.
///
/// An identity is created once at client construction and threaded through
/// every call, so there is no hidden process-wide state. Two clients built
/// from [`ClientIdentity::generate`] never share an identity.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Numeric web/device id, in the range the web client draws from.
    pub web_id: u64,
    /// Hex user id without hyphens, as the web client stores it in `uid_tt`.
    pub user_id: String,
}

impl ClientIdentity {
    /// Generates a fresh random identity.
    pub fn generate() -> Self {
        let web_id = rand::thread_rng().gen_range(7_000_000_000_000_000_000..8_000_000_000_000_000_000);
        Self {
            web_id,
            user_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Builds an identity from explicit values, e.g. to pin the identity of a
    /// session across client instances.
    pub fn new(web_id: u64, user_id: impl Into<String>) -> Self {
        Self {
            web_id,
            user_id: user_id.into(),
        }
    }

    /// Assembles the `Cookie` header value for a request.
    ///
    /// The session token appears under `sid_tt`, `sessionid` and
    /// `sessionid_ss` (with `sid_tt` repeated), exactly as the browser client
    /// sends it; the field names and their order are part of the
    /// compatibility surface.
    pub(crate) fn cookie(&self, session_token: &str) -> String {
        let timestamp = Utc::now().timestamp();
        [
            format!("_tea_web_id={}", self.web_id),
            "is_staff_user=false".to_string(),
            "store-region=cn-gd".to_string(),
            "store-region-src=uid".to_string(),
            format!(
                "sid_guard={session_token}%7C{timestamp}%7C5184000%7CMon%2C+03-Feb-2025+08%3A17%3A09+GMT"
            ),
            format!("uid_tt={}", self.user_id),
            format!("uid_tt_ss={}", self.user_id),
            format!("sid_tt={session_token}"),
            format!("sessionid={session_token}"),
            format!("sessionid_ss={session_token}"),
            format!("sid_tt={session_token}"),
        ]
        .join("; ")
    }
}

/// The browser-like default header set every request carries.
pub(crate) fn browser_headers() -> HeaderMap {
    const ENTRIES: &[(&str, &str)] = &[
        ("accept", "application/json, text/plain, */*"),
        ("accept-language", "zh-CN,zh;q=0.9"),
        ("cache-control", "no-cache"),
        ("last-event-id", "undefined"),
        ("appid", "513695"),
        ("appvr", "5.8.0"),
        ("origin", "https://jimeng.jianying.com"),
        ("pragma", "no-cache"),
        ("priority", "u=1, i"),
        ("referer", "https://jimeng.jianying.com"),
        ("pf", "7"),
        (
            "sec-ch-ua",
            "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
        (
            "user-agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        ),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in ENTRIES {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identities_are_distinct() {
        let a = ClientIdentity::generate();
        let b = ClientIdentity::generate();
        assert_ne!(a.user_id, b.user_id);
        assert_eq!(a.user_id.len(), 32);
        assert!(a.web_id >= 7_000_000_000_000_000_000);
    }

    #[test]
    fn test_cookie_embeds_the_session_token_under_each_name() {
        let identity = ClientIdentity::new(7_000_000_000_000_000_001, "deadbeef");
        let cookie = identity.cookie("tok123");

        assert!(cookie.contains("sid_tt=tok123"));
        assert!(cookie.contains("sessionid=tok123"));
        assert!(cookie.contains("sessionid_ss=tok123"));
        assert!(cookie.contains("uid_tt=deadbeef"));
        assert!(cookie.contains("_tea_web_id=7000000000000000001"));
        assert!(cookie.starts_with("_tea_web_id="));
    }

    #[test]
    fn test_browser_headers_carry_the_app_identity() {
        let headers = browser_headers();
        assert_eq!(headers.get("appid").unwrap(), "513695");
        assert_eq!(headers.get("origin").unwrap(), "https://jimeng.jianying.com");
    }
}
