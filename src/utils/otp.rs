use regex::Regex;
use std::sync::OnceLock;

fn labelled_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:code|otp|pin|password)\b\s*(?:is)?\s*[:#-]?\s*([A-Z0-9]{4,8})\b")
            .unwrap()
    })
}

fn numeric_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{3}[- ]\d{3}|\d{4,8})\b").unwrap()
    })
}

/// 从短信/邮件正文中提取验证码
///
/// A code following a "code"/"OTP"/"PIN" label wins; otherwise the first standalone run of
/// 4-8 digits (or a `123-456` split code) is used.
pub fn extract_code(text: &str) -> Option<String> {
    if let Some(caps) = labelled_code().captures(text)
        && let Some(m) = caps.get(1)
        && m.as_str().chars().any(|c| c.is_ascii_digit())
    {
        return Some(m.as_str().to_string());
    }

    numeric_code()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).collect())
}
