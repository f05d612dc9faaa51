use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+\d{10,15}$").unwrap())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !email_regex().is_match(email.trim()) {
        return Err(AppError::ValidationError(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// 验证密码强度
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::ValidationError(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AppError::ValidationError(
            "Password must contain letters and numbers".to_string(),
        ));
    }

    Ok(())
}

/// 规范化尼日利亚手机号：080xxxxxxxx / 234xxxxxxxxxx → +234xxxxxxxxxx
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 && digits.starts_with('0') {
        format!("+234{}", &digits[1..])
    } else if digits.len() == 13 && digits.starts_with("234") {
        format!("+{digits}")
    } else if phone.trim().starts_with('+') {
        format!("+{digits}")
    } else {
        phone.trim().to_string()
    }
}

pub fn validate_phone(phone: &str) -> AppResult<String> {
    let formatted = format_phone(phone);
    if !phone_regex().is_match(&formatted) {
        return Err(AppError::ValidationError(
            "Invalid phone number, use the international format (+234xxxxxxxxxx)".to_string(),
        ));
    }
    Ok(formatted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("password").is_err()); // 缺少数字
        assert!(validate_password("12345678").is_err()); // 缺少字母
        assert!(validate_password("pass12").is_err()); // 太短
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email(" ada@example.com ").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("08012345678"), "+2348012345678");
        assert_eq!(format_phone("2348012345678"), "+2348012345678");
        assert_eq!(format_phone("+234 801 234 5678"), "+2348012345678");
        assert_eq!(format_phone("+44 7700 900123"), "+447700900123");
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("0801-234-5678").unwrap(), "+2348012345678");
        assert!(validate_phone("12345").is_err());
    }
}
