use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex"))
}

fn roll_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]{2,20}$").expect("static roll number regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email.trim())
}

/// 10 or 11 digits once punctuation and spaces are stripped.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    (10..=11).contains(&digits)
}

pub fn is_valid_roll_number(rollno: &str) -> bool {
    roll_re().is_match(rollno.trim())
}

/// ISO calendar date (`YYYY-MM-DD`), the only date format the store holds.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Trims and strips angle brackets; blank input becomes `None`.
pub fn clean_optional(raw: Option<&str>) -> Option<String> {
    let cleaned: String = raw?.trim().chars().filter(|c| *c != '<' && *c != '>').collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("head@school.edu"));
        assert!(is_valid_email(" a@b.co "));
        assert!(!is_valid_email("no-at.example.com"));
        assert!(!is_valid_email("two words@x.org"));
        assert!(!is_valid_email("a@nodot"));
    }

    #[test]
    fn phone_digit_count() {
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(is_valid_phone("0300-1234567"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("+1 (555) 123-45678"));
    }

    #[test]
    fn roll_numbers() {
        assert!(is_valid_roll_number("A1"));
        assert!(!is_valid_roll_number("A"));
        assert!(!is_valid_roll_number("A-12"));
    }

    #[test]
    fn dates_and_optional_text() {
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2023-02-29").is_none());
        assert!(parse_date("03/04/2024").is_none());
        assert_eq!(clean_optional(Some("  <b>hi</b> ")), Some("bhi/b".to_string()));
        assert_eq!(clean_optional(Some("   ")), None);
        assert_eq!(clean_optional(None), None);
    }
}
