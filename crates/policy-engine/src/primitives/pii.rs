//! PII detection and redaction (C1).
//!
//! A closed set of regex patterns, each producing zero or more
//! [`PiiMatch`]es. Patterns are not mutually exclusive by design - a credit
//! card digit run can also look like a phone number - so callers must not
//! assume matches partition the text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiType {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
    Name,
    Address,
    DateOfBirth,
}

impl PiiType {
    pub fn label(self) -> &'static str {
        match self {
            PiiType::Email => "EMAIL",
            PiiType::Phone => "PHONE",
            PiiType::Ssn => "SSN",
            PiiType::CreditCard => "CREDIT_CARD",
            PiiType::IpAddress => "IP_ADDRESS",
            PiiType::Name => "NAME",
            PiiType::Address => "ADDRESS",
            PiiType::DateOfBirth => "DATE_OF_BIRTH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiMatch {
    #[serde(rename = "type")]
    pub pii_type: PiiType,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub confidence: Confidence,
}

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("static pattern is valid"))
        }
    };
}

cached_regex!(email_re, r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}");
cached_regex!(phone_re, r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}");
cached_regex!(ssn_re, r"\d{3}-\d{2}-\d{4}");
cached_regex!(credit_card_re, r"\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}");
cached_regex!(
    ipv4_re,
    r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"
);
cached_regex!(name_re, r"\b[A-Z][a-z]+\s[A-Z][a-z]+\b");
cached_regex!(
    address_re,
    r"(?i)\b\d+\s+[A-Za-z0-9.\s]+\s(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way|place|pl)\b"
);
cached_regex!(
    dob_re,
    r"\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{4}-\d{2}-\d{2})\b"
);

/// Scans `text` for every pattern in the closed set and returns all matches.
pub fn detect(text: &str) -> Vec<PiiMatch> {
    let mut matches = Vec::new();

    for m in email_re().find_iter(text) {
        let value = m.as_str();
        let confidence = if value.contains('@') && value.contains('.') {
            Confidence::High
        } else {
            Confidence::Low
        };
        matches.push(PiiMatch { pii_type: PiiType::Email, value: value.to_string(), start: m.start(), end: m.end(), confidence });
    }

    for m in phone_re().find_iter(text) {
        let value = m.as_str();
        let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();
        let confidence = if digit_count == 10 || digit_count == 11 { Confidence::High } else { Confidence::Low };
        matches.push(PiiMatch { pii_type: PiiType::Phone, value: value.to_string(), start: m.start(), end: m.end(), confidence });
    }

    for m in ssn_re().find_iter(text) {
        matches.push(PiiMatch { pii_type: PiiType::Ssn, value: m.as_str().to_string(), start: m.start(), end: m.end(), confidence: Confidence::High });
    }

    for m in credit_card_re().find_iter(text) {
        let value = m.as_str();
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        let confidence = if digits.len() == 16 && luhn_valid(&digits) { Confidence::High } else { Confidence::Low };
        matches.push(PiiMatch { pii_type: PiiType::CreditCard, value: value.to_string(), start: m.start(), end: m.end(), confidence });
    }

    for m in ipv4_re().find_iter(text) {
        let value = m.as_str();
        let confidence = if value.split('.').all(|octet| octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false)) {
            Confidence::High
        } else {
            Confidence::Low
        };
        matches.push(PiiMatch { pii_type: PiiType::IpAddress, value: value.to_string(), start: m.start(), end: m.end(), confidence });
    }

    for m in name_re().find_iter(text) {
        matches.push(PiiMatch { pii_type: PiiType::Name, value: m.as_str().to_string(), start: m.start(), end: m.end(), confidence: Confidence::Low });
    }

    for m in address_re().find_iter(text) {
        matches.push(PiiMatch { pii_type: PiiType::Address, value: m.as_str().to_string(), start: m.start(), end: m.end(), confidence: Confidence::Medium });
    }

    for m in dob_re().find_iter(text) {
        matches.push(PiiMatch { pii_type: PiiType::DateOfBirth, value: m.as_str().to_string(), start: m.start(), end: m.end(), confidence: Confidence::Medium });
    }

    matches
}

/// Luhn checksum, used to raise confidence on credit-card-shaped matches.
fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    let mut double = false;
    for c in digits.chars().rev() {
        let Some(mut d) = c.to_digit(10) else { return false };
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// Redacts every match by overwriting its span with a repeated character.
/// Matches are applied back-to-front (sorted descending by start) so
/// earlier spans' byte offsets stay valid as later ones are rewritten.
pub fn redact_with_char(text: &str, matches: &[PiiMatch], ch: char) -> String {
    redact(text, matches, |m| ch.to_string().repeat(m.value.chars().count()))
}

/// Redacts every match with a `[TYPE_REDACTED]` label in place of the span.
pub fn redact_with_labels(text: &str, matches: &[PiiMatch]) -> String {
    redact(text, matches, |m| format!("[{}_REDACTED]", m.pii_type.label()))
}

fn redact(text: &str, matches: &[PiiMatch], replacement: impl Fn(&PiiMatch) -> String) -> String {
    let mut ordered: Vec<&PiiMatch> = matches.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let mut out = text.to_string();
    for m in ordered {
        if m.start > out.len() || m.end > out.len() || m.start > m.end {
            continue;
        }
        out.replace_range(m.start..m.end, &replacement(m));
    }
    out
}

/// Convenience wrapper matching the spec's naming for the labeled form.
pub fn redact_pii_with_labels(text: &str) -> String {
    redact_with_labels(text, &detect(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email_with_high_confidence() {
        let matches = detect("contact me at jane.doe@example.com please");
        let m = matches.iter().find(|m| m.pii_type == PiiType::Email).unwrap();
        assert_eq!(m.confidence, Confidence::High);
    }

    #[test]
    fn detects_ssn_exact_shape() {
        let matches = detect("ssn is 123-45-6789 on file");
        assert!(matches.iter().any(|m| m.pii_type == PiiType::Ssn && m.confidence == Confidence::High));
    }

    #[test]
    fn luhn_valid_card_gets_high_confidence() {
        // 4111 1111 1111 1111 is a well-known Luhn-valid test number.
        let matches = detect("card 4111 1111 1111 1111 exp 01/28");
        let card = matches.iter().find(|m| m.pii_type == PiiType::CreditCard).unwrap();
        assert_eq!(card.confidence, Confidence::High);
    }

    #[test]
    fn luhn_invalid_card_gets_low_confidence() {
        let matches = detect("card 1234 5678 9012 3456");
        let card = matches.iter().find(|m| m.pii_type == PiiType::CreditCard).unwrap();
        assert_eq!(card.confidence, Confidence::Low);
    }

    #[test]
    fn ipv4_out_of_range_octet_is_low_confidence() {
        let matches = detect("host at 999.1.1.1 responded");
        let ip = matches.iter().find(|m| m.pii_type == PiiType::IpAddress).unwrap();
        assert_eq!(ip.confidence, Confidence::Low);
    }

    #[test]
    fn ipv4_valid_octets_is_high_confidence() {
        let matches = detect("host at 10.0.0.1 responded");
        let ip = matches.iter().find(|m| m.pii_type == PiiType::IpAddress).unwrap();
        assert_eq!(ip.confidence, Confidence::High);
    }

    #[test]
    fn redact_round_trip_with_labels() {
        let text = "Contact: test@example.com, phone 555-123-4567";
        let redacted = redact_pii_with_labels(text);
        assert!(redacted.contains("[EMAIL_REDACTED]"));
        assert!(redacted.contains("[PHONE_REDACTED]"));
        assert!(redacted.contains("Contact:"));
    }

    #[test]
    fn redact_with_char_preserves_length_per_match() {
        let text = "email a@b.com end";
        let matches = detect(text);
        let redacted = redact_with_char(text, &matches, '*');
        assert!(redacted.contains("*****"));
        assert!(redacted.ends_with("end"));
    }
}
