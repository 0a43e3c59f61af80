//! Input checks shared by every creation path and by the blacklist.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DossierError, Result};

// Same acceptance as the admin page: four 0-255 octets, up to two leading zeros.
static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .expect("static IPv4 pattern compiles")
});

pub fn is_valid_ipv4(ip: &str) -> bool {
    IPV4.is_match(ip)
}

/// Trims `ip` and checks it, returning the trimmed form.
pub fn normalize_ip(ip: &str) -> Result<String> {
    let trimmed = ip.trim();
    if trimmed.is_empty() || !is_valid_ipv4(trimmed) {
        return Err(DossierError::InvalidIp(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trims a required field, failing if nothing is left.
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DossierError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Splits comma-delimited tag input. Blank elements are dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_syntax() {
        assert!(is_valid_ipv4("1.2.3.4"));
        assert!(is_valid_ipv4("255.255.255.255"));
        assert!(is_valid_ipv4("092.52.166.230"));
        assert!(!is_valid_ipv4("256.1.1.1"));
        assert!(!is_valid_ipv4("1.2.3"));
        assert!(!is_valid_ipv4("1.2.3.4.5"));
        assert!(!is_valid_ipv4("::1"));
        assert!(!is_valid_ipv4("unknown"));
    }

    #[test]
    fn normalize_ip_trims_before_checking() {
        assert_eq!(normalize_ip("  10.0.0.1 ").unwrap(), "10.0.0.1");
        assert!(matches!(normalize_ip("256.1.1.1"), Err(DossierError::InvalidIp(_))));
        assert!(matches!(normalize_ip("   "), Err(DossierError::InvalidIp(_))));
    }

    #[test]
    fn tags_are_trimmed_and_blanks_dropped() {
        assert_eq!(parse_tags(" scam , ,fraud,"), vec!["scam", "fraud"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn required_text_rejects_whitespace() {
        assert!(require_text("title", "  \n ").is_err());
        assert_eq!(require_text("title", " Test ").unwrap(), "Test");
    }
}
