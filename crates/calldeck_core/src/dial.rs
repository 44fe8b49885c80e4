//! Dialer and WhatsApp link construction for free-form phone values.
//!
//! Stored phones are only trimmed on import; canonicalization happens here,
//! at the calling surface.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_DIAL_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^+\d]").expect("valid dial chars regex"));

/// `tel:` link for the phone as stored.
pub fn tel_href(phone: &str) -> String {
    format!("tel:{}", phone.trim())
}

/// `wa.me` link for the phone.
///
/// Numbers with a leading `+` or `00` are international as written; anything
/// else is treated as national, loses its trunk zeros and gets
/// `default_country_code` in front. Returns `None` when no digits remain.
pub fn whatsapp_href(phone: &str, default_country_code: &str) -> Option<String> {
    let cleaned = NON_DIAL_CHARS_RE.replace_all(phone.trim(), "");
    let digits = cleaned
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }

    let international = if cleaned.starts_with('+') {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else {
        let country = default_country_code
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>();
        format!("{country}{}", digits.trim_start_matches('0'))
    };

    if international.is_empty() {
        None
    } else {
        Some(format!("https://wa.me/{international}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{tel_href, whatsapp_href};

    #[test]
    fn tel_href_keeps_phone_as_stored() {
        assert_eq!(tel_href(" +1 (555) 010-0 "), "tel:+1 (555) 010-0");
    }

    #[test]
    fn international_numbers_keep_their_prefix() {
        assert_eq!(
            whatsapp_href("+44 20 7946 0958", "+91").as_deref(),
            Some("https://wa.me/442079460958")
        );
        assert_eq!(
            whatsapp_href("0044 20 7946 0958", "+91").as_deref(),
            Some("https://wa.me/442079460958")
        );
    }

    #[test]
    fn national_numbers_get_default_country_code() {
        assert_eq!(
            whatsapp_href("098765-43210", "+91").as_deref(),
            Some("https://wa.me/919876543210")
        );
    }

    #[test]
    fn phones_without_digits_have_no_link() {
        assert_eq!(whatsapp_href("n/a", "+91"), None);
        assert_eq!(whatsapp_href("+", "+91"), None);
    }
}
