//! PII structural validators.
//!
//! Each validator pairs a cheap regex prefilter with a structural check
//! (checksum, range, format) and a context-window keyword boost. A match's
//! base confidence comes from the structural check; nearby keywords (e.g.
//! "ssn", "social security") raise it. Confidence is clamped to `[0.0, 1.0]`.

use crate::types::DataType;
use once_cell::sync::Lazy;
use regex::Regex;

const CONTEXT_WINDOW: usize = 50;
const CONTEXT_BOOST: f32 = 0.2;

/// A found span plus the validator's confidence that it really is the
/// claimed data type.
#[derive(Debug, Clone)]
pub struct Match {
    pub data_type: DataType,
    pub start: usize,
    pub end: usize,
    pub value: String,
    pub confidence: f32,
}

fn context_slice(text: &str, start: usize, end: usize) -> &str {
    let lo = start.saturating_sub(CONTEXT_WINDOW);
    let hi = (end + CONTEXT_WINDOW).min(text.len());
    // byte indices must land on char boundaries; widen outward defensively.
    let lo = (lo..=start).find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    let hi = (hi..=text.len())
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(text.len());
    &text[lo..hi]
}

fn boost_for_keywords(context: &str, keywords: &[&str]) -> f32 {
    if has_any_keyword(context, keywords) {
        CONTEXT_BOOST
    } else {
        0.0
    }
}

fn has_any_keyword(context: &str, keywords: &[&str]) -> bool {
    let lower = context.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn clamp_confidence(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{3})-(\d{2})-(\d{4})\b").unwrap());

/// US Social Security Number: `AAA-GG-SSSS` structural ranges from SSA
/// allocation rules (area 000/666/900-999, group 00, serial 0000 are invalid).
pub fn find_ssn(text: &str) -> Vec<Match> {
    SSN_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let m = cap.get(0)?;
            let area: u32 = cap.get(1)?.as_str().parse().ok()?;
            let group: u32 = cap.get(2)?.as_str().parse().ok()?;
            let serial: u32 = cap.get(3)?.as_str().parse().ok()?;
            if area == 0 || area == 666 || area >= 900 || group == 0 || serial == 0 {
                return None;
            }
            let context = context_slice(text, m.start(), m.end());
            let confidence = if has_any_keyword(context, &["ssn", "social security", "social-security"]) {
                0.95
            } else if has_any_keyword(context, &["order", "invoice", "ticket"]) {
                0.3
            } else {
                0.7
            };
            Some(Match {
                data_type: DataType::Ssn,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            })
        })
        .collect()
}

static CC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").unwrap());

fn luhn_valid(digits: &str) -> bool {
    let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Credit card PAN via Luhn checksum. The prefilter matches 13-19 digit runs
/// (optionally grouped by space or hyphen) before running Luhn. A payment
/// keyword in context raises confidence; a phone-number keyword (a common
/// false-positive source for 16-digit-looking sequences) drops it instead.
pub fn find_credit_card(text: &str) -> Vec<Match> {
    CC_RE
        .find_iter(text)
        .filter_map(|m| {
            let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
            if !luhn_valid(&digits) {
                return None;
            }
            let context = context_slice(text, m.start(), m.end());
            let confidence = if has_any_keyword(
                context,
                &["card", "visa", "mastercard", "amex", "cc#", "credit card", "payment"],
            ) {
                0.95
            } else if has_any_keyword(context, &["phone", "call", "tel", "mobile", "cell"]) {
                0.2
            } else {
                0.75
            };
            Some(Match {
                data_type: DataType::CreditCard,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            })
        })
        .collect()
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+\b").unwrap()
});

/// Email addresses. Regex shape alone is a strong enough signal that
/// no checksum exists; confidence starts high and is not keyword-boosted.
pub fn find_email(text: &str) -> Vec<Match> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| Match {
            data_type: DataType::Email,
            start: m.start(),
            end: m.end(),
            value: m.as_str().to_string(),
            confidence: 0.95,
        })
        .collect()
}

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").unwrap());

/// North American phone numbers (NANP). No checksum exists, so confidence
/// relies heavily on keyword context to separate phone numbers from other
/// 10-digit sequences (order numbers, account numbers, etc). "zip"/"price"/
/// "year" context marks a structural false positive and drops confidence.
pub fn find_phone(text: &str) -> Vec<Match> {
    PHONE_RE
        .find_iter(text)
        .map(|m| {
            let context = context_slice(text, m.start(), m.end());
            let confidence = if has_any_keyword(context, &["phone", "call", "tel", "mobile", "cell"]) {
                0.7
            } else if has_any_keyword(context, &["zip", "price", "year"]) {
                0.2
            } else {
                0.5
            };
            Match {
                data_type: DataType::Phone,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            }
        })
        .collect()
}

static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b").unwrap()
});

/// IPv4 addresses; the regex itself bounds each octet to 0-255. Loopback,
/// private (RFC1918), and other reserved ranges are lower-signal PII than a
/// routable public address; a "version" keyword in context (e.g. a dotted
/// version number that happens to parse as four octets) drops it further.
pub fn find_ipv4(text: &str) -> Vec<Match> {
    IPV4_RE
        .find_iter(text)
        .map(|m| {
            let ip = m.as_str();
            let context = context_slice(text, m.start(), m.end());
            let confidence = if has_any_keyword(context, &["version"]) {
                0.1
            } else if is_non_routable_ipv4(ip) {
                0.5
            } else {
                0.8
            };
            Match {
                data_type: DataType::Ip,
                start: m.start(),
                end: m.end(),
                value: ip.to_string(),
                confidence,
            }
        })
        .collect()
}

/// Loopback (127/8), private (RFC1918: 10/8, 172.16/12, 192.168/16),
/// link-local (169.254/16), "this network" (0/8), and multicast/reserved
/// (224/4 and above).
fn is_non_routable_ipv4(ip: &str) -> bool {
    let octets: Vec<u8> = ip.split('.').filter_map(|o| o.parse().ok()).collect();
    let [a, b, ..] = octets[..] else { return false };
    match a {
        0 | 127 | 10 => true,
        172 => (16..=31).contains(&b),
        192 => b == 168,
        169 => b == 254,
        224..=255 => true,
        _ => false,
    }
}

static IBAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b").unwrap());

/// IBAN via mod-97 checksum (ISO 7064). The country+check-digit prefix is
/// moved to the end and letters are converted to two-digit numbers
/// (A=10 .. Z=35) before taking the remainder mod 97.
pub fn find_iban(text: &str) -> Vec<Match> {
    IBAN_RE
        .find_iter(text)
        .filter_map(|m| {
            if !iban_checksum_valid(m.as_str()) {
                return None;
            }
            let context = context_slice(text, m.start(), m.end());
            let confidence = clamp_confidence(
                0.8 + boost_for_keywords(context, &["iban", "bank", "account"]),
            );
            Some(Match {
                data_type: DataType::Iban,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            })
        })
        .collect()
}

fn iban_checksum_valid(iban: &str) -> bool {
    if iban.len() < 15 || iban.len() > 34 {
        return false;
    }
    let rearranged = format!("{}{}", &iban[4..], &iban[..4]);
    let mut numeric = String::with_capacity(rearranged.len() * 2);
    for c in rearranged.chars() {
        if c.is_ascii_digit() {
            numeric.push(c);
        } else if c.is_ascii_uppercase() {
            numeric.push_str(&(c as u32 - 'A' as u32 + 10).to_string());
        } else {
            return false;
        }
    }
    // mod-97 on a long numeric string, computed in chunks to avoid overflow.
    let mut remainder: u64 = 0;
    for chunk in numeric.as_bytes().chunks(9) {
        let chunk_str = std::str::from_utf8(chunk).unwrap();
        let combined = format!("{remainder}{chunk_str}");
        remainder = combined.parse::<u64>().unwrap_or(0) % 97;
    }
    remainder == 1
}

static PASSPORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{1,2}\d{6,9}\b").unwrap());

/// Passport numbers have no universal checksum; this recognizes the common
/// 1-2 letter + 6-9 digit shape and leans entirely on context for confidence.
pub fn find_passport(text: &str) -> Vec<Match> {
    PASSPORT_RE
        .find_iter(text)
        .map(|m| {
            let context = context_slice(text, m.start(), m.end());
            let confidence = clamp_confidence(
                0.35 + boost_for_keywords(context, &["passport", "travel document"]),
            );
            Match {
                data_type: DataType::Passport,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            }
        })
        .filter(|m| m.confidence >= 0.5)
        .collect()
}

static DOB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(0?[1-9]|1[0-2])[/-](0?[1-9]|[12]\d|3[01])[/-](19|20)\d{2}\b").unwrap());

/// Dates of birth: MM/DD/YYYY or MM-DD-YYYY with a plausible year range,
/// boosted heavily by "born"/"dob" context since bare dates are ambiguous.
pub fn find_dob(text: &str) -> Vec<Match> {
    DOB_RE
        .find_iter(text)
        .map(|m| {
            let context = context_slice(text, m.start(), m.end());
            let confidence = clamp_confidence(
                0.3 + boost_for_keywords(context, &["dob", "date of birth", "born"]),
            );
            Match {
                data_type: DataType::Dob,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            }
        })
        .filter(|m| m.confidence >= 0.4)
        .collect()
}

static DL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]\d{7,8}\b").unwrap());

/// US driver's license numbers vary by state; this recognizes the common
/// one-letter-plus-digits shape used by many states and relies on context.
pub fn find_driver_license(text: &str) -> Vec<Match> {
    DL_RE
        .find_iter(text)
        .map(|m| {
            let context = context_slice(text, m.start(), m.end());
            let confidence = clamp_confidence(
                0.3 + boost_for_keywords(context, &["license", "dl#", "driver"]),
            );
            Match {
                data_type: DataType::DriverLicense,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            }
        })
        .filter(|m| m.confidence >= 0.5)
        .collect()
}

static BANK_ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{8,17}\b").unwrap());

/// Bank account numbers (8-17 digits, no universal checksum) — relies almost
/// entirely on "account"/"acct" keyword context to avoid false positives on
/// arbitrary long integers.
pub fn find_bank_account(text: &str) -> Vec<Match> {
    BANK_ACCOUNT_RE
        .find_iter(text)
        .map(|m| {
            let context = context_slice(text, m.start(), m.end());
            let confidence = clamp_confidence(
                0.2 + boost_for_keywords(context, &["account", "acct", "iban", "routing"]),
            );
            Match {
                data_type: DataType::BankAccount,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            }
        })
        .filter(|m| m.confidence >= 0.4)
        .collect()
}

static ABA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{9}\b").unwrap());

/// ABA routing number: 9 digits with the standard weighted checksum
/// (3,7,1 repeating) required to equal 0 mod 10. Supplements the original
/// validator set with a bank-routing-specific check distinct from the
/// generic bank-account heuristic above.
pub fn find_aba_routing(text: &str) -> Vec<Match> {
    ABA_RE
        .find_iter(text)
        .filter_map(|m| {
            if !aba_checksum_valid(m.as_str()) {
                return None;
            }
            let context = context_slice(text, m.start(), m.end());
            let confidence = clamp_confidence(
                0.65 + boost_for_keywords(context, &["routing", "aba", "wire", "ach"]),
            );
            Some(Match {
                data_type: DataType::AbaRouting,
                start: m.start(),
                end: m.end(),
                value: m.as_str().to_string(),
                confidence,
            })
        })
        .collect()
}

fn aba_checksum_valid(digits: &str) -> bool {
    let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 9 {
        return false;
    }
    let weights = [3, 7, 1, 3, 7, 1, 3, 7, 1];
    let sum: u32 = d.iter().zip(weights.iter()).map(|(digit, w)| digit * w).sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssn_rejects_invalid_area() {
        assert!(find_ssn("area 000-12-3456 is invalid").is_empty());
        assert!(find_ssn("area 666-12-3456 is invalid").is_empty());
    }

    #[test]
    fn ssn_accepts_valid_with_context_boost() {
        let matches = find_ssn("my ssn is 123-45-6789");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].confidence > 0.7);
    }

    #[test]
    fn luhn_validates_known_test_number() {
        assert!(luhn_valid("4111111111111111"));
        assert!(!luhn_valid("4111111111111112"));
    }

    #[test]
    fn credit_card_requires_luhn_pass() {
        assert!(find_credit_card("card 4111111111111111 expires").len() == 1);
        assert!(find_credit_card("card 1234567890123456 expires").is_empty());
    }

    #[test]
    fn credit_card_shaped_number_in_phone_context_is_suppressed() {
        let matches = find_credit_card("Phone: 4111 1111 1111 1111");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].confidence < 0.5);
    }

    #[test]
    fn ssn_drops_confidence_in_order_context() {
        let matches = find_ssn("invoice 123-45-6789 for services rendered");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].confidence < 0.5);
    }

    #[test]
    fn phone_drops_confidence_in_zip_context() {
        let matches = find_phone("zip code area 415-555-0100");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].confidence < 0.5);
    }

    #[test]
    fn email_matches_basic_address() {
        let matches = find_email("contact me at jane.doe@example.com please");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, "jane.doe@example.com");
    }

    #[test]
    fn ipv4_rejects_out_of_range_octets() {
        assert!(find_ipv4("not an ip: 999.999.999.999").is_empty());
        assert_eq!(find_ipv4("server at 10.0.0.1 listening").len(), 1);
    }

    #[test]
    fn ipv4_private_address_is_lower_confidence_than_public() {
        let private = find_ipv4("internal host 10.0.0.1 responded");
        let public = find_ipv4("client at 8.8.8.8 connected");
        assert!(private[0].confidence < public[0].confidence);
    }

    #[test]
    fn ipv4_version_context_drops_confidence() {
        let matches = find_ipv4("running version 1.2.3.4 in production");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].confidence < 0.5);
    }

    #[test]
    fn iban_checksum_validates_known_good() {
        // A commonly cited valid example IBAN (Germany).
        assert!(iban_checksum_valid("DE89370400440532013000"));
        assert!(!iban_checksum_valid("DE89370400440532013001"));
    }

    #[test]
    fn aba_routing_checksum() {
        assert!(aba_checksum_valid("021000021"));
        assert!(!aba_checksum_valid("021000022"));
    }

    #[test]
    fn bank_account_needs_context_to_surface() {
        assert!(find_bank_account("the number 12345678 appeared").is_empty());
        assert!(!find_bank_account("account number 12345678 on file").is_empty());
    }

    #[test]
    fn confidence_is_always_clamped() {
        assert_eq!(clamp_confidence(1.5), 1.0);
        assert_eq!(clamp_confidence(-0.5), 0.0);
    }
}
