//! Check digit calculation
//!
//! ISBN-13 and ISMN share the EAN-13 scheme (weights 1,3 alternating);
//! ISSN uses weights 8..2 modulo 11 with `X` standing for 10.

use shared::error::{AppError, AppResult};

fn parse_body(body: &str, len: usize) -> AppResult<Vec<u32>> {
    if body.len() != len {
        return Err(AppError::invalid_format(format!(
            "Expected {len} digits, got {:?}",
            body
        )));
    }
    body.chars()
        .map(|c| {
            c.to_digit(10)
                .ok_or_else(|| AppError::invalid_format(format!("Non-digit in {:?}", body)))
        })
        .collect()
}

/// Check digit for a 12-digit ISBN-13 / ISMN body
pub fn isbn_check_digit(body: &str) -> AppResult<char> {
    let digits = parse_body(body, 12)?;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    Ok(char::from(b'0' + check as u8))
}

/// Check character for a 7-digit ISSN body
pub fn issn_check_digit(body: &str) -> AppResult<char> {
    let digits = parse_body(body, 7)?;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (8 - i as u32))
        .sum();
    let check = (11 - sum % 11) % 11;
    Ok(if check == 10 {
        'X'
    } else {
        char::from(b'0' + check as u8)
    })
}

/// Validate a hyphenated ISBN-13 or ISMN
pub fn validate_isbn13(formatted: &str) -> bool {
    let compact: String = formatted.chars().filter(|c| *c != '-').collect();
    if compact.len() != 13 || !compact.is_ascii() {
        return false;
    }
    let (body, check) = compact.split_at(12);
    match isbn_check_digit(body) {
        Ok(expected) => check.starts_with(expected),
        Err(_) => false,
    }
}

/// Validate an ISSN in `dddd-dddX` form
pub fn validate_issn(formatted: &str) -> bool {
    let bytes = formatted.as_bytes();
    if bytes.len() != 9 || bytes[4] != b'-' || !formatted.is_ascii() {
        return false;
    }
    let body = format!("{}{}", &formatted[..4], &formatted[5..8]);
    match issn_check_digit(&body) {
        Ok(expected) => formatted[8..].starts_with(expected),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_isbn_check_digit() {
        assert_eq!(isbn_check_digit("978030640615").unwrap(), '7');
        assert_eq!(isbn_check_digit("978951000000").unwrap(), '7');
        assert_eq!(isbn_check_digit("978951000001").unwrap(), '4');
        // Deterministic
        assert_eq!(
            isbn_check_digit("978951000001").unwrap(),
            isbn_check_digit("978951000001").unwrap()
        );
    }

    #[test]
    fn test_ismn_check_digit() {
        assert_eq!(isbn_check_digit("979026000043").unwrap(), '8');
        assert!(validate_isbn13("979-0-2600-0043-8"));
        assert!(!validate_isbn13("979-0-2600-0043-9"));
    }

    #[test]
    fn test_issn_check_digit() {
        assert_eq!(issn_check_digit("0378595").unwrap(), '5');
        assert_eq!(issn_check_digit("2434561").unwrap(), 'X');
        assert!(validate_issn("0378-5955"));
        assert!(validate_issn("2434-561X"));
        assert!(!validate_issn("2434-5610"));
        assert!(!validate_issn("24345610X"));
    }

    #[test]
    fn test_malformed_body_rejected() {
        let err = isbn_check_digit("97895100000").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        let err = isbn_check_digit("97895100000a").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        let err = issn_check_digit("12345678").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_validate_isbn13_formatting() {
        assert!(validate_isbn13("978-951-000-000-7"));
        assert!(validate_isbn13("9789510000007"));
        assert!(!validate_isbn13("978-951-000-000"));
    }
}
