//! Internal case references with a check digit.
//!
//! Format: `TS-<ST>-<COUNTY>-<YYYYMMDD>-<RANDOM>-<CHECK>`
//!
//! - `ST`: two uppercase letters
//! - `COUNTY`: 3–8 uppercase alphanumerics
//! - `RANDOM`: 4 random alphanumerics + a 2-char base-36 counter that
//!   separates references minted within the same millisecond
//! - `CHECK`: `acc = (acc * 31 + value(c)) mod 36` folded over the core
//!   with dashes removed; digits are their value, `A`=10 … `Z`=35

use std::sync::{LazyLock, Mutex};

use chrono::NaiveDate;
use regex::Regex;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

const RAND_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CHECKSUM_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const COUNTER_MODULO: u32 = 36 * 36;

static CASE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^TS-([A-Z]{2})-([A-Z0-9]{3,8})-([0-9]{8})-([A-Z0-9]{6})-([A-Z0-9])$")
        .expect("valid case ref pattern")
});

static CASE_REF_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)TS-[A-Z]{2}-[A-Z0-9]{3,8}-[0-9]{8}-[A-Z0-9]{6}-[A-Z0-9]")
        .expect("valid case ref search pattern")
});

/// (last millisecond, counter within it)
static COUNTER: Mutex<(i64, u32)> = Mutex::new((0, 0));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaseRefError {
    #[error("case reference is not in the expected format")]
    Format,
    #[error("invalid check digit")]
    CheckDigit,
    #[error("invalid {part}: {value:?}")]
    Part { part: &'static str, value: String },
    #[error("system random source failed")]
    Random,
}

/// Components of a parsed case reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRefParts {
    pub state: String,
    pub county_code: String,
    /// `YYYYMMDD`
    pub date: String,
    pub random: String,
    pub check_digit: char,
}

fn char_value(c: char) -> u32 {
    match c {
        '0'..='9' => c as u32 - '0' as u32,
        'A'..='Z' => c as u32 - 'A' as u32 + 10,
        _ => 0,
    }
}

fn check_digit(core: &str) -> char {
    let modulo = CHECKSUM_ALPHABET.len() as u32;
    let acc = core
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .fold(0u32, |acc, c| (acc * 31 + char_value(c)) % modulo);
    CHECKSUM_ALPHABET[acc as usize] as char
}

fn random_block(rng: &SystemRandom, len: usize) -> Result<String, CaseRefError> {
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes).map_err(|_| CaseRefError::Random)?;
    Ok(bytes
        .iter()
        .map(|b| RAND_ALPHABET[*b as usize % RAND_ALPHABET.len()] as char)
        .collect())
}

fn to_base36(mut n: u32, width: usize) -> String {
    let mut digits = Vec::with_capacity(width);
    while n > 0 {
        digits.push(CHECKSUM_ALPHABET[(n % 36) as usize] as char);
        n /= 36;
    }
    while digits.len() < width {
        digits.push('0');
    }
    digits.iter().rev().collect()
}

fn next_counter() -> u32 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut guard = COUNTER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if guard.0 == now {
        guard.1 = (guard.1 + 1) % COUNTER_MODULO;
    } else {
        *guard = (now, 0);
    }
    guard.1
}

/// Mint a new case reference.
pub fn generate_case_ref(
    state: &str,
    county_code: &str,
    date: NaiveDate,
) -> Result<String, CaseRefError> {
    let state = state.to_ascii_uppercase();
    let county = county_code.to_ascii_uppercase();
    if state.len() != 2 || !state.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(CaseRefError::Part {
            part: "state",
            value: state,
        });
    }
    if !(3..=8).contains(&county.len()) || !county.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(CaseRefError::Part {
            part: "county code",
            value: county,
        });
    }

    let rng = SystemRandom::new();
    let random = format!("{}{}", random_block(&rng, 4)?, to_base36(next_counter(), 2));
    let base = format!("TS-{state}-{county}-{}-{random}", date.format("%Y%m%d"));
    let check = check_digit(&base);
    Ok(format!("{base}-{check}"))
}

/// Parse and verify a case reference.
pub fn parse_case_ref(case_ref: &str) -> Result<CaseRefParts, CaseRefError> {
    let caps = CASE_REF.captures(case_ref).ok_or(CaseRefError::Format)?;
    let base = &case_ref[..case_ref.len() - 2];
    let provided = caps[5].chars().next().ok_or(CaseRefError::Format)?;
    if check_digit(base) != provided {
        return Err(CaseRefError::CheckDigit);
    }
    Ok(CaseRefParts {
        state: caps[1].to_string(),
        county_code: caps[2].to_string(),
        date: caps[3].to_string(),
        random: caps[4].to_string(),
        check_digit: provided,
    })
}

pub fn validate_case_ref(case_ref: &str) -> bool {
    parse_case_ref(case_ref).is_ok()
}

/// First valid case reference mentioned in free text, upper-cased.
pub fn extract_case_ref(text: &str) -> Option<String> {
    CASE_REF_SEARCH
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_uppercase())
        .find(|candidate| validate_case_ref(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn generated_refs_validate() {
        let r = generate_case_ref("tx", "travis", date()).unwrap();
        assert!(r.starts_with("TS-TX-TRAVIS-20240301-"), "{r}");
        assert!(validate_case_ref(&r));
        let parts = parse_case_ref(&r).unwrap();
        assert_eq!(parts.state, "TX");
        assert_eq!(parts.county_code, "TRAVIS");
        assert_eq!(parts.date, "20240301");
        assert_eq!(parts.random.len(), 6);
    }

    #[test]
    fn refs_in_same_millisecond_differ() {
        let a = generate_case_ref("WA", "KING", date()).unwrap();
        let b = generate_case_ref("WA", "KING", date()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ref_fails_check_digit() {
        let r = generate_case_ref("FL", "ORANGE", date()).unwrap();
        let last = r.chars().last().unwrap();
        let replacement = if last == '0' { '1' } else { '0' };
        let tampered = format!("{}{replacement}", &r[..r.len() - 1]);
        assert_eq!(parse_case_ref(&tampered), Err(CaseRefError::CheckDigit));
    }

    #[test]
    fn malformed_refs_rejected() {
        assert_eq!(parse_case_ref("HT-R1001"), Err(CaseRefError::Format));
        assert_eq!(
            parse_case_ref("TS-TX-TRAVIS-2024031-ABCDEF-0"),
            Err(CaseRefError::Format)
        );
        assert!(!validate_case_ref(""));
    }

    #[test]
    fn invalid_parts_rejected() {
        assert!(matches!(
            generate_case_ref("TEX", "TRAVIS", date()),
            Err(CaseRefError::Part { part: "state", .. })
        ));
        assert!(matches!(
            generate_case_ref("TX", "T1", date()),
            Err(CaseRefError::Part { .. })
        ));
    }

    #[test]
    fn check_digit_known_value() {
        // "12" folds to (1 * 31 + 2) % 36 = 33 -> 'X'
        assert_eq!(check_digit("1-2"), 'X');
        assert_eq!(check_digit(""), '0');
    }

    #[test]
    fn extracts_from_text_case_insensitively() {
        let r = generate_case_ref("CA", "LA001", date()).unwrap();
        let text = format!("Re: claim {} filed today", r.to_lowercase());
        assert_eq!(extract_case_ref(&text), Some(r));
        assert_eq!(extract_case_ref("no reference here"), None);
    }

    #[test]
    fn base36_padding() {
        assert_eq!(to_base36(0, 2), "00");
        assert_eq!(to_base36(35, 2), "0Z");
        assert_eq!(to_base36(36, 2), "10");
    }
}
