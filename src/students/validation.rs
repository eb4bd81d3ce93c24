/// Input Validation Module
///
/// Input checks for CPF numbers and birth dates.
///
/// The CPF check covers shape only (eleven digits, not all the same). The
/// check-digit computation is not performed.
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static CPF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{11}$").expect("valid CPF pattern"));
static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4})$").expect("valid date pattern"));

const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2050;
/// Students must be born at least this many calendar years ago.
pub const MIN_AGE_YEARS: i32 = 5;

/// Exactly 11 ASCII digits, not all identical.
pub fn verify_cpf(cpf: &str) -> bool {
    if !CPF_PATTERN.is_match(cpf) {
        return false;
    }
    let first = cpf.as_bytes()[0];
    !cpf.bytes().all(|b| b == first)
}

/// A `dd/mm/yyyy` birth date within range and at least five years before
/// the year of `today`.
///
/// Day and month are range-checked independently (`31/02` passes), as the
/// legacy check did.
pub fn verify_birth_date(value: &str, today: NaiveDate) -> bool {
    let caps = match DATE_PATTERN.captures(value) {
        Some(caps) => caps,
        None => return false,
    };
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());
    let (day, month, year) = match (part(1), part(2), part(3)) {
        (Some(d), Some(m), Some(y)) => (d, m, y),
        _ => return false,
    };

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return false;
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return false;
    }
    today.year() - year >= MIN_AGE_YEARS
}

/// [`verify_birth_date`] against the local date.
pub fn verify_birth_date_now(value: &str) -> bool {
    verify_birth_date(value, chrono::Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_verify_cpf() {
        assert!(verify_cpf("12345678901"));
        assert!(!verify_cpf("11111111111"));
        assert!(!verify_cpf("1234567890"));
        assert!(!verify_cpf("123456789012"));
        assert!(!verify_cpf("123.456.789-01"));
        assert!(!verify_cpf(""));
        assert!(!verify_cpf("١٢٣٤٥٦٧٨٩٠١"));
    }

    #[test]
    fn test_cpf_check_digits_are_not_verified() {
        // 12345678900 has wrong check digits and still passes the shape check.
        assert!(verify_cpf("12345678900"));
    }

    #[test]
    fn test_verify_birth_date() {
        assert!(verify_birth_date("15/08/2010", today()));
        assert!(verify_birth_date("01/01/2019", today()));
        assert!(!verify_birth_date("01/01/2020", today()));
        assert!(!verify_birth_date("31/12/1799", today()));
        assert!(!verify_birth_date("00/01/2010", today()));
        assert!(!verify_birth_date("32/01/2010", today()));
        assert!(!verify_birth_date("01/13/2010", today()));
        assert!(!verify_birth_date("1/1/2010", today()));
        assert!(!verify_birth_date("2010-01-01", today()));
        assert!(!verify_birth_date("", today()));
        assert!(verify_birth_date("31/02/2010", today()));
    }

    #[test]
    fn test_upper_year_bound() {
        let far_future = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
        assert!(verify_birth_date("01/01/2050", far_future));
        assert!(!verify_birth_date("01/01/2051", far_future));
    }
}
