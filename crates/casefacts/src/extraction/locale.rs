//! French number and date conventions found in notarial and valuation deeds.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static RE_NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{1,2})[/-]([0-9]{1,2})[/-]([0-9]{4})\b").unwrap());

static RE_SPELLED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([0-9]{1,2})\s+(janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre)\s+([0-9]{4})\b",
    )
    .unwrap()
});

/// Parses a French-formatted number: space, narrow no-break space or period
/// as thousands separator, comma as decimal separator.
///
/// Returns `None` when the result is not a finite number.
pub fn parse_french_number(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{202f}')
        .collect();

    let normalized = strip_grouping_periods(&compact).replacen(',', ".", 1);
    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Drops every `.` that is followed by exactly three digits and then a word
/// boundary (`1.234.567` but not `1.5` or `1.2345`).
fn strip_grouping_periods(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == '.' && is_thousands_group(&chars[i + 1..]) {
            continue;
        }
        out.push(c);
    }
    out
}

fn is_thousands_group(rest: &[char]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(|c| c.is_ascii_digit())
        && !matches!(rest.get(3), Some(c) if is_word_char(*c))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Maps a French month name (accented or not, lower case) to its number.
pub fn french_month(name: &str) -> Option<u32> {
    let month = match name {
        "janvier" => 1,
        "février" | "fevrier" => 2,
        "mars" => 3,
        "avril" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" => 7,
        "août" | "aout" => 8,
        "septembre" => 9,
        "octobre" => 10,
        "novembre" => 11,
        "décembre" | "decembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parses `D/M/YYYY`, `D-M-YYYY` or `D <mois> YYYY`.
///
/// Calendar validation is strict: `31/02/2000` yields `None` rather than
/// rolling over into March.
pub fn parse_french_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    if let Some(caps) = RE_NUMERIC_DATE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let lower = s.to_lowercase();
    if let Some(caps) = RE_SPELLED_DATE.captures(&lower) {
        let day: u32 = caps[1].parse().ok()?;
        let month = french_month(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBER_CASES: &[(&str, Option<f64>)] = &[
        ("200 000", Some(200000.0)),
        ("200.000", Some(200000.0)),
        ("200\u{202f}000", Some(200000.0)),
        ("1.250.000,75", Some(1250000.75)),
        ("200,5", Some(200.5)),
        ("12", Some(12.0)),
        ("1.5", Some(1.5)),
        ("1.2345", Some(1.2345)),
        ("1,2,3", None),
        ("abc", None),
        ("", None),
    ];

    #[test]
    fn test_parse_french_number_cases() {
        for (raw, expected) in NUMBER_CASES {
            assert_eq!(parse_french_number(raw), *expected, "input {:?}", raw);
        }
    }

    #[test]
    fn test_parse_numeric_dates() {
        let expected = NaiveDate::from_ymd_opt(1997, 11, 10);
        assert_eq!(parse_french_date("10/11/1997"), expected);
        assert_eq!(parse_french_date("10-11-1997"), expected);
        assert_eq!(parse_french_date(" 1/2/2003 "), NaiveDate::from_ymd_opt(2003, 2, 1));
    }

    #[test]
    fn test_parse_spelled_dates() {
        let expected = NaiveDate::from_ymd_opt(1997, 11, 10);
        assert_eq!(parse_french_date("10 novembre 1997"), expected);
        assert_eq!(parse_french_date("10 Novembre 1997"), expected);
        assert_eq!(
            parse_french_date("3 février 2001"),
            parse_french_date("3 fevrier 2001")
        );
        assert_eq!(
            parse_french_date("15 AOÛT 1990"),
            NaiveDate::from_ymd_opt(1990, 8, 15)
        );
    }

    #[test]
    fn test_invalid_calendar_dates_rejected() {
        assert_eq!(parse_french_date("31/02/2000"), None);
        assert_eq!(parse_french_date("99/99/9999"), None);
        assert_eq!(parse_french_date("30 février 2020"), None);
        assert_eq!(parse_french_date("0/1/2000"), None);
    }

    #[test]
    fn test_unrecognized_date_text() {
        assert_eq!(parse_french_date("hier"), None);
        assert_eq!(parse_french_date("10 brumaire 1799"), None);
    }

    #[test]
    fn test_french_month_names() {
        assert_eq!(french_month("janvier"), Some(1));
        assert_eq!(french_month("décembre"), Some(12));
        assert_eq!(french_month("december"), None);
    }
}
