//! Currency amounts and valuation ranges.
//!
//! The euro sign is a non-word character, so it is accepted without a
//! trailing word boundary; spelled units (`euros`, `francs`, `fr`) need one.

use regex::Regex;
use std::sync::LazyLock;

use super::locale::parse_french_number;
use super::{FactDraft, FactValue, PageInput};

static RE_EUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,3}(?:[ .\x{202f}][0-9]{3})*(?:,[0-9]+)?)\s*(€|euros?\b)").unwrap()
});

static RE_FRANC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,3}(?:[ .\x{202f}][0-9]{3})*(?:,[0-9]+)?)\s*(francs?|fr)\b").unwrap()
});

static RE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bentre\s+([0-9]{1,3}(?:[ .\x{202f}][0-9]{3})*(?:,[0-9]+)?)\s*(?:€|euros?\b)\s+et\s+([0-9]{1,3}(?:[ .\x{202f}][0-9]{3})*(?:,[0-9]+)?)\s*(?:€|euros?\b)",
    )
    .unwrap()
});

struct Currency {
    fact_type: &'static str,
    label: &'static str,
    code: &'static str,
}

const EUR: Currency = Currency {
    fact_type: "amount:eur",
    label: "Montant (€)",
    code: "EUR",
};

const FRF: Currency = Currency {
    fact_type: "amount:franc",
    label: "Montant (FRF)",
    code: "FRF",
};

const AMOUNT_CONFIDENCE: f64 = 0.9;

/// Single amounts: every euro match first, then every franc match.
pub fn extract_amounts(page: &PageInput<'_>) -> Vec<FactDraft> {
    let mut out = scan_currency(page, &RE_EUR, &EUR);
    out.extend(scan_currency(page, &RE_FRANC, &FRF));
    out
}

fn scan_currency(page: &PageInput<'_>, re: &Regex, currency: &Currency) -> Vec<FactDraft> {
    re.captures_iter(page.text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = parse_french_number(&caps[1])?;
            Some(FactDraft {
                fact_type: currency.fact_type,
                label: currency.label,
                value: FactValue::Number(value),
                unit: None,
                currency: Some(currency.code),
                confidence: AMOUNT_CONFIDENCE,
                source: page.source_for(&whole),
            })
        })
        .collect()
}

/// "entre X € et Y €" phrasing, reported as one `"X–Y EUR"` string fact.
pub fn extract_value_ranges(page: &PageInput<'_>) -> Vec<FactDraft> {
    RE_RANGE
        .captures_iter(page.text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let low = parse_french_number(&caps[1])?;
            let high = parse_french_number(&caps[2])?;
            Some(FactDraft {
                fact_type: "valuation:range",
                label: "Fourchette de valeur",
                value: FactValue::Text(format!("{low}–{high} EUR")),
                unit: None,
                currency: Some(EUR.code),
                confidence: AMOUNT_CONFIDENCE,
                source: page.source_for(&whole),
            })
        })
        .collect()
}
