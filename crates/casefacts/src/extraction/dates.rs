//! Mentioned dates and dated heritage listings.

use regex::Regex;
use std::sync::LazyLock;

use super::locale::parse_french_date;
use super::{FactDraft, FactValue, PageInput};

static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4}|[0-9]{1,2}\s+(?:janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre)\s+[0-9]{4})\b",
    )
    .unwrap()
});

static RE_HERITAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\binscrit\s+MH\s+([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4})\b").unwrap()
});

/// Every calendar date written out on the page. Impossible dates are skipped.
pub fn extract_mentioned_dates(page: &PageInput<'_>) -> Vec<FactDraft> {
    RE_DATE
        .captures_iter(page.text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let date = parse_french_date(&caps[1])?;
            Some(FactDraft {
                fact_type: "date:mentioned",
                label: "Date mentionnée",
                value: FactValue::Date(date),
                unit: None,
                currency: None,
                confidence: 0.8,
                source: page.source_for(&whole),
            })
        })
        .collect()
}

/// "inscrit MH <date>" (Monument Historique listing).
///
/// When the date does not parse the raw text is kept as a string value, so a
/// listing is never lost to a typo in its date.
pub fn extract_heritage_listings(page: &PageInput<'_>) -> Vec<FactDraft> {
    RE_HERITAGE
        .captures_iter(page.text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let raw = &caps[1];
            let value = match parse_french_date(raw) {
                Some(date) => FactValue::Date(date),
                None => FactValue::Text(raw.to_string()),
            };
            Some(FactDraft {
                fact_type: "asset:heritage_listing",
                label: "Inscription MH",
                value,
                unit: None,
                currency: None,
                confidence: 0.9,
                source: page.source_for(&whole),
            })
        })
        .collect()
}
