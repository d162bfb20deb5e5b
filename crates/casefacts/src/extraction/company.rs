//! Company facts: share counts and tax regime.

use regex::Regex;
use std::sync::LazyLock;

use super::{FactDraft, FactValue, PageInput};

static RE_SHARES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([0-9]{1,6})\s+parts?\b").unwrap());

static RE_TAX_IR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bIR\s+article\s+8\s+CGI\b").unwrap());

/// "830 parts": number of company shares.
pub fn extract_shares(page: &PageInput<'_>) -> Vec<FactDraft> {
    RE_SHARES
        .captures_iter(page.text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let count: f64 = caps[1].parse().ok()?;
            Some(FactDraft {
                fact_type: "company:shares",
                label: "Nombre de parts",
                value: FactValue::Number(count),
                unit: Some("parts"),
                currency: None,
                confidence: 0.9,
                source: page.source_for(&whole),
            })
        })
        .collect()
}

/// Income-tax transparency under article 8 of the Code général des impôts.
pub fn extract_tax_regime(page: &PageInput<'_>) -> Vec<FactDraft> {
    RE_TAX_IR
        .find_iter(page.text)
        .map(|m| FactDraft {
            fact_type: "company:tax",
            label: "Régime fiscal",
            value: FactValue::Text("IR (article 8 CGI)".to_string()),
            unit: None,
            currency: None,
            confidence: 0.95,
            source: page.source_for(&m),
        })
        .collect()
}
