//! Deterministic, pattern-based fact extraction from page text.
//!
//! Each extractor is a pure function from a page to a list of drafts.
//! `extract_facts_from_page` concatenates them in a fixed category order,
//! each category in match order. Overlapping matches across categories are
//! kept as separate facts.

pub mod amounts;
pub mod company;
pub mod dates;
pub mod excerpt;
pub mod locale;

use chrono::NaiveDate;
use regex::Match;
use serde::{Deserialize, Serialize};

pub use excerpt::{clip_excerpt, Locator};

/// The single populated value slot of a fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FactValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// Page text handed to the extractors.
#[derive(Debug, Clone, Copy)]
pub struct PageInput<'a> {
    pub document_id: &'a str,
    pub page_number: u32,
    pub text: &'a str,
}

/// Where a drafted fact was found.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDraft {
    pub document_id: String,
    pub page_number: u32,
    pub excerpt: String,
    pub locator: Locator,
}

/// A fact produced by an extractor, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FactDraft {
    pub fact_type: &'static str,
    pub label: &'static str,
    pub value: FactValue,
    pub unit: Option<&'static str>,
    pub currency: Option<&'static str>,
    pub confidence: f64,
    pub source: SourceDraft,
}

impl PageInput<'_> {
    /// Builds the provenance record for a regex match on this page.
    pub(crate) fn source_for(&self, m: &Match<'_>) -> SourceDraft {
        let (excerpt, locator) = clip_excerpt(self.text, m.start(), m.end());
        SourceDraft {
            document_id: self.document_id.to_string(),
            page_number: self.page_number,
            excerpt,
            locator,
        }
    }
}

/// Runs every extractor over one page.
pub fn extract_facts_from_page(document_id: &str, page_number: u32, text: &str) -> Vec<FactDraft> {
    let _span = tracing::info_span!("extraction.page", document_id, page_number).entered();

    let page = PageInput {
        document_id,
        page_number,
        text,
    };

    let mut facts = Vec::new();
    facts.extend(amounts::extract_amounts(&page));
    facts.extend(amounts::extract_value_ranges(&page));
    facts.extend(dates::extract_mentioned_dates(&page));
    facts.extend(company::extract_shares(&page));
    facts.extend(company::extract_tax_regime(&page));
    facts.extend(dates::extract_heritage_listings(&page));

    log::debug!(
        "Extracted {} facts from document {} page {}",
        facts.len(),
        document_id,
        page_number
    );

    facts
}
