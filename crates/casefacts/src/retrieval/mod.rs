//! Case-scoped lexical search over ingested page text.
//!
//! The primary path asks the FTS5 index (no stemming, diacritics kept) for
//! pages containing every query token. When that finds nothing, the first
//! query token of three or more characters is looked up as a plain
//! substring, in storage order, with a synthetic descending rank.

use serde::Serialize;

use crate::db::{search_repo, Database, DatabaseError};
use crate::processor::text::{normalize_whitespace, truncate_chars};

/// Snippet length, in characters.
pub const SNIPPET_CHARS: usize = 300;

/// Shortest token the substring fallback will search for.
pub const MIN_FALLBACK_TOKEN_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnippet {
    pub document_id: String,
    pub page_number: u32,
    pub snippet: String,
    pub rank: f64,
}

/// Lower-cased runs of alphanumeric characters.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Builds an FTS5 expression requiring every token, each as a quoted string.
fn match_expression(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn snippet(text: &str) -> String {
    truncate_chars(&normalize_whitespace(text), SNIPPET_CHARS)
}

/// Returns up to `limit` pages of the case matching `query`, best first.
pub fn retrieve_page_snippets(
    db: &Database,
    case_id: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<PageSnippet>, DatabaseError> {
    let _span = tracing::info_span!("retrieval.search", case_id, limit).entered();

    if limit == 0 {
        return Ok(Vec::new());
    }

    let tokens = tokenize(query);
    if !tokens.is_empty() {
        let hits = search_repo::ranked_pages(db, case_id, &match_expression(&tokens), limit)?;
        if !hits.is_empty() {
            return Ok(hits
                .into_iter()
                .map(|hit| PageSnippet {
                    snippet: snippet(&hit.text),
                    document_id: hit.document_id,
                    page_number: hit.page_number,
                    rank: hit.rank,
                })
                .collect());
        }
    }

    let Some(needle) = tokens
        .into_iter()
        .find(|t| t.chars().count() >= MIN_FALLBACK_TOKEN_CHARS)
    else {
        return Ok(Vec::new());
    };

    log::debug!("No full-text hit for case {}, scanning for '{}'", case_id, needle);

    let mut results = Vec::new();
    search_repo::pages_in_scan_order(db, case_id, |document_id, page_number, text| {
        if text.to_lowercase().contains(&needle) {
            results.push(PageSnippet {
                document_id: document_id.to_string(),
                page_number,
                snippet: snippet(text),
                rank: 0.001 * (limit - results.len()) as f64,
            });
        }
        results.len() < limit
    })?;

    Ok(results)
}
