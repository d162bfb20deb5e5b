//! Builders for test fixtures.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

use casefacts::WorkerConfig;

/// Builds a PDF with a text layer, one page per entry and one text object
/// per line. Lines must be plain ASCII without parentheses or backslashes.
pub struct PdfBuilder {
    pages: Vec<Vec<String>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    pub fn page(mut self, lines: &[&str]) -> Self {
        self.pages
            .push(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in &self.pages {
            let mut content = String::new();
            for (i, line) in lines.iter().enumerate() {
                content.push_str(&format!(
                    "BT /F1 11 Tf 40 {} Td ({}) Tj ET\n",
                    760 - 14 * i,
                    line
                ));
            }
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("Failed to serialize PDF");
        buffer
    }
}

/// A notarial deed spread over two pages, ASCII only.
pub fn deed_pdf() -> Vec<u8> {
    PdfBuilder::new()
        .page(&[
            "Acte de vente du 10 novembre 1997",
            "Prix de vente 200 000 euros",
            "soit 1.300.000 francs",
        ])
        .page(&[
            "La SCI du Moulin detient 830 parts",
            "Regime fiscal IR article 8 CGI",
            "Le moulin est inscrit MH 12/03/1985",
        ])
        .build()
}

/// Worker settings for tests: fast polling, a fixed id.
pub fn worker_config(worker_id: &str) -> WorkerConfig {
    WorkerConfig {
        worker_id: worker_id.to_string(),
        poll_interval_ms: 10,
        stale_lock_timeout_ms: 600_000,
        extractor_version: "test-v1".to_string(),
        ..WorkerConfig::default()
    }
}
