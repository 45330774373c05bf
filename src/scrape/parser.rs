use scraper::{Html, Selector};

use crate::Document;

const LISTING_SELECTOR: &str = r#"a[data-track-action="view article"]"#;
const AFFILIATION_SELECTOR: &str = "p.c-article-author-affiliation__address";
const SUBJECT_SELECTOR: &str = r#"meta[name="dc.subject"]"#;

fn selector(css: &str) -> Selector {
    // Selectors are compile-time constants above.
    Selector::parse(css).expect("static selector")
}

/// Relative hrefs of the article links on one search results page.
/// An empty result means the listing has run out of pages.
pub fn parse_listing(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = selector(LISTING_SELECTOR);

    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(String::from)
        .collect()
}

/// Handles both the affiliation paragraphs and the `dc.subject` meta tags
pub fn parse_article(html: &str) -> Document {
    let document = Html::parse_document(html);
    let affiliations = selector(AFFILIATION_SELECTOR);
    let subjects = selector(SUBJECT_SELECTOR);

    Document {
        affiliations: document
            .select(&affiliations)
            .map(|p| p.text().collect::<String>())
            .collect(),
        subjects: document
            .select(&subjects)
            .filter_map(|meta| meta.value().attr("content"))
            .map(String::from)
            .collect(),
    }
}
