use std::sync::OnceLock;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::debug;

use super::{ExtractedDocument, ExtractionError, PageContent};

const FETCH_TIMEOUT_SECS: u64 = 30;

/// One client for all page fetches, built on first use.
fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Selector for elements that carry readable page content. Iterating these
/// (instead of the whole body) keeps script and style text out of the result.
const CONTENT_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, td, th, blockquote, pre";

/// Download a web page and extract its readable text.
pub async fn fetch_url(url: &str) -> Result<ExtractedDocument, ExtractionError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| ExtractionError::Fetch(format!("invalid URL {url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractionError::Fetch(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let response = http_client()
        .get(url)
        .send()
        .await
        .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ExtractionError::Fetch(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

    let text = html_to_text(&body);
    debug!("Fetched {url}: {} chars of readable text", text.len());

    Ok(ExtractedDocument {
        source: url.to_string(),
        file_type: "web".to_string(),
        pages: vec![PageContent {
            page_number: 1,
            text,
        }],
    })
}

/// Extract readable text from an HTML document, one line per content element.
pub(crate) fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse(CONTENT_SELECTOR).expect("static selector is valid");

    let mut lines: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        // Skip containers whose text is fully covered by a selected child
        // (e.g. an <li> wrapping a <p>) to avoid duplicated passages.
        if element
            .select(&selector)
            .next()
            .is_some_and(|child| child.id() != element.id())
        {
            continue;
        }
        let text = element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            lines.push(text);
        }
    }

    if lines.is_empty() {
        // No content elements found -- fall back to the root text nodes.
        return document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paragraphs_and_headings() {
        let html = r#"<html><body>
            <h1>Fee Structure</h1>
            <p>Tuition is due by the first of the month.</p>
            <ul><li>Semester one</li><li>Semester two</li></ul>
        </body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Fee Structure"));
        assert!(text.contains("Tuition is due"));
        assert!(text.contains("Semester two"));
    }

    #[test]
    fn skips_scripts_and_styles() {
        let html = r#"<html><head><style>body { color: red; }</style></head><body>
            <script>var secret = "nope";</script>
            <p>Visible content.</p>
        </body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Visible content."));
        assert!(!text.contains("secret"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn collapses_whitespace() {
        let html = "<p>Spaced\n\n   out\ttext</p>";
        assert_eq!(html_to_text(html), "Spaced out text");
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let err = fetch_url("ftp://example.com/handbook.pdf").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Fetch(_)));
    }

    #[test]
    fn nested_content_elements_are_not_duplicated() {
        let html = "<li><p>Only once</p></li>";
        assert_eq!(html_to_text(html), "Only once");
    }
}
