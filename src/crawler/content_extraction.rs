//! Content extraction functionality for the crawler module

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use crate::crawler::error::CrawlError;
use crate::sanitizer::sanitize;

/// Elements whose text is never part of the readable content
const EXCLUDED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "noscript"];

/// Containers preferred over the whole body, first match in document order
const CONTENT_CONTAINERS: &str = "main, article, .content, #content, .main-content";

static CONTENT_SELECTOR: LazyLock<Result<Selector, String>> =
    LazyLock::new(|| Selector::parse(CONTENT_CONTAINERS).map_err(|e| e.to_string()));

/// Title and readable text extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub text: String,
}

fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css)
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse selector '{}': {}", css, e)))
}

/// Extract the page title and its readable text, cut to `max_chars` and sanitized
pub fn extract_page(html: &str, max_chars: usize) -> Result<ExtractedPage, CrawlError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document)?;

    let content_selector = CONTENT_SELECTOR
        .as_ref()
        .map_err(|e| CrawlError::HtmlParse(e.clone()))?;
    let body_selector = selector("body")?;
    let root = document
        .select(content_selector)
        .next()
        .or_else(|| document.select(&body_selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let clamped: String = collapsed.chars().take(max_chars).collect();

    Ok(ExtractedPage {
        title,
        text: sanitize(&clamped),
    })
}

/// `<title>`, else the first `<h1>`, else "Untitled"
fn extract_title(document: &Html) -> Result<String, CrawlError> {
    for css in ["title", "h1"] {
        let found = document
            .select(&selector(css)?)
            .next()
            .map(|element| element.text().collect::<String>())
            .map(|text| sanitize(&text))
            .filter(|text| !text.is_empty());
        if let Some(title) = found {
            return Ok(title);
        }
    }
    Ok("Untitled".to_string())
}

/// Append the text of `element`, skipping excluded subtrees
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
            }
            Node::Element(el) => {
                if EXCLUDED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    // Block boundaries must not glue words together
                    out.push(' ');
                    collect_text(child_element, out);
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_content_container() {
        let html = r#"<html><head><title>Photosynthesis - Wiki</title></head>
            <body>
              <nav>Home | About</nav>
              <header>Site header</header>
              <main><p>Plants convert light.</p><p>Into chemical energy.</p></main>
              <footer>Copyright</footer>
            </body></html>"#;
        let page = extract_page(html, 5_000).unwrap();

        assert_eq!(page.title, "Photosynthesis - Wiki");
        assert_eq!(page.text, "Plants convert light. Into chemical energy.");
    }

    #[test]
    fn test_falls_back_to_body_without_excluded_elements() {
        let html = r#"<html><body>
              <h1>Cells</h1>
              <script>var tracking = 1;</script>
              <style>p { color: red; }</style>
              <aside>Related links</aside>
              <p>Cells are the basic unit of life.</p>
            </body></html>"#;
        let page = extract_page(html, 5_000).unwrap();

        assert_eq!(page.title, "Cells");
        assert_eq!(page.text, "Cells Cells are the basic unit of life.");
        assert!(!page.text.contains("tracking"));
        assert!(!page.text.contains("Related"));
    }

    #[test]
    fn test_untitled_and_truncated() {
        let html = format!("<html><body><p>{}</p></body></html>", "a".repeat(100));
        let page = extract_page(&html, 40).unwrap();

        assert_eq!(page.title, "Untitled");
        assert_eq!(page.text.chars().count(), 40);
    }

    #[test]
    fn test_encoded_markup_is_sanitized() {
        let html = "<html><body><article>Safe &lt;script&gt;alert(1)&lt;/script&gt; text</article></body></html>";
        let page = extract_page(html, 5_000).unwrap();

        assert!(crate::sanitizer::validate(&page.text));
        assert!(page.text.contains("Safe"));
    }
}
