//! HTML to markdown rendering
//!
//! Fetched pages are handed to link discovery and to the extractor as
//! markdown, the form the extraction prompt expects. The renderer keeps
//! document text and links and drops everything else:
//! - `<title>` becomes a leading `# heading`
//! - headings, paragraphs and other block elements are separated by blank lines
//! - `<a href>` becomes `[text](absolute-url)`
//! - `<script>`, `<style>`, `<noscript>` and similar are dropped

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Markdown rendering of an HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Body text as markdown
    pub markdown: String,
}

/// Renders an HTML document to markdown
///
/// # Arguments
///
/// * `html` - The HTML content to render
/// * `base_url` - The page URL, for resolving relative links
///
/// # Example
///
/// ```
/// use news_ripple::crawler::html_to_markdown;
/// use url::Url;
///
/// let html = r#"<html><head><title>Budget</title></head>
///     <body><p>Read <a href="/NewsDetail.aspx?newsID=2">more</a></p></body></html>"#;
/// let base_url = Url::parse("https://merolagani.com/").unwrap();
/// let page = html_to_markdown(html, &base_url);
/// assert_eq!(page.title.as_deref(), Some("Budget"));
/// assert!(page.markdown.contains("[more](https://merolagani.com/NewsDetail.aspx?newsID=2)"));
/// ```
pub fn html_to_markdown(html: &str, base_url: &Url) -> RenderedPage {
    let document = Html::parse_document(html);
    let title = extract_title(&document);

    let mut writer = MarkdownWriter::new(base_url);
    if let Some(title) = &title {
        writer.push_inline(&format!("# {}", title));
        writer.block_break();
    }

    match body(&document) {
        Some(body) => writer.render_children(body),
        None => writer.render_children(document.root_element()),
    }

    RenderedPage {
        title,
        markdown: writer.finish(),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn body(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body").ok()?;
    document.select(&selector).next()
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be rendered as plain text:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links (same page anchors)
/// - Invalid or non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct MarkdownWriter<'a> {
    base_url: &'a Url,
    out: String,
    pending_space: bool,
}

impl<'a> MarkdownWriter<'a> {
    fn new(base_url: &'a Url) -> Self {
        Self {
            base_url,
            out: String::new(),
            pending_space: false,
        }
    }

    fn render_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.render_element(child_element);
            } else if let Some(text) = child.value().as_text() {
                self.push_text(text);
            }
        }
    }

    fn render_element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        match name {
            "script" | "style" | "noscript" | "template" | "head" | "svg" | "iframe"
            | "img" => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    self.block_break();
                    self.push_inline(&format!("{} {}", "#".repeat(level), text));
                    self.block_break();
                }
            }
            "br" => self.line_break(),
            "li" => {
                self.line_break();
                self.push_inline("- ");
                self.render_children(element);
                self.line_break();
            }
            "tr" => {
                self.line_break();
                self.render_children(element);
                self.line_break();
            }
            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav"
            | "aside" | "blockquote" | "ul" | "ol" | "table" | "form" | "figure" | "pre" => {
                self.block_break();
                self.render_children(element);
                self.block_break();
            }
            "a" => self.render_anchor(element),
            _ => self.render_children(element),
        }
    }

    fn render_anchor(&mut self, element: ElementRef<'_>) {
        let target = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, self.base_url));

        match target {
            Some(url) => {
                let text = collapse_whitespace(&element.text().collect::<String>())
                    .replace(['[', ']'], "");
                self.push_inline(&format!("[{}]({})", text, url));
            }
            None => self.render_children(element),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let collapsed = collapse_whitespace(text);
        if collapsed.is_empty() {
            self.pending_space = true;
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        self.push_inline(&collapsed);
        self.pending_space = text.ends_with(char::is_whitespace);
    }

    fn push_inline(&mut self, s: &str) {
        if self.pending_space && !self.out.is_empty() && !self.out.ends_with(char::is_whitespace)
        {
            self.out.push(' ');
        }
        self.pending_space = false;
        self.out.push_str(s);
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.pending_space = false;
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            if self.out.ends_with('\n') {
                self.out.push('\n');
            } else {
                self.out.push_str("\n\n");
            }
        }
        self.pending_space = false;
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}
