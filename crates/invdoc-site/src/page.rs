//! HTML page shell.

use std::fmt::Write;

/// Data for rendering one page.
pub struct PageData {
    pub title: String,
    pub html_content: String,
    pub stylesheets: Vec<String>,
}

/// Render a complete HTML page.
pub fn render_page(page: &PageData) -> String {
    let mut html = String::with_capacity(page.html_content.len() + 512);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(&page.title));
    for href in &page.stylesheets {
        let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape(href));
    }
    html.push_str("</head>\n<body>\n<main>\n");
    html.push_str(&page.html_content);
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

/// Page title: text of the first `# ` heading, else `fallback`.
pub fn extract_title(markdown: &str, fallback: &str) -> String {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}

/// Escape text for HTML content and attribute values.
fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
