//! Preview/editor document synthesis from classified code fragments.

use crate::classify::FragmentBuckets;
use crate::document::{Document, HTML_LANGUAGE};

/// Paired outputs of one synthesis pass. Preview and editor always describe
/// the same reply state; they differ only in how the host chooses to render
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub preview: Document,
    pub editor: Document,
}

impl Synthesis {
    fn mirrored(document: Document) -> Self {
        Self {
            preview: document.clone(),
            editor: document,
        }
    }
}

/// Derives the preview and editor documents for one bucket snapshot.
///
/// Policy, in priority order: any html/css/js fragments are combined into one
/// complete HTML page; otherwise the last remaining fragment wins as-is;
/// otherwise the fixed `fallback` page is used. Pure function of its inputs —
/// identical buckets produce byte-identical documents.
#[must_use]
pub fn synthesize(buckets: &FragmentBuckets, fallback: &Document) -> Synthesis {
    if buckets.has_web_fragments() {
        return Synthesis::mirrored(Document::new(combined_page(buckets), HTML_LANGUAGE));
    }

    if let Some(last) = buckets.other.last() {
        return Synthesis::mirrored(Document::new(last.code.clone(), last.language.clone()));
    }

    Synthesis::mirrored(fallback.clone())
}

/// Wraps the html/css/js buckets into one standalone page: the stylesheet is
/// inlined in `<style>` when present, the body carries the concatenated HTML
/// fragments, and the script is inlined in `<script>` when present.
fn combined_page(buckets: &FragmentBuckets) -> String {
    let html = buckets.html.join("\n");
    let css = buckets.css.join("\n");
    let js = buckets.js.join("\n");

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n");
    page.push_str("<html lang=\"en\">\n");
    page.push_str("<head>\n");
    page.push_str("    <meta charset=\"UTF-8\">\n");
    page.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    page.push_str("    <title>Live Preview</title>\n");
    if !css.is_empty() {
        page.push_str("    <style>");
        page.push_str(&css);
        page.push_str("</style>\n");
    }
    page.push_str("</head>\n");
    page.push_str("<body>\n");
    if !html.is_empty() {
        page.push_str(&html);
        page.push('\n');
    }
    if !js.is_empty() {
        page.push_str("    <script>");
        page.push_str(&js);
        page.push_str("</script>\n");
    }
    page.push_str("</body>\n");
    page.push_str("</html>");
    page
}
