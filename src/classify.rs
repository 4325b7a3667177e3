//! Fenced code block extraction from accumulated reply text.
//!
//! Invariant: classification is a pure function of the input text. It is
//! re-invoked over the entire buffer on every received chunk, so it keeps no
//! state between calls and a fence whose closing marker has not arrived yet
//! contributes nothing.

use std::sync::OnceLock;

use regex::Regex;

/// Language assigned to fenced blocks that carry no tag.
pub const PLAINTEXT_LANGUAGE: &str = "plaintext";

fn fenced_block_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?s)```(\w+)?\n(.*?)\n```").expect("fence regex must compile")
    })
}

/// One extracted block that is neither HTML, CSS, nor JavaScript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub language: String,
    pub code: String,
}

/// Extracted code blocks grouped by language category, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentBuckets {
    pub html: Vec<String>,
    pub css: Vec<String>,
    pub js: Vec<String>,
    pub other: Vec<Fragment>,
}

impl FragmentBuckets {
    /// Returns true when at least one web-renderable (html/css/js) block exists.
    #[must_use]
    pub fn has_web_fragments(&self) -> bool {
        !self.html.is_empty() || !self.css.is_empty() || !self.js.is_empty()
    }

    /// Returns true when no closed fenced block has been seen at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_web_fragments() && self.other.is_empty()
    }
}

/// Scans `full_text` for closed fenced code blocks and routes each one by its
/// (case-insensitively normalized) language tag: `html`, `css`, and
/// `javascript`/`js` land in their own buckets; everything else keeps its tag
/// and lands in `other`. An absent tag becomes [`PLAINTEXT_LANGUAGE`].
#[must_use]
pub fn classify(full_text: &str) -> FragmentBuckets {
    let mut buckets = FragmentBuckets::default();

    for captures in fenced_block_regex().captures_iter(full_text) {
        let language = captures
            .get(1)
            .map(|tag| tag.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| PLAINTEXT_LANGUAGE.to_string());
        let code = captures[2].to_string();

        match language.as_str() {
            "html" => buckets.html.push(code),
            "css" => buckets.css.push(code),
            "javascript" | "js" => buckets.js.push(code),
            _ => buckets.other.push(Fragment { language, code }),
        }
    }

    buckets
}
