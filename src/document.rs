//! Preview/editor artifact type and the fixed fallback document.

use serde::{Deserialize, Serialize};

/// Language tag used for synthesized and fallback documents.
pub const HTML_LANGUAGE: &str = "html";

/// Complete standalone page shown before any recognizable code has streamed in.
pub const FALLBACK_DOCUMENT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Live Preview</title>
    <style>
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background-color: #1a202c;
            color: #e2e8f0;
        }
        .container {
            text-align: center;
            padding: 30px;
            border-radius: 15px;
            background: #2a2e3a;
            max-width: 80%;
        }
        h1 {
            color: #9f7aea;
            font-size: 2.5em;
            margin-bottom: 15px;
        }
        p {
            font-size: 1.1em;
            line-height: 1.6;
            color: #a0aec0;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Live Preview</h1>
        <p>Code from the current reply renders here as it streams in.</p>
        <p>Ask for HTML, CSS, or JavaScript to see it come to life.</p>
    </div>
</body>
</html>"#;

/// One renderable artifact: source text plus its language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    pub code: String,
    pub language: String,
}

impl Document {
    /// Creates a document from code and a language tag.
    #[must_use]
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }

    /// Returns the fixed fallback page used before any code has appeared.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(FALLBACK_DOCUMENT_HTML, HTML_LANGUAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, FALLBACK_DOCUMENT_HTML, HTML_LANGUAGE};

    #[test]
    fn fallback_is_a_standalone_html_page() {
        let fallback = Document::fallback();

        assert_eq!(fallback.language, HTML_LANGUAGE);
        assert!(fallback.code.starts_with("<!DOCTYPE html>"));
        assert!(fallback.code.contains("<head>"));
        assert!(fallback.code.contains("<body>"));
        assert!(fallback.code.ends_with("</html>"));
    }

    #[test]
    fn fallback_round_trips_through_json() {
        let fallback = Document::fallback();
        let serialized = serde_json::to_string(&fallback).expect("fallback serializes");
        let restored: Document = serde_json::from_str(&serialized).expect("fallback deserializes");

        assert_eq!(restored, fallback);
        assert_eq!(restored.code, FALLBACK_DOCUMENT_HTML);
    }
}
