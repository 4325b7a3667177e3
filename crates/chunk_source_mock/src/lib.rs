//! Deterministic mock implementation of the shared `chunk_source` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing. Scripted chunks are
//! re-split on whitespace boundaries so hosts see realistic token-sized
//! fragments, and a failure point can be injected mid-stream.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use chunk_source::{
    CancelSignal, ChunkSource, SourceProfile, StreamEvent, StreamRequest,
};

/// Stable source identifier used for explicit startup selection.
pub const MOCK_SOURCE_ID: &str = "mock";

/// Deterministic mock source used by `sandbox_chat` tests and local runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSource {
    chunks: Vec<String>,
    fail_after: Option<(usize, String)>,
}

impl MockSource {
    /// Creates a mock source that streams the given chunks and finishes
    /// normally.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            fail_after: None,
        }
    }

    /// Creates a mock source that fails with `error` after emitting
    /// `emitted_chunks` chunk events.
    #[must_use]
    pub fn failing_after(
        chunks: Vec<String>,
        emitted_chunks: usize,
        error: impl Into<String>,
    ) -> Self {
        Self {
            chunks,
            fail_after: Some((emitted_chunks, error.into())),
        }
    }

    const START_DELAY_MS: u64 = 200;
    const TOKEN_DELAY_MS: u64 = 50;
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(vec![
            "Here is a small interactive page for the sandbox.\n".to_string(),
            "\n".to_string(),
            "```html\n".to_string(),
            "<main>\n".to_string(),
            "  <h1 id=\"headline\">Hello from the sandbox</h1>\n".to_string(),
            "  <button id=\"shuffle\">Shuffle color</button>\n".to_string(),
            "</main>\n".to_string(),
            "```\n".to_string(),
            "\n".to_string(),
            "A little styling:\n".to_string(),
            "\n".to_string(),
            "```css\n".to_string(),
            "main { font-family: sans-serif; text-align: center; margin-top: 4rem; }\n"
                .to_string(),
            "button { padding: 0.5rem 1rem; }\n".to_string(),
            "```\n".to_string(),
            "\n".to_string(),
            "And the behavior:\n".to_string(),
            "\n".to_string(),
            "```js\n".to_string(),
            "const colors = ['tomato', 'rebeccapurple', 'seagreen'];\n".to_string(),
            "let next = 0;\n".to_string(),
            "document.getElementById('shuffle').onclick = () => {\n".to_string(),
            "  document.getElementById('headline').style.color = colors[next++ % colors.length];\n"
                .to_string(),
            "};\n".to_string(),
            "```\n".to_string(),
            "\n".to_string(),
            "Open the preview pane to try it.\n".to_string(),
        ])
    }
}

impl ChunkSource for MockSource {
    fn profile(&self) -> SourceProfile {
        SourceProfile {
            source_id: MOCK_SOURCE_ID.to_string(),
            model_id: "mock-model".to_string(),
        }
    }

    fn stream(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;
        let _ = req.prompt;
        let _ = req.history;

        emit(StreamEvent::Started { stream_id });
        thread::sleep(Duration::from_millis(Self::START_DELAY_MS));

        if cancel.load(Ordering::SeqCst) {
            emit(StreamEvent::Cancelled { stream_id });
            return Ok(());
        }

        let mut emitted_chunks = 0usize;
        let mut emit_chunk = |text: String, emit: &mut dyn FnMut(StreamEvent)| {
            emit(StreamEvent::Chunk { stream_id, text });
            emitted_chunks += 1;
            thread::sleep(Duration::from_millis(Self::TOKEN_DELAY_MS));
            match &self.fail_after {
                Some((limit, error)) if emitted_chunks >= *limit => Some(error.clone()),
                _ => None,
            }
        };

        for chunk in &self.chunks {
            if cancel.load(Ordering::SeqCst) {
                emit(StreamEvent::Cancelled { stream_id });
                return Ok(());
            }

            let mut pending_token = String::new();
            for ch in chunk.chars() {
                pending_token.push(ch);

                if matches!(ch, ' ' | '\n') {
                    if let Some(error) = emit_chunk(std::mem::take(&mut pending_token), emit) {
                        emit(StreamEvent::Failed { stream_id, error });
                        return Ok(());
                    }
                }
            }

            if !pending_token.is_empty() {
                if cancel.load(Ordering::SeqCst) {
                    emit(StreamEvent::Cancelled { stream_id });
                    return Ok(());
                }

                if let Some(error) = emit_chunk(pending_token, emit) {
                    emit(StreamEvent::Failed { stream_id, error });
                    return Ok(());
                }
            }
        }

        if cancel.load(Ordering::SeqCst) {
            emit(StreamEvent::Cancelled { stream_id });
        } else {
            emit(StreamEvent::Finished { stream_id });
        }

        Ok(())
    }
}
