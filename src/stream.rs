//! Per-reply accumulation state machine.
//!
//! One [`StreamAccumulator`] exists per in-flight model reply. It owns the
//! growing text buffer, re-derives the preview/editor documents over the
//! whole buffer on every chunk, and tracks the reply lifecycle
//! `Idle -> Streaming -> {Completed, Failed}`.
//!
//! Re-deriving over the entire buffer is O(total-length-so-far) per chunk.
//! Replies are bounded in practice, so the simplicity wins over an
//! incremental scanner that would have to remember fence state.

use crate::classify::classify;
use crate::document::Document;
use crate::synthesize::{synthesize, Synthesis};

/// Lifecycle phase of one in-flight reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl StreamPhase {
    /// Returns true once the reply can no longer accept chunks.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot emitted after each derivation: the full transcript text so far
/// plus the documents synthesized from it. The three fields always describe
/// the same buffer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub text: String,
    pub preview: Document,
    pub editor: Document,
}

/// Terminal failure payload: whatever partial text had accumulated plus the
/// source's error description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFailure {
    pub partial_text: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAccumulator {
    buffer: String,
    phase: StreamPhase,
    fallback: Document,
}

impl StreamAccumulator {
    /// Creates an idle accumulator that falls back to `fallback` until code
    /// appears in the reply.
    #[must_use]
    pub fn new(fallback: Document) -> Self {
        Self {
            buffer: String::new(),
            phase: StreamPhase::Idle,
            fallback,
        }
    }

    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Returns the accumulated reply text. Earlier contents are never
    /// mutated; each chunk strictly extends this buffer.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Marks the reply as streaming. Called when the first chunk has been
    /// requested from the source, before any text arrives.
    pub fn begin(&mut self) {
        assert!(
            !self.phase.is_terminal(),
            "cannot begin a reply that already reached {:?}",
            self.phase
        );
        self.phase = StreamPhase::Streaming;
    }

    /// Appends one chunk verbatim and re-derives the documents over the full
    /// buffer.
    pub fn push_chunk(&mut self, chunk: &str) -> Emission {
        assert!(
            !self.phase.is_terminal(),
            "cannot append a chunk to a reply that already reached {:?}",
            self.phase
        );
        self.phase = StreamPhase::Streaming;
        self.buffer.push_str(chunk);
        self.derive()
    }

    /// Finishes the reply normally. The returned emission is authoritative;
    /// no further emissions occur.
    pub fn complete(&mut self) -> Emission {
        assert!(
            !self.phase.is_terminal(),
            "cannot complete a reply that already reached {:?}",
            self.phase
        );
        self.phase = StreamPhase::Completed;
        self.derive()
    }

    /// Finishes the reply abnormally, handing back the partial buffer and the
    /// error description. Retry is a caller decision.
    pub fn fail(&mut self, error: impl Into<String>) -> StreamFailure {
        assert!(
            !self.phase.is_terminal(),
            "cannot fail a reply that already reached {:?}",
            self.phase
        );
        self.phase = StreamPhase::Failed;
        StreamFailure {
            partial_text: self.buffer.clone(),
            error: error.into(),
        }
    }

    fn derive(&self) -> Emission {
        let buckets = classify(&self.buffer);
        let Synthesis { preview, editor } = synthesize(&buckets, &self.fallback);
        Emission {
            text: self.buffer.clone(),
            preview,
            editor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StreamAccumulator, StreamPhase};
    use crate::document::Document;

    fn accumulator() -> StreamAccumulator {
        StreamAccumulator::new(Document::fallback())
    }

    #[test]
    fn buffer_grows_monotonically_across_chunks() {
        let mut accumulator = accumulator();
        let chunks = ["alpha ", "beta ", "gamma"];
        let mut previous = String::new();

        for chunk in chunks {
            let emission = accumulator.push_chunk(chunk);
            assert!(emission.text.starts_with(&previous));
            assert!(emission.text.len() > previous.len());
            previous = emission.text;
        }

        assert_eq!(previous, "alpha beta gamma");
    }

    #[test]
    fn split_fence_stays_invisible_until_closed() {
        let mut accumulator = accumulator();

        let first = accumulator.push_chunk("```py");
        assert_eq!(first.preview, Document::fallback());
        assert_eq!(first.editor, Document::fallback());

        let second = accumulator.push_chunk("\nprint(1)\n```");
        assert_eq!(second.preview, Document::new("print(1)", "py"));
        assert_eq!(second.editor, Document::new("print(1)", "py"));
    }

    #[test]
    fn begin_moves_idle_to_streaming() {
        let mut accumulator = accumulator();
        assert_eq!(accumulator.phase(), StreamPhase::Idle);

        accumulator.begin();
        assert_eq!(accumulator.phase(), StreamPhase::Streaming);
    }

    #[test]
    fn complete_returns_the_final_authoritative_emission() {
        let mut accumulator = accumulator();
        accumulator.push_chunk("before ```html\n<i>x</i>\n``` after");

        let final_emission = accumulator.complete();
        assert_eq!(accumulator.phase(), StreamPhase::Completed);
        assert_eq!(final_emission.text, "before ```html\n<i>x</i>\n``` after");
        assert!(final_emission.preview.code.contains("<i>x</i>"));
    }

    #[test]
    fn fail_hands_back_the_partial_buffer() {
        let mut accumulator = accumulator();
        accumulator.push_chunk("partial ");
        accumulator.push_chunk("reply");

        let failure = accumulator.fail("source went away");
        assert_eq!(accumulator.phase(), StreamPhase::Failed);
        assert_eq!(failure.partial_text, "partial reply");
        assert_eq!(failure.error, "source went away");
    }

    #[test]
    #[should_panic(expected = "cannot append a chunk")]
    fn chunks_after_completion_are_rejected() {
        let mut accumulator = accumulator();
        accumulator.push_chunk("done");
        accumulator.complete();
        accumulator.push_chunk("late");
    }
}
