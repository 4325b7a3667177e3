//! Minimal source-agnostic contract for one streamed model reply.
//!
//! This crate intentionally defines only the shared reply lifecycle and the
//! request envelope a host hands to a model chunk source. It excludes
//! transport details, provider payloads, and multi-reply orchestration
//! concerns.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

/// Identifier for one streamed reply.
pub type StreamId = u64;

/// Shared cancellation flag for a reply.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a source before any reply
/// starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInitError {
    message: String,
}

impl SourceInitError {
    /// Creates a new source initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SourceInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SourceInitError {}

impl From<String> for SourceInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SourceInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Source-neutral model-facing history item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryMessage {
    UserText { text: String },
    AssistantText { text: String },
}

/// One part of the prompt being submitted: plain text, or an opaque media
/// reference the source resolves itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text {
        content: String,
    },
    Media {
        reference: String,
        mime_type: String,
        file_name: String,
    },
}

/// Input required to start one streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub stream_id: StreamId,
    pub system_prompt: String,
    pub temperature: f32,
    pub history: Vec<HistoryMessage>,
    pub prompt: Vec<PromptPart>,
}

/// Immutable metadata describing a chunk source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub source_id: String,
    pub model_id: String,
}

/// Source-emitted lifecycle event for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started { stream_id: StreamId },
    Chunk { stream_id: StreamId, text: String },
    Finished { stream_id: StreamId },
    Failed { stream_id: StreamId, error: String },
    Cancelled { stream_id: StreamId },
}

impl StreamEvent {
    /// Returns the reply identifier associated with this event.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Started { stream_id }
            | Self::Chunk { stream_id, .. }
            | Self::Finished { stream_id }
            | Self::Failed { stream_id, .. }
            | Self::Cancelled { stream_id } => *stream_id,
        }
    }

    /// Returns true when this event terminates the reply lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Source interface for executing one streamed reply.
pub trait ChunkSource: Send + Sync + 'static {
    /// Returns source/model identity metadata.
    fn profile(&self) -> SourceProfile;

    /// Executes one reply and emits lifecycle events in source order.
    ///
    /// Implementations must check `cancel` between chunks and emit
    /// `Cancelled` instead of further chunks once it is set. Exactly one
    /// terminal event ends a well-behaved reply.
    fn stream(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String>;
}
