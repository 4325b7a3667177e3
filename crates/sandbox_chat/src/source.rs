//! Chunk-source contract re-exports used by `sandbox_chat`.

pub use chunk_source::{
    CancelSignal, ChunkSource, HistoryMessage, PromptPart, SourceInitError, SourceProfile,
    StreamEvent, StreamId, StreamRequest,
};
