//! Live-preview derivation for streaming chat replies.
//!
//! Invariant: derivation is re-entrant — every received chunk re-runs
//! [`classify`] and [`synthesize`] over the entire accumulated buffer, so a
//! reply can be replayed from any prefix and always lands on the same
//! documents.
//!
//! # Public API Overview
//! - Extract fenced code blocks from accumulated text with [`classify`].
//! - Turn bucketed fragments into preview/editor documents with
//!   [`synthesize`].
//! - Drive one in-flight reply through [`StreamAccumulator`].
//! - The [`Document`] artifact and the fixed fallback page live in
//!   [`document`].

pub mod classify;
pub mod document;
pub mod stream;
pub mod synthesize;

/// Fenced block extraction into language buckets.
pub use crate::classify::{classify, Fragment, FragmentBuckets, PLAINTEXT_LANGUAGE};

/// Renderable artifact type and the fixed fallback page.
pub use crate::document::{Document, FALLBACK_DOCUMENT_HTML, HTML_LANGUAGE};

/// Per-reply accumulation state machine.
pub use crate::stream::{Emission, StreamAccumulator, StreamFailure, StreamPhase};

/// Bucket-to-document synthesis policy.
pub use crate::synthesize::{synthesize, Synthesis};
