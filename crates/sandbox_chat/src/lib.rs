//! Live-preview chat core runtime crate.
//!
//! Binds chat sessions to streamed model replies. One binding exists per
//! session at most, keyed by session id rather than by whichever session is
//! currently active, so switching sessions mid-stream never redirects a
//! reply and deleting a session drops its late emissions on the floor.
//!
//! - [`app`] — the synchronizer: owns the session store, applies stream
//!   events to it, finalizes or fails the streaming placeholder.
//! - [`runtime`] — the controller: worker threads, cancel flags, and the
//!   ordered event queue between source threads and the synchronizer.
//! - [`config`]/[`presets`] — opaque model settings handed to the chunk
//!   source.

pub mod app;
pub mod config;
pub mod presets;
pub mod runtime;
pub mod source;
