use crate::source::{HistoryMessage, PromptPart, StreamId};
use live_preview::{Document, Emission, StreamAccumulator};
use session_store::{
    now_timestamp, ChatSession, Message, MessagePart, SessionStore, SessionStoreError,
};

use crate::config::ModelConfig;

/// Prefix marking the synthetic assistant message a failed reply leaves
/// behind.
pub const ERROR_MESSAGE_PREFIX: &str = "**Error:** ";

const ERROR_STREAM_ALREADY_ACTIVE: &str = "Stream already active for this session";

/// A reply must accumulate more than this many bytes before auto-naming
/// kicks in.
const TITLE_AUTONAME_MIN_CHARS: usize = 50;
const TITLE_MAX_CHARS: usize = 40;

/// Host-side operations the synchronizer needs: starting a worker for one
/// reply and cancelling one by id.
pub trait HostOps {
    fn start_stream(
        &mut self,
        session_id: &str,
        history: Vec<HistoryMessage>,
        prompt: Vec<PromptPart>,
        system_prompt: String,
        temperature: f32,
    ) -> Result<StreamId, String>;
    fn cancel_stream(&mut self, stream_id: StreamId);
}

/// One in-flight reply bound to one session for its whole lifetime.
struct StreamBinding {
    stream_id: StreamId,
    session_id: String,
    placeholder_id: String,
    accumulator: StreamAccumulator,
}

/// Synchronizer between stream emissions and the session store.
///
/// Owns the store outright; all mutations enter through the operation set
/// below, and every store write made on behalf of a reply is keyed by the
/// binding's session id, never by the currently active session.
pub struct App {
    store: SessionStore,
    config: ModelConfig,
    bindings: Vec<StreamBinding>,
    persistence_errors: Vec<SessionStoreError>,
}

impl App {
    #[must_use]
    pub fn new(store: SessionStore, config: ModelConfig) -> Self {
        Self {
            store,
            config,
            bindings: Vec::new(),
            persistence_errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Returns true while a reply is streaming into the given session.
    #[must_use]
    pub fn has_stream_for_session(&self, session_id: &str) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.session_id == session_id)
    }

    /// Returns true while the given stream id is bound to a session.
    #[must_use]
    pub fn has_stream(&self, stream_id: StreamId) -> bool {
        self.binding_index(stream_id).is_some()
    }

    /// Store-write errors collected while applying stream events. Memory
    /// state stays authoritative when a write fails; hosts drain these to
    /// surface them without interrupting the conversation.
    pub fn drain_persistence_errors(&mut self) -> Vec<SessionStoreError> {
        std::mem::take(&mut self.persistence_errors)
    }

    pub fn create_session(&mut self) -> Result<ChatSession, SessionStoreError> {
        self.store.create_session()
    }

    /// Switches the active session. Bindings are keyed by session id, so an
    /// in-progress reply for any other session is left undisturbed.
    pub fn switch_session(&mut self, session_id: &str) -> Result<(), SessionStoreError> {
        self.store.switch_active(session_id)
    }

    pub fn rename_session(
        &mut self,
        session_id: &str,
        title: &str,
    ) -> Result<(), SessionStoreError> {
        self.store.rename_session(session_id, title)
    }

    /// Deletes a session. Any reply still streaming into it is cancelled and
    /// unbound first, so late emissions can never resurrect the dead id.
    pub fn delete_session(
        &mut self,
        session_id: &str,
        host: &mut dyn HostOps,
    ) -> Result<(), SessionStoreError> {
        self.unbind_session(session_id, host);
        self.store.delete_session(session_id)
    }

    /// Resets a session's transcript to the seeded welcome message,
    /// cancelling any reply still streaming into it. Artifacts are kept.
    pub fn clear_session(
        &mut self,
        session_id: &str,
        host: &mut dyn HostOps,
    ) -> Result<(), SessionStoreError> {
        self.unbind_session(session_id, host);
        self.store.clear_messages(session_id)
    }

    /// Submits a user turn to a session: appends the user message plus the
    /// empty streaming placeholder, then starts a worker for the reply. At
    /// most one reply may stream into a session at a time.
    pub fn submit(
        &mut self,
        session_id: &str,
        parts: Vec<MessagePart>,
        host: &mut dyn HostOps,
    ) -> Result<StreamId, String> {
        if parts.is_empty() {
            return Err("Prompt is empty".to_string());
        }
        if self.has_stream_for_session(session_id) {
            return Err(ERROR_STREAM_ALREADY_ACTIVE.to_string());
        }
        if self.store.session(session_id).is_none() {
            return Err(format!("Unknown session id '{session_id}'"));
        }

        let history = self
            .store
            .history_for_model(session_id)
            .map_err(|error| error.to_string())?;
        let prompt = prompt_parts(&parts);

        let now = now_timestamp().map_err(|error| error.to_string())?;
        let user_message = Message::user(parts, now.clone());
        let placeholder = Message::streaming_placeholder(now);
        let user_message_id = user_message.id.clone();
        let placeholder_id = placeholder.id.clone();
        self.store
            .append_messages(session_id, vec![user_message, placeholder])
            .map_err(|error| error.to_string())?;

        match host.start_stream(
            session_id,
            history,
            prompt,
            self.config.effective_system_prompt(),
            self.config.temperature,
        ) {
            Ok(stream_id) => {
                self.bindings.push(StreamBinding {
                    stream_id,
                    session_id: session_id.to_string(),
                    placeholder_id,
                    accumulator: StreamAccumulator::new(Document::fallback()),
                });
                Ok(stream_id)
            }
            Err(error) => {
                self.rollback_submitted_turn(session_id, &user_message_id, &placeholder_id);
                Err(error)
            }
        }
    }

    pub fn on_stream_started(&mut self, stream_id: StreamId) {
        let Some(index) = self.binding_index(stream_id) else {
            return;
        };
        self.bindings[index].accumulator.begin();
    }

    /// Applies one chunk: extends the buffer, re-derives the documents, and
    /// writes transcript text and artifacts back to the bound session. The
    /// two store writes happen back to back under the caller's lock, so no
    /// reader observes a transcript/artifact mismatch within one emission.
    pub fn on_stream_chunk(&mut self, stream_id: StreamId, chunk: &str) {
        let Some(index) = self.binding_index(stream_id) else {
            return;
        };

        let emission = self.bindings[index].accumulator.push_chunk(chunk);
        let session_id = self.bindings[index].session_id.clone();
        let placeholder_id = self.bindings[index].placeholder_id.clone();

        self.apply_emission(&session_id, &placeholder_id, &emission);
        self.maybe_auto_title(&session_id, &emission.text);
    }

    /// Finalizes the placeholder with the reply's authoritative final state
    /// and releases the binding.
    pub fn on_stream_finished(&mut self, stream_id: StreamId) {
        let Some(mut binding) = self.take_binding(stream_id) else {
            return;
        };

        let emission = binding.accumulator.complete();
        self.apply_emission(&binding.session_id, &binding.placeholder_id, &emission);
    }

    /// Replaces the placeholder with a synthetic assistant error message.
    /// Artifacts are left at their last successfully synthesized value.
    pub fn on_stream_failed(&mut self, stream_id: StreamId, error: &str) {
        let Some(mut binding) = self.take_binding(stream_id) else {
            return;
        };

        let failure = binding.accumulator.fail(error);

        let now = match now_timestamp() {
            Ok(now) => now,
            Err(clock_error) => {
                self.persistence_errors.push(clock_error);
                return;
            }
        };

        if let Err(store_error) = self
            .store
            .remove_message(&binding.session_id, &binding.placeholder_id)
        {
            self.persistence_errors.push(store_error);
        }

        let error_message = Message::assistant(
            vec![MessagePart::text(format!(
                "{ERROR_MESSAGE_PREFIX}{}",
                failure.error
            ))],
            now,
        );
        if let Err(store_error) = self
            .store
            .append_messages(&binding.session_id, vec![error_message])
        {
            self.persistence_errors.push(store_error);
        }
    }

    /// A cancelled reply has already been unbound by the delete/clear path;
    /// anything still arriving here is stale and dropped.
    pub fn on_stream_cancelled(&mut self, stream_id: StreamId) {
        let _ = self.take_binding(stream_id);
    }

    fn apply_emission(&mut self, session_id: &str, placeholder_id: &str, emission: &Emission) {
        if let Err(error) = self.store.replace_message(
            session_id,
            placeholder_id,
            vec![MessagePart::text(emission.text.clone())],
        ) {
            self.persistence_errors.push(error);
        }
        if let Err(error) = self.store.update_artifacts(
            session_id,
            Some(emission.preview.clone()),
            Some(emission.editor.clone()),
        ) {
            self.persistence_errors.push(error);
        }
    }

    /// Renames a still-default-titled session after enough reply text has
    /// accumulated. Once renamed the default marker is gone, so later
    /// replies in the session never rename it again.
    fn maybe_auto_title(&mut self, session_id: &str, accumulated: &str) {
        if accumulated.len() <= TITLE_AUTONAME_MIN_CHARS {
            return;
        }
        let Some(session) = self.store.session(session_id) else {
            return;
        };
        if !session.has_default_title() {
            return;
        }

        let title = derived_title(accumulated);
        if let Err(error) = self.store.rename_session(session_id, &title) {
            self.persistence_errors.push(error);
        }
    }

    fn rollback_submitted_turn(
        &mut self,
        session_id: &str,
        user_message_id: &str,
        placeholder_id: &str,
    ) {
        for message_id in [placeholder_id, user_message_id] {
            if let Err(error) = self.store.remove_message(session_id, message_id) {
                self.persistence_errors.push(error);
            }
        }
    }

    fn unbind_session(&mut self, session_id: &str, host: &mut dyn HostOps) {
        let Some(position) = self
            .bindings
            .iter()
            .position(|binding| binding.session_id == session_id)
        else {
            return;
        };

        let binding = self.bindings.remove(position);
        host.cancel_stream(binding.stream_id);
    }

    fn binding_index(&self, stream_id: StreamId) -> Option<usize> {
        self.bindings
            .iter()
            .position(|binding| binding.stream_id == stream_id)
    }

    fn take_binding(&mut self, stream_id: StreamId) -> Option<StreamBinding> {
        let position = self.binding_index(stream_id)?;
        Some(self.bindings.remove(position))
    }
}

fn prompt_parts(parts: &[MessagePart]) -> Vec<PromptPart> {
    parts
        .iter()
        .map(|part| match part {
            MessagePart::Text { content } => PromptPart::Text {
                content: content.clone(),
            },
            MessagePart::Image {
                content,
                mime_type,
                file_name,
            }
            | MessagePart::File {
                content,
                mime_type,
                file_name,
            } => PromptPart::Media {
                reference: content.clone(),
                mime_type: mime_type.clone(),
                file_name: file_name.clone(),
            },
        })
        .collect()
}

/// First line of the reply, truncated, in the original "headline plus
/// ellipsis" shape.
fn derived_title(accumulated: &str) -> String {
    let first_line = accumulated.lines().next().unwrap_or("");
    let truncated: String = first_line.chars().take(TITLE_MAX_CHARS).collect();
    format!("{truncated}...")
}
