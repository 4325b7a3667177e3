use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use chunk_source::HistoryMessage;
use live_preview::Document;

use crate::error::SessionStoreError;
use crate::paths::{active_session_file, sessions_file, state_root};
use crate::schema::{ChatSession, Message, MessagePart, Sender, WELCOME_MESSAGE_ID};

/// Single owner of all persisted chat sessions.
///
/// Invariants: the session list is never empty, session ids are unique, and
/// the active id always resolves to a stored session. Every mutating
/// operation updates memory first and then writes both well-known records
/// through to disk before returning; a failed write surfaces as an error
/// while the in-memory state stays authoritative for the process lifetime.
pub struct SessionStore {
    root: PathBuf,
    sessions: Vec<ChatSession>,
    active_session_id: String,
}

impl SessionStore {
    /// Hydrates the store from the state directory under `cwd`, seeding a
    /// single fresh session when no prior state exists or the persisted
    /// state is unreadable or schema-invalid. Corrupt records are discarded
    /// wholesale, never partially repaired.
    pub fn open(cwd: &Path) -> Result<Self, SessionStoreError> {
        let root = state_root(cwd);
        fs::create_dir_all(&root)
            .map_err(|source| SessionStoreError::io("creating state directory", &root, source))?;

        let store = match load_valid_sessions(&root) {
            Some(sessions) => {
                let active_session_id = load_active_session_id(&root)
                    .filter(|id| sessions.iter().any(|session| session.id == *id))
                    .unwrap_or_else(|| sessions[0].id.clone());
                Self {
                    root,
                    sessions,
                    active_session_id,
                }
            }
            None => {
                let session = ChatSession::seeded(now_timestamp()?);
                let active_session_id = session.id.clone();
                Self {
                    root,
                    sessions: vec![session],
                    active_session_id,
                }
            }
        };

        store.persist()?;
        Ok(store)
    }

    #[must_use]
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    #[must_use]
    pub fn active_session_id(&self) -> &str {
        &self.active_session_id
    }

    #[must_use]
    pub fn active_session(&self) -> &ChatSession {
        self.sessions
            .iter()
            .find(|session| session.id == self.active_session_id)
            .expect("active session id must resolve to a stored session")
    }

    #[must_use]
    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    /// Creates a fresh seeded session, makes it active, and persists.
    pub fn create_session(&mut self) -> Result<ChatSession, SessionStoreError> {
        let session = ChatSession::seeded(now_timestamp()?);
        self.active_session_id = session.id.clone();
        self.sessions.push(session.clone());
        self.persist()?;
        Ok(session)
    }

    /// Removes a session. The store refills itself with a fresh seeded
    /// session rather than ever becoming empty; deleting the active session
    /// promotes the first remaining one.
    pub fn delete_session(&mut self, id: &str) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        self.sessions.remove(index);

        if self.sessions.is_empty() {
            let session = ChatSession::seeded(now_timestamp()?);
            self.active_session_id = session.id.clone();
            self.sessions.push(session);
        } else if self.active_session_id == id {
            self.active_session_id = self.sessions[0].id.clone();
        }

        self.persist()
    }

    /// Retitles a session. Blank or unchanged titles are a no-op.
    pub fn rename_session(&mut self, id: &str, title: &str) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        let title = title.trim();
        if title.is_empty() || title == self.sessions[index].title {
            return Ok(());
        }

        self.sessions[index].title = title.to_string();
        self.touch(index)?;
        self.persist()
    }

    /// Makes a session active. Unknown ids change nothing; session content
    /// is never touched.
    pub fn switch_active(&mut self, id: &str) -> Result<(), SessionStoreError> {
        if !self.sessions.iter().any(|session| session.id == id) {
            return Ok(());
        }

        self.active_session_id = id.to_string();
        self.persist()
    }

    pub fn append_messages(
        &mut self,
        id: &str,
        messages: Vec<Message>,
    ) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        self.sessions[index].messages.extend(messages);
        self.touch(index)?;
        self.persist()
    }

    /// Replaces the parts of one message in place; everything else about the
    /// message (id, sender, timestamp) is preserved.
    pub fn replace_message(
        &mut self,
        id: &str,
        message_id: &str,
        parts: Vec<MessagePart>,
    ) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        let message = self.sessions[index]
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
            .ok_or_else(|| SessionStoreError::unknown_message(id, message_id))?;
        message.parts = parts;
        self.touch(index)?;
        self.persist()
    }

    pub fn remove_message(&mut self, id: &str, message_id: &str) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        let messages = &mut self.sessions[index].messages;
        let position = messages
            .iter()
            .position(|message| message.id == message_id)
            .ok_or_else(|| SessionStoreError::unknown_message(id, message_id))?;
        messages.remove(position);
        self.touch(index)?;
        self.persist()
    }

    /// Resets a session's transcript to the single seeded welcome message.
    /// The preview/editor artifacts are left untouched.
    pub fn clear_messages(&mut self, id: &str) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        self.sessions[index].messages = vec![Message::welcome(now_timestamp()?)];
        self.touch(index)?;
        self.persist()
    }

    /// Partially updates a session's preview/editor artifacts.
    pub fn update_artifacts(
        &mut self,
        id: &str,
        preview: Option<Document>,
        editor: Option<Document>,
    ) -> Result<(), SessionStoreError> {
        let index = self.index_of(id)?;
        if let Some(preview) = preview {
            self.sessions[index].preview = preview;
        }
        if let Some(editor) = editor {
            self.sessions[index].editor = editor;
        }
        self.touch(index)?;
        self.persist()
    }

    /// Extracts the model-facing history of a session: the seeded welcome
    /// message is excluded and only text content is forwarded.
    pub fn history_for_model(&self, id: &str) -> Result<Vec<HistoryMessage>, SessionStoreError> {
        let session = self
            .session(id)
            .ok_or_else(|| SessionStoreError::unknown_session(id))?;

        Ok(session
            .messages
            .iter()
            .filter(|message| message.id != WELCOME_MESSAGE_ID)
            .filter_map(|message| {
                let text = message.text_content();
                if text.is_empty() {
                    return None;
                }
                Some(match message.sender {
                    Sender::User => HistoryMessage::UserText { text },
                    Sender::Assistant => HistoryMessage::AssistantText { text },
                })
            })
            .collect())
    }

    fn index_of(&self, id: &str) -> Result<usize, SessionStoreError> {
        self.sessions
            .iter()
            .position(|session| session.id == id)
            .ok_or_else(|| SessionStoreError::unknown_session(id))
    }

    fn touch(&mut self, index: usize) -> Result<(), SessionStoreError> {
        let now = now_timestamp()?;
        let session = &mut self.sessions[index];
        session.last_updated = monotonic_after(&session.last_updated, now);
        Ok(())
    }

    fn persist(&self) -> Result<(), SessionStoreError> {
        let sessions_path = sessions_file(&self.root);
        let serialized = serde_json::to_string_pretty(&self.sessions)
            .map_err(|source| SessionStoreError::json_serialize(&sessions_path, source))?;
        fs::write(&sessions_path, serialized).map_err(|source| {
            SessionStoreError::io("writing sessions record", &sessions_path, source)
        })?;

        let active_path = active_session_file(&self.root);
        fs::write(&active_path, &self.active_session_id).map_err(|source| {
            SessionStoreError::io("writing active session record", &active_path, source)
        })
    }
}

/// Current UTC time as an RFC3339 string, truncated to millisecond
/// precision so persisted timestamps round-trip exactly.
pub fn now_timestamp() -> Result<String, SessionStoreError> {
    let now = OffsetDateTime::now_utc();
    let truncated = now
        .replace_nanosecond(u32::from(now.millisecond()) * 1_000_000)
        .unwrap_or(now);
    truncated
        .format(&Rfc3339)
        .map_err(SessionStoreError::ClockFormat)
}

/// Keeps `last_updated` strictly increasing even when the wall clock has not
/// advanced past the previous mutation's millisecond.
fn monotonic_after(previous: &str, candidate: String) -> String {
    let Ok(previous) = OffsetDateTime::parse(previous, &Rfc3339) else {
        return candidate;
    };
    let Ok(parsed) = OffsetDateTime::parse(&candidate, &Rfc3339) else {
        return candidate;
    };
    if parsed > previous {
        return candidate;
    }

    (previous + Duration::milliseconds(1))
        .format(&Rfc3339)
        .unwrap_or(candidate)
}

fn load_valid_sessions(root: &Path) -> Option<Vec<ChatSession>> {
    let raw = fs::read_to_string(sessions_file(root)).ok()?;
    let sessions: Vec<ChatSession> = serde_json::from_str(&raw).ok()?;
    validate_sessions(&sessions).then_some(sessions)
}

fn load_active_session_id(root: &Path) -> Option<String> {
    let raw = fs::read_to_string(active_session_file(root)).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn validate_sessions(sessions: &[ChatSession]) -> bool {
    if sessions.is_empty() {
        return false;
    }

    let mut seen_ids = HashSet::new();
    for session in sessions {
        if !seen_ids.insert(session.id.as_str()) {
            return false;
        }
        if session.messages.is_empty() {
            return false;
        }
        if !is_rfc3339(&session.created_at) || !is_rfc3339(&session.last_updated) {
            return false;
        }
        if session
            .messages
            .iter()
            .any(|message| !is_rfc3339(&message.timestamp))
        {
            return false;
        }
    }

    true
}

fn is_rfc3339(value: &str) -> bool {
    OffsetDateTime::parse(value, &Rfc3339).is_ok()
}
