mod error;
mod paths;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use paths::{
    active_session_file, sessions_file, state_root, ACTIVE_SESSION_FILE, SESSIONS_FILE, STATE_DIR,
};
pub use schema::{
    ChatSession, Message, MessagePart, Sender, DEFAULT_TITLE_PREFIX, WELCOME_MESSAGE_ID,
    WELCOME_MESSAGE_TEXT,
};
pub use store::{now_timestamp, SessionStore};
