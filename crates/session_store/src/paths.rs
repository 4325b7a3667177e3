use std::path::{Path, PathBuf};

pub const STATE_DIR: [&str; 2] = [".sandbox_chat", "state"];

/// Well-known record holding the full serialized session list.
pub const SESSIONS_FILE: &str = "sessions.json";

/// Well-known record holding the active session id.
pub const ACTIVE_SESSION_FILE: &str = "active_session";

#[must_use]
pub fn state_root(cwd: &Path) -> PathBuf {
    cwd.join(STATE_DIR[0]).join(STATE_DIR[1])
}

#[must_use]
pub fn sessions_file(root: &Path) -> PathBuf {
    root.join(SESSIONS_FILE)
}

#[must_use]
pub fn active_session_file(root: &Path) -> PathBuf {
    root.join(ACTIVE_SESSION_FILE)
}
