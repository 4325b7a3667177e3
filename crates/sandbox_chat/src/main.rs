use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chunk_source_mock::MockSource;
use sandbox_chat::app::App;
use sandbox_chat::config::ModelConfig;
use sandbox_chat::runtime::StreamController;
use sandbox_chat::source::ChunkSource;
use session_store::{MessagePart, SessionStore};

fn main() -> io::Result<()> {
    let cwd = std::env::current_dir()?;
    let store = SessionStore::open(&cwd).map_err(io::Error::other)?;
    let app = Arc::new(Mutex::new(App::new(store, ModelConfig::from_env())));

    let source: Arc<dyn ChunkSource> = Arc::new(MockSource::default());
    let profile = source.profile();
    let controller = StreamController::new(Arc::clone(&app), source);
    let mut host = Arc::clone(&controller);

    let session_id = lock_unpoisoned(&app).store().active_session_id().to_string();
    lock_unpoisoned(&app)
        .submit(
            &session_id,
            vec![MessagePart::text("Show me a small interactive page.")],
            &mut host,
        )
        .map_err(io::Error::other)?;

    println!(
        "streaming one reply from {} ({})...",
        profile.source_id, profile.model_id
    );
    loop {
        controller.flush_pending_events();
        if !lock_unpoisoned(&app).has_stream_for_session(&session_id) {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    controller.flush_pending_events();

    let mut app = lock_unpoisoned(&app);
    for error in app.drain_persistence_errors() {
        eprintln!("persistence error: {error}");
    }

    let session = app.store().active_session();
    for message in &session.messages {
        println!("[{:?}] {}", message.sender, message.text_content());
    }
    println!("--- preview ({}) ---", session.preview.language);
    println!("{}", session.preview.code);

    Ok(())
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
