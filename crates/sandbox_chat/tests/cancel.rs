use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chunk_source::{ChunkSource, SourceProfile, StreamEvent, StreamRequest};
use sandbox_chat::app::App;
use sandbox_chat::config::ModelConfig;
use sandbox_chat::runtime::StreamController;
use session_store::{MessagePart, SessionStore};
use tempfile::TempDir;

/// Emits one chunk, then blocks until cancelled.
struct BlockingSource;

impl ChunkSource for BlockingSource {
    fn profile(&self) -> SourceProfile {
        SourceProfile {
            source_id: "blocking".to_string(),
            model_id: "blocking-model".to_string(),
        }
    }

    fn stream(
        &self,
        req: StreamRequest,
        cancel: Arc<AtomicBool>,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;

        emit(StreamEvent::Started { stream_id });
        emit(StreamEvent::Chunk {
            stream_id,
            text: "working...".to_string(),
        });

        while !cancel.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }

        emit(StreamEvent::Cancelled { stream_id });
        Ok(())
    }
}

/// Ignores the cancel flag for one extra chunk before finishing, modelling a
/// source that races the host's cancellation.
struct RacingSource;

impl ChunkSource for RacingSource {
    fn profile(&self) -> SourceProfile {
        SourceProfile {
            source_id: "racing".to_string(),
            model_id: "racing-model".to_string(),
        }
    }

    fn stream(
        &self,
        req: StreamRequest,
        cancel: Arc<AtomicBool>,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;

        emit(StreamEvent::Started { stream_id });
        emit(StreamEvent::Chunk {
            stream_id,
            text: "first".to_string(),
        });

        while !cancel.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }

        emit(StreamEvent::Chunk {
            stream_id,
            text: " late write".to_string(),
        });
        emit(StreamEvent::Finished { stream_id });
        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn flush_until_first_chunk(
    controller: &StreamController,
    app: &Arc<Mutex<App>>,
    session_id: &str,
    needle: &str,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        controller.flush_pending_events();
        {
            let app = lock_unpoisoned(app);
            if let Some(session) = app.store().session(session_id) {
                let streamed = session
                    .messages
                    .iter()
                    .any(|message| message.text_content().contains(needle));
                if streamed {
                    return;
                }
            }
        }
        assert!(Instant::now() < deadline, "first chunk never arrived");
        thread::yield_now();
    }
}

/// Flushes until the queue has stayed empty for several rounds, giving the
/// cancelled worker time to emit (and the host to drop) its final events.
fn flush_until_quiescent(controller: &StreamController) {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut empty_rounds = 0usize;
    while empty_rounds < 10 {
        if controller.flush_pending_events() == 0 {
            empty_rounds += 1;
        } else {
            empty_rounds = 0;
        }
        assert!(Instant::now() < deadline, "event queue never quiesced");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn deleting_a_streaming_session_cancels_the_worker_and_drops_its_writes() {
    let dir = TempDir::new().expect("tempdir");
    let store = SessionStore::open(dir.path()).expect("store opens");
    let app = Arc::new(Mutex::new(App::new(store, ModelConfig::default())));
    let controller = StreamController::new(Arc::clone(&app), Arc::new(BlockingSource));
    let mut host = Arc::clone(&controller);

    let session_id = lock_unpoisoned(&app).store().active_session_id().to_string();
    lock_unpoisoned(&app)
        .submit(&session_id, vec![MessagePart::text("stream here")], &mut host)
        .expect("submit succeeds");
    flush_until_first_chunk(&controller, &app, &session_id, "working...");

    lock_unpoisoned(&app)
        .delete_session(&session_id, &mut host)
        .expect("delete succeeds");

    // The cancel flag terminates the worker; its Cancelled event is dropped
    // because the binding died with the session.
    flush_until_quiescent(&controller);

    let app = lock_unpoisoned(&app);
    assert!(!app.has_stream_for_session(&session_id));
    assert!(app.store().session(&session_id).is_none());
    // The replacement session never saw the dead stream's text.
    for session in app.store().sessions() {
        for message in &session.messages {
            assert!(!message.text_content().contains("working..."));
        }
    }
}

#[test]
fn late_chunks_after_session_deletion_never_resurrect_the_session() {
    let dir = TempDir::new().expect("tempdir");
    let store = SessionStore::open(dir.path()).expect("store opens");
    let app = Arc::new(Mutex::new(App::new(store, ModelConfig::default())));
    let controller = StreamController::new(Arc::clone(&app), Arc::new(RacingSource));
    let mut host = Arc::clone(&controller);

    let session_id = lock_unpoisoned(&app).store().active_session_id().to_string();
    lock_unpoisoned(&app)
        .submit(&session_id, vec![MessagePart::text("race me")], &mut host)
        .expect("submit succeeds");
    flush_until_first_chunk(&controller, &app, &session_id, "first");

    lock_unpoisoned(&app)
        .delete_session(&session_id, &mut host)
        .expect("delete succeeds");

    // The racing source emits one more chunk and a Finished event after the
    // cancel flag flips; both must be dropped on the floor.
    flush_until_quiescent(&controller);

    let app = lock_unpoisoned(&app);
    assert!(!app.has_stream_for_session(&session_id));
    assert!(app.store().session(&session_id).is_none());
    for session in app.store().sessions() {
        for message in &session.messages {
            assert!(!message.text_content().contains("late write"));
        }
    }
}
