use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::source::{
    CancelSignal, ChunkSource, HistoryMessage, PromptPart, StreamEvent, StreamId, StreamRequest,
};

use crate::app::{App, HostOps};

struct ActiveStream {
    session_id: String,
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
}

/// Owns the worker threads and the ordered event queue between chunk-source
/// threads and the synchronizer.
///
/// Workers enqueue events in emission order and
/// [`StreamController::flush_pending_events`] applies them to `App` in that
/// same order under one lock, so an older emission can never overwrite a
/// newer one. Hosts call the flush from their event loop (or after joining
/// workers in tests).
pub struct StreamController {
    app: Arc<Mutex<App>>,
    pending_events: Mutex<VecDeque<StreamEvent>>,
    next_stream_id: AtomicU64,
    active_streams: Mutex<HashMap<StreamId, ActiveStream>>,
    source: Arc<dyn ChunkSource>,
}

impl StreamController {
    pub fn new(app: Arc<Mutex<App>>, source: Arc<dyn ChunkSource>) -> Arc<Self> {
        Arc::new(Self {
            app,
            pending_events: Mutex::new(VecDeque::new()),
            next_stream_id: AtomicU64::new(1),
            active_streams: Mutex::new(HashMap::new()),
            source,
        })
    }

    fn start_stream_internal(
        self: &Arc<Self>,
        session_id: &str,
        history: Vec<HistoryMessage>,
        prompt: Vec<PromptPart>,
        system_prompt: String,
        temperature: f32,
    ) -> Result<StreamId, String> {
        let mut active_streams = lock_unpoisoned(&self.active_streams);
        if active_streams
            .values()
            .any(|active| active.session_id == session_id)
        {
            return Err(format!("Stream already active for session '{session_id}'"));
        }

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let cancel = Arc::new(AtomicBool::new(false));
        let request = StreamRequest {
            stream_id,
            system_prompt,
            temperature,
            history,
            prompt,
        };
        let join_handle = self.spawn_worker(request, Arc::clone(&cancel))?;

        active_streams.insert(
            stream_id,
            ActiveStream {
                session_id: session_id.to_string(),
                cancel,
                join_handle: Some(join_handle),
            },
        );

        Ok(stream_id)
    }

    fn spawn_worker(
        self: &Arc<Self>,
        request: StreamRequest,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, String> {
        let stream_id = request.stream_id;
        let controller = Arc::clone(self);
        thread::Builder::new()
            .name(format!("sandbox-chat-stream-{stream_id}"))
            .spawn(move || controller.run_worker(request, cancel))
            .map_err(|error| format!("Failed to spawn stream worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, request: StreamRequest, cancel: CancelSignal) {
        let stream_id = request.stream_id;
        self.wait_for_binding_visibility(stream_id);

        let terminal_emitted = Arc::new(AtomicBool::new(false));
        let terminal_emitted_for_emit = Arc::clone(&terminal_emitted);
        let controller = Arc::clone(&self);
        let source = Arc::clone(&self.source);

        let mut emit = move |event: StreamEvent| {
            if event.is_terminal() {
                terminal_emitted_for_emit.store(true, Ordering::SeqCst);
            }

            controller.enqueue_event(event);
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            source.stream(request, Arc::clone(&cancel), &mut emit)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => emit(StreamEvent::Failed { stream_id, error }),
            Err(_) => emit(StreamEvent::Failed {
                stream_id,
                error: "Chunk source panicked".to_string(),
            }),
        }

        if !terminal_emitted.load(Ordering::SeqCst) && self.is_active_stream(stream_id) {
            emit(StreamEvent::Failed {
                stream_id,
                error: "Chunk source exited without terminal event".to_string(),
            });
        }
    }

    fn enqueue_event(self: &Arc<Self>, event: StreamEvent) {
        let mut queue = lock_unpoisoned(&self.pending_events);
        queue.push_back(event);
    }

    /// Applies queued events to `App` in receipt order and returns how many
    /// were applied.
    pub fn flush_pending_events(&self) -> usize {
        let mut applied = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_stream_event(event);
                    applied += 1;
                }
                None => break,
            }
        }

        applied
    }

    // Best effort: give the submitting thread a chance to record the binding
    // before the first event is enqueued. Events are applied through the
    // queue under the app lock either way.
    fn wait_for_binding_visibility(&self, stream_id: StreamId) {
        for _ in 0..256 {
            let visible = {
                let app = lock_unpoisoned(&self.app);
                app.has_stream(stream_id)
            };

            if visible {
                return;
            }

            thread::yield_now();
        }
    }

    fn apply_stream_event(&self, event: StreamEvent) {
        let stream_id = event.stream_id();
        let terminal = event.is_terminal();

        {
            let mut app = lock_unpoisoned(&self.app);
            match event {
                StreamEvent::Started { stream_id } => app.on_stream_started(stream_id),
                StreamEvent::Chunk { stream_id, text } => app.on_stream_chunk(stream_id, &text),
                StreamEvent::Finished { stream_id } => app.on_stream_finished(stream_id),
                StreamEvent::Failed { stream_id, error } => {
                    app.on_stream_failed(stream_id, &error)
                }
                StreamEvent::Cancelled { stream_id } => app.on_stream_cancelled(stream_id),
            }
        }

        if terminal {
            self.clear_active_stream_if_matching(stream_id);
        }
    }

    fn clear_active_stream_if_matching(&self, stream_id: StreamId) {
        let mut active_streams = lock_unpoisoned(&self.active_streams);
        let Some(mut completed) = active_streams.remove(&stream_id) else {
            return;
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn is_active_stream(&self, stream_id: StreamId) -> bool {
        lock_unpoisoned(&self.active_streams).contains_key(&stream_id)
    }

    fn cancel_stream_internal(&self, stream_id: StreamId) {
        let active_streams = lock_unpoisoned(&self.active_streams);
        if let Some(active) = active_streams.get(&stream_id) {
            active.cancel.store(true, Ordering::SeqCst);
        }
    }
}

impl HostOps for Arc<StreamController> {
    fn start_stream(
        &mut self,
        session_id: &str,
        history: Vec<HistoryMessage>,
        prompt: Vec<PromptPart>,
        system_prompt: String,
        temperature: f32,
    ) -> Result<StreamId, String> {
        self.start_stream_internal(session_id, history, prompt, system_prompt, temperature)
    }

    fn cancel_stream(&mut self, stream_id: StreamId) {
        self.cancel_stream_internal(stream_id);
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
