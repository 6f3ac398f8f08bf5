//! Motion engine: owns the processing thread and the published state.
//!
//! Construction spawns a dedicated thread, which opens the sample source,
//! builds the classifier and then signals readiness. The constructing
//! thread blocks on that signal (bounded by `init_timeout_ms`), so a
//! returned engine is always `Ready`. All sampling, classification and
//! observer callbacks happen on the processing thread; client threads only
//! exchange commands with it and read the latest [`Snapshot`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::bridge::{deliver, ChannelObserver, MotionObserver};
use crate::classifier::MotionClassifier;
use crate::config::EngineConfig;
use crate::errors::{MotionError, SourceError};
use crate::gesture::GestureSet;
use crate::source::SampleSource;
use crate::types::{Direction, GestureEvent, MotionEvent, Movement, Snapshot};

// ============================================================================
// Lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Resumed,
    Paused,
    Terminated,
}

impl LifecycleState {
    /// States in which queries and lifecycle commands are accepted.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            LifecycleState::Ready | LifecycleState::Resumed | LifecycleState::Paused
        )
    }
}

#[derive(Debug)]
enum InitStatus {
    Pending,
    Ready,
    Failed(String),
}

/// One-shot readiness signal between the constructor and the worker.
struct Rendezvous {
    status: Mutex<InitStatus>,
    changed: Condvar,
}

impl Rendezvous {
    fn new() -> Self {
        Self {
            status: Mutex::new(InitStatus::Pending),
            changed: Condvar::new(),
        }
    }

    fn signal(&self, status: InitStatus) {
        let mut current = self.status.lock();
        *current = status;
        self.changed.notify_all();
    }

    fn wait(&self, timeout: Duration) -> Result<(), MotionError> {
        let deadline = Instant::now() + timeout;
        let mut status = self.status.lock();
        loop {
            match &*status {
                InitStatus::Ready => return Ok(()),
                InitStatus::Failed(reason) => {
                    return Err(MotionError::InitializationFailure(reason.clone()))
                }
                InitStatus::Pending => {}
            }
            // Spurious wakeups loop back and re-check the flag.
            if self.changed.wait_until(&mut status, deadline).timed_out()
                && matches!(*status, InitStatus::Pending)
            {
                return Err(MotionError::InitializationFailure(format!(
                    "processing thread not ready after {} ms",
                    timeout.as_millis()
                )));
            }
        }
    }
}

/// Attempts at enabling or disabling a source that reports glitches.
const ENABLE_ATTEMPTS: u32 = 3;

enum Command {
    Resume(Sender<Result<(), MotionError>>),
    Pause(Sender<Result<(), MotionError>>),
    Shutdown,
}

/// State shared between client threads and the processing thread.
struct Shared {
    lifecycle: Mutex<LifecycleState>,
    snapshot: RwLock<Snapshot>,
    observer: Mutex<Option<Arc<dyn MotionObserver>>>,
}

// ============================================================================
// Engine
// ============================================================================

pub struct MotionEngine {
    config: EngineConfig,
    shared: Arc<Shared>,
    /// Serializes lifecycle transitions; never held by the worker.
    control: Mutex<()>,
    commands: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_thread: ThreadId,
}

impl MotionEngine {
    /// Create the engine and block until its processing thread is ready.
    ///
    /// Fails with [`MotionError::InitializationFailure`] when the source
    /// cannot be opened, the thread cannot be spawned, or readiness is not
    /// signalled within `init_timeout_ms`.
    pub fn construct<S: SampleSource>(
        config: EngineConfig,
        gestures: GestureSet,
        source: S,
    ) -> Result<Self, MotionError> {
        config.validate()?;
        if gestures.longest_path() > config.history_length {
            warn!(
                longest_path = gestures.longest_path(),
                history_length = config.history_length,
                "movement history too short for the longest gesture"
            );
        }
        info!(
            sample_rate_hz = config.sample_rate_hz,
            gestures = gestures.len(),
            source = source.name(),
            "motion engine initializing"
        );

        let initial = Snapshot::initial(Instant::now());
        let shared = Arc::new(Shared {
            lifecycle: Mutex::new(LifecycleState::Initializing),
            snapshot: RwLock::new(initial),
            observer: Mutex::new(None),
        });
        let rendezvous = Arc::new(Rendezvous::new());
        let (command_tx, command_rx) = mpsc::channel();

        let worker = Worker {
            config: config.clone(),
            source: Box::new(source),
            shared: Arc::clone(&shared),
            commands: command_rx,
            source_available: true,
        };
        let ready = Arc::clone(&rendezvous);
        let handle = thread::Builder::new()
            .name("motion-engine".to_string())
            .spawn(move || worker.run(gestures, &ready))
            .map_err(|e| {
                MotionError::InitializationFailure(format!("cannot spawn processing thread: {e}"))
            })?;

        if let Err(e) = rendezvous.wait(config.init_timeout()) {
            error!(error = %e, "motion engine initialization failed");
            *shared.lifecycle.lock() = LifecycleState::Terminated;
            // A late worker sees this before entering its loop and closes the source.
            let _ = command_tx.send(Command::Shutdown);
            if handle.is_finished() {
                let _ = handle.join();
            }
            return Err(e);
        }

        {
            let mut state = shared.lifecycle.lock();
            if *state != LifecycleState::Initializing {
                return Err(MotionError::InitializationFailure(
                    "processing thread exited during start-up".to_string(),
                ));
            }
            *state = LifecycleState::Ready;
        }
        info!("motion engine ready");
        let worker_thread = handle.thread().id();

        Ok(Self {
            config,
            shared,
            control: Mutex::new(()),
            commands: Mutex::new(Some(command_tx)),
            worker: Mutex::new(Some(handle)),
            worker_thread,
        })
    }

    /// Like [`construct`](Self::construct), reading gesture definitions from
    /// a TOML document. An empty document selects the builtin set.
    pub fn construct_with_document<S: SampleSource>(
        config: EngineConfig,
        gesture_document: &str,
        source: S,
    ) -> Result<Self, MotionError> {
        let gestures = if gesture_document.trim().is_empty() {
            GestureSet::builtin()
        } else {
            GestureSet::from_toml_str(gesture_document).map_err(|e| {
                MotionError::InitializationFailure(format!("gesture definitions: {e}"))
            })?
        };
        Self::construct(config, gestures, source)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.shared.lifecycle.lock()
    }

    /// Enable sampling. Returns once the processing thread consumes samples.
    pub fn resume(&self) -> Result<(), MotionError> {
        self.ensure_not_worker()?;
        let _control = self.control.lock();
        self.ensure_live()?;
        if self.state() == LifecycleState::Resumed {
            return Ok(());
        }
        self.request(Command::Resume)?;
        self.transition(LifecycleState::Resumed)?;
        info!("motion engine resumed");
        Ok(())
    }

    /// Disable sampling. Returns once the processing thread has stopped
    /// consuming; the published state is retained.
    pub fn pause(&self) -> Result<(), MotionError> {
        self.ensure_not_worker()?;
        let _control = self.control.lock();
        self.ensure_live()?;
        if self.state() != LifecycleState::Resumed {
            return self.transition(LifecycleState::Paused);
        }
        let result = self.request(Command::Pause);
        // The worker stops consuming even when the source refuses to disable.
        if matches!(
            result,
            Ok(()) | Err(MotionError::SourceUnavailable(_)) | Err(MotionError::SourceGlitch(_))
        ) {
            self.transition(LifecycleState::Paused)?;
            info!("motion engine paused");
        }
        result
    }

    /// Stop the processing thread and release the source. Idempotent.
    ///
    /// From an observer callback the thread is told to stop but not joined.
    pub fn terminate(&self) -> Result<(), MotionError> {
        let on_worker = thread::current().id() == self.worker_thread;
        // A client thread may hold the control lock while waiting on this thread.
        let _control = if on_worker { None } else { Some(self.control.lock()) };
        {
            let mut state = self.shared.lifecycle.lock();
            if *state == LifecycleState::Terminated {
                return Ok(());
            }
            *state = LifecycleState::Terminated;
        }

        if let Some(commands) = self.commands.lock().take() {
            let _ = commands.send(Command::Shutdown);
        }
        self.shared.observer.lock().take();

        if let Some(handle) = self.worker.lock().take() {
            if on_worker {
                warn!("terminate called on the processing thread; not joining");
            } else if handle.join().is_err() {
                error!("motion engine processing thread panicked");
            }
        }
        info!("motion engine terminated");
        Ok(())
    }

    /// Latest published state; all fields belong to the same step.
    pub fn snapshot(&self) -> Result<Snapshot, MotionError> {
        self.ensure_live()?;
        Ok(self.shared.snapshot.read().clone())
    }

    pub fn direction(&self) -> Result<Direction, MotionError> {
        self.ensure_live()?;
        Ok(self.shared.snapshot.read().direction)
    }

    pub fn movement(&self) -> Result<Movement, MotionError> {
        self.ensure_live()?;
        Ok(self.shared.snapshot.read().movement)
    }

    pub fn last_gesture(&self) -> Result<Option<GestureEvent>, MotionError> {
        self.ensure_live()?;
        Ok(self.shared.snapshot.read().last_gesture.clone())
    }

    /// Install the push observer, replacing any previous one.
    ///
    /// Callbacks run on the processing thread, in occurrence order.
    pub fn register_observer(&self, observer: Arc<dyn MotionObserver>) -> Result<(), MotionError> {
        self.ensure_live()?;
        if self.shared.observer.lock().replace(observer).is_some() {
            debug!("replaced motion observer");
        }
        Ok(())
    }

    pub fn unregister_observer(&self) -> Result<Option<Arc<dyn MotionObserver>>, MotionError> {
        self.ensure_live()?;
        Ok(self.shared.observer.lock().take())
    }

    /// Register a channel observer and return its receiving end.
    pub fn subscribe(&self) -> Result<Receiver<MotionEvent>, MotionError> {
        let (observer, events) = ChannelObserver::new();
        self.register_observer(observer)?;
        Ok(events)
    }

    fn ensure_live(&self) -> Result<(), MotionError> {
        if self.state().is_live() {
            Ok(())
        } else {
            Err(MotionError::NotReady)
        }
    }

    /// Lifecycle commands wait on the processing thread, so they cannot be
    /// issued from it.
    fn ensure_not_worker(&self) -> Result<(), MotionError> {
        if thread::current().id() == self.worker_thread {
            return Err(MotionError::ReentrantCall);
        }
        Ok(())
    }

    /// Apply a transition unless the engine terminated meanwhile.
    fn transition(&self, to: LifecycleState) -> Result<(), MotionError> {
        let mut state = self.shared.lifecycle.lock();
        if !state.is_live() {
            return Err(MotionError::NotReady);
        }
        *state = to;
        Ok(())
    }

    fn request(
        &self,
        make: impl FnOnce(Sender<Result<(), MotionError>>) -> Command,
    ) -> Result<(), MotionError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        {
            let commands = self.commands.lock();
            let commands = commands.as_ref().ok_or(MotionError::NotReady)?;
            commands.send(make(ack_tx)).map_err(|_| MotionError::NotReady)?;
        }
        ack_rx.recv().map_err(|_| MotionError::NotReady)?
    }
}

impl Drop for MotionEngine {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}

// ============================================================================
// Processing Thread
// ============================================================================

/// Marks the engine terminated when the processing thread exits, including
/// by panic, so clients stop reading a state nobody updates.
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let mut state = self.0.lifecycle.lock();
        if *state != LifecycleState::Terminated {
            error!(state = ?*state, "processing thread exited unexpectedly");
            *state = LifecycleState::Terminated;
        }
    }
}

struct Worker {
    config: EngineConfig,
    source: Box<dyn SampleSource>,
    shared: Arc<Shared>,
    commands: Receiver<Command>,
    source_available: bool,
}

impl Worker {
    fn run(mut self, gestures: GestureSet, ready: &Rendezvous) {
        if let Err(e) = self.source.open() {
            ready.signal(InitStatus::Failed(format!("cannot open sample source: {e}")));
            return;
        }

        let _exit = ExitGuard(Arc::clone(&self.shared));
        let mut classifier = MotionClassifier::new(&self.config, gestures);
        *self.shared.snapshot.write() = classifier.snapshot(true);
        ready.signal(InitStatus::Ready);
        debug!("processing thread started");

        self.event_loop(&mut classifier);

        let _ = self.source.set_enabled(false, self.config.sample_period());
        self.source.close();
        debug!(steps = classifier.steps(), "processing thread stopped");
    }

    fn event_loop(&mut self, classifier: &mut MotionClassifier) {
        let mut consuming = false;
        loop {
            // While paused, block on commands instead of polling the source.
            let command = if consuming {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => return,
                }
            } else {
                match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => return,
                }
            };

            match command {
                Some(Command::Resume(ack)) => {
                    let result = self.enable_source(true);
                    consuming = result.is_ok();
                    let _ = ack.send(result);
                }
                Some(Command::Pause(ack)) => {
                    consuming = false;
                    let result = self.enable_source(false);
                    let _ = ack.send(result);
                }
                Some(Command::Shutdown) => return,
                None => self.step(classifier),
            }
        }
    }

    fn enable_source(&mut self, enabled: bool) -> Result<(), MotionError> {
        let mut attempt = 1;
        loop {
            match self.source.set_enabled(enabled, self.config.sample_period()) {
                Err(SourceError::Glitch(reason)) if attempt < ENABLE_ATTEMPTS => {
                    debug!(%reason, attempt, enabled, "retrying source toggle");
                    attempt += 1;
                }
                result => return result.map_err(MotionError::from),
            }
        }
    }

    fn step(&mut self, classifier: &mut MotionClassifier) {
        match self.source.read(self.config.poll_interval()) {
            Ok(batch) => {
                if !self.source_available {
                    self.source_available = true;
                    info!(source = self.source.name(), "sample source recovered");
                    *self.shared.snapshot.write() = classifier.snapshot(true);
                }
                if batch.is_empty() {
                    return;
                }
                let before = classifier.steps();
                let events = classifier.update(&batch);
                if classifier.steps() != before {
                    *self.shared.snapshot.write() = classifier.snapshot(true);
                }
                self.notify(&events);
            }
            Err(SourceError::Glitch(reason)) => {
                debug!(%reason, "skipping failed read");
            }
            Err(SourceError::Unavailable(reason)) => {
                if self.source_available {
                    self.source_available = false;
                    warn!(source = self.source.name(), %reason, "sample source unavailable");
                    *self.shared.snapshot.write() = classifier.snapshot(false);
                    self.notify(&[MotionEvent::SourceUnavailable(reason)]);
                }
                thread::sleep(self.config.poll_interval());
            }
        }
    }

    fn notify(&self, events: &[MotionEvent]) {
        if events.is_empty() {
            return;
        }
        // Clone out so callbacks run without holding the observer lock.
        let observer = self.shared.observer.lock().clone();
        let Some(observer) = observer else {
            return;
        };
        for event in events {
            trace!(event = %event.label(), "delivering");
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| deliver(observer.as_ref(), event)));
            if delivered.is_err() {
                error!(event = %event.label(), "motion observer panicked; event dropped");
            }
        }
    }
}
