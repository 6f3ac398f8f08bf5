//! Integration tests for the motion engine lifecycle and client delivery.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use motion_core::harness::{script_from_path, wait_for, wait_for_sequence, RecordingObserver};
use motion_core::{
    channel_source, AccelerationSample, ChannelSource, Direction, EngineConfig, GestureEvent,
    GestureSet, LifecycleState, MotionClassifier, MotionEngine, MotionError, MotionEvent,
    MotionObserver, Movement, PollLoop, Poller, SampleFeeder, SampleSource, ScriptedSource,
    SourceError, DEFAULT_BACKLOG_HIGH_WATER,
};

const WAIT: Duration = Duration::from_secs(5);

/// Every reading classified as-is.
fn unfiltered() -> EngineConfig {
    EngineConfig {
        filter_alpha: 1.0,
        ..Default::default()
    }
}

fn reading(direction: Direction) -> AccelerationSample {
    let [x, y, z] = direction.axis();
    AccelerationSample::new(x * 5.0, y * 5.0, z * 5.0)
}

fn resumed_engine() -> (MotionEngine, SampleFeeder) {
    let (feeder, source) = channel_source();
    let engine = MotionEngine::construct(unfiltered(), GestureSet::builtin(), source).unwrap();
    engine.resume().unwrap();
    (engine, feeder)
}

fn feed_and_wait(engine: &MotionEngine, feeder: &SampleFeeder, direction: Direction) {
    let before = engine.snapshot().unwrap().sequence;
    feeder.feed(reading(direction)).unwrap();
    let snapshot = wait_for_sequence(engine, before + 1, WAIT).unwrap();
    assert_eq!(snapshot.sequence, before + 1);
}

// ============================================================================
// Test Sources
// ============================================================================

/// Source whose `open` takes a while or fails.
struct SlowSource {
    open_delay: Duration,
    fail: bool,
}

impl SampleSource for SlowSource {
    fn open(&mut self) -> Result<(), SourceError> {
        thread::sleep(self.open_delay);
        if self.fail {
            Err(SourceError::Unavailable("no accelerometer".to_string()))
        } else {
            Ok(())
        }
    }

    fn set_enabled(&mut self, _enabled: bool, _period: Duration) -> Result<(), SourceError> {
        Ok(())
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError> {
        thread::sleep(timeout);
        Ok(Vec::new())
    }
}

/// Channel source that fails a given number of reads or toggles first.
struct FlakySource {
    inner: ChannelSource,
    outages: Arc<AtomicUsize>,
    glitches: Arc<AtomicUsize>,
    toggle_glitches: Arc<AtomicUsize>,
}

impl FlakySource {
    fn new(inner: ChannelSource) -> Self {
        Self {
            inner,
            outages: Arc::new(AtomicUsize::new(0)),
            glitches: Arc::new(AtomicUsize::new(0)),
            toggle_glitches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SampleSource for FlakySource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.inner.open()
    }

    fn set_enabled(&mut self, enabled: bool, period: Duration) -> Result<(), SourceError> {
        if take_one(&self.toggle_glitches) {
            return Err(SourceError::Glitch("sensor busy".to_string()));
        }
        self.inner.set_enabled(enabled, period)
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError> {
        if take_one(&self.outages) {
            return Err(SourceError::Unavailable("sensor revoked".to_string()));
        }
        if take_one(&self.glitches) {
            return Err(SourceError::Glitch("short read".to_string()));
        }
        self.inner.read(timeout)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Channel source whose reads panic once `broken` is set.
struct BrittleSource {
    inner: ChannelSource,
    broken: Arc<AtomicBool>,
}

impl SampleSource for BrittleSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.inner.open()
    }

    fn set_enabled(&mut self, enabled: bool, period: Duration) -> Result<(), SourceError> {
        self.inner.set_enabled(enabled, period)
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError> {
        if self.broken.load(Ordering::SeqCst) {
            panic!("sensor driver crashed");
        }
        self.inner.read(timeout)
    }
}

// ============================================================================
// Test Observers
// ============================================================================

/// Panics on every direction change to `Left`; records everything else.
struct PanickyObserver {
    inner: RecordingObserver,
}

impl MotionObserver for PanickyObserver {
    fn on_direction_changed(&self, direction: Direction) {
        if direction == Direction::Left {
            panic!("observer bug");
        }
        self.inner.on_direction_changed(direction);
    }

    fn on_movement_detected(&self, movement: Movement) {
        self.inner.on_movement_detected(movement);
    }

    fn on_gesture_detected(&self, gesture: &GestureEvent) {
        self.inner.on_gesture_detected(gesture);
    }
}

/// Holds the processing thread inside its first callback until released.
#[derive(Default)]
struct GateObserver {
    entered: AtomicBool,
    released: AtomicBool,
}

impl GateObserver {
    fn wait_until_entered(&self) {
        let deadline = Instant::now() + WAIT;
        while !self.entered.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(self.entered.load(Ordering::SeqCst));
    }
}

impl MotionObserver for GateObserver {
    fn on_direction_changed(&self, _direction: Direction) {
        if self.entered.swap(true, Ordering::SeqCst) {
            return;
        }
        let deadline = Instant::now() + WAIT;
        while !self.released.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn on_movement_detected(&self, _movement: Movement) {}

    fn on_gesture_detected(&self, _gesture: &GestureEvent) {}
}

/// Calls back into its own engine from the processing thread.
#[derive(Default)]
struct ReentrantObserver {
    engine: OnceLock<Weak<MotionEngine>>,
    terminate: bool,
    results: Mutex<Vec<Result<(), MotionError>>>,
}

impl MotionObserver for ReentrantObserver {
    fn on_direction_changed(&self, _direction: Direction) {
        let Some(engine) = self.engine.get().and_then(Weak::upgrade) else {
            return;
        };
        let mut results = self.results.lock();
        if self.terminate {
            results.push(engine.terminate());
        } else {
            results.push(engine.pause());
            results.push(engine.resume());
        }
    }

    fn on_movement_detected(&self, _movement: Movement) {}

    fn on_gesture_detected(&self, _gesture: &GestureEvent) {}
}

fn wait_for_state(engine: &MotionEngine, state: LifecycleState) {
    let deadline = Instant::now() + WAIT;
    while engine.state() != state && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(engine.state(), state);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_construct_returns_ready_engine_at_rest() {
    let (_feeder, source) = channel_source();
    let engine = MotionEngine::construct(EngineConfig::default(), GestureSet::builtin(), source).unwrap();

    assert_eq!(engine.state(), LifecycleState::Ready);
    let snapshot = engine.snapshot().unwrap();
    assert_eq!(snapshot.direction, Direction::Still);
    assert_eq!(snapshot.sequence, 0);
    assert!(snapshot.last_gesture.is_none());
    assert_eq!(snapshot.gesture_label(), "");
}

#[test]
fn test_construct_waits_for_processing_thread() {
    let delay = Duration::from_millis(80);
    let started = Instant::now();
    let engine = MotionEngine::construct(
        EngineConfig::default(),
        GestureSet::new(),
        SlowSource {
            open_delay: delay,
            fail: false,
        },
    )
    .unwrap();

    assert!(started.elapsed() >= delay);
    assert_eq!(engine.state(), LifecycleState::Ready);
}

#[test]
fn test_construct_times_out() {
    let config = EngineConfig {
        init_timeout_ms: 50,
        ..Default::default()
    };
    let started = Instant::now();
    let result = MotionEngine::construct(
        config,
        GestureSet::new(),
        SlowSource {
            open_delay: Duration::from_secs(2),
            fail: false,
        },
    );

    assert!(matches!(result, Err(MotionError::InitializationFailure(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_source_open_failure_fails_construction() {
    let result = MotionEngine::construct(
        EngineConfig::default(),
        GestureSet::new(),
        SlowSource {
            open_delay: Duration::ZERO,
            fail: true,
        },
    );
    match result {
        Err(MotionError::InitializationFailure(reason)) => assert!(reason.contains("no accelerometer")),
        other => panic!("expected initialization failure, got {:?}", other.map(|e| e.state())),
    }
}

#[test]
fn test_invalid_config_rejected() {
    let (_feeder, source) = channel_source();
    let config = EngineConfig {
        sample_rate_hz: 0,
        ..Default::default()
    };
    let result = MotionEngine::construct(config, GestureSet::new(), source);
    assert!(matches!(result, Err(MotionError::Config(_))));
}

#[test]
fn test_gesture_document_errors_fail_construction() {
    let (_feeder, source) = channel_source();
    let doc = "[[gesture]]\nname = \"bad\"\npath = \"RZ\"\n";
    let result = MotionEngine::construct_with_document(EngineConfig::default(), doc, source);
    assert!(matches!(result, Err(MotionError::InitializationFailure(_))));
}

#[test]
fn test_empty_gesture_document_uses_builtin_set() {
    let source = ScriptedSource::new(script_from_path("DD").unwrap());
    let config = EngineConfig {
        sample_rate_hz: 1000,
        ..Default::default()
    };
    let engine = MotionEngine::construct_with_document(config, "", source).unwrap();
    engine.resume().unwrap();

    let snapshot = wait_for(&engine, Duration::from_secs(10), |s| s.gesture_count > 0).unwrap();
    assert_eq!(snapshot.gesture_label(), "digit-1");
}

#[test]
fn test_terminated_engine_is_not_ready() {
    let (engine, _feeder) = resumed_engine();
    engine.terminate().unwrap();

    assert_eq!(engine.state(), LifecycleState::Terminated);
    assert_eq!(engine.snapshot().unwrap_err(), MotionError::NotReady);
    assert_eq!(engine.resume().unwrap_err(), MotionError::NotReady);
    assert_eq!(engine.pause().unwrap_err(), MotionError::NotReady);
    assert_eq!(engine.direction().unwrap_err(), MotionError::NotReady);
    assert!(engine.register_observer(Arc::new(RecordingObserver::new())).is_err());

    // Idempotent.
    engine.terminate().unwrap();
}

#[test]
fn test_feeder_fails_after_terminate() {
    let (engine, feeder) = resumed_engine();
    drop(engine);
    assert!(feeder.feed(reading(Direction::Left)).is_err());
}

#[test]
fn test_pause_retains_state_and_stops_consuming() {
    let (engine, feeder) = resumed_engine();
    feed_and_wait(&engine, &feeder, Direction::Left);

    engine.pause().unwrap();
    assert_eq!(engine.state(), LifecycleState::Paused);
    feeder.feed(reading(Direction::Right)).unwrap();
    thread::sleep(Duration::from_millis(50));
    let snapshot = engine.snapshot().unwrap();
    assert_eq!(snapshot.direction, Direction::Left);
    assert_eq!(snapshot.sequence, 1);

    // Readings fed while paused are not replayed.
    engine.resume().unwrap();
    feed_and_wait(&engine, &feeder, Direction::Up);
    assert_eq!(engine.direction().unwrap(), Direction::Up);
    assert_eq!(engine.snapshot().unwrap().sequence, 2);
}

#[test]
fn test_pause_resume_does_not_alter_progression() {
    let samples = [Direction::Left, Direction::Left, Direction::Up, Direction::Down];

    let run = |pause_after: Option<usize>| {
        let (engine, feeder) = resumed_engine();
        let observer = Arc::new(RecordingObserver::new());
        engine.register_observer(observer.clone()).unwrap();
        for (i, direction) in samples.iter().enumerate() {
            if pause_after == Some(i) {
                engine.pause().unwrap();
                engine.resume().unwrap();
            }
            feed_and_wait(&engine, &feeder, *direction);
        }
        observer.directions()
    };

    let uninterrupted = run(None);
    assert_eq!(uninterrupted, vec![Direction::Left, Direction::Up, Direction::Down]);
    assert_eq!(run(Some(3)), uninterrupted);
}

#[test]
fn test_repeated_resume_and_pause_are_harmless() {
    let (engine, feeder) = resumed_engine();
    engine.resume().unwrap();
    engine.pause().unwrap();
    engine.pause().unwrap();
    engine.resume().unwrap();
    feed_and_wait(&engine, &feeder, Direction::Forward);
    assert_eq!(engine.direction().unwrap(), Direction::Forward);
}

// ============================================================================
// Delivery
// ============================================================================

#[test]
fn test_push_reports_each_direction_change_once() {
    let (engine, feeder) = resumed_engine();
    let observer = Arc::new(RecordingObserver::new());
    engine.register_observer(observer.clone()).unwrap();

    for direction in [
        Direction::Still,
        Direction::Still,
        Direction::Left,
        Direction::Left,
        Direction::Right,
    ] {
        feeder.feed(reading(direction)).unwrap();
    }
    let snapshot = wait_for_sequence(&engine, 5, WAIT).unwrap();
    assert_eq!(snapshot.sequence, 5);

    assert_eq!(observer.directions(), vec![Direction::Left, Direction::Right]);
}

#[test]
fn test_pull_misses_what_push_sees() {
    let (engine, feeder) = resumed_engine();
    let engine = Arc::new(engine);
    let observer = Arc::new(RecordingObserver::new());
    engine.register_observer(observer.clone()).unwrap();
    let mut poller = Poller::new(Arc::clone(&engine));

    feed_and_wait(&engine, &feeder, Direction::Left);
    assert_eq!(
        poller.poll().unwrap(),
        vec![MotionEvent::DirectionChanged(Direction::Left)]
    );

    feed_and_wait(&engine, &feeder, Direction::Right);
    feed_and_wait(&engine, &feeder, Direction::Left);
    assert!(poller.poll().unwrap().is_empty());

    assert_eq!(
        observer.directions(),
        vec![Direction::Left, Direction::Right, Direction::Left]
    );
}

#[test]
fn test_unregistered_observer_hears_nothing() {
    let (engine, feeder) = resumed_engine();
    let observer = Arc::new(RecordingObserver::new());
    engine.register_observer(observer.clone()).unwrap();
    assert!(engine.unregister_observer().unwrap().is_some());

    feed_and_wait(&engine, &feeder, Direction::Down);
    assert!(observer.events().is_empty());
}

#[test]
fn test_registering_replaces_previous_observer() {
    let (engine, feeder) = resumed_engine();
    let first = Arc::new(RecordingObserver::new());
    let second = Arc::new(RecordingObserver::new());
    engine.register_observer(first.clone()).unwrap();
    engine.register_observer(second.clone()).unwrap();

    feed_and_wait(&engine, &feeder, Direction::Backward);
    assert!(first.events().is_empty());
    assert_eq!(second.directions(), vec![Direction::Backward]);
}

#[test]
fn test_subscribe_channel() {
    let (engine, feeder) = resumed_engine();
    let events = engine.subscribe().unwrap();
    feed_and_wait(&engine, &feeder, Direction::Right);
    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        MotionEvent::DirectionChanged(Direction::Right)
    );
}

#[test]
fn test_poll_loop_delivers_and_stops() {
    let (engine, feeder) = resumed_engine();
    let engine = Arc::new(engine);
    let observer = Arc::new(RecordingObserver::new());
    let poll_loop = PollLoop::spawn(Arc::clone(&engine), Duration::from_millis(5), observer.clone()).unwrap();

    feed_and_wait(&engine, &feeder, Direction::Up);
    let deadline = Instant::now() + WAIT;
    while observer.directions().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(observer.directions(), vec![Direction::Up]);

    poll_loop.stop();
    engine.terminate().unwrap();
}

#[test]
fn test_scripted_gesture_end_to_end() {
    let config = EngineConfig {
        sample_rate_hz: 1000,
        ..Default::default()
    };
    let source = ScriptedSource::new(script_from_path("RDLDR").unwrap());
    let engine = MotionEngine::construct(config, GestureSet::builtin(), source).unwrap();
    let observer = Arc::new(RecordingObserver::new());
    engine.register_observer(observer.clone()).unwrap();
    engine.resume().unwrap();

    let snapshot = wait_for(&engine, Duration::from_secs(10), |s| s.gesture_count > 0).unwrap();
    assert_eq!(snapshot.gesture_label(), "digit-2");
    assert_eq!(snapshot.movement_count, 5);
    assert_eq!(observer.gestures(), vec!["digit-2".to_string()]);
    assert_eq!(observer.movements().len(), 5);
}

// ============================================================================
// Source Failures
// ============================================================================

#[test]
fn test_source_outage_reported_once_then_recovers() {
    let (feeder, inner) = channel_source();
    let source = FlakySource::new(inner);
    let outages = Arc::clone(&source.outages);
    let engine = MotionEngine::construct(unfiltered(), GestureSet::new(), source).unwrap();
    let observer = Arc::new(RecordingObserver::new());
    engine.register_observer(observer.clone()).unwrap();
    engine.resume().unwrap();

    outages.store(3, Ordering::SeqCst);
    let deadline = Instant::now() + WAIT;
    while outages.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    feed_and_wait(&engine, &feeder, Direction::Left);

    let snapshot = engine.snapshot().unwrap();
    assert!(snapshot.source_available);
    assert_eq!(snapshot.direction, Direction::Left);

    let unavailable = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, MotionEvent::SourceUnavailable(_)))
        .count();
    assert_eq!(unavailable, 1);
}

#[test]
fn test_glitches_are_skipped_silently() {
    let (feeder, inner) = channel_source();
    let source = FlakySource::new(inner);
    source.glitches.store(5, Ordering::SeqCst);
    let engine = MotionEngine::construct(unfiltered(), GestureSet::new(), source).unwrap();
    let observer = Arc::new(RecordingObserver::new());
    engine.register_observer(observer.clone()).unwrap();
    engine.resume().unwrap();

    feed_and_wait(&engine, &feeder, Direction::Right);
    assert_eq!(observer.events(), vec![MotionEvent::DirectionChanged(Direction::Right)]);
    assert!(engine.snapshot().unwrap().source_available);
}

// ============================================================================
// Concurrent Readers
// ============================================================================

#[test]
fn test_concurrent_readers_see_consistent_snapshots() {
    let (engine, feeder) = resumed_engine();
    let engine = Arc::new(engine);
    let reference = MotionClassifier::new(&unfiltered(), GestureSet::new());
    let reference = Arc::new(reference);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let reference = Arc::clone(&reference);
            thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = engine.snapshot().unwrap();
                    if snapshot.sequence > 0 {
                        assert_eq!(reference.classify(snapshot.sample.as_array()), snapshot.direction);
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    let cycle = [Direction::Left, Direction::Up, Direction::Still, Direction::Forward];
    for direction in cycle.iter().cycle().take(100) {
        feeder.feed(reading(*direction)).unwrap();
    }
    for reader in readers {
        reader.join().unwrap();
    }
    let snapshot = wait_for_sequence(&engine, 100, WAIT).unwrap();
    assert_eq!(snapshot.sequence, 100);
}

#[test]
fn test_backlog_past_high_water_is_classified_in_one_step() {
    let (engine, feeder) = resumed_engine();
    let gate = Arc::new(GateObserver::default());
    engine.register_observer(gate.clone()).unwrap();

    feeder.feed(reading(Direction::Right)).unwrap();
    gate.wait_until_entered();

    let flood = 50 * DEFAULT_BACKLOG_HIGH_WATER;
    for _ in 0..flood {
        feeder.feed(reading(Direction::Left)).unwrap();
    }
    gate.released.store(true, Ordering::SeqCst);

    let snapshot = wait_for(&engine, WAIT, |s| s.direction == Direction::Left).unwrap();
    assert_eq!(snapshot.sequence, 2);

    // Back under the mark, every feed is its own step again.
    feed_and_wait(&engine, &feeder, Direction::Right);
    assert_eq!(engine.snapshot().unwrap().sequence, 3);
}

// ============================================================================
// Failure Isolation
// ============================================================================

#[test]
fn test_panicking_observer_does_not_stop_processing() {
    let (engine, feeder) = resumed_engine();
    let observer = Arc::new(PanickyObserver {
        inner: RecordingObserver::new(),
    });
    engine.register_observer(observer.clone()).unwrap();

    feed_and_wait(&engine, &feeder, Direction::Left);
    feed_and_wait(&engine, &feeder, Direction::Right);

    assert_eq!(engine.state(), LifecycleState::Resumed);
    assert_eq!(engine.direction().unwrap(), Direction::Right);
    assert_eq!(observer.inner.directions(), vec![Direction::Right]);
    engine.pause().unwrap();
    assert_eq!(engine.state(), LifecycleState::Paused);
}

#[test]
fn test_dead_processing_thread_terminates_engine() {
    let (_feeder, inner) = channel_source();
    let broken = Arc::new(AtomicBool::new(false));
    let source = BrittleSource {
        inner,
        broken: Arc::clone(&broken),
    };
    let engine = MotionEngine::construct(unfiltered(), GestureSet::new(), source).unwrap();
    engine.resume().unwrap();

    broken.store(true, Ordering::SeqCst);
    wait_for_state(&engine, LifecycleState::Terminated);

    assert_eq!(engine.snapshot().unwrap_err(), MotionError::NotReady);
    assert_eq!(engine.pause().unwrap_err(), MotionError::NotReady);
    assert_eq!(engine.resume().unwrap_err(), MotionError::NotReady);
    assert_eq!(engine.state(), LifecycleState::Terminated);
    assert!(engine.terminate().is_ok());
}

#[test]
fn test_lifecycle_calls_from_callback_are_rejected() {
    let (engine, feeder) = resumed_engine();
    let engine = Arc::new(engine);
    let observer = Arc::new(ReentrantObserver::default());
    let _ = observer.engine.set(Arc::downgrade(&engine));
    engine.register_observer(observer.clone()).unwrap();

    feed_and_wait(&engine, &feeder, Direction::Left);
    let deadline = Instant::now() + WAIT;
    while observer.results.lock().len() < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(
        *observer.results.lock(),
        vec![Err(MotionError::ReentrantCall), Err(MotionError::ReentrantCall)]
    );
    assert_eq!(engine.state(), LifecycleState::Resumed);
    feed_and_wait(&engine, &feeder, Direction::Right);
    engine.pause().unwrap();
}

#[test]
fn test_terminate_from_callback_stops_engine() {
    let (engine, feeder) = resumed_engine();
    let engine = Arc::new(engine);
    let observer = Arc::new(ReentrantObserver {
        terminate: true,
        ..Default::default()
    });
    let _ = observer.engine.set(Arc::downgrade(&engine));
    engine.register_observer(observer.clone()).unwrap();

    feeder.feed(reading(Direction::Up)).unwrap();
    wait_for_state(&engine, LifecycleState::Terminated);

    assert_eq!(*observer.results.lock(), vec![Ok(())]);
    assert_eq!(engine.snapshot().unwrap_err(), MotionError::NotReady);
    assert!(engine.terminate().is_ok());
}

#[test]
fn test_toggle_glitches_are_retried() {
    let (feeder, inner) = channel_source();
    let source = FlakySource::new(inner);
    let toggle_glitches = Arc::clone(&source.toggle_glitches);
    let engine = MotionEngine::construct(unfiltered(), GestureSet::new(), source).unwrap();

    toggle_glitches.store(2, Ordering::SeqCst);
    engine.resume().unwrap();
    assert_eq!(engine.state(), LifecycleState::Resumed);
    feed_and_wait(&engine, &feeder, Direction::Down);

    toggle_glitches.store(10, Ordering::SeqCst);
    assert_eq!(
        engine.pause().unwrap_err(),
        MotionError::SourceGlitch("sensor busy".to_string())
    );
    assert_eq!(engine.state(), LifecycleState::Paused);
}
