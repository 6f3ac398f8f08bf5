use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use motion_core::harness::script_from_path;
use motion_core::{
    Direction, EngineConfig, GestureEvent, GestureSet, MotionEngine, MotionEvent, MotionObserver,
    Movement, Poller, ScriptedSource,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Observer callbacks, every transition
    Push,
    /// Periodic snapshot polling, latest value only
    Pull,
}

#[derive(Parser)]
#[command(name = "motion-demo")]
#[command(about = "Replay a synthetic motion path through the motion engine")]
struct Args {
    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gesture definitions file (TOML)
    #[arg(short, long)]
    gestures: Option<PathBuf>,

    /// Delivery mode
    #[arg(short, long, value_enum, default_value = "push")]
    mode: Mode,

    /// Poll interval in pull mode
    #[arg(long, default_value_t = 40)]
    poll_ms: u64,

    /// Movement path to replay, e.g. RDLDR
    #[arg(short, long, default_value = "RDLDR")]
    script: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Forwards engine callbacks into the async event loop.
struct ForwardingObserver {
    tx: UnboundedSender<MotionEvent>,
}

impl MotionObserver for ForwardingObserver {
    fn on_direction_changed(&self, direction: Direction) {
        let _ = self.tx.send(MotionEvent::DirectionChanged(direction));
    }

    fn on_movement_detected(&self, movement: Movement) {
        let _ = self.tx.send(MotionEvent::MovementDetected(movement));
    }

    fn on_gesture_detected(&self, gesture: &GestureEvent) {
        let _ = self.tx.send(MotionEvent::GestureDetected(gesture.clone()));
    }

    fn on_source_unavailable(&self, reason: &str) {
        let _ = self.tx.send(MotionEvent::SourceUnavailable(reason.to_string()));
    }
}

fn print_event(event: &MotionEvent) {
    match event {
        MotionEvent::DirectionChanged(d) => println!("direction  {d}"),
        MotionEvent::MovementDetected(m) => println!("movement   {m}"),
        MotionEvent::GestureDetected(g) => println!("gesture    {g}"),
        MotionEvent::SourceUnavailable(reason) => println!("source     unavailable: {reason}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "motion_demo={},motion_core={}",
            args.log_level, args.log_level
        ))
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::load_from_env(),
    };
    let gestures = match args.gestures.as_ref().or(config.gesture_file.as_ref()) {
        Some(path) => GestureSet::load_from_file(path)?,
        None => GestureSet::builtin(),
    };

    let script = script_from_path(&args.script).context("invalid --script path")?;
    let playback = config.sample_period() * script.len() as u32 + Duration::from_secs(1);
    info!(path = %args.script, samples = script.len(), "replaying script");

    // Construction blocks until the processing thread is ready.
    let engine = tokio::task::spawn_blocking(move || {
        MotionEngine::construct(config, gestures, ScriptedSource::new(script))
    })
    .await??;
    let engine = Arc::new(engine);

    let run = async {
        match args.mode {
            Mode::Push => run_push(&engine).await,
            Mode::Pull => run_pull(&engine, Duration::from_millis(args.poll_ms)).await,
        }
    };

    tokio::select! {
        result = run => result?,
        _ = sleep(playback) => info!("script finished"),
        _ = tokio::signal::ctrl_c() => warn!("interrupted"),
    }

    let snapshot = engine.snapshot()?;
    println!(
        "summary    movements={} gestures={} last-gesture={:?}",
        snapshot.movement_count,
        snapshot.gesture_count,
        snapshot.gesture_label()
    );

    let engine = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || engine.terminate()).await??;
    Ok(())
}

async fn run_push(engine: &MotionEngine) -> anyhow::Result<()> {
    let (tx, mut rx) = unbounded_channel();
    engine.register_observer(Arc::new(ForwardingObserver { tx }))?;
    engine.resume()?;

    while let Some(event) = rx.recv().await {
        print_event(&event);
    }
    Ok(())
}

async fn run_pull(engine: &Arc<MotionEngine>, interval: Duration) -> anyhow::Result<()> {
    let mut poller = Poller::new(Arc::clone(engine));
    let mut ticker = tokio::time::interval(interval);
    engine.resume()?;

    loop {
        ticker.tick().await;
        for event in poller.poll()? {
            print_event(&event);
        }
    }
}
