//! Accelerometer sample sources.
//!
//! A source is driven exclusively from the engine's processing thread:
//! opened once during initialization, enabled/disabled by resume/pause,
//! read in a loop, and closed at teardown. Sources deliver *batches*; the
//! engine classifies once per batch, and only the latest filtered value is
//! retained, so a slow consumer sees fewer intermediate readings rather
//! than a backlog.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::errors::SourceError;
use crate::types::AccelerationSample;

/// Platform accelerometer abstraction.
pub trait SampleSource: Send + 'static {
    /// Acquire the sensor. Failure here fails engine construction.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Start or stop delivery at the requested sampling period.
    fn set_enabled(&mut self, enabled: bool, period: Duration) -> Result<(), SourceError>;

    /// Wait up to `timeout` for the next batch; empty on timeout.
    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError>;

    /// Release the sensor. Called once, on the processing thread.
    fn close(&mut self) {}

    fn name(&self) -> &str {
        "sample-source"
    }
}

impl SampleSource for Box<dyn SampleSource> {
    fn open(&mut self) -> Result<(), SourceError> {
        (**self).open()
    }

    fn set_enabled(&mut self, enabled: bool, period: Duration) -> Result<(), SourceError> {
        (**self).set_enabled(enabled, period)
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError> {
        (**self).read(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Channel Source
// ============================================================================

/// Producer half of a [`ChannelSource`]; cheap to clone.
///
/// Every `feed*` call is delivered to the engine as one batch.
#[derive(Clone)]
pub struct SampleFeeder {
    tx: Sender<Vec<AccelerationSample>>,
}

impl SampleFeeder {
    pub fn feed(&self, sample: AccelerationSample) -> Result<(), SourceError> {
        self.feed_batch(vec![sample])
    }

    pub fn feed_xyz(&self, x: f32, y: f32, z: f32) -> Result<(), SourceError> {
        self.feed(AccelerationSample::new(x, y, z))
    }

    pub fn feed_batch(&self, batch: Vec<AccelerationSample>) -> Result<(), SourceError> {
        self.tx
            .send(batch)
            .map_err(|_| SourceError::Unavailable("sample consumer has shut down".to_string()))
    }
}

/// Queued batches above which a read merges the whole backlog into one.
pub const DEFAULT_BACKLOG_HIGH_WATER: usize = 128;

/// Source fed by an external producer, e.g. a platform sensor listener.
///
/// Batches are read one at a time while the consumer keeps up. Once more
/// than `high_water` batches are waiting, the next read returns all of them
/// merged, so a stalled consumer catches up in one classification step.
pub struct ChannelSource {
    rx: Receiver<Vec<AccelerationSample>>,
    pending: VecDeque<Vec<AccelerationSample>>,
    high_water: usize,
    enabled: bool,
}

/// Create a connected feeder/source pair.
pub fn channel_source() -> (SampleFeeder, ChannelSource) {
    channel_source_with_backlog(DEFAULT_BACKLOG_HIGH_WATER)
}

/// Like [`channel_source`] with a custom backlog high-water mark.
pub fn channel_source_with_backlog(high_water: usize) -> (SampleFeeder, ChannelSource) {
    let (tx, rx) = mpsc::channel();
    let source = ChannelSource {
        rx,
        pending: VecDeque::new(),
        high_water: high_water.max(1),
        enabled: false,
    };
    (SampleFeeder { tx }, source)
}

impl ChannelSource {
    fn take_backlog(&mut self) -> Vec<AccelerationSample> {
        let batches = self.pending.len();
        let merged: Vec<_> = self.pending.drain(..).flatten().collect();
        debug!(batches, readings = merged.len(), "coalesced reading backlog");
        merged
    }
}

impl SampleSource for ChannelSource {
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool, _period: Duration) -> Result<(), SourceError> {
        if enabled && !self.enabled {
            // A disabled sensor produces nothing; drop what queued meanwhile.
            let mut dropped: usize = self.pending.drain(..).map(|b| b.len()).sum();
            while let Ok(batch) = self.rx.try_recv() {
                dropped += batch.len();
            }
            if dropped > 0 {
                debug!(dropped, "discarded readings fed while paused");
            }
        }
        self.enabled = enabled;
        Ok(())
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError> {
        loop {
            match self.rx.try_recv() {
                Ok(batch) => self.pending.push_back(batch),
                Err(TryRecvError::Empty) => break,
                // Queued batches are still served before the outage shows.
                Err(TryRecvError::Disconnected) if !self.pending.is_empty() => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(SourceError::Unavailable("sample feeder disconnected".to_string()))
                }
            }
        }

        if self.pending.len() > self.high_water {
            return Ok(self.take_backlog());
        }
        if let Some(batch) = self.pending.pop_front() {
            return Ok(batch);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(batch) => Ok(batch),
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => {
                Err(SourceError::Unavailable("sample feeder disconnected".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}

// ============================================================================
// Scripted Source
// ============================================================================

/// Replays a recorded waveform at the enabled sampling period, then reports
/// rest (zero acceleration) forever.
pub struct ScriptedSource {
    script: VecDeque<[f32; 3]>,
    period: Duration,
    next_due: Option<Instant>,
    enabled: bool,
}

impl ScriptedSource {
    pub fn new(script: Vec<[f32; 3]>) -> Self {
        Self {
            script: script.into(),
            period: Duration::from_millis(10),
            next_due: None,
            enabled: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SampleSource for ScriptedSource {
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool, period: Duration) -> Result<(), SourceError> {
        self.enabled = enabled;
        self.period = period;
        self.next_due = None;
        Ok(())
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<AccelerationSample>, SourceError> {
        if !self.enabled {
            std::thread::sleep(timeout);
            return Ok(Vec::new());
        }

        let now = Instant::now();
        let due = *self.next_due.get_or_insert(now);
        if due > now {
            let wait = due - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                return Ok(Vec::new());
            }
            std::thread::sleep(wait);
        }
        self.next_due = Some(due + self.period);

        let [x, y, z] = self.script.pop_front().unwrap_or([0.0; 3]);
        Ok(vec![AccelerationSample::new(x, y, z)])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
