//! Shared test fixtures for monitor tests.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::sync::Notify;

use crate::changelog::ChangeLog;
use crate::entity::MonitoredEntity;
use crate::fetch::{StateFetcher, Unavailable};
use crate::monitor::{ChangeEvent, Reporter};
use crate::time::Clock;

/// Fetcher that replays a per-entity script.
///
/// `Some(state)` answers with that state, `None` is an unavailable fetch.
/// Once a script runs out the entity stays unavailable.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, id: &str, steps: &[Option<&str>]) -> Self {
        self.scripts.lock().unwrap().insert(
            id.to_string(),
            steps.iter().map(|s| s.map(str::to_string)).collect(),
        );
        self
    }

    /// Identifiers fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, id: &str) -> Result<String, Unavailable> {
        self.calls.lock().unwrap().push(id.to_string());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .flatten()
            .ok_or_else(|| Unavailable::Malformed("scripted outage".to_string()))
    }
}

impl StateFetcher for ScriptedFetcher {
    async fn fetch(&self, id: &str) -> Result<String, Unavailable> {
        self.next(id)
    }
}

impl StateFetcher for Arc<ScriptedFetcher> {
    async fn fetch(&self, id: &str) -> Result<String, Unavailable> {
        self.next(id)
    }
}

/// Fetcher that never answers for one entity and delegates the rest.
pub struct HangingFetcher {
    pub hanging_id: String,
    pub inner: ScriptedFetcher,
}

impl StateFetcher for HangingFetcher {
    async fn fetch(&self, id: &str) -> Result<String, Unavailable> {
        if id == self.hanging_id {
            std::future::pending::<()>().await;
        }
        self.inner.next(id)
    }
}

/// Fetcher that is slow for one entity on its nth call and signals when
/// that call begins.
pub struct SlowFetcher {
    pub slow_id: String,
    pub slow_call: usize,
    pub delay: Duration,
    pub entered: Arc<Notify>,
    pub inner: ScriptedFetcher,
    slow_calls: AtomicUsize,
}

impl SlowFetcher {
    pub fn new(
        slow_id: &str,
        slow_call: usize,
        delay: Duration,
        inner: ScriptedFetcher,
    ) -> Self {
        Self {
            slow_id: slow_id.to_string(),
            slow_call,
            delay,
            entered: Arc::new(Notify::new()),
            inner,
            slow_calls: AtomicUsize::new(0),
        }
    }
}

impl StateFetcher for SlowFetcher {
    async fn fetch(&self, id: &str) -> Result<String, Unavailable> {
        if id == self.slow_id {
            let call = self.slow_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.slow_call {
                self.entered.notify_one();
                tokio::time::sleep(self.delay).await;
            }
        }
        self.inner.next(id)
    }
}

/// Clock that moves forward one second every time it is read.
#[derive(Debug)]
pub struct SteppingClock {
    secs: AtomicU64,
}

impl SteppingClock {
    pub const fn starting_at(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.secs.fetch_add(1, Ordering::SeqCst))
    }
}

/// One captured change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenChange {
    pub id: String,
    pub previous: Option<String>,
    pub current: String,
}

/// Reporter that records every notification.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub baselines: Mutex<Vec<(u64, usize)>>,
    pub changes: Mutex<Vec<SeenChange>>,
    pub progress: Mutex<Vec<(u64, u64)>>,
}

impl RecordingReporter {
    pub fn changes(&self) -> Vec<SeenChange> {
        self.changes.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(u64, u64)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn baselines(&self) -> Vec<(u64, usize)> {
        self.baselines.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn baseline(&self, recorded: u64, monitored: usize) {
        self.baselines.lock().unwrap().push((recorded, monitored));
    }

    fn change(&self, change: &ChangeEvent<'_>) {
        self.changes.lock().unwrap().push(SeenChange {
            id: change.entity.id.clone(),
            previous: change.previous.clone(),
            current: change.current.clone(),
        });
    }

    fn progress(&self, checks: u64, changes: u64) {
        self.progress.lock().unwrap().push((checks, changes));
    }
}

/// In-memory writer whose contents stay readable after the log takes it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Data rows written so far, split into their columns.
    pub fn rows(&self) -> Vec<Vec<String>> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|line| line.split(',').map(str::to_string).collect())
            .collect()
    }

    /// `(entityId, state)` of every row, in write order.
    pub fn id_states(&self) -> Vec<(String, String)> {
        self.rows()
            .into_iter()
            .map(|row| (row[1].clone(), row[5].clone()))
            .collect()
    }

    pub fn log(&self) -> ChangeLog<Self> {
        ChangeLog::from_writer(self.clone(), "memory.csv", false).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that accepts a fixed number of writes and then fails.
#[derive(Debug)]
pub struct FailingWriter {
    pub writes_left: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.writes_left == 0 {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        }
        self.writes_left -= 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn entity(id: &str, name: &str) -> MonitoredEntity {
    MonitoredEntity::new(id)
        .with_name(name)
        .with_type("Switch")
        .with_location("Kitchen")
}

pub fn pair(id: &str, state: &str) -> (String, String) {
    (id.to_string(), state.to_string())
}
