//! Session lifecycle: start, stop, join.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::changelog::ChangeLog;
use crate::config::defaults;
use crate::entity::MonitoredEntity;
use crate::fetch::StateFetcher;
use crate::time::{Clock, SystemClock};

use super::engine::PollingEngine;
use super::{LogReporter, Reporter, SessionError};

/// Everything a monitoring run needs, passed explicitly at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Entities to watch, in the order they are visited each tick
    pub entities: Vec<MonitoredEntity>,
    /// Change log destination
    pub destination: PathBuf,
    /// Time between the start of one tick's processing and the next
    pub interval: Duration,
    /// Upper bound on a single fetch
    pub fetch_timeout: Duration,
    /// Emit a progress summary every this many ticks (0 disables)
    pub progress_every: u64,
}

impl SessionConfig {
    /// Creates a configuration with default cadence.
    #[must_use]
    pub fn new(entities: Vec<MonitoredEntity>, destination: impl Into<PathBuf>) -> Self {
        Self {
            entities,
            destination: destination.into(),
            interval: defaults::interval(),
            fetch_timeout: defaults::fetch_timeout(),
            progress_every: defaults::PROGRESS_EVERY,
        }
    }

    /// Sets the tick interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the per-fetch timeout.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets how many ticks pass between progress summaries.
    #[must_use]
    pub const fn with_progress_every(mut self, ticks: u64) -> Self {
        self.progress_every = ticks;
        self
    }
}

/// Final counters of a monitoring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Completed ticks
    pub checks_performed: u64,
    /// Change records written (baseline records excluded)
    pub changes_written: u64,
    /// Baseline records written at session start
    pub baseline_records: u64,
    /// Where the records went
    pub destination: PathBuf,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} check(s), {} baseline record(s), {} change(s) saved to {}",
            self.checks_performed,
            self.baseline_records,
            self.changes_written,
            self.destination.display()
        )
    }
}

/// Builder for a monitoring run.
///
/// # Type Parameters
///
/// * `F` - The [`StateFetcher`] queried for every entity
/// * `C` - The [`Clock`] used for record timestamps (defaults to [`SystemClock`])
/// * `R` - The [`Reporter`] receiving notifications (defaults to [`LogReporter`])
///
/// # Example
///
/// ```ignore
/// use statewatch::monitor::{MonitorSession, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::new(entities, "monitor.csv");
/// let mut handle = MonitorSession::new(fetcher, config).start().await?;
///
/// // ... later, from the operator side
/// handle.request_stop();
/// let report = handle.wait_until_stopped(Duration::from_secs(5)).await?;
/// println!("{report}");
/// ```
pub struct MonitorSession<F, C = SystemClock, R = LogReporter> {
    fetcher: F,
    clock: C,
    reporter: R,
    config: SessionConfig,
}

impl<F> MonitorSession<F, SystemClock, LogReporter>
where
    F: StateFetcher + 'static,
{
    /// Creates a session with the system clock and the logging reporter.
    #[must_use]
    pub const fn new(fetcher: F, config: SessionConfig) -> Self {
        Self {
            fetcher,
            clock: SystemClock,
            reporter: LogReporter,
            config,
        }
    }
}

impl<F, C, R> MonitorSession<F, C, R>
where
    F: StateFetcher + 'static,
    C: Clock + 'static,
    R: Reporter + 'static,
{
    /// Replaces the clock used for record timestamps.
    #[must_use]
    pub fn with_clock<C2: Clock + 'static>(self, clock: C2) -> MonitorSession<F, C2, R> {
        MonitorSession {
            fetcher: self.fetcher,
            clock,
            reporter: self.reporter,
            config: self.config,
        }
    }

    /// Replaces the operator notification sink.
    #[must_use]
    pub fn with_reporter<R2: Reporter + 'static>(self, reporter: R2) -> MonitorSession<F, C, R2> {
        MonitorSession {
            fetcher: self.fetcher,
            clock: self.clock,
            reporter,
            config: self.config,
        }
    }

    /// Opens the configured destination and starts monitoring.
    ///
    /// Runs the baseline pass before returning, then moves the tick loop to
    /// a background task.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoEntitiesSelected`] if the catalog is empty
    /// - [`SessionError::Persistence`] if the destination cannot be opened
    ///   or a baseline record cannot be written
    pub async fn start(self) -> Result<SessionHandle, SessionError> {
        self.ensure_entities()?;

        let log = ChangeLog::open(&self.config.destination).map_err(|source| {
            SessionError::Persistence {
                source,
                report: SessionReport {
                    checks_performed: 0,
                    changes_written: 0,
                    baseline_records: 0,
                    destination: self.config.destination.clone(),
                },
            }
        })?;

        self.start_with_log(log).await
    }

    /// Starts monitoring into an already opened change log.
    ///
    /// # Errors
    ///
    /// Same as [`MonitorSession::start`], minus the open failure.
    pub async fn start_with_log<W>(self, log: ChangeLog<W>) -> Result<SessionHandle, SessionError>
    where
        W: Write + Send + 'static,
    {
        self.ensure_entities()?;

        tracing::debug!(
            "Starting session: {} entities, interval {:?}, fetch timeout {:?}",
            self.config.entities.len(),
            self.config.interval,
            self.config.fetch_timeout
        );

        let mut engine =
            PollingEngine::new(self.fetcher, self.clock, self.reporter, &self.config, log);

        if let Err(source) = engine.baseline().await {
            return Err(engine.abort(source));
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(engine.run(stop_rx));

        Ok(SessionHandle {
            stop,
            task: Some(task),
            finished: None,
        })
    }

    fn ensure_entities(&self) -> Result<(), SessionError> {
        if self.config.entities.is_empty() {
            return Err(SessionError::NoEntitiesSelected);
        }
        Ok(())
    }
}

/// Control surface of a running session.
///
/// Dropping the handle without calling [`SessionHandle::request_stop`]
/// also stops the poller at its next tick boundary, but the result is lost.
#[derive(Debug)]
pub struct SessionHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<Result<SessionReport, SessionError>>>,
    finished: Option<SessionReport>,
}

impl SessionHandle {
    /// Asks the poller to stop after its current tick.
    ///
    /// Idempotent; calling it after the poller has stopped is harmless.
    pub fn request_stop(&self) {
        if !self.stop.send_replace(true) {
            tracing::debug!("Stop requested");
        }
    }

    /// Returns `true` if the poller task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the poller to end, without a deadline.
    ///
    /// Cancel-safe: dropping the future leaves the handle joinable.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Persistence`] if the log failed during the run
    /// - [`SessionError::Aborted`] if the poller task panicked
    /// - [`SessionError::AlreadyJoined`] if a failed result was already collected
    pub async fn join(&mut self) -> Result<SessionReport, SessionError> {
        let Some(task) = self.task.as_mut() else {
            return self.finished.clone().ok_or(SessionError::AlreadyJoined);
        };

        let joined = task.await;
        self.task = None;

        let result = joined.map_err(SessionError::Aborted).and_then(|outcome| outcome);
        if let Ok(report) = &result {
            self.finished = Some(report.clone());
        }
        result
    }

    /// Waits up to `timeout` for the poller to finish its current tick and
    /// stop.
    ///
    /// Does not stop the poller by itself; call
    /// [`SessionHandle::request_stop`] first. On timeout the poller keeps
    /// running and the wait can be retried.
    ///
    /// # Errors
    ///
    /// [`SessionError::StopTimeout`] if the deadline passes, otherwise the
    /// same as [`SessionHandle::join`].
    pub async fn wait_until_stopped(
        &mut self,
        timeout: Duration,
    ) -> Result<SessionReport, SessionError> {
        tokio::time::timeout(timeout, self.join())
            .await
            .unwrap_or(Err(SessionError::StopTimeout))
    }
}
