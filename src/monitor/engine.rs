//! The tick loop.
//!
//! [`PollingEngine`] owns every piece of mutable session state: the
//! last-known-state table, the change log and the counters. It runs the
//! baseline pass, then ticks at a fixed interval until the stop signal is
//! observed at a tick boundary.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::changelog::{ChangeLog, ChangeLogError};
use crate::entity::MonitoredEntity;
use crate::fetch::{StateFetcher, Unavailable};
use crate::time::{Clock, iso8601};

use super::table::StateTable;
use super::{ChangeEvent, Reporter, SessionConfig, SessionError, SessionReport};

/// Tick cadence and bounds, copied out of [`SessionConfig`].
#[derive(Debug, Clone, Copy)]
struct Cadence {
    interval: Duration,
    fetch_timeout: Duration,
    progress_every: u64,
}

pub(crate) struct PollingEngine<F, C, R, W: Write> {
    fetcher: F,
    clock: C,
    reporter: R,
    entities: Arc<[MonitoredEntity]>,
    cadence: Cadence,
    table: StateTable,
    log: ChangeLog<W>,
    checks_performed: u64,
    changes_written: u64,
    baseline_records: u64,
}

impl<F, C, R, W> PollingEngine<F, C, R, W>
where
    F: StateFetcher,
    C: Clock,
    R: Reporter,
    W: Write,
{
    pub(crate) fn new(
        fetcher: F,
        clock: C,
        reporter: R,
        config: &SessionConfig,
        log: ChangeLog<W>,
    ) -> Self {
        Self {
            fetcher,
            clock,
            reporter,
            entities: config.entities.iter().cloned().collect(),
            cadence: Cadence {
                interval: config.interval,
                fetch_timeout: config.fetch_timeout,
                progress_every: config.progress_every,
            },
            table: StateTable::new(),
            log,
            checks_performed: 0,
            changes_written: 0,
            baseline_records: 0,
        }
    }

    /// Records the initial state of every entity that answers.
    ///
    /// Entities that are unavailable now get no entry; their first
    /// successful fetch during a tick is recorded as a change instead.
    pub(crate) async fn baseline(&mut self) -> Result<(), ChangeLogError> {
        let entities = Arc::clone(&self.entities);

        for entity in entities.iter() {
            let fetched =
                fetch_bounded(&self.fetcher, self.cadence.fetch_timeout, &entity.id).await;
            match fetched {
                Ok(state) => {
                    let timestamp = iso8601(self.clock.now());
                    self.log.write_baseline(entity, &state, &timestamp)?;
                    self.table.set(&entity.id, state);
                    self.baseline_records += 1;
                }
                Err(reason) => {
                    tracing::warn!("No initial state for {entity}: {reason}");
                }
            }
        }

        self.reporter
            .baseline(self.baseline_records, entities.len());
        Ok(())
    }

    /// Runs one full pass over the catalog, in catalog order.
    pub(crate) async fn tick(&mut self) -> Result<(), ChangeLogError> {
        let timestamp = iso8601(self.clock.now());
        let entities = Arc::clone(&self.entities);

        for entity in entities.iter() {
            self.observe(entity, &timestamp).await?;
        }

        self.checks_performed += 1;
        let every = self.cadence.progress_every;
        if every > 0 && self.checks_performed % every == 0 {
            self.reporter
                .progress(self.checks_performed, self.changes_written);
        }

        Ok(())
    }

    /// Ticks until the stop signal is seen, then closes the log.
    ///
    /// Dropping the sender side counts as a stop request.
    pub(crate) async fn run(
        mut self,
        mut stop: watch::Receiver<bool>,
    ) -> Result<SessionReport, SessionError> {
        let outcome = self.poll_until_stopped(&mut stop).await;
        self.finish(outcome)
    }

    /// Closes the log after a failure that happened before the loop began.
    pub(crate) fn abort(self, source: ChangeLogError) -> SessionError {
        let report = self.report();
        if let Err(close_error) = self.log.close() {
            tracing::warn!("Failed to close change log after write failure: {close_error}");
        }
        SessionError::Persistence { source, report }
    }

    pub(crate) fn report(&self) -> SessionReport {
        SessionReport {
            checks_performed: self.checks_performed,
            changes_written: self.changes_written,
            baseline_records: self.baseline_records,
            destination: self.log.destination().to_path_buf(),
        }
    }

    async fn poll_until_stopped(
        &mut self,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<(), ChangeLogError> {
        loop {
            if *stop.borrow_and_update() {
                return Ok(());
            }

            self.tick().await?;

            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Session handle dropped, stopping");
                        return Ok(());
                    }
                }

                () = tokio::time::sleep(self.cadence.interval) => {}
            }
        }
    }

    fn finish(self, outcome: Result<(), ChangeLogError>) -> Result<SessionReport, SessionError> {
        if let Err(source) = outcome {
            return Err(self.abort(source));
        }

        let report = self.report();
        match self.log.close() {
            Ok(()) => Ok(report),
            Err(source) => Err(SessionError::Persistence { source, report }),
        }
    }

    async fn observe(
        &mut self,
        entity: &MonitoredEntity,
        timestamp: &str,
    ) -> Result<(), ChangeLogError> {
        let fetched = fetch_bounded(&self.fetcher, self.cadence.fetch_timeout, &entity.id).await;
        let current = match fetched {
            Ok(state) => state,
            Err(reason) => {
                tracing::debug!("No observation for {entity} this tick: {reason}");
                return Ok(());
            }
        };

        if self.table.get(&entity.id) == Some(current.as_str()) {
            return Ok(());
        }

        let previous = self.table.set(&entity.id, current.clone());
        let change = ChangeEvent {
            entity,
            previous,
            current,
            timestamp,
        };

        self.log.write_change(&change)?;
        self.changes_written += 1;
        self.reporter.change(&change);
        Ok(())
    }
}

/// Fetches with the session timeout on top of whatever the fetcher does.
///
/// Takes the fetcher alone so the future does not borrow the log writer.
async fn fetch_bounded<F: StateFetcher>(
    fetcher: &F,
    timeout: Duration,
    id: &str,
) -> Result<String, Unavailable> {
    tokio::time::timeout(timeout, fetcher.fetch(id))
        .await
        .unwrap_or(Err(Unavailable::Timeout))
}
