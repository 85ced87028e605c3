//! Tests for the polling engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;

use super::engine::PollingEngine;
use super::test_fixtures::{
    FailingWriter, HangingFetcher, RecordingReporter, ScriptedFetcher, SeenChange, SharedBuffer,
    SteppingClock, entity, pair,
};
use super::{SessionConfig, SessionError};
use crate::changelog::ChangeLog;
use crate::entity::MonitoredEntity;
use crate::fetch::StateFetcher;
use crate::time::SystemClock;

type TestEngine<F> = PollingEngine<F, SystemClock, Arc<RecordingReporter>, SharedBuffer>;

fn engine_with<F: StateFetcher>(
    fetcher: F,
    config: &SessionConfig,
    buffer: &SharedBuffer,
) -> (TestEngine<F>, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let engine = PollingEngine::new(
        fetcher,
        SystemClock,
        Arc::clone(&reporter),
        config,
        buffer.log(),
    );
    (engine, reporter)
}

fn config(entities: Vec<MonitoredEntity>) -> SessionConfig {
    SessionConfig::new(entities, "memory.csv")
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn repeated_state_is_not_recorded_twice() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), Some("on"), Some("off")]);
        let buffer = SharedBuffer::default();
        let (mut engine, reporter) =
            engine_with(fetcher, &config(vec![entity("e1", "Lamp")]), &buffer);

        engine.baseline().await.unwrap();
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();

        assert_eq!(buffer.id_states(), vec![pair("e1", "on"), pair("e1", "off")]);
        assert_eq!(
            reporter.changes(),
            vec![SeenChange {
                id: "e1".to_string(),
                previous: Some("on".to_string()),
                current: "off".to_string(),
            }]
        );
        let report = engine.report();
        assert_eq!(report.baseline_records, 1);
        assert_eq!(report.changes_written, 1);
        assert_eq!(report.checks_performed, 3);
    }

    #[tokio::test]
    async fn first_successful_observation_after_failed_baseline_is_recorded() {
        let fetcher =
            ScriptedFetcher::new().script("e1", &[None, None, None, Some("50")]);
        let buffer = SharedBuffer::default();
        let (mut engine, reporter) =
            engine_with(fetcher, &config(vec![entity("e1", "Dimmer")]), &buffer);

        engine.baseline().await.unwrap();
        assert!(buffer.rows().is_empty());

        engine.tick().await.unwrap();
        engine.tick().await.unwrap();
        assert!(buffer.rows().is_empty());

        engine.tick().await.unwrap();
        assert_eq!(buffer.id_states(), vec![pair("e1", "50")]);
        assert_eq!(reporter.changes()[0].previous, None);
        assert_eq!(engine.report().baseline_records, 0);
        assert_eq!(engine.report().changes_written, 1);
    }
}

mod change_detection {
    use super::*;

    #[tokio::test]
    async fn outage_keeps_last_known_state() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), None, Some("on")]);
        let buffer = SharedBuffer::default();
        let (mut engine, _) = engine_with(fetcher, &config(vec![entity("e1", "Lamp")]), &buffer);

        engine.baseline().await.unwrap();
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();

        assert_eq!(buffer.id_states(), vec![pair("e1", "on")]);
    }

    #[tokio::test]
    async fn change_across_outage_reports_last_known_previous() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), None, Some("off")]);
        let buffer = SharedBuffer::default();
        let (mut engine, reporter) =
            engine_with(fetcher, &config(vec![entity("e1", "Lamp")]), &buffer);

        engine.baseline().await.unwrap();
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();

        assert_eq!(buffer.id_states(), vec![pair("e1", "on"), pair("e1", "off")]);
        assert_eq!(reporter.changes()[0].previous.as_deref(), Some("on"));
    }

    #[tokio::test]
    async fn records_follow_catalog_order_within_a_tick() {
        let fetcher = ScriptedFetcher::new()
            .script("c", &[Some("1"), Some("2")])
            .script("a", &[Some("1"), Some("2")])
            .script("b", &[Some("1"), Some("2")]);
        let entities = vec![entity("c", "C"), entity("a", "A"), entity("b", "B")];
        let buffer = SharedBuffer::default();
        let fetcher = Arc::new(fetcher);
        let (mut engine, _) = engine_with(Arc::clone(&fetcher), &config(entities), &buffer);

        engine.baseline().await.unwrap();
        engine.tick().await.unwrap();

        assert_eq!(
            buffer.id_states(),
            vec![
                pair("c", "1"),
                pair("a", "1"),
                pair("b", "1"),
                pair("c", "2"),
                pair("a", "2"),
                pair("b", "2"),
            ]
        );
        assert_eq!(fetcher.calls(), vec!["c", "a", "b", "c", "a", "b"]);
    }

    #[tokio::test]
    async fn rows_carry_entity_labels() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on")]);
        let buffer = SharedBuffer::default();
        let (mut engine, _) = engine_with(fetcher, &config(vec![entity("e1", "Lamp")]), &buffer);

        engine.baseline().await.unwrap();

        let row = &buffer.rows()[0];
        assert_eq!(row[1..], ["e1", "Lamp", "Switch", "Kitchen", "on"]);
    }

    #[tokio::test]
    async fn changes_never_exceed_checks_times_entities() {
        let flapping: Vec<Option<&str>> = (0..21)
            .map(|i| match i % 3 {
                0 => Some("a"),
                1 => Some("b"),
                _ => None,
            })
            .collect();
        let fetcher = ScriptedFetcher::new()
            .script("e1", &flapping)
            .script("e2", &flapping[1..]);
        let entities = vec![entity("e1", "One"), entity("e2", "Two")];
        let buffer = SharedBuffer::default();
        let (mut engine, _) = engine_with(fetcher, &config(entities), &buffer);

        engine.baseline().await.unwrap();
        for _ in 0..20 {
            engine.tick().await.unwrap();
        }

        let report = engine.report();
        assert!(report.changes_written > 0);
        assert!(report.changes_written <= report.checks_performed * 2);
        assert_eq!(
            buffer.rows().len() as u64,
            report.baseline_records + report.changes_written
        );
    }

    #[tokio::test]
    async fn baseline_precedes_changes_in_time() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), Some("off")]);
        let buffer = SharedBuffer::default();
        let reporter = Arc::new(RecordingReporter::default());
        let mut engine = PollingEngine::new(
            fetcher,
            SteppingClock::starting_at(1_700_000_000),
            Arc::clone(&reporter),
            &config(vec![entity("e1", "Lamp")]),
            buffer.log(),
        );

        engine.baseline().await.unwrap();
        engine.tick().await.unwrap();

        let rows = buffer.rows();
        let baseline = DateTime::<FixedOffset>::parse_from_rfc3339(&rows[0][0]).unwrap();
        let change = DateTime::<FixedOffset>::parse_from_rfc3339(&rows[1][0]).unwrap();
        assert!(baseline <= change);
    }
}

mod counters {
    use super::*;

    #[tokio::test]
    async fn checks_count_ticks_even_when_everything_is_unavailable() {
        let fetcher = ScriptedFetcher::new();
        let entities = vec![entity("e1", "One"), entity("e2", "Two")];
        let buffer = SharedBuffer::default();
        let (mut engine, reporter) = engine_with(fetcher, &config(entities), &buffer);

        engine.baseline().await.unwrap();
        for _ in 0..5 {
            engine.tick().await.unwrap();
        }

        let report = engine.report();
        assert_eq!(report.checks_performed, 5);
        assert_eq!(report.changes_written, 0);
        assert_eq!(reporter.baselines(), vec![(0, 2)]);
        assert!(buffer.rows().is_empty());
    }

    #[tokio::test]
    async fn progress_is_reported_every_nth_tick() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("0"), Some("1"), Some("2")]);
        let config = config(vec![entity("e1", "Counter")]).with_progress_every(2);
        let buffer = SharedBuffer::default();
        let (mut engine, reporter) = engine_with(fetcher, &config, &buffer);

        engine.baseline().await.unwrap();
        for _ in 0..5 {
            engine.tick().await.unwrap();
        }

        assert_eq!(reporter.progress(), vec![(2, 2), (4, 2)]);
    }

    #[tokio::test]
    async fn zero_progress_interval_disables_summaries() {
        let fetcher = ScriptedFetcher::new();
        let config = config(vec![entity("e1", "Lamp")]).with_progress_every(0);
        let buffer = SharedBuffer::default();
        let (mut engine, reporter) = engine_with(fetcher, &config, &buffer);

        for _ in 0..3 {
            engine.tick().await.unwrap();
        }

        assert!(reporter.progress().is_empty());
    }
}

mod timeouts {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_is_cut_off_and_skipped() {
        let fetcher = HangingFetcher {
            hanging_id: "e1".to_string(),
            inner: ScriptedFetcher::new().script("e2", &[Some("on"), Some("off")]),
        };
        let config = config(vec![entity("e1", "Stuck"), entity("e2", "Lamp")])
            .with_fetch_timeout(Duration::from_secs(2));
        let buffer = SharedBuffer::default();
        let (mut engine, _) = engine_with(fetcher, &config, &buffer);

        let started = tokio::time::Instant::now();
        engine.baseline().await.unwrap();
        engine.tick().await.unwrap();

        assert_eq!(buffer.id_states(), vec![pair("e2", "on"), pair("e2", "off")]);
        assert_eq!(engine.report().checks_performed, 1);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }
}

mod failures {
    use super::*;

    fn failing_engine(
        fetcher: ScriptedFetcher,
        entities: Vec<MonitoredEntity>,
        writes_left: usize,
    ) -> PollingEngine<ScriptedFetcher, SystemClock, Arc<RecordingReporter>, FailingWriter> {
        let log = ChangeLog::from_writer(FailingWriter { writes_left }, "full.csv", false).unwrap();
        PollingEngine::new(
            fetcher,
            SystemClock,
            Arc::new(RecordingReporter::default()),
            &config(entities),
            log,
        )
    }

    #[tokio::test]
    async fn write_failure_during_tick_is_surfaced_with_counters() {
        let fetcher = ScriptedFetcher::new()
            .script("e1", &[Some("on"), Some("off")])
            .script("e2", &[Some("1"), Some("2")]);
        let mut engine =
            failing_engine(fetcher, vec![entity("e1", "Lamp"), entity("e2", "Dimmer")], 3);

        engine.baseline().await.unwrap();
        let source = engine.tick().await.unwrap_err();
        let error = engine.abort(source);

        let SessionError::Persistence { report, .. } = error else {
            panic!("expected persistence error, got {error:?}");
        };
        assert_eq!(report.baseline_records, 2);
        assert_eq!(report.changes_written, 1);
        assert_eq!(report.checks_performed, 0);
    }

    #[tokio::test]
    async fn write_failure_ends_run() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), Some("off")]);
        let mut engine = failing_engine(fetcher, vec![entity("e1", "Lamp")], 1);
        engine.baseline().await.unwrap();
        let (_stop, stop_rx) = watch::channel(false);

        let result = engine.run(stop_rx).await;

        assert!(matches!(result, Err(SessionError::Persistence { .. })));
    }
}

mod stopping {
    use super::*;

    #[tokio::test]
    async fn stop_requested_before_first_tick_runs_no_ticks() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), Some("off")]);
        let buffer = SharedBuffer::default();
        let (mut engine, _) = engine_with(fetcher, &config(vec![entity("e1", "Lamp")]), &buffer);
        engine.baseline().await.unwrap();
        let (stop, stop_rx) = watch::channel(false);
        stop.send_replace(true);

        let report = engine.run(stop_rx).await.unwrap();

        assert_eq!(report.checks_performed, 0);
        assert_eq!(buffer.id_states(), vec![pair("e1", "on")]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_stops_after_current_tick() {
        let fetcher = ScriptedFetcher::new().script("e1", &[Some("on"), Some("off")]);
        let buffer = SharedBuffer::default();
        let (engine, _) = engine_with(fetcher, &config(vec![entity("e1", "Lamp")]), &buffer);
        let (stop, stop_rx) = watch::channel(false);
        drop(stop);

        let report = engine.run(stop_rx).await.unwrap();

        assert_eq!(report.checks_performed, 1);
        assert_eq!(buffer.id_states(), vec![pair("e1", "on")]);
    }
}
