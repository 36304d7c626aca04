//! End-to-end sessions through the timing engine.

use chrono::TimeDelta;
use contracts::session_time::from_secs_f64;
use contracts::{
    ChannelSource, DriverId, EngineConfig, IntegrityReason, LapRecord, SessionTime,
    SessionTiming,
};
use ingestion::PageKind;
use observability::EngineMetricsAggregator;
use serde_json::json;
use timing_engine::{SessionPages, TimeReconciler, TimingEngine};

use crate::fixtures::{
    car_page, driver_events, lap_ends, position_page, render, two_driver_race, DriverPlan,
};

fn t(secs: f64) -> SessionTime {
    from_secs_f64(secs)
}

fn timing_only() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.telemetry.enabled = false;
    config.telemetry.required = false;
    config
}

fn race_pages() -> SessionPages {
    let (_, events) = two_driver_race();
    SessionPages::new()
        .with(PageKind::TimingData, render(events))
        .with(PageKind::CarData, car_page())
        .with(PageKind::Position, position_page())
        .with(
            PageKind::TimingAppData,
            render(vec![(
                1.0,
                json!({"Lines": {"1": {"Stints": [{"Compound": "SOFT", "New": "true", "TotalLaps": 0}]}}}),
            )]),
        )
        .with(
            PageKind::TrackStatus,
            render(vec![
                (0.5, json!({"Status": "1", "Message": "AllClear"})),
                (150.0, json!({"Status": "2", "Message": "Yellow"})),
            ]),
        )
        .with(
            PageKind::SessionStatus,
            render(vec![(0.0, json!({"Status": "Started"}))]),
        )
        .with(
            PageKind::LapCount,
            render(vec![(0.0, json!({"TotalLaps": 3, "CurrentLap": 1}))]),
        )
        .with(
            PageKind::WeatherData,
            render(vec![(60.0, json!({"AirTemp": "24.1", "TrackTemp": "38.0", "Rainfall": "0"}))]),
        )
        .with(
            PageKind::DriverList,
            render(vec![
                (0.0, json!({"1": {"RacingNumber": "1", "Tla": "VER", "Line": 1}, "44": {"RacingNumber": "44", "Tla": "HAM", "Line": 2}})),
                (91.0, json!({"44": {"TeamName": "Mercedes"}})),
            ]),
        )
        .with(
            PageKind::SessionInfo,
            render(vec![(
                0.0,
                json!({"Name": "Race", "StartDate": "2024-03-02T18:00:00", "EndDate": "2024-03-02T20:00:00", "GmtOffset": "03:00:00"}),
            )]),
        )
        .with(
            PageKind::RaceControlMessages,
            render(vec![(
                199.0,
                json!({"Messages": [{"Utc": "2024-03-02T15:03:19", "Category": "Other", "Message": "CAR 1 TIME 1:29.000 DELETED", "RacingNumber": "1", "Lap": 2}]}),
            )]),
        )
}

fn ends(session: &SessionTiming, driver: &str) -> Vec<SessionTime> {
    session
        .laps_for(driver)
        .filter_map(|lap| lap.end_time)
        .collect()
}

fn assert_timing_invariants(session: &SessionTiming) {
    for lap in &session.laps {
        if let (Some(sum), Some(lap_time)) = (lap.sector_sum(), lap.lap_time) {
            assert!(sum <= lap_time, "sector sum exceeds lap time: {lap:?}");
        }
    }
    for driver in session.report.alignment.shifts.iter().map(|s| &s.driver) {
        let ends = ends(session, driver);
        assert!(ends.windows(2).all(|w| w[0] <= w[1]), "{driver}: {ends:?}");
    }
}

#[test]
fn test_two_driver_race_end_to_end() {
    let session = TimingEngine::default().run(&race_pages()).unwrap();
    let report = &session.report;

    assert_eq!(report.drivers, 2);
    assert!(report.integrity_errors.is_empty());
    assert_eq!(report.stale_updates, 0);
    assert_eq!(report.decode.len(), PageKind::ALL.len());
    assert_eq!(report.decode_errors(), 0);

    let leader: Vec<&LapRecord> = session.laps_for("1").collect();
    assert_eq!(leader.len(), 3);
    assert_eq!(
        leader.iter().map(|l| l.lap_number).collect::<Vec<_>>(),
        vec![Some(1), Some(2), Some(3)]
    );
    assert_eq!(
        leader.iter().map(|l| l.lap_time).collect::<Vec<_>>(),
        vec![Some(t(90.0)), Some(t(89.0)), Some(t(91.0))]
    );
    assert_eq!(leader[1].sector_1_session_time, Some(t(119.5)));
    assert_eq!(leader[2].speed_st, Some(305.0));

    // lap 2 was deleted: only lap 1 stands as personal best
    assert_eq!(
        leader.iter().map(|l| l.is_personal_best).collect::<Vec<_>>(),
        vec![true, false, false]
    );
    let chaser: Vec<&LapRecord> = session.laps_for("44").collect();
    assert_eq!(chaser.len(), 3);
    assert!(chaser[1].is_personal_best);
    assert!(!chaser[2].is_personal_best);

    assert_eq!(session.session_splits, vec![SessionTime::zero()]);
    assert_timing_invariants(&session);
}

#[test]
fn test_alignment_matches_published_gap() {
    let session = TimingEngine::default().run(&race_pages()).unwrap();
    let alignment = &session.report.alignment;

    assert!(alignment.applied);
    assert_eq!(alignment.lap_index, Some(0));
    assert_eq!(alignment.leader.as_deref(), Some("1"));
    assert!(alignment.shifts.iter().all(|s| s.shift <= TimeDelta::zero()));

    let chaser = alignment
        .shifts
        .iter()
        .find(|s| s.driver == "44")
        .unwrap();
    assert_eq!(chaser.shift, TimeDelta::milliseconds(-300));

    assert_eq!(ends(&session, "1"), vec![t(90.0), t(179.0), t(270.0)]);
    assert_eq!(ends(&session, "44"), vec![t(91.2), t(180.2), t(271.2)]);
}

#[test]
fn test_alignment_never_moves_time_forward() {
    // "44" published 2.0 s behind but observed only 1.5 s behind: the
    // leader has to move back instead of "44" moving forward
    let plans = vec![
        DriverPlan {
            number: "1",
            lag: 0.0,
            laps: vec![[30.0, 30.0, 30.0]; 3],
            gap: |k| format!("LAP {}", k + 1),
            position: 1,
        },
        DriverPlan {
            number: "44",
            lag: 1.5,
            laps: vec![[30.0, 30.0, 30.0]; 3],
            gap: |_| "+2.000".to_string(),
            position: 2,
        },
    ];
    let pages = SessionPages::new().with(
        PageKind::TimingData,
        render(plans.iter().flat_map(driver_events).collect()),
    );

    let mut unaligned_config = timing_only();
    unaligned_config.alignment.enabled = false;
    let unaligned = TimingEngine::new(unaligned_config).run(&pages).unwrap();
    let aligned = TimingEngine::new(timing_only()).run(&pages).unwrap();

    assert!(aligned.report.alignment.applied);
    for (before, after) in unaligned.laps.iter().zip(&aligned.laps) {
        assert!(after.end_time <= before.end_time);
    }
    assert_eq!(ends(&aligned, "1")[0], t(89.5));
    assert_eq!(ends(&aligned, "44")[0], t(91.5));
    assert_eq!(
        unaligned.report.alignment.skipped_reason.as_deref(),
        Some("disabled")
    );
}

#[test]
fn test_stale_replay_matches_log_without_it() {
    let plan = DriverPlan {
        number: "16",
        lag: 0.0,
        laps: vec![[30.0, 30.0, 30.0]; 3],
        gap: |k| format!("LAP {}", k + 1),
        position: 1,
    };
    let mut clean = driver_events(&plan);
    // the feed resends lap 2's counter once it is back in sync
    clean.push((185.5, json!({"Lines": {"16": {"NumberOfLaps": 2}}})));
    let mut replayed = clean.clone();
    replayed.push((
        185.0,
        json!({"Lines": {"16": {"NumberOfLaps": 1, "LastLapTime": {"Value": "1:45.000"}, "Sectors": {"0": {"Value": "40.000"}}}}}),
    ));

    let engine = TimingEngine::new(timing_only());
    let clean = engine
        .run(&SessionPages::new().with(PageKind::TimingData, render(clean)))
        .unwrap();
    let replayed = engine
        .run(&SessionPages::new().with(PageKind::TimingData, render(replayed)))
        .unwrap();

    assert_eq!(replayed.report.stale_updates, 1);
    assert_eq!(clean.report.stale_updates, 0);
    assert_eq!(replayed.laps, clean.laps);
    assert_eq!(clean.laps.len(), 3);
}

#[test]
fn test_reconciler_is_a_fixed_point() {
    let mut config = timing_only();
    config.alignment.enabled = false;
    let (_, events) = two_driver_race();
    let session = TimingEngine::new(config)
        .run(&SessionPages::new().with(PageKind::TimingData, render(events)))
        .unwrap();

    for driver in ["1", "44"] {
        let reconciled: Vec<LapRecord> = session.laps_for(driver).cloned().collect();
        let mut again = reconciled.clone();
        let errors = TimeReconciler::new(&reconciled[0].driver).reconcile(&mut again);
        assert!(errors.is_empty());
        assert_eq!(again, reconciled);
    }
}

#[test]
fn test_telemetry_padding_and_brake_check() {
    let session = TimingEngine::default().run(&race_pages()).unwrap();
    let report = &session.report;

    let short = &session.car["44"];
    assert_eq!(short.source, ChannelSource::Car);
    assert_eq!(short.frames.len(), 5);
    let synthetic: Vec<_> = short.frames.iter().filter(|f| f.time.is_none()).collect();
    assert_eq!(synthetic.len(), 2);
    assert!(synthetic.iter().all(|f| f.rpm == 0 && !f.brake));
    assert!(short.frames.windows(2).all(|w| w[0].date <= w[1].date));

    assert_eq!(session.car["1"].frames.len(), 5);
    assert_eq!(session.car["1"].frames[4].rpm, 11004);
    assert_eq!(session.position["44"].frames.len(), 3);
    assert_eq!(session.position["1"].frames[2].x, 200);

    assert_eq!(report.incomplete_channels.len(), 1);
    assert_eq!(report.incomplete_channels[0].driver, "44");
    assert_eq!(report.incomplete_channels[0].padded_rows, 2);
    assert_eq!(report.non_boolean_brake, vec![DriverId::from("44")]);
}

#[test]
fn test_auxiliary_feeds_collected() {
    let session = TimingEngine::default().run(&race_pages()).unwrap();
    let feeds = &session.feeds;

    assert_eq!(feeds.stints.len(), 1);
    assert_eq!(feeds.stints[0].compound.as_deref(), Some("SOFT"));
    assert_eq!(feeds.track_status.len(), 2);
    assert_eq!(feeds.track_status[1].message, "Yellow");
    assert_eq!(feeds.session_status[0].status, "Started");
    assert_eq!(feeds.lap_count[0].total_laps, Some(3));
    assert_eq!(feeds.weather.len(), 1);
    assert!(!feeds.weather[0].rainfall);
    assert_eq!(feeds.race_control[0].lap, Some(2));

    assert_eq!(feeds.drivers.len(), 2);
    assert_eq!(feeds.drivers[1].tla.as_deref(), Some("HAM"));
    assert_eq!(feeds.drivers[1].team_name.as_deref(), Some("Mercedes"));
    let info = feeds.session_info.as_ref().unwrap();
    assert_eq!(info.name.as_deref(), Some("Race"));
    assert_eq!(info.gmt_offset, Some(TimeDelta::hours(3)));
}

#[test]
fn test_required_telemetry_missing_is_fatal() {
    let (_, events) = two_driver_race();
    let pages = SessionPages::new().with(PageKind::TimingData, render(events));

    let err = TimingEngine::default().run(&pages).unwrap_err();
    assert!(err.is_page_unavailable());

    let session = TimingEngine::new(timing_only()).run(&pages).unwrap();
    assert!(session.car.is_empty());
    assert_eq!(session.laps.len(), 6);
}

#[test]
fn test_sequential_matches_parallel() {
    let mut sequential = EngineConfig::default();
    sequential.runtime.parallel = false;
    let mut pooled = EngineConfig::default();
    pooled.runtime.worker_threads = 2;

    let pages = race_pages();
    let a = TimingEngine::new(sequential).run(&pages).unwrap();
    let b = TimingEngine::new(pooled).run(&pages).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_single_lap_scenarios() {
    let scenario = |reported: &str| {
        let pages = SessionPages::new().with(
            PageKind::TimingData,
            render(vec![
                (0.0, json!({"Lines": {"44": {"InPit": false}}})),
                (30.0, json!({"Lines": {"44": {"Sectors": {"0": {"Value": "30.000"}}}}})),
                (60.0, json!({"Lines": {"44": {"Sectors": {"1": {"Value": "30.000"}}}}})),
                (90.1, json!({"Lines": {"44": {"Sectors": {"2": {"Value": "30.100"}}, "LastLapTime": {"Value": reported}}}})),
                (90.2, json!({"Lines": {"44": {"NumberOfLaps": 1}}})),
            ]),
        );
        TimingEngine::new(timing_only()).run(&pages).unwrap()
    };

    let clean = scenario("1:30.100");
    assert_eq!(clean.laps.len(), 1);
    assert_eq!(clean.laps[0].lap_number, Some(1));
    assert_eq!(clean.laps[0].lap_time, Some(t(90.1)));
    assert!(clean.report.integrity_errors.is_empty());

    let short = scenario("1:30.050");
    assert_eq!(short.laps.len(), 1);
    assert_eq!(short.laps[0].lap_time, None);
    assert_eq!(
        short
            .report
            .integrity_count(IntegrityReason::SectorSumExceedsLapTime),
        1
    );
}

#[tokio::test]
async fn test_engine_on_blocking_pool_feeds_metrics() {
    let pages = race_pages();
    let engine = TimingEngine::default();
    let session = tokio::task::spawn_blocking(move || engine.run(&pages))
        .await
        .unwrap()
        .unwrap();

    let mut aggregator = EngineMetricsAggregator::new();
    aggregator.update(&session);
    aggregator.update(&session);
    let summary = aggregator.summary();

    assert_eq!(summary.sessions, 2);
    assert_eq!(summary.laps, 12);
    assert_eq!(summary.sessions_aligned, 2);
    assert_eq!(summary.padded_channels, 2);
    assert_eq!(summary.alignment_shift_ms.count, 4);
    assert!((summary.alignment_shift_ms.max - 300.0).abs() < 1e-6);
}

#[test]
fn test_lap_ends_helper() {
    let (plans, _) = two_driver_race();
    assert_eq!(lap_ends(&plans[0]), vec![90.0, 179.0, 270.0]);
    assert_eq!(lap_ends(&plans[1]), vec![91.5, 180.5, 271.5]);
}
