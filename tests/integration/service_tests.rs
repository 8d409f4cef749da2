//! Integration tests for the DeviceService lifecycle: bring-up, link
//! upkeep, sampling and periodic reporting.
//!
//! These run on the host (x86_64) against the mocks in `mock_hw` and
//! drive time by hand through `ManualClock`.

use super::mock_hw::{
    MockCloud, MockNetwork, RecordingSink, ScriptedSensor, service, started, test_config,
};

use roomsense::app::events::AppEvent;
use roomsense::app::link::LinkState;
use roomsense::app::ports::{CloudPort, SessionState};
use roomsense::app::service::ReportOutcome;
use roomsense::app::state::Sample;
use roomsense::error::{CommsError, Error, SensorError};

const PERIOD: u64 = 10_000;

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn start_joins_network_then_cloud_and_subscribes() {
    let (svc, _clock, sink) = started(ScriptedSensor::steady(21.0, 40.0));

    let cloud = svc.cloud();
    assert_eq!(cloud.server, Some(("mqtts.heclouds.com".to_owned(), 1883)));
    assert_eq!(
        cloud.connect_calls,
        vec![(
            "room-01".to_owned(),
            "Xk2mQ9".to_owned(),
            "version=2018-10-31&sign=abc".to_owned()
        )]
    );
    assert_eq!(
        cloud.subscriptions,
        vec![
            "$sys/Xk2mQ9/room-01/thing/property/set".to_owned(),
            "$sys/Xk2mQ9/room-01/thing/property/post/reply".to_owned(),
        ]
    );
    assert_eq!(svc.network().begin_calls, vec![("HomeWiFi".to_owned(), "mysecret8".to_owned())]);
    assert_eq!(svc.link_state(), LinkState::Online);
    assert!(svc.report_timer().is_armed());
    assert_eq!(svc.sensor().driver().begin_calls, 1);

    assert!(sink.events.contains(&AppEvent::LinkChanged {
        from: LinkState::Offline,
        to: LinkState::Online
    }));
    assert!(sink.events.contains(&AppEvent::CloudConnected { subscribed: 2 }));
    assert_eq!(sink.events.last(), Some(&AppEvent::Started { report_interval_ms: 10_000 }));
}

#[test]
fn start_indicator_sequence() {
    let (svc, _clock, _sink) = started(ScriptedSensor::steady(21.0, 40.0));
    // init low, WiFi steady on, cloud confirmation blink.
    assert_eq!(svc.indicator().pin().writes, vec![false, true, true, false]);
    assert!(!svc.indicator().is_on());
    assert_eq!(svc.indicator().delay().total_ms(), 1_000);
}

#[test]
fn network_wait_blinks_once_per_attempt() {
    let clock = super::mock_hw::ManualClock::at(0);
    let mut sink = RecordingSink::default();
    let mut svc = service(
        ScriptedSensor::steady(21.0, 40.0),
        MockNetwork::up_after(3),
        MockCloud::new(),
    );
    svc.start(&clock, &mut sink);

    assert!(sink.events.contains(&AppEvent::NetworkUp {
        ip: Some(core::net::Ipv4Addr::new(192, 168, 1, 50)),
        attempts: 3
    }));
    // Three 1 s wait blinks plus the cloud confirmation blink.
    assert_eq!(svc.indicator().delay().total_ms(), 4_000);
}

#[test]
fn join_request_is_reissued_periodically() {
    let clock = super::mock_hw::ManualClock::at(0);
    let mut sink = RecordingSink::default();
    let mut svc = service(
        ScriptedSensor::steady(21.0, 40.0),
        MockNetwork::up_after(45),
        MockCloud::new(),
    );
    svc.start(&clock, &mut sink);

    assert_eq!(test_config().wifi_rejoin_attempts, 20);
    // Initial request, then after 20 and 40 attempts.
    assert_eq!(svc.network().begin_calls.len(), 3);
}

#[test]
fn failed_cloud_connect_is_retried_next_pass() {
    let clock = super::mock_hw::ManualClock::at(0);
    let mut sink = RecordingSink::default();
    let mut svc = service(
        ScriptedSensor::steady(21.0, 40.0),
        MockNetwork::up(),
        MockCloud::refusing(vec![SessionState::BadCredentials]),
    );
    svc.start(&clock, &mut sink);

    assert_eq!(svc.link_state(), LinkState::NetworkOnly);
    assert!(svc.cloud().subscriptions.is_empty());
    assert!(sink.events.contains(&AppEvent::CloudConnectFailed(SessionState::BadCredentials)));
    // No confirmation blink after a failed attempt.
    assert_eq!(svc.indicator().pin().writes, vec![false, true]);

    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().connect_calls.len(), 2);
    assert_eq!(svc.cloud().subscriptions.len(), 2);
    assert_eq!(svc.link_state(), LinkState::Online);
    assert!(sink.events.contains(&AppEvent::LinkChanged {
        from: LinkState::NetworkOnly,
        to: LinkState::Online
    }));
}

#[test]
fn connected_session_is_left_alone() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    for _ in 0..5 {
        svc.run_once(&clock, &mut sink);
    }
    assert_eq!(svc.cloud().connect_calls.len(), 1);
    assert_eq!(svc.network().begin_calls.len(), 1);
}

#[test]
fn reconnect_restores_subscriptions() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    svc.cloud_mut().drop_session();
    assert!(svc.cloud().subscriptions.is_empty());

    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().connect_calls.len(), 2);
    assert_eq!(svc.cloud().subscriptions.len(), 2);
}

#[test]
fn refused_subscriptions_leave_session_up() {
    let clock = super::mock_hw::ManualClock::at(0);
    let mut sink = RecordingSink::default();
    let mut cloud = MockCloud::new();
    cloud.fail_subscribe = true;
    let mut svc = service(ScriptedSensor::steady(21.0, 40.0), MockNetwork::up(), cloud);
    svc.start(&clock, &mut sink);

    assert!(svc.cloud().is_connected());
    assert!(svc.cloud().subscriptions.is_empty());
    assert_eq!(svc.link_state(), LinkState::Online);
    assert!(sink.events.contains(&AppEvent::CloudConnected { subscribed: 0 }));
    // Confirmation blink still happens once the connect itself succeeded.
    assert_eq!(svc.indicator().pin().writes, vec![false, true, true, false]);

    // The session is up, so the next pass neither reconnects nor stops
    // reporting.
    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().connect_calls.len(), 1);
    assert_eq!(svc.cloud().published.len(), 1);
}

#[test]
fn lost_wifi_blocks_until_rejoined() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    svc.network_mut().drop_link(2);

    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.network().begin_calls.len(), 2);
    assert_eq!(svc.link_state(), LinkState::Online);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::NetworkUp { attempts: 2, .. })),
        1
    );
}

// ── Sampling ──────────────────────────────────────────────────

#[test]
fn failed_reads_keep_last_good_sample() {
    let sensor = ScriptedSensor::scripted(vec![
        Ok((21.0, 40.0)),
        Err(SensorError::Timeout),
        Ok((f32::NAN, 50.0)),
        Ok((22.0, f32::NAN)),
        Err(SensorError::Checksum),
    ]);
    let (mut svc, clock, mut sink) = started(sensor);

    for _ in 0..5 {
        svc.run_once(&clock, &mut sink);
        assert_eq!(svc.sample(), Sample::new(21.0, 40.0));
    }

    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);
    let payload = svc.cloud().last_payload().unwrap();
    assert!(payload.contains(r#""CurrentTemperature":{"value":21.0}"#));
    assert!(payload.contains(r#""CurrentHumidity":{"value":40.0}"#));
}

#[test]
fn sample_starts_at_zero_before_first_good_read() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::scripted(vec![Err(SensorError::Timeout)]));
    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.sample(), Sample::default());
    assert!(svc.cloud().last_payload().unwrap().contains(r#""CurrentTemperature":{"value":0.0}"#));
}

#[test]
fn sensor_failures_are_counted_and_recovery_reported() {
    let sensor = ScriptedSensor::scripted(vec![
        Err(SensorError::Timeout),
        Err(SensorError::Timeout),
        Err(SensorError::Checksum),
        Ok((20.0, 45.0)),
    ]);
    let (mut svc, clock, mut sink) = started(sensor);
    for _ in 0..4 {
        svc.run_once(&clock, &mut sink);
    }

    let failures: Vec<u32> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SensorFailed { consecutive, .. } => Some(*consecutive),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![1, 2, 3]);
    assert!(sink.events.contains(&AppEvent::SensorRecovered { failures: 3 }));
    assert_eq!(svc.sample(), Sample::new(20.0, 45.0));
}

// ── Reporting ─────────────────────────────────────────────────

#[test]
fn nothing_is_reported_before_first_period() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    clock.advance(PERIOD - 1);
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().publish_attempts, 0);
}

#[test]
fn report_payload_matches_thing_model() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(23.45, 60.2));
    svc.handle_message(
        "$sys/Xk2mQ9/room-01/thing/property/set",
        br#"{"LED":{"value":true}}"#,
        &mut sink,
    );

    for _ in 0..8 {
        clock.advance(PERIOD);
        svc.run_once(&clock, &mut sink);
    }

    let (topic, payload) = svc.cloud().published.last().unwrap();
    assert_eq!(topic, "$sys/Xk2mQ9/room-01/thing/property/post");
    assert_eq!(
        payload,
        r#"{"id":"7","version":"1.0","params":{"CurrentTemperature":{"value":23.4},"CurrentHumidity":{"value":60.2},"LED":{"value":true}}}"#
    );
}

#[test]
fn ids_advance_once_per_attempt_from_zero() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));

    svc.cloud_mut().fail_publish = true;
    for _ in 0..3 {
        clock.advance(PERIOD);
        svc.run_once(&clock, &mut sink);
    }
    svc.cloud_mut().fail_publish = false;
    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);

    let failed: Vec<u32> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::ReportFailed { id, error } => {
                assert_eq!(*error, Error::Comms(CommsError::PublishFailed));
                Some(*id)
            }
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![0, 1, 2]);
    assert!(svc.cloud().last_payload().unwrap().starts_with(r#"{"id":"3","#));
    assert_eq!(svc.state().message_id, 4);
    assert_eq!(svc.cloud().publish_attempts, 4);
}

#[test]
fn successful_report_blinks_failed_one_does_not() {
    let (mut svc, _clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    let before = svc.indicator().pin().writes.len();

    svc.cloud_mut().fail_publish = true;
    assert_eq!(svc.report(&mut sink), ReportOutcome::Failed(0, Error::Comms(CommsError::PublishFailed)));
    assert_eq!(svc.indicator().pin().writes.len(), before);

    svc.cloud_mut().fail_publish = false;
    assert_eq!(svc.report(&mut sink), ReportOutcome::Published(1));
    assert_eq!(&svc.indicator().pin().writes[before..], &[true, false]);
}

#[test]
fn report_blink_restores_lit_indicator() {
    let (mut svc, _clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    svc.handle_message(
        "$sys/Xk2mQ9/room-01/thing/property/set",
        br#"{"LED":{"value":true}}"#,
        &mut sink,
    );
    let before = svc.indicator().pin().writes.len();
    svc.report(&mut sink);
    assert_eq!(&svc.indicator().pin().writes[before..], &[true, false, true]);
    assert!(svc.indicator().is_lit());
}

#[test]
fn disconnected_tick_is_dropped_without_consuming_id() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    svc.cloud_mut().drop_session();
    svc.cloud_mut()
        .connect_script
        .push_back(Err(SessionState::Unavailable));

    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);

    assert!(!svc.cloud().is_connected());
    assert_eq!(svc.cloud().publish_attempts, 0);
    assert_eq!(svc.state().message_id, 0);
    assert_eq!(svc.link_state(), LinkState::NetworkOnly);

    // The dropped tick is not replayed once the session is back.
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().publish_attempts, 0);
    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().publish_attempts, 1);
    assert!(svc.cloud().last_payload().unwrap().starts_with(r#"{"id":"0","#));
}

#[test]
fn direct_report_while_disconnected_is_skipped() {
    let (mut svc, _clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    svc.cloud_mut().drop_session();
    assert_eq!(svc.report(&mut sink), ReportOutcome::Skipped);
    assert_eq!(svc.state().message_id, 0);
}

#[test]
fn late_loop_reports_once() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(21.0, 40.0));
    clock.advance(PERIOD * 3 + PERIOD / 2);
    svc.run_once(&clock, &mut sink);
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().publish_attempts, 1);

    clock.advance(PERIOD / 2);
    svc.run_once(&clock, &mut sink);
    assert_eq!(svc.cloud().publish_attempts, 2);
}

#[test]
fn reported_event_carries_sample_and_led() {
    let (mut svc, clock, mut sink) = started(ScriptedSensor::steady(19.5, 33.0));
    clock.advance(PERIOD);
    svc.run_once(&clock, &mut sink);
    assert!(sink.events.contains(&AppEvent::Reported {
        id: 0,
        sample: Sample::new(19.5, 33.0),
        led_on: false
    }));
}
