use std::sync::Arc;

use bytes::Bytes;
use pcanport_filter::FilterSpec;
use pcanport_frame::Frame;
use pcanport_native::{ChannelHandle, DriverCall, StatusCode, VirtualBus};
use pcanport_port::{
    CloseReason, ConfigError, ErrorKind, LifecycleError, Port, PortConfig, PortError, PortEvent,
    PortEvents, PortState,
};

const CH1: ChannelHandle = ChannelHandle::USBBUS1;

fn setup(config: PortConfig) -> (Arc<VirtualBus>, Port<VirtualBus>, PortEvents) {
    let bus = Arc::new(VirtualBus::new(2));
    let port = Port::new(Arc::clone(&bus), config).expect("config should be valid");
    let events = port.take_events().expect("events should be available once");
    (bus, port, events)
}

fn lifecycle_error(err: PortError) -> LifecycleError {
    match err {
        PortError::Lifecycle(err) => err,
        other => panic!("expected lifecycle error, got {other}"),
    }
}

#[test]
fn write_before_open_is_rejected() {
    let (bus, port, mut events) = setup(PortConfig::default());

    let err = port
        .write(&Frame::standard(0x100, Bytes::new()))
        .expect_err("write before open should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::NotOpen);
    assert!(bus.calls().is_empty());

    match events.try_recv() {
        Some(PortEvent::Error(info)) => assert_eq!(info.kind, ErrorKind::Lifecycle),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[test]
fn close_before_open_is_rejected() {
    let (bus, port, _events) = setup(PortConfig::default());
    let err = port.close().expect_err("close before open should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::NotOpen);
    assert!(bus.calls().is_empty());
    assert_eq!(port.state(), PortState::Closed);
}

#[test]
fn write_after_close_is_rejected() {
    let (_bus, port, _events) = setup(PortConfig::default());
    port.open(CH1).expect("open should succeed");
    port.close().expect("close should succeed");

    let err = port
        .write(&Frame::standard(0x100, Bytes::new()))
        .expect_err("write after close should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::NotOpen);

    let err = port.close().expect_err("second close should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::NotOpen);
}

#[test]
fn closed_port_cannot_reopen() {
    let (_bus, port, _events) = setup(PortConfig::default());
    port.open(CH1).expect("open should succeed");
    port.close().expect("close should succeed");

    let err = port.open(CH1).expect_err("reopen should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::Retired);
}

#[test]
fn double_open_is_rejected() {
    let (bus, port, _events) = setup(PortConfig::default());
    port.open(CH1).expect("open should succeed");
    bus.clear_calls();

    let err = port
        .open(ChannelHandle(0x52))
        .expect_err("second open should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::AlreadyOpen);
    assert!(bus.calls().is_empty());
    assert_eq!(port.channel(), Some(CH1));
}

#[test]
fn open_and_close_report_events_and_end_stream() {
    let (bus, port, mut events) = setup(PortConfig::default());
    assert!(!port.is_open());

    port.open(CH1).expect("open should succeed");
    assert!(port.is_open());
    assert!(port.is_connected());
    assert!(bus.has_event(CH1));

    bus.clear_calls();
    port.close().expect("close should succeed");
    assert_eq!(
        bus.calls(),
        vec![
            DriverCall::DisableEvent(CH1),
            DriverCall::Reset(CH1),
            DriverCall::Uninitialize(CH1),
        ]
    );
    assert!(!bus.is_initialized(CH1));
    assert_eq!(port.channel(), None);

    assert_eq!(events.blocking_recv(), Some(PortEvent::Open));
    assert_eq!(
        events.blocking_recv(),
        Some(PortEvent::Close(CloseReason::Requested))
    );
    assert_eq!(events.blocking_recv(), None);
    assert!(events.is_finished());
}

#[test]
fn initialize_failure_faults_without_arming() {
    let (bus, port, mut events) = setup(PortConfig::default());
    bus.fail_next("initialize", StatusCode::HWINUSE);

    let err = port.open(CH1).expect_err("open should fail");
    assert!(matches!(err, PortError::Driver(_)));
    assert_eq!(port.state(), PortState::Faulted);
    assert!(!bus.has_event(CH1));
    assert!(!bus
        .calls()
        .iter()
        .any(|call| matches!(call, DriverCall::EnableEvent(_))));

    let err = port
        .write(&Frame::standard(0x1, Bytes::new()))
        .expect_err("write on faulted port should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::Faulted);

    let err = port.open(CH1).expect_err("open on faulted port should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::Faulted);

    let drained = events.drain();
    assert!(!drained.contains(&PortEvent::Open));
    assert!(matches!(drained[0], PortEvent::Error(ref info) if info.kind == ErrorKind::Hardware));

    bus.clear_calls();
    port.close().expect("close of faulted port should succeed");
    assert!(bus.calls().is_empty());
    assert_eq!(port.state(), PortState::Closed);
}

#[test]
fn filter_programming_failure_releases_channel_on_close() {
    let config = PortConfig::default().with_filter(FilterSpec::id("0 7FF", false));
    let (bus, port, _events) = setup(config);
    bus.fail_next("filter_messages", StatusCode::ILLPARAMVAL);

    let err = port.open(CH1).expect_err("open should fail");
    assert!(matches!(err, PortError::Driver(_)));
    assert_eq!(port.state(), PortState::Faulted);
    assert!(bus.is_initialized(CH1));

    port.close().expect("close should succeed");
    assert!(!bus.is_initialized(CH1));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let bus = Arc::new(VirtualBus::new(1));

    let mixed = PortConfig::default()
        .with_filter(FilterSpec::id("0 7FF", false))
        .with_filter(FilterSpec::id("0 1FFFFFFF", true));
    let err = Port::new(Arc::clone(&bus), mixed).expect_err("mixed filters should fail");
    assert!(matches!(err, PortError::Config(ConfigError::Filter(_))));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let rate = PortConfig::default().with_can_rate(42);
    let err = Port::new(Arc::clone(&bus), rate).expect_err("bad rate should fail");
    assert!(matches!(
        err,
        PortError::Config(ConfigError::UnsupportedRate(42))
    ));

    assert!(bus.calls().is_empty());
}

#[test]
fn set_config_only_before_open() {
    let (_bus, mut port, _events) = setup(PortConfig::default());
    port.set_config(PortConfig::default().with_loopback(true))
        .expect("set_config before open should succeed");
    assert!(port.config().loopback);

    port.open(CH1).expect("open should succeed");
    let err = port
        .set_config(PortConfig::default())
        .expect_err("set_config while open should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::AlreadyOpen);
}

#[test]
fn teardown_failure_still_closes() {
    let (bus, port, mut events) = setup(PortConfig::default());
    port.open(CH1).expect("open should succeed");
    bus.fail_next("reset", StatusCode::ILLOPERATION);

    let err = port.close().expect_err("close should report reset failure");
    assert!(matches!(err, PortError::Driver(_)));
    assert_eq!(port.state(), PortState::Closed);
    assert!(!bus.is_initialized(CH1));
    assert!(events
        .drain()
        .contains(&PortEvent::Close(CloseReason::Requested)));
}

#[test]
fn dropping_open_port_releases_channel() {
    let (bus, port, mut events) = setup(PortConfig::default());
    port.open(CH1).expect("open should succeed");
    drop(port);

    assert!(!bus.is_initialized(CH1));
    assert!(!bus.has_event(CH1));
    let drained = events.drain();
    assert_eq!(
        drained.last(),
        Some(&PortEvent::Close(CloseReason::Dropped))
    );
    assert!(events.is_finished());
}

#[test]
fn list_reports_channel_paths() {
    let (_bus, port, _events) = setup(PortConfig::default());
    let ports = port.list().expect("list should succeed");
    let paths: Vec<ChannelHandle> = ports.iter().map(|p| p.path).collect();
    assert_eq!(paths, vec![ChannelHandle(0x51), ChannelHandle(0x52)]);
    assert_eq!(ports[0].info.channel_handle, ports[0].path);
    assert_eq!(ports[0].info.device_type, 5);
}

#[test]
fn status_requires_open_port() {
    let (bus, port, _events) = setup(PortConfig::default());
    let err = port.status().expect_err("status before open should fail");
    assert_eq!(lifecycle_error(err), LifecycleError::NotOpen);

    port.open(CH1).expect("open should succeed");
    let snapshot = port.status().expect("status should succeed");
    assert_eq!(snapshot.code, StatusCode::OK);
    assert_eq!(snapshot.text, "Bus OK");

    bus.set_status(CH1, StatusCode::BUSOFF);
    let snapshot = port.status().expect("status should succeed");
    assert!(snapshot.is_error);
}
