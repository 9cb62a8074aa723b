mod common;

use std::sync::Arc;

use asio_client::asio::mock::{MockConfig, MockFailures, MockPlatform};
use asio_client::asio::{AsioError, SampleType};
use asio_client::{
  bound_slots, DeviceState, Error, OpenOptions, SampleFormat, Session, MAX_OPEN_DEVICES,
};
use serial_test::serial;

use common::{platform_with, recording_session, tag};

#[test]
#[serial]
fn init_and_shutdown_balance_activation() {
  let platform = platform_with(&[]);
  let (session, recorder) = recording_session(&platform);
  assert_eq!(platform.active_count(), 1);
  assert!(recorder.has_log("session initialised"));
  session.shutdown();
  assert_eq!(platform.active_count(), 0);
  assert!(recorder.has_log("session shut down"));
}

#[test]
#[serial]
fn failed_activation_is_reported() {
  let platform = Arc::new(MockPlatform::new().failing_activation());
  let logged = Arc::new(std::sync::Mutex::new(Vec::new()));
  let sink = logged.clone();
  let result = Session::init(platform.clone(), move |event, device| {
    if let asio_client::EventKind::Log(message) = event.kind {
      sink.lock().unwrap().push((device.is_none(), message.to_string()));
    }
  });
  assert!(matches!(result, Err(Error::PlatformInit(AsioError::Unavailable(_)))));
  let logged = logged.lock().unwrap();
  assert_eq!(logged.len(), 1);
  assert!(logged[0].0);
  assert!(logged[0].1.contains("platform activation failed"));
}

#[test]
#[serial]
fn enumerates_in_registration_order() {
  let platform = platform_with(&[
    ("Alpha", MockConfig::default()),
    ("Beta", MockConfig::default()),
  ]);
  let (session, _) = recording_session(&platform);
  let names: Vec<String> = session.enumerate_devices().into_iter().map(|d| d.name).collect();
  assert_eq!(names, ["Alpha", "Beta"]);
}

#[test]
#[serial]
fn empty_registry_enumerates_nothing() {
  let platform = platform_with(&[]);
  let (session, _) = recording_session(&platform);
  assert!(session.enumerate_devices().is_empty());
}

#[test]
#[serial]
fn open_reports_negotiated_properties() {
  let platform = platform_with(&[("Alpha", MockConfig::default())]);
  let (session, recorder) = recording_session(&platform);
  let ids = session.enumerate_devices();
  let id = &ids[0];
  let device = session.open_device(id, None).unwrap();

  let props = device.properties();
  assert_eq!(props.name, "Alpha");
  assert_eq!((props.num_inputs, props.num_outputs), (2, 2));
  assert_eq!(props.buffer_sample_length, 256);
  assert_eq!(props.buffer_byte_length, 1024);
  assert_eq!(props.sample_format, SampleFormat::Int32);
  assert_eq!(props.sample_type, Some(SampleType::Int32Lsb));
  assert_eq!(props.sample_rate, 48000.0);

  assert_eq!(device.slot(), 0);
  assert!(device.is_bound());
  assert_eq!(device.driver_version(), 1);
  assert_eq!(device.latencies(), (300, 400));
  assert!(device.supports_output_ready());
  assert_eq!(device.channels().len(), 4);
  assert_eq!(device.channels()[0].name, "In 1");
  assert_eq!(device.channels()[3].name, "Out 2");
  assert!(recorder.has_log("[Alpha] opened successfully (slot 0)"));
  assert!(recorder.has_log("[Alpha] latencies in/out: 300/400 samples"));
}

#[test]
#[serial]
fn byte_length_follows_the_sample_width() {
  let cases = [
    (SampleType::Float64Lsb, 2048, SampleFormat::Float64),
    (SampleType::Float32Lsb, 1024, SampleFormat::Float32),
    (SampleType::Int24Lsb, 768, SampleFormat::Unknown),
    (SampleType::Int16Msb, 512, SampleFormat::Unknown),
    (SampleType::DsdInt8Lsb1, 0, SampleFormat::Unknown),
  ];
  for (sample_type, bytes, format) in cases {
    let platform = platform_with(&[("Dev", MockConfig::default().with_sample_type(sample_type))]);
    let (session, _) = recording_session(&platform);
    let device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
    let props = device.properties();
    assert_eq!(props.buffer_byte_length, bytes, "{}", sample_type);
    assert_eq!(props.sample_format, format, "{}", sample_type);
  }
}

#[test]
#[serial]
fn open_options_shape_the_device() {
  let platform = platform_with(&[("Dev", MockConfig::default().with_channels(8, 8))]);
  let (session, _) = recording_session(&platform);
  let ids = session.enumerate_devices();
  let id = &ids[0];
  let options = OpenOptions::new().buffer_size(400).sample_rate(96000.0).channels(1, 2);
  let device = session.open_device_with(id, None, &options).unwrap();

  let props = device.properties();
  assert_eq!((props.num_inputs, props.num_outputs), (1, 2));
  assert_eq!(props.buffer_sample_length, 512);
  assert_eq!(props.sample_rate, 96000.0);
  assert_eq!(platform.driver("Dev").unwrap().buffer_size(), 512);
}

#[test]
#[serial]
fn unsupported_sample_rate_fails_the_open() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, _) = recording_session(&platform);
  let ids = session.enumerate_devices();
  let id = &ids[0];
  let result = session.open_device_with(id, None, &OpenOptions::new().sample_rate(22050.0));
  assert!(matches!(
    result,
    Err(Error::Driver {
      call: "setSampleRate",
      source: AsioError::NoClock
    })
  ));
  assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES]);
  assert!(platform.driver("Dev").unwrap().is_released());
}

#[test]
#[serial]
fn invalid_options_never_reach_the_driver() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, _) = recording_session(&platform);
  let ids = session.enumerate_devices();
  let id = &ids[0];
  let result = session.open_device_with(id, None, &OpenOptions::new().channels(100, 2));
  assert!(matches!(result, Err(Error::InvalidOption(_))));
  assert_eq!(platform.instance_count(), 0);
}

#[test]
#[serial]
fn start_and_stop_guard_their_state() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, recorder) = recording_session(&platform);
  let mut device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
  let driver = platform.driver("Dev").unwrap();

  assert_eq!(device.stop(), Err(Error::InvalidState(DeviceState::Stopped)));
  device.start().unwrap();
  assert!(driver.is_running());
  assert_eq!(device.start(), Err(Error::InvalidState(DeviceState::Started)));
  device.stop().unwrap();
  assert!(!driver.is_running());
  assert!(!device.is_started());
  assert!(recorder.has_log("[Dev] started"));
  assert!(recorder.has_log("[Dev] stopped"));
}

#[test]
#[serial]
fn driver_start_failure_leaves_device_stopped() {
  let fail = MockFailures {
    start: true,
    ..Default::default()
  };
  let platform = platform_with(&[("Dev", MockConfig::default().failing(fail))]);
  let (session, _) = recording_session(&platform);
  let mut device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
  assert!(matches!(device.start(), Err(Error::Driver { call: "start", .. })));
  assert!(!device.is_started());
}

#[test]
#[serial]
fn driver_stop_failure_leaves_device_started() {
  let fail = MockFailures {
    stop: true,
    ..Default::default()
  };
  let platform = platform_with(&[("Dev", MockConfig::default().failing(fail))]);
  let (session, recorder) = recording_session(&platform);
  let mut device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
  let driver = platform.driver("Dev").unwrap();
  device.start().unwrap();

  assert_eq!(
    device.stop(),
    Err(Error::Driver {
      call: "stop",
      source: AsioError::HwMalfunction
    })
  );
  assert!(device.is_started());
  assert!(driver.is_running());
  assert!(recorder.has_log("stop failed"));
  assert!(recorder.has_log("(Dev mock failure)"));

  // Teardown still disposes and releases even though stopping failed.
  assert!(matches!(device.close(), Err(Error::Driver { call: "stop", .. })));
  assert_eq!(driver.dispose_count(), 1);
  assert!(driver.is_released());
  assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES]);
}

#[test]
#[serial]
fn control_panel_failure_is_a_driver_error() {
  let fail = MockFailures {
    control_panel: true,
    ..Default::default()
  };
  let platform = platform_with(&[("Dev", MockConfig::default().failing(fail))]);
  let (session, recorder) = recording_session(&platform);
  let device = session.open_device(&session.enumerate_devices()[0], None).unwrap();

  assert_eq!(
    device.show_control_panel(),
    Err(Error::Driver {
      call: "controlPanel",
      source: AsioError::HwMalfunction
    })
  );
  assert_eq!(platform.driver("Dev").unwrap().control_panel_calls(), 0);
  assert!(recorder.has_log("failed to show control panel"));
  assert!(recorder.has_log("(Dev mock failure)"));
}

#[test]
#[serial]
fn set_sample_rate_failure_fails_the_open() {
  let fail = MockFailures {
    set_sample_rate: true,
    ..Default::default()
  };
  let platform = platform_with(&[("Dev", MockConfig::default().failing(fail))]);
  let (session, recorder) = recording_session(&platform);
  let ids = session.enumerate_devices();
  let result = session.open_device_with(&ids[0], None, &OpenOptions::new().sample_rate(96000.0));

  assert!(matches!(
    result,
    Err(Error::Driver {
      call: "setSampleRate",
      source: AsioError::HwMalfunction
    })
  ));
  assert!(recorder.has_log("sample rate 96000.00 rejected"));
  assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES]);
  assert!(platform.driver("Dev").unwrap().is_released());
}

#[test]
#[serial]
fn close_stops_disposes_and_releases() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, recorder) = recording_session(&platform);
  let mut device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
  let driver = platform.driver("Dev").unwrap();
  device.start().unwrap();
  device.close().unwrap();

  assert!(!driver.is_running());
  assert_eq!(driver.dispose_count(), 1);
  assert!(!driver.has_buffers());
  assert!(driver.is_released());
  assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES]);
  assert!(recorder.has_log("closing a started device"));
}

#[test]
#[serial]
fn dropping_a_device_closes_it() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, _) = recording_session(&platform);
  {
    let _device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
    assert!(bound_slots()[0]);
  }
  let driver = platform.driver("Dev").unwrap();
  assert_eq!(driver.dispose_count(), 1);
  assert!(driver.is_released());
  assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES]);
}

#[test]
#[serial]
fn capacity_exceeded_leaves_open_devices_untouched() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, recorder) = recording_session(&platform);
  let id = session.enumerate_devices()[0].clone();
  let devices: Vec<_> = (0..MAX_OPEN_DEVICES)
    .map(|_| session.open_device(&id, None).unwrap())
    .collect();
  let slots: Vec<usize> = devices.iter().map(|d| d.slot()).collect();
  assert_eq!(slots, (0..MAX_OPEN_DEVICES).collect::<Vec<_>>());

  let result = session.open_device(&id, None);
  assert!(matches!(result, Err(Error::CapacityExceeded(MAX_OPEN_DEVICES))));
  assert_eq!(platform.instance_count(), MAX_OPEN_DEVICES);
  assert_eq!(bound_slots(), [true; MAX_OPEN_DEVICES]);
  assert!(devices.iter().all(|d| d.is_bound()));
  assert!(recorder.has_log("device slots are in use"));
}

#[test]
#[serial]
fn every_open_failure_unwinds() {
  let failures = [
    MockFailures {
      init: true,
      ..Default::default()
    },
    MockFailures {
      channels: true,
      ..Default::default()
    },
    MockFailures {
      buffer_size: true,
      ..Default::default()
    },
    MockFailures {
      create_buffers: true,
      ..Default::default()
    },
    MockFailures {
      channel_info: true,
      ..Default::default()
    },
    MockFailures {
      latencies: true,
      ..Default::default()
    },
  ];
  for fail in failures {
    let platform = platform_with(&[("Dev", MockConfig::default().failing(fail.clone()))]);
    let (session, _) = recording_session(&platform);
    let result = session.open_device(&session.enumerate_devices()[0], None);
    let err = result.err().expect("open should fail");
    match err {
      Error::Init(_) => assert!(fail.init),
      Error::ChannelInfo(_) => assert!(fail.channels || fail.buffer_size || fail.channel_info),
      Error::BufferCreation(_) => assert!(fail.create_buffers),
      Error::LatencyQuery(_) => assert!(fail.latencies),
      other => panic!("unexpected error {:?}", other),
    }
    let driver = platform.driver("Dev").unwrap();
    assert!(driver.is_released(), "{:?}", fail);
    assert!(!driver.has_buffers(), "{:?}", fail);
    assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES], "{:?}", fail);
  }
}

#[test]
#[serial]
fn instantiation_failure_frees_the_slot() {
  let fail = MockFailures {
    instantiate: true,
    ..Default::default()
  };
  let platform = platform_with(&[
    ("Broken", MockConfig::default().failing(fail)),
    ("Good", MockConfig::default()),
  ]);
  let (session, recorder) = recording_session(&platform);
  let ids = session.enumerate_devices();
  assert!(matches!(session.open_device(&ids[0], None), Err(Error::Open(_))));
  assert!(recorder.has_log("failed to instantiate Broken"));
  let device = session.open_device(&ids[1], tag("good")).unwrap();
  assert_eq!(device.slot(), 0);
}

#[test]
#[serial]
fn control_panel_and_rate_refresh() {
  let platform = platform_with(&[("Dev", MockConfig::default())]);
  let (session, _) = recording_session(&platform);
  let device = session.open_device(&session.enumerate_devices()[0], None).unwrap();
  let driver = platform.driver("Dev").unwrap();

  device.show_control_panel().unwrap();
  assert_eq!(driver.control_panel_calls(), 1);

  driver.set_reported_sample_rate(44100.0);
  assert_eq!(device.properties().sample_rate, 48000.0);
  assert_eq!(device.refresh_sample_rate(), Ok(44100.0));
  assert_eq!(device.properties().sample_rate, 44100.0);
}
