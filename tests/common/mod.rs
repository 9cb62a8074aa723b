#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use asio_client::asio::mock::{MockConfig, MockPlatform};
use asio_client::{DeviceContext, Event, EventKind, Session, TimeInfo};

/// One buffer switch as the callback saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct Switch {
  pub slot: usize,
  pub tag: Option<String>,
  pub half: usize,
  pub direct_process: bool,
  pub time: TimeInfo,
  pub byte_length: usize,
}

/// Everything a session's callback received.
#[derive(Default)]
pub struct Recorder {
  pub logs: Mutex<Vec<(Option<usize>, String)>>,
  pub switches: Mutex<Vec<Switch>>,
  pub rates: Mutex<Vec<(usize, f64)>>,
}

impl Recorder {
  pub fn logs(&self) -> Vec<String> {
    self.logs.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
  }

  pub fn switches(&self) -> Vec<Switch> {
    self.switches.lock().unwrap().clone()
  }

  pub fn has_log(&self, needle: &str) -> bool {
    self.logs().iter().any(|m| m.contains(needle))
  }
}

pub fn platform_with(devices: &[(&str, MockConfig)]) -> Arc<MockPlatform> {
  let platform = devices
    .iter()
    .fold(MockPlatform::new(), |p, (name, config)| p.with_device(name, config.clone()));
  Arc::new(platform)
}

/// A session whose callback records every event and marks buffer switches handled.
pub fn recording_session(platform: &Arc<MockPlatform>) -> (Session, Arc<Recorder>) {
  let recorder = Arc::new(Recorder::default());
  let sink = recorder.clone();
  let session = Session::init(
    platform.clone(),
    move |event: &mut Event<'_>, device: Option<&DeviceContext>| match &event.kind {
      EventKind::Log(message) => {
        sink
          .logs
          .lock()
          .unwrap()
          .push((device.map(|d| d.slot()), message.to_string()));
      }
      EventKind::SampleRateChanged(rate) => {
        if let Some(device) = device {
          sink.rates.lock().unwrap().push((device.slot(), *rate));
        }
      }
      EventKind::BufferSwitch(switch) => {
        let device = device.expect("buffer switches always carry their device");
        sink.switches.lock().unwrap().push(Switch {
          slot: device.slot(),
          tag: device.user_data_as::<String>().cloned(),
          half: switch.half,
          direct_process: switch.direct_process,
          time: switch.time,
          byte_length: switch.byte_length(),
        });
        event.handled = true;
      }
    },
  )
  .unwrap();
  (session, recorder)
}

pub fn tag(name: &str) -> Option<asio_client::UserData> {
  Some(Arc::new(name.to_string()))
}
