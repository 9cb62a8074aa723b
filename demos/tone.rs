//! Plays a sine tone on every installed ASIO device for a few seconds, each a fifth above the
//! previous one.
//!
//! Run with `RUST_LOG=info` to see the driver conversation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use asio_client::{DeviceContext, Event, EventKind, Session, ToneRenderer};
use log::{error, info};

const PLAY_TIME: Duration = Duration::from_secs(5);

fn main() {
  env_logger::init();

  let session = match Session::system(on_event) {
    Ok(session) => session,
    Err(err) => {
      error!("{}", err);
      return;
    }
  };

  let mut devices = Vec::new();
  for (index, id) in session.enumerate_devices().iter().enumerate() {
    let tone = Arc::new(ToneRenderer::new(220.0 * 1.5f64.powi(index as i32), 0.5));
    match session.open_device(id, Some(tone)) {
      Ok(device) => {
        let props = device.properties();
        info!(
          "{}: {} in / {} out, {} samples of {} at {:.0} Hz",
          props.name,
          props.num_inputs,
          props.num_outputs,
          props.buffer_sample_length,
          props.sample_format,
          props.sample_rate
        );
        devices.push(device);
      }
      Err(err) => error!("skipping {}: {}", id.name, err),
    }
  }

  for device in devices.iter_mut() {
    if let Err(err) = device.start() {
      error!("{}: {}", device.name(), err);
    }
  }
  thread::sleep(PLAY_TIME);
  for device in devices {
    let name = device.name().to_string();
    if let Err(err) = device.close() {
      error!("{}: {}", name, err);
    }
  }
  session.shutdown();
}

fn on_event(event: &mut Event<'_>, device: Option<&DeviceContext>) {
  // Runs on the driver's thread for buffer switches: no logging or allocation here.
  match &mut event.kind {
    EventKind::Log(_) | EventKind::SampleRateChanged(_) => {}
    EventKind::BufferSwitch(switch) => {
      let Some(device) = device else {
        return;
      };
      if let Some(tone) = device.user_data_as::<ToneRenderer>() {
        tone.render(switch, device.sample_rate());
      } else {
        switch.silence_outputs();
      }
      event.handled = true;
    }
  }
}
