//! In-process stand-ins for the driver registry and ASIO drivers.
//!
//! A [MockPlatform] lists configured devices and hands out [MockDriver]s. Each driver shares a
//! [MockState] with the platform so callers can inspect what the host did and fire the
//! notifications a real driver would send from its own thread.

use std::ffi::{c_char, c_void};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::asio::driver::{AsioDriver, Platform};
use crate::asio::sys::{
  AsioBufferInfo, AsioCallbacks, AsioChannelInfo, AsioSamples, AsioTime, AsioTimeStamp,
  ASIO_TRUE,
};
use crate::asio::types::{BufferSizeRange, SampleType};
use crate::asio::{AsioError, AsioRes};
use crate::types::{ClassId, DeviceId};

/// Driver calls a [MockConfig] can be told to reject.
#[derive(Clone, Debug, Default)]
pub struct MockFailures {
  pub instantiate: bool,
  pub init: bool,
  pub channels: bool,
  pub buffer_size: bool,
  pub set_sample_rate: bool,
  pub create_buffers: bool,
  pub channel_info: bool,
  pub latencies: bool,
  pub start: bool,
  pub stop: bool,
  pub control_panel: bool,
}

/// What a mock driver reports about itself.
#[derive(Clone, Debug)]
pub struct MockConfig {
  pub version: i32,
  pub inputs: i32,
  pub outputs: i32,
  pub buffer: BufferSizeRange,
  pub sample_rate: f64,
  pub supported_rates: Vec<f64>,
  /// Raw sample type code reported for every channel.
  pub sample_type: i32,
  pub latencies: (i32, i32),
  pub output_ready: bool,
  /// Sample position and system time reported by `getSamplePosition`, if any.
  pub position: Option<(u64, u64)>,
  pub fail: MockFailures,
}

impl Default for MockConfig {
  fn default() -> Self {
    MockConfig {
      version: 1,
      inputs: 2,
      outputs: 2,
      buffer: BufferSizeRange {
        min: 64,
        max: 2048,
        preferred: 256,
        granularity: -1,
      },
      sample_rate: 48000.0,
      supported_rates: vec![44100.0, 48000.0, 96000.0],
      sample_type: SampleType::Int32Lsb.code(),
      latencies: (300, 400),
      output_ready: true,
      position: Some((4096, 1_000_000)),
      fail: MockFailures::default(),
    }
  }
}

impl MockConfig {
  pub fn with_sample_type(mut self, sample_type: SampleType) -> Self {
    self.sample_type = sample_type.code();
    self
  }

  pub fn with_channels(mut self, inputs: i32, outputs: i32) -> Self {
    self.inputs = inputs;
    self.outputs = outputs;
    self
  }

  pub fn failing(mut self, fail: MockFailures) -> Self {
    self.fail = fail;
    self
  }
}

/// State shared between a [MockDriver] and whoever is observing it.
pub struct MockState {
  name: String,
  config: MockConfig,
  sample_rate: Mutex<f64>,
  callbacks: Mutex<Option<&'static AsioCallbacks>>,
  buffers: Mutex<Vec<[Vec<u8>; 2]>>,
  buffer_inputs: AtomicUsize,
  buffer_size: AtomicUsize,
  running: AtomicBool,
  released: AtomicBool,
  disposed: AtomicUsize,
  output_ready_calls: AtomicUsize,
  control_panel_calls: AtomicUsize,
}

impl MockState {
  fn new(name: &str, config: MockConfig) -> Self {
    MockState {
      name: name.to_string(),
      sample_rate: Mutex::new(config.sample_rate),
      config,
      callbacks: Mutex::new(None),
      buffers: Mutex::new(Vec::new()),
      buffer_inputs: AtomicUsize::new(0),
      buffer_size: AtomicUsize::new(0),
      running: AtomicBool::new(false),
      released: AtomicBool::new(false),
      disposed: AtomicUsize::new(0),
      output_ready_calls: AtomicUsize::new(0),
      control_panel_calls: AtomicUsize::new(0),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::SeqCst)
  }

  /// Whether the host has dropped its reference to the driver.
  pub fn is_released(&self) -> bool {
    self.released.load(Ordering::SeqCst)
  }

  pub fn dispose_count(&self) -> usize {
    self.disposed.load(Ordering::SeqCst)
  }

  pub fn has_buffers(&self) -> bool {
    self.callbacks.lock().unwrap().is_some()
  }

  pub fn output_ready_calls(&self) -> usize {
    self.output_ready_calls.load(Ordering::SeqCst)
  }

  pub fn control_panel_calls(&self) -> usize {
    self.control_panel_calls.load(Ordering::SeqCst)
  }

  /// Buffer size in samples requested by the last `createBuffers`.
  pub fn buffer_size(&self) -> usize {
    self.buffer_size.load(Ordering::SeqCst)
  }

  /// Change the rate the driver reports, as an external clock change would.
  pub fn set_reported_sample_rate(&self, rate: f64) {
    *self.sample_rate.lock().unwrap() = rate;
  }

  /// Copy of one output channel's half buffer.
  pub fn output_bytes(&self, channel: usize, half: usize) -> Vec<u8> {
    let index = self.buffer_inputs.load(Ordering::SeqCst) + channel;
    self.buffers.lock().unwrap()[index][half].clone()
  }

  /// Copy of one input channel's half buffer.
  pub fn input_bytes(&self, channel: usize, half: usize) -> Vec<u8> {
    self.buffers.lock().unwrap()[channel][half].clone()
  }

  /// Overwrite one input channel's half buffer, as the hardware would.
  pub fn fill_input(&self, channel: usize, half: usize, byte: u8) {
    self.buffers.lock().unwrap()[channel][half].fill(byte);
  }

  /// Overwrite every output half buffer, so a test can see what the host wrote afterwards.
  pub fn scribble_outputs(&self, bytes: &[u8]) {
    let inputs = self.buffer_inputs.load(Ordering::SeqCst);
    let mut buffers = self.buffers.lock().unwrap();
    for channel in buffers.iter_mut().skip(inputs) {
      for half in channel.iter_mut() {
        for (dst, src) in half.iter_mut().zip(bytes.iter().cycle()) {
          *dst = *src;
        }
      }
    }
  }

  fn callbacks(&self) -> &'static AsioCallbacks {
    self
      .callbacks
      .lock()
      .unwrap()
      .expect("buffers have not been created")
  }

  /// Send `bufferSwitch` through the callbacks registered at buffer creation.
  pub fn fire_buffer_switch(&self, half: i32, direct_process: bool) {
    let callbacks = self.callbacks();
    (callbacks.buffer_switch)(half, direct_process as i32);
  }

  /// Send `bufferSwitchTimeInfo` with the given time structure.
  pub fn fire_buffer_switch_time_info(&self, time: &mut AsioTime, half: i32) {
    let callbacks = self.callbacks();
    (callbacks.buffer_switch_time_info)(time, half, ASIO_TRUE);
  }

  pub fn fire_sample_rate_changed(&self, rate: f64) {
    let callbacks = self.callbacks();
    (callbacks.sample_rate_did_change)(rate);
  }

  pub fn fire_message(&self, selector: i32, value: i32) -> i32 {
    let callbacks = self.callbacks();
    (callbacks.asio_message)(selector, value, std::ptr::null_mut(), std::ptr::null_mut())
  }
}

/// A driver instance backed by a [MockState].
pub struct MockDriver {
  state: Arc<MockState>,
}

impl MockDriver {
  fn failing(&self, flag: bool) -> AsioRes<()> {
    if flag {
      Err(AsioError::HwMalfunction)
    } else {
      Ok(())
    }
  }
}

impl Drop for MockDriver {
  fn drop(&mut self) {
    self.state.released.store(true, Ordering::SeqCst);
  }
}

impl AsioDriver for MockDriver {
  fn init(&self) -> bool {
    !self.state.config.fail.init
  }

  fn driver_name(&self) -> String {
    self.state.name.clone()
  }

  fn driver_version(&self) -> i32 {
    self.state.config.version
  }

  fn error_message(&self) -> String {
    format!("{} mock failure", self.state.name)
  }

  fn start(&self) -> AsioRes<()> {
    self.failing(self.state.config.fail.start)?;
    self.state.running.store(true, Ordering::SeqCst);
    Ok(())
  }

  fn stop(&self) -> AsioRes<()> {
    self.failing(self.state.config.fail.stop)?;
    self.state.running.store(false, Ordering::SeqCst);
    Ok(())
  }

  fn channels(&self) -> AsioRes<(i32, i32)> {
    self.failing(self.state.config.fail.channels)?;
    Ok((self.state.config.inputs, self.state.config.outputs))
  }

  fn latencies(&self) -> AsioRes<(i32, i32)> {
    self.failing(self.state.config.fail.latencies)?;
    Ok(self.state.config.latencies)
  }

  fn buffer_size(&self) -> AsioRes<BufferSizeRange> {
    self.failing(self.state.config.fail.buffer_size)?;
    Ok(self.state.config.buffer)
  }

  fn can_sample_rate(&self, rate: f64) -> AsioRes<()> {
    if self.state.config.supported_rates.contains(&rate) {
      Ok(())
    } else {
      Err(AsioError::NoClock)
    }
  }

  fn sample_rate(&self) -> AsioRes<f64> {
    Ok(*self.state.sample_rate.lock().unwrap())
  }

  fn set_sample_rate(&self, rate: f64) -> AsioRes<()> {
    self.failing(self.state.config.fail.set_sample_rate)?;
    self.can_sample_rate(rate)?;
    *self.state.sample_rate.lock().unwrap() = rate;
    Ok(())
  }

  fn sample_position(&self) -> AsioRes<(AsioSamples, AsioTimeStamp)> {
    match self.state.config.position {
      Some((samples, nanos)) => Ok((AsioSamples::from_u64(samples), AsioTimeStamp::from_u64(nanos))),
      None => Err(AsioError::SpNotAdvancing),
    }
  }

  fn channel_info(&self, info: &mut AsioChannelInfo) -> AsioRes<()> {
    self.failing(self.state.config.fail.channel_info)?;
    let is_input = info.is_input == ASIO_TRUE;
    let label = format!("{} {}", if is_input { "In" } else { "Out" }, info.channel + 1);
    for (dst, src) in info.name.iter_mut().zip(label.bytes()) {
      *dst = src as c_char;
    }
    info.is_active = ASIO_TRUE;
    info.channel_group = 0;
    info.sample_type = self.state.config.sample_type;
    Ok(())
  }

  unsafe fn create_buffers(
    &self,
    infos: &mut [AsioBufferInfo],
    buffer_size: i32,
    callbacks: &'static AsioCallbacks,
  ) -> AsioRes<()> {
    self.failing(self.state.config.fail.create_buffers)?;
    let bytes = buffer_size as usize * 8;
    let mut buffers = self.state.buffers.lock().unwrap();
    buffers.clear();
    let mut inputs = 0;
    for info in infos.iter_mut() {
      if info.is_input == ASIO_TRUE {
        inputs += 1;
      }
      let mut halves = [vec![0u8; bytes], vec![0u8; bytes]];
      info.buffers = [
        halves[0].as_mut_ptr() as *mut c_void,
        halves[1].as_mut_ptr() as *mut c_void,
      ];
      buffers.push(halves);
    }
    self.state.buffer_inputs.store(inputs, Ordering::SeqCst);
    self.state.buffer_size.store(buffer_size as usize, Ordering::SeqCst);
    *self.state.callbacks.lock().unwrap() = Some(callbacks);
    Ok(())
  }

  fn dispose_buffers(&self) -> AsioRes<()> {
    *self.state.callbacks.lock().unwrap() = None;
    self.state.disposed.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn control_panel(&self) -> AsioRes<()> {
    self.failing(self.state.config.fail.control_panel)?;
    self.state.control_panel_calls.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn output_ready(&self) -> AsioRes<()> {
    if !self.state.config.output_ready {
      return Err(AsioError::NotPresent);
    }
    self.state.output_ready_calls.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

/// A registry of mock drivers.
#[derive(Default)]
pub struct MockPlatform {
  devices: Vec<(DeviceId, MockConfig)>,
  instances: Mutex<Vec<Arc<MockState>>>,
  fail_activation: bool,
  activations: AtomicUsize,
}

impl MockPlatform {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a device. Class identifiers are assigned in registration order.
  pub fn with_device(mut self, name: &str, config: MockConfig) -> Self {
    let class_id = ClassId(0x4153_494f_0000_0000_0000_0000_0000_0000 + self.devices.len() as u128);
    self.devices.push((DeviceId::new(class_id, name), config));
    self
  }

  pub fn failing_activation(mut self) -> Self {
    self.fail_activation = true;
    self
  }

  /// Number of activations not yet balanced by a deactivation.
  pub fn active_count(&self) -> usize {
    self.activations.load(Ordering::SeqCst)
  }

  /// The most recently instantiated driver for `name`.
  pub fn driver(&self, name: &str) -> Option<Arc<MockState>> {
    self
      .instances
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|state| state.name == name)
      .cloned()
  }

  pub fn instance_count(&self) -> usize {
    self.instances.lock().unwrap().len()
  }
}

impl Platform for MockPlatform {
  fn activate(&self) -> AsioRes<()> {
    if self.fail_activation {
      return Err(AsioError::Unavailable("activation refused".to_string()));
    }
    self.activations.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn deactivate(&self) {
    self.activations.fetch_sub(1, Ordering::SeqCst);
  }

  fn enumerate(&self) -> AsioRes<Vec<DeviceId>> {
    Ok(self.devices.iter().map(|(id, _)| id.clone()).collect())
  }

  fn instantiate(&self, id: &DeviceId) -> AsioRes<Box<dyn AsioDriver>> {
    let (_, config) = self
      .devices
      .iter()
      .find(|(known, _)| known == id)
      .ok_or_else(|| AsioError::Unavailable(format!("{} is not registered", id.name)))?;
    if config.fail.instantiate {
      return Err(AsioError::Unavailable(format!("{} refused to load", id.name)));
    }
    let state = Arc::new(MockState::new(&id.name, config.clone()));
    self.instances.lock().unwrap().push(state.clone());
    Ok(Box::new(MockDriver { state }))
  }
}
