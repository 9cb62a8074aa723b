use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use log::Level;

use crate::asio::sys::{c_chars_to_string, AsioBufferInfo, AsioChannelInfo, ASIO_FALSE};
use crate::asio::{AsioDriver, AsioError, BufferSizeRange, SampleType};
use crate::config::OpenOptions;
use crate::error::{DeviceState, Error, Result};
use crate::event::{BufferLayout, BufferPtr, EventHandler};
use crate::format;
use crate::pool::{Slot, MAX_OPEN_DEVICES};
use crate::session::Session;
use crate::types::{ChannelDetails, DeviceId, DeviceProperties};
use crate::utils;

/// Opaque client value attached to a device at open time.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// One half of the double buffer: an address per open channel.
pub(crate) struct BufferHalf {
  pub(crate) inputs: Vec<BufferPtr>,
  pub(crate) outputs: Vec<BufferPtr>,
}

/// Buffer addresses captured once after `createBuffers`, read-only afterwards.
pub(crate) struct BufferTable {
  pub(crate) halves: [BufferHalf; 2],
  pub(crate) layout: BufferLayout,
}

impl BufferTable {
  fn from_infos(infos: &[AsioBufferInfo], num_inputs: usize, layout: BufferLayout) -> Self {
    let halves = [0, 1].map(|half| {
      let mut ptrs = infos.iter().map(|info| {
        let buffers = info.buffers;
        BufferPtr(buffers[half])
      });
      BufferHalf {
        inputs: ptrs.by_ref().take(num_inputs).collect(),
        outputs: ptrs.collect(),
      }
    });
    BufferTable { halves, layout }
  }
}

/// The part of an open device that driver notifications can reach.
///
/// Handed to the client callback alongside every device event.
pub struct DeviceContext {
  slot: usize,
  name: String,
  user_data: Option<UserData>,
  pub(crate) handler: Arc<dyn EventHandler>,
  pub(crate) driver: Box<dyn AsioDriver>,
  pub(crate) output_ready: AtomicBool,
  pub(crate) buffers: OnceLock<BufferTable>,
  /// Last known rate in Hz, as `f64` bits.
  sample_rate: AtomicU64,
  pub(crate) unhandled_switches: AtomicU64,
  pub(crate) callback_panics: AtomicU64,
}

impl DeviceContext {
  pub fn slot(&self) -> usize {
    self.slot
  }

  /// Name the driver reports for itself.
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn user_data(&self) -> Option<&UserData> {
    self.user_data.as_ref()
  }

  /// The user data, if it is a `T`.
  pub fn user_data_as<T: Any>(&self) -> Option<&T> {
    self.user_data.as_deref()?.downcast_ref::<T>()
  }

  /// Sample rate observed at open or at the last [Device::refresh_sample_rate].
  ///
  /// Rate change notifications do not update it.
  pub fn sample_rate(&self) -> f64 {
    f64::from_bits(self.sample_rate.load(Ordering::Relaxed))
  }

  pub(crate) fn set_sample_rate(&self, rate: f64) {
    self.sample_rate.store(rate.to_bits(), Ordering::Relaxed);
  }

  /// Layout of the buffers handed out in buffer switches, once they exist.
  pub fn buffer_layout(&self) -> Option<BufferLayout> {
    self.buffers.get().map(|table| table.layout)
  }

  /// Buffer switches the client returned without marking handled.
  pub fn unhandled_switches(&self) -> u64 {
    self.unhandled_switches.load(Ordering::Relaxed)
  }

  /// Panics caught while running the client callback on the driver's thread.
  pub fn callback_panics(&self) -> u64 {
    self.callback_panics.load(Ordering::Relaxed)
  }

  pub(crate) fn log(&self, level: Level, message: impl fmt::Display) {
    let text = format!("[{}] {}", self.name, message);
    utils::emit(&*self.handler, Some(self), level, &text);
  }
}

impl fmt::Debug for DeviceContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeviceContext")
      .field("slot", &self.slot)
      .field("name", &self.name)
      .finish_non_exhaustive()
  }
}

/// An open driver with its buffers created and bound to a routing slot.
///
/// Dropping the device stops and closes it.
pub struct Device<'s> {
  context: Arc<DeviceContext>,
  slot: Slot,
  id: DeviceId,
  driver_version: i32,
  num_inputs: usize,
  num_outputs: usize,
  buffer_range: BufferSizeRange,
  buffer_size: usize,
  channels: Vec<ChannelDetails>,
  latencies: (i32, i32),
  buffers_created: bool,
  started: bool,
  closed: bool,
  _session: PhantomData<&'s Session>,
}

impl<'s> Device<'s> {
  pub(crate) fn open(
    session: &'s Session,
    id: &DeviceId,
    user_data: Option<UserData>,
    options: &OpenOptions,
  ) -> Result<Self> {
    if let Err(err) = options.validate() {
      session.log(Level::Error, &format!("cannot open {}: {}", id.name, err));
      return Err(err);
    }
    let slot = Slot::claim().ok_or_else(|| {
      session.log(
        Level::Error,
        &format!("cannot open {}: all {} device slots are in use", id.name, MAX_OPEN_DEVICES),
      );
      Error::CapacityExceeded(MAX_OPEN_DEVICES)
    })?;
    let driver = session.platform().instantiate(id).map_err(|err| {
      session.log(Level::Error, &format!("failed to instantiate {}: {}", id, err));
      Error::Open(err)
    })?;

    let context = Arc::new(DeviceContext {
      slot: slot.index(),
      name: driver.driver_name(),
      user_data,
      handler: Arc::clone(session.handler()),
      driver,
      output_ready: AtomicBool::new(false),
      buffers: OnceLock::new(),
      sample_rate: AtomicU64::new(0),
      unhandled_switches: AtomicU64::new(0),
      callback_panics: AtomicU64::new(0),
    });
    context.log(Level::Info, format_args!("opened successfully (slot {})", slot.index()));

    let mut device = Device {
      context,
      slot,
      id: id.clone(),
      driver_version: 0,
      num_inputs: 0,
      num_outputs: 0,
      buffer_range: BufferSizeRange::default(),
      buffer_size: 0,
      channels: Vec::new(),
      latencies: (0, 0),
      buffers_created: false,
      started: false,
      closed: false,
      _session: PhantomData,
    };
    device.negotiate(options)?;
    Ok(device)
  }

  /// Initialise the driver, create buffers and read back everything clients can query.
  ///
  /// On error the partially opened device is torn down by its drop.
  fn negotiate(&mut self, options: &OpenOptions) -> Result<()> {
    let context = Arc::clone(&self.context);
    let driver = &*context.driver;

    self.driver_version = driver.driver_version();
    context.log(Level::Info, format_args!("driver version: {}", self.driver_version));

    if !driver.init() {
      let message = driver.error_message();
      context.log(Level::Error, format_args!("init error: {}", message));
      return Err(Error::Init(message));
    }
    context.log(Level::Info, "init OK");

    let (inputs, outputs) = driver
      .channels()
      .map_err(|err| metadata_error(&context, "getChannels", err))?;
    context.log(Level::Info, format_args!("channels in/out: {}/{}", inputs, outputs));
    self.num_inputs = (inputs.max(0) as usize).min(options.max_inputs);
    self.num_outputs = (outputs.max(0) as usize).min(options.max_outputs);
    if self.num_inputs as i32 != inputs || self.num_outputs as i32 != outputs {
      context.log(
        Level::Info,
        format_args!("opening channels in/out: {}/{}", self.num_inputs, self.num_outputs),
      );
    }

    self.buffer_range = driver
      .buffer_size()
      .map_err(|err| metadata_error(&context, "getBufferSize", err))?;
    context.log(Level::Info, format_args!("buffer size: {}", self.buffer_range));

    if let Some(rate) = options.sample_rate {
      driver
        .can_sample_rate(rate)
        .and_then(|()| driver.set_sample_rate(rate))
        .map_err(|source| {
          context.log(
            Level::Error,
            format_args!(
              "sample rate {:.2} rejected: {} ({})",
              rate,
              source,
              driver.error_message()
            ),
          );
          Error::Driver {
            call: "setSampleRate",
            source,
          }
        })?;
    }
    let sample_rate = driver
      .sample_rate()
      .map_err(|err| metadata_error(&context, "getSampleRate", err))?;
    context.set_sample_rate(sample_rate);
    context.log(Level::Info, format_args!("current sample rate: {:.2}", sample_rate));

    let output_ready = driver.output_ready().is_ok();
    context.output_ready.store(output_ready, Ordering::Relaxed);
    if output_ready {
      context.log(Level::Info, "driver supports outputReady");
    }

    let buffer_size = options.resolve_buffer_size(&self.buffer_range);
    if buffer_size != self.buffer_range.preferred {
      context.log(
        Level::Info,
        format_args!("requesting {} samples instead of the preferred {}", buffer_size, self.buffer_range.preferred),
      );
    }

    let mut infos: Vec<AsioBufferInfo> = (0..self.num_inputs)
      .map(|channel| AsioBufferInfo::new(true, channel as i32))
      .chain((0..self.num_outputs).map(|channel| AsioBufferInfo::new(false, channel as i32)))
      .collect();

    self.slot.bind(&context);
    // SAFETY: the slot now routes to `context`, which this device keeps alive until the buffers
    // are disposed and the slot unbound.
    if let Err(err) = unsafe { driver.create_buffers(&mut infos, buffer_size, self.slot.callbacks()) } {
      let message = driver.error_message();
      context.log(Level::Error, format_args!("failed to create buffers: {} ({})", message, err));
      return Err(Error::BufferCreation(message));
    }
    self.buffers_created = true;
    self.buffer_size = buffer_size.max(0) as usize;
    context.log(Level::Info, format_args!("created buffers of {} samples", buffer_size));

    for index in 0..infos.len() {
      let is_input = index < self.num_inputs;
      let channel = if is_input { index } else { index - self.num_inputs };
      let mut info = AsioChannelInfo::new(is_input, channel as i32);
      if let Err(err) = driver.channel_info(&mut info) {
        let message = format!(
          "{} {}: {} ({})",
          if is_input { "input" } else { "output" },
          channel,
          err,
          driver.error_message()
        );
        context.log(Level::Error, format_args!("error getting channel info for {}", message));
        return Err(Error::ChannelInfo(message));
      }
      let details = ChannelDetails {
        channel,
        is_input,
        is_active: info.is_active != ASIO_FALSE,
        group: info.channel_group,
        sample_type: info.sample_type,
        name: c_chars_to_string(&info.name),
      };
      context.log(Level::Info, format_args!("  - {}", details));
      self.channels.push(details);
    }

    let layout = self.layout();
    if layout.byte_length == 0 && !self.channels.is_empty() {
      context.log(
        Level::Warn,
        format_args!("sample type {} has no fixed width", self.sample_type_code()),
      );
    }
    let _ = context
      .buffers
      .set(BufferTable::from_infos(&infos, self.num_inputs, layout));

    self.latencies = driver.latencies().map_err(|err| {
      let message = format!("{} ({})", err, driver.error_message());
      context.log(Level::Error, format_args!("error getting latencies: {}", message));
      Error::LatencyQuery(message)
    })?;
    context.log(
      Level::Info,
      format_args!("latencies in/out: {}/{} samples", self.latencies.0, self.latencies.1),
    );
    Ok(())
  }

  pub fn start(&mut self) -> Result<()> {
    if self.started {
      self.context.log(Level::Warn, "start requested but the device is already started");
      return Err(Error::InvalidState(DeviceState::Started));
    }
    self.context.driver.start().map_err(|source| {
      self.context.log(
        Level::Error,
        format_args!("start failed: {} ({})", source, self.context.driver.error_message()),
      );
      Error::Driver {
        call: "start",
        source,
      }
    })?;
    self.started = true;
    self.context.log(Level::Info, "started");
    Ok(())
  }

  pub fn stop(&mut self) -> Result<()> {
    if !self.started {
      self.context.log(Level::Warn, "stop requested but the device is not started");
      return Err(Error::InvalidState(DeviceState::Stopped));
    }
    self.context.driver.stop().map_err(|source| {
      self.context.log(
        Level::Error,
        format_args!("stop failed: {} ({})", source, self.context.driver.error_message()),
      );
      Error::Driver {
        call: "stop",
        source,
      }
    })?;
    self.started = false;
    self.context.log(Level::Info, "stopped");
    Ok(())
  }

  /// Stop if needed, dispose the buffers, free the slot and release the driver.
  ///
  /// Teardown always runs to completion; the first failure met on the way is returned.
  pub fn close(mut self) -> Result<()> {
    self.teardown()
  }

  fn teardown(&mut self) -> Result<()> {
    if self.closed {
      return Ok(());
    }
    self.closed = true;

    let mut result = Ok(());
    if self.started {
      self.context.log(Level::Warn, "closing a started device, stopping it first");
      result = self.stop();
    }
    if self.buffers_created {
      self.buffers_created = false;
      match self.context.driver.dispose_buffers() {
        Ok(()) => self.context.log(Level::Info, "buffers disposed"),
        Err(source) => {
          self.context.log(
            Level::Error,
            format_args!(
              "disposeBuffers failed: {} ({})",
              source,
              self.context.driver.error_message()
            ),
          );
          if result.is_ok() {
            result = Err(Error::Driver {
              call: "disposeBuffers",
              source,
            });
          }
        }
      }
    }
    self.slot.unbind();

    let unhandled = self.context.unhandled_switches();
    if unhandled > 0 {
      self.context.log(
        Level::Warn,
        format_args!("{} buffer switches were not marked handled", unhandled),
      );
    }
    let panics = self.context.callback_panics();
    if panics > 0 {
      self.context.log(Level::Error, format_args!("client callback panicked {} times", panics));
    }
    self.context.log(Level::Info, "closed");
    result
  }

  /// Open the driver's own settings dialog.
  pub fn show_control_panel(&self) -> Result<()> {
    self.context.driver.control_panel().map_err(|source| {
      self.context.log(
        Level::Error,
        format_args!(
          "failed to show control panel: {} ({})",
          source,
          self.context.driver.error_message()
        ),
      );
      Error::Driver {
        call: "controlPanel",
        source,
      }
    })
  }

  /// Ask the driver for its current sample rate and remember it for [Device::properties].
  pub fn refresh_sample_rate(&self) -> Result<f64> {
    let rate = self
      .context
      .driver
      .sample_rate()
      .map_err(|source| {
        self.context.log(Level::Error, format_args!("getSampleRate failed: {}", source));
        Error::Driver {
          call: "getSampleRate",
          source,
        }
      })?;
    let previous = self.context.sample_rate();
    if rate != previous {
      self.context.log(
        Level::Info,
        format_args!("sample rate changed from {:.2} to {:.2}", previous, rate),
      );
      self.context.set_sample_rate(rate);
    }
    Ok(rate)
  }

  pub fn properties(&self) -> DeviceProperties {
    let layout = self.layout();
    DeviceProperties {
      name: self.context.name.clone(),
      num_inputs: self.num_inputs,
      num_outputs: self.num_outputs,
      buffer_sample_length: layout.frames,
      buffer_byte_length: layout.byte_length,
      sample_format: layout.sample_format,
      sample_type: SampleType::try_from(self.sample_type_code()).ok(),
      sample_rate: self.context.sample_rate(),
    }
  }

  fn layout(&self) -> BufferLayout {
    let code = self.sample_type_code();
    BufferLayout {
      frames: self.buffer_size,
      byte_length: format::buffer_byte_length(self.buffer_size, code),
      sample_format: format::sample_format(code),
    }
  }

  /// Channel 0's sample type stands for the whole device.
  fn sample_type_code(&self) -> i32 {
    self.channels.first().map_or(-1, |channel| channel.sample_type)
  }

  pub fn id(&self) -> &DeviceId {
    &self.id
  }

  pub fn name(&self) -> &str {
    self.context.name()
  }

  pub fn context(&self) -> &DeviceContext {
    &self.context
  }

  pub fn slot(&self) -> usize {
    self.slot.index()
  }

  /// Whether notifications on this device's slot currently reach it.
  pub fn is_bound(&self) -> bool {
    self.slot.is_bound_to(&self.context)
  }

  pub fn is_started(&self) -> bool {
    self.started
  }

  pub fn driver_version(&self) -> i32 {
    self.driver_version
  }

  pub fn buffer_size_range(&self) -> BufferSizeRange {
    self.buffer_range
  }

  /// Every opened channel, inputs first.
  pub fn channels(&self) -> &[ChannelDetails] {
    &self.channels
  }

  /// (input, output) latencies in samples.
  pub fn latencies(&self) -> (i32, i32) {
    self.latencies
  }

  pub fn supports_output_ready(&self) -> bool {
    self.context.output_ready.load(Ordering::Relaxed)
  }

  pub fn unhandled_switches(&self) -> u64 {
    self.context.unhandled_switches()
  }
}

impl Drop for Device<'_> {
  fn drop(&mut self) {
    let _ = self.teardown();
  }
}

fn metadata_error(context: &DeviceContext, call: &str, err: AsioError) -> Error {
  let message = format!("{} failed: {} ({})", call, err, context.driver.error_message());
  context.log(Level::Error, &message);
  Error::ChannelInfo(message)
}
