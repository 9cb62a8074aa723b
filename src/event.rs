use std::ffi::c_void;
use std::slice;

use crate::asio::sys::{self, AsioTime};
use crate::device::DeviceContext;
use crate::format::SampleFormat;

/// The kind of an [Event], without its payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventType {
  Log,
  SampleRateChanged,
  BufferSwitch,
}

/// A notification delivered to the client callback.
///
/// Events are built on the stack for a single call and never outlive it.
#[derive(Debug)]
pub struct Event<'a> {
  pub kind: EventKind<'a>,
  /// Set by the client to acknowledge the event.
  pub handled: bool,
}

#[derive(Debug)]
pub enum EventKind<'a> {
  Log(&'a str),
  /// New rate in Hz; 0 when the clock is unknown or lost.
  SampleRateChanged(f64),
  BufferSwitch(BufferSwitch<'a>),
}

impl<'a> Event<'a> {
  pub(crate) fn log(message: &'a str) -> Self {
    Event {
      kind: EventKind::Log(message),
      handled: true,
    }
  }

  pub(crate) fn sample_rate_changed(rate: f64) -> Self {
    Event {
      kind: EventKind::SampleRateChanged(rate),
      handled: true,
    }
  }

  pub(crate) fn buffer_switch(switch: BufferSwitch<'a>) -> Self {
    Event {
      kind: EventKind::BufferSwitch(switch),
      handled: false,
    }
  }

  pub fn event_type(&self) -> EventType {
    match self.kind {
      EventKind::Log(_) => EventType::Log,
      EventKind::SampleRateChanged(_) => EventType::SampleRateChanged,
      EventKind::BufferSwitch(_) => EventType::BufferSwitch,
    }
  }
}

/// Timing that accompanied a buffer switch. Each field is present only when the driver
/// reported it as valid.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TimeInfo {
  /// System time of the buffer start, in nanoseconds.
  pub system_time_ns: Option<u64>,
  /// Sample position of the buffer start.
  pub sample_position: Option<u64>,
  /// Time code position, in samples.
  pub timecode_samples: Option<u64>,
}

impl TimeInfo {
  pub(crate) fn from_asio(time: &AsioTime) -> Self {
    let info = time.time_info;
    let code = time.time_code;
    let valid = |flags: u32, bit: u32| flags & bit != 0;
    TimeInfo {
      system_time_ns: valid(info.flags, sys::kSystemTimeValid).then(|| info.system_time.to_u64()),
      sample_position: valid(info.flags, sys::kSamplePositionValid)
        .then(|| info.sample_position.to_u64()),
      timecode_samples: valid(code.flags, sys::kTcValid).then(|| code.time_code_samples.to_u64()),
    }
  }
}

/// Shape of every channel buffer of an open device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BufferLayout {
  /// Samples per channel buffer.
  pub frames: usize,
  /// `frames` times the sample width; 0 when the width is unsupported.
  pub byte_length: usize,
  pub sample_format: SampleFormat,
}

/// One channel buffer address owned by the driver.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BufferPtr(pub(crate) *mut c_void);

// Addresses are only dereferenced inside a buffer switch, on the driver's thread.
unsafe impl Send for BufferPtr {}
unsafe impl Sync for BufferPtr {}

/// The half of the double buffer the client may touch during this notification.
///
/// Inputs hold freshly captured data and outputs are to be filled, both in the device's native
/// sample format. The views borrow driver memory and are valid only until the callback returns.
#[derive(Debug)]
pub struct BufferSwitch<'a> {
  /// Index of the active half, 0 or 1.
  pub half: usize,
  /// The driver's hint that processing may happen right away rather than being deferred.
  pub direct_process: bool,
  pub time: TimeInfo,
  inputs: &'a [BufferPtr],
  outputs: &'a [BufferPtr],
  layout: BufferLayout,
}

impl<'a> BufferSwitch<'a> {
  pub(crate) fn new(
    half: usize,
    direct_process: bool,
    time: TimeInfo,
    inputs: &'a [BufferPtr],
    outputs: &'a [BufferPtr],
    layout: BufferLayout,
  ) -> Self {
    BufferSwitch {
      half,
      direct_process,
      time,
      inputs,
      outputs,
      layout,
    }
  }

  pub fn num_inputs(&self) -> usize {
    self.inputs.len()
  }

  pub fn num_outputs(&self) -> usize {
    self.outputs.len()
  }

  pub fn layout(&self) -> BufferLayout {
    self.layout
  }

  /// Samples in each channel buffer.
  pub fn frames(&self) -> usize {
    self.layout.frames
  }

  /// Bytes in each channel buffer.
  pub fn byte_length(&self) -> usize {
    self.layout.byte_length
  }

  pub fn sample_format(&self) -> SampleFormat {
    self.layout.sample_format
  }

  /// Captured data of one input channel.
  pub fn input(&self, channel: usize) -> Option<&[u8]> {
    let ptr = self.inputs.get(channel)?.0 as *const u8;
    if ptr.is_null() {
      return None;
    }
    // SAFETY: the driver owns `byte_length` bytes at this address for the active half and does
    // not touch them until the notification returns.
    Some(unsafe { slice::from_raw_parts(ptr, self.layout.byte_length) })
  }

  /// Buffer to fill for one output channel.
  pub fn output(&mut self, channel: usize) -> Option<&mut [u8]> {
    let ptr = self.outputs.get(channel)?.0 as *mut u8;
    if ptr.is_null() {
      return None;
    }
    // SAFETY: as for `input`; `&mut self` keeps the returned view unique.
    Some(unsafe { slice::from_raw_parts_mut(ptr, self.layout.byte_length) })
  }

  /// Raw address of an input buffer, for clients that read it with their own sample type.
  pub fn input_ptr(&self, channel: usize) -> Option<*const c_void> {
    self.inputs.get(channel).map(|p| p.0 as *const c_void)
  }

  /// Raw address of an output buffer.
  pub fn output_ptr(&mut self, channel: usize) -> Option<*mut c_void> {
    self.outputs.get(channel).map(|p| p.0)
  }

  /// Zero every output channel.
  pub fn silence_outputs(&mut self) {
    for channel in 0..self.outputs.len() {
      if let Some(buffer) = self.output(channel) {
        buffer.fill(0);
      }
    }
  }
}

/// Receiver of every event from a session and its devices.
///
/// Buffer switches are delivered on the driver's real-time thread, so implementations must not
/// block or allocate there. `device` is `None` for session-level log messages.
pub trait EventHandler: Send + Sync {
  fn on_event(&self, event: &mut Event<'_>, device: Option<&DeviceContext>);
}

impl<F> EventHandler for F
where
  F: Fn(&mut Event<'_>, Option<&DeviceContext>) + Send + Sync,
{
  fn on_event(&self, event: &mut Event<'_>, device: Option<&DeviceContext>) {
    self(event, device)
  }
}
