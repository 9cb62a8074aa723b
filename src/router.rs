//! Driver notifications, routed to the device bound on the slot they arrived on.
//!
//! Everything here runs on the driver's thread: no locks, no allocation, no `log` facade.

use std::fmt::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::Ordering;

use crate::asio::sys::{AsioBool, AsioLong, AsioTime, ASIO_FALSE};
use crate::asio::MessageSelector;
use crate::device::{BufferHalf, DeviceContext};
use crate::event::{BufferLayout, BufferSwitch, Event, TimeInfo};
use crate::pool;
use crate::utils::StackMessage;

/// The host engine version announced to drivers.
pub const ENGINE_VERSION: AsioLong = 2;

/// Something a driver told the host that the client should hear about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Advisory {
  ResetRequest,
  BufferSizeChange(AsioLong),
  ResyncRequest,
  LatenciesChanged,
  Overload,
  Unhandled(AsioLong),
}

impl fmt::Display for Advisory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      Advisory::ResetRequest => write!(f, "driver requested a reset; close and reopen the device"),
      Advisory::BufferSizeChange(size) => write!(f, "driver requested a buffer size change to {}", size),
      Advisory::ResyncRequest => write!(f, "driver requested a resync"),
      Advisory::LatenciesChanged => write!(f, "driver latencies changed"),
      Advisory::Overload => write!(f, "driver reported an overload"),
      Advisory::Unhandled(selector) => write!(f, "unhandled asioMessage selector {}", selector),
    }
  }
}

/// The host's answer to `asioMessage`, and what to tell the client about it.
pub fn message_reply(selector: AsioLong, value: AsioLong) -> (AsioLong, Option<Advisory>) {
  use MessageSelector::*;

  match MessageSelector::try_from(selector) {
    Ok(SelectorSupported) => (selector_supported(value) as AsioLong, None),
    Ok(EngineVersion) => (ENGINE_VERSION, None),
    Ok(ResetRequest) => (0, Some(Advisory::ResetRequest)),
    Ok(BufferSizeChange) => (0, Some(Advisory::BufferSizeChange(value))),
    Ok(ResyncRequest) => (0, Some(Advisory::ResyncRequest)),
    Ok(LatenciesChanged) => (0, Some(Advisory::LatenciesChanged)),
    Ok(SupportsTimeInfo) => (1, None),
    Ok(SupportsTimeCode) => (0, None),
    Ok(Overload) => (1, Some(Advisory::Overload)),
    _ => (0, Some(Advisory::Unhandled(selector))),
  }
}

fn selector_supported(selector: AsioLong) -> bool {
  use MessageSelector::*;

  matches!(
    MessageSelector::try_from(selector),
    Ok(EngineVersion
      | ResetRequest
      | BufferSizeChange
      | ResyncRequest
      | LatenciesChanged
      | SupportsTimeInfo
      | SupportsTimeCode
      | Overload)
  )
}

pub(crate) fn buffer_switch(slot: usize, half: AsioLong, direct_process: AsioBool) {
  let Some(context) = (unsafe { pool::bound(slot) }) else {
    return;
  };
  let Some((buffers, layout)) = active_half(context, half) else {
    return;
  };
  let time = match context.driver.sample_position() {
    Ok((samples, system_time)) => TimeInfo {
      system_time_ns: Some(system_time.to_u64()),
      sample_position: Some(samples.to_u64()),
      timecode_samples: None,
    },
    Err(_) => TimeInfo::default(),
  };
  deliver(context, buffers, layout, half, direct_process, time);
}

pub(crate) fn buffer_switch_time_info(
  slot: usize,
  params: *mut AsioTime,
  half: AsioLong,
  direct_process: AsioBool,
) -> *mut AsioTime {
  let Some(context) = (unsafe { pool::bound(slot) }) else {
    return params;
  };
  let Some((buffers, layout)) = active_half(context, half) else {
    return params;
  };
  let time = if params.is_null() {
    TimeInfo::default()
  } else {
    // SAFETY: the driver passes a valid structure for the duration of the call.
    TimeInfo::from_asio(&unsafe { ptr::read_unaligned(params) })
  };
  deliver(context, buffers, layout, half, direct_process, time);
  params
}

pub(crate) fn sample_rate_changed(slot: usize, rate: f64) {
  if let Some(context) = unsafe { pool::bound(slot) } {
    dispatch(context, &mut Event::sample_rate_changed(rate));
  }
}

pub(crate) fn message(slot: usize, selector: AsioLong, value: AsioLong) -> AsioLong {
  let (reply, advisory) = message_reply(selector, value);
  if let (Some(advisory), Some(context)) = (advisory, unsafe { pool::bound(slot) }) {
    let mut text = StackMessage::<256>::new();
    let _ = write!(text, "[{}] {}", context.name(), advisory);
    dispatch(context, &mut Event::log(text.as_str()));
  }
  reply
}

fn active_half(context: &DeviceContext, half: AsioLong) -> Option<(&BufferHalf, BufferLayout)> {
  let table = context.buffers.get()?;
  let half = usize::try_from(half).ok()?;
  Some((table.halves.get(half)?, table.layout))
}

fn deliver(
  context: &DeviceContext,
  buffers: &BufferHalf,
  layout: BufferLayout,
  half: AsioLong,
  direct_process: AsioBool,
  time: TimeInfo,
) {
  let switch = BufferSwitch::new(
    half as usize,
    direct_process != ASIO_FALSE,
    time,
    &buffers.inputs,
    &buffers.outputs,
    layout,
  );
  let mut event = Event::buffer_switch(switch);
  dispatch(context, &mut event);
  if !event.handled {
    context.unhandled_switches.fetch_add(1, Ordering::Relaxed);
  }
  if context.output_ready.load(Ordering::Relaxed) {
    let _ = context.driver.output_ready();
  }
}

fn dispatch(context: &DeviceContext, event: &mut Event<'_>) {
  let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
    context.handler.on_event(event, Some(context))
  }));
  if delivered.is_err() {
    context.callback_panics.fetch_add(1, Ordering::Relaxed);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn announces_engine_version_two() {
    assert_eq!(message_reply(2, 0), (2, None));
  }

  #[test]
  fn supported_selectors() {
    for selector in [2, 3, 4, 5, 6, 7, 8, 15] {
      assert_eq!(message_reply(1, selector).0, 1, "selector {}", selector);
    }
    for selector in [0, 1, 9, 10, 14, 16, -1] {
      assert_eq!(message_reply(1, selector).0, 0, "selector {}", selector);
    }
  }

  #[test]
  fn capability_answers() {
    assert_eq!(message_reply(7, 0), (1, None));
    assert_eq!(message_reply(8, 0), (0, None));
    assert_eq!(message_reply(15, 0), (1, Some(Advisory::Overload)));
  }

  #[test]
  fn requests_are_acknowledged_but_declined() {
    assert_eq!(message_reply(3, 0), (0, Some(Advisory::ResetRequest)));
    assert_eq!(message_reply(4, 512), (0, Some(Advisory::BufferSizeChange(512))));
    assert_eq!(message_reply(5, 0), (0, Some(Advisory::ResyncRequest)));
    assert_eq!(message_reply(6, 0), (0, Some(Advisory::LatenciesChanged)));
  }

  #[test]
  fn unknown_selectors_are_reported() {
    assert_eq!(message_reply(42, 0), (0, Some(Advisory::Unhandled(42))));
    assert_eq!(message_reply(10, 1), (0, Some(Advisory::Unhandled(10))));
    assert_eq!(
      Advisory::Unhandled(42).to_string(),
      "unhandled asioMessage selector 42"
    );
  }
}
