use std::fmt;

use log::Level;

use crate::device::DeviceContext;
use crate::event::{Event, EventHandler};

/// A fixed-capacity text buffer for formatting on threads that must not allocate.
///
/// Output that does not fit is cut at the last whole character.
pub(crate) struct StackMessage<const N: usize> {
  buf: [u8; N],
  len: usize,
}

impl<const N: usize> StackMessage<N> {
  pub(crate) fn new() -> Self {
    StackMessage { buf: [0; N], len: 0 }
  }

  pub(crate) fn as_str(&self) -> &str {
    // Only whole characters are ever copied in.
    std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
  }
}

impl<const N: usize> fmt::Write for StackMessage<N> {
  fn write_str(&mut self, s: &str) -> fmt::Result {
    let room = N - self.len;
    let mut take = s.len().min(room);
    while !s.is_char_boundary(take) {
      take -= 1;
    }
    self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
    self.len += take;
    Ok(())
  }
}

/// Deliver a log message to the client and mirror it to the `log` facade.
///
/// Management-thread only: the facade may lock and allocate.
pub(crate) fn emit(
  handler: &dyn EventHandler,
  device: Option<&DeviceContext>,
  level: Level,
  message: &str,
) {
  log::log!(level, "{}", message);
  handler.on_event(&mut Event::log(message), device);
}
