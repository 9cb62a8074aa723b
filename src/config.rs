use num_integer::Integer;

use crate::asio::BufferSizeRange;
use crate::error::{Error, Result};

/// Per-channel-direction ceiling applied to whatever a driver reports.
pub const MAX_INPUT_CHANNELS: usize = 64;
pub const MAX_OUTPUT_CHANNELS: usize = 64;

/// Requests applied while a device is opened. The defaults keep the driver's own settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenOptions {
  /// Buffer size in samples; snapped to the driver's legal sizes. `None` uses the preferred size.
  pub buffer_size: Option<u32>,
  /// Sample rate to switch the driver to before creating buffers.
  pub sample_rate: Option<f64>,
  pub max_inputs: usize,
  pub max_outputs: usize,
}

impl Default for OpenOptions {
  fn default() -> Self {
    OpenOptions {
      buffer_size: None,
      sample_rate: None,
      max_inputs: MAX_INPUT_CHANNELS,
      max_outputs: MAX_OUTPUT_CHANNELS,
    }
  }
}

impl OpenOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn buffer_size(mut self, samples: u32) -> Self {
    self.buffer_size = Some(samples);
    self
  }

  pub fn sample_rate(mut self, rate: f64) -> Self {
    self.sample_rate = Some(rate);
    self
  }

  /// Open at most this many (input, output) channels. Values above the global ceiling are rejected.
  pub fn channels(mut self, inputs: usize, outputs: usize) -> Self {
    self.max_inputs = inputs;
    self.max_outputs = outputs;
    self
  }

  pub(crate) fn validate(&self) -> Result<()> {
    if self.max_inputs > MAX_INPUT_CHANNELS || self.max_outputs > MAX_OUTPUT_CHANNELS {
      return Err(Error::InvalidOption(format!(
        "at most {}/{} channels can be opened",
        MAX_INPUT_CHANNELS, MAX_OUTPUT_CHANNELS
      )));
    }
    if let Some(rate) = self.sample_rate {
      if !(rate.is_finite() && rate > 0.0) {
        return Err(Error::InvalidOption(format!("sample rate {} is not positive", rate)));
      }
    }
    if self.buffer_size == Some(0) {
      return Err(Error::InvalidOption("buffer size must not be zero".to_string()));
    }
    Ok(())
  }

  /// The buffer size to request from a driver reporting `range`.
  pub fn resolve_buffer_size(&self, range: &BufferSizeRange) -> i32 {
    match self.buffer_size {
      Some(requested) => snap_buffer_size(requested as i32, range),
      None => range.preferred,
    }
  }
}

/// Clamp `requested` into `range` and round it to the nearest size the driver accepts.
///
/// Granularity -1 means powers of two inside `min..=max`, ties going to the smaller size, and the
/// preferred size when no power of two fits; 0 means only the preferred size is legal
/// (`min == max` drivers report it that way too).
pub fn snap_buffer_size(requested: i32, range: &BufferSizeRange) -> i32 {
  if range.min >= range.max {
    return range.preferred;
  }
  let clamped = requested.clamp(range.min, range.max);
  match range.granularity {
    -1 => {
      let mut nearest: Option<i32> = None;
      let mut size = (range.min.max(1) as u32).next_power_of_two();
      while size <= range.max as u32 {
        let candidate = size as i32;
        if nearest.map_or(true, |n| (candidate - clamped).abs() < (n - clamped).abs()) {
          nearest = Some(candidate);
        }
        match size.checked_mul(2) {
          Some(next) => size = next,
          None => break,
        }
      }
      nearest.unwrap_or(range.preferred)
    }
    g if g > 0 => {
      let (steps, rem) = (clamped - range.min).div_rem(&g);
      let down = range.min + steps * g;
      let up = down + g;
      if rem * 2 >= g && up <= range.max {
        up
      } else {
        down
      }
    }
    _ => range.preferred,
  }
}
