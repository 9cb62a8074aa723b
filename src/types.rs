use std::fmt;

use crate::asio::SampleType;
use crate::format::SampleFormat;

/// A driver's COM class identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ClassId(pub u128);

impl fmt::Display for ClassId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let v = self.0;
    write!(
      f,
      "{{{:08X}-{:04X}-{:04X}-{:04X}-{:012X}}}",
      (v >> 96) as u32,
      (v >> 80) as u16,
      (v >> 64) as u16,
      (v >> 48) as u16,
      v & 0xFFFF_FFFF_FFFF
    )
  }
}

/// An installed driver as found by enumeration.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeviceId {
  pub class_id: ClassId,
  pub name: String,
}

impl DeviceId {
  pub fn new(class_id: ClassId, name: impl Into<String>) -> Self {
    DeviceId {
      class_id,
      name: name.into(),
    }
  }
}

impl fmt::Display for DeviceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.name, self.class_id)
  }
}

/// The negotiated state of an open device, as reported to clients.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceProperties {
  pub name: String,
  pub num_inputs: usize,
  pub num_outputs: usize,
  pub buffer_sample_length: usize,
  /// `buffer_sample_length` times the sample width, 0 when the width is unsupported.
  pub buffer_byte_length: usize,
  pub sample_format: SampleFormat,
  /// The vendor sample type behind `sample_format`, if the driver reported a known one.
  pub sample_type: Option<SampleType>,
  /// Sample rate observed at open time or at the last refresh.
  pub sample_rate: f64,
}

/// Metadata for one channel, read with `getChannelInfo` after buffers exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelDetails {
  pub channel: usize,
  pub is_input: bool,
  pub is_active: bool,
  pub group: i32,
  /// Raw sample type code; see [SampleType].
  pub sample_type: i32,
  pub name: String,
}

impl fmt::Display for ChannelDetails {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}:{} [{}], grp {}, {}, sampletype: {}",
      if self.is_input { "input" } else { "output" },
      self.channel,
      self.name,
      self.group,
      if self.is_active { "active" } else { "inactive" },
      self.sample_type
    )
  }
}
