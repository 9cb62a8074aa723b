use std::fmt;

use crate::asio::sys::{self, AsioLong};
use crate::asio::AsioError;

/// Sample encodings a driver can report for a channel, the `ASIOSampleType` enumeration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SampleType {
  Int16Msb,
  Int24Msb,
  Int32Msb,
  Float32Msb,
  Float64Msb,
  Int32Msb16,
  Int32Msb18,
  Int32Msb20,
  Int32Msb24,
  Int16Lsb,
  Int24Lsb,
  Int32Lsb,
  Float32Lsb,
  Float64Lsb,
  Int32Lsb16,
  Int32Lsb18,
  Int32Lsb20,
  Int32Lsb24,
  DsdInt8Lsb1,
  DsdInt8Msb1,
  DsdInt8Ner8,
}

impl SampleType {
  /// All sample types, in vendor code order.
  pub const ALL: [SampleType; 21] = [
    SampleType::Int16Msb,
    SampleType::Int24Msb,
    SampleType::Int32Msb,
    SampleType::Float32Msb,
    SampleType::Float64Msb,
    SampleType::Int32Msb16,
    SampleType::Int32Msb18,
    SampleType::Int32Msb20,
    SampleType::Int32Msb24,
    SampleType::Int16Lsb,
    SampleType::Int24Lsb,
    SampleType::Int32Lsb,
    SampleType::Float32Lsb,
    SampleType::Float64Lsb,
    SampleType::Int32Lsb16,
    SampleType::Int32Lsb18,
    SampleType::Int32Lsb20,
    SampleType::Int32Lsb24,
    SampleType::DsdInt8Lsb1,
    SampleType::DsdInt8Msb1,
    SampleType::DsdInt8Ner8,
  ];

  pub fn code(&self) -> AsioLong {
    match self {
      SampleType::Int16Msb => sys::ASIOSTInt16MSB,
      SampleType::Int24Msb => sys::ASIOSTInt24MSB,
      SampleType::Int32Msb => sys::ASIOSTInt32MSB,
      SampleType::Float32Msb => sys::ASIOSTFloat32MSB,
      SampleType::Float64Msb => sys::ASIOSTFloat64MSB,
      SampleType::Int32Msb16 => sys::ASIOSTInt32MSB16,
      SampleType::Int32Msb18 => sys::ASIOSTInt32MSB18,
      SampleType::Int32Msb20 => sys::ASIOSTInt32MSB20,
      SampleType::Int32Msb24 => sys::ASIOSTInt32MSB24,
      SampleType::Int16Lsb => sys::ASIOSTInt16LSB,
      SampleType::Int24Lsb => sys::ASIOSTInt24LSB,
      SampleType::Int32Lsb => sys::ASIOSTInt32LSB,
      SampleType::Float32Lsb => sys::ASIOSTFloat32LSB,
      SampleType::Float64Lsb => sys::ASIOSTFloat64LSB,
      SampleType::Int32Lsb16 => sys::ASIOSTInt32LSB16,
      SampleType::Int32Lsb18 => sys::ASIOSTInt32LSB18,
      SampleType::Int32Lsb20 => sys::ASIOSTInt32LSB20,
      SampleType::Int32Lsb24 => sys::ASIOSTInt32LSB24,
      SampleType::DsdInt8Lsb1 => sys::ASIOSTDSDInt8LSB1,
      SampleType::DsdInt8Msb1 => sys::ASIOSTDSDInt8MSB1,
      SampleType::DsdInt8Ner8 => sys::ASIOSTDSDInt8NER8,
    }
  }
}

impl fmt::Display for SampleType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl TryFrom<AsioLong> for SampleType {
  type Error = AsioError;

  fn try_from(value: AsioLong) -> Result<Self, Self::Error> {
    SampleType::ALL
      .into_iter()
      .find(|t| t.code() == value)
      .ok_or(AsioError::UnknownSampleType(value))
  }
}

/// Selectors a driver passes to the host's `asioMessage` callback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageSelector {
  SelectorSupported,
  EngineVersion,
  ResetRequest,
  BufferSizeChange,
  ResyncRequest,
  LatenciesChanged,
  SupportsTimeInfo,
  SupportsTimeCode,
  MmcCommand,
  SupportsInputMonitor,
  SupportsInputGain,
  SupportsInputMeter,
  SupportsOutputGain,
  SupportsOutputMeter,
  Overload,
}

impl fmt::Display for MessageSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl TryFrom<AsioLong> for MessageSelector {
  type Error = AsioLong;

  fn try_from(value: AsioLong) -> Result<Self, Self::Error> {
    let selector = match value {
      sys::kAsioSelectorSupported => Self::SelectorSupported,
      sys::kAsioEngineVersion => Self::EngineVersion,
      sys::kAsioResetRequest => Self::ResetRequest,
      sys::kAsioBufferSizeChange => Self::BufferSizeChange,
      sys::kAsioResyncRequest => Self::ResyncRequest,
      sys::kAsioLatenciesChanged => Self::LatenciesChanged,
      sys::kAsioSupportsTimeInfo => Self::SupportsTimeInfo,
      sys::kAsioSupportsTimeCode => Self::SupportsTimeCode,
      sys::kAsioMMCCommand => Self::MmcCommand,
      sys::kAsioSupportsInputMonitor => Self::SupportsInputMonitor,
      sys::kAsioSupportsInputGain => Self::SupportsInputGain,
      sys::kAsioSupportsInputMeter => Self::SupportsInputMeter,
      sys::kAsioSupportsOutputGain => Self::SupportsOutputGain,
      sys::kAsioSupportsOutputMeter => Self::SupportsOutputMeter,
      sys::kAsioOverload => Self::Overload,
      x => return Err(x),
    };
    Ok(selector)
  }
}

/// Buffer size limits reported by `getBufferSize`, in samples.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BufferSizeRange {
  pub min: i32,
  pub max: i32,
  pub preferred: i32,
  /// Step between legal sizes; -1 means powers of two between `min` and `max`.
  pub granularity: i32,
}

impl fmt::Display for BufferSizeRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "min/max/pref/gran: {}, {}, {}, {}",
      self.min, self.max, self.preferred, self.granularity
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sample_type_codes_round_trip() {
    for t in SampleType::ALL {
      assert_eq!(SampleType::try_from(t.code()), Ok(t));
    }
    assert_eq!(
      SampleType::try_from(5),
      Err(AsioError::UnknownSampleType(5))
    );
  }

  #[test]
  fn unknown_selector_returns_raw_value() {
    assert_eq!(MessageSelector::try_from(15), Ok(MessageSelector::Overload));
    assert_eq!(MessageSelector::try_from(99), Err(99));
  }
}
