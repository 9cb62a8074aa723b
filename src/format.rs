use std::fmt;

use crate::asio::SampleType;

/// Sample encodings exposed to clients. Everything that is not little-endian 32-bit integer or
/// IEEE float is `Unknown`; buffers are passed through unconverted either way.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SampleFormat {
  Int32,
  Float32,
  Float64,
  Unknown,
}

impl fmt::Display for SampleFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      SampleFormat::Int32 => write!(f, "Int32"),
      SampleFormat::Float32 => write!(f, "Float32"),
      SampleFormat::Float64 => write!(f, "Float64"),
      SampleFormat::Unknown => write!(f, "Unknown"),
    }
  }
}

impl From<SampleType> for SampleFormat {
  fn from(value: SampleType) -> Self {
    match value {
      SampleType::Int32Lsb => SampleFormat::Int32,
      SampleType::Float32Lsb => SampleFormat::Float32,
      SampleType::Float64Lsb => SampleFormat::Float64,
      _ => SampleFormat::Unknown,
    }
  }
}

/// Client-facing format for a raw sample type code.
pub fn sample_format(code: i32) -> SampleFormat {
  SampleType::try_from(code)
    .map(SampleFormat::from)
    .unwrap_or(SampleFormat::Unknown)
}

/// Bytes per sample, or `None` for encodings without a fixed byte width (DSD, unknown codes).
pub fn byte_width(sample_type: SampleType) -> Option<usize> {
  use SampleType::*;

  match sample_type {
    Int16Lsb | Int16Msb => Some(2),
    Int24Lsb | Int24Msb => Some(3),
    Int32Lsb | Int32Msb | Float32Lsb | Float32Msb | Int32Lsb16 | Int32Lsb18 | Int32Lsb20
    | Int32Lsb24 | Int32Msb16 | Int32Msb18 | Int32Msb20 | Int32Msb24 => Some(4),
    Float64Lsb | Float64Msb => Some(8),
    DsdInt8Lsb1 | DsdInt8Msb1 | DsdInt8Ner8 => None,
  }
}

/// Byte width for a raw sample type code.
pub fn byte_width_of_code(code: i32) -> Option<usize> {
  SampleType::try_from(code).ok().and_then(byte_width)
}

/// Length in bytes of one channel's half buffer; 0 when the width is unsupported.
pub fn buffer_byte_length(samples: usize, code: i32) -> usize {
  byte_width_of_code(code).map_or(0, |width| samples * width)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn widths_follow_the_table() {
    assert_eq!(byte_width(SampleType::Int16Lsb), Some(2));
    assert_eq!(byte_width(SampleType::Int24Msb), Some(3));
    assert_eq!(byte_width(SampleType::Int32Lsb), Some(4));
    assert_eq!(byte_width(SampleType::Int32Msb20), Some(4));
    assert_eq!(byte_width(SampleType::Float32Lsb), Some(4));
    assert_eq!(byte_width(SampleType::Float64Lsb), Some(8));
    assert_eq!(byte_width(SampleType::Float64Msb), Some(8));
  }

  #[test]
  fn unsupported_types_have_no_width() {
    assert_eq!(byte_width(SampleType::DsdInt8Ner8), None);
    assert_eq!(byte_width_of_code(-3), None);
    assert_eq!(byte_width_of_code(1234), None);
    assert_eq!(buffer_byte_length(512, 1234), 0);
  }

  #[test]
  fn only_little_endian_formats_are_named() {
    assert_eq!(sample_format(SampleType::Int32Lsb.code()), SampleFormat::Int32);
    assert_eq!(sample_format(SampleType::Float32Lsb.code()), SampleFormat::Float32);
    assert_eq!(sample_format(SampleType::Float64Lsb.code()), SampleFormat::Float64);
    assert_eq!(sample_format(SampleType::Int32Msb.code()), SampleFormat::Unknown);
    assert_eq!(sample_format(SampleType::Int24Lsb.code()), SampleFormat::Unknown);
    assert_eq!(sample_format(99), SampleFormat::Unknown);
  }

  #[test]
  fn byte_length_is_samples_times_width() {
    for t in SampleType::ALL {
      let expected = byte_width(t).map_or(0, |w| 256 * w);
      assert_eq!(buffer_byte_length(256, t.code()), expected);
    }
  }
}
