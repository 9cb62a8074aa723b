//! Raw ASIO ABI: the structures and constants a driver exchanges with its host.
//!
//! Layouts follow `asio.h`, which packs every structure to 4 bytes on Windows.
#![allow(non_upper_case_globals)]

use std::ffi::{c_char, c_void};

/// Windows `long`, 32 bits on every target the SDK supports.
pub type AsioLong = i32;
pub type AsioBool = AsioLong;
pub type AsioSampleRate = f64;

pub const ASIO_TRUE: AsioBool = 1;
pub const ASIO_FALSE: AsioBool = 0;

// ASIOError codes
pub const ASE_OK: AsioLong = 0;
pub const ASE_SUCCESS: AsioLong = 0x3f48_47a0;
pub const ASE_NotPresent: AsioLong = -1000;
pub const ASE_HWMalfunction: AsioLong = -999;
pub const ASE_InvalidParameter: AsioLong = -998;
pub const ASE_InvalidMode: AsioLong = -997;
pub const ASE_SPNotAdvancing: AsioLong = -996;
pub const ASE_NoClock: AsioLong = -995;
pub const ASE_NoMemory: AsioLong = -994;

// ASIOSampleType codes
pub const ASIOSTInt16MSB: AsioLong = 0;
pub const ASIOSTInt24MSB: AsioLong = 1;
pub const ASIOSTInt32MSB: AsioLong = 2;
pub const ASIOSTFloat32MSB: AsioLong = 3;
pub const ASIOSTFloat64MSB: AsioLong = 4;
pub const ASIOSTInt32MSB16: AsioLong = 8;
pub const ASIOSTInt32MSB18: AsioLong = 9;
pub const ASIOSTInt32MSB20: AsioLong = 10;
pub const ASIOSTInt32MSB24: AsioLong = 11;
pub const ASIOSTInt16LSB: AsioLong = 16;
pub const ASIOSTInt24LSB: AsioLong = 17;
pub const ASIOSTInt32LSB: AsioLong = 18;
pub const ASIOSTFloat32LSB: AsioLong = 19;
pub const ASIOSTFloat64LSB: AsioLong = 20;
pub const ASIOSTInt32LSB16: AsioLong = 24;
pub const ASIOSTInt32LSB18: AsioLong = 25;
pub const ASIOSTInt32LSB20: AsioLong = 26;
pub const ASIOSTInt32LSB24: AsioLong = 27;
pub const ASIOSTDSDInt8LSB1: AsioLong = 32;
pub const ASIOSTDSDInt8MSB1: AsioLong = 33;
pub const ASIOSTDSDInt8NER8: AsioLong = 40;

// asioMessage selectors
pub const kAsioSelectorSupported: AsioLong = 1;
pub const kAsioEngineVersion: AsioLong = 2;
pub const kAsioResetRequest: AsioLong = 3;
pub const kAsioBufferSizeChange: AsioLong = 4;
pub const kAsioResyncRequest: AsioLong = 5;
pub const kAsioLatenciesChanged: AsioLong = 6;
pub const kAsioSupportsTimeInfo: AsioLong = 7;
pub const kAsioSupportsTimeCode: AsioLong = 8;
pub const kAsioMMCCommand: AsioLong = 9;
pub const kAsioSupportsInputMonitor: AsioLong = 10;
pub const kAsioSupportsInputGain: AsioLong = 11;
pub const kAsioSupportsInputMeter: AsioLong = 12;
pub const kAsioSupportsOutputGain: AsioLong = 13;
pub const kAsioSupportsOutputMeter: AsioLong = 14;
pub const kAsioOverload: AsioLong = 15;

// AsioTimeInfo flags
pub const kSystemTimeValid: u32 = 1;
pub const kSamplePositionValid: u32 = 1 << 1;
pub const kSampleRateValid: u32 = 1 << 2;
pub const kSpeedValid: u32 = 1 << 3;
pub const kSampleRateChanged: u32 = 1 << 4;
pub const kClockSourceChanged: u32 = 1 << 5;

// ASIOTimeCode flags
pub const kTcValid: u32 = 1;
pub const kTcRunning: u32 = 1 << 1;
pub const kTcReverse: u32 = 1 << 2;
pub const kTcOnspeed: u32 = 1 << 3;
pub const kTcStill: u32 = 1 << 4;
pub const kTcSpeedValid: u32 = 1 << 8;

/// 64-bit sample count split into two 32-bit halves.
#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AsioSamples {
  pub hi: u32,
  pub lo: u32,
}

impl AsioSamples {
  pub fn from_u64(value: u64) -> Self {
    AsioSamples {
      hi: (value >> 32) as u32,
      lo: value as u32,
    }
  }

  pub fn to_u64(self) -> u64 {
    ((self.hi as u64) << 32) | self.lo as u64
  }
}

/// System time in nanoseconds, split into two 32-bit halves.
#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AsioTimeStamp {
  pub hi: u32,
  pub lo: u32,
}

impl AsioTimeStamp {
  pub fn from_u64(value: u64) -> Self {
    AsioTimeStamp {
      hi: (value >> 32) as u32,
      lo: value as u32,
    }
  }

  pub fn to_u64(self) -> u64 {
    ((self.hi as u64) << 32) | self.lo as u64
  }
}

#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug)]
pub struct AsioTimeInfo {
  pub speed: f64,
  pub system_time: AsioTimeStamp,
  pub sample_position: AsioSamples,
  pub sample_rate: AsioSampleRate,
  pub flags: u32,
  pub reserved: [c_char; 12],
}

#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug)]
pub struct AsioTimeCode {
  pub speed: f64,
  pub time_code_samples: AsioSamples,
  pub flags: u32,
  pub future: [c_char; 64],
}

#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug)]
pub struct AsioTime {
  pub reserved: [AsioLong; 4],
  pub time_info: AsioTimeInfo,
  pub time_code: AsioTimeCode,
}

impl Default for AsioTime {
  fn default() -> Self {
    AsioTime {
      reserved: [0; 4],
      time_info: AsioTimeInfo {
        speed: 0.0,
        system_time: AsioTimeStamp::default(),
        sample_position: AsioSamples::default(),
        sample_rate: 0.0,
        flags: 0,
        reserved: [0; 12],
      },
      time_code: AsioTimeCode {
        speed: 0.0,
        time_code_samples: AsioSamples::default(),
        flags: 0,
        future: [0; 64],
      },
    }
  }
}

/// One channel's double buffer, filled in by `createBuffers`.
#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug)]
pub struct AsioBufferInfo {
  pub is_input: AsioBool,
  pub channel_num: AsioLong,
  pub buffers: [*mut c_void; 2],
}

impl AsioBufferInfo {
  pub fn new(is_input: bool, channel_num: AsioLong) -> Self {
    AsioBufferInfo {
      is_input: if is_input { ASIO_TRUE } else { ASIO_FALSE },
      channel_num,
      buffers: [std::ptr::null_mut(); 2],
    }
  }
}

#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug)]
pub struct AsioChannelInfo {
  pub channel: AsioLong,
  pub is_input: AsioBool,
  pub is_active: AsioBool,
  pub channel_group: AsioLong,
  pub sample_type: AsioLong,
  pub name: [c_char; 32],
}

impl AsioChannelInfo {
  pub fn new(is_input: bool, channel: AsioLong) -> Self {
    AsioChannelInfo {
      channel,
      is_input: if is_input { ASIO_TRUE } else { ASIO_FALSE },
      is_active: ASIO_FALSE,
      channel_group: 0,
      sample_type: -1,
      name: [0; 32],
    }
  }
}

/// The host entry points handed to `createBuffers`. The driver keeps the pointer for as long
/// as the buffers exist, so tables passed to it must be `'static`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AsioCallbacks {
  pub buffer_switch: extern "C" fn(double_buffer_index: AsioLong, direct_process: AsioBool),
  pub sample_rate_did_change: extern "C" fn(rate: AsioSampleRate),
  pub asio_message:
    extern "C" fn(selector: AsioLong, value: AsioLong, message: *mut c_void, opt: *mut f64) -> AsioLong,
  pub buffer_switch_time_info: extern "C" fn(
    params: *mut AsioTime,
    double_buffer_index: AsioLong,
    direct_process: AsioBool,
  ) -> *mut AsioTime,
}

/// Decode a fixed-size, NUL-terminated `char` array as written by drivers.
pub fn c_chars_to_string(chars: &[c_char]) -> String {
  let bytes: Vec<u8> = chars
    .iter()
    .take_while(|&&c| c != 0)
    .map(|&c| c as u8)
    .collect();
  String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_counters_recombine() {
    let samples = AsioSamples { hi: 1, lo: 2 };
    assert_eq!(samples.to_u64(), (1u64 << 32) | 2);
    assert_eq!(AsioTimeStamp::from_u64(u64::MAX).to_u64(), u64::MAX);
  }

  #[test]
  fn channel_names_stop_at_nul() {
    let mut name = [0 as c_char; 32];
    for (dst, src) in name.iter_mut().zip(b"Out 1\0junk") {
      *dst = *src as c_char;
    }
    assert_eq!(c_chars_to_string(&name), "Out 1");
  }

  #[test]
  fn time_structures_match_sdk_packing() {
    assert_eq!(std::mem::size_of::<AsioTimeInfo>(), 8 + 8 + 8 + 8 + 4 + 12);
    assert_eq!(std::mem::size_of::<AsioTimeCode>(), 8 + 8 + 4 + 64);
    assert_eq!(std::mem::size_of::<AsioChannelInfo>(), 5 * 4 + 32);
  }
}
