use thiserror::Error;

use crate::asio::sys::{self, AsioLong};

/// Error codes returned by ASIO driver calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsioError {
  #[error("hardware input or output is not present or available")]
  NotPresent,
  #[error("hardware is malfunctioning")]
  HwMalfunction,
  #[error("input parameter invalid")]
  InvalidParameter,
  #[error("hardware is in a bad mode or used in a bad mode")]
  InvalidMode,
  #[error("hardware is not running when sample position is inquired")]
  SpNotAdvancing,
  #[error("sample clock or rate cannot be determined or is not present")]
  NoClock,
  #[error("not enough memory for completing the request")]
  NoMemory,
  #[error("driver returned unknown error code {0}")]
  Unknown(AsioLong),
  #[error("unknown sample type code {0}")]
  UnknownSampleType(AsioLong),
  #[error("driver is not available: {0}")]
  Unavailable(String),
}

impl AsioError {
  /// Interpret a raw `ASIOError` return value.
  pub fn check(code: AsioLong) -> Result<(), AsioError> {
    match code {
      sys::ASE_OK | sys::ASE_SUCCESS => Ok(()),
      sys::ASE_NotPresent => Err(AsioError::NotPresent),
      sys::ASE_HWMalfunction => Err(AsioError::HwMalfunction),
      sys::ASE_InvalidParameter => Err(AsioError::InvalidParameter),
      sys::ASE_InvalidMode => Err(AsioError::InvalidMode),
      sys::ASE_SPNotAdvancing => Err(AsioError::SpNotAdvancing),
      sys::ASE_NoClock => Err(AsioError::NoClock),
      sys::ASE_NoMemory => Err(AsioError::NoMemory),
      x => Err(AsioError::Unknown(x)),
    }
  }

  /// The raw code a driver would have returned for this error.
  pub fn code(&self) -> AsioLong {
    match self {
      AsioError::NotPresent | AsioError::Unavailable(_) => sys::ASE_NotPresent,
      AsioError::HwMalfunction => sys::ASE_HWMalfunction,
      AsioError::InvalidParameter | AsioError::UnknownSampleType(_) => sys::ASE_InvalidParameter,
      AsioError::InvalidMode => sys::ASE_InvalidMode,
      AsioError::SpNotAdvancing => sys::ASE_SPNotAdvancing,
      AsioError::NoClock => sys::ASE_NoClock,
      AsioError::NoMemory => sys::ASE_NoMemory,
      AsioError::Unknown(x) => *x,
    }
  }
}

#[cfg(windows)]
impl From<windows::core::Error> for AsioError {
  fn from(err: windows::core::Error) -> Self {
    AsioError::Unavailable(err.to_string())
  }
}
