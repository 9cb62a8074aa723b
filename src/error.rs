use thiserror::Error;

use crate::asio::AsioError;

/// Failures reported by the session and device operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
  #[error("platform activation failed: {0}")]
  PlatformInit(AsioError),
  #[error("driver instantiation failed: {0}")]
  Open(AsioError),
  #[error("driver rejected initialisation: {0}")]
  Init(String),
  #[error("failed to create buffers: {0}")]
  BufferCreation(String),
  #[error("channel information query failed: {0}")]
  ChannelInfo(String),
  #[error("latency query failed: {0}")]
  LatencyQuery(String),
  #[error("driver call `{call}` failed: {source}")]
  Driver {
    call: &'static str,
    #[source]
    source: AsioError,
  },
  #[error("device is already {0}")]
  InvalidState(DeviceState),
  #[error("all {0} device slots are in use")]
  CapacityExceeded(usize),
  #[error("invalid open option: {0}")]
  InvalidOption(String),
}

/// Running state of an open device, reported by [Error::InvalidState].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceState {
  Started,
  Stopped,
}

impl std::fmt::Display for DeviceState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match *self {
      DeviceState::Started => write!(f, "started"),
      DeviceState::Stopped => write!(f, "stopped"),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
