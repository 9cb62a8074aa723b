#![deny(clippy::all)]

//! Host-side client for ASIO audio drivers that can keep several devices open at once.
//!
//! A [Session] activates the platform and owns the client callback. Each [Device] opened from
//! it claims one of [MAX_OPEN_DEVICES] routing slots, so driver notifications (which carry no
//! context pointer) reach the right device.

pub mod asio;
mod config;
mod device;
mod error;
mod event;
mod format;
mod pool;
mod render;
mod router;
mod session;
mod types;
mod utils;

pub use crate::config::{snap_buffer_size, OpenOptions, MAX_INPUT_CHANNELS, MAX_OUTPUT_CHANNELS};
pub use crate::device::{Device, DeviceContext, UserData};
pub use crate::error::{DeviceState, Error, Result};
pub use crate::event::{
  BufferLayout, BufferSwitch, Event, EventHandler, EventKind, EventType, TimeInfo,
};
pub use crate::format::{buffer_byte_length, byte_width, sample_format, SampleFormat};
pub use crate::pool::{bound_slots, callbacks, is_bound, MAX_OPEN_DEVICES};
pub use crate::render::ToneRenderer;
pub use crate::router::{message_reply, Advisory, ENGINE_VERSION};
pub use crate::session::Session;
pub use crate::types::{ChannelDetails, ClassId, DeviceId, DeviceProperties};
