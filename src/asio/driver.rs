use crate::asio::sys::{AsioBufferInfo, AsioCallbacks, AsioChannelInfo, AsioSamples, AsioTimeStamp};
use crate::asio::types::BufferSizeRange;
use crate::asio::AsioRes;
use crate::types::DeviceId;

/// The entry points of one instantiated ASIO driver (`IASIO`).
///
/// `sample_position` and `output_ready` are called from the driver's own notification thread
/// and must not block or allocate. Everything else runs on the thread that owns the device.
pub trait AsioDriver: Send + Sync {
  /// `init`, with no system handle. Returns whether the driver accepted.
  fn init(&self) -> bool;

  fn driver_name(&self) -> String;

  fn driver_version(&self) -> i32;

  /// Text describing the driver's most recent failure.
  fn error_message(&self) -> String;

  fn start(&self) -> AsioRes<()>;

  fn stop(&self) -> AsioRes<()>;

  /// Number of (input, output) channels.
  fn channels(&self) -> AsioRes<(i32, i32)>;

  /// (input, output) latencies in samples.
  fn latencies(&self) -> AsioRes<(i32, i32)>;

  fn buffer_size(&self) -> AsioRes<BufferSizeRange>;

  fn can_sample_rate(&self, rate: f64) -> AsioRes<()>;

  fn sample_rate(&self) -> AsioRes<f64>;

  fn set_sample_rate(&self, rate: f64) -> AsioRes<()>;

  fn sample_position(&self) -> AsioRes<(AsioSamples, AsioTimeStamp)>;

  /// Fill in `info`; `channel` and `is_input` select the channel.
  fn channel_info(&self, info: &mut AsioChannelInfo) -> AsioRes<()>;

  /// Allocate double buffers for every entry in `infos`, writing the addresses back into them.
  ///
  /// # Safety
  ///
  /// The driver keeps a pointer to `callbacks` and may call through it from its own threads
  /// until `dispose_buffers` returns. The slot the callbacks route to must already be bound.
  unsafe fn create_buffers(
    &self,
    infos: &mut [AsioBufferInfo],
    buffer_size: i32,
    callbacks: &'static AsioCallbacks,
  ) -> AsioRes<()>;

  fn dispose_buffers(&self) -> AsioRes<()>;

  fn control_panel(&self) -> AsioRes<()>;

  fn output_ready(&self) -> AsioRes<()>;
}

/// Process-level services around the drivers: apartment setup, discovery and instantiation.
pub trait Platform: Send + Sync {
  fn activate(&self) -> AsioRes<()>;

  fn deactivate(&self);

  /// All installed drivers. A missing registry root is an empty list, not an error.
  fn enumerate(&self) -> AsioRes<Vec<DeviceId>>;

  fn instantiate(&self, id: &DeviceId) -> AsioRes<Box<dyn AsioDriver>>;
}
