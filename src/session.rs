use std::sync::Arc;

use log::Level;

use crate::asio::{Platform, SystemPlatform};
use crate::config::OpenOptions;
use crate::device::{Device, DeviceContext, UserData};
use crate::error::{Error, Result};
use crate::event::{Event, EventHandler};
use crate::types::DeviceId;
use crate::utils;

/// Process-level entry point: owns platform activation and the client callback.
///
/// Devices borrow the session, so it cannot be shut down while any of them is open.
pub struct Session {
  platform: Arc<dyn Platform>,
  handler: Arc<dyn EventHandler>,
  active: bool,
}

impl Session {
  /// Activate `platform` and register `callback` for every event of this session.
  pub fn init<F>(platform: Arc<dyn Platform>, callback: F) -> Result<Session>
  where
    F: Fn(&mut Event<'_>, Option<&DeviceContext>) + Send + Sync + 'static,
  {
    Self::with_handler(platform, Arc::new(callback))
  }

  /// [Session::init] on the installed ASIO drivers of this machine.
  pub fn system<F>(callback: F) -> Result<Session>
  where
    F: Fn(&mut Event<'_>, Option<&DeviceContext>) + Send + Sync + 'static,
  {
    Self::init(Arc::new(SystemPlatform), callback)
  }

  pub fn with_handler(platform: Arc<dyn Platform>, handler: Arc<dyn EventHandler>) -> Result<Session> {
    if let Err(err) = platform.activate() {
      utils::emit(
        &*handler,
        None,
        Level::Error,
        &format!("platform activation failed: {}", err),
      );
      return Err(Error::PlatformInit(err));
    }
    let session = Session {
      platform,
      handler,
      active: true,
    };
    session.log(Level::Info, "session initialised");
    Ok(session)
  }

  /// Deactivate the platform. Dropping the session does the same.
  pub fn shutdown(mut self) {
    self.deactivate();
  }

  fn deactivate(&mut self) {
    if self.active {
      self.active = false;
      self.log(Level::Info, "session shut down");
      self.platform.deactivate();
    }
  }

  /// Installed drivers, in registry order. A failed lookup is logged and yields no devices.
  pub fn enumerate_devices(&self) -> Vec<DeviceId> {
    match self.platform.enumerate() {
      Ok(devices) => {
        for device in &devices {
          self.log(Level::Debug, &format!("found driver {}", device));
        }
        devices
      }
      Err(err) => {
        self.log(Level::Error, &format!("driver enumeration failed: {}", err));
        Vec::new()
      }
    }
  }

  /// Open a device with its driver's own settings.
  pub fn open_device(&self, id: &DeviceId, user_data: Option<UserData>) -> Result<Device<'_>> {
    self.open_device_with(id, user_data, &OpenOptions::default())
  }

  pub fn open_device_with(
    &self,
    id: &DeviceId,
    user_data: Option<UserData>,
    options: &OpenOptions,
  ) -> Result<Device<'_>> {
    Device::open(self, id, user_data, options)
  }

  pub(crate) fn platform(&self) -> &dyn Platform {
    &*self.platform
  }

  pub(crate) fn handler(&self) -> &Arc<dyn EventHandler> {
    &self.handler
  }

  pub(crate) fn log(&self, level: Level, message: &str) {
    utils::emit(&*self.handler, None, level, message);
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    self.deactivate();
  }
}
