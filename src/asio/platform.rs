use crate::asio::driver::{AsioDriver, Platform};
use crate::asio::AsioRes;
use crate::types::DeviceId;

/// The host's own driver registry and activation facility.
///
/// On Windows drivers are listed under `HKEY_LOCAL_MACHINE\SOFTWARE\ASIO` and created through
/// COM. Elsewhere there are no drivers to find.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPlatform;

#[cfg(windows)]
mod imp {
  use std::ffi::c_void;

  use log::{debug, trace, warn};
  use widestring::{U16CStr, U16CString};
  use windows::core::{w, GUID, PCWSTR};
  use windows::Win32::Foundation::{ERROR_NO_MORE_ITEMS, ERROR_SUCCESS};
  use windows::Win32::System::Com::{
    CLSIDFromString, CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED,
  };
  use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyW, RegGetValueW, RegOpenKeyW, HKEY, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ,
  };

  use super::*;
  use crate::asio::com::ComDriver;
  use crate::asio::AsioError;
  use crate::types::ClassId;

  const MAX_REGKEY_LENGTH: usize = 512;
  const MAX_REGVALUE_LENGTH: usize = 512;

  impl Platform for SystemPlatform {
    // Drivers expect to be created and driven from a single-threaded apartment.
    fn activate(&self) -> AsioRes<()> {
      unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok()?;
      debug!("entered COM apartment for driver hosting");
      Ok(())
    }

    fn deactivate(&self) {
      unsafe { CoUninitialize() };
      debug!("left COM apartment");
    }

    fn enumerate(&self) -> AsioRes<Vec<DeviceId>> {
      let mut asio_key = HKEY::default();
      let status = unsafe { RegOpenKeyW(HKEY_LOCAL_MACHINE, w!("SOFTWARE\\ASIO"), &mut asio_key) };
      if status != ERROR_SUCCESS {
        debug!("no ASIO registry root ({:?})", status);
        return Ok(Vec::new());
      }

      let mut ids = Vec::new();
      let mut index = 0;
      loop {
        let mut key_name = [0u16; MAX_REGKEY_LENGTH + 1];
        let status = unsafe { RegEnumKeyW(asio_key, index, Some(&mut key_name[..MAX_REGKEY_LENGTH])) };
        index += 1;
        if status == ERROR_NO_MORE_ITEMS {
          break;
        }
        if status != ERROR_SUCCESS {
          warn!("unknown registry key enumeration error {:?}", status);
          break;
        }
        match read_driver_entry(asio_key, PCWSTR(key_name.as_ptr())) {
          Ok(id) => {
            trace!("found driver {} {}", id.name, id.class_id);
            ids.push(id);
          }
          Err(err) => warn!("skipping unreadable driver entry: {}", err),
        }
      }
      unsafe {
        let _ = RegCloseKey(asio_key);
      }
      Ok(ids)
    }

    fn instantiate(&self, id: &DeviceId) -> AsioRes<Box<dyn AsioDriver>> {
      let driver = ComDriver::instantiate(GUID::from_u128(id.class_id.0))?;
      Ok(Box::new(driver))
    }
  }

  fn read_driver_entry(asio_key: HKEY, subkey: PCWSTR) -> AsioRes<DeviceId> {
    let clsid = read_string_value(asio_key, subkey, w!("CLSID"))?;
    let name = read_string_value(asio_key, subkey, w!("Description"))?;
    let clsid = U16CString::from_str(&clsid)
      .map_err(|_| AsioError::Unavailable(format!("malformed CLSID for {}", name)))?;
    let guid = unsafe { CLSIDFromString(PCWSTR(clsid.as_ptr()))? };
    Ok(DeviceId::new(ClassId(guid.to_u128()), name))
  }

  fn read_string_value(key: HKEY, subkey: PCWSTR, value: PCWSTR) -> AsioRes<String> {
    let mut buffer = [0u16; MAX_REGVALUE_LENGTH + 1];
    let mut len = (MAX_REGVALUE_LENGTH * 2) as u32;
    let status = unsafe {
      RegGetValueW(
        key,
        subkey,
        value,
        RRF_RT_REG_SZ,
        None,
        Some(buffer.as_mut_ptr() as *mut c_void),
        Some(&mut len),
      )
    };
    if status != ERROR_SUCCESS {
      return Err(AsioError::Unavailable(format!(
        "registry value read failed ({:?})",
        status
      )));
    }
    let text = U16CStr::from_slice_truncate(&buffer)
      .map_err(|_| AsioError::Unavailable("unterminated registry string".to_string()))?;
    Ok(text.to_string_lossy())
  }
}

#[cfg(not(windows))]
impl Platform for SystemPlatform {
  fn activate(&self) -> AsioRes<()> {
    Ok(())
  }

  fn deactivate(&self) {}

  fn enumerate(&self) -> AsioRes<Vec<DeviceId>> {
    log::debug!("ASIO drivers are only registered on Windows");
    Ok(Vec::new())
  }

  fn instantiate(&self, id: &DeviceId) -> AsioRes<Box<dyn AsioDriver>> {
    Err(crate::asio::AsioError::Unavailable(format!(
      "cannot instantiate {} outside Windows",
      id.name
    )))
  }
}
