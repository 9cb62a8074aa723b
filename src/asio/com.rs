use std::ffi::{c_char, c_void};
use std::ptr::{self, NonNull};

use log::{debug, trace};
use windows::core::{IUnknown, Interface, GUID};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};
use windows_core::IUnknown_Vtbl;

use crate::asio::driver::AsioDriver;
use crate::asio::sys::{
  self, AsioBool, AsioBufferInfo, AsioCallbacks, AsioChannelInfo, AsioLong, AsioSampleRate,
  AsioSamples, AsioTimeStamp,
};
use crate::asio::types::BufferSizeRange;
use crate::asio::{AsioError, AsioRes};

// IASIO methods use `thiscall` on 32-bit Windows and the platform C convention elsewhere.
macro_rules! iasio_vtbl {
  ($($method:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
    #[repr(C)]
    #[allow(non_snake_case)]
    struct IAsioVtbl {
      base: IUnknown_Vtbl,
      $(
        #[cfg(target_arch = "x86")]
        $method: unsafe extern "thiscall" fn(this: *mut c_void $(, $arg: $ty)*) -> $ret,
        #[cfg(not(target_arch = "x86"))]
        $method: unsafe extern "C" fn(this: *mut c_void $(, $arg: $ty)*) -> $ret,
      )*
    }
  };
}

iasio_vtbl! {
  init(sys_handle: *mut c_void) -> AsioBool;
  getDriverName(name: *mut c_char) -> ();
  getDriverVersion() -> AsioLong;
  getErrorMessage(string: *mut c_char) -> ();
  start() -> AsioLong;
  stop() -> AsioLong;
  getChannels(num_inputs: *mut AsioLong, num_outputs: *mut AsioLong) -> AsioLong;
  getLatencies(input: *mut AsioLong, output: *mut AsioLong) -> AsioLong;
  getBufferSize(
    min: *mut AsioLong,
    max: *mut AsioLong,
    preferred: *mut AsioLong,
    granularity: *mut AsioLong
  ) -> AsioLong;
  canSampleRate(rate: AsioSampleRate) -> AsioLong;
  getSampleRate(rate: *mut AsioSampleRate) -> AsioLong;
  setSampleRate(rate: AsioSampleRate) -> AsioLong;
  getClockSources(clocks: *mut c_void, num_sources: *mut AsioLong) -> AsioLong;
  setClockSource(reference: AsioLong) -> AsioLong;
  getSamplePosition(samples: *mut AsioSamples, stamp: *mut AsioTimeStamp) -> AsioLong;
  getChannelInfo(info: *mut AsioChannelInfo) -> AsioLong;
  createBuffers(
    infos: *mut AsioBufferInfo,
    num_channels: AsioLong,
    buffer_size: AsioLong,
    callbacks: *const AsioCallbacks
  ) -> AsioLong;
  disposeBuffers() -> AsioLong;
  controlPanel() -> AsioLong;
  future(selector: AsioLong, opt: *mut c_void) -> AsioLong;
  outputReady() -> AsioLong;
}

/// An `IASIO` instance created through COM.
///
/// ASIO drivers reuse their class identifier as the interface identifier, so the driver is
/// created as a plain `IUnknown` and then queried for its own CLSID.
pub struct ComDriver {
  this: NonNull<*const IAsioVtbl>,
}

// Drivers are free-threaded by contract: notifications and host calls arrive on different threads.
unsafe impl Send for ComDriver {}
unsafe impl Sync for ComDriver {}

impl ComDriver {
  pub fn instantiate(class_id: GUID) -> AsioRes<ComDriver> {
    let unknown: IUnknown = unsafe { CoCreateInstance(&class_id, None, CLSCTX_INPROC_SERVER)? };
    let mut raw: *mut c_void = ptr::null_mut();
    unsafe { unknown.query(&class_id, &mut raw) }.ok()?;
    let this = NonNull::new(raw as *mut *const IAsioVtbl).ok_or(AsioError::NotPresent)?;
    debug!("instantiated driver {:?}", class_id);
    Ok(ComDriver { this })
  }

  fn vtbl(&self) -> &IAsioVtbl {
    unsafe { &**self.this.as_ptr() }
  }

  fn raw(&self) -> *mut c_void {
    self.this.as_ptr() as *mut c_void
  }
}

impl Drop for ComDriver {
  fn drop(&mut self) {
    let remaining = unsafe { (self.vtbl().base.Release)(self.raw()) };
    trace!("driver released, {} references remain", remaining);
  }
}

impl AsioDriver for ComDriver {
  fn init(&self) -> bool {
    unsafe { (self.vtbl().init)(self.raw(), ptr::null_mut()) == sys::ASIO_TRUE }
  }

  fn driver_name(&self) -> String {
    let mut name = [0 as c_char; 128];
    unsafe { (self.vtbl().getDriverName)(self.raw(), name.as_mut_ptr()) };
    sys::c_chars_to_string(&name)
  }

  fn driver_version(&self) -> i32 {
    unsafe { (self.vtbl().getDriverVersion)(self.raw()) }
  }

  fn error_message(&self) -> String {
    let mut message = [0 as c_char; 128];
    unsafe { (self.vtbl().getErrorMessage)(self.raw(), message.as_mut_ptr()) };
    sys::c_chars_to_string(&message)
  }

  fn start(&self) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().start)(self.raw()) })
  }

  fn stop(&self) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().stop)(self.raw()) })
  }

  fn channels(&self) -> AsioRes<(i32, i32)> {
    let (mut inputs, mut outputs) = (0, 0);
    AsioError::check(unsafe { (self.vtbl().getChannels)(self.raw(), &mut inputs, &mut outputs) })?;
    Ok((inputs, outputs))
  }

  fn latencies(&self) -> AsioRes<(i32, i32)> {
    let (mut input, mut output) = (0, 0);
    AsioError::check(unsafe { (self.vtbl().getLatencies)(self.raw(), &mut input, &mut output) })?;
    Ok((input, output))
  }

  fn buffer_size(&self) -> AsioRes<BufferSizeRange> {
    let mut range = BufferSizeRange::default();
    AsioError::check(unsafe {
      (self.vtbl().getBufferSize)(
        self.raw(),
        &mut range.min,
        &mut range.max,
        &mut range.preferred,
        &mut range.granularity,
      )
    })?;
    Ok(range)
  }

  fn can_sample_rate(&self, rate: f64) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().canSampleRate)(self.raw(), rate) })
  }

  fn sample_rate(&self) -> AsioRes<f64> {
    let mut rate = 0.0;
    AsioError::check(unsafe { (self.vtbl().getSampleRate)(self.raw(), &mut rate) })?;
    Ok(rate)
  }

  fn set_sample_rate(&self, rate: f64) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().setSampleRate)(self.raw(), rate) })
  }

  fn sample_position(&self) -> AsioRes<(AsioSamples, AsioTimeStamp)> {
    let mut samples = AsioSamples::default();
    let mut stamp = AsioTimeStamp::default();
    AsioError::check(unsafe {
      (self.vtbl().getSamplePosition)(self.raw(), &mut samples, &mut stamp)
    })?;
    Ok((samples, stamp))
  }

  fn channel_info(&self, info: &mut AsioChannelInfo) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().getChannelInfo)(self.raw(), info) })
  }

  unsafe fn create_buffers(
    &self,
    infos: &mut [AsioBufferInfo],
    buffer_size: i32,
    callbacks: &'static AsioCallbacks,
  ) -> AsioRes<()> {
    AsioError::check((self.vtbl().createBuffers)(
      self.raw(),
      infos.as_mut_ptr(),
      infos.len() as AsioLong,
      buffer_size,
      callbacks,
    ))
  }

  fn dispose_buffers(&self) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().disposeBuffers)(self.raw()) })
  }

  fn control_panel(&self) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().controlPanel)(self.raw()) })
  }

  fn output_ready(&self) -> AsioRes<()> {
    AsioError::check(unsafe { (self.vtbl().outputReady)(self.raw()) })
  }
}
