//! Fixed table of routing slots.
//!
//! ASIO notifications carry no user pointer, so every open device is assigned one of
//! [MAX_OPEN_DEVICES] slots and hands its driver the callback table compiled for that slot.
//! Each entry point of that table reads the slot's binding and forwards to the router.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::asio::sys::{AsioBool, AsioCallbacks, AsioLong, AsioSampleRate, AsioTime};
use crate::device::DeviceContext;
use crate::router;

/// How many devices may be open at once, across all sessions of the process.
pub const MAX_OPEN_DEVICES: usize = 8;

static BOUND: [AtomicPtr<DeviceContext>; MAX_OPEN_DEVICES] =
  [const { AtomicPtr::new(ptr::null_mut()) }; MAX_OPEN_DEVICES];

static CLAIMED: [AtomicBool; MAX_OPEN_DEVICES] = [const { AtomicBool::new(false) }; MAX_OPEN_DEVICES];

static CALLBACKS: [AsioCallbacks; MAX_OPEN_DEVICES] = [
  callbacks_for::<0>(),
  callbacks_for::<1>(),
  callbacks_for::<2>(),
  callbacks_for::<3>(),
  callbacks_for::<4>(),
  callbacks_for::<5>(),
  callbacks_for::<6>(),
  callbacks_for::<7>(),
];

/// Exclusive ownership of one slot, released on drop.
#[derive(Debug)]
pub(crate) struct Slot {
  index: usize,
}

impl Slot {
  /// Reserve the lowest free slot.
  pub(crate) fn claim() -> Option<Slot> {
    (0..MAX_OPEN_DEVICES)
      .find(|&index| {
        CLAIMED[index]
          .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
          .is_ok()
      })
      .map(|index| Slot { index })
  }

  pub(crate) fn index(&self) -> usize {
    self.index
  }

  /// The callback table that routes to this slot.
  pub(crate) fn callbacks(&self) -> &'static AsioCallbacks {
    &CALLBACKS[self.index]
  }

  /// Publish `context` to notifications arriving on this slot.
  ///
  /// The caller keeps `context` alive and in place until [Slot::unbind] or drop.
  pub(crate) fn bind(&self, context: &DeviceContext) {
    BOUND[self.index].store(context as *const DeviceContext as *mut DeviceContext, Ordering::Release);
  }

  pub(crate) fn unbind(&self) {
    BOUND[self.index].store(ptr::null_mut(), Ordering::Release);
  }

  pub(crate) fn is_bound_to(&self, context: &DeviceContext) -> bool {
    ptr::eq(BOUND[self.index].load(Ordering::Acquire), context)
  }
}

impl Drop for Slot {
  fn drop(&mut self) {
    self.unbind();
    CLAIMED[self.index].store(false, Ordering::Release);
  }
}

/// The context bound to `slot`, if any.
///
/// # Safety
///
/// Only valid inside a driver notification for that slot: the owning device keeps the context
/// alive until its buffers are disposed, after which the driver sends nothing more.
pub(crate) unsafe fn bound<'a>(slot: usize) -> Option<&'a DeviceContext> {
  BOUND.get(slot)?.load(Ordering::Acquire).as_ref()
}

/// Whether a device is currently reachable through `slot`.
pub fn is_bound(slot: usize) -> bool {
  BOUND
    .get(slot)
    .is_some_and(|entry| !entry.load(Ordering::Acquire).is_null())
}

/// Occupancy of every slot.
pub fn bound_slots() -> [bool; MAX_OPEN_DEVICES] {
  std::array::from_fn(is_bound)
}

/// The callback table compiled for `slot`.
pub fn callbacks(slot: usize) -> Option<&'static AsioCallbacks> {
  CALLBACKS.get(slot)
}

const fn callbacks_for<const SLOT: usize>() -> AsioCallbacks {
  AsioCallbacks {
    buffer_switch: on_buffer_switch::<SLOT>,
    sample_rate_did_change: on_sample_rate_did_change::<SLOT>,
    asio_message: on_asio_message::<SLOT>,
    buffer_switch_time_info: on_buffer_switch_time_info::<SLOT>,
  }
}

extern "C" fn on_buffer_switch<const SLOT: usize>(half: AsioLong, direct_process: AsioBool) {
  router::buffer_switch(SLOT, half, direct_process);
}

extern "C" fn on_sample_rate_did_change<const SLOT: usize>(rate: AsioSampleRate) {
  router::sample_rate_changed(SLOT, rate);
}

extern "C" fn on_asio_message<const SLOT: usize>(
  selector: AsioLong,
  value: AsioLong,
  _message: *mut c_void,
  _opt: *mut f64,
) -> AsioLong {
  router::message(SLOT, selector, value)
}

extern "C" fn on_buffer_switch_time_info<const SLOT: usize>(
  params: *mut AsioTime,
  half: AsioLong,
  direct_process: AsioBool,
) -> *mut AsioTime {
  router::buffer_switch_time_info(SLOT, params, half, direct_process)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn claims_lowest_free_slot() {
    let a = Slot::claim().unwrap();
    let b = Slot::claim().unwrap();
    assert_eq!((a.index(), b.index()), (0, 1));
    drop(a);
    let c = Slot::claim().unwrap();
    assert_eq!(c.index(), 0);
  }

  #[test]
  #[serial]
  fn capacity_is_bounded() {
    let slots: Vec<Slot> = std::iter::from_fn(Slot::claim).take(MAX_OPEN_DEVICES + 1).collect();
    assert_eq!(slots.len(), MAX_OPEN_DEVICES);
    assert!(Slot::claim().is_none());
    drop(slots);
    assert!(Slot::claim().is_some());
  }

  #[test]
  #[serial]
  fn unclaimed_slots_route_nowhere() {
    assert_eq!(bound_slots(), [false; MAX_OPEN_DEVICES]);
    assert!(!is_bound(MAX_OPEN_DEVICES));
    assert!(unsafe { bound(3) }.is_none());
    assert!(callbacks(MAX_OPEN_DEVICES).is_none());
  }

  #[test]
  #[serial]
  fn every_slot_has_distinct_entry_points() {
    let first = callbacks(0).unwrap().buffer_switch as usize;
    for slot in 1..MAX_OPEN_DEVICES {
      assert_ne!(callbacks(slot).unwrap().buffer_switch as usize, first);
    }
  }

  #[test]
  #[serial]
  fn notifications_to_unbound_slots_are_ignored() {
    let table = callbacks(5).unwrap();
    (table.buffer_switch)(0, 1);
    (table.sample_rate_did_change)(44100.0);
    assert_eq!((table.asio_message)(2, 0, ptr::null_mut(), ptr::null_mut()), 2);
    let mut time = AsioTime::default();
    let returned = (table.buffer_switch_time_info)(&mut time, 1, 1);
    assert_eq!(returned, &mut time as *mut AsioTime);
  }
}
