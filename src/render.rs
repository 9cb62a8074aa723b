use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};

use dasp::Sample;

use crate::event::BufferSwitch;
use crate::format::SampleFormat;

/// A sine generator that writes straight into a device's output buffers.
///
/// Every output channel gets the same signal. Phase carries over between buffer switches and
/// is kept in an atomic, so a renderer can be shared with a callback.
#[derive(Debug)]
pub struct ToneRenderer {
  frequency: f64,
  amplitude: f64,
  /// Position within the current period, in samples, as `f64` bits.
  phase: AtomicU64,
}

impl ToneRenderer {
  pub fn new(frequency: f64, amplitude: f64) -> Self {
    ToneRenderer {
      frequency,
      amplitude: amplitude.clamp(0.0, 1.0),
      phase: AtomicU64::new(0.0f64.to_bits()),
    }
  }

  pub fn frequency(&self) -> f64 {
    self.frequency
  }

  /// Fill every output of `switch` with the next buffer of the tone.
  ///
  /// Outputs in a format the renderer cannot encode are silenced.
  pub fn render(&self, switch: &mut BufferSwitch<'_>, sample_rate: f64) {
    let period = sample_rate / self.frequency;
    if !(period.is_finite() && period > 0.0) {
      switch.silence_outputs();
      return;
    }
    let frames = switch.frames();
    match switch.sample_format() {
      SampleFormat::Int32 => {
        self.write(switch, frames, period, |v| v.to_sample::<i32>().to_le_bytes())
      }
      SampleFormat::Float32 => {
        self.write(switch, frames, period, |v| v.to_sample::<f32>().to_le_bytes())
      }
      SampleFormat::Float64 => self.write(switch, frames, period, |v| v.to_le_bytes()),
      SampleFormat::Unknown => switch.silence_outputs(),
    }
  }

  fn write<const W: usize>(
    &self,
    switch: &mut BufferSwitch<'_>,
    frames: usize,
    period: f64,
    encode: impl Fn(f64) -> [u8; W],
  ) {
    let start = f64::from_bits(self.phase.load(Ordering::Relaxed));
    for channel in 0..switch.num_outputs() {
      let Some(buffer) = switch.output(channel) else {
        continue;
      };
      let mut position = start;
      for frame in buffer.chunks_exact_mut(W).take(frames) {
        let value = self.amplitude * (position * TAU / period).sin();
        frame.copy_from_slice(&encode(value));
        position = (position + 1.0) % period;
      }
    }
    let end = (start + frames as f64) % period;
    self.phase.store(end.to_bits(), Ordering::Relaxed);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::{BufferLayout, BufferPtr, TimeInfo};
  use std::ffi::c_void;

  fn switch_over(outputs: &[BufferPtr], frames: usize, sample_format: SampleFormat) -> BufferSwitch<'_> {
    let width = match sample_format {
      SampleFormat::Float64 => 8,
      SampleFormat::Unknown => 3,
      _ => 4,
    };
    let layout = BufferLayout {
      frames,
      byte_length: frames * width,
      sample_format,
    };
    BufferSwitch::new(0, true, TimeInfo::default(), &[], outputs, layout)
  }

  #[test]
  fn writes_int32_sine_to_every_output() {
    let mut left = vec![0u8; 16];
    let mut right = vec![0u8; 16];
    let outputs = [
      BufferPtr(left.as_mut_ptr() as *mut c_void),
      BufferPtr(right.as_mut_ptr() as *mut c_void),
    ];
    let tone = ToneRenderer::new(12000.0, 0.5);
    tone.render(&mut switch_over(&outputs, 4, SampleFormat::Int32), 48000.0);

    let samples: Vec<i32> = left
      .chunks_exact(4)
      .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
      .collect();
    assert_eq!(samples[0], 0);
    assert!(samples[1] > 1 << 29);
    assert!(samples[3] < -(1 << 29));
    assert_eq!(left, right);
  }

  #[test]
  fn phase_continues_across_switches() {
    let mut buffer = vec![0u8; 8];
    let outputs = [BufferPtr(buffer.as_mut_ptr() as *mut c_void)];
    let tone = ToneRenderer::new(12000.0, 1.0);
    tone.render(&mut switch_over(&outputs, 2, SampleFormat::Float32), 48000.0);
    tone.render(&mut switch_over(&outputs, 2, SampleFormat::Float32), 48000.0);
    let third = f32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
    assert!(third.abs() < 1e-5);
    let fourth = f32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]);
    assert!((fourth + 1.0).abs() < 1e-5);
  }

  #[test]
  fn unknown_formats_are_silenced() {
    let mut buffer = vec![0xABu8; 12];
    let outputs = [BufferPtr(buffer.as_mut_ptr() as *mut c_void)];
    ToneRenderer::new(440.0, 1.0).render(&mut switch_over(&outputs, 4, SampleFormat::Unknown), 48000.0);
    assert!(buffer.iter().all(|&b| b == 0));
  }
}
