// Format conversion for CPAL audio streams
//
// The engine renders mono f32 internally; the device may want f32, i16 or
// u16 frames with any channel count. Conversion happens at write time via
// CPAL's `FromSample` trait, allocation-free.

use cpal::{FromSample, Sample};

/// Write one mono f32 sample to every channel of an interleaved frame.
#[inline]
pub fn write_mono_to_interleaved_frame<T>(sample: f32, frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    let converted = T::from_sample(sample);
    for out in frame.iter_mut() {
        *out = converted;
    }
}
