// Module audio - Backend CPAL, horloge et callback temps-réel

pub mod dsp_utils;
pub mod engine;
pub mod format_conversion;
pub mod parameters;
pub mod timing;
