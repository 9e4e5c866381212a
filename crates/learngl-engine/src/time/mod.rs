//! Time subsystem.
//!
//! One `FrameClock` per render loop; call `tick()` once per presented frame.
//! `FrameTime::elapsed` is the "seconds since startup" animation source.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
