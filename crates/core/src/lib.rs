//! Real-time facial expression monitoring.
//!
//! A camera session feeds frames to an expression detector at a fixed
//! cadence; per-frame expression scores are smoothed over a short moving
//! window and reduced to a dominant emotion readout.

pub mod capture;
pub mod expression;
pub mod overlay;
pub mod session;
pub mod shared;
