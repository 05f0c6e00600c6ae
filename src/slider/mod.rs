//! Carousel autoplay and gesture coordination
//!
//! - `controller`: deterministic state machine over index, interaction and autoplay
//! - `driver`: tokio task that feeds it real timers and gesture events

pub mod controller;
pub mod driver;

pub use controller::{
    AppLifecycle, SliderConfig, SliderController, SliderEffect, SliderInput, SliderPhase,
    SliderState, DEFAULT_AUTOPLAY_INTERVAL, RESUME_DELAY,
};
pub use driver::{spawn, SliderHandle};
