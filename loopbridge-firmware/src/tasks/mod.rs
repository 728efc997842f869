//! Embassy async tasks.
//!
//! Each task runs independently and communicates through the statics in
//! `channels`.

pub mod button;
pub mod controller;
pub mod indicator;
pub mod mqtt;
pub mod sampler;
pub mod scheduler;

pub use button::button_task;
pub use controller::controller_task;
pub use indicator::{mode_indicator_task, state_indicator_task};
pub use mqtt::mqtt_task;
pub use sampler::sampler_task;
pub use scheduler::publish_scheduler_task;
