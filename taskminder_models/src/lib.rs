pub mod settings;
pub mod task;

pub use chrono;
