//! Built-in job types.

pub mod sleep;

pub use self::sleep::{SleepHandler, SleepTask};
