pub mod artifacts;
pub mod config;
pub mod confirm;
pub mod dashboard;
pub mod driver;
pub mod error;
pub mod resolution;
pub mod runlog;
pub mod selectors;
pub mod session;
pub mod workflow;

pub use error::{Error, Result};
