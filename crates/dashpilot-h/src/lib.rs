//! Chromium implementation of the dashpilot [`Driver`](dashpilot_engine::driver::Driver),
//! speaking CDP through chromiumoxide.

pub mod cdp;
pub mod driver;

pub use driver::ChromiumDriver;
