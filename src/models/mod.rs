//! Core data models for bias-probe.

mod config;
mod error;
mod question;
mod record;

pub use config::*;
pub use error::*;
pub use question::*;
pub use record::*;
