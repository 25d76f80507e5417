//! Chat-completion client and retry plumbing.

mod chat;
mod policy;

pub use chat::*;
pub use policy::*;
