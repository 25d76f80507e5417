//! Pipeline module - prompt expansion, batch querying and result persistence.

mod batch;
mod template;
mod writer;

pub use batch::*;
pub use template::*;
pub use writer::*;
