//! Shared block I/O for all level formats

pub mod block;
pub mod diagnostics;
pub mod section;

pub use block::{Block, Endian, align_up, checked_count};
pub use diagnostics::{Decoded, Diagnostic};
pub(crate) use diagnostics::DiagnosticLog;
pub use section::Section;
