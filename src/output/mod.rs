pub mod document;
pub mod legacy;
pub mod relational;

pub use document::{to_compact, to_document, to_pretty};
pub use relational::{to_rows, VerbIds};
