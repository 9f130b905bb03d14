//! Byte-level input and output for class files.
//!
//! - [`io`] - Big-endian conversion trait and bounds-checked readers
//! - [`parser`] - Cursor-based [`parser::Parser`] used when reading class files back
//! - [`writer`] - Append-only [`writer::ByteWriter`] used when serializing them

pub mod io;
pub mod parser;
pub mod writer;
