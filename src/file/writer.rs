//! Append-only big-endian byte sink used to serialize class files.
//!
//! [`ByteWriter`] is the counterpart of [`crate::file::parser::Parser`]. It only ever appends,
//! there is no seeking or patching, and [`ByteWriter::finish`] consumes the writer so the
//! finished buffer can be handed out exactly once. Fields whose length prefix is computed from a
//! `usize` go through [`ByteWriter::u2_len`] / [`ByteWriter::u4_len`], which refuse values that do
//! not fit rather than silently truncating them.

use crate::{file::io::ClassIO, utils::mutf8, Error, Result};

/// Maximum payload of a single `CONSTANT_Utf8` entry, in modified UTF-8 bytes.
pub const MAX_UTF8_LENGTH: usize = 0xFFFF;

/// Growable big-endian output buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        ByteWriter { data: Vec::new() }
    }

    /// Creates an empty writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a single byte.
    pub fn u1(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Appends a big-endian `u2`.
    pub fn u2(&mut self, value: u16) {
        self.write_be(value);
    }

    /// Appends a big-endian `u4`.
    pub fn u4(&mut self, value: u32) {
        self.write_be(value);
    }

    /// Appends any [`ClassIO`] primitive in big-endian order.
    pub fn write_be<T: ClassIO>(&mut self, value: T) {
        self.data.extend_from_slice(value.to_be_bytes().as_ref());
    }

    /// Appends raw bytes.
    pub fn bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Appends a count or length as `u2`.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if `value` exceeds 65535.
    pub fn u2_len(&mut self, value: usize) -> Result<()> {
        let value = u16::try_from(value)
            .map_err(|_| Error::EncodingFailure(format!("{value} does not fit into a u2")))?;
        self.u2(value);
        Ok(())
    }

    /// Appends a count or length as `u4`.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if `value` exceeds `u32::MAX`.
    pub fn u4_len(&mut self, value: usize) -> Result<()> {
        let value = u32::try_from(value)
            .map_err(|_| Error::EncodingFailure(format!("{value} does not fit into a u4")))?;
        self.u4(value);
        Ok(())
    }

    /// Appends a `u2` length prefix followed by the modified UTF-8 form of `value`.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if the encoded payload is longer than
    /// 65535 bytes. Nothing is written in that case.
    pub fn utf8(&mut self, value: &str) -> Result<()> {
        let length = mutf8::encoded_len(value);
        if length > MAX_UTF8_LENGTH {
            return Err(Error::EncodingFailure(format!(
                "string constant needs {length} bytes, the limit is {MAX_UTF8_LENGTH}"
            )));
        }

        self.u2_len(length)?;
        self.data.extend_from_slice(&mutf8::encode(value));
        Ok(())
    }

    /// Consumes the writer and returns the written bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}
