//! Cursor-based byte stream parser for reading class files back.
//!
//! [`Parser`] keeps a position inside a borrowed byte slice and offers bounds-checked,
//! big-endian reads. It is used by [`crate::classfile::reader`] to parse complete class files
//! and by [`crate::classfile::instruction`] to decode method bodies.
//!
//! # Examples
//!
//! ```rust
//! use hugeenum::Parser;
//!
//! let data = [0x00, 0x03, b'a', b'b', b'c'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_mutf8()?, "abc");
//! assert!(!parser.has_more_data());
//! # Ok::<(), hugeenum::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ClassIO},
    utils::mutf8,
    Error::OutOfBounds,
    Result,
};

/// A bounds-checked big-endian reader over a byte slice.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the buffer is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining from the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a type `T` from the current position in big-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Reads a slice of bytes of the specified length from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `length` bytes would exceed the data.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a `u2` length-prefixed modified UTF-8 string, the payload of `CONSTANT_Utf8`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the payload is truncated, or
    /// [`crate::Error::Malformed`] if it is not valid modified UTF-8.
    pub fn read_mutf8(&mut self) -> Result<String> {
        let length = self.read_be::<u16>()?;
        let bytes = self.read_bytes(usize::from(length))?;
        mutf8::decode(bytes)
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self.position.checked_add(length).ok_or(OutOfBounds)?;

        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn sequential_reads() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x33];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_be::<u32>().unwrap(), 0xCAFEBABE);
        assert_eq!(parser.read_be::<u16>().unwrap(), 0);
        assert_eq!(parser.read_be::<u16>().unwrap(), 51);
        assert!(!parser.has_more_data());
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn seek_and_advance() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut parser = Parser::new(&data);

        parser.advance_by(3).unwrap();
        assert_eq!(parser.read_be::<u8>().unwrap(), 0x04);

        parser.seek(1).unwrap();
        assert_eq!(parser.pos(), 1);
        parser.seek(4).unwrap();
        assert!(matches!(parser.seek(5), Err(Error::OutOfBounds)));
        assert!(matches!(parser.advance_by(1), Err(Error::OutOfBounds)));
    }

    #[test]
    fn read_bytes_bounds() {
        let data = [0x01, 0x02, 0x03];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert!(matches!(parser.read_bytes(2), Err(Error::OutOfBounds)));
        assert_eq!(parser.pos(), 2);
    }

    #[test]
    fn read_mutf8_with_nul() {
        let data = [0x00, 0x04, b'a', 0xC0, 0x80, b'b'];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_mutf8().unwrap(), "a\0b");
    }

    #[test]
    fn read_mutf8_truncated() {
        let data = [0x00, 0x05, b'a', b'b'];
        let mut parser = Parser::new(&data);

        assert!(matches!(parser.read_mutf8(), Err(Error::OutOfBounds)));
    }

    #[test]
    fn empty_input() {
        let parser = Parser::new(&[]);
        assert!(parser.is_empty());
        assert_eq!(parser.len(), 0);
    }
}
