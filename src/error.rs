use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is reported synchronously and no partially built class file is ever handed
/// back to the caller. Overflow conditions are detected while the artifact is assembled, so a
/// caller can retry with a different strategy or a smaller element list.
///
/// # Error Categories
///
/// ## Structural Limits
/// - [`Error::OversizedSymbolTable`] - Hand-encoded bootstrap class needs too many constants
/// - [`Error::OversizedRoutine`] - A method body exceeds the 65535 byte code limit
/// - [`Error::OversizedArtifact`] - Any other class-wide limit was exceeded
///
/// ## Input Validation
/// - [`Error::InvalidIdentifier`] - A type or element name is not a valid Java identifier
/// - [`Error::DuplicateIdentifier`] - Two elements (or an element and a synthetic member) collide
/// - [`Error::UnknownStrategy`] - No strategy is registered under the requested id
///
/// ## Encoding and Parsing
/// - [`Error::EncodingFailure`] - A value cannot be represented in its class-file field
/// - [`Error::UndefinedLabel`] / [`Error::DuplicateLabel`] - Branch target bookkeeping failed
/// - [`Error::Malformed`] - A class file being read back is corrupt
/// - [`Error::OutOfBounds`] - A read would run past the end of the input
///
/// # Examples
///
/// ```rust
/// use hugeenum::{Error, Strategy};
///
/// let names: Vec<String> = vec!["RED".into(), "GREEN".into()];
/// match Strategy::ExtractMethod.generate("com.example.Color", &names) {
///     Ok(bytes) => println!("generated {} bytes", bytes.len()),
///     Err(Error::OversizedRoutine { routine, size }) => {
///         eprintln!("{routine} would need {size} bytes of code");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The hand-encoded bootstrap class would need a constant pool count field above 65535.
    ///
    /// Raised before a single byte of the bootstrap class is written.
    ///
    /// # Fields
    ///
    /// * `count` - The constant pool count field the layout would have required
    #[error("Symbol table would need a count of {count}, the limit is 65535")]
    OversizedSymbolTable {
        /// Required constant pool count field value
        count: usize,
    },

    /// A method body grew beyond the 65535 byte limit on `code_length`.
    ///
    /// # Fields
    ///
    /// * `routine` - Name of the method that overflowed
    /// * `size` - Number of code bytes that were emitted
    #[error("Routine '{routine}' needs {size} bytes of code, the limit is 65535")]
    OversizedRoutine {
        /// Name of the overflowing method
        routine: String,
        /// Emitted code size in bytes
        size: usize,
    },

    /// The class file as a whole exceeded a structural limit.
    ///
    /// This covers the constant pool count, the number of fields, methods or
    /// bootstrap methods, and attribute lengths.
    #[error("Artifact exceeds class file limits - {0}")]
    OversizedArtifact(String),

    /// A type name or element name does not match the Java identifier grammar.
    #[error("Invalid identifier - '{0}'")]
    InvalidIdentifier(String),

    /// An element name was supplied twice, or collides with a synthetic member.
    #[error("Duplicate identifier - '{0}'")]
    DuplicateIdentifier(String),

    /// A value could not be encoded into its class-file representation.
    ///
    /// Typical causes are string constants whose modified UTF-8 form is longer
    /// than 65535 bytes, or counts that do not fit their length prefix.
    #[error("Encoding failure - {0}")]
    EncodingFailure(String),

    /// No generation strategy is registered under the requested identifier.
    #[error("Unknown strategy - '{0}'")]
    UnknownStrategy(String),

    /// A branch refers to a label that was never defined.
    #[error("Undefined label - '{0}'")]
    UndefinedLabel(String),

    /// The same label was defined twice in one method body.
    #[error("Duplicate label - '{0}'")]
    DuplicateLabel(String),

    /// The class file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,
}
