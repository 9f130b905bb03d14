// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # hugeenum
//!
//! A generator for JVM enum class files with far more elements than `javac` can compile.
//!
//! A Java enum declares one `public static final` field per element and initializes all of
//! them in the static initializer. The JVM caps every method body at 65535 bytes and the
//! constant pool at 65535 entries, so a naively compiled enum stops fitting at roughly 2000 to
//! 3000 elements. `hugeenum` emits the class file directly and works around the limits with one
//! of several [`Strategy`] implementations, pushing the ceiling to 65410 elements.
//!
//! ## Features
//!
//! - **Three initialization strategies** - constant-dynamic entries, extracted construction
//!   methods and reflective stores through `sun.misc.Unsafe`
//! - **Hand-encoded bootstrap pool** - the constant-dynamic strategy lays out its symbol table
//!   by position so every element reference is known before the class is assembled
//! - **Structural limits checked up front** - oversized pools and method bodies are reported
//!   as typed errors, a truncated class file is never produced
//! - **Class file reader** - generated classes can be parsed back and disassembled for
//!   inspection and testing
//!
//! ## Quick Start
//!
//! ```rust
//! use hugeenum::prelude::*;
//!
//! let names = autogenerate_names(5000);
//! let class = Strategy::ExtractMethod.generate("com.example.Huge", &names)?;
//!
//! let parsed = ClassFile::parse(&class)?;
//! assert_eq!(parsed.class_name()?, "com/example/Huge");
//! assert_eq!(parsed.fields.len(), 5000 + 2);
//! # Ok::<(), hugeenum::Error>(())
//! ```
//!
//! ### Picking a strategy
//!
//! Strategies are registered under case-insensitive ids, see [`REGISTRY`] for their limits:
//!
//! ```rust
//! use hugeenum::{Strategy, REGISTRY};
//!
//! for info in &REGISTRY {
//!     println!("{:<14} {:>6}  {}", info.id, info.max_elements, info.description);
//! }
//!
//! let strategy = Strategy::from_id("condy")?;
//! assert_eq!(strategy, Strategy::ConDy);
//! # Ok::<(), hugeenum::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`generator`] - Strategies, the strategy registry and name validation
//! - [`classfile`] - Constant pool, bytecode assembly, stack map frames and a class file reader
//! - [`file`] - Big-endian byte readers and writers
//! - [`utils`] - Modified UTF-8 helpers
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust
//! use hugeenum::{Error, Strategy};
//!
//! let names = hugeenum::generator::names::autogenerate_names(20_000);
//! match Strategy::ConDy.generate("Huge", &names) {
//!     Ok(_) => unreachable!(),
//!     Err(Error::OversizedSymbolTable { count }) => println!("needs {count} pool slots"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//!
//! # Fuzz the class file reader
//! cargo +nightly fuzz run classfile --release
//! ```

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use hugeenum::prelude::*;
///
/// let strategy = Strategy::from_id("Unsafe")?;
/// let class = strategy.generate("Small", &autogenerate_names(3))?;
/// assert!(ClassFile::parse(&class).is_ok());
/// # Ok::<(), hugeenum::Error>(())
/// ```
pub mod prelude;

/// Big-endian byte input and output.
pub mod file;

/// Helpers shared across the crate.
pub mod utils;

/// JVM class file structures: constant pool, bytecode assembly and parsing.
///
/// # Key Types
///
/// - [`classfile::builder::ClassBuilder`] - Assembles a class file with deduplicated constants
/// - [`classfile::code::CodeEncoder`] - Emits bytecode, tracks stack depth and resolves labels
/// - [`classfile::reader::ClassFile`] - Parses a class file back for inspection
/// - [`classfile::instruction::decode_instructions`] - Disassembles a method body
pub mod classfile;

/// Enum generation strategies.
///
/// See [`Strategy`] for the entry point and [`REGISTRY`] for the available techniques.
pub mod generator;

/// `hugeenum` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `hugeenum` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Cursor over a byte slice, used to read class files back.
pub use file::parser::Parser;

/// A parsed class file.
///
/// # Example
///
/// ```rust
/// use hugeenum::{ClassFile, Strategy};
///
/// let bytes = Strategy::default().generate("Tiny", &["A".to_string()])?;
/// let class = ClassFile::parse(&bytes)?;
/// assert_eq!(class.major_version, 51);
/// # Ok::<(), hugeenum::Error>(())
/// ```
pub use classfile::reader::ClassFile;

/// Strategy selection and the registry of available strategies.
pub use generator::{Strategy, StrategyInfo, REGISTRY};
