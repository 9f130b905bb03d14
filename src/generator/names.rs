//! Type and element name handling.
//!
//! Generated enums are consumed from Java source, so every name has to be a legal Java
//! identifier and not a reserved word. Type names arrive in source form (`com.example.Color`)
//! and are converted to the internal form used inside class files (`com/example/Color`).

use std::collections::HashSet;

use unicode_general_category::{get_general_category, GeneralCategory};

use crate::{Error, Result};

/// Name of the synthetic field holding the array returned by `values()`.
pub const VALUES_FIELD: &str = "$VALUES";

/// Reserved words and literals that cannot be used as identifiers.
const RESERVED: &[&str] = &[
    "_",
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "void",
    "volatile",
    "while",
];

/// Letters, letter numbers, currency symbols and connector punctuation.
fn is_identifier_start(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::LetterNumber
            | GeneralCategory::CurrencySymbol
            | GeneralCategory::ConnectorPunctuation
    )
}

/// Characters ignored inside identifiers: format characters and the non-whitespace controls.
fn is_identifier_ignorable(c: char) -> bool {
    matches!(u32::from(c), 0..=0x08 | 0x0E..=0x1B | 0x7F..=0x9F)
        || get_general_category(c) == GeneralCategory::Format
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c)
        || is_identifier_ignorable(c)
        || matches!(
            get_general_category(c),
            GeneralCategory::DecimalNumber
                | GeneralCategory::NonspacingMark
                | GeneralCategory::SpacingMark
        )
}

/// Returns `true` if `identifier` is a legal Java identifier.
///
/// Characters are classified by Unicode general category the way `javac` does, and reserved
/// words and literals are rejected.
#[must_use]
pub fn is_valid_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    is_identifier_start(first) && chars.all(is_identifier_part) && !RESERVED.contains(&identifier)
}

/// Validates a single identifier.
///
/// # Errors
/// Returns [`crate::Error::InvalidIdentifier`] if `identifier` is not a legal Java identifier.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if is_valid_identifier(identifier) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(identifier.to_string()))
    }
}

/// Validates an element list against the identifier grammar, duplicates and `reserved`
/// synthetic member names.
///
/// # Errors
/// Returns [`crate::Error::InvalidIdentifier`] for the first illegal name, or
/// [`crate::Error::DuplicateIdentifier`] for the first name that occurs twice or collides
/// with a synthetic member.
pub fn validate_element_names(names: &[String], reserved: &[&str]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        validate_identifier(name)?;
        if reserved.contains(&name.as_str()) || !seen.insert(name.as_str()) {
            return Err(Error::DuplicateIdentifier(name.clone()));
        }
    }
    Ok(())
}

/// Returns every name in `names` that is not a legal identifier, in input order.
#[must_use]
pub fn invalid_names(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .filter(|name| !is_valid_identifier(name))
        .map(String::as_str)
        .collect()
}

/// Converts a source type name (`a.b.C`) into its internal form (`a/b/C`).
///
/// # Errors
/// Returns [`crate::Error::InvalidIdentifier`] if any dot-separated part is not a legal
/// identifier.
pub fn binary_type_name(type_name: &str) -> Result<String> {
    if !type_name.split('.').all(is_valid_identifier) {
        return Err(Error::InvalidIdentifier(type_name.to_string()));
    }
    Ok(type_name.replace('.', "/"))
}

/// Returns the simple name of a source or internal type name, the part after the last
/// separator.
#[must_use]
pub fn simple_name(type_name: &str) -> &str {
    type_name.rsplit(['.', '/']).next().unwrap_or(type_name)
}

/// Generates `count` element names `VALUE_00001`, `VALUE_00002`, ...
#[must_use]
pub fn autogenerate_names(count: usize) -> Vec<String> {
    (1..=count)
        .map(|number| format!("VALUE_{number:05}"))
        .collect()
}
