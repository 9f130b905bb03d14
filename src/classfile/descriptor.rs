//! Field and method descriptor helpers.
//!
//! The code encoder needs to know how many operand stack and local variable slots a member
//! reference consumes and produces. `long` and `double` take two slots, everything else one,
//! and `void` none.

use crate::Result;

/// Descriptor of `java.lang.Object`.
pub const OBJECT: &str = "Ljava/lang/Object;";

/// Descriptor of `java.lang.String`.
pub const STRING: &str = "Ljava/lang/String;";

/// Descriptor of `java.lang.Class`.
pub const CLASS: &str = "Ljava/lang/Class;";

/// Returns the descriptor of the object type with the given internal name (`LName;`).
#[must_use]
pub fn object(internal_name: &str) -> String {
    format!("L{internal_name};")
}

/// Returns the descriptor of a one-dimensional array of `component` (`[component`).
#[must_use]
pub fn array_of(component: &str) -> String {
    format!("[{component}")
}

/// Builds a method descriptor from parameter and return descriptors.
#[must_use]
pub fn method(params: &[&str], ret: &str) -> String {
    let params_len: usize = params.iter().map(|p| p.len()).sum();
    let mut out = String::with_capacity(2 + ret.len() + params_len);
    out.push('(');
    for param in params {
        out.push_str(param);
    }
    out.push(')');
    out.push_str(ret);
    out
}

/// Slot size of a single field type descriptor.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `descriptor` is not exactly one field type.
pub fn field_slots(descriptor: &str) -> Result<u16> {
    let bytes = descriptor.as_bytes();
    let end = field_type_end(bytes, 0)?;
    if end != bytes.len() {
        return Err(malformed_error!("Trailing data in field descriptor '{}'", descriptor));
    }

    Ok(slots_of(bytes[0]))
}

/// Returns `(argument slots, return slots)` of a method descriptor.
///
/// The argument count does not include an implicit `this`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `descriptor` is not a valid method descriptor.
pub fn method_slots(descriptor: &str) -> Result<(u16, u16)> {
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(malformed_error!("Method descriptor '{}' lacks '('", descriptor));
    }

    let mut pos = 1;
    let mut args: u16 = 0;
    loop {
        match bytes.get(pos) {
            Some(b')') => break,
            Some(&first) => {
                pos = field_type_end(bytes, pos)?;
                args = args
                    .checked_add(slots_of(first))
                    .ok_or_else(|| malformed_error!("Too many arguments in '{}'", descriptor))?;
            }
            None => {
                return Err(malformed_error!("Method descriptor '{}' lacks ')'", descriptor));
            }
        }
    }

    pos += 1;
    let ret = match bytes.get(pos) {
        Some(b'V') if pos + 1 == bytes.len() => 0,
        Some(&first) => {
            if field_type_end(bytes, pos)? != bytes.len() {
                return Err(malformed_error!("Trailing data in method descriptor '{}'", descriptor));
            }
            slots_of(first)
        }
        None => {
            return Err(malformed_error!("Method descriptor '{}' lacks a return type", descriptor));
        }
    };

    Ok((args, ret))
}

fn slots_of(first: u8) -> u16 {
    match first {
        b'J' | b'D' => 2,
        _ => 1,
    }
}

fn field_type_end(bytes: &[u8], start: usize) -> Result<usize> {
    let mut pos = start;
    while bytes.get(pos) == Some(&b'[') {
        pos += 1;
    }

    match bytes.get(pos) {
        Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => Ok(pos + 1),
        Some(b'L') => {
            let semi = bytes[pos..]
                .iter()
                .position(|b| *b == b';')
                .ok_or_else(|| malformed_error!("Unterminated object type at {}", pos))?;
            if semi == 1 {
                return Err(malformed_error!("Empty class name at {}", pos));
            }
            Ok(pos + semi + 1)
        }
        Some(other) => Err(malformed_error!(
            "Invalid descriptor character '{}' at {}",
            char::from(*other),
            pos
        )),
        None => Err(malformed_error!("Truncated descriptor")),
    }
}
