//! Modified UTF-8, the text encoding of `CONSTANT_Utf8` entries.
//!
//! It differs from standard UTF-8 in two ways: U+0000 is written as the two bytes
//! `C0 80`, and code points above U+FFFF are written as a UTF-16 surrogate pair with each
//! surrogate encoded as three bytes (six bytes in total).

use crate::Result;

/// Number of bytes `ch` occupies in modified UTF-8.
#[must_use]
pub fn char_len(ch: char) -> usize {
    match u32::from(ch) {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        0x0800..=0xFFFF => 3,
        _ => 6,
    }
}

/// Number of bytes `value` occupies in modified UTF-8.
#[must_use]
pub fn encoded_len(value: &str) -> usize {
    value.chars().map(char_len).sum()
}

/// Encodes `value` into modified UTF-8.
#[must_use]
pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    for ch in value.chars() {
        let code = u32::from(ch);
        match code {
            0x0001..=0x007F => out.push(code as u8),
            0x0000 | 0x0080..=0x07FF => push_two(&mut out, code),
            0x0800..=0xFFFF => push_three(&mut out, code),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    push_three(&mut out, u32::from(*unit));
                }
            }
        }
    }
    out
}

fn push_two(out: &mut Vec<u8>, code: u32) {
    out.push((0xC0 | ((code >> 6) & 0x1F)) as u8);
    out.push((0x80 | (code & 0x3F)) as u8);
}

fn push_three(out: &mut Vec<u8>, code: u32) {
    out.push((0xE0 | ((code >> 12) & 0x0F)) as u8);
    out.push((0x80 | ((code >> 6) & 0x3F)) as u8);
    out.push((0x80 | (code & 0x3F)) as u8);
}

/// Decodes a modified UTF-8 payload.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for truncated sequences, invalid lead bytes, a raw zero
/// byte, or unpaired surrogates.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let lead = bytes[pos];
        let unit = match lead {
            0x01..=0x7F => {
                pos += 1;
                u16::from(lead)
            }
            0xC0..=0xDF => {
                let next = continuation(bytes, pos + 1)?;
                pos += 2;
                (u16::from(lead & 0x1F) << 6) | u16::from(next)
            }
            0xE0..=0xEF => {
                let second = continuation(bytes, pos + 1)?;
                let third = continuation(bytes, pos + 2)?;
                pos += 3;
                (u16::from(lead & 0x0F) << 12) | (u16::from(second) << 6) | u16::from(third)
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid modified UTF-8 lead byte 0x{:02X} at {}",
                    lead,
                    pos
                ))
            }
        };
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| malformed_error!("Unpaired surrogate in modified UTF-8"))
}

fn continuation(bytes: &[u8], pos: usize) -> Result<u8> {
    match bytes.get(pos) {
        Some(byte) if byte & 0xC0 == 0x80 => Ok(byte & 0x3F),
        Some(byte) => Err(malformed_error!(
            "Invalid modified UTF-8 continuation byte 0x{:02X} at {}",
            byte,
            pos
        )),
        None => Err(malformed_error!("Truncated modified UTF-8 sequence")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn ascii_is_unchanged() {
        assert_eq!(encode("VALUE_00001"), b"VALUE_00001");
        assert_eq!(encoded_len("VALUE_00001"), 11);
    }

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(encode("a\0b"), vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(encoded_len("\0"), 2);
    }

    #[test]
    fn supplementary_uses_surrogate_pair() {
        let encoded = encode("\u{1F600}");
        assert_eq!(encoded, vec![0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]);
        assert_eq!(encoded_len("\u{1F600}"), 6);
    }

    #[test]
    fn decode_mixed() {
        let text = "Zähler\0日本\u{1F600}";
        let decoded = decode(&encode(text)).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn decode_rejects_raw_zero() {
        assert!(matches!(decode(&[0x41, 0x00]), Err(Error::Malformed { .. })));
    }

    #[test]
    fn decode_rejects_truncation() {
        assert!(matches!(decode(&[0xE6, 0x97]), Err(Error::Malformed { .. })));
    }
}
