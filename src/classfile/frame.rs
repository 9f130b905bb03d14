//! `StackMapTable` frames.
//!
//! Frames are recorded by the code encoder against absolute bytecode offsets and only turned
//! into the delta-encoded on-disk form when the attribute is written: the first frame stores
//! its offset as is, every later frame stores `offset - previous - 1`.

use crate::{file::writer::ByteWriter, Result};

/// A verification type as it appears in a stack map frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    /// Unusable slot
    Top,
    /// `int`, `short`, `char`, `byte` or `boolean`
    Integer,
    /// `float`
    Float,
    /// `double`, covers two slots
    Double,
    /// `long`, covers two slots
    Long,
    /// The `null` reference
    Null,
    /// `this` before the super constructor ran
    UninitializedThis,
    /// Reference to the class at the given Class constant
    Object(u16),
    /// Result of the `new` instruction at the given offset
    Uninitialized(u16),
}

impl VerificationType {
    fn write(self, writer: &mut ByteWriter) {
        match self {
            VerificationType::Top => writer.u1(0),
            VerificationType::Integer => writer.u1(1),
            VerificationType::Float => writer.u1(2),
            VerificationType::Double => writer.u1(3),
            VerificationType::Long => writer.u1(4),
            VerificationType::Null => writer.u1(5),
            VerificationType::UninitializedThis => writer.u1(6),
            VerificationType::Object(class) => {
                writer.u1(7);
                writer.u2(class);
            }
            VerificationType::Uninitialized(offset) => {
                writer.u1(8);
                writer.u2(offset);
            }
        }
    }
}

/// Frame content, independent of where it is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    /// Same locals as the previous frame, empty stack
    Same,
    /// Same locals as the previous frame, one stack item
    SameLocals1StackItem(VerificationType),
    /// Previous locals minus the last `k` (1 to 3), empty stack
    Chop(u8),
    /// Previous locals plus 1 to 3 more, empty stack
    Append(Vec<VerificationType>),
    /// Complete description of locals and stack
    Full {
        /// Local variable types
        locals: Vec<VerificationType>,
        /// Operand stack types
        stack: Vec<VerificationType>,
    },
}

impl StackMapFrame {
    /// Writes the frame with the given `offset_delta`.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] for chop and append frames outside 1 to 3
    /// entries, or oversized full frames.
    pub fn write(&self, offset_delta: u16, writer: &mut ByteWriter) -> Result<()> {
        match self {
            StackMapFrame::Same if offset_delta <= 63 => writer.u1(offset_delta as u8),
            StackMapFrame::Same => {
                writer.u1(251);
                writer.u2(offset_delta);
            }
            StackMapFrame::SameLocals1StackItem(item) if offset_delta <= 63 => {
                writer.u1(64 + offset_delta as u8);
                item.write(writer);
            }
            StackMapFrame::SameLocals1StackItem(item) => {
                writer.u1(247);
                writer.u2(offset_delta);
                item.write(writer);
            }
            StackMapFrame::Chop(count) => {
                if !(1..=3).contains(count) {
                    return Err(crate::Error::EncodingFailure(format!(
                        "chop frame removes {count} locals"
                    )));
                }
                writer.u1(251 - count);
                writer.u2(offset_delta);
            }
            StackMapFrame::Append(locals) => {
                if !(1..=3).contains(&locals.len()) {
                    return Err(crate::Error::EncodingFailure(format!(
                        "append frame adds {} locals",
                        locals.len()
                    )));
                }
                writer.u1(251 + locals.len() as u8);
                writer.u2(offset_delta);
                for local in locals {
                    local.write(writer);
                }
            }
            StackMapFrame::Full { locals, stack } => {
                writer.u1(255);
                writer.u2(offset_delta);
                writer.u2_len(locals.len())?;
                for local in locals {
                    local.write(writer);
                }
                writer.u2_len(stack.len())?;
                for item in stack {
                    item.write(writer);
                }
            }
        }
        Ok(())
    }
}

/// Writes the body of a `StackMapTable` attribute from frames at absolute offsets.
///
/// `frames` must be sorted by strictly increasing offset.
///
/// # Errors
/// Returns [`crate::Error::EncodingFailure`] if offsets are not strictly increasing or a frame
/// cannot be encoded.
pub fn write_stack_map_table(
    frames: &[(u16, StackMapFrame)],
    writer: &mut ByteWriter,
) -> Result<()> {
    writer.u2_len(frames.len())?;

    let mut previous: Option<u16> = None;
    for (offset, frame) in frames {
        let delta = match previous {
            None => *offset,
            Some(prev) if *offset > prev => offset - prev - 1,
            Some(prev) => {
                return Err(crate::Error::EncodingFailure(format!(
                    "stack map frame at {offset} does not follow frame at {prev}"
                )))
            }
        };
        frame.write(delta, writer)?;
        previous = Some(*offset);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn encode(frames: &[(u16, StackMapFrame)]) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        write_stack_map_table(frames, &mut writer).unwrap();
        writer.finish()
    }

    #[test]
    fn deltas() {
        let bytes = encode(&[
            (10, StackMapFrame::Same),
            (20, StackMapFrame::Same),
            (200, StackMapFrame::Same),
        ]);
        assert_eq!(bytes, vec![0, 3, 10, 9, 251, 0, 179]);
    }

    #[test]
    fn chop_and_append() {
        let bytes = encode(&[
            (5, StackMapFrame::Chop(3)),
            (9, StackMapFrame::Append(vec![VerificationType::Integer])),
            (70, StackMapFrame::Chop(1)),
        ]);
        assert_eq!(bytes, vec![0, 3, 248, 0, 5, 252, 0, 3, 1, 250, 0, 60]);
    }

    #[test]
    fn full_frame() {
        let bytes = encode(&[(
            31,
            StackMapFrame::Full {
                locals: vec![VerificationType::Object(0x0102), VerificationType::Integer],
                stack: vec![],
            },
        )]);
        assert_eq!(bytes, vec![0, 1, 255, 0, 31, 0, 2, 7, 1, 2, 1, 0, 0]);
    }

    #[test]
    fn same_locals_one_item() {
        let frame = StackMapFrame::SameLocals1StackItem(VerificationType::Null);
        let bytes = encode(&[(2, frame)]);
        assert_eq!(bytes, vec![0, 1, 66, 5]);
    }

    #[test]
    fn rejects_unordered_offsets() {
        let mut writer = ByteWriter::new();
        let frames = [(4, StackMapFrame::Same), (4, StackMapFrame::Same)];
        assert!(matches!(
            write_stack_map_table(&frames, &mut writer),
            Err(Error::EncodingFailure(_))
        ));
    }

    #[test]
    fn rejects_bad_chop() {
        let mut writer = ByteWriter::new();
        assert!(matches!(
            StackMapFrame::Chop(4).write(0, &mut writer),
            Err(Error::EncodingFailure(_))
        ));
    }
}
