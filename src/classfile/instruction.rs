//! Linear bytecode decoder.
//!
//! Decodes a method body into [`Instruction`]s front to back. Used by the inspection tooling
//! and by tests that check generated bodies instruction by instruction. Switch instructions
//! are never emitted by the generators and are rejected.

use std::fmt;

use crate::{classfile::opcodes, file::parser::Parser, Result};

/// Decoded operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    None,
    /// Local variable slot
    Local(u16),
    /// Immediate value of `bipush` / `sipush`
    Immediate(i32),
    /// Constant pool index
    Pool(u16),
    /// Absolute branch target
    Branch(i64),
    /// `iinc` operands
    Increment {
        /// Local variable slot
        index: u16,
        /// Signed increment
        delta: i16,
    },
    /// Primitive array type code of `newarray`
    ArrayType(u8),
    /// `multianewarray` operands
    MultiArray {
        /// Class index of the array type
        index: u16,
        /// Number of dimensions
        dimensions: u8,
    },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Local(index) => write!(f, "{index}"),
            Operand::Immediate(value) => write!(f, "{value}"),
            Operand::Pool(index) => write!(f, "#{index}"),
            Operand::Branch(target) => write!(f, "{target}"),
            Operand::Increment { index, delta } => write!(f, "{index}, {delta}"),
            Operand::ArrayType(code) => write!(f, "{code}"),
            Operand::MultiArray { index, dimensions } => write!(f, "#{index}, {dimensions}"),
        }
    }
}

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode (or `wide` prefix) in the method body
    pub offset: usize,
    /// Opcode, the modified one for `wide` forms
    pub opcode: u8,
    /// Set for instructions carrying the `wide` prefix
    pub wide: bool,
    /// Mnemonic of `opcode`
    pub mnemonic: &'static str,
    /// Decoded operand
    pub operand: Operand,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: ", self.offset)?;
        if self.wide {
            write!(f, "wide ")?;
        }
        match self.operand {
            Operand::None => write!(f, "{}", self.mnemonic),
            operand => write!(f, "{} {}", self.mnemonic, operand),
        }
    }
}

/// Decodes a complete method body.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for undefined opcodes and switch instructions, and
/// [`crate::Error::OutOfBounds`] if the last instruction is truncated.
pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        let offset = parser.pos();
        let mut opcode = parser.read_be::<u8>()?;
        let wide = opcode == opcodes::WIDE;
        if wide {
            opcode = parser.read_be::<u8>()?;
        }

        let mnemonic = opcodes::mnemonic(opcode)
            .ok_or_else(|| malformed_error!("Undefined opcode 0x{:02X} at {}", opcode, offset))?;

        let operand = if wide {
            decode_wide(&mut parser, opcode, offset)?
        } else {
            decode_operand(&mut parser, opcode, offset)?
        };

        instructions.push(Instruction {
            offset,
            opcode,
            wide,
            mnemonic,
            operand,
        });
    }

    Ok(instructions)
}

fn decode_wide(parser: &mut Parser, opcode: u8, offset: usize) -> Result<Operand> {
    match opcode {
        opcodes::IINC => Ok(Operand::Increment {
            index: parser.read_be()?,
            delta: parser.read_be()?,
        }),
        opcodes::ILOAD..=opcodes::ALOAD | opcodes::ISTORE..=opcodes::ASTORE | opcodes::RET => {
            Ok(Operand::Local(parser.read_be()?))
        }
        _ => Err(malformed_error!("Opcode 0x{:02X} cannot follow wide at {}", opcode, offset)),
    }
}

fn decode_operand(parser: &mut Parser, opcode: u8, offset: usize) -> Result<Operand> {
    let operand = match opcode {
        opcodes::BIPUSH => Operand::Immediate(i32::from(parser.read_be::<i8>()?)),
        opcodes::SIPUSH => Operand::Immediate(i32::from(parser.read_be::<i16>()?)),
        opcodes::LDC => Operand::Pool(u16::from(parser.read_be::<u8>()?)),
        opcodes::LDC_W | opcodes::LDC2_W => Operand::Pool(parser.read_be()?),
        opcodes::ILOAD..=opcodes::ALOAD | opcodes::ISTORE..=opcodes::ASTORE | opcodes::RET => {
            Operand::Local(u16::from(parser.read_be::<u8>()?))
        }
        opcodes::IINC => Operand::Increment {
            index: u16::from(parser.read_be::<u8>()?),
            delta: i16::from(parser.read_be::<i8>()?),
        },
        opcodes::IFEQ..=opcodes::JSR | opcodes::IFNULL | opcodes::IFNONNULL => {
            Operand::Branch(offset as i64 + i64::from(parser.read_be::<i16>()?))
        }
        opcodes::GOTO_W | opcodes::JSR_W => {
            Operand::Branch(offset as i64 + i64::from(parser.read_be::<i32>()?))
        }
        opcodes::GETSTATIC..=opcodes::INVOKESTATIC
        | opcodes::NEW
        | opcodes::ANEWARRAY
        | opcodes::CHECKCAST
        | opcodes::INSTANCEOF => Operand::Pool(parser.read_be()?),
        opcodes::INVOKEINTERFACE | opcodes::INVOKEDYNAMIC => {
            let index = parser.read_be()?;
            parser.advance_by(2)?;
            Operand::Pool(index)
        }
        opcodes::NEWARRAY => Operand::ArrayType(parser.read_be()?),
        opcodes::MULTIANEWARRAY => Operand::MultiArray {
            index: parser.read_be()?,
            dimensions: parser.read_be()?,
        },
        opcodes::TABLESWITCH | opcodes::LOOKUPSWITCH => {
            return Err(malformed_error!("Switch instruction at {} is not supported", offset));
        }
        _ => Operand::None,
    };
    Ok(operand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::code::{CodeEncoder, ValueKind},
        Error,
    };

    #[test]
    fn decodes_encoder_output() {
        let mut encoder = CodeEncoder::new("m", 1);
        encoder.emit_ldc(300, false).unwrap();
        encoder.emit_store(ValueKind::Reference, 400).unwrap();
        encoder.emit_iinc(0, -3).unwrap();
        encoder.define_label("end").unwrap();
        encoder.emit_push_int(-200).unwrap();
        encoder.emit_branch(opcodes::IFNE, "end").unwrap();
        encoder.emit_insn(opcodes::RETURN).unwrap();
        let body = encoder.finalize().unwrap();

        let instructions = decode_instructions(&body.code).unwrap();
        let rendered: Vec<String> = instructions.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "    0: ldc_w #300",
                "    3: wide astore 400",
                "    7: iinc 0, -3",
                "   10: sipush -200",
                "   13: ifne 10",
                "   16: return",
            ]
        );
        assert!(instructions[1].wide);
        assert_eq!(instructions[1].opcode, opcodes::ASTORE);
    }

    #[test]
    fn interface_call_skips_padding() {
        let code = [0xB9, 0, 9, 2, 0, 0xB1];
        let instructions = decode_instructions(&code).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].operand, Operand::Pool(9));
        assert_eq!(instructions[1].offset, 5);
    }

    #[test]
    fn rejects_switch_and_undefined() {
        assert!(matches!(
            decode_instructions(&[opcodes::TABLESWITCH, 0, 0, 0]),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(decode_instructions(&[0xFE]), Err(Error::Malformed { .. })));
    }

    #[test]
    fn truncated_operand() {
        assert!(matches!(
            decode_instructions(&[opcodes::SIPUSH, 1]),
            Err(Error::OutOfBounds)
        ));
    }
}
