//! Method body assembly.
//!
//! [`CodeEncoder`] turns a sequence of typed `emit_*` calls into JVM bytecode while keeping
//! track of everything the `Code` attribute needs besides the instructions themselves:
//!
//! - the operand stack depth after every instruction, and its maximum
//! - the highest local variable slot touched
//! - branch targets, which may be referenced before they are defined
//! - explicit stack map frames placed at label positions
//!
//! Instruction forms are chosen by the encoder: `ldc` versus `ldc_w` depending on the pool
//! index, `aload_0` versus `aload 4` versus `wide aload 300`, and so on. Callers only say
//! *what* to load.
//!
//! # Usage Examples
//!
//! ```rust
//! use hugeenum::classfile::code::{CodeEncoder, ValueKind};
//! use hugeenum::classfile::opcodes;
//!
//! // static int count(int limit)
//! let mut encoder = CodeEncoder::new("count", 1);
//! encoder.emit_push_int(0)?;
//! encoder.emit_store(ValueKind::Int, 1)?;
//! encoder.define_label("head")?;
//! encoder.emit_load(ValueKind::Int, 1)?;
//! encoder.emit_load(ValueKind::Int, 0)?;
//! encoder.emit_branch(opcodes::IF_ICMPGE, "done")?;
//! encoder.emit_iinc(1, 1)?;
//! encoder.emit_branch(opcodes::GOTO, "head")?;
//! encoder.define_label("done")?;
//! encoder.emit_load(ValueKind::Int, 1)?;
//! encoder.emit_insn(opcodes::IRETURN)?;
//!
//! let body = encoder.finalize()?;
//! assert_eq!(body.max_stack, 2);
//! assert_eq!(body.max_locals, 2);
//! # Ok::<(), hugeenum::Error>(())
//! ```
//!
//! # Code Size
//!
//! The encoder happily grows past the 65535 byte limit so that a generator can finish a method
//! and learn how large it would have been. [`CodeEncoder::finalize`] then fails with
//! [`crate::Error::OversizedRoutine`].

use std::collections::HashMap;

use crate::{
    classfile::{descriptor, frame::StackMapFrame, opcodes, MAX_CODE_LENGTH},
    Error, Result,
};

/// Type category of a local variable access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `int` and narrower integral types
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// Any reference
    Reference,
}

impl ValueKind {
    /// Number of slots a value of this kind occupies.
    #[must_use]
    pub fn slots(self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }

    fn load_ops(self) -> (u8, u8) {
        match self {
            ValueKind::Int => (opcodes::ILOAD, opcodes::ILOAD_0),
            ValueKind::Long => (opcodes::LLOAD, opcodes::LLOAD_0),
            ValueKind::Float => (opcodes::FLOAD, opcodes::FLOAD_0),
            ValueKind::Double => (opcodes::DLOAD, opcodes::DLOAD_0),
            ValueKind::Reference => (opcodes::ALOAD, opcodes::ALOAD_0),
        }
    }

    fn store_ops(self) -> (u8, u8) {
        match self {
            ValueKind::Int => (opcodes::ISTORE, opcodes::ISTORE_0),
            ValueKind::Long => (opcodes::LSTORE, opcodes::LSTORE_0),
            ValueKind::Float => (opcodes::FSTORE, opcodes::FSTORE_0),
            ValueKind::Double => (opcodes::DSTORE, opcodes::DSTORE_0),
            ValueKind::Reference => (opcodes::ASTORE, opcodes::ASTORE_0),
        }
    }
}

/// Label fixup information for branch instruction resolution.
#[derive(Debug, Clone)]
struct LabelFixup {
    /// Target label name
    label: String,
    /// Offset of the branch opcode, branch offsets are relative to it
    instruction_position: usize,
    /// Offset of the 2-byte branch operand
    fixup_position: usize,
}

/// Output of [`CodeEncoder::finalize`], everything a `Code` attribute is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBody {
    /// Bytecode with all branch offsets resolved
    pub code: Vec<u8>,
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Stack map frames at absolute bytecode offsets, ordered by offset
    pub frames: Vec<(u16, StackMapFrame)>,
}

/// Bytecode assembler for a single method.
pub struct CodeEncoder {
    /// Method name, used in error messages
    routine: String,
    bytecode: Vec<u8>,
    labels: HashMap<String, u32>,
    fixups: Vec<LabelFixup>,
    /// Expected stack depth at each label, set by the first branch or fall-through
    label_stack_depths: HashMap<String, u16>,
    frames: Vec<(u32, StackMapFrame)>,
    current_stack_depth: u16,
    max_stack_depth: u16,
    max_locals: u32,
    /// Set after an unconditional transfer until the next label
    unreachable: bool,
}

impl CodeEncoder {
    /// Creates an encoder for the method `routine` whose parameters (and `this`) occupy the
    /// first `initial_locals` slots.
    #[must_use]
    pub fn new(routine: &str, initial_locals: u16) -> Self {
        CodeEncoder {
            routine: routine.to_string(),
            bytecode: Vec::new(),
            labels: HashMap::new(),
            fixups: Vec::new(),
            label_stack_depths: HashMap::new(),
            frames: Vec::new(),
            current_stack_depth: 0,
            max_stack_depth: 0,
            max_locals: u32::from(initial_locals),
            unreachable: false,
        }
    }

    /// Number of bytecode bytes emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    /// Returns `true` if no instruction was emitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Current operand stack depth in slots.
    #[must_use]
    pub fn stack_depth(&self) -> u16 {
        self.current_stack_depth
    }

    /// Emits an instruction without operands.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the opcode takes operands or is not supported,
    /// or if the operand stack would underflow.
    pub fn emit_insn(&mut self, opcode: u8) -> Result<()> {
        let (pop, push) = match opcode {
            opcodes::NOP => (0, 0),
            opcodes::SWAP => (2, 2),
            opcodes::ARRAYLENGTH => (1, 1),
            opcodes::ACONST_NULL | opcodes::ICONST_M1..=opcodes::ICONST_5 => (0, 1),
            opcodes::IALOAD | opcodes::AALOAD => (2, 1),
            opcodes::AASTORE => (3, 0),
            opcodes::POP => (1, 0),
            opcodes::POP2 => (2, 0),
            opcodes::DUP => (1, 2),
            opcodes::DUP_X1 => (2, 3),
            opcodes::DUP_X2 => (3, 4),
            opcodes::DUP2 => (2, 4),
            opcodes::IADD | opcodes::ISUB => (2, 1),
            opcodes::MONITORENTER | opcodes::MONITOREXIT => (1, 0),
            opcodes::IRETURN | opcodes::FRETURN | opcodes::ARETURN | opcodes::ATHROW => (1, 0),
            opcodes::LRETURN | opcodes::DRETURN => (2, 0),
            opcodes::RETURN => (0, 0),
            _ => {
                return Err(malformed_error!(
                    "Opcode 0x{:02X} cannot be emitted without operands",
                    opcode
                ))
            }
        };

        self.apply_stack(pop, push)?;
        self.bytecode.push(opcode);

        if matches!(
            opcode,
            opcodes::IRETURN
                | opcodes::LRETURN
                | opcodes::FRETURN
                | opcodes::DRETURN
                | opcodes::ARETURN
                | opcodes::RETURN
                | opcodes::ATHROW
        ) {
            self.unreachable = true;
        }
        Ok(())
    }

    /// Pushes an `int` constant using the shortest of `iconst_*`, `bipush` and `sipush`.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if `value` needs a pool constant.
    pub fn emit_push_int(&mut self, value: i32) -> Result<()> {
        if (-1..=5).contains(&value) {
            return self.emit_insn((i32::from(opcodes::ICONST_0) + value) as u8);
        }

        if let Ok(byte) = i8::try_from(value) {
            self.apply_stack(0, 1)?;
            self.bytecode.push(opcodes::BIPUSH);
            self.bytecode.push(byte as u8);
        } else if let Ok(short) = i16::try_from(value) {
            self.apply_stack(0, 1)?;
            self.bytecode.push(opcodes::SIPUSH);
            self.bytecode.extend_from_slice(&short.to_be_bytes());
        } else {
            return Err(Error::EncodingFailure(format!(
                "{value} does not fit an immediate push, use a pool constant"
            )));
        }
        Ok(())
    }

    /// Loads the constant at pool `index`, choosing `ldc`, `ldc_w` or `ldc2_w`.
    ///
    /// `category2` must be set for `long` and `double` constants.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on operand stack overflow.
    pub fn emit_ldc(&mut self, index: u16, category2: bool) -> Result<()> {
        if category2 {
            self.apply_stack(0, 2)?;
            self.bytecode.push(opcodes::LDC2_W);
            self.bytecode.extend_from_slice(&index.to_be_bytes());
        } else if let Ok(short) = u8::try_from(index) {
            self.apply_stack(0, 1)?;
            self.bytecode.push(opcodes::LDC);
            self.bytecode.push(short);
        } else {
            self.apply_stack(0, 1)?;
            self.bytecode.push(opcodes::LDC_W);
            self.bytecode.extend_from_slice(&index.to_be_bytes());
        }
        Ok(())
    }

    /// Loads local variable `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on operand stack overflow.
    pub fn emit_load(&mut self, kind: ValueKind, index: u16) -> Result<()> {
        self.apply_stack(0, kind.slots())?;
        let (op, op_0) = kind.load_ops();
        self.emit_local(op, op_0, index);
        self.touch_local(index, kind.slots());
        Ok(())
    }

    /// Stores into local variable `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the operand stack would underflow.
    pub fn emit_store(&mut self, kind: ValueKind, index: u16) -> Result<()> {
        self.apply_stack(kind.slots(), 0)?;
        let (op, op_0) = kind.store_ops();
        self.emit_local(op, op_0, index);
        self.touch_local(index, kind.slots());
        Ok(())
    }

    fn emit_local(&mut self, op: u8, op_0: u8, index: u16) {
        if index <= 3 {
            self.bytecode.push(op_0 + index as u8);
        } else if let Ok(short) = u8::try_from(index) {
            self.bytecode.push(op);
            self.bytecode.push(short);
        } else {
            self.bytecode.push(opcodes::WIDE);
            self.bytecode.push(op);
            self.bytecode.extend_from_slice(&index.to_be_bytes());
        }
    }

    /// Increments the `int` local `index` by `delta`.
    ///
    /// # Errors
    /// This never fails today, the `Result` keeps the signature aligned with the other emitters.
    pub fn emit_iinc(&mut self, index: u16, delta: i16) -> Result<()> {
        match (u8::try_from(index), i8::try_from(delta)) {
            (Ok(short), Ok(byte)) => {
                self.bytecode.push(opcodes::IINC);
                self.bytecode.push(short);
                self.bytecode.push(byte as u8);
            }
            _ => {
                self.bytecode.push(opcodes::WIDE);
                self.bytecode.push(opcodes::IINC);
                self.bytecode.extend_from_slice(&index.to_be_bytes());
                self.bytecode.extend_from_slice(&delta.to_be_bytes());
            }
        }
        self.touch_local(index, 1);
        Ok(())
    }

    /// Emits `getstatic`, `putstatic`, `getfield` or `putfield` on the Fieldref at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for other opcodes, invalid descriptors, or operand
    /// stack underflow.
    pub fn emit_field(&mut self, opcode: u8, index: u16, field_descriptor: &str) -> Result<()> {
        let size = descriptor::field_slots(field_descriptor)?;
        let (pop, push) = match opcode {
            opcodes::GETSTATIC => (0, size),
            opcodes::PUTSTATIC => (size, 0),
            opcodes::GETFIELD => (1, size),
            opcodes::PUTFIELD => (1 + size, 0),
            _ => return Err(malformed_error!("Opcode 0x{:02X} is not a field access", opcode)),
        };

        self.apply_stack(pop, push)?;
        self.bytecode.push(opcode);
        self.bytecode.extend_from_slice(&index.to_be_bytes());
        Ok(())
    }

    /// Emits an `invoke*` instruction on the member at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for other opcodes, invalid descriptors, or operand
    /// stack underflow.
    pub fn emit_invoke(&mut self, opcode: u8, index: u16, method_descriptor: &str) -> Result<()> {
        let (args, ret) = descriptor::method_slots(method_descriptor)?;
        let receiver = match opcode {
            opcodes::INVOKEVIRTUAL | opcodes::INVOKESPECIAL | opcodes::INVOKEINTERFACE => 1,
            opcodes::INVOKESTATIC | opcodes::INVOKEDYNAMIC => 0,
            _ => return Err(malformed_error!("Opcode 0x{:02X} is not an invocation", opcode)),
        };

        self.apply_stack(args + receiver, ret)?;
        self.bytecode.push(opcode);
        self.bytecode.extend_from_slice(&index.to_be_bytes());
        match opcode {
            opcodes::INVOKEINTERFACE => {
                let count = u8::try_from(args + 1)
                    .map_err(|_| malformed_error!("Too many interface call arguments"))?;
                self.bytecode.push(count);
                self.bytecode.push(0);
            }
            opcodes::INVOKEDYNAMIC => self.bytecode.extend_from_slice(&[0, 0]),
            _ => {}
        }
        Ok(())
    }

    /// Emits `new`, `anewarray`, `checkcast` or `instanceof` on the Class at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for other opcodes or operand stack underflow.
    pub fn emit_type(&mut self, opcode: u8, index: u16) -> Result<()> {
        let (pop, push) = match opcode {
            opcodes::NEW => (0, 1),
            opcodes::ANEWARRAY | opcodes::CHECKCAST | opcodes::INSTANCEOF => (1, 1),
            _ => return Err(malformed_error!("Opcode 0x{:02X} is not a type instruction", opcode)),
        };

        self.apply_stack(pop, push)?;
        self.bytecode.push(opcode);
        self.bytecode.extend_from_slice(&index.to_be_bytes());
        Ok(())
    }

    /// Emits a conditional branch or `goto` to `label`, which may be defined later.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for non-branch opcodes, operand stack underflow, or a
    /// stack depth that disagrees with earlier branches to the same label.
    pub fn emit_branch(&mut self, opcode: u8, label: &str) -> Result<()> {
        let pop = match opcode {
            opcodes::IFEQ..=opcodes::IFLE | opcodes::IFNULL | opcodes::IFNONNULL => 1,
            opcodes::IF_ICMPEQ..=opcodes::IF_ACMPNE => 2,
            opcodes::GOTO => 0,
            _ => return Err(malformed_error!("Opcode 0x{:02X} is not a branch", opcode)),
        };
        self.apply_stack(pop, 0)?;

        let depth = self.current_stack_depth;
        match self.label_stack_depths.get(label) {
            Some(&expected) if expected != depth => {
                return Err(malformed_error!(
                    "Stack depth mismatch at label '{}' in '{}': expected {}, got {}",
                    label,
                    self.routine,
                    expected,
                    depth
                ));
            }
            Some(_) => {}
            None => {
                self.label_stack_depths.insert(label.to_string(), depth);
            }
        }

        let instruction_position = self.bytecode.len();
        self.bytecode.push(opcode);
        self.fixups.push(LabelFixup {
            label: label.to_string(),
            instruction_position,
            fixup_position: self.bytecode.len(),
        });
        self.bytecode.extend_from_slice(&[0, 0]);

        if opcode == opcodes::GOTO {
            self.unreachable = true;
        }
        Ok(())
    }

    /// Defines `name` at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateLabel`] if `name` is already defined, or
    /// [`crate::Error::Malformed`] if the fall-through stack depth disagrees with the branches
    /// that target it.
    pub fn define_label(&mut self, name: &str) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(Error::DuplicateLabel(name.to_string()));
        }

        // All control flow paths to a label must agree on the stack depth.
        if let Some(&expected) = self.label_stack_depths.get(name) {
            if self.unreachable {
                self.current_stack_depth = expected;
            } else if self.current_stack_depth != expected {
                return Err(malformed_error!(
                    "Stack depth mismatch at label '{}' in '{}': expected {}, got {}",
                    name,
                    self.routine,
                    expected,
                    self.current_stack_depth
                ));
            }
        } else if !self.unreachable {
            self.label_stack_depths
                .insert(name.to_string(), self.current_stack_depth);
        } else {
            // Only backward branches can reach this label, they will record the depth.
            self.current_stack_depth = 0;
            self.label_stack_depths.insert(name.to_string(), 0);
        }

        self.unreachable = false;

        let position = u32::try_from(self.bytecode.len())
            .map_err(|_| malformed_error!("Label position exceeds u32 range"))?;
        self.labels.insert(name.to_string(), position);
        Ok(())
    }

    /// Records a stack map frame at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a frame was already recorded at or after this
    /// position.
    pub fn emit_frame(&mut self, frame: StackMapFrame) -> Result<()> {
        let position = u32::try_from(self.bytecode.len())
            .map_err(|_| malformed_error!("Frame position exceeds u32 range"))?;
        if let Some((last, _)) = self.frames.last() {
            if *last >= position {
                return Err(malformed_error!(
                    "Stack map frame at {} in '{}' does not follow frame at {}",
                    position,
                    self.routine,
                    last
                ));
            }
        }
        self.frames.push((position, frame));
        Ok(())
    }

    /// Resolves branches and returns the finished body.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedRoutine`] if the code exceeds 65535 bytes,
    /// [`crate::Error::UndefinedLabel`] for branches to unknown labels, and
    /// [`crate::Error::EncodingFailure`] if a branch offset or the local count does not fit.
    pub fn finalize(mut self) -> Result<CodeBody> {
        if self.bytecode.len() > MAX_CODE_LENGTH {
            return Err(Error::OversizedRoutine {
                routine: self.routine,
                size: self.bytecode.len(),
            });
        }

        let fixups = std::mem::take(&mut self.fixups);
        for fixup in &fixups {
            let label_position = self
                .labels
                .get(&fixup.label)
                .ok_or_else(|| Error::UndefinedLabel(fixup.label.clone()))?;

            let offset = i64::from(*label_position) - fixup.instruction_position as i64;
            let offset = i16::try_from(offset).map_err(|_| {
                Error::EncodingFailure(format!(
                    "branch to '{}' in '{}' spans {offset} bytes",
                    fixup.label, self.routine
                ))
            })?;

            self.bytecode[fixup.fixup_position..fixup.fixup_position + 2]
                .copy_from_slice(&offset.to_be_bytes());
        }

        let max_locals = u16::try_from(self.max_locals).map_err(|_| {
            Error::EncodingFailure(format!(
                "'{}' uses {} local slots",
                self.routine, self.max_locals
            ))
        })?;

        // Code length is bounded above, so every frame offset fits.
        let frames = self
            .frames
            .into_iter()
            .map(|(offset, frame)| (offset as u16, frame))
            .collect();

        Ok(CodeBody {
            code: self.bytecode,
            max_stack: self.max_stack_depth,
            max_locals,
            frames,
        })
    }

    fn apply_stack(&mut self, pop: u16, push: u16) -> Result<()> {
        let depth = self.current_stack_depth.checked_sub(pop).ok_or_else(|| {
            malformed_error!(
                "Operand stack underflow in '{}' at offset {}",
                self.routine,
                self.bytecode.len()
            )
        })?;
        let depth = depth.checked_add(push).ok_or_else(|| {
            malformed_error!(
                "Operand stack overflow in '{}' at offset {}",
                self.routine,
                self.bytecode.len()
            )
        })?;

        self.current_stack_depth = depth;
        self.max_stack_depth = self.max_stack_depth.max(depth);
        Ok(())
    }

    fn touch_local(&mut self, index: u16, slots: u16) {
        self.max_locals = self.max_locals.max(u32::from(index) + u32::from(slots));
    }
}
