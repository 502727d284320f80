//! Decoded instruction form shared by the verifier and the interpreter

use super::encoder::{BytecodeReader, DecodeError};
use super::opcode::Opcode;

/// A single decoded instruction with its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Pop,
    Dup,
    ConstNull,
    ConstTrue,
    ConstFalse,
    ConstI32(i32),
    ConstI64(i64),
    ConstStr(u32),
    LoadLocal(u16),
    StoreLocal(u16),
    LoadField(u32),
    StoreField(u32),
    LoadStatic { owner: u32, name: u32 },
    StoreStatic { owner: u32, name: u32 },
    New { class: u32, descriptor: u32, argc: u16 },
    NewArray { element: u32, count: u16 },
    CheckCast(u32),
    InvokeSuper { class: u32, descriptor: u32, argc: u16 },
    CallVirtual { name: u32, descriptor: u32, argc: u16 },
    CallStatic { owner: u32, name: u32, descriptor: u32, argc: u16 },
    /// Offset relative to the start of the next instruction
    Jmp(i32),
    Return,
    ReturnVoid,
    Throw,
}

impl Instruction {
    /// Decode the instruction at the reader's position
    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let instr = match reader.read_opcode()? {
            Opcode::Nop => Self::Nop,
            Opcode::Pop => Self::Pop,
            Opcode::Dup => Self::Dup,
            Opcode::ConstNull => Self::ConstNull,
            Opcode::ConstTrue => Self::ConstTrue,
            Opcode::ConstFalse => Self::ConstFalse,
            Opcode::ConstI32 => Self::ConstI32(reader.read_i32()?),
            Opcode::ConstI64 => Self::ConstI64(reader.read_i64()?),
            Opcode::ConstStr => Self::ConstStr(reader.read_u32()?),
            Opcode::LoadLocal => Self::LoadLocal(reader.read_u16()?),
            Opcode::StoreLocal => Self::StoreLocal(reader.read_u16()?),
            Opcode::LoadField => Self::LoadField(reader.read_u32()?),
            Opcode::StoreField => Self::StoreField(reader.read_u32()?),
            Opcode::LoadStatic => Self::LoadStatic {
                owner: reader.read_u32()?,
                name: reader.read_u32()?,
            },
            Opcode::StoreStatic => Self::StoreStatic {
                owner: reader.read_u32()?,
                name: reader.read_u32()?,
            },
            Opcode::New => Self::New {
                class: reader.read_u32()?,
                descriptor: reader.read_u32()?,
                argc: reader.read_u16()?,
            },
            Opcode::NewArray => Self::NewArray {
                element: reader.read_u32()?,
                count: reader.read_u16()?,
            },
            Opcode::CheckCast => Self::CheckCast(reader.read_u32()?),
            Opcode::InvokeSuper => Self::InvokeSuper {
                class: reader.read_u32()?,
                descriptor: reader.read_u32()?,
                argc: reader.read_u16()?,
            },
            Opcode::CallVirtual => Self::CallVirtual {
                name: reader.read_u32()?,
                descriptor: reader.read_u32()?,
                argc: reader.read_u16()?,
            },
            Opcode::CallStatic => Self::CallStatic {
                owner: reader.read_u32()?,
                name: reader.read_u32()?,
                descriptor: reader.read_u32()?,
                argc: reader.read_u16()?,
            },
            Opcode::Jmp => Self::Jmp(reader.read_i32()?),
            Opcode::Return => Self::Return,
            Opcode::ReturnVoid => Self::ReturnVoid,
            Opcode::Throw => Self::Throw,
        };
        Ok(instr)
    }

    /// The opcode of this instruction
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::Pop => Opcode::Pop,
            Self::Dup => Opcode::Dup,
            Self::ConstNull => Opcode::ConstNull,
            Self::ConstTrue => Opcode::ConstTrue,
            Self::ConstFalse => Opcode::ConstFalse,
            Self::ConstI32(_) => Opcode::ConstI32,
            Self::ConstI64(_) => Opcode::ConstI64,
            Self::ConstStr(_) => Opcode::ConstStr,
            Self::LoadLocal(_) => Opcode::LoadLocal,
            Self::StoreLocal(_) => Opcode::StoreLocal,
            Self::LoadField(_) => Opcode::LoadField,
            Self::StoreField(_) => Opcode::StoreField,
            Self::LoadStatic { .. } => Opcode::LoadStatic,
            Self::StoreStatic { .. } => Opcode::StoreStatic,
            Self::New { .. } => Opcode::New,
            Self::NewArray { .. } => Opcode::NewArray,
            Self::CheckCast(_) => Opcode::CheckCast,
            Self::InvokeSuper { .. } => Opcode::InvokeSuper,
            Self::CallVirtual { .. } => Opcode::CallVirtual,
            Self::CallStatic { .. } => Opcode::CallStatic,
            Self::Jmp(_) => Opcode::Jmp,
            Self::Return => Opcode::Return,
            Self::ReturnVoid => Opcode::ReturnVoid,
            Self::Throw => Opcode::Throw,
        }
    }

    /// Constant pool indices referenced by this instruction
    pub fn pool_refs(&self) -> Vec<u32> {
        match *self {
            Self::ConstStr(i) | Self::LoadField(i) | Self::StoreField(i) | Self::CheckCast(i) => {
                vec![i]
            }
            Self::LoadStatic { owner, name } | Self::StoreStatic { owner, name } => {
                vec![owner, name]
            }
            Self::New {
                class, descriptor, ..
            }
            | Self::InvokeSuper {
                class, descriptor, ..
            } => vec![class, descriptor],
            Self::NewArray { element, .. } => vec![element],
            Self::CallVirtual {
                name, descriptor, ..
            } => vec![name, descriptor],
            Self::CallStatic {
                owner,
                name,
                descriptor,
                ..
            } => vec![owner, name, descriptor],
            _ => Vec::new(),
        }
    }
}

/// An instruction together with its byte offset and the offset that follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub offset: usize,
    pub next: usize,
    pub instruction: Instruction,
}

impl Located {
    /// Absolute target of a jump instruction
    pub fn jump_target(&self) -> Option<i64> {
        match self.instruction {
            Instruction::Jmp(rel) => Some(self.next as i64 + rel as i64),
            _ => None,
        }
    }
}

/// Decode a complete code body into located instructions
pub fn parse_instructions(code: &[u8]) -> Result<Vec<Located>, DecodeError> {
    let mut reader = BytecodeReader::new(code);
    let mut instructions = Vec::new();
    while reader.has_more() {
        let offset = reader.position();
        let instruction = Instruction::decode(&mut reader)?;
        instructions.push(Located {
            offset,
            next: reader.position(),
            instruction,
        });
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::BytecodeWriter;

    #[test]
    fn test_parse_instructions_offsets() {
        let mut writer = BytecodeWriter::new();
        writer.emit_load_local(0);
        writer.emit_call_static(1, 2, 3, 0);
        writer.emit_return_void();
        let code = writer.into_bytes();

        let parsed = parse_instructions(&code).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].instruction, Instruction::LoadLocal(0));
        assert_eq!(parsed[1].offset, 3);
        assert_eq!(
            parsed[1].instruction,
            Instruction::CallStatic {
                owner: 1,
                name: 2,
                descriptor: 3,
                argc: 0
            }
        );
        assert_eq!(parsed[2].offset, 18);
        assert_eq!(parsed[1].instruction.pool_refs(), vec![1, 2, 3]);
    }

    #[test]
    fn test_jump_target() {
        let mut writer = BytecodeWriter::new();
        let operand = writer.emit_jmp_placeholder();
        writer.emit_pop();
        writer.patch_jump_here(operand);
        writer.emit_return_void();
        let parsed = parse_instructions(&writer.into_bytes()).unwrap();
        assert_eq!(parsed[0].jump_target(), Some(6));
        assert_eq!(parsed[2].offset, 6);
    }

    #[test]
    fn test_truncated_operand() {
        let code = [Opcode::LoadLocal.to_u8(), 0];
        assert!(matches!(
            parse_instructions(&code),
            Err(DecodeError::UnexpectedEnd(1))
        ));
    }
}
