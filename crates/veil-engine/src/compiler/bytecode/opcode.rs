//! Bytecode opcodes for the Veil interpreter
//!
//! Every opcode is a single byte, optionally followed by fixed-size operands.
//! Pool operands (`u32`) index the string constant pool of the owning class
//! unit; type names and method descriptors are stored there as text.

/// Bytecode opcode enumeration
///
/// Opcodes are organized into categories:
/// - 0x00-0x0F: Stack manipulation
/// - 0x10-0x1F: Constants
/// - 0x20-0x2F: Local variables
/// - 0x30-0x3F: Field access
/// - 0x40-0x4F: Object and array creation, casts
/// - 0x50-0x5F: Method invocation
/// - 0x60-0x6F: Control flow
/// - 0x70-0x7F: Returns and throw
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,

    // ===== Constants (0x10-0x1F) =====
    /// Push null constant
    ConstNull = 0x10,
    /// Push true constant
    ConstTrue = 0x11,
    /// Push false constant
    ConstFalse = 0x12,
    /// Push 32-bit integer constant (operand: i32)
    ConstI32 = 0x13,
    /// Push 64-bit integer constant (operand: i64)
    ConstI64 = 0x14,
    /// Push string constant from pool (operand: u32 index)
    ConstStr = 0x15,

    // ===== Local Variables (0x20-0x2F) =====
    /// Load local variable onto stack (operand: u16 index)
    LoadLocal = 0x20,
    /// Store top of stack to local variable (operand: u16 index)
    StoreLocal = 0x21,

    // ===== Field Access (0x30-0x3F) =====
    /// Pop object, push its field (operand: u32 field name)
    LoadField = 0x30,
    /// Pop value, pop object, store field (operand: u32 field name)
    StoreField = 0x31,
    /// Push static field (operands: u32 owner type, u32 field name)
    LoadStatic = 0x32,
    /// Pop value into static field (operands: u32 owner type, u32 field name)
    StoreStatic = 0x33,

    // ===== Creation & Casts (0x40-0x4F) =====
    /// Pop arguments, construct an object (operands: u32 type, u32 descriptor, u16 argc)
    New = 0x40,
    /// Pop elements, push an array (operands: u32 element type, u16 count)
    NewArray = 0x41,
    /// Check the top of stack against a type (operand: u32 type)
    CheckCast = 0x42,

    // ===== Method Invocation (0x50-0x5F) =====
    /// Run a superclass constructor on the receiver (operands: u32 type, u32 descriptor, u16 argc)
    InvokeSuper = 0x50,
    /// Virtual call on the receiver (operands: u32 name, u32 descriptor, u16 argc)
    CallVirtual = 0x51,
    /// Static call (operands: u32 owner type, u32 name, u32 descriptor, u16 argc)
    CallStatic = 0x52,

    // ===== Control Flow (0x60-0x6F) =====
    /// Unconditional jump (operand: i32 offset from the next instruction)
    Jmp = 0x60,

    // ===== Returns & Throw (0x70-0x7F) =====
    /// Return top of stack
    Return = 0x70,
    /// Return without a value
    ReturnVoid = 0x71,
    /// Pop a throwable and raise it
    Throw = 0x72,
}

impl Opcode {
    /// Convert a byte to an opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x10 => Some(Self::ConstNull),
            0x11 => Some(Self::ConstTrue),
            0x12 => Some(Self::ConstFalse),
            0x13 => Some(Self::ConstI32),
            0x14 => Some(Self::ConstI64),
            0x15 => Some(Self::ConstStr),
            0x20 => Some(Self::LoadLocal),
            0x21 => Some(Self::StoreLocal),
            0x30 => Some(Self::LoadField),
            0x31 => Some(Self::StoreField),
            0x32 => Some(Self::LoadStatic),
            0x33 => Some(Self::StoreStatic),
            0x40 => Some(Self::New),
            0x41 => Some(Self::NewArray),
            0x42 => Some(Self::CheckCast),
            0x50 => Some(Self::InvokeSuper),
            0x51 => Some(Self::CallVirtual),
            0x52 => Some(Self::CallStatic),
            0x60 => Some(Self::Jmp),
            0x70 => Some(Self::Return),
            0x71 => Some(Self::ReturnVoid),
            0x72 => Some(Self::Throw),
            _ => None,
        }
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Size in bytes of the operands following this opcode
    pub fn operand_size(self) -> usize {
        match self {
            Self::Nop
            | Self::Pop
            | Self::Dup
            | Self::ConstNull
            | Self::ConstTrue
            | Self::ConstFalse
            | Self::Return
            | Self::ReturnVoid
            | Self::Throw => 0,
            Self::LoadLocal | Self::StoreLocal => 2,
            Self::ConstI32
            | Self::ConstStr
            | Self::LoadField
            | Self::StoreField
            | Self::CheckCast
            | Self::Jmp => 4,
            Self::NewArray => 6,
            Self::ConstI64 | Self::LoadStatic | Self::StoreStatic => 8,
            Self::New | Self::InvokeSuper | Self::CallVirtual => 10,
            Self::CallStatic => 14,
        }
    }

    /// Get the mnemonic name of this opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::ConstNull => "CONST_NULL",
            Self::ConstTrue => "CONST_TRUE",
            Self::ConstFalse => "CONST_FALSE",
            Self::ConstI32 => "CONST_I32",
            Self::ConstI64 => "CONST_I64",
            Self::ConstStr => "CONST_STR",
            Self::LoadLocal => "LOAD_LOCAL",
            Self::StoreLocal => "STORE_LOCAL",
            Self::LoadField => "LOAD_FIELD",
            Self::StoreField => "STORE_FIELD",
            Self::LoadStatic => "LOAD_STATIC",
            Self::StoreStatic => "STORE_STATIC",
            Self::New => "NEW",
            Self::NewArray => "NEW_ARRAY",
            Self::CheckCast => "CHECK_CAST",
            Self::InvokeSuper => "INVOKE_SUPER",
            Self::CallVirtual => "CALL_VIRTUAL",
            Self::CallStatic => "CALL_STATIC",
            Self::Jmp => "JMP",
            Self::Return => "RETURN",
            Self::ReturnVoid => "RETURN_VOID",
            Self::Throw => "THROW",
        }
    }

    /// Check if this opcode is a jump instruction
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jmp)
    }

    /// Check if this opcode is a call instruction
    pub fn is_call(self) -> bool {
        matches!(self, Self::InvokeSuper | Self::CallVirtual | Self::CallStatic)
    }

    /// Check if this opcode is a return instruction
    pub fn is_return(self) -> bool {
        matches!(self, Self::Return | Self::ReturnVoid)
    }

    /// Check if control never falls through to the next instruction
    pub fn is_terminator(self) -> bool {
        self.is_jump() || self.is_return() || matches!(self, Self::Throw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let opcodes = [
            Opcode::Nop,
            Opcode::Pop,
            Opcode::Dup,
            Opcode::ConstNull,
            Opcode::ConstI64,
            Opcode::ConstStr,
            Opcode::LoadLocal,
            Opcode::StoreStatic,
            Opcode::New,
            Opcode::CheckCast,
            Opcode::CallStatic,
            Opcode::Jmp,
            Opcode::Throw,
        ];

        for opcode in &opcodes {
            let byte = opcode.to_u8();
            assert_eq!(Opcode::from_u8(byte), Some(*opcode), "Failed roundtrip for {:?}", opcode);
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_u8(0x03), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_terminators() {
        assert!(Opcode::Jmp.is_terminator());
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::ReturnVoid.is_terminator());
        assert!(Opcode::Throw.is_terminator());
        assert!(!Opcode::CallVirtual.is_terminator());
        assert!(Opcode::CallStatic.is_call());
    }

    #[test]
    fn test_operand_sizes() {
        assert_eq!(Opcode::Pop.operand_size(), 0);
        assert_eq!(Opcode::LoadLocal.operand_size(), 2);
        assert_eq!(Opcode::Jmp.operand_size(), 4);
        assert_eq!(Opcode::CallStatic.operand_size(), 14);
        assert_eq!(Opcode::Return.name(), "RETURN");
    }
}
