//! Bytecode definitions and class unit format
//!
//! This module provides:
//! - Opcode definitions and the decoded instruction form
//! - The bytecode writer/reader
//! - The string constant pool
//! - The class unit binary format
//! - Bytecode verification

pub mod class_file;
pub mod constants;
pub mod encoder;
pub mod instruction;
pub mod opcode;
pub mod verify;

pub use class_file::{
    access, flags, ClassFile, ClassFileError, CodeDef, FieldDef, HandlerEntry, Metadata,
    CONSTRUCTOR_NAME, MAGIC, STATIC_INIT_NAME, VERSION,
};
pub use constants::ConstantPool;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use instruction::{parse_instructions, Instruction, Located};
pub use opcode::Opcode;
pub use verify::{verify_class, verify_code, VerifyError};
