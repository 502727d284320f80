//! Class unit verification
//!
//! Every code body is checked before it is written by the compiler and again
//! before the loader defines it:
//! - operands decode and every opcode is known
//! - constant pool and local indices are in range
//! - jump and handler targets land on instruction boundaries
//! - the operand stack depth is consistent at every join point
//! - the last instruction does not fall through

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::class_file::{ClassFile, CodeDef};
use super::constants::ConstantPool;
use super::encoder::DecodeError;
use super::instruction::{parse_instructions, Instruction, Located};
use crate::vm::types::{MethodDescriptor, TypeRef};

/// Upper bound on the operand stack depth of one frame
pub const MAX_STACK_DEPTH: u32 = 1024;

/// Verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("{body}: {error}")]
    Decode { body: String, error: DecodeError },

    #[error("{body}: empty code body")]
    EmptyBody { body: String },

    #[error("{body}: abstract body carries code")]
    AbstractWithCode { body: String },

    #[error("{body}: invalid constant pool index {index} at offset {offset}")]
    InvalidConstantRef {
        body: String,
        offset: usize,
        index: u32,
    },

    #[error("{body}: invalid type name '{name}'")]
    InvalidTypeName { body: String, name: String },

    #[error("{body}: invalid method descriptor '{descriptor}' at offset {offset}")]
    InvalidDescriptor {
        body: String,
        offset: usize,
        descriptor: String,
    },

    #[error("{body}: argument count {found} does not match descriptor ({expected}) at offset {offset}")]
    ArgumentCountMismatch {
        body: String,
        offset: usize,
        expected: usize,
        found: usize,
    },

    #[error("{body}: local {index} out of range (max_locals {max_locals}) at offset {offset}")]
    InvalidLocalRef {
        body: String,
        offset: usize,
        index: u16,
        max_locals: u16,
    },

    #[error("{body}: parameters need {needed} local slots, only {max_locals} declared")]
    ParametersExceedLocals {
        body: String,
        needed: usize,
        max_locals: u16,
    },

    #[error("{body}: jump at offset {offset} targets {target}, not an instruction boundary")]
    InvalidJumpTarget {
        body: String,
        offset: usize,
        target: i64,
    },

    #[error("{body}: exception handler {index}: {reason}")]
    InvalidHandler {
        body: String,
        index: usize,
        reason: &'static str,
    },

    #[error("{body}: stack underflow at offset {offset}")]
    StackUnderflow { body: String, offset: usize },

    #[error("{body}: stack overflow at offset {offset} (depth {depth})")]
    StackOverflow {
        body: String,
        offset: usize,
        depth: u32,
    },

    #[error("{body}: inconsistent stack depth at offset {offset} ({expected} vs {found})")]
    StackMismatch {
        body: String,
        offset: usize,
        expected: u32,
        found: u32,
    },

    #[error("{body}: return kind does not match declared return type at offset {offset}")]
    ReturnMismatch { body: String, offset: usize },

    #[error("{body}: control falls off the end of the code")]
    FallOffEnd { body: String },
}

/// Verify every code body and type name of a class unit
pub fn verify_class(class: &ClassFile) -> Result<(), VerifyError> {
    let class_label = class.name.clone();
    check_type_name(&class_label, &class.name)?;
    if let Some(superclass) = &class.superclass {
        check_type_name(&class_label, superclass)?;
    }
    for iface in &class.interfaces {
        check_type_name(&class_label, iface)?;
    }
    for field in &class.fields {
        check_value_type(&class_label, &field.type_name)?;
    }
    for body in class.code_bodies() {
        verify_code(&class.name, body, &class.constants)?;
    }
    Ok(())
}

fn check_type_name(body: &str, name: &str) -> Result<(), VerifyError> {
    match TypeRef::parse(name) {
        Some(TypeRef::Named(_)) => Ok(()),
        _ => Err(VerifyError::InvalidTypeName {
            body: body.to_string(),
            name: name.to_string(),
        }),
    }
}

fn check_value_type(body: &str, name: &str) -> Result<TypeRef, VerifyError> {
    TypeRef::parse(name)
        .filter(|t| !t.is_void())
        .ok_or_else(|| VerifyError::InvalidTypeName {
            body: body.to_string(),
            name: name.to_string(),
        })
}

/// Verify a single code body against the unit's constant pool
pub fn verify_code(owner: &str, def: &CodeDef, pool: &ConstantPool) -> Result<(), VerifyError> {
    let body = format!("{}.{}{}", owner, def.name, def.descriptor());

    for param in &def.params {
        check_value_type(&body, param)?;
    }
    let return_type = TypeRef::parse(&def.return_type).ok_or_else(|| VerifyError::InvalidTypeName {
        body: body.clone(),
        name: def.return_type.clone(),
    })?;

    if def.is_abstract() {
        if !def.code.is_empty() || !def.handlers.is_empty() {
            return Err(VerifyError::AbstractWithCode { body });
        }
        return Ok(());
    }

    let needed = def.params.len() + usize::from(!def.is_static());
    if needed > def.max_locals as usize {
        return Err(VerifyError::ParametersExceedLocals {
            body,
            needed,
            max_locals: def.max_locals,
        });
    }

    let instructions = parse_instructions(&def.code).map_err(|error| VerifyError::Decode {
        body: body.clone(),
        error,
    })?;
    let Some(last) = instructions.last() else {
        return Err(VerifyError::EmptyBody { body });
    };
    if !last.instruction.opcode().is_terminator() {
        return Err(VerifyError::FallOffEnd { body });
    }

    let boundaries: FxHashMap<usize, usize> = instructions
        .iter()
        .enumerate()
        .map(|(idx, instr)| (instr.offset, idx))
        .collect();

    let ctx = BodyContext {
        body: &body,
        def,
        pool,
        return_type: &return_type,
    };

    for instr in &instructions {
        ctx.check_operands(instr, &boundaries)?;
    }
    let handler_roots = ctx.check_handlers(&boundaries)?;
    ctx.check_stack(&instructions, &boundaries, &handler_roots)
}

struct BodyContext<'a> {
    body: &'a str,
    def: &'a CodeDef,
    pool: &'a ConstantPool,
    return_type: &'a TypeRef,
}

impl BodyContext<'_> {
    fn constant(&self, offset: usize, index: u32) -> Result<&str, VerifyError> {
        self.pool
            .get_string(index)
            .ok_or_else(|| VerifyError::InvalidConstantRef {
                body: self.body.to_string(),
                offset,
                index,
            })
    }

    fn type_operand(&self, offset: usize, index: u32) -> Result<TypeRef, VerifyError> {
        let text = self.constant(offset, index)?;
        check_value_type(self.body, text)
    }

    fn descriptor(&self, offset: usize, index: u32, argc: u16) -> Result<MethodDescriptor, VerifyError> {
        let text = self.constant(offset, index)?;
        let descriptor = MethodDescriptor::parse(text).ok_or_else(|| VerifyError::InvalidDescriptor {
            body: self.body.to_string(),
            offset,
            descriptor: text.to_string(),
        })?;
        if descriptor.params.len() != argc as usize {
            return Err(VerifyError::ArgumentCountMismatch {
                body: self.body.to_string(),
                offset,
                expected: descriptor.params.len(),
                found: argc as usize,
            });
        }
        Ok(descriptor)
    }

    fn check_operands(
        &self,
        instr: &Located,
        boundaries: &FxHashMap<usize, usize>,
    ) -> Result<(), VerifyError> {
        let offset = instr.offset;
        for index in instr.instruction.pool_refs() {
            self.constant(offset, index)?;
        }
        match instr.instruction {
            Instruction::LoadLocal(index) | Instruction::StoreLocal(index) => {
                if index >= self.def.max_locals {
                    return Err(VerifyError::InvalidLocalRef {
                        body: self.body.to_string(),
                        offset,
                        index,
                        max_locals: self.def.max_locals,
                    });
                }
            }
            Instruction::LoadStatic { owner, .. } | Instruction::StoreStatic { owner, .. } => {
                check_type_name(self.body, self.constant(offset, owner)?)?;
            }
            Instruction::New {
                class,
                descriptor,
                argc,
            }
            | Instruction::InvokeSuper {
                class,
                descriptor,
                argc,
            } => {
                check_type_name(self.body, self.constant(offset, class)?)?;
                self.descriptor(offset, descriptor, argc)?;
            }
            Instruction::NewArray { element, .. } => {
                self.type_operand(offset, element)?;
            }
            Instruction::CheckCast(ty) => {
                self.type_operand(offset, ty)?;
            }
            Instruction::CallVirtual {
                descriptor, argc, ..
            } => {
                self.descriptor(offset, descriptor, argc)?;
            }
            Instruction::CallStatic {
                owner,
                descriptor,
                argc,
                ..
            } => {
                check_type_name(self.body, self.constant(offset, owner)?)?;
                self.descriptor(offset, descriptor, argc)?;
            }
            Instruction::Jmp(_) => {
                let target = instr.jump_target().unwrap_or(-1);
                if target < 0 || !boundaries.contains_key(&(target as usize)) {
                    return Err(VerifyError::InvalidJumpTarget {
                        body: self.body.to_string(),
                        offset,
                        target,
                    });
                }
            }
            Instruction::Return => {
                if self.return_type.is_void() {
                    return Err(VerifyError::ReturnMismatch {
                        body: self.body.to_string(),
                        offset,
                    });
                }
            }
            Instruction::ReturnVoid => {
                if !self.return_type.is_void() {
                    return Err(VerifyError::ReturnMismatch {
                        body: self.body.to_string(),
                        offset,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Validate the exception table; returns the handler entry indices
    fn check_handlers(&self, boundaries: &FxHashMap<usize, usize>) -> Result<Vec<usize>, VerifyError> {
        let code_len = self.def.code.len();
        let mut roots = Vec::with_capacity(self.def.handlers.len());
        for (index, entry) in self.def.handlers.iter().enumerate() {
            let invalid = |reason| VerifyError::InvalidHandler {
                body: self.body.to_string(),
                index,
                reason,
            };
            let (start, end, handler) = (
                entry.start as usize,
                entry.end as usize,
                entry.handler as usize,
            );
            if start > end {
                return Err(invalid("range start after end"));
            }
            if !boundaries.contains_key(&start) {
                return Err(invalid("range start is not an instruction boundary"));
            }
            if end != code_len && !boundaries.contains_key(&end) {
                return Err(invalid("range end is not an instruction boundary"));
            }
            let Some(&root) = boundaries.get(&handler) else {
                return Err(invalid("handler is not an instruction boundary"));
            };
            for &ty in &entry.catch_types {
                let name = self
                    .pool
                    .get_string(ty)
                    .ok_or_else(|| invalid("catch type outside the constant pool"))?;
                check_type_name(self.body, name)?;
            }
            roots.push(root);
        }
        Ok(roots)
    }

    fn stack_effect(&self, instr: &Located) -> Result<(u32, u32), VerifyError> {
        let effect = match instr.instruction {
            Instruction::Nop | Instruction::Jmp(_) | Instruction::ReturnVoid => (0, 0),
            Instruction::Pop | Instruction::StoreLocal(_) | Instruction::StoreStatic { .. } => (1, 0),
            Instruction::Dup => (1, 2),
            Instruction::ConstNull
            | Instruction::ConstTrue
            | Instruction::ConstFalse
            | Instruction::ConstI32(_)
            | Instruction::ConstI64(_)
            | Instruction::ConstStr(_)
            | Instruction::LoadLocal(_)
            | Instruction::LoadStatic { .. } => (0, 1),
            Instruction::LoadField(_) | Instruction::CheckCast(_) => (1, 1),
            Instruction::StoreField(_) => (2, 0),
            Instruction::New { argc, .. } => (argc as u32, 1),
            Instruction::NewArray { count, .. } => (count as u32, 1),
            Instruction::InvokeSuper { argc, .. } => (argc as u32 + 1, 0),
            Instruction::CallVirtual {
                descriptor, argc, ..
            } => {
                let desc = self.descriptor(instr.offset, descriptor, argc)?;
                (argc as u32 + 1, u32::from(!desc.return_type.is_void()))
            }
            Instruction::CallStatic {
                descriptor, argc, ..
            } => {
                let desc = self.descriptor(instr.offset, descriptor, argc)?;
                (argc as u32, u32::from(!desc.return_type.is_void()))
            }
            Instruction::Return | Instruction::Throw => (1, 0),
        };
        Ok(effect)
    }

    /// Abstract interpretation of stack depth over the control-flow graph
    fn check_stack(
        &self,
        instructions: &[Located],
        boundaries: &FxHashMap<usize, usize>,
        handler_roots: &[usize],
    ) -> Result<(), VerifyError> {
        let mut depths: Vec<Option<u32>> = vec![None; instructions.len()];
        let mut worklist: Vec<(usize, u32)> = vec![(0, 0)];
        worklist.extend(handler_roots.iter().map(|&root| (root, 1)));

        while let Some((idx, depth)) = worklist.pop() {
            let instr = &instructions[idx];
            if let Some(known) = depths[idx] {
                if known != depth {
                    return Err(VerifyError::StackMismatch {
                        body: self.body.to_string(),
                        offset: instr.offset,
                        expected: known,
                        found: depth,
                    });
                }
                continue;
            }
            depths[idx] = Some(depth);

            let (pops, pushes) = self.stack_effect(instr)?;
            if depth < pops {
                return Err(VerifyError::StackUnderflow {
                    body: self.body.to_string(),
                    offset: instr.offset,
                });
            }
            let next_depth = depth - pops + pushes;
            if next_depth > MAX_STACK_DEPTH {
                return Err(VerifyError::StackOverflow {
                    body: self.body.to_string(),
                    offset: instr.offset,
                    depth: next_depth,
                });
            }

            if let Some(target) = instr.jump_target() {
                if let Some(&target_idx) = boundaries.get(&(target as usize)) {
                    worklist.push((target_idx, next_depth));
                }
            } else if !instr.instruction.opcode().is_terminator() && idx + 1 < instructions.len() {
                worklist.push((idx + 1, next_depth));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::{access, BytecodeWriter, HandlerEntry};

    fn body(code: Vec<u8>, return_type: &str, max_locals: u16) -> CodeDef {
        CodeDef {
            name: "run".to_string(),
            params: Vec::new(),
            return_type: return_type.to_string(),
            access: access::PUBLIC,
            max_locals,
            code,
            handlers: Vec::new(),
        }
    }

    #[test]
    fn test_valid_body() {
        let mut pool = ConstantPool::new();
        let s = pool.intern("hello");
        let mut writer = BytecodeWriter::new();
        writer.emit_const_str(s);
        writer.emit_return();
        let def = body(writer.into_bytes(), "String", 1);
        assert!(verify_code("demo.A", &def, &pool).is_ok());
    }

    #[test]
    fn test_fall_off_end() {
        let mut writer = BytecodeWriter::new();
        writer.emit_const_null();
        let def = body(writer.into_bytes(), "void", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::FallOffEnd { .. })
        ));
    }

    #[test]
    fn test_empty_body() {
        let def = body(Vec::new(), "void", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::EmptyBody { .. })
        ));
    }

    #[test]
    fn test_stack_underflow() {
        let mut writer = BytecodeWriter::new();
        writer.emit_pop();
        writer.emit_return_void();
        let def = body(writer.into_bytes(), "void", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::StackUnderflow { offset: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_constant_ref() {
        let mut writer = BytecodeWriter::new();
        writer.emit_const_str(4);
        writer.emit_return();
        let def = body(writer.into_bytes(), "String", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::InvalidConstantRef { index: 4, .. })
        ));
    }

    #[test]
    fn test_invalid_local_ref() {
        let mut writer = BytecodeWriter::new();
        writer.emit_load_local(3);
        writer.emit_return();
        let def = body(writer.into_bytes(), "Object", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::InvalidLocalRef { index: 3, .. })
        ));
    }

    #[test]
    fn test_jump_into_operand() {
        let mut writer = BytecodeWriter::new();
        let operand = writer.emit_jmp_placeholder();
        writer.patch_i32(operand, -3);
        writer.emit_return_void();
        let def = body(writer.into_bytes(), "void", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::InvalidJumpTarget { .. })
        ));
    }

    #[test]
    fn test_return_mismatch() {
        let mut writer = BytecodeWriter::new();
        writer.emit_return_void();
        let def = body(writer.into_bytes(), "int", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::ReturnMismatch { .. })
        ));
    }

    #[test]
    fn test_argument_count_mismatch() {
        let mut pool = ConstantPool::new();
        let name = pool.intern("doOperation");
        let desc = pool.intern("(String)void");
        let mut writer = BytecodeWriter::new();
        writer.emit_load_local(0);
        writer.emit_call_virtual(name, desc, 0);
        writer.emit_return_void();
        let def = body(writer.into_bytes(), "void", 1);
        assert!(matches!(
            verify_code("demo.A", &def, &pool),
            Err(VerifyError::ArgumentCountMismatch { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_handler_entry_depth() {
        let mut pool = ConstantPool::new();
        let catch = pool.intern("RuntimeException");
        let mut writer = BytecodeWriter::new();
        writer.emit_const_null();
        writer.emit_throw();
        let handler = writer.offset() as u32;
        writer.emit_throw();
        let mut def = body(writer.into_bytes(), "void", 1);
        def.handlers.push(HandlerEntry {
            start: 0,
            end: handler,
            handler,
            catch_types: vec![catch],
        });
        assert!(verify_code("demo.A", &def, &pool).is_ok());

        def.handlers[0].handler = 3;
        assert!(matches!(
            verify_code("demo.A", &def, &pool),
            Err(VerifyError::InvalidHandler { .. })
        ));
    }

    #[test]
    fn test_abstract_body() {
        let mut def = body(Vec::new(), "void", 1);
        def.access |= access::ABSTRACT;
        assert!(verify_code("demo.A", &def, &ConstantPool::new()).is_ok());
        def.code.push(0x71);
        assert!(matches!(
            verify_code("demo.A", &def, &ConstantPool::new()),
            Err(VerifyError::AbstractWithCode { .. })
        ));
    }

    #[test]
    fn test_class_type_names() {
        let mut class = ClassFile::new("demo.A");
        class.superclass = Some("not a type".to_string());
        assert!(matches!(
            verify_class(&class),
            Err(VerifyError::InvalidTypeName { .. })
        ));
    }
}
