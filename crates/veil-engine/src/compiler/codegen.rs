//! Bytecode generation
//!
//! Lowers checked classes to class units. Every produced body is verified
//! before the unit leaves the compiler.

use crate::compiler::bytecode::{
    access, flags, verify_class, BytecodeWriter, ClassFile, CodeDef, ConstantPool, FieldDef, HandlerEntry,
    Metadata, VerifyError, STATIC_INIT_NAME,
};
use crate::compiler::ir::{ClassIr, MethodIr, TBody, TCatch, TExpr, TStmt};
use crate::vm::types::{MethodDescriptor, TypeKind, TypeRef};

/// Generate and verify the class unit for one checked class
pub(crate) fn generate(class: &ClassIr) -> Result<ClassFile, VerifyError> {
    let mut file = ClassFile::new(class.name.clone());
    file.access = class.modifiers.to_bits();
    if class.kind == TypeKind::Interface {
        file.access |= access::INTERFACE | access::ABSTRACT;
    }
    file.superclass = class.superclass.clone();
    file.interfaces = class.interfaces.clone();
    file.metadata = Metadata {
        source_file: Some(class.source_file.clone()),
    };
    file.fields = class
        .fields
        .iter()
        .map(|f| FieldDef {
            name: f.name.clone(),
            type_name: f.ty.to_string(),
            access: f.modifiers.to_bits(),
        })
        .collect();

    let mut pool = ConstantPool::new();
    file.constructors = class.constructors.iter().map(|c| lower_method(&mut pool, c)).collect();
    file.methods = class.methods.iter().map(|m| lower_method(&mut pool, m)).collect();
    if let Some(body) = &class.static_init {
        let (code, handlers) = lower_body(&mut pool, body);
        file.static_init = Some(CodeDef {
            name: STATIC_INIT_NAME.to_string(),
            params: Vec::new(),
            return_type: TypeRef::Void.to_string(),
            access: access::STATIC,
            max_locals: body.max_locals,
            code,
            handlers,
        });
        file.flags |= flags::HAS_STATIC_INIT;
    }
    file.constants = pool;

    verify_class(&file)?;
    Ok(file)
}

fn lower_method(pool: &mut ConstantPool, method: &MethodIr) -> CodeDef {
    let mut access_bits = method.modifiers.to_bits();
    let (code, handlers, max_locals) = match &method.body {
        Some(body) => {
            let (code, handlers) = lower_body(pool, body);
            (code, handlers, body.max_locals)
        }
        None => {
            access_bits |= access::ABSTRACT;
            let receiver = u16::from(!method.modifiers.is_static);
            (Vec::new(), Vec::new(), method.params.len() as u16 + receiver)
        }
    };
    CodeDef {
        name: method.name.clone(),
        params: method.params.iter().map(|p| p.to_string()).collect(),
        return_type: method.return_type.to_string(),
        access: access_bits,
        max_locals,
        code,
        handlers,
    }
}

fn lower_body(pool: &mut ConstantPool, body: &TBody) -> (Vec<u8>, Vec<HandlerEntry>) {
    let mut gen = CodeGen {
        pool,
        writer: BytecodeWriter::new(),
        handlers: Vec::new(),
    };
    gen.stmts(&body.stmts);
    if body.completes {
        gen.writer.emit_return_void();
    }
    (gen.writer.into_bytes(), gen.handlers)
}

struct CodeGen<'p> {
    pool: &'p mut ConstantPool,
    writer: BytecodeWriter,
    handlers: Vec<HandlerEntry>,
}

impl CodeGen<'_> {
    fn descriptor(&mut self, descriptor: &MethodDescriptor) -> u32 {
        self.pool.intern(&descriptor.to_string())
    }

    fn stmts(&mut self, stmts: &[TStmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &TStmt) {
        match stmt {
            TStmt::Expr(expr) => {
                self.expr(expr);
                if expr.pushes_value() {
                    self.writer.emit_pop();
                }
            }
            TStmt::Return(Some(value)) => {
                self.expr(value);
                self.writer.emit_return();
            }
            TStmt::Return(None) => self.writer.emit_return_void(),
            TStmt::Throw(value) => {
                self.expr(value);
                self.writer.emit_throw();
            }
            TStmt::Block(stmts) => self.stmts(stmts),
            TStmt::Try {
                body,
                body_completes,
                catches,
            } => self.try_stmt(body, *body_completes, catches),
            TStmt::SuperCall {
                class,
                descriptor,
                args,
            } => {
                self.writer.emit_load_local(0);
                for arg in args {
                    self.expr(arg);
                }
                let class = self.pool.intern(class);
                let descriptor = self.descriptor(descriptor);
                self.writer.emit_invoke_super(class, descriptor, args.len() as u16);
            }
        }
    }

    /// Handler entries of nested tries precede the enclosing entry
    fn try_stmt(&mut self, body: &[TStmt], body_completes: bool, catches: &[TCatch]) {
        let start = self.writer.offset() as u32;
        self.stmts(body);
        let end = self.writer.offset() as u32;

        let mut exits = Vec::new();
        if body_completes {
            exits.push(self.writer.emit_jmp_placeholder());
        }

        let mut entries = Vec::with_capacity(catches.len());
        for catch in catches {
            let handler = self.writer.offset() as u32;
            let catch_types = catch.types.iter().map(|t| self.pool.intern(t)).collect();
            entries.push(HandlerEntry {
                start,
                end,
                handler,
                catch_types,
            });
            self.writer.emit_store_local(catch.slot);
            self.stmts(&catch.body);
            if catch.completes {
                exits.push(self.writer.emit_jmp_placeholder());
            }
        }
        self.handlers.extend(entries);

        for exit in exits {
            self.writer.patch_jump_here(exit);
        }
    }

    fn expr(&mut self, expr: &TExpr) {
        match expr {
            TExpr::Null => self.writer.emit_const_null(),
            TExpr::Bool(value) => self.writer.emit_const_bool(*value),
            TExpr::Int(value) => self.writer.emit_const_i32(*value),
            TExpr::Long(value) => self.writer.emit_const_i64(*value),
            TExpr::Str(value) => {
                let index = self.pool.intern(value);
                self.writer.emit_const_str(index);
            }
            TExpr::Local(slot) => self.writer.emit_load_local(*slot),
            TExpr::Field { object, name } => {
                self.expr(object);
                let name = self.pool.intern(name);
                self.writer.emit_load_field(name);
            }
            TExpr::Static { owner, name } => {
                let owner = self.pool.intern(owner);
                let name = self.pool.intern(name);
                self.writer.emit_load_static(owner, name);
            }
            TExpr::StoreLocal { slot, value, keep } => {
                self.expr(value);
                if *keep {
                    self.writer.emit_dup();
                }
                self.writer.emit_store_local(*slot);
            }
            TExpr::StoreField {
                object,
                name,
                value,
                temp,
            } => {
                self.expr(object);
                self.expr(value);
                let name = self.pool.intern(name);
                match temp {
                    Some(temp) => {
                        self.writer.emit_store_local(*temp);
                        self.writer.emit_load_local(*temp);
                        self.writer.emit_store_field(name);
                        self.writer.emit_load_local(*temp);
                    }
                    None => self.writer.emit_store_field(name),
                }
            }
            TExpr::StoreStatic {
                owner,
                name,
                value,
                keep,
            } => {
                self.expr(value);
                if *keep {
                    self.writer.emit_dup();
                }
                let owner = self.pool.intern(owner);
                let name = self.pool.intern(name);
                self.writer.emit_store_static(owner, name);
            }
            TExpr::CallVirtual {
                receiver,
                name,
                descriptor,
                args,
            } => {
                self.expr(receiver);
                for arg in args {
                    self.expr(arg);
                }
                let name = self.pool.intern(name);
                let descriptor = self.descriptor(descriptor);
                self.writer.emit_call_virtual(name, descriptor, args.len() as u16);
            }
            TExpr::CallStatic {
                owner,
                name,
                descriptor,
                args,
            } => {
                for arg in args {
                    self.expr(arg);
                }
                let owner = self.pool.intern(owner);
                let name = self.pool.intern(name);
                let descriptor = self.descriptor(descriptor);
                self.writer.emit_call_static(owner, name, descriptor, args.len() as u16);
            }
            TExpr::New {
                class,
                descriptor,
                args,
            } => {
                for arg in args {
                    self.expr(arg);
                }
                let class = self.pool.intern(class);
                let descriptor = self.descriptor(descriptor);
                self.writer.emit_new(class, descriptor, args.len() as u16);
            }
            TExpr::NewArray { element, elements } => {
                for item in elements {
                    self.expr(item);
                }
                let element = self.pool.intern(&element.to_string());
                self.writer.emit_new_array(element, elements.len() as u16);
            }
            TExpr::Cast { ty, value } => {
                self.expr(value);
                let ty = self.pool.intern(&ty.to_string());
                self.writer.emit_check_cast(ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::{parse_instructions, Instruction};
    use crate::compiler::ir::FieldIr;
    use crate::vm::types::Modifiers;

    fn void() -> MethodDescriptor {
        MethodDescriptor::new(Vec::new(), TypeRef::Void)
    }

    fn class_with(methods: Vec<MethodIr>) -> ClassIr {
        ClassIr {
            name: "demo.Gen".to_string(),
            kind: TypeKind::Class,
            modifiers: Modifiers::public(),
            superclass: None,
            interfaces: Vec::new(),
            fields: vec![FieldIr {
                name: "value".to_string(),
                ty: TypeRef::string(),
                modifiers: Modifiers::default(),
            }],
            constructors: vec![MethodIr {
                name: "<init>".to_string(),
                params: Vec::new(),
                return_type: TypeRef::Void,
                modifiers: Modifiers::public(),
                body: Some(TBody {
                    max_locals: 1,
                    stmts: vec![TStmt::SuperCall {
                        class: "Object".to_string(),
                        descriptor: void(),
                        args: Vec::new(),
                    }],
                    completes: true,
                }),
            }],
            methods,
            static_init: None,
            source_file: "Gen.veil".to_string(),
        }
    }

    fn instructions(def: &CodeDef) -> Vec<Instruction> {
        parse_instructions(&def.code)
            .unwrap()
            .into_iter()
            .map(|l| l.instruction)
            .collect()
    }

    #[test]
    fn test_assignment_result_uses_temp_slot() {
        let method = MethodIr {
            name: "swap".to_string(),
            params: vec![TypeRef::string()],
            return_type: TypeRef::string(),
            modifiers: Modifiers::public(),
            body: Some(TBody {
                max_locals: 3,
                stmts: vec![TStmt::Return(Some(TExpr::StoreField {
                    object: Box::new(TExpr::Local(0)),
                    name: "value".to_string(),
                    value: Box::new(TExpr::Local(1)),
                    temp: Some(2),
                }))],
                completes: false,
            }),
        };
        let file = generate(&class_with(vec![method])).unwrap();
        let code = instructions(&file.methods[0]);
        assert!(matches!(
            code.as_slice(),
            [
                Instruction::LoadLocal(0),
                Instruction::LoadLocal(1),
                Instruction::StoreLocal(2),
                Instruction::LoadLocal(2),
                Instruction::StoreField(_),
                Instruction::LoadLocal(2),
                Instruction::Return,
            ]
        ));
        assert_eq!(file.metadata.source_file.as_deref(), Some("Gen.veil"));
    }

    #[test]
    fn test_try_emits_handler_table() {
        let method = MethodIr {
            name: "guarded".to_string(),
            params: Vec::new(),
            return_type: TypeRef::Void,
            modifiers: Modifiers::public(),
            body: Some(TBody {
                max_locals: 2,
                stmts: vec![TStmt::Try {
                    body: vec![TStmt::Expr(TExpr::CallVirtual {
                        receiver: Box::new(TExpr::Local(0)),
                        name: "guarded".to_string(),
                        descriptor: void(),
                        args: Vec::new(),
                    })],
                    body_completes: true,
                    catches: vec![TCatch {
                        types: vec!["RuntimeException".to_string()],
                        slot: 1,
                        body: vec![TStmt::Throw(TExpr::Local(1))],
                        completes: false,
                    }],
                }],
                completes: true,
            }),
        };
        let file = generate(&class_with(vec![method])).unwrap();
        let def = &file.methods[0];
        assert_eq!(def.handlers.len(), 1);
        let entry = &def.handlers[0];
        assert_eq!(entry.start, 0);
        assert_eq!(file.constants.get_string(entry.catch_types[0]), Some("RuntimeException"));
        let code = instructions(def);
        assert!(matches!(code.last(), Some(Instruction::ReturnVoid)));
        assert!(code.contains(&Instruction::Throw));
    }

    #[test]
    fn test_abstract_methods_carry_no_code() {
        let mut class = class_with(vec![MethodIr {
            name: "run".to_string(),
            params: vec![TypeRef::Int],
            return_type: TypeRef::Void,
            modifiers: Modifiers::public(),
            body: None,
        }]);
        class.modifiers.is_abstract = true;
        let file = generate(&class).unwrap();
        let def = &file.methods[0];
        assert!(def.is_abstract());
        assert!(def.code.is_empty());
        assert_eq!(def.max_locals, 2);
    }
}
