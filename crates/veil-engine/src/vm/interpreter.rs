//! Stack interpreter for verified code bodies
//!
//! Each call of [`Interpreter::execute`] runs one frame. Calls into other
//! compiled bodies go back through the [`TypeUniverse`], so nested frames
//! are nested Rust calls. The depth is bounded per thread and each frame
//! starts with enough native stack, growing onto a fresh segment when the
//! thread's own stack runs low.

use std::cell::Cell;
use std::sync::Arc;

use tracing::trace;

use crate::compiler::bytecode::{BytecodeReader, Instruction};
use crate::vm::builtins;
use crate::vm::object::ObjectRef;
use crate::vm::throwable::{is_builtin_throwable, Throwable};
use crate::vm::types::{CodeBody, MethodDescriptor, TypeDef, TypeRef};
use crate::vm::universe::TypeUniverse;
use crate::vm::value::Value;

/// Maximum nesting of interpreted frames on one thread
pub const MAX_CALL_DEPTH: usize = 256;

/// Native stack a frame needs before it runs in place
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each segment allocated once the red zone is reached
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks one interpreted frame on the current thread
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<Self, Throwable> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= MAX_CALL_DEPTH {
                return Err(Throwable::builtin("StackOverflowError", None));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Outcome of a single instruction
enum Flow {
    Continue(usize),
    Return(Value),
}

/// Executes code bodies against a type universe
pub struct Interpreter<'u> {
    universe: &'u TypeUniverse,
}

impl<'u> Interpreter<'u> {
    pub fn new(universe: &'u TypeUniverse) -> Self {
        Self { universe }
    }

    /// Run a body to completion
    ///
    /// Local 0 holds `this` for instance bodies; parameters follow.
    pub fn execute(&self, code: &CodeBody, this: Option<&ObjectRef>, args: &[Value]) -> Result<Value, Throwable> {
        let _guard = DepthGuard::enter()?;
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.run(code, this, args))
    }

    fn run(&self, code: &CodeBody, this: Option<&ObjectRef>, args: &[Value]) -> Result<Value, Throwable> {
        let mut locals = Vec::with_capacity(code.max_locals as usize);
        if !code.is_static {
            let this = this.ok_or_else(|| {
                Throwable::null_pointer(format!("{}.{} invoked without a receiver", code.owner, code.name))
            })?;
            locals.push(Value::Object(this.clone()));
        }
        locals.extend(args.iter().cloned());
        if locals.len() < code.max_locals as usize {
            locals.resize(code.max_locals as usize, Value::Null);
        }

        trace!(owner = %code.owner, body = %code.name, args = args.len(), "enter");

        let mut stack: Vec<Value> = Vec::new();
        let mut ip = 0usize;
        loop {
            let mut reader = BytecodeReader::new(&code.code);
            reader.seek(ip);
            let instruction = Instruction::decode(&mut reader).map_err(|err| {
                Throwable::builtin(
                    "VerifyError",
                    Some(format!("{}.{} at offset {}: {}", code.owner, code.name, ip, err)),
                )
            })?;
            let next = reader.position();

            match self.step(code, instruction, next, &mut locals, &mut stack) {
                Ok(Flow::Continue(target)) => ip = target,
                Ok(Flow::Return(value)) => return Ok(value),
                Err(thrown) => match find_handler(code, ip, &thrown) {
                    Some(target) => {
                        trace!(owner = %code.owner, body = %code.name, thrown = %thrown, target, "caught");
                        stack.clear();
                        stack.push(Value::Throwable(Arc::new(thrown)));
                        ip = target;
                    }
                    None => return Err(thrown),
                },
            }
        }
    }

    fn step(
        &self,
        code: &CodeBody,
        instruction: Instruction,
        next: usize,
        locals: &mut [Value],
        stack: &mut Vec<Value>,
    ) -> Result<Flow, Throwable> {
        let constant = |index: u32| constant(code, index);

        match instruction {
            Instruction::Nop => {}
            Instruction::Pop => {
                pop(code, stack)?;
            }
            Instruction::Dup => {
                let top = stack
                    .last()
                    .cloned()
                    .ok_or_else(|| verify_error(code, "stack underflow"))?;
                stack.push(top);
            }
            Instruction::ConstNull => stack.push(Value::Null),
            Instruction::ConstTrue => stack.push(Value::Bool(true)),
            Instruction::ConstFalse => stack.push(Value::Bool(false)),
            Instruction::ConstI32(v) => stack.push(Value::Int(v)),
            Instruction::ConstI64(v) => stack.push(Value::Long(v)),
            Instruction::ConstStr(index) => stack.push(Value::str(constant(index)?)),
            Instruction::LoadLocal(index) => {
                let value = locals
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| verify_error(code, format!("local {} out of range", index)))?;
                stack.push(value);
            }
            Instruction::StoreLocal(index) => {
                let value = pop(code, stack)?;
                let slot = locals
                    .get_mut(index as usize)
                    .ok_or_else(|| verify_error(code, format!("local {} out of range", index)))?;
                *slot = value;
            }
            Instruction::LoadField(name) => {
                let name = constant(name)?;
                let obj = receiver(pop(code, stack)?, name)?;
                let value = obj
                    .get_field(name)
                    .ok_or_else(|| no_such_field(obj.class_name(), name))?;
                stack.push(value);
            }
            Instruction::StoreField(name) => {
                let name = constant(name)?;
                let value = pop(code, stack)?;
                let obj = receiver(pop(code, stack)?, name)?;
                if !obj.set_field(name, value) {
                    return Err(no_such_field(obj.class_name(), name));
                }
            }
            Instruction::LoadStatic { owner, name } => {
                let (owner, name) = (constant(owner)?, constant(name)?);
                let def = self.initialized_type(owner)?;
                let value = def
                    .static_field(name)
                    .ok_or_else(|| no_such_field(owner, name))?;
                stack.push(value);
            }
            Instruction::StoreStatic { owner, name } => {
                let (owner, name) = (constant(owner)?, constant(name)?);
                let value = pop(code, stack)?;
                let def = self.initialized_type(owner)?;
                if !def.set_static_field(name, value) {
                    return Err(no_such_field(owner, name));
                }
            }
            Instruction::New {
                class,
                descriptor,
                argc,
            } => {
                let class = constant(class)?;
                let desc = descriptor_at(code, constant(descriptor)?)?;
                let args = pop_n(code, stack, argc as usize)?;
                let value = if is_builtin_throwable(class) {
                    builtins::construct_throwable(class, &args)?
                } else {
                    let def = self.universe.get(class).ok_or_else(|| no_class_def(class))?;
                    let ctor = def.constructor(&desc.params).cloned().ok_or_else(|| {
                        no_such_method(class, "<init>", &desc)
                    })?;
                    Value::Object(self.universe.construct(&def, &ctor, &args)?)
                };
                stack.push(value);
            }
            Instruction::NewArray { count, .. } => {
                let items = pop_n(code, stack, count as usize)?;
                stack.push(Value::array(items));
            }
            Instruction::CheckCast(ty) => {
                let text = constant(ty)?;
                let ty = TypeRef::parse(text)
                    .ok_or_else(|| verify_error(code, format!("invalid type '{}'", text)))?;
                let value = pop(code, stack)?;
                stack.push(self.universe.check_cast(value, &ty)?);
            }
            Instruction::InvokeSuper {
                class,
                descriptor,
                argc,
            } => {
                let class = constant(class)?;
                let desc = descriptor_at(code, constant(descriptor)?)?;
                let args = pop_n(code, stack, argc as usize)?;
                let obj = receiver(pop(code, stack)?, "<init>")?;
                if class != builtins::OBJECT {
                    let def = self.universe.get(class).ok_or_else(|| no_class_def(class))?;
                    let ctor = def
                        .constructor(&desc.params)
                        .cloned()
                        .ok_or_else(|| no_such_method(class, "<init>", &desc))?;
                    self.universe.run_constructor(&ctor, &obj, &args)?;
                }
            }
            Instruction::CallVirtual {
                name,
                descriptor,
                argc,
            } => {
                let name = constant(name)?;
                let desc = descriptor_at(code, constant(descriptor)?)?;
                let args = pop_n(code, stack, argc as usize)?;
                let target = pop(code, stack)?;
                let result = self.call_virtual(&target, name, &desc, &args)?;
                if !desc.return_type.is_void() {
                    stack.push(result);
                }
            }
            Instruction::CallStatic {
                owner,
                name,
                descriptor,
                argc,
            } => {
                let (owner, name) = (constant(owner)?, constant(name)?);
                let desc = descriptor_at(code, constant(descriptor)?)?;
                let args = pop_n(code, stack, argc as usize)?;
                let result = self.call_static(owner, name, &desc, &args)?;
                if !desc.return_type.is_void() {
                    stack.push(result);
                }
            }
            Instruction::Jmp(offset) => {
                let target = next as i64 + offset as i64;
                if target < 0 || target as usize >= code.code.len() {
                    return Err(verify_error(code, format!("jump target {} out of range", target)));
                }
                return Ok(Flow::Continue(target as usize));
            }
            Instruction::Return => return Ok(Flow::Return(pop(code, stack)?)),
            Instruction::ReturnVoid => return Ok(Flow::Return(Value::Null)),
            Instruction::Throw => {
                let thrown = match pop(code, stack)? {
                    Value::Throwable(thrown) => thrown.as_ref().clone(),
                    Value::Null => Throwable::null_pointer("cannot throw null"),
                    other => Throwable::class_cast(format!(
                        "class {} cannot be cast to class Throwable",
                        other.type_name()
                    )),
                };
                return Err(thrown);
            }
        }
        Ok(Flow::Continue(next))
    }

    fn call_virtual(
        &self,
        target: &Value,
        name: &str,
        desc: &MethodDescriptor,
        args: &[Value],
    ) -> Result<Value, Throwable> {
        match target {
            Value::Null => Err(Throwable::null_pointer(format!(
                "cannot invoke {}({}) on null",
                name,
                crate::vm::types::join_types(&desc.params)
            ))),
            Value::Object(obj) => {
                let method = self
                    .universe
                    .resolve_virtual(obj.class(), name, &desc.params)
                    .ok_or_else(|| {
                        Throwable::builtin(
                            "AbstractMethodError",
                            Some(format!(
                                "{}.{}",
                                obj.class_name(),
                                crate::vm::types::overload_key(name, &desc.params)
                            )),
                        )
                    })?;
                self.universe.invoke(&method, Some(obj), args)
            }
            other => builtins::call_builtin(other, name, args).unwrap_or_else(|| {
                Err(Throwable::builtin(
                    "AbstractMethodError",
                    Some(format!("{}.{}", other.type_name(), name)),
                ))
            }),
        }
    }

    fn call_static(
        &self,
        owner: &str,
        name: &str,
        desc: &MethodDescriptor,
        args: &[Value],
    ) -> Result<Value, Throwable> {
        if owner == builtins::METHOD && name == "find" {
            return builtins::method_find(self.universe, args);
        }
        let def = self.initialized_type(owner)?;
        let method = def
            .declared_method(name, &desc.params)
            .filter(|m| m.is_static())
            .cloned()
            .ok_or_else(|| no_such_method(owner, name, desc))?;
        self.universe.invoke(&method, None, args)
    }

    fn initialized_type(&self, name: &str) -> Result<Arc<TypeDef>, Throwable> {
        let def = self.universe.get(name).ok_or_else(|| no_class_def(name))?;
        self.universe.ensure_initialized(&def)?;
        Ok(def)
    }
}

/// First exception table entry covering `ip` whose catch list matches
fn find_handler(code: &CodeBody, ip: usize, thrown: &Throwable) -> Option<usize> {
    code.handlers
        .iter()
        .find(|h| {
            h.start <= ip
                && ip < h.end
                && (h.catch_types.is_empty() || h.catch_types.iter().any(|t| thrown.is_instance_of(t)))
        })
        .map(|h| h.handler)
}

fn constant(code: &CodeBody, index: u32) -> Result<&str, Throwable> {
    code.constants
        .get_string(index)
        .ok_or_else(|| verify_error(code, format!("constant #{} out of range", index)))
}

fn pop(code: &CodeBody, stack: &mut Vec<Value>) -> Result<Value, Throwable> {
    stack.pop().ok_or_else(|| verify_error(code, "stack underflow"))
}

/// Pop `n` values, returned in push order
fn pop_n(code: &CodeBody, stack: &mut Vec<Value>, n: usize) -> Result<Vec<Value>, Throwable> {
    if stack.len() < n {
        return Err(verify_error(code, "stack underflow"));
    }
    Ok(stack.split_off(stack.len() - n))
}

fn receiver(value: Value, member: &str) -> Result<ObjectRef, Throwable> {
    match value {
        Value::Object(obj) => Ok(obj),
        Value::Null => Err(Throwable::null_pointer(format!(
            "cannot access '{}' on null",
            member
        ))),
        other => Err(Throwable::builtin(
            "IncompatibleClassChangeError",
            Some(format!("{} has no member '{}'", other.type_name(), member)),
        )),
    }
}

fn descriptor_at(code: &CodeBody, text: &str) -> Result<MethodDescriptor, Throwable> {
    MethodDescriptor::parse(text)
        .ok_or_else(|| verify_error(code, format!("invalid descriptor '{}'", text)))
}

fn verify_error(code: &CodeBody, message: impl std::fmt::Display) -> Throwable {
    Throwable::builtin(
        "VerifyError",
        Some(format!("{}.{}: {}", code.owner, code.name, message)),
    )
}

fn no_class_def(name: &str) -> Throwable {
    Throwable::builtin("NoClassDefFoundError", Some(name.to_string()))
}

fn no_such_field(owner: &str, name: &str) -> Throwable {
    Throwable::builtin(
        "IncompatibleClassChangeError",
        Some(format!("no field {}.{}", owner, name)),
    )
}

fn no_such_method(owner: &str, name: &str, desc: &MethodDescriptor) -> Throwable {
    Throwable::builtin("NoSuchMethodError", Some(format!("{}.{}{}", owner, name, desc)))
}
