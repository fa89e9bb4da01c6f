use std::rc::Rc;

use bytecode::BytecodeBuilder;

use crate::Value;

/// Bytecode plus the metadata needed to activate it.
///
/// Immutable once built; closures share their templates through `Rc`.
#[derive(Debug)]
pub struct CompiledMethod {
    bytecode: Vec<u8>,
    locals: u16,
    arity: u8,
    closures: Vec<Rc<CompiledMethod>>,
    upvalues: Vec<(u16, u16)>,
}

impl CompiledMethod {
    #[inline]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Local slots including parameters.
    #[inline]
    pub fn locals(&self) -> u16 {
        self.locals
    }

    #[inline]
    pub fn arity(&self) -> u8 {
        self.arity
    }

    #[inline]
    pub fn closure(&self, index: u16) -> Option<&Rc<CompiledMethod>> {
        self.closures.get(index as usize)
    }

    #[inline]
    pub fn closures(&self) -> &[Rc<CompiledMethod>] {
        &self.closures
    }

    /// `(upvalue index, enclosing local)` pairs captured at instantiation.
    #[inline]
    pub fn upvalues(&self) -> &[(u16, u16)] {
        &self.upvalues
    }
}

/// Accumulates a [`CompiledMethod`] during compilation.
#[derive(Debug, Default)]
pub struct MethodBuilder {
    code: BytecodeBuilder,
    locals: u16,
    arity: u8,
    closures: Vec<Rc<CompiledMethod>>,
    upvalues: Vec<(u16, u16)>,
}

impl MethodBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn code(&mut self) -> &mut BytecodeBuilder {
        &mut self.code
    }

    pub fn set_arity(&mut self, arity: u8) {
        self.arity = arity;
    }

    pub fn arity(&self) -> u8 {
        self.arity
    }

    pub fn set_locals(&mut self, locals: u16) {
        self.locals = locals;
    }

    /// Register a closure template; answers its index.
    pub fn add_closure(&mut self, closure: Rc<CompiledMethod>) -> usize {
        self.closures.push(closure);
        self.closures.len() - 1
    }

    pub fn closure_count(&self) -> usize {
        self.closures.len()
    }

    /// Record that upvalue `index` captures enclosing local `local`.
    /// Registering the same index twice is a no-op.
    pub fn add_upvalue(&mut self, index: u16, local: u16) {
        if !self.upvalues.iter().any(|(i, _)| *i == index) {
            self.upvalues.push((index, local));
        }
    }

    pub fn upvalue_count(&self) -> usize {
        self.upvalues.len()
    }

    pub fn finish(self) -> CompiledMethod {
        CompiledMethod {
            bytecode: self.code.into_bytes(),
            locals: self.locals.max(u16::from(self.arity)),
            arity: self.arity,
            closures: self.closures,
            upvalues: self.upvalues,
        }
    }
}

/// A method object: shared code, the captured self of a closure, and the
/// captured upvalues.
#[derive(Debug, Clone)]
pub struct Method {
    compiled: Rc<CompiledMethod>,
    self_value: Option<Value>,
    upvalues: Vec<Option<Value>>,
}

impl Method {
    pub fn new(compiled: Rc<CompiledMethod>) -> Self {
        Self {
            compiled,
            self_value: None,
            upvalues: Vec::new(),
        }
    }

    /// A closure instance over `compiled`, starting from a copy of the
    /// enclosing method's upvalues.
    pub fn closure(
        compiled: Rc<CompiledMethod>,
        self_value: Value,
        inherited: &[Option<Value>],
    ) -> Self {
        Self {
            compiled,
            self_value: Some(self_value),
            upvalues: inherited.to_vec(),
        }
    }

    #[inline]
    pub fn compiled(&self) -> &Rc<CompiledMethod> {
        &self.compiled
    }

    #[inline]
    pub fn self_value(&self) -> Option<Value> {
        self.self_value
    }

    #[inline]
    pub fn upvalue(&self, index: u16) -> Option<Value> {
        self.upvalues.get(index as usize).copied().flatten()
    }

    #[inline]
    pub fn upvalues(&self) -> &[Option<Value>] {
        &self.upvalues
    }

    /// Only valid before the method is published to the heap.
    pub fn set_upvalue(&mut self, index: u16, value: Value) {
        let index = index as usize;
        if self.upvalues.len() <= index {
            self.upvalues.resize(index + 1, None);
        }
        self.upvalues[index] = Some(value);
    }

    pub fn references(&self) -> impl Iterator<Item = Value> + '_ {
        self.self_value
            .into_iter()
            .chain(self.upvalues.iter().flatten().copied())
    }
}

/// A host function exposed as a method. `id` indexes the runtime's native
/// function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMethod {
    pub id: u32,
    pub name: String,
    pub arity: u8,
}
