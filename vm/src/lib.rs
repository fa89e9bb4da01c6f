pub mod compiler;
pub mod constants;
pub mod disassemble;
pub mod interpreter;
pub mod primitives;
pub mod special;
pub mod stack;
pub mod symbol_table;
pub mod world;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use ast::{CodeBlock, MethodSignature};
use object::{
    Handle, Heap, HeapObject, HeapSettings, Map, Method, NativeMethod,
    SweepCounts, Value,
};

use crate::compiler::{CompileError, Compiler};
use crate::constants::ConstantsTable;
use crate::interpreter::{InterpreterRoots, InterpreterState, RuntimeError};
use crate::primitives::PrimitiveDesc;
use crate::stack::Stack;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmSettings {
    pub heap: HeapSettings,
    /// Nested activations allowed before `StackOverflow`. Self-recursive
    /// tail calls do not count.
    pub max_depth: usize,
}

impl Default for VmSettings {
    fn default() -> Self {
        Self {
            heap: HeapSettings::default(),
            max_depth: 1024,
        }
    }
}

impl VmSettings {
    pub fn validate(&self) -> Result<(), &'static str> {
        self.heap.validate()?;
        if self.max_depth == 0 {
            return Err("max_depth must be > 0");
        }
        Ok(())
    }
}

/// Anything that can go wrong between an AST and a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidSettings(&'static str),
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSettings(reason) => {
                write!(f, "invalid settings: {reason}")
            }
            Self::Compile(err) => write!(f, "compile error: {err}"),
            Self::Runtime(err) => write!(f, "runtime error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        Self::Runtime(err)
    }
}

/// The runtime: heap, literals, the operand stack, the global namespace and
/// the host function tables. Compiler and interpreter borrow it.
pub struct VM {
    pub heap: Heap,
    pub constants: ConstantsTable,
    pub stack: Stack,
    pub world: World,
    pub settings: VmSettings,
    /// Registered primitive descriptors.
    pub primitives: Vec<PrimitiveDesc>,
    /// Native libraries by name.
    libraries: HashMap<String, Vec<PrimitiveDesc>>,
    /// Functions behind interned NativeMethods, indexed by their id.
    natives: Vec<PrimitiveDesc>,
    native_cache: HashMap<String, Handle<NativeMethod>>,
    output: Box<dyn Write>,
    rng: u64,
}

impl fmt::Debug for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM")
            .field("settings", &self.settings)
            .field("stack", &self.stack.len())
            .field("constants", &self.constants.len())
            .field("natives", &self.natives.len())
            .finish_non_exhaustive()
    }
}

impl VM {
    /// An empty world: singletons and bare prototypes only. See
    /// [`special::bootstrap`] for the populated one.
    pub fn new(settings: VmSettings) -> Result<Self, Error> {
        settings.validate().map_err(Error::InvalidSettings)?;

        let mut heap = Heap::new(settings.heap);
        let mut constants = ConstantsTable::new();
        let world = World::new(&mut heap, &mut constants);
        let sentinel = Value::Map(heap.allocate_permanent(Map::new()));

        Ok(Self {
            heap,
            constants,
            stack: Stack::new(sentinel),
            world,
            settings,
            primitives: primitives::default_primitives(),
            libraries: HashMap::new(),
            natives: Vec::new(),
            native_cache: HashMap::new(),
            output: Box::new(io::stdout()),
            rng: 0x2545_f491_4f6c_dd1d,
        })
    }

    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub(crate) fn write_output(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush())
            .map_err(|err| RuntimeError::Output(err.to_string()))
    }

    /// Allocate with the live stack and frames as roots.
    pub(crate) fn allocate<T: HeapObject>(
        &mut self,
        state: &InterpreterState,
        value: T,
    ) -> Handle<T> {
        let roots = InterpreterRoots {
            stack: &self.stack,
            frames: &state.frames,
        };
        self.heap.allocate(value, &roots)
    }

    /// Run an explicit collection cycle with the stack as roots. Pools are
    /// never grown by an explicit cycle.
    pub fn collect_garbage(&mut self, full: bool) -> SweepCounts {
        let roots = InterpreterRoots {
            stack: &self.stack,
            frames: &[],
        };
        self.heap.collect(full, &roots)
    }

    // Host functions

    pub fn find_primitive(&self, name: &str) -> Option<PrimitiveDesc> {
        self.primitives.iter().find(|p| p.name == name).copied()
    }

    /// Make `functions` resolvable through `<native: 'name' function: ...>`.
    pub fn register_native_library(
        &mut self,
        name: &str,
        functions: &[PrimitiveDesc],
    ) {
        log::debug!(
            "registered native library '{name}' ({} functions)",
            functions.len()
        );
        self.libraries.insert(name.to_string(), functions.to_vec());
    }

    pub fn find_native(
        &self,
        library: &str,
        function: &str,
    ) -> Option<PrimitiveDesc> {
        self.libraries
            .get(library)?
            .iter()
            .find(|p| p.name == function)
            .copied()
    }

    /// The permanent NativeMethod for a host function, created on first
    /// use. `key` identifies the function across libraries.
    pub fn intern_native(
        &mut self,
        key: &str,
        desc: PrimitiveDesc,
    ) -> Handle<NativeMethod> {
        if let Some(handle) = self.native_cache.get(key) {
            return *handle;
        }
        let id = self.natives.len() as u32;
        self.natives.push(desc);
        let handle = self.heap.allocate_permanent(NativeMethod {
            id,
            name: desc.name.to_string(),
            arity: desc.arity,
        });
        self.native_cache.insert(key.to_string(), handle);
        handle
    }

    pub(crate) fn native(&self, id: u32) -> Option<PrimitiveDesc> {
        self.natives.get(id as usize).copied()
    }

    // Compilation

    /// Compile a top-level unit into a permanent, zero-argument Method.
    pub fn compile(
        &mut self,
        block: &CodeBlock,
    ) -> Result<Handle<Method>, CompileError> {
        Compiler::compile(self, block).inspect_err(|err| {
            log::warn!("rejected compile unit: {err}");
        })
    }

    /// Compile a named method; answers its selector and the Method or
    /// NativeMethod to install.
    pub fn compile_method(
        &mut self,
        signature: &MethodSignature,
        body: &CodeBlock,
    ) -> Result<(String, Value), CompileError> {
        Compiler::compile_method(self, signature, body).inspect_err(|err| {
            log::warn!("rejected method '{}': {err}", signature.selector);
        })
    }

    // Evaluation

    /// Run a compiled unit with `nil` as receiver. The result stays on the
    /// stack for [`VM::pop`].
    pub fn eval(&mut self, method: Handle<Method>) -> Result<Value, RuntimeError> {
        let nil = self.world.nil;
        self.eval_with_self(method, nil)
    }

    /// Like [`VM::eval`] with an explicit receiver. On error the stack is
    /// restored, `nil` is pushed in place of a result and the error is
    /// answered.
    pub fn eval_with_self(
        &mut self,
        method: Handle<Method>,
        receiver: Value,
    ) -> Result<Value, RuntimeError> {
        let height = self.stack.len();
        match interpreter::interpret_with_receiver(self, method, receiver) {
            Ok(value) => Ok(value),
            Err(err) => {
                log::error!("{err}");
                self.stack.truncate(height);
                let nil = self.world.nil;
                self.stack.push(nil);
                Err(err)
            }
        }
    }

    /// Compile and evaluate a unit, popping its result.
    ///
    /// The answered value is no longer rooted; after a collection it may
    /// be dead, and [`display`](VM::display) renders it as `<dead>`.
    pub fn run(&mut self, block: &CodeBlock) -> Result<Value, Error> {
        let method = self.compile(block)?;
        let result = self.eval(method);
        self.stack.pop();
        Ok(result?)
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    // World

    pub fn global(&self, name: &str) -> Option<Value> {
        self.world.lookup(&self.heap, &self.constants, name)
    }

    /// Bind a global. The value and everything it references become
    /// permanent.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.world
            .define(&mut self.heap, &mut self.constants, name, value);
    }

    /// Bind a fresh, empty object as a global and answer it.
    pub fn define_object(&mut self, name: &str) -> Handle<Map> {
        let object = self.heap.allocate_permanent(Map::new());
        self.define_global(name, Value::Map(object));
        object
    }

    /// Compile a method and install it in `holder`'s slots.
    pub fn define_method(
        &mut self,
        holder: Handle<Map>,
        signature: &MethodSignature,
        body: &CodeBlock,
    ) -> Result<(), CompileError> {
        let (selector, method) = self.compile_method(signature, body)?;
        let key = self.constants.intern_key(&selector);
        self.heap.map_define(holder, key, method);
        Ok(())
    }

    // Misc

    pub fn display(&self, value: Value) -> String {
        self.heap.display(value)
    }

    /// Text of a constant for messages; `#idx` when it has none.
    pub(crate) fn constant_text(&self, idx: u32) -> String {
        match self.constants.text(idx) {
            Some(text) => text.to_string(),
            None => format!("#{idx}"),
        }
    }

    /// xorshift64*
    pub(crate) fn next_random(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_depth() {
        let settings = VmSettings {
            max_depth: 0,
            ..Default::default()
        };
        assert!(matches!(VM::new(settings), Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn natives_are_interned_once() {
        let mut vm = VM::new(VmSettings::default()).unwrap();
        let desc = vm.find_primitive("plus").unwrap();
        let a = vm.intern_native("plus", desc);
        let b = vm.intern_native("plus", desc);
        assert_eq!(a, b);
        assert_eq!(vm.native(0).map(|d| d.name), Some("plus"));
    }

    #[test]
    fn random_advances() {
        let mut vm = VM::new(VmSettings::default()).unwrap();
        let first = vm.next_random();
        let second = vm.next_random();
        assert_ne!(first, second);
    }
}
