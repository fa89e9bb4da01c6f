use std::fmt;
use std::mem;
use std::rc::Rc;

use ast::{
    Assignment, Cascade, ClosureBlock, CodeBlock, Message, MethodSignature,
    Node, ObjectLiteral, Pragma,
};
use bytecode::{BytecodeBuilder, Label};
use object::{CompiledMethod, Handle, Method, MethodBuilder, Value};

use crate::primitives::PrimitiveDesc;
use crate::symbol_table::SymbolTable;
use crate::VM;

pub const MAX_ARGUMENTS: usize = 254;
/// Exclusive bound shared by constant, local, upvalue and closure indices
/// and by array literal sizes.
pub const MAX_INDEX: usize = u16::MAX as usize;
pub const MAX_OBJECT_PAIRS: usize = 32_767;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    TooManyArguments { count: usize },
    TooManyConstants,
    TooManyLocals,
    TooManyUpvalues,
    TooManyClosures,
    ArrayTooLarge { count: usize },
    ObjectTooLarge { count: usize },
    MismatchedObjectLiteral { keys: usize, values: usize },
    CannotReassign { name: String },
    UnknownPragma { selector: String },
    UnknownPrimitive { name: String },
    UnknownNative { library: String, name: String },
    MalformedPragma { reason: &'static str },
    PragmaArity { expected: usize, got: u8 },
    MisplacedPragma,
    MalformedConditional { selector: String, reason: &'static str },
    EmptyCascade,
    JumpTooFar,
    InvalidNumber { text: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyArguments { count } => {
                write!(f, "{count} arguments exceed the limit of {MAX_ARGUMENTS}")
            }
            Self::TooManyConstants => write!(f, "too many constants"),
            Self::TooManyLocals => write!(f, "too many locals"),
            Self::TooManyUpvalues => write!(f, "too many upvalues"),
            Self::TooManyClosures => write!(f, "too many closures"),
            Self::ArrayTooLarge { count } => {
                write!(f, "array literal of {count} elements is too large")
            }
            Self::ObjectTooLarge { count } => {
                write!(f, "object literal of {count} slots is too large")
            }
            Self::MismatchedObjectLiteral { keys, values } => {
                write!(f, "object literal has {keys} keys but {values} values")
            }
            Self::CannotReassign { name } => {
                write!(f, "cannot reassign '{name}'")
            }
            Self::UnknownPragma { selector } => {
                write!(f, "unknown pragma <{selector}>")
            }
            Self::UnknownPrimitive { name } => {
                write!(f, "unknown primitive '{name}'")
            }
            Self::UnknownNative { library, name } => {
                write!(f, "unknown native function '{name}' in '{library}'")
            }
            Self::MalformedPragma { reason } => {
                write!(f, "malformed pragma: {reason}")
            }
            Self::PragmaArity { expected, got } => write!(
                f,
                "method takes {expected} arguments but its function takes {got}"
            ),
            Self::MisplacedPragma => {
                write!(f, "a pragma must be the whole body of a method")
            }
            Self::MalformedConditional { selector, reason } => {
                write!(f, "malformed {selector}: {reason}")
            }
            Self::EmptyCascade => write!(f, "cascade without messages"),
            Self::JumpTooFar => write!(f, "branch too large to jump over"),
            Self::InvalidNumber { text } => {
                write!(f, "invalid number literal '{text}'")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// One method being compiled: its locals and its code.
#[derive(Debug, Default)]
struct Scope {
    locals: SymbolTable,
    method: MethodBuilder,
}

impl Scope {
    fn with_parameters(parameters: &[String]) -> Result<Self, CompileError> {
        let mut scope = Scope::default();
        for parameter in parameters {
            scope
                .locals
                .get_or_create(parameter)
                .ok_or(CompileError::TooManyLocals)?;
        }
        Ok(scope)
    }

    fn finish(self, arity: u8) -> CompiledMethod {
        let mut method = self.method;
        method.set_arity(arity);
        method.set_locals(u16::try_from(self.locals.size()).unwrap_or(u16::MAX));
        method.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conditional {
    IfTrue,
    IfFalse,
    IfTrueIfFalse,
    IfFalseIfTrue,
}

impl Conditional {
    fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "ifTrue:" => Some(Self::IfTrue),
            "ifFalse:" => Some(Self::IfFalse),
            "ifTrue:ifFalse:" => Some(Self::IfTrueIfFalse),
            "ifFalse:ifTrue:" => Some(Self::IfFalseIfTrue),
            _ => None,
        }
    }

    fn branches(self) -> usize {
        match self {
            Self::IfTrue | Self::IfFalse => 1,
            Self::IfTrueIfFalse | Self::IfFalseIfTrue => 2,
        }
    }

    /// Whether the first branch runs on `true`.
    fn first_on_true(self) -> bool {
        matches!(self, Self::IfTrue | Self::IfTrueIfFalse)
    }
}

/// Translates syntax trees into [`CompiledMethod`]s.
///
/// Nested closures push a scope; names resolve against the innermost scope
/// first, then the enclosing ones (as upvalues), then the globals. The
/// upvalue table is shared by every scope of one top-level closure.
pub struct Compiler<'vm> {
    vm: &'vm mut VM,
    current: Scope,
    enclosing: Vec<Scope>,
    upvalues: SymbolTable,
}

impl<'vm> Compiler<'vm> {
    fn new(vm: &'vm mut VM, scope: Scope) -> Self {
        Self {
            vm,
            current: scope,
            enclosing: Vec::new(),
            upvalues: SymbolTable::new(),
        }
    }

    /// Compile a top-level unit into a permanent, zero-argument Method.
    pub fn compile(
        vm: &mut VM,
        block: &CodeBlock,
    ) -> Result<Handle<Method>, CompileError> {
        let mut compiler = Compiler::new(vm, Scope::default());
        compiler.compile_body(block)?;
        let compiled = mem::take(&mut compiler.current).finish(0);
        Ok(compiler
            .vm
            .heap
            .allocate_permanent(Method::new(Rc::new(compiled))))
    }

    /// Compile a named method. A body consisting of a single pragma binds
    /// the selector to a host function instead of bytecode.
    pub fn compile_method(
        vm: &mut VM,
        signature: &MethodSignature,
        body: &CodeBlock,
    ) -> Result<(String, Value), CompileError> {
        let arity = argument_count(signature.parameters.len())?;
        let selector = signature.selector.clone();

        if let Some(pragma) = body.as_pragma() {
            let native = resolve_pragma(vm, pragma, signature.parameters.len())?;
            return Ok((selector, native));
        }

        let scope = Scope::with_parameters(&signature.parameters)?;
        let mut compiler = Compiler::new(vm, scope);
        compiler.compile_body(body)?;
        let compiled = mem::take(&mut compiler.current).finish(arity);
        let method = compiler
            .vm
            .heap
            .allocate_permanent(Method::new(Rc::new(compiled)));
        log::debug!("compiled method #{selector}");
        Ok((selector, Value::Method(method)))
    }

    #[inline]
    fn code(&mut self) -> &mut BytecodeBuilder {
        self.current.method.code()
    }

    fn bind(&mut self, label: Label) -> Result<(), CompileError> {
        self.code().bind(label).map_err(|_| CompileError::JumpTooFar)
    }

    // Constants

    fn string_constant(&mut self, text: &str) -> Result<u16, CompileError> {
        let idx = self.vm.constants.string(&mut self.vm.heap, text);
        constant_operand(idx)
    }

    fn number_constant(&mut self, text: &str) -> Result<u16, CompileError> {
        let idx = self
            .vm
            .constants
            .number(&mut self.vm.heap, text)
            .map_err(|_| CompileError::InvalidNumber {
                text: text.to_string(),
            })?;
        constant_operand(idx)
    }

    fn push_nil(&mut self) -> Result<(), CompileError> {
        let nil = self.string_constant("nil")?;
        self.code().push_global(nil);
        Ok(())
    }

    // Statements

    /// Compile a block so that exactly its last value is left on the stack.
    fn compile_body(&mut self, block: &CodeBlock) -> Result<(), CompileError> {
        let Some(last) = block.statements.len().checked_sub(1) else {
            return self.push_nil();
        };

        for (i, statement) in block.statements.iter().enumerate() {
            match statement {
                Node::Assignment(assignment) => {
                    let slot = self.compile_assignment(assignment)?;
                    if i == last {
                        self.code().push_local(slot);
                    }
                }
                other => {
                    self.compile_expression(other)?;
                    if i != last {
                        self.code().pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// A block compiled in place; its names stop being visible afterwards
    /// but keep their slots.
    fn compile_inline_block(
        &mut self,
        block: &CodeBlock,
    ) -> Result<(), CompileError> {
        let mark = self.current.locals.enter_block();
        self.compile_body(block)?;
        self.current.locals.leave_block(mark);
        Ok(())
    }

    fn compile_assignment(
        &mut self,
        assignment: &Assignment,
    ) -> Result<u16, CompileError> {
        // The value first: `x := x + 1` reads an outer `x`.
        self.compile_expression(&assignment.value)?;

        let name = &assignment.name;
        if self.current.locals.find(name).is_some() {
            return Err(CompileError::CannotReassign { name: name.clone() });
        }
        let slot = self
            .current
            .locals
            .get_or_create(name)
            .ok_or(CompileError::TooManyLocals)?;
        self.code().pop_into(slot);
        Ok(slot)
    }

    fn compile_expression(&mut self, node: &Node) -> Result<(), CompileError> {
        match node {
            Node::Number(text) => {
                let idx = self.number_constant(text)?;
                self.code().push_constant(idx);
            }
            Node::String(text) => {
                let idx = self.string_constant(text)?;
                self.code().push_constant(idx);
            }
            Node::Symbol(name) => self.compile_symbol(name)?,
            Node::Array(elements) => self.compile_array(elements)?,
            Node::Object(object) => self.compile_object(object)?,
            Node::CodeBlock(block) => self.compile_inline_block(block)?,
            Node::Assignment(assignment) => {
                let slot = self.compile_assignment(assignment)?;
                self.code().push_local(slot);
            }
            Node::MessageExpression(message) => {
                self.compile_expression(message)?
            }
            Node::Message(message) => self.compile_message(message)?,
            Node::Cascade(cascade) => self.compile_cascade(cascade)?,
            Node::Closure(closure) => self.compile_closure(closure)?,
            Node::Pragma(_) => return Err(CompileError::MisplacedPragma),
        }
        Ok(())
    }

    // Names

    fn compile_symbol(&mut self, name: &str) -> Result<(), CompileError> {
        if name == "self" {
            self.code().push_self();
            return Ok(());
        }
        if let Some(slot) = self.current.locals.find(name) {
            self.code().push_local(slot);
            return Ok(());
        }
        if let Some(idx) = self.resolve_upvalue(name)? {
            self.code().push_upvalue(idx);
            return Ok(());
        }
        let idx = self.string_constant(name)?;
        self.code().push_global(idx);
        Ok(())
    }

    /// Find `name` in an enclosing scope, innermost first. The scope just
    /// inside the owner records the capture; deeper scopes inherit it.
    fn resolve_upvalue(&mut self, name: &str) -> Result<Option<u16>, CompileError> {
        let owner = (0..self.enclosing.len())
            .rev()
            .find_map(|depth| {
                self.enclosing[depth].locals.find(name).map(|slot| (depth, slot))
            });
        let Some((depth, local)) = owner else {
            return Ok(None);
        };

        let idx = self
            .upvalues
            .get_or_create(name)
            .ok_or(CompileError::TooManyUpvalues)?;
        let capturing = match self.enclosing.get_mut(depth + 1) {
            Some(scope) => scope,
            None => &mut self.current,
        };
        capturing.method.add_upvalue(idx, local);
        Ok(Some(idx))
    }

    // Literals

    fn compile_array(&mut self, elements: &[Node]) -> Result<(), CompileError> {
        let count = elements.len();
        if count >= MAX_INDEX {
            return Err(CompileError::ArrayTooLarge { count });
        }
        for element in elements {
            self.compile_expression(element)?;
        }
        self.code().pop_into_array(count as u16);
        Ok(())
    }

    fn compile_object(
        &mut self,
        object: &ObjectLiteral,
    ) -> Result<(), CompileError> {
        let count = object.keys.len();
        if count != object.values.len() {
            return Err(CompileError::MismatchedObjectLiteral {
                keys: count,
                values: object.values.len(),
            });
        }
        if count >= MAX_OBJECT_PAIRS {
            return Err(CompileError::ObjectTooLarge { count });
        }
        for (key, value) in object.keys.iter().zip(&object.values) {
            let idx = self.string_constant(key)?;
            self.code().push_constant(idx);
            self.compile_expression(value)?;
        }
        self.code().pop_into_object((count * 2) as u16);
        Ok(())
    }

    // Sends

    fn compile_message(&mut self, message: &Message) -> Result<(), CompileError> {
        let argc = argument_count(message.arguments.len())?;

        if let Some(conditional) = Conditional::from_selector(&message.selector)
        {
            let literal_blocks = message
                .arguments
                .iter()
                .all(|arg| matches!(arg, Node::Closure(_)));
            if literal_blocks {
                return self.compile_conditional(conditional, message);
            }
        }

        self.compile_expression(&message.receiver)?;
        for argument in &message.arguments {
            self.compile_expression(argument)?;
        }
        self.emit_send(&message.selector, argc)
    }

    fn emit_send(&mut self, selector: &str, argc: u8) -> Result<(), CompileError> {
        let idx = self.string_constant(selector)?;
        // The receiver counts as an argument.
        self.code().send(idx, argc + 1);
        Ok(())
    }

    /// `cond ifTrue: [a] ifFalse: [b]` as jumps around the inlined branch
    /// bodies. A missing branch answers nil.
    fn compile_conditional(
        &mut self,
        conditional: Conditional,
        message: &Message,
    ) -> Result<(), CompileError> {
        let malformed = |reason| CompileError::MalformedConditional {
            selector: message.selector.clone(),
            reason,
        };
        if message.arguments.len() != conditional.branches() {
            return Err(malformed("wrong number of branches"));
        }
        let mut branches = Vec::with_capacity(2);
        for argument in &message.arguments {
            match argument {
                Node::Closure(block) if block.parameters.is_empty() => {
                    branches.push(&block.body);
                }
                _ => return Err(malformed("branches take no parameters")),
            }
        }

        self.compile_expression(&message.receiver)?;
        let skip_first = if conditional.first_on_true() {
            self.code().jump_if_false()
        } else {
            self.code().jump_if_true()
        };
        self.compile_inline_block(branches[0])?;
        let to_end = self.code().jump();
        self.bind(skip_first)?;
        match branches.get(1) {
            Some(second) => self.compile_inline_block(second)?,
            None => self.push_nil()?,
        }
        self.bind(to_end)
    }

    fn compile_cascade(&mut self, cascade: &Cascade) -> Result<(), CompileError> {
        let Some(last) = cascade.messages.len().checked_sub(1) else {
            return Err(CompileError::EmptyCascade);
        };

        self.compile_expression(&cascade.receiver)?;
        for (i, part) in cascade.messages.iter().enumerate() {
            let argc = argument_count(part.arguments.len())?;
            if i != last {
                self.code().dup();
            }
            for argument in &part.arguments {
                self.compile_expression(argument)?;
            }
            self.emit_send(&part.selector, argc)?;
            if i != last {
                self.code().pop();
            }
        }
        Ok(())
    }

    // Closures

    fn compile_closure(
        &mut self,
        closure: &ClosureBlock,
    ) -> Result<(), CompileError> {
        let arity = argument_count(closure.parameters.len())?;
        if self.current.method.closure_count() >= MAX_INDEX {
            return Err(CompileError::TooManyClosures);
        }
        if self.enclosing.is_empty() {
            self.upvalues.reset();
        }

        let child = Scope::with_parameters(&closure.parameters)?;
        let parent = mem::replace(&mut self.current, child);
        self.enclosing.push(parent);
        let body = self.compile_body(&closure.body);
        let parent = self.enclosing.pop().unwrap_or_default();
        let child = mem::replace(&mut self.current, parent);
        body?;

        let compiled = Rc::new(child.finish(arity));
        let idx = self.current.method.add_closure(compiled);
        self.code().push_closure(idx as u16);
        Ok(())
    }
}

fn argument_count(count: usize) -> Result<u8, CompileError> {
    if count > MAX_ARGUMENTS {
        return Err(CompileError::TooManyArguments { count });
    }
    Ok(count as u8)
}

fn constant_operand(idx: u32) -> Result<u16, CompileError> {
    u16::try_from(idx)
        .ok()
        .filter(|idx| (*idx as usize) < MAX_INDEX)
        .ok_or(CompileError::TooManyConstants)
}

/// Text of a literal pragma argument.
fn pragma_text(node: &Node) -> Option<&str> {
    match node {
        Node::Symbol(text) | Node::String(text) => Some(text),
        _ => None,
    }
}

/// Resolve `<primitive: #name>` or `<native: 'lib' function: 'name'>` to
/// its interned NativeMethod.
fn resolve_pragma(
    vm: &mut VM,
    pragma: &Pragma,
    parameters: usize,
) -> Result<Value, CompileError> {
    let (key, desc) = match pragma.selector.as_str() {
        "primitive:" => {
            let [name] = pragma.arguments.as_slice() else {
                return Err(CompileError::MalformedPragma {
                    reason: "primitive: takes one name",
                });
            };
            let name = pragma_text(name).ok_or(CompileError::MalformedPragma {
                reason: "primitive name must be a symbol or string",
            })?;
            let desc = vm.find_primitive(name).ok_or_else(|| {
                CompileError::UnknownPrimitive {
                    name: name.to_string(),
                }
            })?;
            (name.to_string(), desc)
        }
        "native:function:" => {
            let [library, function] = pragma.arguments.as_slice() else {
                return Err(CompileError::MalformedPragma {
                    reason: "native:function: takes a library and a name",
                });
            };
            let (Some(library), Some(function)) =
                (pragma_text(library), pragma_text(function))
            else {
                return Err(CompileError::MalformedPragma {
                    reason: "native names must be symbols or strings",
                });
            };
            let desc = vm.find_native(library, function).ok_or_else(|| {
                CompileError::UnknownNative {
                    library: library.to_string(),
                    name: function.to_string(),
                }
            })?;
            (format!("{library}/{function}"), desc)
        }
        other => {
            return Err(CompileError::UnknownPragma {
                selector: other.to_string(),
            });
        }
    };

    check_pragma_arity(&desc, parameters)?;
    Ok(Value::NativeMethod(vm.intern_native(&key, desc)))
}

fn check_pragma_arity(
    desc: &PrimitiveDesc,
    parameters: usize,
) -> Result<(), CompileError> {
    if desc.arity as usize != parameters {
        return Err(CompileError::PragmaArity {
            expected: parameters,
            got: desc.arity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VmSettings, VM};
    use ast::build::*;
    use bytecode::{BytecodeDecoder, Instruction};

    fn vm() -> VM {
        VM::new(VmSettings::default()).unwrap()
    }

    fn compiled(vm: &mut VM, block: &CodeBlock) -> Rc<CompiledMethod> {
        let method = Compiler::compile(vm, block).unwrap();
        Rc::clone(vm.heap.get(method).unwrap().compiled())
    }

    fn instructions(code: &CompiledMethod) -> Vec<Instruction> {
        BytecodeDecoder::new(code.bytecode()).collect()
    }

    #[test]
    fn only_the_last_statement_survives() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![
                statement(unary(number("1"), "negated")),
                statement(unary(number("2"), "negated")),
            ]),
        );
        let pops = instructions(&code)
            .iter()
            .filter(|i| matches!(i, Instruction::Pop))
            .count();
        assert_eq!(pops, 1);
    }

    #[test]
    fn empty_block_answers_nil() {
        let mut vm = vm();
        let code = compiled(&mut vm, &block(vec![]));
        let nil = vm.constants.find_string("nil").unwrap() as u16;
        assert_eq!(
            instructions(&code),
            vec![Instruction::PushGlobal { name_idx: nil }]
        );
    }

    #[test]
    fn assignment_reads_outer_name_before_binding() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![assign("x", binary(symbol("x"), "+", number("1")))]),
        );
        let ops = instructions(&code);
        assert!(matches!(ops[0], Instruction::PushGlobal { .. }));
        assert_eq!(ops[3], Instruction::PopInto { reg: 0 });
        assert_eq!(ops[4], Instruction::PushLocal { reg: 0 });
        assert_eq!(code.locals(), 1);
    }

    #[test]
    fn locals_cannot_be_reassigned() {
        let mut vm = vm();
        let result = Compiler::compile(
            &mut vm,
            &block(vec![assign("x", number("1")), assign("x", number("2"))]),
        );
        assert_eq!(
            result,
            Err(CompileError::CannotReassign { name: "x".into() })
        );
    }

    #[test]
    fn parameters_cannot_be_reassigned() {
        let mut vm = vm();
        let result = Compiler::compile_method(
            &mut vm,
            &signature("at:", &["i"]),
            &block(vec![assign("i", number("1"))]),
        );
        assert!(matches!(result, Err(CompileError::CannotReassign { .. })));
    }

    #[test]
    fn closures_capture_enclosing_locals() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![
                assign("x", number("1")),
                closure(&[], vec![symbol("x")]),
            ]),
        );
        let inner = code.closure(0).unwrap();
        assert_eq!(inner.upvalues(), &[(0, 0)]);
        assert_eq!(
            instructions(inner),
            vec![Instruction::PushUpvalue { idx: 0 }]
        );
    }

    #[test]
    fn nested_closures_capture_at_the_level_below_the_owner() {
        let mut vm = vm();
        // x := 1. [[x]]
        let code = compiled(
            &mut vm,
            &block(vec![
                assign("x", number("1")),
                closure(&[], vec![closure(&[], vec![symbol("x")])]),
            ]),
        );
        let middle = code.closure(0).unwrap();
        let inner = middle.closure(0).unwrap();
        assert_eq!(middle.upvalues(), &[(0, 0)]);
        assert!(inner.upvalues().is_empty());
        assert_eq!(
            instructions(inner),
            vec![Instruction::PushUpvalue { idx: 0 }]
        );
    }

    #[test]
    fn closure_parameters_shadow_outer_names() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![
                assign("x", number("1")),
                closure(&["x"], vec![symbol("x")]),
            ]),
        );
        let inner = code.closure(0).unwrap();
        assert_eq!(inner.arity(), 1);
        assert!(inner.upvalues().is_empty());
        assert_eq!(instructions(inner), vec![Instruction::PushLocal { reg: 0 }]);
    }

    #[test]
    fn literal_conditionals_are_inlined() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![keyword(
                symbol("true"),
                "ifTrue:ifFalse:",
                vec![
                    closure(&[], vec![number("1")]),
                    closure(&[], vec![number("2")]),
                ],
            )]),
        );
        let ops = instructions(&code);
        assert!(!ops.iter().any(|i| matches!(i, Instruction::Send { .. })));
        assert!(matches!(ops[1], Instruction::JumpIfFalse { .. }));
        assert!(code.closures().is_empty());
    }

    #[test]
    fn non_literal_branches_compile_as_sends() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![keyword(symbol("true"), "ifTrue:", vec![symbol("b")])]),
        );
        let ops = instructions(&code);
        assert!(matches!(ops.last(), Some(Instruction::Send { argc: 2, .. })));
    }

    #[test]
    fn branch_blocks_take_no_parameters() {
        let mut vm = vm();
        let result = Compiler::compile(
            &mut vm,
            &block(vec![keyword(
                symbol("true"),
                "ifTrue:",
                vec![closure(&["x"], vec![symbol("x")])],
            )]),
        );
        assert!(matches!(
            result,
            Err(CompileError::MalformedConditional { .. })
        ));
    }

    #[test]
    fn branch_locals_get_fresh_slots() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![
                statement(keyword(
                    symbol("true"),
                    "ifTrue:",
                    vec![closure(&[], vec![assign("t", number("1"))])],
                )),
                assign("t", number("2")),
            ]),
        );
        assert_eq!(code.locals(), 2);
    }

    #[test]
    fn cascades_duplicate_all_but_the_last_receiver() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![cascade(
                symbol("Transcript"),
                vec![("print:", vec![number("1")]), ("endl", vec![])],
            )]),
        );
        let ops = instructions(&code);
        let dups = ops.iter().filter(|i| matches!(i, Instruction::Dup)).count();
        let pops = ops.iter().filter(|i| matches!(i, Instruction::Pop)).count();
        assert_eq!((dups, pops), (1, 1));
        assert!(matches!(ops.last(), Some(Instruction::Send { argc: 1, .. })));
    }

    #[test]
    fn empty_cascades_are_rejected() {
        let mut vm = vm();
        let result =
            Compiler::compile(&mut vm, &block(vec![cascade(number("1"), vec![])]));
        assert_eq!(result, Err(CompileError::EmptyCascade));
    }

    #[test]
    fn argument_limit_is_254() {
        let mut vm = vm();
        let send_with = |n: usize| {
            let selector = "a:".repeat(n);
            block(vec![keyword(
                symbol("self"),
                &selector,
                (0..n).map(|_| number("1")).collect(),
            )])
        };
        assert!(Compiler::compile(&mut vm, &send_with(254)).is_ok());
        assert_eq!(
            Compiler::compile(&mut vm, &send_with(255)),
            Err(CompileError::TooManyArguments { count: 255 })
        );
    }

    #[test]
    fn array_literal_limit() {
        let mut vm = vm();
        let elements = (0..MAX_INDEX).map(|_| number("1")).collect();
        assert_eq!(
            Compiler::compile(&mut vm, &block(vec![array(elements)])),
            Err(CompileError::ArrayTooLarge { count: MAX_INDEX })
        );
    }

    #[test]
    fn object_literals_push_key_value_pairs() {
        let mut vm = vm();
        let code = compiled(
            &mut vm,
            &block(vec![object(vec![("a", number("1")), ("b", number("2"))])]),
        );
        assert_eq!(
            instructions(&code).last(),
            Some(&Instruction::PopIntoObject { count: 4 })
        );
    }

    #[test]
    fn object_literal_limit() {
        let mut vm = vm();
        let pairs = (0..MAX_OBJECT_PAIRS).map(|_| ("a", number("1"))).collect();
        assert_eq!(
            Compiler::compile(&mut vm, &block(vec![object(pairs)])),
            Err(CompileError::ObjectTooLarge {
                count: MAX_OBJECT_PAIRS
            })
        );
    }

    #[test]
    fn object_literal_keys_and_values_must_pair_up() {
        let mut vm = vm();
        let literal = Node::Object(ObjectLiteral {
            keys: vec!["a".into()],
            values: vec![number("1"), number("2")],
        });
        assert_eq!(
            Compiler::compile(&mut vm, &block(vec![literal])),
            Err(CompileError::MismatchedObjectLiteral { keys: 1, values: 2 })
        );
    }

    #[test]
    fn bad_number_literals_are_compile_errors() {
        let mut vm = vm();
        assert_eq!(
            Compiler::compile(&mut vm, &block(vec![number("1.2.3")])),
            Err(CompileError::InvalidNumber {
                text: "1.2.3".into()
            })
        );
    }

    #[test]
    fn pragmas_resolve_to_native_methods() {
        let mut vm = vm();
        let (selector, value) = Compiler::compile_method(
            &mut vm,
            &signature("+", &["other"]),
            &primitive("plus"),
        )
        .unwrap();
        assert_eq!(selector, "+");
        assert!(matches!(value, Value::NativeMethod(_)));
    }

    #[test]
    fn pragma_errors() {
        let mut vm = vm();
        let sig = signature("+", &["other"]);
        assert_eq!(
            Compiler::compile_method(&mut vm, &sig, &primitive("nope")),
            Err(CompileError::UnknownPrimitive { name: "nope".into() })
        );
        assert_eq!(
            Compiler::compile_method(&mut vm, &signature("x", &[]), &primitive("plus")),
            Err(CompileError::PragmaArity { expected: 0, got: 1 })
        );
        assert_eq!(
            Compiler::compile_method(&mut vm, &sig, &native("math", "add")),
            Err(CompileError::UnknownNative {
                library: "math".into(),
                name: "add".into()
            })
        );
        let odd = block(vec![pragma("inline:", vec![])]);
        assert_eq!(
            Compiler::compile_method(&mut vm, &sig, &odd),
            Err(CompileError::UnknownPragma {
                selector: "inline:".into()
            })
        );
        assert_eq!(
            Compiler::compile(&mut vm, &primitive("plus")),
            Err(CompileError::MisplacedPragma)
        );
    }
}
