//! Syntax tree consumed by the compiler.
//!
//! Tokenizing and parsing live outside this workspace; whatever front end
//! is used delivers a [`CodeBlock`] (and, for named methods, a
//! [`MethodSignature`]). The [`build`] module constructs trees directly,
//! which is how the bootstrap code, the tests, and the demos get theirs.

pub mod build;

/// An expression or statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Numeric literal, kept as source text.
    Number(String),
    /// A name: `self`, a local, or a global.
    Symbol(String),
    /// String literal.
    String(String),
    /// Array literal: `#(a b c)`.
    Array(Vec<Node>),
    /// Object literal: slot names paired with value expressions.
    Object(ObjectLiteral),
    CodeBlock(CodeBlock),
    Assignment(Assignment),
    /// A message send used as a statement.
    MessageExpression(Box<Node>),
    Message(Message),
    Cascade(Cascade),
    /// `<selector args>`: binds a method body to a host function.
    Pragma(Pragma),
    /// Block literal: `[:a :b | body]`.
    Closure(ClosureBlock),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeBlock {
    /// The last statement's value is the block's value.
    pub statements: Vec<Node>,
}

impl CodeBlock {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }

    /// The pragma, when the block consists of exactly one.
    pub fn as_pragma(&self) -> Option<&Pragma> {
        match self.statements.as_slice() {
            [Node::Pragma(pragma)] => Some(pragma),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLiteral {
    pub keys: Vec<String>,
    pub values: Vec<Node>,
}

/// `name := value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Box<Node>,
}

/// `receiver selector arguments...`
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub receiver: Box<Node>,
    pub selector: String,
    pub arguments: Vec<Node>,
}

/// `receiver m1; m2; m3`: every part is sent to the one receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub receiver: Box<Node>,
    pub messages: Vec<CascadePart>,
}

/// One message of a cascade; the receiver is the cascade's.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePart {
    pub selector: String,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pragma {
    pub selector: String,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureBlock {
    pub parameters: Vec<String>,
    pub body: CodeBlock,
}

/// Selector and parameter names of a named method, parsed apart from its
/// body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub selector: String,
    pub parameters: Vec<String>,
}

impl MethodSignature {
    pub fn new(selector: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            selector: selector.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Number of arguments a selector takes: one per keyword part, one for a
/// binary operator, none for a unary name.
pub fn selector_arity(selector: &str) -> usize {
    let colons = selector.matches(':').count();
    if colons > 0 {
        colons
    } else if selector
        .chars()
        .next()
        .is_some_and(|c| !c.is_alphanumeric() && c != '_')
    {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_follows_selector_shape() {
        assert_eq!(selector_arity("size"), 0);
        assert_eq!(selector_arity("+"), 1);
        assert_eq!(selector_arity("<="), 1);
        assert_eq!(selector_arity("at:"), 1);
        assert_eq!(selector_arity("ifTrue:ifFalse:"), 2);
    }

    #[test]
    fn single_pragma_body_is_recognised() {
        let body = build::block(vec![build::pragma("primitive:", vec![build::symbol("plus")])]);
        assert_eq!(body.as_pragma().map(|p| p.selector.as_str()), Some("primitive:"));

        let code = build::block(vec![build::number("1")]);
        assert!(code.as_pragma().is_none());
    }
}
