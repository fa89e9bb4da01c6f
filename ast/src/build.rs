//! Constructors for syntax trees.
//!
//! ```
//! use ast::build::*;
//!
//! // [:x | x + 1] value: 5
//! let tree = block(vec![keyword(
//!     closure(&["x"], vec![binary(symbol("x"), "+", number("1"))]),
//!     "value:",
//!     vec![number("5")],
//! )]);
//! assert_eq!(tree.statements.len(), 1);
//! ```

use crate::{
    Assignment, Cascade, CascadePart, ClosureBlock, CodeBlock, Message, MethodSignature, Node,
    ObjectLiteral, Pragma,
};

pub fn number(text: impl Into<String>) -> Node {
    Node::Number(text.into())
}

pub fn symbol(name: impl Into<String>) -> Node {
    Node::Symbol(name.into())
}

pub fn string(text: impl Into<String>) -> Node {
    Node::String(text.into())
}

pub fn array(elements: Vec<Node>) -> Node {
    Node::Array(elements)
}

pub fn object(slots: Vec<(&str, Node)>) -> Node {
    let (keys, values) = slots
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .unzip();
    Node::Object(ObjectLiteral { keys, values })
}

pub fn block(statements: Vec<Node>) -> CodeBlock {
    CodeBlock::new(statements)
}

pub fn assign(name: impl Into<String>, value: Node) -> Node {
    Node::Assignment(Assignment {
        name: name.into(),
        value: Box::new(value),
    })
}

pub fn send(receiver: Node, selector: impl Into<String>, arguments: Vec<Node>) -> Node {
    Node::Message(Message {
        receiver: Box::new(receiver),
        selector: selector.into(),
        arguments,
    })
}

pub fn unary(receiver: Node, selector: &str) -> Node {
    send(receiver, selector, Vec::new())
}

pub fn binary(receiver: Node, operator: &str, argument: Node) -> Node {
    send(receiver, operator, vec![argument])
}

pub fn keyword(receiver: Node, selector: &str, arguments: Vec<Node>) -> Node {
    send(receiver, selector, arguments)
}

/// Wrap a send so its value is discarded unless it ends the block.
pub fn statement(message: Node) -> Node {
    Node::MessageExpression(Box::new(message))
}

pub fn cascade(receiver: Node, messages: Vec<(&str, Vec<Node>)>) -> Node {
    Node::Cascade(Cascade {
        receiver: Box::new(receiver),
        messages: messages
            .into_iter()
            .map(|(selector, arguments)| CascadePart {
                selector: selector.to_string(),
                arguments,
            })
            .collect(),
    })
}

pub fn pragma(selector: impl Into<String>, arguments: Vec<Node>) -> Node {
    Node::Pragma(Pragma {
        selector: selector.into(),
        arguments,
    })
}

/// `<primitive: #name>`
pub fn primitive(name: &str) -> CodeBlock {
    block(vec![pragma("primitive:", vec![symbol(name)])])
}

/// `<native: 'library' function: 'name'>`
pub fn native(library: &str, function: &str) -> CodeBlock {
    block(vec![pragma(
        "native:function:",
        vec![string(library), string(function)],
    )])
}

pub fn closure(parameters: &[&str], statements: Vec<Node>) -> Node {
    Node::Closure(ClosureBlock {
        parameters: parameters.iter().map(|p| p.to_string()).collect(),
        body: block(statements),
    })
}

pub fn signature(selector: &str, parameters: &[&str]) -> MethodSignature {
    MethodSignature::new(selector, parameters)
}
