#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use ast::build::*;
use ast::{CodeBlock, Node};
use object::{HeapSettings, Value};
use vm::special::bootstrap;
use vm::{Error, VmSettings, VM};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn vm() -> VM {
    init_logging();
    bootstrap(VmSettings::default()).expect("bootstrap")
}

/// A VM with tiny pools, so ordinary programs trigger collections.
pub fn small_vm(capacity: usize) -> VM {
    init_logging();
    bootstrap(VmSettings {
        heap: HeapSettings {
            initial_capacity: capacity,
            ..Default::default()
        },
        ..Default::default()
    })
    .expect("bootstrap")
}

/// Run a unit and render its result.
pub fn eval(vm: &mut VM, unit: &CodeBlock) -> Result<String, Error> {
    let value = vm.run(unit)?;
    Ok(vm.display(value))
}

pub fn eval_value(vm: &mut VM, unit: &CodeBlock) -> Value {
    vm.run(unit).expect("eval")
}

/// Everything written to the Transcript.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn install(vm: &mut VM) -> Self {
        let capture = Self::default();
        vm.set_output(Box::new(capture.clone()));
        capture
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `n = 0 ifTrue: [zero] ifFalse: [otherwise]`
fn count_down(zero: Node, otherwise: Vec<Node>) -> CodeBlock {
    block(vec![keyword(
        binary(symbol("n"), "=", number("0")),
        "ifTrue:ifFalse:",
        vec![closure(&[], vec![zero]), closure(&[], otherwise)],
    )])
}

fn n_minus_one() -> Node {
    binary(symbol("n"), "-", number("1"))
}

/// Bind `Counter` with recursive methods:
///
/// - `down: n` tail-calls itself and answers 0
/// - `up: n` recurses outside tail position and answers n
/// - `churn: n` allocates an array per step, then tail-calls itself
/// - `adder: n` answers `[:x | x + n]`
pub fn define_counter(vm: &mut VM) {
    let counter = vm.define_object("Counter");
    let down = count_down(
        number("0"),
        vec![keyword(symbol("self"), "down:", vec![n_minus_one()])],
    );
    let up = count_down(
        number("0"),
        vec![binary(
            keyword(symbol("self"), "up:", vec![n_minus_one()]),
            "+",
            number("1"),
        )],
    );
    let churn = count_down(
        number("0"),
        vec![
            statement(unary(array(vec![symbol("n"), symbol("n")]), "size")),
            keyword(symbol("self"), "churn:", vec![n_minus_one()]),
        ],
    );
    let adder = block(vec![closure(
        &["x"],
        vec![binary(symbol("x"), "+", symbol("n"))],
    )]);

    for (selector, body) in [("down:", down), ("up:", up), ("churn:", churn), ("adder:", adder)] {
        vm.define_method(counter, &signature(selector, &["n"]), &body)
            .expect("define Counter method");
    }
}
