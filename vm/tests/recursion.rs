mod common;

use ast::build::*;
use common::{define_counter, eval, small_vm, vm};
use object::HeapSettings;
use vm::interpreter::RuntimeError;
use vm::special::bootstrap;
use vm::{Error, VmSettings};

fn send_counter(selector: &str, n: &str) -> ast::CodeBlock {
    block(vec![keyword(symbol("Counter"), selector, vec![number(n)])])
}

#[test]
fn self_tail_calls_run_in_constant_depth() {
    let mut vm = vm();
    assert_eq!(vm.settings.max_depth, 1024);
    define_counter(&mut vm);
    assert_eq!(eval(&mut vm, &send_counter("down:", "100000")).unwrap(), "0");
}

#[test]
fn non_tail_recursion_overflows() {
    let mut vm = bootstrap(VmSettings {
        max_depth: 64,
        ..Default::default()
    })
    .unwrap();
    define_counter(&mut vm);

    assert_eq!(eval(&mut vm, &send_counter("up:", "50")).unwrap(), "50");

    let height = vm.stack.len();
    assert!(matches!(
        eval(&mut vm, &send_counter("up:", "100")),
        Err(Error::Runtime(RuntimeError::StackOverflow { .. }))
    ));
    assert_eq!(vm.stack.len(), height);

    // the VM stays usable
    assert_eq!(eval(&mut vm, &send_counter("down:", "10")).unwrap(), "0");
}

#[test]
fn tail_calls_survive_collections() {
    let mut vm = small_vm(64);
    define_counter(&mut vm);
    assert_eq!(eval(&mut vm, &send_counter("down:", "5000")).unwrap(), "0");
    assert!(vm.heap.stats().cycles > 0);
}

#[test]
fn depth_limit_must_be_positive() {
    let settings = VmSettings {
        heap: HeapSettings::default(),
        max_depth: 0,
    };
    assert!(matches!(bootstrap(settings), Err(Error::InvalidSettings(_))));
}
